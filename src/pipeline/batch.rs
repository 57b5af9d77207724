//! Directory-level batch processing.
//!
//! Images are processed one after another in sorted path order. Each one
//! either lands in the output directory under its original file name or is
//! recorded as skipped with a warning; the loop always runs to the end.

use std::path::Path;
use std::time::Instant;

use tracing::{info, warn};

use super::context::SegmentationContext;
use super::engine::{ImageOutcome, MatteEngine};
use super::stats::BatchStats;
use crate::core::errors::{MatteError, MatteResult, SkipReason};
use crate::utils::{list_images, load_image, save_image};

/// Runs a [`MatteEngine`] over every supported image in a directory.
#[derive(Debug)]
pub struct BatchRunner {
    engine: MatteEngine,
}

impl BatchRunner {
    pub fn new(engine: MatteEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &MatteEngine {
        &self.engine
    }

    /// Processes `input_dir` into `output_dir`, creating the latter if needed.
    ///
    /// Only directory-level faults (unreadable input directory, uncreatable
    /// output directory) are errors; everything per image is a skip.
    pub fn run(
        &self,
        context: &SegmentationContext,
        input_dir: &Path,
        output_dir: &Path,
    ) -> MatteResult<BatchStats> {
        let started = Instant::now();
        if !input_dir.is_dir() {
            return Err(MatteError::invalid_input(format!(
                "input directory does not exist: {}",
                input_dir.display()
            )));
        }
        std::fs::create_dir_all(output_dir)?;
        let paths = list_images(input_dir)?;
        info!(
            "Processing {} images from {} on {}",
            paths.len(),
            input_dir.display(),
            context.device()
        );

        let mut stats = BatchStats::new();
        for path in &paths {
            let image_started = Instant::now();
            match self.process_file(context, path, output_dir) {
                Ok(()) => {
                    let elapsed = image_started.elapsed();
                    info!("{} -> OK | {:.2}s", display_name(path), elapsed.as_secs_f64());
                    stats.record_processed(elapsed);
                }
                Err(reason) => {
                    warn!("Skipping {}: {}", display_name(path), reason);
                    stats.record_skipped(path.clone(), reason);
                }
            }
        }

        stats.elapsed = started.elapsed();
        info!(
            "Processed {} of {} images ({} skipped) in {:.2}s",
            stats.processed,
            stats.total(),
            stats.skipped_count(),
            stats.elapsed.as_secs_f64()
        );
        Ok(stats)
    }

    /// Processes one file, writing the canvas next to its siblings in `output_dir`.
    pub fn process_file(
        &self,
        context: &SegmentationContext,
        path: &Path,
        output_dir: &Path,
    ) -> Result<(), SkipReason> {
        let image = load_image(path).map_err(|e| SkipReason::UnreadableImage(error_chain(&e)))?;

        let output = match self.engine.process(context, &image) {
            Ok(ImageOutcome::Processed(output)) => output,
            Ok(ImageOutcome::Skipped(reason)) => return Err(reason),
            Err(err) => return Err(SkipReason::PipelineFailure(error_chain(&err))),
        };

        let file_name = path
            .file_name()
            .ok_or_else(|| SkipReason::WriteFailure("input path has no file name".to_string()))?;
        save_image(&output.canvas, &output_dir.join(file_name))
            .map_err(|e| SkipReason::WriteFailure(error_chain(&e)))
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// `error: cause: cause` on one line.
fn error_chain(err: &MatteError) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use image::{Rgb, RgbImage};

    use super::*;
    use crate::core::config::InferenceDevice;
    use crate::core::traits::{OracleSampling, SegmentationOracle};
    use crate::domain::{Candidate, Mask};
    use crate::pipeline::PipelineConfig;

    /// Finds a centred block in dark images and nothing in white ones,
    /// logging the size of every image it is asked about.
    struct ScriptedOracle {
        calls: Arc<Mutex<Vec<(u32, u32)>>>,
    }

    impl SegmentationOracle for ScriptedOracle {
        fn name(&self) -> &str {
            "scripted"
        }

        fn generate(
            &self,
            image: &RgbImage,
            _sampling: &OracleSampling,
        ) -> MatteResult<Vec<Candidate>> {
            let (w, h) = image.dimensions();
            if let Ok(mut calls) = self.calls.lock() {
                calls.push((w, h));
            }
            if image.get_pixel(0, 0).0 == [255, 255, 255] {
                return Ok(Vec::new());
            }
            Ok(vec![Candidate::new(Mask::from_fn(w, h, |x, y| {
                x >= w / 4 && x < w * 3 / 4 && y >= h / 4 && y < h * 3 / 4
            }))])
        }
    }

    fn runner() -> BatchRunner {
        let mut config = PipelineConfig::default();
        config.composition.target_size = 48;
        config.composition.padding = 2;
        BatchRunner::new(MatteEngine::new(config).unwrap())
    }

    fn scripted_context() -> (SegmentationContext, Arc<Mutex<Vec<(u32, u32)>>>) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let oracle = ScriptedOracle {
            calls: Arc::clone(&calls),
        };
        (
            SegmentationContext::new(Box::new(oracle), InferenceDevice::Cpu),
            calls,
        )
    }

    #[test]
    fn skips_are_recorded_and_the_batch_continues() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        save_image(
            &RgbImage::from_pixel(60, 80, Rgb([20, 20, 20])),
            &input.path().join("a_subject.png"),
        )
        .unwrap();
        save_image(
            &RgbImage::from_pixel(60, 80, Rgb([255, 255, 255])),
            &input.path().join("b_empty.png"),
        )
        .unwrap();
        std::fs::write(input.path().join("c_broken.jpg"), b"not an image").unwrap();
        save_image(
            &RgbImage::from_pixel(30, 30, Rgb([40, 40, 40])),
            &input.path().join("d_subject.png"),
        )
        .unwrap();

        let (ctx, calls) = scripted_context();
        let stats = runner().run(&ctx, input.path(), output.path()).unwrap();

        // Processed images are seen twice (upright and rotated), the empty one once.
        assert_eq!(
            *calls.lock().unwrap(),
            vec![(60, 80), (60, 80), (60, 80), (30, 30), (30, 30)]
        );

        assert_eq!(stats.processed, 2);
        assert_eq!(stats.total(), 4);
        let reasons: Vec<&str> = stats.skipped.iter().map(|(_, r)| r.label()).collect();
        assert_eq!(reasons, vec!["no_candidates", "unreadable_image"]);

        for name in ["a_subject.png", "d_subject.png"] {
            let canvas = load_image(&output.path().join(name)).unwrap();
            assert_eq!(canvas.dimensions(), (48, 48));
        }
        assert!(!output.path().join("b_empty.png").exists());
        assert!(!output.path().join("c_broken.jpg").exists());
    }

    /// Collects formatted log lines for inspection.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if let Ok(mut bytes) = self.0.lock() {
                bytes.extend_from_slice(buf);
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn each_skip_warns_exactly_once() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        save_image(
            &RgbImage::from_pixel(40, 40, Rgb([255, 255, 255])),
            &input.path().join("blank.png"),
        )
        .unwrap();
        std::fs::write(input.path().join("corrupt.png"), b"\x89PNG garbage").unwrap();
        save_image(
            &RgbImage::from_pixel(40, 40, Rgb([30, 30, 30])),
            &input.path().join("subject.png"),
        )
        .unwrap();

        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        let (ctx, _) = scripted_context();
        let stats = tracing::subscriber::with_default(subscriber, || {
            runner().run(&ctx, input.path(), output.path())
        })
        .unwrap();
        assert_eq!(stats.skipped_count(), 2);

        let text = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        let warnings: Vec<&str> = text.lines().filter(|line| line.contains("WARN")).collect();
        assert_eq!(warnings.len(), 2, "{text}");
        assert_eq!(warnings.iter().filter(|l| l.contains("blank.png")).count(), 1);
        assert_eq!(warnings.iter().filter(|l| l.contains("corrupt.png")).count(), 1);
        assert!(!text.contains("subject.png"));
    }

    #[test]
    fn output_directory_is_created() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let nested = output.path().join("clean").join("run1");
        save_image(
            &RgbImage::from_pixel(40, 40, Rgb([10, 10, 10])),
            &input.path().join("only.png"),
        )
        .unwrap();

        let stats = runner().run(&scripted_context().0, input.path(), &nested).unwrap();
        assert_eq!(stats.processed, 1);
        assert!(nested.join("only.png").is_file());
    }

    #[test]
    fn missing_input_directory_is_an_error() {
        let output = tempfile::tempdir().unwrap();
        let missing = output.path().join("nope");
        let result = runner().run(&scripted_context().0, &missing, output.path());
        assert!(matches!(result, Err(MatteError::InvalidInput { .. })));
    }
}
