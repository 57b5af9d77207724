//! Segment-Anything automatic mask generation over ONNX Runtime.
//!
//! The model is split into two exported graphs. The image encoder runs once
//! per image and produces an embedding; the prompt decoder then runs once per
//! grid point, proposing up to three masks each. Proposals are gated by
//! predicted quality and stability, deduplicated and cleaned of small
//! regions before being handed to the refinement engine.

use std::path::Path;
use std::sync::Mutex;

use image::RgbImage;
use ndarray::{Array1, Array2, Array3, Array4, ArrayD, IxDyn};
use ort::session::Session;
use ort::value::TensorRef;
use tracing::debug;

use super::grid::scaled_point_grid;
use super::postprocess::{
    MASK_THRESHOLD, MaskProposal, RegionMode, STABILITY_OFFSET, binarize, non_max_suppression,
    remove_small_regions, stability_score,
};
use super::preprocess::SamTransform;
use crate::core::config::OrtSessionConfig;
use crate::core::errors::{MatteError, MatteResult, SimpleError};
use crate::core::inference::{load_session, model_name_from_path};
use crate::core::traits::{OracleSampling, SegmentationOracle};
use crate::domain::Candidate;

/// Side of the low-resolution mask prompt the decoder expects.
const MASK_INPUT_SIZE: usize = 256;

/// Promptless mask generator backed by a SAM encoder/decoder pair.
pub struct SamAutomaticMaskGenerator {
    name: String,
    encoder: Mutex<Session>,
    decoder: Mutex<Session>,
    encoder_input: String,
    encoder_output: String,
    transform: SamTransform,
}

impl std::fmt::Debug for SamAutomaticMaskGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SamAutomaticMaskGenerator")
            .field("name", &self.name)
            .field("encoder_input", &self.encoder_input)
            .field("encoder_output", &self.encoder_output)
            .field("transform", &self.transform)
            .finish()
    }
}

impl SamAutomaticMaskGenerator {
    /// Loads both graphs with the same session settings.
    pub fn from_paths(
        encoder_path: impl AsRef<Path>,
        decoder_path: impl AsRef<Path>,
        session_config: &OrtSessionConfig,
    ) -> MatteResult<Self> {
        let encoder_path = encoder_path.as_ref();
        let encoder = load_session(encoder_path, session_config)?;
        let decoder = load_session(decoder_path.as_ref(), session_config)?;

        let encoder_input = encoder
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| {
                MatteError::model_load_error(
                    encoder_path,
                    "encoder graph declares no inputs",
                    Some("export the SAM image encoder with a single image input"),
                    None::<SimpleError>,
                )
            })?;
        let encoder_output = encoder
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| {
                MatteError::model_load_error(
                    encoder_path,
                    "encoder graph declares no outputs",
                    None,
                    None::<SimpleError>,
                )
            })?;

        Ok(Self {
            name: model_name_from_path(encoder_path),
            encoder: Mutex::new(encoder),
            decoder: Mutex::new(decoder),
            encoder_input,
            encoder_output,
            transform: SamTransform::default(),
        })
    }

    /// Runs the image encoder.
    fn embed(&self, image: &RgbImage) -> MatteResult<ArrayD<f32>> {
        let input = self.transform.prepare(image);
        let tensor = TensorRef::from_array_view(input.view())
            .map_err(|e| MatteError::inference_error(&self.name, "encoder input tensor", e))?;
        let inputs = ort::inputs![self.encoder_input.as_str() => tensor];

        let mut session = self.encoder.lock().map_err(|_| {
            MatteError::inference_error(
                &self.name,
                "encoder session",
                SimpleError::new("session lock poisoned"),
            )
        })?;
        let outputs = session
            .run(inputs)
            .map_err(|e| MatteError::inference_error(&self.name, "encoder forward pass", e))?;
        let (shape, data) = outputs[self.encoder_output.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| MatteError::inference_error(&self.name, "encoder output", e))?;
        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        Ok(ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec())?)
    }

    /// Decodes one foreground point and returns the proposals that pass the quality gates.
    fn decode_point(
        &self,
        embedding: &ArrayD<f32>,
        point: [f32; 2],
        (width, height): (u32, u32),
        sampling: &OracleSampling,
    ) -> MatteResult<Vec<MaskProposal>> {
        let [px, py] = self.transform.apply_coords(point, width, height);
        // The second point is the padding prompt SAM expects without a box.
        let coords = Array3::<f32>::from_shape_vec((1, 2, 2), vec![px, py, 0.0, 0.0])?;
        let labels = Array2::<f32>::from_shape_vec((1, 2), vec![1.0, -1.0])?;
        let mask_input = Array4::<f32>::zeros((1, 1, MASK_INPUT_SIZE, MASK_INPUT_SIZE));
        let has_mask_input = Array1::<f32>::zeros(1);
        let orig_im_size = Array1::<f32>::from(vec![height as f32, width as f32]);

        let tensor_err =
            |e: ort::Error| MatteError::inference_error(&self.name, "decoder input tensor", e);
        let inputs = ort::inputs![
            "image_embeddings" => TensorRef::from_array_view(embedding.view()).map_err(tensor_err)?,
            "point_coords" => TensorRef::from_array_view(coords.view()).map_err(tensor_err)?,
            "point_labels" => TensorRef::from_array_view(labels.view()).map_err(tensor_err)?,
            "mask_input" => TensorRef::from_array_view(mask_input.view()).map_err(tensor_err)?,
            "has_mask_input" => TensorRef::from_array_view(has_mask_input.view()).map_err(tensor_err)?,
            "orig_im_size" => TensorRef::from_array_view(orig_im_size.view()).map_err(tensor_err)?
        ];

        let mut session = self.decoder.lock().map_err(|_| {
            MatteError::inference_error(
                &self.name,
                "decoder session",
                SimpleError::new("session lock poisoned"),
            )
        })?;
        let outputs = session
            .run(inputs)
            .map_err(|e| MatteError::inference_error(&self.name, "decoder forward pass", e))?;
        let (mask_shape, mask_data) = outputs["masks"]
            .try_extract_tensor::<f32>()
            .map_err(|e| MatteError::inference_error(&self.name, "decoder masks", e))?;
        let (_, iou_data) = outputs["iou_predictions"]
            .try_extract_tensor::<f32>()
            .map_err(|e| MatteError::inference_error(&self.name, "decoder scores", e))?;

        let dims: Vec<usize> = mask_shape.iter().map(|&d| d as usize).collect();
        if dims.len() != 4 || dims[2] != height as usize || dims[3] != width as usize {
            return Err(MatteError::inference_error(
                &self.name,
                "decoder masks",
                SimpleError::new(format!(
                    "expected [1, M, {}, {}] masks, got {:?}",
                    height, width, dims
                )),
            ));
        }
        let num_masks = dims[1];
        let plane = dims[2] * dims[3];
        // Four outputs means the single-mask token comes first; use the multimask trio.
        let first = if num_masks == 4 { 1 } else { 0 };

        let mut proposals = Vec::new();
        for m in first..num_masks {
            let predicted_iou = iou_data.get(m).copied().unwrap_or(0.0);
            if predicted_iou < sampling.pred_iou_thresh {
                continue;
            }
            let logits = &mask_data[m * plane..(m + 1) * plane];
            let stability = stability_score(logits, MASK_THRESHOLD, STABILITY_OFFSET);
            if stability < sampling.stability_score_thresh {
                continue;
            }
            let mask = binarize(logits, width, height, MASK_THRESHOLD)?;
            let Some(bbox) = mask.bounding_box() else {
                continue;
            };
            proposals.push(MaskProposal {
                mask,
                bbox,
                predicted_iou,
                stability,
            });
        }
        Ok(proposals)
    }
}

impl SegmentationOracle for SamAutomaticMaskGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&self, image: &RgbImage, sampling: &OracleSampling) -> MatteResult<Vec<Candidate>> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(MatteError::invalid_input("image has zero area"));
        }

        let embedding = self.embed(image)?;
        let points = scaled_point_grid(sampling.points_per_side, width, height);
        let mut proposals = Vec::new();
        for point in &points {
            proposals.extend(self.decode_point(&embedding, *point, (width, height), sampling)?);
        }
        let decoded = proposals.len();
        let kept = non_max_suppression(proposals, sampling.box_nms_thresh);

        let candidates: Vec<Candidate> = kept
            .into_iter()
            .filter_map(|proposal| {
                let mut mask = proposal.mask;
                if sampling.min_region_area > 0 {
                    (mask, _) =
                        remove_small_regions(&mask, sampling.min_region_area, RegionMode::Holes);
                    (mask, _) =
                        remove_small_regions(&mask, sampling.min_region_area, RegionMode::Islands);
                }
                let candidate = Candidate::new(mask);
                (candidate.area() >= sampling.min_region_area).then_some(candidate)
            })
            .collect();

        debug!(
            "{}: {} prompts, {} proposals passed quality gates, {} candidates after dedup",
            self.name,
            points.len(),
            decoded,
            candidates.len()
        );
        Ok(candidates)
    }
}
