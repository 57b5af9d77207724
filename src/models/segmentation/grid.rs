//! Prompt point grids for automatic mask generation.

/// Normalised `[x, y]` cell centres of an `n_per_side` x `n_per_side` grid.
///
/// Points are in `[0, 1]`, ordered row by row (y outer, x inner).
pub fn build_point_grid(n_per_side: u32) -> Vec<[f32; 2]> {
    let n = n_per_side as usize;
    if n == 0 {
        return Vec::new();
    }
    let offset = 1.0 / (2.0 * n as f64);
    let step = if n > 1 {
        (1.0 - 2.0 * offset) / (n - 1) as f64
    } else {
        0.0
    };
    let axis: Vec<f64> = (0..n).map(|i| offset + i as f64 * step).collect();

    let mut points = Vec::with_capacity(n * n);
    for &y in &axis {
        for &x in &axis {
            points.push([x as f32, y as f32]);
        }
    }
    points
}

/// Grid points in pixel coordinates of a `width` x `height` image.
pub fn scaled_point_grid(n_per_side: u32, width: u32, height: u32) -> Vec<[f32; 2]> {
    build_point_grid(n_per_side)
        .into_iter()
        .map(|[x, y]| [x * width as f32, y * height as f32])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_has_cell_centres() {
        let grid = build_point_grid(2);
        assert_eq!(grid, vec![[0.25, 0.25], [0.75, 0.25], [0.25, 0.75], [0.75, 0.75]]);
    }

    #[test]
    fn single_point_is_image_centre() {
        assert_eq!(build_point_grid(1), vec![[0.5, 0.5]]);
        assert_eq!(scaled_point_grid(1, 200, 100), vec![[100.0, 50.0]]);
    }

    #[test]
    fn grid_size_and_bounds() {
        let grid = build_point_grid(32);
        assert_eq!(grid.len(), 1024);
        assert!(grid.iter().all(|p| p[0] > 0.0 && p[0] < 1.0 && p[1] > 0.0 && p[1] < 1.0));
        assert!(build_point_grid(0).is_empty());
    }
}
