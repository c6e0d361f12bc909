//! Vector arithmetic used by the projection forest and result ranking

use ndarray::ArrayView1;

/// Squared Euclidean distance between two equally long vectors
pub fn squared_euclidean(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Euclidean distance between two equally long vectors
pub fn euclidean(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> f32 {
    squared_euclidean(a, b).sqrt()
}

/// Signed distance-like margin of a point relative to a hyperplane
///
/// Positive margins lie on the side the normal points to.
pub fn margin(normal: &[f32], offset: f32, point: ArrayView1<'_, f32>) -> f32 {
    normal
        .iter()
        .zip(point.iter())
        .map(|(n, p)| n * p)
        .sum::<f32>()
        - offset
}

/// Hyperplane equidistant from two points, as (normal, offset)
///
/// The normal points from `b` towards `a`; points closer to `a` get a
/// positive [`margin`].
pub fn bisector(a: ArrayView1<'_, f32>, b: ArrayView1<'_, f32>) -> (Vec<f32>, f32) {
    let normal: Vec<f32> = a.iter().zip(b.iter()).map(|(x, y)| x - y).collect();
    let offset = normal
        .iter()
        .zip(a.iter().zip(b.iter()))
        .map(|(n, (x, y))| n * (x + y) * 0.5)
        .sum();
    (normal, offset)
}
