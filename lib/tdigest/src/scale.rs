use std::f64::consts::PI;

/// Maps a position on the arcsine scale back to a quantile.
///
/// Positions beyond `compression` saturate at the top of the scale.
pub(crate) fn integrated_q(compression: f64, k: f64) -> f64 {
    ((k.min(compression) * PI / compression - PI / 2.0).sin() + 1.0) / 2.0
}

/// Maps a quantile to its position on the arcsine scale, in `[0, compression]`.
pub(crate) fn integrated_location(compression: f64, q: f64) -> f64 {
    compression * ((2.0 * q - 1.0).clamp(-1.0, 1.0).asin() + PI / 2.0) / PI
}

/// Weighted average of two values, clamped to lie between them.
pub(crate) fn weighted_average(x1: f64, w1: f64, x2: f64, w2: f64) -> f64 {
    if x1 <= x2 {
        weighted_average_sorted(x1, w1, x2, w2)
    } else {
        weighted_average_sorted(x2, w2, x1, w1)
    }
}

fn weighted_average_sorted(x1: f64, w1: f64, x2: f64, w2: f64) -> f64 {
    let x = (x1 * w1 + x2 * w2) / (w1 + w2);
    x1.max(x.min(x2))
}
