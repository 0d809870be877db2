//! Weighted noisy-OR combination.

/// Combine `(weight, confidence)` signals as `1 - Π(1 - w·c)`.
///
/// Each product is clamped into [0, 1], so the result is in [0, 1], never
/// decreases when a signal is added, and is independent of signal order.
pub fn noisy_or<I>(signals: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let miss: f64 = signals
        .into_iter()
        .map(|(weight, confidence)| 1.0 - clamp_unit(weight * confidence))
        .product();
    clamp_unit(1.0 - miss)
}

/// Clamp into [0, 1], mapping NaN to 0.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
