use std::f64::consts::TAU;

/// Move `current` a fraction `t` of the remaining distance toward `target`.
///
/// Written as a weighted sum (not `a + (b - a) * t`) so that repeated
/// application converges on `target` exactly in f64 arithmetic, which is what
/// lets in-flight interpolation targets be cleared by equality.
pub fn lerp(current: f64, target: f64, t: f64) -> f64 {
    current * (1.0 - t) + target * t
}

/// Wrap a phase value into `[0, 2π)`.
///
/// Inputs are always `previous_phase + positive_step`, so a single `%` is
/// enough; negative inputs are still folded back for safety.
pub fn wrap_phase(phase: f64) -> f64 {
    let p = phase % TAU;
    if p < 0.0 { p + TAU } else { p }
}

/// Bell-shaped attenuation envelope `(4 / (4 + x^exponent))^4`.
///
/// `exponent` is 4 for the classic stroked layers and 2 for the spawning
/// bundles; both peak at 1 when `x == 0` and decay toward 0 as `|x|` grows.
pub fn bell_attenuation(x: f64, exponent: i32) -> f64 {
    const ATT_FACTOR: f64 = 4.0;
    (ATT_FACTOR / (ATT_FACTOR + x.powi(exponent))).powi(4)
}
