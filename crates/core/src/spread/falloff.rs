//! Distance falloff and resistance attenuation for a single transfer.

use crate::spread::config::{FalloffCurve, ResistanceModel};

/// Treat NaN, infinities and negatives coming from the host as zero
#[inline(always)]
pub(crate) fn sanitize(value: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

/// Fraction of a sender's output reaching `distance`.
///
/// 1.0 up to and including `hard_radius`, falling to 0.0 at `soft_radius`.
/// When `soft_radius <= hard_radius` there is no falloff band and the
/// result is a hard cutoff at `hard_radius`.
#[inline(always)]
pub fn falloff_factor(distance: f32, hard_radius: f32, soft_radius: f32, curve: FalloffCurve) -> f32 {
    if distance.is_nan() {
        return 0.0;
    }
    let hard = sanitize(hard_radius);
    let soft = sanitize(soft_radius);

    if distance <= hard {
        return 1.0;
    }
    if soft <= hard || distance >= soft {
        return 0.0;
    }

    let t = ((soft - distance) / (soft - hard)).clamp(0.0, 1.0);
    match curve {
        FalloffCurve::Linear => t,
        FalloffCurve::SmoothStep => t * t * (3.0 - 2.0 * t),
    }
}

/// Heat left over after the receiver's resistance. Never negative.
#[inline(always)]
pub fn apply_resistance(raw: f32, resistance: f32, seconds_passed: f32, model: ResistanceModel) -> f32 {
    let raw = sanitize(raw);
    let resistance = sanitize(resistance);
    match model {
        ResistanceModel::Subtractive => (raw - resistance * seconds_passed).max(0.0),
        ResistanceModel::Proportional => raw / (1.0 + resistance),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_boundaries() {
        for curve in [FalloffCurve::Linear, FalloffCurve::SmoothStep] {
            assert_eq!(falloff_factor(0.0, 2.0, 5.0, curve), 1.0);
            assert_eq!(falloff_factor(2.0, 2.0, 5.0, curve), 1.0);
            assert_eq!(falloff_factor(5.0, 2.0, 5.0, curve), 0.0);
            assert_eq!(falloff_factor(8.0, 2.0, 5.0, curve), 0.0);
        }
    }

    #[test]
    fn test_linear_midpoint() {
        assert_relative_eq!(falloff_factor(3.5, 2.0, 5.0, FalloffCurve::Linear), 0.5);
        assert_relative_eq!(falloff_factor(4.0, 2.0, 5.0, FalloffCurve::Linear), 1.0 / 3.0);
    }

    #[test]
    fn test_smoothstep_is_continuous_near_edges() {
        let just_inside = falloff_factor(2.001, 2.0, 5.0, FalloffCurve::SmoothStep);
        let just_outside = falloff_factor(4.999, 2.0, 5.0, FalloffCurve::SmoothStep);
        assert!(just_inside > 0.999);
        assert!(just_outside < 0.001);
    }

    #[test]
    fn test_equal_radii_hard_cutoff() {
        assert_eq!(falloff_factor(3.0, 3.0, 3.0, FalloffCurve::Linear), 1.0);
        assert_eq!(falloff_factor(3.0001, 3.0, 3.0, FalloffCurve::Linear), 0.0);
        // Soft radius inside the hard radius behaves the same way
        assert_eq!(falloff_factor(2.5, 3.0, 1.0, FalloffCurve::Linear), 1.0);
        assert_eq!(falloff_factor(3.5, 3.0, 1.0, FalloffCurve::Linear), 0.0);
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(falloff_factor(f32::NAN, 2.0, 5.0, FalloffCurve::Linear), 0.0);
        assert_eq!(falloff_factor(1.0, f32::NAN, 5.0, FalloffCurve::Linear), 0.8);
        assert_eq!(falloff_factor(0.0, -1.0, -1.0, FalloffCurve::Linear), 1.0);
    }

    #[test]
    fn test_resistance_models() {
        assert_eq!(apply_resistance(10.0, 3.0, 1.0, ResistanceModel::Subtractive), 7.0);
        assert_eq!(apply_resistance(10.0, 30.0, 1.0, ResistanceModel::Subtractive), 0.0);
        assert_eq!(apply_resistance(10.0, 4.0, 0.5, ResistanceModel::Subtractive), 8.0);
        assert_eq!(apply_resistance(10.0, 1.0, 1.0, ResistanceModel::Proportional), 5.0);
        assert_eq!(apply_resistance(-5.0, 0.0, 1.0, ResistanceModel::Proportional), 0.0);
        assert_eq!(apply_resistance(10.0, f32::NAN, 1.0, ResistanceModel::Subtractive), 10.0);
    }
}
