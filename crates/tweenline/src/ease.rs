//! Easing functions for tweens
//!
//! Pure mapping from a curve kind and a normalized time to an eased fraction.
//! Back and elastic kinds intentionally return values outside `[0, 1]`; the
//! value algebras interpolate unclamped so overshoot works end to end.

use std::f32::consts::PI;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

const HALF_PI: f32 = PI * 0.5;
const BACK_OVERSHOOT: f32 = 1.701_58;

/// A user-supplied curve sampled by normalized time.
///
/// Used with [`Ease::Custom`]; set through the builder's `ease_with`.
pub type EaseCurve = Rc<dyn Fn(f32) -> f32>;

/// Easing curve kind
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum Ease {
    Linear,
    InQuad,
    #[default]
    OutQuad,
    InOutQuad,
    InCubic,
    OutCubic,
    InOutCubic,
    InQuart,
    OutQuart,
    InOutQuart,
    InQuint,
    OutQuint,
    InOutQuint,
    InSine,
    OutSine,
    InOutSine,
    InExpo,
    OutExpo,
    InOutExpo,
    InCirc,
    OutCirc,
    InOutCirc,
    InElastic,
    OutElastic,
    InOutElastic,
    InBack,
    OutBack,
    InOutBack,
    InBounce,
    OutBounce,
    InOutBounce,
    /// CSS-style cubic bezier through (x1, y1) and (x2, y2)
    CubicBezier(f32, f32, f32, f32),
    /// Samples an externally supplied curve; falls back to linear when none is set
    Custom,
}

impl Ease {
    /// Apply the easing function to a progress value (0.0 to 1.0)
    pub fn apply(&self, t: f32) -> f32 {
        match *self {
            Ease::Linear => t,

            Ease::InQuad => t * t,
            Ease::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Ease::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) * 0.5
                }
            }

            Ease::InCubic => t * t * t,
            Ease::OutCubic => 1.0 - (1.0 - t).powi(3),
            Ease::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(3) * 0.5
                }
            }

            Ease::InQuart => t * t * t * t,
            Ease::OutQuart => 1.0 - (1.0 - t).powi(4),
            Ease::InOutQuart => {
                if t < 0.5 {
                    8.0 * t * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(4) * 0.5
                }
            }

            Ease::InQuint => t * t * t * t * t,
            Ease::OutQuint => 1.0 - (1.0 - t).powi(5),
            Ease::InOutQuint => {
                if t < 0.5 {
                    16.0 * t * t * t * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(5) * 0.5
                }
            }

            Ease::InSine => 1.0 - (t * HALF_PI).cos(),
            Ease::OutSine => (t * HALF_PI).sin(),
            Ease::InOutSine => -((PI * t).cos() - 1.0) * 0.5,

            Ease::InExpo => {
                if t <= 0.0 {
                    0.0
                } else {
                    (10.0 * t - 10.0).exp2()
                }
            }
            Ease::OutExpo => {
                if t >= 1.0 {
                    1.0
                } else {
                    1.0 - (-10.0 * t).exp2()
                }
            }
            Ease::InOutExpo => {
                if t <= 0.0 {
                    0.0
                } else if t >= 1.0 {
                    1.0
                } else if t < 0.5 {
                    (20.0 * t - 10.0).exp2() * 0.5
                } else {
                    (2.0 - (-20.0 * t + 10.0).exp2()) * 0.5
                }
            }

            Ease::InCirc => 1.0 - (1.0 - t * t).sqrt(),
            Ease::OutCirc => (1.0 - (t - 1.0) * (t - 1.0)).sqrt(),
            Ease::InOutCirc => {
                if t < 0.5 {
                    (1.0 - (1.0 - 4.0 * t * t).sqrt()) * 0.5
                } else {
                    ((1.0 - (-2.0 * t + 2.0).powi(2)).sqrt() + 1.0) * 0.5
                }
            }

            Ease::InElastic => {
                if t <= 0.0 {
                    0.0
                } else if t >= 1.0 {
                    1.0
                } else {
                    -(10.0 * t - 10.0).exp2() * ((t * 10.0 - 10.75) * (2.0 * PI / 3.0)).sin()
                }
            }
            Ease::OutElastic => {
                if t <= 0.0 {
                    0.0
                } else if t >= 1.0 {
                    1.0
                } else {
                    (-10.0 * t).exp2() * ((t * 10.0 - 0.75) * (2.0 * PI / 3.0)).sin() + 1.0
                }
            }
            Ease::InOutElastic => {
                if t <= 0.0 {
                    0.0
                } else if t >= 1.0 {
                    1.0
                } else if t < 0.5 {
                    -((20.0 * t - 10.0).exp2() * ((20.0 * t - 11.125) * (2.0 * PI / 4.5)).sin())
                        * 0.5
                } else {
                    (-20.0 * t + 10.0).exp2() * ((20.0 * t - 11.125) * (2.0 * PI / 4.5)).sin() * 0.5
                        + 1.0
                }
            }

            Ease::InBack => (BACK_OVERSHOOT + 1.0) * t * t * t - BACK_OVERSHOOT * t * t,
            Ease::OutBack => {
                let u = t - 1.0;
                1.0 + (BACK_OVERSHOOT + 1.0) * u * u * u + BACK_OVERSHOOT * u * u
            }
            Ease::InOutBack => {
                let s = BACK_OVERSHOOT * 1.525;
                if t < 0.5 {
                    ((2.0 * t).powi(2) * ((s + 1.0) * 2.0 * t - s)) * 0.5
                } else {
                    ((2.0 * t - 2.0).powi(2) * ((s + 1.0) * (t * 2.0 - 2.0) + s) + 2.0) * 0.5
                }
            }

            Ease::InBounce => 1.0 - bounce_out(1.0 - t),
            Ease::OutBounce => bounce_out(t),
            Ease::InOutBounce => {
                if t < 0.5 {
                    (1.0 - bounce_out(1.0 - 2.0 * t)) * 0.5
                } else {
                    (1.0 + bounce_out(2.0 * t - 1.0)) * 0.5
                }
            }

            Ease::CubicBezier(x1, y1, x2, y2) => cubic_bezier_ease(t, x1, y1, x2, y2),

            // Custom needs the curve object; `evaluate` supplies it
            Ease::Custom => t,
        }
    }
}

/// Evaluate an easing kind, routing `Custom` through the supplied curve.
pub fn evaluate(ease: Ease, t: f32, custom: Option<&EaseCurve>) -> f32 {
    match (ease, custom) {
        (Ease::Custom, Some(curve)) => curve(t),
        _ => ease.apply(t),
    }
}

/// Four-segment piecewise parabola
fn bounce_out(t: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;

    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let u = t - 1.5 / D1;
        N1 * u * u + 0.75
    } else if t < 2.5 / D1 {
        let u = t - 2.25 / D1;
        N1 * u * u + 0.9375
    } else {
        let u = t - 2.625 / D1;
        N1 * u * u + 0.984375
    }
}

/// Cubic bezier easing calculation (matches CSS spec / browser implementations).
///
/// Uses Newton-Raphson with binary-search fallback for robustness.
/// Computes in f64 internally to avoid f32 precision jitter at 120fps.
fn cubic_bezier_ease(t: f32, x1: f32, y1: f32, x2: f32, y2: f32) -> f32 {
    // Endpoints are always exact
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }

    let x = t as f64;
    let x1 = x1 as f64;
    let y1 = y1 as f64;
    let x2 = x2 as f64;
    let y2 = y2 as f64;

    // Solve for parameter `p` where bezier_x(p) == x using Newton-Raphson,
    // falling back to binary search if the slope is too flat.
    let mut p = x;
    for _ in 0..8 {
        let err = bezier_sample(p, x1, x2) - x;
        if err.abs() < 1e-7 {
            return bezier_sample(p, y1, y2) as f32;
        }
        let slope = bezier_slope(p, x1, x2);
        if slope.abs() < 1e-7 {
            break;
        }
        p -= err / slope;
    }

    // Binary search fallback (always converges)
    let mut lo = 0.0_f64;
    let mut hi = 1.0_f64;
    p = x;
    for _ in 0..20 {
        let val = bezier_sample(p, x1, x2);
        if (val - x).abs() < 1e-7 {
            break;
        }
        if val < x {
            lo = p;
        } else {
            hi = p;
        }
        p = (lo + hi) * 0.5;
    }

    bezier_sample(p, y1, y2) as f32
}

/// Evaluate cubic bezier at parameter t: B(t) = 3(1-t)²t·p1 + 3(1-t)t²·p2 + t³
#[inline]
fn bezier_sample(t: f64, p1: f64, p2: f64) -> f64 {
    // Horner form: ((1-3p2+3p1)t + 3p2-6p1)t + 3p1) * t
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    ((a * t + b) * t + c) * t
}

/// Derivative of cubic bezier: B'(t) = 3(1-t)²·p1 + 6(1-t)t·(p2-p1) + 3t²·(1-p2)
#[inline]
fn bezier_slope(t: f64, p1: f64, p2: f64) -> f64 {
    let a = 1.0 - 3.0 * p2 + 3.0 * p1;
    let b = 3.0 * p2 - 6.0 * p1;
    let c = 3.0 * p1;
    (3.0 * a * t + 2.0 * b) * t + c
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: [Ease; 31] = [
        Ease::Linear,
        Ease::InQuad,
        Ease::OutQuad,
        Ease::InOutQuad,
        Ease::InCubic,
        Ease::OutCubic,
        Ease::InOutCubic,
        Ease::InQuart,
        Ease::OutQuart,
        Ease::InOutQuart,
        Ease::InQuint,
        Ease::OutQuint,
        Ease::InOutQuint,
        Ease::InSine,
        Ease::OutSine,
        Ease::InOutSine,
        Ease::InExpo,
        Ease::OutExpo,
        Ease::InOutExpo,
        Ease::InCirc,
        Ease::OutCirc,
        Ease::InOutCirc,
        Ease::InElastic,
        Ease::OutElastic,
        Ease::InOutElastic,
        Ease::InBack,
        Ease::OutBack,
        Ease::InOutBack,
        Ease::InBounce,
        Ease::OutBounce,
        Ease::InOutBounce,
    ];

    #[test]
    fn test_linear_returns_input() {
        assert!((Ease::Linear.apply(0.0)).abs() < 1e-6);
        assert!((Ease::Linear.apply(0.5) - 0.5).abs() < 1e-6);
        assert!((Ease::Linear.apply(1.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_all_kinds_start_at_zero() {
        for kind in ALL_KINDS {
            let v = kind.apply(0.0);
            assert!(v.abs() < 1e-2, "{kind:?} should start at 0, got {v}");
        }
    }

    #[test]
    fn test_all_kinds_end_at_one() {
        for kind in ALL_KINDS {
            let v = kind.apply(1.0);
            assert!((v - 1.0).abs() < 1e-2, "{kind:?} should end at 1, got {v}");
        }
    }

    #[test]
    fn test_out_quad_is_faster_at_start() {
        assert!(Ease::OutQuad.apply(0.5) > 0.5);
    }

    #[test]
    fn test_in_quad_is_slower_at_start() {
        assert!(Ease::InQuad.apply(0.5) < 0.5);
    }

    #[test]
    fn test_in_out_quad_is_symmetric() {
        let sum = Ease::InOutQuad.apply(0.25) + Ease::InOutQuad.apply(0.75);
        assert!((sum - 1.0).abs() < 1e-2);
        let sum = Ease::InOutCubic.apply(0.25) + Ease::InOutCubic.apply(0.75);
        assert!((sum - 1.0).abs() < 1e-2);
    }

    #[test]
    fn test_out_back_overshoots() {
        let mut peak = 0.0f32;
        let mut t = 0.0f32;
        while t <= 1.0 {
            peak = peak.max(Ease::OutBack.apply(t));
            t += 0.01;
        }
        assert!(peak > 1.0, "OutBack should overshoot past 1.0, peaked at {peak}");
    }

    #[test]
    fn test_out_bounce_stays_in_range() {
        for t in [0.3f32, 0.5, 0.7] {
            let v = Ease::OutBounce.apply(t);
            assert!(v >= 0.0 && v <= 1.0 + 1e-3);
        }
    }

    #[test]
    fn test_out_elastic_is_finite() {
        for i in 0..=100 {
            let v = Ease::OutElastic.apply(i as f32 / 100.0);
            assert!(v.is_finite());
        }
    }

    #[test]
    fn test_cubic_bezier_identity_curve() {
        // (0,0)/(1,1) control points degenerate to the identity
        let kind = Ease::CubicBezier(0.0, 0.0, 1.0, 1.0);
        for i in 0..=10 {
            let t = i as f32 / 10.0;
            assert!((kind.apply(t) - t).abs() < 1e-3);
        }
    }

    #[test]
    fn test_evaluate_routes_custom_curve() {
        let curve: EaseCurve = Rc::new(|t| t * t);
        assert!((evaluate(Ease::Custom, 0.5, Some(&curve)) - 0.25).abs() < 1e-6);
        // Without a curve the kind degrades to linear
        assert!((evaluate(Ease::Custom, 0.5, None) - 0.5).abs() < 1e-6);
        // Non-custom kinds ignore the curve
        assert!((evaluate(Ease::Linear, 0.5, Some(&curve)) - 0.5).abs() < 1e-6);
    }
}
