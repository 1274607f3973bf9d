/// Courbes d'easing et état d'un cross-fade en cours.
///
/// L'ensemble des courbes est fermé et exposé par index — le contrat
/// externe (REST `curve_id`) référence ces positions, ne jamais les
/// réordonner.

/// The closed easing set, exposed by index 0..11.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Curve {
    /// Straight line.
    #[default]
    Linear,
    /// Quadratic ease-in.
    EaseIn,
    /// Quadratic ease-out.
    EaseOut,
    /// Quadratic ease-in-out.
    EaseInOut,
    /// Half-sine.
    Sine,
    /// Quartic in-out (steeper shoulders than EaseInOut).
    QuartInOut,
    /// Cubic in-out.
    CubicInOut,
    /// Exponential out.
    ExpoOut,
    /// Overshooting back-out.
    BackOut,
    /// Damped elastic out.
    ElasticOut,
    /// Bouncing out.
    BounceOut,
}

/// All curves, in index order.
pub const CURVES: [Curve; 11] = [
    Curve::Linear,
    Curve::EaseIn,
    Curve::EaseOut,
    Curve::EaseInOut,
    Curve::Sine,
    Curve::QuartInOut,
    Curve::CubicInOut,
    Curve::ExpoOut,
    Curve::BackOut,
    Curve::ElasticOut,
    Curve::BounceOut,
];

impl Curve {
    /// Curve for an index, `None` past the closed set.
    #[must_use]
    pub fn from_index(i: u8) -> Option<Curve> {
        CURVES.get(usize::from(i)).copied()
    }

    /// Index of this curve in the exposed set.
    #[must_use]
    pub fn index(self) -> u8 {
        CURVES.iter().position(|&c| c == self).unwrap_or(0) as u8
    }

    /// Lowercase name for API listings.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Curve::Linear => "linear",
            Curve::EaseIn => "ease-in",
            Curve::EaseOut => "ease-out",
            Curve::EaseInOut => "ease-in-out",
            Curve::Sine => "sine",
            Curve::QuartInOut => "quart-in-out",
            Curve::CubicInOut => "cubic-in-out",
            Curve::ExpoOut => "expo-out",
            Curve::BackOut => "back-out",
            Curve::ElasticOut => "elastic-out",
            Curve::BounceOut => "bounce-out",
        }
    }

    /// Apply the easing to `t ∈ [0, 1]`.
    #[must_use]
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Curve::Linear => t,
            Curve::EaseIn => t * t,
            Curve::EaseOut => t * (2.0 - t),
            Curve::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - 2.0 * (1.0 - t) * (1.0 - t)
                }
            }
            Curve::Sine => (t * std::f32::consts::FRAC_PI_2).sin(),
            Curve::QuartInOut => {
                if t < 0.5 {
                    8.0 * t * t * t * t
                } else {
                    let u = 1.0 - t;
                    1.0 - 8.0 * u * u * u * u
                }
            }
            Curve::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = 1.0 - t;
                    1.0 - 4.0 * u * u * u
                }
            }
            Curve::ExpoOut => {
                if t >= 1.0 {
                    1.0
                } else {
                    1.0 - 2.0f32.powf(-10.0 * t)
                }
            }
            Curve::BackOut => {
                let u = t - 1.0;
                1.0 + u * u * (2.70158 * u + 1.70158)
            }
            Curve::ElasticOut => {
                if t <= 0.0 {
                    0.0
                } else if t >= 1.0 {
                    1.0
                } else {
                    let c = std::f32::consts::TAU / 3.0;
                    2.0f32.powf(-10.0 * t) * ((t * 10.0 - 0.75) * c).sin() + 1.0
                }
            }
            Curve::BounceOut => {
                let n1 = 7.5625;
                let d1 = 2.75;
                if t < 1.0 / d1 {
                    n1 * t * t
                } else if t < 2.0 / d1 {
                    let u = t - 1.5 / d1;
                    n1 * u * u + 0.75
                } else if t < 2.5 / d1 {
                    let u = t - 2.25 / d1;
                    n1 * u * u + 0.9375
                } else {
                    let u = t - 2.625 / d1;
                    n1 * u * u + 0.984_375
                }
            }
        }
    }
}

/// Un cross-fade en cours : temps accumulé et courbe. Le poids 1.0 marque
/// la fin — l'effet précédent est alors lâché.
pub struct Transition {
    elapsed: f32,
    duration: f32,
    curve: Curve,
}

impl Transition {
    /// Start a fade over `duration` seconds.
    #[must_use]
    pub fn new(duration: f32, curve: Curve) -> Self {
        Self {
            elapsed: 0.0,
            duration: duration.max(1e-3),
            curve,
        }
    }

    /// Advance by `dt` and return the eased blend weight in [0, 1]
    /// (0 = fully previous, 1 = fully current).
    pub fn advance(&mut self, dt: f32) -> f32 {
        self.elapsed += dt;
        self.weight()
    }

    /// Current eased weight without advancing.
    #[must_use]
    pub fn weight(&self) -> f32 {
        self.curve.apply((self.elapsed / self.duration).min(1.0))
    }

    /// Whether the fade has fully arrived.
    #[must_use]
    pub fn done(&self) -> bool {
        self.elapsed >= self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_curve_hits_both_endpoints() {
        for curve in CURVES {
            assert!(curve.apply(0.0).abs() < 1e-3, "{curve:?} at 0");
            assert!((curve.apply(1.0) - 1.0).abs() < 1e-3, "{curve:?} at 1");
        }
    }

    #[test]
    fn indices_round_trip() {
        for (i, curve) in CURVES.iter().enumerate() {
            assert_eq!(Curve::from_index(i as u8), Some(*curve));
            assert_eq!(curve.index(), i as u8);
        }
        assert_eq!(Curve::from_index(CURVES.len() as u8), None);
    }

    #[test]
    fn linear_midpoint_is_half() {
        let mut t = Transition::new(0.5, Curve::Linear);
        let w = t.advance(0.25);
        assert!((w - 0.5).abs() < 1e-6);
        assert!(!t.done());
        t.advance(0.25);
        assert!(t.done());
    }
}
