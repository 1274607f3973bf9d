use lw_core::color::desaturate;
use lw_core::frame::LedFrame;
use lw_core::tunables::{TunableDesc, TunableStore, TunableValue};

/// Paramètres de correction, tirés des tunables du groupe `correction`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CorrectionParams {
    /// Master switch for the whole engine.
    pub enabled: bool,
    /// Auto-exposure stage on/off.
    pub auto_exposure: bool,
    /// Target mean luminance [0, 255] for auto-exposure.
    pub exposure_target: f32,
    /// Soft gamma (1.0 = identity).
    pub gamma: f32,
    /// Guardrail stage (off by default).
    pub guardrails: bool,
    /// Apply even to LGP-sensitive/stateful effects.
    pub force: bool,
}

impl Default for CorrectionParams {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_exposure: true,
            exposure_target: 110.0,
            gamma: 2.2,
            guardrails: false,
            force: false,
        }
    }
}

impl CorrectionParams {
    /// Register the `correction.*` tunables with their defaults.
    pub fn register_tunables(store: &TunableStore) {
        let defaults = CorrectionParams::default();
        let bool_desc = |name, default| TunableDesc {
            name,
            group: "correction",
            default: TunableValue::Bool(default),
            min: None,
            max: None,
            persistent: true,
        };
        let _ = store.register(bool_desc("correction.enabled", defaults.enabled));
        let _ = store.register(bool_desc("correction.auto_exposure", defaults.auto_exposure));
        let _ = store.register(TunableDesc {
            name: "correction.exposure_target",
            group: "correction",
            default: TunableValue::F32(defaults.exposure_target),
            min: Some(TunableValue::F32(10.0)),
            max: Some(TunableValue::F32(255.0)),
            persistent: true,
        });
        let _ = store.register(TunableDesc {
            name: "correction.gamma",
            group: "correction",
            default: TunableValue::F32(defaults.gamma),
            min: Some(TunableValue::F32(0.5)),
            max: Some(TunableValue::F32(4.0)),
            persistent: true,
        });
        let _ = store.register(bool_desc("correction.guardrails", defaults.guardrails));
        let _ = store.register(bool_desc("correction.force", defaults.force));
    }

    /// Read the current values back from the store.
    #[must_use]
    pub fn from_store(store: &TunableStore) -> Self {
        let defaults = CorrectionParams::default();
        Self {
            enabled: store.get("correction.enabled").unwrap_or(defaults.enabled),
            auto_exposure: store
                .get("correction.auto_exposure")
                .unwrap_or(defaults.auto_exposure),
            exposure_target: store
                .get("correction.exposure_target")
                .unwrap_or(defaults.exposure_target),
            gamma: store.get("correction.gamma").unwrap_or(defaults.gamma),
            guardrails: store
                .get("correction.guardrails")
                .unwrap_or(defaults.guardrails),
            force: store.get("correction.force").unwrap_or(defaults.force),
        }
    }
}

/// Correction couleur de sortie : exposition automatique, gamma doux par
/// LUT, garde-fous optionnels.
///
/// CONTRAINTE : opère exclusivement sur la copie de sortie. Le buffer
/// back que le scheduler a confié à l'effet n'est jamais touché — les
/// effets stateful relisent leur propre sortie à la frame suivante.
pub struct ColorCorrector {
    params: CorrectionParams,
    lut: [u8; 256],
    /// Smoothed auto-exposure gain.
    gain: f32,
}

impl ColorCorrector {
    /// Build with defaults; the LUT is precomputed here.
    #[must_use]
    pub fn new(params: CorrectionParams) -> Self {
        let mut corrector = Self {
            params,
            lut: [0; 256],
            gain: 1.0,
        };
        corrector.rebuild_lut();
        corrector
    }

    /// Adopt new parameters; the LUT is rebuilt only when gamma moved.
    pub fn set_params(&mut self, params: CorrectionParams) {
        let gamma_changed = (params.gamma - self.params.gamma).abs() > 1e-3;
        self.params = params;
        if gamma_changed {
            self.rebuild_lut();
        }
    }

    /// Current parameters.
    #[must_use]
    pub fn params(&self) -> CorrectionParams {
        self.params
    }

    /// Correct the output copy in place. `opt_out` comes from the effect
    /// metadata (LGP-sensitive or stateful) and wins unless forced.
    pub fn apply(&mut self, out: &mut LedFrame, opt_out: bool) {
        if !self.params.enabled || (opt_out && !self.params.force) {
            return;
        }

        if self.params.auto_exposure {
            let mut sum = 0u32;
            for p in &out.px {
                sum += u32::from(p.luminance());
            }
            let mean = sum as f32 / out.px.len() as f32;
            if mean > 1.0 {
                let target_gain = (self.params.exposure_target / mean).clamp(0.6, 1.6);
                self.gain += (target_gain - self.gain) * 0.08;
            } else {
                self.gain += (1.0 - self.gain) * 0.08;
            }
            if (self.gain - 1.0).abs() > 1e-3 {
                for p in &mut out.px {
                    *p = p.scaled(self.gain);
                }
            }
        }

        for p in &mut out.px {
            p.r = self.lut[usize::from(p.r)];
            p.g = self.lut[usize::from(p.g)];
            p.b = self.lut[usize::from(p.b)];
        }

        if self.params.guardrails {
            for p in &mut out.px {
                let min = p.r.min(p.g).min(p.b);
                let max = p.r.max(p.g).max(p.b);
                // Near-white: all channels hot, barely any hue left.
                if min > 225 {
                    *p = desaturate(*p, 0.25);
                // Near-brown: warm, dark, compressed colours that LEDs
                // render as muddy orange.
                } else if p.r > p.g && p.g > p.b && max < 140 && p.r - p.b < 90 {
                    *p = desaturate(*p, 0.15);
                }
            }
        }
    }

    fn rebuild_lut(&mut self) {
        let gamma = self.params.gamma.max(0.1);
        for (i, v) in self.lut.iter_mut().enumerate() {
            let x = i as f32 / 255.0;
            *v = (x.powf(gamma) * 255.0).round().min(255.0) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lw_core::pixel::Rgb8;

    #[test]
    fn disabled_engine_is_identity() {
        let mut c = ColorCorrector::new(CorrectionParams {
            enabled: false,
            ..CorrectionParams::default()
        });
        let mut frame = LedFrame::default();
        frame.px[0] = Rgb8::new(10, 200, 30);
        let before = frame.px[0];
        c.apply(&mut frame, false);
        assert_eq!(frame.px[0], before);
    }

    #[test]
    fn opt_out_skips_correction_unless_forced() {
        let mut c = ColorCorrector::new(CorrectionParams::default());
        let mut frame = LedFrame::default();
        frame.px[7] = Rgb8::new(100, 100, 100);
        let before = frame.px[7];
        c.apply(&mut frame, true);
        assert_eq!(frame.px[7], before);

        c.set_params(CorrectionParams {
            force: true,
            auto_exposure: false,
            ..CorrectionParams::default()
        });
        c.apply(&mut frame, true);
        assert_ne!(frame.px[7], before); // gamma moved it
    }

    #[test]
    fn gamma_darkens_midtones() {
        let mut c = ColorCorrector::new(CorrectionParams {
            auto_exposure: false,
            ..CorrectionParams::default()
        });
        let mut frame = LedFrame::default();
        frame.px[0] = Rgb8::new(128, 128, 128);
        c.apply(&mut frame, false);
        assert!(frame.px[0].r < 128);
        // Endpoints stay put.
        let mut frame = LedFrame::default();
        frame.px[0] = Rgb8::new(255, 0, 255);
        c.apply(&mut frame, false);
        assert_eq!(frame.px[0], Rgb8::new(255, 0, 255));
    }

    #[test]
    fn guardrails_pull_near_white_towards_grey() {
        let mut c = ColorCorrector::new(CorrectionParams {
            auto_exposure: false,
            gamma: 1.0,
            guardrails: true,
            ..CorrectionParams::default()
        });
        let mut frame = LedFrame::default();
        frame.px[0] = Rgb8::new(255, 240, 230);
        c.apply(&mut frame, false);
        let p = frame.px[0];
        assert!(p.r - p.b < 25); // spread narrowed
    }
}
