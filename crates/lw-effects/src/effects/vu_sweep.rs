use lw_core::error::CoreError;
use lw_core::geometry::HALF_SPAN;
use lw_core::pixel::Rgb8;
use lw_core::tunables::TunableValue;

use crate::context::EffectContext;
use crate::effect::Effect;
use crate::meta::{EffectFamily, EffectMeta, tags};
use crate::params::{self, ParamDescriptor, f32_param};

static META: EffectMeta = EffectMeta {
    name: "vu-sweep",
    family: EffectFamily::Utility,
    tags: tags::AUDIO_REACTIVE | tags::CENTRE_ORIGIN,
    centre_origin: true,
    stateful: false,
    lgp_sensitive: false,
};

static PARAMS: &[ParamDescriptor] = &[
    f32_param("gain", 1.4, 0.1, 8.0, "level"),
    f32_param("peak-hold", 0.8, 0.0, 5.0, "meter"),
];

/// VU-mètre symétrique : le niveau RMS pousse une barre du centre vers
/// les bords, avec un marqueur de crête qui retombe doucement.
pub struct VuSweep {
    gain: f32,
    peak_hold: f32,
    peak: f32,
    hold_left: f32,
}

impl VuSweep {
    /// Defaults from the parameter table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            gain: 1.4,
            peak_hold: 0.8,
            peak: 0.0,
            hold_left: 0.0,
        }
    }
}

impl Default for VuSweep {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for VuSweep {
    fn meta(&self) -> &'static EffectMeta {
        &META
    }

    fn param_descriptors(&self) -> &'static [ParamDescriptor] {
        PARAMS
    }

    fn get_param(&self, name: &str) -> Option<TunableValue> {
        match name {
            "gain" => Some(TunableValue::F32(self.gain)),
            "peak-hold" => Some(TunableValue::F32(self.peak_hold)),
            _ => None,
        }
    }

    fn set_param(&mut self, name: &str, value: TunableValue) -> Result<(), CoreError> {
        let desc = params::find(PARAMS, name)
            .ok_or_else(|| CoreError::not_found(format!("parameter '{name}'")))?;
        desc.validate(value)?;
        match (name, value) {
            ("gain", TunableValue::F32(v)) => self.gain = v,
            ("peak-hold", TunableValue::F32(v)) => self.peak_hold = v,
            _ => {}
        }
        Ok(())
    }

    fn render(&mut self, ctx: &mut EffectContext) {
        let level = (ctx.audio.fast_rms * self.gain).min(1.0);
        if level >= self.peak {
            self.peak = level;
            self.hold_left = self.peak_hold;
        } else {
            self.hold_left -= ctx.dt;
            if self.hold_left <= 0.0 {
                self.peak = (self.peak - ctx.dt * 0.6).max(level);
            }
        }

        let lit = (level * HALF_SPAN as f32) as usize;
        let peak_d = ((self.peak * HALF_SPAN as f32) as usize).min(HALF_SPAN - 1);
        for d in 0..HALF_SPAN {
            let colour = if d == peak_d && self.peak > 0.01 {
                Rgb8::WHITE
            } else if d < lit {
                ctx.palette.sample(d as f32 / HALF_SPAN as f32)
            } else {
                Rgb8::BLACK
            };
            ctx.frame.centre_pair(d, colour);
        }
    }

    fn reset(&mut self) {
        self.peak = 0.0;
        self.hold_left = 0.0;
    }
}
