use lw_core::error::CoreError;
use lw_core::geometry::HALF_SPAN;
use lw_core::tunables::TunableValue;

use crate::context::EffectContext;
use crate::effect::Effect;
use crate::meta::{EffectFamily, EffectMeta, tags};
use crate::params::{self, ParamDescriptor, f32_param};

static META: EffectMeta = EffectMeta {
    name: "spectrum-bloom",
    family: EffectFamily::Spectral,
    tags: tags::AUDIO_REACTIVE | tags::CENTRE_ORIGIN,
    centre_origin: true,
    stateful: false,
    lgp_sensitive: false,
};

static PARAMS: &[ParamDescriptor] = &[
    f32_param("gain", 1.0, 0.0, 4.0, "level"),
    ParamDescriptor {
        name: "adaptive",
        default: TunableValue::Bool(true),
        min: None,
        max: None,
        step: None,
        group: "audio",
        advanced: false,
    },
    f32_param("curve", 1.6, 0.5, 4.0, "level"),
];

/// Le spectre 64 bins déplié du centre vers les bords : graves au centre,
/// aigus aux extrémités. Par défaut sur les bins adaptatifs — la forme,
/// pas la loudness.
pub struct SpectrumBloom {
    gain: f32,
    adaptive: bool,
    curve: f32,
}

impl SpectrumBloom {
    /// Defaults from the parameter table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            gain: 1.0,
            adaptive: true,
            curve: 1.6,
        }
    }
}

impl Default for SpectrumBloom {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for SpectrumBloom {
    fn meta(&self) -> &'static EffectMeta {
        &META
    }

    fn param_descriptors(&self) -> &'static [ParamDescriptor] {
        PARAMS
    }

    fn get_param(&self, name: &str) -> Option<TunableValue> {
        match name {
            "gain" => Some(TunableValue::F32(self.gain)),
            "adaptive" => Some(TunableValue::Bool(self.adaptive)),
            "curve" => Some(TunableValue::F32(self.curve)),
            _ => None,
        }
    }

    fn set_param(&mut self, name: &str, value: TunableValue) -> Result<(), CoreError> {
        let desc = params::find(PARAMS, name)
            .ok_or_else(|| CoreError::not_found(format!("parameter '{name}'")))?;
        desc.validate(value)?;
        match (name, value) {
            ("gain", TunableValue::F32(v)) => self.gain = v,
            ("adaptive", TunableValue::Bool(v)) => self.adaptive = v,
            ("curve", TunableValue::F32(v)) => self.curve = v,
            _ => {}
        }
        Ok(())
    }

    fn render(&mut self, ctx: &mut EffectContext) {
        let bins = if self.adaptive {
            &ctx.audio.bins64_adaptive
        } else {
            &ctx.audio.bins64
        };
        for d in 0..HALF_SPAN {
            // d=0 is the lowest bin at the centre; bins fan outward.
            let bin = (d * bins.len()) / HALF_SPAN;
            let level = (bins[bin] * self.gain).clamp(0.0, 1.0).powf(self.curve);
            let colour = ctx
                .palette
                .sample(bin as f32 / bins.len() as f32)
                .scaled(level);
            ctx.frame.centre_pair(d, colour);
        }
    }
}
