use lw_core::error::CoreError;
use lw_core::geometry::{LED_COUNT, LEDS_PER_STRIP};
use lw_core::tunables::TunableValue;

use crate::context::EffectContext;
use crate::effect::Effect;
use crate::meta::{EffectFamily, EffectMeta, tags};
use crate::params::{self, ParamDescriptor, f32_param};

static META: EffectMeta = EffectMeta {
    name: "chroma-wheel",
    family: EffectFamily::Harmonic,
    tags: tags::AUDIO_REACTIVE | tags::HARMONIC,
    centre_origin: false,
    stateful: false,
    lgp_sensitive: false,
};

static PARAMS: &[ParamDescriptor] = &[
    f32_param("gain", 1.2, 0.0, 4.0, "level"),
    ParamDescriptor {
        name: "smooth",
        default: TunableValue::Bool(true),
        min: None,
        max: None,
        step: None,
        group: "audio",
        advanced: false,
    },
    f32_param("rotate", 0.05, 0.0, 2.0, "motion"),
];

/// Douze segments par ruban, un par classe de hauteur, chacun coloré par
/// la palette et pesé par l'énergie chroma. La roue tourne lentement.
pub struct ChromaWheel {
    gain: f32,
    smooth: bool,
    rotate: f32,
    phase: f32,
}

impl ChromaWheel {
    /// Defaults from the parameter table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            gain: 1.2,
            smooth: true,
            rotate: 0.05,
            phase: 0.0,
        }
    }
}

impl Default for ChromaWheel {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for ChromaWheel {
    fn meta(&self) -> &'static EffectMeta {
        &META
    }

    fn param_descriptors(&self) -> &'static [ParamDescriptor] {
        PARAMS
    }

    fn get_param(&self, name: &str) -> Option<TunableValue> {
        match name {
            "gain" => Some(TunableValue::F32(self.gain)),
            "smooth" => Some(TunableValue::Bool(self.smooth)),
            "rotate" => Some(TunableValue::F32(self.rotate)),
            _ => None,
        }
    }

    fn set_param(&mut self, name: &str, value: TunableValue) -> Result<(), CoreError> {
        let desc = params::find(PARAMS, name)
            .ok_or_else(|| CoreError::not_found(format!("parameter '{name}'")))?;
        desc.validate(value)?;
        match (name, value) {
            ("gain", TunableValue::F32(v)) => self.gain = v,
            ("smooth", TunableValue::Bool(v)) => self.smooth = v,
            ("rotate", TunableValue::F32(v)) => self.rotate = v,
            _ => {}
        }
        Ok(())
    }

    fn render(&mut self, ctx: &mut EffectContext) {
        self.phase = (self.phase + ctx.dt * self.rotate).rem_euclid(1.0);
        let chroma = if self.smooth {
            &ctx.audio.heavy_chroma
        } else {
            &ctx.audio.chroma
        };
        let seg = LEDS_PER_STRIP / 12 + 1;
        for i in 0..LED_COUNT {
            let local = i % LEDS_PER_STRIP;
            let class = (local / seg + (self.phase * 12.0) as usize) % 12;
            let level = (chroma[class] * self.gain).clamp(0.0, 1.0);
            ctx.frame.px[i] = ctx.palette.sample(class as f32 / 12.0).scaled(level);
        }
    }
}
