use lw_core::error::CoreError;
use lw_core::geometry::HALF_SPAN;
use lw_core::tunables::TunableValue;

use crate::context::EffectContext;
use crate::effect::Effect;
use crate::meta::{EffectFamily, EffectMeta, tags};
use crate::params::{self, ParamDescriptor, f32_param};

static META: EffectMeta = EffectMeta {
    name: "aurora",
    family: EffectFamily::Ambient,
    tags: tags::AUDIO_REACTIVE | tags::CENTRE_ORIGIN | tags::AMBIENT_SAFE,
    centre_origin: true,
    stateful: false,
    lgp_sensitive: false,
};

static PARAMS: &[ParamDescriptor] = &[
    f32_param("speed", 0.35, 0.0, 4.0, "motion"),
    f32_param("span", 1.4, 0.2, 4.0, "motion"),
    f32_param("audio-drive", 0.5, 0.0, 2.0, "audio"),
];

/// Champ de palette qui ondule depuis la paire centrale. L'effet de boot :
/// lisible dans le silence, s'anime avec les basses.
pub struct Aurora {
    speed: f32,
    span: f32,
    audio_drive: f32,
    phase: f32,
}

impl Aurora {
    /// Defaults from the parameter table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            speed: 0.35,
            span: 1.4,
            audio_drive: 0.5,
            phase: 0.0,
        }
    }
}

impl Default for Aurora {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Aurora {
    fn meta(&self) -> &'static EffectMeta {
        &META
    }

    fn param_descriptors(&self) -> &'static [ParamDescriptor] {
        PARAMS
    }

    fn get_param(&self, name: &str) -> Option<TunableValue> {
        match name {
            "speed" => Some(TunableValue::F32(self.speed)),
            "span" => Some(TunableValue::F32(self.span)),
            "audio-drive" => Some(TunableValue::F32(self.audio_drive)),
            _ => None,
        }
    }

    fn set_param(&mut self, name: &str, value: TunableValue) -> Result<(), CoreError> {
        let desc = params::find(PARAMS, name)
            .ok_or_else(|| CoreError::not_found(format!("parameter '{name}'")))?;
        desc.validate(value)?;
        match (name, value) {
            ("speed", TunableValue::F32(v)) => self.speed = v,
            ("span", TunableValue::F32(v)) => self.span = v,
            ("audio-drive", TunableValue::F32(v)) => self.audio_drive = v,
            _ => {}
        }
        Ok(())
    }

    fn render(&mut self, ctx: &mut EffectContext) {
        let bass = ctx.audio.heavy_bands8[0].max(ctx.audio.heavy_bands8[1]);
        self.phase += ctx.dt * (self.speed + bass * self.audio_drive);

        let level = 0.35 + 0.65 * ctx.audio.rms.min(1.0);
        for d in 0..HALF_SPAN {
            let x = d as f32 / HALF_SPAN as f32;
            let t = self.phase + x * self.span;
            let colour = ctx.palette.sample(t).scaled(level * (1.0 - x * 0.3));
            ctx.frame.centre_pair(d, colour);
        }
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}
