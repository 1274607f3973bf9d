use lw_core::error::CoreError;
use lw_core::snapshot::ChordType;
use lw_core::tunables::TunableValue;

use crate::context::EffectContext;
use crate::effect::Effect;
use crate::meta::{EffectFamily, EffectMeta, tags};
use crate::params::{self, ParamDescriptor, f32_param};

static META: EffectMeta = EffectMeta {
    name: "chord-glow",
    family: EffectFamily::Harmonic,
    tags: tags::AUDIO_REACTIVE | tags::HARMONIC | tags::AMBIENT_SAFE,
    centre_origin: false,
    stateful: false,
    lgp_sensitive: false,
};

static PARAMS: &[ParamDescriptor] = &[
    f32_param("breathe", 0.3, 0.0, 1.0, "motion"),
    f32_param("floor", 0.1, 0.0, 1.0, "level"),
];

/// Lueur pleine-barre colorée par la fondamentale de l'accord ; la
/// confiance pilote la saturation de l'ensemble, la phase du beat fait
/// respirer. Les qualités mineures/diminuées tirent vers le bas de la
/// palette.
pub struct ChordGlow {
    breathe: f32,
    floor: f32,
    /// Smoothed palette position, so chord changes glide.
    hue_pos: f32,
}

impl ChordGlow {
    /// Defaults from the parameter table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            breathe: 0.3,
            floor: 0.1,
            hue_pos: 0.0,
        }
    }
}

impl Default for ChordGlow {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for ChordGlow {
    fn meta(&self) -> &'static EffectMeta {
        &META
    }

    fn param_descriptors(&self) -> &'static [ParamDescriptor] {
        PARAMS
    }

    fn get_param(&self, name: &str) -> Option<TunableValue> {
        match name {
            "breathe" => Some(TunableValue::F32(self.breathe)),
            "floor" => Some(TunableValue::F32(self.floor)),
            _ => None,
        }
    }

    fn set_param(&mut self, name: &str, value: TunableValue) -> Result<(), CoreError> {
        let desc = params::find(PARAMS, name)
            .ok_or_else(|| CoreError::not_found(format!("parameter '{name}'")))?;
        desc.validate(value)?;
        match (name, value) {
            ("breathe", TunableValue::F32(v)) => self.breathe = v,
            ("floor", TunableValue::F32(v)) => self.floor = v,
            _ => {}
        }
        Ok(())
    }

    fn render(&mut self, ctx: &mut EffectContext) {
        let target = f32::from(ctx.audio.chord_root) / 12.0
            + match ctx.audio.chord_type {
                ChordType::Major => 0.0,
                ChordType::Minor => 0.04,
                ChordType::Diminished => 0.07,
                ChordType::Augmented => 0.02,
            };
        self.hue_pos += (target - self.hue_pos) * (2.5 * ctx.dt).min(1.0);

        let breath = 1.0 - self.breathe * (ctx.audio.beat_phase * std::f32::consts::TAU).sin().abs();
        let level = (self.floor
            + (1.0 - self.floor) * ctx.audio.chord_confidence.max(ctx.audio.rms * 0.5))
            * breath;
        let colour = ctx.palette.sample(self.hue_pos).scaled(level.min(1.0));
        for p in &mut ctx.frame.px {
            *p = colour;
        }
    }
}
