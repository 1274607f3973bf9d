use lw_core::error::CoreError;
use lw_core::tunables::TunableValue;

use crate::context::EffectContext;
use crate::effect::Effect;
use crate::meta::{EffectFamily, EffectMeta, tags};
use crate::params::{self, ParamDescriptor, f32_param};

static META: EffectMeta = EffectMeta {
    name: "tempo-strobe",
    family: EffectFamily::Rhythmic,
    tags: tags::AUDIO_REACTIVE | tags::TEMPO_SYNCED,
    centre_origin: false,
    stateful: false,
    lgp_sensitive: true,
};

static PARAMS: &[ParamDescriptor] = &[
    f32_param("flash-decay", 9.0, 1.0, 40.0, "strobe"),
    f32_param("downbeat-boost", 1.6, 1.0, 3.0, "strobe"),
];

/// Flash plein-cadre sur chaque beat, renforcé au premier temps, atténué
/// quand la confiance de tempo est basse. Les rapports flash/noir portent
/// le rythme : LGP-sensible, la correction gamma reste à l'écart.
pub struct TempoStrobe {
    flash_decay: f32,
    downbeat_boost: f32,
    envelope: f32,
}

impl TempoStrobe {
    /// Defaults from the parameter table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            flash_decay: 9.0,
            downbeat_boost: 1.6,
            envelope: 0.0,
        }
    }
}

impl Default for TempoStrobe {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for TempoStrobe {
    fn meta(&self) -> &'static EffectMeta {
        &META
    }

    fn param_descriptors(&self) -> &'static [ParamDescriptor] {
        PARAMS
    }

    fn get_param(&self, name: &str) -> Option<TunableValue> {
        match name {
            "flash-decay" => Some(TunableValue::F32(self.flash_decay)),
            "downbeat-boost" => Some(TunableValue::F32(self.downbeat_boost)),
            _ => None,
        }
    }

    fn set_param(&mut self, name: &str, value: TunableValue) -> Result<(), CoreError> {
        let desc = params::find(PARAMS, name)
            .ok_or_else(|| CoreError::not_found(format!("parameter '{name}'")))?;
        desc.validate(value)?;
        match (name, value) {
            ("flash-decay", TunableValue::F32(v)) => self.flash_decay = v,
            ("downbeat-boost", TunableValue::F32(v)) => self.downbeat_boost = v,
            _ => {}
        }
        Ok(())
    }

    fn render(&mut self, ctx: &mut EffectContext) {
        if ctx.audio.beat_tick {
            let strength = ctx.audio.tempo_confidence.max(0.2);
            self.envelope = if ctx.audio.downbeat_tick {
                (strength * self.downbeat_boost).min(1.0)
            } else {
                strength
            };
        }
        self.envelope *= (-self.flash_decay * ctx.dt).exp();

        let colour = ctx
            .palette
            .sample(0.6 + 0.1 * ctx.audio.beat_phase)
            .scaled(self.envelope);
        for p in &mut ctx.frame.px {
            *p = colour;
        }
    }

    fn reset(&mut self) {
        self.envelope = 0.0;
    }
}
