use lw_core::error::CoreError;
use lw_core::geometry::HALF_SPAN;
use lw_core::tunables::TunableValue;

use crate::context::EffectContext;
use crate::effect::Effect;
use crate::meta::{EffectFamily, EffectMeta, tags};
use crate::params::{self, ParamDescriptor, f32_param};

static META: EffectMeta = EffectMeta {
    name: "beat-pulse",
    family: EffectFamily::Rhythmic,
    tags: tags::AUDIO_REACTIVE | tags::CENTRE_ORIGIN | tags::TEMPO_SYNCED,
    centre_origin: true,
    stateful: false,
    lgp_sensitive: false,
};

static PARAMS: &[ParamDescriptor] = &[
    f32_param("ring-speed", 90.0, 10.0, 300.0, "motion"),
    f32_param("ring-width", 7.0, 1.0, 30.0, "motion"),
    f32_param("decay", 2.2, 0.2, 10.0, "level"),
];

/// Un anneau part de la paire centrale à chaque beat et court vers les
/// bords en s'éteignant. La nouveauté nourrit un fond respirant.
pub struct BeatPulse {
    ring_speed: f32,
    ring_width: f32,
    decay: f32,
    /// Ring position in LEDs from centre; negative = no active ring.
    ring_pos: f32,
    ring_level: f32,
}

impl BeatPulse {
    /// Defaults from the parameter table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ring_speed: 90.0,
            ring_width: 7.0,
            decay: 2.2,
            ring_pos: -1.0,
            ring_level: 0.0,
        }
    }
}

impl Default for BeatPulse {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for BeatPulse {
    fn meta(&self) -> &'static EffectMeta {
        &META
    }

    fn param_descriptors(&self) -> &'static [ParamDescriptor] {
        PARAMS
    }

    fn get_param(&self, name: &str) -> Option<TunableValue> {
        match name {
            "ring-speed" => Some(TunableValue::F32(self.ring_speed)),
            "ring-width" => Some(TunableValue::F32(self.ring_width)),
            "decay" => Some(TunableValue::F32(self.decay)),
            _ => None,
        }
    }

    fn set_param(&mut self, name: &str, value: TunableValue) -> Result<(), CoreError> {
        let desc = params::find(PARAMS, name)
            .ok_or_else(|| CoreError::not_found(format!("parameter '{name}'")))?;
        desc.validate(value)?;
        match (name, value) {
            ("ring-speed", TunableValue::F32(v)) => self.ring_speed = v,
            ("ring-width", TunableValue::F32(v)) => self.ring_width = v,
            ("decay", TunableValue::F32(v)) => self.decay = v,
            _ => {}
        }
        Ok(())
    }

    fn render(&mut self, ctx: &mut EffectContext) {
        if ctx.audio.beat_tick {
            self.ring_pos = 0.0;
            self.ring_level = 1.0;
        }
        if self.ring_pos >= 0.0 {
            self.ring_pos += self.ring_speed * ctx.dt;
            self.ring_level *= (-self.decay * ctx.dt).exp();
            if self.ring_pos > HALF_SPAN as f32 + self.ring_width {
                self.ring_pos = -1.0;
                self.ring_level = 0.0;
            }
        }

        let base = 0.06 + 0.25 * ctx.audio.novelty;
        let base_colour = ctx.palette.sample(0.1 + ctx.audio.beat_phase * 0.2);
        for d in 0..HALF_SPAN {
            let mut level = base * (1.0 - d as f32 / HALF_SPAN as f32);
            if self.ring_pos >= 0.0 {
                let dist = (d as f32 - self.ring_pos).abs();
                if dist < self.ring_width {
                    level += self.ring_level * (1.0 - dist / self.ring_width);
                }
            }
            ctx.frame
                .centre_pair(d, base_colour.scaled(level.min(1.0)));
        }
    }

    fn reset(&mut self) {
        self.ring_pos = -1.0;
        self.ring_level = 0.0;
    }
}
