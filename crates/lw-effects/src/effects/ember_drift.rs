use lw_core::error::CoreError;
use lw_core::geometry::{HALF_SPAN, LEDS_PER_STRIP};
use lw_core::tunables::TunableValue;

use crate::context::EffectContext;
use crate::effect::Effect;
use crate::meta::{EffectFamily, EffectMeta, tags};
use crate::params::{self, ParamDescriptor, f32_param};

static META: EffectMeta = EffectMeta {
    name: "ember-drift",
    family: EffectFamily::Ambient,
    tags: tags::AUDIO_REACTIVE | tags::CENTRE_ORIGIN | tags::AMBIENT_SAFE,
    centre_origin: true,
    stateful: true,
    lgp_sensitive: true,
};

static PARAMS: &[ParamDescriptor] = &[
    f32_param("cooling", 0.92, 0.5, 0.999, "fire"),
    f32_param("spark-drive", 1.2, 0.0, 4.0, "fire"),
    f32_param("drift", 0.55, 0.0, 1.0, "fire"),
];

/// Braise à rétroaction : chaque frame refroidit la précédente, injecte
/// des étincelles au centre pesées par les basses, et laisse la chaleur
/// dériver vers les bords. Dépend du buffer de la frame précédente —
/// stateful, et LGP-sensible : les rapports d'amplitude SONT l'effet.
pub struct EmberDrift {
    cooling: f32,
    spark_drive: f32,
    drift: f32,
    /// Heat field per centre distance, the feedback state that is not in
    /// the frame itself (colour mapping loses precision).
    heat: [f32; HALF_SPAN],
}

impl EmberDrift {
    /// Defaults from the parameter table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            cooling: 0.92,
            spark_drive: 1.2,
            drift: 0.55,
            heat: [0.0; HALF_SPAN],
        }
    }
}

impl Default for EmberDrift {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for EmberDrift {
    fn meta(&self) -> &'static EffectMeta {
        &META
    }

    fn param_descriptors(&self) -> &'static [ParamDescriptor] {
        PARAMS
    }

    fn get_param(&self, name: &str) -> Option<TunableValue> {
        match name {
            "cooling" => Some(TunableValue::F32(self.cooling)),
            "spark-drive" => Some(TunableValue::F32(self.spark_drive)),
            "drift" => Some(TunableValue::F32(self.drift)),
            _ => None,
        }
    }

    fn set_param(&mut self, name: &str, value: TunableValue) -> Result<(), CoreError> {
        let desc = params::find(PARAMS, name)
            .ok_or_else(|| CoreError::not_found(format!("parameter '{name}'")))?;
        desc.validate(value)?;
        match (name, value) {
            ("cooling", TunableValue::F32(v)) => self.cooling = v,
            ("spark-drive", TunableValue::F32(v)) => self.spark_drive = v,
            ("drift", TunableValue::F32(v)) => self.drift = v,
            _ => {}
        }
        Ok(())
    }

    fn render(&mut self, ctx: &mut EffectContext) {
        // Drift outward: heat at distance d pulls from its inner neighbour.
        for d in (1..HALF_SPAN).rev() {
            self.heat[d] += (self.heat[d - 1] - self.heat[d]) * self.drift;
        }
        for h in &mut self.heat {
            *h *= self.cooling;
        }

        // Sparks at the origin, driven by low-band energy and novelty.
        let bass = ctx.audio.bands8[0].max(ctx.audio.bands8[1]);
        let spark = (bass * self.spark_drive + ctx.audio.novelty * 0.3).min(1.0);
        self.heat[0] = self.heat[0].max(spark);

        // The visible output also folds in the previous frame for a glow
        // tail; the frame is this effect's feedback surface.
        for d in 0..HALF_SPAN {
            let heat = self.heat[d].clamp(0.0, 1.0);
            let fresh = ctx.palette.sample(heat * 0.6).scaled(heat);
            let prior = ctx.frame.px[(LEDS_PER_STRIP / 2) - 1 - d];
            ctx.frame.centre_pair(d, prior.scaled(0.35).saturating_add(fresh));
        }
    }

    fn reset(&mut self) {
        self.heat = [0.0; HALF_SPAN];
    }
}
