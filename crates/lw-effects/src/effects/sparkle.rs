use lw_core::error::CoreError;
use lw_core::geometry::LED_COUNT;
use lw_core::pixel::Rgb8;
use lw_core::tunables::TunableValue;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::context::EffectContext;
use crate::effect::Effect;
use crate::meta::{EffectFamily, EffectMeta, tags};
use crate::params::{self, ParamDescriptor, f32_param};

static META: EffectMeta = EffectMeta {
    name: "sparkle",
    family: EffectFamily::Rhythmic,
    tags: tags::AUDIO_REACTIVE,
    centre_origin: false,
    stateful: true,
    lgp_sensitive: false,
};

static PARAMS: &[ParamDescriptor] = &[
    f32_param("density", 0.35, 0.0, 1.0, "spark"),
    f32_param("fade", 0.88, 0.5, 0.99, "spark"),
    f32_param("percussion-drive", 1.0, 0.0, 3.0, "audio"),
];

/// Scintillement : la frame précédente s'éteint doucement, des étincelles
/// fraîches apparaissent sur les triggers percussifs. Le fondu traverse
/// les frames — stateful.
pub struct Sparkle {
    density: f32,
    fade: f32,
    percussion_drive: f32,
    rng: SmallRng,
}

impl Sparkle {
    /// Fixed seed: deterministic across boots, varied across frames.
    #[must_use]
    pub fn new() -> Self {
        Self {
            density: 0.35,
            fade: 0.88,
            percussion_drive: 1.0,
            rng: SmallRng::seed_from_u64(0x51ED_CAFE),
        }
    }
}

impl Default for Sparkle {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Sparkle {
    fn meta(&self) -> &'static EffectMeta {
        &META
    }

    fn param_descriptors(&self) -> &'static [ParamDescriptor] {
        PARAMS
    }

    fn get_param(&self, name: &str) -> Option<TunableValue> {
        match name {
            "density" => Some(TunableValue::F32(self.density)),
            "fade" => Some(TunableValue::F32(self.fade)),
            "percussion-drive" => Some(TunableValue::F32(self.percussion_drive)),
            _ => None,
        }
    }

    fn set_param(&mut self, name: &str, value: TunableValue) -> Result<(), CoreError> {
        let desc = params::find(PARAMS, name)
            .ok_or_else(|| CoreError::not_found(format!("parameter '{name}'")))?;
        desc.validate(value)?;
        match (name, value) {
            ("density", TunableValue::F32(v)) => self.density = v,
            ("fade", TunableValue::F32(v)) => self.fade = v,
            ("percussion-drive", TunableValue::F32(v)) => self.percussion_drive = v,
            _ => {}
        }
        Ok(())
    }

    fn render(&mut self, ctx: &mut EffectContext) {
        // Persist and dim the previous frame.
        ctx.frame.fade(self.fade);

        let mut budget = (self.density * 6.0) as usize;
        if ctx.audio.snare_trigger {
            budget += (4.0 * self.percussion_drive) as usize;
        }
        if ctx.audio.hihat_trigger {
            budget += (2.0 * self.percussion_drive) as usize;
        }
        budget += (ctx.audio.novelty * 4.0 * self.density) as usize;

        for _ in 0..budget {
            let idx = self.rng.gen_range(0..LED_COUNT);
            let warm = self.rng.gen_range(0.0f32..1.0);
            let colour = if self.rng.gen_bool(0.3) {
                Rgb8::WHITE
            } else {
                ctx.palette.sample(warm)
            };
            ctx.frame.px[idx] = colour;
        }
    }
}
