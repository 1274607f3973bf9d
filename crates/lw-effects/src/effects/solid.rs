use lw_core::error::CoreError;
use lw_core::pixel::Rgb8;
use lw_core::tunables::TunableValue;

use crate::context::EffectContext;
use crate::effect::Effect;
use crate::meta::{EffectFamily, EffectMeta, tags};
use crate::params::{self, ParamDescriptor, u8_param};

static META: EffectMeta = EffectMeta {
    name: "solid",
    family: EffectFamily::Utility,
    tags: tags::AMBIENT_SAFE,
    centre_origin: false,
    stateful: false,
    lgp_sensitive: false,
};

static PARAMS: &[ParamDescriptor] = &[
    u8_param("red", 128, "colour"),
    u8_param("green", 128, "colour"),
    u8_param("blue", 128, "colour"),
];

/// Couleur unie sur les 320 LEDs. Référence de calibration et cible de
/// choix pour les tests de transition.
pub struct Solid {
    colour: Rgb8,
}

impl Solid {
    /// Mid-grey by default.
    #[must_use]
    pub fn new() -> Self {
        Self {
            colour: Rgb8::new(128, 128, 128),
        }
    }
}

impl Default for Solid {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Solid {
    fn meta(&self) -> &'static EffectMeta {
        &META
    }

    fn param_descriptors(&self) -> &'static [ParamDescriptor] {
        PARAMS
    }

    fn get_param(&self, name: &str) -> Option<TunableValue> {
        match name {
            "red" => Some(TunableValue::U8(self.colour.r)),
            "green" => Some(TunableValue::U8(self.colour.g)),
            "blue" => Some(TunableValue::U8(self.colour.b)),
            _ => None,
        }
    }

    fn set_param(&mut self, name: &str, value: TunableValue) -> Result<(), CoreError> {
        let desc = params::find(PARAMS, name)
            .ok_or_else(|| CoreError::not_found(format!("parameter '{name}'")))?;
        desc.validate(value)?;
        match (name, value) {
            ("red", TunableValue::U8(v)) => self.colour.r = v,
            ("green", TunableValue::U8(v)) => self.colour.g = v,
            ("blue", TunableValue::U8(v)) => self.colour.b = v,
            _ => {}
        }
        Ok(())
    }

    fn render(&mut self, ctx: &mut EffectContext) {
        for p in &mut ctx.frame.px {
            *p = self.colour;
        }
    }
}
