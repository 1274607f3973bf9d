use lw_core::error::CoreError;
use lw_core::geometry::{HALF_SPAN, LEDS_PER_STRIP};
use lw_core::tunables::TunableValue;

use crate::context::EffectContext;
use crate::effect::Effect;
use crate::meta::{EffectFamily, EffectMeta, tags};
use crate::params::{self, ParamDescriptor, f32_param};

static META: EffectMeta = EffectMeta {
    name: "band-ripple",
    family: EffectFamily::Spectral,
    tags: tags::AUDIO_REACTIVE | tags::CENTRE_ORIGIN,
    centre_origin: true,
    stateful: true,
    lgp_sensitive: false,
};

static PARAMS: &[ParamDescriptor] = &[
    f32_param("scroll-rate", 70.0, 5.0, 200.0, "motion"),
    f32_param("gain", 1.3, 0.0, 4.0, "level"),
    f32_param("trail", 0.96, 0.8, 1.0, "motion"),
];

/// L'énergie des 8 bandes naît au centre et ondule vers les bords : la
/// frame précédente est décalée d'un cran vers l'extérieur, la paire
/// centrale reçoit le mix de bandes de la frame courante. L'historique
/// spectral devient une texture spatiale — stateful par construction.
pub struct BandRipple {
    scroll_rate: f32,
    gain: f32,
    trail: f32,
    /// Fractional scroll accumulator in LEDs.
    scroll_acc: f32,
}

impl BandRipple {
    /// Defaults from the parameter table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scroll_rate: 70.0,
            gain: 1.3,
            trail: 0.96,
            scroll_acc: 0.0,
        }
    }
}

impl Default for BandRipple {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for BandRipple {
    fn meta(&self) -> &'static EffectMeta {
        &META
    }

    fn param_descriptors(&self) -> &'static [ParamDescriptor] {
        PARAMS
    }

    fn get_param(&self, name: &str) -> Option<TunableValue> {
        match name {
            "scroll-rate" => Some(TunableValue::F32(self.scroll_rate)),
            "gain" => Some(TunableValue::F32(self.gain)),
            "trail" => Some(TunableValue::F32(self.trail)),
            _ => None,
        }
    }

    fn set_param(&mut self, name: &str, value: TunableValue) -> Result<(), CoreError> {
        let desc = params::find(PARAMS, name)
            .ok_or_else(|| CoreError::not_found(format!("parameter '{name}'")))?;
        desc.validate(value)?;
        match (name, value) {
            ("scroll-rate", TunableValue::F32(v)) => self.scroll_rate = v,
            ("gain", TunableValue::F32(v)) => self.gain = v,
            ("trail", TunableValue::F32(v)) => self.trail = v,
            _ => {}
        }
        Ok(())
    }

    fn render(&mut self, ctx: &mut EffectContext) {
        self.scroll_acc += self.scroll_rate * ctx.dt;
        let steps = self.scroll_acc as usize;
        self.scroll_acc -= steps as f32;

        // Shift the previous frame outward, one LED per step, all four
        // mirrored quadrants in lockstep.
        for _ in 0..steps.min(HALF_SPAN) {
            for d in (1..HALF_SPAN).rev() {
                let src_left = (LEDS_PER_STRIP / 2) - d; // 80 - d = index at distance d-1
                let colour = ctx.frame.px[src_left].scaled(self.trail);
                ctx.frame.centre_pair(d, colour);
            }
        }

        // New centre value: palette-weighted mix of the 8 bands.
        let bands = &ctx.audio.bands8;
        let mut r = 0.0f32;
        let mut g = 0.0f32;
        let mut b = 0.0f32;
        for (i, &energy) in bands.iter().enumerate() {
            let c = ctx.palette.sample(i as f32 / bands.len() as f32);
            let w = (energy * self.gain).min(1.0);
            r += f32::from(c.r) * w;
            g += f32::from(c.g) * w;
            b += f32::from(c.b) * w;
        }
        let centre = lw_core::pixel::Rgb8::new(
            (r / 2.0).min(255.0) as u8,
            (g / 2.0).min(255.0) as u8,
            (b / 2.0).min(255.0) as u8,
        );
        ctx.frame.centre_pair(0, centre);
    }

    fn reset(&mut self) {
        self.scroll_acc = 0.0;
    }
}
