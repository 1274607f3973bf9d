/// Les effets compilés en dur.
///
/// L'ordre d'enregistrement ci-dessous attribue les ids et fait partie du
/// contrat externe — ne JAMAIS réordonner, seulement ajouter en queue.

pub mod aurora;
pub mod band_ripple;
pub mod beat_pulse;
pub mod chord_glow;
pub mod chroma_wheel;
pub mod ember_drift;
pub mod solid;
pub mod sparkle;
pub mod spectrum_bloom;
pub mod tempo_strobe;
pub mod vu_sweep;

use crate::registry::EffectRegistry;

/// Register the builtin set. Ids:
/// 0 aurora, 1 spectrum-bloom, 2 chroma-wheel, 3 beat-pulse, 4 vu-sweep,
/// 5 solid, 6 ember-drift, 7 sparkle, 8 chord-glow, 9 band-ripple,
/// 10 tempo-strobe.
pub fn register_builtins(registry: &mut EffectRegistry) {
    registry.register(Box::new(aurora::Aurora::new()));
    registry.register(Box::new(spectrum_bloom::SpectrumBloom::new()));
    registry.register(Box::new(chroma_wheel::ChromaWheel::new()));
    registry.register(Box::new(beat_pulse::BeatPulse::new()));
    registry.register(Box::new(vu_sweep::VuSweep::new()));
    registry.register(Box::new(solid::Solid::new()));
    registry.register(Box::new(ember_drift::EmberDrift::new()));
    registry.register(Box::new(sparkle::Sparkle::new()));
    registry.register(Box::new(chord_glow::ChordGlow::new()));
    registry.register(Box::new(band_ripple::BandRipple::new()));
    registry.register(Box::new(tempo_strobe::TempoStrobe::new()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use lw_core::frame::LedFrame;
    use lw_core::geometry::HALF_SPAN;
    use lw_core::snapshot::AudioSnapshot;

    /// Every builtin, rendered with a busy snapshot, must leave the
    /// centre pairs symmetric when it declares centre-origin.
    #[test]
    fn centre_origin_effects_render_symmetric() {
        let mut registry = EffectRegistry::new();
        register_builtins(&mut registry);

        let mut audio = AudioSnapshot::default();
        audio.rms = 0.6;
        audio.fast_rms = 0.7;
        audio.novelty = 0.8;
        audio.beat_tick = true;
        for (i, b) in audio.bins64.iter_mut().enumerate() {
            *b = (i as f32 / 64.0).sin().abs();
        }
        audio.bins64_adaptive = audio.bins64;
        for (i, b) in audio.bands8.iter_mut().enumerate() {
            *b = 0.2 + 0.1 * i as f32 / 8.0;
        }

        for id in 0..registry.len() as u8 {
            let Some(meta) = registry.meta(id) else { continue };
            if !meta.centre_origin {
                continue;
            }
            let name = meta.name;
            let mut frame = LedFrame::default();
            // Several frames so stateful centre-origin effects move.
            for step in 0..30 {
                let effect = registry.effect_mut(id).unwrap_or_else(|| panic!("{name}"));
                crate::context::test_support::render_once(
                    effect,
                    &mut frame,
                    &audio,
                    step as f32 / 120.0,
                );
            }
            for d in 0..HALF_SPAN {
                assert_eq!(
                    frame.px[79 - d],
                    frame.px[80 + d],
                    "{name} asymmetric on strip 0 at d={d}"
                );
                assert_eq!(
                    frame.px[239 - d],
                    frame.px[240 + d],
                    "{name} asymmetric on strip 1 at d={d}"
                );
            }
        }
    }

    /// Every parameter advertised by a builtin round-trips through
    /// get/set at its default value.
    #[test]
    fn param_tables_round_trip() {
        let mut registry = EffectRegistry::new();
        register_builtins(&mut registry);
        for id in 0..registry.len() as u8 {
            let descriptors = registry.effect(id).map(|e| e.param_descriptors());
            let Some(descriptors) = descriptors else { continue };
            for d in descriptors {
                let effect = registry.effect_mut(id).expect("registered");
                effect.set_param(d.name, d.default).expect("default in range");
                assert_eq!(
                    registry.effect(id).and_then(|e| e.get_param(d.name)),
                    Some(d.default),
                    "param {} of effect {id}",
                    d.name
                );
            }
        }
    }

    #[test]
    fn unknown_param_name_is_not_found() {
        let mut registry = EffectRegistry::new();
        register_builtins(&mut registry);
        let effect = registry.effect_mut(0).expect("aurora");
        assert!(effect.get_param("no-such-param").is_none());
        let err = effect
            .set_param("no-such-param", lw_core::tunables::TunableValue::F32(0.0))
            .unwrap_err();
        assert_eq!(err.code(), "NotFound");
    }
}
