use lw_core::frame::LedFrame;
use lw_core::palette::Palette;
use lw_core::snapshot::AudioSnapshot;

/// Tout ce qu'un effet reçoit pour une frame : le buffer à écrire, le
/// snapshot audio de la frame, la palette active, le pas de temps.
///
/// Le contrat de `render` : aucune allocation, chaque pixel revendiqué
/// est écrit, et les effets centre-origine écrivent les deux indices
/// centraux ensemble (via [`LedFrame::centre_pair`]).
pub struct EffectContext<'a> {
    /// The frame being composed. Stateful effects find their previous
    /// output here; stateless effects receive it cleared.
    pub frame: &'a mut LedFrame,
    /// Audio features for this frame — one snapshot version per frame.
    pub audio: &'a AudioSnapshot,
    /// The active palette.
    pub palette: &'a Palette,
    /// Seconds since the previous frame, clamped by the scheduler.
    pub dt: f32,
    /// Seconds since boot, monotonic.
    pub time: f32,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use lw_core::palette::PALETTES;

    /// Drive one render call with a default context.
    pub fn render_once(
        effect: &mut dyn crate::effect::Effect,
        frame: &mut LedFrame,
        audio: &AudioSnapshot,
        time: f32,
    ) {
        let mut ctx = EffectContext {
            frame,
            audio,
            palette: &PALETTES[0],
            dt: 1.0 / 120.0,
            time,
        };
        effect.render(&mut ctx);
    }
}
