use triple_buffer::TripleBuffer;

use crate::geometry::{self, LED_COUNT};
use crate::pixel::Rgb8;

/// Une frame LED complète : 320 pixels RGB, taille fixe, jamais réallouée.
///
/// Écrite par le renderer, consommée par le driver et le stream publisher.
///
/// # Example
/// ```
/// use lw_core::frame::LedFrame;
/// use lw_core::pixel::Rgb8;
/// let mut f = LedFrame::default();
/// f.px[0] = Rgb8::new(255, 0, 0);
/// assert_eq!(f.px[1], Rgb8::BLACK);
/// ```
#[derive(Clone)]
pub struct LedFrame {
    /// Pixels, flat layout: strip 0 at 0..160, strip 1 at 160..320.
    pub px: [Rgb8; LED_COUNT],
}

impl Default for LedFrame {
    fn default() -> Self {
        Self {
            px: [Rgb8::BLACK; LED_COUNT],
        }
    }
}

impl LedFrame {
    /// Clear every pixel to black.
    pub fn clear(&mut self) {
        self.px = [Rgb8::BLACK; LED_COUNT];
    }

    /// Écrit la même couleur sur les quatre indices miroirs à distance `d`
    /// de la paire centrale. Hors plage (`d >= 80`) : no-op, jamais de faute.
    ///
    /// # Example
    /// ```
    /// use lw_core::frame::LedFrame;
    /// use lw_core::pixel::Rgb8;
    /// let mut f = LedFrame::default();
    /// f.centre_pair(0, Rgb8::new(0, 255, 0));
    /// assert_eq!(f.px[79], f.px[80]);
    /// assert_eq!(f.px[239], f.px[240]);
    /// f.centre_pair(4000, Rgb8::WHITE); // silently ignored
    /// ```
    #[inline]
    pub fn centre_pair(&mut self, d: usize, rgb: Rgb8) {
        if let Some(indices) = geometry::mirror_indices(d) {
            for idx in indices {
                self.px[idx] = rgb;
            }
        }
    }

    /// Blend `other` over this frame with weight `t` (0 = keep self, 1 = other).
    pub fn blend_from(&mut self, other: &LedFrame, t: f32) {
        for (dst, src) in self.px.iter_mut().zip(other.px.iter()) {
            *dst = dst.lerp(*src, t);
        }
    }

    /// Fade every pixel towards black by multiplying with `keep` ∈ [0, 1].
    pub fn fade(&mut self, keep: f32) {
        for p in &mut self.px {
            *p = p.scaled(keep);
        }
    }
}

/// Paire de frame buffers avec bascule atomique front/back.
///
/// Le writer possède le buffer back en propre ; `publish()` pousse une
/// copie complète vers le reader, qui voit toujours la dernière frame
/// entière — jamais une frame partielle.
pub struct FramePair;

impl FramePair {
    /// Create the pair and split it into its two ends.
    ///
    /// # Example
    /// ```
    /// use lw_core::frame::FramePair;
    /// use lw_core::pixel::Rgb8;
    /// let (mut writer, mut reader) = FramePair::split();
    /// writer.back_mut().px[0] = Rgb8::new(1, 2, 3);
    /// writer.publish();
    /// assert_eq!(reader.front().px[0], Rgb8::new(1, 2, 3));
    /// ```
    #[must_use]
    pub fn split() -> (FrameWriter, FrameReader) {
        let (input, output) = TripleBuffer::new(&LedFrame::default()).split();
        (
            FrameWriter {
                back: LedFrame::default(),
                input,
            },
            FrameReader { output },
        )
    }
}

/// Writer end: exclusive to the render task.
pub struct FrameWriter {
    back: LedFrame,
    input: triple_buffer::Input<LedFrame>,
}

impl FrameWriter {
    /// Mutable access to the back buffer being composed.
    #[inline]
    pub fn back_mut(&mut self) -> &mut LedFrame {
        &mut self.back
    }

    /// Read-only view of the back buffer (stream copier, tests).
    #[inline]
    #[must_use]
    pub fn back(&self) -> &LedFrame {
        &self.back
    }

    /// Publie la frame back : le driver voit la nouvelle frame à sa
    /// prochaine lecture. Le back reste possédé par le writer.
    pub fn publish(&mut self) {
        self.input.write(self.back.clone());
    }
}

/// Reader end: exclusive to the driver and the stream copier.
pub struct FrameReader {
    output: triple_buffer::Output<LedFrame>,
}

impl FrameReader {
    /// The most recently published complete frame.
    #[inline]
    pub fn front(&mut self) -> &LedFrame {
        self.output.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_is_complete_frame() {
        let (mut writer, mut reader) = FramePair::split();
        for (i, p) in writer.back_mut().px.iter_mut().enumerate() {
            *p = Rgb8::new((i % 256) as u8, 0, 0);
        }
        writer.publish();
        let front = reader.front();
        for (i, p) in front.px.iter().enumerate() {
            assert_eq!(p.r, (i % 256) as u8);
        }
    }

    #[test]
    fn reader_keeps_last_frame_between_publishes() {
        let (mut writer, mut reader) = FramePair::split();
        writer.back_mut().px[7] = Rgb8::WHITE;
        writer.publish();
        assert_eq!(reader.front().px[7], Rgb8::WHITE);
        // No new publish — same frame again.
        assert_eq!(reader.front().px[7], Rgb8::WHITE);
    }

    #[test]
    fn centre_pair_writes_all_mirrors() {
        let mut f = LedFrame::default();
        let c = Rgb8::new(9, 8, 7);
        f.centre_pair(10, c);
        assert_eq!(f.px[69], c);
        assert_eq!(f.px[90], c);
        assert_eq!(f.px[229], c);
        assert_eq!(f.px[250], c);
    }

    #[test]
    fn blend_midpoint() {
        let mut a = LedFrame::default();
        let mut b = LedFrame::default();
        b.px[0] = Rgb8::new(255, 0, 255);
        a.blend_from(&b, 0.5);
        assert_eq!(a.px[0], Rgb8::new(127, 0, 127));
    }
}
