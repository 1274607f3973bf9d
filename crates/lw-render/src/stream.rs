use std::time::{Duration, Instant};

use lw_core::frame::LedFrame;
use lw_core::geometry::{LEDS_PER_STRIP, NUM_STRIPS};

/// Header magic byte ('L').
pub const STREAM_MAGIC: u8 = 0x4C;
/// Wire format version.
pub const STREAM_VERSION: u8 = 1;
/// Header (4) + 2 × (strip id + 160 × RGB) = 966 bytes.
pub const STREAM_FRAME_LEN: usize = 4 + NUM_STRIPS * (1 + LEDS_PER_STRIP * 3);

/// Une frame de stream encodée, taille fixe, copiée par valeur dans le
/// canal de transport — aucune allocation par frame.
#[derive(Clone)]
pub struct StreamFrame(pub [u8; STREAM_FRAME_LEN]);

/// Encode a published frame into the wire layout.
#[must_use]
pub fn encode_frame(frame: &LedFrame) -> StreamFrame {
    let mut out = [0u8; STREAM_FRAME_LEN];
    out[0] = STREAM_MAGIC;
    out[1] = STREAM_VERSION;
    out[2] = NUM_STRIPS as u8;
    out[3] = LEDS_PER_STRIP as u8;

    let mut pos = 4;
    for strip in 0..NUM_STRIPS {
        out[pos] = strip as u8;
        pos += 1;
        for i in 0..LEDS_PER_STRIP {
            let px = frame.px[strip * LEDS_PER_STRIP + i];
            out[pos] = px.r;
            out[pos + 1] = px.g;
            out[pos + 2] = px.b;
            pos += 3;
        }
    }
    StreamFrame(out)
}

/// Publication du flux LED vers les abonnés externes.
///
/// Copie throttlée de la frame publiée (≥ `min_interval` entre deux
/// envois) vers un canal borné. `try_send` uniquement : un transport
/// affamé fait perdre des frames de stream, jamais des frames de rendu.
pub struct LedStreamPublisher {
    subscribers: usize,
    min_interval: Duration,
    last_sent: Option<Instant>,
    tx: flume::Sender<StreamFrame>,
    dropped: u64,
}

impl LedStreamPublisher {
    /// Build with the throttle interval; returns the transport-side
    /// receiver.
    #[must_use]
    pub fn new(min_interval: Duration, depth: usize) -> (Self, flume::Receiver<StreamFrame>) {
        let (tx, rx) = flume::bounded(depth);
        (
            Self {
                subscribers: 0,
                min_interval,
                last_sent: None,
                tx,
                dropped: 0,
            },
            rx,
        )
    }

    /// One more subscriber.
    pub fn subscribe(&mut self) {
        self.subscribers += 1;
        log::info!("led stream: {} subscriber(s)", self.subscribers);
    }

    /// One subscriber left.
    pub fn unsubscribe(&mut self) {
        self.subscribers = self.subscribers.saturating_sub(1);
        log::info!("led stream: {} subscriber(s)", self.subscribers);
    }

    /// Current subscriber count.
    #[must_use]
    pub fn subscribers(&self) -> usize {
        self.subscribers
    }

    /// Stream frames dropped because the transport lagged.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// After a publish: copy the frame out if someone is listening and
    /// the throttle allows. Non-blocking, never stalls the renderer.
    pub fn maybe_publish(&mut self, frame: &LedFrame, now: Instant) {
        if self.subscribers == 0 {
            return;
        }
        if let Some(last) = self.last_sent
            && now.duration_since(last) < self.min_interval
        {
            return;
        }
        self.last_sent = Some(now);
        match self.tx.try_send(encode_frame(frame)) {
            Ok(()) => {}
            Err(flume::TrySendError::Full(_)) => {
                // Transport slower than the throttle: drop, don't queue.
                self.dropped += 1;
            }
            Err(flume::TrySendError::Disconnected(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lw_core::pixel::Rgb8;

    #[test]
    fn frame_is_exactly_966_bytes() {
        assert_eq!(STREAM_FRAME_LEN, 966);
        let encoded = encode_frame(&LedFrame::default());
        assert_eq!(encoded.0.len(), 966);
    }

    #[test]
    fn header_and_strip_layout() {
        let mut frame = LedFrame::default();
        frame.px[0] = Rgb8::new(1, 2, 3);
        frame.px[160] = Rgb8::new(9, 8, 7);
        let e = encode_frame(&frame).0;
        assert_eq!(&e[0..4], &[STREAM_MAGIC, STREAM_VERSION, 2, 160]);
        assert_eq!(e[4], 0); // strip 0 id
        assert_eq!(&e[5..8], &[1, 2, 3]);
        let strip1 = 4 + 1 + 160 * 3;
        assert_eq!(e[strip1], 1); // strip 1 id
        assert_eq!(&e[strip1 + 1..strip1 + 4], &[9, 8, 7]);
    }

    #[test]
    fn no_subscribers_means_no_copies() {
        let (mut publisher, rx) = LedStreamPublisher::new(Duration::from_millis(50), 2);
        publisher.maybe_publish(&LedFrame::default(), Instant::now());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn throttle_limits_rate() {
        let (mut publisher, rx) = LedStreamPublisher::new(Duration::from_millis(50), 8);
        publisher.subscribe();
        let t0 = Instant::now();
        publisher.maybe_publish(&LedFrame::default(), t0);
        publisher.maybe_publish(&LedFrame::default(), t0 + Duration::from_millis(10));
        publisher.maybe_publish(&LedFrame::default(), t0 + Duration::from_millis(60));
        assert_eq!(rx.drain().count(), 2);
    }

    #[test]
    fn starved_transport_drops_frames_without_blocking() {
        let (mut publisher, _rx) = LedStreamPublisher::new(Duration::ZERO, 1);
        publisher.subscribe();
        let t0 = Instant::now();
        publisher.maybe_publish(&LedFrame::default(), t0);
        publisher.maybe_publish(&LedFrame::default(), t0 + Duration::from_millis(1));
        publisher.maybe_publish(&LedFrame::default(), t0 + Duration::from_millis(2));
        assert_eq!(publisher.dropped(), 2);
    }
}
