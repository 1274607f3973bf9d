use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::{Consumer, RingBuffer};

use crate::source::SampleSource;

/// Capture micro host-side via cpal, derrière la feature `capture`.
///
/// Le callback cpal downmixe en mono et pousse dans un ring buffer
/// lock-free ; `read` tire en bloquant côté pipeline. Sur cible, cette
/// implémentation est remplacée par le driver I²S.
///
/// # Example
/// ```no_run
/// use lw_audio::capture::MicCapture;
/// let capture = MicCapture::start_default().unwrap();
/// ```
pub struct MicCapture {
    _stream: cpal::Stream,
    consumer: Consumer<f32>,
    sample_rate: u32,
}

impl MicCapture {
    /// Start capturing from the default input device.
    ///
    /// # Errors
    /// Returns an error if the audio device is unavailable.
    pub fn start_default() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| anyhow::anyhow!("pas de périphérique audio trouvé"))?;

        let config = device.default_input_config()?;
        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;

        // Ring buffer: 2 seconds of audio @ sample_rate
        let buf_size = sample_rate as usize * 2;
        let (mut producer, consumer) = RingBuffer::new(buf_size);

        let stream = device.build_input_stream(
            &config.into(),
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                for chunk in data.chunks(channels) {
                    let mono: f32 = chunk.iter().sum::<f32>() / channels as f32;
                    let _ = producer.push(mono);
                }
            },
            |err| {
                log::error!("audio stream error: {err}");
            },
            None,
        )?;

        stream.play()?;

        Ok(Self {
            _stream: stream,
            consumer,
            sample_rate,
        })
    }
}

impl SampleSource for MicCapture {
    fn read(&mut self, out: &mut [f32]) -> usize {
        let mut filled = 0usize;
        let mut idle_spins = 0u32;
        while filled < out.len() {
            match self.consumer.pop() {
                Ok(sample) => {
                    out[filled] = sample;
                    filled += 1;
                }
                Err(_) => {
                    idle_spins += 1;
                    // ~200 ms without data: short read, caller treats as starved.
                    if idle_spins > 100 {
                        return filled;
                    }
                    std::thread::sleep(std::time::Duration::from_millis(2));
                }
            }
        }
        filled
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
