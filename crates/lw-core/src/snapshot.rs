use triple_buffer::TripleBuffer;

/// Qualité d'accord détectée sur les 12 classes de hauteur.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChordType {
    /// Major triad.
    #[default]
    Major,
    /// Minor triad.
    Minor,
    /// Diminished triad.
    Diminished,
    /// Augmented triad.
    Augmented,
}

impl ChordType {
    /// Short display name ("maj", "min", "dim", "aug").
    #[must_use]
    pub const fn short_name(self) -> &'static str {
        match self {
            ChordType::Major => "maj",
            ChordType::Minor => "min",
            ChordType::Diminished => "dim",
            ChordType::Augmented => "aug",
        }
    }
}

/// Résultat complet de l'analyse audio pour un hop.
///
/// Écrit par la tâche audio, lu par la tâche de rendu — une version par
/// frame rendue. Taille fixe, Copy, jamais alloué dynamiquement.
/// `monotonic_hop_index` est la version publiée : deux lectures avec le
/// même index voient exactement le même contenu.
///
/// # Example
/// ```
/// use lw_core::snapshot::AudioSnapshot;
/// let s = AudioSnapshot::default();
/// assert_eq!(s.rms, 0.0);
/// assert!(!s.beat_tick);
/// ```
#[derive(Clone, Copy)]
pub struct AudioSnapshot {
    // === Amplitude ===
    /// RMS lissé, normalisé [0.0, 1.0].
    pub rms: f32,
    /// RMS rapide (fenêtre courte), normalisé [0.0, 1.0].
    pub fast_rms: f32,
    /// Peak amplitude de la fenêtre courante [0.0, 1.0].
    pub peak: f32,

    // === Features spectrales per-hop ===
    /// Flux spectral redressé demi-onde [0.0, 1.0].
    pub spectral_flux: f32,
    /// Nouveauté normalisée par suiveur de max [0.0, 1.0].
    pub novelty: f32,

    // === Spectre lourd (cadence ~10 Hz, persiste entre mises à jour) ===
    /// 64 bins demi-ton A1..C7, sémantique énergie.
    pub bins64: [f32; 64],
    /// Bins normalisés par suiveur de max ; peuvent dépasser 1.0 au floor.
    pub bins64_adaptive: [f32; 64],
    /// 8 bandes pondérées mel.
    pub bands8: [f32; 8],
    /// Variante lissée lente des 8 bandes.
    pub heavy_bands8: [f32; 8],
    /// 12 classes de hauteur (repli d'octave).
    pub chroma: [f32; 12],
    /// Variante lissée lente du chroma.
    pub heavy_chroma: [f32; 12],

    // === Accord ===
    /// Fondamentale de l'accord détecté, 0..11 (0 = C).
    pub chord_root: u8,
    /// Qualité de l'accord.
    pub chord_type: ChordType,
    /// Confiance = score gagnant − second [0.0, 1.0].
    pub chord_confidence: f32,

    // === Tempo ===
    /// BPM estimé (0.0 si inconnu).
    pub bpm: f32,
    /// Confiance du suivi de tempo [0.0, 1.0].
    pub tempo_confidence: f32,
    /// Phase du beat [0.0, 1.0).
    pub beat_phase: f32,
    /// Impulsion un-hop au passage de chaque beat.
    pub beat_tick: bool,
    /// Impulsion un-hop au premier beat de chaque mesure.
    pub downbeat_tick: bool,

    // === Percussions ===
    /// Énergie caisse claire (bandes médiums) [0.0, 1.0].
    pub snare_energy: f32,
    /// Énergie charley (bandes hautes) [0.0, 1.0].
    pub hihat_energy: f32,
    /// Déclencheur caisse claire, un hop.
    pub snare_trigger: bool,
    /// Déclencheur charley, un hop.
    pub hihat_trigger: bool,

    /// Version de publication : index de hop monotone.
    pub monotonic_hop_index: u64,
}

impl Default for AudioSnapshot {
    fn default() -> Self {
        Self {
            rms: 0.0,
            fast_rms: 0.0,
            peak: 0.0,
            spectral_flux: 0.0,
            novelty: 0.0,
            bins64: [0.0; 64],
            bins64_adaptive: [0.0; 64],
            bands8: [0.0; 8],
            heavy_bands8: [0.0; 8],
            chroma: [0.0; 12],
            heavy_chroma: [0.0; 12],
            chord_root: 0,
            chord_type: ChordType::Major,
            chord_confidence: 0.0,
            bpm: 0.0,
            tempo_confidence: 0.0,
            beat_phase: 0.0,
            beat_tick: false,
            downbeat_tick: false,
            snare_energy: 0.0,
            hihat_energy: 0.0,
            snare_trigger: false,
            hihat_trigger: false,
            monotonic_hop_index: 0,
        }
    }
}

/// Le slot de publication unique du snapshot audio.
///
/// Writer côté tâche audio, reader côté tâche de rendu. La lecture
/// retourne toujours un snapshot entier et cohérent — jamais déchiré.
pub struct SnapshotBuffer;

impl SnapshotBuffer {
    /// Create the slot and split it into writer and reader ends.
    ///
    /// # Example
    /// ```
    /// use lw_core::snapshot::{AudioSnapshot, SnapshotBuffer};
    /// let (mut writer, mut reader) = SnapshotBuffer::split();
    /// let mut s = AudioSnapshot::default();
    /// s.monotonic_hop_index = 42;
    /// writer.publish(s);
    /// assert_eq!(reader.read().monotonic_hop_index, 42);
    /// ```
    #[must_use]
    pub fn split() -> (SnapshotWriter, SnapshotReader) {
        let (input, output) = TripleBuffer::new(&AudioSnapshot::default()).split();
        (SnapshotWriter { input }, SnapshotReader { output })
    }
}

/// Writer end, owned by the audio task.
pub struct SnapshotWriter {
    input: triple_buffer::Input<AudioSnapshot>,
}

impl SnapshotWriter {
    /// Publish a complete snapshot. Callers bump `monotonic_hop_index`
    /// before publishing; readers use it as the version.
    #[inline]
    pub fn publish(&mut self, snapshot: AudioSnapshot) {
        self.input.write(snapshot);
    }
}

/// Reader end, owned by the render task.
pub struct SnapshotReader {
    output: triple_buffer::Output<AudioSnapshot>,
}

impl SnapshotReader {
    /// The most recently published snapshot, copied out.
    #[inline]
    pub fn read(&mut self) -> AudioSnapshot {
        *self.output.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_sees_whole_payload() {
        let (mut writer, mut reader) = SnapshotBuffer::split();
        let mut s = AudioSnapshot::default();
        s.bins64[63] = 0.5;
        s.chroma[11] = 0.25;
        s.monotonic_hop_index = 7;
        writer.publish(s);

        let got = reader.read();
        assert_eq!(got.monotonic_hop_index, 7);
        assert_eq!(got.bins64[63], 0.5);
        assert_eq!(got.chroma[11], 0.25);
    }

    #[test]
    fn version_is_monotonic_across_publishes() {
        let (mut writer, mut reader) = SnapshotBuffer::split();
        for hop in 1..=5u64 {
            let mut s = AudioSnapshot::default();
            s.monotonic_hop_index = hop;
            writer.publish(s);
        }
        assert_eq!(reader.read().monotonic_hop_index, 5);
    }
}
