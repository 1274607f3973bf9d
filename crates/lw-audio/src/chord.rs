use lw_core::snapshot::ChordType;

use crate::goertzel::NUM_CHROMA;

/// Détection d'accord par gabarits sur le chroma accumulé.
///
/// 4 qualités × 12 fondamentales = 48 gabarits, scorés par produit
/// scalaire contre un chroma normalisé accumulé sur une fenêtre courte.
/// La confiance est l'écart gagnant − second : deux hypothèses proches
/// donnent une confiance faible, ce que les effets traduisent en retenue.

/// Interval patterns for the four template qualities (root at 0).
const TEMPLATES: [(ChordType, [usize; 3]); 4] = [
    (ChordType::Major, [0, 4, 7]),
    (ChordType::Minor, [0, 3, 7]),
    (ChordType::Diminished, [0, 3, 6]),
    (ChordType::Augmented, [0, 4, 8]),
];

/// Detected chord for one heavy update.
#[derive(Clone, Copy)]
pub struct ChordFrame {
    /// Root pitch class, 0 = C.
    pub root: u8,
    /// Template quality.
    pub kind: ChordType,
    /// Winner minus runner-up score [0.0, 1.0].
    pub confidence: f32,
}

impl Default for ChordFrame {
    fn default() -> Self {
        Self {
            root: 0,
            kind: ChordType::Major,
            confidence: 0.0,
        }
    }
}

/// The detector. Accumulates chroma between heavy updates.
pub struct ChordDetector {
    accum: [f32; NUM_CHROMA],
    alpha: f32,
    last: ChordFrame,
}

impl ChordDetector {
    /// `alpha` is the accumulation EMA weight per update (~0.3 at 10 Hz
    /// gives a few-hundred-ms memory).
    #[must_use]
    pub fn new(alpha: f32) -> Self {
        Self {
            accum: [0.0; NUM_CHROMA],
            alpha: alpha.clamp(0.01, 1.0),
            last: ChordFrame::default(),
        }
    }

    /// Feed a heavy chroma update and rescore.
    pub fn update(&mut self, chroma: &[f32; NUM_CHROMA]) -> ChordFrame {
        for (acc, &c) in self.accum.iter_mut().zip(chroma) {
            *acc += (c - *acc) * self.alpha;
        }

        let total: f32 = self.accum.iter().sum();
        if total < 1e-4 {
            self.last = ChordFrame::default();
            return self.last;
        }

        let mut best = ChordFrame::default();
        let mut best_score = -1.0f32;
        let mut runner_up = -1.0f32;
        for root in 0..NUM_CHROMA {
            for (kind, intervals) in TEMPLATES {
                let mut score = 0.0f32;
                for off in intervals {
                    score += self.accum[(root + off) % NUM_CHROMA];
                }
                let score = score / total;
                if score > best_score {
                    runner_up = best_score;
                    best_score = score;
                    best = ChordFrame {
                        root: root as u8,
                        kind,
                        confidence: 0.0,
                    };
                } else if score > runner_up {
                    runner_up = score;
                }
            }
        }

        best.confidence = (best_score - runner_up.max(0.0)).clamp(0.0, 1.0);
        self.last = best;
        self.last
    }

    /// Drop all accumulated evidence (presence machine left Tracking).
    pub fn reset(&mut self) {
        self.accum = [0.0; NUM_CHROMA];
        self.last = ChordFrame::default();
    }

    /// Last scored frame.
    #[must_use]
    pub fn last(&self) -> ChordFrame {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chroma_for(pcs: &[usize]) -> [f32; NUM_CHROMA] {
        let mut c = [0.02f32; NUM_CHROMA];
        for &pc in pcs {
            c[pc] = 1.0;
        }
        c
    }

    #[test]
    fn c_major_triad_is_recognised() {
        let mut d = ChordDetector::new(0.5);
        // C, E, G
        let chroma = chroma_for(&[0, 4, 7]);
        let mut frame = ChordFrame::default();
        for _ in 0..10 {
            frame = d.update(&chroma);
        }
        assert_eq!(frame.root, 0);
        assert_eq!(frame.kind, ChordType::Major);
        assert!(frame.confidence > 0.0);
    }

    #[test]
    fn a_minor_triad_is_recognised() {
        let mut d = ChordDetector::new(0.5);
        // A, C, E
        let chroma = chroma_for(&[9, 0, 4]);
        let mut frame = ChordFrame::default();
        for _ in 0..10 {
            frame = d.update(&chroma);
        }
        assert_eq!(frame.root, 9);
        assert_eq!(frame.kind, ChordType::Minor);
    }

    #[test]
    fn silence_has_zero_confidence() {
        let mut d = ChordDetector::new(0.5);
        let frame = d.update(&[0.0; NUM_CHROMA]);
        assert_eq!(frame.confidence, 0.0);
    }
}
