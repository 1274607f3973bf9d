use crate::pixel::Rgb8;

/// Palettes 16 entrées compilées en dur, échantillonnage interpolé.
///
/// L'index fractionnaire `t ∈ [0,1)` interpole linéairement entre les deux
/// entrées voisines, avec bouclage de la dernière vers la première.

/// Number of entries per palette.
pub const PALETTE_SIZE: usize = 16;

/// One compiled-in palette: stable id, display name, 16 colour stops.
pub struct Palette {
    /// Stable palette id (index into [`PALETTES`]).
    pub id: u8,
    /// Human-readable name for UIs.
    pub name: &'static str,
    /// Colour stops.
    pub entries: [Rgb8; PALETTE_SIZE],
}

impl Palette {
    /// Échantillonne la palette à l'index fractionnaire `t ∈ [0,1)`.
    ///
    /// `t` hors plage est ramené par modulo ; l'interpolation boucle de la
    /// dernière entrée vers la première.
    ///
    /// # Example
    /// ```
    /// use lw_core::palette::PALETTES;
    /// let p = &PALETTES[0];
    /// let a = p.sample(0.0);
    /// assert_eq!(a, p.entries[0]);
    /// ```
    #[must_use]
    pub fn sample(&self, t: f32) -> Rgb8 {
        let t = t.rem_euclid(1.0);
        let pos = t * PALETTE_SIZE as f32;
        let idx = pos as usize % PALETTE_SIZE;
        let next = (idx + 1) % PALETTE_SIZE;
        let frac = pos - pos.floor();
        self.entries[idx].lerp(self.entries[next], frac)
    }
}

const fn rgb(r: u8, g: u8, b: u8) -> Rgb8 {
    Rgb8::new(r, g, b)
}

/// The compiled-in palette set. Ids are positions and never change.
pub static PALETTES: &[Palette] = &[
    Palette {
        id: 0,
        name: "aurora",
        entries: [
            rgb(0, 10, 30),
            rgb(0, 40, 60),
            rgb(0, 90, 90),
            rgb(0, 150, 110),
            rgb(20, 200, 120),
            rgb(80, 230, 110),
            rgb(150, 240, 120),
            rgb(90, 200, 160),
            rgb(40, 140, 180),
            rgb(30, 90, 190),
            rgb(60, 60, 200),
            rgb(110, 40, 180),
            rgb(160, 30, 140),
            rgb(110, 20, 90),
            rgb(50, 10, 60),
            rgb(10, 5, 40),
        ],
    },
    Palette {
        id: 1,
        name: "ember",
        entries: [
            rgb(5, 0, 0),
            rgb(30, 5, 0),
            rgb(70, 15, 0),
            rgb(120, 30, 0),
            rgb(180, 55, 0),
            rgb(220, 90, 5),
            rgb(255, 130, 10),
            rgb(255, 180, 30),
            rgb(255, 220, 70),
            rgb(255, 240, 130),
            rgb(255, 200, 60),
            rgb(235, 140, 20),
            rgb(190, 80, 5),
            rgb(130, 40, 0),
            rgb(70, 15, 0),
            rgb(25, 5, 0),
        ],
    },
    Palette {
        id: 2,
        name: "ocean",
        entries: [
            rgb(0, 5, 30),
            rgb(0, 15, 60),
            rgb(0, 30, 95),
            rgb(0, 55, 130),
            rgb(0, 85, 165),
            rgb(10, 120, 195),
            rgb(30, 160, 215),
            rgb(70, 200, 230),
            rgb(130, 230, 240),
            rgb(190, 250, 250),
            rgb(130, 230, 240),
            rgb(70, 200, 230),
            rgb(30, 160, 215),
            rgb(10, 120, 195),
            rgb(0, 55, 130),
            rgb(0, 15, 60),
        ],
    },
    Palette {
        id: 3,
        name: "violet-haze",
        entries: [
            rgb(10, 0, 20),
            rgb(30, 0, 50),
            rgb(60, 5, 90),
            rgb(95, 15, 135),
            rgb(135, 30, 175),
            rgb(175, 55, 205),
            rgb(210, 90, 225),
            rgb(240, 140, 240),
            rgb(255, 190, 250),
            rgb(240, 140, 240),
            rgb(210, 90, 225),
            rgb(175, 55, 205),
            rgb(135, 30, 175),
            rgb(95, 15, 135),
            rgb(60, 5, 90),
            rgb(30, 0, 50),
        ],
    },
    Palette {
        id: 4,
        name: "spectrum",
        entries: [
            rgb(255, 0, 0),
            rgb(255, 95, 0),
            rgb(255, 190, 0),
            rgb(225, 255, 0),
            rgb(130, 255, 0),
            rgb(35, 255, 0),
            rgb(0, 255, 60),
            rgb(0, 255, 155),
            rgb(0, 255, 250),
            rgb(0, 160, 255),
            rgb(0, 65, 255),
            rgb(30, 0, 255),
            rgb(125, 0, 255),
            rgb(220, 0, 255),
            rgb(255, 0, 190),
            rgb(255, 0, 95),
        ],
    },
    Palette {
        id: 5,
        name: "mono-warm",
        entries: [
            rgb(0, 0, 0),
            rgb(20, 14, 8),
            rgb(40, 28, 16),
            rgb(60, 43, 25),
            rgb(85, 60, 35),
            rgb(110, 78, 46),
            rgb(140, 100, 60),
            rgb(170, 124, 76),
            rgb(200, 150, 94),
            rgb(225, 175, 115),
            rgb(245, 200, 140),
            rgb(255, 220, 165),
            rgb(255, 235, 195),
            rgb(255, 245, 220),
            rgb(255, 250, 238),
            rgb(255, 255, 250),
        ],
    },
    Palette {
        id: 6,
        name: "neon-night",
        entries: [
            rgb(0, 0, 10),
            rgb(10, 0, 40),
            rgb(40, 0, 80),
            rgb(90, 0, 120),
            rgb(160, 0, 160),
            rgb(230, 0, 170),
            rgb(255, 30, 130),
            rgb(255, 80, 80),
            rgb(255, 140, 40),
            rgb(255, 200, 0),
            rgb(180, 230, 0),
            rgb(80, 250, 60),
            rgb(0, 240, 160),
            rgb(0, 190, 230),
            rgb(0, 110, 250),
            rgb(20, 30, 120),
        ],
    },
    Palette {
        id: 7,
        name: "glacier",
        entries: [
            rgb(5, 10, 25),
            rgb(15, 30, 55),
            rgb(30, 55, 90),
            rgb(50, 85, 125),
            rgb(75, 120, 160),
            rgb(105, 155, 195),
            rgb(140, 190, 220),
            rgb(180, 220, 240),
            rgb(220, 245, 255),
            rgb(255, 255, 255),
            rgb(220, 245, 255),
            rgb(180, 220, 240),
            rgb(140, 190, 220),
            rgb(105, 155, 195),
            rgb(75, 120, 160),
            rgb(30, 55, 90),
        ],
    },
];

/// Slot mutable "palette active". Sélection inconnue : ignorée et loguée.
///
/// # Example
/// ```
/// use lw_core::palette::PaletteStore;
/// let mut store = PaletteStore::default();
/// store.set_active(3);
/// assert_eq!(store.active_id(), 3);
/// store.set_active(200); // unknown, ignored
/// assert_eq!(store.active_id(), 3);
/// ```
#[derive(Default)]
pub struct PaletteStore {
    active: u8,
}

impl PaletteStore {
    /// Currently selected palette id.
    #[inline]
    #[must_use]
    pub fn active_id(&self) -> u8 {
        self.active
    }

    /// The currently selected palette.
    #[inline]
    #[must_use]
    pub fn active(&self) -> &'static Palette {
        &PALETTES[self.active as usize]
    }

    /// Select a palette by id. Unknown ids are ignored and logged.
    pub fn set_active(&mut self, id: u8) {
        if (id as usize) < PALETTES.len() {
            self.active = id;
        } else {
            log::warn!("unknown palette id {id}, keeping {}", self.active);
        }
    }

    /// Sample palette `id` at fractional index `t`; unknown id → black.
    #[must_use]
    pub fn sample(id: u8, t: f32) -> Rgb8 {
        PALETTES
            .get(id as usize)
            .map_or(Rgb8::BLACK, |p| p.sample(t))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_match_positions() {
        for (i, p) in PALETTES.iter().enumerate() {
            assert_eq!(usize::from(p.id), i);
        }
    }

    #[test]
    fn sample_interpolates_between_entries() {
        let p = &PALETTES[4];
        let half = p.sample(0.5 / 16.0);
        let expected = p.entries[0].lerp(p.entries[1], 0.5);
        assert_eq!(half, expected);
    }

    #[test]
    fn sample_wraps_from_last_to_first() {
        let p = &PALETTES[1];
        let near_end = p.sample(15.5 / 16.0);
        let expected = p.entries[15].lerp(p.entries[0], 0.5);
        assert_eq!(near_end, expected);
    }

    #[test]
    fn unknown_palette_samples_black() {
        assert_eq!(PaletteStore::sample(250, 0.3), Rgb8::BLACK);
    }
}
