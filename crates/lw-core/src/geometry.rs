/// Géométrie des deux rubans : constantes compile-time et aides centre-origine.
///
/// Les deux rubans de 160 LEDs sont adressés à plat : strip 0 occupe les
/// indices 0..160, strip 1 les indices 160..320. Chaque ruban a sa paire
/// centrale (79/80 et 239/240) ; les effets centre-origine écrivent les
/// quatre indices miroirs ensemble.

/// LEDs per physical strip.
pub const LEDS_PER_STRIP: usize = 160;
/// Number of physical strips.
pub const NUM_STRIPS: usize = 2;
/// Total addressable LEDs.
pub const LED_COUNT: usize = LEDS_PER_STRIP * NUM_STRIPS;
/// Left index of the centre pair on strip 0.
pub const CENTRE_LEFT: usize = 79;
/// Right index of the centre pair on strip 0.
pub const CENTRE_RIGHT: usize = 80;
/// Distance range for centre-origin writes: `d ∈ 0..HALF_SPAN`.
pub const HALF_SPAN: usize = LEDS_PER_STRIP / 2;

/// Distance d'un pixel à la paire centrale de son ruban.
///
/// # Example
/// ```
/// use lw_core::geometry::pair_distance;
/// assert_eq!(pair_distance(79), 0);
/// assert_eq!(pair_distance(80), 0);
/// assert_eq!(pair_distance(0), 79);
/// assert_eq!(pair_distance(159), 79);
/// assert_eq!(pair_distance(239), 0);
/// ```
#[inline]
#[must_use]
pub fn pair_distance(i: usize) -> usize {
    let local = i % LEDS_PER_STRIP;
    local
        .abs_diff(CENTRE_LEFT)
        .min(local.abs_diff(CENTRE_RIGHT))
}

/// The four mirrored indices for a given centre distance, or `None` if
/// `d` falls outside the strip half-span.
#[inline]
#[must_use]
pub fn mirror_indices(d: usize) -> Option<[usize; 4]> {
    if d >= HALF_SPAN {
        return None;
    }
    Some([
        CENTRE_LEFT - d,
        CENTRE_RIGHT + d,
        LEDS_PER_STRIP + CENTRE_LEFT - d,
        LEDS_PER_STRIP + CENTRE_RIGHT + d,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halves_have_equal_length() {
        assert_eq!(CENTRE_LEFT + 1, LEDS_PER_STRIP - CENTRE_RIGHT);
        assert_eq!(HALF_SPAN * 2, LEDS_PER_STRIP);
    }

    #[test]
    fn mirror_indices_cover_the_whole_strip() {
        let mut seen = [false; LED_COUNT];
        for d in 0..HALF_SPAN {
            for idx in mirror_indices(d).unwrap_or_default() {
                seen[idx] = true;
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn out_of_range_distance_is_none() {
        assert!(mirror_indices(HALF_SPAN).is_none());
        assert!(mirror_indices(usize::MAX).is_none());
    }

    #[test]
    fn pair_distance_symmetry() {
        for d in 0..HALF_SPAN {
            for idx in mirror_indices(d).unwrap_or_default() {
                assert_eq!(pair_distance(idx), d);
            }
        }
    }
}
