use crate::pixel::Rgb8;

/// Convertit RGB [0,255] → HSV. H ∈ [0.0, 1.0), S ∈ [0.0, 1.0], V ∈ [0.0, 1.0].
///
/// # Example
/// ```
/// use lw_core::color::rgb_to_hsv;
/// use lw_core::pixel::Rgb8;
/// let (h, s, v) = rgb_to_hsv(Rgb8::new(255, 0, 0));
/// assert!((h - 0.0).abs() < 0.01);
/// assert!((s - 1.0).abs() < 0.01);
/// assert!((v - 1.0).abs() < 0.01);
/// ```
#[must_use]
pub fn rgb_to_hsv(px: Rgb8) -> (f32, f32, f32) {
    let r = f32::from(px.r) / 255.0;
    let g = f32::from(px.g) / 255.0;
    let b = f32::from(px.b) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    let s = if max == 0.0 { 0.0 } else { delta / max };
    let h = if delta == 0.0 {
        0.0
    } else if (max - r).abs() < f32::EPSILON {
        (((g - b) / delta) % 6.0) / 6.0
    } else if (max - g).abs() < f32::EPSILON {
        ((b - r) / delta + 2.0) / 6.0
    } else {
        ((r - g) / delta + 4.0) / 6.0
    };
    let h = if h < 0.0 { h + 1.0 } else { h };

    (h, s, v)
}

/// Convertit HSV → RGB [0,255]. H ∈ [0.0, 1.0), S ∈ [0.0, 1.0], V ∈ [0.0, 1.0].
///
/// # Example
/// ```
/// use lw_core::color::hsv_to_rgb;
/// use lw_core::pixel::Rgb8;
/// assert_eq!(hsv_to_rgb(0.0, 1.0, 1.0), Rgb8::new(255, 0, 0));
/// ```
#[must_use]
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb8 {
    let h = h * 6.0;
    let i = h.floor() as u32;
    let f = h - i as f32;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    let (r, g, b) = match i % 6 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    };

    Rgb8::new(
        (r * 255.0) as u8,
        (g * 255.0) as u8,
        (b * 255.0) as u8,
    )
}

/// Désature un pixel vers son niveau de gris, `amount` ∈ [0.0, 1.0].
///
/// # Example
/// ```
/// use lw_core::color::desaturate;
/// use lw_core::pixel::Rgb8;
/// let grey = desaturate(Rgb8::new(255, 0, 0), 1.0);
/// assert_eq!(grey.r, grey.g);
/// ```
#[must_use]
pub fn desaturate(px: Rgb8, amount: f32) -> Rgb8 {
    let grey = px.luminance();
    px.lerp(Rgb8::new(grey, grey, grey), amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_hsv_roundtrip() {
        for r in (0..=255).step_by(51) {
            for g in (0..=255).step_by(51) {
                for b in (0..=255).step_by(51) {
                    let px = Rgb8::new(r as u8, g as u8, b as u8);
                    let (h, s, v) = rgb_to_hsv(px);
                    let back = hsv_to_rgb(h, s, v);
                    assert!(i16::from(back.r).abs_diff(i16::from(px.r)) <= 2);
                    assert!(i16::from(back.g).abs_diff(i16::from(px.g)) <= 2);
                    assert!(i16::from(back.b).abs_diff(i16::from(px.b)) <= 2);
                }
            }
        }
    }

    #[test]
    fn full_desaturate_is_grey() {
        let grey = desaturate(Rgb8::new(10, 200, 90), 1.0);
        assert_eq!(grey.r, grey.g);
        assert_eq!(grey.g, grey.b);
    }
}
