//! Display colours used to tell employees apart in schedules.

use rand_core::{OsRng, RngCore};

/// Stored colour meaning "nothing chosen yet"; replaced on first save.
pub const DEFAULT_COLOR: &str = "c4dce8";

/// Colour assigned to imported rows that leave the column blank.
pub const IMPORT_FALLBACK_COLOR: &str = "AAAAAA";

/// A random light colour from the operating system RNG.
pub fn random_light() -> String { random_light_with(&mut OsRng) }

/// A random light colour as six lowercase hex digits without a leading `#`.
///
/// Hue is uniform; saturation stays in 55–85 % and lightness in 75–90 % so
/// dark text stays readable on top of it.
pub fn random_light_with(rng: &mut impl RngCore) -> String {
  loop {
    let hue = f64::from(rng.next_u32() % 360);
    let saturation = f64::from(55 + rng.next_u32() % 31) / 100.0;
    let lightness = f64::from(75 + rng.next_u32() % 16) / 100.0;

    let (r, g, b) = hsl_to_rgb(hue, saturation, lightness);
    let hex = format!("{r:02x}{g:02x}{b:02x}");
    if hex != DEFAULT_COLOR {
      return hex;
    }
  }
}

fn hsl_to_rgb(h: f64, s: f64, l: f64) -> (u8, u8, u8) {
  let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
  let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
  let m = l - c / 2.0;

  let (r, g, b) = match h as u32 {
    0..60 => (c, x, 0.0),
    60..120 => (x, c, 0.0),
    120..180 => (0.0, c, x),
    180..240 => (0.0, x, c),
    240..300 => (x, 0.0, c),
    _ => (c, 0.0, x),
  };

  let channel = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
  (channel(r), channel(g), channel(b))
}

/// Whether `value` is six hex digits (either case).
pub fn is_hex_color(value: &str) -> bool {
  value.len() == 6 && value.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn random_colours_are_light_hex() {
    for _ in 0..200 {
      let c = random_light();
      assert!(is_hex_color(&c), "{c}");
      assert_ne!(c, DEFAULT_COLOR);

      let channels: Vec<u8> = (0..3)
        .map(|i| u8::from_str_radix(&c[i * 2..i * 2 + 2], 16).unwrap())
        .collect();
      let max = *channels.iter().max().unwrap();
      // lightness >= 75 % keeps the brightest channel well above mid-grey.
      assert!(max >= 191, "{c} is too dark");
    }
  }

  #[test]
  fn hsl_primary_hues() {
    assert_eq!(hsl_to_rgb(0.0, 1.0, 0.5), (255, 0, 0));
    assert_eq!(hsl_to_rgb(120.0, 1.0, 0.5), (0, 255, 0));
    assert_eq!(hsl_to_rgb(240.0, 1.0, 0.5), (0, 0, 255));
  }

  #[test]
  fn hex_check() {
    assert!(is_hex_color("c4dce8"));
    assert!(is_hex_color("AAAAAA"));
    assert!(!is_hex_color("#c4dce"));
    assert!(!is_hex_color("zzzzzz"));
  }
}
