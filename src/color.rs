use palette::{Hsl, IntoColor, Srgb};
use serde::{Deserialize, Serialize};

/// Semantic color slots, in the order palette bytes arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Behind,
    Below,
    Above,
    Within,
    Marks,
    Text,
    Solar,
}

pub const PALETTE_SIZE: usize = 7;

/// ARGB2222 bytes: two bits of alpha, red, green and blue.
pub const DEFAULT_PALETTE: [u8; PALETTE_SIZE] = [
    0b1110_1010,
    0b1101_1011,
    0b1111_1101,
    0b1111_1111,
    0b1100_0000,
    0b1100_0000,
    0b1111_1111,
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColorDepth {
    #[default]
    Color,
    Mono,
}

/// Decode one palette byte for the given display depth.
pub fn color_from_config(cc: u8, depth: ColorDepth) -> Srgb<u8> {
    match depth {
        ColorDepth::Color => {
            let channel = |shift: u8| ((cc >> shift) & 0x03) * 0x55;
            Srgb::new(channel(4), channel(2), channel(0))
        }
        ColorDepth::Mono => {
            if cc & 0x3f == 0 {
                Srgb::new(0, 0, 0)
            } else {
                Srgb::new(255, 255, 255)
            }
        }
    }
}

/// Darken (negative `bias`) or lighten a color in HSL space, one sixth of the
/// lightness range per step.
pub fn shade(color: Srgb<u8>, bias: i8) -> Srgb<u8> {
    if bias == 0 {
        return color;
    }
    let hsl: Hsl = color.into_format::<f32>().into_color();
    let lightness = (hsl.lightness + bias as f32 / 6.0).clamp(0.0, 1.0);
    let rgb: Srgb = Hsl::new(hsl.hue, hsl.saturation, lightness).into_color();
    rgb.into_format()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    depth: ColorDepth,
    bytes: [u8; PALETTE_SIZE],
    colors: [Srgb<u8>; PALETTE_SIZE],
}

impl Palette {
    pub fn new(depth: ColorDepth) -> Self {
        let mut palette = Self {
            depth,
            bytes: DEFAULT_PALETTE,
            colors: [Srgb::new(0, 0, 0); PALETTE_SIZE],
        };
        palette.apply(&DEFAULT_PALETTE);
        palette
    }

    /// Overwrite slots from the front; trailing slots keep their colors when
    /// `bytes` is short and extra bytes are ignored.
    pub fn apply(&mut self, bytes: &[u8]) -> usize {
        let count = bytes.len().min(PALETTE_SIZE);
        for (k, &cc) in bytes.iter().take(count).enumerate() {
            self.bytes[k] = cc;
            self.colors[k] = color_from_config(cc, self.depth);
        }
        count
    }

    pub fn get(&self, slot: Slot) -> Srgb<u8> {
        self.colors[slot as usize]
    }

    pub fn bytes(&self) -> &[u8; PALETTE_SIZE] {
        &self.bytes
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(ColorDepth::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_two_bit_channels() {
        assert_eq!(color_from_config(0b1111_1111, ColorDepth::Color), Srgb::new(255, 255, 255));
        assert_eq!(color_from_config(0b1100_0000, ColorDepth::Color), Srgb::new(0, 0, 0));
        assert_eq!(color_from_config(0b1110_0100, ColorDepth::Color), Srgb::new(170, 85, 0));
    }

    #[test]
    fn mono_keeps_only_black_and_white() {
        assert_eq!(color_from_config(0b1100_0000, ColorDepth::Mono), Srgb::new(0, 0, 0));
        assert_eq!(color_from_config(0b1100_0001, ColorDepth::Mono), Srgb::new(255, 255, 255));
    }

    #[test]
    fn short_palette_keeps_trailing_defaults() {
        let mut palette = Palette::default();
        let applied = palette.apply(&[0b1100_0011, 0b1111_0000]);
        assert_eq!(applied, 2);
        assert_eq!(palette.get(Slot::Behind), Srgb::new(0, 0, 255));
        assert_eq!(palette.get(Slot::Below), Srgb::new(255, 0, 0));
        assert_eq!(
            palette.get(Slot::Solar),
            color_from_config(DEFAULT_PALETTE[6], ColorDepth::Color)
        );
        assert_eq!(palette.bytes()[2..], DEFAULT_PALETTE[2..]);
    }

    #[test]
    fn long_palette_is_truncated() {
        let mut palette = Palette::default();
        assert_eq!(palette.apply(&[0xff; 12]), PALETTE_SIZE);
        assert_eq!(palette.bytes(), &[0xff; PALETTE_SIZE]);
    }

    #[test]
    fn shade_darkens() {
        let yellow = Srgb::new(255u8, 255, 0);
        let darker = shade(yellow, -3);
        assert!(darker.red < yellow.red);
        assert_eq!(shade(yellow, 0), yellow);
    }
}
