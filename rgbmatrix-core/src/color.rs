//! RGB color value and the named colors used by the demos.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MatrixError;

// ── Rgb ──────────────────────────────────────────────────────────

/// One LED color, 8 bits per channel.
///
/// Serialized as a three-element array `[r, g, b]` so config files read
/// the same way the color tables do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

impl From<Rgb> for [u8; 3] {
    fn from(c: Rgb) -> Self {
        [c.r, c.g, c.b]
    }
}

impl From<(u8, u8, u8)> for Rgb {
    fn from((r, g, b): (u8, u8, u8)) -> Self {
        Self { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

/// Parses `"r,g,b"` (whitespace around components allowed) or one of the
/// names accepted by [`by_name`].
impl FromStr for Rgb {
    type Err = MatrixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.contains(',') {
            return by_name(s).ok_or_else(|| MatrixError::InvalidColor(s.to_string()));
        }
        let mut parts = s.split(',').map(str::trim);
        let mut channel = || -> Result<u8, MatrixError> {
            parts
                .next()
                .ok_or_else(|| MatrixError::InvalidColor(s.to_string()))?
                .parse::<u8>()
                .map_err(|_| MatrixError::InvalidColor(s.to_string()))
        };
        let color = Rgb::new(channel()?, channel()?, channel()?);
        if parts.next().is_some() {
            return Err(MatrixError::InvalidColor(s.to_string()));
        }
        Ok(color)
    }
}

// ── Named colors ─────────────────────────────────────────────────

pub const GRAY: Rgb = Rgb::new(100, 100, 100);
pub const NAVY_BLUE: Rgb = Rgb::new(60, 60, 100);
pub const WHITE: Rgb = Rgb::new(255, 255, 255);
pub const RED: Rgb = Rgb::new(255, 0, 0);
pub const GREEN: Rgb = Rgb::new(0, 255, 0);
pub const BLUE: Rgb = Rgb::new(0, 0, 255);
pub const YELLOW: Rgb = Rgb::new(255, 255, 0);
pub const ORANGE: Rgb = Rgb::new(255, 128, 0);
pub const PURPLE: Rgb = Rgb::new(255, 0, 255);
pub const CYAN: Rgb = Rgb::new(0, 255, 255);
pub const BLACK: Rgb = Rgb::new(0, 0, 0);

/// Background color used when a grid is cleared.
pub const BG_COLOR: Rgb = BLACK;

// Dimmed variants; the physical LEDs are painfully bright at full scale.
pub const LED_RED: Rgb = Rgb::new(10, 0, 0);
pub const LED_GREEN: Rgb = Rgb::new(0, 10, 0);
pub const LED_BLUE: Rgb = Rgb::new(0, 0, 20);
pub const LED_WHITE: Rgb = Rgb::new(10, 10, 20);

/// Look up a named color (case-insensitive, `_`/`-` interchangeable).
pub fn by_name(name: &str) -> Option<Rgb> {
    let key = name.trim().to_ascii_lowercase().replace('-', "_");
    let color = match key.as_str() {
        "gray" | "grey" => GRAY,
        "navy_blue" | "navyblue" => NAVY_BLUE,
        "white" => WHITE,
        "red" => RED,
        "green" => GREEN,
        "blue" => BLUE,
        "yellow" => YELLOW,
        "orange" => ORANGE,
        "purple" => PURPLE,
        "cyan" => CYAN,
        "black" => BLACK,
        "led_red" => LED_RED,
        "led_green" => LED_GREEN,
        "led_blue" => LED_BLUE,
        "led_white" => LED_WHITE,
        _ => return None,
    };
    Some(color)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_triplet() {
        let c: Rgb = "50, 250,50".parse().unwrap();
        assert_eq!(c, Rgb::new(50, 250, 50));
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!("1,2".parse::<Rgb>().is_err());
        assert!("1,2,3,4".parse::<Rgb>().is_err());
        assert!("256,0,0".parse::<Rgb>().is_err());
        assert!("mauve".parse::<Rgb>().is_err());
        assert!("".parse::<Rgb>().is_err());
    }

    #[test]
    fn parse_accepts_names() {
        assert_eq!("red".parse::<Rgb>().unwrap(), RED);
        assert_eq!("LED-White".parse::<Rgb>().unwrap(), LED_WHITE);
    }

    #[test]
    fn display_is_css() {
        assert_eq!(LED_BLUE.to_string(), "rgb(0, 0, 20)");
    }

    #[test]
    fn named_lookup() {
        assert_eq!(by_name("Navy-Blue"), Some(NAVY_BLUE));
        assert_eq!(by_name("led_white"), Some(LED_WHITE));
        assert_eq!(by_name("mauve"), None);
    }
}
