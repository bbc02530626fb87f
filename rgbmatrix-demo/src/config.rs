//! Demo configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use rgbmatrix_core::{PreviewConfig, Rgb};

use crate::animation::Animation;

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Which backend to drive.
    pub transport: TransportConfig,
    /// Serial settings for the board.
    pub uart: UartConfig,
    /// Browser preview settings.
    pub preview: PreviewConfig,
    /// What to play.
    pub animation: AnimationConfig,
    /// Logging.
    pub logging: LoggingConfig,
}

/// Backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Browser stand-in on localhost.
    #[default]
    Preview,
    /// FPGA board on a serial port.
    Uart,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub kind: TransportKind,
}

/// Serial settings. Baud rate and framing are fixed by the board.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UartConfig {
    /// Port name, e.g. `COM6` or `/dev/ttyUSB0`.
    pub port: String,
}

/// Animation settings. Color and delay fall back to the animation's own
/// when left out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub name: Animation,
    /// Paint color as `[r, g, b]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgb>,
    /// Grid fill before the first frame.
    pub background: Rgb,
    /// Delay between frames in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
}

impl AnimationConfig {
    pub fn color(&self) -> Rgb {
        self.color.unwrap_or_else(|| self.name.default_color())
    }

    pub fn delay(&self) -> Duration {
        self.delay_ms
            .map(Duration::from_millis)
            .unwrap_or_else(|| self.name.default_delay())
    }
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level.
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for UartConfig {
    fn default() -> Self {
        Self {
            port: if cfg!(windows) {
                "COM6".into()
            } else {
                "/dev/ttyUSB0".into()
            },
        }
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            name: Animation::Snake,
            color: None,
            background: rgbmatrix_core::color::BG_COLOR,
            delay_ms: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("cannot write config {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl DemoConfig {
    /// Read a TOML file. A missing file is `Ok(None)`, so the caller can
    /// fall back to defaults and report it once logging is up.
    pub fn read(path: &Path) -> Result<Option<Self>, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&contents)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    /// The default config as TOML text.
    pub fn default_toml() -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&Self::default())?)
    }

    /// Write default config to a file.
    pub fn write_default(path: &Path) -> Result<(), ConfigError> {
        let text = Self::default_toml()?;
        std::fs::write(path, text).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let text = DemoConfig::default_toml().unwrap();
        assert!(text.contains("[preview]"));
        assert!(text.contains("[animation]"));
        assert!(text.contains("kind = \"preview\""));
    }

    #[test]
    fn roundtrip_config() {
        let text = DemoConfig::default_toml().unwrap();
        let parsed: DemoConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.preview.port, 8000);
        assert_eq!(parsed.animation.name, Animation::Snake);
        assert_eq!(parsed.animation.color(), Rgb::new(50, 250, 50));
        assert_eq!(parsed.animation.delay(), Duration::from_millis(100));
    }

    #[test]
    fn animation_defaults_follow_the_animation() {
        let diagonal = AnimationConfig {
            name: Animation::Diagonal,
            ..AnimationConfig::default()
        };
        assert_eq!(diagonal.color(), Rgb::new(200, 0, 0));
        assert_eq!(diagonal.delay(), Duration::from_millis(300));

        let tuned = AnimationConfig {
            name: Animation::Diagonal,
            color: Some(Rgb::new(1, 2, 3)),
            delay_ms: Some(20),
            ..AnimationConfig::default()
        };
        assert_eq!(tuned.color(), Rgb::new(1, 2, 3));
        assert_eq!(tuned.delay(), Duration::from_millis(20));
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let parsed: DemoConfig = toml::from_str(
            r#"
            [transport]
            kind = "uart"

            [uart]
            port = "COM43"

            [animation]
            name = "diagonal"
            color = [200, 0, 0]
            "#,
        )
        .unwrap();
        assert_eq!(parsed.transport.kind, TransportKind::Uart);
        assert_eq!(parsed.uart.port, "COM43");
        assert_eq!(parsed.animation.name, Animation::Diagonal);
        assert_eq!(parsed.animation.color(), Rgb::new(200, 0, 0));
        assert_eq!(parsed.animation.delay(), Duration::from_millis(300));
        assert!(parsed.preview.open_browser);
    }

    #[test]
    fn write_and_read() {
        let path = std::env::temp_dir().join(format!("rgbmatrix-demo-{}.toml", std::process::id()));
        DemoConfig::write_default(&path).unwrap();
        let loaded = DemoConfig::read(&path).unwrap().expect("config present");
        assert_eq!(loaded.logging.level, "info");
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn read_reports_missing_and_invalid_files() {
        let dir = std::env::temp_dir();
        let missing = dir.join(format!("rgbmatrix-demo-missing-{}.toml", std::process::id()));
        assert!(DemoConfig::read(&missing).unwrap().is_none());

        let broken = dir.join(format!("rgbmatrix-demo-broken-{}.toml", std::process::id()));
        std::fs::write(&broken, "[animation\nname = 3").unwrap();
        let err = DemoConfig::read(&broken).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("invalid config"));
        std::fs::remove_file(&broken).ok();
    }
}
