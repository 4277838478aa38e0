//! Panel configuration file
//!
//! TOML document describing one display: model and buffer settings, SPI bus
//! settings, and the GPIO lines the control pins are wired to.
//!
//! ```toml
//! [display]
//! model = "tft35"
//! color_mode = "rgb565"
//! rotation = "0"
//! update_interval_ms = 1000
//!
//! [spi]
//! clock_hz = 20000000
//! bit_order = "msb_first"
//!
//! [pins]
//! dc = 24
//! reset = 25
//! backlight = 18
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use ili9486_spi_display::config::DEFAULT_UPDATE_INTERVAL_MS;
use ili9486_spi_display::hal::spi::{BitOrder, ClockPhase, ClockPolarity, MAX_CLOCK_HZ};
use ili9486_spi_display::{ColorMode, DisplayConfig, Model, Rotation, SpiConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration file errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("spi.clock_hz {0} Hz is outside 1..={1} Hz")]
    ClockOutOfRange(u32, u32),

    #[error("display.update_interval_ms must be greater than zero")]
    ZeroInterval,

    #[error("GPIO {0} is assigned to more than one control line")]
    PinConflict(u8),
}

/// `[display]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySection {
    pub model: Model,
    pub color_mode: ColorMode,
    pub rotation: Rotation,
    pub invert_colors: bool,
    pub update_interval_ms: u32,
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            model: Model::Tft35,
            color_mode: ColorMode::Rgb565,
            rotation: Rotation::Deg0,
            invert_colors: false,
            update_interval_ms: DEFAULT_UPDATE_INTERVAL_MS,
        }
    }
}

/// `[pins]` section: GPIO numbers, reset and backlight are optional
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinSection {
    pub dc: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backlight: Option<u8>,
}

impl Default for PinSection {
    fn default() -> Self {
        Self {
            dc: 24,
            reset: Some(25),
            backlight: Some(18),
        }
    }
}

/// Complete panel file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelFile {
    pub display: DisplaySection,
    pub spi: SpiConfig,
    pub pins: PinSection,
}

impl PanelFile {
    /// Load and validate a panel file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        file.validate()?;
        Ok(file)
    }

    /// Load `path`, or the defaults when no path was given
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        fs::write(path, self.to_toml()?).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Hard errors: settings the driver cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spi.clock_hz == 0 || self.spi.clock_hz > MAX_CLOCK_HZ {
            return Err(ConfigError::ClockOutOfRange(self.spi.clock_hz, MAX_CLOCK_HZ));
        }
        if self.display.update_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        let mut used = vec![self.pins.dc];
        for pin in [self.pins.reset, self.pins.backlight].into_iter().flatten() {
            if used.contains(&pin) {
                return Err(ConfigError::PinConflict(pin));
            }
            used.push(pin);
        }
        Ok(())
    }

    /// Settings that run but are unlikely to be what the panel expects
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.spi.bit_order != BitOrder::MsbFirst {
            warnings.push("ILI9486 expects MSB-first transfers".to_string());
        }
        if self.spi.polarity != ClockPolarity::IdleLow || self.spi.phase != ClockPhase::Leading {
            warnings.push(format!(
                "SPI mode {} configured, ILI9486 samples in mode 0",
                self.spi.mode_number()
            ));
        }
        if self.pins.reset.is_none() {
            warnings.push("no reset line: relying on software reset only".to_string());
        }
        if self.display.update_interval_ms < 16 {
            warnings.push(format!(
                "update interval {} ms is shorter than a 60 Hz frame",
                self.display.update_interval_ms
            ));
        }
        warnings
    }

    /// Driver configuration for this file
    pub fn display_config(&self) -> DisplayConfig {
        DisplayConfig {
            model: self.display.model,
            color_mode: self.display.color_mode,
            rotation: self.display.rotation,
            invert_colors: self.display.invert_colors,
            update_interval_ms: self.display.update_interval_ms,
            spi: self.spi,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_matches_driver_defaults() {
        let file = PanelFile::default();
        assert_eq!(file.display_config(), DisplayConfig::default());
        assert!(file.validate().is_ok());
        assert!(file.warnings().is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("panel.toml");

        let mut file = PanelFile::default();
        file.display.color_mode = ColorMode::Rgb332;
        file.display.rotation = Rotation::Deg90;
        file.pins.backlight = None;
        file.save(&path).unwrap();

        let loaded = PanelFile::load(&path).unwrap();
        assert_eq!(loaded, file);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let file: PanelFile = toml::from_str("[display]\ncolor_mode = \"rgb332\"\n").unwrap();
        assert_eq!(file.display.color_mode, ColorMode::Rgb332);
        assert_eq!(file.spi, SpiConfig::DISPLAY);
        assert_eq!(file.pins, PinSection::default());
    }

    #[test]
    fn test_clock_out_of_range() {
        let mut file = PanelFile::default();
        file.spi.clock_hz = 40_000_000;
        assert!(matches!(file.validate(), Err(ConfigError::ClockOutOfRange(40_000_000, _))));
        file.spi.clock_hz = 0;
        assert!(file.validate().is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut file = PanelFile::default();
        file.display.update_interval_ms = 0;
        assert!(matches!(file.validate(), Err(ConfigError::ZeroInterval)));
    }

    #[test]
    fn test_pin_conflict() {
        let mut file = PanelFile::default();
        file.pins.backlight = Some(24);
        assert!(matches!(file.validate(), Err(ConfigError::PinConflict(24))));
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[display\nmodel = 3").unwrap();
        let err = PanelFile::load(&path).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_mode_warning() {
        let mut file = PanelFile::default();
        file.spi.phase = ClockPhase::Trailing;
        let warnings = file.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("mode 1"));
    }
}
