//! Configuration loading from TOML files (std only).
//!
//! Driver options live in `[tmc2130.<stepper>]`; the stepper's own section
//! `[<stepper>]` provides its geometry.

use std::fs;
use std::path::Path;

use toml::{Table, Value};

use crate::error::{error_name, ConfigError, Error, Result};

use super::{ConfigSource, DriverConfig, StepperGeometry};

/// Table holding one section per driven stepper.
pub const DRIVER_TABLE: &str = "tmc2130";

/// A parsed TOML configuration document.
#[derive(Debug, Clone)]
pub struct TomlConfig {
    root: Table,
}

/// One section of a [`TomlConfig`].
#[derive(Debug, Clone, Copy)]
pub struct TomlSection<'a> {
    name: &'a str,
    table: &'a Table,
}

/// Load configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
///
/// # Example
///
/// ```rust,ignore
/// use tmc2130::load_config;
///
/// let config = load_config("printer.toml")?;
/// let driver = config.driver_config("stepper_x")?;
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<TomlConfig> {
    let content = fs::read_to_string(path.as_ref()).map_err(|e| {
        let msg = heapless::String::try_from(e.to_string().as_str()).unwrap_or_default();
        Error::Config(ConfigError::IoError(msg))
    })?;

    parse_config(&content)
}

/// Parse configuration from a TOML string.
///
/// # Errors
///
/// Returns an error if the TOML is invalid.
pub fn parse_config(content: &str) -> Result<TomlConfig> {
    let root: Table = toml::from_str(content).map_err(|e| {
        let msg = heapless::String::try_from(e.message()).unwrap_or_default();
        Error::Config(ConfigError::ParseError(msg))
    })?;

    Ok(TomlConfig { root })
}

impl TomlConfig {
    /// Section at a dotted path, e.g. `"tmc2130.stepper_x"`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::SectionNotFound` if any path element is missing
    /// or not a table.
    pub fn section<'a>(&'a self, path: &'a str) -> core::result::Result<TomlSection<'a>, ConfigError> {
        let mut table = &self.root;
        for key in path.split('.') {
            table = match table.get(key) {
                Some(Value::Table(t)) => t,
                _ => return Err(ConfigError::SectionNotFound(error_name(path))),
            };
        }
        Ok(TomlSection { name: path, table })
    }

    /// Driver section of `stepper`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::SectionNotFound` if the section is missing.
    pub fn driver_section<'a>(&'a self, stepper: &str) -> core::result::Result<TomlSection<'a>, ConfigError> {
        match self.root.get(DRIVER_TABLE) {
            Some(Value::Table(drivers)) => match drivers.iter().find(|(key, _)| key.as_str() == stepper) {
                Some((key, Value::Table(table))) => Ok(TomlSection {
                    name: key.as_str(),
                    table,
                }),
                _ => Err(ConfigError::SectionNotFound(error_name(stepper))),
            },
            _ => Err(ConfigError::SectionNotFound(error_name(DRIVER_TABLE))),
        }
    }

    /// Geometry from the `[<stepper>]` section.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::SectionNotFound` if the section is missing, or
    /// `ConfigError::ParseError` if it does not describe a stepper.
    pub fn stepper_geometry(&self, stepper: &str) -> core::result::Result<StepperGeometry, ConfigError> {
        let value = self
            .root
            .get(stepper)
            .ok_or_else(|| ConfigError::SectionNotFound(error_name(stepper)))?;
        value.clone().try_into().map_err(|e: toml::de::Error| {
            ConfigError::ParseError(heapless::String::try_from(e.message()).unwrap_or_default())
        })
    }

    /// Load the [`DriverConfig`] for `stepper`.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a section is missing or an option is invalid.
    pub fn driver_config(&self, stepper: &str) -> core::result::Result<DriverConfig, ConfigError> {
        let geometry = self.stepper_geometry(stepper)?;
        DriverConfig::load(&self.driver_section(stepper)?, geometry.step_distance)
    }
}

impl<'a> ConfigSource for TomlSection<'a> {
    fn section_name(&self) -> &str {
        self.name
    }

    fn raw_string(&self, name: &str) -> core::result::Result<Option<&str>, ConfigError> {
        match self.table.get(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(wrong_type(name, "string")),
        }
    }

    fn raw_float(&self, name: &str) -> core::result::Result<Option<f32>, ConfigError> {
        match self.table.get(name) {
            None => Ok(None),
            Some(Value::Float(f)) => Ok(Some(*f as f32)),
            Some(Value::Integer(i)) => Ok(Some(*i as f32)),
            Some(_) => Err(wrong_type(name, "float")),
        }
    }

    fn raw_int(&self, name: &str) -> core::result::Result<Option<i64>, ConfigError> {
        match self.table.get(name) {
            None => Ok(None),
            Some(Value::Integer(i)) => Ok(Some(*i)),
            Some(_) => Err(wrong_type(name, "integer")),
        }
    }

    fn raw_bool(&self, name: &str) -> core::result::Result<Option<bool>, ConfigError> {
        match self.table.get(name) {
            None => Ok(None),
            Some(Value::Boolean(b)) => Ok(Some(*b)),
            Some(_) => Err(wrong_type(name, "boolean")),
        }
    }
}

fn wrong_type(option: &str, expected: &'static str) -> ConfigError {
    ConfigError::WrongType {
        option: error_name(option),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
[stepper_x]
step_distance = 0.0125

[tmc2130.stepper_x]
run_current = 0.8
hold_current = 0.5
microsteps = 16
stealthchop_threshold = 250
diag1_pin = "PA1"
driver_SGT = -2
"#;

    #[test]
    fn test_parse_driver_section() {
        let config = parse_config(CONFIG).unwrap();
        let driver = config.driver_config("stepper_x").unwrap();
        assert_eq!(driver.microsteps(), 16);
        assert_eq!(driver.hold_current(), 0.5);
        assert_eq!(driver.homing_current(), 0.8);
        assert!(driver.stealthchop().enabled);
        assert_eq!(driver.stealthchop().threshold, 41);
        assert_eq!(driver.sgt(), 0x7e);
        assert_eq!(driver.diag1_pin(), Some("PA1"));
    }

    #[test]
    fn test_dotted_section_lookup() {
        let config = parse_config(CONFIG).unwrap();
        let section = config.section("tmc2130.stepper_x").unwrap();
        assert_eq!(section.section_name(), "tmc2130.stepper_x");
        assert_eq!(section.raw_int("microsteps").unwrap(), Some(16));
        assert!(config.section("tmc2130.stepper_y").is_err());
    }

    #[test]
    fn test_wrong_type() {
        let config = parse_config(CONFIG).unwrap();
        let section = config.driver_section("stepper_x").unwrap();
        assert!(matches!(
            section.raw_bool("run_current"),
            Err(ConfigError::WrongType { .. })
        ));
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            parse_config("[unclosed"),
            Err(Error::Config(ConfigError::ParseError(_)))
        ));
    }
}
