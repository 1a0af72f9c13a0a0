//! Configuration source abstraction.

use crate::error::{error_name, ConfigError};

/// Bounds applied to a float option.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FloatBounds {
    /// Inclusive minimum.
    pub min: Option<f32>,
    /// Inclusive maximum.
    pub max: Option<f32>,
    /// Exclusive minimum.
    pub above: Option<f32>,
}

impl FloatBounds {
    /// No bounds.
    pub const NONE: Self = Self {
        min: None,
        max: None,
        above: None,
    };

    /// With an inclusive minimum.
    pub const fn min(mut self, min: f32) -> Self {
        self.min = Some(min);
        self
    }

    /// With an inclusive maximum.
    pub const fn max(mut self, max: f32) -> Self {
        self.max = Some(max);
        self
    }

    /// With an exclusive minimum.
    pub const fn above(mut self, above: f32) -> Self {
        self.above = Some(above);
        self
    }

    /// Check `value` against the bounds.
    ///
    /// # Errors
    ///
    /// Returns the `ConfigError` for the first bound violated.
    pub fn check(&self, option: &str, value: f32) -> Result<f32, ConfigError> {
        if let Some(min) = self.min {
            if value < min {
                return Err(ConfigError::BelowMinimum {
                    option: error_name(option),
                    value,
                    min,
                });
            }
        }
        if let Some(max) = self.max {
            if value > max {
                return Err(ConfigError::AboveMaximum {
                    option: error_name(option),
                    value,
                    max,
                });
            }
        }
        if let Some(bound) = self.above {
            if value <= bound {
                return Err(ConfigError::NotAbove {
                    option: error_name(option),
                    value,
                    bound,
                });
            }
        }
        Ok(value)
    }
}

/// A section of driver configuration options.
///
/// Implementors provide the raw typed lookups; the checked accessors
/// (defaults, bounds, choices) are shared. A raw lookup returns
/// `Ok(None)` when the option is absent and `ConfigError::WrongType` when
/// it is present with an incompatible type.
pub trait ConfigSource {
    /// Name of the section, for diagnostics.
    fn section_name(&self) -> &str;

    /// Raw string option.
    fn raw_string(&self, name: &str) -> Result<Option<&str>, ConfigError>;

    /// Raw float option. Integers are accepted.
    fn raw_float(&self, name: &str) -> Result<Option<f32>, ConfigError>;

    /// Raw integer option.
    fn raw_int(&self, name: &str) -> Result<Option<i64>, ConfigError>;

    /// Raw boolean option.
    fn raw_bool(&self, name: &str) -> Result<Option<bool>, ConfigError>;

    /// String option, falling back to `default`.
    fn get_string<'a>(&'a self, name: &str, default: Option<&'a str>) -> Result<&'a str, ConfigError> {
        self.raw_string(name)?
            .or(default)
            .ok_or_else(|| ConfigError::MissingOption(error_name(name)))
    }

    /// Float option, falling back to `default`, then checked against `bounds`.
    fn get_float(&self, name: &str, default: Option<f32>, bounds: FloatBounds) -> Result<f32, ConfigError> {
        let value = self
            .raw_float(name)?
            .or(default)
            .ok_or_else(|| ConfigError::MissingOption(error_name(name)))?;
        bounds.check(name, value)
    }

    /// Integer option, falling back to `default`, within `[min, max]`.
    fn get_int(
        &self,
        name: &str,
        default: Option<i64>,
        min: Option<i64>,
        max: Option<i64>,
    ) -> Result<i64, ConfigError> {
        let value = self
            .raw_int(name)?
            .or(default)
            .ok_or_else(|| ConfigError::MissingOption(error_name(name)))?;
        if let Some(min) = min {
            if value < min {
                return Err(ConfigError::BelowMinimum {
                    option: error_name(name),
                    value: value as f32,
                    min: min as f32,
                });
            }
        }
        if let Some(max) = max {
            if value > max {
                return Err(ConfigError::AboveMaximum {
                    option: error_name(name),
                    value: value as f32,
                    max: max as f32,
                });
            }
        }
        Ok(value)
    }

    /// Boolean option, falling back to `default`.
    fn get_bool(&self, name: &str, default: Option<bool>) -> Result<bool, ConfigError> {
        self.raw_bool(name)?
            .or(default)
            .ok_or_else(|| ConfigError::MissingOption(error_name(name)))
    }

    /// Integer option mapped through `choices`.
    fn get_choice<T: Copy>(
        &self,
        name: &str,
        choices: &[(i64, T)],
        default: Option<i64>,
    ) -> Result<T, ConfigError>
    where
        Self: Sized,
    {
        let key = self
            .raw_int(name)?
            .or(default)
            .ok_or_else(|| ConfigError::MissingOption(error_name(name)))?;
        choices
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| *v)
            .ok_or_else(|| ConfigError::InvalidChoice {
                option: error_name(name),
                value: key,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_check() {
        let bounds = FloatBounds::NONE.above(0.0).max(2.0);
        assert_eq!(bounds.check("run_current", 1.0), Ok(1.0));
        assert_eq!(bounds.check("run_current", 2.0), Ok(2.0));
        assert!(matches!(
            bounds.check("run_current", 0.0),
            Err(ConfigError::NotAbove { .. })
        ));
        assert!(matches!(
            bounds.check("run_current", 2.5),
            Err(ConfigError::AboveMaximum { .. })
        ));
        assert!(matches!(
            FloatBounds::NONE.min(0.0).check("x", -1.0),
            Err(ConfigError::BelowMinimum { .. })
        ));
    }
}
