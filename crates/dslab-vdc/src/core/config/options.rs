//! Config value utils.

use std::collections::BTreeMap;
use std::str::FromStr;

use crate::core::error::{Error, Result};

/// Options parsed from the bracketed part of a config value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOptions {
    values: BTreeMap<String, String>,
}

impl ConfigOptions {
    /// Parses options string like `option1=0.8,option2=something`.
    pub fn parse(options_str: &str) -> Result<Self> {
        let mut values = BTreeMap::new();
        for option_str in options_str.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match option_str.split_once('=') {
                Some((name, value)) => {
                    values.insert(name.trim().to_string(), value.trim().to_string());
                }
                None => {
                    return Err(Error::Configuration(format!("malformed option '{}'", option_str)));
                }
            }
        }
        Ok(Self { values })
    }

    /// Returns the raw option value.
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|s| s.as_str())
    }

    /// Returns the parsed option value or `None` if the option is absent.
    pub fn get<T: FromStr>(&self, name: &str) -> Result<Option<T>> {
        match self.values.get(name) {
            Some(value) => value
                .parse::<T>()
                .map(Some)
                .map_err(|_| Error::Configuration(format!("can't parse value '{}' of option '{}'", value, name))),
            None => Ok(None),
        }
    }

    pub fn get_or<T: FromStr>(&self, name: &str, default: T) -> Result<T> {
        Ok(self.get(name)?.unwrap_or(default))
    }

    pub fn require<T: FromStr>(&self, name: &str) -> Result<T> {
        self.get(name)?
            .ok_or_else(|| Error::Configuration(format!("missing required option '{}'", name)))
    }

    /// Fails if there are options outside of the `allowed` list.
    pub fn ensure_only(&self, allowed: &[&str]) -> Result<()> {
        match self.values.keys().find(|name| !allowed.contains(&name.as_str())) {
            Some(name) => Err(Error::Configuration(format!("unknown option '{}'", name))),
            None => Ok(()),
        }
    }
}

/// Parses config value string, which consists of two parts - name and options.
/// Example: `BestFit[reference_share_penalty=0.1]` parts are name `BestFit` and options `reference_share_penalty=0.1`.
pub fn parse_config_value(config_str: &str) -> Result<(String, ConfigOptions)> {
    let config_str = config_str.trim();
    match config_str.split_once('[') {
        Some((name, rest)) => match rest.strip_suffix(']') {
            Some(options) if !options.contains(['[', ']']) => {
                Ok((name.trim().to_string(), ConfigOptions::parse(options)?))
            }
            _ => Err(Error::Configuration(format!("malformed config value '{}'", config_str))),
        },
        None if config_str.contains(']') => Err(Error::Configuration(format!(
            "malformed config value '{}'",
            config_str
        ))),
        None => Ok((config_str.to_string(), ConfigOptions::default())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_name_and_options() {
        let (name, options) = parse_config_value("BestFit[reference_share_penalty=0.1, solver=couenne]").unwrap();
        assert_eq!(name, "BestFit");
        assert_eq!(options.get::<f64>("reference_share_penalty").unwrap(), Some(0.1));
        assert_eq!(options.raw("solver"), Some("couenne"));
        assert_eq!(options.get::<f64>("missing").unwrap(), None);

        let (name, options) = parse_config_value("FirstFit").unwrap();
        assert_eq!(name, "FirstFit");
        assert_eq!(options, ConfigOptions::default());
    }

    #[test]
    fn malformed_values() {
        assert!(parse_config_value("FirstFit[a=1").is_err());
        assert!(parse_config_value("FirstFit]").is_err());
        assert!(parse_config_value("FirstFit[a]").is_err());
        let (_, options) = parse_config_value("Dummy[sampling_time=abc]").unwrap();
        assert!(options.get::<f64>("sampling_time").is_err());
        assert!(options.ensure_only(&["penalty"]).is_err());
        assert!(options.require::<f64>("penalty").is_err());
    }
}
