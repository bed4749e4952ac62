use crate::error::ConfigError;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;

/// Flat backend configuration (host, port, device path, ...).
///
/// The core never interprets keys; each backend reads and validates its own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    entries: BTreeMap<String, String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::Missing {
            key: key.to_string(),
        })
    }

    /// Parse `key` if present. Surrounding whitespace is ignored.
    pub fn parse<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|e| ConfigError::Invalid {
                    key: key.to_string(),
                    value: raw.to_string(),
                    reason: e.to_string(),
                }),
        }
    }

    pub fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        Ok(self.parse(key)?.unwrap_or(default))
    }

    /// Boolean switch: 1/0, true/false, yes/no, on/off (case-insensitive).
    pub fn flag(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        let Some(raw) = self.get(key) else {
            return Ok(default);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key: key.to_string(),
                value: raw.to_string(),
                reason: "expected a boolean (1/0, true/false, yes/no, on/off)".into(),
            }),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Config {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl From<HashMap<String, String>> for Config {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

impl From<BTreeMap<String, String>> for Config {
    fn from(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_getters() {
        let cfg: Config = [("port", " 801 "), ("host", "10.0.0.2"), ("rate", "fast")]
            .into_iter()
            .collect();
        assert_eq!(cfg.get("host"), Some("10.0.0.2"));
        assert_eq!(cfg.parse::<u16>("port").unwrap(), Some(801));
        assert_eq!(cfg.parse::<u16>("missing").unwrap(), None);
        assert_eq!(cfg.parse_or("missing", 3883u16).unwrap(), 3883);
        assert!(matches!(
            cfg.parse::<f64>("rate"),
            Err(ConfigError::Invalid { key, .. }) if key == "rate"
        ));
    }

    #[test]
    fn test_require() {
        let cfg = Config::new().with("device", "/dev/ttyUSB0");
        assert_eq!(cfg.require("device").unwrap(), "/dev/ttyUSB0");
        assert_eq!(
            cfg.require("host"),
            Err(ConfigError::Missing { key: "host".into() })
        );
    }

    #[test]
    fn test_flag() {
        let cfg = Config::new()
            .with("a", "YES")
            .with("b", "0")
            .with("c", "maybe");
        assert!(cfg.flag("a", false).unwrap());
        assert!(!cfg.flag("b", true).unwrap());
        assert!(cfg.flag("missing", true).unwrap());
        assert!(cfg.flag("c", false).is_err());
    }

    #[test]
    fn test_from_hash_map() {
        let mut map = HashMap::new();
        map.insert("hostname".to_string(), "vicon".to_string());
        let cfg = Config::from(map);
        assert_eq!(cfg.len(), 1);
        assert_eq!(cfg.iter().next(), Some(("hostname", "vicon")));
    }
}
