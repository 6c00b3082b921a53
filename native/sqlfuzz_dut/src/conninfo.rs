/// Connection string parsing
///
/// A connection string is a sequence of whitespace-separated `key[=value]`
/// tokens. Each engine declares the keys it accepts (with aliases) and the
/// defaults seeded before parsing. Any token outside that set is fatal.
use crate::error::{AdapterError, ConfigError};
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Declaration of the options an engine accepts.
///
/// `keys` maps every accepted spelling to its canonical name;
/// `defaults` is keyed by canonical name.
#[derive(Debug)]
pub struct OptionSpec {
    pub keys: &'static [(&'static str, &'static str)],
    pub defaults: &'static [(&'static str, &'static str)],
}

impl OptionSpec {
    fn canonical(&self, alias: &str) -> Option<&'static str> {
        self.keys
            .iter()
            .find(|(a, _)| *a == alias)
            .map(|(_, canonical)| *canonical)
    }

    /// Token pattern `^(alias|...)(?:=(.*))?$`, aliases escaped.
    fn token_regex(&self) -> Result<Regex, regex::Error> {
        let alternation = self
            .keys
            .iter()
            .map(|(alias, _)| regex::escape(alias))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!("(?s)^({alternation})(?:=(.*))?$"))
    }
}

/// Validated option map for one connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConnInfo {
    options: BTreeMap<String, String>,
}

impl ConnInfo {
    /// Parse `raw` against `spec`.
    ///
    /// Defaults are applied first, so an omitted option takes its default.
    /// A key given without `=value` maps to the empty string.
    pub fn parse(raw: &str, spec: &OptionSpec) -> Result<Self, ConfigError> {
        let mut options: BTreeMap<String, String> = spec
            .defaults
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();

        // Aliases are escaped literals, so the pattern always compiles.
        let pattern = spec.token_regex().ok();

        for token in raw.split_whitespace() {
            let captures = pattern.as_ref().and_then(|re| re.captures(token));
            let Some(captures) = captures else {
                return Err(ConfigError::UnrecognizedOption {
                    token: token.to_string(),
                });
            };
            let alias = captures.get(1).map_or("", |m| m.as_str());
            let value = captures.get(2).map_or("", |m| m.as_str());
            let Some(key) = spec.canonical(alias) else {
                return Err(ConfigError::UnrecognizedOption {
                    token: token.to_string(),
                });
            };
            options.insert(key.to_string(), value.to_string());
        }

        debug!(target: "sqlfuzz::conninfo", "parsed options: {:?}", redacted(&options));
        Ok(ConnInfo { options })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    /// Value of a required option; absence is a connection-construction error.
    pub fn require(&self, key: &'static str) -> Result<&str, AdapterError> {
        self.get(key)
            .ok_or(AdapterError::MissingOption { option: key })
    }

    pub fn parse_u16(&self, key: &'static str) -> Result<u16, AdapterError> {
        let value = self.require(key)?;
        value.parse().map_err(|e: std::num::ParseIntError| AdapterError::InvalidOption {
            option: key,
            value: value.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn parse_u64(&self, key: &'static str) -> Result<u64, AdapterError> {
        let value = self.require(key)?;
        value.parse().map_err(|e: std::num::ParseIntError| AdapterError::InvalidOption {
            option: key,
            value: value.to_string(),
            reason: e.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.options.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }
}

impl fmt::Display for ConnInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = redacted(&self.options)
            .into_iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        f.write_str(&rendered)
    }
}

fn redacted(options: &BTreeMap<String, String>) -> BTreeMap<&str, &str> {
    options
        .iter()
        .map(|(k, v)| {
            let shown = if k == "pass" && !v.is_empty() { "***" } else { v.as_str() };
            (k.as_str(), shown)
        })
        .collect()
}
