//
//  params.rs
//  Lattice
//
//  Created by hak (tharun)
//

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{LatticeError, Result};

/// Declared type of one tool parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    Bool,
    Int,
    Float,
    Str,
    StrArray,
    Enum(&'static [&'static str]),
}

/// One entry of a tool's parameter schema.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamType,
    pub description: &'static str,
    pub default: Option<Value>,
    pub required: bool,
}

impl ParamSpec {
    pub fn required(name: &'static str, kind: ParamType, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            default: None,
            required: true,
        }
    }

    pub fn optional(
        name: &'static str,
        kind: ParamType,
        description: &'static str,
        default: Value,
    ) -> Self {
        Self {
            name,
            kind,
            description,
            default: Some(default),
            required: false,
        }
    }
}

/// The untyped parameter map a tool receives, with typed, clamping
/// accessors. Unknown keys are ignored with a debug log; invalid enum
/// values fall back to their default.
#[derive(Debug, Clone, Default)]
pub struct Params {
    map: Map<String, Value>,
}

impl Params {
    pub fn new(map: Map<String, Value>) -> Self {
        Self { map }
    }

    pub fn from_pairs(pairs: &[(&str, Value)]) -> Self {
        let mut map = Map::new();
        for (k, v) in pairs {
            map.insert(k.to_string(), v.clone());
        }
        Self { map }
    }

    /// Log-and-ignore parameters outside the declared schema.
    pub fn warn_unknown(&self, known: &[&str]) {
        for key in self.map.keys() {
            if !known.contains(&key.as_str()) {
                debug!(param = %key, "ignoring unknown tool parameter");
            }
        }
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.map.get(key).and_then(|v| v.as_str())
    }

    /// Required non-empty string, or an invalid-parameter error.
    pub fn required_str(&self, key: &str) -> Result<&str> {
        match self.str(key) {
            Some(s) if !s.trim().is_empty() => Ok(s),
            _ => Err(LatticeError::invalid_parameter(
                key,
                format!("missing required string parameter '{}'", key),
            )),
        }
    }

    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.map.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
    }

    pub fn int_or(&self, key: &str, default: i64) -> i64 {
        self.map.get(key).and_then(|v| v.as_i64()).unwrap_or(default)
    }

    pub fn float_or(&self, key: &str, default: f64) -> f64 {
        self.map.get(key).and_then(|v| v.as_f64()).unwrap_or(default)
    }

    pub fn str_array(&self, key: &str) -> Vec<String> {
        self.map
            .get(key)
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Enum value, falling back to the default on anything outside the
    /// allowed set.
    pub fn enum_or<'a>(&'a self, key: &str, allowed: &[&'a str], default: &'a str) -> &'a str {
        match self.str(key) {
            Some(s) => {
                if let Some(&found) = allowed.iter().find(|&&a| a == s) {
                    found
                } else {
                    debug!(param = key, value = s, "invalid enum value, using default");
                    default
                }
            }
            None => default,
        }
    }

    /// `top`: 1..=100, default 10, clamped.
    pub fn top(&self) -> usize {
        clamp(self.int_or("top", 10), 1, 100)
    }

    /// `limit`: 1..=500, default 50, clamped.
    pub fn limit(&self) -> usize {
        clamp(self.int_or("limit", 50), 1, 500)
    }

    /// `min_size`: >= 1, clamped.
    pub fn min_size_or(&self, default: i64) -> usize {
        clamp(self.int_or("min_size", default), 1, i64::MAX as usize)
    }

    /// `exclude_tests`: default true.
    pub fn exclude_tests(&self) -> bool {
        self.bool_or("exclude_tests", true)
    }

    /// `package`: empty means no filter.
    pub fn package(&self) -> Option<&str> {
        self.str("package").filter(|s| !s.is_empty())
    }
}

fn clamp(value: i64, lo: usize, hi: usize) -> usize {
    if value < lo as i64 {
        lo
    } else if value > hi as i64 {
        hi
    } else {
        value as usize
    }
}
