//! The flat parameter mapping handed to drivers at construction.
//!
//! Parameters arrive as an already-parsed name→value mapping (how the
//! mapping is read — command line, XML, anything else — is the caller's
//! concern). Extraction is typed and explicit: rate constants and grid
//! geometry have NO implicit defaults, so a missing key is a
//! [`ConfigError`] at startup rather than a silent fallback mid-run.

use crate::error::ConfigError;
use indexmap::IndexMap;

/// One parameter value: a float, an integer, or a text entry
/// (file paths travel as text).
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    /// Floating-point value.
    Float(f64),
    /// Integer value.
    Int(i64),
    /// Text value (names, file paths).
    Text(String),
}

/// A flat, insertion-ordered parameter mapping.
///
/// Built once per run and passed by value into each driver's
/// constructor — there is no process-wide parameter state.
///
/// # Examples
///
/// ```
/// use stroma_core::{ParamValue, Params};
///
/// let params = Params::from_pairs([
///     ("spacing", ParamValue::Float(1.0)),
///     ("num_x", ParamValue::Int(10)),
/// ]);
/// assert_eq!(params.require_f64("spacing").unwrap(), 1.0);
/// assert!(params.require_f64("k1s").is_err());
/// ```
#[derive(Clone, Debug, Default)]
pub struct Params {
    entries: IndexMap<String, ParamValue>,
}

impl Params {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mapping from `(name, value)` pairs. Later duplicates
    /// overwrite earlier ones.
    pub fn from_pairs<K, I>(pairs: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ParamValue)>,
    {
        let mut params = Self::new();
        for (key, value) in pairs {
            params.insert(key, value);
        }
        params
    }

    /// Insert or overwrite one parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: ParamValue) {
        self.entries.insert(key.into(), value);
    }

    /// Look up a raw value.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the mapping holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Require a float. Integers widen to `f64`; anything else is a
    /// [`ConfigError::WrongType`].
    pub fn require_f64(&self, key: &str) -> Result<f64, ConfigError> {
        match self.get(key) {
            Some(ParamValue::Float(v)) => Ok(*v),
            Some(ParamValue::Int(v)) => Ok(*v as f64),
            Some(_) => Err(ConfigError::WrongType {
                key: key.into(),
                expected: "float",
            }),
            None => Err(ConfigError::MissingKey { key: key.into() }),
        }
    }

    /// Require a non-negative integer.
    pub fn require_u64(&self, key: &str) -> Result<u64, ConfigError> {
        match self.get(key) {
            Some(ParamValue::Int(v)) if *v >= 0 => Ok(*v as u64),
            Some(ParamValue::Int(v)) => Err(ConfigError::Invalid {
                key: key.into(),
                reason: format!("must be non-negative, got {v}"),
            }),
            Some(_) => Err(ConfigError::WrongType {
                key: key.into(),
                expected: "int",
            }),
            None => Err(ConfigError::MissingKey { key: key.into() }),
        }
    }

    /// Require a text entry.
    pub fn require_str(&self, key: &str) -> Result<&str, ConfigError> {
        match self.get(key) {
            Some(ParamValue::Text(s)) => Ok(s),
            Some(_) => Err(ConfigError::WrongType {
                key: key.into(),
                expected: "text",
            }),
            None => Err(ConfigError::MissingKey { key: key.into() }),
        }
    }

    /// Optional float: absent keys are `None`, type mismatches are
    /// still errors.
    pub fn get_f64(&self, key: &str) -> Result<Option<f64>, ConfigError> {
        match self.require_f64(key) {
            Ok(v) => Ok(Some(v)),
            Err(ConfigError::MissingKey { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Optional text entry.
    pub fn get_str(&self, key: &str) -> Result<Option<&str>, ConfigError> {
        match self.require_str(key) {
            Ok(v) => Ok(Some(v)),
            Err(ConfigError::MissingKey { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Params {
        Params::from_pairs([
            ("spacing", ParamValue::Float(0.5)),
            ("num_x", ParamValue::Int(20)),
            ("name", ParamValue::Text("CellSimulation".into())),
        ])
    }

    // ── Typed extraction ─────────────────────────────────────────

    #[test]
    fn require_f64_reads_floats_and_widens_ints() {
        let p = sample();
        assert_eq!(p.require_f64("spacing").unwrap(), 0.5);
        assert_eq!(p.require_f64("num_x").unwrap(), 20.0);
    }

    #[test]
    fn require_u64_rejects_negative() {
        let mut p = sample();
        p.insert("num_steps", ParamValue::Int(-3));
        assert!(matches!(
            p.require_u64("num_steps"),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn missing_key_is_reported_by_name() {
        let p = sample();
        let err = p.require_f64("k1s").unwrap_err();
        assert_eq!(err, ConfigError::MissingKey { key: "k1s".into() });
    }

    #[test]
    fn wrong_type_is_reported() {
        let p = sample();
        assert!(matches!(
            p.require_f64("name"),
            Err(ConfigError::WrongType { .. })
        ));
        assert!(matches!(
            p.require_str("spacing"),
            Err(ConfigError::WrongType { .. })
        ));
    }

    // ── Optional lookups ─────────────────────────────────────────

    #[test]
    fn optional_lookup_distinguishes_absent_from_mistyped() {
        let p = sample();
        assert_eq!(p.get_f64("coexecution_wait").unwrap(), None);
        assert!(p.get_f64("name").is_err());
        assert_eq!(p.get_str("name").unwrap(), Some("CellSimulation"));
    }

    #[test]
    fn later_duplicates_overwrite() {
        let p = Params::from_pairs([
            ("dt", ParamValue::Float(1.0)),
            ("dt", ParamValue::Float(0.1)),
        ]);
        assert_eq!(p.require_f64("dt").unwrap(), 0.1);
        assert_eq!(p.len(), 1);
    }

    // ── Property tests ───────────────────────────────────────────

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn inserted_floats_read_back_exactly(
            key in "[a-z_]{1,16}",
            value in -1e9f64..1e9,
        ) {
            let mut p = Params::new();
            p.insert(key.clone(), ParamValue::Float(value));
            prop_assert_eq!(p.require_f64(&key).unwrap(), value);
        }

        #[test]
        fn ints_widen_losslessly(
            key in "[a-z_]{1,16}",
            value in -(1i64 << 52)..(1i64 << 52),
        ) {
            let mut p = Params::new();
            p.insert(key.clone(), ParamValue::Int(value));
            prop_assert_eq!(p.require_f64(&key).unwrap(), value as f64);
            if value >= 0 {
                prop_assert_eq!(p.require_u64(&key).unwrap(), value as u64);
            } else {
                prop_assert!(p.require_u64(&key).is_err());
            }
        }
    }
}
