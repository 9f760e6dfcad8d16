//! Flag bookkeeping and per-record caches owned by a sifter.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

use serde_json::{Map, Value};

use crate::error::{EvalError, EvalResult};
use crate::parse::json_type;

/// A record's unique identifier, also usable as an arbitrary cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordId {
    Int(i64),
    Str(String),
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Int(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId::Str(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        RecordId::Str(id)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{}", id),
            RecordId::Str(id) => write!(f, "{}", id),
        }
    }
}

/// Records carrying one flag, in the order they were flagged.
#[derive(Debug, Default)]
struct FlagBucket {
    order: Vec<RecordId>,
    members: HashSet<RecordId>,
}

impl FlagBucket {
    fn insert(&mut self, id: RecordId) {
        if self.members.insert(id.clone()) {
            self.order.push(id);
        }
    }
}

/// Mutable evaluation state shared by every sieve in a sifter.
///
/// Flags describe the batch currently being evaluated and are cleared at
/// the start of each evaluation. Cache entries persist across evaluations
/// until [`reset`](SiftState::reset).
#[derive(Debug)]
pub struct SiftState {
    id_key: String,
    flags: HashMap<String, FlagBucket>,
    record_flags: HashMap<RecordId, BTreeSet<String>>,
    cache: HashMap<(String, RecordId), Map<String, Value>>,
}

impl SiftState {
    /// Creates empty state reading identifiers from `id_key`.
    pub fn new(id_key: impl Into<String>) -> Self {
        Self {
            id_key: id_key.into(),
            flags: HashMap::new(),
            record_flags: HashMap::new(),
            cache: HashMap::new(),
        }
    }

    /// The identifier field name.
    pub fn id_key(&self) -> &str {
        &self.id_key
    }

    /// Reads a record's identifier.
    ///
    /// # Errors
    ///
    /// Returns `EvalError::MissingId` if the field is absent, or
    /// `EvalError::InvalidId` if it is not an integer or string.
    pub fn record_id(&self, record: &Value) -> EvalResult<RecordId> {
        match record.get(self.id_key.as_str()) {
            None => Err(EvalError::MissingId {
                key: self.id_key.clone(),
            }),
            Some(Value::String(id)) => Ok(RecordId::Str(id.clone())),
            Some(Value::Number(n)) => {
                n.as_i64()
                    .map(RecordId::Int)
                    .ok_or_else(|| EvalError::InvalidId {
                        key: self.id_key.clone(),
                        found: "non-integer number",
                    })
            }
            Some(other) => Err(EvalError::InvalidId {
                key: self.id_key.clone(),
                found: json_type(other),
            }),
        }
    }

    // ==================== Flags ====================

    /// Marks a record with a flag.
    pub fn set_flag(&mut self, flag: &str, record: &Value) -> EvalResult<()> {
        let id = self.record_id(record)?;
        self.flag_id(flag, id);
        Ok(())
    }

    /// Marks a record identifier with a flag.
    pub fn flag_id(&mut self, flag: &str, id: RecordId) {
        self.flags
            .entry(flag.to_string())
            .or_default()
            .insert(id.clone());
        self.record_flags
            .entry(id)
            .or_default()
            .insert(flag.to_string());
    }

    /// Returns true if the record has been marked with the flag.
    pub fn is_flagged(&self, flag: &str, record: &Value) -> EvalResult<bool> {
        let id = self.record_id(record)?;
        Ok(self
            .flags
            .get(flag)
            .is_some_and(|bucket| bucket.members.contains(&id)))
    }

    /// Every flag the record carries, sorted by name.
    pub fn flags_of(&self, record: &Value) -> EvalResult<Vec<&str>> {
        let id = self.record_id(record)?;
        Ok(self
            .record_flags
            .get(&id)
            .map(|flags| flags.iter().map(String::as_str).collect())
            .unwrap_or_default())
    }

    /// Identifiers marked with the flag, in the order they were marked.
    pub fn flagged_ids(&self, flag: &str) -> &[RecordId] {
        self.flags
            .get(flag)
            .map(|bucket| bucket.order.as_slice())
            .unwrap_or_default()
    }

    /// Names of every flag set so far.
    pub fn flag_names(&self) -> impl Iterator<Item = &str> {
        self.flags.keys().map(String::as_str)
    }

    pub(crate) fn clear_flags(&mut self) {
        self.flags.clear();
        self.record_flags.clear();
    }

    // ==================== Caches ====================

    /// A cache map scoped to `(group, key)`, created empty on first use.
    pub fn cache(&mut self, group: &str, key: impl Into<RecordId>) -> &mut Map<String, Value> {
        self.cache
            .entry((group.to_string(), key.into()))
            .or_default()
    }

    /// A cache map scoped to `group` and the record's identifier.
    pub fn record_cache(
        &mut self,
        group: &str,
        record: &Value,
    ) -> EvalResult<&mut Map<String, Value>> {
        let id = self.record_id(record)?;
        Ok(self.cache(group, id))
    }

    /// Number of cache maps currently allocated.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Clears every flag and cache entry.
    pub fn reset(&mut self) {
        self.clear_flags();
        self.cache.clear();
    }
}

impl Default for SiftState {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_ID_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_id_types() {
        let state = SiftState::default();
        assert_eq!(state.record_id(&json!({"id": 7})).unwrap(), RecordId::Int(7));
        assert_eq!(
            state.record_id(&json!({"id": "abc"})).unwrap(),
            RecordId::from("abc")
        );
        assert!(matches!(
            state.record_id(&json!({"name": "x"})),
            Err(EvalError::MissingId { .. })
        ));
        assert!(matches!(
            state.record_id(&json!({"id": [1]})),
            Err(EvalError::InvalidId { found: "array", .. })
        ));
        assert!(matches!(
            state.record_id(&json!({"id": 1.5})),
            Err(EvalError::InvalidId { .. })
        ));
    }

    #[test]
    fn test_custom_id_key() {
        let state = SiftState::new("nvr");
        assert_eq!(
            state.record_id(&json!({"id": 1, "nvr": "foo-1.0-1"})).unwrap(),
            RecordId::from("foo-1.0-1")
        );
    }

    #[test]
    fn test_flags() {
        let mut state = SiftState::default();
        let a = json!({"id": 1});
        let b = json!({"id": 2});

        state.set_flag("good", &b).unwrap();
        state.set_flag("good", &a).unwrap();
        state.set_flag("good", &b).unwrap();
        state.set_flag("cheap", &a).unwrap();

        assert!(state.is_flagged("good", &a).unwrap());
        assert!(!state.is_flagged("cheap", &b).unwrap());
        assert!(!state.is_flagged("missing", &a).unwrap());
        assert_eq!(state.flagged_ids("good"), &[RecordId::Int(2), RecordId::Int(1)]);
        assert!(state.flagged_ids("missing").is_empty());
        assert_eq!(state.flags_of(&a).unwrap(), vec!["cheap", "good"]);

        state.clear_flags();
        assert!(!state.is_flagged("good", &a).unwrap());
        assert_eq!(state.flag_names().count(), 0);
    }

    #[test]
    fn test_cache_persists_until_reset() {
        let mut state = SiftState::default();
        let record = json!({"id": 3});

        state
            .record_cache("count", &record)
            .unwrap()
            .insert("visits".to_string(), json!(1));
        state.clear_flags();

        let cache = state.cache("count", 3_i64);
        assert_eq!(cache.get("visits"), Some(&json!(1)));

        assert!(state.cache("other", 3_i64).is_empty());
        assert_eq!(state.cache_len(), 2);

        state.reset();
        assert_eq!(state.cache_len(), 0);
        assert!(state.cache("count", 3_i64).is_empty());
    }

    #[test]
    fn test_named_cache_keys() {
        let mut state = SiftState::default();
        state
            .cache("*shared", "latest_builds")
            .insert("f40".to_string(), json!([1, 2]));
        assert_eq!(
            state.cache("*shared", "latest_builds").get("f40"),
            Some(&json!([1, 2]))
        );
    }
}
