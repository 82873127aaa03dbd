//! `DecodedArgs`: the ordered, named argument record of a decoded event.
//!
//! Built once per decode from the fixed component list of an ABI shape.
//! Supports lookup by name (`args.get("from")`), by position
//! (`args.at(0)`) and by dotted path into nested tuples
//! (`args.lookup_path("policy.payout")`).

use indexmap::IndexMap;
use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::types::ArgValue;

/// Words that are renamed with a trailing underscore when used as argument
/// names, so every field name is a valid identifier in generated code and
/// templates.
const RESERVED_WORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "else", "enum", "extern",
    "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut",
    "pub", "ref", "return", "self", "static", "struct", "super", "trait", "true", "type",
    "unsafe", "use", "where", "while",
];

/// Returns the field name an ABI component name is stored under.
///
/// Reserved words get a trailing `_`; unnamed components become `_<index>`.
pub fn safe_field_name(name: &str, index: usize) -> String {
    if name.is_empty() {
        format!("_{index}")
    } else if RESERVED_WORDS.contains(&name) {
        format!("{name}_")
    } else {
        name.to_string()
    }
}

/// Ordered mapping from argument name to decoded value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedArgs {
    fields: IndexMap<String, ArgValue>,
}

impl DecodedArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            fields: IndexMap::with_capacity(n),
        }
    }

    /// Append a field. `name` is the raw ABI component name; it is stored
    /// under its reserved-word-safe form. A name already taken (`type` next
    /// to a real `type_`, or a repeated name) gets a `_<position>` suffix, so
    /// there is always one field per component.
    pub fn push(&mut self, name: &str, value: ArgValue) {
        let position = self.fields.len();
        let mut key = safe_field_name(name, position);
        while self.fields.contains_key(&key) {
            key.push_str(&format!("_{position}"));
        }
        self.fields.insert(key, value);
    }

    /// Look up a field by name. Accepts both the raw ABI name and its
    /// renamed form (`type` and `type_` both resolve).
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.fields.get(name).or_else(|| {
            let renamed = safe_field_name(name, usize::MAX);
            if renamed != name {
                self.fields.get(&renamed)
            } else {
                None
            }
        })
    }

    /// Positional access.
    pub fn at(&self, index: usize) -> Option<&ArgValue> {
        self.fields.get_index(index).map(|(_, v)| v)
    }

    /// Follow a dotted path through nested tuples. A purely numeric segment
    /// that is not a field name is treated as a position.
    pub fn lookup_path(&self, path: &str) -> Option<&ArgValue> {
        let mut segments = path.split('.');
        let mut current = self.step(segments.next()?)?;
        for segment in segments {
            current = match current {
                ArgValue::Tuple(inner) => inner.step(segment)?,
                ArgValue::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }

    fn step(&self, segment: &str) -> Option<&ArgValue> {
        self.get(segment)
            .or_else(|| segment.parse::<usize>().ok().and_then(|i| self.at(i)))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Serialize for DecodedArgs {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;

    fn policy() -> DecodedArgs {
        let mut inner = DecodedArgs::new();
        inner.push("id", ArgValue::Uint(U256::from(7u64)));
        inner.push("payout", ArgValue::Uint(U256::from(1_000u64)));
        let mut outer = DecodedArgs::new();
        outer.push("type", ArgValue::Bool(true));
        outer.push("policy", ArgValue::Tuple(inner));
        outer.push("", ArgValue::Str("anon".into()));
        outer
    }

    #[test]
    fn reserved_words_are_renamed() {
        let args = policy();
        let names: Vec<_> = args.names().collect();
        assert_eq!(names, vec!["type_", "policy", "_2"]);
        assert_eq!(args.get("type"), Some(&ArgValue::Bool(true)));
        assert_eq!(args.get("type_"), Some(&ArgValue::Bool(true)));
    }

    #[test]
    fn renamed_field_does_not_shadow_a_real_one() {
        let mut args = DecodedArgs::new();
        args.push("type", ArgValue::Bool(true));
        args.push("type_", ArgValue::Bool(false));
        args.push("x", ArgValue::Str("a".into()));
        args.push("x", ArgValue::Str("b".into()));
        assert_eq!(args.len(), 4);
        let names: Vec<_> = args.names().collect();
        assert_eq!(names, vec!["type_", "type__1", "x", "x_3"]);
        assert_eq!(args.at(1), Some(&ArgValue::Bool(false)));
        assert_eq!(args.get("x_3"), Some(&ArgValue::Str("b".into())));
    }

    #[test]
    fn name_and_position_agree() {
        let args = policy();
        assert_eq!(args.get("policy"), args.at(1));
        assert!(args.at(3).is_none());
    }

    #[test]
    fn dotted_paths() {
        let args = policy();
        assert_eq!(
            args.lookup_path("policy.payout"),
            Some(&ArgValue::Uint(U256::from(1_000u64)))
        );
        assert_eq!(
            args.lookup_path("1.0"),
            Some(&ArgValue::Uint(U256::from(7u64)))
        );
        assert!(args.lookup_path("policy.missing").is_none());
        assert!(args.lookup_path("type.deeper").is_none());
    }

    #[test]
    fn serializes_as_object_in_order() {
        let json = serde_json::to_string(&policy()).unwrap();
        assert_eq!(
            json,
            r#"{"type_":true,"policy":{"id":7,"payout":1000},"_2":"anon"}"#
        );
    }
}
