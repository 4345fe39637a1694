//! Property values: literals and provider intrinsic references.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// A property value in a template.
///
/// Most identifiers are computed up front and travel as [`Value::Str`].
/// Attributes only the provider knows (endpoint hostnames, generated ids)
/// are referenced in-stack with `Ref`/`GetAtt` and across stacks with
/// `Import` of an exported output.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Value {
    Str(String),
    Ref(String),
    GetAtt { logical_id: String, attribute: String },
    Import(String),
    /// Concatenation with an empty delimiter.
    Join(Vec<Value>),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    pub fn reference(logical_id: impl Into<String>) -> Self {
        Value::Ref(logical_id.into())
    }

    pub fn get_att(logical_id: impl Into<String>, attribute: impl Into<String>) -> Self {
        Value::GetAtt {
            logical_id: logical_id.into(),
            attribute: attribute.into(),
        }
    }

    pub fn import(export_name: impl Into<String>) -> Self {
        Value::Import(export_name.into())
    }

    pub fn join(parts: impl IntoIterator<Item = Value>) -> Self {
        Value::Join(parts.into_iter().collect())
    }

    /// The literal string, if this value is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == Some("*")
    }

    /// Logical ids this value references inside its own stack.
    pub fn local_refs(&self) -> Vec<&str> {
        match self {
            Value::Ref(id) => vec![id.as_str()],
            Value::GetAtt { logical_id, .. } => vec![logical_id.as_str()],
            Value::Join(parts) => parts.iter().flat_map(Value::local_refs).collect(),
            Value::Str(_) | Value::Import(_) => Vec::new(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self {
        Value::Str(s.clone())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Str(s) => serializer.serialize_str(s),
            Value::Ref(id) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Ref", id)?;
                map.end()
            }
            Value::GetAtt { logical_id, attribute } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::GetAtt", &[logical_id, attribute])?;
                map.end()
            }
            Value::Import(name) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::ImportValue", name)?;
                map.end()
            }
            Value::Join(parts) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Fn::Join", &JoinArgs(parts))?;
                map.end()
            }
        }
    }
}

struct JoinArgs<'a>(&'a [Value]);

impl Serialize for JoinArgs<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element("")?;
        seq.serialize_element(self.0)?;
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn intrinsics_serialize() {
        assert_eq!(serde_json::to_value(Value::str("x")).unwrap(), json!("x"));
        assert_eq!(serde_json::to_value(Value::reference("Vpc")).unwrap(), json!({"Ref": "Vpc"}));
        assert_eq!(
            serde_json::to_value(Value::get_att("Cluster", "Endpoint")).unwrap(),
            json!({"Fn::GetAtt": ["Cluster", "Endpoint"]})
        );
        assert_eq!(
            serde_json::to_value(Value::import("Net-VpcId")).unwrap(),
            json!({"Fn::ImportValue": "Net-VpcId"})
        );
        assert_eq!(
            serde_json::to_value(Value::join([Value::str("a"), Value::reference("B")])).unwrap(),
            json!({"Fn::Join": ["", ["a", {"Ref": "B"}]]})
        );
    }

    #[test]
    fn local_refs_walk_joins() {
        let v = Value::join([Value::reference("A"), Value::import("X"), Value::get_att("B", "Arn")]);
        assert_eq!(v.local_refs(), vec!["A", "B"]);
        assert!(Value::str("*").is_wildcard());
    }
}
