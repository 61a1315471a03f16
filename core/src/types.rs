//! Payload types for the Mixpanel ingestion API.
//!
//! # Design
//! Event properties stay untyped (`serde_json::Map`) because Mixpanel accepts
//! arbitrary JSON values there. Profile updates are a sum type instead: each
//! operation carries the one value shape Mixpanel accepts for it, so a `$unset`
//! can never be sent with a map or an `$add` with strings.

use std::collections::BTreeMap;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{Map, Value};

/// Arbitrary event or profile properties.
pub type Properties = Map<String, Value>;

/// Profile operation keys understood by `/engage/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileOperation {
    Set,
    SetOnce,
    Add,
    Append,
    Union,
    Unset,
    Delete,
}

impl ProfileOperation {
    pub const ALL: [ProfileOperation; 7] = [
        ProfileOperation::Set,
        ProfileOperation::SetOnce,
        ProfileOperation::Add,
        ProfileOperation::Append,
        ProfileOperation::Union,
        ProfileOperation::Unset,
        ProfileOperation::Delete,
    ];

    /// Wire key of the operation inside the engage envelope.
    pub fn key(self) -> &'static str {
        match self {
            ProfileOperation::Set => "$set",
            ProfileOperation::SetOnce => "$set_once",
            ProfileOperation::Add => "$add",
            ProfileOperation::Append => "$append",
            ProfileOperation::Union => "$union",
            ProfileOperation::Unset => "$unset",
            ProfileOperation::Delete => "$delete",
        }
    }
}

/// A single profile update together with its operation-shaped value.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileUpdate {
    /// Overwrite properties.
    Set(Properties),
    /// Set properties that are not already present on the profile.
    SetOnce(Properties),
    /// Increment numeric properties; negative amounts decrement.
    Add(BTreeMap<String, i64>),
    /// Append values to list properties.
    Append(Properties),
    /// Merge list values into list properties, skipping duplicates.
    Union(Properties),
    /// Remove the named properties.
    Unset(Vec<String>),
    /// Delete the whole profile.
    Delete,
}

impl ProfileUpdate {
    pub fn operation(&self) -> ProfileOperation {
        match self {
            ProfileUpdate::Set(_) => ProfileOperation::Set,
            ProfileUpdate::SetOnce(_) => ProfileOperation::SetOnce,
            ProfileUpdate::Add(_) => ProfileOperation::Add,
            ProfileUpdate::Append(_) => ProfileOperation::Append,
            ProfileUpdate::Union(_) => ProfileOperation::Union,
            ProfileUpdate::Unset(_) => ProfileOperation::Unset,
            ProfileUpdate::Delete => ProfileOperation::Delete,
        }
    }

    /// Build a typed update from an untyped JSON value.
    ///
    /// Fails when `value` does not have the shape `op` requires. The value is
    /// ignored for `Delete`.
    pub fn from_json(op: ProfileOperation, value: Value) -> Result<Self, serde_json::Error> {
        Ok(match op {
            ProfileOperation::Set => ProfileUpdate::Set(serde_json::from_value(value)?),
            ProfileOperation::SetOnce => ProfileUpdate::SetOnce(serde_json::from_value(value)?),
            ProfileOperation::Add => ProfileUpdate::Add(serde_json::from_value(value)?),
            ProfileOperation::Append => ProfileUpdate::Append(serde_json::from_value(value)?),
            ProfileOperation::Union => ProfileUpdate::Union(serde_json::from_value(value)?),
            ProfileOperation::Unset => ProfileUpdate::Unset(serde_json::from_value(value)?),
            ProfileOperation::Delete => ProfileUpdate::Delete,
        })
    }
}

/// Serializes as a one-entry map `{ "<key>": <value> }` so it can be flattened
/// into the engage envelope. `Delete` carries the empty string.
impl Serialize for ProfileUpdate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        let key = self.operation().key();
        match self {
            ProfileUpdate::Set(props)
            | ProfileUpdate::SetOnce(props)
            | ProfileUpdate::Append(props)
            | ProfileUpdate::Union(props) => map.serialize_entry(key, props)?,
            ProfileUpdate::Add(amounts) => map.serialize_entry(key, amounts)?,
            ProfileUpdate::Unset(names) => map.serialize_entry(key, names)?,
            ProfileUpdate::Delete => map.serialize_entry(key, "")?,
        }
        map.end()
    }
}

/// Body of a `/track/` request.
#[derive(Debug, Clone, Serialize)]
pub struct TrackEnvelope<'a> {
    pub event: &'a str,
    pub properties: Properties,
}

/// Body of an `/engage/` request.
#[derive(Debug, Clone, Serialize)]
pub struct EngageEnvelope<'a> {
    #[serde(rename = "$token")]
    pub token: &'a str,
    #[serde(rename = "$distinct_id")]
    pub distinct_id: &'a str,
    #[serde(rename = "$ip", skip_serializing_if = "Option::is_none")]
    pub ip: Option<&'a str>,
    #[serde(flatten)]
    pub update: &'a ProfileUpdate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(update: &ProfileUpdate) -> Value {
        serde_json::to_value(EngageEnvelope {
            token: "tok",
            distinct_id: "42",
            ip: None,
            update,
        })
        .unwrap()
    }

    #[test]
    fn delete_serializes_as_empty_string() {
        let body = envelope(&ProfileUpdate::Delete);
        assert_eq!(body["$delete"], "");
    }

    #[test]
    fn add_keeps_negative_amounts() {
        let update = ProfileUpdate::Add(BTreeMap::from([
            ("items_created".to_string(), 10),
            ("invites_sent".to_string(), -1),
        ]));
        let body = envelope(&update);
        assert_eq!(body["$add"], json!({"items_created": 10, "invites_sent": -1}));
    }

    #[test]
    fn unset_serializes_as_list() {
        let update = ProfileUpdate::Unset(vec!["Days Purchased".to_string()]);
        assert_eq!(envelope(&update)["$unset"], json!(["Days Purchased"]));
    }

    #[test]
    fn envelope_has_exactly_one_operation_key() {
        for op in ProfileOperation::ALL {
            let value = match op {
                ProfileOperation::Add => json!({"n": 1}),
                ProfileOperation::Unset => json!(["a"]),
                ProfileOperation::Delete => Value::Null,
                _ => json!({"a": "b"}),
            };
            let update = ProfileUpdate::from_json(op, value).unwrap();
            assert_eq!(update.operation(), op);

            let body = envelope(&update);
            let keys: Vec<&str> = body
                .as_object()
                .unwrap()
                .keys()
                .map(String::as_str)
                .filter(|k| ProfileOperation::ALL.iter().any(|o| o.key() == *k))
                .collect();
            assert_eq!(keys, vec![op.key()], "{op:?}");
            assert!(body.get("$ip").is_none());
        }
    }

    #[test]
    fn from_json_rejects_wrong_shape() {
        assert!(ProfileUpdate::from_json(ProfileOperation::Unset, json!({"a": 1})).is_err());
        assert!(ProfileUpdate::from_json(ProfileOperation::Add, json!({"a": "one"})).is_err());
        assert!(ProfileUpdate::from_json(ProfileOperation::Set, json!(["a"])).is_err());
    }
}
