//! A single shareholder or media record as published by the upstream API.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{KekError, Result};

/// Kind of entity; media carry their distribution type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Shareholder,
    Radio,
    Tv,
    Print,
    Online,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Shareholder => "shareholder",
            EntityKind::Radio => "radio",
            EntityKind::Tv => "tv",
            EntityKind::Print => "print",
            EntityKind::Online => "online",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "shareholder" => Some(EntityKind::Shareholder),
            "radio" => Some(EntityKind::Radio),
            "tv" => Some(EntityKind::Tv),
            "print" => Some(EntityKind::Print),
            "online" => Some(EntityKind::Online),
            _ => None,
        }
    }

    pub fn is_media(&self) -> bool {
        !matches!(self, EntityKind::Shareholder)
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// One entry of `ownedBy`, `owns`, `operatedBy` or `operates`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relation {
    pub squuid: String,
    pub name: String,
    /// `capitalShares` in percent, when the relation carries one.
    pub shares: Option<f64>,
    pub complementary_partner: bool,
}

/// Entity record wrapping the raw JSON object.
#[derive(Debug, Clone)]
pub struct KekObject {
    squuid: String,
    data: Map<String, Value>,
}

impl KekObject {
    /// Wrap raw API data.
    ///
    /// Records that failed upstream schema validation come as
    /// `{"errors": ..., "value": {...}}`; the invalidated `value` is used.
    pub fn new(data: Value) -> Result<Self> {
        let data = match data {
            Value::Object(mut map) => {
                if map.get("squuid").is_none() && map.contains_key("errors") {
                    match map.remove("value") {
                        Some(Value::Object(value)) => value,
                        _ => {
                            return Err(KekError::Parse(
                                "record has schema errors and no value".to_string(),
                            ))
                        }
                    }
                } else {
                    map
                }
            }
            other => {
                return Err(KekError::Parse(format!(
                    "expected a JSON object, got {}",
                    json_type_name(&other)
                )))
            }
        };

        let squuid = data
            .get("squuid")
            .and_then(Value::as_str)
            .ok_or_else(|| KekError::Parse("record without squuid".to_string()))?
            .to_string();

        Ok(Self { squuid, data })
    }

    pub fn squuid(&self) -> &str {
        &self.squuid
    }

    /// `fullName` when set, else `name`.
    pub fn name(&self) -> &str {
        self.str_field("fullName")
            .filter(|s| !s.is_empty())
            .or_else(|| self.str_field("name"))
            .unwrap_or("")
    }

    pub fn is_media(&self) -> bool {
        self.data.contains_key("operatedBy")
    }

    pub fn kind(&self) -> EntityKind {
        if let Some(kind) = self.str_field("type").and_then(EntityKind::parse) {
            if kind.is_media() {
                return kind;
            }
        }
        EntityKind::Shareholder
    }

    /// Media `type` string as published, if any.
    pub fn media_type(&self) -> Option<&str> {
        self.str_field("type")
    }

    /// Federal state name, e.g. "Bayern".
    pub fn state(&self) -> Option<&str> {
        match self.data.get("state") {
            Some(Value::Object(state)) => state.get("name").and_then(Value::as_str),
            Some(Value::String(state)) => Some(state.as_str()),
            _ => None,
        }
    }

    pub fn control_date(&self) -> Option<&str> {
        self.str_field("controlDate")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.data.clone())
    }

    pub fn operators(&self) -> Vec<Relation> {
        self.relations("operatedBy", "holder")
    }

    pub fn operates(&self) -> Vec<Relation> {
        self.relations("operates", "held")
    }

    /// Owners with their capital shares (0 when unknown).
    pub fn owners(&self) -> Vec<Relation> {
        with_default_shares(self.relations("ownedBy", "holder"))
    }

    /// Owned entities with capital shares (0 when unknown).
    pub fn owns(&self) -> Vec<Relation> {
        with_default_shares(self.relations("owns", "held"))
    }

    /// Read a relation array, e.g. `ownedBy[].holder`.
    pub fn relations(&self, array_name: &str, relation_name: &str) -> Vec<Relation> {
        let Some(Value::Array(array)) = self.data.get(array_name) else {
            return Vec::new();
        };

        array
            .iter()
            .filter_map(|rel| {
                let other = rel.get(relation_name)?;
                let squuid = other.get("squuid")?.as_str()?.to_string();
                let name = other
                    .get("fullName")
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .or_else(|| other.get("name").and_then(Value::as_str))
                    .unwrap_or("")
                    .to_string();
                Some(Relation {
                    squuid,
                    name,
                    shares: rel.get("capitalShares").and_then(Value::as_f64),
                    complementary_partner: rel
                        .get("complementaryPartner")
                        .map(is_truthy)
                        .unwrap_or(false),
                })
            })
            .collect()
    }
}

impl PartialEq for KekObject {
    fn eq(&self, other: &Self) -> bool {
        self.squuid == other.squuid
    }
}

impl Eq for KekObject {}

impl std::hash::Hash for KekObject {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.squuid.hash(state);
    }
}

fn with_default_shares(mut relations: Vec<Relation>) -> Vec<Relation> {
    for rel in &mut relations {
        rel.shares.get_or_insert(0.0);
    }
    relations
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn holder() -> KekObject {
        KekObject::new(json!({
            "squuid": "h-1",
            "name": "Holding",
            "fullName": "Holding GmbH & Co. KG",
            "state": {"name": "Bayern"},
            "ownedBy": [
                {"holder": {"squuid": "h-0", "name": "Familie X"}, "capitalShares": 75.0},
                {"holder": {"squuid": "h-p", "name": "Partner"}, "complementaryPartner": true}
            ],
            "owns": [
                {"held": {"squuid": "h-2", "name": "Sub"}, "capitalShares": 51}
            ],
            "operates": [
                {"held": {"squuid": "m-1", "name": "Radio Eins"}}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_name_prefers_full_name() {
        let obj = holder();
        assert_eq!(obj.name(), "Holding GmbH & Co. KG");
        let plain = KekObject::new(json!({"squuid": "x", "name": "Plain", "fullName": ""})).unwrap();
        assert_eq!(plain.name(), "Plain");
    }

    #[test]
    fn test_relations() {
        let obj = holder();
        let owners = obj.owners();
        assert_eq!(owners.len(), 2);
        assert_eq!(owners[0].squuid, "h-0");
        assert_eq!(owners[0].shares, Some(75.0));
        assert_eq!(owners[1].shares, Some(0.0));
        assert!(owners[1].complementary_partner);
        assert_eq!(obj.owns()[0].shares, Some(51.0));
        assert_eq!(obj.operates()[0].squuid, "m-1");
        assert_eq!(obj.operates()[0].shares, None);
        assert!(obj.operators().is_empty());
    }

    #[test]
    fn test_kind_and_state() {
        let obj = holder();
        assert!(!obj.is_media());
        assert_eq!(obj.kind(), EntityKind::Shareholder);
        assert_eq!(obj.state(), Some("Bayern"));

        let media = KekObject::new(json!({
            "squuid": "m-1", "name": "Radio Eins", "type": "radio",
            "operatedBy": [{"holder": {"squuid": "h-1", "name": "Holding"}}]
        }))
        .unwrap();
        assert!(media.is_media());
        assert_eq!(media.kind(), EntityKind::Radio);
        assert_eq!(media.operators()[0].squuid, "h-1");
    }

    #[test]
    fn test_schema_error_fallback() {
        let obj = KekObject::new(json!({
            "errors": [{"message": "schema"}],
            "value": {"squuid": "5f02e1b5", "name": "Broken"}
        }))
        .unwrap();
        assert_eq!(obj.squuid(), "5f02e1b5");
        assert_eq!(obj.name(), "Broken");
    }

    #[test]
    fn test_missing_squuid_is_error() {
        assert!(KekObject::new(json!({"name": "nobody"})).is_err());
        assert!(KekObject::new(json!([1, 2])).is_err());
        assert!(KekObject::new(json!({"errors": []})).is_err());
    }
}
