//
// Copyright (c) 2024, 2025 Oracle and/or its affiliates. All rights reserved.
//
// Licensed under the Universal Permissive License v 1.0 as shown at
//  https://oss.oracle.com/licenses/upl/
//
//! Typed payloads of the control and schema entity sets, and the envelope
//! returned for every OData entity.
use chrono::{DateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;
use std::result::Result;

use crate::error::{ia_err, DaoError};
use crate::resource::ODataKey;

/// Models that know the key predicate addressing them.
pub trait HasKey {
    fn key(&self) -> ODataKey;
}

/// A cell, as managed at the unit level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CellInfo {
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoxInfo {
    #[serde(rename = "Name")]
    pub name: String,
    /// URL of the schema (application) cell this box belongs to.
    #[serde(rename = "Schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Role {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "_Box.Name", default, skip_serializing_if = "Option::is_none")]
    pub box_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "_Box.Name", default, skip_serializing_if = "Option::is_none")]
    pub box_name: Option<String>,
}

/// Another cell this cell has a relationship with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtCell {
    #[serde(rename = "Url")]
    pub url: String,
}

/// A role of another cell, mapped onto a relation of this cell.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtRole {
    #[serde(rename = "ExtRole")]
    pub ext_role: String,
    #[serde(rename = "_Relation.Name")]
    pub relation_name: String,
    #[serde(
        rename = "_Relation._Box.Name",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub relation_box_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityType {
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "_EntityType.Name")]
    pub entity_type_name: String,
    /// e.g. `Edm.String`, `Edm.Int32`, or the name of a complex type.
    #[serde(rename = "Type")]
    pub property_type: String,
    #[serde(rename = "Nullable", default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(rename = "DefaultValue", default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(rename = "CollectionKind", default, skip_serializing_if = "Option::is_none")]
    pub collection_kind: Option<String>,
    #[serde(rename = "IsKey", default, skip_serializing_if = "Option::is_none")]
    pub is_key: Option<bool>,
    #[serde(rename = "UniqueKey", default, skip_serializing_if = "Option::is_none")]
    pub unique_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplexType {
    #[serde(rename = "Name")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplexTypeProperty {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "_ComplexType.Name")]
    pub complex_type_name: String,
    #[serde(rename = "Type")]
    pub property_type: String,
    #[serde(rename = "Nullable", default, skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(rename = "DefaultValue", default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(rename = "CollectionKind", default, skip_serializing_if = "Option::is_none")]
    pub collection_kind: Option<String>,
}

/// One end of an association between two entity types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssociationEnd {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "_EntityType.Name")]
    pub entity_type_name: String,
    /// `0..1`, `1` or `*`.
    #[serde(rename = "Multiplicity")]
    pub multiplicity: String,
}

impl HasKey for CellInfo {
    fn key(&self) -> ODataKey {
        ODataKey::from(&self.name)
    }
}

impl HasKey for BoxInfo {
    fn key(&self) -> ODataKey {
        ODataKey::from(&self.name)
    }
}

impl HasKey for Account {
    fn key(&self) -> ODataKey {
        ODataKey::from(&self.name)
    }
}

impl HasKey for Role {
    fn key(&self) -> ODataKey {
        ODataKey::name_in_box(&self.name, self.box_name.as_deref())
    }
}

impl HasKey for Relation {
    fn key(&self) -> ODataKey {
        ODataKey::name_in_box(&self.name, self.box_name.as_deref())
    }
}

impl HasKey for ExtCell {
    fn key(&self) -> ODataKey {
        ODataKey::from(&self.url)
    }
}

impl HasKey for ExtRole {
    fn key(&self) -> ODataKey {
        ODataKey::compound(&[
            ("ExtRole", Some(self.ext_role.as_str())),
            ("_Relation.Name", Some(self.relation_name.as_str())),
            ("_Relation._Box.Name", self.relation_box_name.as_deref()),
        ])
    }
}

impl HasKey for EntityType {
    fn key(&self) -> ODataKey {
        ODataKey::from(&self.name)
    }
}

impl HasKey for Property {
    fn key(&self) -> ODataKey {
        ODataKey::compound(&[
            ("Name", Some(self.name.as_str())),
            ("_EntityType.Name", Some(self.entity_type_name.as_str())),
        ])
    }
}

impl HasKey for ComplexType {
    fn key(&self) -> ODataKey {
        ODataKey::from(&self.name)
    }
}

impl HasKey for ComplexTypeProperty {
    fn key(&self) -> ODataKey {
        ODataKey::compound(&[
            ("Name", Some(self.name.as_str())),
            ("_ComplexType.Name", Some(self.complex_type_name.as_str())),
        ])
    }
}

impl HasKey for AssociationEnd {
    fn key(&self) -> ODataKey {
        ODataKey::compound(&[
            ("Name", Some(self.name.as_str())),
            ("_EntityType.Name", Some(self.entity_type_name.as_str())),
        ])
    }
}

// User data is addressed by its `__id`.
impl HasKey for Value {
    fn key(&self) -> ODataKey {
        match self.get("__id") {
            Some(Value::String(s)) => ODataKey::from(s),
            Some(v) => ODataKey::from(v.to_string()),
            None => ODataKey::from(""),
        }
    }
}

/// The `__metadata` block of an OData entity.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ODataMetadata {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(rename = "type", default)]
    pub type_name: String,
}

/// An entity as returned by the server: the payload plus server-assigned fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ODataEntity<T> {
    pub value: T,
    pub metadata: ODataMetadata,
    /// `__id`, present on user data.
    pub id: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
}

impl<T: DeserializeOwned> ODataEntity<T> {
    /// Parse one entity, unwrapping the `{"d": {"results": ...}}` envelope if present.
    pub fn from_value(v: Value) -> Result<ODataEntity<T>, DaoError> {
        let v = unwrap_results(v);
        let obj = match &v {
            Value::Object(o) => o,
            other => {
                return ia_err!("expected a json object for an entity, got {}", other);
            }
        };
        let metadata = match obj.get("__metadata") {
            Some(m) => serde_json::from_value(m.clone())?,
            None => ODataMetadata::default(),
        };
        let id = obj.get("__id").and_then(|v| v.as_str()).map(|s| s.to_string());
        let published = obj.get("__published").and_then(parse_date);
        let updated = obj.get("__updated").and_then(parse_date);
        Ok(ODataEntity {
            value: serde_json::from_value(v)?,
            metadata,
            id,
            published,
            updated,
        })
    }

    pub fn etag(&self) -> Option<&str> {
        self.metadata.etag.as_deref()
    }
}

/// Return `d.results` (or `d`) when `v` is an OData envelope, else `v` itself.
pub(crate) fn unwrap_results(mut v: Value) -> Value {
    if let Some(d) = v.get_mut("d") {
        let d = d.take();
        return match d {
            Value::Object(mut o) => match o.remove("results") {
                Some(r) => r,
                None => Value::Object(o),
            },
            other => other,
        };
    }
    v
}

/// Parse the `/Date(milliseconds)/` form used by the server.
pub(crate) fn parse_date(v: &Value) -> Option<DateTime<Utc>> {
    let s = v.as_str()?;
    let inner = s.strip_prefix("/Date(")?.strip_suffix(")/")?;
    if inner.is_empty() {
        return None;
    }
    // an offset suffix like "+0900" may follow the milliseconds
    let end = inner
        .char_indices()
        .skip(1)
        .find(|(_, c)| *c == '+' || *c == '-')
        .map(|(i, _)| i)
        .unwrap_or(inner.len());
    let ms: i64 = inner[..end].parse().ok()?;
    Utc.timestamp_millis_opt(ms).single()
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_serializes_box_name() {
        let r = Role {
            name: "admin".to_string(),
            box_name: Some("app".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&r).unwrap(),
            json!({"Name": "admin", "_Box.Name": "app"})
        );
        let r = Role {
            name: "admin".to_string(),
            box_name: None,
        };
        assert_eq!(serde_json::to_value(&r).unwrap(), json!({"Name": "admin"}));
    }

    #[test]
    fn property_key() {
        let p = Property {
            name: "age".to_string(),
            entity_type_name: "Pet".to_string(),
            property_type: "Edm.Int32".to_string(),
            ..Default::default()
        };
        assert_eq!(p.key().to_string(), "(Name='age',_EntityType.Name='Pet')");
    }

    #[test]
    fn entity_envelope() {
        let body = json!({"d": {"results": {
            "__metadata": {"uri": "http://h/c/b/o/Pet('p1')", "etag": "W/\"1-1700000000000\"", "type": "UserData.Pet"},
            "__id": "p1",
            "__published": "/Date(1700000000000)/",
            "__updated": "/Date(1700000000000)/",
            "name": "tama",
            "age": 2
        }}});
        let e: ODataEntity<Value> = ODataEntity::from_value(body).unwrap();
        assert_eq!(e.id.as_deref(), Some("p1"));
        assert_eq!(e.etag(), Some("W/\"1-1700000000000\""));
        assert_eq!(e.metadata.type_name, "UserData.Pet");
        assert_eq!(e.value["name"], "tama");
        assert_eq!(e.published.unwrap().timestamp_millis(), 1700000000000);
    }

    #[test]
    fn typed_entity_ignores_server_fields() {
        let body = json!({"d": {"results": {
            "__metadata": {"uri": "u", "etag": "e", "type": "CellCtl.Box"},
            "Name": "box1",
            "Schema": null,
            "__published": "/Date(1)/"
        }}});
        let e: ODataEntity<BoxInfo> = ODataEntity::from_value(body).unwrap();
        assert_eq!(e.value.name, "box1");
        assert_eq!(e.value.schema, None);
    }

    #[test]
    fn dates() {
        assert_eq!(
            parse_date(&json!("/Date(1000)/")).unwrap().timestamp(),
            1
        );
        assert_eq!(
            parse_date(&json!("/Date(1000+0900)/")).unwrap().timestamp(),
            1
        );
        assert!(parse_date(&json!("yesterday")).is_none());
        assert!(parse_date(&json!(12)).is_none());
    }

    #[test]
    fn non_numeric_dates_are_ignored() {
        assert!(parse_date(&json!("/Date(é)/")).is_none());
        assert!(parse_date(&json!("/Date(日本+0900)/")).is_none());
        let e: ODataEntity<Value> =
            ODataEntity::from_value(json!({"__published": "/Date(日本)/"})).unwrap();
        assert!(e.published.is_none());
    }
}
