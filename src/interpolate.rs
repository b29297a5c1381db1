//! Values substituted at build time instead of configuration-load time.
//!
//! A post-build step may reference build properties (the revision being
//! built, the project name, ...) that only exist once the build runs. The
//! wire format expresses this as an object with a `_type` discriminator:
//!
//! ```json
//! { "_type": "Interpolate", "value": "prop:revision" }
//! ```
//!
//! anywhere a plain string would otherwise appear.

use serde_json::Value;

use crate::prelude::*;

/// A deferred-interpolation expression.
///
/// The discriminator is stored as `nix_type` in memory but travels as
/// `_type` on the wire, because `_type` is not a usable Rust identifier.
/// Deserialization accepts either name. The *derived* `Serialize` impl
/// emits the in-memory name and is therefore lossy with respect to the wire
/// format; use [`Interpolate::to_json_value`] with
/// [`SerializeMode::ByAlias`] to produce wire-compatible output. This
/// in-memory/wire split is a known fragile point of the schema, kept for
/// compatibility.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Interpolate {
    /// The type discriminator, `"Interpolate"`. Wire name: `_type`.
    #[serde(alias = "_type")]
    pub nix_type: String,

    /// The expression the execution engine substitutes at run time.
    pub value: String,
}

impl Interpolate {
    /// Create an interpolation of the given expression.
    pub fn new(value: impl Into<String>) -> Self {
        Interpolate {
            nix_type: "Interpolate".to_owned(),
            value: value.into(),
        }
    }

    /// Serialize to JSON, choosing which name the discriminator is written
    /// under. [`SerializeMode::ByAlias`] is the wire format.
    pub fn to_json_value(&self, mode: SerializeMode) -> Value {
        let key = match mode {
            SerializeMode::ByAlias => "_type",
            SerializeMode::ByFieldName => "nix_type",
        };
        let mut object = serde_json::Map::new();
        object.insert(key.to_owned(), Value::String(self.nix_type.clone()));
        object.insert("value".to_owned(), Value::String(self.value.clone()));
        Value::Object(object)
    }
}

/// Which name the `Interpolate` discriminator is serialized under.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SerializeMode {
    /// Emit the wire name `_type`. Output round-trips.
    ByAlias,
    /// Emit the in-memory name `nix_type`. This matches the derived
    /// `Serialize` impl and does *not* round-trip through consumers that
    /// expect the wire format.
    ByFieldName,
}

/// Either a fixed string or a deferred interpolation.
///
/// Untagged: a JSON string parses as a literal, an object parses as an
/// [`Interpolate`]. The literal arm is tried first, so matching is
/// deterministic.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StepValue {
    /// A fixed string, used as-is.
    Literal(String),
    /// An expression substituted when the step runs.
    Interpolate(Interpolate),
}

#[test]
fn parse_interpolate_from_wire_format() {
    let json = r#"{ "_type": "Interpolate", "value": "prop:revision" }"#;
    let parsed: Interpolate = serde_json::from_str(json).expect("parse error");
    assert_eq!(parsed, Interpolate::new("prop:revision"));
}

#[test]
fn parse_interpolate_by_field_name() {
    // The in-memory name is accepted too, mirroring the wire alias.
    let json = r#"{ "nix_type": "Interpolate", "value": "prop:project" }"#;
    let parsed: Interpolate = serde_json::from_str(json).expect("parse error");
    assert_eq!(parsed.value, "prop:project");
}

#[test]
fn by_alias_serialization_round_trips() {
    let original = Interpolate::new("prop:revision");
    let value = original.to_json_value(SerializeMode::ByAlias);
    assert!(value.get("_type").is_some());
    let reparsed: Interpolate = serde_json::from_value(value).expect("parse error");
    assert_eq!(reparsed, original);
}

#[test]
fn derived_serialization_is_lossy() {
    // Regression test for the documented gap: the derived impl writes
    // `nix_type`, not the wire name `_type`.
    let value = serde_json::to_value(Interpolate::new("prop:revision")).expect("serialize error");
    assert!(value.get("nix_type").is_some());
    assert!(value.get("_type").is_none());
    assert_eq!(value, Interpolate::new("prop:revision").to_json_value(SerializeMode::ByFieldName));
}

#[test]
fn step_value_parses_strings_and_objects() {
    let literal: StepValue = serde_json::from_str(r#""echo""#).expect("parse error");
    assert_eq!(literal, StepValue::Literal("echo".to_owned()));

    let deferred: StepValue =
        serde_json::from_str(r#"{ "_type": "Interpolate", "value": "prop:revision" }"#)
            .expect("parse error");
    assert_eq!(deferred, StepValue::Interpolate(Interpolate::new("prop:revision")));
}
