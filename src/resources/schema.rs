use std::collections::HashMap;

use bson::{Bson, Document};
use chrono::SecondsFormat;
use serde_json::{Map, Value};

use crate::auth::ownership::OWNER_FIELD;
use crate::database::StoreError;

/// Fields owned by the server; clients can never set them
pub const SERVER_FIELDS: &[&str] = &["id", "_id", OWNER_FIELD, "created_at", "updated_at"];

pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

/// Field name -> message, reported back with a 422
pub type FieldErrors = HashMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Number,
    Text,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub ty: FieldType,
}

impl FieldSpec {
    pub const fn number(name: &'static str) -> Self {
        Self { name, ty: FieldType::Number }
    }

    pub const fn text(name: &'static str) -> Self {
        Self { name, ty: FieldType::Text }
    }

    fn parse(&self, value: &Value) -> Result<FieldValue, String> {
        match (self.ty, value) {
            (_, Value::Null) => Err("Field cannot be null".to_string()),
            (FieldType::Number, Value::Number(n)) => n
                .as_f64()
                .map(FieldValue::Number)
                .ok_or_else(|| "Expected a number".to_string()),
            // Form inputs post amounts as strings
            (FieldType::Number, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(FieldValue::Number)
                .ok_or_else(|| "Expected a number".to_string()),
            (FieldType::Number, _) => Err("Expected a number".to_string()),
            (FieldType::Text, Value::String(s)) => Ok(FieldValue::Text(s.clone())),
            (FieldType::Text, _) => Err("Expected a string".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl From<FieldValue> for Bson {
    fn from(value: FieldValue) -> Self {
        match value {
            FieldValue::Number(n) => Bson::Double(n),
            FieldValue::Text(s) => Bson::String(s),
        }
    }
}

/// State of one updatable field in a PATCH body. `Unset` means the caller did
/// not mention the field, and the stored value must be left alone.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Unset,
    Set(FieldValue),
}

/// Validated partial update: one entry per schema field, in schema order
#[derive(Debug, Clone, PartialEq)]
pub struct Patch {
    updates: Vec<(&'static str, FieldUpdate)>,
}

impl Patch {
    #[cfg(test)]
    pub(crate) fn get(&self, name: &str) -> Option<&FieldUpdate> {
        self.updates
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, update)| update)
    }

    /// True when no field is set
    pub fn is_empty(&self) -> bool {
        self.updates
            .iter()
            .all(|(_, update)| *update == FieldUpdate::Unset)
    }

    /// Only the `Set` fields, ready for a `$set`
    pub fn into_document(self) -> Document {
        let mut document = Document::new();
        for (field, update) in self.updates {
            if let FieldUpdate::Set(value) = update {
                document.insert(field, Bson::from(value));
            }
        }
        document
    }
}

/// Declarative description of one resource kind
#[derive(Debug)]
pub struct ResourceSchema {
    /// Path segment under /v1, e.g. "budgets"
    pub kind: &'static str,
    /// Singular display name used in error messages, e.g. "Budget"
    pub label: &'static str,
    pub collection: &'static str,
    pub fields: &'static [FieldSpec],
    /// Whether every query is restricted to the caller's documents
    pub scoped: bool,
}

impl ResourceSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validate a create body. Every schema field is required.
    pub fn validate_create(&self, body: &Value) -> Result<Document, FieldErrors> {
        let object = self.as_object(body)?;
        let mut errors = self.reject_foreign_fields(object);
        let mut document = Document::new();

        for spec in self.fields {
            match object.get(spec.name) {
                None => {
                    errors.insert(spec.name.to_string(), "This field is required".to_string());
                }
                Some(raw) => match spec.parse(raw) {
                    Ok(value) => {
                        document.insert(spec.name, Bson::from(value));
                    }
                    Err(msg) => {
                        errors.insert(spec.name.to_string(), msg);
                    }
                },
            }
        }

        if errors.is_empty() {
            Ok(document)
        } else {
            Err(errors)
        }
    }

    /// Validate a PATCH body. Fields are optional; absence and null are distinct.
    pub fn validate_patch(&self, body: &Value) -> Result<Patch, FieldErrors> {
        let object = self.as_object(body)?;
        let mut errors = self.reject_foreign_fields(object);
        let mut updates = Vec::with_capacity(self.fields.len());

        for spec in self.fields {
            let update = match object.get(spec.name) {
                None => FieldUpdate::Unset,
                Some(raw) => match spec.parse(raw) {
                    Ok(value) => FieldUpdate::Set(value),
                    Err(msg) => {
                        errors.insert(spec.name.to_string(), msg);
                        continue;
                    }
                },
            };
            updates.push((spec.name, update));
        }

        if errors.is_empty() {
            Ok(Patch { updates })
        } else {
            Err(errors)
        }
    }

    /// Map a stored document to its external JSON representation
    pub fn represent(&self, document: &Document) -> Result<Value, StoreError> {
        let id = document
            .get_object_id("_id")
            .map_err(|_| StoreError::Malformed(format!("{} document without ObjectId _id", self.kind)))?;
        let created_at = document
            .get_datetime(CREATED_AT)
            .map_err(|_| StoreError::Malformed(format!("{} {} has no created_at", self.label, id)))?;

        let mut out = Map::new();
        out.insert("id".to_string(), Value::String(id.to_hex()));
        out.insert(OWNER_FIELD.to_string(), bson_to_json(document.get(OWNER_FIELD)));
        for spec in self.fields {
            out.insert(spec.name.to_string(), bson_to_json(document.get(spec.name)));
        }
        out.insert(CREATED_AT.to_string(), Value::String(format_timestamp(created_at)));
        let updated_at = match document.get(UPDATED_AT) {
            Some(Bson::DateTime(dt)) => Value::String(format_timestamp(dt)),
            _ => Value::Null,
        };
        out.insert(UPDATED_AT.to_string(), updated_at);

        Ok(Value::Object(out))
    }

    fn as_object<'a>(&self, body: &'a Value) -> Result<&'a Map<String, Value>, FieldErrors> {
        body.as_object().ok_or_else(|| {
            let mut errors = FieldErrors::new();
            errors.insert("body".to_string(), "Expected JSON object".to_string());
            errors
        })
    }

    fn reject_foreign_fields(&self, object: &Map<String, Value>) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for key in object.keys() {
            if SERVER_FIELDS.contains(&key.as_str()) {
                errors.insert(key.clone(), "Field is set by the server".to_string());
            } else if self.field(key).is_none() {
                errors.insert(key.clone(), "Unknown field".to_string());
            }
        }
        errors
    }
}

fn format_timestamp(dt: &bson::DateTime) -> String {
    dt.to_chrono().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn bson_to_json(value: Option<&Bson>) -> Value {
    match value {
        None | Some(Bson::Null) => Value::Null,
        Some(Bson::String(s)) => Value::String(s.clone()),
        Some(Bson::Double(n)) => serde_json::json!(n),
        Some(Bson::Int32(n)) => Value::from(*n),
        Some(Bson::Int64(n)) => Value::from(*n),
        Some(other) => other.clone().into_relaxed_extjson(),
    }
}
