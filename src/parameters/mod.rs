pub mod deser;
pub mod schema;

pub use deser::{parse_str, to_toml_string, Description, GenerateConfig, SampleRange};

use std::collections::BTreeMap;

use crate::units::UnitValue;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Quantity(UnitValue),
    Float(f64),
    String(String),
}

impl FieldValue {
    pub fn as_quantity(&self) -> Option<&UnitValue> {
        if let FieldValue::Quantity(v) = self {
            Some(v)
        } else {
            None
        }
    }

    pub fn as_f64(&self) -> Option<&f64> {
        if let FieldValue::Float(v) = self {
            Some(v)
        } else {
            None
        }
    }

    pub fn as_string(&self) -> Option<&String> {
        if let FieldValue::String(v) = self {
            Some(v)
        } else {
            None
        }
    }
}

/// Scalar fields of one description table, with defaults filled in.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn insert(&mut self, key: &str, value: FieldValue) {
        self.fields.insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn quantity(&self, key: &str) -> Option<UnitValue> {
        self.get(key).and_then(FieldValue::as_quantity).cloned()
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(FieldValue::as_f64).copied()
    }

    pub fn string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(FieldValue::as_string).cloned()
    }
}
