use once_cell::sync::Lazy;
use thiserror::Error;

use crate::{
    fdm::engine::jet::defaults,
    units::{Dimension, Unit, UnitError, UnitValue},
};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SchemaError {
    #[error("Quantity attribute '{0}' needs either a unit or a default")]
    Unconfigured(String),

    #[error("Quantity attribute '{name}': default '{default}' is not in the dimension of unit '{unit}'")]
    Mismatch {
        name: String,
        unit: String,
        default: String,
    },

    #[error("Quantity attribute '{name}': {source}")]
    Unit { name: String, source: UnitError },
}

/// Declares the dimension, input unit and fallback value of a quantity field.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantityAttribute {
    unit: Unit,
    default: Option<UnitValue>,
}

impl QuantityAttribute {
    /// With only a `default`, its unit becomes the input unit of the attribute.
    pub fn new(name: &str, unit: Option<&str>, default: Option<&str>) -> Result<Self, SchemaError> {
        let unit_err = |source| SchemaError::Unit {
            name: name.to_string(),
            source,
        };

        match (unit, default) {
            (None, None) => Err(SchemaError::Unconfigured(name.to_string())),
            (Some(unit), None) => Ok(QuantityAttribute {
                unit: Unit::parse(unit).map_err(unit_err)?,
                default: None,
            }),
            (None, Some(default)) => {
                let default =
                    UnitValue::parse(default, &Unit::dimensionless()).map_err(unit_err)?;
                Ok(QuantityAttribute {
                    unit: default.unit().clone(),
                    default: Some(default),
                })
            }
            (Some(unit_str), Some(default_str)) => {
                let unit = Unit::parse(unit_str).map_err(unit_err)?;
                let default = UnitValue::parse(default_str, &unit).map_err(unit_err)?;
                if default.dimension() != unit.dimension() {
                    return Err(SchemaError::Mismatch {
                        name: name.to_string(),
                        unit: unit_str.to_string(),
                        default: default_str.to_string(),
                    });
                }
                Ok(QuantityAttribute {
                    unit,
                    default: Some(default),
                })
            }
        }
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn dimension(&self) -> Dimension {
        self.unit.dimension()
    }

    pub fn default(&self) -> Option<&UnitValue> {
        self.default.as_ref()
    }

    /// Parses `<number> [unit]`, assuming the attribute unit when none is written.
    pub fn parse(&self, text: &str) -> Result<UnitValue, UnitError> {
        UnitValue::parse_as(text, &self.unit, self.dimension())
    }

    pub fn from_number(&self, magnitude: f64) -> UnitValue {
        UnitValue::new(magnitude, self.unit.clone())
    }

    pub fn render(&self, value: &UnitValue) -> String {
        value.to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Quantity(QuantityAttribute),
    Float { default: Option<f64> },
    String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub key: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

/// Scalar fields of one description table, plus the keys holding nested tables.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    pub name: &'static str,
    pub fields: Vec<FieldSpec>,
    pub nested: Vec<&'static str>,
}

impl RecordSchema {
    pub fn new(name: &'static str) -> Self {
        RecordSchema {
            name,
            fields: vec![],
            nested: vec![],
        }
    }

    /// Optional quantity. It is never missing when it has a default.
    pub fn quantity(
        mut self,
        key: &'static str,
        unit: Option<&str>,
        default: Option<&str>,
    ) -> Result<Self, SchemaError> {
        let attr = QuantityAttribute::new(&format!("{}.{key}", self.name), unit, default)?;
        self.fields.push(FieldSpec {
            key,
            kind: FieldKind::Quantity(attr),
            required: false,
        });
        Ok(self)
    }

    pub fn required_quantity(mut self, key: &'static str, unit: &str) -> Result<Self, SchemaError> {
        self = self.quantity(key, Some(unit), None)?;
        if let Some(f) = self.fields.last_mut() {
            f.required = true;
        }
        Ok(self)
    }

    pub fn float(mut self, key: &'static str, default: Option<f64>) -> Self {
        self.fields.push(FieldSpec {
            key,
            kind: FieldKind::Float { default },
            required: false,
        });
        self
    }

    pub fn string(mut self, key: &'static str) -> Self {
        self.fields.push(FieldSpec {
            key,
            kind: FieldKind::String,
            required: false,
        });
        self
    }

    pub fn nested(mut self, key: &'static str) -> Self {
        self.nested.push(key);
        self
    }

    pub fn field(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn attribute(&self, key: &str) -> Option<&QuantityAttribute> {
        match self.field(key).map(|f| &f.kind) {
            Some(FieldKind::Quantity(attr)) => Some(attr),
            _ => None,
        }
    }

    pub fn is_nested(&self, key: &str) -> bool {
        self.nested.iter().any(|k| *k == key)
    }
}

fn actionpt_schema() -> Result<RecordSchema, SchemaError> {
    RecordSchema::new("actionpt")
        .required_quantity("x", "m")?
        .required_quantity("y", "m")?
        .required_quantity("z", "m")
}

fn cruise_schema() -> Result<RecordSchema, SchemaError> {
    Ok(RecordSchema::new("cruise")
        .required_quantity("thrust", "lbf")?
        .quantity("alt", None, Some(defaults::CRUISE_ALTITUDE))?
        .float("mach", None)
        .quantity("speed", Some("kt"), None)?
        .float("throttle", Some(defaults::CRUISE_THROTTLE)))
}

fn jet_schema() -> Result<RecordSchema, SchemaError> {
    Ok(RecordSchema::new("jet")
        .string("name")
        .quantity("mass", Some("lb"), None)?
        .quantity("thrust", Some("lbf"), None)?
        .quantity("rotate", None, Some(defaults::ROTATE))?
        .float("n1-idle", Some(defaults::N1_IDLE))
        .float("n1-max", Some(defaults::N1_MAX))
        .float("n2-idle", Some(defaults::N2_IDLE))
        .float("n2-max", Some(defaults::N2_MAX))
        .quantity("tsfc", None, Some(defaults::TSFC))?
        .quantity("egt", None, Some(defaults::EGT))?
        .float("epr", Some(defaults::EPR))
        .quantity("exhaust-speed", Some("kt"), None)?
        .quantity("spool-time", None, Some(defaults::SPOOL_TIME))?
        .float("bypassratio", Some(defaults::BYPASS_RATIO))
        .quantity("flat-to-temp", Some("degC"), None)?
        .quantity("flat-to-alt", Some("ft"), None)?
        .nested("cruise")
        .nested("actionpt"))
}

fn airplane_schema() -> Result<RecordSchema, SchemaError> {
    Ok(RecordSchema::new("airplane")
        .quantity("mass", Some("lb"), None)?
        .string("version")
        .nested("jet"))
}

pub static ACTIONPT_SCHEMA: Lazy<RecordSchema> =
    Lazy::new(|| actionpt_schema().expect("Invalid actionpt schema"));

pub static CRUISE_SCHEMA: Lazy<RecordSchema> =
    Lazy::new(|| cruise_schema().expect("Invalid cruise schema"));

pub static JET_SCHEMA: Lazy<RecordSchema> =
    Lazy::new(|| jet_schema().expect("Invalid jet schema"));

pub static AIRPLANE_SCHEMA: Lazy<RecordSchema> =
    Lazy::new(|| airplane_schema().expect("Invalid airplane schema"));
