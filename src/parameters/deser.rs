use serde::{Deserialize, Serialize};
use thiserror::Error;
use toml::{Table, Value};

use super::{
    schema::{
        FieldKind, FieldSpec, RecordSchema, ACTIONPT_SCHEMA, AIRPLANE_SCHEMA, CRUISE_SCHEMA,
        JET_SCHEMA,
    },
    FieldValue, Record,
};
use crate::{
    fdm::{
        aircraft::Airplane,
        engine::{ActionPoint, CruisePoint, Engine, JetEngine},
    },
    units::{UnitError, UnitValue},
};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum Error {
    #[error("Description toml does not have the right structure: {0}")]
    BadStructure(String),

    #[error("Missing required field '{0}'")]
    MissingField(String),

    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("Cannot convert '{path}' to {expected}")]
    BadConversion { path: String, expected: String },

    #[error("Invalid value for '{path}': {source}")]
    Field { path: String, source: UnitError },

    #[error("Error deserializing description")]
    Deserialize(#[from] toml::de::Error),

    #[error("Error serializing description: {0}")]
    Serialize(String),
}

/// `steps + 1` evenly spaced samples from `start` to `end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SampleRange {
    pub start: f64,
    pub end: f64,
    pub steps: usize,
}

/// Sampling grid of the generated thrust tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct GenerateConfig {
    pub mach: SampleRange,
    pub altitude_ft: SampleRange,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        GenerateConfig {
            mach: SampleRange {
                start: 0.0,
                end: 1.0,
                steps: 10,
            },
            altitude_ft: SampleRange {
                start: 0.0,
                end: 40000.0,
                steps: 8,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Description {
    pub airplane: Airplane,
    pub generate: GenerateConfig,
}

fn append_path(root: &str, key: &str) -> String {
    if root.is_empty() {
        key.to_string()
    } else {
        format!("{root}.{key}")
    }
}

pub fn parse_str(toml_str: &str) -> Result<Description, Error> {
    let mut table = toml::from_str::<Table>(toml_str)?;

    let generate = match table.remove("generate") {
        Some(v) => v.try_into::<GenerateConfig>()?,
        None => GenerateConfig::default(),
    };

    let airplane = match table.remove("airplane") {
        Some(Value::Table(t)) => parse_airplane(&t, "airplane")?,
        Some(_) => return Err(Error::BadStructure("'airplane' must be a table".to_string())),
        None => return Err(Error::MissingField("airplane".to_string())),
    };

    if let Some(k) = table.keys().next() {
        return Err(Error::UnknownField(k.clone()));
    }

    Ok(Description { airplane, generate })
}

/// Parses the scalar fields of `table` against `schema`, filling in defaults.
///
/// Keys the schema declares as nested are skipped; everything else must be a known field.
pub fn parse_record(schema: &RecordSchema, table: &Table, path: &str) -> Result<Record, Error> {
    let mut record = Record::default();

    for (k, v) in table.iter() {
        if schema.is_nested(k) {
            continue;
        }
        let nested = append_path(path, k);
        let field = schema
            .field(k)
            .ok_or_else(|| Error::UnknownField(nested.clone()))?;

        record.insert(k, parse_value(field, v, &nested)?);
    }

    for field in schema.fields.iter() {
        if record.get(field.key).is_some() {
            continue;
        }

        let default = match &field.kind {
            FieldKind::Quantity(attr) => attr.default().cloned().map(FieldValue::Quantity),
            FieldKind::Float { default } => default.map(FieldValue::Float),
            FieldKind::String => None,
        };

        match default {
            Some(value) => record.insert(field.key, value),
            None if field.required => {
                return Err(Error::MissingField(append_path(path, field.key)))
            }
            None => {}
        }
    }

    Ok(record)
}

fn parse_value(field: &FieldSpec, value: &Value, path: &str) -> Result<FieldValue, Error> {
    let bad_conversion = |expected: &str| Error::BadConversion {
        path: path.to_string(),
        expected: expected.to_string(),
    };

    match &field.kind {
        FieldKind::Quantity(attr) => match value {
            Value::String(s) => attr
                .parse(s)
                .map(FieldValue::Quantity)
                .map_err(|source| Error::Field {
                    path: path.to_string(),
                    source,
                }),
            value => Ok(FieldValue::Quantity(
                attr.from_number(as_number(value).ok_or_else(|| bad_conversion("quantity"))?),
            )),
        },
        FieldKind::Float { .. } => Ok(FieldValue::Float(
            as_number(value)
                .or(value.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
                .ok_or_else(|| bad_conversion("float"))?,
        )),
        FieldKind::String => Ok(FieldValue::String(
            value
                .as_str()
                .ok_or_else(|| bad_conversion("string"))?
                .to_string(),
        )),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    value.as_float().or(value.as_integer().map(|v| v as f64))
}

fn required<T>(value: Option<T>, path: &str, key: &str) -> Result<T, Error> {
    value.ok_or_else(|| Error::MissingField(append_path(path, key)))
}

fn nested_table<'a>(table: &'a Table, key: &str, path: &str) -> Result<Option<&'a Table>, Error> {
    match table.get(key) {
        None => Ok(None),
        Some(Value::Table(t)) => Ok(Some(t)),
        Some(_) => Err(Error::BadStructure(format!(
            "'{}' must be a table",
            append_path(path, key)
        ))),
    }
}

fn parse_airplane(table: &Table, path: &str) -> Result<Airplane, Error> {
    let record = parse_record(&AIRPLANE_SCHEMA, table, path)?;

    let engines = match table.get("jet") {
        None => vec![],
        Some(Value::Array(jets)) => jets
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let nested = format!("{}[{i}]", append_path(path, "jet"));
                match v {
                    Value::Table(t) => parse_jet(t, &nested).map(Engine::Jet),
                    _ => Err(Error::BadStructure(format!("'{nested}' must be a table"))),
                }
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(Error::BadStructure(format!(
                "'{}' must be an array of tables",
                append_path(path, "jet")
            )))
        }
    };

    Ok(Airplane {
        mass: record.quantity("mass"),
        version: record.string("version"),
        engines,
    })
}

fn parse_jet(table: &Table, path: &str) -> Result<JetEngine, Error> {
    let record = parse_record(&JET_SCHEMA, table, path)?;
    let q = |key: &str| required(record.quantity(key), path, key);
    let f = |key: &str| required(record.float(key), path, key);

    let cruise = nested_table(table, "cruise", path)?
        .map(|t| parse_cruise(t, &append_path(path, "cruise")))
        .transpose()?;
    let actionpt = nested_table(table, "actionpt", path)?
        .map(|t| parse_actionpt(t, &append_path(path, "actionpt")))
        .transpose()?;

    Ok(JetEngine {
        name: record.string("name"),
        mass: record.quantity("mass"),
        thrust: record.quantity("thrust"),
        rotate: q("rotate")?,
        n1_idle: f("n1-idle")?,
        n1_max: f("n1-max")?,
        n2_idle: f("n2-idle")?,
        n2_max: f("n2-max")?,
        tsfc: q("tsfc")?,
        egt: q("egt")?,
        epr: f("epr")?,
        v_ex: record.quantity("exhaust-speed"),
        t_spool: q("spool-time")?,
        bypassratio: f("bypassratio")?,
        flat_temp: record.quantity("flat-to-temp"),
        flat_alt: record.quantity("flat-to-alt"),
        actionpt,
        cruise,
    })
}

fn parse_cruise(table: &Table, path: &str) -> Result<CruisePoint, Error> {
    let record = parse_record(&CRUISE_SCHEMA, table, path)?;

    Ok(CruisePoint {
        thrust: required(record.quantity("thrust"), path, "thrust")?,
        altitude: required(record.quantity("alt"), path, "alt")?,
        mach: record.float("mach"),
        speed: record.quantity("speed"),
        throttle: required(record.float("throttle"), path, "throttle")?,
    })
}

fn parse_actionpt(table: &Table, path: &str) -> Result<ActionPoint, Error> {
    let record = parse_record(&ACTIONPT_SCHEMA, table, path)?;

    Ok(ActionPoint {
        x: required(record.quantity("x"), path, "x")?,
        y: required(record.quantity("y"), path, "y")?,
        z: required(record.quantity("z"), path, "z")?,
    })
}

/// Writes the description back as toml, quantities in their canonical text form.
pub fn to_toml_string(description: &Description) -> Result<String, Error> {
    let mut root = Table::new();

    root.insert(
        "airplane".to_string(),
        Value::Table(airplane_to_table(&description.airplane)),
    );
    root.insert(
        "generate".to_string(),
        Value::try_from(&description.generate).map_err(|e| Error::Serialize(e.to_string()))?,
    );

    toml::to_string(&root).map_err(|e| Error::Serialize(e.to_string()))
}

fn put_quantity(table: &mut Table, key: &str, value: &Option<UnitValue>) {
    if let Some(v) = value {
        table.insert(key.to_string(), Value::String(v.to_string()));
    }
}

fn airplane_to_table(airplane: &Airplane) -> Table {
    let mut t = Table::new();

    put_quantity(&mut t, "mass", &airplane.mass);
    if let Some(version) = &airplane.version {
        t.insert("version".to_string(), Value::String(version.clone()));
    }

    let jets = airplane
        .jets()
        .map(|j| Value::Table(jet_to_table(j)))
        .collect::<Vec<_>>();
    if !jets.is_empty() {
        t.insert("jet".to_string(), Value::Array(jets));
    }

    t
}

fn jet_to_table(jet: &JetEngine) -> Table {
    let mut t = Table::new();

    if let Some(name) = &jet.name {
        t.insert("name".to_string(), Value::String(name.clone()));
    }
    put_quantity(&mut t, "mass", &jet.mass);
    put_quantity(&mut t, "thrust", &jet.thrust);
    put_quantity(&mut t, "rotate", &Some(jet.rotate.clone()));
    for (k, v) in [
        ("n1-idle", jet.n1_idle),
        ("n1-max", jet.n1_max),
        ("n2-idle", jet.n2_idle),
        ("n2-max", jet.n2_max),
        ("epr", jet.epr),
        ("bypassratio", jet.bypassratio),
    ] {
        t.insert(k.to_string(), Value::Float(v));
    }
    put_quantity(&mut t, "tsfc", &Some(jet.tsfc.clone()));
    put_quantity(&mut t, "egt", &Some(jet.egt.clone()));
    put_quantity(&mut t, "exhaust-speed", &jet.v_ex);
    put_quantity(&mut t, "spool-time", &Some(jet.t_spool.clone()));
    put_quantity(&mut t, "flat-to-temp", &jet.flat_temp);
    put_quantity(&mut t, "flat-to-alt", &jet.flat_alt);

    if let Some(c) = &jet.cruise {
        let mut ct = Table::new();
        put_quantity(&mut ct, "thrust", &Some(c.thrust.clone()));
        put_quantity(&mut ct, "alt", &Some(c.altitude.clone()));
        if let Some(mach) = c.mach {
            ct.insert("mach".to_string(), Value::Float(mach));
        }
        put_quantity(&mut ct, "speed", &c.speed);
        ct.insert("throttle".to_string(), Value::Float(c.throttle));
        t.insert("cruise".to_string(), Value::Table(ct));
    }

    if let Some(a) = &jet.actionpt {
        let mut at = Table::new();
        put_quantity(&mut at, "x", &Some(a.x.clone()));
        put_quantity(&mut at, "y", &Some(a.y.clone()));
        put_quantity(&mut at, "z", &Some(a.z.clone()));
        t.insert("actionpt".to_string(), Value::Table(at));
    }

    t
}

#[cfg(test)]
mod test {
    use super::*;

    use anyhow::Result;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    fn q(s: &str) -> UnitValue {
        s.parse().unwrap()
    }

    const MODEL: &str = r#"
        [airplane]
        mass = "25000 lb"
        version = "2018.1"

        [[airplane.jet]]
        thrust = "5000 lbf"
        n1-idle = 52
        [airplane.jet.actionpt]
        x = -3.2
        y = "1.1 m"
        z = "20 in"

        [[airplane.jet]]
        thrust = 5000

        [[airplane.jet]]
        name = "main"
        thrust = "20000 lbf"
        flat-to-temp = 30
        [airplane.jet.cruise]
        thrust = "5000 lbf"
        alt = "37000"
        mach = 0.8
    "#;

    #[test]
    fn test_parse_model() -> Result<()> {
        let desc = parse_str(MODEL)?;
        let airplane = &desc.airplane;

        assert_eq!(airplane.mass, Some(q("25000 lb")));
        assert_eq!(airplane.version.as_deref(), Some("2018.1"));
        assert_eq!(airplane.engines.len(), 3);
        assert_eq!(desc.generate, GenerateConfig::default());

        let jets = airplane.jets().collect::<Vec<_>>();

        assert_eq!(jets[0].n1_idle, 52.0);
        assert_eq!(jets[0].n1_max, 102.0);
        assert_eq!(jets[0].egt, q("1050 K"));
        assert_eq!(jets[0].rotate.to_string(), "0 deg");
        let actionpt = jets[0].actionpt.as_ref().unwrap();
        assert_eq!(actionpt.x.to_string(), "-3.2 m");
        assert_relative_eq!(actionpt.z.si(), 0.508, epsilon = 1e-12);

        // A bare number is taken in the declared unit
        assert_eq!(jets[1].thrust, Some(q("5000 lbf")));
        let mut key = jets[0].key();
        key.n1_idle = 55.0;
        assert_eq!(jets[1].key(), key);

        assert_eq!(jets[2].name.as_deref(), Some("main"));
        assert_eq!(jets[2].flat_temp.as_ref().map(|t| t.to_string()), Some("30 degC".to_string()));
        let cruise = jets[2].cruise.as_ref().unwrap();
        assert_eq!(cruise.altitude.to_string(), "37000 ft");
        assert_eq!(cruise.mach, Some(0.8));
        assert_eq!(cruise.speed, None);
        assert_eq!(cruise.throttle, 1.0);

        Ok(())
    }

    #[test]
    fn test_defaults() -> Result<()> {
        let desc = parse_str(
            "[airplane]
            [[airplane.jet]]
            [airplane.jet.cruise]
            thrust = 1000
            ",
        )?;

        let jet = desc.airplane.jets().next().unwrap();
        assert_eq!(jet, &{
            let mut j = JetEngine::new(None)?;
            j.cruise = Some(CruisePoint::new(q("1000 lbf"), q("35000 ft")));
            j
        });
        assert_eq!(desc.airplane.mass, None);

        Ok(())
    }

    #[test]
    fn test_generate_section() -> Result<()> {
        let desc = parse_str(
            "[airplane]
            [generate]
            mach = { start = 0.0, end = 2.0, steps = 4 }
            ",
        )?;

        assert_eq!(
            desc.generate.mach,
            SampleRange {
                start: 0.0,
                end: 2.0,
                steps: 4
            }
        );
        assert_eq!(desc.generate.altitude_ft, GenerateConfig::default().altitude_ft);

        assert!(matches!(
            parse_str("[airplane]\n[generate]\nspeed = 1"),
            Err(Error::Deserialize(_))
        ));
        Ok(())
    }

    #[test]
    fn test_numeric_strings() -> Result<()> {
        let desc = parse_str(
            "[airplane]
            [[airplane.jet]]
            epr = \"2.5\"
            bypassratio = 4
            ",
        )?;
        let jet = desc.airplane.jets().next().unwrap();
        assert_eq!(jet.epr, 2.5);
        assert_eq!(jet.bypassratio, 4.0);
        Ok(())
    }

    #[test]
    fn test_missing_field() {
        assert_eq!(
            parse_str(
                "[airplane]
                [[airplane.jet]]
                [[airplane.jet]]
                [airplane.jet.cruise]
                mach = 0.8
                "
            ),
            Err(Error::MissingField("airplane.jet[1].cruise.thrust".to_string()))
        );

        assert_eq!(
            parse_str("[plane]"),
            Err(Error::MissingField("airplane".to_string()))
        );
    }

    #[test]
    fn test_unknown_field() {
        assert_eq!(
            parse_str(
                "[airplane]
                [[airplane.jet]]
                thurst = 5000
                "
            ),
            Err(Error::UnknownField("airplane.jet[0].thurst".to_string()))
        );

        assert_eq!(
            parse_str("[airplane]\n[engines]"),
            Err(Error::UnknownField("engines".to_string()))
        );
    }

    #[test]
    fn test_bad_values() {
        assert_eq!(
            parse_str(
                "[airplane]
                [[airplane.jet]]
                thrust = \"5000 kg\"
                "
            ),
            Err(Error::Field {
                path: "airplane.jet[0].thrust".to_string(),
                source: UnitError::Dimension {
                    expected: crate::units::Dimension::FORCE,
                    found: crate::units::Dimension::MASS
                }
            })
        );

        assert!(matches!(
            parse_str("[airplane]\n[[airplane.jet]]\nthrust = \"lots\""),
            Err(Error::Field {
                source: UnitError::Format { .. },
                ..
            })
        ));

        assert_eq!(
            parse_str("[airplane]\n[[airplane.jet]]\nepr = true"),
            Err(Error::BadConversion {
                path: "airplane.jet[0].epr".to_string(),
                expected: "float".to_string()
            })
        );

        assert_eq!(
            parse_str("[airplane]\nversion = 3"),
            Err(Error::BadConversion {
                path: "airplane.version".to_string(),
                expected: "string".to_string()
            })
        );
    }

    #[test]
    fn test_bad_structure() {
        assert!(matches!(
            parse_str("airplane = 3"),
            Err(Error::BadStructure(_))
        ));
        assert!(matches!(
            parse_str("[airplane]\n[airplane.jet]\nthrust = 1"),
            Err(Error::BadStructure(_))
        ));
        assert!(matches!(
            parse_str("[airplane]\n[[airplane.jet]]\ncruise = 3"),
            Err(Error::BadStructure(_))
        ));
        assert!(matches!(parse_str("[airplane"), Err(Error::Deserialize(_))));
    }

    #[test]
    fn test_dump_round_trip() -> Result<()> {
        let desc = parse_str(MODEL)?;
        let dumped = to_toml_string(&desc)?;

        assert!(dumped.contains("thrust = \"5000 lbf\""));
        assert!(dumped.contains("flat-to-temp = \"30 degC\""));
        assert_eq!(parse_str(&dumped)?, desc);

        Ok(())
    }
}
