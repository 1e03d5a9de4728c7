use std::{fmt::Display, str::FromStr};

use super::{
    dimension::{Dimension, Exponent},
    registry::Unit,
    UnitError,
};

/// A magnitude expressed in a concrete unit.
///
/// The unit the value was written in is kept so that it renders back in the same form;
/// comparisons and arithmetic go through the coherent SI value.
#[derive(Debug, Clone)]
pub struct UnitValue {
    magnitude: f64,
    unit: Unit,
}

impl UnitValue {
    pub fn new(magnitude: f64, unit: Unit) -> Self {
        UnitValue { magnitude, unit }
    }

    pub fn with_unit(magnitude: f64, unit: &str) -> Result<Self, UnitError> {
        Ok(UnitValue::new(magnitude, Unit::parse(unit)?))
    }

    /// Value in the coherent SI unit of `dimension`.
    pub fn from_base(si: f64, dimension: Dimension) -> Self {
        UnitValue::new(si, Unit::base(dimension))
    }

    pub fn dimensionless(value: f64) -> Self {
        UnitValue::new(value, Unit::dimensionless())
    }

    /// Parses `<number><optional unit>`. A missing unit means `default_unit`.
    pub fn parse(text: &str, default_unit: &Unit) -> Result<Self, UnitError> {
        let (magnitude, unit_text) = split_quantity(text).ok_or_else(|| UnitError::Format {
            text: text.to_string(),
            reason: "expected a number optionally followed by a unit".to_string(),
        })?;

        let unit = if unit_text.is_empty() {
            default_unit.clone()
        } else {
            Unit::parse(unit_text)?
        };

        Ok(UnitValue { magnitude, unit })
    }

    /// Like [`UnitValue::parse`], additionally requiring the result to be of `expected` dimension.
    pub fn parse_as(
        text: &str,
        default_unit: &Unit,
        expected: Dimension,
    ) -> Result<Self, UnitError> {
        let value = Self::parse(text, default_unit)?;
        value.check_dimension(expected)?;
        Ok(value)
    }

    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn dimension(&self) -> Dimension {
        self.unit.dimension()
    }

    pub fn check_dimension(&self, expected: Dimension) -> Result<(), UnitError> {
        if self.dimension() == expected {
            Ok(())
        } else {
            Err(UnitError::Dimension {
                expected,
                found: self.dimension(),
            })
        }
    }

    /// Magnitude in the coherent SI unit (kelvin for temperatures).
    pub fn si(&self) -> f64 {
        self.unit.to_base(self.magnitude)
    }

    pub fn to_base(&self) -> UnitValue {
        UnitValue::from_base(self.si(), self.dimension())
    }

    pub fn to_unit(&self, unit: &Unit) -> Result<UnitValue, UnitError> {
        Ok(UnitValue {
            magnitude: self.convert(unit)?,
            unit: unit.clone(),
        })
    }

    /// Magnitude expressed in `unit`.
    pub fn convert(&self, unit: &Unit) -> Result<f64, UnitError> {
        if self.dimension() != unit.dimension() {
            return Err(UnitError::Dimension {
                expected: unit.dimension(),
                found: self.dimension(),
            });
        }
        Ok(unit.from_base(self.si()))
    }

    pub fn convert_to(&self, unit: &str) -> Result<f64, UnitError> {
        self.convert(&Unit::parse(unit)?)
    }

    pub fn add(&self, other: &UnitValue) -> Result<UnitValue, UnitError> {
        self.combine_linear(other, |a, b| a + b)
    }

    pub fn sub(&self, other: &UnitValue) -> Result<UnitValue, UnitError> {
        self.combine_linear(other, |a, b| a - b)
    }

    fn combine_linear(
        &self,
        other: &UnitValue,
        op: impl Fn(f64, f64) -> f64,
    ) -> Result<UnitValue, UnitError> {
        self.reject_offset()?;
        other.reject_offset()?;
        let rhs = other.convert(&self.unit).map_err(|_| UnitError::Dimension {
            expected: self.dimension(),
            found: other.dimension(),
        })?;

        Ok(UnitValue {
            magnitude: op(self.magnitude, rhs),
            unit: self.unit.clone(),
        })
    }

    pub fn mul(&self, other: &UnitValue) -> Result<UnitValue, UnitError> {
        self.reject_offset()?;
        other.reject_offset()?;
        let dimension = self.dimension().mul(&other.dimension()).ok_or_else(|| {
            UnitError::ExponentOverflow(format!("{} * {}", self.dimension(), other.dimension()))
        })?;
        Ok(UnitValue::from_base(self.si() * other.si(), dimension))
    }

    pub fn div(&self, other: &UnitValue) -> Result<UnitValue, UnitError> {
        self.reject_offset()?;
        other.reject_offset()?;
        let dimension = self.dimension().div(&other.dimension()).ok_or_else(|| {
            UnitError::ExponentOverflow(format!("{} / {}", self.dimension(), other.dimension()))
        })?;
        Ok(UnitValue::from_base(self.si() / other.si(), dimension))
    }

    pub fn powr(&self, exp: Exponent) -> Result<UnitValue, UnitError> {
        self.reject_offset()?;
        let dimension = self.dimension().powr(exp).ok_or_else(|| {
            UnitError::ExponentOverflow(format!("({})^{exp}", self.dimension()))
        })?;
        Ok(UnitValue::from_base(self.si().powf(exp.as_f64()), dimension))
    }

    pub fn sqrt(&self) -> Result<UnitValue, UnitError> {
        self.powr(Exponent::HALF)
    }

    /// Multiplies the magnitude, keeping the unit.
    pub fn scaled(&self, factor: f64) -> UnitValue {
        UnitValue {
            magnitude: self.magnitude * factor,
            unit: self.unit.clone(),
        }
    }

    /// Quotient of two values of the same dimension, as a plain number.
    pub fn ratio(&self, other: &UnitValue) -> Result<f64, UnitError> {
        other.check_dimension(self.dimension())?;
        Ok(self.si() / other.si())
    }

    fn reject_offset(&self) -> Result<(), UnitError> {
        if self.unit.is_affine() {
            Err(UnitError::OffsetUnit(self.unit.symbol().to_string()))
        } else {
            Ok(())
        }
    }
}

fn split_quantity(text: &str) -> Option<(f64, &str)> {
    let s = text.trim();
    let bytes = s.as_bytes();
    let mut i = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;

    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        digits += i - frac_start;
    }

    if digits == 0 {
        return None;
    }

    let magnitude = s[..i].parse::<f64>().ok()?;
    Some((magnitude, s[i..].trim()))
}

impl PartialEq for UnitValue {
    fn eq(&self, other: &Self) -> bool {
        self.dimension() == other.dimension() && self.si() == other.si()
    }
}

impl FromStr for UnitValue {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UnitValue::parse(s, &Unit::dimensionless())
    }
}

impl Display for UnitValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.unit.symbol().is_empty() {
            write!(f, "{}", self.magnitude)
        } else {
            write!(f, "{} {}", self.magnitude, self.unit)
        }
    }
}
