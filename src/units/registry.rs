use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use once_cell::sync::Lazy;

use super::{
    dimension::{Dimension, Exponent},
    UnitError,
};

/// Definition of a named unit relative to the coherent SI unit of its dimension:
/// `si = value * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitDef {
    pub scale: f64,
    pub offset: f64,
    pub dimension: Dimension,
}

impl UnitDef {
    const fn linear(scale: f64, dimension: Dimension) -> Self {
        UnitDef {
            scale,
            offset: 0.0,
            dimension,
        }
    }

    const fn affine(scale: f64, offset: f64, dimension: Dimension) -> Self {
        UnitDef {
            scale,
            offset,
            dimension,
        }
    }
}

const FOOT: f64 = 0.3048;
const POUND: f64 = 0.45359237;
const STANDARD_GRAVITY: f64 = 9.80665;
const NAUTICAL_MILE: f64 = 1852.0;
const HOUR: f64 = 3600.0;

static UNITS: Lazy<BTreeMap<&'static str, UnitDef>> = Lazy::new(|| {
    use Dimension as D;

    BTreeMap::from([
        // Length
        ("m", UnitDef::linear(1.0, D::LENGTH)),
        ("cm", UnitDef::linear(0.01, D::LENGTH)),
        ("mm", UnitDef::linear(0.001, D::LENGTH)),
        ("km", UnitDef::linear(1000.0, D::LENGTH)),
        ("ft", UnitDef::linear(FOOT, D::LENGTH)),
        ("in", UnitDef::linear(0.0254, D::LENGTH)),
        ("nmi", UnitDef::linear(NAUTICAL_MILE, D::LENGTH)),
        ("mi", UnitDef::linear(1609.344, D::LENGTH)),
        // Mass
        ("kg", UnitDef::linear(1.0, D::MASS)),
        ("g", UnitDef::linear(0.001, D::MASS)),
        ("lb", UnitDef::linear(POUND, D::MASS)),
        ("slug", UnitDef::linear(POUND * STANDARD_GRAVITY / FOOT, D::MASS)),
        // Time
        ("s", UnitDef::linear(1.0, D::TIME)),
        ("min", UnitDef::linear(60.0, D::TIME)),
        ("h", UnitDef::linear(HOUR, D::TIME)),
        ("hr", UnitDef::linear(HOUR, D::TIME)),
        // Temperature
        ("K", UnitDef::linear(1.0, D::TEMPERATURE)),
        ("degR", UnitDef::linear(5.0 / 9.0, D::TEMPERATURE)),
        ("degC", UnitDef::affine(1.0, 273.15, D::TEMPERATURE)),
        ("degF", UnitDef::affine(5.0 / 9.0, 459.67 * 5.0 / 9.0, D::TEMPERATURE)),
        // Angle
        ("rad", UnitDef::linear(1.0, D::ANGLE)),
        ("deg", UnitDef::linear(std::f64::consts::PI / 180.0, D::ANGLE)),
        // Force
        ("N", UnitDef::linear(1.0, D::FORCE)),
        ("kN", UnitDef::linear(1000.0, D::FORCE)),
        ("lbf", UnitDef::linear(POUND * STANDARD_GRAVITY, D::FORCE)),
        // Pressure
        ("Pa", UnitDef::linear(1.0, D::PRESSURE)),
        ("hPa", UnitDef::linear(100.0, D::PRESSURE)),
        ("kPa", UnitDef::linear(1000.0, D::PRESSURE)),
        ("bar", UnitDef::linear(1.0e5, D::PRESSURE)),
        ("atm", UnitDef::linear(101325.0, D::PRESSURE)),
        ("psi", UnitDef::linear(POUND * STANDARD_GRAVITY / (0.0254 * 0.0254), D::PRESSURE)),
        ("inHg", UnitDef::linear(3386.389, D::PRESSURE)),
        // Energy and power
        ("J", UnitDef::linear(1.0, D::ENERGY)),
        ("W", UnitDef::linear(1.0, D::POWER)),
        // Speed
        ("kt", UnitDef::linear(NAUTICAL_MILE / HOUR, D::SPEED)),
        ("kn", UnitDef::linear(NAUTICAL_MILE / HOUR, D::SPEED)),
        ("knot", UnitDef::linear(NAUTICAL_MILE / HOUR, D::SPEED)),
        ("mph", UnitDef::linear(1609.344 / HOUR, D::SPEED)),
    ])
});

pub fn lookup(symbol: &str) -> Option<&'static UnitDef> {
    UNITS.get(symbol)
}

/// A concrete unit: a registry symbol or an expression over registry symbols.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    symbol: String,
    scale: f64,
    offset: f64,
    dimension: Dimension,
}

impl Unit {
    pub fn parse(expr: &str) -> Result<Self, UnitError> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Ok(Unit::dimensionless());
        }

        // Affine units are only meaningful on their own.
        if let Some(def) = lookup(expr) {
            return Ok(Unit {
                symbol: expr.to_string(),
                scale: def.scale,
                offset: def.offset,
                dimension: def.dimension,
            });
        }

        let mut parser = ExprParser::new(expr);
        let (scale, dimension) = parser.parse_expr()?;
        parser.expect_end()?;

        Ok(Unit {
            symbol: expr.to_string(),
            scale,
            offset: 0.0,
            dimension,
        })
    }

    pub fn dimensionless() -> Self {
        Unit {
            symbol: String::new(),
            scale: 1.0,
            offset: 0.0,
            dimension: Dimension::DIMENSIONLESS,
        }
    }

    /// Coherent SI unit of the given dimension.
    pub fn base(dimension: Dimension) -> Self {
        Unit {
            symbol: if dimension.is_dimensionless() {
                String::new()
            } else {
                dimension.si_symbol()
            },
            scale: 1.0,
            offset: 0.0,
            dimension,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn dimension(&self) -> Dimension {
        self.dimension
    }

    pub fn is_affine(&self) -> bool {
        self.offset != 0.0
    }

    pub fn to_base(&self, magnitude: f64) -> f64 {
        magnitude * self.scale + self.offset
    }

    pub fn from_base(&self, base: f64) -> f64 {
        (base - self.offset) / self.scale
    }
}

impl FromStr for Unit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Unit::parse(s)
    }
}

impl Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// Recursive descent parser for unit expressions:
///
/// ```text
/// expr     := factor (('*' | '·' | '/') factor)*
/// factor   := primary (('^' | '**') exponent)?
/// primary  := symbol | '1' | '(' expr ')'
/// exponent := '-'? digits | '(' '-'? digits ('/' digits)? ')'
/// ```
struct ExprParser<'a> {
    text: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> ExprParser<'a> {
    fn new(text: &'a str) -> Self {
        ExprParser {
            text,
            chars: text.char_indices().peekable(),
        }
    }

    fn error(&self, reason: &str) -> UnitError {
        UnitError::Format {
            text: self.text.to_string(),
            reason: reason.to_string(),
        }
    }

    fn overflow(&self) -> UnitError {
        self.error("dimension exponent out of range")
    }

    fn skip_ws(&mut self) {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.chars.peek().map(|(_, c)| *c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn expect_end(&mut self) -> Result<(), UnitError> {
        match self.peek() {
            None => Ok(()),
            Some(c) => Err(self.error(&format!("unexpected '{c}'"))),
        }
    }

    fn parse_expr(&mut self) -> Result<(f64, Dimension), UnitError> {
        let (mut scale, mut dim) = self.parse_factor()?;

        loop {
            if self.peek() == Some('*') {
                self.chars.next();
                // `**` binds to the preceding factor and was already consumed there
                let (s, d) = self.parse_factor()?;
                scale *= s;
                dim = dim.mul(&d).ok_or_else(|| self.overflow())?;
            } else if self.eat('·') {
                let (s, d) = self.parse_factor()?;
                scale *= s;
                dim = dim.mul(&d).ok_or_else(|| self.overflow())?;
            } else if self.eat('/') {
                let (s, d) = self.parse_factor()?;
                scale /= s;
                dim = dim.div(&d).ok_or_else(|| self.overflow())?;
            } else {
                return Ok((scale, dim));
            }
        }
    }

    fn parse_factor(&mut self) -> Result<(f64, Dimension), UnitError> {
        let (scale, dim) = self.parse_primary()?;

        let has_power = if self.eat('^') {
            true
        } else if self.starts_with("**") {
            self.chars.next();
            self.chars.next();
            true
        } else {
            false
        };

        if has_power {
            let exp = self.parse_exponent()?;
            let dim = dim.powr(exp).ok_or_else(|| self.overflow())?;
            Ok((scale.powf(exp.as_f64()), dim))
        } else {
            Ok((scale, dim))
        }
    }

    fn starts_with(&mut self, pat: &str) -> bool {
        self.skip_ws();
        match self.chars.peek() {
            Some((i, _)) => self.text[*i..].starts_with(pat),
            None => false,
        }
    }

    fn parse_primary(&mut self) -> Result<(f64, Dimension), UnitError> {
        match self.peek() {
            Some('(') => {
                self.chars.next();
                let inner = self.parse_expr()?;
                if !self.eat(')') {
                    return Err(self.error("unbalanced parentheses"));
                }
                Ok(inner)
            }
            Some('1') => {
                self.chars.next();
                Ok((1.0, Dimension::DIMENSIONLESS))
            }
            Some(c) if c.is_alphabetic() || c == '_' => {
                let symbol = self.take_while(|c| c.is_alphanumeric() || c == '_');
                let def = lookup(&symbol).ok_or(UnitError::UnknownUnit(symbol.clone()))?;
                if def.offset != 0.0 {
                    return Err(UnitError::OffsetUnit(symbol));
                }
                Ok((def.scale, def.dimension))
            }
            Some(c) => Err(self.error(&format!("unexpected '{c}'"))),
            None => Err(self.error("unexpected end of unit expression")),
        }
    }

    fn parse_exponent(&mut self) -> Result<Exponent, UnitError> {
        let parenthesised = self.eat('(');

        let num = self.parse_int()?;
        let den = if parenthesised && self.eat('/') {
            self.parse_int()?
        } else {
            1
        };

        if parenthesised && !self.eat(')') {
            return Err(self.error("unbalanced parentheses in exponent"));
        }

        Exponent::new(num, den).ok_or_else(|| self.error("zero exponent denominator"))
    }

    fn parse_int(&mut self) -> Result<i32, UnitError> {
        self.skip_ws();
        let negative = self.chars.next_if(|(_, c)| *c == '-').is_some();
        let digits = self.take_while(|c| c.is_ascii_digit());
        let value: i32 = digits
            .parse()
            .map_err(|_| self.error("bad exponent"))?;
        Ok(if negative { -value } else { value })
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some((_, c)) = self.chars.next_if(|(_, c)| pred(*c)) {
            out.push(c);
        }
        out
    }
}
