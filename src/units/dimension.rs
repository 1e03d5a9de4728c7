use std::fmt::Display;

/// Rational exponent of a base dimension, always stored reduced with a positive denominator.
///
/// Arithmetic is checked: a result that does not fit in `i32` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Exponent {
    num: i32,
    den: i32,
}

impl Exponent {
    pub const ZERO: Exponent = Exponent::integer(0);
    pub const ONE: Exponent = Exponent::integer(1);
    pub const HALF: Exponent = Exponent { num: 1, den: 2 };

    pub const fn integer(n: i32) -> Self {
        Exponent { num: n, den: 1 }
    }

    /// Returns `None` for a zero denominator.
    pub fn new(num: i32, den: i32) -> Option<Self> {
        Exponent::reduced(num.into(), den.into())
    }

    fn reduced(num: i64, den: i64) -> Option<Self> {
        if den == 0 {
            return None;
        }

        let g = gcd(num.checked_abs()?, den.checked_abs()?).max(1);
        let sign = if den < 0 { -1 } else { 1 };
        Some(Exponent {
            num: i32::try_from(num.checked_mul(sign)? / g).ok()?,
            den: i32::try_from(den.checked_mul(sign)? / g).ok()?,
        })
    }

    pub fn numerator(&self) -> i32 {
        self.num
    }

    pub fn denominator(&self) -> i32 {
        self.den
    }

    pub fn is_zero(&self) -> bool {
        self.num == 0
    }

    pub fn is_integer(&self) -> bool {
        self.den == 1
    }

    pub fn as_f64(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    pub fn abs(&self) -> Option<Self> {
        Some(Exponent {
            num: self.num.checked_abs()?,
            den: self.den,
        })
    }

    pub fn checked_neg(self) -> Option<Self> {
        Some(Exponent {
            num: self.num.checked_neg()?,
            den: self.den,
        })
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        let (a, b) = (i64::from(self.num), i64::from(self.den));
        let (c, d) = (i64::from(rhs.num), i64::from(rhs.den));
        Exponent::reduced(a.checked_mul(d)?.checked_add(c.checked_mul(b)?)?, b.checked_mul(d)?)
    }

    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.checked_add(rhs.checked_neg()?)
    }

    pub fn checked_mul(self, rhs: Self) -> Option<Self> {
        Exponent::reduced(
            i64::from(self.num).checked_mul(rhs.num.into())?,
            i64::from(self.den).checked_mul(rhs.den.into())?,
        )
    }
}

impl Default for Exponent {
    fn default() -> Self {
        Exponent::ZERO
    }
}

fn gcd(a: i64, b: i64) -> i64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

impl Display for Exponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_integer() {
            write!(f, "{}", self.num)
        } else {
            write!(f, "({}/{})", self.num, self.den)
        }
    }
}

pub const BASE_DIMENSIONS: usize = 5;

/// Name of each base dimension and the symbol of its coherent SI unit.
const BASES: [(&str, &str); BASE_DIMENSIONS] = [
    ("length", "m"),
    ("mass", "kg"),
    ("time", "s"),
    ("temperature", "K"),
    ("angle", "rad"),
];

/// Physical dimension as a vector of rational exponents over
/// length, mass, time, temperature and angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dimension {
    exps: [Exponent; BASE_DIMENSIONS],
}

impl Dimension {
    pub const DIMENSIONLESS: Dimension = Dimension::from_ints(0, 0, 0, 0, 0);
    pub const LENGTH: Dimension = Dimension::from_ints(1, 0, 0, 0, 0);
    pub const MASS: Dimension = Dimension::from_ints(0, 1, 0, 0, 0);
    pub const TIME: Dimension = Dimension::from_ints(0, 0, 1, 0, 0);
    pub const TEMPERATURE: Dimension = Dimension::from_ints(0, 0, 0, 1, 0);
    pub const ANGLE: Dimension = Dimension::from_ints(0, 0, 0, 0, 1);

    pub const SPEED: Dimension = Dimension::from_ints(1, 0, -1, 0, 0);
    pub const FORCE: Dimension = Dimension::from_ints(1, 1, -2, 0, 0);
    pub const PRESSURE: Dimension = Dimension::from_ints(-1, 1, -2, 0, 0);
    pub const DENSITY: Dimension = Dimension::from_ints(-3, 1, 0, 0, 0);
    pub const ENERGY: Dimension = Dimension::from_ints(2, 1, -2, 0, 0);
    pub const POWER: Dimension = Dimension::from_ints(2, 1, -3, 0, 0);
    /// Mass flow per unit thrust, e.g. `lb/h/lbf`.
    pub const SPECIFIC_FUEL_CONSUMPTION: Dimension = Dimension::from_ints(-1, 0, 1, 0, 0);
    pub const SPECIFIC_GAS_CONSTANT: Dimension = Dimension::from_ints(2, 0, -2, -1, 0);

    pub const fn from_ints(
        length: i32,
        mass: i32,
        time: i32,
        temperature: i32,
        angle: i32,
    ) -> Self {
        Dimension {
            exps: [
                Exponent::integer(length),
                Exponent::integer(mass),
                Exponent::integer(time),
                Exponent::integer(temperature),
                Exponent::integer(angle),
            ],
        }
    }

    pub fn exponents(&self) -> &[Exponent; BASE_DIMENSIONS] {
        &self.exps
    }

    pub fn is_dimensionless(&self) -> bool {
        self.exps.iter().all(Exponent::is_zero)
    }

    /// Product dimension, `None` when an exponent overflows.
    pub fn mul(&self, other: &Dimension) -> Option<Dimension> {
        let mut exps = self.exps;
        for (e, o) in exps.iter_mut().zip(other.exps.iter()) {
            *e = e.checked_add(*o)?;
        }
        Some(Dimension { exps })
    }

    pub fn div(&self, other: &Dimension) -> Option<Dimension> {
        let mut exps = self.exps;
        for (e, o) in exps.iter_mut().zip(other.exps.iter()) {
            *e = e.checked_sub(*o)?;
        }
        Some(Dimension { exps })
    }

    pub fn powr(&self, exp: Exponent) -> Option<Dimension> {
        let mut exps = self.exps;
        for e in exps.iter_mut() {
            *e = e.checked_mul(exp)?;
        }
        Some(Dimension { exps })
    }

    /// Coherent SI unit expression for this dimension, e.g. `kg*m/s^2`.
    ///
    /// The result is itself a valid unit expression, so it can be fed back to the parser.
    pub fn si_symbol(&self) -> String {
        self.format_with(|i| BASES[i].1.to_string(), "*")
    }

    fn format_with(&self, name: impl Fn(usize) -> String, sep: &str) -> String {
        let term = |i: usize, e: Exponent| {
            if e == Exponent::ONE {
                name(i)
            } else {
                format!("{}^{}", name(i), e)
            }
        };

        let numerator = self
            .exps
            .iter()
            .enumerate()
            .filter(|(_, e)| e.numerator() > 0)
            .map(|(i, e)| term(i, *e))
            .collect::<Vec<_>>();
        let denominator = self
            .exps
            .iter()
            .enumerate()
            .filter(|(_, e)| e.numerator() < 0)
            .map(|(i, e)| match e.abs() {
                Some(abs) => term(i, abs),
                None => format!("{}^({}/{})", name(i), -i64::from(e.numerator()), e.denominator()),
            })
            .collect::<Vec<_>>();

        let mut out = if numerator.is_empty() {
            "1".to_string()
        } else {
            numerator.join(sep)
        };
        for d in denominator {
            out.push('/');
            out.push_str(&d);
        }
        out
    }
}

impl Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_dimensionless() {
            write!(f, "dimensionless")
        } else {
            write!(f, "{}", self.format_with(|i| format!("[{}]", BASES[i].0), "*"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponent_reduces() {
        let e = Exponent::new(2, 4).unwrap();
        assert_eq!(e, Exponent::HALF);

        let e = Exponent::new(3, -6).unwrap();
        assert_eq!(e.numerator(), -1);
        assert_eq!(e.denominator(), 2);

        assert_eq!(Exponent::new(1, 0), None);
        assert_eq!(Exponent::new(0, 5), Some(Exponent::ZERO));
    }

    #[test]
    fn test_exponent_arithmetic() {
        assert_eq!(Exponent::HALF.checked_add(Exponent::HALF), Some(Exponent::ONE));
        assert_eq!(Exponent::ONE.checked_sub(Exponent::HALF), Some(Exponent::HALF));
        assert_eq!(Exponent::integer(2).checked_mul(Exponent::HALF), Some(Exponent::ONE));
        assert_eq!(Exponent::HALF.checked_neg(), Exponent::new(-1, 2));
    }

    #[test]
    fn test_exponent_overflow() {
        let tiny = Exponent::new(1, 65536).unwrap();
        // The common denominator 2^32 overflows i32 but the sum reduces to 1/32768
        assert_eq!(tiny.checked_add(tiny), Exponent::new(1, 32768));

        let tinier = Exponent::new(1, 65537).unwrap();
        assert_eq!(tiny.checked_add(tinier), None);
        assert_eq!(tiny.checked_mul(tinier), None);
        assert_eq!(Exponent::integer(i32::MAX).checked_add(Exponent::ONE), None);
        assert_eq!(Exponent::integer(i32::MIN).checked_neg(), None);

        let root = Dimension::LENGTH.powr(tinier).unwrap();
        assert_eq!(root.mul(&Dimension::LENGTH.powr(tiny).unwrap()), None);
        assert_eq!(Dimension::LENGTH.powr(Exponent::integer(i32::MAX)).unwrap().mul(&Dimension::LENGTH), None);
    }

    #[test]
    fn test_derived_dimensions() {
        let square = |d: Dimension| d.powr(Exponent::integer(2)).unwrap();

        assert_eq!(
            Dimension::MASS
                .mul(&Dimension::LENGTH)
                .and_then(|d| d.div(&square(Dimension::TIME))),
            Some(Dimension::FORCE)
        );
        assert_eq!(Dimension::FORCE.div(&square(Dimension::LENGTH)), Some(Dimension::PRESSURE));
        assert_eq!(square(Dimension::SPEED).powr(Exponent::HALF), Some(Dimension::SPEED));
        assert!(Dimension::SPEED.div(&Dimension::SPEED).unwrap().is_dimensionless());
    }

    #[test]
    fn test_si_symbol() {
        assert_eq!(Dimension::LENGTH.si_symbol(), "m");
        assert_eq!(Dimension::SPEED.si_symbol(), "m/s");
        assert_eq!(Dimension::FORCE.si_symbol(), "m*kg/s^2");
        assert_eq!(Dimension::DENSITY.si_symbol(), "kg/m^3");
        assert_eq!(Dimension::TIME.powr(Exponent::integer(-1)).unwrap().si_symbol(), "1/s");
        assert_eq!(Dimension::LENGTH.powr(Exponent::HALF).unwrap().si_symbol(), "m^(1/2)");
    }

    #[test]
    fn test_display() {
        assert_eq!(Dimension::LENGTH.to_string(), "[length]");
        assert_eq!(Dimension::SPEED.to_string(), "[length]/[time]");
        assert_eq!(Dimension::DIMENSIONLESS.to_string(), "dimensionless");
    }
}
