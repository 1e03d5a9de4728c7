use once_cell::sync::Lazy;
use thiserror::Error;

use crate::math::interp::{bracket, is_strictly_increasing, lerp, InterpError};
use crate::units::{Dimension, UnitError, UnitValue};

/// Ratio of specific heats of air, taken at 20 °C and held constant at every altitude.
pub const KAPPA: f64 = 1.4;

/// Specific gas constant of air in J/(kg K).
pub const RS_AIR: f64 = 297.1;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AtmosphereError {
    #[error("Altitude {altitude_m} m is outside the standard atmosphere table [{min_m} m, {max_m} m)")]
    OutOfRange {
        altitude_m: f64,
        min_m: f64,
        max_m: f64,
    },

    #[error("Atmosphere table error: {0}")]
    Table(InterpError),

    #[error(transparent)]
    Unit(#[from] UnitError),
}

impl From<InterpError> for AtmosphereError {
    fn from(value: InterpError) -> Self {
        match value {
            InterpError::OutOfRange { xp, min, max } => AtmosphereError::OutOfRange {
                altitude_m: xp,
                min_m: min,
                max_m: max,
            },
            e => AtmosphereError::Table(e),
        }
    }
}

pub trait Atmosphere {
    fn temperature_k(&self, alt_m: f64) -> Result<f64, AtmosphereError>;
    fn pressure_pa(&self, alt_m: f64) -> Result<f64, AtmosphereError>;
    fn density_kg_m3(&self, alt_m: f64) -> Result<f64, AtmosphereError>;
}

#[derive(Debug, Clone)]
struct AtmosphereDatum {
    temperature: UnitValue,
    pressure: UnitValue,
    density: UnitValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtmosphereField {
    Temperature,
    Pressure,
    Density,
}

impl AtmosphereField {
    fn of(self, datum: &AtmosphereDatum) -> f64 {
        match self {
            AtmosphereField::Temperature => datum.temperature.si(),
            AtmosphereField::Pressure => datum.pressure.si(),
            AtmosphereField::Density => datum.density.si(),
        }
    }
}

/// Tabulated reference atmosphere, interpolated linearly between datums.
#[derive(Debug, Clone)]
pub struct AtmosphereTable {
    data: Vec<AtmosphereDatum>,
    altitudes_m: Vec<f64>,
}

impl AtmosphereTable {
    /// Builds the table from `(altitude m, temperature K, pressure Pa, density kg/m^3)` rows,
    /// which must be strictly increasing in altitude.
    pub fn from_rows(rows: &[(f64, f64, f64, f64)]) -> Self {
        let data = rows
            .iter()
            .map(|&(_, t, p, rho)| AtmosphereDatum {
                temperature: UnitValue::from_base(t, Dimension::TEMPERATURE),
                pressure: UnitValue::from_base(p, Dimension::PRESSURE),
                density: UnitValue::from_base(rho, Dimension::DENSITY),
            })
            .collect::<Vec<_>>();
        let altitudes_m = rows.iter().map(|r| r.0).collect::<Vec<_>>();

        debug_assert!(is_strictly_increasing(&altitudes_m));

        AtmosphereTable { data, altitudes_m }
    }

    pub fn lookup(&self, alt_m: f64, field: AtmosphereField) -> Result<f64, AtmosphereError> {
        let b = bracket(&self.altitudes_m, alt_m)?;

        Ok(lerp(
            field.of(&self.data[b.index]),
            field.of(&self.data[b.index + 1]),
            b.frac,
        ))
    }

    fn lookup_typed(
        &self,
        altitude: &UnitValue,
        field: AtmosphereField,
        dimension: Dimension,
    ) -> Result<UnitValue, AtmosphereError> {
        altitude.check_dimension(Dimension::LENGTH)?;
        let v = self.lookup(altitude.si(), field)?;
        Ok(UnitValue::from_base(v, dimension))
    }

    pub fn std_temperature(&self, altitude: &UnitValue) -> Result<UnitValue, AtmosphereError> {
        self.lookup_typed(altitude, AtmosphereField::Temperature, Dimension::TEMPERATURE)
    }

    pub fn std_pressure(&self, altitude: &UnitValue) -> Result<UnitValue, AtmosphereError> {
        self.lookup_typed(altitude, AtmosphereField::Pressure, Dimension::PRESSURE)
    }

    pub fn std_density(&self, altitude: &UnitValue) -> Result<UnitValue, AtmosphereError> {
        self.lookup_typed(altitude, AtmosphereField::Density, Dimension::DENSITY)
    }
}

impl Atmosphere for AtmosphereTable {
    fn temperature_k(&self, alt_m: f64) -> Result<f64, AtmosphereError> {
        self.lookup(alt_m, AtmosphereField::Temperature)
    }

    fn pressure_pa(&self, alt_m: f64) -> Result<f64, AtmosphereError> {
        self.lookup(alt_m, AtmosphereField::Pressure)
    }

    fn density_kg_m3(&self, alt_m: f64) -> Result<f64, AtmosphereError> {
        self.lookup(alt_m, AtmosphereField::Density)
    }
}

#[rustfmt::skip]
const STANDARD_ROWS: [(f64, f64, f64, f64); 36] = [
    (  -900.0, 293.91, 111679.0, 1.32353),
    (     0.0, 288.11, 101325.0, 1.22500),
    (   900.0, 282.31,  90971.0, 1.12260),
    (  1800.0, 276.46,  81494.0, 1.02690),
    (  2700.0, 270.62,  72835.0, 0.93765),
    (  3600.0, 264.77,  64939.0, 0.85445),
    (  4500.0, 258.93,  57752.0, 0.77704),
    (  5400.0, 253.09,  51226.0, 0.70513),
    (  6300.0, 247.25,  45311.0, 0.63845),
    (  7200.0, 241.41,  39963.0, 0.57671),
    (  8100.0, 235.58,  35140.0, 0.51967),
    (  9000.0, 229.74,  30800.0, 0.46706),
    (  9900.0, 223.91,  26906.0, 0.41864),
    ( 10800.0, 218.08,  23422.0, 0.37417),
    ( 11700.0, 216.66,  20335.0, 0.32699),
    ( 12600.0, 216.66,  17654.0, 0.28388),
    ( 13500.0, 216.66,  15327.0, 0.24646),
    ( 14400.0, 216.66,  13308.0, 0.21399),
    ( 15300.0, 216.66,  11555.0, 0.18580),
    ( 16200.0, 216.66,  10033.0, 0.16133),
    ( 17100.0, 216.66,   8712.0, 0.14009),
    ( 18000.0, 216.66,   7565.0, 0.12165),
    ( 18900.0, 216.66,   6570.0, 0.10564),
    ( 19812.0, 216.66,   5644.0, 0.09073),
    ( 20726.0, 217.23,   4884.0, 0.07831),
    ( 21641.0, 218.39,   4235.0, 0.06755),
    ( 22555.0, 219.25,   3668.0, 0.05827),
    ( 23470.0, 220.12,   3182.0, 0.05035),
    ( 24384.0, 220.98,   2766.0, 0.04360),
    ( 25298.0, 221.84,   2401.0, 0.03770),
    ( 26213.0, 222.71,   2087.0, 0.03265),
    ( 27127.0, 223.86,   1814.0, 0.02822),
    ( 28042.0, 224.73,   1581.0, 0.02450),
    ( 28956.0, 225.59,   1368.0, 0.02112),
    ( 29870.0, 226.45,   1196.0, 0.01839),
    ( 30785.0, 227.32,   1044.0, 0.01599),
];

/// ISO standard atmosphere as tabulated by YASim.
pub static STANDARD_ATMOSPHERE: Lazy<AtmosphereTable> =
    Lazy::new(|| AtmosphereTable::from_rows(&STANDARD_ROWS));

pub fn std_temperature(altitude: &UnitValue) -> Result<UnitValue, AtmosphereError> {
    STANDARD_ATMOSPHERE.std_temperature(altitude)
}

pub fn std_pressure(altitude: &UnitValue) -> Result<UnitValue, AtmosphereError> {
    STANDARD_ATMOSPHERE.std_pressure(altitude)
}

pub fn std_density(altitude: &UnitValue) -> Result<UnitValue, AtmosphereError> {
    STANDARD_ATMOSPHERE.std_density(altitude)
}

pub fn specific_gas_constant() -> UnitValue {
    UnitValue::from_base(RS_AIR, Dimension::SPECIFIC_GAS_CONSTANT)
}

/// Ideal gas density `p / (Rs T)`.
pub fn calc_density(pressure: &UnitValue, temperature: &UnitValue) -> Result<UnitValue, UnitError> {
    pressure.check_dimension(Dimension::PRESSURE)?;
    temperature.check_dimension(Dimension::TEMPERATURE)?;

    pressure.div(&specific_gas_constant().mul(&temperature.to_base())?)
}

/// `sqrt(kappa Rs T)`
pub fn speed_of_sound(temperature: &UnitValue) -> Result<UnitValue, UnitError> {
    temperature.check_dimension(Dimension::TEMPERATURE)?;

    specific_gas_constant()
        .mul(&temperature.to_base())?
        .scaled(KAPPA)
        .sqrt()
}

pub fn mach_from_speed(speed: &UnitValue, temperature: &UnitValue) -> Result<f64, UnitError> {
    speed.ratio(&speed_of_sound(temperature)?)
}

pub fn speed_from_mach(mach: f64, temperature: &UnitValue) -> Result<UnitValue, UnitError> {
    Ok(speed_of_sound(temperature)?.scaled(mach))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    fn q(s: &str) -> UnitValue {
        s.parse().unwrap()
    }

    #[test]
    fn test_table_is_sorted() {
        let altitudes = STANDARD_ROWS.iter().map(|r| r.0).collect::<Vec<_>>();
        assert!(is_strictly_increasing(&altitudes));
        assert_eq!(altitudes[0], -900.0);
        assert_eq!(altitudes[35], 30785.0);

        let atm = &*STANDARD_ATMOSPHERE;
        assert!(atm.temperature_k(-900.0).is_ok());
        assert!(atm.temperature_k(30784.9).is_ok());
    }

    #[test]
    fn test_sea_level_anchor() {
        let atm = &*STANDARD_ATMOSPHERE;

        assert_eq!(atm.temperature_k(0.0), Ok(288.11));
        assert_eq!(atm.pressure_pa(0.0), Ok(101325.0));
        assert_eq!(atm.density_kg_m3(0.0), Ok(1.225));

        assert_eq!(std_pressure(&q("0 ft")).unwrap().convert_to("Pa").unwrap(), 101325.0);
    }

    #[test]
    fn test_tabulated_altitudes_are_exact() {
        let atm = &*STANDARD_ATMOSPHERE;

        for &(a, t, p, rho) in &STANDARD_ROWS[..STANDARD_ROWS.len() - 1] {
            assert_eq!(atm.temperature_k(a), Ok(t));
            assert_eq!(atm.pressure_pa(a), Ok(p));
            assert_eq!(atm.density_kg_m3(a), Ok(rho));
        }
    }

    #[test]
    fn test_midpoint_is_mean() {
        let atm = &*STANDARD_ATMOSPHERE;

        assert_relative_eq!(atm.temperature_k(450.0).unwrap(), (288.11 + 282.31) / 2.0, epsilon = 1e-9);
        assert_relative_eq!(atm.pressure_pa(450.0).unwrap(), (101325.0 + 90971.0) / 2.0, epsilon = 1e-9);
        assert_relative_eq!(atm.density_kg_m3(19356.0).unwrap(), (0.10564 + 0.09073) / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_interpolation() {
        let atm = &*STANDARD_ATMOSPHERE;

        assert_relative_eq!(atm.temperature_k(304.8).unwrap(), 286.1457, epsilon = 1e-3);
        assert_relative_eq!(atm.pressure_pa(304.8).unwrap(), 97818.45, epsilon = 1e-2);
        assert_relative_eq!(atm.density_kg_m3(304.8).unwrap(), 1.19032, epsilon = 1e-5);

        // Same point through the typed interface
        let t = std_temperature(&q("1000 ft")).unwrap();
        assert_eq!(t.dimension(), Dimension::TEMPERATURE);
        assert_relative_eq!(t.si(), 286.1457, epsilon = 1e-3);
    }

    #[test]
    fn test_monotonic_between_anchors() {
        let atm = &*STANDARD_ATMOSPHERE;

        let mut last_p = f64::INFINITY;
        let mut last_t = f64::INFINITY;
        for i in 0..=100 {
            let a = 900.0 + 9.0 * i as f64;
            let p = atm.pressure_pa(a).unwrap();
            let t = atm.temperature_k(a).unwrap();
            assert!(p < last_p);
            assert!(t < last_t);
            last_p = p;
            last_t = t;
        }
    }

    #[test]
    fn test_out_of_range() {
        let atm = &*STANDARD_ATMOSPHERE;

        assert_eq!(
            atm.temperature_k(-901.0),
            Err(AtmosphereError::OutOfRange {
                altitude_m: -901.0,
                min_m: -900.0,
                max_m: 30785.0
            })
        );
        assert!(atm.density_kg_m3(30785.0).is_err());
        assert!(atm.density_kg_m3(30784.0).is_ok());
        assert!(std_density(&q("120000 ft")).is_err());
    }

    #[test]
    fn test_wrong_dimension() {
        assert!(matches!(
            std_temperature(&q("10 s")),
            Err(AtmosphereError::Unit(UnitError::Dimension { .. }))
        ));
        assert!(speed_of_sound(&q("10 m")).is_err());
    }

    #[test]
    fn test_speed_of_sound() {
        let a = speed_of_sound(&q("288.15 K")).unwrap();
        assert_eq!(a.dimension(), Dimension::SPEED);
        assert_relative_eq!(a.si(), 346.198, epsilon = 1e-3);

        // Affine units are converted before use
        let a_c = speed_of_sound(&q("15 degC")).unwrap();
        assert_relative_eq!(a_c.si(), a.si(), epsilon = 1e-9);
    }

    #[test]
    fn test_calc_density() {
        let rho = calc_density(&q("101325 Pa"), &q("288.15 K")).unwrap();
        assert_eq!(rho.dimension(), Dimension::DENSITY);
        assert_relative_eq!(rho.si(), 101325.0 / (297.1 * 288.15));
    }

    #[test]
    fn test_mach_speed_inverse() {
        for t in ["216.66 K", "288.11 K", "-30 degC"] {
            let t = q(t);
            for m in [0.0, 0.3, 0.78, 1.0, 2.2] {
                let v = speed_from_mach(m, &t).unwrap();
                assert_relative_eq!(mach_from_speed(&v, &t).unwrap(), m, epsilon = 1e-12);
            }
        }

        let t = q("288.15 K");
        let m = mach_from_speed(&q("672.9558 kt"), &t).unwrap();
        assert_relative_eq!(m, 1.0, epsilon = 1e-5);
        assert!(mach_from_speed(&q("100 m"), &t).is_err());
    }
}
