use log::{debug, warn};

use super::{EngineError, ThrustTable};
use crate::{
    fdm::atmosphere::{
        calc_density, speed_from_mach, mach_from_speed, std_density, std_pressure,
        std_temperature, KAPPA,
    },
    units::{Dimension, Unit, UnitError, UnitValue},
};

/// Mach number at the compressor face in nominal operation.
pub const M2_NOMINAL: f64 = 0.5;

/// Compressor face Mach number at idle; the danger area is about 2.5 times smaller.
pub const M2_IDLE: f64 = 0.2;

/// Idle thrust as a fraction of the dry thrust ratio.
pub const IDLE_THRUST_FACTOR: f64 = 0.1;

/// Idle exhaust speed as a fraction of the dry one. 1/10 would leave the exhaust
/// far too slow, so roughly its square root is used.
pub const IDLE_EXHAUST_FRACTION: f64 = 1.0 / 3.0;

/// Exhaust speed used when neither an exhaust speed nor a cruise point is given.
// TODO: make it depend on the bypass ratio
pub const DEFAULT_EXHAUST_SPEED_KT: f64 = 1555.0;

/// Values of the optional jet attributes.
pub mod defaults {
    pub const ROTATE: &str = "0 deg";
    pub const N1_IDLE: f64 = 55.0;
    pub const N1_MAX: f64 = 102.0;
    pub const N2_IDLE: f64 = 73.0;
    pub const N2_MAX: f64 = 103.0;
    pub const TSFC: &str = "0.8 lb/h/lbf";
    pub const EGT: &str = "1050 K";
    pub const EPR: f64 = 3.0;
    pub const SPOOL_TIME: &str = "8 s";
    pub const BYPASS_RATIO: f64 = 0.0;

    pub const CRUISE_ALTITUDE: &str = "35000 ft";
    pub const CRUISE_THROTTLE: f64 = 1.0;
}

const K_1_2: f64 = (KAPPA - 1.0) / 2.0;
const K_K_1: f64 = KAPPA / (KAPPA - 1.0);

/// Intake pressure recovery factor `p2/p0` for isentropic deceleration of the
/// free stream at Mach `m0` down to Mach `m2` at the compressor face:
///
/// `p2/p0 = [(κ-1)/2 (M0² - M2²) + 1]^(κ/(κ-1))`
///
/// The pressure gained in the intake adds to the compressor pressure, so thrust
/// scales with this factor. See <http://aviation.stackexchange.com/a/19466/524>.
pub fn pressure_recovery(m0: f64, m2: f64) -> f64 {
    (K_1_2 * (m0 * m0 - m2 * m2) + 1.0).powf(K_K_1)
}

/// Pressure recovery normalised to 1 at zero airspeed.
pub fn pressure_recovery_ratio(m0: f64, m2: f64) -> f64 {
    pressure_recovery(m0, m2) / pressure_recovery(0.0, m2)
}

fn sea_level() -> UnitValue {
    UnitValue::from_base(0.0, Dimension::LENGTH)
}

fn knots() -> Result<Unit, UnitError> {
    Unit::parse("kt")
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionPoint {
    pub x: UnitValue,
    pub y: UnitValue,
    pub z: UnitValue,
}

/// One observed operating point of the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct CruisePoint {
    pub thrust: UnitValue,
    pub altitude: UnitValue,
    pub mach: Option<f64>,
    pub speed: Option<UnitValue>,
    pub throttle: f64,
}

impl CruisePoint {
    pub fn new(thrust: UnitValue, altitude: UnitValue) -> Self {
        CruisePoint {
            thrust,
            altitude,
            mach: None,
            speed: None,
            throttle: defaults::CRUISE_THROTTLE,
        }
    }

    /// Mach number, derived from the speed on first use.
    pub fn mach(&mut self) -> Result<f64, EngineError> {
        if let Some(mach) = self.mach {
            return Ok(mach);
        }

        let speed = self.speed.as_ref().ok_or(EngineError::MissingCruiseSpeed)?;
        let mach = mach_from_speed(speed, &std_temperature(&self.altitude)?)?;
        self.mach = Some(mach);

        Ok(mach)
    }

    /// True airspeed, derived from the mach number on first use.
    pub fn true_airspeed(&mut self) -> Result<UnitValue, EngineError> {
        if let Some(speed) = &self.speed {
            return Ok(speed.clone());
        }

        let mach = self.mach.ok_or(EngineError::MissingCruiseSpeed)?;
        let speed = speed_from_mach(mach, &std_temperature(&self.altitude)?)?.to_unit(&knots()?)?;
        self.speed = Some(speed.clone());

        Ok(speed)
    }

    pub fn resolve(&mut self) -> Result<(), EngineError> {
        self.mach()?;
        self.true_airspeed()?;
        Ok(())
    }
}

/// Identity of a jet for deduplication; everything but the name and placement.
#[derive(Debug, Clone, PartialEq)]
pub struct JetKey {
    pub mass: Option<UnitValue>,
    pub thrust: Option<UnitValue>,
    pub n1_idle: f64,
    pub n1_max: f64,
    pub n2_idle: f64,
    pub n2_max: f64,
    pub tsfc: UnitValue,
    pub egt: UnitValue,
    pub epr: f64,
    pub v_ex: Option<UnitValue>,
    pub t_spool: UnitValue,
    pub bypassratio: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JetEngine {
    pub name: Option<String>,
    pub mass: Option<UnitValue>,
    /// Static sea level thrust
    pub thrust: Option<UnitValue>,
    pub rotate: UnitValue,
    pub n1_idle: f64,
    pub n1_max: f64,
    pub n2_idle: f64,
    pub n2_max: f64,
    pub tsfc: UnitValue,
    pub egt: UnitValue,
    pub epr: f64,
    /// Effective exhaust velocity. Derived on first use when not given.
    pub v_ex: Option<UnitValue>,
    pub t_spool: UnitValue,
    pub bypassratio: f64,
    pub flat_temp: Option<UnitValue>,
    pub flat_alt: Option<UnitValue>,
    pub actionpt: Option<ActionPoint>,
    pub cruise: Option<CruisePoint>,
}

impl JetEngine {
    /// Jet with the given static thrust and every other attribute at its default.
    pub fn new(thrust: Option<UnitValue>) -> Result<Self, UnitError> {
        let none = Unit::dimensionless();

        Ok(JetEngine {
            name: None,
            mass: None,
            thrust,
            rotate: UnitValue::parse(defaults::ROTATE, &none)?,
            n1_idle: defaults::N1_IDLE,
            n1_max: defaults::N1_MAX,
            n2_idle: defaults::N2_IDLE,
            n2_max: defaults::N2_MAX,
            tsfc: UnitValue::parse(defaults::TSFC, &none)?,
            egt: UnitValue::parse(defaults::EGT, &none)?,
            epr: defaults::EPR,
            v_ex: None,
            t_spool: UnitValue::parse(defaults::SPOOL_TIME, &none)?,
            bypassratio: defaults::BYPASS_RATIO,
            flat_temp: None,
            flat_alt: None,
            actionpt: None,
            cruise: None,
        })
    }

    pub fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| "<unnamed jet>".to_string())
    }

    pub fn key(&self) -> JetKey {
        JetKey {
            mass: self.mass.clone(),
            thrust: self.thrust.clone(),
            n1_idle: self.n1_idle,
            n1_max: self.n1_max,
            n2_idle: self.n2_idle,
            n2_max: self.n2_max,
            tsfc: self.tsfc.clone(),
            egt: self.egt.clone(),
            epr: self.epr,
            v_ex: self.v_ex.clone(),
            t_spool: self.t_spool.clone(),
            bypassratio: self.bypassratio,
        }
    }

    /// Air density at which the nominal thrust applies.
    ///
    /// A flat rated engine keeps its thrust up to `flat_temp` (at sea level pressure)
    /// or up to `flat_alt`; `flat_temp` wins when both are set.
    pub fn reference_density(&self) -> Result<UnitValue, EngineError> {
        let rho = match (&self.flat_temp, &self.flat_alt) {
            (Some(temp), _) => calc_density(&std_pressure(&sea_level())?, temp)?,
            (None, Some(alt)) => std_density(alt)?,
            (None, None) => std_density(&sea_level())?,
        };
        Ok(rho)
    }

    /// Ratio of thrust at the given flight condition to static thrust.
    ///
    /// * `m0` - free stream mach number
    /// * `m2` - mach number at the compressor face
    /// * `v_ex` - effective exhaust velocity
    pub fn thrust_ratio(
        &self,
        m0: f64,
        altitude: &UnitValue,
        m2: f64,
        v_ex: &UnitValue,
    ) -> Result<f64, EngineError> {
        thrust_ratio(&self.reference_density()?, m0, altitude, m2, v_ex)
    }

    /// Exhaust speed, derived and stored on first use.
    pub fn resolve_exhaust_speed(&mut self) -> Result<UnitValue, EngineError> {
        let label = self.label();
        self.resolve_exhaust_speed_labelled(&label)
    }

    fn resolve_exhaust_speed_labelled(&mut self, label: &str) -> Result<UnitValue, EngineError> {
        if let Some(v_ex) = &self.v_ex {
            return check_exhaust_speed(v_ex).map_err(|e| e.in_engine(label));
        }

        let v_ex = self.derive_exhaust_speed().map_err(|e| e.in_engine(label))?;
        debug!("{label}: v_ex = {}", v_ex.to_base());
        self.v_ex = Some(v_ex.clone());

        Ok(v_ex)
    }

    fn derive_exhaust_speed(&mut self) -> Result<UnitValue, EngineError> {
        let rho_ref = self.reference_density()?;
        let static_thrust = self.thrust.clone();

        let Some(cruise) = self.cruise.as_mut() else {
            debug!("No cruise point, using default exhaust speed");
            return Ok(UnitValue::new(DEFAULT_EXHAUST_SPEED_KT, knots()?));
        };
        let static_thrust = static_thrust.ok_or(EngineError::MissingThrust)?;

        let m0 = cruise.mach()?;
        let v0 = cruise.true_airspeed()?;
        let prr = pressure_recovery_ratio(m0, M2_NOMINAL);
        let rho = std_density(&cruise.altitude)?;
        let r = cruise
            .thrust
            .scaled(1.0 / cruise.throttle)
            .ratio(&static_thrust)?;

        debug!(
            "prr={prr}, rho={rho}, rho_ref={rho_ref}, M0={m0}, v0={}, r={r}",
            v0.to_base()
        );

        // r = prr (rho/rho_ref) (v_ex - v0)/v_ex, solved for v_ex
        let numerator = prr * rho.si();
        let denominator = numerator - r * rho_ref.si();
        let v_ex_m_s = v0.si() * numerator / denominator;

        if denominator.abs() <= f64::EPSILON * numerator || !v_ex_m_s.is_finite() || v_ex_m_s <= 0.0
        {
            return Err(EngineError::Divergence {
                value_m_s: v_ex_m_s,
            });
        }

        Ok(UnitValue::from_base(v_ex_m_s, Dimension::SPEED).to_unit(&knots()?)?)
    }

    /// Resolves the cruise point and exhaust speed and returns the thrust tables.
    pub fn thrust_model(&mut self) -> Result<ThrustModel, EngineError> {
        let label = self.label();
        self.thrust_model_labelled(&label)
    }

    /// Like [`JetEngine::thrust_model`], reporting errors and log messages under `label`.
    pub fn thrust_model_labelled(&mut self, label: &str) -> Result<ThrustModel, EngineError> {
        if self.flat_temp.is_some() && self.flat_alt.is_some() {
            warn!("{label}: both flat-to-temp and flat-to-alt are set, using flat-to-temp");
        }

        if let Some(cruise) = self.cruise.as_mut() {
            cruise.resolve().map_err(|e| e.in_engine(label))?;
        }

        let v_ex = self.resolve_exhaust_speed_labelled(label)?;
        let rho_ref = self.reference_density().map_err(|e| e.in_engine(label))?;

        Ok(ThrustModel {
            engine: label.to_string(),
            rho_ref,
            v_ex,
        })
    }
}

fn check_exhaust_speed(v_ex: &UnitValue) -> Result<UnitValue, EngineError> {
    let value_m_s = v_ex.si();
    if value_m_s.is_finite() && value_m_s > 0.0 {
        Ok(v_ex.clone())
    } else {
        Err(EngineError::InvalidExhaustSpeed { value_m_s })
    }
}

fn thrust_ratio(
    rho_ref: &UnitValue,
    m0: f64,
    altitude: &UnitValue,
    m2: f64,
    v_ex: &UnitValue,
) -> Result<f64, EngineError> {
    check_exhaust_speed(v_ex)?;
    let prr = pressure_recovery_ratio(m0, m2);
    let rho = std_density(altitude)?;
    let v0 = speed_from_mach(m0, &std_temperature(altitude)?)?;

    Ok(prr * rho.ratio(rho_ref)? * v_ex.sub(&v0)?.ratio(v_ex)?)
}

/// Thrust ratio functions of a jet with everything resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ThrustModel {
    engine: String,
    rho_ref: UnitValue,
    v_ex: UnitValue,
}

impl ThrustModel {
    pub fn engine(&self) -> &str {
        &self.engine
    }

    pub fn reference_density(&self) -> &UnitValue {
        &self.rho_ref
    }

    pub fn exhaust_speed(&self) -> &UnitValue {
        &self.v_ex
    }

    pub fn thrust_ratio(
        &self,
        m0: f64,
        altitude: &UnitValue,
        m2: f64,
        v_ex: &UnitValue,
    ) -> Result<f64, EngineError> {
        thrust_ratio(&self.rho_ref, m0, altitude, m2, v_ex)
            .map_err(|e| e.in_engine(&self.engine))
    }
}

impl ThrustTable for ThrustModel {
    fn idle_thrust(&self, mach: f64, alt_ft: f64) -> Result<f64, EngineError> {
        let altitude = UnitValue::with_unit(alt_ft, "ft")?;
        let v_ex = self.v_ex.scaled(IDLE_EXHAUST_FRACTION);

        Ok(IDLE_THRUST_FACTOR * self.thrust_ratio(mach, &altitude, M2_IDLE, &v_ex)?)
    }

    fn dry_thrust(&self, mach: f64, alt_ft: f64) -> Result<f64, EngineError> {
        let altitude = UnitValue::with_unit(alt_ft, "ft")?;

        self.thrust_ratio(mach, &altitude, M2_NOMINAL, &self.v_ex)
    }
}
