pub mod jet;

pub use jet::{ActionPoint, CruisePoint, JetEngine, JetKey, ThrustModel};

use thiserror::Error;

use crate::{fdm::atmosphere::AtmosphereError, units::UnitError};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("Exhaust speed derived from the cruise point diverged ({value_m_s} m/s)")]
    Divergence { value_m_s: f64 },

    #[error("Exhaust speed must be positive and finite ({value_m_s} m/s)")]
    InvalidExhaustSpeed { value_m_s: f64 },

    #[error("No engine at index {0}")]
    NoSuchEngine(usize),

    #[error("Static thrust is required to derive the exhaust speed from a cruise point")]
    MissingThrust,

    #[error("Cruise point needs either a mach number or a speed")]
    MissingCruiseSpeed,

    #[error(transparent)]
    Atmosphere(#[from] AtmosphereError),

    #[error(transparent)]
    Unit(#[from] UnitError),

    #[error("Engine '{engine}': {source}")]
    Engine {
        engine: String,
        source: Box<EngineError>,
    },
}

impl EngineError {
    /// Attaches the engine name, unless the error already carries one.
    pub fn in_engine(self, engine: &str) -> Self {
        match self {
            e @ EngineError::Engine { .. } => e,
            e => EngineError::Engine {
                engine: engine.to_string(),
                source: Box::new(e),
            },
        }
    }
}

/// Thrust ratio functions sampled into the generated tables.
pub trait ThrustTable {
    fn idle_thrust(&self, mach: f64, alt_ft: f64) -> Result<f64, EngineError>;
    fn dry_thrust(&self, mach: f64, alt_ft: f64) -> Result<f64, EngineError>;
}

/// Attributes compared when deciding whether two unnamed engines are the same.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineKey {
    Jet(JetKey),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Engine {
    Jet(JetEngine),
}

impl Engine {
    pub fn name(&self) -> Option<&str> {
        match self {
            Engine::Jet(jet) => jet.name.as_deref(),
        }
    }

    pub fn set_name(&mut self, name: String) {
        match self {
            Engine::Jet(jet) => jet.name = Some(name),
        }
    }

    /// Prefix of the generated names for engines of this kind.
    pub fn family_prefix(&self) -> &'static str {
        match self {
            Engine::Jet(_) => "turbine",
        }
    }

    pub fn key(&self) -> EngineKey {
        match self {
            Engine::Jet(jet) => EngineKey::Jet(jet.key()),
        }
    }

    pub fn as_jet(&self) -> Option<&JetEngine> {
        match self {
            Engine::Jet(jet) => Some(jet),
        }
    }

    pub fn as_jet_mut(&mut self) -> Option<&mut JetEngine> {
        match self {
            Engine::Jet(jet) => Some(jet),
        }
    }
}

impl From<JetEngine> for Engine {
    fn from(value: JetEngine) -> Self {
        Engine::Jet(value)
    }
}
