use std::collections::{BTreeMap, BTreeSet};

use log::info;

use super::engine::{Engine, EngineError, JetEngine, ThrustModel};
use crate::units::UnitValue;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Airplane {
    pub mass: Option<UnitValue>,
    pub version: Option<String>,
    pub engines: Vec<Engine>,
}

impl Airplane {
    pub fn jets(&self) -> impl Iterator<Item = &JetEngine> {
        self.engines.iter().filter_map(Engine::as_jet)
    }

    /// Names every engine and returns the ones to generate, in description order.
    ///
    /// An engine matching an earlier one of the same kind is not generated again; it takes the
    /// name of the earlier engine unless it has its own. Named engines match on the name,
    /// unnamed ones on their identity key. Unmatched unnamed engines are numbered per
    /// family: `turbine1`, `turbine2`, ... skipping numbers already used as explicit names.
    ///
    /// Running it again on the named engines selects the same set.
    pub fn engines_to_generate(&mut self) -> Vec<&mut Engine> {
        let explicit = self
            .engines
            .iter()
            .map(|e| e.name().is_some())
            .collect::<Vec<_>>();
        let taken = self
            .engines
            .iter()
            .filter_map(|e| e.name().map(str::to_string))
            .collect::<BTreeSet<_>>();
        let mut counters: BTreeMap<&'static str, usize> = BTreeMap::new();
        let mut emit = vec![false; self.engines.len()];

        for i in 0..self.engines.len() {
            let (earlier, rest) = self.engines.split_at_mut(i);
            let engine = &mut rest[0];

            let matched = earlier.iter().find(|other| {
                if explicit[i] {
                    other.name() == engine.name()
                } else {
                    other.key() == engine.key()
                }
            });

            match matched {
                Some(other) => {
                    let other_name = other.name().map(str::to_string);
                    if !explicit[i] {
                        if let Some(name) = other_name.clone() {
                            engine.set_name(name);
                        }
                    }
                    info!(
                        "Engine [{i}] is the same as {}, skipping",
                        other_name.as_deref().unwrap_or("an earlier engine")
                    );
                }
                None => {
                    if !explicit[i] {
                        let family = engine.family_prefix();
                        let n = counters.entry(family).or_insert(0);
                        let name = loop {
                            *n += 1;
                            let name = format!("{family}{n}");
                            if !taken.contains(&name) {
                                break name;
                            }
                        };
                        engine.set_name(name);
                    }
                    emit[i] = true;
                }
            }
        }

        self.engines
            .iter_mut()
            .zip(emit)
            .filter_map(|(e, emit)| emit.then_some(e))
            .collect()
    }

    /// Thrust model of the engine at `index`, reporting errors under its name or,
    /// for an unnamed engine, its position in the description.
    pub fn thrust_model(&mut self, index: usize) -> Result<ThrustModel, EngineError> {
        let engine = self
            .engines
            .get_mut(index)
            .ok_or(EngineError::NoSuchEngine(index))?;
        let label = match engine.name() {
            Some(name) => name.to_string(),
            None => format!("engine [{index}]"),
        };

        match engine {
            Engine::Jet(jet) => jet.thrust_model_labelled(&label),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn jet(thrust: &str) -> Engine {
        Engine::Jet(JetEngine::new(Some(thrust.parse().unwrap())).unwrap())
    }

    fn named(name: &str, thrust: &str) -> Engine {
        let mut e = jet(thrust);
        e.set_name(name.to_string());
        e
    }

    fn generated(airplane: &mut Airplane) -> Vec<String> {
        airplane
            .engines_to_generate()
            .iter()
            .map(|e| e.name().unwrap_or_default().to_string())
            .collect()
    }

    fn names(airplane: &Airplane) -> Vec<Option<&str>> {
        airplane.engines.iter().map(Engine::name).collect()
    }

    #[test]
    fn test_identical_unnamed_engines() {
        let mut airplane = Airplane {
            engines: vec![jet("5000 lbf"), jet("5000 lbf"), jet("7000 lbf")],
            ..Default::default()
        };

        assert_eq!(generated(&mut airplane), vec!["turbine1", "turbine2"]);
        assert_eq!(
            names(&airplane),
            vec![Some("turbine1"), Some("turbine1"), Some("turbine2")]
        );
    }

    #[test]
    fn test_same_thrust_in_other_units() {
        let mut airplane = Airplane {
            engines: vec![jet("5000 lbf"), jet("22241.1 N")],
            ..Default::default()
        };

        // 22241.1 N is not exactly 5000 lbf
        assert_eq!(generated(&mut airplane), vec!["turbine1", "turbine2"]);

        let mut airplane = Airplane {
            engines: vec![jet("5000 lbf"), jet("5000.0lbf")],
            ..Default::default()
        };
        assert_eq!(generated(&mut airplane), vec!["turbine1"]);
    }

    #[test]
    fn test_any_key_difference_splits() {
        let mut other = jet("5000 lbf");
        if let Engine::Jet(j) = &mut other {
            j.n1_idle = 60.0;
        }

        let mut airplane = Airplane {
            engines: vec![jet("5000 lbf"), other],
            ..Default::default()
        };
        assert_eq!(generated(&mut airplane), vec!["turbine1", "turbine2"]);
    }

    #[test]
    fn test_explicit_names() {
        let mut airplane = Airplane {
            engines: vec![
                named("left", "5000 lbf"),
                named("right", "5000 lbf"),
                named("left", "9000 lbf"),
                jet("5000 lbf"),
                jet("8000 lbf"),
            ],
            ..Default::default()
        };

        // Named engines only match by name, an unnamed one may match a named one
        assert_eq!(generated(&mut airplane), vec!["left", "right", "turbine1"]);
        assert_eq!(
            names(&airplane),
            vec![
                Some("left"),
                Some("right"),
                Some("left"),
                Some("left"),
                Some("turbine1")
            ]
        );
    }

    #[test]
    fn test_idempotent() {
        let mut airplane = Airplane {
            engines: vec![jet("5000 lbf"), jet("5000 lbf"), jet("7000 lbf"), jet("7000 lbf")],
            ..Default::default()
        };

        let first = generated(&mut airplane);
        let first_names = names(&airplane)
            .into_iter()
            .map(|n| n.map(str::to_string))
            .collect::<Vec<_>>();

        let second = generated(&mut airplane);
        let second_names = names(&airplane)
            .into_iter()
            .map(|n| n.map(str::to_string))
            .collect::<Vec<_>>();

        assert_eq!(first, vec!["turbine1", "turbine2"]);
        assert_eq!(first, second);
        assert_eq!(first_names, second_names);
    }

    #[test]
    fn test_generated_names_skip_explicit_ones() {
        let mut airplane = Airplane {
            engines: vec![named("turbine1", "5000 lbf"), jet("7000 lbf"), jet("9000 lbf")],
            ..Default::default()
        };

        assert_eq!(generated(&mut airplane), vec!["turbine1", "turbine2", "turbine3"]);
        assert_eq!(generated(&mut airplane), vec!["turbine1", "turbine2", "turbine3"]);
    }

    #[test]
    fn test_thrust_model_errors_name_the_position() {
        let mut bad = jet("5000 lbf");
        if let Engine::Jet(j) = &mut bad {
            j.v_ex = Some("0 kt".parse().unwrap());
        }
        let mut airplane = Airplane {
            engines: vec![jet("5000 lbf"), bad],
            ..Default::default()
        };

        assert!(airplane.thrust_model(0).is_ok());
        match airplane.thrust_model(1) {
            Err(EngineError::Engine { engine, source }) => {
                assert_eq!(engine, "engine [1]");
                assert!(matches!(*source, EngineError::InvalidExhaustSpeed { .. }));
            }
            other => panic!("Expected an invalid exhaust speed, got {other:?}"),
        }
        assert_eq!(airplane.thrust_model(2), Err(EngineError::NoSuchEngine(2)));

        airplane.engines[1].set_name("left".to_string());
        assert!(matches!(
            airplane.thrust_model(1),
            Err(EngineError::Engine { engine, .. }) if engine == "left"
        ));
    }

    #[test]
    fn test_jets() {
        let airplane = Airplane {
            engines: vec![jet("5000 lbf"), named("x", "1 lbf")],
            ..Default::default()
        };
        assert_eq!(airplane.jets().count(), 2);
    }
}
