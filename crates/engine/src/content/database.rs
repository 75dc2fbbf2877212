use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RarityDefId(pub u32);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectStep {
    pub delay_seconds: f32,
    pub visual_state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioCue {
    pub delay_seconds: f32,
    pub sound_id: String,
}

/// Declarative cutscene program: timed visual-state changes plus at most
/// one audio start. The orchestrator schedules these; it never interprets
/// the visual-state tokens.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EffectProgram {
    pub steps: Vec<EffectStep>,
    pub audio: Option<AudioCue>,
}

impl EffectProgram {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty() && self.audio.is_none()
    }

    /// Delay after which the program counts as complete, or `None` for an
    /// empty program (which can only ever finish through the failsafe).
    pub fn completion_delay_seconds(&self, tail_seconds: f32) -> Option<f32> {
        let step_max = self
            .steps
            .iter()
            .map(|step| step.delay_seconds)
            .fold(None::<f32>, |acc, delay| {
                Some(acc.map_or(delay, |current| current.max(delay)))
            });
        let audio_delay = self.audio.as_ref().map(|cue| cue.delay_seconds);
        match (step_max, audio_delay) {
            (None, None) => None,
            (Some(a), None) => Some(a + tail_seconds),
            (None, Some(b)) => Some(b + tail_seconds),
            (Some(a), Some(b)) => Some(a.max(b) + tail_seconds),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RarityDef {
    pub def_name: String,
    pub class: String,
    pub weight: f64,
    pub titles: Vec<String>,
    pub quick: bool,
    pub sound_id: Option<String>,
    pub background_id: Option<String>,
    pub effect: EffectProgram,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverridePool {
    pub modulus: u64,
    pub pool_weight: f64,
    pub def: RarityDef,
}

/// The compiled, immutable rarity table. Base defs keep declaration order;
/// the first def is the defined floating-point fallback.
#[derive(Debug, Default, Clone)]
pub struct RarityTable {
    defs: Vec<RarityDef>,
    ids_by_name: HashMap<String, RarityDefId>,
    overrides: Vec<OverridePool>,
    total_weight: f64,
}

impl RarityTable {
    pub fn from_parts(defs: Vec<RarityDef>, overrides: Vec<OverridePool>) -> Self {
        let mut ids_by_name = HashMap::with_capacity(defs.len());
        for (idx, def) in defs.iter().enumerate() {
            ids_by_name.insert(def.def_name.clone(), RarityDefId(idx as u32));
        }
        let total_weight = defs.iter().map(|def| def.weight).sum();
        Self {
            defs,
            ids_by_name,
            overrides,
            total_weight,
        }
    }

    pub fn defs(&self) -> &[RarityDef] {
        &self.defs
    }

    pub fn def(&self, id: RarityDefId) -> Option<&RarityDef> {
        self.defs.get(id.0 as usize)
    }

    pub fn def_id_by_name(&self, name: &str) -> Option<RarityDefId> {
        self.ids_by_name.get(name).copied()
    }

    pub fn overrides(&self) -> &[OverridePool] {
        &self.overrides
    }

    pub fn override_for(&self, modulus: u64) -> Option<&OverridePool> {
        self.overrides.iter().find(|pool| pool.modulus == modulus)
    }

    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// First base entry; the defined degrade target for any resolution
    /// inconsistency.
    pub fn fallback(&self) -> Option<&RarityDef> {
        self.defs.first()
    }

    /// Minimal built-in table used when no authored tables exist on disk.
    pub fn builtin_default() -> Self {
        let quick_def = |def_name: &str, class: &str, weight: f64, titles: &[&str]| RarityDef {
            def_name: def_name.to_string(),
            class: class.to_string(),
            weight,
            titles: titles.iter().map(ToString::to_string).collect(),
            quick: true,
            sound_id: None,
            background_id: None,
            effect: EffectProgram::default(),
        };

        let defs = vec![
            quick_def("1 in 2", "basic", 500_000.0, &["Stray", "Wanderer"]),
            quick_def("1 in 8", "basic_bright", 125_000.0, &["Seeker"]),
            quick_def("1 in 64", "fine", 15_625.0, &["Warden"]),
            RarityDef {
                def_name: "1 in 1,024".to_string(),
                class: "grand".to_string(),
                weight: 977.0,
                titles: vec!["Herald".to_string()],
                quick: false,
                sound_id: Some("sting.grand".to_string()),
                background_id: None,
                effect: EffectProgram {
                    steps: vec![
                        EffectStep {
                            delay_seconds: 0.0,
                            visual_state: "veil.dim".to_string(),
                        },
                        EffectStep {
                            delay_seconds: 1.2,
                            visual_state: "flash.white".to_string(),
                        },
                    ],
                    audio: Some(AudioCue {
                        delay_seconds: 0.4,
                        sound_id: "sting.grand".to_string(),
                    }),
                },
            },
            RarityDef {
                def_name: "1 in 65,536".to_string(),
                class: "exalted".to_string(),
                weight: 15.0,
                titles: vec!["Sovereign".to_string()],
                quick: false,
                sound_id: Some("sting.exalted".to_string()),
                background_id: Some("bg.exalted".to_string()),
                effect: EffectProgram {
                    steps: vec![
                        EffectStep {
                            delay_seconds: 0.0,
                            visual_state: "veil.black".to_string(),
                        },
                        EffectStep {
                            delay_seconds: 2.0,
                            visual_state: "burst.gold".to_string(),
                        },
                    ],
                    audio: Some(AudioCue {
                        delay_seconds: 1.0,
                        sound_id: "sting.exalted".to_string(),
                    }),
                },
            },
        ];

        let overrides = vec![OverridePool {
            modulus: 7,
            pool_weight: 40.0,
            def: RarityDef {
                def_name: "Lucky Seventh".to_string(),
                class: "fine_lucky".to_string(),
                weight: 40.0,
                titles: vec!["Lucky".to_string()],
                quick: true,
                sound_id: None,
                background_id: None,
                effect: EffectProgram::default(),
            },
        }];

        Self::from_parts(defs, overrides)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str, weight: f64) -> RarityDef {
        RarityDef {
            def_name: name.to_string(),
            class: "basic".to_string(),
            weight,
            titles: vec!["Title".to_string()],
            quick: true,
            sound_id: None,
            background_id: None,
            effect: EffectProgram::default(),
        }
    }

    #[test]
    fn from_parts_assigns_ids_in_declaration_order() {
        let table = RarityTable::from_parts(vec![def("zeta", 10.0), def("alpha", 5.0)], Vec::new());

        assert_eq!(table.def_id_by_name("zeta"), Some(RarityDefId(0)));
        assert_eq!(table.def_id_by_name("alpha"), Some(RarityDefId(1)));
        assert_eq!(table.total_weight(), 15.0);
        assert_eq!(table.fallback().expect("fallback").def_name, "zeta");
    }

    #[test]
    fn override_lookup_by_modulus() {
        let pool = OverridePool {
            modulus: 333,
            pool_weight: 2.0,
            def: def("Equinox", 2.0),
        };
        let table = RarityTable::from_parts(vec![def("base", 1.0)], vec![pool]);

        assert!(table.override_for(333).is_some());
        assert!(table.override_for(5).is_none());
    }

    #[test]
    fn completion_delay_uses_largest_scheduled_delay() {
        let program = EffectProgram {
            steps: vec![
                EffectStep {
                    delay_seconds: 0.5,
                    visual_state: "a".to_string(),
                },
                EffectStep {
                    delay_seconds: 2.0,
                    visual_state: "b".to_string(),
                },
            ],
            audio: Some(AudioCue {
                delay_seconds: 3.0,
                sound_id: "s".to_string(),
            }),
        };

        let delay = program.completion_delay_seconds(0.5).expect("delay");
        assert!((delay - 3.5).abs() < 0.0001);
    }

    #[test]
    fn empty_program_has_no_completion() {
        assert!(EffectProgram::default()
            .completion_delay_seconds(0.5)
            .is_none());
    }

    #[test]
    fn builtin_default_is_usable() {
        let table = RarityTable::builtin_default();
        assert!(!table.is_empty());
        assert!(table.total_weight() > 0.0);
        assert!(table.fallback().is_some());
        assert!(table.override_for(7).is_some());
    }
}
