use std::collections::{BTreeSet, HashMap};

use thiserror::Error;
use tracing::{info, warn};

pub const HAS_PAPER: &str = "hasPaper";
pub const HAS_COFFEE: &str = "hasCoffee";
pub const HAS_HYPERRAUMANTRIEB: &str = "hasHyperraumantrieb";
pub const HAS_WON: &str = "hasWon";

pub type FlagSet = BTreeSet<String>;

pub fn flag_set<const N: usize>(flags: [&str; N]) -> FlagSet {
    flags.into_iter().map(ToString::to_string).collect()
}

/// Monotonic set of granted quest flags. Only [`QuestStateMachine`] adds to
/// it and only a world reset clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestFlags {
    granted: FlagSet,
}

impl QuestFlags {
    pub fn contains(&self, flag: &str) -> bool {
        self.granted.contains(flag)
    }

    /// Unknown flag names are simply not granted.
    pub fn satisfies(&self, required: &FlagSet) -> bool {
        required.iter().all(|flag| self.granted.contains(flag))
    }

    pub fn is_superset(&self, other: &QuestFlags) -> bool {
        self.granted.is_superset(&other.granted)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.granted.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.granted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.granted.is_empty()
    }

    fn grant(&mut self, flag: &str) -> bool {
        self.granted.insert(flag.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestStep {
    pub poi: String,
    pub requires: FlagSet,
    pub grants: FlagSet,
}

impl QuestStep {
    pub fn new(poi: &str, requires: FlagSet, grants: FlagSet) -> Self {
        Self {
            poi: poi.to_string(),
            requires,
            grants,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuestChainError {
    #[error("quest chain has no steps")]
    Empty,
    #[error("quest chain lists POI '{poi}' more than once")]
    DuplicatePoi { poi: String },
    #[error("flag '{flag}' is granted by both '{first}' and '{second}'")]
    DuplicateGrant {
        flag: String,
        first: String,
        second: String,
    },
    #[error("'{poi}' requires '{flag}', which is only granted later by '{granted_by}'")]
    CircularPrecondition {
        poi: String,
        flag: String,
        granted_by: String,
    },
    #[error("'{poi}' requires '{flag}', which no step grants")]
    UnsatisfiablePrecondition { poi: String, flag: String },
    #[error("'{poi}' grants '{}' but is not the last step", HAS_WON)]
    WinBeforeTerminal { poi: String },
    #[error("terminal step '{poi}' does not grant '{}'", HAS_WON)]
    MissingWinGrant { poi: String },
    #[error("terminal step '{poi}' does not require upstream flag '{flag}'")]
    TerminalMissesUpstream { poi: String, flag: String },
}

/// Ordered, strictly linear list of quest steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestChain {
    steps: Vec<QuestStep>,
}

impl QuestChain {
    pub fn new(steps: Vec<QuestStep>) -> Result<Self, QuestChainError> {
        validate_steps(&steps)?;
        Ok(Self { steps })
    }

    /// Paper at Resonant, coffee at Brausecus, then the drive and the win at
    /// the Polytron 4000.
    pub fn builtin() -> Self {
        Self {
            steps: vec![
                QuestStep::new("Resonant", FlagSet::new(), flag_set([HAS_PAPER])),
                QuestStep::new("Brausecus", flag_set([HAS_PAPER]), flag_set([HAS_COFFEE])),
                QuestStep::new(
                    "Polytron4000",
                    flag_set([HAS_PAPER, HAS_COFFEE]),
                    flag_set([HAS_HYPERRAUMANTRIEB, HAS_WON]),
                ),
            ],
        }
    }

    pub fn steps(&self) -> &[QuestStep] {
        &self.steps
    }

    pub fn step_for(&self, poi: &str) -> Option<&QuestStep> {
        self.steps.iter().find(|step| step.poi == poi)
    }
}

fn validate_steps(steps: &[QuestStep]) -> Result<(), QuestChainError> {
    let Some(terminal) = steps.last() else {
        return Err(QuestChainError::Empty);
    };

    let mut owners: HashMap<&str, &str> = HashMap::new();
    for (index, step) in steps.iter().enumerate() {
        if steps[..index].iter().any(|earlier| earlier.poi == step.poi) {
            return Err(QuestChainError::DuplicatePoi {
                poi: step.poi.clone(),
            });
        }
        for flag in &step.grants {
            if let Some(first) = owners.insert(flag, &step.poi) {
                return Err(QuestChainError::DuplicateGrant {
                    flag: flag.clone(),
                    first: first.to_string(),
                    second: step.poi.clone(),
                });
            }
        }
    }

    let mut upstream = FlagSet::new();
    for (index, step) in steps.iter().enumerate() {
        for flag in &step.requires {
            if upstream.contains(flag) {
                continue;
            }
            return Err(match owners.get(flag.as_str()) {
                Some(owner) => QuestChainError::CircularPrecondition {
                    poi: step.poi.clone(),
                    flag: flag.clone(),
                    granted_by: owner.to_string(),
                },
                None => QuestChainError::UnsatisfiablePrecondition {
                    poi: step.poi.clone(),
                    flag: flag.clone(),
                },
            });
        }
        if index + 1 < steps.len() && step.grants.contains(HAS_WON) {
            return Err(QuestChainError::WinBeforeTerminal {
                poi: step.poi.clone(),
            });
        }
        if index + 1 < steps.len() {
            upstream.extend(step.grants.iter().cloned());
        }
    }

    if !terminal.grants.contains(HAS_WON) {
        return Err(QuestChainError::MissingWinGrant {
            poi: terminal.poi.clone(),
        });
    }
    if let Some(flag) = upstream.iter().find(|flag| !terminal.requires.contains(*flag)) {
        return Err(QuestChainError::TerminalMissesUpstream {
            poi: terminal.poi.clone(),
            flag: flag.clone(),
        });
    }
    Ok(())
}

/// Flags granted or held back by one resolved choice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestUpdate {
    pub granted: Vec<String>,
    pub withheld: Vec<String>,
    pub won: bool,
}

#[derive(Debug, Clone)]
pub struct QuestStateMachine {
    chain: QuestChain,
    flags: QuestFlags,
}

impl QuestStateMachine {
    pub fn new(chain: QuestChain) -> Self {
        Self {
            chain,
            flags: QuestFlags::default(),
        }
    }

    pub fn flags(&self) -> &QuestFlags {
        &self.flags
    }

    pub fn is_won(&self) -> bool {
        self.flags.contains(HAS_WON)
    }

    /// Applies the effect flags of a choice resolved at `poi`. Flags that
    /// belong to the chain are only granted at their own step and only once
    /// that step's preconditions hold; any other flag is granted as is.
    pub fn apply_resolution(&mut self, poi: &str, effects: &FlagSet) -> QuestUpdate {
        let mut update = QuestUpdate::default();
        let step = self.chain.step_for(poi);
        let step_unlocked = step.is_some_and(|step| self.flags.satisfies(&step.requires));

        for flag in effects {
            if self.flags.contains(flag) {
                continue;
            }
            let owned_by_chain = self.chain.steps.iter().any(|step| step.grants.contains(flag));
            let allowed = !owned_by_chain
                || (step_unlocked && step.is_some_and(|step| step.grants.contains(flag)));
            if !allowed {
                warn!(poi, flag = flag.as_str(), "quest_grant_withheld");
                update.withheld.push(flag.clone());
                continue;
            }
            self.flags.grant(flag);
            info!(poi, flag = flag.as_str(), "quest_flag_granted");
            update.granted.push(flag.clone());
        }

        if update.granted.iter().any(|flag| flag == HAS_WON) {
            update.won = true;
            info!(poi, "quest_won");
        }
        update
    }

    pub fn reset_to_initial(&mut self) {
        self.flags = QuestFlags::default();
    }
}
