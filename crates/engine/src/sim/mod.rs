mod dialogue;
mod game_loop;
mod player;
mod quest;
mod snapshot;
mod watchdog;
mod world;

pub use dialogue::{
    Choice, ChoiceView, DialogueEngine, DialogueGraph, DialogueNode, DialogueOutcome,
    DialogueSession, DialogueState, DialogueView, Resolution, MAX_CHOICES,
};
pub use game_loop::{AdvanceReport, GameLoop};
pub(crate) use game_loop::clamp_frame_delta;
pub use player::{Facing, PlayerController, PlayerState, PlayerTuning};
pub use quest::{
    flag_set, FlagSet, QuestChain, QuestChainError, QuestFlags, QuestStateMachine, QuestStep,
    QuestUpdate, HAS_COFFEE, HAS_HYPERRAUMANTRIEB, HAS_PAPER, HAS_WON,
};
pub use snapshot::{SnapshotHandle, WorldSnapshot};
pub use watchdog::{
    InactivityWatchdog, WatchdogSignal, WatchdogTuning, DEFAULT_RESET_AFTER, DEFAULT_WARN_AFTER,
};
pub use world::{SimConfig, World, WorldEvent};
