use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::geometry::MapGeometryIndex;
use crate::input::{InputTuning, NormalizedInput, PadTuning, SelectionEvent};

use super::dialogue::{DialogueEngine, DialogueGraph, DialogueOutcome};
use super::player::{PlayerController, PlayerTuning};
use super::quest::{QuestChain, QuestStateMachine};
use super::snapshot::WorldSnapshot;
use super::watchdog::{InactivityWatchdog, WatchdogSignal, WatchdogTuning};

#[derive(Debug, Clone, Copy, Default)]
pub struct SimConfig {
    pub player: PlayerTuning,
    pub watchdog: WatchdogTuning,
    /// Consumed by the normalizer that feeds the world, not by the world itself.
    pub input: InputTuning,
    pub pad: PadTuning,
}

/// Something observable that happened during one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldEvent {
    PoiEntered { poi: String },
    DialogueOpened { node: String },
    ChoiceResolved { node: String, choice: usize },
    FlagsGranted { flags: Vec<String> },
    Won,
    DialogueClosed,
    IdleWarning,
    Reset,
}

/// All mutable simulation state, advanced only by [`World::step`].
#[derive(Debug)]
pub struct World {
    map: Arc<MapGeometryIndex>,
    player: PlayerController,
    dialogue: DialogueEngine,
    quest: QuestStateMachine,
    watchdog: InactivityWatchdog,
    events: Vec<WorldEvent>,
}

impl World {
    pub fn new(
        map: Arc<MapGeometryIndex>,
        dialogue: Arc<DialogueGraph>,
        chain: QuestChain,
        config: SimConfig,
    ) -> Self {
        Self {
            map,
            player: PlayerController::new(config.player),
            dialogue: DialogueEngine::new(dialogue),
            quest: QuestStateMachine::new(chain),
            watchdog: InactivityWatchdog::new(config.watchdog, Duration::ZERO),
            events: Vec::new(),
        }
    }

    pub fn map(&self) -> &Arc<MapGeometryIndex> {
        &self.map
    }

    pub fn player(&self) -> &PlayerController {
        &self.player
    }

    pub fn dialogue(&self) -> &DialogueEngine {
        &self.dialogue
    }

    pub fn quest(&self) -> &QuestStateMachine {
        &self.quest
    }

    pub fn watchdog(&self) -> &InactivityWatchdog {
        &self.watchdog
    }

    /// One fixed step: selections or movement, quest effects, then the idle
    /// check. Returns what happened during the step.
    pub fn step(&mut self, now: Duration, dt: Duration, input: &NormalizedInput) -> &[WorldEvent] {
        self.events.clear();
        if input.activity {
            self.watchdog.record_activity(now);
        }

        if !self.quest.is_won() {
            if self.dialogue.is_movement_suppressed() {
                self.apply_selections(&input.selections);
            } else {
                self.move_player(input, dt);
            }
        } else if !input.selections.is_empty() {
            debug!(count = input.selections.len(), "selections_ignored_after_win");
        }

        match self.watchdog.check(now) {
            WatchdogSignal::None => {}
            WatchdogSignal::Warn => self.events.push(WorldEvent::IdleWarning),
            WatchdogSignal::Reset => self.reset_to_initial(now),
        }
        &self.events
    }

    fn apply_selections(&mut self, selections: &[SelectionEvent]) {
        for selection in selections {
            match self.dialogue.handle(*selection, self.quest.flags()) {
                DialogueOutcome::Unchanged | DialogueOutcome::Highlighted(_) => {}
                DialogueOutcome::Closed => {
                    self.events.push(WorldEvent::DialogueClosed);
                    return;
                }
                DialogueOutcome::Resolved(resolution) => {
                    self.events.push(WorldEvent::ChoiceResolved {
                        node: resolution.node_id.clone(),
                        choice: resolution.choice_index,
                    });
                    let update = self
                        .quest
                        .apply_resolution(&resolution.node_id, &resolution.grants);
                    if !update.granted.is_empty() {
                        self.events.push(WorldEvent::FlagsGranted {
                            flags: update.granted,
                        });
                    }
                    if update.won {
                        self.events.push(WorldEvent::Won);
                    }
                    self.dialogue.close();
                    self.events.push(WorldEvent::DialogueClosed);
                    return;
                }
            }
        }
    }

    fn move_player(&mut self, input: &NormalizedInput, dt: Duration) {
        let entered = self
            .player
            .step(input.direction, dt.as_secs_f32(), &self.map);
        if let Some(poi) = entered.and_then(|id| self.map.poi(id)) {
            self.events.push(WorldEvent::PoiEntered {
                poi: poi.name.clone(),
            });
            if self.dialogue.open(&poi.name) {
                self.events.push(WorldEvent::DialogueOpened {
                    node: poi.name.clone(),
                });
            }
            return;
        }

        // Interact re-opens the dialogue of the POI the player is standing in.
        if !input.selections.contains(&SelectionEvent::Interact) {
            return;
        }
        let Some(poi) = self
            .player
            .state()
            .current_poi
            .and_then(|id| self.map.poi(id))
        else {
            return;
        };
        if self.dialogue.open(&poi.name) {
            self.events.push(WorldEvent::DialogueOpened {
                node: poi.name.clone(),
            });
        }
    }

    /// Broadcast reset: every component returns to its initial state and the
    /// idle clock restarts at `now`.
    pub fn reset_to_initial(&mut self, now: Duration) {
        self.player.reset_to_initial();
        self.quest.reset_to_initial();
        self.dialogue.reset_to_initial();
        self.watchdog.reset_to_initial(now);
        self.events.push(WorldEvent::Reset);
        info!(now_ms = now.as_millis() as u64, "world_reset");
    }

    pub fn snapshot(&self, tick: u64, now: Duration) -> WorldSnapshot {
        let player = self.player.state();
        WorldSnapshot {
            tick,
            sim_time: now,
            player_position: player.position,
            player_size: self.player.tuning().size,
            facing: player.facing,
            current_poi: player
                .current_poi
                .and_then(|id| self.map.poi(id))
                .map(|poi| poi.name.clone()),
            dialogue: self.dialogue.view(self.quest.flags()),
            quest_flags: self.quest.flags().iter().map(ToString::to_string).collect(),
            won: self.quest.is_won(),
            idle_warning_active: self.watchdog.warning_active(),
            idle_for: self.watchdog.idle(now),
            ..WorldSnapshot::default()
        }
    }
}
