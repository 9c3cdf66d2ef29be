use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info};

use crate::input::SelectionEvent;

use super::quest::{FlagSet, QuestFlags};

pub const MAX_CHOICES: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub requires: FlagSet,
    pub grants: FlagSet,
}

/// Text and up to [`MAX_CHOICES`] choices shown when a POI is entered. The id
/// is the POI name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueNode {
    pub id: String,
    pub text: String,
    pub choices: Vec<Choice>,
}

/// Read-only node graph keyed by POI name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogueGraph {
    nodes: BTreeMap<String, DialogueNode>,
}

impl DialogueGraph {
    pub fn new(nodes: impl IntoIterator<Item = DialogueNode>) -> Self {
        Self {
            nodes: nodes.into_iter().map(|node| (node.id.clone(), node)).collect(),
        }
    }

    pub fn node(&self, id: &str) -> Option<&DialogueNode> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &DialogueNode> {
        self.nodes.values()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueSession {
    pub node_id: String,
    pub highlighted: Option<usize>,
}

/// A choice that was confirmed; its grants still have to go through the
/// quest state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub node_id: String,
    pub choice_index: usize,
    pub grants: FlagSet,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DialogueState {
    #[default]
    Idle,
    Active(DialogueSession),
    Resolved(Resolution),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogueOutcome {
    Unchanged,
    Highlighted(usize),
    Resolved(Resolution),
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceView {
    pub label: String,
    pub selectable: bool,
    pub grayed_out: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueView {
    pub node_id: String,
    pub text: String,
    pub choices: Vec<ChoiceView>,
    pub highlighted: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct DialogueEngine {
    graph: Arc<DialogueGraph>,
    state: DialogueState,
    grayed_out: HashSet<(String, usize)>,
}

impl DialogueEngine {
    pub fn new(graph: Arc<DialogueGraph>) -> Self {
        Self {
            graph,
            state: DialogueState::Idle,
            grayed_out: HashSet::new(),
        }
    }

    pub fn state(&self) -> &DialogueState {
        &self.state
    }

    /// Movement stays frozen until the session is closed.
    pub fn is_movement_suppressed(&self) -> bool {
        !matches!(self.state, DialogueState::Idle)
    }

    /// Starts a session for `node_id`. Returns false when a session is already
    /// running or the POI has no dialogue.
    pub fn open(&mut self, node_id: &str) -> bool {
        if !matches!(self.state, DialogueState::Idle) {
            debug!(node = node_id, "dialogue_open_ignored_while_busy");
            return false;
        }
        let Some(node) = self.graph.node(node_id) else {
            debug!(node = node_id, "poi_without_dialogue");
            return false;
        };
        let highlighted = (!node.choices.is_empty()).then_some(0);
        self.state = DialogueState::Active(DialogueSession {
            node_id: node.id.clone(),
            highlighted,
        });
        info!(node = node_id, choices = node.choices.len(), "dialogue_opened");
        true
    }

    pub fn handle(&mut self, event: SelectionEvent, flags: &QuestFlags) -> DialogueOutcome {
        let DialogueState::Active(session) = &self.state else {
            debug!(?event, "selection_without_dialogue");
            return DialogueOutcome::Unchanged;
        };
        let Some(node) = self.graph.node(&session.node_id) else {
            return DialogueOutcome::Unchanged;
        };
        let choice_count = node.choices.len();
        let highlighted = session.highlighted;

        match event {
            SelectionEvent::Dismiss => {
                self.close();
                DialogueOutcome::Closed
            }
            SelectionEvent::Interact => match highlighted {
                Some(index) => self.select(index, flags),
                None if choice_count == 0 => {
                    self.close();
                    DialogueOutcome::Closed
                }
                None => DialogueOutcome::Unchanged,
            },
            SelectionEvent::ChoiceUp => match highlighted {
                Some(index) if index > 0 => self.highlight(index - 1),
                _ => DialogueOutcome::Unchanged,
            },
            SelectionEvent::ChoiceDown => match highlighted {
                Some(index) if index + 1 < choice_count => self.highlight(index + 1),
                _ => DialogueOutcome::Unchanged,
            },
            SelectionEvent::PadChoice(index) => {
                if !self.is_selectable(index, flags) {
                    debug!(index, "choice_rejected");
                    DialogueOutcome::Unchanged
                } else if highlighted == Some(index) {
                    self.select(index, flags)
                } else {
                    self.highlight(index)
                }
            }
        }
    }

    /// Confirms choice `index` of the active node. A non-selectable or
    /// out-of-range choice leaves everything untouched.
    pub fn select(&mut self, index: usize, flags: &QuestFlags) -> DialogueOutcome {
        if !self.is_selectable(index, flags) {
            debug!(index, "choice_rejected");
            return DialogueOutcome::Unchanged;
        }
        let DialogueState::Active(session) = &self.state else {
            return DialogueOutcome::Unchanged;
        };
        let Some(choice) = self
            .graph
            .node(&session.node_id)
            .and_then(|node| node.choices.get(index))
        else {
            return DialogueOutcome::Unchanged;
        };

        let resolution = Resolution {
            node_id: session.node_id.clone(),
            choice_index: index,
            grants: choice.grants.clone(),
        };
        self.grayed_out.insert((resolution.node_id.clone(), index));
        info!(
            node = resolution.node_id.as_str(),
            choice = index,
            label = choice.label.as_str(),
            "choice_resolved"
        );
        self.state = DialogueState::Resolved(resolution.clone());
        DialogueOutcome::Resolved(resolution)
    }

    /// Selectable means in range, not used up this session and every required
    /// flag granted.
    pub fn is_selectable(&self, index: usize, flags: &QuestFlags) -> bool {
        let DialogueState::Active(session) = &self.state else {
            return false;
        };
        let Some(choice) = self
            .graph
            .node(&session.node_id)
            .and_then(|node| node.choices.get(index))
        else {
            return false;
        };
        !self.is_grayed_out(&session.node_id, index) && flags.satisfies(&choice.requires)
    }

    pub fn is_grayed_out(&self, node_id: &str, index: usize) -> bool {
        self.grayed_out.contains(&(node_id.to_string(), index))
    }

    /// Returns to idle from an active or resolved session.
    pub fn close(&mut self) -> bool {
        let node = match std::mem::take(&mut self.state) {
            DialogueState::Idle => return false,
            DialogueState::Active(session) => session.node_id,
            DialogueState::Resolved(resolution) => resolution.node_id,
        };
        info!(node = node.as_str(), "dialogue_closed");
        true
    }

    pub fn reset_to_initial(&mut self) {
        self.state = DialogueState::Idle;
        self.grayed_out.clear();
    }

    pub fn view(&self, flags: &QuestFlags) -> Option<DialogueView> {
        let DialogueState::Active(session) = &self.state else {
            return None;
        };
        let node = self.graph.node(&session.node_id)?;
        let choices = node
            .choices
            .iter()
            .enumerate()
            .map(|(index, choice)| {
                let grayed_out = self.is_grayed_out(&node.id, index);
                ChoiceView {
                    label: choice.label.clone(),
                    selectable: !grayed_out && flags.satisfies(&choice.requires),
                    grayed_out,
                }
            })
            .collect();
        Some(DialogueView {
            node_id: node.id.clone(),
            text: node.text.clone(),
            choices,
            highlighted: session.highlighted,
        })
    }

    fn highlight(&mut self, index: usize) -> DialogueOutcome {
        if let DialogueState::Active(session) = &mut self.state {
            session.highlighted = Some(index);
            return DialogueOutcome::Highlighted(index);
        }
        DialogueOutcome::Unchanged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::quest::{flag_set, QuestChain, QuestStateMachine, HAS_COFFEE, HAS_PAPER};

    fn graph() -> Arc<DialogueGraph> {
        Arc::new(DialogueGraph::new([
            DialogueNode {
                id: "Brausecus".to_string(),
                text: "Coffee?".to_string(),
                choices: vec![
                    Choice {
                        label: "Trade paper".to_string(),
                        requires: flag_set([HAS_PAPER]),
                        grants: flag_set([HAS_COFFEE]),
                    },
                    Choice {
                        label: "Leave".to_string(),
                        requires: FlagSet::new(),
                        grants: FlagSet::new(),
                    },
                ],
            },
            DialogueNode {
                id: "Nest".to_string(),
                text: "Nothing here.".to_string(),
                choices: Vec::new(),
            },
        ]))
    }

    fn flags_with_paper() -> QuestFlags {
        let mut quest = QuestStateMachine::new(QuestChain::builtin());
        quest.apply_resolution("Resonant", &flag_set([HAS_PAPER]));
        quest.flags().clone()
    }

    #[test]
    fn open_requires_idle_and_known_node() {
        let mut dialogue = DialogueEngine::new(graph());
        assert!(!dialogue.open("Orgia"));
        assert!(!dialogue.is_movement_suppressed());
        assert!(dialogue.open("Brausecus"));
        assert!(dialogue.is_movement_suppressed());
        assert!(!dialogue.open("Nest"));
    }

    #[test]
    fn unmet_requirement_is_ignored() {
        let mut dialogue = DialogueEngine::new(graph());
        dialogue.open("Brausecus");
        let flags = QuestFlags::default();
        assert_eq!(dialogue.select(0, &flags), DialogueOutcome::Unchanged);
        assert!(!dialogue.is_grayed_out("Brausecus", 0));
        assert!(matches!(dialogue.state(), DialogueState::Active(_)));
    }

    #[test]
    fn out_of_range_selection_is_ignored() {
        let mut dialogue = DialogueEngine::new(graph());
        dialogue.open("Brausecus");
        let flags = flags_with_paper();
        assert_eq!(
            dialogue.handle(SelectionEvent::PadChoice(5), &flags),
            DialogueOutcome::Unchanged
        );
        assert_eq!(dialogue.select(2, &flags), DialogueOutcome::Unchanged);
    }

    #[test]
    fn valid_selection_grays_out_and_resolves() {
        let mut dialogue = DialogueEngine::new(graph());
        dialogue.open("Brausecus");
        let flags = flags_with_paper();
        let DialogueOutcome::Resolved(resolution) = dialogue.select(0, &flags) else {
            panic!("expected resolution");
        };
        assert_eq!(resolution.grants, flag_set([HAS_COFFEE]));
        assert!(dialogue.is_grayed_out("Brausecus", 0));
        assert!(dialogue.is_movement_suppressed());

        assert!(dialogue.close());
        assert!(!dialogue.is_movement_suppressed());
    }

    #[test]
    fn grayed_out_choice_cannot_be_selected_again() {
        let mut dialogue = DialogueEngine::new(graph());
        let flags = flags_with_paper();
        dialogue.open("Brausecus");
        dialogue.select(0, &flags);
        dialogue.close();

        dialogue.open("Brausecus");
        assert_eq!(dialogue.select(0, &flags), DialogueOutcome::Unchanged);
        let view = dialogue.view(&flags).expect("view");
        assert!(view.choices[0].grayed_out);
        assert!(!view.choices[0].selectable);
        assert!(view.choices[1].selectable);
    }

    #[test]
    fn pad_tap_highlights_then_confirms() {
        let mut dialogue = DialogueEngine::new(graph());
        let flags = QuestFlags::default();
        dialogue.open("Brausecus");
        assert_eq!(
            dialogue.handle(SelectionEvent::PadChoice(1), &flags),
            DialogueOutcome::Highlighted(1)
        );
        assert!(matches!(
            dialogue.handle(SelectionEvent::PadChoice(1), &flags),
            DialogueOutcome::Resolved(_)
        ));
    }

    #[test]
    fn keyboard_navigation_moves_highlight_within_range() {
        let mut dialogue = DialogueEngine::new(graph());
        let flags = QuestFlags::default();
        dialogue.open("Brausecus");
        assert_eq!(
            dialogue.handle(SelectionEvent::ChoiceUp, &flags),
            DialogueOutcome::Unchanged
        );
        assert_eq!(
            dialogue.handle(SelectionEvent::ChoiceDown, &flags),
            DialogueOutcome::Highlighted(1)
        );
        assert_eq!(
            dialogue.handle(SelectionEvent::ChoiceDown, &flags),
            DialogueOutcome::Unchanged
        );
        assert!(matches!(
            dialogue.handle(SelectionEvent::Interact, &flags),
            DialogueOutcome::Resolved(Resolution { choice_index: 1, .. })
        ));
    }

    #[test]
    fn node_without_choices_closes_on_interact() {
        let mut dialogue = DialogueEngine::new(graph());
        dialogue.open("Nest");
        assert_eq!(
            dialogue.handle(SelectionEvent::Interact, &QuestFlags::default()),
            DialogueOutcome::Closed
        );
        assert_eq!(dialogue.state(), &DialogueState::Idle);
    }

    #[test]
    fn dismiss_closes_without_resolving() {
        let mut dialogue = DialogueEngine::new(graph());
        dialogue.open("Brausecus");
        assert_eq!(
            dialogue.handle(SelectionEvent::Dismiss, &QuestFlags::default()),
            DialogueOutcome::Closed
        );
        assert!(!dialogue.is_grayed_out("Brausecus", 1));
    }

    #[test]
    fn reset_clears_session_and_grayed_out() {
        let mut dialogue = DialogueEngine::new(graph());
        let flags = QuestFlags::default();
        dialogue.open("Brausecus");
        dialogue.select(1, &flags);
        dialogue.reset_to_initial();
        assert_eq!(dialogue.state(), &DialogueState::Idle);
        assert!(!dialogue.is_grayed_out("Brausecus", 1));
    }
}
