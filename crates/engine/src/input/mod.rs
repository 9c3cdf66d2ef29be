mod cell;
#[cfg(feature = "midi")]
mod driver;
mod midi;
mod normalizer;
mod queue;

pub use cell::{ContinuousCell, ContinuousSample};
#[cfg(feature = "midi")]
pub use driver::{connect_midi_input, MidiConnection, MidiConnectError};
pub use midi::{parse_control_change, ControlChange, MidiRouter, PadTuning};
pub use normalizer::{InputNormalizer, InputTuning, NormalizedInput};
pub use queue::DiscreteEventQueue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    Up,
    Down,
    Left,
    Right,
    Interact,
    Dismiss,
}

const ACTION_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    pub(crate) fn axis(&self, negative: InputAction, positive: InputAction) -> f32 {
        let mut value = 0.0;
        if self.is_down(negative) {
            value -= 1.0;
        }
        if self.is_down(positive) {
            value += 1.0;
        }
        value
    }
}

impl InputAction {
    pub(crate) const ALL: [InputAction; ACTION_COUNT] = [
        InputAction::Up,
        InputAction::Down,
        InputAction::Left,
        InputAction::Right,
        InputAction::Interact,
        InputAction::Dismiss,
    ];

    const fn index(self) -> usize {
        match self {
            InputAction::Up => 0,
            InputAction::Down => 1,
            InputAction::Left => 2,
            InputAction::Right => 3,
            InputAction::Interact => 4,
            InputAction::Dismiss => 5,
        }
    }

    /// Selection produced by a fresh press of this action, if any.
    pub(crate) fn selection_on_press(self) -> Option<SelectionEvent> {
        match self {
            InputAction::Up => Some(SelectionEvent::ChoiceUp),
            InputAction::Down => Some(SelectionEvent::ChoiceDown),
            InputAction::Interact => Some(SelectionEvent::Interact),
            InputAction::Dismiss => Some(SelectionEvent::Dismiss),
            InputAction::Left | InputAction::Right => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSource {
    Midi,
    Keyboard,
}

impl InputSource {
    pub fn label(self) -> &'static str {
        match self {
            InputSource::Midi => "midi",
            InputSource::Keyboard => "keyboard",
        }
    }
}

/// Raw discrete input as produced by the keyboard collector or the pad router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscreteEvent {
    Key { action: InputAction, pressed: bool },
    PadTap { choice: usize },
}

/// Edge-triggered selection intent, one per physical press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionEvent {
    Interact,
    ChoiceUp,
    ChoiceDown,
    Dismiss,
    PadChoice(usize),
}
