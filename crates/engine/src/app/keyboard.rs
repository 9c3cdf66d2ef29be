use winit::event::{ElementState, KeyEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

use tracing::debug;

use crate::input::{ActionStates, DiscreteEvent, DiscreteEventQueue, InputAction};

/// Turns window key events into queued discrete events. Loop-level keys
/// (overlay toggle, quit) stay here and never reach the simulation.
#[derive(Debug)]
pub(crate) struct KeyboardCollector {
    queue: DiscreteEventQueue,
    held: ActionStates,
    quit_requested: bool,
    overlay_toggle_is_down: bool,
    overlay_toggle_pressed_edge: bool,
}

impl KeyboardCollector {
    pub(crate) fn new(queue: DiscreteEventQueue) -> Self {
        Self {
            queue,
            held: ActionStates::default(),
            quit_requested: false,
            overlay_toggle_is_down: false,
            overlay_toggle_pressed_edge: false,
        }
    }

    pub(crate) fn handle_keyboard_input(&mut self, key_event: &KeyEvent) {
        if key_event.repeat {
            return;
        }
        self.handle_key(key_event.physical_key, key_event.state);
    }

    fn handle_key(&mut self, key: PhysicalKey, state: ElementState) {
        let pressed = state == ElementState::Pressed;
        match key {
            PhysicalKey::Code(KeyCode::Escape) if pressed => self.quit_requested = true,
            PhysicalKey::Code(KeyCode::F3) => {
                if pressed && !self.overlay_toggle_is_down {
                    self.overlay_toggle_pressed_edge = true;
                }
                self.overlay_toggle_is_down = pressed;
            }
            _ => {
                if let Some(action) = action_for_key(key) {
                    self.held.set(action, pressed);
                    self.queue.push(DiscreteEvent::Key { action, pressed });
                }
            }
        }
    }

    /// Queues a release for every action still held. Called when the window
    /// loses focus, since the matching key-up events never arrive.
    pub(crate) fn release_held_keys(&mut self) {
        let mut released = 0usize;
        for action in InputAction::ALL {
            if self.held.is_down(action) {
                self.held.set(action, false);
                self.queue.push(DiscreteEvent::Key {
                    action,
                    pressed: false,
                });
                released += 1;
            }
        }
        self.overlay_toggle_is_down = false;
        if released > 0 {
            debug!(released, "held_keys_released");
        }
    }

    pub(crate) fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub(crate) fn mark_quit_requested(&mut self) {
        self.quit_requested = true;
    }

    pub(crate) fn take_overlay_toggle_pressed(&mut self) -> bool {
        std::mem::take(&mut self.overlay_toggle_pressed_edge)
    }
}

fn action_for_key(key: PhysicalKey) -> Option<InputAction> {
    let PhysicalKey::Code(code) = key else {
        return None;
    };
    match code {
        KeyCode::KeyW | KeyCode::ArrowUp => Some(InputAction::Up),
        KeyCode::KeyS | KeyCode::ArrowDown => Some(InputAction::Down),
        KeyCode::KeyA | KeyCode::ArrowLeft => Some(InputAction::Left),
        KeyCode::KeyD | KeyCode::ArrowRight => Some(InputAction::Right),
        KeyCode::Enter | KeyCode::NumpadEnter | KeyCode::Space => Some(InputAction::Interact),
        KeyCode::Backspace => Some(InputAction::Dismiss),
        _ => None,
    }
}
