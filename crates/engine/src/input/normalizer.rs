use std::time::Duration;

use tracing::{debug, info};

use crate::geometry::Vec2;

use super::{ActionStates, ContinuousSample, DiscreteEvent, InputAction, InputSource, SelectionEvent};

#[derive(Debug, Clone, Copy)]
pub struct InputTuning {
    pub center_x: f32,
    pub center_y: f32,
    pub max_x: f32,
    pub max_y: f32,
    /// Per-axis raw change below this since the last accepted sample is jitter.
    pub jitter_epsilon: f32,
    /// Offset from center below this produces no movement.
    pub center_dead_zone: f32,
    /// Without a continuous sample for this long, the keyboard takes over.
    pub source_timeout: Duration,
    /// Pad Y grows upward while screen Y grows downward.
    pub invert_y: bool,
}

impl Default for InputTuning {
    fn default() -> Self {
        Self {
            center_x: 64.0,
            center_y: 64.0,
            max_x: 128.0,
            max_y: 127.0,
            jitter_epsilon: 2.0,
            center_dead_zone: 10.0,
            source_timeout: Duration::from_millis(100),
            invert_y: true,
        }
    }
}

/// One tick's worth of normalized input.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedInput {
    pub direction: Vec2,
    pub selections: Vec<SelectionEvent>,
    /// True when this tick carried input that keeps the exhibit awake.
    pub activity: bool,
    pub source: Option<InputSource>,
}

/// Merges the continuous pad and the keyboard into one direction and one
/// selection stream. Only the active source drives movement.
#[derive(Debug)]
pub struct InputNormalizer {
    tuning: InputTuning,
    accepted_x: f32,
    accepted_y: f32,
    last_sequence: u32,
    last_sample_at: Option<Duration>,
    active_source: InputSource,
    keys: ActionStates,
    raw: Option<(u8, u8)>,
}

impl InputNormalizer {
    pub fn new(tuning: InputTuning) -> Self {
        Self {
            tuning,
            accepted_x: tuning.center_x,
            accepted_y: tuning.center_y,
            last_sequence: 0,
            last_sample_at: None,
            active_source: InputSource::Keyboard,
            keys: ActionStates::default(),
            raw: None,
        }
    }

    pub fn active_source(&self) -> InputSource {
        self.active_source
    }

    pub fn raw_sample(&self) -> Option<(u8, u8)> {
        self.raw
    }

    pub fn normalize(
        &mut self,
        now: Duration,
        sample: Option<ContinuousSample>,
        events: &[DiscreteEvent],
    ) -> NormalizedInput {
        let mut output = NormalizedInput::default();

        for event in events {
            match *event {
                DiscreteEvent::Key { action, pressed } => {
                    let was_down = self.keys.is_down(action);
                    self.keys.set(action, pressed);
                    if pressed && !was_down {
                        output.activity = true;
                        if let Some(selection) = action.selection_on_press() {
                            output.selections.push(selection);
                        }
                    }
                }
                DiscreteEvent::PadTap { choice } => {
                    output.activity = true;
                    output.selections.push(SelectionEvent::PadChoice(choice));
                }
            }
        }

        if let Some(sample) = sample.filter(|sample| sample.sequence != self.last_sequence) {
            if self.accept_sample(now, sample) {
                output.activity = true;
            }
        }
        self.expire_continuous_source(now);

        output.direction = match self.active_source {
            InputSource::Midi => self.continuous_direction(),
            InputSource::Keyboard => Vec2 {
                x: self.keys.axis(InputAction::Left, InputAction::Right),
                y: self.keys.axis(InputAction::Up, InputAction::Down),
            },
        };
        // Deflection past the dead zone is activity on either source, including
        // a pad held still within jitter.
        if !output.direction.is_zero() {
            output.activity = true;
        }
        output.source = Some(self.active_source);
        output
    }

    /// Returns true when at least one axis moved past the jitter threshold.
    fn accept_sample(&mut self, now: Duration, sample: ContinuousSample) -> bool {
        self.last_sequence = sample.sequence;
        self.last_sample_at = Some(now);
        self.raw = Some((sample.x, sample.y));
        if self.active_source != InputSource::Midi {
            self.active_source = InputSource::Midi;
            info!(source = InputSource::Midi.label(), "input_source_switched");
        }

        let x = (sample.x as f32).clamp(0.0, self.tuning.max_x);
        let y = (sample.y as f32).clamp(0.0, self.tuning.max_y);
        let mut moved = false;
        if (x - self.accepted_x).abs() >= self.tuning.jitter_epsilon {
            self.accepted_x = x;
            moved = true;
        }
        if (y - self.accepted_y).abs() >= self.tuning.jitter_epsilon {
            self.accepted_y = y;
            moved = true;
        }
        if !moved {
            debug!(x = sample.x, y = sample.y, "continuous_sample_within_jitter");
        }
        moved
    }

    fn expire_continuous_source(&mut self, now: Duration) {
        if self.active_source != InputSource::Midi {
            return;
        }
        let expired = self
            .last_sample_at
            .map_or(true, |last| now.saturating_sub(last) > self.tuning.source_timeout);
        if expired {
            self.active_source = InputSource::Keyboard;
            self.accepted_x = self.tuning.center_x;
            self.accepted_y = self.tuning.center_y;
            info!(source = InputSource::Keyboard.label(), "input_source_switched");
        }
    }

    fn continuous_direction(&self) -> Vec2 {
        let x = scale_axis(self.accepted_x, self.tuning.center_x, self.tuning.center_dead_zone);
        let y = scale_axis(self.accepted_y, self.tuning.center_y, self.tuning.center_dead_zone);
        Vec2 {
            x,
            y: if self.tuning.invert_y { -y } else { y },
        }
    }
}

fn scale_axis(value: f32, center: f32, dead_zone: f32) -> f32 {
    let offset = value - center;
    if offset.abs() < dead_zone || center <= 0.0 {
        return 0.0;
    }
    (offset / center).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn sample(x: u8, y: u8, sequence: u32) -> Option<ContinuousSample> {
        Some(ContinuousSample { x, y, sequence })
    }

    fn key(action: InputAction, pressed: bool) -> DiscreteEvent {
        DiscreteEvent::Key { action, pressed }
    }

    #[test]
    fn starts_on_keyboard_without_movement() {
        let mut normalizer = InputNormalizer::new(InputTuning::default());
        let output = normalizer.normalize(ms(0), None, &[]);
        assert_eq!(output.source, Some(InputSource::Keyboard));
        assert!(output.direction.is_zero());
        assert!(!output.activity);
    }

    #[test]
    fn continuous_sample_switches_to_midi_and_scales() {
        let mut normalizer = InputNormalizer::new(InputTuning::default());
        let output = normalizer.normalize(ms(0), sample(128, 0, 1), &[]);
        assert_eq!(output.source, Some(InputSource::Midi));
        assert!((output.direction.x - 1.0).abs() < f32::EPSILON);
        // Pad bottom is screen down.
        assert!((output.direction.y - 1.0).abs() < f32::EPSILON);
        assert!(output.activity);
    }

    #[test]
    fn sub_epsilon_jitter_around_rest_never_moves() {
        let mut normalizer = InputNormalizer::new(InputTuning::default());
        for (sequence, (x, y)) in [(64, 64), (65, 63), (63, 65), (65, 65)].iter().enumerate() {
            let output = normalizer.normalize(ms(sequence as u64), sample(*x, *y, sequence as u32 + 1), &[]);
            assert!(output.direction.is_zero());
            assert!(!output.activity);
        }
    }

    #[test]
    fn jitter_does_not_replace_accepted_value() {
        let mut normalizer = InputNormalizer::new(InputTuning::default());
        normalizer.normalize(ms(0), sample(120, 64, 1), &[]);
        let output = normalizer.normalize(ms(10), sample(121, 64, 2), &[]);
        assert!((output.direction.x - (56.0 / 64.0)).abs() < 1e-6);
    }

    #[test]
    fn held_pad_deflection_counts_as_activity() {
        let mut normalizer = InputNormalizer::new(InputTuning::default());
        normalizer.normalize(ms(0), sample(100, 64, 1), &[]);
        for tick in 1..20u32 {
            let x = if tick % 2 == 0 { 100 } else { 101 };
            let output = normalizer.normalize(ms(tick as u64 * 16), sample(x, 64, tick + 1), &[]);
            assert_eq!(output.source, Some(InputSource::Midi));
            assert!(output.direction.x > 0.0);
            assert!(output.activity, "tick {tick} lost activity");
        }
    }

    #[test]
    fn fresh_sample_after_keyboard_fallback_returns_to_midi_from_center() {
        let mut normalizer = InputNormalizer::new(InputTuning::default());
        normalizer.normalize(ms(0), sample(120, 64, 1), &[]);
        let fallback = normalizer.normalize(ms(200), None, &[]);
        assert_eq!(fallback.source, Some(InputSource::Keyboard));
        assert!(fallback.direction.is_zero());

        // 121 is within jitter of the old 120, so it only registers if the
        // accepted value restarted from center.
        let back = normalizer.normalize(ms(210), sample(121, 64, 2), &[]);
        assert_eq!(back.source, Some(InputSource::Midi));
        assert_eq!(normalizer.active_source(), InputSource::Midi);
        assert!((back.direction.x - (57.0 / 64.0)).abs() < 1e-6);
        assert!(back.activity);
    }

    #[test]
    fn center_dead_zone_suppresses_small_offsets() {
        let mut normalizer = InputNormalizer::new(InputTuning::default());
        let output = normalizer.normalize(ms(0), sample(70, 58, 1), &[]);
        assert!(output.direction.is_zero());
    }

    #[test]
    fn falls_back_to_keyboard_after_timeout() {
        let mut normalizer = InputNormalizer::new(InputTuning::default());
        normalizer.normalize(ms(0), sample(120, 64, 1), &[]);
        let still_midi = normalizer.normalize(ms(100), sample(120, 64, 1), &[]);
        assert_eq!(still_midi.source, Some(InputSource::Midi));

        let output = normalizer.normalize(ms(101), sample(120, 64, 1), &[]);
        assert_eq!(output.source, Some(InputSource::Keyboard));
        assert!(output.direction.is_zero());
    }

    #[test]
    fn keyboard_is_ignored_while_midi_is_active() {
        let mut normalizer = InputNormalizer::new(InputTuning::default());
        let output = normalizer.normalize(
            ms(0),
            sample(64, 127, 1),
            &[key(InputAction::Right, true)],
        );
        assert_eq!(output.direction.x, 0.0);
        assert!(output.direction.y < 0.0);

        let later = normalizer.normalize(ms(500), None, &[]);
        assert_eq!(later.source, Some(InputSource::Keyboard));
        assert_eq!(later.direction, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn keyboard_direction_combines_held_keys() {
        let mut normalizer = InputNormalizer::new(InputTuning::default());
        let output = normalizer.normalize(
            ms(0),
            None,
            &[key(InputAction::Up, true), key(InputAction::Left, true)],
        );
        assert_eq!(output.direction, Vec2::new(-1.0, -1.0));
        assert!(output.activity);

        let released = normalizer.normalize(
            ms(16),
            None,
            &[key(InputAction::Up, false), key(InputAction::Left, false)],
        );
        assert!(released.direction.is_zero());
        assert!(!released.activity);
    }

    #[test]
    fn key_repeat_produces_one_selection_edge() {
        let mut normalizer = InputNormalizer::new(InputTuning::default());
        let first = normalizer.normalize(ms(0), None, &[key(InputAction::Interact, true)]);
        let repeat = normalizer.normalize(ms(16), None, &[key(InputAction::Interact, true)]);
        let again = normalizer.normalize(
            ms(32),
            None,
            &[
                key(InputAction::Interact, false),
                key(InputAction::Interact, true),
            ],
        );
        assert_eq!(first.selections, vec![SelectionEvent::Interact]);
        assert!(repeat.selections.is_empty());
        assert_eq!(again.selections, vec![SelectionEvent::Interact]);
    }

    #[test]
    fn pad_taps_become_pad_choices_in_order() {
        let mut normalizer = InputNormalizer::new(InputTuning::default());
        let output = normalizer.normalize(
            ms(0),
            None,
            &[
                DiscreteEvent::PadTap { choice: 1 },
                DiscreteEvent::PadTap { choice: 0 },
            ],
        );
        assert_eq!(
            output.selections,
            vec![SelectionEvent::PadChoice(1), SelectionEvent::PadChoice(0)]
        );
        assert!(output.activity);
    }

    #[test]
    fn stale_sample_does_not_refresh_midi_source() {
        let mut normalizer = InputNormalizer::new(InputTuning::default());
        normalizer.normalize(ms(0), sample(120, 64, 7), &[]);
        normalizer.normalize(ms(200), sample(120, 64, 7), &[]);
        assert_eq!(normalizer.active_source(), InputSource::Keyboard);
    }
}
