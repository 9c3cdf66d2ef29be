use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::{ContinuousCell, DiscreteEvent, DiscreteEventQueue};

const STATUS_CONTROL_CHANGE: u8 = 0xB0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlChange {
    pub channel: u8,
    pub controller: u8,
    pub value: u8,
}

/// Decodes a channel-voice control-change message; everything else is `None`.
pub fn parse_control_change(message: &[u8]) -> Option<ControlChange> {
    let [status, controller, value, ..] = *message else {
        return None;
    };
    if status & 0xF0 != STATUS_CONTROL_CHANGE || controller > 0x7F || value > 0x7F {
        return None;
    }
    Some(ControlChange {
        channel: status & 0x0F,
        controller,
        value,
    })
}

/// Controller numbers and the spatial split of the pad surface.
#[derive(Debug, Clone, Copy)]
pub struct PadTuning {
    pub cc_x: u8,
    pub cc_y: u8,
    pub center: u8,
    /// X above this selects choice 0.
    pub first_choice_above: u8,
    /// X below this selects choice 1.
    pub second_choice_below: u8,
    pub tap_cooldown: Duration,
    /// Silence longer than this means the finger left the pad.
    pub release_after: Duration,
}

impl Default for PadTuning {
    fn default() -> Self {
        Self {
            cc_x: 12,
            cc_y: 13,
            center: 64,
            first_choice_above: 100,
            second_choice_below: 27,
            tap_cooldown: Duration::from_millis(300),
            release_after: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PadRegion {
    Neutral,
    Choice(usize),
}

/// Runs on the MIDI callback thread. Publishes X/Y into the continuous cell
/// and turns transitions into a choice region into queued pad taps; it never
/// touches simulation state.
#[derive(Debug)]
pub struct MidiRouter {
    tuning: PadTuning,
    cell: Arc<ContinuousCell>,
    events: DiscreteEventQueue,
    x: u8,
    y: u8,
    region: PadRegion,
    last_message_at: Option<Duration>,
    last_tap_at: Option<Duration>,
}

impl MidiRouter {
    pub fn new(tuning: PadTuning, cell: Arc<ContinuousCell>, events: DiscreteEventQueue) -> Self {
        Self {
            tuning,
            cell,
            events,
            x: tuning.center,
            y: tuning.center,
            region: PadRegion::Neutral,
            last_message_at: None,
            last_tap_at: None,
        }
    }

    /// `timestamp` is the driver's monotonic message time.
    pub fn handle_message(&mut self, timestamp: Duration, message: &[u8]) {
        let Some(change) = parse_control_change(message) else {
            return;
        };
        if change.controller != self.tuning.cc_x && change.controller != self.tuning.cc_y {
            return;
        }

        let released = self
            .last_message_at
            .is_some_and(|last| timestamp.saturating_sub(last) > self.tuning.release_after);
        if released {
            self.region = PadRegion::Neutral;
        }
        self.last_message_at = Some(timestamp);

        if change.controller == self.tuning.cc_x {
            self.x = change.value;
            self.cell.publish(self.x, self.y);
            self.track_region(timestamp);
        } else {
            self.y = change.value;
            self.cell.publish(self.x, self.y);
        }
    }

    fn track_region(&mut self, timestamp: Duration) {
        let region = self.region_for(self.x);
        if region == self.region {
            return;
        }
        self.region = region;

        let PadRegion::Choice(choice) = region else {
            return;
        };
        let cooling_down = self
            .last_tap_at
            .is_some_and(|last| timestamp.saturating_sub(last) < self.tuning.tap_cooldown);
        if cooling_down {
            debug!(choice, "pad_tap_suppressed_by_cooldown");
            return;
        }
        self.last_tap_at = Some(timestamp);
        self.events.push(DiscreteEvent::PadTap { choice });
    }

    fn region_for(&self, x: u8) -> PadRegion {
        if x > self.tuning.first_choice_above {
            PadRegion::Choice(0)
        } else if x < self.tuning.second_choice_below {
            PadRegion::Choice(1)
        } else {
            PadRegion::Neutral
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    fn cc(controller: u8, value: u8) -> [u8; 3] {
        [0xB0, controller, value]
    }

    fn router() -> (MidiRouter, Arc<ContinuousCell>, DiscreteEventQueue) {
        let cell = Arc::new(ContinuousCell::new());
        let queue = DiscreteEventQueue::with_capacity(16);
        let router = MidiRouter::new(PadTuning::default(), Arc::clone(&cell), queue.clone());
        (router, cell, queue)
    }

    fn drain(queue: &DiscreteEventQueue) -> Vec<DiscreteEvent> {
        let mut out = Vec::new();
        queue.drain_into(&mut out);
        out
    }

    #[test]
    fn parses_control_change_on_any_channel() {
        assert_eq!(
            parse_control_change(&[0xB3, 12, 100]),
            Some(ControlChange {
                channel: 3,
                controller: 12,
                value: 100
            })
        );
        assert_eq!(parse_control_change(&[0x90, 60, 100]), None);
        assert_eq!(parse_control_change(&[0xB0, 12]), None);
        assert_eq!(parse_control_change(&[0xB0, 12, 0x80]), None);
    }

    #[test]
    fn axis_messages_publish_latest_pair() {
        let (mut router, cell, _) = router();
        router.handle_message(ms(0), &cc(12, 90));
        router.handle_message(ms(1), &cc(13, 20));
        let sample = cell.latest().expect("sample");
        assert_eq!((sample.x, sample.y), (90, 20));
    }

    #[test]
    fn unrelated_controllers_are_ignored() {
        let (mut router, cell, queue) = router();
        router.handle_message(ms(0), &cc(92, 127));
        assert!(cell.latest().is_none());
        assert!(queue.is_empty());
    }

    #[test]
    fn entering_a_region_emits_one_tap() {
        let (mut router, _, queue) = router();
        router.handle_message(ms(0), &cc(12, 64));
        router.handle_message(ms(10), &cc(12, 110));
        router.handle_message(ms(20), &cc(12, 115));
        router.handle_message(ms(30), &cc(12, 120));
        assert_eq!(drain(&queue), vec![DiscreteEvent::PadTap { choice: 0 }]);
    }

    #[test]
    fn lower_region_maps_to_second_choice() {
        let (mut router, _, queue) = router();
        router.handle_message(ms(0), &cc(12, 10));
        assert_eq!(drain(&queue), vec![DiscreteEvent::PadTap { choice: 1 }]);
    }

    #[test]
    fn taps_inside_cooldown_are_suppressed() {
        let (mut router, _, queue) = router();
        router.handle_message(ms(0), &cc(12, 110));
        router.handle_message(ms(50), &cc(12, 64));
        router.handle_message(ms(100), &cc(12, 110));
        router.handle_message(ms(450), &cc(12, 64));
        router.handle_message(ms(500), &cc(12, 110));
        assert_eq!(
            drain(&queue),
            vec![
                DiscreteEvent::PadTap { choice: 0 },
                DiscreteEvent::PadTap { choice: 0 }
            ]
        );
    }

    #[test]
    fn lifting_the_finger_rearms_the_same_region() {
        let (mut router, _, queue) = router();
        router.handle_message(ms(0), &cc(12, 110));
        router.handle_message(ms(1000), &cc(12, 110));
        assert_eq!(drain(&queue).len(), 2);
    }

    #[test]
    fn y_movement_never_taps() {
        let (mut router, _, queue) = router();
        router.handle_message(ms(0), &cc(13, 127));
        router.handle_message(ms(10), &cc(13, 0));
        assert!(queue.is_empty());
    }
}
