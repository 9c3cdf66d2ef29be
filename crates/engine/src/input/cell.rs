use std::sync::atomic::{AtomicU64, Ordering};

/// Latest X/Y pair from the continuous channel. `sequence` increases with
/// every publish so the reader can tell a fresh sample from a re-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinuousSample {
    pub x: u8,
    pub y: u8,
    pub sequence: u32,
}

/// Single-slot, last-value-wins cell written from the MIDI callback thread
/// and read once per simulation tick. Layout: `sequence << 32 | x << 8 | y`.
/// Sequence 0 means nothing was ever published.
#[derive(Debug, Default)]
pub struct ContinuousCell {
    slot: AtomicU64,
}

impl ContinuousCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, x: u8, y: u8) {
        let _ = self
            .slot
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |previous| {
                let next_sequence = match unpack(previous).sequence.wrapping_add(1) {
                    0 => 1,
                    sequence => sequence,
                };
                Some(pack(next_sequence, x, y))
            });
    }

    pub fn latest(&self) -> Option<ContinuousSample> {
        let sample = unpack(self.slot.load(Ordering::Acquire));
        (sample.sequence != 0).then_some(sample)
    }
}

fn pack(sequence: u32, x: u8, y: u8) -> u64 {
    ((sequence as u64) << 32) | ((x as u64) << 8) | y as u64
}

fn unpack(bits: u64) -> ContinuousSample {
    ContinuousSample {
        x: ((bits >> 8) & 0xff) as u8,
        y: (bits & 0xff) as u8,
        sequence: (bits >> 32) as u32,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn empty_cell_has_no_sample() {
        assert!(ContinuousCell::new().latest().is_none());
    }

    #[test]
    fn last_value_wins_and_sequence_advances() {
        let cell = ContinuousCell::new();
        cell.publish(10, 20);
        let first = cell.latest().expect("first");
        cell.publish(30, 40);
        cell.publish(128, 127);
        let latest = cell.latest().expect("latest");

        assert_eq!((latest.x, latest.y), (128, 127));
        assert_eq!(latest.sequence, first.sequence + 2);
    }

    #[test]
    fn rereading_without_publish_keeps_sequence() {
        let cell = ContinuousCell::new();
        cell.publish(1, 2);
        assert_eq!(cell.latest(), cell.latest());
    }

    #[test]
    fn concurrent_writers_never_tear_pairs() {
        let cell = Arc::new(ContinuousCell::new());
        thread::scope(|scope| {
            for value in [10u8, 90u8] {
                let cell = Arc::clone(&cell);
                scope.spawn(move || {
                    for _ in 0..1000 {
                        cell.publish(value, value);
                    }
                });
            }
        });
        let latest = cell.latest().expect("sample");
        assert_eq!(latest.x, latest.y);
        assert_eq!(latest.sequence, 2000);
    }
}
