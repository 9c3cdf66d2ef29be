use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::warn;

use crate::geometry::Vec2;
use crate::input::InputSource;

use super::dialogue::DialogueView;
use super::player::Facing;

static SNAPSHOT_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_snapshot_lock_poison_once(operation: &'static str) {
    if SNAPSHOT_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "snapshot lock poisoned; recovered inner value");
    }
}

/// Immutable view of one simulation step, replaced wholesale every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub sim_time: Duration,
    pub player_position: Vec2,
    pub player_size: f32,
    pub facing: Facing,
    pub current_poi: Option<String>,
    pub dialogue: Option<DialogueView>,
    pub quest_flags: Vec<String>,
    pub won: bool,
    pub idle_warning_active: bool,
    pub idle_for: Duration,
    pub input_source: InputSource,
    pub raw_midi: Option<(u8, u8)>,
}

impl Default for WorldSnapshot {
    fn default() -> Self {
        Self {
            tick: 0,
            sim_time: Duration::ZERO,
            player_position: Vec2::ZERO,
            player_size: 0.0,
            facing: Facing::default(),
            current_poi: None,
            dialogue: None,
            quest_flags: Vec::new(),
            won: false,
            idle_warning_active: false,
            idle_for: Duration::ZERO,
            input_source: InputSource::Keyboard,
            raw_midi: None,
        }
    }
}

/// Publish-by-swap cell shared between the simulation and its readers.
#[derive(Clone, Debug, Default)]
pub struct SnapshotHandle {
    latest: Arc<RwLock<Arc<WorldSnapshot>>>,
}

impl SnapshotHandle {
    pub fn latest(&self) -> Arc<WorldSnapshot> {
        match self.latest.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => {
                warn_snapshot_lock_poison_once("read");
                Arc::clone(&poisoned.into_inner())
            }
        }
    }

    pub(crate) fn publish(&self, snapshot: WorldSnapshot) {
        let snapshot = Arc::new(snapshot);
        match self.latest.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => {
                warn_snapshot_lock_poison_once("write");
                let mut guard = poisoned.into_inner();
                *guard = snapshot;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn poison_lock(lock: &RwLock<Arc<WorldSnapshot>>) {
        thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = lock.write().expect("write guard");
                    panic!("poison snapshot lock");
                })
                .join();
        });
    }

    #[test]
    fn readers_keep_their_snapshot_after_publish() {
        let handle = SnapshotHandle::default();
        let before = handle.latest();
        handle.publish(WorldSnapshot {
            tick: 7,
            ..WorldSnapshot::default()
        });
        assert_eq!(before.tick, 0);
        assert_eq!(handle.latest().tick, 7);
    }

    #[test]
    fn publish_and_read_recover_after_poison() {
        let handle = SnapshotHandle::default();
        poison_lock(handle.latest.as_ref());
        assert_eq!(handle.latest().tick, 0);
        handle.publish(WorldSnapshot {
            tick: 3,
            ..WorldSnapshot::default()
        });
        assert_eq!(handle.latest().tick, 3);
    }
}
