use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use super::DiscreteEvent;

static QUEUE_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_queue_lock_poison_once(operation: &'static str) {
    if QUEUE_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "input queue lock poisoned; recovered inner value");
    }
}

#[derive(Debug)]
struct QueueState {
    events: VecDeque<DiscreteEvent>,
    capacity: usize,
    dropped: u64,
}

/// Bounded multi-producer queue of discrete edges, drained once per tick.
/// When full the oldest event is dropped.
#[derive(Clone, Debug)]
pub struct DiscreteEventQueue {
    state: Arc<Mutex<QueueState>>,
}

impl DiscreteEventQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            state: Arc::new(Mutex::new(QueueState {
                events: VecDeque::with_capacity(capacity),
                capacity,
                dropped: 0,
            })),
        }
    }

    pub fn push(&self, event: DiscreteEvent) {
        let mut state = self.lock("push");
        if state.events.len() >= state.capacity {
            if let Some(dropped) = state.events.pop_front() {
                state.dropped = state.dropped.saturating_add(1);
                debug!(?dropped, total_dropped = state.dropped, "input_event_dropped");
            }
        }
        state.events.push_back(event);
    }

    /// Moves all pending events into `out`, preserving arrival order.
    pub fn drain_into(&self, out: &mut Vec<DiscreteEvent>) {
        let mut state = self.lock("drain");
        out.extend(state.events.drain(..));
    }

    pub fn len(&self) -> usize {
        self.lock("len").events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dropped_count(&self) -> u64 {
        self.lock("dropped_count").dropped
    }

    fn lock(&self, operation: &'static str) -> MutexGuard<'_, QueueState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_queue_lock_poison_once(operation);
                poisoned.into_inner()
            }
        }
    }
}
