use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tracing::warn;

static METRICS_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_metrics_lock_poison_once(operation: &'static str) {
    if METRICS_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "metrics lock poisoned; recovered inner value");
    }
}

/// Loop pacing over the last metrics interval.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub tps: f32,
    pub frame_time_ms: f32,
    pub dropped_backlog_ms: f32,
}

#[derive(Clone, Debug, Default)]
pub struct MetricsHandle {
    latest: Arc<RwLock<LoopMetricsSnapshot>>,
}

impl MetricsHandle {
    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        match self.latest.read() {
            Ok(guard) => *guard,
            Err(poisoned) => {
                warn_metrics_lock_poison_once("read");
                *poisoned.into_inner()
            }
        }
    }

    pub(crate) fn publish(&self, snapshot: LoopMetricsSnapshot) {
        match self.latest.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => {
                warn_metrics_lock_poison_once("write");
                *poisoned.into_inner() = snapshot;
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval_start: Instant,
    interval: Duration,
    frames: u32,
    ticks: u32,
    frame_time_sum: Duration,
    dropped_backlog: Duration,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration, now: Instant) -> Self {
        Self {
            interval_start: now,
            interval,
            frames: 0,
            ticks: 0,
            frame_time_sum: Duration::ZERO,
            dropped_backlog: Duration::ZERO,
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration, ticks_run: u32, dropped: Duration) {
        self.frames = self.frames.saturating_add(1);
        self.ticks = self.ticks.saturating_add(ticks_run);
        self.frame_time_sum = self.frame_time_sum.saturating_add(frame_dt);
        self.dropped_backlog = self.dropped_backlog.saturating_add(dropped);
    }

    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = match self.frames {
            0 => 0.0,
            frames => self.frame_time_sum.as_secs_f32() * 1000.0 / frames as f32,
        };
        let snapshot = LoopMetricsSnapshot {
            fps: self.frames as f32 / elapsed_seconds,
            tps: self.ticks as f32 / elapsed_seconds,
            frame_time_ms,
            dropped_backlog_ms: self.dropped_backlog.as_secs_f32() * 1000.0,
        };

        *self = Self::new(self.interval, now);
        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn snapshot_averages_over_interval() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1), base);
        accumulator.record_frame(Duration::from_millis(16), 1, Duration::ZERO);
        accumulator.record_frame(Duration::from_millis(20), 3, Duration::from_millis(5));

        let snapshot = accumulator
            .maybe_snapshot(base + Duration::from_secs(2))
            .expect("interval elapsed");
        assert!((snapshot.fps - 1.0).abs() < 0.01);
        assert!((snapshot.tps - 2.0).abs() < 0.01);
        assert!((snapshot.frame_time_ms - 18.0).abs() < 0.01);
        assert!((snapshot.dropped_backlog_ms - 5.0).abs() < 0.01);
    }

    #[test]
    fn interval_restarts_after_snapshot() {
        let base = Instant::now();
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1), base);
        accumulator.record_frame(Duration::from_millis(16), 1, Duration::ZERO);
        assert!(accumulator
            .maybe_snapshot(base + Duration::from_millis(500))
            .is_none());
        let first = base + Duration::from_secs(1);
        assert!(accumulator.maybe_snapshot(first).is_some());
        let empty = accumulator
            .maybe_snapshot(first + Duration::from_secs(1))
            .expect("second interval");
        assert_eq!(empty.fps, 0.0);
        assert_eq!(empty.frame_time_ms, 0.0);
    }

    #[test]
    fn handle_recovers_after_poison() {
        let handle = MetricsHandle::default();
        thread::scope(|scope| {
            let _ = scope
                .spawn(|| {
                    let _guard = handle.latest.write().expect("write guard");
                    panic!("poison metrics lock");
                })
                .join();
        });

        let expected = LoopMetricsSnapshot {
            fps: 30.0,
            tps: 60.0,
            frame_time_ms: 33.0,
            dropped_backlog_ms: 0.0,
        };
        handle.publish(expected);
        assert_eq!(handle.snapshot(), expected);
    }
}
