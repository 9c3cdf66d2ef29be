use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::input::{ContinuousCell, DiscreteEvent, DiscreteEventQueue, InputNormalizer};

use super::snapshot::SnapshotHandle;
use super::world::{World, WorldEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StepPlan {
    pub(crate) ticks_to_run: u32,
    pub(crate) remaining_accumulator: Duration,
    pub(crate) dropped_backlog: Duration,
}

pub(crate) fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;
    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator -= fixed_dt;
        ticks_to_run += 1;
    }

    // Past the cap the backlog is thrown away rather than carried forward.
    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::take(&mut accumulator)
    } else {
        Duration::ZERO
    };
    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}

pub(crate) fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

/// Result of feeding one frame's elapsed time into the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdvanceReport {
    pub ticks_run: u32,
    pub dropped_backlog: Duration,
}

/// Fixed-timestep driver. Owns the world; input producers only reach it
/// through the continuous cell and the discrete queue, and readers only
/// through published snapshots.
#[derive(Debug)]
pub struct GameLoop {
    world: World,
    normalizer: InputNormalizer,
    continuous: Arc<ContinuousCell>,
    discrete: DiscreteEventQueue,
    snapshots: SnapshotHandle,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
    accumulator: Duration,
    sim_time: Duration,
    tick: u64,
    drained: Vec<DiscreteEvent>,
}

impl GameLoop {
    pub fn new(
        world: World,
        normalizer: InputNormalizer,
        continuous: Arc<ContinuousCell>,
        discrete: DiscreteEventQueue,
        target_tps: u32,
        max_ticks_per_frame: u32,
    ) -> Self {
        let fixed_dt = Duration::from_secs_f64(1.0 / target_tps.max(1) as f64);
        let game_loop = Self {
            world,
            normalizer,
            continuous,
            discrete,
            snapshots: SnapshotHandle::default(),
            fixed_dt,
            max_ticks_per_frame: max_ticks_per_frame.max(1),
            accumulator: Duration::ZERO,
            sim_time: Duration::ZERO,
            tick: 0,
            drained: Vec::new(),
        };
        game_loop.publish();
        game_loop
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn snapshots(&self) -> SnapshotHandle {
        self.snapshots.clone()
    }

    pub fn fixed_dt(&self) -> Duration {
        self.fixed_dt
    }

    pub fn sim_time(&self) -> Duration {
        self.sim_time
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Adds `frame_dt` to the accumulator and runs every whole step it covers,
    /// up to the per-frame cap.
    pub fn advance(&mut self, frame_dt: Duration) -> AdvanceReport {
        self.accumulator = self.accumulator.saturating_add(frame_dt);
        let plan = plan_sim_steps(self.accumulator, self.fixed_dt, self.max_ticks_per_frame);
        self.accumulator = plan.remaining_accumulator;
        for _ in 0..plan.ticks_to_run {
            self.step();
        }
        if !plan.dropped_backlog.is_zero() {
            warn!(
                dropped_backlog_ms = plan.dropped_backlog.as_secs_f64() * 1000.0,
                max_ticks_per_frame = self.max_ticks_per_frame,
                "sim_backlog_dropped"
            );
        }
        AdvanceReport {
            ticks_run: plan.ticks_to_run,
            dropped_backlog: plan.dropped_backlog,
        }
    }

    /// Runs exactly one simulation step and publishes its snapshot.
    pub fn step(&mut self) -> Vec<WorldEvent> {
        self.tick += 1;
        self.sim_time += self.fixed_dt;

        let sample = self.continuous.latest();
        self.drained.clear();
        self.discrete.drain_into(&mut self.drained);
        let input = self.normalizer.normalize(self.sim_time, sample, &self.drained);
        let events = self
            .world
            .step(self.sim_time, self.fixed_dt, &input)
            .to_vec();

        self.publish();
        events
    }

    fn publish(&self) {
        let mut snapshot = self.world.snapshot(self.tick, self.sim_time);
        snapshot.input_source = self.normalizer.active_source();
        snapshot.raw_midi = self.normalizer.raw_sample();
        self.snapshots.publish(snapshot);
    }
}
