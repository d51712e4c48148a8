use std::time::{Duration, Instant};

use simcore::SimRegionReport;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct LoopMetricsSnapshot {
    pub(crate) fps: f32,
    pub(crate) tps: f32,
    pub(crate) frame_time_ms: f32,
    /// Mean time spent inside `update_and_render` per tick.
    pub(crate) sim_time_ms: f32,
    pub(crate) peak_sim_entities: usize,
    pub(crate) migrations: usize,
    pub(crate) deletions: usize,
}

/// Interval-based loop counters. Frames are wall-clock iterations of the
/// runner; ticks are sim updates.
#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    interval_start: Instant,
    interval: Duration,
    frames: u32,
    ticks: u32,
    frame_time_sum: Duration,
    sim_time_sum: Duration,
    peak_sim_entities: usize,
    migrations: usize,
    deletions: usize,
}

impl MetricsAccumulator {
    pub(crate) fn new(interval: Duration) -> Self {
        Self::starting_at(Instant::now(), interval)
    }

    pub(crate) fn starting_at(interval_start: Instant, interval: Duration) -> Self {
        Self {
            interval_start,
            interval,
            frames: 0,
            ticks: 0,
            frame_time_sum: Duration::ZERO,
            sim_time_sum: Duration::ZERO,
            peak_sim_entities: 0,
            migrations: 0,
            deletions: 0,
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        self.frames = self.frames.saturating_add(1);
        self.frame_time_sum = self.frame_time_sum.saturating_add(frame_dt);
    }

    pub(crate) fn record_tick(&mut self, sim_time: Duration, report: &SimRegionReport) {
        self.ticks = self.ticks.saturating_add(1);
        self.sim_time_sum = self.sim_time_sum.saturating_add(sim_time);
        self.peak_sim_entities = self.peak_sim_entities.max(report.entity_count);
        self.migrations = self.migrations.saturating_add(report.migrated);
        self.deletions = self.deletions.saturating_add(report.deleted);
    }

    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.interval_start);
        if elapsed < self.interval {
            return None;
        }

        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let snapshot = LoopMetricsSnapshot {
            fps: self.frames as f32 / elapsed_seconds,
            tps: self.ticks as f32 / elapsed_seconds,
            frame_time_ms: mean_ms(self.frame_time_sum, self.frames),
            sim_time_ms: mean_ms(self.sim_time_sum, self.ticks),
            peak_sim_entities: self.peak_sim_entities,
            migrations: self.migrations,
            deletions: self.deletions,
        };

        *self = Self::starting_at(now, self.interval);
        Some(snapshot)
    }
}

fn mean_ms(sum: Duration, count: u32) -> f32 {
    if count == 0 {
        return 0.0;
    }
    (sum.as_secs_f32() / count as f32) * 1000.0
}
