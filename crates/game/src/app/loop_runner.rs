use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use simcore::AssetLookup;
use tracing::{error, info};

use super::bootstrap::AppWiring;
use super::config::{load_config, GameConfig};
use super::gameplay::{DebugStats, FrameOutput, GameState};
use super::metrics::MetricsAccumulator;
use super::script::ScriptedInput;

#[derive(Debug, Clone, Copy)]
pub(crate) struct LoopSummary {
    pub(crate) frames_run: u64,
    pub(crate) quit_requested: bool,
    pub(crate) final_stats: DebugStats,
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    let config = match load_config() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "startup_failed");
            return ExitCode::FAILURE;
        }
    };

    let summary = run_headless(&config, &app.assets);
    let stats = summary.final_stats;
    info!(
        frames = summary.frames_run,
        quit_requested = summary.quit_requested,
        wood = stats.wood_count,
        gold = stats.gold_count,
        chunks = stats.chunks_allocated,
        entity_blocks = stats.entity_blocks_allocated,
        free_entity_blocks = stats.free_entity_blocks,
        entity_ids = stats.entity_ids_allocated,
        "shutdown"
    );
    ExitCode::SUCCESS
}

/// Fixed-step loop without a window: one sim tick per frame, input from
/// [`ScriptedInput`], optionally paced to the target tick rate.
pub(crate) fn run_headless(config: &GameConfig, assets: &dyn AssetLookup) -> LoopSummary {
    let loop_config = &config.loop_config;
    let target_tps = loop_config.target_tps.max(1);
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let metrics_log_interval = normalize_non_zero_duration(
        Duration::from_millis(loop_config.metrics_log_interval_ms),
        Duration::from_secs(1),
    );
    info!(
        target_tps,
        frame_count = loop_config.frame_count,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        pace_to_real_time = loop_config.pace_to_real_time,
        region_chunk_radius = config.sim.region_chunk_radius,
        max_sim_entities = config.sim.max_sim_entities,
        "loop_config"
    );

    let mut state = GameState::new(config);
    let mut script = ScriptedInput::new(
        &config.script,
        (loop_config.window_width, loop_config.window_height),
        fixed_dt.as_secs_f32(),
    );
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut previous: Option<FrameOutput> = None;
    let mut last_frame_instant = Instant::now();
    let mut summary = LoopSummary {
        frames_run: 0,
        quit_requested: false,
        final_stats: DebugStats::default(),
    };

    while summary.frames_run < loop_config.frame_count {
        let tick_start = Instant::now();
        let input = script.next_input(previous.as_ref());
        let output = state.update_and_render(&input, assets);
        let sim_time = tick_start.elapsed();
        metrics_accumulator.record_tick(sim_time, &output.report);
        summary.frames_run += 1;
        summary.final_stats = output.stats;

        if loop_config.pace_to_real_time {
            let pace_sleep = compute_pace_sleep(sim_time, fixed_dt);
            if pace_sleep > Duration::ZERO {
                thread::sleep(pace_sleep);
            }
        }

        let now = Instant::now();
        metrics_accumulator.record_frame(now.saturating_duration_since(last_frame_instant));
        last_frame_instant = now;
        if let Some(snapshot) = metrics_accumulator.maybe_snapshot(now) {
            info!(
                fps = snapshot.fps,
                tps = snapshot.tps,
                frame_time_ms = snapshot.frame_time_ms,
                sim_time_ms = snapshot.sim_time_ms,
                peak_sim_entities = snapshot.peak_sim_entities,
                migrations = snapshot.migrations,
                deletions = snapshot.deletions,
                sim_chunks = output.stats.sim_chunk_count,
                entity_blocks = output.stats.entity_blocks_allocated,
                pending_orders = output.stats.pending_orders,
                wood = output.stats.wood_count,
                gold = output.stats.gold_count,
                "loop_metrics"
            );
        }

        let quit_requested = output.quit_requested;
        previous = Some(output);
        if quit_requested {
            info!(reason = "quit_action", "shutdown_requested");
            summary.quit_requested = true;
            break;
        }
    }

    summary
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn compute_pace_sleep(elapsed: Duration, target: Duration) -> Duration {
    target.saturating_sub(elapsed)
}

#[cfg(test)]
mod tests {
    use simcore::{SpriteAtlas, Vec2};

    use super::*;
    use crate::app::gameplay::test_support::small_config;

    #[test]
    fn pace_sleep_fills_remaining_tick() {
        let target = Duration::from_millis(16);
        assert_eq!(
            compute_pace_sleep(Duration::from_millis(10), target),
            Duration::from_millis(6)
        );
        assert_eq!(compute_pace_sleep(Duration::from_millis(20), target), Duration::ZERO);
    }

    #[test]
    fn zero_interval_falls_back() {
        let fallback = Duration::from_secs(1);
        assert_eq!(normalize_non_zero_duration(Duration::ZERO, fallback), fallback);
        assert_eq!(
            normalize_non_zero_duration(Duration::from_millis(250), fallback),
            Duration::from_millis(250)
        );
    }

    #[test]
    fn headless_run_executes_configured_frames() {
        let mut config = small_config(vec![Vec2::new(2.0, 0.0), Vec2::new(-2.0, 0.0)]);
        config.loop_config.frame_count = 90;
        config.script.walk_leg_frames = 30;
        let summary = run_headless(&config, &SpriteAtlas::builtin());

        assert_eq!(summary.frames_run, 90);
        assert!(!summary.quit_requested);
        assert_eq!(summary.final_stats.entity_ids_allocated, 4);
        assert_eq!(summary.final_stats.orders_allocated, 0);
    }

    #[test]
    fn headless_run_with_zero_frames_does_nothing() {
        let mut config = small_config(Vec::new());
        config.loop_config.frame_count = 0;
        let summary = run_headless(&config, &SpriteAtlas::builtin());
        assert_eq!(summary.frames_run, 0);
        assert_eq!(summary.final_stats, DebugStats::default());
    }
}
