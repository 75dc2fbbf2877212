use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use crate::content::{build_or_load_rarity_table, ContentPipelineError, TablePlanRequest};
use crate::{resolve_app_paths, StartupError};

use super::console::{ConsoleCommandProcessor, ConsoleState, ControlCommand};
use super::metrics::MetricsAccumulator;
use super::session::{RemoteLinePump, Session, SessionCommand};
use super::MetricsHandle;

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub telemetry_interval_ticks: u64,
    pub table_plan_request: TablePlanRequest,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            telemetry_interval_ticks: 30,
            table_plan_request: TablePlanRequest::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to build or load rarity table: {0}")]
    ContentPipeline(#[from] ContentPipelineError),
}

pub fn run_app(
    config: LoopConfig,
    session: Box<dyn Session>,
    pump: Box<dyn RemoteLinePump>,
) -> Result<(), AppError> {
    let metrics_handle = MetricsHandle::default();
    run_app_with_metrics(config, session, pump, metrics_handle)
}

pub fn run_app_with_metrics(
    config: LoopConfig,
    mut session: Box<dyn Session>,
    mut pump: Box<dyn RemoteLinePump>,
    metrics_handle: MetricsHandle,
) -> Result<(), AppError> {
    let app_paths = resolve_app_paths()?;
    info!(
        root = %app_paths.root.display(),
        base_tables_dir = %app_paths.base_tables_dir.display(),
        packs_dir = %app_paths.packs_dir.display(),
        cache_dir = %app_paths.cache_dir.display(),
        "startup"
    );
    let table = build_or_load_rarity_table(&app_paths, &config.table_plan_request)?;
    info!(
        def_count = table.defs().len(),
        override_count = table.overrides().len(),
        "table_loaded"
    );
    session.load(&app_paths, table);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        telemetry_interval_ticks = config.telemetry_interval_ticks,
        pump = %pump.status_line(),
        "loop_config"
    );

    let mut console = ConsoleState::default();
    let mut processor = ConsoleCommandProcessor::new();
    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut tick_index: u64 = 0;
    let mut polled_lines = Vec::<String>::new();
    let mut commands = Vec::<ControlCommand>::new();
    let mut output_lines = Vec::<String>::new();
    let mut quit_requested = false;

    while !quit_requested {
        let frame_start = Instant::now();
        let raw_frame_dt = frame_start.saturating_duration_since(last_frame_instant);
        last_frame_instant = frame_start;

        let clamped_frame_dt = clamp_frame_delta(raw_frame_dt, max_frame_delta);
        accumulator = accumulator.saturating_add(clamped_frame_dt);

        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
        for _ in 0..step_plan.ticks_to_run {
            let tick_start = Instant::now();

            polled_lines.clear();
            pump.poll_lines(&mut polled_lines);
            for line in polled_lines.drain(..) {
                console.push_pending_line(line);
            }
            processor.process_pending_lines(&mut console);
            commands.clear();
            processor.drain_pending_control_commands_into(&mut commands);

            let command = session.update(fixed_dt_seconds, &commands, &mut console);
            if command == SessionCommand::Quit {
                info!(reason = "quit_command", "shutdown_requested");
                quit_requested = true;
            }

            output_lines.clear();
            console.drain_output_lines_into(&mut output_lines);
            if !output_lines.is_empty() {
                pump.send_output_lines(&output_lines);
            }

            tick_index = tick_index.saturating_add(1);
            if config.telemetry_interval_ticks > 0
                && tick_index % config.telemetry_interval_ticks == 0
            {
                if let Some(frame) = session.telemetry_frame(tick_index) {
                    pump.send_telemetry_frame(&frame);
                }
            }

            metrics_accumulator.record_tick(tick_start.elapsed());
            if quit_requested {
                break;
            }
        }
        accumulator = step_plan.remaining_accumulator;

        if step_plan.dropped_backlog > Duration::ZERO {
            warn!(
                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                max_ticks_per_frame, "sim_clamp_triggered"
            );
        }

        metrics_accumulator.record_iteration();
        if let Some(snapshot) = metrics_accumulator.maybe_snapshot(Instant::now()) {
            metrics_handle.publish(snapshot);
            info!(
                tps = snapshot.tps,
                loop_hz = snapshot.loop_hz,
                tick_time_ms = snapshot.tick_time_ms,
                "loop_metrics"
            );
        }

        // Single pacing sleep point; keeps idle CPU flat while preserving
        // the accumulator-driven tick rate.
        if !quit_requested {
            let pacing_sleep = compute_pacing_sleep(frame_start.elapsed(), fixed_dt);
            if pacing_sleep > Duration::ZERO {
                thread::sleep(pacing_sleep);
            }
        }
    }

    session.unload();
    info!("shutdown");
    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        let dropped_backlog = accumulator;
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn compute_pacing_sleep(elapsed: Duration, fixed_dt: Duration) -> Duration {
    if elapsed >= fixed_dt {
        Duration::ZERO
    } else {
        fixed_dt - elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        let raw_frame_dt = Duration::from_millis(600);

        assert_eq!(
            clamp_frame_delta(raw_frame_dt, max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(48), fixed_dt, 5);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(120), fixed_dt, 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn plan_sim_steps_keeps_sub_tick_remainder() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(20), fixed_dt, 5);

        assert_eq!(result.ticks_to_run, 1);
        assert_eq!(result.remaining_accumulator, Duration::from_millis(4));
    }

    #[test]
    fn normalize_non_zero_duration_replaces_zero() {
        let fallback = Duration::from_secs(1);
        assert_eq!(
            normalize_non_zero_duration(Duration::ZERO, fallback),
            fallback
        );
        assert_eq!(
            normalize_non_zero_duration(Duration::from_millis(5), fallback),
            Duration::from_millis(5)
        );
    }

    #[test]
    fn compute_pacing_sleep_zero_when_over_budget() {
        let sleep = compute_pacing_sleep(Duration::from_millis(20), Duration::from_millis(16));
        assert_eq!(sleep, Duration::ZERO);
    }

    #[test]
    fn compute_pacing_sleep_positive_when_under_budget() {
        let sleep = compute_pacing_sleep(Duration::from_millis(5), Duration::from_millis(16));
        assert_eq!(sleep, Duration::from_millis(11));
    }
}
