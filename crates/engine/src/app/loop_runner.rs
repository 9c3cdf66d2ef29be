use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use crate::content::{load_content, ContentError};
use crate::geometry::{MapGeometryIndex, MapLoadError, TmxMapSource};
use crate::input::{ContinuousCell, DiscreteEventQueue, InputNormalizer};
use crate::sim::{clamp_frame_delta, GameLoop, SimConfig, World};
use crate::{resolve_app_paths, StartupError};

use super::keyboard::KeyboardCollector;
use super::metrics::MetricsAccumulator;
use super::{MetricsHandle, OverlayData, Renderer};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub max_render_fps: Option<u32>,
    /// File names below the assets directory.
    pub map_file: String,
    pub dialogue_file: String,
    pub quests_file: String,
    /// Substring of the preferred MIDI input port name.
    pub midi_port_hint: Option<String>,
    pub event_queue_capacity: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Tarmac Festival".to_string(),
            window_width: 1024,
            window_height: 768,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            max_render_fps: None,
            map_file: "map.tmx".to_string(),
            dialogue_file: "dialogue.json".to_string(),
            quests_file: "quests.json".to_string(),
            midi_port_hint: None,
            event_queue_capacity: 64,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error(transparent)]
    Map(#[from] MapLoadError),
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ContentPaths {
    map: PathBuf,
    dialogue: PathBuf,
    quests: PathBuf,
}

impl ContentPaths {
    fn under(assets_dir: &Path, config: &LoopConfig) -> Self {
        Self {
            map: assets_dir.join(&config.map_file),
            dialogue: assets_dir.join(&config.dialogue_file),
            quests: assets_dir.join(&config.quests_file),
        }
    }
}

pub fn run_app(config: LoopConfig, sim: SimConfig) -> Result<(), AppError> {
    run_app_with_metrics(config, sim, MetricsHandle::default())
}

pub fn run_app_with_metrics(
    config: LoopConfig,
    sim: SimConfig,
    metrics_handle: MetricsHandle,
) -> Result<(), AppError> {
    let app_paths = resolve_app_paths()?;
    let paths = ContentPaths::under(&app_paths.assets_dir, &config);
    info!(
        root = %app_paths.root.display(),
        assets_dir = %app_paths.assets_dir.display(),
        "startup"
    );

    let map_source = TmxMapSource::new(&paths.map);
    info!(map = %map_source.path().display(), "map_loading");
    let map = Arc::new(MapGeometryIndex::load(&map_source)?);
    let content = load_content(&paths.dialogue, &paths.quests, &map)?;

    let queue = DiscreteEventQueue::with_capacity(config.event_queue_capacity);
    let cell = Arc::new(ContinuousCell::new());
    #[cfg(feature = "midi")]
    let _midi = open_midi(
        config.midi_port_hint.as_deref(),
        sim,
        Arc::clone(&cell),
        queue.clone(),
    );
    #[cfg(not(feature = "midi"))]
    info!("midi_disabled_keyboard_only");

    let target_tps = config.target_tps.max(1);
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let world = World::new(
        Arc::clone(&map),
        Arc::new(content.dialogue),
        content.quests,
        sim,
    );
    let mut game_loop = GameLoop::new(
        world,
        InputNormalizer::new(sim.input),
        cell,
        queue.clone(),
        target_tps,
        max_ticks_per_frame,
    );
    let snapshots = game_loop.snapshots();

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(Arc::clone(&window)).map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let effective_render_cap = normalize_render_fps_cap(config.max_render_fps);
    let render_frame_target = target_frame_duration(effective_render_cap);
    let world_size = sim.player.world_size;
    let mut keyboard = KeyboardCollector::new(queue.clone());

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        render_fps_cap = %format_render_cap(effective_render_cap),
        "loop_config"
    );

    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval, Instant::now());
    let mut overlay_visible = false;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    keyboard.mark_quit_requested();
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::Focused(false) => {
                    keyboard.release_held_keys();
                    info!("window_focus_lost");
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    keyboard.handle_keyboard_input(&event);
                    if keyboard.quit_requested() {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    if keyboard.take_overlay_toggle_pressed() {
                        overlay_visible = !overlay_visible;
                        info!(overlay_visible, "overlay_toggled");
                    }

                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    let report = game_loop.advance(clamp_frame_delta(raw_frame_dt, max_frame_delta));

                    let elapsed_since_last_present =
                        Instant::now().saturating_duration_since(last_present_instant);
                    let cap_sleep =
                        compute_cap_sleep(elapsed_since_last_present, render_frame_target);
                    if cap_sleep > Duration::ZERO {
                        thread::sleep(cap_sleep);
                    }

                    let snapshot = snapshots.latest();
                    let overlay = overlay_visible.then(|| OverlayData {
                        metrics: metrics_handle.snapshot(),
                        render_fps_cap: effective_render_cap,
                        dropped_events: queue.dropped_count(),
                    });
                    if let Err(error) =
                        renderer.render(&snapshot, &map, world_size, overlay.as_ref())
                    {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    last_present_instant = Instant::now();

                    metrics_accumulator.record_frame(
                        raw_frame_dt,
                        report.ticks_run,
                        report.dropped_backlog,
                    );
                    if let Some(metrics) = metrics_accumulator.maybe_snapshot(now) {
                        metrics_handle.publish(metrics);
                        info!(
                            fps = metrics.fps,
                            tps = metrics.tps,
                            frame_time_ms = metrics.frame_time_ms,
                            tick = snapshot.tick,
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                info!(
                    tick = game_loop.tick(),
                    sim_time_s = game_loop.sim_time().as_secs_f64(),
                    "shutdown"
                );
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

#[cfg(feature = "midi")]
fn open_midi(
    port_hint: Option<&str>,
    sim: SimConfig,
    cell: Arc<ContinuousCell>,
    queue: DiscreteEventQueue,
) -> Option<crate::input::MidiConnection> {
    let router = crate::input::MidiRouter::new(sim.pad, cell, queue);
    match crate::input::connect_midi_input(port_hint, router) {
        Ok(connection) => {
            info!(port = connection.port_name(), "midi_input_active");
            Some(connection)
        }
        Err(error) => {
            warn!(error = %error, "midi_unavailable_keyboard_only");
            None
        }
    }
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}
