use std::time::Duration;

use crate::app::LoopMetricsSnapshot;
use crate::sim::WorldSnapshot;

use super::canvas::{line_advance, text_width, Canvas, Rgba};

const TEXT_SCALE: i32 = 3;
const OVERLAY_PADDING: i32 = 6 * TEXT_SCALE;
const OVERLAY_PANEL_INSET_X: i32 = 4 * TEXT_SCALE;
const OVERLAY_PANEL_INSET_Y: i32 = 3 * TEXT_SCALE;
const OVERLAY_TEXT_PRIMARY_COLOR: Rgba = [244, 248, 252, 255];
const OVERLAY_TEXT_DIM_COLOR: Rgba = [176, 198, 220, 255];
const OVERLAY_PANEL_BG_COLOR: Rgba = [10, 12, 16, 210];
const OVERLAY_PANEL_BORDER_COLOR: Rgba = [92, 106, 126, 255];
const PERF_SECTION_LABEL: &str = "Perf";
const STATE_SECTION_LABEL: &str = "State";
const INPUT_SECTION_LABEL: &str = "Input";

/// Loop-side values the snapshot does not carry.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlayData {
    pub metrics: LoopMetricsSnapshot,
    pub render_fps_cap: Option<u32>,
    pub dropped_events: u64,
}

pub(crate) fn draw_debug_overlay(
    canvas: &mut Canvas<'_>,
    snapshot: &WorldSnapshot,
    data: &OverlayData,
) {
    if canvas.width() == 0 || canvas.height() == 0 {
        return;
    }

    let lines = build_overlay_lines(snapshot, data);
    let longest = lines
        .iter()
        .map(|line| text_width(line, TEXT_SCALE))
        .max()
        .unwrap_or(0);
    let panel_width = longest + OVERLAY_PANEL_INSET_X * 2;
    let panel_height = lines.len() as i32 * line_advance(TEXT_SCALE) + OVERLAY_PANEL_INSET_Y * 2;
    let panel_left = OVERLAY_PADDING - OVERLAY_PANEL_INSET_X;
    let panel_top = OVERLAY_PADDING - OVERLAY_PANEL_INSET_Y;
    canvas.fill_rect(
        panel_left,
        panel_top,
        panel_width,
        panel_height,
        OVERLAY_PANEL_BG_COLOR,
    );
    canvas.outline_rect(
        panel_left,
        panel_top,
        panel_width,
        panel_height,
        1,
        OVERLAY_PANEL_BORDER_COLOR,
    );

    let mut y = OVERLAY_PADDING;
    for line in &lines {
        canvas.text(OVERLAY_PADDING, y, line, TEXT_SCALE, overlay_line_color(line));
        y += line_advance(TEXT_SCALE);
    }
}

fn build_overlay_lines(snapshot: &WorldSnapshot, data: &OverlayData) -> Vec<String> {
    let flags = if snapshot.quest_flags.is_empty() {
        "none".to_string()
    } else {
        snapshot.quest_flags.join(",")
    };
    vec![
        PERF_SECTION_LABEL.to_string(),
        format_fps_line(data.metrics.fps, data.render_fps_cap),
        format!("TPS: {:.1}", data.metrics.tps),
        format!("Frame: {:.2} ms", data.metrics.frame_time_ms),
        format!("Backlog drop: {:.0} ms", data.metrics.dropped_backlog_ms),
        String::new(),
        STATE_SECTION_LABEL.to_string(),
        format!(
            "tick {} t={}",
            snapshot.tick,
            format_seconds(snapshot.sim_time)
        ),
        format!(
            "pos: {:.1},{:.1} {}",
            snapshot.player_position.x,
            snapshot.player_position.y,
            snapshot.facing.label()
        ),
        format!(
            "poi: {}",
            snapshot.current_poi.as_deref().unwrap_or("none")
        ),
        format!("flags: {flags}"),
        format!(
            "idle: {}{}",
            format_seconds(snapshot.idle_for),
            if snapshot.idle_warning_active {
                " WARN"
            } else {
                ""
            }
        ),
        String::new(),
        INPUT_SECTION_LABEL.to_string(),
        format!("src: {}", snapshot.input_source.label()),
        match snapshot.raw_midi {
            Some((x, y)) => format!("midi: {x},{y}"),
            None => "midi: none".to_string(),
        },
        format!("dropped: {}", data.dropped_events),
    ]
}

fn overlay_line_color(line: &str) -> Rgba {
    if matches!(
        line,
        PERF_SECTION_LABEL | STATE_SECTION_LABEL | INPUT_SECTION_LABEL
    ) {
        OVERLAY_TEXT_DIM_COLOR
    } else {
        OVERLAY_TEXT_PRIMARY_COLOR
    }
}

fn format_fps_line(current_fps: f32, cap: Option<u32>) -> String {
    let cap_text = match cap {
        Some(value) => value.to_string(),
        None => "inf".to_string(),
    };
    format!("[{current_fps:.0} / {cap_text}]")
}

fn format_seconds(duration: Duration) -> String {
    format!("{:.1}s", duration.as_secs_f32())
}
