use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use winit::window::Window;

use crate::geometry::{MapGeometryIndex, Rect, Vec2};
use crate::sim::{DialogueView, WorldSnapshot};

use super::canvas::{line_advance, text_advance, text_width, Canvas, Rgba};
use super::overlay::{draw_debug_overlay, OverlayData};
use super::projection::{Projection, Viewport};

const CLEAR_COLOR: Rgba = [18, 16, 26, 255];
const WALKABLE_COLOR: Rgba = [46, 58, 72, 255];
const POI_COLOR: Rgba = [214, 120, 255, 255];
const POI_ACTIVE_COLOR: Rgba = [255, 236, 120, 255];
const POI_LABEL_COLOR: Rgba = [200, 190, 230, 255];
const PLAYER_COLOR: Rgba = [80, 220, 255, 255];
const IDLE_WARNING_COLOR: Rgba = [255, 90, 90, 255];
const WIN_BANNER_BG: Rgba = [10, 12, 16, 220];
const WIN_TEXT_COLOR: Rgba = [120, 255, 160, 255];
const PANEL_BG_COLOR: Rgba = [10, 12, 16, 225];
const PANEL_BORDER_COLOR: Rgba = [92, 106, 126, 255];
const PANEL_TEXT_COLOR: Rgba = [244, 248, 252, 255];
const CHOICE_HIGHLIGHT_COLOR: Rgba = [255, 210, 70, 255];
const CHOICE_GRAYED_COLOR: Rgba = [96, 100, 110, 255];
const LABEL_SCALE: i32 = 2;
const PANEL_SCALE: i32 = 3;
const PANEL_MARGIN: i32 = 24;
const PANEL_INSET: i32 = 12;
const IDLE_BORDER_PX: i32 = 8;
const WIN_TEXT: &str = "HYPERRAUMANTRIEB ONLINE";

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub(crate) fn render(
        &mut self,
        snapshot: &WorldSnapshot,
        map: &MapGeometryIndex,
        world_size: Vec2,
        overlay: Option<&OverlayData>,
    ) -> Result<(), Error> {
        let viewport = self.viewport;
        let mut canvas = Canvas::new(self.pixels.frame_mut(), viewport.width, viewport.height);
        draw_scene(&mut canvas, snapshot, map, Projection::fit(world_size, viewport));
        if let Some(data) = overlay {
            draw_debug_overlay(&mut canvas, snapshot, data);
        }
        self.pixels.render()
    }
}

/// Draws one snapshot. Reads nothing but the snapshot and the immutable map.
pub(crate) fn draw_scene(
    canvas: &mut Canvas<'_>,
    snapshot: &WorldSnapshot,
    map: &MapGeometryIndex,
    projection: Projection,
) {
    canvas.clear(CLEAR_COLOR);

    for area in map.walkable_areas() {
        let (x, y, width, height) = projection.rect(area);
        canvas.outline_rect(x, y, width, height, 1, WALKABLE_COLOR);
    }

    for poi in map.pois() {
        let active = snapshot.current_poi.as_deref() == Some(poi.name.as_str());
        let (x, y, width, height) = projection.rect(&poi.bounds);
        let color = if active { POI_ACTIVE_COLOR } else { POI_COLOR };
        canvas.outline_rect(x, y, width, height, 2, color);
        canvas.text(
            x + 4,
            y + 4,
            &poi.name,
            LABEL_SCALE,
            if active { POI_ACTIVE_COLOR } else { POI_LABEL_COLOR },
        );
    }

    let player = Rect::centered(snapshot.player_position, snapshot.player_size);
    let (x, y, width, height) = projection.rect(&player);
    canvas.fill_rect(x, y, width, height, PLAYER_COLOR);

    if let Some(dialogue) = snapshot.dialogue.as_ref() {
        draw_dialogue_panel(canvas, dialogue);
    }
    if snapshot.won {
        draw_win_banner(canvas);
    }
    if snapshot.idle_warning_active {
        canvas.outline_rect(
            0,
            0,
            canvas.width(),
            canvas.height(),
            IDLE_BORDER_PX,
            IDLE_WARNING_COLOR,
        );
    }
}

fn draw_dialogue_panel(canvas: &mut Canvas<'_>, dialogue: &DialogueView) {
    let panel_width = canvas.width() - PANEL_MARGIN * 2;
    if panel_width <= PANEL_INSET * 2 {
        return;
    }
    let columns = ((panel_width - PANEL_INSET * 2) / text_advance(PANEL_SCALE)).max(1) as usize;
    let mut lines: Vec<(String, Rgba)> = wrap_text(&dialogue.text, columns)
        .into_iter()
        .map(|line| (line, PANEL_TEXT_COLOR))
        .collect();
    lines.push((String::new(), PANEL_TEXT_COLOR));
    for (index, choice) in dialogue.choices.iter().enumerate() {
        let highlighted = dialogue.highlighted == Some(index);
        let marker = if highlighted { ">" } else { " " };
        let color = if !choice.selectable || choice.grayed_out {
            CHOICE_GRAYED_COLOR
        } else if highlighted {
            CHOICE_HIGHLIGHT_COLOR
        } else {
            PANEL_TEXT_COLOR
        };
        for (row, line) in wrap_text(&choice.label, columns.saturating_sub(3).max(1))
            .into_iter()
            .enumerate()
        {
            let prefix = if row == 0 { marker } else { " " };
            lines.push((format!("{prefix} {line}"), color));
        }
    }

    let panel_height = lines.len() as i32 * line_advance(PANEL_SCALE) + PANEL_INSET * 2;
    let panel_top = canvas.height() - PANEL_MARGIN - panel_height;
    canvas.fill_rect(
        PANEL_MARGIN,
        panel_top,
        panel_width,
        panel_height,
        PANEL_BG_COLOR,
    );
    canvas.outline_rect(
        PANEL_MARGIN,
        panel_top,
        panel_width,
        panel_height,
        2,
        PANEL_BORDER_COLOR,
    );

    let mut y = panel_top + PANEL_INSET;
    for (line, color) in &lines {
        canvas.text(PANEL_MARGIN + PANEL_INSET, y, line, PANEL_SCALE, *color);
        y += line_advance(PANEL_SCALE);
    }
}

fn draw_win_banner(canvas: &mut Canvas<'_>) {
    let width = text_width(WIN_TEXT, PANEL_SCALE) + PANEL_INSET * 2;
    let height = line_advance(PANEL_SCALE) + PANEL_INSET * 2;
    let left = (canvas.width() - width) / 2;
    let top = PANEL_MARGIN;
    canvas.fill_rect(left, top, width, height, WIN_BANNER_BG);
    canvas.text(
        left + PANEL_INSET,
        top + PANEL_INSET,
        WIN_TEXT,
        PANEL_SCALE,
        WIN_TEXT_COLOR,
    );
}

/// Greedy word wrap; words longer than `columns` are split.
fn wrap_text(text: &str, columns: usize) -> Vec<String> {
    let columns = columns.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > columns {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..columns).collect());
        }
        let word: String = word.into_iter().collect();
        if word.is_empty() {
            continue;
        }
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > columns {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}
