use crate::geometry::{Rect, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Uniform world-to-screen scale that letterboxes the whole world into the
/// viewport. World y grows downward, same as the framebuffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Projection {
    scale: f32,
    offset_x: f32,
    offset_y: f32,
}

impl Projection {
    pub(crate) fn fit(world_size: Vec2, viewport: Viewport) -> Self {
        if world_size.x <= 0.0 || world_size.y <= 0.0 || viewport.width == 0 || viewport.height == 0
        {
            return Self {
                scale: 1.0,
                offset_x: 0.0,
                offset_y: 0.0,
            };
        }
        let scale = (viewport.width as f32 / world_size.x).min(viewport.height as f32 / world_size.y);
        Self {
            scale,
            offset_x: (viewport.width as f32 - world_size.x * scale) * 0.5,
            offset_y: (viewport.height as f32 - world_size.y * scale) * 0.5,
        }
    }

    pub(crate) fn scale(&self) -> f32 {
        self.scale
    }

    pub(crate) fn point(&self, world: Vec2) -> (i32, i32) {
        (
            (world.x * self.scale + self.offset_x).round() as i32,
            (world.y * self.scale + self.offset_y).round() as i32,
        )
    }

    /// Screen rectangle as (x, y, width, height); never narrower than one pixel.
    pub(crate) fn rect(&self, rect: &Rect) -> (i32, i32, i32, i32) {
        let (left, top) = self.point(Vec2::new(rect.x, rect.y));
        let (right, bottom) = self.point(Vec2::new(rect.right(), rect.bottom()));
        (left, top, (right - left).max(1), (bottom - top).max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORLD: Vec2 = Vec2 {
        x: 1024.0,
        y: 768.0,
    };

    #[test]
    fn matching_viewport_is_identity() {
        let projection = Projection::fit(
            WORLD,
            Viewport {
                width: 1024,
                height: 768,
            },
        );
        assert_eq!(projection.point(Vec2::new(100.0, 100.0)), (100, 100));
        assert_eq!(projection.scale(), 1.0);
    }

    #[test]
    fn wide_viewport_is_pillarboxed() {
        let projection = Projection::fit(
            WORLD,
            Viewport {
                width: 2048,
                height: 768,
            },
        );
        assert_eq!(projection.point(Vec2::ZERO), (512, 0));
        assert_eq!(projection.point(WORLD), (1536, 768));
    }

    #[test]
    fn half_size_viewport_halves_rectangles() {
        let projection = Projection::fit(
            WORLD,
            Viewport {
                width: 512,
                height: 384,
            },
        );
        let rect = Rect {
            x: 10.0,
            y: 20.0,
            width: 100.0,
            height: 1.0,
        };
        assert_eq!(projection.rect(&rect), (5, 10, 50, 1));
    }

    #[test]
    fn degenerate_viewport_falls_back_to_unit_scale() {
        let projection = Projection::fit(
            WORLD,
            Viewport {
                width: 0,
                height: 0,
            },
        );
        assert_eq!(projection.scale(), 1.0);
    }
}
