use super::font::{glyph_bits, glyph_pixel, GLYPH_HEIGHT, GLYPH_WIDTH};

pub(crate) type Rgba = [u8; 4];

/// Clipped drawing over an RGBA8 frame. Nothing drawn outside the frame
/// touches memory.
pub(crate) struct Canvas<'a> {
    frame: &'a mut [u8],
    width: i32,
    height: i32,
}

impl<'a> Canvas<'a> {
    pub(crate) fn new(frame: &'a mut [u8], width: u32, height: u32) -> Self {
        let width = width.min(i32::MAX as u32) as i32;
        let height = height.min(i32::MAX as u32) as i32;
        Self {
            frame,
            width,
            height,
        }
    }

    pub(crate) fn width(&self) -> i32 {
        self.width
    }

    pub(crate) fn height(&self) -> i32 {
        self.height
    }

    pub(crate) fn clear(&mut self, color: Rgba) {
        for pixel in self.frame.chunks_exact_mut(4) {
            pixel.copy_from_slice(&color);
        }
    }

    pub(crate) fn put(&mut self, x: i32, y: i32, color: Rgba) {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        if let Some(pixel) = self.frame.get_mut(offset..offset + 4) {
            blend(pixel, color);
        }
    }

    pub(crate) fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: Rgba) {
        let left = x.max(0);
        let top = y.max(0);
        let right = x.saturating_add(width).min(self.width);
        let bottom = y.saturating_add(height).min(self.height);
        for py in top..bottom {
            for px in left..right {
                self.put(px, py, color);
            }
        }
    }

    pub(crate) fn outline_rect(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        thickness: i32,
        color: Rgba,
    ) {
        if width <= 0 || height <= 0 {
            return;
        }
        let t = thickness.clamp(1, width.min(height));
        self.fill_rect(x, y, width, t, color);
        self.fill_rect(x, y + height - t, width, t, color);
        self.fill_rect(x, y + t, t, height - 2 * t, color);
        self.fill_rect(x + width - t, y + t, t, height - 2 * t, color);
    }

    /// Draws `text` with its top-left at (x, y); each glyph pixel becomes a
    /// `scale` x `scale` block.
    pub(crate) fn text(&mut self, x: i32, y: i32, text: &str, scale: i32, color: Rgba) {
        let scale = scale.max(1);
        let mut origin_x = x;
        for ch in text.chars() {
            let bits = glyph_bits(ch);
            for row in 0..GLYPH_HEIGHT {
                for column in 0..GLYPH_WIDTH {
                    if glyph_pixel(bits, column, row) {
                        self.fill_rect(
                            origin_x + column * scale,
                            y + row * scale,
                            scale,
                            scale,
                            color,
                        );
                    }
                }
            }
            origin_x += text_advance(scale);
        }
    }
}

pub(crate) fn text_advance(scale: i32) -> i32 {
    (GLYPH_WIDTH + 1) * scale.max(1)
}

pub(crate) fn line_advance(scale: i32) -> i32 {
    (GLYPH_HEIGHT + 2) * scale.max(1)
}

pub(crate) fn text_width(text: &str, scale: i32) -> i32 {
    text.chars().count() as i32 * text_advance(scale)
}

fn blend(pixel: &mut [u8], color: Rgba) {
    let alpha = color[3] as u16;
    if alpha == 255 {
        pixel.copy_from_slice(&color);
        return;
    }
    for channel in 0..3 {
        let under = pixel[channel] as u16;
        pixel[channel] = ((color[channel] as u16 * alpha + under * (255 - alpha)) / 255) as u8;
    }
    pixel[3] = 255;
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: Rgba = [255, 255, 255, 255];

    fn frame(width: u32, height: u32) -> Vec<u8> {
        vec![0; (width * height * 4) as usize]
    }

    fn pixel(frame: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * width + x) * 4) as usize;
        [
            frame[offset],
            frame[offset + 1],
            frame[offset + 2],
            frame[offset + 3],
        ]
    }

    #[test]
    fn fill_rect_is_clipped_to_frame() {
        let mut buffer = frame(4, 4);
        let mut canvas = Canvas::new(&mut buffer, 4, 4);
        canvas.fill_rect(-10, -10, 100, 100, WHITE);
        assert!(buffer.iter().all(|byte| *byte == 255));
    }

    #[test]
    fn outline_leaves_interior_untouched() {
        let mut buffer = frame(5, 5);
        let mut canvas = Canvas::new(&mut buffer, 5, 5);
        canvas.outline_rect(0, 0, 5, 5, 1, WHITE);
        assert_eq!(pixel(&buffer, 5, 0, 0), WHITE);
        assert_eq!(pixel(&buffer, 5, 4, 2), WHITE);
        assert_eq!(pixel(&buffer, 5, 2, 2), [0, 0, 0, 0]);
    }

    #[test]
    fn translucent_colors_blend() {
        let mut buffer = frame(1, 1);
        let mut canvas = Canvas::new(&mut buffer, 1, 1);
        canvas.clear([0, 0, 0, 255]);
        canvas.put(0, 0, [255, 255, 255, 51]);
        assert_eq!(pixel(&buffer, 1, 0, 0), [51, 51, 51, 255]);
    }

    #[test]
    fn text_never_writes_out_of_bounds() {
        for (width, height) in [(0, 0), (1, 1), (3, 2), (17, 9)] {
            let mut buffer = frame(width, height);
            let mut canvas = Canvas::new(&mut buffer, width, height);
            canvas.text(-5, -5, "HELLO 4000", 3, WHITE);
            canvas.text(10, 4, "~~~~", 2, WHITE);
        }
    }

    #[test]
    fn text_metrics_follow_scale() {
        assert_eq!(text_advance(3), 12);
        assert_eq!(line_advance(3), 21);
        assert_eq!(text_width("abc", 2), 24);
    }
}
