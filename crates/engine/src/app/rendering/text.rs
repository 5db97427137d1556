//! Frame-buffer drawing primitives and a 3x5 bitmap font for the HUD.

pub(crate) const GLYPH_WIDTH: i32 = 3;
pub(crate) const GLYPH_HEIGHT: i32 = 5;
pub(crate) const TEXT_SCALE: i32 = 2;
pub(crate) const GLYPH_ADVANCE: i32 = (GLYPH_WIDTH + 1) * TEXT_SCALE;
pub(crate) const LINE_ADVANCE: i32 = (GLYPH_HEIGHT + 2) * TEXT_SCALE;

const FALLBACK_CHAR: char = '?';

/// Printable ASCII `' '..='~'`, five 3-bit rows per glyph, top row in the
/// high bits.
const ASCII_GLYPHS: [u16; 95] = [
    0x0000, 0x2482, 0x5a00, 0x5f7d, 0x7ddf, 0x52a5, 0x2aab, 0x2400, //
    0x1491, 0x4494, 0x0aa8, 0x05d0, 0x0014, 0x01c0, 0x0002, 0x12a4, //
    0x7b6f, 0x2c97, 0x73e7, 0x73cf, 0x5bc9, 0x79cf, 0x79ef, 0x7292, //
    0x7bef, 0x7bcf, 0x0410, 0x0414, 0x1511, 0x0e38, 0x4454, 0x72c2, //
    0x7be7, 0x2bed, 0x6bae, 0x7927, 0x6b6e, 0x79a7, 0x79a4, 0x796f, //
    0x5bed, 0x7497, 0x726f, 0x5bad, 0x4927, 0x5fed, 0x5ffd, 0x7b6f, //
    0x6ba4, 0x7b79, 0x6bad, 0x79cf, 0x7492, 0x5b6f, 0x5b6a, 0x5bfd, //
    0x5aad, 0x5a92, 0x72a7, 0x6926, 0x4889, 0x324b, 0x2a00, 0x0007, //
    0x4400, 0x0e7f, 0x49ae, 0x0f27, 0x13ef, 0x0fa7, 0x39a4, 0x0f79, //
    0x49ad, 0x2092, 0x106a, 0x4bad, 0x4927, 0x0ded, 0x0d6d, 0x0f6f, //
    0x0d74, 0x0f79, 0x0d64, 0x0f8f, 0x2e93, 0x0b6f, 0x0b6a, 0x0b7a, //
    0x0a95, 0x0b79, 0x0e57, 0x3593, 0x2492, 0x64d6, 0x0780,
];

fn glyph_bits(ch: char) -> u16 {
    let ch = if (' '..='~').contains(&ch) {
        ch
    } else {
        FALLBACK_CHAR
    };
    ASCII_GLYPHS[ch as usize - ' ' as usize]
}

fn glyph_row(bits: u16, row: i32) -> u16 {
    (bits >> (GLYPH_WIDTH * (GLYPH_HEIGHT - 1 - row))) & 0b111
}

/// Mutable view over an RGBA8 frame. Every write is clipped.
pub(crate) struct Canvas<'a> {
    frame: &'a mut [u8],
    width: u32,
    height: u32,
}

impl<'a> Canvas<'a> {
    pub(crate) fn new(frame: &'a mut [u8], width: u32, height: u32) -> Self {
        Self {
            frame,
            width,
            height,
        }
    }

    pub(crate) fn width(&self) -> u32 {
        self.width
    }

    pub(crate) fn height(&self) -> u32 {
        self.height
    }

    pub(crate) fn clear(&mut self, color: [u8; 4]) {
        for chunk in self.frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }

    /// Colors with alpha below 255 are blended over the existing pixel.
    pub(crate) fn put_pixel(&mut self, x: i32, y: i32, color: [u8; 4]) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let Some(dst) = self.frame.get_mut(offset..offset + 4) else {
            return;
        };
        match color[3] {
            0 => {}
            255 => dst.copy_from_slice(&color),
            alpha => {
                let alpha = alpha as u16;
                for channel in 0..3 {
                    let blended =
                        (color[channel] as u16 * alpha + dst[channel] as u16 * (255 - alpha)) / 255;
                    dst[channel] = blended as u8;
                }
                dst[3] = 255;
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * 4;
        let px = self.frame.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    pub(crate) fn fill_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: [u8; 4]) {
        let start_x = x.max(0);
        let start_y = y.max(0);
        let end_x = x.saturating_add(width).min(self.width as i32);
        let end_y = y.saturating_add(height).min(self.height as i32);
        for py in start_y..end_y {
            for px in start_x..end_x {
                self.put_pixel(px, py, color);
            }
        }
    }

    pub(crate) fn outline_rect(&mut self, x: i32, y: i32, width: i32, height: i32, color: [u8; 4]) {
        if width <= 1 || height <= 1 {
            return;
        }
        self.fill_rect(x, y, width, 1, color);
        self.fill_rect(x, y + height - 1, width, 1, color);
        self.fill_rect(x, y, 1, height, color);
        self.fill_rect(x + width - 1, y, 1, height, color);
    }

    /// Copies an RGBA sprite with its top-left corner at `(x, y)`. Fully
    /// transparent texels are skipped.
    pub(crate) fn blit(&mut self, x: i32, y: i32, sprite_width: u32, sprite_height: u32, rgba: &[u8]) {
        if rgba.len() < sprite_width as usize * sprite_height as usize * 4 {
            return;
        }
        let draw_left = x.max(0);
        let draw_top = y.max(0);
        let draw_right = x.saturating_add(sprite_width as i32).min(self.width as i32);
        let draw_bottom = y.saturating_add(sprite_height as i32).min(self.height as i32);
        for out_y in draw_top..draw_bottom {
            let src_row = (out_y - y) as usize * sprite_width as usize;
            for out_x in draw_left..draw_right {
                let src = (src_row + (out_x - x) as usize) * 4;
                self.put_pixel(
                    out_x,
                    out_y,
                    [rgba[src], rgba[src + 1], rgba[src + 2], rgba[src + 3]],
                );
            }
        }
    }

    pub(crate) fn draw_text(&mut self, x: i32, y: i32, text: &str, color: [u8; 4]) {
        let mut pen_x = x;
        for ch in text.chars() {
            self.draw_glyph(pen_x, y, glyph_bits(ch), color);
            pen_x += GLYPH_ADVANCE;
        }
    }

    fn draw_glyph(&mut self, x: i32, y: i32, bits: u16, color: [u8; 4]) {
        for row in 0..GLYPH_HEIGHT {
            let row_bits = glyph_row(bits, row);
            for col in 0..GLYPH_WIDTH {
                if row_bits & (1 << (GLYPH_WIDTH - 1 - col)) == 0 {
                    continue;
                }
                self.fill_rect(
                    x + col * TEXT_SCALE,
                    y + row * TEXT_SCALE,
                    TEXT_SCALE,
                    TEXT_SCALE,
                    color,
                );
            }
        }
    }
}

pub(crate) fn text_width_px(text: &str) -> i32 {
    let count = text.chars().count() as i32;
    if count == 0 {
        0
    } else {
        count * GLYPH_ADVANCE - TEXT_SCALE
    }
}

/// Greedy word wrap to at most `max_chars` per line. Words longer than a
/// line are split.
pub(crate) fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let line_len = line.chars().count();
            let needed = if line.is_empty() { word.len() } else { line_len + 1 + word.len() };
            if needed > max_chars {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.extend(word);
        }
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE: [u8; 4] = [255, 255, 255, 255];

    fn lit_pixels(frame: &[u8]) -> usize {
        frame.chunks_exact(4).filter(|px| px[0] != 0).count()
    }

    #[test]
    fn glyph_table_covers_printable_ascii() {
        assert_eq!(glyph_bits(' '), 0);
        assert_ne!(glyph_bits('~'), 0);
        assert_eq!(glyph_bits('\u{e9}'), glyph_bits('?'));
        // '0' is a closed box with a hollow middle column.
        let zero = glyph_bits('0');
        assert_eq!(glyph_row(zero, 0), 0b111);
        assert_eq!(glyph_row(zero, 2), 0b101);
        assert_eq!(glyph_row(zero, 4), 0b111);
    }

    #[test]
    fn text_draw_clips_at_every_edge() {
        let mut frame = vec![0u8; 16 * 8 * 4];
        let mut canvas = Canvas::new(&mut frame, 16, 8);
        canvas.draw_text(-5, -3, "HELLO", WHITE);
        canvas.draw_text(12, 6, "WORLD", WHITE);
        canvas.draw_text(1000, 1000, "X", WHITE);
        assert!(lit_pixels(&frame) > 0);
    }

    #[test]
    fn zero_sized_canvas_is_safe() {
        let mut frame = Vec::new();
        let mut canvas = Canvas::new(&mut frame, 0, 0);
        canvas.clear(WHITE);
        canvas.fill_rect(0, 0, 10, 10, WHITE);
        canvas.draw_text(0, 0, "A", WHITE);
        assert!(canvas.pixel(0, 0).is_none());
    }

    #[test]
    fn blit_skips_transparent_texels_and_clips() {
        let mut frame = vec![0u8; 4 * 4 * 4];
        let mut canvas = Canvas::new(&mut frame, 4, 4);
        let sprite = [
            255, 0, 0, 255, 0, 0, 0, 0, //
            0, 255, 0, 255, 0, 0, 255, 255,
        ];
        canvas.blit(3, 3, 2, 2, &sprite);
        assert_eq!(canvas.pixel(3, 3), Some([255, 0, 0, 255]));

        canvas.blit(0, 0, 2, 2, &sprite);
        assert_eq!(canvas.pixel(1, 0), Some([0, 0, 0, 0]));
        assert_eq!(canvas.pixel(1, 1), Some([0, 0, 255, 255]));
    }

    #[test]
    fn translucent_fill_blends_with_background() {
        let mut frame = vec![0u8; 4];
        let mut canvas = Canvas::new(&mut frame, 1, 1);
        canvas.clear([200, 0, 0, 255]);
        canvas.put_pixel(0, 0, [0, 0, 0, 128]);
        let [r, _, _, a] = canvas.pixel(0, 0).expect("pixel");
        assert!((98..=101).contains(&r));
        assert_eq!(a, 255);
    }

    #[test]
    fn wrap_text_breaks_on_words_and_splits_long_words() {
        assert_eq!(
            wrap_text("the quick brown fox", 9),
            vec!["the quick", "brown fox"]
        );
        assert_eq!(wrap_text("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap_text("", 10), vec![""]);
        assert_eq!(wrap_text("one\ntwo", 10), vec!["one", "two"]);
    }

    #[test]
    fn text_width_excludes_trailing_gap() {
        assert_eq!(text_width_px(""), 0);
        assert_eq!(text_width_px("A"), GLYPH_WIDTH * TEXT_SCALE);
        assert_eq!(text_width_px("AB"), GLYPH_ADVANCE + GLYPH_WIDTH * TEXT_SCALE);
    }
}
