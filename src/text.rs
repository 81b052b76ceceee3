use std::rc::Rc;

use crate::{
    camera::Camera,
    error::{Error, Result},
    render::Renderer,
    spriteset::Spriteset,
};

/// One byte of the text and where it lands once wrapped.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Cell {
    ch: u8,
    line: usize,
    column: usize,
}

impl Cell {
    fn is_blank(&self) -> bool {
        self.ch == b' ' || self.ch == b'\n'
    }
}

/// Greedy word wrap. Blanks at the start or past the end of a line take no
/// room; a word longer than a whole line is split at the edge.
fn layout(text: &[u8], max_width: usize) -> Vec<Cell> {
    let mut cells = Vec::with_capacity(text.len());
    let (mut line, mut column) = (0, 0);
    let mut i = 0;
    while i < text.len() {
        match text[i] {
            b'\n' => {
                cells.push(Cell { ch: b'\n', line, column });
                line += 1;
                column = 0;
                i += 1;
            }
            b' ' => {
                cells.push(Cell { ch: b' ', line, column });
                if column > 0 && column < max_width {
                    column += 1;
                }
                i += 1;
            }
            _ => {
                let len = text[i..]
                    .iter()
                    .take_while(|&&c| c != b' ' && c != b'\n')
                    .count();
                if column > 0 && column + len > max_width {
                    line += 1;
                    column = 0;
                }
                for &ch in &text[i..i + len] {
                    if column == max_width {
                        line += 1;
                        column = 0;
                    }
                    cells.push(Cell { ch, line, column });
                    column += 1;
                }
                i += len;
            }
        }
    }
    cells
}

/// A block of bitmap-font text that wraps to `max_width` characters, shows
/// at most `max_lines` lines and may reveal itself one character at a time.
///
/// The font is laid out in ASCII order starting at '!', whose tile index is
/// `first_tile`.
pub struct Text {
    font: Rc<Spriteset>,
    first_tile: i32,
    x: i32,
    y: i32,
    max_width: usize,
    max_lines: usize,
    world_bound: bool,
    char_delay: i32,
    word_delay: i32,
    blank_delay: i32,
    cur_delay: i32,
    source: Vec<u8>,
    cells: Vec<Cell>,
    revealed: usize,
    first_line: usize,
    just_rendered: Option<char>,
}

impl Text {
    pub fn new(
        font: Rc<Spriteset>,
        first_tile: i32,
        max_width: usize,
        max_lines: usize,
    ) -> Result<Self> {
        let mut text = Text {
            font,
            first_tile: 0,
            x: 0,
            y: 0,
            max_width: 1,
            max_lines: 1,
            world_bound: false,
            char_delay: 0,
            word_delay: 0,
            blank_delay: 0,
            cur_delay: 0,
            source: Vec::new(),
            cells: Vec::new(),
            revealed: 0,
            first_line: 0,
            just_rendered: None,
        };
        text.set_spriteset(Rc::clone(&text.font), first_tile)?;
        text.set_dimensions(max_width, max_lines)?;
        Ok(text)
    }

    /// Replaces the content and restarts the reveal. With no typing delay
    /// the whole text shows at once.
    pub fn set_text(&mut self, text: &str) -> Result<()> {
        if !text.is_ascii() {
            return Err(Error::ArgumentsBad("text must be ASCII"));
        }
        self.source = text.as_bytes().to_vec();
        self.cells = layout(&self.source, self.max_width);
        self.revealed = 0;
        self.first_line = 0;
        self.cur_delay = 0;
        self.just_rendered = None;
        if self.char_delay <= 0 && !self.cells.is_empty() {
            self.force_finish()?;
        }
        Ok(())
    }

    pub fn set_position(&mut self, x: i32, y: i32) {
        self.x = x;
        self.y = y;
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// Rewraps the current content, keeping how much of it was revealed.
    pub fn set_dimensions(&mut self, max_width: usize, max_lines: usize) -> Result<()> {
        if max_width == 0 || max_lines == 0 {
            return Err(Error::ArgumentsBad("text dimensions must be positive"));
        }
        self.max_width = max_width;
        self.max_lines = max_lines;
        self.cells = layout(&self.source, max_width);
        self.first_line = self.first_line.min(self.last_revealed_line());
        self.follow_reveal();
        Ok(())
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.max_width, self.max_lines)
    }

    /// Milliseconds between characters; zero or less shows everything at
    /// once.
    pub fn set_typing_animation(&mut self, delay: i32) -> Result<()> {
        self.char_delay = delay;
        self.word_delay = delay;
        self.blank_delay = 0;
        if delay <= 0 && !self.cells.is_empty() {
            self.force_finish()?;
        }
        Ok(())
    }

    /// World-bound text scrolls with the camera; screen-bound text stays put.
    pub fn set_render_space(&mut self, world_bound: bool) {
        self.world_bound = world_bound;
    }

    pub fn set_spriteset(&mut self, font: Rc<Spriteset>, first_tile: i32) -> Result<()> {
        if first_tile < 0 {
            return Err(Error::ArgumentsBad("first tile can't be negative"));
        }
        self.font = font;
        self.first_tile = first_tile;
        Ok(())
    }

    pub fn did_finish(&self) -> bool {
        self.revealed == self.cells.len()
    }

    /// Reveals the rest of the text and scrolls to its last line.
    pub fn force_finish(&mut self) -> Result<()> {
        if self.cells.is_empty() {
            return Err(Error::TextNotSet);
        }
        self.revealed = self.cells.len();
        self.cur_delay = 0;
        self.follow_reveal();
        Ok(())
    }

    /// The last visible character revealed by the latest `update`.
    pub fn just_rendered(&self) -> Option<char> {
        self.just_rendered
    }

    /// How many lines the wrapped content takes.
    pub fn line_count(&self) -> usize {
        self.cells.last().map_or(0, |cell| cell.line + 1)
    }

    pub fn first_visible_line(&self) -> usize {
        self.first_line
    }

    pub fn move_line_up(&mut self) -> Result<()> {
        if !self.did_finish() {
            return Err(Error::OperationActive);
        }
        if self.first_line == 0 {
            return Err(Error::TextNoMoreLines);
        }
        self.first_line -= 1;
        Ok(())
    }

    pub fn move_line_down(&mut self) -> Result<()> {
        if !self.did_finish() {
            return Err(Error::OperationActive);
        }
        if self.first_line + self.max_lines >= self.line_count() {
            return Err(Error::TextNoMoreLines);
        }
        self.first_line += 1;
        Ok(())
    }

    /// Advances the typewriter by `ms`. A character ending a word waits
    /// `word_delay`; blanks wait `blank_delay`.
    pub fn update(&mut self, ms: u32) {
        self.just_rendered = None;
        if self.did_finish() {
            return;
        }
        if self.cur_delay > 0 {
            self.cur_delay = self.cur_delay.saturating_sub(ms as i32);
        }
        while self.cur_delay <= 0 && self.revealed < self.cells.len() {
            let cell = self.cells[self.revealed];
            if cell.is_blank() {
                self.cur_delay += self.blank_delay;
            } else {
                let ends_word = self
                    .cells
                    .get(self.revealed + 1)
                    .map_or(true, Cell::is_blank);
                self.cur_delay += if ends_word {
                    self.word_delay
                } else {
                    self.char_delay
                };
                self.just_rendered = Some(cell.ch as char);
            }
            self.revealed += 1;
            self.follow_reveal();
        }
    }

    pub fn draw(&self, renderer: &mut dyn Renderer, camera: &Camera) -> Result<()> {
        let (tile_width, tile_height) = self.font.tile_size();
        let (x, y) = if self.world_bound {
            camera.world_to_screen(self.x, self.y)
        } else {
            (self.x, self.y)
        };
        let last_line = self.first_line + self.max_lines;

        renderer.batch_begin();
        for cell in &self.cells[..self.revealed] {
            if cell.is_blank() || cell.line < self.first_line || cell.line >= last_line {
                continue;
            }
            let tile = cell.ch as i32 - b'!' as i32 + self.first_tile;
            let cx = x + (cell.column as u32 * tile_width) as i32;
            let cy = y + ((cell.line - self.first_line) as u32 * tile_height) as i32;
            renderer.draw_tile(&self.font, cx, cy, tile, false)?;
        }
        renderer.batch_end();
        Ok(())
    }

    fn last_revealed_line(&self) -> usize {
        match self.revealed {
            0 => 0,
            n => self.cells[n - 1].line,
        }
    }

    /// Scrolls down so the newest revealed line stays in view.
    fn follow_reveal(&mut self) {
        let line = self.last_revealed_line();
        if line >= self.first_line + self.max_lines {
            self.first_line = line + 1 - self.max_lines;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Texture;
    use euclid::default::{Rect, Size2D};
    use image::RgbaImage;

    /// Records drawn tiles instead of rasterizing them.
    #[derive(Default)]
    struct Recorder {
        tiles: Vec<(i32, i32, i32)>,
    }

    impl Renderer for Recorder {
        fn add_texture(&mut self, image: RgbaImage) -> Result<Texture> {
            Ok(Texture {
                index: 0,
                size: Size2D::new(image.width(), image.height()),
            })
        }
        fn set_background(&mut self, _color: u32) {}
        fn draw_begin(&mut self) -> Result<()> {
            Ok(())
        }
        fn draw_tile(
            &mut self,
            _spriteset: &Spriteset,
            x: i32,
            y: i32,
            tile: i32,
            _flipped: bool,
        ) -> Result<()> {
            self.tiles.push((x, y, tile));
            Ok(())
        }
        fn draw_rect(&mut self, _rect: Rect<i32>, _color: u32) -> Result<()> {
            Ok(())
        }
        fn draw_end(&mut self) -> Result<()> {
            Ok(())
        }
        fn size(&self) -> Size2D<u32> {
            Size2D::new(1, 1)
        }
    }

    fn text(rec: &mut Recorder, max_width: usize, max_lines: usize) -> Text {
        let texture = rec.add_texture(RgbaImage::new(64, 96)).unwrap();
        let font = Rc::new(Spriteset::new(texture, 8, 8).unwrap());
        Text::new(font, 1, max_width, max_lines).unwrap()
    }

    // 'a' sits 64 tiles after '!'
    const A: i32 = 65;

    #[test]
    fn test_wraps_on_word_boundaries() {
        let mut rec = Recorder::default();
        let camera = Camera::new(64, 64).unwrap();
        let mut txt = text(&mut rec, 5, 2);
        txt.set_text("ab cd efg").unwrap();
        assert!(txt.did_finish());
        assert_eq!(txt.line_count(), 2);

        txt.draw(&mut rec, &camera).unwrap();
        assert_eq!(
            rec.tiles,
            vec![
                (0, 0, A),
                (8, 0, A + 1),
                (24, 0, A + 2),
                (32, 0, A + 3),
                (0, 8, A + 4),
                (8, 8, A + 5),
                (16, 8, A + 6),
            ]
        );

        txt.set_dimensions(9, 2).unwrap();
        assert_eq!(txt.line_count(), 1);
    }

    #[test]
    fn test_long_word_splits_at_edge() {
        let mut rec = Recorder::default();
        let mut txt = text(&mut rec, 5, 3);
        txt.set_text("abcdefg\nh").unwrap();
        assert_eq!(txt.line_count(), 3);
        let camera = Camera::new(64, 64).unwrap();
        txt.draw(&mut rec, &camera).unwrap();
        assert_eq!(rec.tiles[5], (0, 8, A + 5));
        assert_eq!(rec.tiles[7], (0, 16, A + 7));
    }

    #[test]
    fn test_typewriter_reveal() {
        let mut rec = Recorder::default();
        let mut txt = text(&mut rec, 8, 1);
        txt.set_typing_animation(100).unwrap();
        txt.set_text("hi yo").unwrap();
        assert!(!txt.did_finish());

        txt.update(0);
        assert_eq!(txt.just_rendered(), Some('h'));
        txt.update(50);
        assert_eq!(txt.just_rendered(), None);
        txt.update(50);
        assert_eq!(txt.just_rendered(), Some('i'));
        // the blank costs nothing, so 'y' follows right away
        txt.update(100);
        assert_eq!(txt.just_rendered(), Some('y'));
        assert!(!txt.did_finish());

        let camera = Camera::new(64, 64).unwrap();
        txt.draw(&mut rec, &camera).unwrap();
        assert_eq!(rec.tiles.len(), 3);

        txt.force_finish().unwrap();
        assert!(txt.did_finish());
        txt.update(100);
        assert_eq!(txt.just_rendered(), None);
    }

    #[test]
    fn test_scrolling_lines() {
        let mut rec = Recorder::default();
        let mut txt = text(&mut rec, 3, 1);
        txt.set_typing_animation(10).unwrap();
        txt.set_text("aa bb cc").unwrap();
        assert!(matches!(txt.move_line_up(), Err(Error::OperationActive)));

        // the reveal follows onto the second line
        txt.update(0);
        txt.update(10);
        txt.update(10);
        assert_eq!(txt.just_rendered(), Some('b'));
        assert_eq!(txt.first_visible_line(), 1);

        txt.force_finish().unwrap();
        assert_eq!(txt.line_count(), 3);
        assert_eq!(txt.first_visible_line(), 2);
        assert!(matches!(txt.move_line_down(), Err(Error::TextNoMoreLines)));
        txt.move_line_up().unwrap();

        let camera = Camera::new(64, 64).unwrap();
        txt.draw(&mut rec, &camera).unwrap();
        assert_eq!(rec.tiles, vec![(0, 0, A + 1), (8, 0, A + 1)]);
    }

    #[test]
    fn test_world_bound_follows_camera() {
        let mut rec = Recorder::default();
        let mut camera = Camera::new(64, 64).unwrap();
        camera.set_position_unrestricted(10, 4);
        let mut txt = text(&mut rec, 4, 1);
        txt.set_position(20, 20);
        txt.set_text("a").unwrap();

        txt.draw(&mut rec, &camera).unwrap();
        txt.set_render_space(true);
        txt.draw(&mut rec, &camera).unwrap();
        assert_eq!(rec.tiles, vec![(20, 20, A), (10, 16, A)]);
    }

    #[test]
    fn test_rejects_bad_arguments() {
        let mut rec = Recorder::default();
        let mut txt = text(&mut rec, 4, 1);
        assert!(matches!(txt.force_finish(), Err(Error::TextNotSet)));
        assert!(txt.set_dimensions(0, 1).is_err());
        assert!(txt.set_text("caf\u{e9}").is_err());
        assert_eq!(txt.dimensions(), (4, 1));
    }
}
