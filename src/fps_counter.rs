use std::rc::Rc;

use crate::{
    error::{Error, Result},
    render::Renderer,
    spriteset::Spriteset,
};

/// Draws `num` with `digits` digits (zero padded, with a leading '-' when
/// negative). The font is laid out in ASCII order starting at '!', whose
/// tile index is `first_tile`.
pub fn draw_number(
    renderer: &mut dyn Renderer,
    spriteset: &Spriteset,
    mut x: i32,
    y: i32,
    num: i32,
    digits: u32,
    first_tile: i32,
) -> Result<()> {
    let (tile_width, _) = spriteset.tile_size();
    let glyph = |c: u8| c as i32 - b'!' as i32 + first_tile;

    if num < 0 {
        renderer.draw_tile(spriteset, x, y, glyph(b'-'), false)?;
        x += tile_width as i32;
    }
    let num = num.unsigned_abs();
    let mut div = 10u32.saturating_pow(digits.max(1) - 1);
    while div > 0 {
        let digit = (num / div % 10) as u8;
        renderer.draw_tile(spriteset, x, y, glyph(b'0' + digit), false)?;
        x += tile_width as i32;
        div /= 10;
    }
    Ok(())
}

/// Counts updates and draws over each second of game time and overlays
/// them, plus how long the last frame took to draw.
#[derive(Default)]
pub struct FpsCounter {
    font: Option<(Rc<Spriteset>, i32)>,
    updates: u32,
    draws: u32,
    window_ms: u32,
    ups: u32,
    dps: u32,
    draw_start: f64,
}

impl FpsCounter {
    pub fn init(&mut self, font: Rc<Spriteset>, first_tile: i32) -> Result<()> {
        if first_tile <= 0 {
            return Err(Error::ArgumentsBad("first tile must be positive"));
        }
        self.font = Some((font, first_tile));
        Ok(())
    }

    pub fn count_update(&mut self) {
        self.updates += 1;
    }

    pub fn count_draw(&mut self) {
        self.draws += 1;
    }

    /// Closes the counting window once a full second has elapsed.
    pub fn tick(&mut self, elapsed_ms: u32) {
        self.window_ms += elapsed_ms;
        if self.window_ms >= 1000 {
            self.ups = self.updates;
            self.dps = self.draws;
            self.updates = 0;
            self.draws = 0;
            self.window_ms %= 1000;
        }
    }

    pub fn updates_per_second(&self) -> u32 {
        self.ups
    }

    pub fn draws_per_second(&self) -> u32 {
        self.dps
    }

    pub fn begin_draw(&mut self, now_ms: f64) {
        self.draw_start = now_ms;
    }

    pub fn draw(&self, renderer: &mut dyn Renderer, now_ms: f64) -> Result<()> {
        let (font, first_tile) = self.font.as_ref().ok_or(Error::FpsCounterNotInitialized)?;
        let (_, tile_height) = font.tile_size();
        let line = tile_height as i32;
        let draw_ms = (now_ms - self.draw_start).max(0.) as i32;

        draw_number(renderer, font, 0, 0, self.dps as i32, 3, *first_tile)?;
        draw_number(renderer, font, 0, line, self.ups as i32, 3, *first_tile)?;
        draw_number(renderer, font, 0, 2 * line, draw_ms, 4, *first_tile)
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

    fn font(renderer: &mut Recorder) -> Spriteset {
        let texture = renderer.add_texture(RgbaImage::new(64, 64)).unwrap();
        Spriteset::new(texture, 8, 8).unwrap()
    }

    #[test]
    fn test_draw_number_pads_and_signs() {
        let mut rec = Recorder::default();
        let sset = font(&mut rec);
        // '0' sits 15 tiles after '!'
        draw_number(&mut rec, &sset, 0, 0, -42, 3, 1).unwrap();
        assert_eq!(rec.tiles, vec![(0, 0, 13), (8, 0, 16), (16, 0, 20), (24, 0, 18)]);
    }

    #[test]
    fn test_counts_per_second() {
        let mut counter = FpsCounter::default();
        for _ in 0..3 {
            counter.count_update();
        }
        counter.count_draw();
        counter.tick(999);
        assert_eq!(counter.updates_per_second(), 0);
        counter.tick(1);
        assert_eq!(counter.updates_per_second(), 3);
        assert_eq!(counter.draws_per_second(), 1);
    }

    #[test]
    fn test_draw_requires_font() {
        let mut rec = Recorder::default();
        let counter = FpsCounter::default();
        assert!(matches!(
            counter.draw(&mut rec, 0.),
            Err(Error::FpsCounterNotInitialized)
        ));
        let mut counter = FpsCounter::default();
        let sset = Rc::new(font(&mut rec));
        assert!(counter.init(Rc::clone(&sset), 0).is_err());
        counter.init(sset, 1).unwrap();
        counter.begin_draw(10.);
        counter.draw(&mut rec, 15.).unwrap();
        assert_eq!(rec.tiles.len(), 10);
        assert_eq!(rec.tiles[9], (24, 16, 21));
    }
}
