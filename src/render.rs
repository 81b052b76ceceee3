use euclid::default::{Rect, Size2D};
use image::{Rgba, RgbaImage};

use crate::{
    error::{Error, Result},
    spriteset::Spriteset,
};

/// Handle to a texture registered with a renderer.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Texture {
    pub index: usize,
    pub size: Size2D<u32>,
}

/// The rasterizer the framework draws through. Coordinates are in
/// backbuffer pixels, already offset by the camera.
pub trait Renderer {
    fn add_texture(&mut self, image: RgbaImage) -> Result<Texture>;
    fn set_background(&mut self, color: u32);
    fn draw_begin(&mut self) -> Result<()>;
    fn draw_tile(
        &mut self,
        spriteset: &Spriteset,
        x: i32,
        y: i32,
        tile: i32,
        flipped: bool,
    ) -> Result<()>;
    fn draw_rect(&mut self, rect: Rect<i32>, color: u32) -> Result<()>;
    fn draw_end(&mut self) -> Result<()>;
    fn size(&self) -> Size2D<u32>;

    /// Hints that a run of `draw_tile` calls from one spriteset follows.
    fn batch_begin(&mut self) {}
    fn batch_end(&mut self) {}

    /// Pixels of the last finished frame, if the backend can read them.
    fn backbuffer(&self) -> Option<&RgbaImage> {
        None
    }
}

/// Decodes an encoded image (png, bmp, ...) and uploads it.
pub fn load_image(image_bytes: &[u8], renderer: &mut dyn Renderer) -> Result<Texture> {
    let image = image::load_from_memory(image_bytes)?.to_rgba();
    renderer.add_texture(image)
}

/// Like `load_image`, treating one color as fully transparent.
pub fn load_image_keyed(
    image_bytes: &[u8],
    color_key: u32,
    renderer: &mut dyn Renderer,
) -> Result<Texture> {
    let mut image = image::load_from_memory(image_bytes)?.to_rgba();
    let key = to_rgba(color_key | 0xff00_0000);
    for pixel in image.pixels_mut() {
        if pixel[0] == key[0] && pixel[1] == key[1] && pixel[2] == key[2] {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }
    renderer.add_texture(image)
}

/// `0xAARRGGBB` to a pixel.
pub fn to_rgba(color: u32) -> Rgba<u8> {
    Rgba([
        (color >> 16) as u8,
        (color >> 8) as u8,
        color as u8,
        (color >> 24) as u8,
    ])
}

/// Software renderer drawing into an RGBA image.
pub struct Backbuffer {
    image: RgbaImage,
    textures: Vec<RgbaImage>,
    background: Rgba<u8>,
    drawing: bool,
    draw_calls: usize,
}

impl Backbuffer {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::ArgumentsBad("backbuffer dimensions must be positive"));
        }
        Ok(Self {
            image: RgbaImage::new(width, height),
            textures: Vec::new(),
            background: Rgba([0, 0, 0, 255]),
            drawing: false,
            draw_calls: 0,
        })
    }

    /// Draw calls issued since the last `draw_begin`.
    pub fn draw_calls(&self) -> usize {
        self.draw_calls
    }
}

fn put(image: &mut RgbaImage, x: i32, y: i32, pixel: Rgba<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < image.width() && (y as u32) < image.height() {
        image.put_pixel(x as u32, y as u32, pixel);
    }
}

impl Renderer for Backbuffer {
    fn add_texture(&mut self, image: RgbaImage) -> Result<Texture> {
        let texture = Texture {
            index: self.textures.len(),
            size: Size2D::new(image.width(), image.height()),
        };
        log::debug!(
            "Added texture {} ({}x{})",
            texture.index,
            texture.size.width,
            texture.size.height
        );
        self.textures.push(image);
        Ok(texture)
    }

    fn set_background(&mut self, color: u32) {
        self.background = to_rgba(color);
    }

    fn draw_begin(&mut self) -> Result<()> {
        if self.drawing {
            return Err(Error::OperationActive);
        }
        self.drawing = true;
        self.draw_calls = 0;
        let background = self.background;
        for pixel in self.image.pixels_mut() {
            *pixel = background;
        }
        Ok(())
    }

    fn draw_tile(
        &mut self,
        spriteset: &Spriteset,
        x: i32,
        y: i32,
        tile: i32,
        flipped: bool,
    ) -> Result<()> {
        if !self.drawing {
            return Err(Error::OperationNotActive);
        }
        let (sx, sy) = spriteset.position(tile)?;
        let (tw, th) = spriteset.tile_size();
        let index = spriteset.texture().index;
        let source = self.textures.get(index).ok_or(Error::TextureNotLoaded)?;
        let target = &mut self.image;
        for j in 0..th {
            for i in 0..tw {
                let src_x = if flipped { sx + tw - 1 - i } else { sx + i };
                let pixel = *source.get_pixel(src_x, sy + j);
                if pixel[3] == 0 {
                    continue;
                }
                put(target, x + i as i32, y + j as i32, pixel);
            }
        }
        self.draw_calls += 1;
        Ok(())
    }

    fn draw_rect(&mut self, rect: Rect<i32>, color: u32) -> Result<()> {
        if !self.drawing {
            return Err(Error::OperationNotActive);
        }
        self.draw_calls += 1;
        let pixel = to_rgba(color);
        let (x0, y0) = (rect.min_x(), rect.min_y());
        let (x1, y1) = (rect.max_x() - 1, rect.max_y() - 1);
        let target = &mut self.image;
        for x in x0..=x1 {
            put(target, x, y0, pixel);
            put(target, x, y1, pixel);
        }
        for y in y0..=y1 {
            put(target, x0, y, pixel);
            put(target, x1, y, pixel);
        }
        Ok(())
    }

    fn draw_end(&mut self) -> Result<()> {
        if !self.drawing {
            return Err(Error::OperationNotActive);
        }
        self.drawing = false;
        Ok(())
    }

    fn size(&self) -> Size2D<u32> {
        Size2D::new(self.image.width(), self.image.height())
    }

    fn backbuffer(&self) -> Option<&RgbaImage> {
        Some(&self.image)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 16x8 texture: left 8x8 tile red, right tile green with a transparent
    /// top-left pixel.
    pub fn two_tile_texture() -> RgbaImage {
        let mut image = RgbaImage::new(16, 8);
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            *pixel = if x < 8 {
                Rgba([255, 0, 0, 255])
            } else if x == 8 && y == 0 {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([0, 255, 0, 255])
            };
        }
        image
    }

    #[test]
    fn test_draw_tile_blits_and_clips() {
        let mut bb = Backbuffer::new(12, 12).unwrap();
        let texture = bb.add_texture(two_tile_texture()).unwrap();
        let sset = Spriteset::new(texture, 8, 8).unwrap();
        bb.set_background(0xff00_00ff);
        bb.draw_begin().unwrap();
        bb.draw_tile(&sset, 0, 0, 1, false).unwrap();
        bb.draw_tile(&sset, 8, 8, 0, false).unwrap();
        bb.draw_end().unwrap();
        let image = bb.backbuffer().unwrap();
        assert_eq!(*image.get_pixel(0, 0), Rgba([0, 0, 255, 255]));
        assert_eq!(*image.get_pixel(1, 0), Rgba([0, 255, 0, 255]));
        assert_eq!(*image.get_pixel(11, 11), Rgba([255, 0, 0, 255]));
        assert_eq!(bb.draw_calls(), 2);
    }

    #[test]
    fn test_flipped_tile() {
        let mut bb = Backbuffer::new(8, 8).unwrap();
        let texture = bb.add_texture(two_tile_texture()).unwrap();
        let sset = Spriteset::new(texture, 8, 8).unwrap();
        bb.draw_begin().unwrap();
        bb.draw_tile(&sset, 0, 0, 1, true).unwrap();
        bb.draw_end().unwrap();
        let image = bb.backbuffer().unwrap();
        assert_eq!(*image.get_pixel(7, 0), Rgba([0, 0, 0, 255]));
        assert_eq!(*image.get_pixel(0, 0), Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn test_draw_outside_frame_fails() {
        let mut bb = Backbuffer::new(8, 8).unwrap();
        assert!(matches!(
            bb.draw_rect(euclid::rect(0, 0, 2, 2), 0xffff_ffff),
            Err(Error::OperationNotActive)
        ));
        bb.draw_begin().unwrap();
        assert!(matches!(bb.draw_begin(), Err(Error::OperationActive)));
    }

    #[test]
    fn test_to_rgba() {
        assert_eq!(to_rgba(0x80_102030), Rgba([0x10, 0x20, 0x30, 0x80]));
    }
}
