use crate::{
    error::{Error, Result},
    render::Texture,
};

/// A texture sliced into uniform, power-of-two sized tiles.
#[derive(Clone, Debug)]
pub struct Spriteset {
    texture: Texture,
    tile_width: u32,
    tile_height: u32,
    columns: u32,
    rows: u32,
}

impl Spriteset {
    pub fn new(texture: Texture, tile_width: u32, tile_height: u32) -> Result<Self> {
        if !tile_width.is_power_of_two() || tile_width > texture.size.width {
            return Err(Error::InvalidWidth);
        }
        if !tile_height.is_power_of_two() || tile_height > texture.size.height {
            return Err(Error::InvalidHeight);
        }
        Ok(Self {
            texture,
            tile_width,
            tile_height,
            columns: texture.size.width / tile_width,
            rows: texture.size.height / tile_height,
        })
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn tile_size(&self) -> (u32, u32) {
        (self.tile_width, self.tile_height)
    }

    pub fn tile_count(&self) -> u32 {
        self.columns * self.rows
    }

    /// Top-left pixel of a tile inside the texture.
    pub fn position(&self, tile: i32) -> Result<(u32, u32)> {
        if tile < 0 || tile as u32 >= self.tile_count() {
            return Err(Error::InvalidIndex(tile.max(0) as usize));
        }
        let tile = tile as u32;
        Ok((
            (tile % self.columns) * self.tile_width,
            (tile / self.columns) * self.tile_height,
        ))
    }
}
