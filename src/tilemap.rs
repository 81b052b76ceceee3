use std::{collections::BTreeMap, fmt::Write as _, path::Path, rc::Rc};

use crate::{
    camera::Camera,
    constants::MAX_PARSED_CELLS,
    error::{Error, Result},
    hitbox::{Child, Hitbox},
    render::Renderer,
    spriteset::Spriteset,
};

/// Replaces a tile with `next` after `delay` milliseconds.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct TileAnimation {
    pub delay: u32,
    pub next: i32,
}

#[derive(Copy, Clone, Debug)]
struct AnimatedCell {
    index: usize,
    elapsed: u32,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
struct CustomArea {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    type_tag: u32,
}

/// Grid of tiles drawn from a spriteset, with typed collision areas.
#[derive(Clone, Debug)]
pub struct Tilemap {
    id: u32,
    spriteset: Rc<Spriteset>,
    width: usize,
    height: usize,
    data: Vec<i32>,
    default_tile: i32,
    x: i32,
    y: i32,
    tile_types: BTreeMap<i32, u32>,
    animations: BTreeMap<i32, TileAnimation>,
    animated: Vec<AnimatedCell>,
    custom_areas: Vec<CustomArea>,
    areas: Vec<Hitbox>,
    batched: bool,
}

impl Tilemap {
    pub fn new(spriteset: Rc<Spriteset>, width: usize, height: usize, default_tile: i32) -> Result<Self> {
        if width == 0 {
            return Err(Error::InvalidWidth);
        }
        if height == 0 {
            return Err(Error::InvalidHeight);
        }
        Ok(Self {
            id: 0,
            spriteset,
            width,
            height,
            data: vec![default_tile; width * height],
            default_tile,
            x: 0,
            y: 0,
            tile_types: BTreeMap::new(),
            animations: BTreeMap::new(),
            animated: Vec::new(),
            custom_areas: Vec::new(),
            areas: Vec::new(),
            batched: true,
        })
    }

    /// Identifier reported in the `Child::Area` of every area.
    pub fn set_id(&mut self, id: u32) {
        self.id = id;
        for hitbox in &mut self.areas {
            if let Child::Area { tilemap, .. } = &mut hitbox.child {
                *tilemap = id;
            }
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn spriteset(&self) -> &Rc<Spriteset> {
        &self.spriteset
    }

    /// Copies a row-major grid, resizing the map.
    pub fn load(&mut self, data: &[i32], width: usize, height: usize) -> Result<()> {
        if width == 0 {
            return Err(Error::InvalidWidth);
        }
        if height == 0 {
            return Err(Error::InvalidHeight);
        }
        if data.len() != width * height {
            return Err(Error::ArgumentsBad("tile data doesn't match the map dimensions"));
        }
        self.width = width;
        self.height = height;
        self.data = data.to_vec();
        self.recache_animations();
        Ok(())
    }

    /// Refills every cell with the default tile.
    pub fn clear(&mut self) {
        for tile in &mut self.data {
            *tile = self.default_tile;
        }
        self.animated.clear();
        self.areas.clear();
    }

    pub fn data(&self) -> &[i32] {
        &self.data
    }

    pub fn dimensions_in_tiles(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Size in pixels.
    pub fn dimensions(&self) -> (i32, i32) {
        let (tw, th) = self.tile_size();
        (self.width as i32 * tw, self.height as i32 * th)
    }

    pub fn set_position(&mut self, x: i32, y: i32) {
        let (dx, dy) = (x - self.x, y - self.y);
        self.x = x;
        self.y = y;
        for hitbox in &mut self.areas {
            hitbox.cx += dx;
            hitbox.cy += dy;
        }
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn set_batched(&mut self, batched: bool) {
        self.batched = batched;
    }

    pub fn tile(&self, x: usize, y: usize) -> Result<i32> {
        let index = self.index(x, y)?;
        Ok(self.data[index])
    }

    pub fn set_tile(&mut self, x: usize, y: usize, tile: i32) -> Result<()> {
        let index = self.index(x, y)?;
        self.data[index] = tile;
        self.animated.retain(|cell| cell.index != index);
        if self.animations.contains_key(&tile) {
            self.animated.push(AnimatedCell { index, elapsed: 0 });
        }
        Ok(())
    }

    pub fn add_tile_type(&mut self, tile: i32, type_tag: u32) -> Result<()> {
        if self.tile_types.contains_key(&tile) {
            return Err(Error::TiletypeExtant(tile));
        }
        self.tile_types.insert(tile, type_tag);
        Ok(())
    }

    /// Adds `(tile, type)` pairs.
    pub fn add_tile_types(&mut self, pairs: &[(i32, u32)]) -> Result<()> {
        for &(tile, type_tag) in pairs {
            self.add_tile_type(tile, type_tag)?;
        }
        Ok(())
    }

    pub fn type_of_tile(&self, tile: i32) -> Result<u32> {
        self.tile_types
            .get(&tile)
            .copied()
            .ok_or(Error::TilemapNoTiletype)
    }

    /// Type of the tile at a cell.
    pub fn tile_type(&self, x: usize, y: usize) -> Result<u32> {
        self.type_of_tile(self.tile(x, y)?)
    }

    pub fn add_tile_animation(&mut self, tile: i32, delay: u32, next: i32) -> Result<()> {
        if delay == 0 {
            return Err(Error::ArgumentsBad("tile animation delay must be positive"));
        }
        if self.animations.contains_key(&tile) {
            return Err(Error::TileanimExtant(tile));
        }
        self.animations.insert(tile, TileAnimation { delay, next });
        Ok(())
    }

    /// Chains `frames` into tile animations, closing the cycle when looping.
    pub fn add_animation(&mut self, frames: &[i32], fps: u32, do_loop: bool) -> Result<()> {
        if frames.len() < 2 || fps == 0 {
            return Err(Error::ArgumentsBad("tile animation needs two frames and a rate"));
        }
        let delay = (1000 / fps).max(1);
        for pair in frames.windows(2) {
            self.add_tile_animation(pair[0], delay, pair[1])?;
        }
        if do_loop {
            self.add_tile_animation(frames[frames.len() - 1], delay, frames[0])?;
        }
        Ok(())
    }

    /// Rescans the grid for cells whose tile is animated.
    pub fn recache_animations(&mut self) {
        let animations = &self.animations;
        self.animated = self
            .data
            .iter()
            .enumerate()
            .filter(|(_, tile)| animations.contains_key(*tile))
            .map(|(index, _)| AnimatedCell { index, elapsed: 0 })
            .collect();
    }

    /// Advances every animated cell; returns whether any tile changed.
    pub fn update(&mut self, ms: u32) -> bool {
        let mut changed = false;
        let animations = &self.animations;
        let data = &mut self.data;
        self.animated.retain_mut(|cell| {
            cell.elapsed += ms;
            loop {
                let rule = match animations.get(&data[cell.index]) {
                    Some(rule) => *rule,
                    None => return false,
                };
                if cell.elapsed < rule.delay {
                    return true;
                }
                cell.elapsed -= rule.delay;
                data[cell.index] = rule.next;
                changed = true;
            }
        });
        changed
    }

    /// Adds an area not derived from the tiles; it survives recalculation.
    pub fn add_area(&mut self, x: i32, y: i32, width: i32, height: i32, type_tag: u32) -> Result<()> {
        let area = CustomArea { x, y, width, height, type_tag };
        let hitbox = self.area_hitbox(&area, self.areas.len())?;
        self.custom_areas.push(area);
        self.areas.push(hitbox);
        Ok(())
    }

    /// Covers every typed tile with rectangles: runs are grown to the
    /// right, then downwards while the whole run matches.
    pub fn recalculate_areas(&mut self) -> Result<()> {
        if self.tile_types.is_empty() {
            return Err(Error::TilemapNoTiletype);
        }
        self.rebuild_areas()
    }

    fn rebuild_areas(&mut self) -> Result<()> {
        let (tw, th) = self.tile_size();
        let mut covered = vec![false; self.data.len()];
        let mut found = Vec::new();
        for ty in 0..self.height {
            for tx in 0..self.width {
                let start = ty * self.width + tx;
                if covered[start] {
                    continue;
                }
                let type_tag = match self.tile_types.get(&self.data[start]) {
                    Some(type_tag) => *type_tag,
                    None => continue,
                };
                let same = |index: usize| {
                    !covered[index] && self.tile_types.get(&self.data[index]) == Some(&type_tag)
                };
                let mut run = 1;
                while tx + run < self.width && same(start + run) {
                    run += 1;
                }
                let mut rows = 1;
                while ty + rows < self.height
                    && (0..run).all(|i| same(start + rows * self.width + i))
                {
                    rows += 1;
                }
                for j in 0..rows {
                    for i in 0..run {
                        covered[start + j * self.width + i] = true;
                    }
                }
                found.push(CustomArea {
                    x: tx as i32 * tw,
                    y: ty as i32 * th,
                    width: run as i32 * tw,
                    height: rows as i32 * th,
                    type_tag,
                });
            }
        }
        self.areas.clear();
        for area in found.iter().chain(self.custom_areas.iter()) {
            let hitbox = self.area_hitbox(area, self.areas.len())?;
            self.areas.push(hitbox);
        }
        log::debug!("Tilemap {} recalculated {} areas", self.id, self.areas.len());
        Ok(())
    }

    pub fn areas(&self) -> &[Hitbox] {
        &self.areas
    }

    pub fn draw(&self, renderer: &mut dyn Renderer, camera: &Camera) -> Result<()> {
        let (tw, th) = self.tile_size();
        let view = camera.view();
        let left = (view.min_x() - self.x).div_euclid(tw).max(0);
        let top = (view.min_y() - self.y).div_euclid(th).max(0);
        let right = ((view.max_x() - self.x + tw - 1).div_euclid(tw)).min(self.width as i32);
        let bottom = ((view.max_y() - self.y + th - 1).div_euclid(th)).min(self.height as i32);
        if self.batched {
            renderer.batch_begin();
        }
        for ty in top..bottom {
            for tx in left..right {
                let tile = self.data[ty as usize * self.width + tx as usize];
                if tile < 0 {
                    continue;
                }
                let (sx, sy) =
                    camera.world_to_screen(self.x + tx * tw, self.y + ty * th);
                renderer.draw_tile(&self.spriteset, sx, sy, tile, false)?;
            }
        }
        if self.batched {
            renderer.batch_end();
        }
        Ok(())
    }

    /// Reads the text format, replacing the grid:
    ///
    /// ```text
    /// <type-name> <tile>
    /// area <type-name> <x> <y> <width> <height>
    /// map <width> <height>
    /// <tile>, <tile>, ...
    /// ```
    ///
    /// Type names resolve through `dictionary`. Tokens are separated by
    /// whitespace or commas; entries may appear in any order.
    pub fn load_str(&mut self, text: &str, dictionary: &[(&str, u32)]) -> Result<()> {
        let mut tokens = Tokens::new(text);
        let mut grid = None;
        let mut tile_types = BTreeMap::new();
        let mut custom_areas = Vec::new();
        while let Some(token) = tokens.next() {
            match token.text {
                "map" => {
                    let width = tokens.number(&token)?;
                    let height = tokens.number(&token)?;
                    if width <= 0 || height <= 0 {
                        return Err(token.error("map dimensions must be positive"));
                    }
                    let cells = match width.checked_mul(height) {
                        Some(cells) if cells as usize <= MAX_PARSED_CELLS => cells as usize,
                        _ => return Err(token.error("map is too large")),
                    };
                    let mut data = Vec::new();
                    for _ in 0..cells {
                        data.push(tokens.number(&token)?);
                    }
                    grid = Some((data, width as usize, height as usize));
                }
                "area" => {
                    let type_tag = tokens.type_name(&token, dictionary)?;
                    let x = tokens.number(&token)?;
                    let y = tokens.number(&token)?;
                    let width = tokens.number(&token)?;
                    let height = tokens.number(&token)?;
                    if width <= 0 || height <= 0 {
                        return Err(token.error("area dimensions must be positive"));
                    }
                    custom_areas.push(CustomArea { x, y, width, height, type_tag });
                }
                _ => {
                    let type_tag = lookup(&token, dictionary)?;
                    let tile = tokens.number(&token)?;
                    if tile_types.insert(tile, type_tag).is_some() {
                        log::warn!("Tile {} typed twice at {}:{}", tile, token.line, token.column);
                        return Err(Error::TiletypeExtant(tile));
                    }
                }
            }
        }
        let (data, width, height) = match grid {
            Some(grid) => grid,
            None => {
                let (line, column) = tokens.position();
                return Err(parse_error(line, column, "missing map section"));
            }
        };
        self.load(&data, width, height)?;
        self.tile_types = tile_types;
        self.custom_areas = custom_areas;
        self.rebuild_areas()
    }

    pub fn load_file<P: AsRef<Path>>(&mut self, path: P, dictionary: &[(&str, u32)]) -> Result<()> {
        let text = std::fs::read_to_string(path)?;
        self.load_str(&text, dictionary)
    }

    /// Writes the map back in the text format read by `load_str`.
    pub fn write_string(&self, dictionary: &[(&str, u32)]) -> Result<String> {
        let name_of = |type_tag: u32| {
            dictionary
                .iter()
                .find(|(_, t)| *t == type_tag)
                .map(|(name, _)| *name)
                .ok_or(Error::ArgumentsBad("tile type missing from the dictionary"))
        };
        let mut out = String::new();
        for (tile, type_tag) in &self.tile_types {
            let _ = writeln!(out, "{} {}", name_of(*type_tag)?, tile);
        }
        for area in &self.custom_areas {
            let _ = writeln!(
                out,
                "area {} {} {} {} {}",
                name_of(area.type_tag)?,
                area.x,
                area.y,
                area.width,
                area.height
            );
        }
        let _ = writeln!(out, "map {} {}", self.width, self.height);
        for row in self.data.chunks(self.width) {
            let row: Vec<String> = row.iter().map(|tile| tile.to_string()).collect();
            let _ = writeln!(out, "{}", row.join(","));
        }
        Ok(out)
    }

    pub fn save_file<P: AsRef<Path>>(&self, path: P, dictionary: &[(&str, u32)]) -> Result<()> {
        std::fs::write(path, self.write_string(dictionary)?)?;
        Ok(())
    }

    fn tile_size(&self) -> (i32, i32) {
        let (w, h) = self.spriteset.tile_size();
        (w as i32, h as i32)
    }

    fn index(&self, x: usize, y: usize) -> Result<usize> {
        if x >= self.width || y >= self.height {
            return Err(Error::InvalidIndex(y * self.width + x));
        }
        Ok(y * self.width + x)
    }

    fn area_hitbox(&self, area: &CustomArea, index: usize) -> Result<Hitbox> {
        let hitbox = Hitbox::from_rect(self.x + area.x, self.y + area.y, area.width, area.height)?;
        Ok(hitbox.with_type(area.type_tag).with_child(Child::Area {
            tilemap: self.id,
            area: index,
        }))
    }
}

struct Token<'a> {
    text: &'a str,
    line: usize,
    column: usize,
}

impl Token<'_> {
    fn error(&self, message: &str) -> Error {
        parse_error(self.line, self.column, message)
    }
}

fn parse_error(line: usize, column: usize, message: &str) -> Error {
    log::warn!("Tilemap parse error at {}:{}: {}", line, column, message);
    Error::ParseError {
        line,
        column,
        message: message.to_string(),
    }
}

fn lookup(token: &Token, dictionary: &[(&str, u32)]) -> Result<u32> {
    dictionary
        .iter()
        .find(|(name, _)| *name == token.text)
        .map(|(_, type_tag)| *type_tag)
        .ok_or_else(|| token.error(&format!("unknown tile type '{}'", token.text)))
}

/// Splits on whitespace and commas, tracking 1-based positions.
struct Tokens<'a> {
    text: &'a str,
    offset: usize,
    line: usize,
    column: usize,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    fn position(&self) -> (usize, usize) {
        (self.line, self.column)
    }

    fn advance(&mut self, c: char) {
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }

    fn next(&mut self) -> Option<Token<'a>> {
        while let Some(c) = self.text[self.offset..].chars().next() {
            if c.is_whitespace() || c == ',' {
                self.advance(c);
            } else {
                break;
            }
        }
        if self.offset >= self.text.len() {
            return None;
        }
        let start = self.offset;
        let (line, column) = (self.line, self.column);
        while let Some(c) = self.text[self.offset..].chars().next() {
            if c.is_whitespace() || c == ',' {
                break;
            }
            self.advance(c);
        }
        Some(Token {
            text: &self.text[start..self.offset],
            line,
            column,
        })
    }

    fn number(&mut self, after: &Token) -> Result<i32> {
        match self.next() {
            Some(token) => token
                .text
                .parse()
                .map_err(|_| token.error(&format!("expected a number, got '{}'", token.text))),
            None => Err(after.error(&format!("unexpected end of input after '{}'", after.text))),
        }
    }

    fn type_name(&mut self, after: &Token, dictionary: &[(&str, u32)]) -> Result<u32> {
        match self.next() {
            Some(token) => lookup(&token, dictionary),
            None => Err(after.error(&format!("unexpected end of input after '{}'", after.text))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{tests::two_tile_texture, Backbuffer};

    const DICT: &[(&str, u32)] = &[("wall", 30), ("spike", 31)];

    fn tilemap(width: usize, height: usize) -> (Tilemap, Backbuffer) {
        let mut bb = Backbuffer::new(32, 32).unwrap();
        let texture = bb.add_texture(two_tile_texture()).unwrap();
        let sset = Rc::new(Spriteset::new(texture, 8, 8).unwrap());
        (Tilemap::new(sset, width, height, -1).unwrap(), bb)
    }

    fn covered_cells(map: &Tilemap) -> Vec<u32> {
        let mut counts = vec![0; map.data().len()];
        for area in map.areas() {
            for ty in (area.top() / 8)..(area.bottom() / 8) {
                for tx in (area.left() / 8)..(area.right() / 8) {
                    counts[ty as usize * map.width + tx as usize] += 1;
                }
            }
        }
        counts
    }

    #[test]
    fn test_areas_cover_typed_tiles_once() {
        let (mut map, _) = tilemap(5, 4);
        #[rustfmt::skip]
        let data = [
            1, 1, 1, 0, 2,
            1, 1, 1, 0, 2,
            1, 1, 0, 0, 2,
            0, 0, 0, 1, 1,
        ];
        map.load(&data, 5, 4).unwrap();
        map.add_tile_types(&[(1, 30), (2, 31)]).unwrap();
        map.recalculate_areas().unwrap();
        let counts = covered_cells(&map);
        for (index, tile) in map.data().iter().enumerate() {
            let expected = if *tile == 0 { 0 } else { 1 };
            assert_eq!(counts[index], expected, "cell {}", index);
        }
        assert_eq!(map.areas().len(), 4);
        assert_eq!(map.areas()[0].rect(), euclid::rect(0, 0, 24, 16));
        assert_eq!(map.areas()[1].type_tag, 31);
        assert_eq!(
            map.areas()[1].child,
            Child::Area { tilemap: 0, area: 1 }
        );
    }

    #[test]
    fn test_recalculate_needs_types() {
        let (mut map, _) = tilemap(2, 2);
        assert!(matches!(map.recalculate_areas(), Err(Error::TilemapNoTiletype)));
        map.add_tile_type(1, 30).unwrap();
        assert!(matches!(map.add_tile_type(1, 31), Err(Error::TiletypeExtant(1))));
    }

    #[test]
    fn test_tile_animation_chain() {
        let (mut map, _) = tilemap(2, 1);
        map.add_animation(&[4, 5, 6], 10, true).unwrap();
        map.load(&[4, 0], 2, 1).unwrap();
        assert!(!map.update(99));
        assert!(map.update(1));
        assert_eq!(map.tile(0, 0).unwrap(), 5);
        map.update(200);
        assert_eq!(map.tile(0, 0).unwrap(), 4);
        assert_eq!(map.tile(1, 0).unwrap(), 0);
        assert!(matches!(
            map.add_tile_animation(4, 10, 9),
            Err(Error::TileanimExtant(4))
        ));
    }

    #[test]
    fn test_non_looping_animation_stops() {
        let (mut map, _) = tilemap(1, 1);
        map.add_animation(&[1, 2], 20, false).unwrap();
        map.set_tile(0, 0, 1).unwrap();
        map.update(1000);
        assert_eq!(map.tile(0, 0).unwrap(), 2);
        assert!(!map.update(1000));
    }

    #[test]
    fn test_text_format_round_trip() {
        let (mut map, _) = tilemap(1, 1);
        let text = "wall 1\nspike 2\narea spike 0 0 8 4\nmap 3 2\n1, 1, 0\n2 0 0\n";
        map.load_str(text, DICT).unwrap();
        assert_eq!(map.dimensions_in_tiles(), (3, 2));
        assert_eq!(map.tile_type(1, 0).unwrap(), 30);
        assert_eq!(map.areas().len(), 3);

        let written = map.write_string(DICT).unwrap();
        let (mut copy, _) = tilemap(1, 1);
        copy.load_str(&written, DICT).unwrap();
        assert_eq!(copy.data(), map.data());
        assert_eq!(copy.tile_types, map.tile_types);
        assert_eq!(copy.custom_areas, map.custom_areas);
    }

    #[test]
    fn test_oversized_map_is_a_parse_error() {
        let (mut map, _) = tilemap(1, 1);
        for text in &["map 100000 100000 0", "map 2147483647 2 0"] {
            match map.load_str(text, DICT) {
                Err(Error::ParseError { line, column, .. }) => assert_eq!((line, column), (1, 1)),
                other => panic!("unexpected {:?}", other),
            }
        }
        assert_eq!(map.dimensions_in_tiles(), (1, 1));
    }

    #[test]
    fn test_failed_load_keeps_previous_map() {
        let (mut map, _) = tilemap(1, 1);
        map.load_str("wall 1\narea spike 0 0 8 8\nmap 1 1 1", DICT).unwrap();
        assert_eq!(map.areas().len(), 2);

        assert!(map.load_str("spike 5\nmap 1 1 oops", DICT).is_err());
        assert!(matches!(map.type_of_tile(5), Err(Error::TilemapNoTiletype)));
        assert_eq!(map.type_of_tile(1).unwrap(), 30);
        assert_eq!(map.custom_areas.len(), 1);

        map.load_str("spike 2\nmap 1 1 2", DICT).unwrap();
        assert!(matches!(map.type_of_tile(1), Err(Error::TilemapNoTiletype)));
        assert_eq!(map.areas().len(), 1);
        assert_eq!(map.areas()[0].type_tag, 31);
    }

    #[test]
    fn test_duplicate_type_and_bad_area_rejected() {
        let (mut map, _) = tilemap(1, 1);
        assert!(matches!(
            map.load_str("wall 1\nspike 1\nmap 1 1 1", DICT),
            Err(Error::TiletypeExtant(1))
        ));
        match map.load_str("wall 1\n area wall 0 0 0 8\nmap 1 1 1", DICT) {
            Err(Error::ParseError { line, column, .. }) => assert_eq!((line, column), (2, 2)),
            other => panic!("unexpected {:?}", other),
        }
        assert!(map.custom_areas.is_empty());
    }

    #[test]
    fn test_parse_error_position() {
        let (mut map, _) = tilemap(1, 1);
        match map.load_str("wall 1\n  lava 2\nmap 1 1 0", DICT) {
            Err(Error::ParseError { line, column, .. }) => assert_eq!((line, column), (2, 3)),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            map.load_str("map 2 2 1 1 1", DICT),
            Err(Error::ParseError { line: 1, .. })
        ));
    }

    #[test]
    fn test_draw_only_visible_tiles() {
        let (mut map, mut bb) = tilemap(8, 8);
        map.load(&[0; 64], 8, 8).unwrap();
        let mut cam = Camera::new(16, 16).unwrap();
        cam.set_world_dimensions(64, 64).unwrap();
        cam.set_position_unrestricted(4, 0);
        bb.draw_begin().unwrap();
        map.draw(&mut bb, &cam).unwrap();
        bb.draw_end().unwrap();
        // columns 0..3 overlap x 4..20, rows 0..2
        assert_eq!(bb.draw_calls(), 6);
    }

    #[test]
    fn test_moving_map_moves_areas() {
        let (mut map, _) = tilemap(1, 1);
        map.load(&[1], 1, 1).unwrap();
        map.add_tile_type(1, 30).unwrap();
        map.recalculate_areas().unwrap();
        map.set_position(16, 8);
        assert_eq!(map.areas()[0].rect(), euclid::rect(16, 8, 8, 8));
        map.set_id(3);
        assert_eq!(map.areas()[0].child, Child::Area { tilemap: 3, area: 0 });
    }
}
