use std::rc::Rc;

use crate::{
    animation::Animation,
    camera::Camera,
    constants::{KEEP_ALIVE, TYPE_SPRITE},
    error::{Error, Result},
    hitbox::Child,
    render::Renderer,
    spriteset::Spriteset,
    sprite::Sprite,
};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum DrawOrder {
    Linear,
    TopFirst,
    BottomFirst,
    NewestFirst,
    OldestFirst,
}

/// Which live members are handed to the quadtree each update.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum CollisionQuality {
    None,
    VisibleOnly,
    EverySecond,
    EveryThird,
    Everything,
}

#[derive(Clone, Debug)]
struct Node {
    sprite: Sprite,
    alive: bool,
    /// Remaining ms; `None` never expires.
    ttl: Option<u32>,
    spawned: u64,
}

/// Bounded pool of sprites sharing spawn defaults.
#[derive(Clone, Debug)]
pub struct Group {
    id: u32,
    nodes: Vec<Node>,
    max_len: usize,
    last: Option<usize>,
    spawn_count: u64,

    type_tag: u32,
    spriteset: Option<Rc<Spriteset>>,
    animations: Vec<Animation>,
    width: Option<i32>,
    height: Option<i32>,
    offset: (i32, i32),
    velocity: (f64, f64),
    acceleration: (f64, f64),
    ttl: Option<u32>,
    die_on_leave: bool,

    draw_order: DrawOrder,
    quality: CollisionQuality,
    skipped: u32,
    visible: Vec<usize>,
    collideable: Vec<usize>,
}

impl Default for Group {
    fn default() -> Self {
        Self {
            id: 0,
            nodes: Vec::new(),
            max_len: 0,
            last: None,
            spawn_count: 0,
            type_tag: TYPE_SPRITE,
            spriteset: None,
            animations: Vec::new(),
            width: None,
            height: None,
            offset: (0, 0),
            velocity: (0.0, 0.0),
            acceleration: (0.0, 0.0),
            ttl: None,
            die_on_leave: false,
            draw_order: DrawOrder::Linear,
            quality: CollisionQuality::Everything,
            skipped: 0,
            visible: Vec::new(),
            collideable: Vec::new(),
        }
    }
}

impl Group {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    /// Reserves room for `init` members and caps the pool at `max_len`.
    pub fn pre_cache(&mut self, init: usize, max_len: usize) -> Result<()> {
        if max_len == 0 || init > max_len {
            return Err(Error::ArgumentsBad("group needs 0 < init <= max"));
        }
        if max_len < self.nodes.len() {
            return Err(Error::ArgumentsBad("group already holds more sprites"));
        }
        self.max_len = max_len;
        self.nodes.reserve(init.saturating_sub(self.nodes.len()));
        Ok(())
    }

    pub fn set_def_type(&mut self, type_tag: u32) {
        self.type_tag = type_tag;
    }

    pub fn set_def_spriteset(&mut self, spriteset: Rc<Spriteset>) {
        self.spriteset = Some(spriteset);
    }

    pub fn set_def_anim_data(&mut self, table: &[i32]) -> Result<()> {
        self.animations = Animation::from_table(table)?;
        Ok(())
    }

    pub fn set_def_dimensions(&mut self, width: i32, height: i32, offset_x: i32, offset_y: i32) -> Result<()> {
        if width <= 0 {
            return Err(Error::GroupWidthNotSet);
        }
        if height <= 0 {
            return Err(Error::GroupHeightNotSet);
        }
        self.width = Some(width);
        self.height = Some(height);
        self.offset = (offset_x, offset_y);
        Ok(())
    }

    pub fn set_def_velocity(&mut self, vx: f64, vy: f64) {
        self.velocity = (vx, vy);
    }

    pub fn set_def_acceleration(&mut self, ax: f64, ay: f64) {
        self.acceleration = (ax, ay);
    }

    pub fn set_death_on_leave(&mut self, die_on_leave: bool) {
        self.die_on_leave = die_on_leave;
    }

    /// Default time to live in ms, or `KEEP_ALIVE`.
    pub fn set_death_on_time(&mut self, ttl: i32) -> Result<()> {
        self.ttl = parse_ttl(ttl)?;
        Ok(())
    }

    pub fn set_draw_order(&mut self, order: DrawOrder) {
        self.draw_order = order;
    }

    pub fn set_collision_quality(&mut self, quality: CollisionQuality) {
        self.quality = quality;
    }

    /// Revives a dead member (or grows the pool) with the group's defaults.
    /// The returned sprite also becomes the target of the `set_*` helpers.
    pub fn recycle(&mut self) -> Result<&mut Sprite> {
        let spriteset = self.spriteset.clone().ok_or(Error::GroupSpritesetNotSet)?;
        let width = self.width.ok_or(Error::GroupWidthNotSet)?;
        let height = self.height.ok_or(Error::GroupHeightNotSet)?;
        let slot = self.free_slot()?;

        let (ox, oy) = self.offset;
        let mut sprite = Sprite::new(0, 0, width, height, Some(spriteset), ox, oy)?;
        sprite.set_animations(self.animations.clone());
        sprite.set_type(self.type_tag);
        sprite.set_velocity(self.velocity.0, self.velocity.1);
        sprite.set_acceleration(self.acceleration.0, self.acceleration.1);
        Ok(self.place(slot, sprite))
    }

    /// Adds a caller-built sprite; it is dropped when the member dies.
    pub fn insert(&mut self, sprite: Sprite) -> Result<usize> {
        let slot = self.free_slot()?;
        self.place(slot, sprite);
        Ok(slot)
    }

    fn free_slot(&mut self) -> Result<usize> {
        if let Some(slot) = self.nodes.iter().position(|node| !node.alive) {
            return Ok(slot);
        }
        let len = self.nodes.len();
        if len >= self.max_len {
            return Err(Error::GroupMaxSprites);
        }
        if len == self.nodes.capacity() {
            let grow = len.max(1).min(self.max_len - len);
            self.nodes.reserve_exact(grow);
            log::debug!("Group {} grew to {} sprites", self.id, len + grow);
        }
        Ok(len)
    }

    fn place(&mut self, slot: usize, mut sprite: Sprite) -> &mut Sprite {
        sprite.set_child(Child::Slot {
            group: self.id,
            slot,
        });
        let node = Node {
            sprite,
            alive: true,
            ttl: self.ttl,
            spawned: self.spawn_count,
        };
        self.spawn_count += 1;
        if slot == self.nodes.len() {
            self.nodes.push(node);
        } else {
            self.nodes[slot] = node;
        }
        self.last = Some(slot);
        &mut self.nodes[slot].sprite
    }

    fn last_node(&mut self) -> Result<&mut Node> {
        match self.last {
            Some(slot) => Ok(&mut self.nodes[slot]),
            None => Err(Error::GroupNoLastSprite),
        }
    }

    pub fn last(&mut self) -> Result<&mut Sprite> {
        Ok(&mut self.last_node()?.sprite)
    }

    pub fn set_position(&mut self, x: f64, y: f64) -> Result<()> {
        self.last_node()?.sprite.teleport(x, y);
        Ok(())
    }

    pub fn set_velocity(&mut self, vx: f64, vy: f64) -> Result<()> {
        self.last_node()?.sprite.set_velocity(vx, vy);
        Ok(())
    }

    pub fn set_acceleration(&mut self, ax: f64, ay: f64) -> Result<()> {
        self.last_node()?.sprite.set_acceleration(ax, ay);
        Ok(())
    }

    pub fn set_frame(&mut self, frame: i32) -> Result<()> {
        self.last_node()?.sprite.set_frame(frame);
        Ok(())
    }

    pub fn set_animation(&mut self, animation: usize) -> Result<()> {
        self.last_node()?.sprite.play_animation(animation)
    }

    pub fn set_type(&mut self, type_tag: u32) -> Result<()> {
        self.last_node()?.sprite.set_type(type_tag);
        Ok(())
    }

    pub fn set_direction(&mut self, flipped: bool) -> Result<()> {
        self.last_node()?.sprite.set_direction(flipped);
        Ok(())
    }

    pub fn set_ttl(&mut self, ttl: i32) -> Result<()> {
        let ttl = parse_ttl(ttl)?;
        self.last_node()?.ttl = ttl;
        Ok(())
    }

    pub fn kill(&mut self, slot: usize) -> Result<()> {
        let node = self.nodes.get_mut(slot).ok_or(Error::InvalidIndex(slot))?;
        node.alive = false;
        if self.last == Some(slot) {
            self.last = None;
        }
        Ok(())
    }

    pub fn is_alive(&self, slot: usize) -> bool {
        self.nodes.get(slot).map_or(false, |node| node.alive)
    }

    pub fn sprite(&self, slot: usize) -> Option<&Sprite> {
        self.nodes.get(slot).filter(|n| n.alive).map(|n| &n.sprite)
    }

    pub fn sprite_mut(&mut self, slot: usize) -> Option<&mut Sprite> {
        self.nodes
            .get_mut(slot)
            .filter(|n| n.alive)
            .map(|n| &mut n.sprite)
    }

    /// Two distinct live members at once, for resolving a collision.
    pub fn pair_mut(&mut self, a: usize, b: usize) -> Option<(&mut Sprite, &mut Sprite)> {
        if a == b || !self.is_alive(a) || !self.is_alive(b) {
            return None;
        }
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        let (head, tail) = self.nodes.split_at_mut(high);
        let (low, high) = (&mut head[low].sprite, &mut tail[0].sprite);
        if a < b {
            Some((low, high))
        } else {
            Some((high, low))
        }
    }

    /// Slots and sprites of every live member.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Sprite)> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.alive)
            .map(|(slot, n)| (slot, &n.sprite))
    }

    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.alive).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slots allocated so far, live or dead.
    pub fn pool_len(&self) -> usize {
        self.nodes.len()
    }

    /// Members selected for collision by the last `update`.
    pub fn collideable(&self) -> &[usize] {
        &self.collideable
    }

    pub fn update(&mut self, ms: u32, camera: &Camera) {
        self.last = None;
        self.visible.clear();
        self.collideable.clear();
        self.skipped = 0;
        for slot in 0..self.nodes.len() {
            let node = &mut self.nodes[slot];
            if !node.alive {
                continue;
            }
            node.sprite.update(ms);
            if let Some(ttl) = &mut node.ttl {
                *ttl = ttl.saturating_sub(ms);
            }
            let inside = camera.is_sprite_inside(&node.sprite);
            let expired = node.ttl == Some(0);
            if expired || (self.die_on_leave && !inside) {
                node.alive = false;
                continue;
            }
            if inside {
                self.visible.push(slot);
            }
            if self.should_collide(inside) {
                self.collideable.push(slot);
            }
        }
    }

    fn should_collide(&mut self, inside: bool) -> bool {
        let skip = match self.quality {
            CollisionQuality::None => return false,
            CollisionQuality::EveryThird => 2,
            CollisionQuality::EverySecond => 1,
            CollisionQuality::VisibleOnly | CollisionQuality::Everything => 0,
        };
        if self.skipped < skip {
            self.skipped += 1;
            return false;
        }
        if self.quality != CollisionQuality::Everything && !inside {
            return false;
        }
        self.skipped = 0;
        true
    }

    /// Draws the members found visible by the last `update`.
    pub fn draw(&self, renderer: &mut dyn Renderer, camera: &Camera) -> Result<()> {
        let mut order = self.visible.clone();
        let nodes = &self.nodes;
        match self.draw_order {
            DrawOrder::Linear => {}
            DrawOrder::TopFirst => order.sort_by_key(|&i| nodes[i].sprite.position().1),
            DrawOrder::BottomFirst => {
                order.sort_by_key(|&i| std::cmp::Reverse(nodes[i].sprite.position().1))
            }
            DrawOrder::NewestFirst => order.sort_by_key(|&i| std::cmp::Reverse(nodes[i].spawned)),
            DrawOrder::OldestFirst => order.sort_by_key(|&i| nodes[i].spawned),
        }
        for slot in order {
            let node = &nodes[slot];
            if node.alive {
                node.sprite.draw(renderer, camera)?;
            }
        }
        Ok(())
    }
}

fn parse_ttl(ttl: i32) -> Result<Option<u32>> {
    match ttl {
        KEEP_ALIVE => Ok(None),
        ttl if ttl > 0 => Ok(Some(ttl as u32)),
        _ => Err(Error::ArgumentsBad("ttl must be positive or KEEP_ALIVE")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{tests::two_tile_texture, Backbuffer};

    fn group(max_len: usize) -> Group {
        let mut bb = Backbuffer::new(8, 8).unwrap();
        let texture = bb.add_texture(two_tile_texture()).unwrap();
        let mut group = Group::new(7);
        group.pre_cache(1, max_len).unwrap();
        group.set_def_spriteset(Rc::new(Spriteset::new(texture, 8, 8).unwrap()));
        group.set_def_dimensions(4, 4, 0, 0).unwrap();
        group
    }

    fn camera() -> Camera {
        let mut cam = Camera::new(64, 64).unwrap();
        cam.set_world_dimensions(256, 256).unwrap();
        cam
    }

    #[test]
    fn test_recycle_requires_defaults() {
        let mut group = Group::new(0);
        group.pre_cache(1, 4).unwrap();
        assert!(matches!(group.recycle(), Err(Error::GroupSpritesetNotSet)));
        assert!(matches!(group.set_position(0.0, 0.0), Err(Error::GroupNoLastSprite)));
    }

    #[test]
    fn test_pool_grows_to_max() {
        let mut group = group(3);
        for _ in 0..3 {
            group.recycle().unwrap();
        }
        assert!(matches!(group.recycle(), Err(Error::GroupMaxSprites)));
        group.kill(1).unwrap();
        group.recycle().unwrap();
        assert_eq!(group.pool_len(), 3);
        assert_eq!(
            group.last().unwrap().child().0,
            Child::Slot { group: 7, slot: 1 }
        );
    }

    #[test]
    fn test_ttl_and_leave_kill_members() {
        let mut group = group(4);
        group.set_death_on_time(100).unwrap();
        group.recycle().unwrap();
        group.set_position(10.0, 10.0).unwrap();
        group.set_ttl(KEEP_ALIVE).unwrap();
        group.recycle().unwrap();
        group.set_position(20.0, 20.0).unwrap();

        let cam = camera();
        group.update(60, &cam);
        assert_eq!(group.len(), 2);
        group.update(60, &cam);
        assert_eq!(group.len(), 1);
        assert!(group.is_alive(0));

        group.set_death_on_leave(true);
        group.sprite_mut(0).unwrap().teleport(200.0, 200.0);
        group.update(1, &cam);
        assert!(group.is_empty());
    }

    #[test]
    fn test_ttl_overshoot_still_kills() {
        let mut group = group(1);
        group.set_death_on_time(100).unwrap();
        group.recycle().unwrap();
        group.set_position(10.0, 10.0).unwrap();
        group.update(101, &camera());
        assert!(group.is_empty());
        assert!(group.collideable().is_empty());
        assert!(matches!(group.set_ttl(0), Err(Error::ArgumentsBad(_))));
    }

    #[test]
    fn test_dead_members_skip_collision_rotation() {
        let mut group = group(4);
        for i in 0..4 {
            group.recycle().unwrap();
            group.set_position(i as f64 * 8.0, 0.0).unwrap();
        }
        group.set_death_on_time(50).unwrap();
        group.kill(0).unwrap();
        group.recycle().unwrap();
        group.set_position(0.0, 0.0).unwrap();
        group.set_collision_quality(CollisionQuality::EverySecond);
        // slot 0 expires on this update and must not consume a turn
        group.update(50, &camera());
        assert!(!group.is_alive(0));
        assert_eq!(group.collideable(), &[2]);
    }

    #[test]
    fn test_every_second_quality() {
        let mut group = group(6);
        for i in 0..6 {
            group.recycle().unwrap();
            group.set_position(i as f64 * 8.0, 0.0).unwrap();
        }
        group.set_collision_quality(CollisionQuality::EverySecond);
        group.update(1, &camera());
        assert_eq!(group.collideable(), &[1, 3, 5]);

        group.set_collision_quality(CollisionQuality::VisibleOnly);
        group.sprite_mut(2).unwrap().teleport(100.0, 100.0);
        group.update(1, &camera());
        assert_eq!(group.collideable(), &[0, 1, 3, 4, 5]);
    }

    #[test]
    fn test_pair_mut_order() {
        let mut group = group(2);
        group.recycle().unwrap();
        group.set_position(1.0, 0.0).unwrap();
        group.recycle().unwrap();
        group.set_position(2.0, 0.0).unwrap();
        let (a, b) = group.pair_mut(1, 0).unwrap();
        assert_eq!((a.position().0, b.position().0), (2, 1));
        assert!(group.pair_mut(1, 1).is_none());
    }

    #[test]
    fn test_draw_order_by_age() {
        let mut bb = Backbuffer::new(16, 16).unwrap();
        let texture = bb.add_texture(two_tile_texture()).unwrap();
        let mut group = Group::new(0);
        group.pre_cache(2, 2).unwrap();
        group.set_def_spriteset(Rc::new(Spriteset::new(texture, 8, 8).unwrap()));
        group.set_def_dimensions(8, 8, 0, 0).unwrap();
        group.set_draw_order(DrawOrder::OldestFirst);
        group.recycle().unwrap();
        group.set_frame(0).unwrap();
        group.recycle().unwrap();
        group.set_frame(1).unwrap();
        let mut cam = Camera::new(16, 16).unwrap();
        cam.set_world_dimensions(16, 16).unwrap();
        group.update(1, &cam);

        bb.draw_begin().unwrap();
        group.draw(&mut bb, &cam).unwrap();
        bb.draw_end().unwrap();
        // the green tile was drawn last, so it covers the red one
        assert_eq!(bb.backbuffer().unwrap().get_pixel(1, 1)[1], 255);

        group.set_draw_order(DrawOrder::NewestFirst);
        bb.draw_begin().unwrap();
        group.draw(&mut bb, &cam).unwrap();
        bb.draw_end().unwrap();
        assert_eq!(bb.backbuffer().unwrap().get_pixel(1, 1)[0], 255);
    }
}
