use std::rc::Rc;

use crate::{
    animation::Animation,
    camera::Camera,
    constants::TYPE_SPRITE,
    error::{Error, Result},
    hitbox::{Child, Direction, Hitbox},
    object::{self, Object},
    render::Renderer,
    spriteset::Spriteset,
};

/// An object with something to draw: a tile from a spriteset, optionally
/// driven by one of its animations.
#[derive(Clone, Debug)]
pub struct Sprite {
    object: Object,
    spriteset: Option<Rc<Spriteset>>,
    animations: Vec<Animation>,
    current: Option<usize>,
    tile: i32,
    offset_x: i32,
    offset_y: i32,
    flipped: bool,
}

impl Sprite {
    pub fn new(
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        spriteset: Option<Rc<Spriteset>>,
        offset_x: i32,
        offset_y: i32,
    ) -> Result<Self> {
        let mut object = Object::new(x, y, width, height)?;
        object.set_type(TYPE_SPRITE);
        Ok(Self {
            object,
            spriteset,
            animations: Vec::new(),
            current: None,
            tile: 0,
            offset_x,
            offset_y,
            flipped: false,
        })
    }

    pub fn object(&self) -> &Object {
        &self.object
    }

    pub fn object_mut(&mut self) -> &mut Object {
        &mut self.object
    }

    pub fn hitbox(&self) -> &Hitbox {
        self.object.hitbox()
    }

    pub fn set_type(&mut self, type_tag: u32) {
        self.object.set_type(type_tag);
    }

    pub fn type_tag(&self) -> u32 {
        self.object.type_tag()
    }

    pub fn set_child(&mut self, child: Child) {
        self.object.set_child(child);
    }

    /// Child reference and type, as reported by the quadtree.
    pub fn child(&self) -> (Child, u32) {
        (self.object.child(), self.object.type_tag())
    }

    pub fn set_spriteset(&mut self, spriteset: Rc<Spriteset>) {
        self.spriteset = Some(spriteset);
    }

    pub fn spriteset(&self) -> Option<&Rc<Spriteset>> {
        self.spriteset.as_ref()
    }

    pub fn set_offset(&mut self, offset_x: i32, offset_y: i32) {
        self.offset_x = offset_x;
        self.offset_y = offset_y;
    }

    pub fn offset(&self) -> (i32, i32) {
        (self.offset_x, self.offset_y)
    }

    pub fn set_frame(&mut self, tile: i32) {
        self.tile = tile;
    }

    pub fn frame(&self) -> i32 {
        self.tile
    }

    pub fn set_direction(&mut self, flipped: bool) {
        self.flipped = flipped;
    }

    pub fn is_flipped(&self) -> bool {
        self.flipped
    }

    pub fn set_position(&mut self, x: f64, y: f64) {
        self.object.set_position(x, y);
    }

    pub fn teleport(&mut self, x: f64, y: f64) {
        self.object.teleport(x, y);
    }

    pub fn position(&self) -> (i32, i32) {
        (self.object.x(), self.object.y())
    }

    pub fn set_velocity(&mut self, vx: f64, vy: f64) {
        self.object.set_velocity(vx, vy);
    }

    pub fn set_acceleration(&mut self, ax: f64, ay: f64) {
        self.object.set_acceleration(ax, ay);
    }

    pub fn set_drag(&mut self, drag_x: f64, drag_y: f64) -> Result<()> {
        self.object.set_drag(drag_x, drag_y)
    }

    pub fn set_fixed(&mut self, fixed: bool) {
        self.object.set_fixed(fixed);
    }

    pub fn collision(&self) -> Direction {
        self.object.collision()
    }

    pub fn add_animation(&mut self, animation: Animation) -> usize {
        self.animations.push(animation);
        self.animations.len() - 1
    }

    pub fn add_animations(&mut self, table: &[i32]) -> Result<()> {
        self.animations.extend(Animation::from_table(table)?);
        Ok(())
    }

    pub fn set_animations(&mut self, animations: Vec<Animation>) {
        self.animations = animations;
        self.current = None;
    }

    /// Switches animations, restarting the new one. Asking for the one
    /// already playing leaves it running.
    pub fn play_animation(&mut self, index: usize) -> Result<()> {
        if index >= self.animations.len() {
            return Err(Error::InvalidIndex(index));
        }
        if self.current == Some(index) {
            return Ok(());
        }
        let anim = &mut self.animations[index];
        anim.reset();
        self.tile = anim.frame();
        self.current = Some(index);
        Ok(())
    }

    pub fn reset_animation(&mut self) -> Result<()> {
        let anim = self.animation_mut().ok_or(Error::AnimationNotInitialized)?;
        anim.reset();
        self.tile = anim.frame();
        Ok(())
    }

    pub fn animation(&self) -> Option<&Animation> {
        self.current.map(|i| &self.animations[i])
    }

    fn animation_mut(&mut self) -> Option<&mut Animation> {
        match self.current {
            Some(i) => self.animations.get_mut(i),
            None => None,
        }
    }

    pub fn did_animation_finish(&self) -> bool {
        self.animation().map_or(false, Animation::did_finish)
    }

    pub fn did_animation_just_loop(&self) -> bool {
        self.animation().map_or(false, Animation::did_just_loop)
    }

    pub fn did_animation_just_change_frame(&self) -> bool {
        self.animation().map_or(false, Animation::did_just_change_frame)
    }

    pub fn update(&mut self, ms: u32) {
        if let Some(anim) = self.animation_mut() {
            // a finished animation simply holds its last frame
            if anim.update(ms).is_ok() && anim.did_just_change_frame() {
                let frame = anim.frame();
                self.tile = frame;
            }
        }
        self.object.update(ms);
    }

    /// World-space rectangle the sprite's tile covers.
    pub fn draw_rect(&self) -> (i32, i32, i32, i32) {
        let (width, height) = self.tile_size();
        (self.draw_x(width), self.object.y() + self.offset_y, width, height)
    }

    pub fn draw(&self, renderer: &mut dyn Renderer, camera: &Camera) -> Result<()> {
        let spriteset = match &self.spriteset {
            Some(sset) => sset,
            None => return Err(Error::NotInitialized),
        };
        if !camera.is_sprite_inside(self) {
            return Ok(());
        }
        let (x, y, _, _) = self.draw_rect();
        let (x, y) = camera.world_to_screen(x, y);
        renderer.draw_tile(spriteset, x, y, self.tile, self.flipped)
    }

    fn tile_size(&self) -> (i32, i32) {
        match &self.spriteset {
            Some(sset) => {
                let (w, h) = sset.tile_size();
                (w as i32, h as i32)
            }
            None => self.object.dimensions(),
        }
    }

    fn draw_x(&self, tile_width: i32) -> i32 {
        if self.flipped {
            let (width, _) = self.object.dimensions();
            self.object.x() + width - tile_width - self.offset_x
        } else {
            self.object.x() + self.offset_x
        }
    }
}

/// Resolves two sprites with `object::collide`.
pub fn collide(a: &mut Sprite, b: &mut Sprite) -> Result<bool> {
    object::collide(&mut a.object, &mut b.object)
}
