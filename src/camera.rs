use euclid::default::Rect;

use crate::{
    error::{Error, Result},
    object::Object,
    sprite::Sprite,
};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum CameraMove {
    Moved,
    DidNotMove,
}

/// View rectangle over the world, following a point through a deadzone.
#[derive(Clone, Debug)]
pub struct Camera {
    x: i32,
    y: i32,
    view_width: i32,
    view_height: i32,
    world_width: i32,
    world_height: i32,
    // deadzone center and half-extents, relative to the view
    dead_x: i32,
    dead_y: i32,
    dead_hw: i32,
    dead_hh: i32,
}

impl Camera {
    pub fn new(view_width: i32, view_height: i32) -> Result<Self> {
        if view_width <= 0 || view_height <= 0 {
            return Err(Error::ArgumentsBad("camera dimensions must be positive"));
        }
        Ok(Self {
            x: 0,
            y: 0,
            view_width,
            view_height,
            world_width: view_width,
            world_height: view_height,
            dead_x: view_width / 2,
            dead_y: view_height / 2,
            dead_hw: view_width / 2,
            dead_hh: view_height / 2,
        })
    }

    pub fn set_world_dimensions(&mut self, width: i32, height: i32) -> Result<()> {
        if width <= 0 || height <= 0 {
            return Err(Error::ArgumentsBad("world dimensions must be positive"));
        }
        self.world_width = width;
        self.world_height = height;
        self.clamp();
        Ok(())
    }

    pub fn world_dimensions(&self) -> (i32, i32) {
        (self.world_width, self.world_height)
    }

    /// Deadzone rectangle relative to the view's top-left corner.
    pub fn set_deadzone(&mut self, x: i32, y: i32, width: i32, height: i32) -> Result<()> {
        if x < 0 || y < 0 || width <= 0 || height <= 0 {
            return Err(Error::ArgumentsBad("bad deadzone"));
        }
        if x + width > self.view_width || y + height > self.view_height {
            return Err(Error::ArgumentsBad("deadzone must fit inside the view"));
        }
        self.dead_hw = width / 2;
        self.dead_hh = height / 2;
        self.dead_x = x + self.dead_hw;
        self.dead_y = y + self.dead_hh;
        Ok(())
    }

    /// Follows a world point, only scrolling by how much it left the
    /// deadzone.
    pub fn center_at_point(&mut self, x: i32, y: i32) -> CameraMove {
        let (old_x, old_y) = (self.x, self.y);
        let dx = x - self.x - self.dead_x;
        let dy = y - self.y - self.dead_y;
        if dx > self.dead_hw {
            self.x += dx - self.dead_hw;
        } else if dx < -self.dead_hw {
            self.x += dx + self.dead_hw;
        }
        if dy > self.dead_hh {
            self.y += dy - self.dead_hh;
        } else if dy < -self.dead_hh {
            self.y += dy + self.dead_hh;
        }
        self.clamp();
        if (self.x, self.y) == (old_x, old_y) {
            CameraMove::DidNotMove
        } else {
            CameraMove::Moved
        }
    }

    /// Places the view ignoring the world bounds.
    pub fn set_position_unrestricted(&mut self, x: i32, y: i32) {
        self.x = x;
        self.y = y;
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn dimensions(&self) -> (i32, i32) {
        (self.view_width, self.view_height)
    }

    pub fn view(&self) -> Rect<i32> {
        euclid::rect(self.x, self.y, self.view_width, self.view_height)
    }

    pub fn screen_to_world(&self, x: i32, y: i32) -> Result<(i32, i32)> {
        if x < 0 || y < 0 || x > self.view_width || y > self.view_height {
            return Err(Error::ArgumentsBad("point outside the view"));
        }
        Ok((x + self.x, y + self.y))
    }

    pub fn world_to_screen(&self, x: i32, y: i32) -> (i32, i32) {
        (x - self.x, y - self.y)
    }

    pub fn is_rect_inside(&self, x: i32, y: i32, width: i32, height: i32) -> bool {
        x < self.x + self.view_width
            && x + width > self.x
            && y < self.y + self.view_height
            && y + height > self.y
    }

    /// Tests the sprite's drawn rectangle, not its hitbox.
    pub fn is_sprite_inside(&self, sprite: &Sprite) -> bool {
        let (x, y, width, height) = sprite.draw_rect();
        self.is_rect_inside(x, y, width, height)
    }

    pub fn is_object_inside(&self, object: &Object) -> bool {
        let (width, height) = object.dimensions();
        self.is_rect_inside(object.x(), object.y(), width, height)
    }

    fn clamp(&mut self) {
        self.x = clamp_axis(self.x, self.view_width, self.world_width);
        self.y = clamp_axis(self.y, self.view_height, self.world_height);
    }
}

fn clamp_axis(pos: i32, view: i32, world: i32) -> i32 {
    if world < view {
        (world - view) / 2
    } else {
        pos.max(0).min(world - view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        let mut cam = Camera::new(100, 80).unwrap();
        cam.set_world_dimensions(400, 300).unwrap();
        cam.set_deadzone(30, 20, 40, 40).unwrap();
        cam
    }

    #[test]
    fn test_point_inside_deadzone_keeps_view() {
        let mut cam = camera();
        assert_eq!(cam.center_at_point(55, 45), CameraMove::DidNotMove);
        assert_eq!(cam.position(), (0, 0));
    }

    #[test]
    fn test_follow_by_excess() {
        let mut cam = camera();
        // deadzone spans x 30..70, so 80 is 10 past its edge
        assert_eq!(cam.center_at_point(80, 40), CameraMove::Moved);
        assert_eq!(cam.position(), (10, 0));
        assert_eq!(cam.center_at_point(75, 40), CameraMove::DidNotMove);
        assert_eq!(cam.center_at_point(20, 40), CameraMove::Moved);
        assert_eq!(cam.position(), (0, 0));
    }

    #[test]
    fn test_clamped_to_world() {
        let mut cam = camera();
        cam.center_at_point(1000, 1000);
        assert_eq!(cam.position(), (300, 220));
        assert_eq!(cam.center_at_point(2000, 2000), CameraMove::DidNotMove);
    }

    #[test]
    fn test_small_world_is_centered() {
        let mut cam = Camera::new(100, 80).unwrap();
        cam.set_world_dimensions(60, 200).unwrap();
        cam.center_at_point(500, 0);
        assert_eq!(cam.position().0, -20);
    }

    #[test]
    fn test_screen_to_world() {
        let mut cam = camera();
        cam.set_position_unrestricted(15, 5);
        assert_eq!(cam.screen_to_world(10, 10).unwrap(), (25, 15));
        assert!(cam.screen_to_world(-1, 0).is_err());
        assert_eq!(cam.world_to_screen(25, 15), (10, 10));
    }

    #[test]
    fn test_rect_inside() {
        let cam = camera();
        assert!(cam.is_rect_inside(95, 0, 8, 8));
        assert!(!cam.is_rect_inside(100, 0, 8, 8));
        assert!(!cam.is_rect_inside(-8, 0, 8, 8));
    }
}
