use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

use euclid::default::Rect;

use crate::{
    constants::TYPE_HITBOX,
    error::{Error, Result},
};

/// Sides of a body, used both for contact reports and for which faces of a
/// hitbox trigger collisions.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash, Debug)]
pub struct Direction(u8);

impl Direction {
    pub const NONE: Direction = Direction(0);
    pub const LEFT: Direction = Direction(0x01);
    pub const RIGHT: Direction = Direction(0x02);
    pub const UP: Direction = Direction(0x04);
    pub const DOWN: Direction = Direction(0x08);
    pub const HORIZONTAL: Direction = Direction(0x03);
    pub const VERTICAL: Direction = Direction(0x0c);
    pub const ALL: Direction = Direction(0x0f);

    pub fn contains(self, other: Direction) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: Direction) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for Direction {
    type Output = Direction;

    fn bitor(self, rhs: Direction) -> Direction {
        Direction(self.0 | rhs.0)
    }
}

impl BitOrAssign for Direction {
    fn bitor_assign(&mut self, rhs: Direction) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Direction {
    type Output = Direction;

    fn bitand(self, rhs: Direction) -> Direction {
        Direction(self.0 & rhs.0)
    }
}

impl Not for Direction {
    type Output = Direction;

    fn not(self) -> Direction {
        Direction(!self.0 & Self::ALL.0)
    }
}

/// What a body belongs to. The quadtree hands these back on overlaps so the
/// caller can find the entities involved.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Child {
    None,
    Object(usize),
    Sprite(usize),
    /// A live entry of a `Group`.
    Slot { group: u32, slot: usize },
    /// A collision area of a `Tilemap`.
    Area { tilemap: u32, area: usize },
    User(u64),
}

impl Default for Child {
    fn default() -> Self {
        Child::None
    }
}

/// Axis-aligned box stored as integer center and half-extents.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Hitbox {
    pub cx: i32,
    pub cy: i32,
    pub hw: i32,
    pub hh: i32,
    pub type_tag: u32,
    pub child: Child,
    pub hit_flags: Direction,
}

impl Hitbox {
    pub fn new(cx: i32, cy: i32, hw: i32, hh: i32) -> Result<Self> {
        if hw <= 0 || hh <= 0 {
            return Err(Error::ObjectNotInitialized);
        }
        Ok(Self {
            cx,
            cy,
            hw,
            hh,
            type_tag: TYPE_HITBOX,
            child: Child::None,
            hit_flags: Direction::ALL,
        })
    }

    /// Builds a hitbox from its top-left corner and full dimensions.
    /// Odd dimensions are rounded up.
    pub fn from_rect(x: i32, y: i32, width: i32, height: i32) -> Result<Self> {
        let hw = (width + 1) / 2;
        let hh = (height + 1) / 2;
        Self::new(x + hw, y + hh, hw, hh)
    }

    pub fn with_type(mut self, type_tag: u32) -> Self {
        self.type_tag = type_tag;
        self
    }

    pub fn with_child(mut self, child: Child) -> Self {
        self.child = child;
        self
    }

    pub fn left(&self) -> i32 {
        self.cx - self.hw
    }

    pub fn top(&self) -> i32 {
        self.cy - self.hh
    }

    pub fn right(&self) -> i32 {
        self.cx + self.hw
    }

    pub fn bottom(&self) -> i32 {
        self.cy + self.hh
    }

    pub fn width(&self) -> i32 {
        self.hw * 2
    }

    pub fn height(&self) -> i32 {
        self.hh * 2
    }

    pub fn rect(&self) -> Rect<i32> {
        euclid::rect(self.left(), self.top(), self.width(), self.height())
    }

    pub fn overlaps(&self, other: &Hitbox) -> bool {
        (self.cx - other.cx).abs() < self.hw + other.hw
            && (self.cy - other.cy).abs() < self.hh + other.hh
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= self.left() && x < self.right() && y >= self.top() && y < self.bottom()
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &Hitbox) -> Hitbox {
        let left = self.left().min(other.left());
        let top = self.top().min(other.top());
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        let hw = ((right - left) + 1) / 2;
        let hh = ((bottom - top) + 1) / 2;
        Hitbox {
            cx: left + hw,
            cy: top + hh,
            hw,
            hh,
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_is_strict() {
        let a = Hitbox::new(0, 0, 4, 4).unwrap();
        let touching = Hitbox::new(8, 0, 4, 4).unwrap();
        let inside = Hitbox::new(7, 7, 4, 4).unwrap();
        assert!(!a.overlaps(&touching));
        assert!(a.overlaps(&inside));
        assert!(inside.overlaps(&a));
    }

    #[test]
    fn test_from_rect() {
        let hb = Hitbox::from_rect(10, 20, 8, 6).unwrap();
        assert_eq!((hb.cx, hb.cy, hb.hw, hb.hh), (14, 23, 4, 3));
        assert_eq!(hb.rect(), euclid::rect(10, 20, 8, 6));
        assert!(Hitbox::from_rect(0, 0, 0, 4).is_err());
    }

    #[test]
    fn test_union_covers_both() {
        let a = Hitbox::from_rect(0, 0, 4, 4).unwrap();
        let b = Hitbox::from_rect(10, 2, 4, 4).unwrap();
        let u = a.union(&b);
        assert_eq!(u.left(), 0);
        assert_eq!(u.top(), 0);
        assert_eq!(u.right(), 14);
        assert_eq!(u.bottom(), 6);
    }

    #[test]
    fn test_direction_ops() {
        let d = Direction::LEFT | Direction::UP;
        assert!(d.contains(Direction::LEFT));
        assert!(!d.contains(Direction::HORIZONTAL));
        assert!(d.intersects(Direction::HORIZONTAL));
        assert_eq!(!Direction::HORIZONTAL, Direction::VERTICAL);
    }
}
