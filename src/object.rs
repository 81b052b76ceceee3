use crate::{
    constants::TYPE_OBJECT,
    error::{Error, Result},
    hitbox::{Child, Direction, Hitbox},
};

/// Which side of an overlap is allowed to move.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum CollisionMode {
    /// Only report contact.
    None,
    FirstFixed,
    SecondFixed,
    /// Push both apart by half the penetration.
    Full,
}

/// A moving AABB body. `dx`/`dy` is the fractional top-left corner; the
/// integer hitbox follows its floor after every update or displacement.
#[derive(Clone, Debug)]
pub struct Object {
    hitbox: Hitbox,
    dx: f64,
    dy: f64,
    ldx: f64,
    ldy: f64,
    vx: f64,
    vy: f64,
    ax: f64,
    ay: f64,
    drag_x: f64,
    drag_y: f64,
    max_vx: f64,
    max_vy: f64,
    fixed: bool,
    touching: Direction,
    last_touched: Direction,
    instant: Direction,
}

impl Object {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Result<Self> {
        let hitbox = Hitbox::from_rect(x, y, width, height)?.with_type(TYPE_OBJECT);
        Ok(Self {
            hitbox,
            dx: x as f64,
            dy: y as f64,
            ldx: x as f64,
            ldy: y as f64,
            vx: 0.,
            vy: 0.,
            ax: 0.,
            ay: 0.,
            drag_x: 0.,
            drag_y: 0.,
            max_vx: 0.,
            max_vy: 0.,
            fixed: false,
            touching: Direction::NONE,
            last_touched: Direction::NONE,
            instant: Direction::NONE,
        })
    }

    pub fn hitbox(&self) -> &Hitbox {
        &self.hitbox
    }

    /// Box this body covered over the last step.
    pub fn swept_hitbox(&self) -> Hitbox {
        let last = Hitbox {
            cx: self.ldx.floor() as i32 + self.hitbox.hw,
            cy: self.ldy.floor() as i32 + self.hitbox.hh,
            ..self.hitbox
        };
        self.hitbox.union(&last)
    }

    pub fn set_type(&mut self, type_tag: u32) {
        self.hitbox.type_tag = type_tag;
    }

    pub fn type_tag(&self) -> u32 {
        self.hitbox.type_tag
    }

    pub fn set_child(&mut self, child: Child) {
        self.hitbox.child = child;
    }

    pub fn child(&self) -> Child {
        self.hitbox.child
    }

    pub fn set_hit_flags(&mut self, flags: Direction) {
        self.hitbox.hit_flags = flags;
    }

    pub fn set_dimensions(&mut self, width: i32, height: i32) -> Result<()> {
        if width <= 0 || height <= 0 {
            return Err(Error::ArgumentsBad("dimensions must be positive"));
        }
        self.hitbox.hw = (width + 1) / 2;
        self.hitbox.hh = (height + 1) / 2;
        self.sync();
        Ok(())
    }

    pub fn dimensions(&self) -> (i32, i32) {
        (self.hitbox.width(), self.hitbox.height())
    }

    /// Moves the body without touching its last-frame position.
    pub fn set_position(&mut self, x: f64, y: f64) {
        self.dx = x;
        self.dy = y;
        self.sync();
    }

    /// Moves the body as if it had always been there.
    pub fn teleport(&mut self, x: f64, y: f64) {
        self.set_position(x, y);
        self.ldx = x;
        self.ldy = y;
    }

    pub fn set_center(&mut self, cx: i32, cy: i32) {
        let x = (cx - self.hitbox.hw) as f64;
        let y = (cy - self.hitbox.hh) as f64;
        self.set_position(x, y);
    }

    pub fn x(&self) -> i32 {
        self.dx.floor() as i32
    }

    pub fn y(&self) -> i32 {
        self.dy.floor() as i32
    }

    pub fn position(&self) -> (f64, f64) {
        (self.dx, self.dy)
    }

    pub fn last_position(&self) -> (f64, f64) {
        (self.ldx, self.ldy)
    }

    pub fn center(&self) -> (i32, i32) {
        (self.hitbox.cx, self.hitbox.cy)
    }

    pub fn last_center(&self) -> (i32, i32) {
        (
            self.ldx.floor() as i32 + self.hitbox.hw,
            self.ldy.floor() as i32 + self.hitbox.hh,
        )
    }

    pub fn set_velocity(&mut self, vx: f64, vy: f64) {
        self.vx = vx;
        self.vy = vy;
    }

    pub fn velocity(&self) -> (f64, f64) {
        (self.vx, self.vy)
    }

    pub fn set_acceleration(&mut self, ax: f64, ay: f64) {
        self.ax = ax;
        self.ay = ay;
    }

    pub fn acceleration(&self) -> (f64, f64) {
        (self.ax, self.ay)
    }

    pub fn set_drag(&mut self, drag_x: f64, drag_y: f64) -> Result<()> {
        if drag_x < 0. || drag_y < 0. {
            return Err(Error::NegativeDrag);
        }
        self.drag_x = drag_x;
        self.drag_y = drag_y;
        Ok(())
    }

    pub fn drag(&self) -> (f64, f64) {
        (self.drag_x, self.drag_y)
    }

    /// Zero disables the limit on that axis.
    pub fn set_max_speed(&mut self, max_vx: f64, max_vy: f64) {
        self.max_vx = max_vx.abs();
        self.max_vy = max_vy.abs();
    }

    pub fn set_fixed(&mut self, fixed: bool) {
        self.fixed = fixed;
    }

    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Contacts since the last update.
    pub fn collision(&self) -> Direction {
        self.touching
    }

    /// Contacts of the previous update.
    pub fn last_collision(&self) -> Direction {
        self.last_touched
    }

    /// Contacts from the most recent overlap call only.
    pub fn current_collision(&self) -> Direction {
        self.instant
    }

    pub fn update(&mut self, ms: u32) {
        let dt = ms as f64 / 1000.;
        self.ldx = self.dx;
        self.ldy = self.dy;
        integrate(&mut self.dx, &mut self.vx, self.ax, self.drag_x, self.max_vx, dt);
        integrate(&mut self.dy, &mut self.vy, self.ay, self.drag_y, self.max_vy, dt);
        self.sync();
        self.last_touched = self.touching;
        self.touching = Direction::NONE;
    }

    /// Carries along whatever `other` moved during its last update.
    pub fn apply_delta(&mut self, other: &Object) {
        self.apply_delta_x(other);
        self.apply_delta_y(other);
    }

    pub fn apply_delta_x(&mut self, other: &Object) {
        self.dx += other.dx - other.ldx;
        self.sync();
    }

    pub fn apply_delta_y(&mut self, other: &Object) {
        self.dy += other.dy - other.ldy;
        self.sync();
    }

    /// Distance between both centers, from self to other.
    pub fn distance(&self, other: &Object) -> (i32, i32) {
        (
            other.hitbox.cx - self.hitbox.cx,
            other.hitbox.cy - self.hitbox.cy,
        )
    }

    pub fn is_point_inside(&self, x: i32, y: i32) -> bool {
        self.hitbox.contains_point(x, y)
    }

    pub fn is_overlapping(&self, other: &Object) -> bool {
        self.hitbox.overlaps(&other.hitbox)
    }

    fn sync(&mut self) {
        self.hitbox.cx = self.dx.floor() as i32 + self.hitbox.hw;
        self.hitbox.cy = self.dy.floor() as i32 + self.hitbox.hh;
    }

    fn body(&self) -> Body {
        let (lcx, lcy) = self.last_center();
        Body {
            cx: self.hitbox.cx,
            cy: self.hitbox.cy,
            lcx,
            lcy,
            hw: self.hitbox.hw,
            hh: self.hitbox.hh,
            faces: self.hitbox.hit_flags,
        }
    }

    fn rewind(&mut self, t: f64) {
        self.dx = self.ldx + (self.dx - self.ldx) * t;
        self.dy = self.ldy + (self.dy - self.ldy) * t;
        self.sync();
    }

    fn apply(&mut self, shift: (i32, i32), contact: Direction) {
        self.dx += shift.0 as f64;
        self.dy += shift.1 as f64;
        self.sync();
        self.instant = contact;
        self.touching |= contact;
    }
}

fn integrate(pos: &mut f64, vel: &mut f64, acc: f64, drag: f64, max: f64, dt: f64) {
    if acc != 0. {
        *vel += acc * dt;
    } else if drag > 0. {
        let slow = drag * dt;
        if vel.abs() <= slow {
            *vel = 0.;
        } else {
            *vel -= slow * vel.signum();
        }
    }
    if max > 0. && vel.abs() > max {
        *vel = max * vel.signum();
    }
    *pos += *vel * dt;
}

/// Snapshot of what overlap resolution needs from either side.
#[derive(Copy, Clone, Debug)]
struct Body {
    cx: i32,
    cy: i32,
    lcx: i32,
    lcy: i32,
    hw: i32,
    hh: i32,
    faces: Direction,
}

impl Body {
    fn from_hitbox(hitbox: &Hitbox) -> Self {
        Body {
            cx: hitbox.cx,
            cy: hitbox.cy,
            lcx: hitbox.cx,
            lcy: hitbox.cy,
            hw: hitbox.hw,
            hh: hitbox.hh,
            faces: hitbox.hit_flags,
        }
    }
}

#[derive(Default, Debug)]
struct Resolution {
    overlapping: bool,
    shift_a: (i32, i32),
    shift_b: (i32, i32),
    contact_a: Direction,
    contact_b: Direction,
}

struct Axis {
    center_a: i32,
    center_b: i32,
    last_a: i32,
    last_b: i32,
    half_a: i32,
    half_b: i32,
}

impl Axis {
    fn penetration(&self) -> i32 {
        self.half_a + self.half_b - (self.center_a - self.center_b).abs()
    }

    fn last_penetration(&self) -> i32 {
        self.half_a + self.half_b - (self.last_a - self.last_b).abs()
    }

    fn nested(&self) -> bool {
        let dist = (self.center_a - self.center_b).abs();
        dist + self.half_a <= self.half_b || dist + self.half_b <= self.half_a
    }

    fn a_first(&self) -> bool {
        self.center_a <= self.center_b
    }
}

fn resolve(a: &Body, b: &Body, mode: CollisionMode) -> Resolution {
    let hor = Axis {
        center_a: a.cx,
        center_b: b.cx,
        last_a: a.lcx,
        last_b: b.lcx,
        half_a: a.hw,
        half_b: b.hw,
    };
    let ver = Axis {
        center_a: a.cy,
        center_b: b.cy,
        last_a: a.lcy,
        last_b: b.lcy,
        half_a: a.hh,
        half_b: b.hh,
    };
    let hx = hor.penetration();
    let hy = ver.penetration();
    let mut res = Resolution::default();
    if hx <= 0 || hy <= 0 {
        return res;
    }
    res.overlapping = true;

    let mut new_x = hor.last_penetration() <= 0;
    let mut new_y = ver.last_penetration() <= 0;
    if new_x && new_y {
        // Diagonal entry: an axis where one body spans the other can't be
        // the side that was hit.
        if hor.nested() {
            new_x = false;
        } else if ver.nested() {
            new_y = false;
        }
    }

    if new_x {
        let (face_a, face_b) = if hor.a_first() {
            (Direction::RIGHT, Direction::LEFT)
        } else {
            (Direction::LEFT, Direction::RIGHT)
        };
        if a.faces.contains(face_a) && b.faces.contains(face_b) {
            let sign = if hor.a_first() { -1 } else { 1 };
            let (sa, sb) = split(hx, mode);
            res.shift_a.0 = sign * sa;
            res.shift_b.0 = -sign * sb;
            res.contact_a |= face_a;
            res.contact_b |= face_b;
        }
    }
    if new_y {
        let (face_a, face_b) = if ver.a_first() {
            (Direction::DOWN, Direction::UP)
        } else {
            (Direction::UP, Direction::DOWN)
        };
        if a.faces.contains(face_a) && b.faces.contains(face_b) {
            let sign = if ver.a_first() { -1 } else { 1 };
            let (sa, sb) = split(hy, mode);
            res.shift_a.1 = sign * sa;
            res.shift_b.1 = -sign * sb;
            res.contact_a |= face_a;
            res.contact_b |= face_b;
        }
    }
    res
}

/// How far each side moves for a given penetration.
fn split(pen: i32, mode: CollisionMode) -> (i32, i32) {
    match mode {
        CollisionMode::None => (0, 0),
        CollisionMode::FirstFixed => (0, pen),
        CollisionMode::SecondFixed => (pen, 0),
        CollisionMode::Full => {
            let half = (pen + 1) / 2;
            (half, pen - half)
        }
    }
}

/// Separates two overlapping bodies along every axis that only started
/// overlapping this frame. Returns whether they overlap at all.
pub fn overlap(a: &mut Object, b: &mut Object, mode: CollisionMode) -> bool {
    let res = resolve(&a.body(), &b.body(), mode);
    if res.overlapping {
        a.apply(res.shift_a, res.contact_a);
        b.apply(res.shift_b, res.contact_b);
    }
    res.overlapping
}

/// Like `overlap`, with the mode derived from each body's fixed flag.
pub fn collide(a: &mut Object, b: &mut Object) -> Result<bool> {
    let mode = match (a.fixed, b.fixed) {
        (true, true) => return Err(Error::ObjectsCantCollide),
        (true, false) => CollisionMode::FirstFixed,
        (false, true) => CollisionMode::SecondFixed,
        (false, false) => CollisionMode::Full,
    };
    Ok(overlap(a, b, mode))
}

/// Resolves an object against a static hitbox (e.g. a tilemap area).
pub fn collide_hitbox(obj: &mut Object, hitbox: &Hitbox) -> Result<bool> {
    if obj.fixed {
        return Err(Error::ObjectsCantCollide);
    }
    let res = resolve(&obj.body(), &Body::from_hitbox(hitbox), CollisionMode::SecondFixed);
    if res.overlapping {
        obj.apply(res.shift_a, res.contact_a);
    }
    Ok(res.overlapping)
}

/// Continuous variant of `overlap` for bodies fast enough to skip through
/// each other within a step. Falls back to `overlap` when both were already
/// overlapping on the previous frame.
pub fn overlap_swept(a: &mut Object, b: &mut Object, mode: CollisionMode) -> bool {
    let last_a = a.last_center();
    let last_b = b.last_center();
    let were_overlapping = (last_a.0 - last_b.0).abs() < a.hitbox.hw + b.hitbox.hw
        && (last_a.1 - last_b.1).abs() < a.hitbox.hh + b.hitbox.hh;
    if were_overlapping {
        return overlap(a, b, mode);
    }

    let hit = match sweep(a, b) {
        Some(hit) => hit,
        None => return false,
    };

    // Rewind every body allowed to move to the moment of contact.
    match mode {
        CollisionMode::None => {}
        CollisionMode::FirstFixed => b.rewind(hit.time),
        CollisionMode::SecondFixed => a.rewind(hit.time),
        CollisionMode::Full => {
            a.rewind(hit.time);
            b.rewind(hit.time);
        }
    }

    // Snap away whatever rounding left overlapping.
    let res = resolve(
        &Body {
            lcx: if hit.horizontal { i32::MIN / 2 } else { a.hitbox.cx },
            lcy: if hit.horizontal { a.hitbox.cy } else { i32::MIN / 2 },
            ..a.body()
        },
        &Body {
            lcx: b.hitbox.cx,
            lcy: b.hitbox.cy,
            ..b.body()
        },
        mode,
    );
    a.apply(res.shift_a, hit.contact_a | res.contact_a);
    b.apply(res.shift_b, hit.contact_b | res.contact_b);
    true
}

struct SweepHit {
    time: f64,
    horizontal: bool,
    contact_a: Direction,
    contact_b: Direction,
}

/// Slab test of a's motion relative to b against b expanded by a's
/// half-extents.
fn sweep(a: &Object, b: &Object) -> Option<SweepHit> {
    let hw = (a.hitbox.hw + b.hitbox.hw) as f64;
    let hh = (a.hitbox.hh + b.hitbox.hh) as f64;
    let start = (a.ldx - b.ldx, a.ldy - b.ldy);
    let motion = (
        (a.dx - a.ldx) - (b.dx - b.ldx),
        (a.dy - a.ldy) - (b.dy - b.ldy),
    );
    // Centers differ from corners by the half-extents.
    let offset = (
        (a.hitbox.hw - b.hitbox.hw) as f64,
        (a.hitbox.hh - b.hitbox.hh) as f64,
    );
    let (enter_x, exit_x) = slab(start.0 + offset.0, motion.0, hw)?;
    let (enter_y, exit_y) = slab(start.1 + offset.1, motion.1, hh)?;
    let enter = enter_x.max(enter_y);
    let exit = exit_x.min(exit_y);
    if enter >= exit || enter < 0. || enter > 1. {
        return None;
    }
    let horizontal = enter_x >= enter_y;
    let (contact_a, contact_b) = if horizontal {
        if motion.0 > 0. {
            (Direction::RIGHT, Direction::LEFT)
        } else {
            (Direction::LEFT, Direction::RIGHT)
        }
    } else if motion.1 > 0. {
        (Direction::DOWN, Direction::UP)
    } else {
        (Direction::UP, Direction::DOWN)
    };
    Some(SweepHit {
        time: enter,
        horizontal,
        contact_a,
        contact_b,
    })
}

fn slab(start: f64, motion: f64, half: f64) -> Option<(f64, f64)> {
    if motion == 0. {
        if start.abs() < half {
            Some((f64::NEG_INFINITY, f64::INFINITY))
        } else {
            None
        }
    } else {
        let t1 = (-half - start) / motion;
        let t2 = (half - start) / motion;
        Some((t1.min(t2), t1.max(t2)))
    }
}
