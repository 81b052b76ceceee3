use std::collections::{HashSet, VecDeque};

use euclid::default::Rect;

use crate::{
    camera::Camera,
    constants::QT_MAX_DEPTH,
    error::{Error, Result},
    group::Group,
    hitbox::{Child, Hitbox},
    object::Object,
    render::Renderer,
    sprite::Sprite,
    tilemap::Tilemap,
};

/// Outcome of a collide call or of `resume`.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Traversal {
    /// A pair overlaps; read it with `get_overlapping`, then `resume`.
    Overlapped,
    Done,
}

/// The body being inserted and one already in the tree that it touches.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Overlap {
    pub current: Hitbox,
    pub other: Hitbox,
}

#[derive(Clone, Debug)]
struct Node {
    bounds: Rect<i32>,
    depth: u32,
    entries: Vec<usize>,
    // nw, ne, sw, se
    children: Option<[usize; 4]>,
}

#[derive(Copy, Clone, Debug)]
struct Frame {
    node: usize,
    next_child: usize,
}

/// Tests against the entries a leaf held before the body arrived.
#[derive(Copy, Clone, Debug)]
struct Scan {
    node: usize,
    next: usize,
    end: usize,
}

#[derive(Debug)]
struct Operation {
    current: Hitbox,
    entry: Option<usize>,
    testing: bool,
    stack: Vec<Frame>,
    scan: Option<Scan>,
    reported: HashSet<usize>,
}

/// Spatial index rebuilt every frame. Collide calls insert a body while
/// testing it against everything sharing its nodes, pausing on each hit.
#[derive(Debug, Default)]
pub struct Quadtree {
    nodes: Vec<Node>,
    entries: Vec<Hitbox>,
    max_depth: u32,
    nodes_per_quad: usize,
    static_mode: bool,
    continuous: bool,
    pending: VecDeque<Hitbox>,
    active: Option<Operation>,
    last: Option<Overlap>,
}

impl Quadtree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the tree and sets the root's bounds. Leaves split when they
    /// would exceed `nodes_per_quad`, down to `max_depth` levels.
    pub fn init_root(
        &mut self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        max_depth: u32,
        nodes_per_quad: usize,
    ) -> Result<()> {
        if width <= 0 || height <= 0 {
            return Err(Error::ArgumentsBad("quadtree bounds must be positive"));
        }
        if max_depth == 0 || nodes_per_quad == 0 {
            return Err(Error::ArgumentsBad("quadtree needs a depth and node capacity"));
        }
        if max_depth > QT_MAX_DEPTH {
            return Err(Error::QuadtreeStackOverflow);
        }
        self.nodes.clear();
        self.nodes.push(Node {
            bounds: euclid::rect(x, y, width, height),
            depth: 0,
            entries: Vec::new(),
            children: None,
        });
        self.entries.clear();
        self.max_depth = max_depth;
        self.nodes_per_quad = nodes_per_quad;
        self.pending.clear();
        self.active = None;
        self.last = None;
        Ok(())
    }

    /// Collide without inserting: bodies are tested but never stored.
    pub fn set_static(&mut self, static_mode: bool) {
        self.static_mode = static_mode;
    }

    /// Insert objects by the area swept over their last step.
    pub fn set_continuous(&mut self, continuous: bool) {
        self.continuous = continuous;
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn populate_hitbox(&mut self, hitbox: &Hitbox) -> Result<()> {
        self.start(vec![*hitbox], false).map(|_| ())
    }

    pub fn populate_object(&mut self, object: &Object) -> Result<()> {
        let hitbox = self.object_hitbox(object);
        self.start(vec![hitbox], false).map(|_| ())
    }

    pub fn populate_sprite(&mut self, sprite: &Sprite) -> Result<()> {
        self.populate_object(sprite.object())
    }

    pub fn populate_tilemap(&mut self, tilemap: &Tilemap) -> Result<()> {
        self.start(tilemap.areas().to_vec(), false).map(|_| ())
    }

    pub fn populate_group(&mut self, group: &Group) -> Result<()> {
        let bodies = self.group_hitboxes(group);
        self.start(bodies, false).map(|_| ())
    }

    pub fn collide_hitbox(&mut self, hitbox: &Hitbox) -> Result<Traversal> {
        self.start(vec![*hitbox], true)
    }

    pub fn collide_object(&mut self, object: &Object) -> Result<Traversal> {
        let hitbox = self.object_hitbox(object);
        self.start(vec![hitbox], true)
    }

    pub fn collide_sprite(&mut self, sprite: &Sprite) -> Result<Traversal> {
        self.collide_object(sprite.object())
    }

    /// Collides every area of the tilemap in turn.
    pub fn collide_tilemap(&mut self, tilemap: &Tilemap) -> Result<Traversal> {
        self.start(tilemap.areas().to_vec(), true)
    }

    /// Collides the members the group picked in its last update.
    pub fn collide_group(&mut self, group: &Group) -> Result<Traversal> {
        let bodies = self.group_hitboxes(group);
        self.start(bodies, true)
    }

    /// Continues after the pair last reported by a collide call.
    pub fn resume(&mut self) -> Result<Traversal> {
        if self.nodes.is_empty() {
            return Err(Error::QuadtreeNotInitialized);
        }
        if self.active.is_none() {
            return Err(Error::QuadtreeOperationNotActive);
        }
        self.last = None;
        self.run()
    }

    pub fn get_overlapping(&self) -> Result<Overlap> {
        self.last.ok_or(Error::QuadtreeNoOverlap)
    }

    /// Replaces the in-flight body's bounds, e.g. after separating it.
    /// Nodes already visited are not revisited.
    pub fn update_current(&mut self, hitbox: &Hitbox) -> Result<()> {
        let op = self
            .active
            .as_mut()
            .ok_or(Error::QuadtreeOperationNotActive)?;
        op.current = *hitbox;
        if let Some(entry) = op.entry {
            self.entries[entry] = *hitbox;
        }
        Ok(())
    }

    /// Bounds and stored children of every leaf.
    pub fn leaves(&self) -> Vec<(Rect<i32>, Vec<Child>)> {
        self.nodes
            .iter()
            .filter(|node| node.children.is_none())
            .map(|node| {
                let children = node.entries.iter().map(|&e| self.entries[e].child).collect();
                (node.bounds, children)
            })
            .collect()
    }

    pub fn draw_bounds(&self, renderer: &mut dyn Renderer, camera: &Camera) -> Result<()> {
        const NODE_COLORS: [u32; 4] = [0xff5b_6ee1, 0xff63_9bff, 0xff99_e550, 0xfffb_f236];
        const TYPE_COLORS: [u32; 6] = [
            0xffff_ffff,
            0xffd9_5763,
            0xff37_946e,
            0xffdf_7126,
            0xff76_428a,
            0xff84_7e87,
        ];
        let (cx, cy) = camera.position();
        for node in &self.nodes {
            let color = NODE_COLORS[node.depth as usize % NODE_COLORS.len()];
            renderer.draw_rect(node.bounds.translate(euclid::vec2(-cx, -cy)), color)?;
        }
        for hitbox in &self.entries {
            let color = TYPE_COLORS[hitbox.type_tag as usize % TYPE_COLORS.len()];
            renderer.draw_rect(hitbox.rect().translate(euclid::vec2(-cx, -cy)), color)?;
        }
        Ok(())
    }

    fn object_hitbox(&self, object: &Object) -> Hitbox {
        if self.continuous {
            object.swept_hitbox()
        } else {
            *object.hitbox()
        }
    }

    fn group_hitboxes(&self, group: &Group) -> Vec<Hitbox> {
        group
            .collideable()
            .iter()
            .filter_map(|&slot| group.sprite(slot))
            .map(|sprite| self.object_hitbox(sprite.object()))
            .collect()
    }

    fn start(&mut self, bodies: Vec<Hitbox>, testing: bool) -> Result<Traversal> {
        if self.nodes.is_empty() {
            return Err(Error::QuadtreeNotInitialized);
        }
        if self.active.is_some() {
            return Err(Error::OperationActive);
        }
        self.last = None;
        self.pending.extend(bodies);
        self.run_with(testing)
    }

    fn run_with(&mut self, testing: bool) -> Result<Traversal> {
        match self.pending.pop_front() {
            Some(body) => self.begin(body, testing)?,
            None => return Ok(Traversal::Done),
        }
        self.run()
    }

    fn run(&mut self) -> Result<Traversal> {
        while let Some(mut op) = self.active.take() {
            if let Some(overlap) = self.step(&mut op)? {
                self.active = Some(op);
                self.last = Some(overlap);
                return Ok(Traversal::Overlapped);
            }
            if let Some(body) = self.pending.pop_front() {
                self.begin(body, op.testing)?;
            }
        }
        Ok(Traversal::Done)
    }

    fn begin(&mut self, body: Hitbox, testing: bool) -> Result<()> {
        let mut op = Operation {
            current: body,
            entry: None,
            testing,
            stack: Vec::with_capacity(self.max_depth as usize + 1),
            scan: None,
            reported: HashSet::new(),
        };
        if self.nodes[0].bounds.intersects(&body.rect()) {
            if !(testing && self.static_mode) {
                self.entries.push(body);
                op.entry = Some(self.entries.len() - 1);
            }
            self.enter(0, &mut op)?;
        }
        self.active = Some(op);
        Ok(())
    }

    /// Walks the tree until the next overlapping pair, or `None` once the
    /// body has been placed everywhere it belongs.
    fn step(&mut self, op: &mut Operation) -> Result<Option<Overlap>> {
        loop {
            if let Some(scan) = op.scan.as_mut() {
                let node = &self.nodes[scan.node];
                while scan.next < scan.end {
                    let other = node.entries[scan.next];
                    scan.next += 1;
                    if Some(other) == op.entry || op.reported.contains(&other) {
                        continue;
                    }
                    let hitbox = self.entries[other];
                    if hitbox.overlaps(&op.current) {
                        op.reported.insert(other);
                        return Ok(Some(Overlap {
                            current: op.current,
                            other: hitbox,
                        }));
                    }
                }
                op.scan = None;
            }

            let frame = match op.stack.last_mut() {
                Some(frame) => frame,
                None => return Ok(None),
            };
            let children = match self.nodes[frame.node].children {
                Some(children) if frame.next_child < children.len() => children,
                _ => {
                    op.stack.pop();
                    continue;
                }
            };
            let child = children[frame.next_child];
            frame.next_child += 1;
            if self.nodes[child].bounds.intersects(&op.current.rect()) {
                self.enter(child, op)?;
            }
        }
    }

    fn enter(&mut self, node: usize, op: &mut Operation) -> Result<()> {
        if self.nodes[node].children.is_none() {
            let len = self.nodes[node].entries.len();
            match op.entry {
                Some(entry) => {
                    let depth = self.nodes[node].depth;
                    if len < self.nodes_per_quad || depth + 1 >= self.max_depth {
                        self.nodes[node].entries.push(entry);
                        if op.testing {
                            op.scan = Some(Scan { node, next: 0, end: len });
                        }
                        return Ok(());
                    }
                    self.subdivide(node);
                }
                None => {
                    op.scan = Some(Scan { node, next: 0, end: len });
                    return Ok(());
                }
            }
        }
        if op.stack.len() > self.max_depth as usize {
            return Err(Error::QuadtreeStackOverflow);
        }
        op.stack.push(Frame { node, next_child: 0 });
        Ok(())
    }

    fn subdivide(&mut self, node: usize) {
        let (bounds, depth) = (self.nodes[node].bounds, self.nodes[node].depth);
        let left_w = bounds.size.width / 2;
        let top_h = bounds.size.height / 2;
        let right_w = bounds.size.width - left_w;
        let bottom_h = bounds.size.height - top_h;
        let (x, y) = (bounds.origin.x, bounds.origin.y);
        let quadrants = [
            euclid::rect(x, y, left_w, top_h),
            euclid::rect(x + left_w, y, right_w, top_h),
            euclid::rect(x, y + top_h, left_w, bottom_h),
            euclid::rect(x + left_w, y + top_h, right_w, bottom_h),
        ];

        let entries = std::mem::take(&mut self.nodes[node].entries);
        let mut children = [0; 4];
        for (i, quadrant) in quadrants.iter().enumerate() {
            let held = entries
                .iter()
                .copied()
                .filter(|&e| quadrant.intersects(&self.entries[e].rect()))
                .collect();
            children[i] = self.nodes.len();
            self.nodes.push(Node {
                bounds: *quadrant,
                depth: depth + 1,
                entries: held,
                children: None,
            });
        }
        self.nodes[node].children = Some(children);
        log::debug!(
            "Quadtree split {:?} at depth {} ({} entries)",
            bounds,
            depth,
            entries.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(cx: i32, cy: i32, half: i32, id: usize) -> Hitbox {
        Hitbox::new(cx, cy, half, half)
            .unwrap()
            .with_child(Child::Object(id))
    }

    /// Drains a collide call, returning the reported pairs as child ids.
    fn drain(qt: &mut Quadtree, mut status: Traversal) -> Vec<(Child, Child)> {
        let mut pairs = Vec::new();
        while status == Traversal::Overlapped {
            let overlap = qt.get_overlapping().unwrap();
            pairs.push((overlap.current.child, overlap.other.child));
            status = qt.resume().unwrap();
        }
        assert!(matches!(qt.get_overlapping(), Err(Error::QuadtreeNoOverlap)));
        pairs
    }

    #[test]
    fn test_partition() {
        let mut qt = Quadtree::new();
        qt.init_root(0, 0, 100, 100, 2, 2).unwrap();
        qt.populate_hitbox(&body(10, 10, 2, 0)).unwrap();
        qt.populate_hitbox(&body(20, 20, 2, 1)).unwrap();
        assert_eq!(qt.leaves().len(), 1);
        qt.populate_hitbox(&body(90, 90, 2, 2)).unwrap();

        let leaves = qt.leaves();
        assert_eq!(leaves.len(), 4);
        assert_eq!(leaves[0].0, euclid::rect(0, 0, 50, 50));
        assert_eq!(leaves[0].1, vec![Child::Object(0), Child::Object(1)]);
        assert_eq!(leaves[3].0, euclid::rect(50, 50, 50, 50));
        assert_eq!(leaves[3].1, vec![Child::Object(2)]);
        assert!(leaves[1].1.is_empty() && leaves[2].1.is_empty());
    }

    #[test]
    fn test_spanning_body_reported_once() {
        let mut qt = Quadtree::new();
        qt.init_root(0, 0, 100, 100, 3, 1).unwrap();
        // sits across all four quadrants once the root splits
        qt.populate_hitbox(&body(50, 50, 10, 0)).unwrap();
        qt.populate_hitbox(&body(30, 30, 4, 1)).unwrap();
        let status = qt.collide_hitbox(&body(50, 50, 20, 2)).unwrap();
        let mut pairs = drain(&mut qt, status);
        pairs.sort_by_key(|(_, other)| format!("{:?}", other));
        assert_eq!(
            pairs,
            vec![
                (Child::Object(2), Child::Object(0)),
                (Child::Object(2), Child::Object(1)),
            ]
        );
    }

    #[test]
    fn test_disjoint_bodies_never_reported() {
        let mut qt = Quadtree::new();
        qt.init_root(0, 0, 64, 64, 4, 4).unwrap();
        qt.populate_hitbox(&body(8, 8, 4, 0)).unwrap();
        // touching edges do not overlap
        let status = qt.collide_hitbox(&body(16, 8, 4, 1)).unwrap();
        assert_eq!(status, Traversal::Done);
    }

    #[test]
    fn test_static_mode_does_not_insert() {
        let mut qt = Quadtree::new();
        qt.init_root(0, 0, 64, 64, 4, 4).unwrap();
        qt.populate_hitbox(&body(8, 8, 4, 0)).unwrap();
        qt.set_static(true);
        let status = qt.collide_hitbox(&body(10, 10, 4, 1)).unwrap();
        assert_eq!(drain(&mut qt, status).len(), 1);
        assert_eq!(qt.leaves()[0].1, vec![Child::Object(0)]);
    }

    #[test]
    fn test_update_current_drives_remaining_tests() {
        let mut qt = Quadtree::new();
        qt.init_root(0, 0, 64, 64, 4, 8).unwrap();
        qt.populate_hitbox(&body(10, 10, 4, 0)).unwrap();
        qt.populate_hitbox(&body(14, 10, 4, 1)).unwrap();
        let status = qt.collide_hitbox(&body(12, 12, 4, 2)).unwrap();
        assert_eq!(status, Traversal::Overlapped);
        assert_eq!(qt.get_overlapping().unwrap().other.child, Child::Object(0));
        // pushed away from both
        qt.update_current(&body(40, 40, 4, 2)).unwrap();
        assert_eq!(qt.resume().unwrap(), Traversal::Done);
    }

    #[test]
    fn test_outside_root_is_done() {
        let mut qt = Quadtree::new();
        qt.init_root(0, 0, 32, 32, 2, 2).unwrap();
        assert_eq!(qt.collide_hitbox(&body(100, 100, 4, 0)).unwrap(), Traversal::Done);
        assert!(qt.leaves()[0].1.is_empty());
    }

    #[test]
    fn test_operation_guards() {
        let mut qt = Quadtree::new();
        assert!(matches!(
            qt.collide_hitbox(&body(1, 1, 1, 0)),
            Err(Error::QuadtreeNotInitialized)
        ));
        assert!(matches!(
            qt.init_root(0, 0, 8, 8, QT_MAX_DEPTH + 1, 2),
            Err(Error::QuadtreeStackOverflow)
        ));
        qt.init_root(0, 0, 32, 32, 2, 2).unwrap();
        assert!(matches!(qt.resume(), Err(Error::QuadtreeOperationNotActive)));
        qt.populate_hitbox(&body(8, 8, 4, 0)).unwrap();
        assert_eq!(qt.collide_hitbox(&body(8, 8, 4, 1)).unwrap(), Traversal::Overlapped);
        assert!(matches!(
            qt.populate_hitbox(&body(20, 20, 2, 2)),
            Err(Error::OperationActive)
        ));
        assert_eq!(qt.resume().unwrap(), Traversal::Done);
        assert!(!qt.is_active());
    }

    #[test]
    fn test_deep_split_respects_max_depth() {
        let mut qt = Quadtree::new();
        qt.init_root(0, 0, 64, 64, 3, 1).unwrap();
        for i in 0..6 {
            qt.populate_hitbox(&body(4, 4, 1, i)).unwrap();
        }
        let crowded = qt
            .leaves()
            .into_iter()
            .find(|(bounds, _)| bounds.contains(euclid::point2(4, 4)))
            .unwrap();
        assert_eq!(crowded.0.size.width, 16);
        assert_eq!(crowded.1.len(), 6);
    }
}
