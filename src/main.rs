use std::{path::PathBuf, rc::Rc};

use anyhow::{Context as _, Result};
use image::{Rgba, RgbaImage};
use rand::{rngs::SmallRng, Rng, SeedableRng};

use gframe::{
    constants::{QT_DEFAULT_DEPTH, QT_DEFAULT_NODES, TYPE_MAX},
    context::{Config, Context, Event, State},
    group::{CollisionQuality, DrawOrder, Group},
    hitbox::{Child, Direction},
    input::{InputEvent, Interface, Key},
    object,
    platform::Headless,
    quadtree::{Quadtree, Traversal},
    sprite::Sprite,
    spriteset::Spriteset,
    tilemap::Tilemap,
};

const FLOOR: u32 = TYPE_MAX + 1;
const PARTICLE: u32 = TYPE_MAX + 2;
const PLAYER: u32 = TYPE_MAX + 3;

const TILE_PLAYER: i32 = 4;
const TILE_SPARK: i32 = 5;

const RUN_FRAMES: u64 = 240;
const GRAVITY: f64 = 400.;

const LEVEL: &str = "
ground 1
ground 2
ground 3
map 40 15
0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0
0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0
0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0
0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0
0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0
0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0
0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0
0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0
0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0
0,0,0,0,0,0,0,0,0,0,0,0,0,0,1,1,1,1,1,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0
0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0
0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,1,1,1,1,1,1,0,0,0,0,0,0,0,0
0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0,0
1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,2,2,2,2,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1
1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1
";

/// 64x8 sheet: empty, ground, two lava frames, player, spark.
fn tile_sheet() -> RgbaImage {
    let colors = [
        [0, 0, 0, 0],
        [0x8f, 0x56, 0x3b, 0xff],
        [0xd9, 0x57, 0x63, 0xff],
        [0xdf, 0x71, 0x26, 0xff],
        [0x5b, 0x6e, 0xe1, 0xff],
        [0xfb, 0xf2, 0x36, 0xff],
    ];
    let mut image = RgbaImage::new(64, 8);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let tile = (x / 8) as usize;
        if let Some(color) = colors.get(tile) {
            let spark_edge = tile == TILE_SPARK as usize && (x % 8 < 2 || x % 8 > 5 || y < 2 || y > 5);
            if !spark_edge {
                *pixel = Rgba(*color);
            }
        }
    }
    image
}

struct Demo {
    keys: Controls,
    player: Sprite,
    sparks: Group,
    level: Tilemap,
    quadtree: Quadtree,
    rng: SmallRng,
}

struct Controls {
    left: usize,
    right: usize,
    jump: usize,
}

impl Demo {
    fn new(ctx: &mut Context) -> Result<Self> {
        let texture = ctx.renderer().add_texture(tile_sheet())?;
        let sset = Rc::new(Spriteset::new(texture, 8, 8)?);

        let mut level = Tilemap::new(Rc::clone(&sset), 1, 1, 0)?;
        level.set_id(1);
        level.add_animation(&[2, 3], 4, true)?;
        level
            .load_str(LEVEL, &[("ground", FLOOR)])
            .context("failed to parse the level")?;
        let (world_width, world_height) = level.dimensions();
        ctx.camera_mut().set_world_dimensions(world_width, world_height)?;
        ctx.camera_mut().set_deadzone(56, 40, 48, 40)?;

        let mut player = Sprite::new(16, 64, 6, 8, Some(Rc::clone(&sset)), -1, 0)?;
        player.set_type(PLAYER);
        player.set_child(Child::Sprite(0));
        player.set_frame(TILE_PLAYER);
        player.set_acceleration(0., GRAVITY);
        player.object_mut().set_max_speed(80., 300.);
        player.set_drag(400., 0.)?;

        let mut sparks = Group::new(2);
        sparks.pre_cache(16, 256)?;
        sparks.set_def_type(PARTICLE);
        sparks.set_def_spriteset(Rc::clone(&sset));
        sparks.set_def_dimensions(4, 4, -2, -2)?;
        sparks.set_def_acceleration(0., GRAVITY / 2.);
        sparks.set_death_on_leave(true);
        sparks.set_death_on_time(1500)?;
        sparks.set_draw_order(DrawOrder::NewestFirst);
        sparks.set_collision_quality(CollisionQuality::EverySecond);

        let input = ctx.input_mut();
        let keys = Controls {
            left: input.add_virtual_key(),
            right: input.add_virtual_key(),
            jump: input.add_virtual_key(),
        };
        input.bind(keys.left, Interface::Key(Key::Left))?;
        input.bind(keys.right, Interface::Key(Key::Right))?;
        input.bind(keys.jump, Interface::Key(Key::Z))?;
        input.bind(keys.jump, Interface::Key(Key::Space))?;

        Ok(Self {
            keys,
            player,
            sparks,
            level,
            quadtree: Quadtree::new(),
            rng: SmallRng::seed_from_u64(48),
        })
    }

    fn spawn_sparks(&mut self) -> gframe::Result<()> {
        let (x, y) = self.player.position();
        for _ in 0..2 {
            match self.sparks.recycle() {
                Ok(_) => {}
                Err(gframe::Error::GroupMaxSprites) => return Ok(()),
                Err(e) => return Err(e),
            }
            let vx = self.rng.gen_range(-60., 60.);
            let vy = self.rng.gen_range(-160., -60.);
            self.sparks.set_position(x as f64, y as f64)?;
            self.sparks.set_velocity(vx, vy)?;
            self.sparks.set_frame(TILE_SPARK)?;
        }
        Ok(())
    }

    fn collide(&mut self) -> gframe::Result<()> {
        let (width, height) = self.level.dimensions();
        self.quadtree.init_root(
            -8,
            -8,
            width + 16,
            height + 16,
            QT_DEFAULT_DEPTH,
            QT_DEFAULT_NODES,
        )?;
        self.quadtree.populate_tilemap(&self.level)?;

        let mut status = self.quadtree.collide_sprite(&self.player)?;
        while status == Traversal::Overlapped {
            let overlap = self.quadtree.get_overlapping()?;
            if overlap.other.type_tag == FLOOR {
                object::collide_hitbox(self.player.object_mut(), &overlap.other)?;
                self.quadtree.update_current(self.player.hitbox())?;
            }
            status = self.quadtree.resume()?;
        }

        let mut status = self.quadtree.collide_group(&self.sparks)?;
        while status == Traversal::Overlapped {
            let overlap = self.quadtree.get_overlapping()?;
            if let (Child::Slot { slot, .. }, FLOOR) = (overlap.current.child, overlap.other.type_tag) {
                if self.sparks.is_alive(slot) {
                    self.sparks.kill(slot)?;
                }
            }
            status = self.quadtree.resume()?;
        }
        Ok(())
    }
}

impl State for Demo {
    fn update(&mut self, ctx: &mut Context) -> gframe::Result<()> {
        let ms = ctx.update_ms();
        let input = ctx.input();
        let left = input.key_state(self.keys.left)?.state;
        let right = input.key_state(self.keys.right)?.state;
        let jump = input.key_state(self.keys.jump)?.state;

        let (_, vy) = self.player.object().velocity();
        let ax = match (left.is_pressed(), right.is_pressed()) {
            (true, false) => -300.,
            (false, true) => 300.,
            _ => 0.,
        };
        self.player.set_acceleration(ax, GRAVITY);
        if ax != 0. {
            self.player.set_direction(ax < 0.);
        }
        if jump.just_pressed() && self.player.object().last_collision().intersects(Direction::DOWN) {
            let (vx, _) = self.player.object().velocity();
            self.player.set_velocity(vx, -180.);
            self.spawn_sparks()?;
        } else if vy.abs() < 1. && ax != 0. && ctx.elapsed_ms() % 200 < ms as u64 {
            self.spawn_sparks()?;
        }

        self.level.update(ms);
        self.player.update(ms);
        self.sparks.update(ms, ctx.camera());
        self.collide()?;

        let (cx, cy) = self.player.object().center();
        ctx.camera_mut().center_at_point(cx, cy);
        Ok(())
    }

    fn draw(&mut self, ctx: &mut Context) -> gframe::Result<()> {
        let (renderer, camera) = ctx.draw_target();
        self.level.draw(renderer, camera)?;
        self.sparks.draw(renderer, camera)?;
        self.player.draw(renderer, camera)
    }
}

/// Holds right and jumps a few times, so the run exercises every system.
fn script(source: &mut Headless) {
    source.schedule(10, Event::Input(InputEvent::KeyDown(Key::Right)));
    for &frame in &[40, 90, 150, 200] {
        source.schedule(frame, Event::Input(InputEvent::KeyDown(Key::Z)));
        source.schedule(frame + 12, Event::Input(InputEvent::KeyUp(Key::Z)));
    }
    source.schedule(120, Event::Input(InputEvent::KeyUp(Key::Right)));
    source.schedule(125, Event::Input(InputEvent::KeyDown(Key::Left)));
    source.schedule(180, Event::Input(InputEvent::KeyUp(Key::Left)));
    source.schedule(182, Event::Input(InputEvent::KeyDown(Key::Right)));
    source.quit_after(RUN_FRAMES);
}

fn main() -> Result<()> {
    env_logger::init();

    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let config = Config {
        organization: "gframe".to_string(),
        title: "demo".to_string(),
        save_dir: out_dir.join("saves"),
        ..Config::default()
    };
    let mut ctx = Context::headless(config)?;
    let mut demo = Demo::new(&mut ctx)?;

    let mut save = ctx.save("progress")?;
    let runs = save.read_int("runs").unwrap_or(0) + 1;
    save.write_int("runs", runs)?;
    log::info!("Demo run #{}", runs);

    let mut source = Headless::new(ctx.fps())?;
    script(&mut source);
    ctx.record_gif(2000, out_dir.join("demo.gif"))?;
    ctx.run(&mut source, &mut demo)?;

    ctx.snapshot(out_dir.join("last_frame.gif"))?;
    save.write_float("last_x", demo.player.object().position().0 as f32)?;
    save.close()?;
    log::info!("Wrote {}", out_dir.display());
    Ok(())
}
