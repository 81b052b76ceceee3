//! A 2D game framework: a fixed-timestep loop, sprites, tilemaps and
//! groups, AABB collision through a resumable quadtree, rebindable input,
//! plus audio mixing, GIF capture and save files.

pub mod accumulator;
pub mod animation;
pub mod audio;
pub mod camera;
pub mod constants;
pub mod context;
pub mod error;
pub mod fps_counter;
pub mod gif;
pub mod group;
pub mod hitbox;
pub mod input;
pub mod object;
pub mod platform;
pub mod quadtree;
pub mod render;
pub mod save;
pub mod sprite;
pub mod spriteset;
pub mod text;
pub mod tilemap;
pub mod timer;

pub use context::{Config, Context, Event, EventSource, State};
pub use error::{Error, Result};
