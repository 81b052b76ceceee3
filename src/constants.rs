pub const DEFAULT_UPS: u32 = 60;
pub const DEFAULT_DPS: u32 = 60;
pub const DEFAULT_FPS: u32 = 60;
pub const MAX_FPS: u32 = 999;

pub const BACKBUFFER_SIZE: (u32, u32) = (160, 120);
pub const WINDOW_SIZE: (u32, u32) = (640, 480);
pub const BACKGROUND_COLOR: u32 = 0xff22_2034;

pub const QT_DEFAULT_DEPTH: u32 = 6;
pub const QT_DEFAULT_NODES: usize = 6;
/// Deepest tree the traversal stack is sized for.
pub const QT_MAX_DEPTH: u32 = 24;

/// Largest grid the tilemap text parser accepts.
pub const MAX_PARSED_CELLS: usize = 1 << 22;

pub const AXIS_DEADZONE: f32 = 0.3;
pub const DEFAULT_MULTI_DELAY: u32 = 300;

/// Group entries with this TTL never time out.
pub const KEEP_ALIVE: i32 = -1;

pub const SAVE_HEADER_ID: &str = "gfmSave";
pub const SAVE_VERSION: i32 = 0x0001_0000;
pub const SAVE_MAX_LEN: usize = 128;

pub const GIF_COMMENT: &str = "GIF made with gframe";

// Reserved type tags; user types start at TYPE_MAX.
pub const TYPE_NONE: u32 = 0;
pub const TYPE_OBJECT: u32 = 1;
pub const TYPE_SPRITE: u32 = 2;
pub const TYPE_TILEMAP: u32 = 3;
pub const TYPE_GROUP: u32 = 4;
pub const TYPE_HITBOX: u32 = 5;
pub const TYPE_MAX: u32 = 20;
