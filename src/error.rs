use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure the framework reports. Statuses that only carry a yes/no
/// answer are returned as plain values instead (`bool`, `Traversal`,
/// `CameraMove`).
#[derive(Debug, Error)]
pub enum Error {
    #[error("Bad arguments: {0}")]
    ArgumentsBad(&'static str),
    #[error("Allocation failed")]
    AllocFailed,
    #[error("Not initialized")]
    NotInitialized,
    #[error("Already initialized")]
    AlreadyInitialized,
    #[error("Operation already active")]
    OperationActive,
    #[error("Operation not active")]
    OperationNotActive,
    #[error("Invalid index {0}")]
    InvalidIndex(usize),
    #[error("Waiting for input")]
    Waiting,

    #[error("Window mode unchanged")]
    WindowModeUnchanged,
    #[error("Texture not loaded")]
    TextureNotLoaded,
    #[error("Invalid spriteset width")]
    InvalidWidth,
    #[error("Invalid spriteset height")]
    InvalidHeight,

    #[error("FPS too high (max {max}, got {fps})")]
    FpsTooHigh { fps: u32, max: u32 },
    #[error("Accumulator not initialized")]
    AccNotInitialized,

    #[error("Object not initialized")]
    ObjectNotInitialized,
    #[error("Negative drag")]
    NegativeDrag,
    #[error("Objects can't collide")]
    ObjectsCantCollide,

    #[error("Animation not initialized")]
    AnimationNotInitialized,
    #[error("Animation already finished")]
    AnimationAlreadyFinished,

    #[error("Tile has no type")]
    TilemapNoTiletype,
    #[error("Tile type already set for tile {0}")]
    TiletypeExtant(i32),
    #[error("Tile animation already set for tile {0}")]
    TileanimExtant(i32),

    #[error("GIF has too many colors")]
    GifTooManyColors,
    #[error("GIF image too large")]
    GifImageTooLarge,
    #[error("GIF image too tall")]
    GifImageTooTall,
    #[error("GIF frame dimensions don't match")]
    GifFrameMismatch,
    #[error("GIF export cancelled")]
    GifCancelled,

    #[error("Group reached its max number of sprites")]
    GroupMaxSprites,
    #[error("Group has no last sprite")]
    GroupNoLastSprite,
    #[error("Group spriteset not set")]
    GroupSpritesetNotSet,
    #[error("Group width not set")]
    GroupWidthNotSet,
    #[error("Group height not set")]
    GroupHeightNotSet,

    #[error("Input handle {0} is invalid")]
    InputInvalidHandle(usize),
    #[error("Input already bound")]
    InputAlreadyBound,
    #[error("Input not bound")]
    InputNotBound,

    #[error("Quadtree not initialized")]
    QuadtreeNotInitialized,
    #[error("Quadtree operation not active")]
    QuadtreeOperationNotActive,
    #[error("Quadtree didn't overlap anything")]
    QuadtreeNoOverlap,
    #[error("Quadtree stack overflow")]
    QuadtreeStackOverflow,

    #[error("Save id too long ({0} bytes)")]
    SaveIdTooLong(usize),
    #[error("Save file not bound")]
    SaveNotBound,
    #[error("Save id not found: {0}")]
    SaveIdNotFound(String),
    #[error("Save data has invalid length {0}")]
    SaveInvalidDataLen(usize),
    #[error("Save entry has a different type")]
    SaveInvalidType,
    #[error("Save file has unsupported version {0:#x}")]
    SaveInvalidVersion(i32),

    #[error("FPS counter not initialized")]
    FpsCounterNotInitialized,

    #[error("Text has no content")]
    TextNotSet,
    #[error("Text has no more lines to scroll to")]
    TextNoMoreLines,

    #[error("End of file reached")]
    FileEofReached,
    #[error("Parse error at {line}:{column}: {message}")]
    ParseError {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Audio error: {0}")]
    Audio(#[from] lewton::VorbisError),
}
