mod audio;
mod headless;

pub use audio::{start_audio_playback, Playback};
pub use headless::Headless;
