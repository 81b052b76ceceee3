use crate::{
    constants::MAX_FPS,
    error::{Error, Result},
};

/// Converts elapsed wall time into whole frame ticks, capped per read.
#[derive(Clone, Debug, Default)]
pub struct Accumulator {
    delay: u32,
    max_frames: u32,
    elapsed: u32,
    frames: u32,
}

impl Accumulator {
    pub fn with_fps(fps: u32, max_frames: u32) -> Result<Self> {
        let mut acc = Self::default();
        acc.set_fps(fps, max_frames)?;
        Ok(acc)
    }

    pub fn set_fps(&mut self, fps: u32, max_frames: u32) -> Result<()> {
        if fps == 0 {
            return Err(Error::ArgumentsBad("fps must be positive"));
        }
        if fps > MAX_FPS {
            return Err(Error::FpsTooHigh { fps, max: MAX_FPS });
        }
        self.set_delay(1000 / fps, max_frames)
    }

    pub fn set_delay(&mut self, delay: u32, max_frames: u32) -> Result<()> {
        if delay == 0 || max_frames == 0 {
            return Err(Error::ArgumentsBad("delay and max frames must be positive"));
        }
        self.delay = delay;
        self.max_frames = max_frames;
        self.reset();
        Ok(())
    }

    /// Frames per second matching the current delay.
    pub fn fps(&self) -> u32 {
        if self.delay == 0 {
            0
        } else {
            1000 / self.delay
        }
    }

    pub fn delay(&self) -> u32 {
        self.delay
    }

    pub fn max_frames(&self) -> u32 {
        self.max_frames
    }

    pub fn update(&mut self, ms: u32) -> Result<()> {
        if self.delay == 0 {
            return Err(Error::AccNotInitialized);
        }
        self.elapsed += ms;
        self.frames = self.frames.saturating_add(self.elapsed / self.delay);
        self.elapsed %= self.delay;
        Ok(())
    }

    /// Takes the pending frames. Anything above `max_frames` is dropped so a
    /// slow frame can't snowball into more work on the next one.
    pub fn get_frames(&mut self) -> u32 {
        let frames = self.frames.min(self.max_frames);
        self.frames = 0;
        frames
    }

    pub fn check_frames(&self) -> u32 {
        self.frames.min(self.max_frames)
    }

    pub fn reset(&mut self) {
        self.elapsed = 0;
        self.frames = 0;
    }

    pub fn elapsed(&self) -> u32 {
        self.elapsed
    }
}
