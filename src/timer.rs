use std::time::{Duration, Instant};

use crate::{
    constants::MAX_FPS,
    error::{Error, Result},
};

/// Monotonic clock the loop is paced against.
pub trait TimeSource {
    /// Milliseconds since the source was created, with sub-ms precision.
    fn now_ms(&self) -> f64;
    fn sleep_ms(&mut self, ms: u32);
}

pub struct SystemClock {
    start: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl TimeSource for SystemClock {
    fn now_ms(&self) -> f64 {
        self.start.elapsed().as_micros() as f64 / 1000.
    }

    fn sleep_ms(&mut self, ms: u32) {
        std::thread::sleep(Duration::from_millis(ms as u64));
    }
}

/// Paces the outer loop to a target FPS and reports whole elapsed
/// milliseconds, carrying fractions over so the rate doesn't drift.
pub struct Timer<T: TimeSource = SystemClock> {
    clock: T,
    frame_delay: f64,
    frame_start: f64,
    slack: f64,
    last_tick: f64,
    tick_carry: f64,
}

impl Timer<SystemClock> {
    pub fn new(fps: u32) -> Result<Self> {
        Self::with_clock(SystemClock::default(), fps)
    }
}

impl<T: TimeSource> Timer<T> {
    pub fn with_clock(clock: T, fps: u32) -> Result<Self> {
        let now = clock.now_ms();
        let mut timer = Self {
            clock,
            frame_delay: 0.,
            frame_start: now,
            slack: 0.,
            last_tick: now,
            tick_carry: 0.,
        };
        timer.set_fps(fps)?;
        Ok(timer)
    }

    pub fn set_fps(&mut self, fps: u32) -> Result<()> {
        if fps == 0 {
            return Err(Error::ArgumentsBad("fps must be positive"));
        }
        if fps > MAX_FPS {
            return Err(Error::FpsTooHigh { fps, max: MAX_FPS });
        }
        self.frame_delay = 1000. / fps as f64;
        Ok(())
    }

    pub fn frame_delay(&self) -> f64 {
        self.frame_delay
    }

    pub fn now_ms(&self) -> f64 {
        self.clock.now_ms()
    }

    pub fn clock_mut(&mut self) -> &mut T {
        &mut self.clock
    }

    /// Sleeps in 1 ms steps until the current frame has used up its delay.
    /// Whatever is left below a millisecond is added to the next frame.
    pub fn wait_frame(&mut self) {
        let budget = self.frame_delay + self.slack;
        let mut spent = self.clock.now_ms() - self.frame_start;
        while spent + 1. < budget {
            self.clock.sleep_ms(1);
            spent = self.clock.now_ms() - self.frame_start;
        }
        let left = budget - spent;
        self.slack = if left > 0. { left.min(1.) } else { 0. };
        self.frame_start = self.clock.now_ms();
    }

    /// Whole milliseconds since the previous tick.
    pub fn tick(&mut self) -> u32 {
        let now = self.clock.now_ms();
        let total = now - self.last_tick + self.tick_carry;
        self.last_tick = now;
        let ms = total.floor().max(0.);
        self.tick_carry = total - ms;
        ms as u32
    }
}
