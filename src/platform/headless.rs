use std::collections::VecDeque;

use crate::{
    context::{Event, EventSource},
    error::Result,
    timer::{SystemClock, TimeSource, Timer},
};

/// Windowless backend: paces itself with a `Timer` and replays scripted
/// events on the frames they were scheduled for.
pub struct Headless<T: TimeSource = SystemClock> {
    timer: Timer<T>,
    frame: u64,
    script: VecDeque<(u64, Event)>,
    quit_after: Option<u64>,
}

impl Headless<SystemClock> {
    pub fn new(fps: u32) -> Result<Self> {
        Self::with_clock(SystemClock::default(), fps)
    }
}

impl<T: TimeSource> Headless<T> {
    pub fn with_clock(clock: T, fps: u32) -> Result<Self> {
        Ok(Self {
            timer: Timer::with_clock(clock, fps)?,
            frame: 0,
            script: VecDeque::new(),
            quit_after: None,
        })
    }

    /// Delivers `event` on the `frame`th poll (counting from zero).
    pub fn schedule(&mut self, frame: u64, event: Event) {
        let at = self
            .script
            .iter()
            .position(|(f, _)| *f > frame)
            .unwrap_or_else(|| self.script.len());
        self.script.insert(at, (frame, event));
    }

    pub fn quit_after(&mut self, frames: u64) {
        self.quit_after = Some(frames);
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn timer(&self) -> &Timer<T> {
        &self.timer
    }
}

impl<T: TimeSource> EventSource for Headless<T> {
    fn poll(&mut self, events: &mut Vec<Event>) -> Result<()> {
        self.timer.wait_frame();
        while let Some(&(frame, event)) = self.script.front() {
            if frame > self.frame {
                break;
            }
            events.push(event);
            self.script.pop_front();
        }
        if self.quit_after.map_or(false, |last| self.frame >= last) {
            log::debug!("Headless backend quitting after {} frames", self.frame);
            events.push(Event::Quit);
        }
        events.push(Event::Time(self.timer.tick()));
        self.frame += 1;
        Ok(())
    }

    fn set_fps(&mut self, fps: u32) -> Result<()> {
        self.timer.set_fps(fps)
    }
}
