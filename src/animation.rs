use crate::error::{Error, Result};

/// Frame-indexed playback over a list of tiles.
#[derive(Clone, Debug)]
pub struct Animation {
    frames: Vec<i32>,
    do_loop: bool,
    delay: u32,
    acc_time: u32,
    index: usize,
    loop_count: u32,
    just_looped: bool,
    just_changed_frame: bool,
    finished: bool,
}

impl Animation {
    /// `fps` may only be zero for single-frame animations, which never
    /// advance.
    pub fn new(frames: &[i32], fps: u32, do_loop: bool) -> Result<Self> {
        if frames.is_empty() {
            return Err(Error::ArgumentsBad("animation needs at least one frame"));
        }
        if fps == 0 && frames.len() > 1 {
            return Err(Error::ArgumentsBad("animation fps must be positive"));
        }
        Ok(Self {
            frames: frames.to_vec(),
            do_loop,
            delay: if fps == 0 { 0 } else { 1000 / fps },
            acc_time: 0,
            index: 0,
            loop_count: 0,
            just_looped: false,
            just_changed_frame: false,
            finished: false,
        })
    }

    /// Decodes a packed table of `[num_frames, fps, loop, frame...]` entries.
    pub fn from_table(data: &[i32]) -> Result<Vec<Animation>> {
        let mut anims = Vec::new();
        let mut i = 0;
        while i < data.len() {
            if i + 3 > data.len() {
                return Err(Error::ArgumentsBad("truncated animation table"));
            }
            let num_frames = data[i];
            let fps = data[i + 1];
            if num_frames <= 0 || fps < 0 {
                return Err(Error::ArgumentsBad("bad animation table entry"));
            }
            let start = i + 3;
            let end = start + num_frames as usize;
            if end > data.len() {
                return Err(Error::ArgumentsBad("truncated animation table"));
            }
            anims.push(Animation::new(&data[start..end], fps as u32, data[i + 2] != 0)?);
            i = end;
        }
        Ok(anims)
    }

    pub fn update(&mut self, ms: u32) -> Result<()> {
        if self.finished {
            return Err(Error::AnimationAlreadyFinished);
        }
        self.just_looped = false;
        self.just_changed_frame = false;
        if self.delay == 0 {
            return Ok(());
        }

        self.acc_time += ms;
        while self.acc_time >= self.delay {
            self.acc_time -= self.delay;
            if self.index + 1 < self.frames.len() {
                self.index += 1;
                self.just_changed_frame = true;
            } else if self.do_loop {
                self.index = 0;
                self.loop_count += 1;
                self.just_looped = true;
                self.just_changed_frame = true;
            } else {
                self.loop_count += 1;
                self.finished = true;
                self.acc_time = 0;
                break;
            }
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.acc_time = 0;
        self.index = 0;
        self.loop_count = 0;
        self.just_looped = false;
        self.just_changed_frame = false;
        self.finished = false;
    }

    /// Current tile.
    pub fn frame(&self) -> i32 {
        self.frames[self.index]
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn did_loop(&self) -> bool {
        self.loop_count > 0
    }

    pub fn did_just_loop(&self) -> bool {
        self.just_looped
    }

    pub fn did_just_change_frame(&self) -> bool {
        self.just_changed_frame
    }

    pub fn did_finish(&self) -> bool {
        self.finished
    }

    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }
}
