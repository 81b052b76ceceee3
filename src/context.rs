use std::{
    fs,
    path::{Path, PathBuf},
    rc::Rc,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Instant,
};

use crate::{
    accumulator::Accumulator,
    audio::Mixer,
    camera::Camera,
    constants::{
        BACKBUFFER_SIZE, BACKGROUND_COLOR, DEFAULT_DPS, DEFAULT_FPS, DEFAULT_UPS, MAX_FPS,
        WINDOW_SIZE,
    },
    error::{Error, Result},
    fps_counter::FpsCounter,
    gif::GifRecorder,
    input::{Input, InputEvent},
    render::{self, Backbuffer, Renderer, Texture},
    save::Save,
    spriteset::Spriteset,
};

/// Runtime settings for a `Context`.
#[derive(Clone, Debug)]
pub struct Config {
    pub organization: String,
    pub title: String,
    pub backbuffer_size: (u32, u32),
    pub window_size: (u32, u32),
    /// Update ticks per second.
    pub ups: u32,
    /// Draw frames per second.
    pub dps: u32,
    /// Rate the outer loop is paced at.
    pub fps: u32,
    pub background_color: u32,
    /// Save files go to `save_dir/organization/title`.
    pub save_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            organization: "gframe".to_string(),
            title: "game".to_string(),
            backbuffer_size: BACKBUFFER_SIZE,
            window_size: WINDOW_SIZE,
            ups: DEFAULT_UPS,
            dps: DEFAULT_DPS,
            fps: DEFAULT_FPS,
            background_color: BACKGROUND_COLOR,
            save_dir: PathBuf::from("saves"),
        }
    }
}

impl Config {
    fn validate(&self) -> Result<()> {
        if self.organization.is_empty() || self.title.is_empty() {
            return Err(Error::ArgumentsBad("organization and title must be set"));
        }
        let (bw, bh) = self.backbuffer_size;
        let (ww, wh) = self.window_size;
        if bw == 0 || bh == 0 || ww == 0 || wh == 0 {
            return Err(Error::ArgumentsBad("dimensions must be positive"));
        }
        for &rate in &[self.ups, self.dps, self.fps] {
            if rate == 0 || rate > MAX_FPS {
                return Err(Error::ArgumentsBad("rates must be within 1..=999"));
            }
        }
        Ok(())
    }
}

/// What a backend hands to `Context::handle_events`.
#[derive(Copy, Clone, Debug)]
pub enum Event {
    Input(InputEvent),
    /// Milliseconds elapsed since the previous time event.
    Time(u32),
    Resized(u32, u32),
    Quit,
}

/// Device/window backend. `poll` blocks until it has at least one event;
/// backends post a `Time` event at the pacing rate.
pub trait EventSource {
    fn poll(&mut self, events: &mut Vec<Event>) -> Result<()>;

    fn set_fps(&mut self, _fps: u32) -> Result<()> {
        Ok(())
    }
}

/// Game callbacks driven by `Context::run`.
pub trait State {
    fn update(&mut self, ctx: &mut Context) -> Result<()>;
    fn draw(&mut self, ctx: &mut Context) -> Result<()>;
}

struct GifCapture {
    recorder: GifRecorder,
    remaining_ms: i64,
    path: PathBuf,
}

/// Owns the scheduler and every per-game service. A frame looks like:
///
/// ```ignore
/// while !ctx.did_quit() {
///     ctx.handle_events(&mut source)?;
///     while ctx.is_updating() {
///         state.update(&mut ctx)?;
///     }
///     while ctx.is_drawing() {
///         ctx.draw_begin()?;
///         state.draw(&mut ctx)?;
///         ctx.draw_end()?;
///     }
/// }
/// ```
pub struct Context {
    config: Config,
    update_acc: Accumulator,
    draw_acc: Accumulator,
    pending_updates: u32,
    pending_draws: u32,
    fps: u32,
    fps_changed: bool,
    quit: bool,
    elapsed_ms: u64,
    events: Vec<Event>,

    input: Input,
    camera: Camera,
    renderer: Box<dyn Renderer>,
    mixer: Arc<Mixer>,

    fps_counter: FpsCounter,
    show_fps: bool,
    started: Instant,

    capture: Option<GifCapture>,
    gif_cancel: Arc<AtomicBool>,
    gif_worker: Option<JoinHandle<Result<()>>>,
}

impl Context {
    pub fn new(config: Config, mut renderer: Box<dyn Renderer>) -> Result<Self> {
        config.validate()?;
        let size = renderer.size();
        if (size.width, size.height) != config.backbuffer_size {
            return Err(Error::ArgumentsBad("renderer doesn't match the backbuffer size"));
        }
        renderer.set_background(config.background_color);

        let (bw, bh) = config.backbuffer_size;
        let camera = Camera::new(bw as i32, bh as i32)?;
        let mut input = Input::new();
        let (ww, wh) = config.window_size;
        input.set_pointer_scale(bw as f32 / ww as f32, bh as f32 / wh as f32);

        let mut ctx = Self {
            update_acc: Accumulator::default(),
            draw_acc: Accumulator::default(),
            pending_updates: 0,
            pending_draws: 0,
            fps: config.fps,
            fps_changed: true,
            quit: false,
            elapsed_ms: 0,
            events: Vec::new(),
            input,
            camera,
            renderer,
            mixer: Arc::new(Mixer::default()),
            fps_counter: FpsCounter::default(),
            show_fps: false,
            started: Instant::now(),
            capture: None,
            gif_cancel: Arc::new(AtomicBool::new(false)),
            gif_worker: None,
            config,
        };
        ctx.set_state_frame_rate(ctx.config.ups, ctx.config.dps)?;
        log::info!(
            "Created context for {}/{} ({}x{} backbuffer)",
            ctx.config.organization,
            ctx.config.title,
            bw,
            bh
        );
        Ok(ctx)
    }

    /// A context drawing into a software `Backbuffer`.
    pub fn headless(config: Config) -> Result<Self> {
        let (width, height) = config.backbuffer_size;
        let renderer = Backbuffer::new(width, height)?;
        Self::new(config, Box::new(renderer))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Sets the update and draw rates. Updates may catch up a tenth of a
    /// second at once; draws never more than one per iteration.
    pub fn set_state_frame_rate(&mut self, ups: u32, dps: u32) -> Result<()> {
        self.update_acc.set_fps(ups, (ups / 10).max(1))?;
        self.draw_acc.set_fps(dps, 1)?;
        self.pending_updates = 0;
        self.pending_draws = 0;
        log::info!("State frame rate set to {} ups / {} dps", ups, dps);
        Ok(())
    }

    pub fn state_frame_rate(&self) -> (u32, u32) {
        (self.update_acc.fps(), self.draw_acc.fps())
    }

    /// Pacing rate of the outer loop, forwarded to the event source.
    pub fn set_fps(&mut self, fps: u32) -> Result<()> {
        if fps == 0 {
            return Err(Error::ArgumentsBad("fps must be positive"));
        }
        if fps > MAX_FPS {
            return Err(Error::FpsTooHigh { fps, max: MAX_FPS });
        }
        self.fps = fps;
        self.fps_changed = true;
        Ok(())
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Fixed delta every update tick represents.
    pub fn update_ms(&self) -> u32 {
        self.update_acc.delay()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_ms as f64 / 1000.
    }

    pub fn quit(&mut self) {
        self.quit = true;
    }

    pub fn did_quit(&self) -> bool {
        self.quit
    }

    pub fn input(&self) -> &Input {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut Input {
        &mut self.input
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    /// Camera and renderer together, for the `draw(renderer, camera)` calls.
    pub fn draw_target(&mut self) -> (&mut dyn Renderer, &Camera) {
        (self.renderer.as_mut(), &self.camera)
    }

    pub fn renderer(&mut self) -> &mut dyn Renderer {
        self.renderer.as_mut()
    }

    pub fn mixer(&self) -> Arc<Mixer> {
        Arc::clone(&self.mixer)
    }

    pub fn disable_audio(&self) {
        self.mixer.disable();
    }

    pub fn load_texture(&mut self, bytes: &[u8]) -> Result<Texture> {
        render::load_image(bytes, self.renderer.as_mut())
    }

    pub fn load_texture_keyed(&mut self, bytes: &[u8], color_key: u32) -> Result<Texture> {
        render::load_image_keyed(bytes, color_key, self.renderer.as_mut())
    }

    pub fn window_size(&self) -> (u32, u32) {
        self.config.window_size
    }

    /// Rescales pointer coordinates to the new window.
    pub fn set_window_size(&mut self, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::ArgumentsBad("window dimensions must be positive"));
        }
        if (width, height) == self.config.window_size {
            return Err(Error::WindowModeUnchanged);
        }
        self.config.window_size = (width, height);
        let (bw, bh) = self.config.backbuffer_size;
        self.input
            .set_pointer_scale(bw as f32 / width as f32, bh as f32 / height as f32);
        log::info!("Window resized to {}x{}", width, height);
        Ok(())
    }

    /// Opens (or creates) a save file under this game's save directory.
    pub fn save(&self, name: &str) -> Result<Save> {
        let dir = self
            .config
            .save_dir
            .join(&self.config.organization)
            .join(&self.config.title);
        fs::create_dir_all(&dir)?;
        Save::bind(dir.join(name))
    }

    pub fn show_fps(&mut self, font: Rc<Spriteset>, first_tile: i32) -> Result<()> {
        self.fps_counter.init(font, first_tile)?;
        self.show_fps = true;
        Ok(())
    }

    pub fn hide_fps(&mut self) {
        self.show_fps = false;
    }

    pub fn fps_counter(&self) -> &FpsCounter {
        &self.fps_counter
    }

    /// Drains the backend until it reports elapsed time, then schedules the
    /// update ticks and draw frames that time pays for.
    pub fn handle_events(&mut self, source: &mut dyn EventSource) -> Result<()> {
        if self.fps_changed {
            source.set_fps(self.fps)?;
            self.fps_changed = false;
        }
        let mut events = std::mem::take(&mut self.events);
        let mut elapsed = None;
        while elapsed.is_none() {
            events.clear();
            source.poll(&mut events)?;
            for event in &events {
                match *event {
                    Event::Input(event) => self.input.push_event(event),
                    Event::Time(ms) => *elapsed.get_or_insert(0) += ms,
                    Event::Resized(width, height) => match self.set_window_size(width, height) {
                        Ok(()) | Err(Error::WindowModeUnchanged) => {}
                        Err(e) => return Err(e),
                    },
                    Event::Quit => self.quit = true,
                }
            }
            if self.quit {
                break;
            }
        }
        self.events = events;

        if let Some(ms) = elapsed {
            self.elapsed_ms += ms as u64;
            self.fps_counter.tick(ms);
            self.update_acc.update(ms)?;
            self.draw_acc.update(ms)?;
            self.pending_updates += self.update_acc.get_frames();
            self.pending_draws = (self.pending_draws + self.draw_acc.get_frames()).min(1);
        }
        Ok(())
    }

    /// True once per scheduled update tick. Input is latched here, so
    /// edges seen during a tick are cleared at the start of the next one.
    pub fn is_updating(&mut self) -> bool {
        if self.pending_updates == 0 {
            return false;
        }
        self.pending_updates -= 1;
        self.input.begin_tick(self.update_acc.delay());
        self.fps_counter.count_update();
        true
    }

    pub fn is_drawing(&mut self) -> bool {
        if self.pending_draws == 0 {
            return false;
        }
        self.pending_draws -= 1;
        true
    }

    pub fn draw_begin(&mut self) -> Result<()> {
        self.fps_counter.begin_draw(self.now_ms());
        self.renderer.draw_begin()
    }

    pub fn draw_end(&mut self) -> Result<()> {
        if self.show_fps {
            let now = self.now_ms();
            self.fps_counter.draw(self.renderer.as_mut(), now)?;
        }
        self.renderer.draw_end()?;
        self.fps_counter.count_draw();
        self.capture_frame()
    }

    fn now_ms(&self) -> f64 {
        self.started.elapsed().as_micros() as f64 / 1000.
    }

    /// Writes the current backbuffer to a single-frame GIF.
    pub fn snapshot<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let image = self.renderer.backbuffer().ok_or(Error::NotInitialized)?;
        let mut gif = GifRecorder::new(image.width(), image.height())?;
        gif.push_frame(image, 0)?;
        gif.save(path, &AtomicBool::new(false))
    }

    /// Captures the next `ms` worth of draw frames, then encodes them on a
    /// worker thread.
    pub fn record_gif<P: Into<PathBuf>>(&mut self, ms: u32, path: P) -> Result<()> {
        if self.capture.is_some() || self.gif_worker.is_some() {
            return Err(Error::OperationActive);
        }
        if ms == 0 {
            return Err(Error::ArgumentsBad("GIF duration must be positive"));
        }
        let (width, height) = self.config.backbuffer_size;
        self.gif_cancel.store(false, Ordering::Relaxed);
        self.capture = Some(GifCapture {
            recorder: GifRecorder::new(width, height)?,
            remaining_ms: ms as i64,
            path: path.into(),
        });
        log::info!("Recording {}ms of GIF", ms);
        Ok(())
    }

    pub fn is_recording_gif(&self) -> bool {
        self.capture.is_some()
    }

    /// Drops an in-progress capture and asks a running export to stop.
    pub fn cancel_gif(&mut self) {
        if self.capture.take().is_some() {
            log::info!("GIF recording cancelled");
        }
        self.gif_cancel.store(true, Ordering::Relaxed);
    }

    /// Blocks until the export worker (if any) finishes.
    pub fn wait_gif(&mut self) -> Result<()> {
        match self.gif_worker.take() {
            Some(worker) => match worker.join() {
                Ok(result) => result,
                Err(_) => {
                    log::error!("GIF export thread panicked");
                    Err(Error::GifCancelled)
                }
            },
            None => Err(Error::OperationNotActive),
        }
    }

    fn capture_frame(&mut self) -> Result<()> {
        let capture = match &mut self.capture {
            Some(capture) => capture,
            None => return Ok(()),
        };
        let delay = self.draw_acc.delay();
        let image = match self.renderer.backbuffer() {
            Some(image) => image,
            None => {
                log::warn!("Renderer can't read back frames, GIF recording stopped");
                self.capture = None;
                return Err(Error::NotInitialized);
            }
        };
        capture.recorder.push_frame(image, delay)?;
        capture.remaining_ms -= delay as i64;
        if capture.remaining_ms > 0 {
            return Ok(());
        }

        if let Some(GifCapture { recorder, path, .. }) = self.capture.take() {
            log::info!(
                "Exporting {} GIF frames to {}",
                recorder.len(),
                path.display()
            );
            let cancel = Arc::clone(&self.gif_cancel);
            let worker = thread::Builder::new()
                .name("gif-export".to_string())
                .spawn(move || recorder.save(&path, &cancel))?;
            self.gif_worker = Some(worker);
        }
        Ok(())
    }

    /// Runs the loop until `quit`. Whatever happens, audio is stopped and
    /// a pending GIF export is awaited before returning.
    pub fn run(&mut self, source: &mut dyn EventSource, state: &mut dyn State) -> Result<()> {
        let result = self.run_loop(source, state);
        if let Err(e) = &result {
            log::error!("Main loop stopped: {}", e);
        }
        self.mixer.stop_all();
        if self.gif_worker.is_some() {
            if let Err(e) = self.wait_gif() {
                log::warn!("GIF export failed: {}", e);
            }
        }
        result
    }

    fn run_loop(&mut self, source: &mut dyn EventSource, state: &mut dyn State) -> Result<()> {
        while !self.quit {
            self.handle_events(source)?;
            while self.is_updating() {
                state.update(self)?;
            }
            while self.is_drawing() {
                self.draw_begin()?;
                state.draw(self)?;
                self.draw_end()?;
            }
        }
        Ok(())
    }
}
