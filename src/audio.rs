use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use lewton::inside_ogg::OggStreamReader;

use crate::error::Result;

/// Software mixer. The game thread starts and stops sounds; the device
/// thread calls `poll` to fill its buffer. The lock is only held while
/// touching the playing set.
pub struct Mixer {
    playing: Arc<Mutex<HashMap<usize, AudioInstance>>>,
    next_id: AtomicUsize,
    enabled: AtomicBool,
}

impl Default for Mixer {
    fn default() -> Self {
        Self {
            playing: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicUsize::new(0),
            enabled: AtomicBool::new(true),
        }
    }
}

impl Mixer {
    pub fn load_ogg(&self, bytes: &[u8]) -> Result<Audio> {
        let mut reader = OggStreamReader::new(std::io::Cursor::new(bytes))?;
        let channels = reader.ident_hdr.audio_channels;
        let sample_rate = reader.ident_hdr.audio_sample_rate;
        let mut buffer = Vec::new();
        while let Some(pck_samples) = reader.read_dec_packet_itl()? {
            buffer.extend(pck_samples);
        }
        log::debug!(
            "Loaded ogg: {} samples, {} channel(s) at {}Hz",
            buffer.len(),
            channels,
            sample_rate
        );

        Ok(Audio {
            buffer: Arc::new(buffer),
            channels,
            sample_rate,
        })
    }

    /// Stops everything and ignores further `play` calls.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
        self.lock().clear();
        log::info!("Audio disabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn play(&self, audio: &Audio, volume: f32) -> AudioInstanceHandle {
        self.start(audio, volume, None)
    }

    /// Plays `audio` forever, jumping back to sample `loop_start` at the end.
    pub fn play_looped(&self, audio: &Audio, volume: f32, loop_start: usize) -> AudioInstanceHandle {
        self.start(audio, volume, Some(loop_start.min(audio.buffer.len())))
    }

    fn start(&self, audio: &Audio, volume: f32, loop_start: Option<usize>) -> AudioInstanceHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if self.is_enabled() && !audio.buffer.is_empty() {
            let instance = AudioInstance {
                audio: audio.clone(),
                index: 0,
                volume,
                loop_start,
            };
            self.lock().insert(id, instance);
        }
        AudioInstanceHandle(id)
    }

    pub fn stop(&self, handle: &AudioInstanceHandle) {
        self.lock().remove(&handle.0);
    }

    pub fn stop_all(&self) {
        self.lock().clear();
    }

    pub fn is_playing(&self, handle: &AudioInstanceHandle) -> bool {
        self.lock().contains_key(&handle.0)
    }

    pub fn set_volume(&self, handle: &AudioInstanceHandle, volume: f32) {
        if let Some(instance) = self.lock().get_mut(&handle.0) {
            instance.volume = volume;
        };
    }

    /// `None` lets the instance finish; `Some(start)` keeps it looping.
    pub fn set_looping(&self, handle: &AudioInstanceHandle, loop_start: Option<usize>) {
        if let Some(instance) = self.lock().get_mut(&handle.0) {
            let len = instance.audio.buffer.len();
            instance.loop_start = loop_start.map(|start| start.min(len));
        };
    }

    /// Mixes every playing instance into `out`.
    pub fn poll(&self, out: &mut [i16]) {
        let mut instances = self.lock();

        let mut finished = Vec::new();
        for (id, instance) in instances.iter_mut() {
            if instance.mix(out) {
                finished.push(*id);
            }
        }
        for id in finished {
            instances.remove(&id);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<usize, AudioInstance>> {
        self.playing.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Decoded, interleaved samples. Cloning shares the buffer.
#[derive(Clone)]
pub struct Audio {
    buffer: Arc<Vec<i16>>,
    channels: u8,
    sample_rate: u32,
}

impl Audio {
    pub fn from_samples(samples: Vec<i16>, channels: u8, sample_rate: u32) -> Self {
        Self {
            buffer: Arc::new(samples),
            channels,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

struct AudioInstance {
    audio: Audio,
    index: usize,
    volume: f32,
    loop_start: Option<usize>,
}

impl AudioInstance {
    /// Returns whether the instance ran out of samples.
    fn mix(&mut self, out: &mut [i16]) -> bool {
        let buffer = &self.audio.buffer;
        for sample in out.iter_mut() {
            if self.index >= buffer.len() {
                match self.loop_start {
                    Some(start) if start < buffer.len() => self.index = start,
                    _ => return true,
                }
            }
            let value = (buffer[self.index] as f32 * self.volume).floor() as i16;
            *sample = sample.saturating_add(value);
            self.index += 1;
        }
        self.index >= buffer.len() && self.loop_start.is_none()
    }
}

pub struct AudioInstanceHandle(usize);
