use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{audio::Mixer, error::Result};

/// A running playback thread. Stops (and joins) on drop.
pub struct Playback {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Playback {
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Audio thread panicked");
            }
        }
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Pulls `buffer_len` samples from the mixer every buffer period and hands
/// them to `sink`, standing in for a device callback.
pub fn start_audio_playback<F: FnMut(&[i16]) + Send + 'static>(
    mixer: Arc<Mixer>,
    buffer_len: usize,
    sample_rate: u32,
    mut sink: F,
) -> Result<Playback> {
    let running = Arc::new(AtomicBool::new(true));
    let period = Duration::from_micros(buffer_len as u64 * 1_000_000 / sample_rate.max(1) as u64);
    let thread_running = Arc::clone(&running);
    let thread = thread::Builder::new()
        .name("audio".to_string())
        .spawn(move || {
            let mut buffer = vec![0i16; buffer_len];
            while thread_running.load(Ordering::Relaxed) {
                for sample in buffer.iter_mut() {
                    *sample = 0;
                }
                mixer.poll(&mut buffer);
                sink(&buffer);
                thread::sleep(period);
            }
        })?;
    log::info!(
        "Audio playback started ({} samples at {}Hz)",
        buffer_len,
        sample_rate
    );
    Ok(Playback {
        running,
        thread: Some(thread),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::Audio;
    use std::sync::mpsc;

    #[test]
    fn test_playback_feeds_sink() {
        let mixer = Arc::new(Mixer::default());
        mixer.play(&Audio::from_samples(vec![7; 8], 1, 8000), 1.);
        let (tx, rx) = mpsc::channel();
        let mut playback = start_audio_playback(Arc::clone(&mixer), 4, 8000, move |buffer| {
            let _ = tx.send(buffer.to_vec());
        })
        .unwrap();
        let first = rx.recv().unwrap();
        assert_eq!(first, vec![7; 4]);
        playback.stop();
    }
}
