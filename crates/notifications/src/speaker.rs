//! Default output device sink (`speaker` feature).
//!
//! The `cpal::Stream` is not `Send` on every platform, so it lives on a
//! dedicated thread for the lifetime of the sink; tones reach its output
//! callback over a channel and are mixed into a small ring buffer.

use std::collections::VecDeque;
use std::sync::mpsc as std_mpsc;
use std::thread;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::sound::{AudioSink, SoundError};

pub struct SpeakerSink {
    samples_tx: std_mpsc::Sender<Vec<f32>>,
    sample_rate: u32,
    /// Dropping this sender stops the audio thread.
    shutdown_tx: Option<std_mpsc::Sender<()>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl SpeakerSink {
    /// Open the host's default output device.
    pub fn open() -> Result<Self, SoundError> {
        let (init_tx, init_rx) = std_mpsc::sync_channel::<Result<u32, SoundError>>(1);
        let (shutdown_tx, shutdown_rx) = std_mpsc::channel::<()>();
        let (samples_tx, samples_rx) = std_mpsc::channel::<Vec<f32>>();

        let handle = thread::Builder::new()
            .name("brigade-speaker".into())
            .spawn(move || match build_output_stream(samples_rx) {
                Ok((stream, sample_rate)) => {
                    if let Err(e) = stream.play() {
                        let _ = init_tx.send(Err(SoundError::Device(format!(
                            "failed to start output stream: {e}"
                        ))));
                        return;
                    }
                    let _ = init_tx.send(Ok(sample_rate));
                    let _ = shutdown_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = init_tx.send(Err(e));
                }
            })
            .map_err(|e| SoundError::Device(format!("failed to spawn speaker thread: {e}")))?;

        let sample_rate = init_rx
            .recv()
            .map_err(|_| SoundError::Device("speaker thread died during init".into()))??;

        tracing::info!(sample_rate, "Speaker output opened");
        Ok(Self {
            samples_tx,
            sample_rate,
            shutdown_tx: Some(shutdown_tx),
            thread_handle: Some(handle),
        })
    }
}

impl AudioSink for SpeakerSink {
    fn play(&self, samples: &[f32]) -> Result<(), SoundError> {
        self.samples_tx
            .send(samples.to_vec())
            .map_err(|_| SoundError::Device("speaker thread stopped".into()))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl Drop for SpeakerSink {
    fn drop(&mut self) {
        self.shutdown_tx = None;
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
        tracing::debug!("Speaker output closed");
    }
}

fn build_output_stream(
    rx: std_mpsc::Receiver<Vec<f32>>,
) -> Result<(cpal::Stream, u32), SoundError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| SoundError::Unavailable("no output device available".into()))?;
    let supported = device
        .default_output_config()
        .map_err(|e| SoundError::Device(format!("no usable output config: {e}")))?;

    let sample_rate = supported.sample_rate().0;
    let channels = usize::from(supported.channels()).max(1);
    let config = supported.config();

    // One second of mono audio.
    let mut buffer: VecDeque<f32> = VecDeque::with_capacity(sample_rate as usize);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                while let Ok(samples) = rx.try_recv() {
                    buffer.extend(samples);
                }
                for frame in data.chunks_mut(channels) {
                    frame.fill(buffer.pop_front().unwrap_or(0.0));
                }
            },
            |err: cpal::StreamError| {
                tracing::warn!(error = %err, "Speaker stream error");
            },
            None,
        )
        .map_err(|e| SoundError::Device(format!("failed to build output stream: {e}")))?;

    Ok((stream, sample_rate))
}
