//! Synthesised notification tones.
//!
//! Each [`SoundKind`] is a single sine tone with a short linear attack
//! and an exponential decay, generated on the fly; no audio assets are
//! shipped. Samples are handed to an [`AudioSink`].

use std::f32::consts::TAU;
use std::io::Write;
use std::time::Duration;

use brigade_core::frames::EventType;
use brigade_core::order::OrderStatus;

use crate::model::{NotificationKind, UiNotification};

/// Sample rate used when a sink does not ask for another one.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Linear fade-in before the decay starts.
pub const ATTACK: Duration = Duration::from_millis(10);

/// Gain the decay ends on (Web Audio style exponential ramp target).
const DECAY_FLOOR: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundKind {
    NewOrder,
    OrderReady,
    OrderUpdated,
    Error,
}

impl SoundKind {
    pub fn frequency_hz(self) -> f32 {
        match self {
            SoundKind::NewOrder => 800.0,
            SoundKind::OrderReady => 600.0,
            SoundKind::OrderUpdated => 500.0,
            SoundKind::Error => 300.0,
        }
    }

    pub fn duration(self) -> Duration {
        match self {
            SoundKind::NewOrder => Duration::from_millis(300),
            SoundKind::OrderReady => Duration::from_millis(500),
            SoundKind::OrderUpdated => Duration::from_millis(200),
            SoundKind::Error => Duration::from_millis(800),
        }
    }

    /// Tone for a notification: by event type when one is attached,
    /// otherwise by severity.
    pub fn for_notification(notification: &UiNotification) -> Self {
        match &notification.data {
            Some(event) => match event.event_type {
                EventType::OrderCreated => SoundKind::NewOrder,
                EventType::OrderReadyToServe => SoundKind::OrderReady,
                EventType::OrderStatusUpdated if event.payload.status == OrderStatus::Ready => {
                    SoundKind::OrderReady
                }
                EventType::OrderStatusUpdated => SoundKind::OrderUpdated,
            },
            None => match notification.kind {
                NotificationKind::Error | NotificationKind::Warning => SoundKind::Error,
                NotificationKind::Success => SoundKind::OrderReady,
                NotificationKind::Info => SoundKind::NewOrder,
            },
        }
    }
}

/// Render `kind` as mono `f32` samples at `sample_rate`.
///
/// `volume` is clamped to `[0, 1]` and is the peak gain, reached at the
/// end of the attack. A zero volume yields silence of the same length.
pub fn synthesize_tone(kind: SoundKind, volume: f32, sample_rate: u32) -> Vec<f32> {
    let volume = clamp_volume(volume);
    let rate = sample_rate as f32;
    let total = (kind.duration().as_secs_f32() * rate).round() as usize;
    let attack = ((ATTACK.as_secs_f32() * rate).round() as usize).clamp(1, total.max(1));
    let decay = total.saturating_sub(attack).max(1) as f32;

    if volume == 0.0 {
        return vec![0.0; total];
    }
    // Decay ratio per sample so that the gain lands on the floor at the end.
    let floor = DECAY_FLOOR.min(volume);
    let ratio = (floor / volume).powf(1.0 / decay);

    let step = TAU * kind.frequency_hz() / rate;
    let mut gain = volume;
    (0..total)
        .map(|i| {
            let envelope = if i < attack {
                volume * i as f32 / attack as f32
            } else {
                let current = gain;
                gain *= ratio;
                current
            };
            (step * i as f32).sin() * envelope
        })
        .collect()
}

/// Clamp a user-supplied volume into `[0, 1]`; NaN becomes silence.
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SoundError {
    /// No audio output exists on this host.
    #[error("Audio output unavailable: {0}")]
    Unavailable(String),

    /// The device rejected or dropped the samples.
    #[error("Audio device error: {0}")]
    Device(String),
}

/// Destination for synthesised tones.
pub trait AudioSink: Send + Sync {
    /// Queue `samples` (mono, at [`sample_rate`](Self::sample_rate)) for
    /// playback. Must not block for the duration of the tone.
    fn play(&self, samples: &[f32]) -> Result<(), SoundError>;

    fn sample_rate(&self) -> u32 {
        DEFAULT_SAMPLE_RATE
    }
}

/// Discards every tone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSink;

impl AudioSink for SilentSink {
    fn play(&self, _samples: &[f32]) -> Result<(), SoundError> {
        Ok(())
    }
}

/// Rings the terminal bell instead of playing the waveform.
#[derive(Debug, Clone, Copy, Default)]
pub struct BellSink;

impl AudioSink for BellSink {
    fn play(&self, samples: &[f32]) -> Result<(), SoundError> {
        if samples.iter().all(|s| *s == 0.0) {
            return Ok(());
        }
        let mut stderr = std::io::stderr().lock();
        stderr
            .write_all(b"\x07")
            .and_then(|()| stderr.flush())
            .map_err(|e| SoundError::Device(e.to_string()))
    }
}
