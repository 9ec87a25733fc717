use std::future::Future;

use crate::{AudioEvent, PlaybackClock, Result, SketchError};

/// Primitives exposed by the external audio-synthesis engine.
///
/// The transport is a thin coordinator over exactly these calls. Waveform
/// synthesis happens behind the trait and is not part of this crate.
pub trait SynthEngine {
    /// One-time, possibly slow initialisation. Must complete before any event
    /// is scheduled.
    fn start(&mut self) -> impl Future<Output = Result<()>>;

    /// Registers a trigger at an absolute transport time in seconds.
    fn schedule_event(&mut self, onset_time: f64, frequency: f64, duration: f64) -> Result<()>;

    /// Starts the clock, or resumes it from where it was paused.
    fn start_clock(&mut self);

    fn pause_clock(&mut self);

    /// Halts the clock and rewinds it to zero.
    fn stop_clock(&mut self);

    /// Revokes every trigger that has not fired yet.
    fn cancel_all_scheduled(&mut self);

    /// Current transport position in seconds. Triggers with an onset at or
    /// after this position have not fired yet.
    fn position(&self) -> f64;
}

/// Deterministic engine that runs on a manually advanced clock.
///
/// Triggers live in a time-indexed queue and fire exactly once, on the first
/// tick that moves the clock strictly past their onset. A trigger sitting
/// exactly at a pause position therefore still plays after resuming. Fired
/// triggers are kept so callers can inspect what played. Used by the command
/// line simulator and throughout the tests.
#[derive(Debug, Default)]
pub struct OfflineSynth {
    unavailable: bool,
    started: bool,
    start_count: usize,
    running: bool,
    clock: PlaybackClock,
    pending: Vec<AudioEvent>,
    fired: Vec<AudioEvent>,
}

impl OfflineSynth {
    pub fn new() -> Self {
        Self::default()
    }

    /// An engine whose start-up always fails, as when no output device exists.
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Triggers still waiting for their onset, in firing order.
    pub fn pending(&self) -> &[AudioEvent] {
        &self.pending
    }

    /// Every trigger fired since the engine was created.
    pub fn fired(&self) -> &[AudioEvent] {
        &self.fired
    }

    pub fn start_count(&self) -> usize {
        self.start_count
    }

    /// Onset of the last pending trigger plus its duration.
    pub fn pending_horizon(&self) -> Option<f64> {
        self.pending
            .iter()
            .map(|event| event.onset_time + event.duration)
            .max_by(|a, b| a.total_cmp(b))
    }

    /// Moves a running clock forward and returns the triggers that fired.
    /// A paused or stopped clock does not move.
    pub fn advance(&mut self, delta: f64) -> Vec<AudioEvent> {
        if !self.running {
            return Vec::new();
        }
        self.clock.advance(delta);

        let now = self.clock.time_seconds;
        let due = self.pending.partition_point(|event| event.onset_time < now);
        let fired: Vec<AudioEvent> = self.pending.drain(..due).collect();
        for event in &fired {
            tracing::trace!(
                onset = event.onset_time,
                frequency = event.frequency,
                duration = event.duration,
                "trigger"
            );
        }
        self.fired.extend_from_slice(&fired);
        fired
    }
}

impl SynthEngine for OfflineSynth {
    async fn start(&mut self) -> Result<()> {
        if self.unavailable {
            return Err(SketchError::AudioEngineUnavailable(
                "no audio output available".to_string(),
            ));
        }
        if !self.started {
            self.started = true;
            self.start_count += 1;
        }
        Ok(())
    }

    fn schedule_event(&mut self, onset_time: f64, frequency: f64, duration: f64) -> Result<()> {
        if !self.started {
            return Err(SketchError::msg(
                "audio engine must be started before scheduling",
            ));
        }
        if !onset_time.is_finite() || onset_time < 0.0 {
            return Err(SketchError::msg(format!(
                "cannot schedule an event at {onset_time} seconds"
            )));
        }
        let event = AudioEvent {
            onset_time,
            frequency,
            duration,
        };
        let index = self
            .pending
            .partition_point(|queued| queued.onset_time <= onset_time);
        self.pending.insert(index, event);
        Ok(())
    }

    fn start_clock(&mut self) {
        self.running = true;
    }

    fn pause_clock(&mut self) {
        self.running = false;
    }

    fn stop_clock(&mut self) {
        self.running = false;
        self.clock.reset();
    }

    fn cancel_all_scheduled(&mut self) {
        self.pending.clear();
    }

    fn position(&self) -> f64 {
        self.clock.time_seconds
    }
}
