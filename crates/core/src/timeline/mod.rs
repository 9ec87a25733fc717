use serde::{Deserialize, Serialize};

use crate::{AudioEvent, Result, SketchError, SynthEngine, TrackId};

/// Monotonic transport position in seconds.
#[derive(Debug, Default, Clone)]
pub struct PlaybackClock {
    pub time_seconds: f64,
}

impl PlaybackClock {
    pub fn reset(&mut self) {
        self.time_seconds = 0.0;
    }

    pub fn advance(&mut self, delta: f64) {
        self.time_seconds = (self.time_seconds + delta.max(0.0)).max(0.0);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportStatus {
    Idle,
    Playing,
    Paused,
}

/// Audio events of every track, registered together on one shared clock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    tracks: Vec<(TrackId, Vec<AudioEvent>)>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, track: TrackId, events: Vec<AudioEvent>) {
        self.tracks.push((track, events));
    }

    /// Swaps in new events for `track`, keeping its registration slot, or
    /// appends the track if it was not part of the schedule yet.
    pub fn replace(&mut self, track: TrackId, events: Vec<AudioEvent>) {
        match self.tracks.iter_mut().find(|(id, _)| *id == track) {
            Some((_, slot)) => *slot = events,
            None => self.tracks.push((track, events)),
        }
    }

    pub fn tracks(&self) -> &[(TrackId, Vec<AudioEvent>)] {
        &self.tracks
    }

    pub fn events_for(&self, track: TrackId) -> Option<&[AudioEvent]> {
        self.tracks
            .iter()
            .find(|(id, _)| *id == track)
            .map(|(_, events)| events.as_slice())
    }

    /// Total number of events over all tracks.
    pub fn len(&self) -> usize {
        self.tracks.iter().map(|(_, events)| events.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every event in global onset order. Equal onsets are all kept, ordered
    /// by track registration and then by position within the track.
    pub fn ordered(&self) -> Vec<(TrackId, AudioEvent)> {
        let mut merged: Vec<(TrackId, AudioEvent)> = self
            .tracks
            .iter()
            .flat_map(|(id, events)| events.iter().map(move |event| (*id, *event)))
            .collect();
        merged.sort_by(|a, b| a.1.onset_time.total_cmp(&b.1.onset_time));
        merged
    }
}

/// The single authoritative playback coordinator shared by all tracks.
///
/// All transitions take `&mut self`, so a transition is fully applied before
/// the next one can observe the status. The only suspension point is the
/// one-time engine start-up inside [`Transport::play_with`], which happens
/// before any state is touched.
#[derive(Debug)]
pub struct Transport<E> {
    engine: E,
    engine_ready: bool,
    status: TransportStatus,
    scheduled: Schedule,
}

impl<E: SynthEngine> Transport<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            engine_ready: false,
            status: TransportStatus::Idle,
            scheduled: Schedule::default(),
        }
    }

    pub fn status(&self) -> TransportStatus {
        self.status
    }

    /// Events registered with the engine for the current play session.
    pub fn scheduled(&self) -> &Schedule {
        &self.scheduled
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutable access for drivers that advance the engine clock.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Starts playback from Idle or resumes it from Paused.
    ///
    /// `build` is only invoked when starting from Idle; resuming never
    /// re-schedules.
    pub async fn play_with<F>(&mut self, build: F) -> Result<TransportStatus>
    where
        F: FnOnce() -> Result<Schedule>,
    {
        match self.status {
            TransportStatus::Playing => {
                tracing::warn!("play requested while already playing");
                return Ok(self.status);
            }
            TransportStatus::Paused => {
                self.engine.start_clock();
                self.status = TransportStatus::Playing;
                tracing::info!(pending = self.scheduled.len(), "transport resumed");
                return Ok(self.status);
            }
            TransportStatus::Idle => {}
        }

        self.ensure_engine().await?;
        let schedule = build()?;

        self.engine.cancel_all_scheduled();
        self.scheduled = Schedule::default();
        for (track, event) in schedule.ordered() {
            if let Err(err) =
                self.engine
                    .schedule_event(event.onset_time, event.frequency, event.duration)
            {
                tracing::warn!(%track, error = %err, "failed to register event, rolling back");
                self.engine.cancel_all_scheduled();
                return Err(err);
            }
        }
        tracing::debug!(
            tracks = schedule.tracks().len(),
            events = schedule.len(),
            "registered schedule"
        );

        self.scheduled = schedule;
        self.engine.start_clock();
        self.status = TransportStatus::Playing;
        tracing::info!(events = self.scheduled.len(), "transport started");
        Ok(self.status)
    }

    /// Re-registers the pending events after one track changed mid-session.
    ///
    /// Every pending trigger is cancelled and registered again from the
    /// updated schedule, so the other tracks keep their events unchanged.
    /// Only events at or after the current position are registered; earlier
    /// ones already played. Idle transports have nothing registered and are
    /// left alone.
    pub fn reschedule_track(
        &mut self,
        track: TrackId,
        events: Vec<AudioEvent>,
    ) -> Result<TransportStatus> {
        if self.status == TransportStatus::Idle {
            tracing::debug!(%track, "reschedule skipped, transport is idle");
            return Ok(self.status);
        }

        let now = self.engine.position();
        self.engine.cancel_all_scheduled();
        self.scheduled.replace(track, events);

        let mut registered = 0usize;
        for (owner, event) in self.scheduled.ordered() {
            if event.onset_time < now {
                continue;
            }
            if let Err(err) =
                self.engine
                    .schedule_event(event.onset_time, event.frequency, event.duration)
            {
                tracing::warn!(track = %owner, error = %err, "failed to reschedule, stopping");
                self.engine.stop_clock();
                self.engine.cancel_all_scheduled();
                self.scheduled = Schedule::default();
                self.status = TransportStatus::Idle;
                return Err(err);
            }
            registered += 1;
        }
        tracing::info!(%track, position = now, pending = registered, "track rescheduled");
        Ok(self.status)
    }

    pub fn pause(&mut self) -> TransportStatus {
        if self.status != TransportStatus::Playing {
            tracing::warn!(status = ?self.status, "pause ignored");
            return self.status;
        }
        self.engine.pause_clock();
        self.status = TransportStatus::Paused;
        tracing::info!("transport paused");
        self.status
    }

    /// Rewinds to zero and revokes every pending trigger.
    pub fn stop(&mut self) -> TransportStatus {
        if self.status == TransportStatus::Idle {
            tracing::warn!("stop ignored, transport is idle");
            return self.status;
        }
        self.engine.stop_clock();
        self.engine.cancel_all_scheduled();
        self.scheduled = Schedule::default();
        self.status = TransportStatus::Idle;
        tracing::info!("transport stopped");
        self.status
    }

    /// Play/pause toggle: pauses while playing, otherwise plays or resumes.
    pub async fn toggle<F>(&mut self, build: F) -> Result<TransportStatus>
    where
        F: FnOnce() -> Result<Schedule>,
    {
        if self.status == TransportStatus::Playing {
            Ok(self.pause())
        } else {
            self.play_with(build).await
        }
    }

    async fn ensure_engine(&mut self) -> Result<()> {
        if self.engine_ready {
            return Ok(());
        }
        self.engine.start().await.map_err(|err| match err {
            SketchError::AudioEngineUnavailable(_) => err,
            other => SketchError::AudioEngineUnavailable(other.to_string()),
        })?;
        self.engine_ready = true;
        tracing::info!("audio engine started");
        Ok(())
    }
}
