use crate::{
    ActiveStroke, AppConfig, Color, Curve, DrawingStore, Point, Result, SavedDrawing, Schedule,
    SketchError, SoundMapping, Stroke, SynthEngine, Track, TrackId, Transport, TransportStatus,
};

/// Owns every track, the selected drawing colour and the shared transport.
#[derive(Debug)]
pub struct Session<E> {
    mapping: SoundMapping,
    selected_color: Color,
    tracks: Vec<Track>,
    next_track_id: u64,
    active: Option<ActiveStroke>,
    transport: Transport<E>,
}

impl<E: SynthEngine> Session<E> {
    pub fn new(engine: E, config: &AppConfig) -> Self {
        Self {
            mapping: config.mapping(),
            selected_color: config.palette.default.clone(),
            tracks: Vec::new(),
            next_track_id: 1,
            active: None,
            transport: Transport::new(engine),
        }
    }

    pub fn mapping(&self) -> &SoundMapping {
        &self.mapping
    }

    pub fn selected_color(&self) -> &Color {
        &self.selected_color
    }

    /// Only strokes begun after this call pick up the new colour.
    pub fn select_color(&mut self, color: Color) {
        tracing::debug!(%color, "selected colour");
        self.selected_color = color;
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, id: TrackId) -> Result<&Track> {
        self.tracks
            .iter()
            .find(|track| track.id == id)
            .ok_or(SketchError::UnknownTrack(id))
    }

    fn track_mut(&mut self, id: TrackId) -> Result<&mut Track> {
        self.tracks
            .iter_mut()
            .find(|track| track.id == id)
            .ok_or(SketchError::UnknownTrack(id))
    }

    pub fn add_track(&mut self) -> TrackId {
        let id = TrackId(self.next_track_id);
        self.next_track_id += 1;
        self.tracks.push(Track::new(id, self.selected_color.clone()));
        tracing::info!(track = %id, color = %self.selected_color, "added track");
        id
    }

    /// Creates a new track holding the strokes of a previously saved drawing.
    pub fn import_drawing(&mut self, drawing: &SavedDrawing) -> Result<TrackId> {
        let strokes = drawing.strokes()?;
        let id = self.add_track();
        let track = self.track_mut(id)?;
        if let Some(first) = strokes.first() {
            track.base_color = first.color().clone();
        }
        for stroke in strokes {
            track.push_stroke(stroke);
        }
        Ok(id)
    }

    /// Removing a track does not touch events already registered with a
    /// running transport.
    pub fn remove_track(&mut self, id: TrackId) -> Result<Track> {
        let index = self
            .tracks
            .iter()
            .position(|track| track.id == id)
            .ok_or(SketchError::UnknownTrack(id))?;
        if self.active.as_ref().is_some_and(|active| active.track() == id) {
            self.active = None;
        }
        Ok(self.tracks.remove(index))
    }

    pub fn append_stroke(&mut self, id: TrackId, stroke: Stroke) -> Result<()> {
        self.track_mut(id)?.push_stroke(stroke);
        Ok(())
    }

    pub fn active_stroke(&self) -> Option<&ActiveStroke> {
        self.active.as_ref()
    }

    /// Pointer down on a track. A gesture still open from a missed pointer up
    /// is committed first.
    pub fn begin_stroke(&mut self, track: TrackId, point: Point) -> Result<Curve> {
        self.track(track)?;
        if self.active.is_some() {
            self.end_stroke()?;
        }
        let active = ActiveStroke::begin(track, self.selected_color.clone(), point);
        let curve = active.curve()?;
        self.active = Some(active);
        Ok(curve)
    }

    /// Pointer move. Returns the re-smoothed curve for live drawing, or `None`
    /// when no gesture is in progress.
    pub fn extend_stroke(&mut self, point: Point) -> Result<Option<Curve>> {
        match self.active.as_mut() {
            Some(active) => {
                active.push(point);
                active.curve().map(Some)
            }
            None => Ok(None),
        }
    }

    /// Pointer up. Freezes the gesture onto its track.
    pub fn end_stroke(&mut self) -> Result<Option<TrackId>> {
        let Some(active) = self.active.take() else {
            return Ok(None);
        };
        let id = active.track();
        let points = active.points().len();
        self.track_mut(id)?.push_stroke(active.finish());
        tracing::debug!(track = %id, points, "stroke finished");
        Ok(Some(id))
    }

    /// Maps every non-empty track into one combined registration.
    pub fn schedule(&self) -> Result<Schedule> {
        build_schedule(&self.mapping, &self.tracks)
    }

    pub fn status(&self) -> TransportStatus {
        self.transport.status()
    }

    pub fn transport(&self) -> &Transport<E> {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut Transport<E> {
        &mut self.transport
    }

    /// Starts every track together on the shared clock, or resumes playback.
    pub async fn play(&mut self) -> Result<TransportStatus> {
        let Self {
            mapping,
            tracks,
            transport,
            ..
        } = self;
        transport.play_with(|| build_schedule(mapping, tracks)).await
    }

    /// Re-maps one track and swaps its pending events on a running or paused
    /// transport. Events of every other track stay registered unchanged, and
    /// events already behind the clock are not replayed. Without this call,
    /// strokes added during playback are picked up at the next start.
    pub fn reschedule_track(&mut self, id: TrackId) -> Result<TransportStatus> {
        let events = self.mapping.map_track(self.track(id)?)?;
        self.transport.reschedule_track(id, events)
    }

    pub fn pause(&mut self) -> TransportStatus {
        self.transport.pause()
    }

    pub fn stop(&mut self) -> TransportStatus {
        self.transport.stop()
    }

    pub async fn toggle(&mut self) -> Result<TransportStatus> {
        let Self {
            mapping,
            tracks,
            transport,
            ..
        } = self;
        transport.toggle(|| build_schedule(mapping, tracks)).await
    }

    /// Hands a track to the persistence service. A failure is logged and
    /// returned. Drawing and playback state are left untouched.
    pub fn save_track<S: DrawingStore + ?Sized>(&self, id: TrackId, store: &S) -> Result<()> {
        let drawing = SavedDrawing::from_track(self.track(id)?);
        store.save(&drawing).map_err(|err| {
            tracing::warn!(track = %id, error = %err, "saving drawing failed");
            match err {
                SketchError::PersistenceFailure(_) => err,
                other => SketchError::PersistenceFailure(other.to_string()),
            }
        })
    }
}

fn build_schedule(mapping: &SoundMapping, tracks: &[Track]) -> Result<Schedule> {
    let mut schedule = Schedule::new();
    for track in tracks.iter().filter(|track| !track.is_empty()) {
        schedule.push(track.id, mapping.map_track(track)?);
    }
    Ok(schedule)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::{AudioEvent, OfflineSynth};

    fn config(bpm: f64) -> AppConfig {
        let mut config = AppConfig::default();
        config.transport.bpm = bpm;
        config
    }

    fn session(bpm: f64) -> Session<OfflineSynth> {
        Session::new(OfflineSynth::new(), &config(bpm))
    }

    fn stroke(color: &str, raw: &[(f64, f64)]) -> Stroke {
        Stroke::new(
            Color::from(color),
            raw.iter().map(|&(x, y)| Point::new(x, y)).collect(),
        )
        .unwrap()
    }

    fn diagonal() -> Stroke {
        stroke("red", &[(0.0, 600.0), (400.0, 300.0), (800.0, 0.0)])
    }

    struct FailingStore;

    impl DrawingStore for FailingStore {
        fn save(&self, _drawing: &SavedDrawing) -> Result<()> {
            Err(SketchError::msg("backend offline"))
        }
    }

    #[derive(Default)]
    struct CountingStore {
        saves: Cell<usize>,
    }

    impl DrawingStore for CountingStore {
        fn save(&self, _drawing: &SavedDrawing) -> Result<()> {
            self.saves.set(self.saves.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn new_tracks_take_the_selected_colour_and_fresh_ids() {
        let mut session = session(60.0);
        let first = session.add_track();
        session.select_color(Color::from("purple"));
        let second = session.add_track();

        assert_ne!(first, second);
        assert_eq!(session.track(first).unwrap().base_color, Color::from("red"));
        assert_eq!(session.track(second).unwrap().base_color, Color::from("purple"));
        assert!(session.track(second).unwrap().is_empty());
    }

    #[test]
    fn colour_changes_only_affect_later_strokes() {
        let mut session = session(60.0);
        let id = session.add_track();

        session.begin_stroke(id, Point::new(0.0, 0.0)).unwrap();
        session.extend_stroke(Point::new(10.0, 10.0)).unwrap();
        session.select_color(Color::from("blue"));
        session.extend_stroke(Point::new(20.0, 0.0)).unwrap();
        session.end_stroke().unwrap();

        session.begin_stroke(id, Point::new(5.0, 5.0)).unwrap();
        session.end_stroke().unwrap();

        let strokes = session.track(id).unwrap().strokes();
        assert_eq!(strokes[0].color(), &Color::from("red"));
        assert_eq!(strokes[0].points().len(), 3);
        assert_eq!(strokes[1].color(), &Color::from("blue"));
    }

    #[test]
    fn live_gesture_returns_smoothed_previews() {
        let mut session = session(60.0);
        let id = session.add_track();

        assert!(matches!(
            session.begin_stroke(id, Point::new(0.0, 0.0)).unwrap(),
            Curve::Dot(_)
        ));
        assert!(matches!(
            session.extend_stroke(Point::new(5.0, 5.0)).unwrap(),
            Some(Curve::Line(_, _))
        ));
        assert!(matches!(
            session.extend_stroke(Point::new(9.0, 2.0)).unwrap(),
            Some(Curve::Path(_))
        ));
        assert_eq!(session.end_stroke().unwrap(), Some(id));
        assert_eq!(session.extend_stroke(Point::new(1.0, 1.0)).unwrap(), None);
        assert_eq!(session.end_stroke().unwrap(), None);
    }

    #[test]
    fn gestures_require_a_known_track() {
        let mut session = session(60.0);
        assert!(matches!(
            session.begin_stroke(TrackId(99), Point::new(0.0, 0.0)),
            Err(SketchError::UnknownTrack(TrackId(99)))
        ));
    }

    #[test]
    fn removing_a_track_drops_its_open_gesture() {
        let mut session = session(60.0);
        let id = session.add_track();
        session.begin_stroke(id, Point::new(0.0, 0.0)).unwrap();

        let removed = session.remove_track(id).unwrap();
        assert_eq!(removed.id, id);
        assert!(session.active_stroke().is_none());
        assert!(session.tracks().is_empty());
    }

    #[tokio::test]
    async fn two_tracks_share_one_clock() {
        let mut session = session(60.0);
        let a = session.add_track();
        let b = session.add_track();
        session.append_stroke(a, diagonal()).unwrap();
        session
            .append_stroke(b, stroke("green", &[(200.0, 100.0), (400.0, 50.0), (600.0, 0.0)]))
            .unwrap();

        session.play().await.unwrap();
        let scheduled = session.transport().scheduled();
        assert_eq!(scheduled.len(), 6);
        assert_eq!(session.transport().engine().pending().len(), 6);

        let fired = session.transport_mut().engine_mut().advance(0.3);
        let onsets: Vec<f64> = fired.iter().map(|e| e.onset_time).collect();
        assert_eq!(onsets, vec![0.0, 0.25]);

        // Both tracks have an event at 0.5 s and both fire.
        let fired = session.transport_mut().engine_mut().advance(0.25);
        let freqs: Vec<f64> = fired.iter().map(|e| e.frequency).collect();
        assert_eq!(freqs, vec![400.0, 650.0]);
    }

    #[tokio::test]
    async fn replay_from_idle_reproduces_the_same_schedule() {
        let mut session = session(60.0);
        let id = session.add_track();
        session.append_stroke(id, diagonal()).unwrap();

        session.play().await.unwrap();
        let first: Vec<AudioEvent> = session.transport().engine().pending().to_vec();
        session.transport_mut().engine_mut().advance(0.6);
        session.pause();
        session.stop();
        assert_eq!(session.status(), TransportStatus::Idle);

        session.play().await.unwrap();
        let second: Vec<AudioEvent> = session.transport().engine().pending().to_vec();
        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![
                AudioEvent {
                    onset_time: 0.0,
                    frequency: 100.0,
                    duration: 0.5,
                },
                AudioEvent {
                    onset_time: 0.5,
                    frequency: 400.0,
                    duration: 0.5,
                },
                AudioEvent {
                    onset_time: 1.0,
                    frequency: 700.0,
                    duration: 0.1,
                },
            ]
        );
    }

    #[tokio::test]
    async fn strokes_added_while_playing_wait_for_the_next_start() {
        let mut session = session(60.0);
        let id = session.add_track();
        session.append_stroke(id, diagonal()).unwrap();
        session.play().await.unwrap();

        session
            .append_stroke(id, stroke("red", &[(100.0, 100.0)]))
            .unwrap();
        session.pause();
        session.play().await.unwrap();
        assert_eq!(session.transport().scheduled().len(), 3);

        session.stop();
        session.play().await.unwrap();
        assert_eq!(session.transport().scheduled().len(), 4);
    }

    #[tokio::test]
    async fn rescheduling_picks_up_strokes_added_while_playing() {
        let mut session = session(60.0);
        let a = session.add_track();
        let b = session.add_track();
        session.append_stroke(a, stroke("red", &[(0.0, 100.0)])).unwrap();
        session.play().await.unwrap();

        session.append_stroke(b, stroke("blue", &[(400.0, 300.0)])).unwrap();
        assert_eq!(session.reschedule_track(b).unwrap(), TransportStatus::Playing);
        assert_eq!(session.transport().engine().pending().len(), 2);

        let fired = session.transport_mut().engine_mut().advance(5.0);
        let freqs: Vec<f64> = fired.iter().map(|e| e.frequency).collect();
        assert_eq!(freqs, vec![600.0, 400.0]);
        assert_eq!(session.transport().scheduled().len(), 2);
    }

    #[tokio::test]
    async fn rescheduling_a_track_leaves_played_events_behind() {
        let mut session = session(60.0);
        let a = session.add_track();
        let b = session.add_track();
        session.append_stroke(a, diagonal()).unwrap();
        session
            .append_stroke(b, stroke("green", &[(200.0, 100.0), (600.0, 0.0)]))
            .unwrap();
        session.play().await.unwrap();
        session.transport_mut().engine_mut().advance(0.3);

        session
            .append_stroke(a, stroke("red", &[(100.0, 500.0), (720.0, 200.0)]))
            .unwrap();
        session.reschedule_track(a).unwrap();

        let remaining = session.transport_mut().engine_mut().advance(5.0);
        let onsets: Vec<f64> = remaining.iter().map(|e| e.onset_time).collect();
        assert_eq!(onsets, vec![0.5, 0.75, 0.9, 1.0]);
        assert_eq!(session.transport().engine().fired().len(), 6);
    }

    #[tokio::test]
    async fn rescheduling_needs_a_known_track_and_an_active_transport() {
        let mut session = session(60.0);
        let id = session.add_track();
        session.append_stroke(id, diagonal()).unwrap();

        assert_eq!(session.reschedule_track(id).unwrap(), TransportStatus::Idle);
        assert!(session.transport().engine().pending().is_empty());
        assert!(matches!(
            session.reschedule_track(TrackId(42)),
            Err(SketchError::UnknownTrack(TrackId(42)))
        ));
    }

    #[tokio::test]
    async fn toggle_drives_the_play_pause_button() {
        let mut session = session(120.0);
        let id = session.add_track();
        session.append_stroke(id, diagonal()).unwrap();

        assert_eq!(session.toggle().await.unwrap(), TransportStatus::Playing);
        assert_eq!(session.toggle().await.unwrap(), TransportStatus::Paused);
        assert_eq!(session.stop(), TransportStatus::Idle);
    }

    #[tokio::test]
    async fn playback_fails_cleanly_without_audio() {
        let mut session = Session::new(OfflineSynth::unavailable(), &config(60.0));
        let id = session.add_track();
        session.append_stroke(id, diagonal()).unwrap();

        assert!(matches!(
            session.play().await,
            Err(SketchError::AudioEngineUnavailable(_))
        ));
        assert_eq!(session.status(), TransportStatus::Idle);
    }

    #[tokio::test]
    async fn failed_saves_do_not_disturb_drawing_or_playback() {
        let mut session = session(60.0);
        let id = session.add_track();
        session.append_stroke(id, diagonal()).unwrap();
        session.play().await.unwrap();

        let err = session.save_track(id, &FailingStore).unwrap_err();
        assert!(matches!(err, SketchError::PersistenceFailure(_)));
        assert_eq!(session.status(), TransportStatus::Playing);
        assert_eq!(session.track(id).unwrap().strokes().len(), 1);

        let store = CountingStore::default();
        session.save_track(id, &store).unwrap();
        assert_eq!(store.saves.get(), 1);
    }

    #[test]
    fn imported_drawings_become_new_tracks() {
        let mut source = session(60.0);
        let id = source.add_track();
        source.append_stroke(id, stroke("orange", &[(1.0, 2.0)])).unwrap();
        let drawing = SavedDrawing::from_track(source.track(id).unwrap());

        let mut target = session(60.0);
        target.add_track();
        let imported = target.import_drawing(&drawing).unwrap();

        let track = target.track(imported).unwrap();
        assert_eq!(track.base_color, Color::from("orange"));
        assert_eq!(track.strokes().len(), 1);
        assert_eq!(target.tracks().len(), 2);
    }
}
