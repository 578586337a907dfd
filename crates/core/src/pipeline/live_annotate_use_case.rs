use crate::analysis::domain::face_analyzer::{AnalyzeError, FaceAnalyzer};
use crate::annotation::domain::frame_annotator::FrameAnnotator;
use crate::capture::domain::display_sink::DisplaySink;
use crate::capture::domain::frame_source::FrameSource;

use super::cadence::FrameCadence;
use super::result_cache::ResultCache;

/// Loop state. `Stopped` is terminal; there is no transition back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped,
}

/// Counters reported when the loop stops.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames_displayed: u64,
    pub analyses_attempted: u64,
    pub analyses_succeeded: u64,
}

/// Orchestrates the live annotate-and-display loop.
///
/// Owns the frame source, analyzer, annotator, and display sink, plus the
/// cadence gate and the single-slot result cache. Each `step()` acquires
/// one frame, conditionally analyzes it, draws the cached result, shows
/// the frame, and polls for the exit key.
///
/// The cached regions are only meaningful while the source resolution
/// stays constant; nothing between analysis and display resizes frames.
pub struct LiveAnnotateUseCase {
    source: Box<dyn FrameSource>,
    analyzer: Box<dyn FaceAnalyzer>,
    annotator: Box<dyn FrameAnnotator>,
    sink: Box<dyn DisplaySink>,
    cadence: FrameCadence,
    exit_key: char,
    cache: ResultCache,
    frames_seen: u64,
    summary: RunSummary,
}

impl LiveAnnotateUseCase {
    pub fn new(
        source: Box<dyn FrameSource>,
        analyzer: Box<dyn FaceAnalyzer>,
        annotator: Box<dyn FrameAnnotator>,
        sink: Box<dyn DisplaySink>,
        cadence: FrameCadence,
        exit_key: char,
    ) -> Self {
        Self {
            source,
            analyzer,
            annotator,
            sink,
            cadence,
            exit_key,
            cache: ResultCache::new(),
            frames_seen: 0,
            summary: RunSummary::default(),
        }
    }

    /// Drives `step()` until the loop stops, then releases the device and
    /// the display surface. Teardown runs on every exit path, including a
    /// propagated annotator/display error.
    pub fn run(&mut self) -> Result<RunSummary, Box<dyn std::error::Error>> {
        let outcome = self.run_loop();
        self.source.close();
        self.sink.close();
        outcome.map(|()| self.summary)
    }

    fn run_loop(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        loop {
            if self.step()? == LoopState::Stopped {
                return Ok(());
            }
        }
    }

    /// One loop iteration: the single transition function of the
    /// RUNNING/STOPPED state machine.
    fn step(&mut self) -> Result<LoopState, Box<dyn std::error::Error>> {
        let mut frame = match self.source.grab() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                log::warn!("frame source ended; stopping");
                return Ok(LoopState::Stopped);
            }
            Err(err) => {
                // Read failure is fatal but not retried: stop through the
                // normal teardown path, matching the device-unplugged case.
                log::error!("frame acquisition failed: {err}");
                return Ok(LoopState::Stopped);
            }
        };
        self.frames_seen += 1;

        if self.cadence.should_analyze(self.frames_seen) {
            self.summary.analyses_attempted += 1;
            match self.analyzer.analyze(&frame) {
                Ok(result) => {
                    self.summary.analyses_succeeded += 1;
                    self.cache.replace(result);
                }
                Err(AnalyzeError::NoFaceDetected) => {
                    // Expected between subjects: keep the previous result so
                    // the overlay doesn't flicker empty.
                    log::debug!("frame {}: no face detected", self.frames_seen);
                }
                Err(err) => {
                    log::warn!(
                        "frame {}: analysis failed, keeping previous result: {err}",
                        self.frames_seen
                    );
                }
            }
        }

        // Draw on every frame, analyzed or not; the cache may be stale or
        // empty relative to this frame.
        self.annotator.annotate(&mut frame, self.cache.observations())?;
        self.sink.show(&frame)?;
        self.summary.frames_displayed += 1;

        if self.sink.poll_key()? == Some(self.exit_key) {
            log::info!("exit key pressed; stopping");
            return Ok(LoopState::Stopped);
        }
        Ok(LoopState::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::domain::observation::{AnalysisResult, FaceObservation};
    use crate::shared::frame::Frame;
    use crate::shared::region::FaceRegion;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    struct ScriptedSource {
        frames: VecDeque<Result<Option<Frame>, String>>,
        closed: Arc<Mutex<bool>>,
    }

    impl ScriptedSource {
        fn frames(count: u64) -> Self {
            Self {
                frames: (1..=count).map(|i| Ok(Some(make_frame(i)))).collect(),
                closed: Arc::new(Mutex::new(false)),
            }
        }

        fn with_outcomes(outcomes: Vec<Result<Option<Frame>, String>>) -> Self {
            Self {
                frames: outcomes.into(),
                closed: Arc::new(Mutex::new(false)),
            }
        }
    }

    impl FrameSource for ScriptedSource {
        fn grab(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
            match self.frames.pop_front() {
                None => Ok(None),
                Some(Ok(frame)) => Ok(frame),
                Some(Err(msg)) => Err(msg.into()),
            }
        }

        fn close(&mut self) {
            *self.closed.lock().unwrap() = true;
        }
    }

    struct ScriptedAnalyzer {
        // outcome per call, in order; `None` entries panic (unexpected call)
        outcomes: VecDeque<Result<AnalysisResult, AnalyzeError>>,
        called_on: Arc<Mutex<Vec<u64>>>,
    }

    impl ScriptedAnalyzer {
        fn new(outcomes: Vec<Result<AnalysisResult, AnalyzeError>>) -> Self {
            Self {
                outcomes: outcomes.into(),
                called_on: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl FaceAnalyzer for ScriptedAnalyzer {
        fn analyze(&mut self, frame: &Frame) -> Result<AnalysisResult, AnalyzeError> {
            self.called_on.lock().unwrap().push(frame.index());
            self.outcomes
                .pop_front()
                .expect("analyzer called more times than scripted")
        }
    }

    #[allow(clippy::type_complexity)]
    struct RecordingAnnotator {
        calls: Arc<Mutex<Vec<(u64, Vec<FaceObservation>)>>>,
        fail: bool,
    }

    impl RecordingAnnotator {
        fn new() -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: Arc::new(Mutex::new(Vec::new())),
                fail: true,
            }
        }
    }

    impl FrameAnnotator for RecordingAnnotator {
        fn annotate(
            &self,
            frame: &mut Frame,
            observations: &[FaceObservation],
        ) -> Result<(), Box<dyn std::error::Error>> {
            if self.fail {
                return Err("draw failed".into());
            }
            self.calls
                .lock()
                .unwrap()
                .push((frame.index(), observations.to_vec()));
            Ok(())
        }
    }

    struct ScriptedSink {
        shown: Arc<Mutex<Vec<u64>>>,
        // key returned on the nth poll (1-based); None elsewhere
        key_at: Option<(u64, char)>,
        polls: u64,
        closed: Arc<Mutex<bool>>,
    }

    impl ScriptedSink {
        fn new() -> Self {
            Self {
                shown: Arc::new(Mutex::new(Vec::new())),
                key_at: None,
                polls: 0,
                closed: Arc::new(Mutex::new(false)),
            }
        }

        fn key_on_poll(poll: u64, key: char) -> Self {
            Self {
                key_at: Some((poll, key)),
                ..Self::new()
            }
        }
    }

    impl DisplaySink for ScriptedSink {
        fn show(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            self.shown.lock().unwrap().push(frame.index());
            Ok(())
        }

        fn poll_key(&mut self) -> Result<Option<char>, Box<dyn std::error::Error>> {
            self.polls += 1;
            match self.key_at {
                Some((poll, key)) if poll == self.polls => Ok(Some(key)),
                _ => Ok(None),
            }
        }

        fn close(&mut self) {
            *self.closed.lock().unwrap() = true;
        }
    }

    // --- Helpers ---

    fn make_frame(index: u64) -> Frame {
        Frame::new(vec![0u8; 300 * 300 * 3], 300, 300, 3, index)
    }

    fn observation(x: i32, age: u32) -> FaceObservation {
        FaceObservation {
            region: FaceRegion::new(x, 10, 50, 50),
            gender_scores: HashMap::from([
                ("Woman".to_string(), 0.9),
                ("Man".to_string(), 0.1),
            ]),
            age,
        }
    }

    fn use_case(
        source: ScriptedSource,
        analyzer: ScriptedAnalyzer,
        annotator: RecordingAnnotator,
        sink: ScriptedSink,
        cadence: u64,
    ) -> LiveAnnotateUseCase {
        LiveAnnotateUseCase::new(
            Box::new(source),
            Box::new(analyzer),
            Box::new(annotator),
            Box::new(sink),
            FrameCadence::new(cadence).unwrap(),
            'q',
        )
    }

    // --- Tests ---

    #[test]
    fn test_cadence_10_analyzes_frames_10_and_20_only() {
        let first = vec![observation(10, 34)];
        let second = vec![observation(80, 29)];
        let analyzer = ScriptedAnalyzer::new(vec![Ok(first.clone()), Ok(second.clone())]);
        let called_on = analyzer.called_on.clone();
        let annotator = RecordingAnnotator::new();
        let calls = annotator.calls.clone();

        let mut uc = use_case(
            ScriptedSource::frames(25),
            analyzer,
            annotator,
            ScriptedSink::new(),
            10,
        );
        let summary = uc.run().unwrap();

        assert_eq!(*called_on.lock().unwrap(), vec![10, 20]);
        assert_eq!(summary.frames_displayed, 25);
        assert_eq!(summary.analyses_attempted, 2);
        assert_eq!(summary.analyses_succeeded, 2);

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 25);
        for (index, observations) in calls.iter() {
            match *index {
                1..=9 => assert!(observations.is_empty(), "frame {index} should be bare"),
                10..=19 => assert_eq!(observations, &first, "frame {index}"),
                _ => assert_eq!(observations, &second, "frame {index}"),
            }
        }
    }

    #[test]
    fn test_no_face_then_success() {
        // No face at frame 10; one woman, age 34, at frame 20.
        let obs = vec![observation(10, 34)];
        let analyzer = ScriptedAnalyzer::new(vec![
            Err(AnalyzeError::NoFaceDetected),
            Ok(obs.clone()),
        ]);
        let annotator = RecordingAnnotator::new();
        let calls = annotator.calls.clone();

        let mut uc = use_case(
            ScriptedSource::frames(25),
            analyzer,
            annotator,
            ScriptedSink::new(),
            10,
        );
        let summary = uc.run().unwrap();

        assert_eq!(summary.analyses_attempted, 2);
        assert_eq!(summary.analyses_succeeded, 1);

        let calls = calls.lock().unwrap();
        for (index, observations) in calls.iter() {
            if *index < 20 {
                assert!(observations.is_empty(), "frame {index} should be bare");
            } else {
                assert_eq!(observations, &obs, "frame {index}");
                assert_eq!(observations[0].region.right(), 60);
                assert_eq!(observations[0].region.bottom(), 60);
            }
        }
    }

    #[test]
    fn test_no_face_keeps_previous_result() {
        let first = vec![observation(10, 34)];
        let analyzer = ScriptedAnalyzer::new(vec![
            Ok(first.clone()),
            Err(AnalyzeError::NoFaceDetected),
        ]);
        let annotator = RecordingAnnotator::new();
        let calls = annotator.calls.clone();

        let mut uc = use_case(
            ScriptedSource::frames(8),
            analyzer,
            annotator,
            ScriptedSink::new(),
            4,
        );
        uc.run().unwrap();

        // Frames 4-8 all show the first result; the frame-8 no-face left
        // the cache untouched.
        let calls = calls.lock().unwrap();
        assert_eq!(calls[7].1, first);
    }

    #[test]
    fn test_backend_failure_is_recoverable_and_keeps_cache() {
        let first = vec![observation(10, 34)];
        let analyzer = ScriptedAnalyzer::new(vec![
            Ok(first.clone()),
            Err(AnalyzeError::backend("inference hiccup")),
            Ok(vec![observation(200, 60)]),
        ]);
        let annotator = RecordingAnnotator::new();
        let calls = annotator.calls.clone();

        let mut uc = use_case(
            ScriptedSource::frames(6),
            analyzer,
            annotator,
            ScriptedSink::new(),
            2,
        );
        let summary = uc.run().unwrap();

        assert_eq!(summary.frames_displayed, 6);
        assert_eq!(summary.analyses_attempted, 3);
        assert_eq!(summary.analyses_succeeded, 2);

        let calls = calls.lock().unwrap();
        // Frame 5 still shows the first result despite the frame-4 failure.
        assert_eq!(calls[4].1, first);
        // Frame 6 shows the replacement.
        assert_eq!(calls[5].1[0].region.x, 200);
    }

    #[test]
    fn test_cadence_1_analyzes_every_frame() {
        let analyzer = ScriptedAnalyzer::new(vec![
            Ok(vec![observation(1, 20)]),
            Ok(vec![observation(2, 21)]),
            Ok(vec![observation(3, 22)]),
        ]);
        let called_on = analyzer.called_on.clone();

        let mut uc = use_case(
            ScriptedSource::frames(3),
            analyzer,
            RecordingAnnotator::new(),
            ScriptedSink::new(),
            1,
        );
        let summary = uc.run().unwrap();

        assert_eq!(*called_on.lock().unwrap(), vec![1, 2, 3]);
        assert_eq!(summary.analyses_attempted, 3);
    }

    #[test]
    fn test_exit_key_stops_loop() {
        let sink = ScriptedSink::key_on_poll(3, 'q');
        let shown = sink.shown.clone();
        let sink_closed = sink.closed.clone();

        let source = ScriptedSource::frames(100);
        let source_closed = source.closed.clone();

        let mut uc = use_case(
            source,
            ScriptedAnalyzer::new(vec![]),
            RecordingAnnotator::new(),
            sink,
            1000, // never analyze
        );
        let summary = uc.run().unwrap();

        assert_eq!(summary.frames_displayed, 3);
        assert_eq!(*shown.lock().unwrap(), vec![1, 2, 3]);
        assert!(*source_closed.lock().unwrap());
        assert!(*sink_closed.lock().unwrap());
    }

    #[test]
    fn test_other_keys_are_ignored() {
        let sink = ScriptedSink::key_on_poll(2, 'x');
        let source = ScriptedSource::frames(5);

        let mut uc = use_case(
            source,
            ScriptedAnalyzer::new(vec![]),
            RecordingAnnotator::new(),
            sink,
            1000,
        );
        let summary = uc.run().unwrap();
        assert_eq!(summary.frames_displayed, 5);
    }

    #[test]
    fn test_source_exhaustion_stops_gracefully() {
        let source = ScriptedSource::frames(4);
        let source_closed = source.closed.clone();
        let sink = ScriptedSink::new();
        let sink_closed = sink.closed.clone();

        let mut uc = use_case(
            source,
            ScriptedAnalyzer::new(vec![]),
            RecordingAnnotator::new(),
            sink,
            1000,
        );
        let summary = uc.run().unwrap();

        assert_eq!(summary.frames_displayed, 4);
        assert!(*source_closed.lock().unwrap());
        assert!(*sink_closed.lock().unwrap());
    }

    #[test]
    fn test_read_failure_stops_gracefully_not_error() {
        let source = ScriptedSource::with_outcomes(vec![
            Ok(Some(make_frame(1))),
            Ok(Some(make_frame(2))),
            Err("device disconnected".to_string()),
        ]);
        let source_closed = source.closed.clone();

        let mut uc = use_case(
            source,
            ScriptedAnalyzer::new(vec![]),
            RecordingAnnotator::new(),
            ScriptedSink::new(),
            1000,
        );
        let summary = uc.run().unwrap();

        assert_eq!(summary.frames_displayed, 2);
        assert!(*source_closed.lock().unwrap());
    }

    #[test]
    fn test_annotator_error_propagates_but_teardown_runs() {
        let source = ScriptedSource::frames(5);
        let source_closed = source.closed.clone();
        let sink = ScriptedSink::new();
        let sink_closed = sink.closed.clone();

        let mut uc = use_case(
            source,
            ScriptedAnalyzer::new(vec![]),
            RecordingAnnotator::failing(),
            sink,
            1000,
        );
        assert!(uc.run().is_err());
        assert!(*source_closed.lock().unwrap());
        assert!(*sink_closed.lock().unwrap());
    }

    #[test]
    fn test_annotation_runs_even_with_empty_cache() {
        let annotator = RecordingAnnotator::new();
        let calls = annotator.calls.clone();

        let mut uc = use_case(
            ScriptedSource::frames(3),
            ScriptedAnalyzer::new(vec![]),
            annotator,
            ScriptedSink::new(),
            1000,
        );
        uc.run().unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|(_, obs)| obs.is_empty()));
    }

    #[test]
    fn test_success_replaces_wholesale_not_merge() {
        let analyzer = ScriptedAnalyzer::new(vec![
            Ok(vec![observation(10, 34), observation(100, 50)]),
            Ok(vec![observation(200, 41)]),
        ]);
        let annotator = RecordingAnnotator::new();
        let calls = annotator.calls.clone();

        let mut uc = use_case(
            ScriptedSource::frames(4),
            analyzer,
            annotator,
            ScriptedSink::new(),
            2,
        );
        uc.run().unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls[1].1.len(), 2); // frame 2: both faces
        assert_eq!(calls[3].1.len(), 1); // frame 4: replaced, not appended
        assert_eq!(calls[3].1[0].region.x, 200);
    }
}
