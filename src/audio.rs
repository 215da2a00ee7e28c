use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::Poll;

use crate::error::QuizError;
use crate::stats::AnswerOutcome;

/// Short sound effects, keyed by their file stem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Cue {
    Correct,
    Incorrect,
    OutOfAttempts,
    OutOfTime,
    ShowAnswer,
    QuizCompleted,
    QuizFailed,
    TimeWarning,
    ButtonClick,
    NavButtonClick,
}

impl Cue {
    pub fn file_name(self) -> String {
        format!("{self}.mp3")
    }

    pub fn for_outcome(outcome: AnswerOutcome) -> Self {
        match outcome {
            AnswerOutcome::Correct => Cue::Correct,
            AnswerOutcome::OutOfAttempts => Cue::OutOfAttempts,
            AnswerOutcome::OutOfTime => Cue::OutOfTime,
            AnswerOutcome::ShowAnswer => Cue::ShowAnswer,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioClip {
    Cue(Cue),
    /// Path to a vocabulary narration file
    Narration(String),
}

/// Shared flag that resolves a pending playback immediately.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

type PlaybackResult = Result<(), String>;

/// Player-side end of a playback: reports completion, observes cancellation.
#[derive(Debug)]
pub struct PlaybackHandle {
    tx: Sender<PlaybackResult>,
    cancel: CancelToken,
}

impl PlaybackHandle {
    pub fn finish(self) {
        let _ = self.tx.send(Ok(()));
    }

    pub fn fail(self, reason: impl Into<String>) {
        let _ = self.tx.send(Err(reason.into()));
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn token(&self) -> CancelToken {
        self.cancel.clone()
    }
}

/// Completion signal for one clip.
///
/// Polling never blocks. A cancelled playback is ready at once, and a player
/// that drops its handle without reporting counts as a failed playback rather
/// than one that never ends.
#[derive(Debug)]
pub struct Playback {
    rx: Option<Receiver<PlaybackResult>>,
    cancel: CancelToken,
    done: bool,
}

impl Playback {
    pub fn pending() -> (PlaybackHandle, Playback) {
        let (tx, rx) = mpsc::channel();
        let cancel = CancelToken::default();
        (
            PlaybackHandle {
                tx,
                cancel: cancel.clone(),
            },
            Playback {
                rx: Some(rx),
                cancel,
                done: false,
            },
        )
    }

    pub fn resolved() -> Self {
        Self {
            rx: None,
            cancel: CancelToken::default(),
            done: true,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        let (handle, playback) = Self::pending();
        handle.fail(reason);
        playback
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn poll(&mut self) -> Poll<Result<(), QuizError>> {
        if self.done || self.cancel.is_cancelled() {
            self.done = true;
            return Poll::Ready(Ok(()));
        }

        let Some(rx) = self.rx.as_ref() else {
            self.done = true;
            return Poll::Ready(Ok(()));
        };

        let result = match rx.try_recv() {
            Ok(result) => result.map_err(QuizError::MediaFailure),
            Err(TryRecvError::Empty) => return Poll::Pending,
            Err(TryRecvError::Disconnected) => {
                Err(QuizError::MediaFailure("playback ended without completing".into()))
            }
        };
        self.done = true;
        Poll::Ready(result)
    }
}

/// Plays cues and narration on behalf of the quiz.
pub trait AudioPlayer {
    fn play(&mut self, clip: AudioClip) -> Playback;
    fn pause_all(&mut self);
    fn resume_all(&mut self);
    /// Stop everything and resolve all pending playbacks.
    fn stop_all(&mut self);
}

/// Player with no output device; every clip completes at once.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudio;

impl AudioPlayer for NullAudio {
    fn play(&mut self, clip: AudioClip) -> Playback {
        tracing::trace!("audio disabled, skipping {:?}", clip);
        Playback::resolved()
    }

    fn pause_all(&mut self) {}

    fn resume_all(&mut self) {}

    fn stop_all(&mut self) {}
}

#[derive(Debug)]
struct ActiveClip {
    clip: AudioClip,
    handle: PlaybackHandle,
    paused: bool,
}

#[derive(Debug, Default)]
struct ManualAudioState {
    history: Vec<AudioClip>,
    active: Vec<ActiveClip>,
}

impl ManualAudioState {
    fn prune(&mut self) {
        self.active.retain(|a| !a.handle.is_cancelled());
    }

    fn take(&mut self, clip: &AudioClip) -> Option<ActiveClip> {
        self.prune();
        let pos = self.active.iter().position(|a| &a.clip == clip)?;
        Some(self.active.remove(pos))
    }
}

/// Player whose clips finish only when told to.
///
/// Clones share state, so a test or headless driver can keep a handle after
/// giving the player to the quiz.
#[derive(Debug, Clone, Default)]
pub struct ManualAudio {
    state: Arc<Mutex<ManualAudioState>>,
}

impl ManualAudio {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ManualAudioState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every clip requested so far, in order.
    pub fn played(&self) -> Vec<AudioClip> {
        self.lock().history.clone()
    }

    /// Clips still playing or paused, with their paused flag.
    pub fn active(&self) -> Vec<(AudioClip, bool)> {
        let mut state = self.lock();
        state.prune();
        state
            .active
            .iter()
            .map(|a| (a.clip.clone(), a.paused))
            .collect()
    }

    /// Complete every clip that is not paused. Returns how many finished.
    pub fn finish_all(&self) -> usize {
        let mut state = self.lock();
        state.prune();
        let (paused, playing): (Vec<_>, Vec<_>) =
            std::mem::take(&mut state.active).into_iter().partition(|a| a.paused);
        state.active = paused;
        let count = playing.len();
        playing.into_iter().for_each(|a| a.handle.finish());
        count
    }

    pub fn finish(&self, clip: &AudioClip) -> bool {
        match self.lock().take(clip) {
            Some(active) => {
                active.handle.finish();
                true
            }
            None => false,
        }
    }

    pub fn fail(&self, clip: &AudioClip, reason: &str) -> bool {
        match self.lock().take(clip) {
            Some(active) => {
                active.handle.fail(reason);
                true
            }
            None => false,
        }
    }

    /// Drop a clip without reporting, as a detached media element would.
    pub fn detach(&self, clip: &AudioClip) -> bool {
        self.lock().take(clip).is_some()
    }
}

impl AudioPlayer for ManualAudio {
    fn play(&mut self, clip: AudioClip) -> Playback {
        let (handle, playback) = Playback::pending();
        let mut state = self.lock();
        state.history.push(clip.clone());
        state.active.push(ActiveClip {
            clip,
            handle,
            paused: false,
        });
        playback
    }

    fn pause_all(&mut self) {
        self.lock().active.iter_mut().for_each(|a| a.paused = true);
    }

    fn resume_all(&mut self) {
        self.lock().active.iter_mut().for_each(|a| a.paused = false);
    }

    fn stop_all(&mut self) {
        let mut state = self.lock();
        for active in state.active.drain(..) {
            active.handle.cancel.cancel();
        }
    }
}
