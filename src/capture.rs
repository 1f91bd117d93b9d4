use std::sync::Arc;

use tokio::sync::watch;

use crate::error::{ClientError, Result};
use crate::task::TaskGuard;

/// One recognized chunk of speech. Interim segments are revisions in
/// flight; final segments never change again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub is_final: bool,
}

/// Events emitted by the native recognizer during an episode.
#[derive(Debug, Clone)]
pub enum RecognizerEvent {
    /// The cumulative segment list for the current episode.
    Result { segments: Vec<Segment> },
    /// The recognizer failed; the episode is over.
    Error(String),
    /// The episode ended, whether requested or engine-initiated.
    Ended,
}

/// The native speech recognizer, a single-instance external capability.
/// `start` may fail synchronously (permission refused); `stop` is a
/// request, completion arrives as [`RecognizerEvent::Ended`].
pub trait SpeechRecognizer: Send + Sync {
    fn is_available(&self) -> bool;
    fn start(&self) -> Result<()>;
    fn stop(&self);
    fn events(&self) -> async_channel::Receiver<RecognizerEvent>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    Idle,
    Listening,
}

/// Reactive capture state. The transcript is meaningful only while
/// listening; when an episode ends it resets and the final value travels
/// in [`CaptureEvent::Stopped`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureState {
    pub phase: CapturePhase,
    pub transcript: String,
    pub error: Option<String>,
    pub supported: bool,
}

/// Notifications for an orchestrating consumer. Each event is delivered
/// to exactly one receiver; this is a hand-off queue, not a broadcast.
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    /// The cumulative final transcript changed while listening.
    Transcript(String),
    /// The episode ended; carries the final transcript exactly once.
    Stopped { transcript: String },
    /// The recognizer failed mid-episode.
    Failed(String),
}

/// Race-free interface over the continuous native recognizer.
///
/// One engine instance wraps one recognizer; dropping the engine stops
/// the recognizer unconditionally so a live microphone never leaks. A
/// driver task consumes recognizer events and republishes only the
/// cumulative final transcript, so interim flicker never reaches the
/// public value.
pub struct CaptureEngine {
    state: watch::Sender<CaptureState>,
    recognizer: Arc<dyn SpeechRecognizer>,
    events_tx: async_channel::Sender<CaptureEvent>,
    events_rx: async_channel::Receiver<CaptureEvent>,
    _driver: TaskGuard,
}

impl CaptureEngine {
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        let supported = recognizer.is_available();
        if !supported {
            log::warn!("Speech recognition is unavailable in this environment");
        }

        let (state, _) = watch::channel(CaptureState {
            phase: CapturePhase::Idle,
            transcript: String::new(),
            error: None,
            supported,
        });
        let (events_tx, events_rx) = async_channel::unbounded();

        let driver = tokio::spawn(drive(recognizer.events(), state.clone(), events_tx.clone()));

        Self {
            state,
            recognizer,
            events_tx,
            events_rx,
            _driver: TaskGuard::new(driver),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CaptureState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> CaptureState {
        self.state.borrow().clone()
    }

    /// Queue of capture outcomes for the orchestrating consumer.
    pub fn capture_events(&self) -> async_channel::Receiver<CaptureEvent> {
        self.events_rx.clone()
    }

    /// Begin a listening episode. No-op while already listening; records
    /// an error without leaving idle when unsupported or denied. A start
    /// that fails this way also yields [`CaptureEvent::Failed`], so an
    /// orchestrator always hears back about an episode it requested.
    pub fn start_listening(&self) {
        let (supported, listening) = {
            let s = self.state.borrow();
            (s.supported, s.phase == CapturePhase::Listening)
        };
        if !supported {
            let message = ClientError::CaptureUnsupported.user_message();
            self.state.send_modify(|s| s.error = Some(message.clone()));
            let _ = self.events_tx.try_send(CaptureEvent::Failed(message));
            return;
        }
        if listening {
            return;
        }

        log::info!("Starting speech capture");
        self.state.send_modify(|s| {
            s.phase = CapturePhase::Listening;
            s.transcript.clear();
            s.error = None;
        });

        if let Err(e) = self.recognizer.start() {
            log::error!("Recognizer failed to start: {e}");
            let message = e.user_message();
            self.state.send_modify(|s| {
                s.phase = CapturePhase::Idle;
                s.error = Some(message.clone());
            });
            let _ = self.events_tx.try_send(CaptureEvent::Failed(message));
        }
    }

    /// Request the episode to end. The idle transition happens when the
    /// recognizer reports [`RecognizerEvent::Ended`].
    pub fn stop_listening(&self) {
        let listening = self.state.borrow().phase == CapturePhase::Listening;
        if !listening {
            return;
        }
        log::info!("Stopping speech capture");
        self.recognizer.stop();
    }
}

impl Drop for CaptureEngine {
    fn drop(&mut self) {
        // Release the microphone regardless of the current phase.
        self.recognizer.stop();
    }
}

async fn drive(
    events: async_channel::Receiver<RecognizerEvent>,
    state: watch::Sender<CaptureState>,
    out: async_channel::Sender<CaptureEvent>,
) {
    while let Ok(event) = events.recv().await {
        match event {
            RecognizerEvent::Result { segments } => {
                let transcript = final_transcript(&segments);
                let changed = {
                    let s = state.borrow();
                    s.phase == CapturePhase::Listening && s.transcript != transcript
                };
                if changed {
                    state.send_modify(|s| s.transcript = transcript.clone());
                    let _ = out.send(CaptureEvent::Transcript(transcript)).await;
                }
            }
            RecognizerEvent::Error(message) => {
                let listening = state.borrow().phase == CapturePhase::Listening;
                log::error!("Recognizer error: {message}");
                state.send_modify(|s| {
                    s.phase = CapturePhase::Idle;
                    s.transcript.clear();
                    s.error = Some(message.clone());
                });
                if listening {
                    let _ = out.send(CaptureEvent::Failed(message)).await;
                }
            }
            RecognizerEvent::Ended => {
                let transcript = {
                    let s = state.borrow();
                    (s.phase == CapturePhase::Listening).then(|| s.transcript.clone())
                };
                if let Some(transcript) = transcript {
                    // Reset before notifying: a consumer restarting on
                    // Stopped must find the engine idle. The final value
                    // travels in the event payload.
                    state.send_modify(|s| {
                        s.phase = CapturePhase::Idle;
                        s.transcript.clear();
                    });
                    let _ = out.send(CaptureEvent::Stopped { transcript }).await;
                }
            }
        }
    }
}

/// The cumulative final transcript: every final segment, in order.
fn final_transcript(segments: &[Segment]) -> String {
    segments
        .iter()
        .filter(|s| s.is_final)
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
