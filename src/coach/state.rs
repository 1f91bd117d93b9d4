use crate::api::{AnswerFeedback, ContentItem};
use crate::capture::CaptureEvent;
use crate::error::Result;

/// Pipeline stage of a coaching session. `LoadFailed` is terminal and
/// carries the user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoachStage {
    LoadingContent,
    GeneratingQuestions,
    Ready,
    LoadFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisState {
    Idle,
    Analyzing,
    Done,
    Failed,
}

/// Progress for one question, independent of every other question.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionReview {
    pub answer: String,
    pub recording: RecordingState,
    pub analysis: AnalysisState,
    pub feedback: Option<AnswerFeedback>,
}

impl Default for QuestionReview {
    fn default() -> Self {
        Self {
            answer: String::new(),
            recording: RecordingState::Idle,
            analysis: AnalysisState::Idle,
            feedback: None,
        }
    }
}

/// Reactive snapshot of one coaching session.
#[derive(Debug, Clone, PartialEq)]
pub struct CoachState {
    pub content_id: u64,
    pub stage: CoachStage,
    /// Fixed once generated; regenerating means a new session.
    pub questions: Vec<String>,
    /// Indexed like `questions`.
    pub reviews: Vec<QuestionReview>,
    /// Session-level message for failures that do not end the session.
    pub error: Option<String>,
}

impl CoachState {
    pub(crate) fn new(content_id: u64) -> Self {
        Self {
            content_id,
            stage: CoachStage::LoadingContent,
            questions: Vec::new(),
            reviews: Vec::new(),
            error: None,
        }
    }

    /// The question currently holding the capture engine, if any.
    /// At most one exists.
    pub fn recording_question(&self) -> Option<usize> {
        self.reviews
            .iter()
            .position(|r| r.recording == RecordingState::Recording)
    }
}

/// Everything the session driver reacts to: user actions, stage
/// completions, and forwarded capture outcomes alike.
#[derive(Debug)]
pub(crate) enum CoachEvent {
    Loaded(Result<ContentItem>),
    QuestionsReady(Result<Vec<String>>),
    ToggleRecording(usize),
    Capture(CaptureEvent),
    Analyzed {
        index: usize,
        seq: u64,
        outcome: Result<AnswerFeedback>,
    },
}
