mod session;
mod state;

pub use session::CoachSession;
pub use state::{AnalysisState, CoachStage, CoachState, QuestionReview, RecordingState};
