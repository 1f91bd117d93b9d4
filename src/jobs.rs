use std::sync::Arc;

use tokio::sync::watch;

use crate::api::{CareerApi, JobPosting};
use crate::auth::AuthManager;
use crate::error::ClientError;

/// Reactive job-feed state. Matching replaces `jobs` with a scored and
/// reordered copy of the feed.
#[derive(Debug, Clone, Default)]
pub struct JobFeedState {
    pub jobs: Vec<JobPosting>,
    pub cv_summary: Option<String>,
    pub loading: bool,
    pub matching: bool,
    pub error: Option<String>,
}

/// The job feed: plain listings plus CV-driven match scoring.
pub struct JobFeed {
    state: watch::Sender<JobFeedState>,
    api: Arc<dyn CareerApi>,
    auth: Arc<AuthManager>,
}

impl JobFeed {
    pub fn new(api: Arc<dyn CareerApi>, auth: Arc<AuthManager>) -> Self {
        let (state, _) = watch::channel(JobFeedState::default());
        Self { state, api, auth }
    }

    pub fn subscribe(&self) -> watch::Receiver<JobFeedState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> JobFeedState {
        self.state.borrow().clone()
    }

    /// Store the CV summary used for matching. Blank text clears it.
    pub fn set_cv_summary(&self, text: &str) {
        let summary = match text.trim() {
            "" => None,
            t => Some(t.to_string()),
        };
        self.state.send_modify(move |s| s.cv_summary = summary);
    }

    /// Reload the feed from the backend.
    pub async fn refresh(&self) {
        let Some(token) = self.auth.token() else {
            self.local_error(&ClientError::Unauthorized.user_message());
            return;
        };
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });

        match self.api.list_jobs(&token).await {
            Ok(jobs) => {
                log::info!("Loaded {} job postings", jobs.len());
                self.state.send_modify(move |s| {
                    s.loading = false;
                    s.jobs = jobs;
                });
            }
            Err(e) => {
                log::error!("Failed to load job postings: {e}");
                if e.is_unauthorized() {
                    self.auth.logout().await;
                }
                let message = e.user_message();
                self.state.send_modify(move |s| {
                    s.loading = false;
                    s.error = Some(message);
                });
            }
        }
    }

    /// Score the feed against the stored CV summary. Requires a summary;
    /// without one no request is made. A failed match keeps the current
    /// feed in place.
    pub async fn find_matches(&self) {
        let summary = self.state.borrow().cv_summary.clone();
        let Some(summary) = summary else {
            self.local_error("Add a CV summary before matching");
            return;
        };
        let Some(token) = self.auth.token() else {
            self.local_error(&ClientError::Unauthorized.user_message());
            return;
        };
        self.state.send_modify(|s| {
            s.matching = true;
            s.error = None;
        });

        match self.api.match_jobs(&token, &summary).await {
            Ok(jobs) => {
                log::info!("Matched {} job postings against the CV summary", jobs.len());
                self.state.send_modify(move |s| {
                    s.matching = false;
                    s.jobs = jobs;
                });
            }
            Err(e) => {
                log::error!("Job matching failed: {e}");
                if e.is_unauthorized() {
                    self.auth.logout().await;
                }
                let message = e.user_message();
                self.state.send_modify(move |s| {
                    s.matching = false;
                    s.error = Some(message);
                });
            }
        }
    }

    fn local_error(&self, message: &str) {
        let message = message.to_string();
        self.state.send_modify(move |s| s.error = Some(message));
    }
}
