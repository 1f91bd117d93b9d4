use std::sync::Arc;

use tokio::sync::watch;

use crate::api::{BioTone, CareerApi, ContentDraft, ContentKind};
use crate::auth::AuthManager;
use crate::error::ClientError;
use crate::library::ContentLibrary;

/// Reactive generation state. `draft` holds the latest generated piece
/// until it is saved or replaced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratorState {
    pub busy: bool,
    pub error: Option<String>,
    pub draft: Option<ContentDraft>,
}

/// The composition workflow: submit source texts, receive generated
/// text, optionally hand it to the library.
pub struct Generator {
    state: watch::Sender<GeneratorState>,
    api: Arc<dyn CareerApi>,
    auth: Arc<AuthManager>,
}

impl Generator {
    pub fn new(api: Arc<dyn CareerApi>, auth: Arc<AuthManager>) -> Self {
        let (state, _) = watch::channel(GeneratorState::default());
        Self { state, api, auth }
    }

    pub fn subscribe(&self) -> watch::Receiver<GeneratorState> {
        self.state.subscribe()
    }

    pub fn current(&self) -> GeneratorState {
        self.state.borrow().clone()
    }

    /// Generate a cover letter from a job description and the user's
    /// background. Empty inputs are rejected locally.
    pub async fn compose_cover_letter(&self, job_description: &str, user_info: &str) {
        if job_description.trim().is_empty() || user_info.trim().is_empty() {
            self.local_error("Both the job description and your background are required");
            return;
        }
        let Some(token) = self.begin() else {
            return;
        };

        match self
            .api
            .generate_cover_letter(&token, job_description, user_info)
            .await
        {
            Ok(text) => {
                log::info!("Generated a cover letter draft");
                let draft = ContentDraft {
                    title: String::new(),
                    body: text,
                    kind: ContentKind::CoverLetter,
                    source_cv_text: Some(user_info.to_string()),
                    source_job_description: Some(job_description.to_string()),
                };
                self.state.send_modify(move |s| {
                    s.busy = false;
                    s.draft = Some(draft);
                });
            }
            Err(e) => self.fail(e).await,
        }
    }

    /// Generate a bio in the requested tone. Bios carry no generation
    /// sources, so they cannot seed interview practice later.
    pub async fn compose_bio(&self, user_info: &str, tone: BioTone) {
        if user_info.trim().is_empty() {
            self.local_error("Tell us something about yourself first");
            return;
        }
        let Some(token) = self.begin() else {
            return;
        };

        match self.api.generate_bio(&token, user_info, tone).await {
            Ok(text) => {
                log::info!("Generated a bio draft");
                let draft = ContentDraft {
                    title: String::new(),
                    body: text,
                    kind: ContentKind::Bio,
                    source_cv_text: None,
                    source_job_description: None,
                };
                self.state.send_modify(move |s| {
                    s.busy = false;
                    s.draft = Some(draft);
                });
            }
            Err(e) => self.fail(e).await,
        }
    }

    /// Save the current draft into the library under the given title,
    /// clearing it on success.
    pub async fn save_to(&self, library: &ContentLibrary, title: &str) {
        let draft = self.state.borrow().draft.clone();
        let Some(mut draft) = draft else {
            self.local_error("Nothing to save yet");
            return;
        };
        draft.title = title.to_string();

        match library.save(&draft).await {
            Ok(_) => self.state.send_modify(|s| s.draft = None),
            Err(e) => {
                let message = e.user_message();
                self.state.send_modify(move |s| s.error = Some(message));
            }
        }
    }

    /// Gate on a usable token and mark the workflow busy. Returns `None`
    /// after recording the error when no generation can start.
    fn begin(&self) -> Option<String> {
        if self.state.borrow().busy {
            return None;
        }
        let Some(token) = self.auth.token() else {
            self.local_error(&ClientError::Unauthorized.user_message());
            return None;
        };
        self.state.send_modify(|s| {
            s.busy = true;
            s.error = None;
        });
        Some(token)
    }

    fn local_error(&self, message: &str) {
        let message = message.to_string();
        self.state.send_modify(move |s| s.error = Some(message));
    }

    async fn fail(&self, e: ClientError) {
        log::error!("Generation failed: {e}");
        if e.is_unauthorized() {
            self.auth.logout().await;
        }
        let message = e.user_message();
        self.state.send_modify(move |s| {
            s.busy = false;
            s.error = Some(message);
        });
    }
}
