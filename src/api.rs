use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::Config;
use crate::error::{ClientError, Result};

/// A saved piece of generated content with its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: u64,
    pub title: String,
    #[serde(rename = "content")]
    pub body: String,
    #[serde(rename = "content_type")]
    pub kind: ContentKind,
    pub created_at: DateTime<Utc>,
    #[serde(rename = "original_cv_text", default)]
    pub source_cv_text: Option<String>,
    #[serde(rename = "original_job_description", default)]
    pub source_job_description: Option<String>,
}

impl ContentItem {
    /// The CV text and job description this item was generated from, if
    /// both are usable. Empty strings count as missing: the backend stores
    /// `""` for items saved without sources.
    pub fn generation_sources(&self) -> Option<(&str, &str)> {
        let cv = self.source_cv_text.as_deref().filter(|s| !s.is_empty())?;
        let jd = self
            .source_job_description
            .as_deref()
            .filter(|s| !s.is_empty())?;
        Some((cv, jd))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentKind {
    #[serde(rename = "coverLetter")]
    CoverLetter,
    #[serde(rename = "bio")]
    Bio,
}

/// Payload for saving a freshly generated piece into the library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDraft {
    pub title: String,
    #[serde(rename = "content")]
    pub body: String,
    #[serde(rename = "content_type")]
    pub kind: ContentKind,
    #[serde(rename = "original_cv_text", default)]
    pub source_cv_text: Option<String>,
    #[serde(rename = "original_job_description", default)]
    pub source_job_description: Option<String>,
}

/// Structured feedback for one recorded interview answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerFeedback {
    #[serde(rename = "positive_feedback")]
    pub positive: String,
    #[serde(rename = "constructive_feedback")]
    pub constructive: String,
    pub example_improvement: String,
}

/// One scraped job posting, optionally scored against a CV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: u64,
    pub message_text: String,
    pub posted_at: DateTime<Utc>,
    #[serde(default)]
    pub match_score: Option<u8>,
    #[serde(default)]
    pub match_summary: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BioTone {
    Professional,
    Casual,
    Enthusiastic,
    Formal,
}

/// Every remote operation of the CareerPilot backend.
///
/// All calls except `login`/`signup` require a bearer session token.
/// Orchestrating components hold this as `Arc<dyn CareerApi>` so tests can
/// substitute a scripted implementation.
#[async_trait]
pub trait CareerApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<String>;
    async fn signup(&self, email: &str, password: &str) -> Result<()>;

    async fn list_content(&self, token: &str) -> Result<Vec<ContentItem>>;
    async fn fetch_content(&self, token: &str, id: u64) -> Result<ContentItem>;
    async fn save_content(&self, token: &str, draft: &ContentDraft) -> Result<ContentItem>;
    async fn update_title(&self, token: &str, id: u64, title: &str) -> Result<ContentItem>;
    async fn delete_content(&self, token: &str, id: u64) -> Result<()>;

    async fn generate_cover_letter(
        &self,
        token: &str,
        job_description: &str,
        user_info: &str,
    ) -> Result<String>;
    async fn generate_bio(&self, token: &str, user_info: &str, tone: BioTone) -> Result<String>;
    async fn generate_questions(
        &self,
        token: &str,
        cv_text: &str,
        job_description: &str,
    ) -> Result<Vec<String>>;
    async fn analyze_answer(
        &self,
        token: &str,
        question: &str,
        answer: &str,
    ) -> Result<AnswerFeedback>;

    async fn list_jobs(&self, token: &str) -> Result<Vec<JobPosting>>;
    async fn match_jobs(&self, token: &str, cv_text: &str) -> Result<Vec<JobPosting>>;
}

// Request/response bodies. Wire names follow the backend.

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: String,
}

#[derive(Serialize)]
struct TitlePatch<'a> {
    title: &'a str,
}

#[derive(Serialize)]
struct CoverLetterRequest<'a> {
    job_description: &'a str,
    user_info: &'a str,
}

#[derive(Deserialize)]
struct CoverLetterResponse {
    cover_letter: String,
}

#[derive(Serialize)]
struct BioRequest<'a> {
    user_info: &'a str,
    tone: BioTone,
}

#[derive(Deserialize)]
struct BioResponse {
    bio: String,
}

#[derive(Serialize)]
struct QuestionsRequest<'a> {
    cv_text: &'a str,
    job_description: &'a str,
}

#[derive(Deserialize)]
struct QuestionsResponse {
    #[serde(default)]
    questions: Vec<String>,
}

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    question: &'a str,
    answer: &'a str,
}

#[derive(Serialize)]
struct MatchRequest<'a> {
    cv_text: &'a str,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    detail: String,
}

/// HTTP implementation of [`CareerApi`] over reqwest.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send, check the status, decode the JSON body.
    async fn request<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> Result<T> {
        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(error_for(resp).await);
        }
        Ok(resp.json().await?)
    }

    /// Send and check the status, discarding any body.
    async fn request_empty(&self, req: reqwest::RequestBuilder) -> Result<()> {
        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(error_for(resp).await);
        }
        Ok(())
    }
}

/// Map a non-success response onto the error taxonomy, consuming the body
/// for the message.
async fn error_for(resp: reqwest::Response) -> ClientError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    map_status(status, &body)
}

fn map_status(status: u16, body: &str) -> ClientError {
    match status {
        401 => ClientError::Unauthorized,
        404 => ClientError::NotFound(error_detail(body)),
        _ => ClientError::Remote {
            status,
            message: error_detail(body),
        },
    }
}

/// The backend wraps error text as `{"detail": "..."}`; fall back to the
/// raw body when it doesn't.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .map(|e| e.detail)
        .unwrap_or_else(|_| body.to_string())
}

#[async_trait]
impl CareerApi for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<String> {
        let resp: LoginResponse = self
            .request(
                self.http
                    .post(self.url("/api/login"))
                    .json(&Credentials { email, password }),
            )
            .await?;
        Ok(resp.access_token)
    }

    async fn signup(&self, email: &str, password: &str) -> Result<()> {
        self.request_empty(
            self.http
                .post(self.url("/api/signup"))
                .json(&Credentials { email, password }),
        )
        .await
    }

    async fn list_content(&self, token: &str) -> Result<Vec<ContentItem>> {
        self.request(self.http.get(self.url("/api/content")).bearer_auth(token))
            .await
    }

    async fn fetch_content(&self, token: &str, id: u64) -> Result<ContentItem> {
        self.request(
            self.http
                .get(self.url(&format!("/api/content/{id}")))
                .bearer_auth(token),
        )
        .await
    }

    async fn save_content(&self, token: &str, draft: &ContentDraft) -> Result<ContentItem> {
        self.request(
            self.http
                .post(self.url("/api/content"))
                .bearer_auth(token)
                .json(draft),
        )
        .await
    }

    async fn update_title(&self, token: &str, id: u64, title: &str) -> Result<ContentItem> {
        self.request(
            self.http
                .patch(self.url(&format!("/api/content/{id}")))
                .bearer_auth(token)
                .json(&TitlePatch { title }),
        )
        .await
    }

    async fn delete_content(&self, token: &str, id: u64) -> Result<()> {
        self.request_empty(
            self.http
                .delete(self.url(&format!("/api/content/{id}")))
                .bearer_auth(token),
        )
        .await
    }

    async fn generate_cover_letter(
        &self,
        token: &str,
        job_description: &str,
        user_info: &str,
    ) -> Result<String> {
        let resp: CoverLetterResponse = self
            .request(
                self.http
                    .post(self.url("/api/generate"))
                    .bearer_auth(token)
                    .json(&CoverLetterRequest {
                        job_description,
                        user_info,
                    }),
            )
            .await?;
        Ok(resp.cover_letter)
    }

    async fn generate_bio(&self, token: &str, user_info: &str, tone: BioTone) -> Result<String> {
        let resp: BioResponse = self
            .request(
                self.http
                    .post(self.url("/api/generate-bio"))
                    .bearer_auth(token)
                    .json(&BioRequest { user_info, tone }),
            )
            .await?;
        Ok(resp.bio)
    }

    async fn generate_questions(
        &self,
        token: &str,
        cv_text: &str,
        job_description: &str,
    ) -> Result<Vec<String>> {
        let resp: QuestionsResponse = self
            .request(
                self.http
                    .post(self.url("/api/generate-interview-questions"))
                    .bearer_auth(token)
                    .json(&QuestionsRequest {
                        cv_text,
                        job_description,
                    }),
            )
            .await?;
        Ok(resp.questions)
    }

    async fn analyze_answer(
        &self,
        token: &str,
        question: &str,
        answer: &str,
    ) -> Result<AnswerFeedback> {
        self.request(
            self.http
                .post(self.url("/api/analyze-interview-answer"))
                .bearer_auth(token)
                .json(&AnalyzeRequest { question, answer }),
        )
        .await
    }

    async fn list_jobs(&self, token: &str) -> Result<Vec<JobPosting>> {
        self.request(self.http.get(self.url("/api/jobs")).bearer_auth(token))
            .await
    }

    async fn match_jobs(&self, token: &str, cv_text: &str) -> Result<Vec<JobPosting>> {
        self.request(
            self.http
                .post(self.url("/api/match-jobs"))
                .bearer_auth(token)
                .json(&MatchRequest { cv_text }),
        )
        .await
    }
}
