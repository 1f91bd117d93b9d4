//! CareerPilot client core: the state and orchestration layer behind the
//! CareerPilot UI.
//!
//! Each workflow lives in its own module and publishes a snapshot of its
//! state through a `tokio::sync::watch` channel, so any frontend can
//! subscribe and redraw on change:
//!
//! - **auth**: session lifecycle against the identity bridge
//! - **capture**: continuous speech capture over an event-driven recognizer
//! - **coach**: interview practice sessions with per-question analysis
//! - **library**: saved content with optimistic edits and rollback
//! - **generator**: cover letter and bio composition
//! - **jobs**: the job feed and CV-driven match scoring
//!
//! Remote calls go through the [`api::CareerApi`] trait; [`api::ApiClient`]
//! is the HTTP implementation.

pub mod api;
pub mod auth;
pub mod capture;
pub mod coach;
pub mod config;
pub mod error;
pub mod generator;
pub mod jobs;
pub mod library;

mod task;

#[cfg(test)]
pub mod mocks;

pub use api::{ApiClient, CareerApi};
pub use auth::AuthManager;
pub use capture::CaptureEngine;
pub use coach::CoachSession;
pub use config::Config;
pub use error::{ClientError, Result};
pub use generator::Generator;
pub use jobs::JobFeed;
pub use library::ContentLibrary;
