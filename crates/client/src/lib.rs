//! # DocShare Client Library
//!
//! Workflows of the DocShare document-sharing client: signing in, uploading
//! office documents, browsing the shared catalog and opening download links.
//!
//! ## Overview
//!
//! - **Validation**: extension allow-list and upload size limit
//! - **Upload**: single-file upload state machine with drag-and-drop
//! - **Download**: per-file in-flight guard and secure-link construction
//! - **Catalog**: file list presentation with a periodic "last updated" refresh
//! - **Auth**: login/signup form, session and role-gated access
//!
//! Every workflow talks to the outside world through the traits in
//! [`backend`]; [`http::HttpBackend`] implements them against the REST API.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐  ┌────────────────┐  ┌───────────────┐  ┌─────────────┐
//! │ AuthSession│  │ UploadWorkflow │  │ DownloadGuard │  │ FileCatalog │
//! └─────┬──────┘  └───────┬────────┘  └───────┬───────┘  └─────────────┘
//!       │ Authenticator   │ Uploader          │ DownloadResolver
//!       └─────────────────┴────────┬──────────┘
//!                            ┌─────┴──────┐
//!                            │ HttpBackend│
//!                            └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use client::{AuthSession, Capability, HttpBackend};
//! use protocol::Role;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = Arc::new(HttpBackend::new("http://localhost:8000"));
//!     let auth = AuthSession::new(Arc::clone(&backend));
//!
//!     auth.login("client@test.com", "testpass123", Role::Client).await;
//!     auth.require(Capability::Browse)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`validation`]: Upload acceptance rules
//! - [`upload`]: Upload workflow
//! - [`download`]: Download guard
//! - [`catalog`]: File catalog state and rendering
//! - [`auth`]: Authentication session
//! - [`backend`]: Collaborator traits
//! - [`http`]: REST adapter
//! - [`config`]: Configuration loading and defaults
//! - [`store`]: Persisted session

pub mod auth;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod download;
pub mod http;
pub mod store;
pub mod upload;
pub mod validation;

// Re-export protocol for convenience
pub use protocol;

pub use auth::{AccessError, AuthOutcome, AuthSession, Capability, UserSession};
pub use backend::{BackendError, BackendResult, RecordingOpener};
pub use catalog::{CatalogTiming, CatalogView, FileCatalog};
pub use config::ClientConfig;
pub use download::{DownloadGuard, DownloadOutcome};
pub use http::HttpBackend;
pub use store::{SessionStore, StoredSession};
pub use upload::{SubmitOutcome, UploadStatus, UploadWorkflow};
pub use validation::{validate_file, ValidationError};
