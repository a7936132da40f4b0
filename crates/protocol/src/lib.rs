//! # DocShare Protocol Library
//!
//! Shared definitions for the DocShare document-sharing client.
//!
//! ## Overview
//!
//! - **Data Model**: files in the catalog, upload candidates, roles
//! - **REST Payloads**: request and response bodies of the backend API
//! - **Download Tokens**: the opaque `secure-download` link token
//!
//! ## Example Usage
//!
//! ```rust
//! use protocol::{token, Role};
//!
//! let role: Role = "ops".parse().unwrap();
//! assert_eq!(role, Role::Ops);
//!
//! let url = token::secure_download_url("https://share.example.com", "f1", 1_700_000_000_000);
//! let decoded = token::decode(token::token_from_url(&url).unwrap()).unwrap();
//! assert_eq!(decoded.file_id, "f1");
//! ```
//!
//! ## Modules
//!
//! - [`types`]: Data model
//! - [`messages`]: REST payloads and endpoint paths
//! - [`token`]: Secure-download token codec
//! - [`error`]: Error types

pub mod error;
pub mod messages;
pub mod token;
pub mod types;

pub use error::{ProtocolError, Result};
pub use token::{token_from_url, DownloadToken, SECURE_DOWNLOAD_PATH};
pub use types::{mime_for_name, DownloadLink, FileItem, Role, SignupResult, UploadFile};
