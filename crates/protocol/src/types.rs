//! Core data model shared by the workflows and the REST adapter.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Access classification of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Operations user: uploads documents.
    Ops,
    /// Client user: browses and downloads documents.
    #[default]
    Client,
}

impl Role {
    /// Wire name of the role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Ops => "ops",
            Role::Client => "client",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ops" => Ok(Role::Ops),
            "client" => Ok(Role::Client),
            _ => Err(ProtocolError::InvalidRole(s.to_string())),
        }
    }
}

/// A file previously uploaded and available in the catalog.
///
/// Immutable once received from the file source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileItem {
    /// Opaque unique identifier.
    pub id: String,
    /// Display file name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type or extension tag.
    #[serde(rename = "type")]
    pub file_type: String,
    /// Display name of the uploader.
    pub uploaded_by: String,
    /// Upload time as Unix seconds.
    pub uploaded_at: u64,
}

/// A candidate file handed to the uploader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// File name including extension.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type.
    pub content_type: String,
    /// File contents. Cloning shares the buffer.
    pub bytes: Bytes,
}

impl UploadFile {
    /// Build a candidate from its contents, inferring size and MIME type.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let name = name.into();
        let bytes = bytes.into();
        let content_type = mime_for_name(&name).to_string();
        Self {
            size: bytes.len() as u64,
            name,
            content_type,
            bytes,
        }
    }

    /// Build a metadata-only candidate (no contents loaded yet).
    pub fn metadata(name: impl Into<String>, size: u64) -> Self {
        let name = name.into();
        let content_type = mime_for_name(&name).to_string();
        Self {
            name,
            size,
            content_type,
            bytes: Bytes::new(),
        }
    }
}

/// MIME type for the office document extensions, or a generic binary type.
pub fn mime_for_name(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        _ => "application/octet-stream",
    }
}

/// Result of resolving a file id into a download URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadLink {
    /// URL issued by the backend.
    pub download_url: String,
}

/// Outcome of a signup call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SignupResult {
    /// Whether the account was created.
    pub success: bool,
    /// Optional backend message.
    #[serde(default)]
    pub message: Option<String>,
}
