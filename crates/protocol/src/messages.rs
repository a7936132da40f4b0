//! REST payloads exchanged with the DocShare backend.
//!
//! All bodies are JSON. Authenticated endpoints expect
//! `Authorization: Bearer <access_token>` from [`LoginResponse`].

use serde::{Deserialize, Serialize};

use crate::types::{DownloadLink, FileItem, Role};

/// Signup endpoint path.
pub const SIGNUP_PATH: &str = "/api/auth/signup";
/// Login endpoint path.
pub const LOGIN_PATH: &str = "/api/auth/login";
/// Upload endpoint path (multipart, field `file`).
pub const UPLOAD_PATH: &str = "/api/files/upload";
/// File listing endpoint path.
pub const LIST_PATH: &str = "/api/files/list";
/// Download-link endpoint prefix; the file id is appended.
pub const DOWNLOAD_PATH: &str = "/api/files/download";
/// Live statistics endpoint path (no authentication).
pub const STATS_PATH: &str = "/api/stats/live";

/// Body of both login and signup requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    pub email: String,
    pub password: String,
    /// Role the account is registered or logging in under.
    pub user_type: Role,
}

/// Successful login response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Bearer token for subsequent requests.
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Generic envelope used by the file endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub data: Option<T>,
}

/// Response of the upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub file_id: Option<String>,
}

/// `data` of the listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileListData {
    pub files: Vec<FileItem>,
}

/// `data` of the download-link endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadLinkData {
    pub download_link: String,
}

impl From<DownloadLinkData> for DownloadLink {
    fn from(data: DownloadLinkData) -> Self {
        DownloadLink {
            download_url: data.download_link,
        }
    }
}

/// `data` of the live statistics endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LiveStats {
    /// Files currently stored.
    pub total_files: u64,
    /// Users with an active session.
    pub active_users: u64,
}

/// Error body returned with non-2xx statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_request_uses_user_type() {
        let req = AuthRequest {
            email: "ops@test.com".to_string(),
            password: "testpass123".to_string(),
            user_type: Role::Ops,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["user_type"], "ops");
    }

    #[test]
    fn test_login_response_extra_fields_ignored() {
        let json = r#"{"access_token": "abc", "token_type": "bearer", "user_type": "client"}"#;
        let resp: LoginResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.access_token, "abc");
    }

    #[test]
    fn test_list_envelope() {
        let json = r#"{"success": true, "data": {"files": []}}"#;
        let resp: ApiResponse<FileListData> = serde_json::from_str(json).unwrap();
        assert!(resp.success);
        assert!(resp.data.unwrap().files.is_empty());
    }

    #[test]
    fn test_live_stats_envelope() {
        let json = r#"{"success": true, "data": {"total_files": 12, "active_users": 3}}"#;
        let resp: ApiResponse<LiveStats> = serde_json::from_str(json).unwrap();
        assert_eq!(
            resp.data,
            Some(LiveStats {
                total_files: 12,
                active_users: 3
            })
        );
    }

    #[test]
    fn test_download_link_conversion() {
        let json = r#"{"success": true, "data": {"download_link": "/api/secure-download/t"}}"#;
        let resp: ApiResponse<DownloadLinkData> = serde_json::from_str(json).unwrap();
        let link: DownloadLink = resp.data.unwrap().into();
        assert_eq!(link.download_url, "/api/secure-download/t");
    }

    #[test]
    fn test_upload_response() {
        let json = r#"{"success": true, "message": "File uploaded successfully", "file_id": "42"}"#;
        let resp: UploadResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.file_id.as_deref(), Some("42"));
    }
}
