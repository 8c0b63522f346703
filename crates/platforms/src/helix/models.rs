use serde::Deserialize;

/// A user returned by `GET /helix/users`.
#[derive(Debug, Clone, Deserialize)]
pub struct HelixUser {
    pub id: String,
    pub login: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub profile_image_url: Option<String>,
}

/// An active stream returned by `GET /helix/streams`.
///
/// Helix reports an empty `game_name` when no category is set; empty strings
/// are kept as-is and left for the caller to interpret.
#[derive(Debug, Clone, Deserialize)]
pub struct HelixStream {
    /// Broadcast id, new for every live session.
    pub id: String,
    pub user_id: String,
    pub user_login: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub game_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// RFC 3339 start time as reported by the platform.
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub viewer_count: u64,
    #[serde(rename = "type", default)]
    pub stream_type: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HelixPage<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Pagination {
    #[serde(default)]
    pub cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AppAccessToken {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: u64,
}
