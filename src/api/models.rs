use serde::{Deserialize, Serialize};

pub type MovieId = i64;
pub type PlaylistId = i64;

/// "Watch later" list, the target of a right swipe.
pub const WATCH_LATER_PLAYLIST: PlaylistId = 1;
/// Server-maintained list of movies rated 4 or 5 stars.
pub const TOP_RATED_PLAYLIST: PlaylistId = -1;
/// Server-maintained list of every rated movie.
pub const HISTORY_PLAYLIST: PlaylistId = -2;

/// Summary of a movie as returned by feed, news, search and playlist endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub poster_url: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
}

/// Full movie metadata, fetched lazily when the detail overlay opens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDetail {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub poster_url: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub trailer_url: Option<String>,
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistKind {
    Custom,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: PlaylistId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PlaylistKind,
}

impl Playlist {
    pub fn is_system(&self) -> bool {
        self.kind == PlaylistKind::System
    }

    /// Glyph shown next to the playlist name.
    pub fn icon(&self) -> &'static str {
        match self.id {
            WATCH_LATER_PLAYLIST => "◷",
            TOP_RATED_PLAYLIST => "★",
            HISTORY_PLAYLIST => "◉",
            _ => "▤",
        }
    }
}

/// A 1 to 5 star rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StarRating(u8);

impl StarRating {
    pub const DISLIKED: StarRating = StarRating(1);
    pub const LIKED: StarRating = StarRating(5);

    pub fn new(value: u8) -> Option<Self> {
        (1..=5).contains(&value).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Ratings of 3 and above count as positive.
    pub fn is_positive(self) -> bool {
        self.0 >= 3
    }
}

impl std::fmt::Display for StarRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}★", self.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.username.trim().is_empty() && !self.password.is_empty()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: Option<String>,
}

/// FastAPI error body. `detail` is a string for handled errors and a list
/// for validation failures.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn detail_text(&self) -> Option<String> {
        match self.detail.as_ref()? {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            serde_json::Value::Null => None,
            serde_json::Value::Array(items) => items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .next()
                .map(str::to_string),
            other => Some(other.to_string()),
        }
    }
}
