mod error;
#[cfg(test)]
pub mod fake;
pub mod models;

pub use error::ApiError;
pub use models::*;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

use crate::session::Session;

/// One route of the movie API.
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    Login,
    Signup,
    News,
    Feed { limit: usize },
    MovieDetail(MovieId),
    Rate { movie: MovieId, rating: StarRating },
    Search { query: String },
    Playlists,
    PlaylistContents(PlaylistId),
    CreatePlaylist,
    AddToPlaylist { playlist: PlaylistId, movie: MovieId },
}

impl Endpoint {
    pub fn method(&self) -> Method {
        match self {
            Endpoint::News
            | Endpoint::Feed { .. }
            | Endpoint::MovieDetail(_)
            | Endpoint::Search { .. }
            | Endpoint::Playlists
            | Endpoint::PlaylistContents(_) => Method::GET,
            Endpoint::Login
            | Endpoint::Signup
            | Endpoint::Rate { .. }
            | Endpoint::CreatePlaylist
            | Endpoint::AddToPlaylist { .. } => Method::POST,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Endpoint::Login => "/auth/login".to_string(),
            Endpoint::Signup => "/auth/signup".to_string(),
            Endpoint::News => "/movies/news".to_string(),
            Endpoint::Feed { .. } => "/movies/feed".to_string(),
            Endpoint::MovieDetail(id) => format!("/movie/{}", id),
            Endpoint::Rate { movie, rating } => format!("/movies/rate/{}/{}", movie, rating.value()),
            Endpoint::Search { .. } => "/search".to_string(),
            Endpoint::Playlists => "/playlists".to_string(),
            Endpoint::PlaylistContents(id) => format!("/playlists/{}", id),
            Endpoint::CreatePlaylist => "/playlists/create".to_string(),
            Endpoint::AddToPlaylist { playlist, movie } => {
                format!("/playlists/{}/add/{}", playlist, movie)
            }
        }
    }

    pub fn query(&self) -> Vec<(&'static str, String)> {
        match self {
            Endpoint::Feed { limit } => vec![("limit", limit.to_string())],
            Endpoint::Search { query } => vec![("query", query.clone())],
            _ => Vec::new(),
        }
    }
}

/// Operations offered by the movie API.
#[async_trait]
pub trait MovieApi: Send + Sync {
    /// Returns the access token.
    async fn login(&self, credentials: &Credentials) -> Result<String, ApiError>;
    /// Returns the access token of the new account.
    async fn signup(&self, credentials: &Credentials) -> Result<String, ApiError>;
    async fn news(&self) -> Result<Vec<Movie>, ApiError>;
    async fn feed(&self, limit: usize) -> Result<Vec<Movie>, ApiError>;
    async fn movie_detail(&self, id: MovieId) -> Result<MovieDetail, ApiError>;
    async fn rate_movie(&self, id: MovieId, rating: StarRating) -> Result<(), ApiError>;
    async fn search(&self, query: &str) -> Result<Vec<Movie>, ApiError>;
    async fn playlists(&self) -> Result<Vec<Playlist>, ApiError>;
    async fn playlist_contents(&self, id: PlaylistId) -> Result<Vec<Movie>, ApiError>;
    async fn create_playlist(&self, name: &str) -> Result<(), ApiError>;
    async fn add_to_playlist(&self, playlist: PlaylistId, movie: MovieId) -> Result<(), ApiError>;
}

/// HTTP implementation of [`MovieApi`].
pub struct ApiClient {
    http: Client,
    base_url: String,
    session: watch::Receiver<Option<Session>>,
}

impl ApiClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        session: watch::Receiver<Option<Session>>,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("wechoose/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, endpoint: &Endpoint) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, endpoint.path());
        debug!(method = %endpoint.method(), %url, "api request");

        let mut req = self.http.request(endpoint.method(), url);
        let query = endpoint.query();
        if !query.is_empty() {
            req = req.query(&query);
        }
        if let Some(session) = self.session.borrow().as_ref() {
            req = req.bearer_auth(&session.token);
        }
        req
    }

    async fn read(req: RequestBuilder) -> Result<(reqwest::StatusCode, String), ApiError> {
        let res = req.send().await?;
        let status = res.status();
        let text = res.text().await?;
        Ok((status, text))
    }

    async fn fetch<T: DeserializeOwned>(&self, endpoint: Endpoint) -> Result<T, ApiError> {
        let (status, text) = Self::read(self.request(&endpoint)).await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn execute(&self, req: RequestBuilder) -> Result<(), ApiError> {
        let (status, text) = Self::read(req).await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }
        Ok(())
    }
}

/// Best-effort extraction of a readable message from an error body.
fn error_message(body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        if let Some(detail) = parsed.detail_text() {
            return detail;
        }
    }
    body.trim().chars().take(200).collect()
}

#[async_trait]
impl MovieApi for ApiClient {
    async fn login(&self, credentials: &Credentials) -> Result<String, ApiError> {
        let req = self.request(&Endpoint::Login).form(&[
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ]);
        let (status, text) = Self::read(req).await?;
        if !status.is_success() {
            debug!(status = status.as_u16(), "login refused");
            return Err(ApiError::InvalidCredentials);
        }
        let token: TokenResponse = serde_json::from_str(&text)?;
        token
            .access_token
            .ok_or_else(|| ApiError::Missing("access_token".to_string()))
    }

    async fn signup(&self, credentials: &Credentials) -> Result<String, ApiError> {
        let req = self.request(&Endpoint::Signup).json(credentials);
        let (status, text) = Self::read(req).await?;
        let detail = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|b| b.detail_text());
        if !status.is_success() {
            return Err(ApiError::SignupRejected(
                detail.unwrap_or_else(|| "Signup failed".to_string()),
            ));
        }
        let token: TokenResponse = serde_json::from_str(&text)?;
        match (token.access_token, detail) {
            (Some(token), _) => Ok(token),
            (None, Some(detail)) => Err(ApiError::SignupRejected(detail)),
            (None, None) => Err(ApiError::Missing("access_token".to_string())),
        }
    }

    async fn news(&self) -> Result<Vec<Movie>, ApiError> {
        self.fetch(Endpoint::News).await
    }

    async fn feed(&self, limit: usize) -> Result<Vec<Movie>, ApiError> {
        self.fetch(Endpoint::Feed { limit }).await
    }

    async fn movie_detail(&self, id: MovieId) -> Result<MovieDetail, ApiError> {
        // The server answers `null` when the upstream lookup fails.
        let detail: Option<MovieDetail> = self.fetch(Endpoint::MovieDetail(id)).await?;
        detail.ok_or_else(|| ApiError::Missing("movie details".to_string()))
    }

    async fn rate_movie(&self, id: MovieId, rating: StarRating) -> Result<(), ApiError> {
        self.execute(self.request(&Endpoint::Rate { movie: id, rating }))
            .await
    }

    async fn search(&self, query: &str) -> Result<Vec<Movie>, ApiError> {
        self.fetch(Endpoint::Search {
            query: query.to_string(),
        })
        .await
    }

    async fn playlists(&self) -> Result<Vec<Playlist>, ApiError> {
        self.fetch(Endpoint::Playlists).await
    }

    async fn playlist_contents(&self, id: PlaylistId) -> Result<Vec<Movie>, ApiError> {
        self.fetch(Endpoint::PlaylistContents(id)).await
    }

    async fn create_playlist(&self, name: &str) -> Result<(), ApiError> {
        let req = self
            .request(&Endpoint::CreatePlaylist)
            .json(&json!({ "name": name }));
        self.execute(req).await
    }

    async fn add_to_playlist(&self, playlist: PlaylistId, movie: MovieId) -> Result<(), ApiError> {
        self.execute(self.request(&Endpoint::AddToPlaylist { playlist, movie }))
            .await
    }
}
