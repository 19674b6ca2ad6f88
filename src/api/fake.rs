//! In-memory [`MovieApi`] used by tests.

use super::*;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

pub fn movie(id: MovieId) -> Movie {
    Movie {
        id,
        title: format!("Movie {}", id),
        poster_url: format!("https://img.example/{}.jpg", id),
        rating: 7.0,
        overview: None,
    }
}

pub fn movies(ids: &[MovieId]) -> Vec<Movie> {
    ids.iter().copied().map(movie).collect()
}

pub fn detail(id: MovieId) -> MovieDetail {
    MovieDetail {
        id,
        title: format!("Movie {}", id),
        poster_url: String::new(),
        rating: 7.0,
        overview: Some("A film.".to_string()),
        trailer_url: None,
        cast: Vec::new(),
        release_date: Some("1999".to_string()),
    }
}

pub fn playlist(id: PlaylistId, name: &str, kind: PlaylistKind) -> Playlist {
    Playlist {
        id,
        name: name.to_string(),
        kind,
    }
}

#[derive(Default)]
pub struct FakeState {
    pub feed_batches: VecDeque<Vec<Movie>>,
    pub feed_calls: usize,
    pub news: Vec<Movie>,
    pub search_queries: Vec<String>,
    pub detail_calls: Vec<MovieId>,
    pub playlists: Vec<Playlist>,
    pub contents: HashMap<PlaylistId, Vec<Movie>>,
    pub ratings: Vec<(MovieId, StarRating)>,
    pub additions: Vec<(PlaylistId, MovieId)>,
    pub accounts: HashMap<String, String>,
    pub fail_mutations: bool,
}

#[derive(Default)]
pub struct FakeApi {
    pub state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn with_feed(batches: Vec<Vec<Movie>>) -> Self {
        let api = Self::default();
        api.state.lock().unwrap().feed_batches = batches.into();
        api
    }

    pub fn with_playlists(playlists: Vec<Playlist>) -> Self {
        let api = Self::default();
        api.state.lock().unwrap().playlists = playlists;
        api
    }

    fn mutation(&self) -> Result<(), ApiError> {
        if self.state.lock().unwrap().fail_mutations {
            Err(ApiError::Status {
                status: 500,
                message: "boom".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl MovieApi for FakeApi {
    async fn login(&self, credentials: &Credentials) -> Result<String, ApiError> {
        let state = self.state.lock().unwrap();
        match state.accounts.get(&credentials.username) {
            Some(pw) if *pw == credentials.password => Ok(format!("token-{}", credentials.username)),
            _ => Err(ApiError::InvalidCredentials),
        }
    }

    async fn signup(&self, credentials: &Credentials) -> Result<String, ApiError> {
        let mut state = self.state.lock().unwrap();
        if state.accounts.contains_key(&credentials.username) {
            return Err(ApiError::SignupRejected("Username already taken".to_string()));
        }
        state
            .accounts
            .insert(credentials.username.clone(), credentials.password.clone());
        Ok(format!("token-{}", credentials.username))
    }

    async fn news(&self) -> Result<Vec<Movie>, ApiError> {
        Ok(self.state.lock().unwrap().news.clone())
    }

    async fn feed(&self, limit: usize) -> Result<Vec<Movie>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.feed_calls += 1;
        let mut batch = state.feed_batches.pop_front().unwrap_or_default();
        batch.truncate(limit);
        Ok(batch)
    }

    async fn movie_detail(&self, id: MovieId) -> Result<MovieDetail, ApiError> {
        self.state.lock().unwrap().detail_calls.push(id);
        Ok(detail(id))
    }

    async fn rate_movie(&self, id: MovieId, rating: StarRating) -> Result<(), ApiError> {
        self.state.lock().unwrap().ratings.push((id, rating));
        self.mutation()
    }

    async fn search(&self, query: &str) -> Result<Vec<Movie>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.search_queries.push(query.to_string());
        Ok(vec![Movie {
            title: query.to_string(),
            ..movie(900 + state.search_queries.len() as MovieId)
        }])
    }

    async fn playlists(&self) -> Result<Vec<Playlist>, ApiError> {
        Ok(self.state.lock().unwrap().playlists.clone())
    }

    async fn playlist_contents(&self, id: PlaylistId) -> Result<Vec<Movie>, ApiError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .contents
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_playlist(&self, name: &str) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        let next_id = state.playlists.iter().map(|p| p.id).max().unwrap_or(1).max(1) + 1;
        state
            .playlists
            .push(playlist(next_id, name, PlaylistKind::Custom));
        Ok(())
    }

    async fn add_to_playlist(&self, playlist: PlaylistId, movie: MovieId) -> Result<(), ApiError> {
        self.state.lock().unwrap().additions.push((playlist, movie));
        self.mutation()
    }
}
