use std::future::Future;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::AbortHandle;
use tracing::debug;

use crate::api::{ApiError, Movie, MovieApi, MovieDetail, MovieId, Playlist, PlaylistId, StarRating};
use crate::app::View;
use crate::detail::Ticket;
use crate::session::{Session, SessionError};

/// Messages sent from background tasks to the UI loop
#[derive(Debug)]
pub enum AppEvent {
    /// A swipe feed batch arrived
    FeedBatch(Result<Vec<Movie>, ApiError>),

    News(Result<Vec<Movie>, ApiError>),

    /// Results for one submitted query
    SearchResults {
        query: String,
        result: Result<Vec<Movie>, ApiError>,
    },

    Playlists(Result<Vec<Playlist>, ApiError>),

    PlaylistContents {
        playlist: PlaylistId,
        result: Result<Vec<Movie>, ApiError>,
    },

    /// Detail fetch issued by the overlay of `view`
    Detail {
        view: View,
        ticket: Ticket,
        result: Result<MovieDetail, ApiError>,
    },

    /// Playlist list for the "add to playlist" selector of `view`
    SelectorTargets {
        view: View,
        ticket: Ticket,
        result: Result<Vec<Playlist>, ApiError>,
    },

    /// A fire-and-forget write finished
    Mutation {
        mutation: Mutation,
        result: Result<(), ApiError>,
    },

    /// Login or signup finished
    Auth(Result<Session, SessionError>),
}

/// Remote writes. They run in the application-wide scope and are never
/// cancelled by navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Rate { movie: MovieId, rating: StarRating },
    AddToPlaylist {
        playlist: PlaylistId,
        name: String,
        movie: MovieId,
    },
    CreatePlaylist { name: String },
}

impl Mutation {
    pub async fn run(&self, api: &dyn MovieApi) -> Result<(), ApiError> {
        match self {
            Mutation::Rate { movie, rating } => api.rate_movie(*movie, *rating).await,
            Mutation::AddToPlaylist { playlist, movie, .. } => {
                api.add_to_playlist(*playlist, *movie).await
            }
            Mutation::CreatePlaylist { name } => api.create_playlist(name).await,
        }
    }

    /// Short description used in status messages.
    pub fn describe(&self) -> String {
        match self {
            Mutation::Rate { rating, .. } => format!("Rating {}", rating),
            Mutation::AddToPlaylist { name, .. } => format!("Adding to \"{}\"", name),
            Mutation::CreatePlaylist { name } => format!("Creating \"{}\"", name),
        }
    }
}

pub type EventSender = UnboundedSender<AppEvent>;
pub type EventReceiver = UnboundedReceiver<AppEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Owns the tasks spawned on behalf of one screen. Each task resolves to an
/// [`AppEvent`] which is forwarded to the UI loop. Cancelling or dropping the
/// scope aborts whatever is still running, so a late response can never
/// reach a screen the user already left.
pub struct TaskScope {
    name: &'static str,
    tx: EventSender,
    handles: Vec<AbortHandle>,
}

impl TaskScope {
    pub fn new(name: &'static str, tx: EventSender) -> Self {
        Self {
            name,
            tx,
            handles: Vec::new(),
        }
    }

    pub fn spawn<F>(&mut self, work: F) -> AbortHandle
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        self.handles.retain(|h| !h.is_finished());
        let tx = self.tx.clone();
        let task = tokio::spawn(async move {
            // The receiver is gone only while shutting down.
            let _ = tx.send(work.await);
        });
        self.handles.push(task.abort_handle());
        task.abort_handle()
    }

    /// Number of tasks that have not finished yet.
    pub fn pending(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// Aborts every running task. Returns how many were still running.
    pub fn cancel_all(&mut self) -> usize {
        let mut aborted = 0;
        for handle in self.handles.drain(..) {
            if !handle.is_finished() {
                handle.abort();
                aborted += 1;
            }
        }
        if aborted > 0 {
            debug!(scope = self.name, aborted, "cancelled pending tasks");
        }
        aborted
    }
}

impl Drop for TaskScope {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
