use tokio::task::AbortHandle;

use crate::api::{ApiError, MovieDetail, MovieId, Playlist, PlaylistId};

/// Identifies one fetch issued by a [`DetailController`]. Results carrying an
/// older ticket are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug, Clone, PartialEq)]
pub enum ModalState {
    Closed,
    Loading {
        movie_id: MovieId,
    },
    Detail(MovieDetail),
    Selecting {
        detail: MovieDetail,
        targets: Vec<Playlist>,
        loaded: bool,
        cursor: usize,
    },
}

/// Playlists a user may add a movie to. System lists are fed by ratings only.
pub fn selectable_playlists(all: Vec<Playlist>) -> Vec<Playlist> {
    all.into_iter().filter(|p| !p.is_system()).collect()
}

/// Detail overlay plus its playlist selector. One per screen.
#[derive(Debug)]
pub struct DetailController {
    state: ModalState,
    generation: u64,
    pending: Option<AbortHandle>,
    pub scroll: u16,
}

impl Default for DetailController {
    fn default() -> Self {
        Self::new()
    }
}

impl DetailController {
    pub fn new() -> Self {
        Self {
            state: ModalState::Closed,
            generation: 0,
            pending: None,
            scroll: 0,
        }
    }

    pub fn state(&self) -> &ModalState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, ModalState::Closed)
    }

    pub fn detail(&self) -> Option<&MovieDetail> {
        match &self.state {
            ModalState::Detail(detail) | ModalState::Selecting { detail, .. } => Some(detail),
            _ => None,
        }
    }

    fn next_ticket(&mut self) -> Ticket {
        self.generation += 1;
        Ticket(self.generation)
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.generation
    }

    fn abort_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    /// Remembers the task serving the latest ticket so that the next
    /// transition can abort it.
    pub fn track(&mut self, handle: AbortHandle) {
        self.abort_pending();
        self.pending = Some(handle);
    }

    /// Starts loading `movie_id`. Any earlier pending result becomes stale.
    pub fn open(&mut self, movie_id: MovieId) -> Ticket {
        self.abort_pending();
        self.scroll = 0;
        self.state = ModalState::Loading { movie_id };
        self.next_ticket()
    }

    /// Applies a detail fetch result. Returns `Ok(false)` for stale tickets.
    /// A failure closes the overlay and hands the error back for reporting.
    pub fn detail_loaded(
        &mut self,
        ticket: Ticket,
        result: Result<MovieDetail, ApiError>,
    ) -> Result<bool, ApiError> {
        if !self.is_current(ticket) || !matches!(self.state, ModalState::Loading { .. }) {
            return Ok(false);
        }
        match result {
            Ok(detail) => {
                self.state = ModalState::Detail(detail);
                Ok(true)
            }
            Err(e) => {
                self.state = ModalState::Closed;
                Err(e)
            }
        }
    }

    /// Switches to the playlist selector. Returns the ticket for the
    /// playlist fetch, or `None` when no detail is shown.
    pub fn open_selector(&mut self) -> Option<Ticket> {
        let ModalState::Detail(detail) = &self.state else {
            return None;
        };
        self.state = ModalState::Selecting {
            detail: detail.clone(),
            targets: Vec::new(),
            loaded: false,
            cursor: 0,
        };
        Some(self.next_ticket())
    }

    /// Applies the playlist list. On failure the selector goes back to the
    /// detail pane and the error is handed back.
    pub fn targets_loaded(
        &mut self,
        ticket: Ticket,
        result: Result<Vec<Playlist>, ApiError>,
    ) -> Result<bool, ApiError> {
        if !self.is_current(ticket) {
            return Ok(false);
        }
        let ModalState::Selecting {
            detail,
            targets,
            loaded,
            cursor,
        } = &mut self.state
        else {
            return Ok(false);
        };
        match result {
            Ok(all) => {
                *targets = selectable_playlists(all);
                *loaded = true;
                *cursor = 0;
                Ok(true)
            }
            Err(e) => {
                self.state = ModalState::Detail(detail.clone());
                Err(e)
            }
        }
    }

    /// Selector back to the detail pane.
    pub fn back(&mut self) {
        if let ModalState::Selecting { detail, .. } = &self.state {
            self.state = ModalState::Detail(detail.clone());
            self.abort_pending();
            self.next_ticket();
        }
    }

    pub fn close(&mut self) {
        self.abort_pending();
        self.state = ModalState::Closed;
        self.scroll = 0;
        self.next_ticket();
    }

    pub fn cursor_down(&mut self) {
        if let ModalState::Selecting { targets, cursor, .. } = &mut self.state {
            if *cursor + 1 < targets.len() {
                *cursor += 1;
            }
        }
    }

    pub fn cursor_up(&mut self) {
        if let ModalState::Selecting { cursor, .. } = &mut self.state {
            *cursor = cursor.saturating_sub(1);
        }
    }

    /// Playlist under the selector cursor together with the movie to add.
    pub fn chosen(&self) -> Option<(&Playlist, &MovieDetail)> {
        match &self.state {
            ModalState::Selecting {
                detail,
                targets,
                cursor,
                ..
            } => targets.get(*cursor).map(|p| (p, detail)),
            _ => None,
        }
    }

    /// Completes an add and returns to the detail pane.
    pub fn added(&mut self) -> Option<(PlaylistId, MovieId)> {
        let (playlist, detail) = self.chosen()?;
        let pair = (playlist.id, detail.id);
        self.back();
        Some(pair)
    }
}
