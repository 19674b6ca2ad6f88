use chrono::{DateTime, Local};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{
    ApiError, Credentials, Movie, MovieApi, MovieId, Playlist, StarRating, WATCH_LATER_PLAYLIST,
};
use crate::detail::DetailController;
use crate::feed::{CardAction, DragOutcome, SwipeDirection, SwipeFeed, Triage};
use crate::session::{Session, SessionContext};
use crate::tasks::{self, AppEvent, EventReceiver, EventSender, Mutation, TaskScope};
use crate::ui::account::{AuthForm, AuthMode};

/// Which screen is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Home,
    News,
    Search,
    Playlists,
    Account,
}

impl View {
    pub const ALL: [View; 5] = [
        Self::Home,
        Self::News,
        Self::Search,
        Self::Playlists,
        Self::Account,
    ];

    pub fn next(self) -> Self {
        match self {
            Self::Home => Self::News,
            Self::News => Self::Search,
            Self::Search => Self::Playlists,
            Self::Playlists => Self::Account,
            Self::Account => Self::Home,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::Home => Self::Account,
            Self::News => Self::Home,
            Self::Search => Self::News,
            Self::Playlists => Self::Search,
            Self::Account => Self::Playlists,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::News => "News",
            Self::Search => "Search",
            Self::Playlists => "Playlists",
            Self::Account => "Account",
        }
    }
}

/// Input mode for the text fields (search query, playlist name, login form).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Width of one poster cell in the movie grids.
/// How often the session file is re-read while the UI is idle on one screen.
pub const SESSION_POLL: Duration = Duration::from_secs(1);

pub const CELL_WIDTH: u16 = 24;

pub fn grid_columns(width: u16) -> usize {
    (width.saturating_sub(2) / CELL_WIDTH).max(1) as usize
}

/// Remote list as seen by a screen. Keeps "nothing yet", "empty" and
/// "request failed" apart.
#[derive(Debug, Clone, PartialEq)]
pub enum Loadable<T> {
    Idle,
    Loading,
    Loaded {
        items: Vec<T>,
        at: DateTime<Local>,
    },
    Failed(String),
}

impl<T> Default for Loadable<T> {
    fn default() -> Self {
        Loadable::Idle
    }
}

impl<T> Loadable<T> {
    pub fn from_result(result: Result<Vec<T>, ApiError>) -> Self {
        match result {
            Ok(items) => Loadable::Loaded {
                items,
                at: Local::now(),
            },
            Err(e) => Loadable::Failed(e.user_message()),
        }
    }

    pub fn items(&self) -> &[T] {
        match self {
            Loadable::Loaded { items, .. } => items,
            _ => &[],
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Loadable::Loading)
    }

    /// An aborted request leaves nothing behind.
    fn abandon(&mut self) {
        if self.is_loading() {
            *self = Loadable::Idle;
        }
    }
}

/// Movies laid out in rows of poster cells.
#[derive(Debug, Default)]
pub struct MovieGrid {
    pub state: Loadable<Movie>,
    pub selected: usize,
}

impl MovieGrid {
    pub fn set(&mut self, result: Result<Vec<Movie>, ApiError>) {
        self.state = Loadable::from_result(result);
        self.selected = 0;
    }

    pub fn selected_movie(&self) -> Option<&Movie> {
        self.state.items().get(self.selected)
    }

    pub fn move_by(&mut self, delta: isize) {
        let len = self.state.items().len();
        if len == 0 {
            return;
        }
        let target = self.selected as isize + delta;
        self.selected = target.clamp(0, len as isize - 1) as usize;
    }
}

pub struct HomeScreen {
    pub feed: SwipeFeed,
    pub modal: DetailController,
    pub tasks: TaskScope,
    /// Feed requests issued and not answered yet.
    pub pending_batches: usize,
    pub last_error: Option<String>,
}

pub struct NewsScreen {
    pub grid: MovieGrid,
    pub modal: DetailController,
    pub tasks: TaskScope,
}

pub struct SearchScreen {
    pub query: String,
    /// Query whose results the grid shows or waits for.
    pub submitted: Option<String>,
    pub grid: MovieGrid,
    pub modal: DetailController,
    pub tasks: TaskScope,
}

pub struct PlaylistsScreen {
    pub lists: Loadable<Playlist>,
    pub selected: usize,
    /// Playlist whose contents are shown. `None` shows the list of playlists.
    pub open: Option<Playlist>,
    pub contents: MovieGrid,
    pub new_name: String,
    pub modal: DetailController,
    pub tasks: TaskScope,
}

pub struct AccountScreen {
    pub form: AuthForm,
    pub tasks: TaskScope,
}

/// Main application state.
pub struct App {
    api: Arc<dyn MovieApi>,
    session: SessionContext,
    session_rx: watch::Receiver<Option<Session>>,
    last_session_poll: Instant,
    events: EventReceiver,
    feed_batch: usize,
    /// Scope of remote writes. Never cancelled by navigation.
    background: TaskScope,

    pub user: Option<Session>,
    pub view: View,
    pub input_mode: InputMode,
    pub show_help: bool,
    pub should_quit: bool,
    pub grid_columns: usize,

    pub home: HomeScreen,
    pub news: NewsScreen,
    pub search: SearchScreen,
    pub playlists: PlaylistsScreen,
    pub account: AccountScreen,

    // Status message
    pub status_msg: String,
}

impl App {
    pub fn new(api: Arc<dyn MovieApi>, session: SessionContext, feed_batch: usize) -> Self {
        let (tx, events) = tasks::channel();
        let scope = |name: &'static str| TaskScope::new(name, EventSender::clone(&tx));
        let session_rx = session.subscribe();
        let user = session.current_user();

        Self {
            api,
            session,
            session_rx,
            last_session_poll: Instant::now(),
            feed_batch,
            background: scope("mutations"),

            user,
            view: View::Home,
            input_mode: InputMode::Normal,
            show_help: false,
            should_quit: false,
            grid_columns: 3,

            home: HomeScreen {
                feed: SwipeFeed::new(),
                modal: DetailController::new(),
                tasks: scope("home"),
                pending_batches: 0,
                last_error: None,
            },
            news: NewsScreen {
                grid: MovieGrid::default(),
                modal: DetailController::new(),
                tasks: scope("news"),
            },
            search: SearchScreen {
                query: String::new(),
                submitted: None,
                grid: MovieGrid::default(),
                modal: DetailController::new(),
                tasks: scope("search"),
            },
            playlists: PlaylistsScreen {
                lists: Loadable::Idle,
                selected: 0,
                open: None,
                contents: MovieGrid::default(),
                new_name: String::new(),
                modal: DetailController::new(),
                tasks: scope("playlists"),
            },
            account: AccountScreen {
                form: AuthForm::new(),
                tasks: scope("account"),
            },

            events,
            status_msg: String::new(),
        }
    }

    /// Enters the initial view.
    pub fn start(&mut self) {
        self.status_msg = match &self.user {
            Some(user) => format!("Signed in as {}", user.username),
            None => "Not signed in. Open Account to log in".to_string(),
        };
        self.enter(self.view);
    }

    pub fn is_signed_in(&self) -> bool {
        self.user.is_some()
    }

    /// Picks up session changes published on the watch channel.
    pub fn refresh_user(&mut self) -> bool {
        if !self.session_rx.has_changed().unwrap_or(false) {
            return false;
        }
        let user = self.session_rx.borrow_and_update().clone();
        info!(user = ?user.as_ref().map(|s| s.username.as_str()), "session changed");
        self.user = user;

        // Playlists belong to the previous user.
        self.playlists.tasks.cancel_all();
        self.playlists.lists = Loadable::Idle;
        self.playlists.open = None;
        self.playlists.contents = MovieGrid::default();
        if self.view == View::Playlists {
            self.fetch_playlists();
        }
        true
    }

    pub fn update_layout(&mut self, width: u16) {
        self.grid_columns = grid_columns(width);
    }

    // ── Navigation ──

    pub fn navigate(&mut self, view: View) {
        if view == self.view {
            return;
        }
        let from = self.view;
        self.leave(from);

        self.reload_session();
        self.refresh_user();

        debug!(from = from.label(), to = view.label(), "navigate");
        self.view = view;
        self.enter(view);
    }

    pub fn next_view(&mut self) {
        self.navigate(self.view.next());
    }

    pub fn prev_view(&mut self) {
        self.navigate(self.view.prev());
    }

    fn leave(&mut self, view: View) {
        self.input_mode = InputMode::Normal;
        match view {
            View::Home => {
                self.home.tasks.cancel_all();
                self.home.modal.close();
                self.home.pending_batches = 0;
            }
            View::News => {
                self.news.tasks.cancel_all();
                self.news.modal.close();
                self.news.grid.state.abandon();
            }
            View::Search => {
                self.search.tasks.cancel_all();
                self.search.modal.close();
                if self.search.grid.state.is_loading() {
                    self.search.submitted = None;
                }
                self.search.grid.state.abandon();
            }
            View::Playlists => {
                self.playlists.tasks.cancel_all();
                self.playlists.modal.close();
                self.playlists.lists.abandon();
                self.playlists.contents.state.abandon();
                self.playlists.new_name.clear();
            }
            View::Account => {
                self.account.tasks.cancel_all();
                self.account.form.submitting = false;
            }
        }
    }

    fn enter(&mut self, view: View) {
        match view {
            View::Home => {
                if self.home.feed.is_empty() && self.home.pending_batches == 0 {
                    self.request_batch();
                }
            }
            View::News => self.fetch_news(),
            View::Search => {}
            View::Playlists => {
                self.fetch_playlists();
                if let Some(playlist) = self.playlists.open.clone() {
                    self.fetch_contents(&playlist);
                }
            }
            View::Account => {
                if !self.is_signed_in() {
                    self.input_mode = InputMode::Editing;
                }
            }
        }
    }

    // ── Events ──

    /// Frame tick: advances animations and picks up session changes,
    /// including writes by another process once per [`SESSION_POLL`].
    pub fn tick(&mut self) {
        self.home.feed.tick();
        if self.last_session_poll.elapsed() >= SESSION_POLL {
            self.reload_session();
        }
        self.refresh_user();
    }

    fn reload_session(&mut self) {
        self.last_session_poll = Instant::now();
        match self.session.reload() {
            Ok(true) => info!("session file changed on disk"),
            Ok(false) => {}
            Err(e) => warn!("could not re-read session: {}", e),
        }
    }

    pub fn is_animating(&self) -> bool {
        self.home.feed.is_exiting()
    }

    /// Applies every event already queued. Returns how many were handled.
    pub fn drain_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.apply_event(event);
            handled += 1;
        }
        handled
    }

    /// Waits for the next event and applies it.
    pub async fn next_event(&mut self) {
        if let Some(event) = self.events.recv().await {
            self.apply_event(event);
        }
    }

    pub fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::FeedBatch(result) => {
                if self.view != View::Home {
                    return;
                }
                self.home.pending_batches = self.home.pending_batches.saturating_sub(1);
                match result {
                    Ok(batch) => {
                        let added = self.home.feed.merge_batch(batch);
                        debug!(added, queued = self.home.feed.len(), "feed batch merged");
                        self.home.last_error = None;
                        if self.home.feed.is_empty() {
                            self.status_msg = "No more movies to swipe".to_string();
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "feed request failed");
                        self.home.last_error = Some(e.user_message());
                        self.status_msg = format!("Feed: {}", e.user_message());
                    }
                }
            }
            AppEvent::News(result) => {
                if self.view != View::News {
                    return;
                }
                if let Err(e) = &result {
                    warn!(error = %e, "news request failed");
                }
                self.news.grid.set(result);
            }
            AppEvent::SearchResults { query, result } => {
                if self.view != View::Search || self.search.submitted.as_deref() != Some(&query) {
                    debug!(query = %query, "dropping stale search results");
                    return;
                }
                if let Err(e) = &result {
                    warn!(query = %query, error = %e, "search failed");
                }
                self.search.grid.set(result);
                self.status_msg = format!(
                    "{} results for \"{}\"",
                    self.search.grid.state.items().len(),
                    query
                );
            }
            AppEvent::Playlists(result) => {
                if self.view != View::Playlists {
                    return;
                }
                if let Err(e) = &result {
                    warn!(error = %e, "playlist list failed");
                }
                self.playlists.lists = Loadable::from_result(result);
                let len = self.playlists.lists.items().len();
                self.playlists.selected = self.playlists.selected.min(len.saturating_sub(1));
            }
            AppEvent::PlaylistContents { playlist, result } => {
                let showing = self.playlists.open.as_ref().map(|p| p.id);
                if self.view != View::Playlists || showing != Some(playlist) {
                    return;
                }
                if let Err(e) = &result {
                    warn!(playlist, error = %e, "playlist contents failed");
                }
                self.playlists.contents.set(result);
            }
            AppEvent::Detail {
                view,
                ticket,
                result,
            } => {
                if view != self.view {
                    return;
                }
                let Some(modal) = self.modal_mut() else {
                    return;
                };
                if let Err(e) = modal.detail_loaded(ticket, result) {
                    warn!(error = %e, "movie detail failed");
                    self.status_msg = format!("Could not load movie: {}", e.user_message());
                }
            }
            AppEvent::SelectorTargets {
                view,
                ticket,
                result,
            } => {
                if view != self.view {
                    return;
                }
                let Some(modal) = self.modal_mut() else {
                    return;
                };
                if let Err(e) = modal.targets_loaded(ticket, result) {
                    warn!(error = %e, "playlist selector failed");
                    self.status_msg = format!("Could not load playlists: {}", e.user_message());
                }
            }
            AppEvent::Mutation { mutation, result } => self.mutation_done(mutation, result),
            AppEvent::Auth(result) => match result {
                Ok(session) => {
                    self.account.form = AuthForm::new();
                    self.status_msg = format!("Signed in as {}", session.username);
                    self.refresh_user();
                    self.navigate(View::Home);
                }
                Err(e) => {
                    warn!(error = %e, "authentication failed");
                    self.account.form.set_error(e.user_message());
                }
            },
        }
    }

    // ── Mutations ──

    /// Fires a remote write. The outcome comes back as [`AppEvent::Mutation`].
    pub fn dispatch(&mut self, mutation: Mutation) {
        debug!(?mutation, "dispatch");
        let api = Arc::clone(&self.api);
        self.background.spawn(async move {
            let result = mutation.run(api.as_ref()).await;
            AppEvent::Mutation { mutation, result }
        });
    }

    fn mutation_done(&mut self, mutation: Mutation, result: Result<(), ApiError>) {
        match result {
            Ok(()) => match &mutation {
                Mutation::Rate { movie, rating } => {
                    debug!(movie, rating = rating.value(), "rating stored");
                }
                Mutation::AddToPlaylist { name, .. } => {
                    self.status_msg = format!("Added to \"{}\"", name);
                }
                Mutation::CreatePlaylist { name } => {
                    info!(name = %name, "playlist created");
                    self.status_msg = format!("Created playlist \"{}\"", name);
                    if self.view == View::Playlists {
                        self.fetch_playlists();
                    }
                }
            },
            Err(e) => {
                warn!(?mutation, error = %e, "remote write failed");
                self.status_msg = format!("{} failed: {}", mutation.describe(), e.user_message());
            }
        }
    }

    // ── Home ──

    pub fn request_batch(&mut self) {
        let api = Arc::clone(&self.api);
        let limit = self.feed_batch;
        self.home.pending_batches += 1;
        self.home
            .tasks
            .spawn(async move { AppEvent::FeedBatch(api.feed(limit).await) });
    }

    pub fn swipe(&mut self, direction: SwipeDirection) {
        if let Some(triage) = self.home.feed.swipe(direction) {
            self.triaged(triage);
        }
    }

    pub fn rate(&mut self, stars: u8) {
        let Some(rating) = StarRating::new(stars) else {
            return;
        };
        if let Some(triage) = self.home.feed.rate(rating) {
            self.triaged(triage);
        }
    }

    pub fn begin_drag(&mut self, column: u16) {
        self.home.feed.begin_drag(column);
    }

    pub fn drag_to(&mut self, column: u16) {
        self.home.feed.drag_to(column);
    }

    pub fn end_drag(&mut self) {
        match self.home.feed.end_drag() {
            DragOutcome::Swiped(triage) => self.triaged(triage),
            DragOutcome::Tap(movie) => self.open_detail(movie),
            DragOutcome::Cancelled => {}
        }
    }

    /// Opens the detail overlay for the top card unless it is leaving.
    pub fn open_top_card(&mut self) {
        if self.home.feed.is_exiting() {
            return;
        }
        if let Some(id) = self.home.feed.front().map(|m| m.id) {
            self.open_detail(id);
        }
    }

    fn triaged(&mut self, triage: Triage) {
        debug!(movie = triage.movie.id, direction = ?triage.direction, "card triaged");
        match triage.action {
            Some(CardAction::WatchLater(movie)) => self.dispatch(Mutation::AddToPlaylist {
                playlist: WATCH_LATER_PLAYLIST,
                name: "Watch later".to_string(),
                movie,
            }),
            Some(CardAction::Rate(movie, rating)) => {
                self.dispatch(Mutation::Rate { movie, rating })
            }
            None => {}
        }
        if triage.replenish {
            self.request_batch();
        }
    }

    // ── Detail overlay ──

    fn modal_parts(&mut self, view: View) -> Option<(&mut DetailController, &mut TaskScope)> {
        match view {
            View::Home => Some((&mut self.home.modal, &mut self.home.tasks)),
            View::News => Some((&mut self.news.modal, &mut self.news.tasks)),
            View::Search => Some((&mut self.search.modal, &mut self.search.tasks)),
            View::Playlists => Some((&mut self.playlists.modal, &mut self.playlists.tasks)),
            View::Account => None,
        }
    }

    /// Overlay of the active screen.
    pub fn modal(&self) -> Option<&DetailController> {
        match self.view {
            View::Home => Some(&self.home.modal),
            View::News => Some(&self.news.modal),
            View::Search => Some(&self.search.modal),
            View::Playlists => Some(&self.playlists.modal),
            View::Account => None,
        }
    }

    pub fn modal_mut(&mut self) -> Option<&mut DetailController> {
        self.modal_parts(self.view).map(|(modal, _)| modal)
    }

    pub fn modal_open(&self) -> bool {
        self.modal().is_some_and(|m| m.is_open())
    }

    pub fn open_detail(&mut self, movie: MovieId) {
        let view = self.view;
        let api = Arc::clone(&self.api);
        let Some((modal, tasks)) = self.modal_parts(view) else {
            return;
        };
        let ticket = modal.open(movie);
        let handle = tasks.spawn(async move {
            AppEvent::Detail {
                view,
                ticket,
                result: api.movie_detail(movie).await,
            }
        });
        modal.track(handle);
    }

    pub fn open_selector(&mut self) {
        let view = self.view;
        let api = Arc::clone(&self.api);
        let Some((modal, tasks)) = self.modal_parts(view) else {
            return;
        };
        let Some(ticket) = modal.open_selector() else {
            return;
        };
        let handle = tasks.spawn(async move {
            AppEvent::SelectorTargets {
                view,
                ticket,
                result: api.playlists().await,
            }
        });
        modal.track(handle);
    }

    /// Adds the shown movie to the playlist under the selector cursor.
    pub fn choose_playlist(&mut self) {
        let view = self.view;
        let Some(modal) = self.modal_mut() else {
            return;
        };
        let Some((playlist, movie)) = modal.chosen().map(|(p, d)| (p.clone(), d.id)) else {
            return;
        };

        self.dispatch(Mutation::AddToPlaylist {
            playlist: playlist.id,
            name: playlist.name.clone(),
            movie,
        });

        if view == View::Home {
            self.home.modal.close();
            if self.home.feed.front().map(|m| m.id) == Some(movie) {
                if let Some(triage) = self.home.feed.dismiss() {
                    self.triaged(triage);
                }
            }
        } else if let Some(modal) = self.modal_mut() {
            modal.added();
        }
        self.status_msg = format!("Adding to \"{}\"...", playlist.name);
    }

    /// Quick "liked" rating offered by the search overlay.
    pub fn mark_liked(&mut self) {
        if self.view != View::Search {
            return;
        }
        let Some(movie) = self.search.modal.detail().map(|d| d.id) else {
            return;
        };
        self.dispatch(Mutation::Rate {
            movie,
            rating: StarRating::LIKED,
        });
        self.status_msg = "Marked as liked".to_string();
    }

    /// Esc inside the overlay: selector back to detail, detail closed.
    pub fn modal_back(&mut self) {
        let Some(modal) = self.modal_mut() else {
            return;
        };
        if matches!(modal.state(), crate::detail::ModalState::Selecting { .. }) {
            modal.back();
        } else {
            modal.close();
        }
    }

    // ── Grids ──

    /// Grid the cursor keys move on in the active screen.
    pub fn active_grid_mut(&mut self) -> Option<&mut MovieGrid> {
        match self.view {
            View::News => Some(&mut self.news.grid),
            View::Search => Some(&mut self.search.grid),
            View::Playlists if self.playlists.open.is_some() => Some(&mut self.playlists.contents),
            _ => None,
        }
    }

    pub fn open_selected(&mut self) {
        let id = self
            .active_grid_mut()
            .and_then(|g| g.selected_movie())
            .map(|m| m.id);
        if let Some(id) = id {
            self.open_detail(id);
        }
    }

    // ── News ──

    pub fn fetch_news(&mut self) {
        let api = Arc::clone(&self.api);
        self.news.grid.state = Loadable::Loading;
        self.news
            .tasks
            .spawn(async move { AppEvent::News(api.news().await) });
    }

    // ── Search ──

    pub fn submit_search(&mut self) {
        let query = self.search.query.trim().to_string();
        if query.is_empty() {
            return;
        }
        info!(query = %query, "search");
        self.search.submitted = Some(query.clone());
        self.search.grid.state = Loadable::Loading;
        let api = Arc::clone(&self.api);
        self.search.tasks.spawn(async move {
            let result = api.search(&query).await;
            AppEvent::SearchResults { query, result }
        });
    }

    // ── Playlists ──

    pub fn fetch_playlists(&mut self) {
        let api = Arc::clone(&self.api);
        self.playlists.lists = Loadable::Loading;
        self.playlists
            .tasks
            .spawn(async move { AppEvent::Playlists(api.playlists().await) });
    }

    fn fetch_contents(&mut self, playlist: &Playlist) {
        let api = Arc::clone(&self.api);
        let id = playlist.id;
        self.playlists.contents.state = Loadable::Loading;
        self.playlists.tasks.spawn(async move {
            AppEvent::PlaylistContents {
                playlist: id,
                result: api.playlist_contents(id).await,
            }
        });
    }

    pub fn playlist_next(&mut self) {
        let len = self.playlists.lists.items().len();
        if self.playlists.selected + 1 < len {
            self.playlists.selected += 1;
        }
    }

    pub fn playlist_prev(&mut self) {
        self.playlists.selected = self.playlists.selected.saturating_sub(1);
    }

    pub fn open_playlist(&mut self) {
        let Some(playlist) = self
            .playlists
            .lists
            .items()
            .get(self.playlists.selected)
            .cloned()
        else {
            return;
        };
        self.playlists.contents = MovieGrid::default();
        self.fetch_contents(&playlist);
        self.playlists.open = Some(playlist);
    }

    /// Back from one playlist to the list of playlists.
    pub fn close_playlist(&mut self) {
        self.playlists.modal.close();
        self.playlists.open = None;
        self.playlists.contents = MovieGrid::default();
    }

    pub fn create_playlist(&mut self) {
        let name = self.playlists.new_name.trim().to_string();
        self.playlists.new_name.clear();
        if name.is_empty() {
            return;
        }
        self.dispatch(Mutation::CreatePlaylist { name });
    }

    // ── Account ──

    pub fn submit_auth(&mut self, mode: AuthMode, credentials: Credentials) {
        let api = Arc::clone(&self.api);
        let session = self.session.clone();
        self.account.form.submitting = true;
        self.account.tasks.spawn(async move {
            let result = match mode {
                AuthMode::Login => session.login(api.as_ref(), &credentials).await,
                AuthMode::Signup => session.signup(api.as_ref(), &credentials).await,
            };
            AppEvent::Auth(result)
        });
    }

    pub fn logout(&mut self) {
        match self.session.logout() {
            Ok(()) => {
                self.refresh_user();
                self.status_msg = "Signed out".to_string();
                if self.view == View::Account {
                    self.input_mode = InputMode::Editing;
                } else {
                    self.navigate(View::Account);
                }
            }
            Err(e) => {
                warn!(error = %e, "logout failed");
                self.status_msg = format!("Logout failed: {}", e.user_message());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::{FakeApi, movies, playlist};
    use crate::api::PlaylistKind;
    use crate::detail::ModalState;
    use crate::session::SessionStore;
    use tempfile::TempDir;

    struct Harness {
        app: App,
        api: Arc<FakeApi>,
        _dir: TempDir,
    }

    fn harness(api: FakeApi) -> Harness {
        let dir = TempDir::new().unwrap();
        let session = SessionContext::open(SessionStore::new(dir.path().join("session.json")));
        let api = Arc::new(api);
        let app = App::new(api.clone(), session, 10);
        Harness {
            app,
            api,
            _dir: dir,
        }
    }

    /// Applies events until none arrives for a short while.
    async fn settle(app: &mut App) -> usize {
        let mut handled = 0;
        while tokio::time::timeout(Duration::from_millis(50), app.next_event())
            .await
            .is_ok()
        {
            handled += 1;
        }
        handled
    }

    fn queue_ids(app: &App) -> Vec<MovieId> {
        app.home.feed.iter().map(|m| m.id).collect()
    }

    #[test]
    fn test_view_cycle() {
        let mut view = View::Home;
        for _ in 0..View::ALL.len() {
            assert_eq!(view.next().prev(), view);
            view = view.next();
        }
        assert_eq!(view, View::Home);
    }

    #[test]
    fn test_grid_columns_never_zero() {
        assert_eq!(grid_columns(0), 1);
        assert_eq!(grid_columns(CELL_WIDTH * 4 + 2), 4);
    }

    #[test]
    fn test_grid_moves_clamp() {
        let mut grid = MovieGrid::default();
        grid.move_by(1);
        assert_eq!(grid.selected, 0);
        grid.set(Ok(movies(&[1, 2, 3, 4, 5])));
        grid.move_by(3);
        assert_eq!(grid.selected_movie().unwrap().id, 4);
        grid.move_by(3);
        assert_eq!(grid.selected, 4);
        grid.move_by(-10);
        assert_eq!(grid.selected, 0);
    }

    #[tokio::test]
    async fn test_start_loads_feed() {
        let mut h = harness(FakeApi::with_feed(vec![movies(&[1, 2, 3])]));
        h.app.start();
        settle(&mut h.app).await;
        assert_eq!(queue_ids(&h.app), vec![1, 2, 3]);
        assert_eq!(h.app.home.pending_batches, 0);
    }

    #[tokio::test]
    async fn test_replenish_once_below_threshold() {
        let mut h = harness(FakeApi::with_feed(vec![
            movies(&[1, 2, 3, 4, 5, 6]),
            movies(&[6, 7, 8]),
        ]));
        h.app.start();
        settle(&mut h.app).await;
        assert_eq!(h.api.state.lock().unwrap().feed_calls, 1);

        // Six cards left to five: no request.
        h.app.swipe(SwipeDirection::Left);
        settle(&mut h.app).await;
        assert_eq!(h.api.state.lock().unwrap().feed_calls, 1);

        // Five to four: exactly one request.
        h.app.swipe(SwipeDirection::Left);
        settle(&mut h.app).await;
        assert_eq!(h.api.state.lock().unwrap().feed_calls, 2);
        assert_eq!(queue_ids(&h.app), vec![3, 4, 5, 6, 7, 8]);
    }

    #[tokio::test]
    async fn test_rating_never_adds_to_watch_later() {
        let mut h = harness(FakeApi::with_feed(vec![movies(&[1, 2, 3, 4, 5, 6, 7])]));
        h.app.start();
        settle(&mut h.app).await;

        h.app.rate(4);
        h.app.rate(2);
        h.app.swipe(SwipeDirection::Right);
        settle(&mut h.app).await;

        let state = h.api.state.lock().unwrap();
        assert_eq!(
            state.ratings,
            vec![
                (1, StarRating::new(4).unwrap()),
                (2, StarRating::new(2).unwrap())
            ]
        );
        assert_eq!(state.additions, vec![(WATCH_LATER_PLAYLIST, 3)]);
    }

    #[tokio::test]
    async fn test_failed_write_is_reported() {
        let mut h = harness(FakeApi::with_feed(vec![movies(&[1, 2, 3, 4, 5, 6, 7])]));
        h.api.state.lock().unwrap().fail_mutations = true;
        h.app.start();
        settle(&mut h.app).await;

        h.app.rate(2);
        settle(&mut h.app).await;
        assert!(h.app.status_msg.contains("failed"), "{}", h.app.status_msg);
        // Optimistic: the card stays gone.
        assert_eq!(h.app.home.feed.front().unwrap().id, 2);
    }

    #[tokio::test]
    async fn test_open_twice_keeps_one_result() {
        let mut h = harness(FakeApi::with_feed(vec![movies(&[1, 2, 3, 4, 5, 6])]));
        h.app.start();
        settle(&mut h.app).await;

        h.app.open_top_card();
        h.app.open_top_card();
        settle(&mut h.app).await;

        // The first fetch was aborted before it ever reached the api.
        assert_eq!(h.api.state.lock().unwrap().detail_calls, vec![1]);
        let modal = h.app.modal().unwrap();
        assert_eq!(modal.detail().unwrap().id, 1);
        assert!(matches!(modal.state(), ModalState::Detail(_)));
    }

    #[tokio::test]
    async fn test_no_detail_during_exit() {
        let mut h = harness(FakeApi::with_feed(vec![movies(&[1, 2, 3, 4, 5, 6])]));
        h.app.start();
        settle(&mut h.app).await;

        h.app.swipe(SwipeDirection::Left);
        h.app.open_top_card();
        assert!(!h.app.modal_open());
        for _ in 0..crate::feed::EXIT_FRAMES {
            h.app.tick();
        }
        h.app.open_top_card();
        assert!(h.app.modal_open());
    }

    #[tokio::test]
    async fn test_home_add_dismisses_card_without_watch_later() {
        let api = FakeApi::with_feed(vec![movies(&[1, 2, 3, 4, 5, 6])]);
        api.state.lock().unwrap().playlists = vec![
            playlist(WATCH_LATER_PLAYLIST, "Watch later", PlaylistKind::System),
            playlist(8, "Noir", PlaylistKind::Custom),
        ];
        let mut h = harness(api);
        h.app.start();
        settle(&mut h.app).await;

        h.app.open_top_card();
        settle(&mut h.app).await;
        h.app.open_selector();
        settle(&mut h.app).await;
        h.app.choose_playlist();
        settle(&mut h.app).await;

        assert!(!h.app.modal_open());
        assert_eq!(h.app.home.feed.front().unwrap().id, 2);
        assert_eq!(h.api.state.lock().unwrap().additions, vec![(8, 1)]);
        assert_eq!(h.app.status_msg, "Added to \"Noir\"");
    }

    #[tokio::test]
    async fn test_create_then_list_playlists() {
        let mut h = harness(FakeApi::with_playlists(vec![playlist(
            WATCH_LATER_PLAYLIST,
            "Watch later",
            PlaylistKind::System,
        )]));
        h.app.navigate(View::Playlists);
        settle(&mut h.app).await;
        assert_eq!(h.app.playlists.lists.items().len(), 1);

        h.app.playlists.new_name = "Weekend".to_string();
        h.app.create_playlist();
        settle(&mut h.app).await;

        let lists = h.app.playlists.lists.items();
        let weekend = lists.iter().find(|p| p.name == "Weekend").unwrap();
        assert!(!weekend.is_system());
    }

    #[tokio::test]
    async fn test_playlist_contents_and_back() {
        let api = FakeApi::with_playlists(vec![playlist(4, "Horror", PlaylistKind::Custom)]);
        api.state.lock().unwrap().contents.insert(4, movies(&[11, 12]));
        let mut h = harness(api);
        h.app.navigate(View::Playlists);
        settle(&mut h.app).await;

        h.app.open_playlist();
        settle(&mut h.app).await;
        assert_eq!(h.app.playlists.contents.state.items().len(), 2);

        h.app.open_selected();
        settle(&mut h.app).await;
        assert_eq!(h.app.modal().unwrap().detail().unwrap().id, 11);

        h.app.close_playlist();
        assert!(h.app.playlists.open.is_none());
        assert!(!h.app.modal_open());
    }

    #[tokio::test]
    async fn test_leaving_screen_drops_pending_fetch() {
        let mut h = harness(FakeApi::default());
        h.app.navigate(View::News);
        assert!(h.app.news.grid.state.is_loading());
        h.app.navigate(View::Search);
        settle(&mut h.app).await;
        assert_eq!(h.app.news.grid.state, Loadable::Idle);
    }

    #[tokio::test]
    async fn test_news_refetches_on_entry() {
        let api = FakeApi::default();
        api.state.lock().unwrap().news = movies(&[3, 4]);
        let mut h = harness(api);
        h.app.navigate(View::News);
        settle(&mut h.app).await;
        assert_eq!(h.app.news.grid.state.items().len(), 2);

        h.api.state.lock().unwrap().news = movies(&[5]);
        h.app.navigate(View::Home);
        h.app.navigate(View::News);
        settle(&mut h.app).await;
        assert_eq!(h.app.news.grid.state.items()[0].id, 5);
    }

    #[tokio::test]
    async fn test_latest_search_wins() {
        let mut h = harness(FakeApi::default());
        h.app.navigate(View::Search);
        h.app.search.query = "alien".to_string();
        h.app.submit_search();
        h.app.search.query = "heat".to_string();
        h.app.submit_search();
        settle(&mut h.app).await;

        let results = h.app.search.grid.state.items();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "heat");
    }

    #[tokio::test]
    async fn test_mark_liked_from_search() {
        let mut h = harness(FakeApi::default());
        h.app.navigate(View::Search);
        h.app.search.query = "heat".to_string();
        h.app.submit_search();
        settle(&mut h.app).await;
        h.app.open_selected();
        settle(&mut h.app).await;

        h.app.mark_liked();
        settle(&mut h.app).await;
        let id = h.app.search.grid.state.items()[0].id;
        assert_eq!(h.api.state.lock().unwrap().ratings, vec![(id, StarRating::LIKED)]);
    }

    #[tokio::test]
    async fn test_login_switches_to_home() {
        let api = FakeApi::default();
        api.state
            .lock()
            .unwrap()
            .accounts
            .insert("ana".to_string(), "pw".to_string());
        let mut h = harness(api);
        h.app.navigate(View::Account);
        assert_eq!(h.app.input_mode, InputMode::Editing);

        h.app
            .submit_auth(AuthMode::Login, Credentials::new("ana", "pw"));
        settle(&mut h.app).await;

        assert_eq!(h.app.user.as_ref().unwrap().username, "ana");
        assert_eq!(h.app.view, View::Home);

        h.app.logout();
        assert!(!h.app.is_signed_in());
        assert_eq!(h.app.view, View::Account);
    }

    #[tokio::test]
    async fn test_external_login_seen_without_navigation() {
        let mut h = harness(FakeApi::default());
        h.app.start();
        settle(&mut h.app).await;
        assert!(!h.app.is_signed_in());

        // Another process signs in through the same file.
        SessionStore::new(h._dir.path().join("session.json"))
            .save(&Session {
                username: "zoe".to_string(),
                token: "token-zoe".to_string(),
            })
            .unwrap();

        h.app.last_session_poll = Instant::now() - SESSION_POLL;
        h.app.tick();
        assert_eq!(h.app.user.as_ref().unwrap().username, "zoe");
        assert_eq!(h.app.view, View::Home);

        SessionStore::new(h._dir.path().join("session.json"))
            .clear()
            .unwrap();
        h.app.last_session_poll = Instant::now() - SESSION_POLL;
        h.app.tick();
        assert!(!h.app.is_signed_in());
    }

    #[tokio::test]
    async fn test_session_file_not_reread_every_tick() {
        let mut h = harness(FakeApi::default());
        h.app.last_session_poll = Instant::now();
        SessionStore::new(h._dir.path().join("session.json"))
            .save(&Session {
                username: "zoe".to_string(),
                token: "token-zoe".to_string(),
            })
            .unwrap();
        h.app.tick();
        assert!(!h.app.is_signed_in());
    }

    #[tokio::test]
    async fn test_bad_login_shows_message() {
        let mut h = harness(FakeApi::default());
        h.app.navigate(View::Account);
        h.app
            .submit_auth(AuthMode::Login, Credentials::new("ana", "nope"));
        settle(&mut h.app).await;

        assert_eq!(
            h.app.account.form.error(),
            Some("Incorrect username or password")
        );
        assert!(!h.app.account.form.submitting);
        assert_eq!(h.app.view, View::Account);
    }
}
