mod api;
mod app;
mod config;
mod detail;
mod feed;
mod session;
mod tasks;
mod ui;

use api::{ApiClient, Credentials, Movie, MovieApi};
use app::{App, InputMode, View};
use clap::{Parser, Subcommand};
use config::{Config, Environment, Overrides, Paths};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use detail::ModalState;
use feed::SwipeDirection;
use ratatui::layout::{Position, Rect};
use session::{SessionContext, SessionStore};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tasks::Mutation;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use ui::account::{AuthFormResult, AuthMode};

/// Poll interval while a card is animating.
const FRAME_ANIMATING: Duration = Duration::from_millis(50);
const FRAME_IDLE: Duration = Duration::from_millis(250);

/// Swipe through movies and build playlists from the terminal
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// API base URL (overrides WECHOOSE_API_URL / WECHOOSE_DEV_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Environment: development or production
    #[arg(long, global = true)]
    env: Option<Environment>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive client (default)
    Run,
    /// Log in and store the session
    Login {
        username: Option<String>,
        /// Read from a prompt when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Create an account and store the session
    Signup {
        username: Option<String>,
        /// Read from a prompt when omitted
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Print the signed-in user
    Whoami,
    /// List movies now playing
    News,
    /// Search movies
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// List your playlists
    Playlists,
    /// List the movies of one playlist
    Playlist {
        #[arg(allow_negative_numbers = true)]
        id: i64,
    },
    /// Create a custom playlist
    CreatePlaylist { name: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is not an error.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let overrides = Overrides {
        environment: cli.env,
        api_url: cli.api_url,
    };
    let config = Config::from_env(&overrides)?;
    let paths = Paths::discover()?;
    let command = cli.command.unwrap_or(Commands::Run);
    let interactive = matches!(command, Commands::Run);
    init_tracing(interactive, &paths.log_file);

    let session = SessionContext::open(SessionStore::new(&paths.session_file));
    let api = Arc::new(ApiClient::new(
        &config.api_url,
        config.request_timeout,
        session.subscribe(),
    )?);
    info!(api = %api.base_url(), environment = ?config.environment, "starting");

    if interactive {
        return run_tui(api, session, &config).await;
    }

    if let Err(e) = run_command(command, api.as_ref(), &session).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing(interactive: bool, log_file: &Path) {
    if interactive {
        // The terminal belongs to the UI, so logs go to a file.
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let file = log_file
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|_| {
                std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(log_file)
            });
        if let Ok(file) = file {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .init();
        }
    } else {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }
}

async fn run_tui(
    api: Arc<dyn MovieApi>,
    session: SessionContext,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::new(api, session, config.feed_batch);

    // Init terminal
    let mut terminal = ratatui::init();
    if let Err(e) = execute!(std::io::stdout(), EnableMouseCapture) {
        ratatui::restore();
        return Err(e.into());
    }

    let size = terminal.size()?;
    app.update_layout(size.width);
    app.start();

    // Main loop
    let result = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run_app(
    terminal: &mut ratatui::DefaultTerminal,
    app: &mut App,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        app.drain_events();
        terminal.draw(|frame| ui::render(app, frame))?;

        if app.should_quit {
            info!("quit");
            return Ok(());
        }

        let timeout = if app.is_animating() {
            FRAME_ANIMATING
        } else {
            FRAME_IDLE
        };
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Press {
                        handle_key(app, key);
                    }
                }
                Event::Mouse(mouse) => {
                    let size = terminal.size()?;
                    handle_mouse(app, mouse, Rect::new(0, 0, size.width, size.height));
                }
                Event::Resize(width, _) => {
                    app.update_layout(width);
                }
                _ => {}
            }
        }
        app.tick();
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Ctrl+C always quits
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // Help toggle (global)
    if key.code == KeyCode::Char('?') && app.input_mode == InputMode::Normal {
        app.show_help = !app.show_help;
        return;
    }

    // If help is showing, any key closes it
    if app.show_help {
        app.show_help = false;
        return;
    }

    if app.input_mode == InputMode::Editing {
        handle_editing_key(app, key);
        return;
    }
    if app.modal_open() {
        handle_modal_key(app, key);
        return;
    }

    match key.code {
        KeyCode::Tab => app.next_view(),
        KeyCode::BackTab => app.prev_view(),
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('L') if app.is_signed_in() => app.logout(),
        _ => match app.view {
            View::Home => handle_home_key(app, key),
            View::News | View::Search => handle_grid_key(app, key),
            View::Playlists => handle_playlists_key(app, key),
            View::Account => handle_account_key(app, key),
        },
    }
}

fn handle_editing_key(app: &mut App, key: KeyEvent) {
    match app.view {
        View::Search => match key.code {
            KeyCode::Enter => {
                app.input_mode = InputMode::Normal;
                app.submit_search();
            }
            KeyCode::Esc => app.input_mode = InputMode::Normal,
            KeyCode::Backspace => {
                app.search.query.pop();
            }
            KeyCode::Char(c) => app.search.query.push(c),
            _ => {}
        },
        View::Playlists => match key.code {
            KeyCode::Enter => {
                app.input_mode = InputMode::Normal;
                app.create_playlist();
            }
            KeyCode::Esc => {
                app.input_mode = InputMode::Normal;
                app.playlists.new_name.clear();
            }
            KeyCode::Backspace => {
                app.playlists.new_name.pop();
            }
            KeyCode::Char(c) => app.playlists.new_name.push(c),
            _ => {}
        },
        View::Account => match app.account.form.handle_key(key) {
            Some(AuthFormResult::Submit(mode, credentials)) => app.submit_auth(mode, credentials),
            Some(AuthFormResult::Cancel) => app.input_mode = InputMode::Normal,
            None => {}
        },
        View::Home | View::News => app.input_mode = InputMode::Normal,
    }
}

fn handle_modal_key(app: &mut App, key: KeyEvent) {
    let Some(modal) = app.modal_mut() else {
        return;
    };
    let selecting = matches!(modal.state(), ModalState::Selecting { .. });

    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Backspace => app.modal_back(),
        KeyCode::Down | KeyCode::Char('j') => {
            if selecting {
                modal.cursor_down();
            } else {
                modal.scroll = modal.scroll.saturating_add(1);
            }
        }
        KeyCode::Up | KeyCode::Char('k') => {
            if selecting {
                modal.cursor_up();
            } else {
                modal.scroll = modal.scroll.saturating_sub(1);
            }
        }
        KeyCode::PageDown => modal.scroll = modal.scroll.saturating_add(10),
        KeyCode::PageUp => modal.scroll = modal.scroll.saturating_sub(10),
        KeyCode::Enter if selecting => app.choose_playlist(),
        KeyCode::Char('a') if !selecting => app.open_selector(),
        KeyCode::Char('l') if !selecting => app.mark_liked(),
        KeyCode::Char('o') => {
            let trailer = modal.detail().and_then(|d| d.trailer_url.clone());
            match trailer {
                Some(link) => {
                    let _ = std::process::Command::new("xdg-open").arg(&link).spawn();
                    app.status_msg = format!("Opening: {}", link);
                }
                None => app.status_msg = "No trailer for this movie".to_string(),
            }
        }
        _ => {}
    }
}

fn handle_home_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Left | KeyCode::Char('x') | KeyCode::Char('h') => app.swipe(SwipeDirection::Left),
        KeyCode::Right | KeyCode::Char('w') | KeyCode::Char('l') => {
            app.swipe(SwipeDirection::Right)
        }
        KeyCode::Char(c @ '1'..='5') => {
            if let Some(stars) = c.to_digit(10) {
                app.rate(stars as u8);
            }
        }
        KeyCode::Enter | KeyCode::Char(' ') => app.open_top_card(),
        KeyCode::Char('r') => {
            if app.home.feed.is_empty() && app.home.pending_batches == 0 {
                app.request_batch();
            }
        }
        _ => {}
    }
}

/// Cursor keys on the active movie grid.
fn handle_grid_key(app: &mut App, key: KeyEvent) {
    let columns = app.grid_columns as isize;
    match key.code {
        KeyCode::Char('/') if app.view == View::Search => app.input_mode = InputMode::Editing,
        KeyCode::Char('r') if app.view == View::News => app.fetch_news(),
        KeyCode::Enter => app.open_selected(),
        code => {
            let delta = match code {
                KeyCode::Down | KeyCode::Char('j') => columns,
                KeyCode::Up | KeyCode::Char('k') => -columns,
                KeyCode::Right | KeyCode::Char('l') => 1,
                KeyCode::Left | KeyCode::Char('h') => -1,
                _ => return,
            };
            if let Some(grid) = app.active_grid_mut() {
                grid.move_by(delta);
            }
        }
    }
}

fn handle_playlists_key(app: &mut App, key: KeyEvent) {
    if app.playlists.open.is_some() {
        match key.code {
            KeyCode::Esc | KeyCode::Backspace => app.close_playlist(),
            _ => handle_grid_key(app, key),
        }
        return;
    }
    match key.code {
        KeyCode::Down | KeyCode::Char('j') => app.playlist_next(),
        KeyCode::Up | KeyCode::Char('k') => app.playlist_prev(),
        KeyCode::Enter => app.open_playlist(),
        KeyCode::Char('n') => app.input_mode = InputMode::Editing,
        KeyCode::Char('r') => app.fetch_playlists(),
        _ => {}
    }
}

fn handle_account_key(app: &mut App, key: KeyEvent) {
    if app.is_signed_in() {
        return;
    }
    match key.code {
        KeyCode::Char('e') | KeyCode::Enter => app.input_mode = InputMode::Editing,
        KeyCode::Char('s') => app.account.form.toggle_mode(),
        _ => {}
    }
}

/// Mouse drag on the top card of the Home screen.
fn handle_mouse(app: &mut App, mouse: MouseEvent, screen: Rect) {
    if app.view != View::Home || app.modal_open() || app.show_help {
        return;
    }
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            let (_, body, _) = ui::layout(screen);
            if ui::card_area(body).contains(Position::new(mouse.column, mouse.row)) {
                app.begin_drag(mouse.column);
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => app.drag_to(mouse.column),
        MouseEventKind::Up(MouseButton::Left) => app.end_drag(),
        _ => {}
    }
}

// ── One-shot commands ──

async fn run_command(
    command: Commands,
    api: &dyn MovieApi,
    session: &SessionContext,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Run => {}
        Commands::Login { username, password } => {
            authenticate(AuthMode::Login, username, password, api, session).await?
        }
        Commands::Signup { username, password } => {
            authenticate(AuthMode::Signup, username, password, api, session).await?
        }
        Commands::Logout => {
            session.logout()?;
            println!("Signed out");
        }
        Commands::Whoami => match session.current_user() {
            Some(user) => println!("{}", user.username),
            None => println!("Not signed in"),
        },
        Commands::News => print_movies(&api.news().await.map_err(|e| e.user_message())?),
        Commands::Search { query } => {
            let query = query.join(" ");
            print_movies(&api.search(&query).await.map_err(|e| e.user_message())?);
        }
        Commands::Playlists => {
            let playlists = api.playlists().await.map_err(|e| e.user_message())?;
            if playlists.is_empty() {
                println!("No playlists");
            }
            for playlist in playlists {
                let kind = if playlist.is_system() { "system" } else { "custom" };
                println!("{:>6}  {} {}  ({})", playlist.id, playlist.icon(), playlist.name, kind);
            }
        }
        Commands::Playlist { id } => {
            print_movies(&api.playlist_contents(id).await.map_err(|e| e.user_message())?)
        }
        Commands::CreatePlaylist { name } => {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err("Playlist name must not be empty".into());
            }
            let mutation = Mutation::CreatePlaylist { name: name.clone() };
            if let Err(e) = mutation.run(api).await {
                warn!(error = %e, "create playlist failed");
                return Err(e.user_message().into());
            }
            println!("Created playlist \"{}\"", name);
        }
    }
    Ok(())
}

async fn authenticate(
    mode: AuthMode,
    username: Option<String>,
    password: Option<String>,
    api: &dyn MovieApi,
    session: &SessionContext,
) -> Result<(), Box<dyn std::error::Error>> {
    let username = match username {
        Some(u) => u,
        None => {
            eprint!("Username: ");
            std::io::stderr().flush()?;
            let mut line = String::new();
            std::io::stdin().read_line(&mut line)?;
            line.trim().to_string()
        }
    };
    let password = match password {
        Some(p) => p,
        None => rpassword::prompt_password("Password: ")?,
    };
    let credentials = Credentials::new(username, password);

    let result = match mode {
        AuthMode::Login => session.login(api, &credentials).await,
        AuthMode::Signup => session.signup(api, &credentials).await,
    };
    let user = result.map_err(|e| e.user_message())?;
    println!("Signed in as {}", user.username);
    Ok(())
}

fn print_movies(movies: &[Movie]) {
    if movies.is_empty() {
        println!("No movies");
        return;
    }
    for movie in movies {
        println!(
            "{:>8}  {:<44}  {}",
            movie.id,
            ui::truncate_str(&movie.title, 44),
            ui::score(movie.rating)
        );
    }
}
