use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use super::centered_rect;
use crate::api::Credentials;
use crate::app::{App, InputMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Signup,
}

impl AuthMode {
    pub fn toggle(self) -> Self {
        match self {
            AuthMode::Login => AuthMode::Signup,
            AuthMode::Signup => AuthMode::Login,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AuthMode::Login => "Log in",
            AuthMode::Signup => "Sign up",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Username,
    Password,
}

/// Result of form input
#[derive(Debug, Clone)]
pub enum AuthFormResult {
    /// User submitted both fields
    Submit(AuthMode, Credentials),
    /// User left the form
    Cancel,
}

/// Username/password form shown on the Account screen when signed out
pub struct AuthForm {
    pub mode: AuthMode,
    username: String,
    password: String,
    focus: Field,
    error_message: Option<String>,
    /// A request is in flight; input is ignored until it answers.
    pub submitting: bool,
}

impl Default for AuthForm {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthForm {
    pub fn new() -> Self {
        Self {
            mode: AuthMode::Login,
            username: String::new(),
            password: String::new(),
            focus: Field::Username,
            error_message: None,
            submitting: false,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn toggle_mode(&mut self) {
        self.mode = self.mode.toggle();
        self.error_message = None;
    }

    /// Handle keyboard input
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<AuthFormResult> {
        if self.submitting {
            return None;
        }
        match key.code {
            KeyCode::Enter => match self.focus {
                Field::Username => {
                    self.focus = Field::Password;
                    None
                }
                Field::Password => {
                    let credentials = Credentials::new(self.username.trim(), self.password.clone());
                    if credentials.is_complete() {
                        Some(AuthFormResult::Submit(self.mode, credentials))
                    } else {
                        self.error_message = Some("Username and password are required".to_string());
                        None
                    }
                }
            },
            KeyCode::Esc => Some(AuthFormResult::Cancel),
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.focus = match self.focus {
                    Field::Username => Field::Password,
                    Field::Password => Field::Username,
                };
                None
            }
            KeyCode::Char(c) => {
                self.error_message = None;
                self.field_mut().push(c);
                None
            }
            KeyCode::Backspace => {
                self.field_mut().pop();
                None
            }
            _ => None,
        }
    }

    fn field_mut(&mut self) -> &mut String {
        match self.focus {
            Field::Username => &mut self.username,
            Field::Password => &mut self.password,
        }
    }

    /// Set an error message
    pub fn set_error(&mut self, message: String) {
        self.error_message = Some(message);
        self.password.clear();
        self.submitting = false;
    }

    fn render(&self, frame: &mut Frame, area: Rect, editing: bool) {
        let area = centered_rect(50, 60, area);
        frame.render_widget(Clear, area);

        let border = if editing { Color::Yellow } else { Color::DarkGray };
        let block = Block::default()
            .title(format!(" {} ", self.mode.label()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(1),
            ])
            .split(inner);

        let field_style = |field: Field| {
            if editing && self.focus == field {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().fg(Color::DarkGray)
            }
        };

        let username = Paragraph::new(self.username.as_str()).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(field_style(Field::Username))
                .title(" Username "),
        );
        frame.render_widget(username, chunks[1]);

        // Password field (masked)
        let masked = "*".repeat(self.password.chars().count());
        let password = Paragraph::new(masked).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(field_style(Field::Password))
                .title(" Password "),
        );
        frame.render_widget(password, chunks[2]);

        if editing {
            let (row, len) = match self.focus {
                Field::Username => (chunks[1], self.username.chars().count()),
                Field::Password => (chunks[2], self.password.chars().count()),
            };
            frame.set_cursor_position((row.x + 1 + len as u16, row.y + 1));
        }

        let footer = if self.submitting {
            Paragraph::new("Contacting server...").style(Style::default().fg(Color::Yellow))
        } else if let Some(error) = &self.error_message {
            Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red))
        } else if editing {
            Paragraph::new("Enter: Next/Submit | Tab: Switch field | Esc: Done")
                .style(Style::default().fg(Color::DarkGray))
        } else {
            let other = self.mode.toggle().label();
            Paragraph::new(format!("e: Edit | s: {} instead", other))
                .style(Style::default().fg(Color::DarkGray))
        };
        frame.render_widget(footer.alignment(Alignment::Center), chunks[3]);
    }
}

/// Account screen: the form when signed out, the user otherwise.
pub fn render(app: &App, frame: &mut Frame, area: Rect) {
    match &app.user {
        None => app
            .account
            .form
            .render(frame, area, app.input_mode == InputMode::Editing),
        Some(user) => {
            let lines = vec![
                Line::from(""),
                Line::from(vec![
                    Span::styled(" Signed in as ", Style::default().fg(Color::DarkGray)),
                    Span::styled(
                        user.username.as_str(),
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    ),
                ]),
                Line::from(""),
                Line::from(Span::styled(
                    " Press L to log out",
                    Style::default().fg(Color::DarkGray),
                )),
            ];
            let panel = Paragraph::new(lines).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::DarkGray))
                    .title(" Account "),
            );
            frame.render_widget(panel, centered_rect(50, 40, area));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn press(form: &mut AuthForm, code: KeyCode) -> Option<AuthFormResult> {
        form.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_str(form: &mut AuthForm, text: &str) {
        for c in text.chars() {
            press(form, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_auth_form_creation() {
        let form = AuthForm::new();
        assert_eq!(form.mode, AuthMode::Login);
        assert_eq!(form.focus, Field::Username);
        assert!(form.error().is_none());
    }

    #[test]
    fn test_auth_form_fills_both_fields() {
        let mut form = AuthForm::new();
        type_str(&mut form, "ana");
        assert!(press(&mut form, KeyCode::Enter).is_none());
        type_str(&mut form, "pw!");
        press(&mut form, KeyCode::Backspace);

        match press(&mut form, KeyCode::Enter) {
            Some(AuthFormResult::Submit(AuthMode::Login, creds)) => {
                assert_eq!(creds.username, "ana");
                assert_eq!(creds.password, "pw");
            }
            other => panic!("Expected Submit result, got {:?}", other),
        }
    }

    #[test]
    fn test_auth_form_requires_both_fields() {
        let mut form = AuthForm::new();
        press(&mut form, KeyCode::Tab);
        type_str(&mut form, "secret");
        assert!(press(&mut form, KeyCode::Enter).is_none());
        assert_eq!(form.error(), Some("Username and password are required"));
    }

    #[test]
    fn test_auth_form_signup_mode() {
        let mut form = AuthForm::new();
        form.toggle_mode();
        type_str(&mut form, "bob");
        press(&mut form, KeyCode::Down);
        type_str(&mut form, "pw");
        assert!(matches!(
            press(&mut form, KeyCode::Enter),
            Some(AuthFormResult::Submit(AuthMode::Signup, _))
        ));
    }

    #[test]
    fn test_auth_form_escape() {
        let mut form = AuthForm::new();
        assert!(matches!(
            press(&mut form, KeyCode::Esc),
            Some(AuthFormResult::Cancel)
        ));
    }

    #[test]
    fn test_auth_form_ignores_input_while_submitting() {
        let mut form = AuthForm::new();
        form.submitting = true;
        type_str(&mut form, "x");
        assert!(press(&mut form, KeyCode::Esc).is_none());
        assert_eq!(form.username, "");
    }

    #[test]
    fn test_auth_form_set_error() {
        let mut form = AuthForm::new();
        form.password = "wrongpassword".to_string();
        form.submitting = true;

        form.set_error("Incorrect username or password".to_string());

        assert_eq!(form.error(), Some("Incorrect username or password"));
        assert_eq!(form.password, "");
        assert!(!form.submitting);
    }
}
