use std::io::{self, Stdout};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::{Frame, Terminal};

use crate::blog::{CommentCreated, CommentDeleted, CommentEdited, LikeStatus};
use crate::data::{CommentService, LikeService};
use crate::forms::{self, Debouncer, Field, Form};
use crate::toast::{ToastLevel, ToastTray};
use crate::view::{CommentEntry, CommentList, LikeState};

/// Everything app wiring hands to the Model.
pub struct Options {
    pub post_title: String,
    pub base_url: String,
    pub like_url: String,
    pub comment_url: String,
    pub comments: Vec<CommentEntry>,
    pub comment_total: i64,
    pub like: LikeState,
    pub like_service: Arc<dyn LikeService>,
    pub comment_service: Arc<dyn CommentService>,
    pub status_message: String,
    pub toast_timeout: Duration,
    pub debounce: Duration,
    pub config_path: String,
}

/// Every user-triggered mutation funnels through one of these; key
/// handling only maps keys to actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    ToggleLike,
    SubmitComment,
    RequestDelete,
    ConfirmDelete,
    CancelDelete,
    EnterEdit,
    CancelEdit,
    SaveEdit,
    DismissToasts,
}

enum AsyncResponse {
    Like {
        result: Result<LikeStatus>,
    },
    Created {
        result: Result<CommentCreated>,
    },
    Deleted {
        result: Result<CommentDeleted>,
    },
    Edited {
        comment_id: i64,
        result: Result<CommentEdited>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Comments,
    Input,
}

/// Signup form screen with live, debounced validation.
struct SignupScreen {
    form: Form,
    selected: usize,
    debouncer: Debouncer,
    dirty: Option<Field>,
}

impl SignupScreen {
    fn new(debounce: Duration) -> Self {
        Self {
            form: forms::signup_form(),
            selected: 0,
            debouncer: Debouncer::new(debounce),
            dirty: None,
        }
    }

    fn selected_field(&self) -> Field {
        self.form.fields()[self.selected].field
    }

    /// Leaving a field behaves like blur: pending validation fires now.
    fn blur(&mut self) {
        if self.debouncer.flush() {
            if let Some(field) = self.dirty.take() {
                self.form.validate_field(field);
            }
        }
    }

    fn edit_value(&mut self, apply: impl FnOnce(&mut String)) {
        let field = self.selected_field();
        let mut value = self.form.value(field).to_string();
        apply(&mut value);
        self.form.set_value(field, value);
        self.dirty = Some(field);
        self.debouncer.poke();
    }

    /// Debounce tick; validates the dirty field once the quiet interval
    /// has elapsed.
    fn tick(&mut self) -> bool {
        if self.debouncer.ready() {
            if let Some(field) = self.dirty.take() {
                self.form.validate_field(field);
                return true;
            }
        }
        false
    }
}

pub struct Model {
    post_title: String,
    base_url: String,
    like_url: String,
    comment_url: String,
    like: LikeState,
    comments: CommentList,
    input: String,
    editing: Option<i64>,
    confirm_delete: Option<i64>,
    selected: usize,
    focus: Focus,
    signup: Option<SignupScreen>,
    status_message: String,
    toasts: ToastTray,
    like_service: Arc<dyn LikeService>,
    comment_service: Arc<dyn CommentService>,
    debounce: Duration,
    config_path: String,
    needs_redraw: bool,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,
}

impl Model {
    pub fn new(options: Options) -> Self {
        let (response_tx, response_rx) = unbounded();
        Self {
            post_title: options.post_title,
            base_url: options.base_url,
            like_url: options.like_url,
            comment_url: options.comment_url,
            like: options.like,
            comments: CommentList::new(options.comments, options.comment_total),
            input: String::new(),
            editing: None,
            confirm_delete: None,
            selected: 0,
            focus: Focus::Comments,
            signup: None,
            status_message: options.status_message,
            toasts: ToastTray::new(options.toast_timeout),
            like_service: options.like_service,
            comment_service: options.comment_service,
            debounce: options.debounce,
            config_path: options.config_path,
            needs_redraw: true,
            response_tx,
            response_rx,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        let tick_rate = Duration::from_millis(120);

        loop {
            if self.poll_async() {
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        match self.handle_key(key.code) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                self.status_message = format!("Error: {}", err);
                                self.mark_dirty();
                            }
                        }
                    }
                }
            }

            if self.poll_async() {
                self.mark_dirty();
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                if self.toasts.prune() {
                    self.mark_dirty();
                }
                if let Some(signup) = self.signup.as_mut() {
                    if signup.tick() {
                        self.mark_dirty();
                    }
                }
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn poll_async(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.response_rx.try_recv() {
            self.handle_async_response(message);
            changed = true;
        }
        changed
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        if self.signup.is_some() {
            self.handle_signup_key(code);
            return Ok(false);
        }
        if self.editing.is_some() {
            self.handle_edit_key(code);
            return Ok(false);
        }
        if self.confirm_delete.is_some() {
            match code {
                KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                    self.dispatch(Action::ConfirmDelete)
                }
                _ => self.dispatch(Action::CancelDelete),
            }
            return Ok(false);
        }
        if self.focus == Focus::Input {
            match code {
                KeyCode::Enter => self.dispatch(Action::SubmitComment),
                KeyCode::Esc => {
                    self.focus = Focus::Comments;
                    self.mark_dirty();
                }
                KeyCode::Backspace => {
                    self.input.pop();
                    self.mark_dirty();
                }
                KeyCode::Char(ch) => {
                    self.input.push(ch);
                    self.mark_dirty();
                }
                _ => {}
            }
            return Ok(false);
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
            KeyCode::Char('l') | KeyCode::Char('L') => self.dispatch(Action::ToggleLike),
            KeyCode::Char('i') | KeyCode::Char('c') => {
                self.focus = Focus::Input;
                self.mark_dirty();
            }
            KeyCode::Char('e') | KeyCode::Enter => self.dispatch(Action::EnterEdit),
            KeyCode::Char('d') => self.dispatch(Action::RequestDelete),
            KeyCode::Char('x') => self.dispatch(Action::DismissToasts),
            KeyCode::Char('s') => {
                self.signup = Some(SignupScreen::new(self.debounce));
                self.status_message =
                    "Signup form. Tab/Shift-Tab between fields, Enter to submit, Esc to close."
                        .to_string();
                self.mark_dirty();
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_edit_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Enter => self.dispatch(Action::SaveEdit),
            KeyCode::Esc => self.dispatch(Action::CancelEdit),
            KeyCode::Backspace => {
                let Some(id) = self.editing else { return };
                if let Some(draft) = self.comments.edit_draft_mut(id) {
                    draft.pop();
                } else {
                    // The comment vanished under the edit (raced delete).
                    self.editing = None;
                }
                self.mark_dirty();
            }
            KeyCode::Char(ch) => {
                let Some(id) = self.editing else { return };
                if let Some(draft) = self.comments.edit_draft_mut(id) {
                    draft.push(ch);
                } else {
                    self.editing = None;
                }
                self.mark_dirty();
            }
            _ => {}
        }
    }

    fn handle_signup_key(&mut self, code: KeyCode) {
        let Some(mut signup) = self.signup.take() else {
            return;
        };
        match code {
            KeyCode::Esc => {
                self.status_message = "Signup form closed.".to_string();
                self.mark_dirty();
                return;
            }
            KeyCode::Tab | KeyCode::Down => {
                signup.blur();
                signup.selected = (signup.selected + 1) % signup.form.fields().len();
            }
            KeyCode::BackTab | KeyCode::Up => {
                signup.blur();
                let len = signup.form.fields().len();
                signup.selected = (signup.selected + len - 1) % len;
            }
            KeyCode::Backspace => signup.edit_value(|value| {
                value.pop();
            }),
            KeyCode::Char(ch) => signup.edit_value(|value| value.push(ch)),
            KeyCode::Enter => {
                signup.blur();
                match signup.form.validate_all() {
                    Some(field) => {
                        // Bring the first failing field into view.
                        signup.selected = signup
                            .form
                            .fields()
                            .iter()
                            .position(|state| state.field == field)
                            .unwrap_or(0);
                        self.toasts.push(
                            ToastLevel::Error,
                            format!("{}: fix the highlighted field.", field.label()),
                        );
                    }
                    None => {
                        self.status_message = "Account details look good.".to_string();
                        self.mark_dirty();
                        return;
                    }
                }
            }
            _ => {}
        }
        self.signup = Some(signup);
        self.mark_dirty();
    }

    fn dispatch(&mut self, action: Action) {
        match action {
            Action::ToggleLike => self.toggle_like(),
            Action::SubmitComment => self.submit_comment(),
            Action::RequestDelete => self.request_delete(),
            Action::ConfirmDelete => self.send_delete(),
            Action::CancelDelete => {
                self.confirm_delete = None;
                self.status_message = "Delete cancelled.".to_string();
            }
            Action::EnterEdit => self.enter_edit(),
            Action::CancelEdit => self.cancel_edit(),
            Action::SaveEdit => self.save_edit(),
            Action::DismissToasts => self.toasts.dismiss_all(),
        }
        self.mark_dirty();
    }

    fn selected_entry(&self) -> Option<&CommentEntry> {
        self.comments.entries().get(self.selected)
    }

    fn move_selection(&mut self, delta: i32) {
        if self.comments.is_empty() {
            return;
        }
        let len = self.comments.len() as i32;
        let next = (self.selected as i32 + delta).clamp(0, len - 1);
        self.selected = next as usize;
        self.mark_dirty();
    }

    fn clamp_selection(&mut self) {
        if self.comments.is_empty() {
            self.selected = 0;
        } else {
            self.selected = self.selected.min(self.comments.len() - 1);
        }
    }

    /// No optimistic flip: the button keeps its state until the server
    /// answers. A second press before that spawns a second request; the
    /// response that lands last wins.
    fn toggle_like(&mut self) {
        let service = self.like_service.clone();
        let url = self.like_url.clone();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = service.toggle(&url);
            let _ = tx.send(AsyncResponse::Like { result });
        });
        self.status_message = "Updating like…".to_string();
    }

    fn submit_comment(&mut self) {
        if self.input.trim().is_empty() {
            self.toasts
                .push(ToastLevel::Error, "Comment text is required.");
            return;
        }
        let service = self.comment_service.clone();
        let url = self.comment_url.clone();
        let content = self.input.clone();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = service.create(&url, content.trim());
            let _ = tx.send(AsyncResponse::Created { result });
        });
        self.status_message = "Posting comment…".to_string();
    }

    fn request_delete(&mut self) {
        let (id, author) = match self.selected_entry() {
            Some(entry) if entry.can_modify => (entry.id, entry.author.clone()),
            Some(_) => {
                self.status_message = "You can only delete your own comments.".to_string();
                return;
            }
            None => return,
        };
        self.confirm_delete = Some(id);
        self.status_message = format!("Delete comment by {}? (y/n)", author);
    }

    fn send_delete(&mut self) {
        let Some(id) = self.confirm_delete.take() else {
            return;
        };
        let Some(entry) = self.comments.get(id) else {
            return;
        };
        let url = entry
            .delete_url
            .clone()
            .unwrap_or_else(|| self.comment_action_url(id, "delete"));
        let service = self.comment_service.clone();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = service.delete(&url);
            let _ = tx.send(AsyncResponse::Deleted { result });
        });
        self.status_message = "Deleting comment…".to_string();
    }

    fn enter_edit(&mut self) {
        let Some(entry) = self.selected_entry() else {
            return;
        };
        if !entry.can_modify {
            self.status_message = "You can only edit your own comments.".to_string();
            return;
        }
        let id = entry.id;
        // Re-entering edit mode on the same comment keeps the open session.
        if self.comments.enter_edit(id) {
            self.editing = Some(id);
            self.status_message = "Editing. Enter saves, Esc cancels.".to_string();
        }
    }

    fn cancel_edit(&mut self) {
        if let Some(id) = self.editing.take() {
            self.comments.cancel_edit(id);
            self.status_message = "Edit cancelled.".to_string();
        }
    }

    fn save_edit(&mut self) {
        let Some(id) = self.editing else {
            return;
        };
        let Some(draft) = self.comments.edit_draft(id).map(str::to_string) else {
            self.editing = None;
            return;
        };
        if draft.trim().is_empty() {
            self.toasts
                .push(ToastLevel::Error, "Comment text is required.");
            return;
        }
        let url = self
            .comments
            .get(id)
            .and_then(|entry| entry.edit_url.clone())
            .unwrap_or_else(|| self.comment_action_url(id, "edit"));
        let service = self.comment_service.clone();
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let result = service.edit(&url, draft.trim());
            let _ = tx.send(AsyncResponse::Edited {
                comment_id: id,
                result,
            });
        });
        self.status_message = "Saving comment…".to_string();
    }

    fn comment_action_url(&self, id: i64, action: &str) -> String {
        format!(
            "{}/comment/{}/{}/",
            self.base_url.trim_end_matches('/'),
            id,
            action
        )
    }

    fn handle_async_response(&mut self, message: AsyncResponse) {
        match message {
            AsyncResponse::Like { result } => match result {
                Ok(status) => {
                    self.like.apply(status);
                    self.status_message = format!(
                        "{} this post · {} likes.",
                        if self.like.is_liked { "Liked" } else { "Unliked" },
                        self.like.like_count
                    );
                }
                Err(err) => {
                    self.toasts.push(ToastLevel::Error, err.to_string());
                }
            },
            AsyncResponse::Created { result } => match result {
                Ok(created) => {
                    let entry = CommentEntry::from_created(&created, &self.base_url);
                    self.comments.insert_newest(entry, created.comment_count);
                    // Only a confirmed create clears the composer.
                    self.input.clear();
                    self.selected = 0;
                    self.status_message = "Comment posted.".to_string();
                }
                Err(err) => {
                    // Input stays so the user does not lose typed text.
                    self.toasts.push(ToastLevel::Error, err.to_string());
                }
            },
            AsyncResponse::Deleted { result } => match result {
                Ok(payload) if payload.deleted => {
                    if self.comments.remove(payload.comment_id)
                        && self.editing == Some(payload.comment_id)
                    {
                        self.editing = None;
                    }
                    self.comments.set_total(payload.comment_count);
                    self.clamp_selection();
                    self.status_message = "Comment deleted.".to_string();
                }
                Ok(_) => {
                    self.toasts
                        .push(ToastLevel::Error, "Could not delete comment.");
                }
                Err(err) => {
                    self.toasts.push(ToastLevel::Error, err.to_string());
                }
            },
            AsyncResponse::Edited { comment_id, result } => match result {
                Ok(payload) => {
                    // The target may have been deleted while the save was in
                    // flight; a vanished target is not an error.
                    if !self.comments.apply_saved(comment_id, &payload.content) {
                        return;
                    }
                    if self.editing == Some(comment_id) {
                        self.editing = None;
                    }
                    self.status_message = "Comment updated.".to_string();
                }
                Err(err) => {
                    // Session stays open with the draft so the user can retry.
                    self.toasts.push(ToastLevel::Error, err.to_string());
                }
            },
        }
        self.mark_dirty();
    }

    fn draw(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Min(5),
                Constraint::Length(3),
                Constraint::Length(3),
            ])
            .split(frame.size());

        self.draw_header(frame, chunks[0]);
        if let Some(signup) = &self.signup {
            self.draw_signup(frame, chunks[1], signup);
        } else {
            self.draw_comments(frame, chunks[1]);
        }
        self.draw_input(frame, chunks[2]);
        self.draw_status(frame, chunks[3]);
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let like_line = Line::from(vec![
            Span::styled(
                format!("♥ {} ", self.like.like_count),
                Style::default().fg(Color::Red),
            ),
            Span::styled(
                format!("[{}]", self.like.label()),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  press l to toggle"),
        ]);
        let text = vec![
            Line::from(Span::styled(
                self.post_title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            like_line,
        ];
        let block = Block::default().borders(Borders::ALL).title("Post");
        frame.render_widget(Paragraph::new(text).block(block), area);
    }

    fn draw_comments(&self, frame: &mut Frame, area: Rect) {
        let width = area.width.saturating_sub(4).max(20) as usize;
        let mut lines: Vec<Line> = Vec::new();

        if self.comments.placeholder_visible() {
            lines.push(Line::from(Span::styled(
                "No comments yet.",
                Style::default().fg(Color::DarkGray),
            )));
        }

        for (index, entry) in self.comments.entries().iter().enumerate() {
            let selected = index == self.selected && self.focus == Focus::Comments;
            let marker = if selected { "▌ " } else { "  " };
            let meta_style = if selected {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let mut meta = format!("{}{} · {}", marker, entry.author, entry.created_at);
            if entry.can_modify {
                meta.push_str("  (e)dit (d)elete");
            }
            lines.push(Line::from(Span::styled(meta, meta_style)));

            if let Some(session) = &entry.edit {
                let draft = format!("  {}█", session.draft);
                lines.push(Line::from(Span::styled(
                    draft,
                    Style::default().fg(Color::Yellow),
                )));
                lines.push(Line::from(Span::styled(
                    "  editing · Enter saves, Esc cancels",
                    Style::default().fg(Color::DarkGray),
                )));
            } else {
                for wrapped in textwrap::wrap(&entry.body, width) {
                    lines.push(Line::from(format!("  {}", wrapped)));
                }
            }
        }

        let title = format!("Comments ({})", self.comments.total());
        let block = Block::default().borders(Borders::ALL).title(title);
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn draw_signup(&self, frame: &mut Frame, area: Rect, signup: &SignupScreen) {
        let mut lines: Vec<Line> = Vec::new();
        for (index, state) in signup.form.fields().iter().enumerate() {
            let selected = index == signup.selected;
            let marker = if selected { "▌ " } else { "  " };
            let masked = matches!(
                state.field,
                Field::Password | Field::ConfirmPassword | Field::LoginPassword
            );
            let shown = if masked {
                "•".repeat(state.value.chars().count())
            } else {
                state.value.clone()
            };
            let style = if selected {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            lines.push(Line::from(Span::styled(
                format!("{}{}: {}", marker, state.field.label(), shown),
                style,
            )));
            for error in &state.errors {
                lines.push(Line::from(Span::styled(
                    format!("    {}", error),
                    Style::default().fg(Color::Red),
                )));
            }
        }
        let ready = if signup.form.submittable() {
            "Enter to submit"
        } else {
            "submit disabled until every field is valid"
        };
        lines.push(Line::from(Span::styled(
            format!("  {}", ready),
            Style::default().fg(Color::DarkGray),
        )));

        let block = Block::default().borders(Borders::ALL).title("Sign up");
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn draw_input(&self, frame: &mut Frame, area: Rect) {
        let style = if self.focus == Focus::Input {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let text = if self.focus == Focus::Input {
            format!("{}█", self.input)
        } else if self.input.is_empty() {
            "press i to write a comment".to_string()
        } else {
            self.input.clone()
        };
        let block = Block::default().borders(Borders::ALL).title("New comment");
        frame.render_widget(Paragraph::new(text).style(style).block(block), area);
    }

    fn draw_status(&self, frame: &mut Frame, area: Rect) {
        let mut lines = vec![Line::from(self.status_message.clone())];
        for toast in self.toasts.iter() {
            let style = match toast.level {
                ToastLevel::Info => Style::default().fg(Color::Green),
                ToastLevel::Error => Style::default().fg(Color::Red),
            };
            lines.push(Line::from(Span::styled(toast.message.clone(), style)));
        }
        let title = format!("Status · config {}", self.config_path);
        let block = Block::default().borders(Borders::ALL).title(title);
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }
}
