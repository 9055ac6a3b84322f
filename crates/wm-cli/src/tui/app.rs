//! TUI Application state and main event loop.

use std::io;
use std::panic;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{
        self, Event, KeyEvent, KeyEventKind, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tui_input::{Input, InputRequest};

use wm_core::{
    fetch_reply, references, Backend, ChatService, Citation, Conversation, Error, Message,
    RecentAnalysis, Workspace, WorkspaceDirectory,
};
use wm_services::demo_transcript;

use crate::config::Config;

use super::events::{key_to_action, popup_key_to_action, InputAction};
use super::scroll::ScrollState;
use super::ui;
use super::widgets::{BadgeSelection, InputHistory};

type DirectoryListing = (Vec<Workspace>, Vec<RecentAnalysis>);

/// The reply task currently in flight.
struct PendingReply {
    handle: JoinHandle<Result<Message, Error>>,
    cancel: CancellationToken,
}

/// TUI Application state
pub struct TuiApp {
    pub conversation: Conversation,
    backend: Arc<dyn Backend>,

    // Input
    pub input: Input,
    pub input_history: InputHistory,

    // Sidebar contents
    pub workspaces: Vec<Workspace>,
    pub analyses: Vec<RecentAnalysis>,

    pub status_message: Option<String>,
    pub scroll: ScrollState,

    // UI state
    pub show_sidebar: bool,
    pub show_help: bool,
    /// Index into the distinct citations of the latest cited reply
    pub citation_cursor: Option<usize>,
    pub show_citation: bool,
    pub should_quit: bool,

    pending: Option<PendingReply>,
    directory_refresh: Option<JoinHandle<Result<DirectoryListing, Error>>>,
}

impl TuiApp {
    pub fn new(
        backend: Arc<dyn Backend>,
        conversation: Conversation,
        input_history: InputHistory,
        show_sidebar: bool,
    ) -> Self {
        Self {
            conversation,
            backend,
            input: Input::default(),
            input_history,
            workspaces: Vec::new(),
            analyses: Vec::new(),
            status_message: None,
            scroll: ScrollState::default(),
            show_sidebar,
            show_help: false,
            citation_cursor: None,
            show_citation: false,
            should_quit: false,
            pending: None,
            directory_refresh: None,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn can_send(&self) -> bool {
        self.conversation.can_send()
    }

    pub fn is_refreshing_directory(&self) -> bool {
        self.directory_refresh.is_some()
    }

    /// Dispatch a key press according to which overlay is showing.
    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.show_help {
            self.show_help = false;
            return;
        }

        let action = if self.show_citation {
            popup_key_to_action(key)
        } else {
            key_to_action(key, self.conversation.is_awaiting_response())
        };

        if let Some(action) = action {
            self.handle_input_action(action);
        }
    }

    /// Handle input action
    pub fn handle_input_action(&mut self, action: InputAction) {
        match action {
            InputAction::Char(c) => {
                self.edit(InputRequest::InsertChar(c));
                self.input_history.reset();
            }
            InputAction::Backspace => self.edit(InputRequest::DeletePrevChar),
            InputAction::Delete => self.edit(InputRequest::DeleteNextChar),
            InputAction::Left => self.edit(InputRequest::GoToPrevChar),
            InputAction::Right => self.edit(InputRequest::GoToNextChar),
            InputAction::Home => self.edit(InputRequest::GoToStart),
            InputAction::End => self.edit(InputRequest::GoToEnd),
            InputAction::DeleteWord => self.edit(InputRequest::DeletePrevWord),
            InputAction::HistoryUp => {
                let draft = self.input.value().to_string();
                if let Some(entry) = self.input_history.navigate_up(&draft).map(str::to_string) {
                    self.set_input(entry);
                }
            }
            InputAction::HistoryDown => {
                if let Some(entry) = self.input_history.navigate_down().map(str::to_string) {
                    self.set_input(entry);
                }
            }
            InputAction::PageUp => self.scroll.page_up(),
            InputAction::PageDown => self.scroll.page_down(),
            InputAction::ScrollToTop => self.scroll.scroll_to_top(),
            InputAction::ScrollToBottom => self.scroll.scroll_to_bottom(),
            InputAction::NextCitation => self.next_citation(),
            InputAction::PrevCitation => self.prev_citation(),
            InputAction::OpenCitation => self.open_citation(),
            InputAction::CloseCitation => self.show_citation = false,
            InputAction::ToggleSidebar => self.show_sidebar = !self.show_sidebar,
            InputAction::Submit => self.submit(),
            InputAction::Newline => self.edit(InputRequest::InsertChar('\n')),
            InputAction::Cancel => {
                if !self.cancel_pending() {
                    self.should_quit = true;
                }
            }
            InputAction::Quit => self.should_quit = true,
        }
    }

    fn edit(&mut self, request: InputRequest) {
        self.input.handle(request);
        self.conversation.set_draft(self.input.value());
    }

    fn set_input(&mut self, value: String) {
        self.conversation.set_draft(value.as_str());
        self.input = Input::new(value);
    }

    /// Enter: run a command, send the draft, or open the selected citation.
    pub fn submit(&mut self) {
        let text = self.input.value().to_string();

        if text.trim().is_empty() {
            if self.citation_cursor.is_some() {
                self.open_citation();
            }
            return;
        }

        if let Some(cmd) = parse_tui_command(&text) {
            self.input_history.add(&text);
            self.set_input(String::new());
            self.run_command(cmd);
            return;
        }

        let Some(request) = self.conversation.begin_turn(&text) else {
            self.status_message = Some("Still waiting for the previous reply".to_string());
            return;
        };

        self.input_history.add(&text);
        self.input = Input::default();
        self.status_message = None;
        self.scroll.scroll_to_bottom();

        let backend = Arc::clone(&self.backend);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            fetch_reply(backend.as_chat(), &request, &token).await
        });
        self.pending = Some(PendingReply { handle, cancel });
    }

    fn run_command(&mut self, cmd: TuiCommand) {
        match cmd {
            TuiCommand::Help => self.show_help = true,
            TuiCommand::Quit => self.should_quit = true,
            TuiCommand::Clear => {
                if let Some(pending) = self.pending.take() {
                    pending.cancel.cancel();
                    pending.handle.abort();
                }
                self.conversation = Conversation::new();
                self.citation_cursor = None;
                self.show_citation = false;
                self.scroll = ScrollState::default();
                self.status_message = Some("Cleared".to_string());
            }
            TuiCommand::Workspaces => {
                self.refresh_directory();
                self.show_sidebar = true;
                self.status_message = Some("Refreshing workspaces".to_string());
            }
        }
    }

    /// Cancel the in-flight reply. Returns false when nothing was pending.
    pub fn cancel_pending(&mut self) -> bool {
        match &self.pending {
            Some(pending) => {
                debug!("Cancelling outstanding reply");
                pending.cancel.cancel();
                self.status_message = Some("Cancelling...".to_string());
                true
            }
            None => false,
        }
    }

    /// Settle background tasks that have finished.
    pub async fn poll_background(&mut self) {
        if self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.handle.is_finished())
        {
            self.settle_pending().await;
        }
        if self
            .directory_refresh
            .as_ref()
            .is_some_and(JoinHandle::is_finished)
        {
            self.settle_directory().await;
        }
    }

    /// Wait for the in-flight reply and fold it into the conversation.
    pub async fn settle_pending(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        let result = match pending.handle.await {
            Ok(result) => result,
            Err(e) => Err(Error::unknown(format!("Reply task failed: {}", e))),
        };

        match self.conversation.finish_turn(result) {
            Ok(()) => {
                self.status_message = None;
                self.citation_cursor = None;
                self.show_citation = false;
                self.scroll.scroll_to_bottom();
            }
            Err(e) if e.is_cancelled() => {
                self.status_message = Some("Cancelled".to_string());
            }
            Err(e) => {
                self.status_message = Some(format!("Error: {}", e));
            }
        }
    }

    /// Reload workspaces and recent analyses in the background.
    pub fn refresh_directory(&mut self) {
        if let Some(previous) = self.directory_refresh.take() {
            previous.abort();
        }

        let backend = Arc::clone(&self.backend);
        self.directory_refresh = Some(tokio::spawn(async move {
            let workspaces = backend.list_workspaces().await?;
            let analyses = backend.recent_analyses().await?;
            Ok::<_, Error>((workspaces, analyses))
        }));
    }

    pub async fn settle_directory(&mut self) {
        let Some(handle) = self.directory_refresh.take() else {
            return;
        };

        match handle.await {
            Ok(Ok((workspaces, analyses))) => {
                info!(workspaces = workspaces.len(), "Workspace directory loaded");
                self.workspaces = workspaces;
                self.analyses = analyses;
                if self.status_message.as_deref() == Some("Refreshing workspaces") {
                    self.status_message = None;
                }
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to load workspaces");
                self.status_message = Some(format!("Error: {}", e));
            }
            Err(e) if e.is_cancelled() => {}
            Err(e) => {
                warn!(error = %e, "Workspace refresh task failed");
            }
        }
    }

    /// Latest assistant message that references at least one citation.
    fn cited_message(&self) -> Option<(usize, &Message)> {
        self.conversation
            .messages()
            .iter()
            .enumerate()
            .rev()
            .find(|(_, m)| m.is_assistant() && !references(&m.content, &m.citations).is_empty())
    }

    /// Distinct citations of the latest cited reply, in order of first reference.
    fn citation_targets(&self) -> Vec<&Citation> {
        let Some((_, message)) = self.cited_message() else {
            return Vec::new();
        };

        let mut targets: Vec<&Citation> = Vec::new();
        for citation in references(&message.content, &message.citations) {
            if !targets.iter().any(|c| c.number == citation.number) {
                targets.push(citation);
            }
        }
        targets
    }

    pub fn selected_citation(&self) -> Option<&Citation> {
        let index = self.citation_cursor?;
        self.citation_targets().get(index).copied()
    }

    /// Badge to highlight in the message list.
    pub fn badge_selection(&self) -> Option<BadgeSelection> {
        let (message, _) = self.cited_message()?;
        let citation = self.selected_citation()?;
        Some(BadgeSelection {
            message,
            number: citation.number,
        })
    }

    /// Selected citation as (1-based position, total).
    pub fn citation_position(&self) -> Option<(usize, usize)> {
        let index = self.citation_cursor?;
        Some((index + 1, self.citation_targets().len()))
    }

    fn next_citation(&mut self) {
        let total = self.citation_targets().len();
        if total == 0 {
            self.citation_cursor = None;
            return;
        }
        self.citation_cursor = Some(match self.citation_cursor {
            Some(index) => (index + 1) % total,
            None => 0,
        });
    }

    fn prev_citation(&mut self) {
        let total = self.citation_targets().len();
        if total == 0 {
            self.citation_cursor = None;
            return;
        }
        self.citation_cursor = Some(match self.citation_cursor {
            Some(index) => (index + total - 1) % total,
            None => total - 1,
        });
    }

    fn open_citation(&mut self) {
        if self.citation_cursor.is_none() {
            self.next_citation();
        }
        self.show_citation = self.selected_citation().is_some();
    }

    /// Stop background work before leaving the loop.
    fn shutdown(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.cancel.cancel();
            pending.handle.abort();
        }
        if let Some(refresh) = self.directory_refresh.take() {
            refresh.abort();
        }
    }
}

/// Set up panic hook to restore terminal on panic
fn setup_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        // Restore terminal
        let _ = execute!(io::stdout(), PopKeyboardEnhancementFlags);
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, crossterm::cursor::Show);
        original_hook(panic_info);
    }));
}

/// Run the TUI chat interface
pub async fn run_tui(config: &Config, backend: Arc<dyn Backend>) -> Result<()> {
    setup_panic_hook();

    let history_path: Option<PathBuf> = if config.history {
        Config::history_path().ok()
    } else {
        None
    };
    let input_history = history_path
        .as_deref()
        .map(InputHistory::load)
        .unwrap_or_default();

    let conversation = if config.seed_demo {
        Conversation::with_messages(demo_transcript())
    } else {
        Conversation::new()
    };

    let mut app = TuiApp::new(backend, conversation, input_history, config.show_sidebar);
    app.refresh_directory();

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, crossterm::cursor::Hide)?;
    // Without it most terminals send Shift+Enter as a plain Enter
    let keyboard_enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
    if keyboard_enhanced {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
        )?;
    }
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    info!(backend = app.backend_name(), "TUI started");

    let tick_rate = Duration::from_millis(33);

    loop {
        terminal.draw(|f| ui::render(&mut app, f))?;

        app.poll_background().await;

        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key);
                }
            }
        }

        if app.should_quit {
            break;
        }
    }

    app.shutdown();

    if let Some(path) = history_path {
        if let Err(e) = app.input_history.save(&path) {
            warn!(error = %e, path = %path.display(), "Failed to save input history");
        }
    }

    // Restore terminal
    if keyboard_enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        crossterm::cursor::Show
    )?;
    terminal.show_cursor()?;

    Ok(())
}

/// TUI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TuiCommand {
    Help,
    Quit,
    Clear,
    Workspaces,
}

/// Parse TUI commands
fn parse_tui_command(input: &str) -> Option<TuiCommand> {
    match input.trim() {
        "/help" | "/?" => Some(TuiCommand::Help),
        "/quit" | "/exit" | "/q" => Some(TuiCommand::Quit),
        "/clear" | "/c" => Some(TuiCommand::Clear),
        "/workspaces" | "/w" => Some(TuiCommand::Workspaces),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wm_core::testing::{MockChatService, StalledChatService};
    use wm_core::Role;

    fn app_with(backend: Arc<dyn Backend>, conversation: Conversation) -> TuiApp {
        TuiApp::new(backend, conversation, InputHistory::new(), true)
    }

    fn type_text(app: &mut TuiApp, text: &str) {
        for c in text.chars() {
            app.handle_input_action(InputAction::Char(c));
        }
    }

    #[tokio::test]
    async fn test_submit_appends_reply() {
        let mock = Arc::new(MockChatService::new());
        mock.queue_reply("Hi there");
        let mut app = app_with(mock.clone(), Conversation::new());

        type_text(&mut app, "hello");
        assert!(app.can_send());
        app.handle_input_action(InputAction::Submit);

        assert!(app.conversation.is_awaiting_response());
        assert!(!app.can_send());
        assert!(app.input.value().is_empty());

        app.settle_pending().await;

        let messages = app.conversation.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "hello");
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "Hi there");
        assert!(!app.conversation.is_awaiting_response());
        assert_eq!(mock.last_request().as_deref(), Some("hello"));
        assert_eq!(app.input_history.len(), 1);
    }

    #[tokio::test]
    async fn test_failure_shows_in_status_only() {
        let mock = Arc::new(MockChatService::new());
        mock.queue_error(Error::network("connection refused"));
        let mut app = app_with(mock, Conversation::new());

        type_text(&mut app, "question");
        app.handle_input_action(InputAction::Submit);
        app.settle_pending().await;

        assert_eq!(app.conversation.len(), 1);
        assert!(!app.conversation.is_awaiting_response());
        let status = app.status_message.as_deref().unwrap();
        assert!(status.starts_with("Error:"));
        assert!(status.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_cancel_outstanding_reply() {
        let mut app = app_with(Arc::new(StalledChatService), Conversation::new());

        type_text(&mut app, "slow question");
        app.handle_input_action(InputAction::Submit);
        app.handle_input_action(InputAction::Cancel);
        assert!(!app.should_quit);

        app.settle_pending().await;

        assert_eq!(app.status_message.as_deref(), Some("Cancelled"));
        assert!(!app.conversation.is_awaiting_response());
        assert_eq!(app.conversation.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_when_idle_quits() {
        let mut app = app_with(Arc::new(MockChatService::new()), Conversation::new());
        app.handle_input_action(InputAction::Cancel);
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_blank_submission_ignored() {
        let mock = Arc::new(MockChatService::new());
        let mut app = app_with(mock.clone(), Conversation::new());

        type_text(&mut app, "   ");
        app.handle_input_action(InputAction::Submit);

        assert_eq!(app.conversation.len(), 0);
        assert!(!app.conversation.is_awaiting_response());
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test]
    async fn test_second_submission_refused_while_awaiting() {
        let mut app = app_with(Arc::new(StalledChatService), Conversation::new());

        type_text(&mut app, "first");
        app.handle_input_action(InputAction::Submit);
        type_text(&mut app, "second");
        app.handle_input_action(InputAction::Submit);

        assert_eq!(app.conversation.len(), 1);
        assert_eq!(app.input.value(), "second");
        assert!(app.status_message.is_some());

        app.shutdown();
    }

    #[tokio::test]
    async fn test_citation_cycling_and_popup() {
        let conversation = Conversation::with_messages(demo_transcript());
        let mut app = app_with(Arc::new(MockChatService::new()), conversation);

        app.handle_input_action(InputAction::NextCitation);
        assert_eq!(app.citation_position(), Some((1, 3)));
        assert_eq!(app.selected_citation().unwrap().number, 1);

        app.handle_input_action(InputAction::PrevCitation);
        assert_eq!(app.citation_position(), Some((3, 3)));
        app.handle_input_action(InputAction::NextCitation);
        assert_eq!(app.citation_position(), Some((1, 3)));

        let selection = app.badge_selection().unwrap();
        assert_eq!(selection.message, 1);
        assert_eq!(selection.number, 1);

        // Enter on an empty composer opens the selected citation.
        app.handle_input_action(InputAction::Submit);
        assert!(app.show_citation);
        assert_eq!(app.conversation.len(), 2);

        app.handle_input_action(InputAction::CloseCitation);
        assert!(!app.show_citation);
    }

    #[tokio::test]
    async fn test_no_citations_to_cycle() {
        let conversation = Conversation::with_messages(vec![Message::assistant("plain [1]")]);
        let mut app = app_with(Arc::new(MockChatService::new()), conversation);

        app.handle_input_action(InputAction::NextCitation);
        assert_eq!(app.citation_cursor, None);
        app.handle_input_action(InputAction::OpenCitation);
        assert!(!app.show_citation);
    }

    #[tokio::test]
    async fn test_clear_command_resets_conversation() {
        let conversation = Conversation::with_messages(demo_transcript());
        let mut app = app_with(Arc::new(MockChatService::new()), conversation);
        app.handle_input_action(InputAction::NextCitation);

        type_text(&mut app, "/clear");
        app.handle_input_action(InputAction::Submit);

        assert!(app.conversation.is_empty());
        assert_eq!(app.citation_cursor, None);
        assert_eq!(app.status_message.as_deref(), Some("Cleared"));
        assert!(app.input.value().is_empty());
    }

    #[tokio::test]
    async fn test_directory_refresh() {
        let mock = MockChatService::new().with_workspaces(vec![
            Workspace::new("1", "Product Requirements", 24),
            Workspace::new("2", "Engineering Docs", 156),
        ]);
        let mut app = app_with(Arc::new(mock), Conversation::new());

        app.refresh_directory();
        assert!(app.is_refreshing_directory());
        app.settle_directory().await;

        assert!(!app.is_refreshing_directory());
        assert_eq!(app.workspaces.len(), 2);
        assert_eq!(app.workspaces[1].page_count, 156);
    }

    #[tokio::test]
    async fn test_newline_builds_multiline_message() {
        let mock = Arc::new(MockChatService::new());
        mock.queue_reply("Noted");
        let mut app = app_with(mock.clone(), Conversation::new());

        type_text(&mut app, "first line");
        app.handle_input_action(InputAction::Newline);
        type_text(&mut app, "second line");
        assert_eq!(app.conversation.draft(), "first line\nsecond line");

        app.handle_input_action(InputAction::Submit);
        app.settle_pending().await;

        assert_eq!(app.conversation.messages()[0].content, "first line\nsecond line");
        assert_eq!(mock.last_request().as_deref(), Some("first line\nsecond line"));
    }

    #[tokio::test]
    async fn test_history_navigation_restores_draft() {
        let mut app = app_with(Arc::new(MockChatService::new()), Conversation::new());
        app.input_history.add("earlier question");

        type_text(&mut app, "draft");
        app.handle_input_action(InputAction::HistoryUp);
        assert_eq!(app.input.value(), "earlier question");
        assert_eq!(app.conversation.draft(), "earlier question");

        app.handle_input_action(InputAction::HistoryDown);
        assert_eq!(app.input.value(), "draft");
    }

    #[test]
    fn test_parse_tui_command() {
        assert_eq!(parse_tui_command("/help"), Some(TuiCommand::Help));
        assert_eq!(parse_tui_command(" /q "), Some(TuiCommand::Quit));
        assert_eq!(parse_tui_command("/c"), Some(TuiCommand::Clear));
        assert_eq!(parse_tui_command("/workspaces"), Some(TuiCommand::Workspaces));
        assert_eq!(parse_tui_command("/unknown"), None);
        assert_eq!(parse_tui_command("hello"), None);
    }
}
