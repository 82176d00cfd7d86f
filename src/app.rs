use crate::commands::{self, CommandLine};
use crate::event::{Event, EventHandler};
use crate::ui::components::{expire, CommandEvent, CommandInput, Flash, KeyResult};
use crate::ui::renderfns::{draw_footer, draw_header, extract_domain};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{
  AdminReviewsView, AdminUsersView, AuditLogView, BrowseView, DiscoverView, GameDetailView,
  HistoryView, SearchView, WishlistView,
};
use crate::ui::Context;
use checkpointer::api::CachedClient;
use checkpointer::config::Config;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;

/// Views that can sit at the bottom of the stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootView {
  Browse,
  Discover,
  Search,
  History,
  Wishlist,
  AdminUsers,
  AdminReviews,
  AuditLog,
}

/// What a submitted command line asks the app to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
  Root(RootView),
  OpenGame(i64),
  ClearCache,
  Quit,
}

impl AppCommand {
  /// Resolve a command line; the error is shown to the user as is.
  pub fn resolve(line: &CommandLine) -> std::result::Result<Self, String> {
    let name = commands::find(&line.name).map_or(line.name.as_str(), |cmd| cmd.name);
    let command = match name {
      "browse" => AppCommand::Root(RootView::Browse),
      "discover" => AppCommand::Root(RootView::Discover),
      "search" => AppCommand::Root(RootView::Search),
      "history" => AppCommand::Root(RootView::History),
      "wishlist" => AppCommand::Root(RootView::Wishlist),
      "users" => AppCommand::Root(RootView::AdminUsers),
      "reviews" => AppCommand::Root(RootView::AdminReviews),
      "audit" => AppCommand::Root(RootView::AuditLog),
      "clear-cache" => AppCommand::ClearCache,
      "quit" => AppCommand::Quit,
      "game" => {
        let arg = line.arg.as_deref().ok_or("usage: game <id>")?;
        let id = arg
          .parse::<i64>()
          .map_err(|_| format!("not a game id: {}", arg))?;
        AppCommand::OpenGame(id)
      }
      "" => return Err("empty command".to_string()),
      other => return Err(format!("unknown command: {}", other)),
    };
    Ok(command)
  }
}

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  views: Vec<Box<dyn View>>,

  command: CommandInput,

  ctx: Context,

  /// Header title: configured title or the API host
  title: String,

  /// App-level status (command errors, cache cleared)
  flash: Option<Flash>,

  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let client = CachedClient::new(&config)?;
    let title = config
      .title
      .clone()
      .unwrap_or_else(|| extract_domain(&config.api.url).to_string());

    let ctx = Context {
      client,
      config: Arc::new(config),
    };

    Ok(Self {
      views: vec![Box::new(BrowseView::new(ctx.clone()))],
      command: CommandInput::new(),
      ctx,
      title,
      flash: None,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(Duration::from_millis(250));

    tracing::info!(api = %self.ctx.config.api.url, "started");

    let result = self.main_loop(&mut terminal, &mut events).await;

    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn main_loop(
    &mut self,
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| self.draw(frame))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => self.tick(),
        None => break,
      }
    }
    Ok(())
  }

  fn tick(&mut self) {
    expire(&mut self.flash);
    if let Some(view) = self.views.last_mut() {
      view.tick();
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let capturing = self.views.last().is_some_and(|v| v.is_capturing_input());
    if !capturing {
      match self.command.handle_key(key) {
        KeyResult::Event(CommandEvent::Submitted(line)) => {
          self.execute(&line);
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    let Some(view) = self.views.last_mut() else {
      return;
    };
    match view.handle_key(key) {
      ViewAction::None => {}
      ViewAction::Push(next) => self.views.push(next),
      ViewAction::Pop => {
        if self.views.len() > 1 {
          self.views.pop();
        }
      }
    }
  }

  fn execute(&mut self, line: &CommandLine) {
    let command = match AppCommand::resolve(line) {
      Ok(command) => command,
      Err(message) => {
        tracing::warn!(command = %line.name, "{}", message);
        self.flash = Some(Flash::warn(message));
        return;
      }
    };

    tracing::debug!(?command, "executing command");
    match command {
      AppCommand::Root(root) => {
        let view = self.root_view(root);
        self.views.clear();
        self.views.push(view);
      }
      AppCommand::OpenGame(id) => {
        self
          .views
          .push(Box::new(GameDetailView::new(self.ctx.clone(), id, None)));
      }
      AppCommand::ClearCache => {
        self.ctx.client.clear();
        self.flash = Some(Flash::info("Cache cleared"));
      }
      AppCommand::Quit => self.should_quit = true,
    }
  }

  fn root_view(&self, root: RootView) -> Box<dyn View> {
    let ctx = self.ctx.clone();
    match root {
      RootView::Browse => Box::new(BrowseView::new(ctx)),
      RootView::Discover => Box::new(DiscoverView::new(ctx)),
      RootView::Search => Box::new(SearchView::new(ctx)),
      RootView::History => Box::new(HistoryView::new(ctx)),
      RootView::Wishlist => Box::new(WishlistView::new(ctx)),
      RootView::AdminUsers => Box::new(AdminUsersView::new(ctx)),
      RootView::AdminReviews => Box::new(AdminReviewsView::new(ctx)),
      RootView::AuditLog => Box::new(AuditLogView::new(ctx)),
    }
  }

  fn draw(&mut self, frame: &mut Frame) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Header
        Constraint::Min(1),    // Main content
        Constraint::Length(1), // Breadcrumb and status
      ])
      .split(frame.area());

    let breadcrumb: Vec<String> = self.views.iter().map(|v| v.breadcrumb_label()).collect();

    if let Some(view) = self.views.last_mut() {
      let context = view.context();
      draw_header(
        frame,
        chunks[0],
        &self.title,
        context.as_deref(),
        &view.shortcuts(),
      );
      view.render(frame, chunks[1]);
    }

    self.command.render_overlay(frame, chunks[1]);

    let status = self
      .flash
      .as_ref()
      .or_else(|| self.views.last().and_then(|v| v.flash()))
      .map(|f| (f.message.as_str(), f.color));
    draw_footer(frame, chunks[2], &breadcrumb, status);
  }
}
