use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::Duration;

use ansi_to_tui::IntoText;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture, EventStream};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::text::Text;
use ratatui::widgets::Paragraph;
use ratatui::Terminal as RatatuiTerminal;
use tokio::sync::mpsc;
use tracing::debug;

use atc_git::{has_existing_conversation, ProcessCommandRunner};
use atc_mux::{
    session_exists, socket_name, MuxPolicy, MuxRunner, ProcessMuxRunner, Terminal, TerminalEvent,
};
use atc_session::{run_setup_commands, Service};

use crate::input;
use crate::message::{AppMessage, Command};
use crate::model::Model;
use crate::view;

pub type SessionService = Service<ProcessCommandRunner>;

const SPINNER_TICK: Duration = Duration::from_millis(100);

/// Raw-mode terminal shell. Restores the screen on drop so panics don't
/// leave the user's terminal broken.
pub struct Ui {
    terminal: RatatuiTerminal<CrosstermBackend<Stdout>>,
}

impl Ui {
    pub fn init() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen)?;
        stdout.execute(EnableMouseCapture)?;
        let terminal = RatatuiTerminal::new(CrosstermBackend::new(stdout))?;
        Ok(Self { terminal })
    }

    fn draw(&mut self, model: &Model) -> io::Result<()> {
        let frame_text = view::compose_frame(model);
        let text = frame_text
            .into_text()
            .unwrap_or_else(|_| Text::raw(atc_ansi::strip_ansi(&frame_text)));
        self.terminal.draw(|frame| {
            frame.render_widget(Paragraph::new(text), frame.area());
        })?;
        Ok(())
    }
}

impl Drop for Ui {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = io::stdout().execute(DisableMouseCapture);
        let _ = io::stdout().execute(LeaveAlternateScreen);
    }
}

/// Runs the event loop until the user quits. All state mutation happens in
/// the reducer, one message at a time; commands run as detached tasks that
/// report back through the message inbox.
pub async fn run(
    service: SessionService,
    repo_name: String,
    invoking_branch: String,
) -> io::Result<()> {
    let service = Arc::new(service);
    let (messages_tx, mut messages_rx) = mpsc::unbounded_channel::<AppMessage>();
    let (terminal_tx, mut terminal_rx) = mpsc::unbounded_channel::<TerminalEvent>();

    let dispatcher = Dispatcher {
        socket: socket_name(service.repo_path()),
        service,
        runner: Arc::new(ProcessMuxRunner::default()),
        policy: MuxPolicy::default(),
        messages: messages_tx,
        terminal_events: terminal_tx,
    };

    let mut model = Model::new(repo_name, invoking_branch);
    let (width, height) = crossterm::terminal::size()?;
    model.set_window_size(width, height);

    let mut ui = Ui::init()?;
    for command in model.init() {
        dispatcher.dispatch(command);
    }

    let mut events = EventStream::new();
    let mut spinner = tokio::time::interval(SPINNER_TICK);
    spinner.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ui.draw(&model)?;

        let commands = tokio::select! {
            maybe_event = events.next() => match maybe_event {
                Some(Ok(event)) => input::handle_event(&mut model, event),
                Some(Err(error)) => return Err(error),
                None => break,
            },
            Some(message) = messages_rx.recv() => model.update(message),
            Some(event) = terminal_rx.recv() => model.update(AppMessage::Terminal(event)),
            _ = spinner.tick() => model.update(AppMessage::Tick),
        };

        for command in commands {
            dispatcher.dispatch(command);
        }

        if model.should_quit {
            // Polling stops; the tmux sessions keep running for next time.
            model.detach_all_terminals();
            break;
        }
    }

    Ok(())
}

/// Executes reducer commands as detached tasks. Results come back as
/// messages; nothing here touches the model.
struct Dispatcher {
    service: Arc<SessionService>,
    runner: Arc<dyn MuxRunner>,
    socket: String,
    policy: MuxPolicy,
    messages: mpsc::UnboundedSender<AppMessage>,
    terminal_events: mpsc::UnboundedSender<TerminalEvent>,
}

impl Dispatcher {
    fn dispatch(&self, command: Command) {
        debug!(?command, "dispatching");
        match command {
            Command::LoadSessions => {
                let service = self.service.clone();
                self.reply_blocking(move || match service.list("") {
                    Ok(sessions) => AppMessage::SessionsLoaded(sessions),
                    Err(error) => AppMessage::Error(error.to_string()),
                });
            }
            Command::LoadBranches => {
                let service = self.service.clone();
                self.reply_blocking(move || {
                    let branches = match service.list_branches() {
                        Ok(branches) => branches,
                        Err(error) => return AppMessage::Error(error.to_string()),
                    };
                    let with_sessions = branches
                        .iter()
                        .filter(|branch| {
                            matches!(service.get_by_branch(branch), Ok(Some(_)))
                        })
                        .cloned()
                        .collect();
                    AppMessage::BranchesLoaded {
                        branches,
                        with_sessions,
                    }
                });
            }
            Command::CreateSession {
                name,
                base_branch,
                use_existing,
            } => {
                let service = self.service.clone();
                self.reply_blocking(move || {
                    match service.create(&name, &base_branch, use_existing) {
                        Ok((session, setup_commands)) => AppMessage::SessionCreated {
                            session,
                            setup_commands,
                        },
                        Err(error) => AppMessage::Error(error.to_string()),
                    }
                });
            }
            Command::DeleteSession { name, terminal } => {
                let service = self.service.clone();
                let messages = self.messages.clone();
                tokio::spawn(async move {
                    if let Some(terminal) = terminal {
                        terminal.close().await;
                    }
                    let reply = tokio::task::spawn_blocking(move || {
                        match service.delete(&name) {
                            Ok(()) => AppMessage::SessionDeleted { name },
                            Err(error) => AppMessage::Error(error.to_string()),
                        }
                    })
                    .await
                    .unwrap_or_else(|error| AppMessage::Error(error.to_string()));
                    let _ = messages.send(reply);
                });
            }
            Command::ArchiveSession { name } => {
                let service = self.service.clone();
                self.reply_blocking(move || match service.archive(&name) {
                    Ok(()) => AppMessage::SessionArchived { name },
                    Err(error) => AppMessage::Error(error.to_string()),
                });
            }
            Command::UnarchiveSession { name } => {
                let service = self.service.clone();
                self.reply_blocking(move || match service.unarchive(&name) {
                    Ok(()) => AppMessage::SessionUnarchived { name },
                    Err(error) => AppMessage::Error(error.to_string()),
                });
            }
            Command::TouchSession { name } => {
                let service = self.service.clone();
                tokio::task::spawn_blocking(move || {
                    if let Err(error) = service.touch(&name) {
                        debug!(session = %name, %error, "touch failed");
                    }
                });
            }
            Command::RunSetup {
                name,
                worktree_path,
                commands,
            } => {
                self.reply_blocking(move || {
                    let error = run_setup_commands(&worktree_path, &commands)
                        .err()
                        .map(|error| error.to_string());
                    AppMessage::SetupComplete { name, error }
                });
            }
            Command::ActivateTerminal {
                session,
                width,
                height,
            } => self.activate(session, width, height),
            Command::RespawnTerminal { terminal, resume } => {
                let messages = self.messages.clone();
                tokio::spawn(async move {
                    if let Err(error) = terminal.respawn(resume).await {
                        let _ = messages.send(AppMessage::Error(error.to_string()));
                    }
                });
            }
        }
    }

    /// Reattaches to a surviving tmux session (respawning a dead pane) or
    /// creates a fresh one, resuming the agent conversation when the
    /// worktree has one.
    fn activate(&self, session: atc_core::Session, width: u16, height: u16) {
        let service = self.service.clone();
        let runner = self.runner.clone();
        let socket = self.socket.clone();
        let events = self.terminal_events.clone();
        let messages = self.messages.clone();
        let policy = self.policy;

        tokio::spawn(async move {
            let name = session.name.clone();
            let result = if session_exists(runner.as_ref(), &socket, &name).await {
                match Terminal::attach(
                    &name,
                    width,
                    height,
                    runner.clone(),
                    &socket,
                    events,
                    policy,
                )
                .await
                {
                    Ok(terminal) => {
                        // The agent died while we were away; restart it with
                        // its conversation.
                        if !terminal.is_running() {
                            match terminal.respawn(true).await {
                                Ok(()) => Ok(terminal),
                                Err(error) => Err(error),
                            }
                        } else {
                            Ok(terminal)
                        }
                    }
                    Err(error) => Err(error),
                }
            } else {
                let resume = has_existing_conversation(&session.worktree_path);
                Terminal::new(
                    &name,
                    &session.worktree_path,
                    width,
                    height,
                    resume,
                    runner.clone(),
                    &socket,
                    events,
                    policy,
                )
                .await
            };

            match result {
                Ok(terminal) => {
                    let touch_service = service.clone();
                    let touch_name = name.clone();
                    let _ = tokio::task::spawn_blocking(move || {
                        let _ = touch_service.touch(&touch_name);
                    })
                    .await;
                    let _ = messages.send(AppMessage::TerminalReady {
                        name,
                        terminal: Arc::new(terminal),
                    });
                }
                Err(error) => {
                    let _ = messages.send(AppMessage::Error(error.to_string()));
                }
            }
        });
    }

    fn reply_blocking(
        &self,
        work: impl FnOnce() -> AppMessage + Send + 'static,
    ) {
        let messages = self.messages.clone();
        tokio::task::spawn_blocking(move || {
            let _ = messages.send(work());
        });
    }
}
