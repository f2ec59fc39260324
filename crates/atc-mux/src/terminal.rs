use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use atc_core::{CoreError, CoreResult};
use tokio::sync::{mpsc, watch};
use tracing::debug;

use crate::keys::{key_to_tmux_args, KeyPress};
use crate::policy::MuxPolicy;
use crate::runner::{mux_unavailable, MuxRunner};

/// Messages the polling task posts into the event-loop inbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalEvent {
    /// The visible pane changed since the last capture.
    Output { name: String },
    /// The child process died (posted at most once per death).
    Exited { name: String },
}

fn agent_command(resume_conversation: bool) -> &'static str {
    if resume_conversation {
        "claude --continue"
    } else {
        "claude"
    }
}

#[derive(Debug, Default)]
struct Inner {
    last_capture: String,
    scroll_capture: String,
    vis_height: u16,
    scroll_lines: usize,
    cached_history: usize,
    pane_dead: bool,
    closed: bool,
}

/// Handle for one detached tmux session hosting one agent process.
///
/// Lifecycle: `new`/`attach` start a private polling task; `detach` stops
/// polling but leaves the tmux session running; `close` also kills it;
/// `respawn` restarts the child in the dead pane.
pub struct Terminal {
    socket: String,
    name: String,
    runner: Arc<dyn MuxRunner>,
    policy: MuxPolicy,
    events: mpsc::UnboundedSender<TerminalEvent>,
    inner: Arc<Mutex<Inner>>,
    done: watch::Sender<bool>,
}

impl std::fmt::Debug for Terminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terminal")
            .field("socket", &self.socket)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl Terminal {
    /// Creates a fresh tmux session running the agent in the worktree.
    #[allow(clippy::too_many_arguments)]
    pub async fn new(
        name: &str,
        worktree_path: &Path,
        width: u16,
        height: u16,
        resume_conversation: bool,
        runner: Arc<dyn MuxRunner>,
        socket: &str,
        events: mpsc::UnboundedSender<TerminalEvent>,
        policy: MuxPolicy,
    ) -> CoreResult<Self> {
        let args = string_args(&[
            "-L",
            socket,
            "new-session",
            "-d",
            "-s",
            name,
            "-x",
            &width.to_string(),
            "-y",
            &height.to_string(),
            "-E",
            agent_command(resume_conversation),
        ]);
        let output = runner
            .run(&args, Some(worktree_path))
            .await
            .map_err(|error| mux_unavailable("tmux", &error))?;
        if !output.status.success() {
            return Err(CoreError::Mux(format!(
                "failed to create tmux session: {}",
                command_detail(&output)
            )));
        }

        // Keep the pane visible after the child exits, and set scrollback depth.
        let _ = runner
            .run(
                &string_args(&["-L", socket, "set-option", "-t", name, "remain-on-exit", "on"]),
                None,
            )
            .await;
        let _ = runner
            .run(
                &string_args(&[
                    "-L",
                    socket,
                    "set-option",
                    "-t",
                    name,
                    "history-limit",
                    &policy.history_limit.to_string(),
                ]),
                None,
            )
            .await;

        Ok(Self::spawn_handle(
            name, width, height, false, runner, socket, events, policy,
        ))
    }

    /// Wraps a preexisting tmux session, resizes it to the current pane, and
    /// starts polling. The handle comes up dead if the child already exited.
    pub async fn attach(
        name: &str,
        width: u16,
        height: u16,
        runner: Arc<dyn MuxRunner>,
        socket: &str,
        events: mpsc::UnboundedSender<TerminalEvent>,
        policy: MuxPolicy,
    ) -> CoreResult<Self> {
        let _ = runner
            .run(
                &string_args(&[
                    "-L",
                    socket,
                    "resize-window",
                    "-t",
                    name,
                    "-x",
                    &width.to_string(),
                    "-y",
                    &height.to_string(),
                ]),
                None,
            )
            .await;

        let dead = query_pane_dead(runner.as_ref(), socket, name).await;
        Ok(Self::spawn_handle(
            name, width, height, dead, runner, socket, events, policy,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn spawn_handle(
        name: &str,
        _width: u16,
        height: u16,
        pane_dead: bool,
        runner: Arc<dyn MuxRunner>,
        socket: &str,
        events: mpsc::UnboundedSender<TerminalEvent>,
        policy: MuxPolicy,
    ) -> Self {
        let inner = Arc::new(Mutex::new(Inner {
            vis_height: height,
            pane_dead,
            ..Inner::default()
        }));
        let (done, done_rx) = watch::channel(false);

        let terminal = Self {
            socket: socket.to_owned(),
            name: name.to_owned(),
            runner,
            policy,
            events,
            inner,
            done,
        };

        tokio::spawn(poll_loop(
            terminal.runner.clone(),
            terminal.socket.clone(),
            terminal.name.clone(),
            terminal.inner.clone(),
            terminal.events.clone(),
            policy,
            done_rx,
        ));

        terminal
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current terminal content as an ANSI string: the live capture, or the
    /// stashed scrollback window while in scroll mode.
    pub fn render(&self) -> String {
        let inner = self.lock();
        let content = if inner.scroll_lines == 0 {
            &inner.last_capture
        } else {
            &inner.scroll_capture
        };
        content.trim_end_matches('\n').to_owned()
    }

    /// Translates a logical key press and forwards it to the tmux session.
    /// Fire-and-forget: delivery failures are swallowed.
    pub fn send_keys(&self, key: &KeyPress) {
        let Some(args) = key_to_tmux_args(&self.socket, &self.name, key) else {
            return;
        };
        let runner = self.runner.clone();
        tokio::spawn(async move {
            let _ = runner.run(&args, None).await;
        });
    }

    /// Resizes the tmux window to the pane dimensions. Fire-and-forget.
    pub fn resize(&self, width: u16, height: u16) {
        self.lock().vis_height = height;
        let args = string_args(&[
            "-L",
            &self.socket,
            "resize-window",
            "-t",
            &self.name,
            "-x",
            &width.to_string(),
            "-y",
            &height.to_string(),
        ]);
        let runner = self.runner.clone();
        tokio::spawn(async move {
            let _ = runner.run(&args, None).await;
        });
    }

    pub fn is_running(&self) -> bool {
        !self.lock().pane_dead
    }

    pub fn is_scroll_mode(&self) -> bool {
        self.lock().scroll_lines > 0
    }

    pub fn scroll_position(&self) -> usize {
        self.lock().scroll_lines
    }

    /// Scrolls back by `lines`, clamped to the cached history size.
    pub fn scroll_up(&self, lines: usize) {
        let offset = {
            let mut inner = self.lock();
            inner.scroll_lines = (inner.scroll_lines + lines).min(inner.cached_history);
            inner.scroll_lines
        };
        if offset > 0 {
            self.refresh_scroll_window();
        }
    }

    /// Scrolls forward by `lines`, clamped to 0 (live view).
    pub fn scroll_down(&self, lines: usize) {
        let offset = {
            let mut inner = self.lock();
            inner.scroll_lines = inner.scroll_lines.saturating_sub(lines);
            inner.scroll_lines
        };
        if offset == 0 {
            self.lock().scroll_capture.clear();
            let _ = self.events.send(TerminalEvent::Output {
                name: self.name.clone(),
            });
        } else {
            self.refresh_scroll_window();
        }
    }

    pub fn exit_scroll_mode(&self) {
        let mut inner = self.lock();
        inner.scroll_lines = 0;
        inner.scroll_capture.clear();
    }

    /// Captures the scrollback range for the current offset in the
    /// background and posts an output event once stashed. In tmux, line 0 is
    /// the top visible row and negative lines are scrollback, so offset N
    /// shows `[-N, -N + height - 1]`.
    fn refresh_scroll_window(&self) {
        let (offset, height) = {
            let inner = self.lock();
            (inner.scroll_lines, i64::from(inner.vis_height))
        };
        if offset == 0 {
            return;
        }
        let start = -(offset as i64);
        let end = start + height - 1;
        let args = string_args(&[
            "-L",
            &self.socket,
            "capture-pane",
            "-t",
            &self.name,
            "-p",
            "-e",
            "-S",
            &start.to_string(),
            "-E",
            &end.to_string(),
        ]);
        let runner = self.runner.clone();
        let inner = self.inner.clone();
        let events = self.events.clone();
        let name = self.name.clone();
        tokio::spawn(async move {
            let capture = match runner.run(&args, None).await {
                Ok(output) if output.status.success() => {
                    String::from_utf8_lossy(&output.stdout).into_owned()
                }
                _ => String::new(),
            };
            {
                let mut inner = inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                // A later scroll may have already left scroll mode.
                if inner.scroll_lines == 0 {
                    return;
                }
                inner.scroll_capture = capture;
            }
            let _ = events.send(TerminalEvent::Output { name });
        });
    }

    /// Restarts the agent process in the dead pane.
    pub async fn respawn(&self, resume_conversation: bool) -> CoreResult<()> {
        let args = string_args(&[
            "-L",
            &self.socket,
            "respawn-pane",
            "-t",
            &self.name,
            "-k",
            agent_command(resume_conversation),
        ]);
        let output = self
            .runner
            .run(&args, None)
            .await
            .map_err(|error| mux_unavailable("tmux", &error))?;
        if !output.status.success() {
            return Err(CoreError::Mux(format!(
                "failed to respawn pane: {}",
                command_detail(&output)
            )));
        }
        let mut inner = self.lock();
        inner.pane_dead = false;
        Ok(())
    }

    /// Stops the polling task. The tmux session keeps running.
    pub fn detach(&self) {
        self.stop_polling();
    }

    /// Kills the tmux session and stops polling.
    pub async fn close(&self) {
        if !self.stop_polling() {
            return;
        }
        let args = string_args(&["-L", &self.socket, "kill-session", "-t", &self.name]);
        let _ = self.runner.run(&args, None).await;
    }

    /// Returns false if polling was already stopped.
    fn stop_polling(&self) -> bool {
        let mut inner = self.lock();
        if inner.closed {
            return false;
        }
        inner.closed = true;
        drop(inner);
        let _ = self.done.send(true);
        true
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Checks whether a tmux session with the given name exists on the socket.
pub async fn session_exists(runner: &dyn MuxRunner, socket: &str, name: &str) -> bool {
    runner
        .run(&string_args(&["-L", socket, "has-session", "-t", name]), None)
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Captures the pane and watches for child death at the policy cadence,
/// posting events into the inbox. Emission happens outside the handle lock.
async fn poll_loop(
    runner: Arc<dyn MuxRunner>,
    socket: String,
    name: String,
    inner: Arc<Mutex<Inner>>,
    events: mpsc::UnboundedSender<TerminalEvent>,
    policy: MuxPolicy,
    mut done: watch::Receiver<bool>,
) {
    let mut pace = policy.poll_interval;
    let mut ticker = new_ticker(pace);

    loop {
        tokio::select! {
            _ = done.changed() => break,
            _ = ticker.tick() => {}
        }

        let capture = capture_visible(runner.as_ref(), &socket, &name).await;
        let history = query_history_size(runner.as_ref(), &socket, &name).await;
        let dead_now = query_pane_dead(runner.as_ref(), &socket, &name).await;

        let (changed, exited) = {
            let mut inner = inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if inner.closed {
                break;
            }
            let changed = capture != inner.last_capture;
            inner.last_capture = capture;
            inner.cached_history = history;
            let was_dead = inner.pane_dead;
            if dead_now {
                inner.pane_dead = true;
            }
            (changed, dead_now && !was_dead)
        };

        if changed && events.send(TerminalEvent::Output { name: name.clone() }).is_err() {
            break;
        }
        if exited {
            debug!(session = %name, "pane died");
            if events.send(TerminalEvent::Exited { name: name.clone() }).is_err() {
                break;
            }
        }

        // Nothing changes in a dead pane; slow down until a respawn.
        let desired = if dead_now {
            policy.dead_poll_interval
        } else {
            policy.poll_interval
        };
        if desired != pace {
            pace = desired;
            ticker = new_ticker(pace);
        }
    }
}

fn new_ticker(period: Duration) -> tokio::time::Interval {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker
}

async fn capture_visible(runner: &dyn MuxRunner, socket: &str, name: &str) -> String {
    match runner
        .run(
            &string_args(&["-L", socket, "capture-pane", "-t", name, "-p", "-e"]),
            None,
        )
        .await
    {
        Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout).into_owned(),
        _ => String::new(),
    }
}

async fn query_pane_dead(runner: &dyn MuxRunner, socket: &str, name: &str) -> bool {
    query_format(runner, socket, name, "#{pane_dead}").await == "1"
}

async fn query_history_size(runner: &dyn MuxRunner, socket: &str, name: &str) -> usize {
    query_format(runner, socket, name, "#{history_size}")
        .await
        .parse()
        .unwrap_or(0)
}

async fn query_format(runner: &dyn MuxRunner, socket: &str, name: &str, format: &str) -> String {
    match runner
        .run(
            &string_args(&["-L", socket, "display-message", "-t", name, "-p", format]),
            None,
        )
        .await
    {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim().to_owned()
        }
        _ => String::new(),
    }
}

fn string_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| (*s).to_owned()).collect()
}

fn command_detail(output: &std::process::Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
    if !stderr.is_empty() {
        return stderr;
    }
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_owned();
    if !stdout.is_empty() {
        return stdout;
    }
    format!("exit status {}", output.status)
}
