use std::time::Duration;

const DEFAULT_POLL_INTERVAL_MS: u64 = 50;
const DEFAULT_DEAD_POLL_INTERVAL_MS: u64 = 500;
const DEFAULT_HISTORY_LIMIT: u32 = 50_000;

/// Tunable timing and scrollback policy for terminal handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuxPolicy {
    /// Capture/poll cadence while the child is alive.
    pub poll_interval: Duration,
    /// Slower cadence once the pane is dead and nothing changes.
    pub dead_poll_interval: Duration,
    /// `history-limit` applied to new tmux sessions.
    pub history_limit: u32,
}

impl Default for MuxPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            dead_poll_interval: Duration::from_millis(DEFAULT_DEAD_POLL_INTERVAL_MS),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}
