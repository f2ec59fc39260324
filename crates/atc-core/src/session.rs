use std::path::PathBuf;

use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Active,
    Archived,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// A named pair of (git worktree, interactive agent process). The `name`
/// doubles as the git branch name; both are unique per database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub name: String,
    pub repo_path: PathBuf,
    pub repo_name: String,
    pub worktree_path: PathBuf,
    pub branch_name: String,
    pub created_at: OffsetDateTime,
    pub last_accessed: Option<OffsetDateTime>,
    pub archived_at: Option<OffsetDateTime>,
    pub status: SessionStatus,
}

impl Session {
    pub fn is_archived(&self) -> bool {
        self.status == SessionStatus::Archived
    }
}

#[cfg(test)]
mod tests {
    use super::SessionStatus;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [SessionStatus::Active, SessionStatus::Archived] {
            assert_eq!(SessionStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SessionStatus::parse("retired"), None);
    }
}
