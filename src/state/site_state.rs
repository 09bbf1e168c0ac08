/// Site state definitions for the crawl queue
///
/// A site moves through a small state machine; every queue operation is one
/// of the transitions accepted by `SiteState::can_transition_to`.
use std::fmt;

/// Represents where a site is in its crawl lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteState {
    // ===== Active States =====
    /// Site is waiting to be claimed by a worker
    Pending,

    /// Site is reserved by exactly one worker
    Claimed,

    // ===== Terminal States =====
    /// Site was crawled and its documents stored (or already had documents)
    Completed,

    /// Site hit the retry limit; needs manual reset
    Errored,
}

impl SiteState {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Errored)
    }

    /// Returns true if the site may still be worked on
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Claimed)
    }

    /// Returns true if `claim_next` may select this site
    pub fn is_claimable(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Checks a transition against the queue state machine
    ///
    /// ```text
    /// Pending --claim--> Claimed --complete--> Completed
    ///                    Claimed --release/fail--> Pending
    ///                    Claimed --fail at limit--> Errored
    /// ```
    pub fn can_transition_to(&self, next: SiteState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Claimed)
                | (Self::Claimed, Self::Completed)
                | (Self::Claimed, Self::Pending)
                | (Self::Claimed, Self::Errored)
        )
    }

    /// Converts the site state to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Claimed => "claimed",
            Self::Completed => "completed",
            Self::Errored => "errored",
        }
    }

    /// Parses a site state from a database string representation
    ///
    /// Returns None if the string doesn't match any known state.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "claimed" => Some(Self::Claimed),
            "completed" => Some(Self::Completed),
            "errored" => Some(Self::Errored),
            _ => None,
        }
    }

    /// Returns all possible site states
    pub fn all_states() -> [Self; 4] {
        [Self::Pending, Self::Claimed, Self::Completed, Self::Errored]
    }
}

impl fmt::Display for SiteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
