/// Visit state definitions for tracking a single category visit
///
/// Every node moves `Pending -> Fetching -> {Recorded, Failed} -> Expanded`.
/// A cancelled visit goes straight from `Pending` to `Expanded` with no
/// children dispatched.
use std::fmt;

/// Represents the current state of a node visit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisitState {
    /// Visit has been dispatched but not yet started its fetch
    Pending,

    /// Request for this node is in flight
    Fetching,

    /// A status code was observed (and handed to storage)
    Recorded,

    /// No status code could be observed (network failure)
    Failed,

    /// Children have been dispatched; the visit is done
    Expanded,
}

impl VisitState {
    /// Checks whether moving from `self` to `next` is a legal step
    pub fn can_transition_to(&self, next: VisitState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Fetching)
                | (Self::Pending, Self::Expanded)
                | (Self::Fetching, Self::Recorded)
                | (Self::Fetching, Self::Failed)
                | (Self::Recorded, Self::Expanded)
                | (Self::Failed, Self::Expanded)
        )
    }

    /// Short lowercase label used in log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Fetching => "fetching",
            Self::Recorded => "recorded",
            Self::Failed => "failed",
            Self::Expanded => "expanded",
        }
    }
}

impl fmt::Display for VisitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
