/// Pipeline stage definitions for tracking run progress
use std::fmt;

/// Represents the current stage of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    /// Building and filtering the per-letter index URLs (no network)
    GeneratingUrls,

    /// Discovery tasks are fetching index pages and enqueuing work items
    Discovering,

    /// Every discovery task has joined; the shutdown marker is in flight
    Draining,

    /// Consumers have stopped; terminal
    Completed,
}

impl PipelineStage {
    /// Returns the stage that follows this one, if any
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::GeneratingUrls => Some(Self::Discovering),
            Self::Discovering => Some(Self::Draining),
            Self::Draining => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    /// Only single forward steps are allowed
    pub fn can_transition_to(&self, to: Self) -> bool {
        self.next() == Some(to)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GeneratingUrls => "generating_urls",
            Self::Discovering => "discovering",
            Self::Draining => "draining",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
