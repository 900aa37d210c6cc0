//! Error types for planning, solving and merging.

use thiserror::Error;

/// Identifier of one planning problem in the store.
pub type ProblemId = u64;

/// Main error type for snapshot building, solve orchestration and merging.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveError {
    /// The requested problem id does not exist in the store.
    #[error("There is no timeTable with id ({0}).")]
    NotFound(ProblemId),

    /// A fact or entity referenced by id does not exist in the store.
    #[error("There is no {kind} with id ({id}).")]
    EntityNotFound { kind: &'static str, id: u64 },

    /// A job for this problem id is already scheduled or running.
    #[error("There is already running or scheduled solving for the problemId ({0})")]
    AlreadySolving(ProblemId),

    /// The planning model is misconfigured, e.g. a decision variable has an empty value range.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An entity was skipped while merging a solution back into the store.
    #[error("Entity ({entity_id}) skipped during merge: {reason}")]
    MergeSkip { entity_id: u64, reason: String },

    /// The engine failed or panicked while solving.
    #[error("Solving failed: {0}")]
    Engine(String),
}

/// Result type alias for solving operations.
pub type Result<T> = std::result::Result<T, SolveError>;
