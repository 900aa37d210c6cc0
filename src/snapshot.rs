//! Problem snapshots: the load half of the store contract.

use std::sync::Arc;

use tracing::debug;

use crate::error::{ProblemId, Result};
use crate::merge::MergeReport;
use crate::planning::{validate_value_ranges, PlanningSolution};

/// Persisted store of planning problems.
///
/// `load` must read every fact and entity list of one problem consistently
/// and in a deterministic order, so two loads of an unchanged store yield
/// equal snapshots. `save` writes only decision variables back, inside one
/// transaction.
pub trait SolutionRepository<S: PlanningSolution>: Send + Sync + 'static {
    fn load(&self, problem_id: ProblemId) -> Result<S>;

    fn save(&self, problem_id: ProblemId, solution: &S) -> Result<MergeReport>;
}

/// Loads a problem and validates it for solving.
///
/// Fails with `NotFound` for an unknown id and with `Configuration` when a
/// decision variable has no candidate values.
pub fn build_snapshot<S, R>(repository: &R, problem_id: ProblemId) -> Result<Arc<S>>
where
    S: PlanningSolution,
    R: SolutionRepository<S> + ?Sized,
{
    let solution = repository.load(problem_id)?;
    validate_value_ranges(&solution)?;
    debug!(
        problem_id,
        entities = solution.entity_count(),
        unassigned = solution.unassigned_count(),
        "Snapshot built"
    );
    Ok(Arc::new(solution))
}
