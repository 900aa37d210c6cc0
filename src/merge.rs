//! Writing engine results back: decision variables only, keyed by entity id.

use tracing::warn;

use crate::error::{Result, SolveError};
use crate::planning::{PlanningSolution, ValueId};

/// Write access to the decision variables of persisted entities.
///
/// Implementations must never touch facts and never insert or delete
/// entities.
pub trait DecisionWriter {
    /// Overwrites the decision variables of one entity, in descriptor order.
    fn update_decision_variables(&mut self, entity_id: u64, values: &[Option<ValueId>]) -> Result<()>;
}

/// Outcome of one merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Entities whose variables were written.
    pub applied: usize,
    /// One `MergeSkip` per entity left untouched.
    pub skipped: Vec<SolveError>,
}

impl MergeReport {
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// Applies every entity's decision variables from `solution` through `writer`.
///
/// Entities are written in snapshot order. A failing entity is logged and
/// reported but does not stop the rest of the batch. Values overwrite
/// whatever the store holds (last writer wins).
pub fn apply_decisions<S, W>(solution: &S, writer: &mut W) -> MergeReport
where
    S: PlanningSolution,
    W: DecisionWriter + ?Sized,
{
    let variables = S::variables();
    let mut report = MergeReport::default();
    let mut values = Vec::with_capacity(variables.len());

    for entity in 0..solution.entity_count() {
        let entity_id = solution.entity_id(entity);
        values.clear();
        values.extend(variables.iter().map(|v| (v.get)(solution, entity)));

        match writer.update_decision_variables(entity_id, &values) {
            Ok(()) => report.applied += 1,
            Err(e) => {
                warn!(entity_id, error = %e, "Skipping entity during merge");
                report.skipped.push(SolveError::MergeSkip {
                    entity_id,
                    reason: e.to_string(),
                });
            }
        }
    }
    report
}
