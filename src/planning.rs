//! Generic planning model: decision variables, value ranges and the
//! solution trait the engine, scorer and merge step work against.
//!
//! Entities hold ids instead of references; a decision variable's value is
//! the id of a fact (or entity) inside the same solution.

use crate::error::{Result, SolveError};
use crate::score::Score;

/// Value of a decision variable: the id of the chosen fact.
pub type ValueId = u64;

/// Candidate values for one decision variable.
pub enum ValueRange<S> {
    /// The same candidates for every entity, e.g. "all timeslots".
    Static(fn(&S) -> Vec<ValueId>),
    /// Candidates derived per entity (by entity index).
    PerEntity(fn(&S, usize) -> Vec<ValueId>),
}

impl<S> ValueRange<S> {
    /// Returns the candidate values for the entity at `entity`.
    pub fn values(&self, solution: &S, entity: usize) -> Vec<ValueId> {
        match self {
            ValueRange::Static(provider) => provider(solution),
            ValueRange::PerEntity(provider) => provider(solution, entity),
        }
    }
}

/// Describes one decision variable of the planning entity type.
pub struct VariableDescriptor<S> {
    pub name: &'static str,
    pub get: fn(&S, usize) -> Option<ValueId>,
    pub set: fn(&mut S, usize, Option<ValueId>),
    pub value_range: ValueRange<S>,
}

/// A planning solution: facts, entities with decision variables, and a score.
///
/// The descriptor table returned by [`PlanningSolution::variables`] is fixed
/// per type; engines change entities only through it.
pub trait PlanningSolution: Clone + Send + Sync + 'static {
    type Score: Score;

    /// The decision variables of the planning entity type.
    fn variables() -> &'static [VariableDescriptor<Self>];

    /// Number of planning entities.
    fn entity_count(&self) -> usize;

    /// Stable id of the entity at `entity`.
    fn entity_id(&self, entity: usize) -> u64;

    fn score(&self) -> Option<Self::Score>;

    fn set_score(&mut self, score: Option<Self::Score>);

    /// Returns a copy with every decision variable unset.
    fn unassigned(&self) -> Self {
        let mut solution = self.clone();
        for entity in 0..solution.entity_count() {
            for variable in Self::variables() {
                (variable.set)(&mut solution, entity, None);
            }
        }
        solution.set_score(None);
        solution
    }

    /// Number of (entity, variable) slots still unset.
    fn unassigned_count(&self) -> usize {
        (0..self.entity_count())
            .map(|entity| {
                Self::variables()
                    .iter()
                    .filter(|variable| (variable.get)(self, entity).is_none())
                    .count()
            })
            .sum()
    }
}

/// Checks that every decision variable of every entity has at least one
/// candidate value.
///
/// An empty range is a modelling error, so it is reported when the snapshot
/// is built rather than while scoring.
pub fn validate_value_ranges<S: PlanningSolution>(solution: &S) -> Result<()> {
    for entity in 0..solution.entity_count() {
        for variable in S::variables() {
            if variable.value_range.values(solution, entity).is_empty() {
                return Err(SolveError::Configuration(format!(
                    "the value range of variable ({}) is empty for entity ({})",
                    variable.name,
                    solution.entity_id(entity)
                )));
            }
        }
    }
    Ok(())
}
