//! The engine seam: what the orchestrator needs from a search engine.
//!
//! An engine takes ownership of a problem, improves it until it is cancelled
//! or its own termination fires, and reports every new best solution to a
//! [`SolutionListener`] on the thread it runs on.

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::constraint::ConstraintSet;
use crate::error::Result;
use crate::planning::PlanningSolution;

/// Receives improved solutions from a running engine.
pub trait SolutionListener<S: PlanningSolution> {
    /// Called with each new best solution, in non-decreasing score order.
    ///
    /// Returning `false` asks the engine to stop.
    fn best_solution_changed(&mut self, solution: &S, score: S::Score) -> bool;
}

impl<S, F> SolutionListener<S> for F
where
    S: PlanningSolution,
    F: FnMut(&S, S::Score) -> bool,
{
    fn best_solution_changed(&mut self, solution: &S, score: S::Score) -> bool {
        self(solution, score)
    }
}

/// A search engine.
///
/// `solve` blocks the calling thread; callers run it on a blocking pool.
/// The engine must poll `cancel` and return its best solution promptly once
/// it fires.
pub trait Engine<S: PlanningSolution>: Send + Sync + 'static {
    fn solve(
        &self,
        problem: S,
        constraints: &ConstraintSet<S>,
        cancel: &CancellationToken,
        listener: &mut dyn SolutionListener<S>,
    ) -> Result<S>;
}

/// Event sent from the engine thread to the job task.
#[derive(Debug)]
pub struct BestSolutionEvent<S: PlanningSolution> {
    pub solution: S,
    pub score: S::Score,
    /// Completed once the job task has handled the event.
    pub ack: oneshot::Sender<()>,
}

/// Forwards engine callbacks into a bounded channel and waits for each one
/// to be acknowledged before the engine continues.
pub struct ChannelListener<S: PlanningSolution> {
    tx: mpsc::Sender<BestSolutionEvent<S>>,
}

impl<S: PlanningSolution> ChannelListener<S> {
    pub fn new(tx: mpsc::Sender<BestSolutionEvent<S>>) -> Self {
        Self { tx }
    }
}

impl<S: PlanningSolution> SolutionListener<S> for ChannelListener<S> {
    fn best_solution_changed(&mut self, solution: &S, score: S::Score) -> bool {
        let (ack, acked) = oneshot::channel();
        let event = BestSolutionEvent {
            solution: solution.clone(),
            score,
            ack,
        };
        if self.tx.blocking_send(event).is_err() {
            return false;
        }
        acked.blocking_recv().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TimeTable;
    use crate::score::HardSoftScore;

    #[test]
    fn closures_are_listeners() {
        let mut seen = Vec::new();
        let mut listener = |_: &TimeTable, score: HardSoftScore| {
            seen.push(score);
            seen.len() < 2
        };
        let table = TimeTable::new(vec![], vec![], vec![]);
        assert!(listener.best_solution_changed(&table, HardSoftScore::of(-1, 0)));
        assert!(!listener.best_solution_changed(&table, HardSoftScore::ZERO));
        assert_eq!(seen.len(), 2);
    }

    #[tokio::test]
    async fn channel_listener_waits_for_the_ack() {
        let (tx, mut rx) = mpsc::channel(1);
        let engine_side = tokio::task::spawn_blocking(move || {
            let mut listener = ChannelListener::<TimeTable>::new(tx);
            let table = TimeTable::new(vec![], vec![], vec![]);
            let first = listener.best_solution_changed(&table, HardSoftScore::of(-1, 0));
            let second = listener.best_solution_changed(&table, HardSoftScore::ZERO);
            (first, second)
        });

        let event = rx.recv().await.unwrap();
        assert_eq!(event.score, HardSoftScore::of(-1, 0));
        event.ack.send(()).unwrap();

        // Dropping the ack sender without answering stops the engine.
        let event = rx.recv().await.unwrap();
        drop(event);

        assert_eq!(engine_side.await.unwrap(), (true, false));
    }
}
