//! Solve orchestration.
//!
//! One job per problem id, tracked in an explicit job map. Each `solve`
//! spawns a task that owns the engine's callback channel: the engine runs on
//! the blocking pool, and every improved solution it reports is merged into
//! the store before the engine is allowed to continue.

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::constraint::{ConstraintSet, ScoreAnalysis};
use crate::engine::{BestSolutionEvent, ChannelListener, Engine};
use crate::error::{ProblemId, Result, SolveError};
use crate::planning::PlanningSolution;
use crate::snapshot::{build_snapshot, SolutionRepository};

/// Capacity of the engine-to-task callback channel.
const CALLBACK_CHANNEL_SIZE: usize = 1;

/// Status of a solving job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SolverStatus {
    /// No job for this problem.
    NotSolving,
    /// Accepted, engine not started yet.
    SolvingScheduled,
    /// The engine is running.
    SolvingActive,
}

impl SolverStatus {
    /// Returns the status as a SCREAMING_SNAKE_CASE string for API responses.
    ///
    /// ```
    /// use school_timetabling::solver::SolverStatus;
    ///
    /// assert_eq!(SolverStatus::NotSolving.as_str(), "NOT_SOLVING");
    /// assert_eq!(SolverStatus::SolvingScheduled.as_str(), "SOLVING_SCHEDULED");
    /// assert_eq!(SolverStatus::SolvingActive.as_str(), "SOLVING_ACTIVE");
    /// ```
    pub fn as_str(self) -> &'static str {
        match self {
            SolverStatus::NotSolving => "NOT_SOLVING",
            SolverStatus::SolvingScheduled => "SOLVING_SCHEDULED",
            SolverStatus::SolvingActive => "SOLVING_ACTIVE",
        }
    }
}

/// When improved solutions reach the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveMode {
    /// Merge every improved solution as it arrives.
    Listen,
    /// Merge only the engine's final best solution.
    FinalBestOnly,
}

/// A solving job.
struct SolveJob<S: PlanningSolution> {
    status: SolverStatus,
    best_score: Option<S::Score>,
    cancel: CancellationToken,
    started: Instant,
}

impl<S: PlanningSolution> SolveJob<S> {
    fn scheduled() -> Self {
        Self {
            status: SolverStatus::SolvingScheduled,
            best_score: None,
            cancel: CancellationToken::new(),
            started: Instant::now(),
        }
    }
}

/// Status and stored solution, read in that order.
#[derive(Debug, Clone)]
pub struct SolutionWithStatus<S: PlanningSolution> {
    pub status: SolverStatus,
    pub score: S::Score,
    pub solution: S,
}

/// Manages solving jobs for every problem in a repository.
pub struct SolverService<S: PlanningSolution> {
    repository: Arc<dyn SolutionRepository<S>>,
    engine: Arc<dyn Engine<S>>,
    constraints: Arc<ConstraintSet<S>>,
    jobs: Mutex<HashMap<ProblemId, SolveJob<S>>>,
    errors: Mutex<HashMap<ProblemId, SolveError>>,
    /// Held shared by status-plus-solution reads, exclusively while a job
    /// commits its final solution and leaves the job map.
    commit: RwLock<()>,
}

impl<S: PlanningSolution> SolverService<S> {
    pub fn new(
        repository: Arc<dyn SolutionRepository<S>>,
        engine: Arc<dyn Engine<S>>,
        constraints: ConstraintSet<S>,
    ) -> Self {
        Self {
            repository,
            engine,
            constraints: Arc::new(constraints),
            jobs: Mutex::new(HashMap::new()),
            errors: Mutex::new(HashMap::new()),
            commit: RwLock::new(()),
        }
    }

    pub fn constraints(&self) -> &ConstraintSet<S> {
        &self.constraints
    }

    /// Starts solving `problem_id` in the background.
    ///
    /// Fails with `AlreadySolving` while a job for the id is scheduled or
    /// running, `NotFound` for an unknown id and `Configuration` when the
    /// problem cannot be solved as modelled. Must be called inside a tokio
    /// runtime.
    pub fn solve(self: &Arc<Self>, problem_id: ProblemId, mode: SolveMode) -> Result<()> {
        let cancel = {
            let mut jobs = self.jobs.lock();
            if jobs.contains_key(&problem_id) {
                return Err(SolveError::AlreadySolving(problem_id));
            }
            let job = SolveJob::scheduled();
            let cancel = job.cancel.clone();
            jobs.insert(problem_id, job);
            cancel
        };

        let snapshot = match build_snapshot(self.repository.as_ref(), problem_id) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.jobs.lock().remove(&problem_id);
                return Err(e);
            }
        };
        self.errors.lock().remove(&problem_id);

        info!(problem_id, mode = ?mode, "Solving scheduled");
        tokio::spawn(Arc::clone(self).run_job(problem_id, snapshot, mode, cancel));
        Ok(())
    }

    async fn run_job(
        self: Arc<Self>,
        problem_id: ProblemId,
        snapshot: Arc<S>,
        mode: SolveMode,
        cancel: CancellationToken,
    ) {
        let (tx, mut rx) = mpsc::channel::<BestSolutionEvent<S>>(CALLBACK_CHANNEL_SIZE);

        let engine = Arc::clone(&self.engine);
        let constraints = Arc::clone(&self.constraints);
        let handle = tokio::task::spawn_blocking(move || {
            let mut listener = ChannelListener::new(tx);
            engine.solve(Arc::unwrap_or_clone(snapshot), &constraints, &cancel, &mut listener)
        });

        while let Some(event) = rx.recv().await {
            self.record_best(problem_id, event.score);
            if mode == SolveMode::Listen {
                self.merge(problem_id, &event.solution);
            }
            // The engine may have given up waiting; nothing left to release then.
            let _ = event.ack.send(());
        }

        let outcome = match handle.await {
            Ok(result) => result,
            Err(join_error) => {
                let message = if join_error.is_panic() {
                    panic_message(join_error.into_panic())
                } else {
                    join_error.to_string()
                };
                error!(problem_id, error = %message, "Engine panicked");
                Err(SolveError::Engine(message))
            }
        };

        // Final merge and job removal form one step for status readers.
        let _commit = self.commit.write();
        match outcome {
            Ok(solution) => {
                if mode == SolveMode::FinalBestOnly {
                    self.merge(problem_id, &solution);
                }
                info!(
                    problem_id,
                    score = ?solution.score().map(|s| s.to_string()),
                    "Solving ended"
                );
            }
            Err(e) => {
                error!(problem_id, error = %e, "Solving failed");
                self.errors.lock().insert(problem_id, e);
            }
        }

        if let Some(job) = self.jobs.lock().remove(&problem_id) {
            info!(
                problem_id,
                duration_secs = job.started.elapsed().as_secs_f64(),
                "Job finished"
            );
        }
    }

    /// Records a reported solution; the first one makes the job active.
    fn record_best(&self, problem_id: ProblemId, score: S::Score) {
        if let Some(job) = self.jobs.lock().get_mut(&problem_id) {
            if job.status == SolverStatus::SolvingScheduled {
                info!(problem_id, score = %score, "Solving active");
            }
            job.status = SolverStatus::SolvingActive;
            job.best_score = Some(score);
        }
    }

    fn merge(&self, problem_id: ProblemId, solution: &S) {
        match self.repository.save(problem_id, solution) {
            Ok(report) if !report.is_complete() => warn!(
                problem_id,
                applied = report.applied,
                skipped = report.skipped.len(),
                "Partial merge"
            ),
            Ok(_) => {}
            Err(e) => warn!(problem_id, error = %e, "Merge failed"),
        }
    }

    /// Current job status; `NotSolving` when there is no job.
    pub fn get_status(&self, problem_id: ProblemId) -> SolverStatus {
        self.jobs
            .lock()
            .get(&problem_id)
            .map_or(SolverStatus::NotSolving, |job| job.status)
    }

    /// Score of the best solution reported by the running job.
    pub fn best_score(&self, problem_id: ProblemId) -> Option<S::Score> {
        self.jobs.lock().get(&problem_id).and_then(|job| job.best_score)
    }

    /// Asks the job for `problem_id` to stop. A no-op when nothing is running.
    ///
    /// The job keeps its status until the engine has actually returned.
    pub fn terminate(&self, problem_id: ProblemId) {
        if let Some(job) = self.jobs.lock().get(&problem_id) {
            info!(problem_id, "Terminating solve");
            job.cancel.cancel();
        }
    }

    /// Reads the status, then loads and scores the stored solution.
    ///
    /// Both reads happen under the commit lock, so a finishing job cannot
    /// write its final solution between them: an active status comes with an
    /// in-progress solution, `NOT_SOLVING` with the final one.
    pub fn solution_with_status(&self, problem_id: ProblemId) -> Result<SolutionWithStatus<S>> {
        let (status, mut solution) = {
            let _commit = self.commit.read();
            let status = self.get_status(problem_id);
            (status, self.repository.load(problem_id)?)
        };
        let score = self.constraints.update_score(&mut solution);
        Ok(SolutionWithStatus {
            status,
            score,
            solution,
        })
    }

    /// Per-constraint breakdown of a solution's score.
    pub fn analyze(&self, solution: &S) -> ScoreAnalysis<S::Score> {
        self.constraints.analyze(solution)
    }

    /// The failure recorded by the last job for `problem_id`, if any.
    pub fn get_error(&self, problem_id: ProblemId) -> Option<SolveError> {
        self.errors.lock().get(&problem_id).cloned()
    }

    pub fn clear_error(&self, problem_id: ProblemId) -> Option<SolveError> {
        self.errors.lock().remove(&problem_id)
    }

    /// All jobs with their status, by problem id.
    pub fn list_jobs(&self) -> Vec<(ProblemId, SolverStatus)> {
        let mut jobs: Vec<_> = self
            .jobs
            .lock()
            .iter()
            .map(|(&id, job)| (id, job.status))
            .collect();
        jobs.sort_by_key(|&(id, _)| id);
        jobs
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "engine panicked".to_string()
    }
}
