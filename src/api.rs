//! REST API handlers for School Timetabling.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::demo_data::{self, DemoData};
use crate::domain::TimeTable;
use crate::dto::{
    AnalyzeResponse, ErrorResponse, LessonAssignmentDto, LessonDto, NewLessonDto, NewRoomDto,
    NewTimeslotDto, RoomDto, StatusResponse, TimeTableDto, TimeslotDto,
};
use crate::error::{ProblemId, SolveError};
use crate::snapshot::SolutionRepository;
use crate::solver::{SolveMode, SolverService};
use crate::store::TimeTableStore;

/// Problem served by the `/timeTable` and data entry endpoints.
pub const SINGLETON_TIME_TABLE_ID: ProblemId = 1;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub solver: Arc<SolverService<TimeTable>>,
    pub store: Arc<TimeTableStore>,
}

impl AppState {
    pub fn new(solver: Arc<SolverService<TimeTable>>, store: Arc<TimeTableStore>) -> Self {
        Self { solver, store }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error response with a `{ "message": ... }` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// A failure recorded by a finished job; always a server error.
    fn solving_failed(problem_id: ProblemId, error: &SolveError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("Solving failed for problemId ({problem_id}): {error}"),
        }
    }
}

impl From<SolveError> for ApiError {
    fn from(error: SolveError) -> Self {
        let status = match error {
            SolveError::NotFound(_) | SolveError::EntityNotFound { .. } => StatusCode::NOT_FOUND,
            SolveError::AlreadySolving(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                message: self.message,
            }),
        )
            .into_response()
    }
}

impl IntoResponse for SolveError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// Router and Handlers
// ============================================================================

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & Info
        .route("/health", get(health))
        .route("/info", get(info))
        // Demo data
        .route("/demo-data", get(list_demo_data))
        .route("/demo-data/{id}", get(get_demo_data))
        // Singleton timetable
        .route("/timeTable", get(get_time_table))
        .route("/timeTable/solve", post(solve_time_table))
        .route("/timeTable/stopSolving", post(stop_solving_time_table))
        .route("/timeTable/analyze", put(analyze_time_table))
        // Timetables by problem id
        .route("/time-table/{problem_id}", get(get_problem).delete(stop_problem))
        .route("/time-table/{problem_id}/solve", post(solve_problem))
        .route("/time-table/{problem_id}/solve-and-listen", post(solve_and_listen))
        .route("/time-table/{problem_id}/status", get(get_problem_status))
        .route(
            "/time-table/{problem_id}/error",
            get(get_problem_error).delete(clear_problem_error),
        )
        // Data entry
        .route("/timeslots", get(list_timeslots).post(add_timeslot))
        .route("/timeslots/{id}", delete(remove_timeslot))
        .route("/rooms", get(list_rooms).post(add_room))
        .route("/rooms/{id}", delete(remove_room))
        .route("/lessons", get(list_lessons).post(add_lesson))
        .route("/lessons/{id}", put(update_lesson).delete(remove_lesson))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ============================================================================
// Health & Info
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /health - Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "UP" })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub solver_engine: &'static str,
}

/// GET /info - Application info endpoint.
async fn info() -> Json<InfoResponse> {
    Json(InfoResponse {
        name: "School Timetabling",
        version: env!("CARGO_PKG_VERSION"),
        solver_engine: "Late Acceptance",
    })
}

/// GET /demo-data - List available demo data sets.
async fn list_demo_data() -> Json<Vec<&'static str>> {
    Json(DemoData::AVAILABLE.iter().map(DemoData::as_str).collect())
}

/// GET /demo-data/{id} - Get a specific demo data set.
async fn get_demo_data(Path(id): Path<String>) -> Result<Json<TimeTableDto>, StatusCode> {
    match id.parse::<DemoData>() {
        Ok(demo) => {
            let table = demo_data::generate(demo);
            Ok(Json(TimeTableDto::from_table(&table, None)))
        }
        Err(_) => Err(StatusCode::NOT_FOUND),
    }
}

// ============================================================================
// Solving
// ============================================================================

fn time_table_response(state: &AppState, problem_id: ProblemId) -> ApiResult<Json<TimeTableDto>> {
    let current = state.solver.solution_with_status(problem_id)?;
    Ok(Json(TimeTableDto::from_table(
        &current.solution,
        Some(current.status),
    )))
}

fn fail_if_errored(state: &AppState, problem_id: ProblemId) -> ApiResult<()> {
    match state.solver.get_error(problem_id) {
        Some(error) => Err(ApiError::solving_failed(problem_id, &error)),
        None => Ok(()),
    }
}

/// GET /timeTable - The stored timetable, scored, with solver status.
async fn get_time_table(State(state): State<AppState>) -> ApiResult<Json<TimeTableDto>> {
    time_table_response(&state, SINGLETON_TIME_TABLE_ID)
}

/// POST /timeTable/solve - Start solving, merging every improvement.
async fn solve_time_table(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state
        .solver
        .solve(SINGLETON_TIME_TABLE_ID, SolveMode::Listen)?;
    Ok(StatusCode::OK)
}

/// POST /timeTable/stopSolving - Ask the running solve to stop.
async fn stop_solving_time_table(State(state): State<AppState>) -> StatusCode {
    state.solver.terminate(SINGLETON_TIME_TABLE_ID);
    StatusCode::OK
}

/// PUT /timeTable/analyze - Per-constraint breakdown of a submitted timetable.
async fn analyze_time_table(
    State(state): State<AppState>,
    Json(dto): Json<TimeTableDto>,
) -> Json<AnalyzeResponse> {
    let table = dto.to_domain();
    Json(AnalyzeResponse::from(state.solver.analyze(&table)))
}

/// GET /time-table/{problemId} - Stored timetable for a problem.
async fn get_problem(
    State(state): State<AppState>,
    Path(problem_id): Path<ProblemId>,
) -> ApiResult<Json<TimeTableDto>> {
    fail_if_errored(&state, problem_id)?;
    time_table_response(&state, problem_id)
}

/// POST /time-table/{problemId}/solve - Solve, merging only the final best solution.
async fn solve_problem(
    State(state): State<AppState>,
    Path(problem_id): Path<ProblemId>,
) -> ApiResult<StatusCode> {
    state.solver.solve(problem_id, SolveMode::FinalBestOnly)?;
    Ok(StatusCode::OK)
}

/// POST /time-table/{problemId}/solve-and-listen - Solve, merging every improvement.
async fn solve_and_listen(
    State(state): State<AppState>,
    Path(problem_id): Path<ProblemId>,
) -> ApiResult<StatusCode> {
    state.solver.solve(problem_id, SolveMode::Listen)?;
    Ok(StatusCode::OK)
}

/// GET /time-table/{problemId}/status - Solver status and best score so far.
async fn get_problem_status(
    State(state): State<AppState>,
    Path(problem_id): Path<ProblemId>,
) -> ApiResult<Json<StatusResponse>> {
    fail_if_errored(&state, problem_id)?;
    let solver_status = state.solver.get_status(problem_id);
    Ok(Json(StatusResponse {
        score: state.solver.best_score(problem_id).map(|s| s.to_string()),
        solver_status,
    }))
}

/// DELETE /time-table/{problemId} - Stop solving and return the stored timetable.
async fn stop_problem(
    State(state): State<AppState>,
    Path(problem_id): Path<ProblemId>,
) -> ApiResult<Json<TimeTableDto>> {
    fail_if_errored(&state, problem_id)?;
    state.solver.terminate(problem_id);
    time_table_response(&state, problem_id)
}

/// GET /time-table/{problemId}/error - The failure of the last solve, if any.
async fn get_problem_error(
    State(state): State<AppState>,
    Path(problem_id): Path<ProblemId>,
) -> Result<Json<ErrorResponse>, StatusCode> {
    state
        .solver
        .get_error(problem_id)
        .map(|e| {
            Json(ErrorResponse {
                message: e.to_string(),
            })
        })
        .ok_or(StatusCode::NOT_FOUND)
}

/// DELETE /time-table/{problemId}/error - Forget the failure of the last solve.
async fn clear_problem_error(
    State(state): State<AppState>,
    Path(problem_id): Path<ProblemId>,
) -> StatusCode {
    state.solver.clear_error(problem_id);
    StatusCode::NO_CONTENT
}

// ============================================================================
// Data entry
// ============================================================================

/// GET /timeslots - Timeslots in day and time order.
async fn list_timeslots(State(state): State<AppState>) -> ApiResult<Json<Vec<TimeslotDto>>> {
    let timeslots = state.store.list_timeslots(SINGLETON_TIME_TABLE_ID)?;
    Ok(Json(timeslots.iter().map(TimeslotDto::from).collect()))
}

/// POST /timeslots - Add a timeslot.
async fn add_timeslot(
    State(state): State<AppState>,
    Json(dto): Json<NewTimeslotDto>,
) -> ApiResult<(StatusCode, Json<TimeslotDto>)> {
    let timeslot = state.store.add_timeslot(
        SINGLETON_TIME_TABLE_ID,
        dto.day_of_week,
        dto.start_time,
        dto.end_time,
    )?;
    Ok((StatusCode::CREATED, Json(TimeslotDto::from(&timeslot))))
}

/// DELETE /timeslots/{id} - Remove a timeslot, unassigning its lessons.
async fn remove_timeslot(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<StatusCode> {
    state.store.remove_timeslot(SINGLETON_TIME_TABLE_ID, id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /rooms - Rooms in name order.
async fn list_rooms(State(state): State<AppState>) -> ApiResult<Json<Vec<RoomDto>>> {
    let rooms = state.store.list_rooms(SINGLETON_TIME_TABLE_ID)?;
    Ok(Json(rooms.iter().map(RoomDto::from).collect()))
}

/// POST /rooms - Add a room.
async fn add_room(
    State(state): State<AppState>,
    Json(dto): Json<NewRoomDto>,
) -> ApiResult<(StatusCode, Json<RoomDto>)> {
    let room = state.store.add_room(SINGLETON_TIME_TABLE_ID, &dto.name)?;
    Ok((StatusCode::CREATED, Json(RoomDto::from(&room))))
}

/// DELETE /rooms/{id} - Remove a room, unassigning its lessons.
async fn remove_room(State(state): State<AppState>, Path(id): Path<u64>) -> ApiResult<StatusCode> {
    state.store.remove_room(SINGLETON_TIME_TABLE_ID, id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /lessons - Lessons by subject, teacher and student group.
async fn list_lessons(State(state): State<AppState>) -> ApiResult<Json<Vec<LessonDto>>> {
    let table = state.store.load(SINGLETON_TIME_TABLE_ID)?;
    Ok(Json(
        table
            .lessons
            .iter()
            .map(|l| LessonDto::from_lesson(l, &table))
            .collect(),
    ))
}

/// POST /lessons - Add an unassigned lesson.
async fn add_lesson(
    State(state): State<AppState>,
    Json(dto): Json<NewLessonDto>,
) -> ApiResult<(StatusCode, Json<LessonDto>)> {
    let lesson = state.store.add_lesson(
        SINGLETON_TIME_TABLE_ID,
        &dto.subject,
        &dto.teacher,
        &dto.student_group,
    )?;
    let table = state.store.load(SINGLETON_TIME_TABLE_ID)?;
    Ok((
        StatusCode::CREATED,
        Json(LessonDto::from_lesson(&lesson, &table)),
    ))
}

/// PUT /lessons/{id} - Assign a lesson to a timeslot and room by id.
async fn update_lesson(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(dto): Json<LessonAssignmentDto>,
) -> ApiResult<Json<LessonDto>> {
    let lesson = state.store.update_lesson(
        SINGLETON_TIME_TABLE_ID,
        id,
        dto.timeslot_id,
        dto.room_id,
    )?;
    let table = state.store.load(SINGLETON_TIME_TABLE_ID)?;
    Ok(Json(LessonDto::from_lesson(&lesson, &table)))
}

/// DELETE /lessons/{id} - Remove a lesson.
async fn remove_lesson(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<StatusCode> {
    state.store.remove_lesson(SINGLETON_TIME_TABLE_ID, id)?;
    Ok(StatusCode::NO_CONTENT)
}
