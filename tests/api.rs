//! End-to-end tests of the REST API against an in-memory store.

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use school_timetabling::api::{self, AppState, SINGLETON_TIME_TABLE_ID};
use school_timetabling::constraints::define_constraints;
use school_timetabling::demo_data::{self, DemoData};
use school_timetabling::local_search::{LocalSearchEngine, SolverConfig};
use school_timetabling::solver::SolverService;
use school_timetabling::store::TimeTableStore;

fn app(demo: DemoData) -> Router {
    let store = Arc::new(TimeTableStore::new());
    store.create_problem(SINGLETON_TIME_TABLE_ID);
    store.import(SINGLETON_TIME_TABLE_ID, &demo_data::generate(demo));

    let engine = LocalSearchEngine::new(SolverConfig {
        time_limit: Some(Duration::from_secs(20)),
        random_seed: Some(7),
        ..SolverConfig::default()
    });
    let solver = Arc::new(SolverService::new(
        store.clone(),
        Arc::new(engine),
        define_constraints(),
    ));
    api::router(AppState::new(solver, store))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn wait_until_not_solving(app: &Router) -> Value {
    for _ in 0..1000 {
        let (_, table) = send(app, Method::GET, "/timeTable", None).await;
        if table["solverStatus"] == "NOT_SOLVING" {
            return table;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("solver did not stop");
}

/// Waits until the running job has reported its first solution.
async fn wait_for_best_score(app: &Router) {
    for _ in 0..1000 {
        let (_, status) = send(app, Method::GET, "/time-table/1/status", None).await;
        if status["score"].is_string() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("solver reported no solution");
}

#[tokio::test]
async fn health_and_info() {
    let app = app(DemoData::None);

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "UP");

    let (_, body) = send(&app, Method::GET, "/info", None).await;
    assert_eq!(body["name"], "School Timetabling");

    let (_, body) = send(&app, Method::GET, "/demo-data", None).await;
    assert_eq!(body, json!(["SMALL", "LARGE"]));

    let (status, _) = send(&app, Method::GET, "/demo-data/HUGE", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn time_table_is_scored_with_status() {
    let app = app(DemoData::Small);

    let (status, table) = send(&app, Method::GET, "/timeTable", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(table["solverStatus"], "NOT_SOLVING");
    assert_eq!(table["timeslotList"].as_array().unwrap().len(), 10);
    assert_eq!(table["roomList"].as_array().unwrap().len(), 3);
    assert_eq!(table["lessonList"].as_array().unwrap().len(), 20);
    assert_eq!(table["timeslotList"][0]["dayOfWeek"], "MONDAY");
    assert_eq!(table["timeslotList"][0]["startTime"], "08:30:00");
    assert!(table["score"].is_string());
}

#[tokio::test]
async fn data_entry_round_trip() {
    let app = app(DemoData::None);

    let (status, timeslot) = send(
        &app,
        Method::POST,
        "/timeslots",
        Some(json!({ "dayOfWeek": "TUESDAY", "startTime": "10:30:00", "endTime": "11:30:00" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, room) = send(&app, Method::POST, "/rooms", Some(json!({ "name": "Room A" }))).await;
    let (_, lesson) = send(
        &app,
        Method::POST,
        "/lessons",
        Some(json!({ "subject": "Math", "teacher": "A. Turing", "studentGroup": "9th grade" })),
    )
    .await;
    assert!(lesson["timeslot"].is_null());

    let lesson_uri = format!("/lessons/{}", lesson["id"]);
    let (status, updated) = send(
        &app,
        Method::PUT,
        &lesson_uri,
        Some(json!({ "timeslotId": timeslot["id"], "roomId": room["id"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["timeslot"]["dayOfWeek"], "TUESDAY");
    assert_eq!(updated["room"]["name"], "Room A");

    let room_uri = format!("/rooms/{}", room["id"]);
    let (status, _) = send(&app, Method::DELETE, &room_uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, lessons) = send(&app, Method::GET, "/lessons", None).await;
    assert!(lessons[0]["room"].is_null());
    assert_eq!(lessons[0]["timeslot"]["id"], timeslot["id"]);

    let (status, body) = send(&app, Method::DELETE, &room_uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn assigning_an_unknown_room_is_not_found() {
    let app = app(DemoData::Small);
    let (_, lessons) = send(&app, Method::GET, "/lessons", None).await;
    let uri = format!("/lessons/{}", lessons[0]["id"]);

    let (status, _) = send(&app, Method::PUT, &uri, Some(json!({ "roomId": 9999 }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_problem_is_not_found() {
    let app = app(DemoData::Small);

    let (status, body) = send(&app, Method::GET, "/time-table/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "There is no timeTable with id (42).");

    let (status, _) = send(&app, Method::POST, "/time-table/42/solve", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, "/time-table/42/error", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn solving_without_timeslots_is_a_server_error() {
    let app = app(DemoData::None);
    send(
        &app,
        Method::POST,
        "/lessons",
        Some(json!({ "subject": "Math", "teacher": "A. Turing", "studentGroup": "9th grade" })),
    )
    .await;

    let (status, body) = send(&app, Method::POST, "/timeTable/solve", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["message"].as_str().unwrap().contains("timeslot"));
}

#[tokio::test]
async fn solve_conflict_and_stop() {
    let app = app(DemoData::Small);

    let (status, _) = send(&app, Method::POST, "/timeTable/solve", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, Method::POST, "/time-table/1/solve-and-listen", None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(
        body["message"],
        "There is already running or scheduled solving for the problemId (1)"
    );

    wait_for_best_score(&app).await;
    let (status, _) = send(&app, Method::POST, "/timeTable/stopSolving", None).await;
    assert_eq!(status, StatusCode::OK);

    let table = wait_until_not_solving(&app).await;
    for lesson in table["lessonList"].as_array().unwrap() {
        assert!(lesson["timeslot"].is_object());
        assert!(lesson["room"].is_object());
    }

    let (_, status_body) = send(&app, Method::GET, "/time-table/1/status", None).await;
    assert_eq!(status_body["solverStatus"], "NOT_SOLVING");
}

#[tokio::test]
async fn analyze_reports_every_constraint() {
    let app = app(DemoData::Small);
    let (_, table) = send(&app, Method::GET, "/timeTable", None).await;

    let (status, analysis) = send(&app, Method::PUT, "/timeTable/analyze", Some(table)).await;
    assert_eq!(status, StatusCode::OK);
    let constraints = analysis["constraints"].as_array().unwrap();
    assert_eq!(constraints.len(), 6);
    assert_eq!(constraints[0]["name"], "Room conflict");
    assert_eq!(constraints[0]["type"], "hard");
    assert_eq!(constraints[5]["type"], "soft");
}
