//! School Timetabling - Axum Server
//!
//! Run with: cargo run
//! Then open: http://localhost:7860/timeTable

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use school_timetabling::api::{self, AppState, SINGLETON_TIME_TABLE_ID};
use school_timetabling::config::AppConfig;
use school_timetabling::console;
use school_timetabling::constraints::define_constraints;
use school_timetabling::demo_data;
use school_timetabling::local_search::LocalSearchEngine;
use school_timetabling::solver::SolverService;
use school_timetabling::store::TimeTableStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("school_timetabling=info".parse()?))
        .init();

    let config = AppConfig::from_env()?;
    if config.solver.console {
        console::print_banner();
    }

    let store = Arc::new(TimeTableStore::new());
    store.create_problem(SINGLETON_TIME_TABLE_ID);
    let table = demo_data::generate(config.demo_data);
    if !table.lessons.is_empty() {
        store.import(SINGLETON_TIME_TABLE_ID, &table);
    }
    if config.solver.console {
        console::print_config(table.lessons.len(), table.timeslots.len(), table.rooms.len());
    }

    let engine = LocalSearchEngine::new(config.solver.to_solver_config());
    let solver = Arc::new(SolverService::new(
        store.clone(),
        Arc::new(engine),
        define_constraints(),
    ));

    let app = api::router(AppState::new(solver, store));
    let addr = config.server.address();
    info!(address = %addr, demo_data = config.demo_data.as_str(), "Server listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
