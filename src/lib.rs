//! School Timetabling
//!
//! Assigns every lesson a timeslot and a room, scoring assignments with a
//! fixed table of hard and soft constraints. The library provides the domain
//! model, a generic planning model with a late acceptance engine, the solve
//! orchestrator that merges solutions back into the store, and the REST API.

pub mod api;
pub mod config;
pub mod console;
pub mod constraint;
pub mod constraints;
pub mod demo_data;
pub mod domain;
pub mod dto;
pub mod engine;
pub mod error;
pub mod local_search;
pub mod merge;
pub mod planning;
pub mod score;
pub mod snapshot;
pub mod solver;
pub mod store;
