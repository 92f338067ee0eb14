//! parkwatch: parking spot occupancy monitor.
//!
//! Sensors POST distance readings to `/api/reading`; the latest reading per
//! spot is kept in memory and pushed to every viewer connected on `/ws`.
//! A new viewer first receives the full current state, then live updates.

pub mod app;
pub mod config;
pub mod errors;
pub mod routes;
pub mod services;
pub mod state;
