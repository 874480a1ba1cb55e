//! Bus departure lookup for the Apeldoorn - Zwolle line.
//!
//! Resolves what a user typed into a canonical stop, then finds the next
//! departures from it in the current and the following hour, using a
//! timetable source that can only serve one query at a time.

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod domain;
pub mod preferences;
pub mod resolver;
pub mod service;
pub mod timetable;
pub mod window;
