//! Operator dashboard for monitoring live-chat participants.
//!
//! The backend collects participants; this crate fetches, orders and renders
//! them, and keeps the view fresh with a non-overlapping polling loop.

pub mod api;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod mock_backend;
pub mod participant;
pub mod polling;
pub mod sort;
pub mod table;
