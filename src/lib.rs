//! modelbox — HTTP serving shell for pluggable ML model wrappers.
//!
//! One model kind runs per process: classification and object detection are
//! served synchronously on `POST /`, while instance segmentation runs through
//! an asynchronous job pipeline (submit, background worker, poll for result).

pub mod app_state;
pub mod auth;
pub mod config;
pub mod models;
pub mod routes;
pub mod services;
