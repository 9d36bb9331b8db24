//! `rollcall` - Face check-in attendance tracking
//!
//! This library provides the attendance store: registered users and a capped,
//! newest-first attendance log persisted through a pluggable key-value
//! backend, plus a pluggable recognizer that matches image snapshots to users.
//! The bundled recognizer is a simulation and does not analyze images.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod recognition;
pub mod report;
pub mod storage;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use model::{AttendanceRecord, AttendanceStatus, FaceSnapshot, RegisteredUser, UserProfile};
pub use recognition::{RandomRecognizer, Recognizer, RequestToken, RequestTracker};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore, StorageStats};
pub use store::{AttendanceStore, Export, Recognition};
