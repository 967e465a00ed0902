#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Milestone pace estimator (device-agnostic).
//!
//! Once per activity tick the engine turns a raw distance/time sample into
//! time-remaining projections for a fixed set of distance milestones. All
//! storage goes through `pacer_traits::KvStore` and all timing through
//! `pacer_traits::Clock`.
//!
//! ## Pipeline
//!
//! - **Validation**: structural checks, no state touched on rejection (`validator`)
//! - **Anomalies**: frozen distance, pace spikes, time jumps (`anomaly`)
//! - **Smoothing**: single-pole EMA with warm-up gate (`smoother`)
//! - **Tracking**: one-way completion with tolerance (`milestones`)
//! - **Display**: bounded window and celebration hold (`display`, `severity`)
//! - **Persistence**: checksummed record, throttled writes (`persistence`, `store`)
//! - **Safe mode**: circuit breaker for internal faults (`breaker`)
//!
//! ## Units
//!
//! Distances are compared in whole centimetres (`u32`) and times in
//! milliseconds (`u32`); pace is carried as `f64` seconds per metre.

pub mod anomaly;
pub mod atomic;
pub mod breaker;
pub mod config;
pub mod conversions;
pub mod display;
pub mod engine;
pub mod error;
pub mod milestones;
pub mod persistence;
pub mod severity;
pub mod smoother;
pub mod status;
pub mod store;
pub mod util;
pub mod validator;

pub use anomaly::{AnomalyKind, AnomalyState};
pub use breaker::TickFault;
pub use config::{EngineCfg, MilestoneDef, TimeJumpPolicy};
pub use display::Celebration;
pub use engine::{Engine, EngineBuilder, EngineStats, SlotView, TickOutput};
pub use error::{BuildError, Result};
pub use milestones::Milestone;
pub use persistence::{Corruption, PersistError, PersistedRecord};
pub use severity::Severity;
pub use status::EngineStatus;
pub use store::{FailingStore, FileStore, MemoryStore};
pub use validator::{GpsAccuracy, Rejection, Sample};
