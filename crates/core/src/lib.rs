//! Detection and arbitration logic for the standby producer monitor.
//!
//! This crate provides the decision-making half of the monitor:
//!
//! - [`MissedBlockDetector`]: infers skipped turns and stalled heads from the
//!   sequence of signing producers
//! - [`MissedRoundDetector`]: coarse fallback based on the node's
//!   last-produced bookkeeping, evaluated once per schedule version
//! - [`DuplicateSignatureMatcher`]: recognises the node log line that proves a
//!   second instance is signing with the protected key
//! - [`Controller`]: the single-writer arbitration state machine
//!
//! # Architecture
//!
//! ```text
//! Workers (production crate) ──ControlEvent──→ Controller::handle() ──→ Vec<Action>
//!                                                    │
//!                                      runner executes actions, feeds
//!                                      completions back as ControlEvents
//! ```
//!
//! Everything here is:
//! - **Synchronous**: No async, no .await
//! - **Deterministic**: Same state + event + time = same actions
//! - **Pure-ish**: Mutates self, but performs no I/O
//!
//! All I/O (node RPC, log tailing, alert delivery) lives in the production
//! crate, which drives these types from its tokio tasks.

mod action;
mod config;
mod controller;
mod detector;
mod duplicate_signature;
mod health;
mod input;
mod missed_block;
mod missed_round;
mod traits;

pub use action::{Action, Alert, AlertSeverity, FatalError};
pub use config::{ControllerConfig, MissedBlockConfig, MissedRoundConfig};
pub use controller::Controller;
pub use detector::{DetectorKind, MissKind};
pub use duplicate_signature::{DuplicateSignatureMatcher, LogActivity};
pub use health::HealthRegistry;
pub use input::ControlEvent;
pub use missed_block::MissedBlockDetector;
pub use missed_round::{MissedRoundDetector, RoundCheck};
pub use traits::StateMachine;
