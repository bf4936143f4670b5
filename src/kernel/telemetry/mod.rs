//! Run telemetry.
//!
//! # SAFETY INVARIANT
//! Telemetry is a READ-ONLY side-effect layer. The driver never reads it to
//! decide anything.
//!
//! # PRIVACY INVARIANT
//! Events carry ids, counts and kinds only. No message text, no audio.

pub mod event;
pub mod metrics;
pub mod recorder;
