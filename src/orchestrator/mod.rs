//! Application-level orchestration utilities.
//!
//! This module owns search lifecycle control (start/poll/cancel/reset) and post-run
//! processing such as exports and preference persistence. CLI layers call into this
//! module to keep responsibilities separated.

mod controller;
mod post_process;

pub(crate) use controller::{SearchError, SearchLifecycleController, DEFAULT_POLL_INTERVAL};
pub(crate) use post_process::process_run_completion;
