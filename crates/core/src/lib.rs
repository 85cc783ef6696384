// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! brook-core: data model for the brook micro-batch streaming engine
//!
//! This crate provides:
//! - Micro-batches and their provenance metadata
//! - Job configuration (output modes, source options, checkpoint location)
//! - Clock and id abstractions so time and generated names are testable

pub mod batch;
pub mod clock;
pub mod config;
pub mod id;

// Re-exports
pub use batch::{Metadata, MicroBatch};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{
    Config, ConfigError, OutputMode, SourceOptions, CHECKPOINT_LOCATION, RUN_INITIAL_BATCH,
    SETTLE_MS,
};
pub use id::{IdGen, SequentialIdGen, UuidIdGen, WalId};
