// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution context shared by every stage of one running query

use crate::error::EngineError;
use brook_core::Config;
use brook_storage::StateStore;
use datafusion::prelude::SessionContext;
use tokio_util::sync::CancellationToken;

/// Everything a source, operator or sink needs while a query runs.
///
/// One context exists per query; it owns the state store so the store is
/// released when the driving loop exits, whatever the exit path.
pub struct ExecContext {
    session: SessionContext,
    store: StateStore,
    config: Config,
    cancel: CancellationToken,
}

impl ExecContext {
    pub fn new(session: SessionContext, store: StateStore, config: Config) -> Self {
        Self {
            session,
            store,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Open the state store at the configured checkpoint location
    pub fn open(session: SessionContext, config: Config) -> Result<Self, EngineError> {
        let location = config.checkpoint_location()?;
        let store = StateStore::open(&location)?;
        Ok(Self::new(session, store, config))
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cancel(&self) -> &CancellationToken {
        &self.cancel
    }
}
