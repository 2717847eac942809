// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::config::ServerConfig;
use crate::storage::{Database, StorageResult};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub tokens: Arc<TokenIssuer>,
}

impl AppState {
    pub fn new(db: Database, tokens: TokenIssuer) -> Self {
        Self {
            db: Arc::new(db),
            tokens: Arc::new(tokens),
        }
    }

    /// Open the configured database and build the token issuer.
    pub fn from_config(config: &ServerConfig) -> StorageResult<Self> {
        let db = Database::open(&config.database_path)?;
        let tokens = TokenIssuer::new(config.jwt_secret.as_bytes(), config.token_ttl_secs);
        Ok(Self::new(db, tokens))
    }

    /// In-memory state for tests.
    ///
    /// Panics if the in-memory backend cannot be created.
    #[doc(hidden)]
    pub fn for_tests() -> Self {
        let db = Database::in_memory().expect("in-memory database");
        Self::new(db, TokenIssuer::new(b"test-secret", 3600))
    }
}
