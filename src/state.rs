// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::server::RecordVault;

#[derive(Clone)]
pub struct AppState {
    pub vault: Arc<RecordVault>,
    pub issuer: Arc<TokenIssuer>,
}

impl AppState {
    pub fn new(vault: RecordVault, issuer: TokenIssuer) -> Self {
        Self {
            vault: Arc::new(vault),
            issuer: Arc::new(issuer),
        }
    }
}
