//
// Copyright 2025-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! The Authenticator capability: an external identity provider,
//! consumed only through this trait. The core never inspects why a
//! provider rejected a credential — only `AuthError`, an opaque
//! rejection, crosses back into the session.

use crate::error::AuthError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn verify(&self, login: &str, password: &str) -> Result<(), AuthError>;
    async fn change_password(&self, login: &str, old: &str, new: &str) -> Result<(), AuthError>;
}

/// A minimal bcrypt-backed Authenticator, provided so the engine is
/// exercisable end to end without wiring a real identity provider.
/// Production deployments are expected to supply their own
/// `Authenticator` — this one holds its table in memory and is not
/// persisted by the world's own keystore.
pub struct BcryptAuthenticator {
    // login -> bcrypt hash
    credentials: RwLock<HashMap<String, String>>,
}

impl BcryptAuthenticator {
    pub fn new() -> Self {
        Self { credentials: RwLock::new(HashMap::new()) }
    }

    /// Registers (or overwrites) a login's password. Intended for
    /// bootstrapping accounts and tests; a real provider would have its
    /// own out-of-band signup flow.
    pub async fn set_password(&self, login: &str, password: &str) -> Result<(), AuthError> {
        let hash = bcrypt::hash(password, bcrypt::DEFAULT_COST).map_err(|_| AuthError)?;
        self.credentials.write().await.insert(login.to_string(), hash);
        Ok(())
    }
}

impl Default for BcryptAuthenticator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Authenticator for BcryptAuthenticator {
    async fn verify(&self, login: &str, password: &str) -> Result<(), AuthError> {
        let hashes = self.credentials.read().await;
        let hash = hashes.get(login).ok_or(AuthError)?;
        match bcrypt::verify(password, hash) {
            Ok(true) => Ok(()),
            _ => Err(AuthError),
        }
    }

    async fn change_password(&self, login: &str, old: &str, new: &str) -> Result<(), AuthError> {
        self.verify(login, old).await?;
        self.set_password(login, new).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn verify_succeeds_for_a_registered_password() {
        let auth = BcryptAuthenticator::new();
        auth.set_password("alice", "hunter2").await.unwrap();
        assert!(auth.verify("alice", "hunter2").await.is_ok());
    }

    #[tokio::test]
    async fn verify_fails_for_unknown_login_without_leaking_detail() {
        let auth = BcryptAuthenticator::new();
        assert!(auth.verify("nobody", "x").await.is_err());
    }

    #[tokio::test]
    async fn change_password_requires_the_old_password() {
        let auth = BcryptAuthenticator::new();
        auth.set_password("alice", "old").await.unwrap();
        assert!(auth.change_password("alice", "wrong", "new").await.is_err());
        assert!(auth.change_password("alice", "old", "new").await.is_ok());
        assert!(auth.verify("alice", "new").await.is_ok());
    }
}
