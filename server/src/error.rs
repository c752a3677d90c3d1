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

//! Error taxonomy for the session and world engine.
//!
//! Layered by failure domain: keystore/repository failures are logged
//! and degrade to a safe default wherever an invariant allows one;
//! user errors are reported only to the issuing session; no error from
//! this crate ever unwinds into a process-level panic once startup
//! completes.

use thiserror::Error;

/// Failures from the embedded key/value store.
#[derive(Debug, Error)]
pub enum KeystoreError {
    #[error("key not found")]
    NotFound,
    #[error("keystore I/O error: {0}")]
    Io(#[from] sled::Error),
    #[error("corrupt data: {0}")]
    CorruptData(String),
}

/// Failures translating between keystore bytes and domain entities.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Keystore(#[from] KeystoreError),
    #[error("corrupt record: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("referenced entity missing: {0}")]
    DanglingReference(String),
}

/// A single opaque rejection surfaced to the client; the identity
/// provider's actual reason is never forwarded.
#[derive(Debug, Error)]
#[error("authentication failed")]
pub struct AuthError;

/// Errors produced while handling a single command line. Every variant
/// carries the text to show the issuing session; the command loop
/// always continues afterward.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("command not understood")]
    UnknownVerb,
    #[error("you must specify a {0}")]
    MissingArgument(&'static str),
    #[error("You don't see that here.")]
    ItemNotFound,
    #[error("You cannot go that way.")]
    DirectionBlocked,
    #[error("that character already exists")]
    CharacterNameTaken,
    #[error("names must be between 1 and 15 characters")]
    InvalidCharacterName,
    #[error("{0}")]
    Rejected(String),
}
