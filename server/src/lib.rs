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

//! The concurrent session and world engine: Keystore, World
//! Repository, World State, Authenticator, Session, Command Pipeline,
//! Autosave Loop. `wyldlands-gateway` is the only consumer — it
//! supplies a concrete `Transport` and drives `Session::run` per
//! accepted connection.

pub mod auth;
pub mod autosave;
pub mod challenge;
pub mod config;
pub mod context;
pub mod error;
pub mod keystore;
pub mod model;
pub mod pipeline;
pub mod repository;
pub mod session;
pub mod transport;
pub mod world;
