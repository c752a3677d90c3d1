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

//! Players: the account record.

use super::character::CharacterId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The account record keyed by the exact login string the transport
/// authenticated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub login: String,
    pub characters: HashMap<String, CharacterId>,
}

impl Player {
    pub fn new(login: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            characters: HashMap::new(),
        }
    }
}
