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

//! Characters: a persona owned by a player.

use super::item::ItemId;
use super::room::RoomId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type CharacterId = u64;

/// A persona owned by a player. The `inventory` map is dual-purpose:
/// held items are keyed by item name, worn items are keyed by
/// wear-location. `crate::pipeline::verbs` is responsible for keeping
/// the two halves from colliding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub player_login: String,
    pub room_id: RoomId,
    pub attributes: HashMap<String, f64>,
    pub abilities: HashMap<String, f64>,
    pub health: f64,
    pub essence: f64,
    pub inventory: HashMap<String, ItemId>,
}

impl Character {
    /// The lowercase form used for uniqueness checks and the
    /// `characters-online` index.
    pub fn lowercase_name(&self) -> String {
        self.name.to_lowercase()
    }
}

// Whether an inventory key names a wear-location or an item's own name
// depends on the referenced Item's `is_worn`/`wear_locations`, which this
// model doesn't have access to — that classification is done where both
// the Character and the Item store are in scope (see
// `crate::pipeline::verbs::inventory`).

#[cfg(test)]
mod tests {
    use super::*;

    fn character() -> Character {
        Character {
            id: 1,
            name: "Bob".to_string(),
            player_login: "bob@example.com".to_string(),
            room_id: 1,
            attributes: HashMap::new(),
            abilities: HashMap::new(),
            health: 100.0,
            essence: 100.0,
            inventory: HashMap::new(),
        }
    }

    #[test]
    fn lowercase_name_folds_case() {
        assert_eq!(character().lowercase_name(), "bob");
    }
}
