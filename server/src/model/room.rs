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

//! Rooms and exits.

use super::item::ItemId;
use super::character::CharacterId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use wyldlands_common::Direction;

pub type RoomId = i64;

/// A directional link owned by its source room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exit {
    pub target_room: RoomId,
    pub visible: bool,
}

/// A node in the world graph. This is the in-memory shape held by
/// `crate::world::World`; the character set is transient (never
/// persisted — it is reconstructed as characters reconnect), the rest
/// round-trips through `crate::repository`.
#[derive(Debug, Clone, Default)]
pub struct Room {
    pub id: RoomId,
    pub area: String,
    pub title: String,
    pub description: String,
    pub exits: BTreeMap<Direction, Exit>,
    pub items: Vec<ItemId>,
    pub characters: HashSet<CharacterId>,
}

impl Room {
    pub fn void() -> Room {
        Room {
            id: super::VOID_ROOM_ID,
            area: "void".to_string(),
            title: "The Void".to_string(),
            description: "An endless, featureless grey nothing. Reality has not caught up here yet.".to_string(),
            exits: BTreeMap::new(),
            items: Vec::new(),
            characters: HashSet::new(),
        }
    }

    /// Exits visible to an observer, sorted by direction.
    pub fn visible_exits(&self) -> Vec<Direction> {
        self.exits
            .iter()
            .filter(|(_, exit)| exit.visible)
            .map(|(dir, _)| *dir)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn void_room_has_reserved_id_zero() {
        assert_eq!(Room::void().id, 0);
    }

    #[test]
    fn visible_exits_excludes_hidden_ones_and_is_sorted() {
        let mut room = Room { id: 1, ..Default::default() };
        room.exits.insert(Direction::West, Exit { target_room: 2, visible: true });
        room.exits.insert(Direction::North, Exit { target_room: 3, visible: true });
        room.exits.insert(Direction::Down, Exit { target_room: 4, visible: false });

        let visible = room.visible_exits();
        assert_eq!(visible, vec![Direction::North, Direction::West]);
    }
}
