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

//! Serialization of domain entities to/from the keystore.
//!
//! Rooms, exits, item prototypes and archetypes are loaded eagerly at
//! startup; concrete items and characters are loaded on demand as a
//! session or a room reference first touches them. Dangling references
//! (an exit pointing nowhere, a character's room that no longer exists,
//! an inventory entry whose item has been deleted) are tolerated:
//! substitute the Void room, or drop the entry, and log the occurrence
//! — never fail the load.

use crate::error::RepositoryError;
use crate::keystore::{Bucket, Keystore};
use crate::model::{Archetype, Character, CharacterId, Exit, Item, ItemId, Player, Room, RoomId, VOID_ROOM_ID};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use wyldlands_common::Direction;

/// The persisted shape of a room: exits and online characters are
/// stored/derived elsewhere (exits live in their own bucket;
/// characters are transient).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RoomRecord {
    area: String,
    title: String,
    description: String,
    items: Vec<ItemId>,
}

/// Read/write access to every persisted entity kind, typed, with
/// referential-integrity fallbacks applied on load.
pub struct Repository<'a> {
    keystore: &'a Keystore,
}

impl<'a> Repository<'a> {
    pub fn new(keystore: &'a Keystore) -> Self {
        Self { keystore }
    }

    // ---- Rooms & Exits ----------------------------------------------

    /// Loads every room and its exits. The Void room (id 0) is always
    /// present in the result even if absent from the keystore.
    pub fn load_rooms(&self) -> Result<HashMap<RoomId, Room>, RepositoryError> {
        let mut rooms = HashMap::new();
        rooms.insert(VOID_ROOM_ID, Room::void());

        for (key, value) in self.keystore.iter(Bucket::Rooms)? {
            let id_str = String::from_utf8_lossy(&key);
            let id: RoomId = match id_str.parse() {
                Ok(id) => id,
                Err(_) => {
                    tracing::warn!("skipping room with unparseable id {:?}", id_str);
                    continue;
                }
            };
            let record: RoomRecord = serde_json::from_slice(&value)?;
            rooms.insert(
                id,
                Room {
                    id,
                    area: record.area,
                    title: record.title,
                    description: record.description,
                    exits: BTreeMap::new(),
                    items: record.items,
                    characters: Default::default(),
                },
            );
        }

        for (key, value) in self.keystore.iter(Bucket::Exits)? {
            let key_str = String::from_utf8_lossy(&key);
            let Some((room_part, dir_part)) = key_str.split_once('_') else {
                tracing::warn!("skipping malformed exit key {:?}", key_str);
                continue;
            };
            let Ok(room_id) = room_part.parse::<RoomId>() else {
                tracing::warn!("skipping exit with unparseable room id {:?}", room_part);
                continue;
            };
            let Ok(direction) = Direction::from_str(dir_part) else {
                tracing::warn!("skipping exit with unknown direction {:?}", dir_part);
                continue;
            };
            let exit: Exit = serde_json::from_slice(&value)?;
            match rooms.get_mut(&room_id) {
                Some(room) => {
                    room.exits.insert(direction, exit);
                }
                None => {
                    tracing::warn!(
                        "dropping exit for room {} ({}): room does not exist",
                        room_id,
                        direction
                    );
                }
            }
        }

        // An exit target that refers to nothing is a startup-time
        // invariant violation: substitute the Void room.
        let known_ids: std::collections::HashSet<RoomId> = rooms.keys().copied().collect();
        for room in rooms.values_mut() {
            for (direction, exit) in room.exits.iter_mut() {
                if !known_ids.contains(&exit.target_room) {
                    tracing::warn!(
                        "exit {} in room {} targets unknown room {}; redirecting to the Void",
                        direction,
                        room.id,
                        exit.target_room
                    );
                    exit.target_room = VOID_ROOM_ID;
                }
            }
        }

        Ok(rooms)
    }

    pub fn save_room(&self, room: &Room) -> Result<(), RepositoryError> {
        let record = RoomRecord {
            area: room.area.clone(),
            title: room.title.clone(),
            description: room.description.clone(),
            items: room.items.clone(),
        };
        let bytes = serde_json::to_vec(&record)?;
        self.keystore.put(Bucket::Rooms, room.id.to_string().as_bytes(), &bytes)?;

        for (direction, exit) in &room.exits {
            let key = format!("{}_{}", room.id, direction);
            let bytes = serde_json::to_vec(exit)?;
            self.keystore.put(Bucket::Exits, key.as_bytes(), &bytes)?;
        }
        Ok(())
    }

    // ---- Archetypes & Prototypes (read-only, eager) ------------------

    pub fn load_archetypes(&self) -> Result<HashMap<String, Archetype>, RepositoryError> {
        let mut out = HashMap::new();
        for (key, value) in self.keystore.iter(Bucket::Archetypes)? {
            let name = String::from_utf8_lossy(&key).to_string();
            let archetype: Archetype = serde_json::from_slice(&value)?;
            out.insert(name, archetype);
        }
        Ok(out)
    }

    pub fn load_item_prototypes(&self) -> Result<HashMap<String, Item>, RepositoryError> {
        let mut out = HashMap::new();
        for (key, value) in self.keystore.iter(Bucket::ItemPrototypes)? {
            let name = String::from_utf8_lossy(&key).to_string();
            let item: Item = serde_json::from_slice(&value)?;
            out.insert(name, item);
        }
        Ok(out)
    }

    // ---- Items (lazy) -------------------------------------------------

    pub fn load_item(&self, id: &ItemId) -> Result<Option<Item>, RepositoryError> {
        let (bucket, key) = match id {
            ItemId::Concrete(uuid) => (Bucket::Items, uuid.to_string()),
            ItemId::Prototype(name) => (Bucket::ItemPrototypes, name.clone()),
        };
        match self.keystore.get(bucket, key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn save_item(&self, item: &Item) -> Result<(), RepositoryError> {
        let (bucket, key) = match &item.id {
            ItemId::Concrete(uuid) => (Bucket::Items, uuid.to_string()),
            ItemId::Prototype(name) => (Bucket::ItemPrototypes, name.clone()),
        };
        let bytes = serde_json::to_vec(item)?;
        self.keystore.put(bucket, key.as_bytes(), &bytes)?;
        Ok(())
    }

    pub fn delete_item(&self, id: &ItemId) -> Result<(), RepositoryError> {
        let (bucket, key) = match id {
            ItemId::Concrete(uuid) => (Bucket::Items, uuid.to_string()),
            ItemId::Prototype(name) => (Bucket::ItemPrototypes, name.clone()),
        };
        self.keystore.delete(bucket, key.as_bytes())?;
        Ok(())
    }

    /// Deep-copies `proto_id` into a fresh concrete item tree and
    /// persists every new item. Returns the root item.
    pub fn create_item_from_prototype(
        &self,
        proto_id: &str,
        prototypes: &HashMap<String, Item>,
    ) -> Result<Option<Item>, RepositoryError> {
        let Some(proto) = prototypes.get(proto_id) else {
            return Ok(None);
        };
        let tree = proto.instantiate_tree(prototypes);
        for item in &tree {
            self.save_item(item)?;
        }
        Ok(tree.into_iter().next())
    }

    // ---- Players --------------------------------------------------

    pub fn load_player(&self, login: &str) -> Result<Option<Player>, RepositoryError> {
        match self.keystore.get(Bucket::Players, login.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn save_player(&self, player: &Player) -> Result<(), RepositoryError> {
        let bytes = serde_json::to_vec(player)?;
        self.keystore.put(Bucket::Players, player.login.as_bytes(), &bytes)?;
        Ok(())
    }

    // ---- Characters -------------------------------------------------

    pub fn load_character(&self, id: CharacterId) -> Result<Option<Character>, RepositoryError> {
        match self.keystore.get(Bucket::Characters, id.to_string().as_bytes())? {
            Some(bytes) => {
                let mut character: Character = serde_json::from_slice(&bytes)?;
                // Dangling room reference: substitute the Void room and
                // log. The caller validates against the loaded room
                // set; here we only guard against garbage ids that
                // could never resolve.
                if character.room_id < 0 && character.room_id != VOID_ROOM_ID {
                    tracing::warn!(
                        "character {} has invalid room id {}; substituting the Void room",
                        character.id,
                        character.room_id
                    );
                    character.room_id = VOID_ROOM_ID;
                }
                Ok(Some(character))
            }
            None => Ok(None),
        }
    }

    /// The lowercase-folded name of every persisted character, used to
    /// seed `World::character_name_exists` at startup: the set is the
    /// lowercase superset of all persisted names, not just the ones
    /// currently online.
    pub fn all_character_names(&self) -> Result<std::collections::HashSet<String>, RepositoryError> {
        let mut names = std::collections::HashSet::new();
        for (_, value) in self.keystore.iter(Bucket::Characters)? {
            let character: Character = serde_json::from_slice(&value)?;
            names.insert(character.lowercase_name());
        }
        Ok(names)
    }

    pub fn save_character(&self, character: &Character) -> Result<(), RepositoryError> {
        let bytes = serde_json::to_vec(character)?;
        self.keystore
            .put(Bucket::Characters, character.id.to_string().as_bytes(), &bytes)?;
        Ok(())
    }

    pub fn next_character_id(&self) -> Result<CharacterId, RepositoryError> {
        Ok(self.keystore.next_sequence(Bucket::Characters)?)
    }
}
