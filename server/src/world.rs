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

//! The in-memory authoritative world view.
//!
//! Rooms and online characters are each wrapped in their own exclusive
//! lock: a `tokio::sync::Mutex` so handlers can hold it across an
//! `.await` without blocking the executor thread. `characters_online`
//! and `character_name_exists` share a single `RwLock` each, acquired
//! only while a character attaches or detaches. Items are loaded
//! lazily and cached here once touched, so a room's item set and a
//! character's inventory always resolve to the same in-memory instance
//! no matter who reaches it first.

use crate::error::RepositoryError;
use crate::model::{Archetype, Character, CharacterId, Item, ItemId, Room, RoomId};
use crate::repository::Repository;
use std::collections::{HashMap, HashSet};
use tokio::sync::{Mutex, RwLock};

/// A room together with its own lock, covering its character set, item
/// set, and exit map.
pub struct RoomCell {
    pub id: RoomId,
    inner: Mutex<Room>,
}

impl RoomCell {
    pub fn new(room: Room) -> Self {
        Self { id: room.id, inner: Mutex::new(room) }
    }

    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, Room> {
        self.inner.lock().await
    }
}

/// A character together with its own lock, covering its inventory, room
/// reference, and attributes.
pub struct CharacterCell {
    pub id: CharacterId,
    inner: Mutex<Character>,
    /// Where to deliver broadcast messages while this character is
    /// online; set by the owning Session, cleared on disconnect.
    pub outbound: RwLock<Option<tokio::sync::mpsc::UnboundedSender<String>>>,
}

impl CharacterCell {
    pub fn new(character: Character) -> Self {
        Self {
            id: character.id,
            inner: Mutex::new(character),
            outbound: RwLock::new(None),
        }
    }

    pub async fn lock(&self) -> tokio::sync::MutexGuard<'_, Character> {
        self.inner.lock().await
    }

    /// Best-effort delivery; a character with no attached session (mid
    /// disconnect) silently drops the message.
    pub async fn send(&self, message: impl Into<String>) {
        if let Some(tx) = self.outbound.read().await.as_ref() {
            let _ = tx.send(message.into());
        }
    }
}

pub struct World {
    rooms: RwLock<HashMap<RoomId, std::sync::Arc<RoomCell>>>,
    characters_online: RwLock<HashMap<String, std::sync::Arc<CharacterCell>>>,
    characters_by_id: RwLock<HashMap<CharacterId, std::sync::Arc<CharacterCell>>>,
    character_name_exists: RwLock<HashSet<String>>,
    pub archetypes: HashMap<String, Archetype>,
    pub prototypes: HashMap<String, Item>,
    items: RwLock<HashMap<ItemId, Item>>,
}

impl World {
    /// Loads rooms, archetypes and item prototypes from the repository.
    /// `characters-online` starts empty; characters attach as sessions
    /// authenticate.
    pub fn load(repo: &Repository<'_>) -> Result<World, RepositoryError> {
        let rooms = repo.load_rooms()?;
        let archetypes = repo.load_archetypes()?;
        let prototypes = repo.load_item_prototypes()?;
        let known_names = repo.all_character_names()?;

        Ok(World {
            rooms: RwLock::new(
                rooms
                    .into_iter()
                    .map(|(id, room)| (id, std::sync::Arc::new(RoomCell::new(room))))
                    .collect(),
            ),
            characters_online: RwLock::new(HashMap::new()),
            characters_by_id: RwLock::new(HashMap::new()),
            character_name_exists: RwLock::new(known_names),
            archetypes,
            prototypes,
            items: RwLock::new(HashMap::new()),
        })
    }

    pub async fn room(&self, id: RoomId) -> Option<std::sync::Arc<RoomCell>> {
        self.rooms.read().await.get(&id).cloned()
    }

    pub async fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.read().await.keys().copied().collect()
    }

    pub async fn all_rooms(&self) -> Vec<std::sync::Arc<RoomCell>> {
        self.rooms.read().await.values().cloned().collect()
    }

    /// True if `name`, folded to lowercase, is already taken.
    /// `character-name-exists` is the lowercase superset of every
    /// persisted character name.
    pub async fn character_name_exists(&self, name: &str) -> bool {
        self.character_name_exists.read().await.contains(&name.to_lowercase())
    }

    pub async fn reserve_character_name(&self, name: &str) {
        self.character_name_exists.write().await.insert(name.to_lowercase());
    }

    /// Registers a character as online: inserted into
    /// `characters-online`, `characters-by-id`, and `character-name-exists`
    /// under the single World-State lock for each map, acquired only for
    /// the duration of the insert.
    pub async fn attach_character(&self, cell: std::sync::Arc<CharacterCell>) {
        let (lowercase_name, id) = {
            let character = cell.lock().await;
            (character.lowercase_name(), character.id)
        };
        self.characters_online.write().await.insert(lowercase_name.clone(), cell.clone());
        self.characters_by_id.write().await.insert(id, cell);
        self.character_name_exists.write().await.insert(lowercase_name);
    }

    /// Removes a character from `characters-online` during Disposing.
    /// `character-name-exists` is intentionally left untouched — the
    /// name remains reserved for the persisted character even while
    /// its owner is offline.
    pub async fn detach_character(&self, lowercase_name: &str, id: CharacterId) {
        self.characters_online.write().await.remove(lowercase_name);
        self.characters_by_id.write().await.remove(&id);
    }

    pub async fn character_by_name(&self, lowercase_name: &str) -> Option<std::sync::Arc<CharacterCell>> {
        self.characters_online.read().await.get(lowercase_name).cloned()
    }

    pub async fn character_by_id(&self, id: CharacterId) -> Option<std::sync::Arc<CharacterCell>> {
        self.characters_by_id.read().await.get(&id).cloned()
    }

    pub async fn online_character_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for cell in self.characters_online.read().await.values() {
            names.push(cell.lock().await.name.clone());
        }
        names.sort();
        names
    }

    /// Looks up an item by id, consulting the prototype table first
    /// (read-only, never mutated) and otherwise the lazily-populated
    /// concrete item cache, loading it from the repository on first
    /// touch.
    pub async fn item(&self, repo: &Repository<'_>, id: &ItemId) -> Result<Option<Item>, RepositoryError> {
        if let ItemId::Prototype(name) = id {
            if let Some(proto) = self.prototypes.get(name) {
                return Ok(Some(proto.clone()));
            }
        }
        if let Some(item) = self.items.read().await.get(id) {
            return Ok(Some(item.clone()));
        }
        match repo.load_item(id)? {
            Some(item) => {
                self.items.write().await.insert(id.clone(), item.clone());
                Ok(Some(item))
            }
            None => Ok(None),
        }
    }

    pub async fn put_item(&self, item: Item) {
        self.items.write().await.insert(item.id.clone(), item);
    }

    pub async fn remove_item(&self, id: &ItemId) {
        self.items.write().await.remove(id);
    }

    pub async fn all_cached_items(&self) -> Vec<Item> {
        self.items.read().await.values().cloned().collect()
    }

    pub async fn online_characters(&self) -> Vec<std::sync::Arc<CharacterCell>> {
        self.characters_online.read().await.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::Keystore;

    fn temp_repo() -> (tempfile::TempDir, Keystore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.sled");
        let ks = Keystore::open(path.to_str().unwrap()).unwrap();
        (dir, ks)
    }

    fn character(id: CharacterId, name: &str) -> Character {
        Character {
            id,
            name: name.to_string(),
            player_login: "login".to_string(),
            room_id: 0,
            attributes: HashMap::new(),
            abilities: HashMap::new(),
            health: 100.0,
            essence: 100.0,
            inventory: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn load_always_contains_the_void_room() {
        let (_dir, ks) = temp_repo();
        let repo = Repository::new(&ks);
        let world = World::load(&repo).unwrap();
        assert!(world.room(0).await.is_some());
    }

    #[tokio::test]
    async fn attach_then_detach_character_round_trips_online_index() {
        let (_dir, ks) = temp_repo();
        let repo = Repository::new(&ks);
        let world = World::load(&repo).unwrap();

        let cell = std::sync::Arc::new(CharacterCell::new(character(1, "Alice")));
        world.attach_character(cell.clone()).await;
        assert!(world.character_by_name("alice").await.is_some());
        assert!(world.character_by_id(1).await.is_some());
        assert!(world.character_name_exists("ALICE").await);

        world.detach_character("alice", 1).await;
        assert!(world.character_by_name("alice").await.is_none());
        // Name stays reserved even once offline.
        assert!(world.character_name_exists("alice").await);
    }

    #[tokio::test]
    async fn character_name_exists_is_seeded_from_persisted_characters_at_load() {
        let (_dir, ks) = temp_repo();
        let repo = Repository::new(&ks);
        repo.save_character(&character(1, "Bob")).unwrap();

        let world = World::load(&repo).unwrap();
        assert!(world.character_name_exists("bob").await);
        assert!(world.character_name_exists("BOB").await);
    }
}
