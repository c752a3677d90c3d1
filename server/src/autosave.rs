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

//! Periodic flush of in-memory state to the Keystore. Sleeps for the
//! configured interval, then writes every online Character, every
//! Room, and every cached Item through the Repository. Each phase is
//! independent; a single entity's failure is logged and the loop
//! proceeds. Runs for the lifetime of the process; there is no
//! shutdown hook.

use crate::context::WorldContext;
use std::sync::Arc;
use std::time::Duration;

pub async fn run(context: Arc<WorldContext>) {
    let interval = Duration::from_secs(context.config.world.autosave_interval_minutes as u64 * 60);
    loop {
        tokio::time::sleep(interval).await;
        save_once(&context).await;
    }
}

/// A single autosave pass, factored out so it can be driven directly
/// by tests without waiting on a real sleep.
pub async fn save_once(context: &WorldContext) {
    let repo = context.repository();

    for cell in context.world.online_characters().await {
        let character = cell.lock().await;
        if let Err(error) = repo.save_character(&character) {
            tracing::error!("autosave: failed to persist character {}: {error}", character.id);
        }
    }

    for room in context.world.all_rooms().await {
        let room = room.lock().await;
        if let Err(error) = repo.save_room(&room) {
            tracing::error!("autosave: failed to persist room {}: {error}", room.id);
        }
    }

    for item in context.world.all_cached_items().await {
        if let Err(error) = repo.save_item(&item) {
            tracing::error!("autosave: failed to persist item {}: {error}", item.id);
        }
    }

    if let Err(error) = context.flush() {
        tracing::error!("autosave: failed to flush keystore: {error}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::BcryptAuthenticator;
    use crate::keystore::Keystore;
    use crate::model::{Character, Room};
    use crate::repository::Repository;
    use crate::world::{CharacterCell, World};
    use std::collections::HashMap;

    async fn test_context(dir: &tempfile::TempDir) -> Arc<WorldContext> {
        let path = dir.path().join("world.sled");
        let config_path = dir.path().join("config.yaml");
        std::fs::write(
            &config_path,
            format!("listener:\n  port: 6006\nworld:\n  data_file: \"{}\"\n", path.to_str().unwrap()),
        )
        .unwrap();
        let config = crate::config::Configuration::load(config_path.to_str().unwrap()).unwrap();
        let keystore = Keystore::open(path.to_str().unwrap()).unwrap();
        let world = {
            let repo = Repository::new(&keystore);
            World::load(&repo).unwrap()
        };
        Arc::new(WorldContext::from_parts(keystore, world, Box::new(BcryptAuthenticator::new()), config))
    }

    #[tokio::test]
    async fn save_once_persists_online_characters() {
        let dir = tempfile::tempdir().unwrap();
        let context = test_context(&dir).await;

        let cell = Arc::new(CharacterCell::new(Character {
            id: 1,
            name: "Alice".to_string(),
            player_login: "alice".to_string(),
            room_id: 0,
            attributes: HashMap::new(),
            abilities: HashMap::new(),
            health: 100.0,
            essence: 100.0,
            inventory: HashMap::new(),
        }));
        context.world.attach_character(cell).await;

        save_once(&context).await;

        let repo = context.repository();
        let loaded = repo.load_character(1).unwrap().unwrap();
        assert_eq!(loaded.name, "Alice");
    }

    #[tokio::test]
    async fn save_once_persists_rooms() {
        let dir = tempfile::tempdir().unwrap();
        let context = test_context(&dir).await;
        {
            let room = context.world.room(0).await.unwrap();
            room.lock().await.description = "edited".to_string();
        }

        save_once(&context).await;

        let repo = context.repository();
        let rooms = repo.load_rooms().unwrap();
        assert_eq!(rooms[&0].description, "edited");
    }
}
