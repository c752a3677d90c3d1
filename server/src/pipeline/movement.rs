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

//! The `go` verb and the movement protocol: a Character is never
//! simultaneously absent from both rooms nor present in both, and the
//! two room locks involved are acquired sequentially, never nested, so
//! two characters swapping rooms can never deadlock.

use super::broadcast_to_room;
use crate::context::WorldContext;
use crate::error::CommandError;
use crate::session::Session;
use crate::world::CharacterCell;
use std::str::FromStr;
use std::sync::Arc;
use wyldlands_common::Direction;

pub async fn go(context: &WorldContext, me: &Arc<CharacterCell>, session: &Session, direction_token: &str) {
    if direction_token.is_empty() {
        session.send_line_to_self(CommandError::MissingArgument("direction"));
        return;
    }
    let Ok(direction) = Direction::from_str(direction_token) else {
        session.send_line_to_self(CommandError::DirectionBlocked);
        return;
    };

    // Step 1: acquire the Character's own lock.
    let mut character = me.lock().await;
    let here_id = character.room_id;

    // Step 2: resolve the exit in `here`; if missing or the target is
    // invalid, report and release (the MutexGuard drops at scope end).
    let target_id = {
        let Some(here) = context.world.room(here_id).await else {
            session.send_line_to_self(CommandError::DirectionBlocked);
            return;
        };
        let here = here.lock().await;
        match here.exits.get(&direction) {
            Some(exit) => exit.target_room,
            None => {
                session.send_line_to_self(CommandError::DirectionBlocked);
                return;
            }
        }
    };
    if context.world.room(target_id).await.is_none() {
        session.send_line_to_self(CommandError::DirectionBlocked);
        return;
    }

    let name = character.name.clone();
    let id = character.id;

    // Step 3: acquire `here`'s lock, remove the Character, release,
    // then broadcast the departure.
    if let Some(here) = context.world.room(here_id).await {
        here.lock().await.characters.remove(&id);
    }
    broadcast_to_room(context, here_id, id, &format!("{name} has left going {direction}.")).await;

    // Step 4: acquire `target`'s lock, insert the Character, release,
    // then broadcast the arrival.
    if let Some(target) = context.world.room(target_id).await {
        target.lock().await.characters.insert(id);
    }
    broadcast_to_room(context, target_id, id, &format!("{name} has arrived.")).await;

    // Step 5: update the Character's room reference.
    character.room_id = target_id;

    // Step 6: release the Character's lock (end of scope).
    drop(character);

    // Step 7: execute `look` for the mover.
    super::verbs::look(context, me).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::BcryptAuthenticator;
    use crate::keystore::Keystore;
    use crate::model::{Character, Exit, Room};
    use crate::repository::Repository;
    use crate::world::World;
    use std::collections::HashMap;
    use tokio::sync::mpsc;

    async fn test_context() -> (tempfile::TempDir, Arc<WorldContext>) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.sled");
        let keystore = Keystore::open(path.to_str().unwrap()).unwrap();

        {
            let repo = Repository::new(&keystore);
            let mut room_a = Room { id: 1, area: "a".into(), title: "Room A".into(), ..Default::default() };
            room_a.exits.insert(Direction::North, Exit { target_room: 2, visible: true });
            repo.save_room(&room_a).unwrap();
            let room_b = Room { id: 2, area: "a".into(), title: "Room B".into(), ..Default::default() };
            repo.save_room(&room_b).unwrap();
        }

        let config_path = dir.path().join("config.yaml");
        std::fs::write(
            &config_path,
            format!("listener:\n  port: 6006\nworld:\n  data_file: \"{}\"\n", path.to_str().unwrap()),
        )
        .unwrap();
        let config = crate::config::Configuration::load(config_path.to_str().unwrap()).unwrap();

        let world = {
            let repo = Repository::new(&keystore);
            World::load(&repo).unwrap()
        };
        let context = Arc::new(WorldContext::from_parts(keystore, world, Box::new(BcryptAuthenticator::new()), config));
        (dir, context)
    }

    fn character(id: u64, name: &str, room_id: i64) -> Character {
        Character {
            id,
            name: name.to_string(),
            player_login: "login".into(),
            room_id,
            attributes: HashMap::new(),
            abilities: HashMap::new(),
            health: 100.0,
            essence: 100.0,
            inventory: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn go_moves_character_between_rooms_and_updates_room_sets() {
        let (_dir, context) = test_context().await;
        let cell = Arc::new(CharacterCell::new(character(1, "Alice", 1)));
        context.world.attach_character(cell.clone()).await;
        context.world.room(1).await.unwrap().lock().await.characters.insert(1);

        let (tx, _rx) = mpsc::unbounded_channel();
        let session = Session::new("alice", tx, Arc::new(std::sync::atomic::AtomicBool::new(true)));

        go(&context, &cell, &session, "north").await;

        assert_eq!(cell.lock().await.room_id, 2);
        assert!(!context.world.room(1).await.unwrap().lock().await.characters.contains(&1));
        assert!(context.world.room(2).await.unwrap().lock().await.characters.contains(&1));
    }

    #[tokio::test]
    async fn go_blocked_direction_leaves_room_sets_untouched() {
        let (_dir, context) = test_context().await;
        let cell = Arc::new(CharacterCell::new(character(1, "Alice", 1)));
        context.world.attach_character(cell.clone()).await;
        context.world.room(1).await.unwrap().lock().await.characters.insert(1);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = Session::new("alice", tx, Arc::new(std::sync::atomic::AtomicBool::new(true)));

        go(&context, &cell, &session, "south").await;

        assert_eq!(cell.lock().await.room_id, 1);
        assert!(context.world.room(1).await.unwrap().lock().await.characters.contains(&1));
        let mut saw_blocked = false;
        while let Ok(message) = rx.try_recv() {
            if message.contains("cannot go that way") {
                saw_blocked = true;
            }
        }
        assert!(saw_blocked);
    }
}
