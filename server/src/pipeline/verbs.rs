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

//! Verb handlers. Each operates on the issuing Character (`me`) and
//! its current Room (`here`); locks are held only for the span of a
//! single command, never across a broadcast send.
//!
//! The inventory map is dual-purpose: a held item is keyed by its own
//! name, a worn item by the wear-location it occupies. This module is
//! the single place that classifies and enforces that split —
//! `crate::model::character::Character` has no access to Item data and
//! cannot do it alone.

use super::broadcast_to_room;
use crate::challenge;
use crate::context::WorldContext;
use crate::error::CommandError;
use crate::model::{CharacterId, Item, ItemId};
use crate::session::Session;
use crate::world::CharacterCell;
use std::sync::Arc;

const HELP_TEXT: &str = "\
Commands: help, show, look, say <msg>, go <dir>, who, password <old> <new>,
take/get <item>, drop <item>, wear <item>, remove <item>, examine <item>,
inventory/i/inv, challenge <a> <b>, quit/q!";

pub fn help(session: &Session) {
    session.send_line_to_self(HELP_TEXT);
}

pub async fn show(me: &Arc<CharacterCell>, session: &Session) {
    let character = me.lock().await;
    let mut lines = vec![format!("{} -- health {:.0}, essence {:.0}", character.name, character.health, character.essence)];
    let mut attributes: Vec<_> = character.attributes.iter().collect();
    attributes.sort_by_key(|(name, _)| name.clone());
    for (name, score) in attributes {
        lines.push(format!("  {name}: {score:.0}"));
    }
    let mut abilities: Vec<_> = character.abilities.iter().filter(|(_, score)| **score >= 1.0).collect();
    abilities.sort_by_key(|(name, _)| name.clone());
    for (name, score) in abilities {
        lines.push(format!("  {name}: {score:.0}"));
    }
    session.send_line_to_self(lines.join("\n\r"));
}

/// `look`: title, description, sorted exits, other characters, and
/// the room's items.
pub async fn look(context: &WorldContext, me: &Arc<CharacterCell>) {
    let room_id = me.lock().await.room_id;
    let my_id = me.lock().await.id;
    let Some(room) = context.world.room(room_id).await else {
        return;
    };
    let room = room.lock().await;

    let mut lines = vec![room.title.clone(), room.description.clone()];

    let exits = room.visible_exits();
    if exits.is_empty() {
        lines.push("Exits: none".to_string());
    } else {
        let names: Vec<String> = exits.iter().map(|d| d.to_string()).collect();
        lines.push(format!("Exits: {}", names.join(", ")));
    }

    let mut other_names = Vec::new();
    for &id in &room.characters {
        if id == my_id {
            continue;
        }
        if let Some(cell) = context.world.character_by_id(id).await {
            other_names.push(cell.lock().await.name.clone());
        }
    }
    other_names.sort();
    if !other_names.is_empty() {
        lines.push(format!("Also here: {}", other_names.join(", ")));
    }

    let mut item_names = Vec::new();
    for item_id in &room.items {
        if let Ok(Some(item)) = context.world.item(&context.repository(), item_id).await {
            item_names.push(item.name);
        }
    }
    if !item_names.is_empty() {
        lines.push(format!("Items: {}", item_names.join(", ")));
    }

    me.send(format!("\n\r{}\n\r", lines.join("\n\r"))).await;
}

/// `say`: `"You say <msg>"` to self, `"<name> says <msg>"` to every
/// other occupant of `here`.
pub async fn say(context: &WorldContext, me: &Arc<CharacterCell>, session: &Session, message: &str) {
    if message.is_empty() {
        session.send_line_to_self(CommandError::MissingArgument("message"));
        return;
    }
    let (room_id, id, name) = {
        let character = me.lock().await;
        (character.room_id, character.id, character.name.clone())
    };
    session.send_line_to_self(format!("You say {message}"));
    broadcast_to_room(context, room_id, id, &format!("{name} says {message}")).await;
}

/// `who`: sorted online character names, column-formatted to the
/// session's console width, 17 columns wide, at least one column.
pub async fn who(context: &WorldContext, session: &Session) {
    const COLUMN_WIDTH: usize = 17;
    let names = context.world.online_character_names().await;
    let columns = (session.console.width() as usize / COLUMN_WIDTH).max(1);

    let mut lines = Vec::new();
    for row in names.chunks(columns) {
        let mut line = String::new();
        for name in row {
            line.push_str(&format!("{name:<width$}", width = COLUMN_WIDTH));
        }
        lines.push(line.trim_end().to_string());
    }
    session.send_line_to_self(lines.join("\n\r"));
}

pub async fn password(context: &WorldContext, me: &Arc<CharacterCell>, session: &Session, args: &[&str]) {
    let [old, new] = args else {
        session.send_line_to_self(CommandError::MissingArgument("old and new password"));
        return;
    };
    let login = me.lock().await.player_login.clone();
    match context.authenticator.change_password(&login, old, new).await {
        Ok(()) => session.send_line_to_self("Password changed."),
        Err(_) => session.send_line_to_self(CommandError::Rejected("password change rejected".to_string())),
    }
}

/// Matches `needle` case-insensitively as a substring of `item.name`.
fn name_matches(item: &Item, needle: &str) -> bool {
    item.name.to_lowercase().contains(&needle.to_lowercase())
}

/// `take`/`get`: first room item (pickupable, name substring match,
/// case-insensitive) moves to the inventory.
pub async fn take(context: &WorldContext, me: &Arc<CharacterCell>, item_name: &str) {
    if item_name.is_empty() {
        return;
    }
    let room_id = me.lock().await.room_id;
    let Some(room) = context.world.room(room_id).await else {
        return;
    };

    let repo = context.repository();
    let found = {
        let room = room.lock().await;
        let mut found = None;
        for item_id in &room.items {
            if let Ok(Some(item)) = context.world.item(&repo, item_id).await {
                if item.pickupable && name_matches(&item, item_name) {
                    found = Some(item);
                    break;
                }
            }
        }
        found
    };

    let Some(item) = found else {
        return;
    };

    room.lock().await.items.retain(|id| id != &item.id);
    let (name, id) = {
        let mut character = me.lock().await;
        character.inventory.insert(item.name.clone(), item.id.clone());
        (character.name.clone(), character.id)
    };
    context.world.put_item(item.clone()).await;
    if let Err(error) = repo.save_item(&item) {
        tracing::error!("failed to persist item {} after take: {error}", item.id);
    }
    broadcast_to_room(context, room_id, id, &format!("{name} picks up {}", item.name)).await;
}

/// `drop`: a held inventory entry (never a worn one) matching
/// `item_name` moves to the room.
pub async fn drop(context: &WorldContext, me: &Arc<CharacterCell>, item_name: &str) {
    if item_name.is_empty() {
        return;
    }
    let repo = context.repository();

    let held_match = {
        let character = me.lock().await;
        let mut found = None;
        for (key, item_id) in &character.inventory {
            if let Ok(Some(item)) = context.world.item(&repo, item_id).await {
                if !item.is_worn && name_matches(&item, item_name) {
                    found = Some((key.clone(), item));
                    break;
                }
            }
        }
        found
    };

    let Some((key, item)) = held_match else {
        return;
    };

    let (room_id, name, id) = {
        let mut character = me.lock().await;
        character.inventory.remove(&key);
        (character.room_id, character.name.clone(), character.id)
    };
    if let Some(room) = context.world.room(room_id).await {
        room.lock().await.items.push(item.id.clone());
    }
    if let Err(error) = repo.save_item(&item) {
        tracing::error!("failed to persist item {} after drop: {error}", item.id);
    }
    broadcast_to_room(context, room_id, id, &format!("{name} drops {}", item.name)).await;
}

/// `wear`: transitions a held item to worn, atomically — one entry
/// per wear-location replaces the single name-keyed entry, never
/// leaving the inventory in an intermediate shape.
pub async fn wear(context: &WorldContext, me: &Arc<CharacterCell>, item_name: &str) {
    if item_name.is_empty() {
        return;
    }
    let repo = context.repository();

    let held_match = {
        let character = me.lock().await;
        let mut found = None;
        for (key, item_id) in &character.inventory {
            if let Ok(Some(item)) = context.world.item(&repo, item_id).await {
                if !item.is_worn && name_matches(&item, item_name) {
                    found = Some((key.clone(), item));
                    break;
                }
            }
        }
        found
    };

    let Some((key, mut item)) = held_match else {
        return;
    };
    if !item.wearable || item.is_worn {
        return;
    }

    let (room_id, name, id) = {
        let character = me.lock().await;
        (character.room_id, character.name.clone(), character.id)
    };

    {
        let character = me.lock().await;
        if item.wear_locations.iter().any(|location| character.inventory.contains_key(location)) {
            return;
        }
    }

    item.is_worn = true;
    {
        let mut character = me.lock().await;
        character.inventory.remove(&key);
        for location in &item.wear_locations {
            character.inventory.insert(location.clone(), item.id.clone());
        }
    }
    context.world.put_item(item.clone()).await;
    if let Err(error) = repo.save_item(&item) {
        tracing::error!("failed to persist item {} after wear: {error}", item.id);
    }
    broadcast_to_room(context, room_id, id, &format!("{name} wears {}", item.name)).await;
}

/// `remove` (reverse of wear): accepts either the item's name or one
/// of its occupied wear-locations.
pub async fn remove(context: &WorldContext, me: &Arc<CharacterCell>, target: &str) {
    if target.is_empty() {
        return;
    }
    let repo = context.repository();

    let worn_match = {
        let character = me.lock().await;
        let mut found = None;
        if let Some(item_id) = character.inventory.get(target) {
            if let Ok(Some(item)) = context.world.item(&repo, item_id).await {
                if item.is_worn {
                    found = Some(item);
                }
            }
        }
        if found.is_none() {
            for item_id in character.inventory.values() {
                if let Ok(Some(item)) = context.world.item(&repo, item_id).await {
                    if item.is_worn && name_matches(&item, target) {
                        found = Some(item);
                        break;
                    }
                }
            }
        }
        found
    };

    let Some(mut item) = worn_match else {
        return;
    };

    let (room_id, name, id) = {
        let mut character = me.lock().await;
        for location in &item.wear_locations {
            character.inventory.remove(location);
        }
        item.is_worn = false;
        character.inventory.insert(item.name.clone(), item.id.clone());
        (character.room_id, character.name.clone(), character.id)
    };
    context.world.put_item(item.clone()).await;
    if let Err(error) = repo.save_item(&item) {
        tracing::error!("failed to persist item {} after remove: {error}", item.id);
    }
    broadcast_to_room(context, room_id, id, &format!("{name} removes {}", item.name)).await;
}

/// `examine`: inventory first, else the room's items; sends a
/// structured description.
pub async fn examine(context: &WorldContext, me: &Arc<CharacterCell>, session: &Session, item_name: &str) {
    if item_name.is_empty() {
        session.send_line_to_self(CommandError::MissingArgument("item"));
        return;
    }
    let repo = context.repository();

    let mut found = None;
    {
        let character = me.lock().await;
        for item_id in character.inventory.values() {
            if let Ok(Some(item)) = context.world.item(&repo, item_id).await {
                if name_matches(&item, item_name) {
                    found = Some(item);
                    break;
                }
            }
        }
    }
    if found.is_none() {
        let room_id = me.lock().await.room_id;
        if let Some(room) = context.world.room(room_id).await {
            let item_ids: Vec<ItemId> = room.lock().await.items.clone();
            for item_id in item_ids {
                if let Ok(Some(item)) = context.world.item(&repo, &item_id).await {
                    if name_matches(&item, item_name) {
                        found = Some(item);
                        break;
                    }
                }
            }
        }
    }

    let Some(item) = found else {
        session.send_line_to_self(CommandError::ItemNotFound);
        return;
    };

    let mut lines = vec![
        format!("{} ({})", item.name, item.id),
        item.description.clone(),
        format!("mass {:.2}, value {:.2}", item.mass, item.value),
    ];
    if item.stackable {
        lines.push(format!("stack {}/{}", item.quantity, item.maxstack));
    }
    if item.wearable {
        lines.push(format!("wearable at: {} (worn: {})", item.wear_locations.join(", "), item.is_worn));
    }
    if item.container {
        lines.push(format!("contains {} item(s)", item.contents.len()));
    }
    if !item.verbs.is_empty() {
        let mut verbs: Vec<_> = item.verbs.keys().collect();
        verbs.sort();
        lines.push(format!("verbs: {}", verbs.into_iter().cloned().collect::<Vec<_>>().join(", ")));
    }
    if !item.trait_mods.is_empty() {
        let mut mods: Vec<_> = item.trait_mods.iter().collect();
        mods.sort_by_key(|(name, _)| name.clone());
        let rendered: Vec<String> = mods.into_iter().map(|(name, value)| format!("{name} {value:+.1}")).collect();
        lines.push(format!("modifiers: {}", rendered.join(", ")));
    }
    if !item.metadata.is_empty() {
        let mut metadata: Vec<_> = item.metadata.iter().collect();
        metadata.sort_by_key(|(key, _)| key.clone());
        let rendered: Vec<String> = metadata.into_iter().map(|(key, value)| format!("{key}={value}")).collect();
        lines.push(format!("metadata: {}", rendered.join(", ")));
    }

    session.send_line_to_self(lines.join("\n\r"));
}

/// `inventory`/`i`/`inv`: held items and worn items with their
/// wear-locations.
pub async fn inventory(context: &WorldContext, me: &Arc<CharacterCell>, session: &Session) {
    let repo = context.repository();
    let entries: Vec<(String, ItemId)> = {
        let character = me.lock().await;
        character.inventory.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    };

    let mut held = Vec::new();
    let mut worn = Vec::new();
    for (key, item_id) in entries {
        if let Ok(Some(item)) = context.world.item(&repo, &item_id).await {
            if item.is_worn {
                worn.push(format!("{key}: {}", item.name));
            } else {
                held.push(item.name);
            }
        }
    }
    held.sort();
    worn.sort();

    let mut lines = Vec::new();
    lines.push(if held.is_empty() { "You are carrying nothing.".to_string() } else { format!("Carrying: {}", held.join(", ")) });
    lines.push(if worn.is_empty() { "You are wearing nothing.".to_string() } else { format!("Wearing: {}", worn.join(", ")) });
    session.send_line_to_self(lines.join("\n\r"));
}

/// `challenge`: draws and reports a stochastic outcome for `a` vs `b`.
pub async fn challenge(context: &WorldContext, session: &Session, args: &[&str]) {
    let [a, b] = args else {
        session.send_line_to_self(CommandError::MissingArgument("two scores"));
        return;
    };
    let (Ok(a), Ok(b)) = (a.parse::<f64>(), b.parse::<f64>()) else {
        session.send_line_to_self(CommandError::Rejected("scores must be numbers".to_string()));
        return;
    };
    let outcome = challenge::challenge(a, b, context.config.world.challenge_balance);
    session.send_line_to_self(format!("Challenge outcome: {outcome:.3}"));
}

/// `quit`/`q!`: goodbye to self, departure broadcast to the room,
/// signals the Session to terminate.
pub async fn quit(context: &WorldContext, me: &Arc<CharacterCell>) {
    let (room_id, name, id): (_, _, CharacterId) = {
        let character = me.lock().await;
        (character.room_id, character.name.clone(), character.id)
    };
    me.send(format!("\n\rGoodbye, {name}.\n\r")).await;
    broadcast_to_room(context, room_id, id, &format!("{name} has left the game")).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::BcryptAuthenticator;
    use crate::keystore::Keystore;
    use crate::model::{Character, Room};
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
            let room = Room { id: 1, area: "a".into(), title: "Room".into(), ..Default::default() };
            repo.save_room(&room).unwrap();
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

    fn character(id: u64, name: &str) -> Character {
        Character {
            id,
            name: name.to_string(),
            player_login: "login".into(),
            room_id: 1,
            attributes: HashMap::new(),
            abilities: HashMap::new(),
            health: 100.0,
            essence: 100.0,
            inventory: HashMap::new(),
        }
    }

    fn sample_item(id: ItemId, name: &str) -> Item {
        Item {
            id,
            name: name.to_string(),
            description: "a thing".to_string(),
            mass: 1.0,
            value: 1.0,
            stackable: false,
            quantity: 1,
            maxstack: 1,
            wearable: true,
            wear_locations: vec!["head".to_string()],
            verbs: HashMap::new(),
            overrides: HashMap::new(),
            trait_mods: HashMap::new(),
            container: false,
            contents: vec![],
            is_prototype: false,
            is_worn: false,
            pickupable: true,
            metadata: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn take_moves_item_from_room_to_inventory() {
        let (_dir, context) = test_context().await;
        let item_id = ItemId::Concrete(uuid::Uuid::new_v4());
        let item = sample_item(item_id.clone(), "a floppy hat");
        context.world.put_item(item.clone()).await;
        context.world.room(1).await.unwrap().lock().await.items.push(item_id.clone());

        let cell = Arc::new(CharacterCell::new(character(1, "Alice")));
        context.world.attach_character(cell.clone()).await;

        take(&context, &cell, "hat").await;

        let character = cell.lock().await;
        assert!(character.inventory.contains_key("a floppy hat"));
        assert!(!context.world.room(1).await.unwrap().lock().await.items.contains(&item_id));
    }

    #[tokio::test]
    async fn wear_then_remove_restores_prior_inventory_shape() {
        let (_dir, context) = test_context().await;
        let item_id = ItemId::Concrete(uuid::Uuid::new_v4());
        let item = sample_item(item_id.clone(), "hat");
        context.world.put_item(item.clone()).await;

        let cell = Arc::new(CharacterCell::new(character(1, "Alice")));
        context.world.attach_character(cell.clone()).await;
        cell.lock().await.inventory.insert("hat".to_string(), item_id.clone());

        wear(&context, &cell, "hat").await;
        {
            let character = cell.lock().await;
            assert!(!character.inventory.contains_key("hat"));
            assert_eq!(character.inventory.get("head"), Some(&item_id));
        }

        remove(&context, &cell, "hat").await;
        let character = cell.lock().await;
        assert_eq!(character.inventory.get("hat"), Some(&item_id));
        assert!(!character.inventory.contains_key("head"));
    }

    #[tokio::test]
    async fn quit_broadcasts_departure() {
        let (_dir, context) = test_context().await;
        let mover = Arc::new(CharacterCell::new(character(1, "Alice")));
        let bystander = Arc::new(CharacterCell::new(character(2, "Bob")));
        context.world.attach_character(mover.clone()).await;
        context.world.attach_character(bystander.clone()).await;
        context.world.room(1).await.unwrap().lock().await.characters.insert(1);
        context.world.room(1).await.unwrap().lock().await.characters.insert(2);

        let (tx, mut rx) = mpsc::unbounded_channel();
        *bystander.outbound.write().await = Some(tx);

        quit(&context, &mover).await;

        let mut saw_departure = false;
        while let Ok(message) = rx.try_recv() {
            if message.contains("has left the game") {
                saw_departure = true;
            }
        }
        assert!(saw_departure);
    }
}
