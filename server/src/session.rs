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

//! Per-connection state machine: `AwaitAuth` -> `AwaitCharacterSelect`
//! -> `InGame` -> `Disposing` -> `Closed`.
//!
//! Two independent tasks, the input pump and the output pump, carry
//! bytes between the `Transport` and two channels (`input-line`,
//! `outbound`); the driver below reads and writes only those channels
//! and never touches the transport directly.

use crate::auth::Authenticator;
use crate::context::WorldContext;
use crate::error::CommandError;
use crate::model::{Character, CharacterId, Player, STARTING_ROOM_ID, VOID_ROOM_ID};
use crate::pipeline;
use crate::transport::{Transport, TransportReader, TransportWriter};
use crate::world::CharacterCell;
use std::sync::Arc;
use tokio::sync::mpsc;

pub const PROMPT: &str = "> ";
pub const LINE_TERMINATOR: &str = "\n\r";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitAuth,
    AwaitCharacterSelect,
    InGame,
    Disposing,
    Closed,
}

/// Console geometry reported by the transport's PTY/window-change
/// messages. Shared between the Session driver, which reads
/// it (e.g. for `who`'s column width), and the transport's reader half,
/// which updates it whenever a window-change notification arrives —
/// the two run on different tasks, hence the atomics rather than a
/// plain struct.
#[derive(Debug)]
pub struct ConsoleGeometry {
    width: std::sync::atomic::AtomicU32,
    height: std::sync::atomic::AtomicU32,
}

impl ConsoleGeometry {
    pub fn new(width: u32, height: u32) -> Self {
        ConsoleGeometry { width: std::sync::atomic::AtomicU32::new(width), height: std::sync::atomic::AtomicU32::new(height) }
    }

    pub fn set(&self, width: u32, height: u32) {
        self.width.store(width, std::sync::atomic::Ordering::Relaxed);
        self.height.store(height, std::sync::atomic::Ordering::Relaxed);
    }

    pub fn width(&self) -> u32 {
        self.width.load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn height(&self) -> u32 {
        self.height.load(std::sync::atomic::Ordering::Relaxed)
    }
}

impl Default for ConsoleGeometry {
    fn default() -> Self {
        let size = wyldlands_common::ConsoleSize::default();
        ConsoleGeometry::new(size.width, size.height)
    }
}

/// Runs the input pump: reads one byte at a time, applies line
/// buffering and echo, and posts complete lines to `lines`. Control
/// bytes other than CR/LF pass through unexamined.
pub async fn input_pump<R: TransportReader>(
    mut reader: R,
    lines: mpsc::UnboundedSender<String>,
    echo: Arc<std::sync::atomic::AtomicBool>,
    outbound: mpsc::UnboundedSender<String>,
) {
    let mut buffer = Vec::new();
    loop {
        match reader.read_byte().await {
            Ok(Some(byte)) => {
                if echo.load(std::sync::atomic::Ordering::Relaxed) {
                    let _ = outbound.send((byte as char).to_string());
                }
                match byte {
                    b'\r' | b'\n' => {
                        let line = String::from_utf8_lossy(&buffer).into_owned();
                        buffer.clear();
                        if lines.send(line).is_err() {
                            return;
                        }
                    }
                    _ => buffer.push(byte),
                }
            }
            Ok(None) => {
                tracing::debug!("input pump observed end of stream");
                return;
            }
            Err(error) => {
                tracing::warn!("input pump transport error: {error}");
                return;
            }
        }
    }
}

/// Runs the output pump: writes every queued string verbatim, with no
/// implicit terminator — it does not append line terminators.
pub async fn output_pump<W: TransportWriter>(mut writer: W, mut outbound: mpsc::UnboundedReceiver<String>) {
    while let Some(message) = outbound.recv().await {
        if let Err(error) = writer.write_all(message.as_bytes()).await {
            tracing::warn!("output pump transport error: {error}");
            return;
        }
    }
}

/// A live connection driven through the state machine. Holds no
/// transport reference of its own — only the channel ends the pumps
/// also hold. Handlers never touch the transport.
pub struct Session {
    pub login: String,
    state: SessionState,
    outbound: mpsc::UnboundedSender<String>,
    echo: Arc<std::sync::atomic::AtomicBool>,
    pub console: Arc<ConsoleGeometry>,
    character: Option<Arc<CharacterCell>>,
}

impl Session {
    pub fn new(login: impl Into<String>, outbound: mpsc::UnboundedSender<String>, echo: Arc<std::sync::atomic::AtomicBool>) -> Self {
        Self::with_console(login, outbound, echo, Arc::new(ConsoleGeometry::default()))
    }

    /// Builds a Session sharing a transport-owned `ConsoleGeometry`
    /// handle, so window-change notifications observed by the
    /// transport's reader half are visible here without a round trip
    /// through the command loop.
    pub fn with_console(
        login: impl Into<String>,
        outbound: mpsc::UnboundedSender<String>,
        echo: Arc<std::sync::atomic::AtomicBool>,
        console: Arc<ConsoleGeometry>,
    ) -> Self {
        Session { login: login.into(), state: SessionState::AwaitAuth, outbound, echo, console, character: None }
    }

    fn send(&self, message: impl Into<String>) {
        let _ = self.outbound.send(message.into());
    }

    fn send_line(&self, message: impl std::fmt::Display) {
        self.send(format!("{LINE_TERMINATOR}{message}{LINE_TERMINATOR}"));
    }

    fn prompt(&self) {
        self.send(PROMPT);
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Sends a message to this session alone, with no added
    /// terminator. Used by `crate::pipeline` verb handlers that need to
    /// address the issuing Character directly.
    pub(crate) fn send_to_self(&self, message: impl Into<String>) {
        self.send(message);
    }

    pub(crate) fn send_line_to_self(&self, message: impl std::fmt::Display) {
        self.send_line(message);
    }

    /// Drives the full connection lifecycle: auth, character select,
    /// the command loop, and disposal. `lines` yields completed input
    /// lines from the input pump; returns once the connection has been
    /// fully disposed.
    pub async fn run(
        mut self,
        context: Arc<WorldContext>,
        mut lines: mpsc::UnboundedReceiver<String>,
        password: String,
    ) {
        if self.authenticate(&context, &password).await.is_err() {
            self.send_line("Login incorrect.");
            self.state = SessionState::Closed;
            return;
        }

        let player = self.load_or_create_player(&context).await;

        self.state = SessionState::AwaitCharacterSelect;
        let character_id = match self.select_character(&context, &mut lines, &player).await {
            Some(id) => id,
            None => {
                self.state = SessionState::Closed;
                return;
            }
        };

        let cell = match context.world.character_by_id(character_id).await {
            Some(cell) => cell,
            None => {
                tracing::error!("character {character_id} vanished immediately after selection");
                self.state = SessionState::Closed;
                return;
            }
        };
        *cell.outbound.write().await = Some(self.outbound.clone());
        self.character = Some(cell.clone());

        self.state = SessionState::InGame;
        self.send_line(format!("Welcome, {}.", cell.lock().await.name));
        pipeline::verbs::look(&context, &cell).await;
        self.prompt();

        loop {
            let Some(line) = lines.recv().await else {
                break;
            };
            let terminate = pipeline::dispatch(&context, &cell, &self, &line).await;
            if terminate {
                break;
            }
            self.prompt();
        }

        self.dispose(&context, &cell).await;
        self.state = SessionState::Closed;
    }

    async fn authenticate(&self, context: &WorldContext, password: &str) -> Result<(), ()> {
        context.authenticator.verify(&self.login, password).await.map_err(|_| ())
    }

    async fn load_or_create_player(&self, context: &WorldContext) -> Player {
        let repo = context.repository();
        match repo.load_player(&self.login) {
            Ok(Some(player)) => player,
            _ => {
                let player = Player::new(self.login.clone());
                if let Err(error) = repo.save_player(&player) {
                    tracing::error!("failed to persist new player {}: {error}", self.login);
                }
                player
            }
        }
    }

    /// `AwaitCharacterSelect`: presents the Player's known characters
    /// plus "create new", then either loads an existing Character by id
    /// or runs the create flow. Returns `None` if the input stream
    /// closed before a selection completed.
    async fn select_character(
        &mut self,
        context: &Arc<WorldContext>,
        lines: &mut mpsc::UnboundedReceiver<String>,
        player: &Player,
    ) -> Option<CharacterId> {
        loop {
            self.send_line("Choose a character, or type 'new' to create one:");
            for name in player.characters.keys() {
                self.send_line(format!("  {name}"));
            }
            self.prompt();

            let line = lines.recv().await?;
            let choice = line.trim();

            if choice.eq_ignore_ascii_case("new") {
                if let Some(id) = self.create_character(context, lines, player).await {
                    return Some(id);
                }
                continue;
            }

            if let Some(&id) = player.characters.get(choice) {
                match self.load_existing_character(context, id).await {
                    Some(id) => return Some(id),
                    None => continue,
                }
            }

            self.send_line("No such character.");
        }
    }

    async fn load_existing_character(&self, context: &Arc<WorldContext>, id: CharacterId) -> Option<CharacterId> {
        let repo = context.repository();
        match repo.load_character(id) {
            Ok(Some(character)) => {
                let room_id = if context.world.room(character.room_id).await.is_some() {
                    character.room_id
                } else {
                    VOID_ROOM_ID
                };
                let mut character = character;
                character.room_id = room_id;
                self.attach(context, character).await;
                Some(id)
            }
            Ok(None) => {
                tracing::warn!("character {id} referenced by player but missing from keystore");
                None
            }
            Err(error) => {
                tracing::error!("failed to load character {id}: {error}");
                None
            }
        }
    }

    /// Prompts for a name (1-15 characters, not already taken
    /// case-insensitively) and, if any archetypes are loaded, an
    /// archetype, then creates and persists the Character.
    async fn create_character(
        &mut self,
        context: &Arc<WorldContext>,
        lines: &mut mpsc::UnboundedReceiver<String>,
        player: &Player,
    ) -> Option<CharacterId> {
        self.send_line("Name your character:");
        self.prompt();
        let name = lines.recv().await?.trim().to_string();

        if name.is_empty() || name.chars().count() > 15 {
            self.send_line(CommandError::InvalidCharacterName);
            return None;
        }
        if context.world.character_name_exists(&name).await {
            self.send_line(CommandError::CharacterNameTaken);
            return None;
        }

        let archetype = if context.world.archetypes.is_empty() {
            None
        } else {
            self.send_line("Choose an archetype:");
            for archetype_name in context.world.archetypes.keys() {
                self.send_line(format!("  {archetype_name}"));
            }
            self.prompt();
            let chosen = lines.recv().await?.trim().to_string();
            context.world.archetypes.get(&chosen).cloned()
        };

        let repo = context.repository();
        let id = match repo.next_character_id() {
            Ok(id) => id,
            Err(error) => {
                tracing::error!("failed to allocate character id: {error}");
                return None;
            }
        };

        let room_id = if context.world.room(STARTING_ROOM_ID).await.is_some() {
            STARTING_ROOM_ID
        } else {
            VOID_ROOM_ID
        };

        let character = Character {
            id,
            name: name.clone(),
            player_login: self.login.clone(),
            room_id,
            attributes: archetype.as_ref().map(|a| a.starting_attributes.clone()).unwrap_or_default(),
            abilities: archetype.as_ref().map(|a| a.starting_abilities.clone()).unwrap_or_default(),
            health: context.config.world.starting_health as f64,
            essence: context.config.world.starting_essence as f64,
            inventory: Default::default(),
        };

        context.world.reserve_character_name(&name).await;
        if let Err(error) = repo.save_character(&character) {
            tracing::error!("failed to persist new character {name}: {error}");
            return None;
        }

        let mut player = player.clone();
        player.characters.insert(name, id);
        if let Err(error) = repo.save_player(&player) {
            tracing::error!("failed to persist player {} after character creation: {error}", self.login);
        }

        self.attach(context, character).await;
        Some(id)
    }

    /// Places the Character in its room's set, registers it online,
    /// and persists it.
    async fn attach(&self, context: &WorldContext, character: Character) {
        let room_id = character.room_id;
        let id = character.id;
        let cell = Arc::new(CharacterCell::new(character));
        context.world.attach_character(cell.clone()).await;
        if let Some(room) = context.world.room(room_id).await {
            room.lock().await.characters.insert(id);
        }
        let repo = context.repository();
        let character = cell.lock().await;
        if let Err(error) = repo.save_character(&character) {
            tracing::error!("failed to persist character {} on attach: {error}", character.id);
        }
    }

    /// `Disposing`: removes the Character from its room's set and from
    /// `characters-online`, persists it, and stops delivering
    /// broadcasts. Runs on every exit path, including input error.
    async fn dispose(&mut self, context: &WorldContext, cell: &Arc<CharacterCell>) {
        self.state = SessionState::Disposing;
        *cell.outbound.write().await = None;

        let (room_id, lowercase_name, id) = {
            let character = cell.lock().await;
            (character.room_id, character.lowercase_name(), character.id)
        };
        if let Some(room) = context.world.room(room_id).await {
            room.lock().await.characters.remove(&id);
        }
        context.world.detach_character(&lowercase_name, id).await;

        let repo = context.repository();
        let character = cell.lock().await;
        if let Err(error) = repo.save_character(&character) {
            tracing::error!("failed to persist character {} on disconnect: {error}", character.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::BcryptAuthenticator;
    use crate::config::Configuration;
    use crate::keystore::Keystore;
    use crate::repository::Repository;
    use crate::world::World;

    fn test_config(dir: &tempfile::TempDir, data_path: &str) -> Configuration {
        let config_path = dir.path().join("config.yaml");
        std::fs::write(
            &config_path,
            format!("listener:\n  port: 6006\nworld:\n  data_file: \"{data_path}\"\n"),
        )
        .unwrap();
        Configuration::load(config_path.to_str().unwrap()).unwrap()
    }

    async fn test_context(dir: &tempfile::TempDir, authenticator: BcryptAuthenticator) -> Arc<WorldContext> {
        let path = dir.path().join("world.sled");
        let config = test_config(dir, path.to_str().unwrap());
        let keystore = Keystore::open(path.to_str().unwrap()).unwrap();
        let world = {
            let repo = Repository::new(&keystore);
            World::load(&repo).unwrap()
        };
        Arc::new(WorldContext::from_parts(keystore, world, Box::new(authenticator), config))
    }

    #[tokio::test]
    async fn new_session_starts_in_await_auth() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = Session::new("alice", tx, Arc::new(std::sync::atomic::AtomicBool::new(true)));
        assert_eq!(session.state(), SessionState::AwaitAuth);
    }

    #[tokio::test]
    async fn full_lifecycle_creates_a_character_and_disposes_on_disconnect() {
        let dir = tempfile::tempdir().unwrap();
        let authenticator = BcryptAuthenticator::new();
        authenticator.set_password("alice", "hunter2").await.unwrap();
        let context = test_context(&dir, authenticator).await;

        let (transport, mut client) = crate::transport::memory_channel_pair();
        let (reader, writer) = transport.split();
        let (lines_tx, lines_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let echo = Arc::new(std::sync::atomic::AtomicBool::new(true));

        tokio::spawn(input_pump(reader, lines_tx, echo.clone(), outbound_tx.clone()));
        tokio::spawn(output_pump(writer, outbound_rx));

        let session = Session::new("alice", outbound_tx, echo);

        let ctx = context.clone();
        let handle = tokio::spawn(async move {
            session.run(ctx, lines_rx, "hunter2".to_string()).await;
        });

        for line in ["new", "Alice", "look", "quit"] {
            for byte in line.bytes() {
                client.type_byte.send(byte).unwrap();
            }
            client.type_byte.send(b'\n').unwrap();
        }
        drop(client.type_byte);

        handle.await.unwrap();

        let mut transcript = Vec::new();
        while let Ok(byte) = client.read_byte.try_recv() {
            transcript.push(byte);
        }
        let transcript = String::from_utf8_lossy(&transcript);
        assert!(transcript.contains("Welcome"));
        assert!(context.world.character_name_exists("alice").await);
        assert!(context.world.character_by_name("alice").await.is_none());
    }
}
