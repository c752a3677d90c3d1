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

//! End-to-end coverage of a connection's full lifetime against the
//! crate's public surface only: configuration loading, the bundled
//! `BcryptAuthenticator`, and `Session::run` fed through the same
//! channel shapes a real `Transport` would use.

use std::sync::Arc;
use wyldlands_server::auth::{Authenticator, BcryptAuthenticator};
use wyldlands_server::config::Configuration;
use wyldlands_server::context::WorldContext;
use wyldlands_server::repository::Repository;
use wyldlands_server::session::Session;

fn load_config(dir: &tempfile::TempDir) -> Configuration {
    let data_path = dir.path().join("world.sled");
    let config_path = dir.path().join("config.yaml");
    std::fs::write(
        &config_path,
        format!("listener:\n  port: 6006\nworld:\n  data_file: \"{}\"\n  autosave_interval_minutes: 1\n", data_path.to_str().unwrap()),
    )
    .unwrap();
    Configuration::load(config_path.to_str().unwrap()).unwrap()
}

#[tokio::test]
async fn a_new_login_creates_a_player_and_character_that_survive_reload() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config(&dir);
    let data_file = config.world.data_file.as_ref().to_string();

    let authenticator = BcryptAuthenticator::new();
    authenticator.set_password("trudy", "correct horse").await.unwrap();

    let context = Arc::new(WorldContext::open(config, Box::new(authenticator)).unwrap());

    let (outbound_tx, mut outbound_rx) = tokio::sync::mpsc::unbounded_channel();
    let (lines_tx, lines_rx) = tokio::sync::mpsc::unbounded_channel();
    let echo = Arc::new(std::sync::atomic::AtomicBool::new(true));
    let session = Session::new("trudy", outbound_tx, echo);

    let driver = tokio::spawn(session.run(context.clone(), lines_rx, "correct horse".to_string()));

    lines_tx.send("new".to_string()).unwrap();
    lines_tx.send("Trudy".to_string()).unwrap();
    lines_tx.send("look".to_string()).unwrap();
    lines_tx.send("quit".to_string()).unwrap();
    drop(lines_tx);

    driver.await.unwrap();

    let mut transcript = String::new();
    while let Ok(chunk) = outbound_rx.try_recv() {
        transcript.push_str(&chunk);
    }
    assert!(transcript.contains("Welcome, Trudy."));
    assert!(transcript.contains("has left the game"));

    // Reopen the keystore the way a restarted process would and confirm
    // the character and player record both persisted.
    let keystore = wyldlands_server::keystore::Keystore::open(&data_file).unwrap();
    let repo = Repository::new(&keystore);
    let player = repo.load_player("trudy").unwrap().unwrap();
    let character_id = *player.characters.get("Trudy").unwrap();
    let character = repo.load_character(character_id).unwrap().unwrap();
    assert_eq!(character.name, "Trudy");
    assert_eq!(character.player_login, "trudy");
}

#[tokio::test]
async fn wrong_password_closes_the_connection_without_creating_a_player() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config(&dir);
    let authenticator = BcryptAuthenticator::new();
    authenticator.set_password("trudy", "correct horse").await.unwrap();
    let context = Arc::new(WorldContext::open(config, Box::new(authenticator)).unwrap());

    let (outbound_tx, mut outbound_rx) = tokio::sync::mpsc::unbounded_channel();
    let (_lines_tx, lines_rx) = tokio::sync::mpsc::unbounded_channel();
    let echo = Arc::new(std::sync::atomic::AtomicBool::new(true));
    let session = Session::new("trudy", outbound_tx, echo);

    session.run(context.clone(), lines_rx, "wrong password".to_string()).await;

    let mut transcript = String::new();
    while let Ok(chunk) = outbound_rx.try_recv() {
        transcript.push_str(&chunk);
    }
    assert!(transcript.contains("Login incorrect."));

    let repo = context.repository();
    assert!(repo.load_player("trudy").unwrap().is_none());
}
