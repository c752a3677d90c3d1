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

//! Command-line arguments and the configuration file shape. The
//! `Configuration` type this produces is what the core needs to open
//! the keystore, size the autosave loop, and seed new characters.

use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_env_field::EnvField;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Arguments {
    #[arg(short = 'c', long = "config", help = "Path to configuration file", default_value = "config.yaml")]
    pub config_file: String,

    #[arg(short = 'e', long = "env", help = "Path to environment file", default_value = ".env")]
    pub env_file: Option<String>,
}

impl Default for Arguments {
    fn default() -> Self {
        Self {
            config_file: "config.yaml".to_string(),
            env_file: Some(".env".to_string()),
        }
    }
}

/// The world server's configuration: listening port, data-file path,
/// autosave interval, starting health/essence, challenge balance, and
/// opaque authenticator parameters.
#[derive(Debug, Serialize, Deserialize)]
pub struct Configuration {
    pub listener: ListenerConfig,
    pub world: WorldConfig,
    #[serde(default)]
    pub authenticator: AuthenticatorConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListenerConfig {
    pub port: EnvField<u16>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WorldConfig {
    pub data_file: EnvField<String>,
    #[serde(default = "default_autosave_interval_minutes")]
    pub autosave_interval_minutes: u16,
    #[serde(default = "default_starting_health")]
    pub starting_health: u16,
    #[serde(default = "default_starting_essence")]
    pub starting_essence: u16,
    #[serde(default = "default_challenge_balance")]
    pub challenge_balance: f64,
}

/// Opaque parameters handed to whatever `Authenticator` the deployment
/// wires up; the core never interprets these.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthenticatorConfig(pub std::collections::BTreeMap<String, String>);

fn default_autosave_interval_minutes() -> u16 {
    5
}

fn default_starting_health() -> u16 {
    100
}

fn default_starting_essence() -> u16 {
    100
}

fn default_challenge_balance() -> f64 {
    10.0
}

impl Configuration {
    pub fn load(path: &str) -> Result<Configuration, String> {
        let file = std::fs::File::open(path).map_err(|e| format!("failed to open config file: {e}"))?;
        let config: Configuration = serde_yaml::from_reader(file).map_err(|e| format!("failed to parse config file: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.world.challenge_balance <= 0.0 {
            return Err("world.challenge_balance must be positive".to_string());
        }
        if self.world.autosave_interval_minutes == 0 {
            return Err("world.autosave_interval_minutes must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arguments_default_to_config_yaml() {
        let args = Arguments::default();
        assert_eq!(args.config_file, "config.yaml");
    }

    #[test]
    fn load_missing_file_is_an_error() {
        assert!(Configuration::load("does-not-exist.yaml").is_err());
    }

    #[test]
    fn load_parses_a_minimal_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "listener:\n  port: 6006\nworld:\n  data_file: \"world.sled\"\n",
        )
        .unwrap();

        let config = Configuration::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.world.autosave_interval_minutes, 5);
        assert_eq!(config.world.starting_health, 100);
        assert_eq!(config.world.challenge_balance, 10.0);
    }

    #[test]
    fn load_rejects_nonpositive_challenge_balance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "listener:\n  port: 6006\nworld:\n  data_file: \"world.sled\"\n  challenge_balance: 0\n",
        )
        .unwrap();

        assert!(Configuration::load(path.to_str().unwrap()).is_err());
    }
}
