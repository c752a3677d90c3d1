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

//! The engine's composition root: bundles the Keystore, World State,
//! Authenticator and Configuration that every Session and pipeline
//! handler needs, behind a single `Arc` the caller passes down instead
//! of reaching for a process-wide singleton.

use crate::auth::Authenticator;
use crate::config::Configuration;
use crate::error::RepositoryError;
use crate::keystore::Keystore;
use crate::repository::Repository;
use crate::world::World;

pub struct WorldContext {
    keystore: Keystore,
    pub world: World,
    pub authenticator: Box<dyn Authenticator>,
    pub config: Configuration,
}

impl WorldContext {
    pub fn open(config: Configuration, authenticator: Box<dyn Authenticator>) -> Result<WorldContext, RepositoryError> {
        let keystore = Keystore::open(config.world.data_file.as_ref())?;
        let world = {
            let repo = Repository::new(&keystore);
            World::load(&repo)?
        };
        Ok(WorldContext { keystore, world, authenticator, config })
    }

    pub fn repository(&self) -> Repository<'_> {
        Repository::new(&self.keystore)
    }

    /// Assembles a `WorldContext` from already-constructed parts,
    /// bypassing `open`'s file I/O. Used by other modules' test suites
    /// that need a context wired to a pre-populated `Keystore`/`World`.
    #[cfg(test)]
    pub(crate) fn from_parts(
        keystore: Keystore,
        world: World,
        authenticator: Box<dyn Authenticator>,
        config: Configuration,
    ) -> Self {
        WorldContext { keystore, world, authenticator, config }
    }

    pub fn flush(&self) -> Result<(), RepositoryError> {
        self.keystore.flush()?;
        Ok(())
    }
}
