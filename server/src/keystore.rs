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

//! Thin transactional key/value facade over an embedded B-tree store.
//! `sled` supplies the on-disk B-tree; this module supplies the bucket
//! vocabulary, the `nextSequence` id generator, and `view`/`update`
//! transactions that are guaranteed to release their write lock on
//! every exit path.

use crate::error::KeystoreError;
use std::collections::HashMap;
use std::sync::Mutex;

/// A namespace within the keystore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Players,
    Characters,
    Rooms,
    Exits,
    Items,
    ItemPrototypes,
    Archetypes,
    Motd,
}

impl Bucket {
    const ALL: [Bucket; 8] = [
        Bucket::Players,
        Bucket::Characters,
        Bucket::Rooms,
        Bucket::Exits,
        Bucket::Items,
        Bucket::ItemPrototypes,
        Bucket::Archetypes,
        Bucket::Motd,
    ];

    fn tree_name(&self) -> &'static str {
        match self {
            Bucket::Players => "Players",
            Bucket::Characters => "Characters",
            Bucket::Rooms => "Rooms",
            Bucket::Exits => "Exits",
            Bucket::Items => "Items",
            Bucket::ItemPrototypes => "ItemPrototypes",
            Bucket::Archetypes => "Archetypes",
            Bucket::Motd => "MOTD",
        }
    }
}

/// The embedded key/value store. Concurrent readers are lock-free
/// (sled trees are internally synchronized); writers are serialized by
/// `write_lock`, held for the duration of a single `update` call.
pub struct Keystore {
    db: sled::Db,
    trees: HashMap<Bucket, sled::Tree>,
    sequences: sled::Tree,
    write_lock: Mutex<()>,
}

impl Keystore {
    /// Opens (creating if absent) the keystore file at `path`.
    pub fn open(path: &str) -> Result<Keystore, KeystoreError> {
        let db = sled::open(path)?;
        let mut trees = HashMap::new();
        for bucket in Bucket::ALL {
            trees.insert(bucket, db.open_tree(bucket.tree_name())?);
        }
        let sequences = db.open_tree("_sequences")?;
        Ok(Keystore {
            db,
            trees,
            sequences,
            write_lock: Mutex::new(()),
        })
    }

    fn tree(&self, bucket: Bucket) -> &sled::Tree {
        self.trees.get(&bucket).expect("every bucket has a tree")
    }

    pub fn get(&self, bucket: Bucket, key: &[u8]) -> Result<Option<Vec<u8>>, KeystoreError> {
        Ok(self.tree(bucket).get(key)?.map(|ivec| ivec.to_vec()))
    }

    pub fn put(&self, bucket: Bucket, key: &[u8], value: &[u8]) -> Result<(), KeystoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.tree(bucket).insert(key, value)?;
        Ok(())
    }

    pub fn delete(&self, bucket: Bucket, key: &[u8]) -> Result<(), KeystoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.tree(bucket).remove(key)?;
        Ok(())
    }

    /// Every `(key, value)` pair currently in `bucket`.
    pub fn iter(&self, bucket: Bucket) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KeystoreError> {
        let mut out = Vec::new();
        for entry in self.tree(bucket).iter() {
            let (key, value) = entry?;
            out.push((key.to_vec(), value.to_vec()));
        }
        Ok(out)
    }

    /// A monotonically increasing id scoped to `bucket`; ids are never
    /// reused within a run.
    pub fn next_sequence(&self, bucket: Bucket) -> Result<u64, KeystoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let key = bucket.tree_name().as_bytes();
        let next = self.sequences.fetch_and_update(key, |old| {
            let current = old
                .and_then(|bytes| bytes.try_into().ok())
                .map(u64::from_be_bytes)
                .unwrap_or(0);
            Some((current + 1).to_be_bytes().to_vec())
        })?;
        let current = next
            .and_then(|bytes| bytes.as_ref().try_into().ok())
            .map(u64::from_be_bytes)
            .unwrap_or(0);
        Ok(current + 1)
    }

    /// A read-only scoped view. Reads observe whatever has already been
    /// committed; sled trees are internally consistent so no external
    /// lock is required for readers.
    pub fn view<F, T>(&self, f: F) -> Result<T, KeystoreError>
    where
        F: FnOnce(&Keystore) -> Result<T, KeystoreError>,
    {
        f(self)
    }

    /// A scoped read/write transaction. The write lock is held for the
    /// duration of `f` via `write_lock`'s guard and is released on
    /// every exit path including an early return or a panic unwind,
    /// because the guard's drop is unconditional. Writes made with
    /// `put`/`delete` inside `f` take effect immediately per bucket
    /// tree; `update` does not attempt cross-bucket atomicity beyond
    /// what a single sled tree already guarantees for one
    /// `insert`/`remove` call.
    pub fn update<F, T>(&self, f: F) -> Result<T, KeystoreError>
    where
        F: FnOnce(&Keystore) -> Result<T, KeystoreError>,
    {
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(self)
    }

    /// Flushes to disk. Called on graceful shutdown; the `Db` also
    /// flushes when dropped.
    pub fn flush(&self) -> Result<(), KeystoreError> {
        self.db.flush()?;
        Ok(())
    }
}
