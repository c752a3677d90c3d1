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

//! Domain entities: Room, Exit, Item, Item Prototype, Archetype, Player,
//! Character. Each type here is the in-memory shape; persisted record
//! shapes live alongside and are converted by `crate::repository`.

pub mod archetype;
pub mod character;
pub mod item;
pub mod player;
pub mod room;

pub use archetype::Archetype;
pub use character::{Character, CharacterId};
pub use item::{Item, ItemId};
pub use player::Player;
pub use room::{Exit, Room, RoomId};

/// The reserved room id used as a fallback target for dangling
/// references.
pub const VOID_ROOM_ID: RoomId = 0;

/// The room new characters start in, if present at load time.
pub const STARTING_ROOM_ID: RoomId = 1;
