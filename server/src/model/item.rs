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

//! Items and item prototypes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// An item's identity is either a concrete 128-bit id (an instantiated
/// item) or a stable string prototype id. The two spaces are disjoint
/// by construction: concrete ids are freshly generated UUIDs, prototype
/// ids are author-assigned names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id")]
pub enum ItemId {
    Concrete(Uuid),
    Prototype(String),
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Concrete(id) => write!(f, "{id}"),
            ItemId::Prototype(name) => write!(f, "{name}"),
        }
    }
}

/// An item or item prototype. Concrete items and prototypes share a
/// shape; `is_prototype` distinguishes an immutable template (never
/// mutated online) from an instantiated, ownable item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub mass: f64,
    pub value: f64,
    pub stackable: bool,
    pub quantity: u32,
    pub maxstack: u32,
    pub wearable: bool,
    pub wear_locations: Vec<String>,
    pub verbs: HashMap<String, String>,
    pub overrides: HashMap<String, String>,
    pub trait_mods: HashMap<String, f64>,
    pub container: bool,
    pub contents: Vec<ItemId>,
    pub is_prototype: bool,
    pub is_worn: bool,
    pub pickupable: bool,
    pub metadata: HashMap<String, String>,
}

impl Item {
    /// Deep-copies a prototype into a fresh, concrete item: a new id,
    /// `is_prototype` cleared, `is_worn` cleared, and every contained
    /// prototype reference recursively instantiated too. Returns the
    /// new root item followed by
    /// every newly instantiated descendant, in an order where the
    /// descendants always precede nothing that depends on them — the
    /// repository persists each entry in order. Nested concrete
    /// contents (not themselves prototypes) are left untouched; they
    /// already have a stable id and owner elsewhere.
    pub fn instantiate_tree(&self, prototypes: &HashMap<String, Item>) -> Vec<Item> {
        let mut new_contents = Vec::with_capacity(self.contents.len());
        let mut flattened = Vec::new();

        for content_id in &self.contents {
            match content_id {
                ItemId::Prototype(name) => {
                    if let Some(proto) = prototypes.get(name) {
                        let tree = proto.instantiate_tree(prototypes);
                        new_contents.push(tree[0].id.clone());
                        flattened.extend(tree);
                    } else {
                        new_contents.push(content_id.clone());
                    }
                }
                ItemId::Concrete(_) => new_contents.push(content_id.clone()),
            }
        }

        let root = Item {
            id: ItemId::Concrete(Uuid::new_v4()),
            is_prototype: false,
            is_worn: false,
            contents: new_contents,
            ..self.clone()
        };

        let mut result = vec![root];
        result.extend(flattened);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prototype(name: &str) -> Item {
        Item {
            id: ItemId::Prototype(name.to_string()),
            name: name.to_string(),
            description: String::new(),
            mass: 1.0,
            value: 0.0,
            stackable: false,
            quantity: 1,
            maxstack: 1,
            wearable: false,
            wear_locations: vec![],
            verbs: HashMap::new(),
            overrides: HashMap::new(),
            trait_mods: HashMap::new(),
            container: false,
            contents: vec![],
            is_prototype: true,
            is_worn: false,
            pickupable: true,
            metadata: HashMap::new(),
        }
    }

    #[test]
    fn instantiate_allocates_fresh_concrete_id_and_clears_prototype_flag() {
        let proto = prototype("hat");
        let tree = proto.instantiate_tree(&HashMap::new());
        let item = &tree[0];
        assert!(!item.is_prototype);
        assert!(!item.is_worn);
        assert!(matches!(item.id, ItemId::Concrete(_)));
        assert_ne!(item.id, proto.id);
    }

    #[test]
    fn instantiate_recursively_expands_contained_prototypes() {
        let mut prototypes = HashMap::new();
        let coin = prototype("coin");
        prototypes.insert("coin".to_string(), coin);

        let mut bag = prototype("bag");
        bag.container = true;
        bag.contents.push(ItemId::Prototype("coin".to_string()));

        let tree = bag.instantiate_tree(&prototypes);
        // root bag + one instantiated coin
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].contents.len(), 1);
        assert!(matches!(tree[0].contents[0], ItemId::Concrete(_)));
        assert_eq!(tree[0].contents[0], tree[1].id);
    }
}
