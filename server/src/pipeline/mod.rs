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

//! Tokenizer and dispatcher. A closed verb table maps a lowercased,
//! alias-resolved verb to its handler — a table insertion is how a new
//! verb is added, never reflection or eval.

pub mod movement;
pub mod verbs;

use crate::context::WorldContext;
use crate::error::CommandError;
use crate::model::{CharacterId, RoomId};
use crate::session::{LINE_TERMINATOR, PROMPT};
use crate::session::Session;
use crate::world::CharacterCell;
use std::sync::Arc;

/// Sends `message` to every online Character currently in `room_id`
/// except `exclude`, each followed by its own prompt: an idle
/// recipient sees the broadcast, then its prompt again. Locks are not
/// held across this call — callers release the room lock before
/// broadcasting, since locks are never held across channel sends that
/// could block.
pub(crate) async fn broadcast_to_room(context: &WorldContext, room_id: RoomId, exclude: CharacterId, message: &str) {
    let Some(room) = context.world.room(room_id).await else {
        return;
    };
    let occupants: Vec<CharacterId> = room.lock().await.characters.iter().copied().collect();
    for id in occupants {
        if id == exclude {
            continue;
        }
        if let Some(cell) = context.world.character_by_id(id).await {
            cell.send(format!("{LINE_TERMINATOR}{message}{LINE_TERMINATOR}{PROMPT}")).await;
        }
    }
}

/// Resolves a shortcut token to its canonical verb:
/// `"`/`'` -> say, `q!` -> quit, `i`/`inv` -> inventory, `get` -> take.
fn resolve_alias(verb: &str) -> &str {
    match verb {
        "\"" | "'" => "say",
        "q!" => "quit",
        "i" | "inv" => "inventory",
        "get" => "take",
        other => other,
    }
}

/// Tokenizes a line (trim, split on whitespace, first token lowercased
/// is the verb) and dispatches to the matching handler. Returns `true`
/// if the Session should terminate.
pub async fn dispatch(context: &WorldContext, me: &Arc<CharacterCell>, session: &Session, line: &str) -> bool {
    let trimmed = line.trim();
    let (verb_token, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (trimmed, ""),
    };
    // The quote-style say shortcuts have no space before the message.
    let (verb_token, rest) = if let Some(message) = trimmed.strip_prefix('"').or_else(|| trimmed.strip_prefix('\'')) {
        (&trimmed[..1], message.trim())
    } else {
        (verb_token, rest)
    };

    if verb_token.is_empty() {
        return false;
    }

    let verb = resolve_alias(&verb_token.to_lowercase()).to_string();
    let args: Vec<&str> = if rest.is_empty() { Vec::new() } else { rest.split_whitespace().collect() };

    match verb.as_str() {
        "help" => {
            verbs::help(session);
            false
        }
        "show" => {
            verbs::show(me, session).await;
            false
        }
        "look" => {
            verbs::look(context, me).await;
            false
        }
        "say" => {
            verbs::say(context, me, session, rest).await;
            false
        }
        "go" => {
            movement::go(context, me, session, args.first().copied().unwrap_or("")).await;
            false
        }
        "who" => {
            verbs::who(context, session).await;
            false
        }
        "password" => {
            verbs::password(context, me, session, &args).await;
            false
        }
        "take" => {
            verbs::take(context, me, rest).await;
            false
        }
        "drop" => {
            verbs::drop(context, me, rest).await;
            false
        }
        "wear" => {
            verbs::wear(context, me, rest).await;
            false
        }
        "remove" => {
            verbs::remove(context, me, rest).await;
            false
        }
        "examine" => {
            verbs::examine(context, me, session, rest).await;
            false
        }
        "inventory" => {
            verbs::inventory(context, me, session).await;
            false
        }
        "challenge" => {
            verbs::challenge(context, session, &args).await;
            false
        }
        "quit" => {
            verbs::quit(context, me).await;
            true
        }
        _ => {
            session.send_line_to_self(CommandError::UnknownVerb);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quote_shortcuts_resolve_to_say() {
        assert_eq!(resolve_alias("\""), "say");
        assert_eq!(resolve_alias("'"), "say");
    }

    #[test]
    fn other_shortcuts_resolve() {
        assert_eq!(resolve_alias("q!"), "quit");
        assert_eq!(resolve_alias("i"), "inventory");
        assert_eq!(resolve_alias("inv"), "inventory");
        assert_eq!(resolve_alias("get"), "take");
    }

    #[test]
    fn unmapped_verb_is_unchanged() {
        assert_eq!(resolve_alias("look"), "look");
    }
}
