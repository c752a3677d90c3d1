//
// Copyright 2025 Hans W. Uhlig. All Rights Reserved.
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

//! Wyldlands Common Types
//!
//! Types shared across the transport/core boundary: the gateway crate
//! (telnet transport, process entrypoint) and the server crate (the
//! session and world engine) both depend on this crate so neither has to
//! guess at the other's vocabulary for directions and console geometry.

pub mod direction;

pub use direction::Direction;

/// Terminal geometry carried by a PTY request or window-change
/// notification: two big-endian 32-bit integers on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ConsoleSize {
    fn default() -> Self {
        Self { width: 80, height: 24 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_size_default_is_80x24() {
        let size = ConsoleSize::default();
        assert_eq!(size.width, 80);
        assert_eq!(size.height, 24);
    }
}
