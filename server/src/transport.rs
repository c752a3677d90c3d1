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

//! The abstract byte-stream channel the core consumes: the real
//! terminal/SSH transport — host key loading, channel negotiation,
//! PTY requests — is out of scope and lives in `wyldlands-gateway`. The
//! `Transport` trait is the seam; `MemoryTransport` below is a test
//! double standing in for it in this crate's own tests.

use async_trait::async_trait;

/// The read half of a connection: one byte at a time, so the input
/// pump can apply its own echo and line-buffering policy.
#[async_trait]
pub trait TransportReader: Send {
    /// Returns `Ok(Some(byte))` for a byte, `Ok(None)` on graceful
    /// end-of-stream, or `Err` on a transport failure.
    async fn read_byte(&mut self) -> std::io::Result<Option<u8>>;
}

/// The write half of a connection: raw bytes out, no implicit framing
/// — the pump does not append line terminators.
#[async_trait]
pub trait TransportWriter: Send {
    async fn write_all(&mut self, data: &[u8]) -> std::io::Result<()>;
}

/// A connected channel that can be split into independent read/write
/// halves so the input and output pumps can run as separate tasks.
pub trait Transport: Send {
    type Reader: TransportReader + Send + 'static;
    type Writer: TransportWriter + Send + 'static;

    fn split(self) -> (Self::Reader, Self::Writer);
}

/// An in-process channel backed by `tokio::sync::mpsc`, used by this
/// crate's own tests to drive a `Session` without a real socket.
pub struct MemoryTransport {
    /// Bytes the simulated client typed, waiting to be read by the
    /// session's input pump.
    inbound: tokio::sync::mpsc::UnboundedReceiver<u8>,
    /// Bytes the session writes, delivered to the simulated client.
    outbound: tokio::sync::mpsc::UnboundedSender<u8>,
}

/// The other end of a `MemoryTransport`, held by the test driving a
/// simulated client.
pub struct MemoryClient {
    pub type_byte: tokio::sync::mpsc::UnboundedSender<u8>,
    pub read_byte: tokio::sync::mpsc::UnboundedReceiver<u8>,
}

pub fn memory_channel_pair() -> (MemoryTransport, MemoryClient) {
    let (client_types_tx, client_types_rx) = tokio::sync::mpsc::unbounded_channel();
    let (session_writes_tx, session_writes_rx) = tokio::sync::mpsc::unbounded_channel();
    (
        MemoryTransport { inbound: client_types_rx, outbound: session_writes_tx },
        MemoryClient { type_byte: client_types_tx, read_byte: session_writes_rx },
    )
}

pub struct MemoryReader(tokio::sync::mpsc::UnboundedReceiver<u8>);
pub struct MemoryWriter(tokio::sync::mpsc::UnboundedSender<u8>);

#[async_trait]
impl TransportReader for MemoryReader {
    async fn read_byte(&mut self) -> std::io::Result<Option<u8>> {
        Ok(self.0.recv().await)
    }
}

#[async_trait]
impl TransportWriter for MemoryWriter {
    async fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
        for byte in data {
            self.0
                .send(*byte)
                .map_err(|_| std::io::Error::from(std::io::ErrorKind::BrokenPipe))?;
        }
        Ok(())
    }
}

impl Transport for MemoryTransport {
    type Reader = MemoryReader;
    type Writer = MemoryWriter;

    fn split(self) -> (Self::Reader, Self::Writer) {
        (MemoryReader(self.inbound), MemoryWriter(self.outbound))
    }
}
