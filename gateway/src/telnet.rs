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

//! A plain-TCP stand-in for a real terminal/SSH transport. Connection
//! setup reads a login line, a password line, and an initial
//! window-size frame; thereafter the read half transparently splits
//! further window-size frames out of the byte stream and keeps a
//! shared `ConsoleGeometry` current, the same geometry the `Session`
//! consults for `who`.
//!
//! A window-size frame is the byte `0xFF` followed by two big-endian
//! 32-bit integers, width then height. `0xFF` does not otherwise occur
//! in the line-mode input this gateway accepts.

use byteorder::{BigEndian, ByteOrder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use wyldlands_common::ConsoleSize;
use wyldlands_server::context::WorldContext;
use wyldlands_server::session::{self, ConsoleGeometry, Session};
use wyldlands_server::transport::{Transport, TransportReader, TransportWriter};

const WINDOW_SIZE_SENTINEL: u8 = 0xFF;

pub struct TelnetReader {
    stream: OwnedReadHalf,
    console: Arc<ConsoleGeometry>,
}

impl TelnetReader {
    async fn read_window_size_payload(&mut self) -> std::io::Result<()> {
        let mut payload = [0u8; 8];
        self.stream.read_exact(&mut payload).await?;
        let size = ConsoleSize { width: BigEndian::read_u32(&payload[0..4]), height: BigEndian::read_u32(&payload[4..8]) };
        self.console.set(size.width, size.height);
        Ok(())
    }
}

#[async_trait::async_trait]
impl TransportReader for TelnetReader {
    async fn read_byte(&mut self) -> std::io::Result<Option<u8>> {
        loop {
            let mut byte = [0u8; 1];
            let read = self.stream.read(&mut byte).await?;
            if read == 0 {
                return Ok(None);
            }
            if byte[0] == WINDOW_SIZE_SENTINEL {
                self.read_window_size_payload().await?;
                continue;
            }
            return Ok(Some(byte[0]));
        }
    }
}

pub struct TelnetWriter(OwnedWriteHalf);

#[async_trait::async_trait]
impl TransportWriter for TelnetWriter {
    async fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.0.write_all(data).await
    }
}

pub struct TelnetTransport {
    stream: TcpStream,
    console: Arc<ConsoleGeometry>,
}

impl Transport for TelnetTransport {
    type Reader = TelnetReader;
    type Writer = TelnetWriter;

    fn split(self) -> (Self::Reader, Self::Writer) {
        let (read_half, write_half) = self.stream.into_split();
        (TelnetReader { stream: read_half, console: self.console }, TelnetWriter(write_half))
    }
}

/// Reads a single line of connection-setup input: bytes up to CR or
/// LF, the terminator discarded (mirrors `session::input_pump`'s own
/// line buffering, but runs before any pump exists).
async fn read_setup_line(stream: &mut TcpStream) -> std::io::Result<String> {
    let mut buffer = Vec::new();
    loop {
        let mut byte = [0u8; 1];
        let read = stream.read(&mut byte).await?;
        if read == 0 {
            return Err(std::io::Error::from(std::io::ErrorKind::UnexpectedEof));
        }
        match byte[0] {
            b'\r' | b'\n' => return Ok(String::from_utf8_lossy(&buffer).into_owned()),
            other => buffer.push(other),
        }
    }
}

/// Reads the PTY request that opens every connection: `0xFF` followed
/// by width and height as big-endian 32-bit integers.
async fn read_initial_window_size(stream: &mut TcpStream) -> std::io::Result<ConsoleSize> {
    let mut frame = [0u8; 9];
    stream.read_exact(&mut frame).await?;
    if frame[0] != WINDOW_SIZE_SENTINEL {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "expected a PTY request"));
    }
    Ok(ConsoleSize { width: BigEndian::read_u32(&frame[1..5]), height: BigEndian::read_u32(&frame[5..9]) })
}

/// Accepts connections and spawns a session driver, input pump, and
/// output pump per connection.
pub struct TelnetServer {
    context: Arc<WorldContext>,
}

impl TelnetServer {
    pub fn new(context: Arc<WorldContext>) -> Self {
        TelnetServer { context }
    }

    pub async fn run(self, listener: TcpListener) {
        tracing::info!("telnet gateway accepting connections");
        loop {
            match listener.accept().await {
                Ok((stream, addr)) => {
                    let context = self.context.clone();
                    tokio::spawn(async move {
                        if let Err(error) = handle_connection(stream, addr, context).await {
                            tracing::warn!("connection from {addr} ended: {error}");
                        }
                    });
                }
                Err(error) => tracing::error!("failed to accept connection: {error}"),
            }
        }
    }
}

async fn handle_connection(mut stream: TcpStream, addr: SocketAddr, context: Arc<WorldContext>) -> std::io::Result<()> {
    tracing::debug!("accepted connection from {addr}");

    let login = read_setup_line(&mut stream).await?;
    let password = read_setup_line(&mut stream).await?;
    let size = read_initial_window_size(&mut stream).await?;
    let console = Arc::new(ConsoleGeometry::new(size.width, size.height));

    let transport = TelnetTransport { stream, console: console.clone() };
    let (reader, writer) = transport.split();

    let (lines_tx, lines_rx) = tokio::sync::mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = tokio::sync::mpsc::unbounded_channel();
    let echo = Arc::new(std::sync::atomic::AtomicBool::new(true));

    tokio::spawn(session::input_pump(reader, lines_tx, echo.clone(), outbound_tx.clone()));
    tokio::spawn(session::output_pump(writer, outbound_rx));

    let driver = Session::with_console(login, outbound_tx, echo, console);
    driver.run(context, lines_rx, password).await;

    tracing::debug!("connection from {addr} closed");
    Ok(())
}
