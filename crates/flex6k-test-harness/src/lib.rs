//! Mock SmartSDR radio for protocol-level testing.
//!
//! [`MockRadio`] is a loopback TCP listener that speaks enough of the
//! SmartSDR command protocol to drive a real session: it performs the
//! `V`/`H` handshake, announces our client object (the "first status"),
//! acknowledges every command with `R<seq>|0|` unless a scripted reply
//! matches, and can push arbitrary status lines mid-session. Every command
//! the client sends is logged for assertions.
//!
//! # Example
//!
//! ```no_run
//! use flex6k_test_harness::MockRadio;
//!
//! # async fn example() {
//! let radio = MockRadio::start().await.unwrap();
//! radio.expect("info", 0, "model=\"FLEX-6600\"");
//! // connect a Session to radio.packet() ...
//! radio.push_status("slice 0 in_use=1 RF_frequency=14.250000 pan=0x40000001 mode=USB");
//! # }
//! ```

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use flex6k::discovery::{DiscoveryPacket, PacketSource};
use flex6k_core::{format_handle, Handle, Result};
use flex6k_proto::vita::{self, PacketClass};

/// Handle the mock assigns to the connecting client.
pub const MOCK_HANDLE: Handle = 0x1234_5678;

/// Version line the mock sends during the handshake.
pub const MOCK_VERSION: &str = "3.3.32.0";

#[derive(Debug, Clone)]
struct ScriptedReply {
    command_prefix: String,
    code: u32,
    data: String,
}

enum ServerMessage {
    /// Push `S<handle>|<text>` to the client.
    Status(String),
    /// Push a raw line verbatim.
    Raw(String),
    /// Drop the client connection.
    Close,
}

/// A scripted mock radio on a loopback TCP port.
pub struct MockRadio {
    addr: SocketAddr,
    commands: Arc<Mutex<Vec<String>>>,
    replies: Arc<Mutex<VecDeque<ScriptedReply>>>,
    ignores: Arc<Mutex<Vec<String>>>,
    held: Arc<Mutex<Vec<(u32, String)>>>,
    server_tx: mpsc::UnboundedSender<ServerMessage>,
}

impl MockRadio {
    /// Start a mock radio with the default handle and an automatic first
    /// status line.
    pub async fn start() -> Result<MockRadio> {
        MockRadio::start_with(true).await
    }

    /// Start a mock radio, choosing whether the client-connected status is
    /// announced automatically after the handshake.
    pub async fn start_with(auto_first_status: bool) -> Result<MockRadio> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let commands = Arc::new(Mutex::new(Vec::new()));
        let replies = Arc::new(Mutex::new(VecDeque::new()));
        let ignores = Arc::new(Mutex::new(Vec::new()));
        let held = Arc::new(Mutex::new(Vec::new()));
        let (server_tx, server_rx) = mpsc::unbounded_channel();

        tokio::spawn(accept_and_serve(
            listener,
            ServerState {
                commands: commands.clone(),
                replies: replies.clone(),
                ignores: ignores.clone(),
                held: held.clone(),
            },
            server_rx,
            auto_first_status,
        ));

        Ok(MockRadio {
            addr,
            commands,
            replies,
            ignores,
            held,
            server_tx,
        })
    }

    /// The listener's loopback address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// A local discovery packet pointing at this mock, suitable for
    /// `Session::connect`.
    pub fn packet(&self) -> DiscoveryPacket {
        let mut packet = DiscoveryPacket::default();
        packet.source = PacketSource::Local;
        packet.model = "FLEX-6600".into();
        packet.serial = "0000-0000-0000-0000".into();
        packet.nickname = "mock".into();
        packet.ip = self.addr.ip().to_string();
        packet.port = self.addr.port();
        packet.public_ip = packet.ip.clone();
        packet
    }

    /// Script a reply: the next command starting with `command_prefix`
    /// gets `R<seq>|<code>|<data>` instead of the default ack.
    pub fn expect(&self, command_prefix: &str, code: u32, data: &str) {
        self.replies.lock().unwrap().push_back(ScriptedReply {
            command_prefix: command_prefix.to_string(),
            code,
            data: data.to_string(),
        });
    }

    /// Withhold replies to commands starting with `prefix`, recording
    /// their sequence numbers instead (see [`held`](MockRadio::held)).
    /// Tests reply by hand with [`push_raw`](MockRadio::push_raw).
    pub fn withhold_replies(&self, prefix: &str) {
        self.ignores.lock().unwrap().push(prefix.to_string());
    }

    /// Commands whose replies are being withheld, as `(seq, text)`.
    pub fn held(&self) -> Vec<(u32, String)> {
        self.held.lock().unwrap().clone()
    }

    /// Push a status line for the client's handle.
    pub fn push_status(&self, text: &str) {
        let _ = self.server_tx.send(ServerMessage::Status(text.to_string()));
    }

    /// Push a raw protocol line verbatim (no framing added beyond `\n`).
    pub fn push_raw(&self, line: &str) {
        let _ = self.server_tx.send(ServerMessage::Raw(line.to_string()));
    }

    /// Drop the client connection, as a rebooting radio would.
    pub fn close_connection(&self) {
        let _ = self.server_tx.send(ServerMessage::Close);
    }

    /// Commands received so far (text after the `C<seq>|` prefix).
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    /// Wait until a command starting with `prefix` has been received.
    pub async fn wait_for_command(&self, prefix: &str, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self
                .commands()
                .iter()
                .any(|command| command.starts_with(prefix))
            {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Server task
// ---------------------------------------------------------------------------

struct ServerState {
    commands: Arc<Mutex<Vec<String>>>,
    replies: Arc<Mutex<VecDeque<ScriptedReply>>>,
    ignores: Arc<Mutex<Vec<String>>>,
    held: Arc<Mutex<Vec<(u32, String)>>>,
}

async fn accept_and_serve(
    listener: TcpListener,
    state: ServerState,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    auto_first_status: bool,
) {
    let Ok((stream, _)) = listener.accept().await else {
        return;
    };
    if let Err(e) = serve(stream, state, server_rx, auto_first_status).await {
        tracing::debug!(error = %e, "mock radio connection ended");
    }
}

async fn serve(
    stream: TcpStream,
    state: ServerState,
    mut server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    auto_first_status: bool,
) -> std::io::Result<()> {
    let (read_half, mut writer) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    // Handshake.
    writer
        .write_all(format!("V{MOCK_VERSION}\n").as_bytes())
        .await?;
    writer
        .write_all(format!("H{:08X}\n", MOCK_HANDLE).as_bytes())
        .await?;
    writer.flush().await?;

    if auto_first_status {
        // What a real radio pushes for the newly connected client.
        let status = format!(
            "S{:08X}|client {} connected client_id=ABCD-1234 program=flex6k station=flex6k\n",
            MOCK_HANDLE,
            format_handle(MOCK_HANDLE)
        );
        writer.write_all(status.as_bytes()).await?;
        writer.flush().await?;
    }

    let mut line = String::new();
    loop {
        line.clear();
        tokio::select! {
            message = server_rx.recv() => match message {
                Some(ServerMessage::Status(text)) => {
                    writer
                        .write_all(format!("S{:08X}|{text}\n", MOCK_HANDLE).as_bytes())
                        .await?;
                    writer.flush().await?;
                }
                Some(ServerMessage::Raw(text)) => {
                    writer.write_all(format!("{text}\n").as_bytes()).await?;
                    writer.flush().await?;
                }
                Some(ServerMessage::Close) | None => break,
            },
            result = reader.read_line(&mut line) => {
                if result? == 0 {
                    break;
                }
                let trimmed = line.trim();
                let Some((seq, text)) = parse_command(trimmed) else {
                    continue;
                };
                state.commands.lock().unwrap().push(text.to_string());

                let withheld = state
                    .ignores
                    .lock()
                    .unwrap()
                    .iter()
                    .any(|prefix| text.starts_with(prefix.as_str()));
                if withheld {
                    state.held.lock().unwrap().push((seq, text.to_string()));
                    continue;
                }

                let scripted = {
                    let mut queue = state.replies.lock().unwrap();
                    let position = queue
                        .iter()
                        .position(|r| text.starts_with(&r.command_prefix));
                    position.and_then(|i| queue.remove(i))
                };
                let reply = match scripted {
                    Some(r) => format!("R{seq}|{:X}|{}\n", r.code, r.data),
                    None => format!("R{seq}|0|\n"),
                };
                writer.write_all(reply.as_bytes()).await?;
                writer.flush().await?;
            }
        }
    }
    Ok(())
}

/// Split `C<seq>|<text>` (or diagnostic `CD<seq>|<text>`).
fn parse_command(line: &str) -> Option<(u32, &str)> {
    let body = line.strip_prefix('C').or_else(|| line.strip_prefix('c'))?;
    let body = body.strip_prefix('D').unwrap_or(body);
    let pipe = body.find('|')?;
    let seq = body[..pipe].parse().ok()?;
    Some((seq, &body[pipe + 1..]))
}

// ---------------------------------------------------------------------------
// Discovery fixtures
// ---------------------------------------------------------------------------

/// Build a VITA-49 discovery broadcast datagram from announcement text,
/// for feeding a `LanListener` over loopback.
pub fn discovery_broadcast(fields: &str) -> Vec<u8> {
    vita::encode(PacketClass::Discovery, 0x0000_0800, 0, 0, 0, fields.as_bytes())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_command_forms() {
        assert_eq!(parse_command("C12|info"), Some((12, "info")));
        assert_eq!(parse_command("CD3|ping"), Some((3, "ping")));
        assert_eq!(parse_command("c7|sub slice all"), Some((7, "sub slice all")));
        assert_eq!(parse_command("R1|0|"), None);
        assert_eq!(parse_command("Cx|bad"), None);
    }

    #[tokio::test]
    async fn handshake_and_ack() {
        let radio = MockRadio::start().await.unwrap();
        let stream = TcpStream::connect(radio.addr()).await.unwrap();
        let (read_half, mut writer) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(line.trim(), format!("V{MOCK_VERSION}"));

        line.clear();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(line.trim(), format!("H{:08X}", MOCK_HANDLE));

        // Automatic first status.
        line.clear();
        reader.read_line(&mut line).await.unwrap();
        assert!(line.starts_with(&format!("S{:08X}|client", MOCK_HANDLE)));

        writer.write_all(b"C1|info\n").await.unwrap();
        line.clear();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(line.trim(), "R1|0|");

        assert_eq!(radio.commands(), vec!["info".to_string()]);
    }

    #[tokio::test]
    async fn scripted_reply_and_push() {
        let radio = MockRadio::start_with(false).await.unwrap();
        radio.expect("slice list", 0x5000_0015, "no slices");

        let stream = TcpStream::connect(radio.addr()).await.unwrap();
        let (read_half, mut writer) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let mut line = String::new();
        for _ in 0..2 {
            line.clear();
            reader.read_line(&mut line).await.unwrap(); // V then H
        }

        writer.write_all(b"C5|slice list\n").await.unwrap();
        line.clear();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(line.trim(), "R5|50000015|no slices");

        radio.push_status("slice 0 in_use=1 mode=USB");
        line.clear();
        reader.read_line(&mut line).await.unwrap();
        assert_eq!(
            line.trim(),
            format!("S{:08X}|slice 0 in_use=1 mode=USB", MOCK_HANDLE)
        );
    }
}
