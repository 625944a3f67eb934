//! The radio session: TCP command channel, reply correlation, status
//! dispatch, and the UDP telemetry socket.
//!
//! One [`Session`] owns one authenticated connection to one radio. The
//! moving parts:
//!
//! - a **reader task** that parses every inbound TCP line and dispatches
//!   replies to waiting callers, status lines into the
//!   [`StatusRegistry`], and disconnect notices into teardown;
//! - a **pending-reply table** keyed by sequence number, resolved exactly
//!   once per reply, failed wholesale on teardown;
//! - a **UDP task** feeding the [`StreamRouter`];
//! - a **keep-alive pinger** ([`crate::pinger`]).
//!
//! The session never retries a socket on its own: any fault tears it down
//! with a reason and the caller decides what happens next.
//!
//! # State
//!
//! ```text
//! Disconnected → Connecting → AwaitingHandle → AwaitingFirstStatus
//!       ↑                                            │
//!       └── Disconnecting ← Active ←─────────────────┘
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, oneshot, Mutex, Notify};
use tokio_util::sync::CancellationToken;

use flex6k_core::{format_handle, parse_bool, parse_handle, Error, Handle, Result, SequenceNumber};
use flex6k_proto::line::{encode_command, key_values, parse_line, Reply, Status, TcpMessage};

use crate::commands;
use crate::discovery::{DiscoveryPacket, PacketSource, RelayControl};
use crate::net::{self, BoxedConnection};
use crate::pinger::{self, PingState};
use crate::registry::StatusRegistry;
use crate::streams::StreamRouter;

/// UDP port the radio receives telemetry commands/audio on.
const RADIO_UDP_PORT: u16 = 4991;

/// How many local ports to try when the preferred one is taken.
const UDP_BIND_ATTEMPTS: u16 = 20;

/// Broadcast capacity for session events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    AwaitingHandle,
    AwaitingFirstStatus,
    Active,
    Disconnecting,
}

/// Events broadcast by a session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Connect completed; commands may be issued.
    Connected,
    /// The first keep-alive replies arrived; the radio has finished its
    /// initial status burst.
    ClientInitialized,
    /// The session ended, with the triggering reason.
    Disconnected { reason: String },
}

/// Options for establishing a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Client program name registered with the radio.
    pub program: String,
    /// Station name (GUI connections).
    pub station: String,
    /// Whether to register as a GUI client.
    pub is_gui: bool,
    /// Timeout for individual command replies.
    pub command_timeout: Duration,
    /// Timeout for the `V`/`H` handshake lines.
    pub handshake_timeout: Duration,
    /// Timeout for the first status addressed to our handle.
    pub first_status_timeout: Duration,
    /// Keep-alive probe interval.
    pub ping_interval: Duration,
    /// Keep-alive reply timeout; exceeded means teardown.
    pub ping_timeout: Duration,
    /// Ping replies before the client counts as fully initialized.
    pub ping_init_count: u32,
    /// Whether to run the keep-alive pinger at all.
    pub keepalive: bool,
    /// Preferred local UDP port (`0` for ephemeral).
    pub udp_port: u16,
    /// Another client's handle to disconnect right after connecting.
    pub disconnect_handle: Option<Handle>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionOptions {
            program: "flex6k".to_string(),
            station: "flex6k".to_string(),
            is_gui: true,
            command_timeout: Duration::from_secs(2),
            handshake_timeout: Duration::from_secs(5),
            first_status_timeout: Duration::from_secs(10),
            ping_interval: Duration::from_secs(1),
            ping_timeout: Duration::from_secs(10),
            ping_init_count: 2,
            keepalive: true,
            udp_port: RADIO_UDP_PORT,
            disconnect_handle: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Pending replies
// ---------------------------------------------------------------------------

/// How a pending command wants its reply delivered.
pub(crate) enum Responder {
    /// Fire-and-forget; non-zero codes are logged.
    None,
    /// A caller is awaiting the reply.
    Waiter(oneshot::Sender<Reply>),
    /// The keep-alive pinger.
    Ping(Arc<PingState>),
}

struct PendingEntry {
    command: String,
    responder: Responder,
}

struct UdpBinding {
    socket: Arc<UdpSocket>,
    local_port: u16,
    target: SocketAddr,
}

// ---------------------------------------------------------------------------
// Shared internals
// ---------------------------------------------------------------------------

/// State shared between the session handle and its background tasks.
pub(crate) struct Shared {
    writer: Mutex<Option<WriteHalf<BoxedConnection>>>,
    next_seq: AtomicU32,
    pending: StdMutex<HashMap<SequenceNumber, PendingEntry>>,
    handle: StdMutex<Option<Handle>>,
    version: StdMutex<Option<String>>,
    state: StdMutex<SessionState>,
    connected: AtomicBool,
    token: CancellationToken,
    registry: Arc<StatusRegistry>,
    router: Arc<StreamRouter>,
    events: broadcast::Sender<SessionEvent>,
    first_status_seen: AtomicBool,
    first_status: Notify,
    init_flagged: AtomicBool,
    ping_init_count: u32,
    udp: StdMutex<Option<UdpBinding>>,
}

impl Shared {
    pub(crate) fn cancelled(&self) -> tokio_util::sync::WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    async fn write_line(&self, seq: SequenceNumber, command: &str) -> Result<()> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(Error::NotConnected)?;
        writer
            .write_all(&encode_command(seq, command))
            .await
            .map_err(|e| Error::Transport(format!("command send failed: {e}")))?;
        writer
            .flush()
            .await
            .map_err(|e| Error::Transport(format!("command flush failed: {e}")))?;
        Ok(())
    }

    /// Assign a sequence number, record the responder, and send.
    pub(crate) async fn send_with_responder(
        &self,
        command: &str,
        responder: Responder,
    ) -> Result<SequenceNumber> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(Error::NotConnected);
        }
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.pending.lock().unwrap().insert(
            seq,
            PendingEntry {
                command: command.to_string(),
                responder,
            },
        );
        tracing::trace!(seq, command, "sending");
        if let Err(e) = self.write_line(seq, command).await {
            self.pending.lock().unwrap().remove(&seq);
            return Err(e);
        }
        Ok(seq)
    }

    /// Tear the session down. Idempotent; safe from any task.
    pub(crate) async fn teardown(&self, reason: &str) {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }
        *self.state.lock().unwrap() = SessionState::Disconnecting;
        self.token.cancel();

        {
            let mut guard = self.writer.lock().await;
            if let Some(mut writer) = guard.take() {
                let _ = writer.shutdown().await;
            }
        }

        // Fail every waiter: dropping the oneshot senders resolves their
        // receivers with an error.
        let pending: Vec<PendingEntry> = {
            let mut table = self.pending.lock().unwrap();
            table.drain().map(|(_, entry)| entry).collect()
        };
        if !pending.is_empty() {
            tracing::debug!(count = pending.len(), "failing pending commands");
        }
        drop(pending);

        *self.udp.lock().unwrap() = None;
        self.registry.clear_all();
        *self.state.lock().unwrap() = SessionState::Disconnected;

        let _ = self.events.send(SessionEvent::Disconnected {
            reason: reason.to_string(),
        });
        tracing::debug!(reason, "session closed");
    }

    /// Suspend until the first status addressed to our handle arrives.
    async fn await_first_status(&self, timeout: Duration) -> Result<()> {
        let mut notified = std::pin::pin!(self.first_status.notified());
        notified.as_mut().enable();
        if self.first_status_seen.load(Ordering::SeqCst) {
            return Ok(());
        }
        tokio::time::timeout(timeout, notified)
            .await
            .map_err(|_| Error::Timeout)
    }

    // -- inbound dispatch ---------------------------------------------------

    async fn dispatch_line(&self, line: &str) {
        match parse_line(line) {
            Ok(TcpMessage::Reply(reply)) => self.resolve_reply(reply),
            Ok(TcpMessage::Status(status)) => self.dispatch_status(status).await,
            Ok(TcpMessage::Message { code, text }) => {
                tracing::debug!(code = format!("{code:08X}"), message = %text, "radio message");
            }
            Ok(TcpMessage::Version(v)) => {
                tracing::warn!(version = %v, "unexpected version line after handshake");
            }
            Ok(TcpMessage::Handle(h)) => {
                tracing::warn!(handle = %format_handle(h), "unexpected handle line after handshake");
            }
            Ok(TcpMessage::Unknown(text)) => {
                tracing::trace!(line = %text, "unknown line from radio");
            }
            Err(e) => {
                tracing::trace!(error = %e, line = %line, "undecodable line dropped");
            }
        }
    }

    fn resolve_reply(&self, reply: Reply) {
        let entry = self.pending.lock().unwrap().remove(&reply.sequence);
        let Some(entry) = entry else {
            tracing::warn!(seq = reply.sequence, "reply for unknown sequence number");
            return;
        };

        match entry.responder {
            Responder::Waiter(tx) => {
                // Caller maps the code; a dropped receiver just means the
                // caller gave up, which is fine -- the slot is gone either
                // way.
                let _ = tx.send(reply);
            }
            Responder::Ping(state) => {
                let count = state.note_reply();
                if count == self.ping_init_count
                    && !self.init_flagged.swap(true, Ordering::SeqCst)
                {
                    tracing::debug!("client fully initialized");
                    let _ = self.events.send(SessionEvent::ClientInitialized);
                }
            }
            Responder::None => {
                if reply.code != 0 {
                    if entry.command.starts_with("client program") {
                        // Known firmware quirk: this command can fail
                        // harmlessly on radios that predate it.
                        tracing::debug!(
                            code = format!("{:08X}", reply.code),
                            "non-zero reply to client program ignored"
                        );
                    } else {
                        tracing::warn!(
                            seq = reply.sequence,
                            code = format!("{:08X}", reply.code),
                            command = %entry.command,
                            data = %reply.data,
                            "command failed"
                        );
                    }
                }
            }
        }
    }

    async fn dispatch_status(&self, status: Status) {
        let own_handle = *self.handle.lock().unwrap();
        if own_handle == Some(status.handle)
            && !self.first_status_seen.swap(true, Ordering::SeqCst)
        {
            *self.state.lock().unwrap() = SessionState::Active;
            self.first_status.notify_waiters();
            tracing::debug!("first status for our handle received");
        }

        if status.object == "client" {
            self.handle_client_status(&status.message).await;
            return;
        }
        self.registry.dispatch(&status.object, &status.message);
    }

    /// `client <handle> connected ...` / `client <handle> disconnected ...`.
    ///
    /// Only a disconnect aimed at our own handle matters to the session;
    /// the rest describes other stations and is the directory's business.
    async fn handle_client_status(&self, message: &str) {
        let mut tokens = message.split_whitespace();
        let Some(handle) = tokens.next().and_then(parse_handle) else {
            tracing::warn!(message = %message, "client status without handle");
            return;
        };
        let verb = tokens.next().unwrap_or("");

        if verb == "disconnected" && Some(handle) == *self.handle.lock().unwrap() {
            let mut reason = "disconnected".to_string();
            for (key, value) in key_values(message, ' ') {
                match key.as_str() {
                    "forced" if parse_bool(&value) => reason = "forced".to_string(),
                    "duplicate_client_id" if parse_bool(&value) => {
                        reason = "duplicate client id".to_string()
                    }
                    "wan_validation_failed" if parse_bool(&value) => {
                        reason = "wan validation failed".to_string()
                    }
                    _ => {}
                }
            }
            tracing::warn!(reason = %reason, "radio disconnected this client");
            self.teardown(&reason).await;
        } else {
            tracing::trace!(handle = %format_handle(handle), verb, "client status");
        }
    }
}

// ---------------------------------------------------------------------------
// Background tasks
// ---------------------------------------------------------------------------

async fn read_loop(shared: Arc<Shared>, mut reader: BufReader<ReadHalf<BoxedConnection>>) {
    let mut line = String::new();
    loop {
        line.clear();
        tokio::select! {
            _ = shared.cancelled() => break,
            result = reader.read_line(&mut line) => match result {
                Ok(0) => {
                    shared.teardown("radio closed the connection").await;
                    break;
                }
                Ok(_) => {
                    let trimmed = line.trim_end_matches(['\n', '\r']);
                    if !trimmed.is_empty() {
                        shared.dispatch_line(trimmed).await;
                    }
                }
                Err(e) => {
                    shared.teardown(&format!("read error: {e}")).await;
                    break;
                }
            }
        }
    }
    tracing::debug!("tcp reader stopped");
}

async fn udp_loop(shared: Arc<Shared>, socket: Arc<UdpSocket>) {
    let mut buf = [0u8; 8192];
    loop {
        tokio::select! {
            _ = shared.cancelled() => break,
            result = socket.recv(&mut buf) => match result {
                Ok(n) => shared.router.route(&buf[..n]),
                Err(e) => {
                    // UDP read errors are transient; keep receiving.
                    tracing::trace!(error = %e, "udp recv error");
                }
            }
        }
    }
    tracing::debug!("udp receiver stopped");
}

// ---------------------------------------------------------------------------
// The session
// ---------------------------------------------------------------------------

/// One active connection to one radio.
pub struct Session {
    shared: Arc<Shared>,
    options: SessionOptions,
}

impl Session {
    /// Connect to a locally discovered radio.
    pub async fn connect(packet: &DiscoveryPacket, options: SessionOptions) -> Result<Session> {
        Session::connect_with_relay(packet, None, options).await
    }

    /// Connect to a radio, using `relay` for smartlink negotiation when the
    /// packet came from the relay listener.
    pub async fn connect_with_relay(
        packet: &DiscoveryPacket,
        relay: Option<Arc<dyn RelayControl>>,
        options: SessionOptions,
    ) -> Result<Session> {
        let is_wan = packet.source == PacketSource::Smartlink;
        if is_wan && relay.is_none() {
            return Err(Error::Smartlink(
                "smartlink packet requires a relay control".into(),
            ));
        }

        tracing::debug!(
            nickname = %packet.nickname,
            serial = %packet.serial,
            source = ?packet.source,
            "connecting"
        );

        // -- Connecting: open the command channel --
        let stream: BoxedConnection = if is_wan {
            Box::new(net::tls_connect(&packet.public_ip, packet.public_tls_port).await?)
        } else {
            Box::new(net::tcp_connect(&packet.ip, packet.port).await?)
        };

        let (read_half, write_half) = tokio::io::split(stream);
        let mut reader = BufReader::new(read_half);

        // -- AwaitingHandle: read V/H lines --
        let (version, handle) =
            read_handshake(&mut reader, options.handshake_timeout).await?;
        tracing::debug!(
            handle = %format_handle(handle),
            version = %version.as_deref().unwrap_or("unknown"),
            "handshake complete"
        );

        let registry = StatusRegistry::new();
        let router = StreamRouter::new(registry.meters.clone());
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let shared = Arc::new(Shared {
            writer: Mutex::new(Some(write_half)),
            next_seq: AtomicU32::new(1),
            pending: StdMutex::new(HashMap::new()),
            handle: StdMutex::new(Some(handle)),
            version: StdMutex::new(version),
            state: StdMutex::new(SessionState::AwaitingFirstStatus),
            connected: AtomicBool::new(true),
            token: CancellationToken::new(),
            registry,
            router,
            events,
            first_status_seen: AtomicBool::new(false),
            first_status: Notify::new(),
            init_flagged: AtomicBool::new(false),
            ping_init_count: options.ping_init_count,
            udp: StdMutex::new(None),
        });

        tokio::spawn(read_loop(shared.clone(), reader));

        let session = Session {
            shared: shared.clone(),
            options: options.clone(),
        };

        if let Err(e) = session.finish_connect(packet, relay, is_wan).await {
            shared.teardown(&format!("connect failed: {e}")).await;
            return Err(e);
        }

        let _ = shared.events.send(SessionEvent::Connected);
        tracing::debug!(nickname = %packet.nickname, "session active");
        Ok(session)
    }

    /// The post-handshake half of connect; failures here tear down.
    async fn finish_connect(
        &self,
        packet: &DiscoveryPacket,
        relay: Option<Arc<dyn RelayControl>>,
        is_wan: bool,
    ) -> Result<()> {
        if let Some(other) = self.options.disconnect_handle {
            self.send(&commands::client_disconnect(other)).await?;
        }

        // The radio announces our own client object unprompted; its
        // arrival proves the command channel is fully up.
        self.shared
            .await_first_status(self.options.first_status_timeout)
            .await?;

        // -- Smartlink negotiation: wan handle, then validate over TCP --
        if is_wan {
            let relay = relay.ok_or_else(|| {
                Error::Smartlink("smartlink packet requires a relay control".into())
            })?;
            let wan_handle = relay
                .request_connection(&packet.serial, packet.negotiated_hole_punch_port)
                .await?;
            tracing::debug!(wan_handle = %wan_handle, "relay connection granted");
            self.request(&commands::wan_validate(&wan_handle)).await?;
        }

        // -- UDP --
        let binding = bind_udp(packet, self.options.udp_port, is_wan).await?;
        let socket = binding.socket.clone();
        let local_port = binding.local_port;
        *self.shared.udp.lock().unwrap() = Some(binding);
        tokio::spawn(udp_loop(self.shared.clone(), socket));
        tracing::debug!(port = local_port, "udp bound");

        if is_wan {
            let handle = self.handle().ok_or(Error::NotConnected)?;
            self.send_udp(commands::client_udp_register(handle).as_bytes())
                .await?;
            let ip = self.request(&commands::client_ip()).await?;
            tracing::debug!(client_ip = %ip, "registered with relay");
        }

        // -- Initial command set --
        if self.options.is_gui {
            self.send(&commands::client_gui()).await?;
        }
        self.send(&commands::client_program(&self.options.program))
            .await?;
        if self.options.is_gui {
            self.send(&commands::client_station(&self.options.station))
                .await?;
        }
        for object in ["client", "tx", "slice", "pan", "meter", "amplifier", "tnf"] {
            self.send(&commands::sub_all(object)).await?;
        }
        self.send(&commands::info()).await?;
        self.send(&commands::version()).await?;

        // -- Keep-alive --
        if self.options.keepalive {
            self.send(&commands::keepalive_enable()).await?;
            pinger::spawn(
                self.shared.clone(),
                self.options.ping_interval,
                self.options.ping_timeout,
            );
        }

        if !is_wan {
            self.send(&commands::client_udpport(local_port)).await?;
        }
        Ok(())
    }

    // -- command paths ------------------------------------------------------

    /// Send a command without waiting for its reply. Non-zero reply codes
    /// are logged when they come back.
    pub async fn send(&self, command: &str) -> Result<SequenceNumber> {
        self.shared
            .send_with_responder(command, Responder::None)
            .await
    }

    /// Send a command and await its correlated reply.
    ///
    /// Returns the reply data on code 0, [`Error::Command`] on a device
    /// error code, [`Error::Timeout`] if no reply arrives in time, and
    /// [`Error::ConnectionLost`] if the session tears down while waiting.
    pub async fn request(&self, command: &str) -> Result<String> {
        let (tx, rx) = oneshot::channel();
        let seq = self
            .shared
            .send_with_responder(command, Responder::Waiter(tx))
            .await?;

        match tokio::time::timeout(self.options.command_timeout, rx).await {
            Ok(Ok(reply)) => {
                if reply.code == 0 {
                    Ok(reply.data)
                } else if command.starts_with("client program") {
                    tracing::debug!(
                        code = format!("{:08X}", reply.code),
                        "non-zero reply to client program ignored"
                    );
                    Ok(reply.data)
                } else {
                    Err(Error::Command {
                        code: reply.code,
                        message: reply.data,
                    })
                }
            }
            // Sender dropped: teardown drained the table.
            Ok(Err(_)) => Err(Error::ConnectionLost),
            Err(_) => {
                self.shared.pending.lock().unwrap().remove(&seq);
                Err(Error::Timeout)
            }
        }
    }

    /// Send raw bytes to the radio over the session's UDP socket.
    pub async fn send_udp(&self, data: &[u8]) -> Result<()> {
        let (socket, target) = {
            let guard = self.shared.udp.lock().unwrap();
            let binding = guard.as_ref().ok_or(Error::NotConnected)?;
            (binding.socket.clone(), binding.target)
        };
        socket
            .send_to(data, target)
            .await
            .map_err(|e| Error::Transport(format!("udp send failed: {e}")))?;
        Ok(())
    }

    /// Disconnect. Idempotent; safe from any state.
    pub async fn disconnect(&self) {
        self.shared.teardown("user initiated").await;
    }

    // -- accessors ----------------------------------------------------------

    /// The handle the radio assigned this client.
    pub fn handle(&self) -> Option<Handle> {
        *self.shared.handle.lock().unwrap()
    }

    /// The hardware version line from the handshake.
    pub fn version(&self) -> Option<String> {
        self.shared.version.lock().unwrap().clone()
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        *self.shared.state.lock().unwrap()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// The synchronized object model for this session.
    pub fn registry(&self) -> &Arc<StatusRegistry> {
        &self.shared.registry
    }

    /// The telemetry stream router for this session.
    pub fn router(&self) -> &Arc<StreamRouter> {
        &self.shared.router
    }

    /// Subscribe to session events.
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Connect helpers
// ---------------------------------------------------------------------------

/// Read handshake lines until the connection handle arrives.
async fn read_handshake(
    reader: &mut BufReader<ReadHalf<BoxedConnection>>,
    timeout: Duration,
) -> Result<(Option<String>, Handle)> {
    let handshake = async {
        let mut version = None;
        loop {
            let mut line = String::new();
            let n = reader
                .read_line(&mut line)
                .await
                .map_err(|e| Error::Transport(format!("handshake read error: {e}")))?;
            if n == 0 {
                return Err(Error::ConnectionLost);
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match parse_line(trimmed)? {
                TcpMessage::Version(v) => version = Some(v),
                TcpMessage::Handle(h) => return Ok((version, h)),
                other => {
                    return Err(Error::Protocol(format!(
                        "unexpected line during handshake: {other:?}"
                    )));
                }
            }
        }
    };
    tokio::time::timeout(timeout, handshake)
        .await
        .map_err(|_| Error::Timeout)?
}

/// Bind the session's UDP socket.
///
/// Local connections scan upward from the preferred port; hole-punched
/// relay connections must use exactly the negotiated port.
async fn bind_udp(packet: &DiscoveryPacket, preferred_port: u16, is_wan: bool) -> Result<UdpBinding> {
    let (first_port, attempts, target): (u16, u16, SocketAddr) = if is_wan {
        let port = if packet.requires_hole_punch {
            packet.negotiated_hole_punch_port
        } else {
            packet.public_udp_port
        };
        let attempts = if packet.requires_hole_punch { 1 } else { UDP_BIND_ATTEMPTS };
        let target = parse_target(&packet.public_ip, port)?;
        (port, attempts, target)
    } else {
        let target = parse_target(&packet.ip, RADIO_UDP_PORT)?;
        (preferred_port, UDP_BIND_ATTEMPTS, target)
    };

    let mut port = first_port;
    let mut last_error = None;
    for _ in 0..attempts {
        match UdpSocket::bind(("0.0.0.0", port)).await {
            Ok(socket) => {
                let local_port = socket
                    .local_addr()
                    .map_err(|e| Error::Transport(format!("udp local_addr: {e}")))?
                    .port();
                return Ok(UdpBinding {
                    socket: Arc::new(socket),
                    local_port,
                    target,
                });
            }
            Err(e) => {
                last_error = Some(e);
                port = port.wrapping_add(1);
            }
        }
    }
    Err(Error::Transport(format!(
        "udp bind failed after {attempts} attempts: {}",
        last_error.map(|e| e.to_string()).unwrap_or_default()
    )))
}

fn parse_target(host: &str, port: u16) -> Result<SocketAddr> {
    format!("{host}:{port}")
        .parse()
        .map_err(|_| Error::Transport(format!("invalid radio address: {host}:{port}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_defaults() {
        let options = SessionOptions::default();
        assert_eq!(options.ping_interval, Duration::from_secs(1));
        assert_eq!(options.ping_timeout, Duration::from_secs(10));
        assert_eq!(options.ping_init_count, 2);
        assert!(options.keepalive);
        assert_eq!(options.udp_port, 4991);
    }

    #[test]
    fn parse_target_validates() {
        assert!(parse_target("192.168.1.1", 4991).is_ok());
        assert!(parse_target("not a host", 4991).is_err());
    }
}
