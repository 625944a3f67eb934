//! Smartlink relay listener.
//!
//! The relay is a cloud service radios register with; clients hold a
//! persistent TLS line channel to it. Over that channel the relay pushes
//! radio announcements (same fields as LAN broadcasts, plus public
//! addressing) and answers connection requests with a relay-assigned wan
//! handle and hole-punch port. Authentication is delegated to an
//! [`AuthProvider`]; this engine never sees credentials, only tokens.

use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;

use flex6k_core::{Error, Result};
use flex6k_proto::key_values;

use crate::net::{self, BoxedConnection};

use super::directory::Directory;
use super::packet::{DiscoveryPacket, PacketSource};
use super::{SMARTLINK_HOST, SMARTLINK_PORT};

/// Relay keep-alive interval.
const RELAY_PING_INTERVAL: Duration = Duration::from_secs(10);

/// How long a connect request may wait for the relay's `connect_ready`.
const CONNECT_READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Supplies bearer tokens for the relay account.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Obtain a current id token, refreshing/logging in as needed.
    async fn id_token(&self) -> Result<String>;
}

/// [`AuthProvider`] wrapping an already-obtained token.
pub struct StaticTokenAuth {
    token: String,
}

impl StaticTokenAuth {
    pub fn new(token: impl Into<String>) -> StaticTokenAuth {
        StaticTokenAuth {
            token: token.into(),
        }
    }
}

#[async_trait]
impl AuthProvider for StaticTokenAuth {
    async fn id_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

/// Relay-side connection arbitration, consumed by the session for
/// smartlink connects.
#[async_trait]
pub trait RelayControl: Send + Sync {
    /// Ask the relay to prepare a connection to a radio. Returns the wan
    /// handle the radio will accept in `wan validate`.
    async fn request_connection(&self, serial: &str, hole_punch_port: u16) -> Result<String>;

    /// Ask the relay to disconnect every client from a radio.
    async fn disconnect_users(&self, serial: &str) -> Result<()>;

    /// Ask the relay to test reachability of a radio.
    async fn test_connection(&self, serial: &str) -> Result<()>;
}

struct WanShared {
    directory: Arc<Directory>,
    writer: Mutex<Option<WriteHalf<BoxedConnection>>>,
    connect_waiter: StdMutex<Option<oneshot::Sender<String>>>,
    token: CancellationToken,
}

/// Background listener holding the relay channel.
pub struct WanListener {
    shared: Arc<WanShared>,
}

impl WanListener {
    /// Connect to the production relay over TLS and register.
    pub async fn start(
        directory: Arc<Directory>,
        auth: Arc<dyn AuthProvider>,
    ) -> Result<Arc<WanListener>> {
        let stream = net::tls_connect(SMARTLINK_HOST, SMARTLINK_PORT)
            .await
            .map_err(|e| Error::Smartlink(format!("relay connect failed: {e}")))?;
        WanListener::start_with_stream(directory, auth, Box::new(stream)).await
    }

    /// Run the relay protocol over an already-open stream (tests use an
    /// in-memory duplex).
    pub async fn start_with_stream(
        directory: Arc<Directory>,
        auth: Arc<dyn AuthProvider>,
        stream: BoxedConnection,
    ) -> Result<Arc<WanListener>> {
        let id_token = auth
            .id_token()
            .await
            .map_err(|e| Error::Smartlink(format!("authentication failed: {e}")))?;

        let (read_half, write_half) = tokio::io::split(stream);

        let shared = Arc::new(WanShared {
            directory,
            writer: Mutex::new(Some(write_half)),
            connect_waiter: StdMutex::new(None),
            token: CancellationToken::new(),
        });

        tokio::spawn(read_loop(shared.clone(), BufReader::new(read_half)));
        tokio::spawn(ping_loop(shared.clone()));

        let listener = Arc::new(WanListener { shared });
        listener
            .send_command(&format!(
                "application register name=flex6k platform=rust token={id_token}"
            ))
            .await?;
        tracing::debug!("relay registration sent");
        Ok(listener)
    }

    /// Stop listening and drop all relay-sourced radios.
    pub fn stop(&self) {
        self.shared.token.cancel();
        self.shared.directory.remove_source(PacketSource::Smartlink);
        tracing::debug!("relay listener stopped");
    }

    /// Send one command line to the relay.
    async fn send_command(&self, text: &str) -> Result<()> {
        let mut guard = self.shared.writer.lock().await;
        let writer = guard.as_mut().ok_or(Error::NotConnected)?;
        writer
            .write_all(format!("{text}\n").as_bytes())
            .await
            .map_err(|e| Error::Smartlink(format!("relay send failed: {e}")))?;
        writer
            .flush()
            .await
            .map_err(|e| Error::Smartlink(format!("relay flush failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl RelayControl for WanListener {
    async fn request_connection(&self, serial: &str, hole_punch_port: u16) -> Result<String> {
        let (tx, rx) = oneshot::channel();
        {
            let mut waiter = self.shared.connect_waiter.lock().unwrap();
            if waiter.is_some() {
                return Err(Error::Smartlink("a connect request is already pending".into()));
            }
            *waiter = Some(tx);
        }

        tracing::debug!(serial, "relay connect requested");
        self.send_command(&format!(
            "application connect serial={serial} hole_punch_port={hole_punch_port}"
        ))
        .await?;

        match tokio::time::timeout(CONNECT_READY_TIMEOUT, rx).await {
            Ok(Ok(handle)) => Ok(handle),
            Ok(Err(_)) => Err(Error::Smartlink("relay channel closed during connect".into())),
            Err(_) => {
                self.shared.connect_waiter.lock().unwrap().take();
                Err(Error::Smartlink("timed out waiting for connect_ready".into()))
            }
        }
    }

    async fn disconnect_users(&self, serial: &str) -> Result<()> {
        tracing::debug!(serial, "relay disconnect requested");
        self.send_command(&format!("application disconnect_users serial={serial}"))
            .await
    }

    async fn test_connection(&self, serial: &str) -> Result<()> {
        tracing::debug!(serial, "relay test requested");
        self.send_command(&format!("application test_connection serial={serial}"))
            .await
    }
}

impl Drop for WanListener {
    fn drop(&mut self) {
        self.shared.token.cancel();
    }
}

// ---------------------------------------------------------------------------
// Background tasks
// ---------------------------------------------------------------------------

async fn read_loop(shared: Arc<WanShared>, mut reader: BufReader<ReadHalf<BoxedConnection>>) {
    let mut line = String::new();
    loop {
        line.clear();
        tokio::select! {
            _ = shared.token.cancelled() => break,
            result = reader.read_line(&mut line) => match result {
                Ok(0) => {
                    tracing::warn!("relay closed the channel");
                    shared.token.cancel();
                    shared.directory.remove_source(PacketSource::Smartlink);
                    break;
                }
                Ok(_) => {
                    let trimmed = line.trim();
                    if !trimmed.is_empty() {
                        handle_relay_line(&shared, trimmed);
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "relay read error");
                    shared.token.cancel();
                    shared.directory.remove_source(PacketSource::Smartlink);
                    break;
                }
            }
        }
    }
    // A dropped waiter fails any in-flight connect request.
    shared.connect_waiter.lock().unwrap().take();
    tracing::debug!("relay reader stopped");
}

async fn ping_loop(shared: Arc<WanShared>) {
    // First tick after one full interval, so registration goes out first.
    let mut ticker = tokio::time::interval_at(
        tokio::time::Instant::now() + RELAY_PING_INTERVAL,
        RELAY_PING_INTERVAL,
    );
    loop {
        tokio::select! {
            _ = shared.token.cancelled() => break,
            _ = ticker.tick() => {
                let mut guard = shared.writer.lock().await;
                if let Some(writer) = guard.as_mut() {
                    if writer.write_all(b"ping from client\n").await.is_err() {
                        break;
                    }
                    let _ = writer.flush().await;
                }
            }
        }
    }
}

fn handle_relay_line(shared: &Arc<WanShared>, line: &str) {
    let (domain, rest) = match line.find(' ') {
        Some(space) => (&line[..space], line[space + 1..].trim_start()),
        None => (line, ""),
    };

    match domain {
        "radio" => handle_radio_message(shared, rest),
        "application" => {
            // userinfo, test results, registration acknowledgements.
            tracing::debug!(message = %rest, "relay application message");
        }
        "ping" | "pong" => {}
        other => {
            tracing::trace!(domain = %other, line = %line, "unhandled relay line");
        }
    }
}

fn handle_radio_message(shared: &Arc<WanShared>, message: &str) {
    let (verb, rest) = match message.find(' ') {
        Some(space) => (&message[..space], message[space + 1..].trim_start()),
        None => (message, ""),
    };

    match verb {
        // One radio announcement per line, same fields as a broadcast.
        "list" => {
            let fields = key_values(rest, ' ');
            let packet = DiscoveryPacket::from_fields(PacketSource::Smartlink, &fields, "");
            if packet.serial.is_empty() {
                tracing::warn!("relay radio list entry without serial");
                return;
            }
            shared.directory.process(packet);
        }
        // The relay's answer to `application connect`.
        "connect_ready" => {
            let fields = key_values(rest, ' ');
            let handle = fields
                .iter()
                .find(|(key, _)| key == "handle")
                .map(|(_, value)| value.clone());
            match (handle, shared.connect_waiter.lock().unwrap().take()) {
                (Some(handle), Some(waiter)) => {
                    let _ = waiter.send(handle);
                }
                (None, waiter) => {
                    tracing::warn!(message = %message, "connect_ready without handle");
                    drop(waiter);
                }
                (Some(_), None) => {
                    tracing::warn!("connect_ready with no pending request");
                }
            }
        }
        other => {
            tracing::trace!(verb = %other, "unhandled relay radio message");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
