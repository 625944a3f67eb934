//! LAN discovery listener.
//!
//! Radios broadcast a VITA-49 packet with the discovery class code to UDP
//! port 4992 about once a second. The payload is plain ASCII `key=value`
//! text. Every parsed announcement goes straight into the [`Directory`];
//! stopping the listener drops the radios it contributed.

use std::net::IpAddr;
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use flex6k_core::{Error, Result};
use flex6k_proto::vita::{self, PacketClass};
use flex6k_proto::key_values;

use super::directory::Directory;
use super::packet::{DiscoveryPacket, PacketSource};
use super::DISCOVERY_PORT;

/// Background listener for local discovery broadcasts.
pub struct LanListener {
    directory: Arc<Directory>,
    token: CancellationToken,
}

impl LanListener {
    /// Bind the discovery port and start listening.
    pub async fn start(directory: Arc<Directory>) -> Result<LanListener> {
        LanListener::start_on_port(directory, DISCOVERY_PORT).await
    }

    /// Bind a specific port; tests use a loopback port.
    pub async fn start_on_port(directory: Arc<Directory>, port: u16) -> Result<LanListener> {
        let socket = UdpSocket::bind(("0.0.0.0", port)).await.map_err(|e| {
            Error::Transport(format!("discovery bind on port {port} failed: {e}"))
        })?;
        let _ = socket.set_broadcast(true);
        tracing::debug!(port, "lan discovery listening");

        let token = CancellationToken::new();
        tokio::spawn(listen_loop(
            socket,
            directory.clone(),
            token.clone(),
        ));

        Ok(LanListener { directory, token })
    }

    /// Stop listening and drop all locally sourced radios.
    pub fn stop(&self) {
        self.token.cancel();
        self.directory.remove_source(PacketSource::Local);
        tracing::debug!("lan discovery stopped");
    }
}

impl Drop for LanListener {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn listen_loop(socket: UdpSocket, directory: Arc<Directory>, token: CancellationToken) {
    let mut buf = [0u8; 4096];
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            result = socket.recv_from(&mut buf) => match result {
                Ok((n, src)) => {
                    if let Some(packet) = parse_broadcast(&buf[..n], src.ip()) {
                        directory.process(packet);
                    }
                }
                Err(e) => {
                    tracing::trace!(error = %e, "discovery recv error");
                }
            }
        }
    }
}

/// Parse one datagram as a discovery broadcast; anything else is ignored.
fn parse_broadcast(data: &[u8], src_ip: IpAddr) -> Option<DiscoveryPacket> {
    let packet = vita::decode(data).ok()?;
    if packet.header.class != PacketClass::Discovery {
        return None;
    }
    let text = std::str::from_utf8(packet.payload).ok()?;
    let fields = key_values(text.trim_end_matches('\0').trim(), ' ');
    if fields.is_empty() {
        return None;
    }

    let announcement =
        DiscoveryPacket::from_fields(PacketSource::Local, &fields, &src_ip.to_string());
    if announcement.serial.is_empty() {
        tracing::trace!("discovery broadcast without serial ignored");
        return None;
    }
    Some(announcement)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
