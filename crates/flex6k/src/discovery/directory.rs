//! The merged radio directory.
//!
//! Both listeners feed announcements into one [`Directory`], which keeps a
//! deduplicated set of radios keyed by `(serial, public_ip)`, diffs each
//! radio's GUI client list against the previous announcement to emit
//! added/removed events, and exposes flat "pickable" projections for
//! connection UIs. Projections are recomputed from scratch after every
//! structural change; the set is small and correctness beats cleverness.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use super::packet::{DiscoveryPacket, GuiClient, PacketSource};

/// Broadcast capacity for client events.
const CLIENT_EVENT_CAPACITY: usize = 64;

/// What happened to a GUI client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEventKind {
    Added,
    Removed,
}

/// A GUI client appeared on or vanished from some radio.
#[derive(Debug, Clone)]
pub struct ClientEvent {
    pub kind: ClientEventKind,
    /// Directory key of the radio the client belongs to.
    pub radio_key: String,
    pub client: GuiClient,
}

/// One selectable connect target: a radio, or one station on a radio.
#[derive(Debug, Clone)]
pub struct Pickable {
    /// Directory key of the underlying packet.
    pub radio_key: String,
    pub source: PacketSource,
    pub nickname: String,
    pub serial: String,
    /// Station name; for radio pickables, the full station CSV.
    pub station: String,
}

/// Deduplicated, observable set of reachable radios.
pub struct Directory {
    packets: Mutex<HashMap<String, DiscoveryPacket>>,
    pickable_radios: Mutex<Vec<Pickable>>,
    pickable_stations: Mutex<Vec<Pickable>>,
    client_events: broadcast::Sender<ClientEvent>,
}

impl Directory {
    pub fn new() -> Arc<Directory> {
        let (client_events, _) = broadcast::channel(CLIENT_EVENT_CAPACITY);
        Arc::new(Directory {
            packets: Mutex::new(HashMap::new()),
            pickable_radios: Mutex::new(Vec::new()),
            pickable_stations: Mutex::new(Vec::new()),
            client_events,
        })
    }

    /// Subscribe to client added/removed events.
    pub fn client_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.client_events.subscribe()
    }

    /// Ingest one announcement from either listener.
    pub fn process(&self, mut packet: DiscoveryPacket) {
        let Some(received_clients) = packet.parse_gui_clients() else {
            tracing::warn!(
                serial = %packet.serial,
                "announcement with ragged client lists discarded"
            );
            return;
        };

        let key = packet.key();
        let mut packets = self.packets.lock().unwrap();

        if let Some(known) = packets.get_mut(&key) {
            if !packet.is_different(known) {
                // Identical re-announcement: refresh the timestamp only.
                known.last_seen = packet.last_seen;
                return;
            }

            // Diff by handle and report only the delta.
            let previous = std::mem::take(&mut known.gui_clients);
            for client in &received_clients {
                if !previous.iter().any(|old| old.handle == client.handle) {
                    self.emit(ClientEventKind::Added, &key, client);
                }
            }
            for old in &previous {
                if !received_clients.iter().any(|c| c.handle == old.handle) {
                    self.emit(ClientEventKind::Removed, &key, old);
                }
            }

            packet.gui_clients = received_clients;
            tracing::debug!(source = ?packet.source, nickname = %packet.nickname, "radio updated");
            packets.insert(key, packet);
        } else {
            for client in &received_clients {
                self.emit(ClientEventKind::Added, &key, client);
            }
            packet.gui_clients = received_clients;
            tracing::debug!(source = ?packet.source, nickname = %packet.nickname, "radio added");
            packets.insert(key, packet);
        }

        let snapshot: Vec<DiscoveryPacket> = packets.values().cloned().collect();
        drop(packets);
        self.recompute_pickables(&snapshot);
    }

    /// Drop all radios announced by one source (listener disabled).
    pub fn remove_source(&self, source: PacketSource) {
        let mut packets = self.packets.lock().unwrap();
        let before = packets.len();
        packets.retain(|_, packet| packet.source != source);
        let removed = before - packets.len();
        let snapshot: Vec<DiscoveryPacket> = packets.values().cloned().collect();
        drop(packets);

        if removed > 0 {
            tracing::debug!(?source, removed, "radios dropped with listener");
            self.recompute_pickables(&snapshot);
        }
    }

    /// Snapshot of all known radios.
    pub fn radios(&self) -> Vec<DiscoveryPacket> {
        self.packets.lock().unwrap().values().cloned().collect()
    }

    /// Look up one radio by serial and source.
    pub fn find(&self, serial: &str, source: PacketSource) -> Option<DiscoveryPacket> {
        self.packets
            .lock()
            .unwrap()
            .values()
            .find(|p| p.serial == serial && p.source == source)
            .cloned()
    }

    /// One pickable entry per radio.
    pub fn pickable_radios(&self) -> Vec<Pickable> {
        self.pickable_radios.lock().unwrap().clone()
    }

    /// One pickable entry per connected GUI client.
    pub fn pickable_stations(&self) -> Vec<Pickable> {
        self.pickable_stations.lock().unwrap().clone()
    }

    fn emit(&self, kind: ClientEventKind, radio_key: &str, client: &GuiClient) {
        tracing::debug!(?kind, station = %client.station, "gui client");
        let _ = self.client_events.send(ClientEvent {
            kind,
            radio_key: radio_key.to_string(),
            client: client.clone(),
        });
    }

    fn recompute_pickables(&self, packets: &[DiscoveryPacket]) {
        let mut radios = Vec::with_capacity(packets.len());
        let mut stations = Vec::new();
        for packet in packets {
            radios.push(Pickable {
                radio_key: packet.key(),
                source: packet.source,
                nickname: packet.nickname.clone(),
                serial: packet.serial.clone(),
                station: packet.gui_client_stations.clone(),
            });
            for client in &packet.gui_clients {
                stations.push(Pickable {
                    radio_key: packet.key(),
                    source: packet.source,
                    nickname: packet.nickname.clone(),
                    serial: packet.serial.clone(),
                    station: client.station.clone(),
                });
            }
        }
        *self.pickable_radios.lock().unwrap() = radios;
        *self.pickable_stations.lock().unwrap() = stations;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn announcement(serial: &str, handles: &str, stations: &str) -> DiscoveryPacket {
        let slots = handles.split(',').count();
        let programs = vec!["SmartSDR"; slots].join(",");
        let ips = vec!["10.0.0.9"; slots].join(",");
        DiscoveryPacket {
            serial: serial.into(),
            nickname: format!("radio-{serial}"),
            ip: "192.168.1.200".into(),
            public_ip: "192.168.1.200".into(),
            gui_client_handles: handles.into(),
            gui_client_programs: if handles.is_empty() { String::new() } else { programs },
            gui_client_stations: stations.into(),
            gui_client_ips: if handles.is_empty() { String::new() } else { ips },
            ..DiscoveryPacket::default()
        }
    }

    fn drain(rx: &mut broadcast::Receiver<ClientEvent>) -> Vec<(ClientEventKind, String)> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push((event.kind, event.client.station.clone()));
        }
        events
    }

    #[test]
    fn new_radio_emits_added_for_each_client() {
        let directory = Directory::new();
        let mut rx = directory.client_events();

        directory.process(announcement("S1", "0x1,0x2", "Desk,Mobile"));

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|(k, _)| *k == ClientEventKind::Added));
        assert_eq!(directory.radios().len(), 1);
        assert_eq!(directory.pickable_radios().len(), 1);
        assert_eq!(directory.pickable_stations().len(), 2);
    }

    #[test]
    fn identical_reannouncement_refreshes_timestamp_only() {
        let directory = Directory::new();
        let mut rx = directory.client_events();

        directory.process(announcement("S1", "0x1", "Desk"));
        drain(&mut rx);
        let first_seen = directory.radios()[0].last_seen;

        let mut again = announcement("S1", "0x1", "Desk");
        again.last_seen = Instant::now();
        directory.process(again);

        assert!(drain(&mut rx).is_empty());
        assert_eq!(directory.radios().len(), 1);
        assert!(directory.radios()[0].last_seen >= first_seen);
    }

    #[test]
    fn client_delta_emits_added_and_removed() {
        let directory = Directory::new();
        let mut rx = directory.client_events();

        directory.process(announcement("S1", "0x1,0x2", "Desk,Mobile"));
        drain(&mut rx);

        // 0x2 leaves, 0x3 joins.
        directory.process(announcement("S1", "0x1,0x3", "Desk,Remote"));
        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert!(events.contains(&(ClientEventKind::Added, "Remote".into())));
        assert!(events.contains(&(ClientEventKind::Removed, "Mobile".into())));
        assert_eq!(directory.pickable_stations().len(), 2);
    }

    #[test]
    fn malformed_announcement_is_discarded() {
        let directory = Directory::new();
        let mut packet = announcement("S1", "0x1,0x2", "Desk,Mobile");
        packet.gui_client_ips = "10.0.0.9".into(); // ragged
        directory.process(packet);
        assert!(directory.radios().is_empty());
    }

    #[test]
    fn radios_keyed_by_serial_and_public_ip() {
        let directory = Directory::new();
        let local = announcement("S1", "", "");
        let mut wan = announcement("S1", "", "");
        wan.source = PacketSource::Smartlink;
        wan.public_ip = "77.24.1.200".into();

        directory.process(local);
        directory.process(wan);
        assert_eq!(directory.radios().len(), 2);
        assert!(directory.find("S1", PacketSource::Local).is_some());
        assert!(directory.find("S1", PacketSource::Smartlink).is_some());
    }

    #[test]
    fn remove_source_drops_only_that_source() {
        let directory = Directory::new();
        directory.process(announcement("S1", "", ""));
        let mut wan = announcement("S2", "0x9", "Away");
        wan.source = PacketSource::Smartlink;
        wan.public_ip = "77.24.1.200".into();
        directory.process(wan);

        directory.remove_source(PacketSource::Smartlink);
        let radios = directory.radios();
        assert_eq!(radios.len(), 1);
        assert_eq!(radios[0].serial, "S1");
        assert!(directory.pickable_stations().is_empty());
    }

    #[test]
    fn update_preserves_packet_identity_key() {
        let directory = Directory::new();
        directory.process(announcement("S1", "0x1", "Desk"));
        let mut update = announcement("S1", "0x1", "Desk");
        update.nickname = "renamed".into();
        directory.process(update);

        let radios = directory.radios();
        assert_eq!(radios.len(), 1);
        assert_eq!(radios[0].nickname, "renamed");
        // Client survived the update untouched.
        assert_eq!(radios[0].gui_clients.len(), 1);
    }
}
