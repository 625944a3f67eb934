//! Discovery announcement parsing.
//!
//! Both listeners deliver the same shape: a flat set of named fields
//! describing one radio, including four parallel comma-separated lists
//! enumerating the GUI clients currently connected to it.

use std::time::Instant;

use flex6k_core::{parse_bool, parse_handle, Handle};

/// Which listener produced an announcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketSource {
    /// Local broadcast on the LAN.
    Local,
    /// The smartlink relay service.
    Smartlink,
}

/// One GUI client connected to a radio, parsed from the announcement's
/// parallel CSV lists (and later refined by `client` status messages).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuiClient {
    /// The client's connection handle.
    pub handle: Handle,
    /// Station name.
    pub station: String,
    /// Program name.
    pub program: String,
    /// Client IP address.
    pub ip: String,
    /// Persistent client id, when known.
    pub client_id: Option<String>,
    /// Whether the client has local PTT control.
    pub is_local_ptt: bool,
}

/// One radio announcement, either local or relay-sourced.
///
/// Uniquely keyed by `(serial, public_ip)`: the same radio reachable both
/// locally and through the relay appears twice, which is intended -- the
/// two paths have different connect parameters.
#[derive(Debug, Clone)]
pub struct DiscoveryPacket {
    pub source: PacketSource,
    pub model: String,
    pub serial: String,
    pub version: String,
    pub nickname: String,
    pub callsign: String,
    /// LAN IP and command port.
    pub ip: String,
    pub port: u16,
    pub status: String,
    /// Relay-side addressing.
    pub public_ip: String,
    pub public_tls_port: u16,
    pub public_udp_port: u16,
    pub requires_hole_punch: bool,
    pub negotiated_hole_punch_port: u16,
    /// Parallel CSV lists describing connected GUI clients.
    pub gui_client_handles: String,
    pub gui_client_programs: String,
    pub gui_client_stations: String,
    pub gui_client_ips: String,
    /// Clients parsed from the CSV lists by the directory.
    pub gui_clients: Vec<GuiClient>,
    /// When this announcement was received.
    pub last_seen: Instant,
}

impl Default for DiscoveryPacket {
    fn default() -> Self {
        DiscoveryPacket {
            source: PacketSource::Local,
            model: String::new(),
            serial: String::new(),
            version: String::new(),
            nickname: String::new(),
            callsign: String::new(),
            ip: String::new(),
            port: 4992,
            status: String::new(),
            public_ip: String::new(),
            public_tls_port: 0,
            public_udp_port: 0,
            requires_hole_punch: false,
            negotiated_hole_punch_port: 0,
            gui_client_handles: String::new(),
            gui_client_programs: String::new(),
            gui_client_stations: String::new(),
            gui_client_ips: String::new(),
            gui_clients: Vec::new(),
            last_seen: Instant::now(),
        }
    }
}

impl DiscoveryPacket {
    /// Build a packet from announcement fields.
    ///
    /// `fallback_ip` supplies the LAN address when the payload lacks an
    /// `ip` field (the datagram's source address for local discovery).
    pub fn from_fields(
        source: PacketSource,
        fields: &[(String, String)],
        fallback_ip: &str,
    ) -> DiscoveryPacket {
        let mut packet = DiscoveryPacket {
            source,
            ip: fallback_ip.to_string(),
            ..DiscoveryPacket::default()
        };

        for (key, value) in fields {
            match key.as_str() {
                "model" => packet.model = value.clone(),
                "serial" => packet.serial = value.clone(),
                "version" => packet.version = value.clone(),
                "nickname" | "radio_name" => packet.nickname = value.clone(),
                "callsign" => packet.callsign = value.clone(),
                "ip" => packet.ip = value.clone(),
                "port" => packet.port = value.parse().unwrap_or(packet.port),
                "status" => packet.status = value.clone(),
                "public_ip" => packet.public_ip = value.clone(),
                "public_tls_port" => {
                    packet.public_tls_port = value.parse().unwrap_or(packet.public_tls_port)
                }
                "public_udp_port" => {
                    packet.public_udp_port = value.parse().unwrap_or(packet.public_udp_port)
                }
                "requires_hole_punch" => packet.requires_hole_punch = parse_bool(value),
                "negotiated_hole_punch_port" => {
                    packet.negotiated_hole_punch_port =
                        value.parse().unwrap_or(packet.negotiated_hole_punch_port)
                }
                "gui_client_handles" => packet.gui_client_handles = value.clone(),
                "gui_client_programs" => packet.gui_client_programs = value.clone(),
                "gui_client_stations" => packet.gui_client_stations = value.clone(),
                "gui_client_ips" => packet.gui_client_ips = value.clone(),
                // Announcements carry plenty of fields this engine does
                // not track (license state, available slice counts, ...).
                _ => {}
            }
        }

        // Local radios are their own public address.
        if packet.public_ip.is_empty() {
            packet.public_ip = packet.ip.clone();
        }
        packet
    }

    /// The directory key: one entry per (radio, reachability path).
    pub fn key(&self) -> String {
        format!("{}|{}", self.serial, self.public_ip)
    }

    /// Parse the four parallel CSV lists into clients.
    ///
    /// Returns `None` when the non-empty lists disagree in length -- such
    /// an announcement is malformed and must be discarded. All-empty lists
    /// mean no clients. Slots with an unparsable handle or an empty
    /// station/program/ip are skipped.
    pub fn parse_gui_clients(&self) -> Option<Vec<GuiClient>> {
        if self.gui_client_handles.is_empty()
            && self.gui_client_programs.is_empty()
            && self.gui_client_stations.is_empty()
        {
            return Some(Vec::new());
        }

        let handles: Vec<&str> = self.gui_client_handles.split(',').collect();
        let programs: Vec<&str> = self.gui_client_programs.split(',').collect();
        let stations: Vec<&str> = self.gui_client_stations.split(',').collect();
        let ips: Vec<&str> = self.gui_client_ips.split(',').collect();

        if programs.len() != handles.len()
            || stations.len() != handles.len()
            || ips.len() != handles.len()
        {
            return None;
        }

        let mut clients = Vec::new();
        for i in 0..handles.len() {
            let Some(handle) = parse_handle(handles[i]) else {
                continue;
            };
            if stations[i].is_empty() || programs[i].is_empty() || ips[i].is_empty() {
                continue;
            }
            clients.push(GuiClient {
                handle,
                // Station names carry spaces as 0x7f on some firmware.
                station: stations[i].replace('\u{7f}', " "),
                program: programs[i].to_string(),
                ip: ips[i].to_string(),
                client_id: None,
                is_local_ptt: false,
            });
        }
        Some(clients)
    }

    /// Whether this announcement differs from a stored one in anything but
    /// the timestamp.
    pub fn is_different(&self, other: &DiscoveryPacket) -> bool {
        self.nickname != other.nickname
            || self.status != other.status
            || self.callsign != other.callsign
            || self.version != other.version
            || self.ip != other.ip
            || self.port != other.port
            || self.gui_client_handles != other.gui_client_handles
            || self.gui_client_programs != other.gui_client_programs
            || self.gui_client_stations != other.gui_client_stations
            || self.gui_client_ips != other.gui_client_ips
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flex6k_proto::key_values;

    fn packet_with_clients(
        handles: &str,
        programs: &str,
        stations: &str,
        ips: &str,
    ) -> DiscoveryPacket {
        DiscoveryPacket {
            serial: "1234-5678-9012-3456".into(),
            gui_client_handles: handles.into(),
            gui_client_programs: programs.into(),
            gui_client_stations: stations.into(),
            gui_client_ips: ips.into(),
            ..DiscoveryPacket::default()
        }
    }

    #[test]
    fn from_fields_basic() {
        let fields = key_values(
            "model=FLEX-6600 serial=1234-5678-9012-3456 version=3.3.32 \
             nickname=Shack ip=192.168.1.200 port=4992 status=Available",
            ' ',
        );
        let packet = DiscoveryPacket::from_fields(PacketSource::Local, &fields, "192.168.1.1");
        assert_eq!(packet.model, "FLEX-6600");
        assert_eq!(packet.serial, "1234-5678-9012-3456");
        assert_eq!(packet.ip, "192.168.1.200");
        assert_eq!(packet.port, 4992);
        // Local radios key on their own LAN address.
        assert_eq!(packet.public_ip, "192.168.1.200");
        assert_eq!(packet.key(), "1234-5678-9012-3456|192.168.1.200");
    }

    #[test]
    fn from_fields_uses_fallback_ip() {
        let fields = key_values("serial=S1 model=FLEX-6400", ' ');
        let packet = DiscoveryPacket::from_fields(PacketSource::Local, &fields, "10.0.0.7");
        assert_eq!(packet.ip, "10.0.0.7");
        assert_eq!(packet.public_ip, "10.0.0.7");
    }

    #[test]
    fn smartlink_fields() {
        let fields = key_values(
            "serial=S2 public_ip=77.24.1.200 public_tls_port=4993 public_udp_port=4994 \
             requires_hole_punch=1 negotiated_hole_punch_port=10000",
            ' ',
        );
        let packet = DiscoveryPacket::from_fields(PacketSource::Smartlink, &fields, "");
        assert_eq!(packet.public_ip, "77.24.1.200");
        assert_eq!(packet.public_tls_port, 4993);
        assert!(packet.requires_hole_punch);
        assert_eq!(packet.negotiated_hole_punch_port, 10000);
        assert_eq!(packet.key(), "S2|77.24.1.200");
    }

    #[test]
    fn gui_clients_with_empty_trailing_slots() {
        // Three slots, one populated: exactly one client comes out.
        let packet = packet_with_clients(
            "0x12345678,,",
            "xSDR6000,,",
            "40 Meters,,",
            "192.168.1.222,,",
        );
        let clients = packet.parse_gui_clients().unwrap();
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].handle, 0x1234_5678);
        assert_eq!(clients[0].program, "xSDR6000");
        assert_eq!(clients[0].station, "40 Meters");
        assert_eq!(clients[0].ip, "192.168.1.222");
    }

    #[test]
    fn gui_clients_all_empty_lists() {
        let packet = packet_with_clients("", "", "", "");
        assert_eq!(packet.parse_gui_clients().unwrap(), Vec::new());
    }

    #[test]
    fn gui_clients_unequal_lists_is_malformed() {
        let packet = packet_with_clients("0x1,0x2", "SmartSDR", "Shack", "10.0.0.1");
        assert!(packet.parse_gui_clients().is_none());
    }

    #[test]
    fn gui_clients_two_populated_slots() {
        let packet = packet_with_clients(
            "0x1A2B3C4D,0x2B3C4D5E",
            "SmartSDR,Maestro",
            "Desk,Mobile",
            "10.0.0.2,10.0.0.3",
        );
        let clients = packet.parse_gui_clients().unwrap();
        assert_eq!(clients.len(), 2);
        assert_eq!(clients[1].handle, 0x2B3C_4D5E);
        assert_eq!(clients[1].station, "Mobile");
    }

    #[test]
    fn station_names_unescape_spaces() {
        let packet = packet_with_clients("0x1", "SmartSDR", "40\u{7f}Meters", "10.0.0.1");
        let clients = packet.parse_gui_clients().unwrap();
        assert_eq!(clients[0].station, "40 Meters");
    }

    #[test]
    fn is_different_ignores_timestamp() {
        let a = packet_with_clients("0x1", "SmartSDR", "Desk", "10.0.0.1");
        let mut b = a.clone();
        b.last_seen = Instant::now();
        assert!(!a.is_different(&b));

        b.gui_client_stations = "Mobile".into();
        assert!(a.is_different(&b));
    }
}
