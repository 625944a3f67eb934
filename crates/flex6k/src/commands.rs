//! Command string builders.
//!
//! Each builder returns the command text WITHOUT the `C<seq>|` prefix; the
//! session adds the prefix when it assigns a sequence number.

use flex6k_core::{format_handle, Handle, StreamId};

/// Keep-alive probe. The radio answers with an empty reply.
pub fn ping() -> String {
    "ping".to_string()
}

/// Tell the radio to expect keep-alives and drop us if they stop.
pub fn keepalive_enable() -> String {
    "keepalive enable".to_string()
}

/// Register the client program name.
pub fn client_program(name: &str) -> String {
    format!("client program {name}")
}

/// Register the station name (GUI clients).
pub fn client_station(name: &str) -> String {
    format!("client station {name}")
}

/// Declare this connection a GUI client.
pub fn client_gui() -> String {
    "client gui".to_string()
}

/// Ask the radio to disconnect another client by handle.
pub fn client_disconnect(handle: Handle) -> String {
    format!("client disconnect {}", format_handle(handle))
}

/// Tell the radio which UDP port to send telemetry to (local connections).
pub fn client_udpport(port: u16) -> String {
    format!("client udpport {port}")
}

/// Register the UDP socket with the relay path (sent OVER UDP, smartlink).
pub fn client_udp_register(handle: Handle) -> String {
    format!("client udp_register handle={}", format_handle(handle))
}

/// Ask the radio for the IP it sees us at (smartlink connections).
pub fn client_ip() -> String {
    "client ip".to_string()
}

/// Validate a relay-issued connection handle with the radio.
pub fn wan_validate(wan_handle: &str) -> String {
    format!("wan validate handle={wan_handle}")
}

/// Subscribe to a status domain, e.g. `sub_all("slice")`.
pub fn sub_all(object: &str) -> String {
    format!("sub {object} all")
}

/// Request the radio's info block.
pub fn info() -> String {
    "info".to_string()
}

/// Request component version details.
pub fn version() -> String {
    "version".to_string()
}

/// Create a slice at a frequency (MHz) and mode.
pub fn slice_create(freq_mhz: f64, mode: &str) -> String {
    format!("slice create freq={freq_mhz:.6} mode={mode}")
}

/// Tune a slice to a frequency in MHz.
pub fn slice_tune(slice_id: u32, freq_mhz: f64) -> String {
    format!("slice tune {slice_id} {freq_mhz:.6}")
}

/// Remove a slice.
pub fn slice_remove(slice_id: u32) -> String {
    format!("slice remove {slice_id}")
}

/// Set a panadapter property.
pub fn display_pan_set(id: StreamId, key: &str, value: &str) -> String {
    format!("display pan set {} {key}={value}", format_handle(id))
}

/// Create a DAX RX audio stream for a channel (1-8).
pub fn stream_create_dax_rx(channel: u8) -> String {
    format!("stream create type=dax_rx dax_channel={channel}")
}

/// Remove a stream by id.
pub fn stream_remove(id: StreamId) -> String {
    format!("stream remove {}", format_handle(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_commands() {
        assert_eq!(client_program("flex6k"), "client program flex6k");
        assert_eq!(client_station("Shack"), "client station Shack");
        assert_eq!(client_gui(), "client gui");
        assert_eq!(
            client_disconnect(0x1234_5678),
            "client disconnect 0x12345678"
        );
        assert_eq!(client_udpport(4991), "client udpport 4991");
        assert_eq!(
            client_udp_register(0x42),
            "client udp_register handle=0x00000042"
        );
    }

    #[test]
    fn wan_and_sub() {
        assert_eq!(wan_validate("ABC-123"), "wan validate handle=ABC-123");
        assert_eq!(sub_all("slice"), "sub slice all");
        assert_eq!(sub_all("meter"), "sub meter all");
    }

    #[test]
    fn slice_commands() {
        assert_eq!(slice_create(14.25, "USB"), "slice create freq=14.250000 mode=USB");
        assert_eq!(slice_tune(0, 7.074), "slice tune 0 7.074000");
        assert_eq!(slice_remove(2), "slice remove 2");
    }

    #[test]
    fn display_and_stream() {
        assert_eq!(
            display_pan_set(0x4000_0001, "fps", "25"),
            "display pan set 0x40000001 fps=25"
        );
        assert_eq!(
            stream_create_dax_rx(1),
            "stream create type=dax_rx dax_channel=1"
        );
        assert_eq!(stream_remove(0x2000_0001), "stream remove 0x20000001");
    }
}
