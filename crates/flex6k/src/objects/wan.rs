//! WAN (smartlink) link state (singleton).
//!
//! Pushed by the radio while it negotiates with the relay service:
//!
//! ```text
//! wan server_connected=1 radio_authenticated=1
//! ```

use flex6k_core::parse_bool;

use super::{KeyValue, StaticObject};

/// The radio's own view of its relay connectivity.
#[derive(Debug, Clone, Default)]
pub struct Wan {
    /// Whether the radio is connected to the relay server.
    pub server_connected: bool,
    /// Whether the relay has authenticated the radio.
    pub radio_authenticated: bool,
    /// Whether the object has parsed at least one status.
    pub initialized: bool,
}

impl StaticObject for Wan {
    const TYPE_NAME: &'static str = "wan";

    fn apply(&mut self, properties: &[KeyValue]) {
        for (key, value) in properties {
            match key.as_str() {
                "server_connected" => self.server_connected = parse_bool(value),
                "radio_authenticated" => self.radio_authenticated = parse_bool(value),
                _ => {
                    tracing::warn!(key = %key, value = %value, "Wan: unknown property");
                }
            }
        }
        if !self.initialized {
            self.initialized = true;
            tracing::debug!(
                server_connected = self.server_connected,
                radio_authenticated = self.radio_authenticated,
                "Wan: initialized"
            );
        }
    }
}
