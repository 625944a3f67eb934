//! Transmit interlock state (singleton).
//!
//! The interlock gates keying: `state` walks RECEIVE → PTT_REQUESTED →
//! TRANSMITTING → UNKEY_REQUESTED and back, with `reason`/`source` set when
//! keying is denied.

use flex6k_core::parse_bool;

use super::{KeyValue, StaticObject};

/// Transmit interlock state.
#[derive(Debug, Clone, Default)]
pub struct Interlock {
    /// Interlock state token (`"RECEIVE"`, `"READY"`, `"TRANSMITTING"`, ...).
    pub state: String,
    /// Denial reason when keying is blocked.
    pub reason: String,
    /// Which input requested keying.
    pub source: String,
    /// Interlock timeout in ms.
    pub timeout: u32,
    /// Whether transmit is currently allowed.
    pub tx_allowed: bool,
    /// TX delay in ms.
    pub tx_delay: u32,
    /// Accessory / RCA TX enables.
    pub acc_tx_enabled: bool,
    pub rca_tx_enabled: bool,
    /// Whether the object has parsed at least one status.
    pub initialized: bool,
}

impl Interlock {
    /// Whether the state token indicates the radio is keyed or keying.
    pub fn is_transmitting(&self) -> bool {
        matches!(self.state.as_str(), "PTT_REQUESTED" | "TRANSMITTING")
    }
}

impl StaticObject for Interlock {
    const TYPE_NAME: &'static str = "interlock";

    fn apply(&mut self, properties: &[KeyValue]) {
        for (key, value) in properties {
            match key.as_str() {
                "state" => self.state = value.clone(),
                "reason" => self.reason = value.clone(),
                "source" => self.source = value.clone(),
                "timeout" => self.timeout = value.parse().unwrap_or(self.timeout),
                "tx_allowed" => self.tx_allowed = parse_bool(value),
                "tx_delay" => self.tx_delay = value.parse().unwrap_or(self.tx_delay),
                "acc_tx_enabled" => self.acc_tx_enabled = parse_bool(value),
                "rca_tx_enabled" => self.rca_tx_enabled = parse_bool(value),
                _ => {
                    tracing::warn!(key = %key, value = %value, "Interlock: unknown property");
                }
            }
        }
        self.initialized = true;
    }
}
