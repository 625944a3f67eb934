//! External amplifier model.
//!
//! Amplifiers are network accessories the radio proxies into its status
//! feed, keyed by a hex handle:
//!
//! ```text
//! amplifier 0x32000001 ant=ANT1 ip=192.168.1.40 model=PGXL serial=123 state=IDLE
//! ```

use flex6k_core::{parse_bool, parse_handle, Handle};

use super::{KeyValue, RadioObject};

/// One amplifier, keyed by its hex handle.
#[derive(Debug, Clone, Default)]
pub struct Amplifier {
    id: Handle,
    /// Antenna port the amplifier is in line with.
    pub ant: String,
    /// Amplifier IP address on the LAN.
    pub ip: String,
    /// Model string.
    pub model: String,
    /// Control port.
    pub port: u16,
    /// Whether the amplifier is in operate (vs standby).
    pub operate: bool,
    /// Serial number.
    pub serial: String,
    /// State token (`"IDLE"`, `"TRANSMITTING"`, `"FAULT"`, ...).
    pub state: String,
    seen: bool,
}

enum Property {
    Ant,
    Ip,
    Model,
    Operate,
    Port,
    Serial,
    State,
}

impl Property {
    fn from_token(token: &str) -> Option<Property> {
        Some(match token {
            "ant" => Property::Ant,
            "ip" => Property::Ip,
            "model" => Property::Model,
            "operate" => Property::Operate,
            "port" => Property::Port,
            "serial_num" => Property::Serial,
            "state" => Property::State,
            _ => return None,
        })
    }
}

impl RadioObject for Amplifier {
    type Id = Handle;
    const TYPE_NAME: &'static str = "amplifier";

    fn new(id: Handle) -> Amplifier {
        Amplifier {
            id,
            ..Amplifier::default()
        }
    }

    fn id(&self) -> &Handle {
        &self.id
    }

    fn parse_id(token: &str) -> Option<Handle> {
        parse_handle(token)
    }

    fn apply(&mut self, properties: &[KeyValue]) {
        for (key, value) in properties {
            let Some(token) = Property::from_token(key) else {
                tracing::warn!(key = %key, value = %value, "Amplifier: unknown property");
                continue;
            };
            match token {
                Property::Ant => self.ant = value.clone(),
                Property::Ip => self.ip = value.clone(),
                Property::Model => self.model = value.clone(),
                Property::Operate => self.operate = parse_bool(value),
                Property::Port => self.port = value.parse().unwrap_or(self.port),
                Property::Serial => self.serial = value.clone(),
                Property::State => self.state = value.clone(),
            }
        }
        self.seen = true;
    }

    fn initialized(&self) -> bool {
        self.seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flex6k_proto::key_values;

    #[test]
    fn apply_fields() {
        let mut a = Amplifier::new(0x3200_0001);
        a.apply(&key_values(
            "ant=ANT1 ip=192.168.1.40 model=PGXL serial_num=1234 state=IDLE operate=1",
            ' ',
        ));
        assert_eq!(a.model, "PGXL");
        assert_eq!(a.state, "IDLE");
        assert!(a.operate);
        assert!(a.initialized());
    }

    #[test]
    fn keyed_by_handle() {
        assert_eq!(Amplifier::parse_id("0x32000001"), Some(0x3200_0001));
    }
}
