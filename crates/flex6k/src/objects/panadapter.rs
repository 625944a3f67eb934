//! Panadapter (spectrum display) model.
//!
//! Panadapters arrive under the `display` status type:
//!
//! ```text
//! display pan 0x40000001 center=14.100000 bandwidth=0.200000 fps=25 ...
//! ```
//!
//! The id is the stream id its FFT bins arrive on over UDP.

use flex6k_core::{parse_bool, parse_handle, Handle, StreamId};

use super::{KeyValue, RadioObject};

/// One panadapter, keyed by its hex stream id.
#[derive(Debug, Clone, Default)]
pub struct Panadapter {
    id: StreamId,
    /// Handle of the owning client.
    pub client_handle: Handle,
    /// Center frequency in MHz.
    pub center_mhz: f64,
    /// Displayed bandwidth in MHz.
    pub bandwidth_mhz: f64,
    /// Lower/upper display bounds in dBm.
    pub min_dbm: f64,
    pub max_dbm: f64,
    /// Frame rate in frames per second.
    pub fps: u32,
    /// Averaging factor 0-100.
    pub average: u32,
    /// Weighted averaging enabled.
    pub weighted_average: bool,
    /// RF gain/preamp setting in dB.
    pub rf_gain: i32,
    /// Receive antenna port.
    pub rx_ant: String,
    /// Band token ("20", "40", "WWV", ...).
    pub band: String,
    /// Stream id of the attached waterfall.
    pub waterfall: StreamId,
    /// Display width in bins, as last requested.
    pub x_pixels: u32,
    /// Wide (full SCU bandwidth) mode.
    pub wide: bool,
}

enum Property {
    Average,
    Band,
    Bandwidth,
    Center,
    ClientHandle,
    Fps,
    MaxDbm,
    MinDbm,
    RfGain,
    RxAnt,
    Waterfall,
    WeightedAverage,
    Wide,
    XPixels,
}

impl Property {
    fn from_token(token: &str) -> Option<Property> {
        Some(match token {
            "average" => Property::Average,
            "band" => Property::Band,
            "bandwidth" => Property::Bandwidth,
            "center" => Property::Center,
            "client_handle" => Property::ClientHandle,
            "fps" => Property::Fps,
            "max_dbm" => Property::MaxDbm,
            "min_dbm" => Property::MinDbm,
            "rfgain" => Property::RfGain,
            "rxant" => Property::RxAnt,
            "waterfall" => Property::Waterfall,
            "weighted_average" => Property::WeightedAverage,
            "wide" => Property::Wide,
            "x_pixels" => Property::XPixels,
            _ => return None,
        })
    }
}

impl RadioObject for Panadapter {
    type Id = StreamId;
    const TYPE_NAME: &'static str = "pan";

    fn new(id: StreamId) -> Panadapter {
        Panadapter {
            id,
            ..Panadapter::default()
        }
    }

    fn id(&self) -> &StreamId {
        &self.id
    }

    fn parse_id(token: &str) -> Option<StreamId> {
        parse_handle(token)
    }

    fn apply(&mut self, properties: &[KeyValue]) {
        for (key, value) in properties {
            let Some(token) = Property::from_token(key) else {
                tracing::warn!(key = %key, value = %value, "Panadapter: unknown property");
                continue;
            };
            match token {
                Property::Average => self.average = value.parse().unwrap_or(self.average),
                Property::Band => self.band = value.clone(),
                Property::Bandwidth => {
                    self.bandwidth_mhz = value.parse().unwrap_or(self.bandwidth_mhz)
                }
                Property::Center => self.center_mhz = value.parse().unwrap_or(self.center_mhz),
                Property::ClientHandle => {
                    self.client_handle = parse_handle(value).unwrap_or(self.client_handle)
                }
                Property::Fps => self.fps = value.parse().unwrap_or(self.fps),
                Property::MaxDbm => self.max_dbm = value.parse().unwrap_or(self.max_dbm),
                Property::MinDbm => self.min_dbm = value.parse().unwrap_or(self.min_dbm),
                Property::RfGain => self.rf_gain = value.parse().unwrap_or(self.rf_gain),
                Property::RxAnt => self.rx_ant = value.clone(),
                Property::Waterfall => {
                    self.waterfall = parse_handle(value).unwrap_or(self.waterfall)
                }
                Property::WeightedAverage => self.weighted_average = parse_bool(value),
                Property::Wide => self.wide = parse_bool(value),
                Property::XPixels => self.x_pixels = value.parse().unwrap_or(self.x_pixels),
            }
        }
    }

    fn initialized(&self) -> bool {
        self.center_mhz != 0.0 && self.bandwidth_mhz != 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flex6k_proto::key_values;

    #[test]
    fn id_is_hex_stream_id() {
        assert_eq!(Panadapter::parse_id("0x40000001"), Some(0x4000_0001));
        assert_eq!(Panadapter::parse_id("40000001"), Some(0x4000_0001));
        assert_eq!(Panadapter::parse_id("pan"), None);
    }

    #[test]
    fn apply_and_initialize() {
        let mut p = Panadapter::new(0x4000_0001);
        assert!(!p.initialized());
        p.apply(&key_values(
            "center=14.100000 bandwidth=0.200000 fps=25 average=10 waterfall=0x42000000",
            ' ',
        ));
        assert!(p.initialized());
        assert_eq!(p.center_mhz, 14.1);
        assert_eq!(p.bandwidth_mhz, 0.2);
        assert_eq!(p.fps, 25);
        assert_eq!(p.waterfall, 0x4200_0000);
    }

    #[test]
    fn removal_is_default_marker() {
        assert!(Panadapter::is_removal("0x40000001 removed"));
        assert!(!Panadapter::is_removal("0x40000001 center=14.1"));
    }

    #[test]
    fn unknown_keys_skipped() {
        let mut p = Panadapter::new(1);
        p.apply(&key_values("daxiq_channel=1 center=7.0", ' '));
        assert_eq!(p.center_mhz, 7.0);
    }
}
