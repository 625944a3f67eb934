//! Transmit chain state (singleton).
//!
//! ```text
//! transmit freq=14.250000 rfpower=100 tunepower=10 vox_enable=0 ...
//! ```

use flex6k_core::parse_bool;

use super::{KeyValue, StaticObject};

/// Radio-wide transmit configuration and state.
#[derive(Debug, Clone, Default)]
pub struct Transmit {
    /// Transmit frequency in MHz.
    pub frequency_mhz: f64,
    /// RF power setting 0-100.
    pub rf_power: u32,
    /// Tune power setting 0-100.
    pub tune_power: u32,
    /// Hard power cap.
    pub max_power_level: u32,
    /// Whether ATU tune is active.
    pub tune: bool,
    /// Selected microphone input.
    pub mic_selection: String,
    /// Mic gain 0-100.
    pub mic_level: u32,
    /// VOX enabled / level.
    pub vox_enabled: bool,
    pub vox_level: u32,
    /// External hardware ALC enabled.
    pub hw_alc_enabled: bool,
    /// AM carrier level.
    pub am_carrier_level: u32,
    /// Whether the object has parsed at least one status.
    pub initialized: bool,
}

enum Property {
    AmCarrierLevel,
    Frequency,
    HwAlcEnabled,
    MaxPowerLevel,
    MicLevel,
    MicSelection,
    RfPower,
    Tune,
    TunePower,
    VoxEnabled,
    VoxLevel,
}

impl Property {
    fn from_token(token: &str) -> Option<Property> {
        Some(match token {
            "am_carrier_level" => Property::AmCarrierLevel,
            "freq" => Property::Frequency,
            "hwalc_enabled" => Property::HwAlcEnabled,
            "max_power_level" => Property::MaxPowerLevel,
            "mic_level" => Property::MicLevel,
            "mic_selection" => Property::MicSelection,
            "rfpower" => Property::RfPower,
            "tune" => Property::Tune,
            "tunepower" => Property::TunePower,
            "vox_enable" => Property::VoxEnabled,
            "vox_level" => Property::VoxLevel,
            _ => return None,
        })
    }
}

impl StaticObject for Transmit {
    const TYPE_NAME: &'static str = "transmit";

    fn apply(&mut self, properties: &[KeyValue]) {
        for (key, value) in properties {
            let Some(token) = Property::from_token(key) else {
                tracing::warn!(key = %key, value = %value, "Transmit: unknown property");
                continue;
            };
            match token {
                Property::AmCarrierLevel => {
                    self.am_carrier_level = value.parse().unwrap_or(self.am_carrier_level)
                }
                Property::Frequency => {
                    self.frequency_mhz = value.parse().unwrap_or(self.frequency_mhz)
                }
                Property::HwAlcEnabled => self.hw_alc_enabled = parse_bool(value),
                Property::MaxPowerLevel => {
                    self.max_power_level = value.parse().unwrap_or(self.max_power_level)
                }
                Property::MicLevel => self.mic_level = value.parse().unwrap_or(self.mic_level),
                Property::MicSelection => self.mic_selection = value.clone(),
                Property::RfPower => self.rf_power = value.parse().unwrap_or(self.rf_power),
                Property::Tune => self.tune = parse_bool(value),
                Property::TunePower => self.tune_power = value.parse().unwrap_or(self.tune_power),
                Property::VoxEnabled => self.vox_enabled = parse_bool(value),
                Property::VoxLevel => self.vox_level = value.parse().unwrap_or(self.vox_level),
            }
        }
        self.initialized = true;
    }
}
