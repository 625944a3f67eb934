//! Radio discovery: local broadcast listening, smartlink relay listening,
//! and the merged directory of reachable radios.

mod directory;
mod lan;
mod packet;
mod smartlink;

pub use directory::{ClientEvent, ClientEventKind, Directory, Pickable};
pub use lan::LanListener;
pub use packet::{DiscoveryPacket, GuiClient, PacketSource};
pub use smartlink::{AuthProvider, RelayControl, StaticTokenAuth, WanListener};

/// UDP port radios broadcast discovery packets on.
pub const DISCOVERY_PORT: u16 = 4992;

/// Default smartlink relay endpoint.
pub const SMARTLINK_HOST: &str = "smartlink.flexradio.com";
pub const SMARTLINK_PORT: u16 = 443;
