//! Ports layer: the hexagonal trait seams.
//!
//! - Inbound (driving): `OverlayApi`, the surface exposed to hosts.
//! - Outbound (driven): storage, topic managers, lookup services,
//!   advertiser, broadcaster, chain tracker and peer transport.

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
