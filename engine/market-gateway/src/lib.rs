//! # MarketGateway
//!
//! Live trading surface for one experiment group.
//!
//! ## Architecture
//!
//! - **Messages**: tagged JSON actions in, per-participant market views out
//! - **LiveMarket**: serializes every event for a group behind one lock and
//!   re-reads persisted state inside it
//! - **Broadcaster**: fans messages out to connected participants over
//!   unbounded channels, dropping closed ones

pub mod broadcaster;
pub mod error;
pub mod live_market;
pub mod messages;

pub use broadcaster::{Broadcast, Broadcaster};
pub use error::{GatewayError, GatewayResult};
pub use live_market::{DetailFn, LiveMarket};
pub use messages::{InboundAction, OutboundMessage, UpdateMessage};
