// Auction - per-group continuous double-auction matching and settlement

mod types;
mod config;
mod order;
mod book;
mod state;

pub mod account;
pub mod error;
pub mod ledger;
pub mod market;
pub mod matching;
pub mod projector;
pub mod settlement;
pub mod validator;

pub use types::{Cash, GroupKey, ParticipantId, Price, Qty, Round, Side, StageKey};
pub use config::{AuctionConfig, CfgError, DuplicateScope, HistoryWindow};
pub use order::Order;
pub use book::OrderBook;
pub use state::{GroupState, RoundContext};

pub use account::{roster_of, Account, FieldAccessor, ResourceAccessor, Roster, TradeStats};
pub use error::{MarketError, Result};
pub use ledger::{PriceEvent, PriceHistory, PriceTick, RoundClock, SubmittedOffer, TradeLedger, TradeRecord};
pub use market::{Market, Outcome};
pub use projector::{MarketStateView, Notification, NotificationKind, OfferView, TradeView};
