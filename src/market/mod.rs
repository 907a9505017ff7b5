//! The market-object side: object kinds and the demand proxy over them.
pub mod object;
pub mod todays_market;

pub use object::MarketObject;
pub use todays_market::{Market, TodaysMarket, TodaysMarketBuilder};
