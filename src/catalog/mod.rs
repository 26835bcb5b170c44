pub mod actor;
pub mod conditions;
pub mod kalshi;
pub mod normalize;
pub mod polymarket;
