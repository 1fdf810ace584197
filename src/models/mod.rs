pub mod market;
pub mod subscription;

pub use market::{Coin, PricePoint, RateStats, TrackedAssets};
pub use subscription::{ChatId, Subscription};
