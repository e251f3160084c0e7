pub mod feed;
pub mod price_cache;

pub use feed::CoinGeckoFeed;
pub use price_cache::{CachedPrice, PriceCache};
