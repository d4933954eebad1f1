//! Cache module
//!
//! In-process caching for compiled-query inputs:
//! - `FilterCache` - TTL-bounded filter definition rows keyed by id set
//! - `Clock` - injectable time source used for expiry

pub mod clock;
mod filter_cache;

pub use clock::{Clock, SystemClock};
pub use filter_cache::FilterCache;
