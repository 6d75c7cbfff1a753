//! The two in-memory caches.
//!
//! - [`InfoCache`]: decoded header facts per local path, so repeated requests
//!   for the same source skip the header read.
//! - [`TileCache`]: fully encoded responses keyed by the normalized request
//!   signature; a hit short-circuits the whole pipeline.
//!
//! Both are bounded LRUs behind async locks, and both treat a capacity of
//! zero as "disabled".

mod info;
mod tile;

pub use info::InfoCache;
pub use tile::{CachedTile, TileCache};
