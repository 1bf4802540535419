//! Shared-State Registry: the process-wide singletons described in §4.9 —
//! the tracked-whale map, the stablecoin blacklist, the persistent
//! emitted-token set, and the buying-in-progress set. Everything that
//! touches durable state in the core goes through this crate.

mod atomic;
mod emitted;
mod history;
mod whales;

pub use emitted::EmittedTokenRegistry;
pub use history::PurchaseHistory;
pub use whales::{WhaleRegistry, WhaleRegistryError};
