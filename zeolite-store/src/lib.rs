//! Persistence for zeolite availability data.
//!
//! - [`Store`]: a string key-value medium ([`MemoryStore`], [`FjallStore`])
//! - [`AvailabilityStore`]: loads, migrates, saves, imports and exports one
//!   owner's availability document through a [`Store`]
//!
//! Slot maps are written as arrays of `[slot, occupied]` pairs and rebuilt
//! into maps on every load. Documents written at schema v1 are upgraded on
//! load and written back once.

mod availability;
pub mod document;
mod error;
mod fjall_store;
mod kv;
mod profile;

pub use availability::{AVAILABILITY_KEY, AvailabilityStore, PROFILE_KEY};
pub use error::StoreError;
pub use fjall_store::{DEFAULT_KEYSPACE, FjallError, FjallStore};
pub use kv::{MemoryStore, Store};
pub use profile::OwnerProfile;
