pub mod identity;
pub mod local;
pub mod memory;
pub mod store;

pub use identity::{Identity, IdentityError, IdentityProvider, IdentityToken, TokenClaims};
pub use local::LocalIdentityProvider;
pub use memory::{FaultyStore, MemoryProfileStore};
pub use store::{Predicate, ProfileStore, StoreError};
