//! Identity backend seams and adapters. Keep the public surface thin and split
//! implementation across sub-modules.

mod principal;
mod provider;
mod role;
pub mod http;
pub mod memory;

pub use principal::SessionUser;
pub use provider::{AdminUsers, IdentityBackend, IdentityError, SessionBinder, UserField};
pub use role::Role;
pub use http::HttpIdentityClient;
pub use memory::MemoryIdentity;
