//! Record store adapter.
//!
//! DESIGN
//! ======
//! The hosted record store (PocketBase) owns persistence and authentication.
//! Everything here is a thin, typed client; handlers and the session store
//! depend on the `RecordStore` trait so tests can swap in an in-memory fake.

pub mod pocketbase;
pub mod types;

pub use pocketbase::PocketBaseClient;
pub use types::{AuthError, AuthRecord, NetworkError, OAuthGrant, OAuthProvider, RecordStore, UserRecord};
