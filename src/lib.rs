//! Parts inventory dashboard backed by PocketBase.
//!
//! ARCHITECTURE
//! ============
//! - `session`: per-client session store, `pb_auth` cookie codec and mirror.
//! - `auth`: the auth context consumed by handlers and OAuth callback logic.
//! - `guard`: cookie-presence gate in front of every route.
//! - `backend`: record store trait and its PocketBase client.
//! - `inventory`: gear domain types, filters, grouping and search.
//! - `routes`: axum router and handlers.

pub mod auth;
pub mod backend;
pub mod config;
pub mod guard;
pub mod inventory;
pub mod routes;
pub mod session;
pub mod state;
