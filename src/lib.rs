#![doc = include_str!("../README.md")]

pub mod client;
pub mod codec;
pub mod error;
pub mod guard;
mod jwt;
pub mod middleware;
pub mod provider;
pub mod refresh;
pub mod store;
#[cfg(test)]
pub(crate) mod testutil;
pub mod types;

// Re-exports for convenient access
pub use client::SessionClient;
pub use codec::CookieCodec;
pub use error::Error;
pub use guard::{AuthGuard, GuardConfig, Verdict};
pub use middleware::{
    CurrentSession, CurrentUser, Gate, GateConfig, GateError, RouteMatcher,
};
pub use provider::IdentityProvider;
#[cfg(feature = "provider")]
pub use provider::{HttpProvider, ProviderConfig};
pub use refresh::TokenRefresher;
pub use store::{CookieSessionStore, MemorySessionStore, SessionPersistence};
pub use types::{Session, UserId, UserRecord};
