//! CivicSnap - civic issue reporting gateway
//!
//! Citizens photograph local problems; the gateway stamps the photo with its
//! location, stores it, and files the report under a community. Authorities
//! log in with provisioned credentials and move reports through their
//! lifecycle.
//!
//! ## Services
//!
//! - **Issues**: annotate-upload-persist reporting pipeline with upvotes and
//!   comments
//! - **Auth**: dual bearer-token schemes (provider-issued citizen tokens,
//!   locally minted authority sessions)
//! - **Identity**: proxy to the external identity provider for citizen
//!   accounts
//! - **Communities**: find-or-create scoping of issues by locality
//! - **News**: latest announcements for the landing feed

pub mod annotate;
pub mod auth;
pub mod config;
pub mod db;
pub mod identity;
pub mod objectstore;
pub mod pipeline;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{CivicError, Result};
