//! Media Services REST API client.
//!
//! This crate provides:
//! - OData verbose request envelopes and the `x-ms-version` header
//! - Single-hop permanent redirect handling
//! - Azure AD client-credentials tokens with caching
//! - CRUD helpers for assets, files, access policies, locators and jobs

pub mod client;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod paths;
pub mod token;
pub mod token_cache;


pub use client::{AmsClient, AmsConfig, Endpoint};
pub use envelope::{Envelope, RequestFormat};
pub use error::{AmsError, AmsResult};
pub use executor::{AmsResponse, RequestExecutor};
pub use token::{AadTokenProvider, AccessToken, ClientCredentials, StaticTokenProvider, TokenProvider};
pub use token_cache::TokenCache;
