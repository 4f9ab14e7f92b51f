//! Azure Blob storage client.
//!
//! This crate provides:
//! - Block blob upload with a SAS token (single put or staged blocks)
//! - Container listing with continuation markers
//! - Blob download to memory or disk
//! - Shared Key request signing with the account key

pub mod client;
pub mod error;
pub mod listing;
pub mod signing;

#[cfg(test)]
mod client_tests;

pub use client::{BlobClient, BlobConfig, BlobCredentials, DEFAULT_BLOCK_SIZE, STORAGE_API_VERSION};
pub use error::{BlobError, BlobResult};
pub use listing::BlobItem;
pub use signing::SharedKeySigner;
