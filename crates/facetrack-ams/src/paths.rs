//! Resource collection paths and entity addressing.

use crate::error::{AmsError, AmsResult};

pub const ASSETS: &str = "/Assets";
pub const FILES: &str = "/Files";
pub const ACCESS_POLICIES: &str = "/AccessPolicies";
pub const LOCATORS: &str = "/Locators";
pub const JOBS: &str = "/Jobs";
pub const MEDIA_PROCESSORS: &str = "/MediaProcessors";

/// Path of a single entity: `/Assets('<oid>')`.
pub fn entity_path(collection: &str, oid: &str) -> AmsResult<String> {
    if oid.is_empty() {
        return Err(AmsError::invalid_argument(format!(
            "an OID is required to address an entity in {}",
            collection
        )));
    }
    Ok(format!("{}('{}')", collection, oid))
}

/// Entity path with the `Collection('<oid>')` segment percent-encoded.
///
/// `/Files('nb:cid:UUID:1')` becomes `/Files%28%27nb%3Acid%3AUUID%3A1%27%29`.
pub fn encoded_entity_path(collection: &str, oid: &str) -> AmsResult<String> {
    let raw = entity_path(collection, oid)?;
    let segment = raw.trim_start_matches('/');
    Ok(format!("/{}", urlencoding::encode(segment)))
}

/// Collection path, or the encoded entity path when an OID is given.
pub fn list_path(collection: &str, oid: Option<&str>) -> AmsResult<String> {
    match oid {
        Some(oid) => encoded_entity_path(collection, oid),
        None => Ok(collection.to_string()),
    }
}
