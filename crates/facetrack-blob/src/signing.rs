//! Shared Key request signing.
//!
//! Requests made with the storage account key carry
//! `Authorization: SharedKey <account>:<signature>`, where the signature is
//! the base64 HMAC-SHA256 of the canonical string-to-sign under the decoded
//! account key.

use std::collections::BTreeMap;
use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use hmac::{Hmac, Mac};
use reqwest::header::HeaderMap;
use reqwest::Method;
use sha2::Sha256;
use url::Url;

use crate::error::{BlobError, BlobResult};

type HmacSha256 = Hmac<Sha256>;

/// Standard headers in string-to-sign order.
const SIGNED_HEADERS: [&str; 11] = [
    "content-encoding",
    "content-language",
    "content-length",
    "content-md5",
    "content-type",
    "date",
    "if-modified-since",
    "if-match",
    "if-none-match",
    "if-unmodified-since",
    "range",
];

/// Format of the `x-ms-date` header.
pub const X_MS_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Signs requests with a storage account name and key.
#[derive(Clone)]
pub struct SharedKeySigner {
    account: String,
    key: Vec<u8>,
}

impl fmt::Debug for SharedKeySigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedKeySigner")
            .field("account", &self.account)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl SharedKeySigner {
    /// Create a signer from the account name and its base64 account key.
    pub fn new(account: impl Into<String>, account_key: &str) -> BlobResult<Self> {
        let account = account.into();
        if account.is_empty() {
            return Err(BlobError::config_error("storage account name is empty"));
        }

        let key = STANDARD
            .decode(account_key.trim())
            .map_err(|e| BlobError::InvalidKey(e.to_string()))?;
        if key.is_empty() {
            return Err(BlobError::InvalidKey("account key is empty".to_string()));
        }

        Ok(Self { account, key })
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    /// Canonical string-to-sign for a request.
    ///
    /// `headers` must already hold `x-ms-date` and `x-ms-version`.
    pub fn string_to_sign(&self, method: &Method, url: &Url, headers: &HeaderMap) -> String {
        let mut out = String::with_capacity(256);
        out.push_str(method.as_str());
        out.push('\n');

        for name in SIGNED_HEADERS {
            let value = headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default();
            // A zero Content-Length is signed as empty.
            if !(name == "content-length" && value == "0") {
                out.push_str(value);
            }
            out.push('\n');
        }

        out.push_str(&canonicalized_headers(headers));
        out.push_str(&self.canonicalized_resource(url));
        out
    }

    /// Base64 HMAC-SHA256 signature of `string_to_sign`.
    pub fn sign(&self, string_to_sign: &str) -> BlobResult<String> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| BlobError::InvalidKey(e.to_string()))?;
        mac.update(string_to_sign.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Value of the `Authorization` header for a request.
    pub fn authorization(&self, method: &Method, url: &Url, headers: &HeaderMap) -> BlobResult<String> {
        let signature = self.sign(&self.string_to_sign(method, url, headers))?;
        Ok(format!("SharedKey {}:{}", self.account, signature))
    }

    fn canonicalized_resource(&self, url: &Url) -> String {
        let mut resource = format!("/{}{}", self.account, url.path());

        let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in url.query_pairs() {
            params
                .entry(name.to_lowercase())
                .or_default()
                .push(value.into_owned());
        }

        for (name, mut values) in params {
            values.sort();
            resource.push('\n');
            resource.push_str(&name);
            resource.push(':');
            resource.push_str(&values.join(","));
        }

        resource
    }
}

fn canonicalized_headers(headers: &HeaderMap) -> String {
    let mut ms_headers: Vec<(&str, &str)> = headers
        .iter()
        .filter(|(name, _)| name.as_str().starts_with("x-ms-"))
        .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v.trim())))
        .collect();
    ms_headers.sort_by(|a, b| a.0.cmp(b.0));

    ms_headers
        .into_iter()
        .map(|(name, value)| format!("{}:{}\n", name, value))
        .collect()
}
