//! Request envelope: the fixed header set sent with every REST call.

use std::fmt;
use std::str::FromStr;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_CHARSET, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;

use crate::error::{AmsError, AmsResult};

/// OData verbose JSON.
pub const JSON_VERBOSE: &str = "application/json;odata=verbose";
/// Plain JSON.
pub const JSON_ONLY: &str = "application/json";
/// Atom feed XML.
pub const ATOM_XML: &str = "application/atom+xml";
/// Charset advertised on every request.
pub const CHARSET: &str = "UTF-8";
/// REST API version sent as `x-ms-version`.
pub const DEFAULT_API_VERSION: &str = "2.19";

const X_MS_VERSION: HeaderName = HeaderName::from_static("x-ms-version");

/// Declared content format of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestFormat {
    /// OData verbose JSON in both directions
    #[default]
    Json,
    /// Plain JSON body, verbose JSON response
    JsonOnly,
    /// Atom XML in both directions
    Xml,
}

impl RequestFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestFormat::Json => "json",
            RequestFormat::JsonOnly => "json_only",
            RequestFormat::Xml => "xml",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            RequestFormat::Json => JSON_VERBOSE,
            RequestFormat::JsonOnly => JSON_ONLY,
            RequestFormat::Xml => ATOM_XML,
        }
    }

    pub fn accept(&self) -> &'static str {
        match self {
            RequestFormat::Json | RequestFormat::JsonOnly => JSON_VERBOSE,
            RequestFormat::Xml => "application/atom+xml,application/xml",
        }
    }
}

impl fmt::Display for RequestFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RequestFormat {
    type Err = AmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(RequestFormat::Json),
            "json_only" => Ok(RequestFormat::JsonOnly),
            "xml" => Ok(RequestFormat::Xml),
            other => Err(AmsError::invalid_argument(format!(
                "unknown request format: {}",
                other
            ))),
        }
    }
}

/// Builds the header set for one request.
#[derive(Debug, Clone, Copy)]
pub struct Envelope<'a> {
    pub format: RequestFormat,
    pub token: &'a str,
    pub api_version: &'a str,
}

impl<'a> Envelope<'a> {
    pub fn new(format: RequestFormat, token: &'a str, api_version: &'a str) -> Self {
        Self {
            format,
            token,
            api_version,
        }
    }

    /// Headers for a request with the given verb.
    ///
    /// DELETE carries no body and therefore no `Content-Type`.
    pub fn headers(&self, method: &Method) -> AmsResult<HeaderMap> {
        if self.token.is_empty() {
            return Err(AmsError::invalid_argument("access token is empty"));
        }

        let mut headers = HeaderMap::new();
        if *method != Method::DELETE {
            headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_static(self.format.content_type()),
            );
        }
        headers.insert(ACCEPT, HeaderValue::from_static(self.format.accept()));
        headers.insert(ACCEPT_CHARSET, HeaderValue::from_static(CHARSET));

        let mut auth = HeaderValue::from_str(&format!("Bearer {}", self.token))
            .map_err(|_| AmsError::invalid_argument("access token is not a valid header value"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        headers.insert(
            X_MS_VERSION,
            HeaderValue::from_str(self.api_version)
                .map_err(|_| AmsError::invalid_argument("api version is not a valid header value"))?,
        );

        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header<'h>(headers: &'h HeaderMap, name: &str) -> Option<&'h str> {
        headers.get(name).and_then(|v| v.to_str().ok())
    }

    #[test]
    fn test_format_header_pairs() {
        let cases = [
            (RequestFormat::Json, JSON_VERBOSE, JSON_VERBOSE),
            (RequestFormat::JsonOnly, "application/json", JSON_VERBOSE),
            (
                RequestFormat::Xml,
                "application/atom+xml",
                "application/atom+xml,application/xml",
            ),
        ];

        for (format, content_type, accept) in cases {
            let headers = Envelope::new(format, "tok", DEFAULT_API_VERSION)
                .headers(&Method::POST)
                .unwrap();
            assert_eq!(header(&headers, "content-type"), Some(content_type), "{}", format);
            assert_eq!(header(&headers, "accept"), Some(accept), "{}", format);
        }
    }

    #[test]
    fn test_fixed_headers() {
        let headers = Envelope::new(RequestFormat::Json, "secret-token", "2.19")
            .headers(&Method::GET)
            .unwrap();

        assert_eq!(header(&headers, "accept-charset"), Some("UTF-8"));
        assert_eq!(header(&headers, "authorization"), Some("Bearer secret-token"));
        assert_eq!(header(&headers, "x-ms-version"), Some("2.19"));
        assert!(headers.get("authorization").unwrap().is_sensitive());
    }

    #[test]
    fn test_delete_has_no_content_type() {
        let headers = Envelope::new(RequestFormat::Json, "tok", "2.19")
            .headers(&Method::DELETE)
            .unwrap();

        assert!(headers.get("content-type").is_none());
        assert_eq!(header(&headers, "accept"), Some(JSON_VERBOSE));
    }

    #[test]
    fn test_empty_token_rejected() {
        let result = Envelope::new(RequestFormat::Json, "", "2.19").headers(&Method::GET);
        assert!(matches!(result, Err(AmsError::InvalidArgument(_))));
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("json".parse::<RequestFormat>().unwrap(), RequestFormat::Json);
        assert_eq!("json_only".parse::<RequestFormat>().unwrap(), RequestFormat::JsonOnly);
        assert_eq!("xml".parse::<RequestFormat>().unwrap(), RequestFormat::Xml);
        assert!("yaml".parse::<RequestFormat>().is_err());
    }
}
