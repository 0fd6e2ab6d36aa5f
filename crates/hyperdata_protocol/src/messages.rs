//! Payloads and responses for write operations.

use crate::error::{ProtocolError, ProtocolResult};
use crate::representation::Representation;
use crate::uri_list;

/// Media types understood by the protocol.
pub mod media_type {
    /// JSON representations.
    pub const JSON: &str = "application/json";
    /// Newline-delimited identifier lists.
    pub const URI_LIST: &str = "text/uri-list";
}

/// A request or response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// A JSON representation.
    Representation(Representation),
    /// A list of identifiers.
    UriList(Vec<String>),
}

impl Body {
    /// Returns the media type of this body.
    pub fn media_type(&self) -> &'static str {
        match self {
            Body::Representation(_) => media_type::JSON,
            Body::UriList(_) => media_type::URI_LIST,
        }
    }

    /// Encodes the body to bytes.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        match self {
            Body::Representation(repr) => repr.to_json(),
            Body::UriList(uris) => Ok(uri_list::encode(uris)),
        }
    }

    /// Decodes a body of the given media type.
    ///
    /// Media type parameters (`; charset=utf-8`) are ignored.
    pub fn decode(media_type: &str, bytes: &[u8]) -> ProtocolResult<Self> {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            media_type::URI_LIST => Ok(Body::UriList(uri_list::decode(bytes)?)),
            media_type::JSON => Ok(Body::Representation(Representation::from_json(bytes)?)),
            other if other.ends_with("+json") => {
                Ok(Body::Representation(Representation::from_json(bytes)?))
            }
            other => Err(ProtocolError::unsupported_media_type(other)),
        }
    }
}

/// Outcome of a POST, PUT or DELETE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteResponse {
    /// HTTP status code.
    pub status: u16,
    /// `Location` header, if any.
    pub location: Option<String>,
}

impl WriteResponse {
    /// Creates a response with no location.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            location: None,
        }
    }

    /// Creates a `201 Created` response with a location.
    pub fn created(location: impl Into<String>) -> Self {
        Self {
            status: 201,
            location: Some(location.into()),
        }
    }

    /// Creates a `204 No Content` response.
    pub fn no_content() -> Self {
        Self::new(204)
    }

    /// Returns true for a 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns true when the server created a resource at `location`.
    pub fn is_created(&self) -> bool {
        self.status == 201 && self.location.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_media_types() {
        assert_eq!(Body::UriList(vec![]).media_type(), "text/uri-list");
        assert_eq!(
            Body::Representation(Representation::new()).media_type(),
            "application/json"
        );
    }

    #[test]
    fn decode_ignores_parameters() {
        let body = Body::decode("text/uri-list; charset=utf-8", b"http://x/1\r\n").unwrap();
        assert_eq!(body, Body::UriList(vec!["http://x/1".into()]));

        let body = Body::decode("application/hal+json", br#"{"name":"a"}"#).unwrap();
        assert!(matches!(body, Body::Representation(r) if r.attribute_str("name") == Some("a")));
    }

    #[test]
    fn decode_unknown_media_type() {
        let err = Body::decode("text/html", b"<p/>").unwrap_err();
        assert!(matches!(err, ProtocolError::UnsupportedMediaType { .. }));
    }

    #[test]
    fn write_response_status() {
        assert!(WriteResponse::created("http://x/1").is_created());
        assert!(!WriteResponse::new(201).is_created());
        assert!(WriteResponse::no_content().is_success());
        assert!(!WriteResponse::new(409).is_success());
    }
}
