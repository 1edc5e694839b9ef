//! Message protocol between the controller and the UI panel
//!
//! Both directions carry tagged unions keyed by a `type` field. Each
//! direction is a closed enum with a catch-all `Ignored` variant: a line
//! with an unknown tag, or one that is not JSON at all, becomes `Ignored`
//! instead of an error, so a receiver never fails on foreign traffic.
//!
//! A request whose tag is known but whose body does not decode becomes
//! [`UiRequest::Malformed`], keeping its `reqId` so the controller can
//! answer with a correlated error.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;
use uuid::Uuid;

use crate::error::ProtocolError;
use crate::models::{deserialize_kind_or_default, ExportRequest, RepositoryKind};

/// Correlation id pairing an async request with its eventual response
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(String);

impl RequestId {
    /// Fresh random id for a new request
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RequestId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Payload naming a repository kind; unknown kinds decode to the default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindPayload {
    #[serde(deserialize_with = "deserialize_kind_or_default", default)]
    pub kind: RepositoryKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    #[serde(deserialize_with = "deserialize_kind_or_default", default)]
    pub kind: RepositoryKind,
    #[serde(default)]
    pub token: String,
}

/// UI → Controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiRequest {
    SetSelected {
        payload: KindPayload,
    },
    SaveToken {
        payload: TokenPayload,
    },
    ClearToken {
        payload: KindPayload,
    },
    CheckToken {
        payload: KindPayload,
        #[serde(rename = "reqId", default, skip_serializing_if = "Option::is_none")]
        req_id: Option<RequestId>,
    },
    Export {
        payload: ExportRequest,
        #[serde(rename = "reqId", default, skip_serializing_if = "Option::is_none")]
        req_id: Option<RequestId>,
    },
    /// Known `type` with an undecodable body; produced by [`decode_request`]
    /// only, never serialized
    #[serde(skip)]
    Malformed {
        request: String,
        req_id: Option<RequestId>,
        reason: String,
    },
    #[serde(other)]
    Ignored,
}

/// Wire tags of every request the controller understands
pub const REQUEST_TYPES: [&str; 5] = [
    "set-selected",
    "save-token",
    "clear-token",
    "check-token",
    "export",
];

/// Which request an error message answers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestTarget {
    CheckToken,
    Export,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitPayload {
    pub selected: RepositoryKind,
    /// Stored credential per kind; absent slots are empty strings
    pub tokens: BTreeMap<RepositoryKind, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenValidPayload {
    pub kind: RepositoryKind,
    pub login: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionPayload {
    pub count: usize,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivePayload {
    pub zip_name: String,
    #[serde(with = "base64_bytes")]
    pub zip_bytes: Vec<u8>,
}

impl fmt::Debug for ArchivePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchivePayload")
            .field("zip_name", &self.zip_name)
            .field("zip_bytes", &format_args!("<{} bytes>", self.zip_bytes.len()))
            .finish()
    }
}

/// Controller → UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PanelMessage {
    Init {
        payload: InitPayload,
    },
    SelectedSaved {
        payload: KindPayload,
    },
    TokenSaved {
        payload: TokenPayload,
    },
    TokenCleared {
        payload: KindPayload,
    },
    TokenValid {
        payload: TokenValidPayload,
        #[serde(rename = "reqId", default, skip_serializing_if = "Option::is_none")]
        req_id: Option<RequestId>,
    },
    Selection {
        payload: SelectionPayload,
    },
    SaveArchive {
        payload: ArchivePayload,
    },
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<RequestTarget>,
        #[serde(rename = "reqId", default, skip_serializing_if = "Option::is_none")]
        req_id: Option<RequestId>,
    },
    #[serde(other)]
    Ignored,
}

impl UiRequest {
    pub fn set_selected(kind: RepositoryKind) -> Self {
        UiRequest::SetSelected {
            payload: KindPayload { kind },
        }
    }

    pub fn save_token(kind: RepositoryKind, token: impl Into<String>) -> Self {
        UiRequest::SaveToken {
            payload: TokenPayload {
                kind,
                token: token.into(),
            },
        }
    }

    pub fn clear_token(kind: RepositoryKind) -> Self {
        UiRequest::ClearToken {
            payload: KindPayload { kind },
        }
    }

    pub fn check_token(kind: RepositoryKind, req_id: RequestId) -> Self {
        UiRequest::CheckToken {
            payload: KindPayload { kind },
            req_id: Some(req_id),
        }
    }

    pub fn export(request: ExportRequest, req_id: RequestId) -> Self {
        UiRequest::Export {
            payload: request,
            req_id: Some(req_id),
        }
    }

    /// Wire tag, for logging
    pub fn type_name(&self) -> &'static str {
        match self {
            UiRequest::SetSelected { .. } => "set-selected",
            UiRequest::SaveToken { .. } => "save-token",
            UiRequest::ClearToken { .. } => "clear-token",
            UiRequest::CheckToken { .. } => "check-token",
            UiRequest::Export { .. } => "export",
            UiRequest::Malformed { .. } => "malformed",
            UiRequest::Ignored => "ignored",
        }
    }

    pub fn req_id(&self) -> Option<&RequestId> {
        match self {
            UiRequest::CheckToken { req_id, .. }
            | UiRequest::Export { req_id, .. }
            | UiRequest::Malformed { req_id, .. } => req_id.as_ref(),
            _ => None,
        }
    }

    /// Target to stamp on an error answering this request
    pub fn target(&self) -> Option<RequestTarget> {
        match self {
            UiRequest::CheckToken { .. } => Some(RequestTarget::CheckToken),
            UiRequest::Export { .. } => Some(RequestTarget::Export),
            UiRequest::Malformed { request, .. } => RequestTarget::from_type(request),
            _ => None,
        }
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl RequestTarget {
    /// Target for a request wire tag, if that request is correlated
    pub fn from_type(request: &str) -> Option<RequestTarget> {
        match request {
            "check-token" => Some(RequestTarget::CheckToken),
            "export" => Some(RequestTarget::Export),
            _ => None,
        }
    }
}

impl PanelMessage {
    pub fn error(message: impl Into<String>) -> Self {
        PanelMessage::Error {
            message: message.into(),
            target: None,
            req_id: None,
        }
    }

    pub fn correlated_error(
        message: impl Into<String>,
        target: Option<RequestTarget>,
        req_id: Option<RequestId>,
    ) -> Self {
        PanelMessage::Error {
            message: message.into(),
            target,
            req_id,
        }
    }

    pub fn selection(count: usize) -> Self {
        PanelMessage::Selection {
            payload: SelectionPayload { count },
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            PanelMessage::Init { .. } => "init",
            PanelMessage::SelectedSaved { .. } => "selected-saved",
            PanelMessage::TokenSaved { .. } => "token-saved",
            PanelMessage::TokenCleared { .. } => "token-cleared",
            PanelMessage::TokenValid { .. } => "token-valid",
            PanelMessage::Selection { .. } => "selection",
            PanelMessage::SaveArchive { .. } => "save-archive",
            PanelMessage::Error { .. } => "error",
            PanelMessage::Ignored => "ignored",
        }
    }

    /// Correlation id carried by this message, if any
    pub fn req_id(&self) -> Option<&RequestId> {
        match self {
            PanelMessage::TokenValid { req_id, .. } | PanelMessage::Error { req_id, .. } => {
                req_id.as_ref()
            }
            _ => None,
        }
    }

    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Decode one inbound UI request.
///
/// Unknown tags and non-JSON input give `Ignored`. A known tag with a bad
/// body gives `Malformed`; `reqId` is kept for correlated requests.
pub fn decode_request(raw: &str) -> UiRequest {
    let error = match serde_json::from_str(raw) {
        Ok(request) => return request,
        Err(e) => e,
    };

    let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(raw) else {
        debug!("Ignoring undecodable request: {}", error);
        return UiRequest::Ignored;
    };

    let request = fields
        .get("type")
        .and_then(Value::as_str)
        .filter(|tag| REQUEST_TYPES.contains(tag));
    let Some(request) = request else {
        debug!("Ignoring request with unknown type: {}", error);
        return UiRequest::Ignored;
    };

    let req_id = RequestTarget::from_type(request)
        .and(fields.get("reqId"))
        .and_then(Value::as_str)
        .map(RequestId::from);
    debug!("Malformed {} request (reqId: {:?}): {}", request, req_id, error);

    UiRequest::Malformed {
        request: request.to_string(),
        req_id,
        reason: error.to_string(),
    }
}

/// Decode one inbound panel message, mapping anything undecodable to `Ignored`
pub fn decode_message(raw: &str) -> PanelMessage {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        debug!("Ignoring undecodable message: {}", e);
        PanelMessage::Ignored
    })
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Density, ExportFormat};
    use assert_matches::assert_matches;

    #[test]
    fn test_decode_known_requests() {
        let request = decode_request(r#"{"type":"set-selected","payload":{"kind":"private-icons"}}"#);
        assert_eq!(request, UiRequest::set_selected(RepositoryKind::PrivateIcons));

        let request =
            decode_request(r#"{"type":"check-token","payload":{"kind":"public-icons"},"reqId":"r1"}"#);
        assert_eq!(
            request,
            UiRequest::check_token(RepositoryKind::PublicIcons, RequestId::from("r1"))
        );
        assert_eq!(request.target(), Some(RequestTarget::CheckToken));
    }

    #[test]
    fn test_decode_export_request() {
        let request = decode_request(
            r#"{"type":"export","payload":{"format":"jpg","densities":["hdpi"],"groupBySize":false,"quality":0.5},"reqId":"e1"}"#,
        );
        assert_matches!(request, UiRequest::Export { payload, req_id: Some(id) } => {
            assert_eq!(payload.format, ExportFormat::Jpg);
            assert_eq!(payload.densities, vec![Density::Hdpi]);
            assert_eq!(payload.quality, Some(0.5));
            assert_eq!(id.as_str(), "e1");
        });
    }

    #[test]
    fn test_unknown_and_foreign_are_ignored() {
        assert_eq!(decode_request(r#"{"type":"export-images"}"#), UiRequest::Ignored);
        assert_eq!(decode_request("not json"), UiRequest::Ignored);
        assert_eq!(decode_request("[1, 2]"), UiRequest::Ignored);
        assert_eq!(decode_request(r#"{"payload":{}}"#), UiRequest::Ignored);
        assert_eq!(decode_message(r#"{"type":"token-ok"}"#), PanelMessage::Ignored);
    }

    #[test]
    fn test_bad_export_body_keeps_correlation() {
        for body in [
            r#"{"format":"gif","densities":["mdpi"]}"#,
            r#"{"format":"png","densities":["ldpi"]}"#,
            r#"{"densities":[]}"#,
        ] {
            let raw = format!(r#"{{"type":"export","payload":{},"reqId":"e1"}}"#, body);
            let request = decode_request(&raw);
            assert_matches!(&request, UiRequest::Malformed { request, .. } if request == "export");
            assert_eq!(request.target(), Some(RequestTarget::Export));
            assert_eq!(request.req_id(), Some(&RequestId::from("e1")));
        }
    }

    #[test]
    fn test_null_densities_decode_as_empty() {
        let request = decode_request(
            r#"{"type":"export","payload":{"format":"svg","densities":null,"groupBySize":true},"reqId":"e1"}"#,
        );
        assert_matches!(request, UiRequest::Export { payload, req_id: Some(_) } => {
            assert!(payload.densities.is_empty());
            assert!(payload.group_by_size);
        });
    }

    #[test]
    fn test_bad_uncorrelated_body_has_no_target() {
        let request = decode_request(r#"{"type":"save-token","reqId":"x"}"#);
        assert_matches!(&request, UiRequest::Malformed { request, .. } if request == "save-token");
        assert_eq!(request.target(), None);
        assert_eq!(request.req_id(), None);
    }

    #[test]
    fn test_unknown_kind_defaults() {
        let request = decode_request(r#"{"type":"clear-token","payload":{"kind":"nope"}}"#);
        assert_eq!(request, UiRequest::clear_token(RepositoryKind::PublicIcons));
    }

    #[test]
    fn test_error_wire_shape() {
        let message = PanelMessage::correlated_error(
            "boom",
            Some(RequestTarget::Export),
            Some(RequestId::from("x")),
        );
        let json = message.encode().unwrap();
        assert_eq!(
            json,
            r#"{"type":"error","message":"boom","target":"export","reqId":"x"}"#
        );

        let bare = PanelMessage::error("oops").encode().unwrap();
        assert_eq!(bare, r#"{"type":"error","message":"oops"}"#);
    }

    #[test]
    fn test_archive_bytes_are_base64() {
        let message = PanelMessage::SaveArchive {
            payload: ArchivePayload {
                zip_name: "images_export.zip".to_string(),
                zip_bytes: vec![0x50, 0x4b, 0x03, 0x04],
            },
        };
        let json = message.encode().unwrap();
        assert!(json.contains(r#""zipBytes":"UEsDBA==""#));
        assert_eq!(decode_message(&json), message);
    }

    #[test]
    fn test_init_tokens_map() {
        let json = r#"{"type":"init","payload":{"selected":"internal-images","tokens":{"public-icons":"ghp_x","private-icons":"","internal-images":""}}}"#;
        assert_matches!(decode_message(json), PanelMessage::Init { payload } => {
            assert_eq!(payload.selected, RepositoryKind::InternalImages);
            assert_eq!(payload.tokens[&RepositoryKind::PublicIcons], "ghp_x");
        });
    }
}
