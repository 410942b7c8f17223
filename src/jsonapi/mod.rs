use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod extract;

/// The JSON:API media type stamped on responses by the content negotiation
/// layer in `config::media_type`.
pub const MEDIA_TYPE: &str = "application/vnd.api+json";

/// Resource type names exposed by this service.
pub const TICKET_TYPE: &str = "ticket";
pub const TICKET_TAG_TYPE: &str = "ticket-tag";
pub const EVENT_TYPE: &str = "event";
pub const ACCESS_CODE_TYPE: &str = "access-code";
pub const ATTENDEE_TYPE: &str = "attendee";

#[derive(Debug, Clone, Serialize)]
pub struct Version {
    pub version: &'static str,
}

impl Default for Version {
    fn default() -> Self {
        Self { version: "1.0" }
    }
}

/// Top-level document for a primary resource or collection.
#[derive(Debug, Serialize)]
pub struct Document<T: Serialize> {
    pub data: T,
    pub jsonapi: Version,
}

impl<T: Serialize> Document<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            jsonapi: Version::default(),
        }
    }
}

/// Meta-only document, used for delete acknowledgements.
#[derive(Debug, Serialize)]
pub struct MetaDocument {
    pub meta: MetaMessage,
    pub jsonapi: Version,
}

#[derive(Debug, Serialize)]
pub struct MetaMessage {
    pub message: String,
}

impl MetaDocument {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            meta: MetaMessage {
                message: message.into(),
            },
            jsonapi: Version::default(),
        }
    }
}

/// A serialized resource object. Attribute structs carry the dasherized
/// member names themselves.
#[derive(Debug, Serialize)]
pub struct Resource<A: Serialize> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub id: String,
    pub attributes: A,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<&'static str, Relationship>,
    pub links: SelfLink,
}

#[derive(Debug, Serialize)]
pub struct SelfLink {
    #[serde(rename = "self")]
    pub self_link: String,
}

#[derive(Debug, Serialize)]
pub struct Relationship {
    pub links: RelationshipLinks,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<RelationshipData>,
}

#[derive(Debug, Serialize)]
pub struct RelationshipLinks {
    #[serde(rename = "self")]
    pub self_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related: Option<String>,
}

/// Linkage for a to-one or to-many relationship.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
    Many(Vec<ResourceIdentifier>),
    One(Option<ResourceIdentifier>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

impl ResourceIdentifier {
    pub fn new(kind: &str, id: impl ToString) -> Self {
        Self {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }
}

/// Standalone relationship document served by the
/// `/tickets/:id/relationships/...` endpoints.
#[derive(Debug, Serialize)]
pub struct RelationshipDocument {
    pub links: RelationshipLinks,
    pub data: RelationshipData,
    pub jsonapi: Version,
}

/// JSON:API error payload: `{ "errors": [ ... ] }`.
#[derive(Debug, Serialize)]
pub struct ErrorDocument {
    pub errors: Vec<ErrorObject>,
    pub jsonapi: Version,
}

impl ErrorDocument {
    pub fn single(error: ErrorObject) -> Self {
        Self {
            errors: vec![error],
            jsonapi: Version::default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorObject {
    pub status: String,
    pub title: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
}

/// Locates the offending part of the request: a document pointer for body
/// errors, a parameter name for path/query errors.
#[derive(Debug, Serialize)]
pub struct ErrorSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

impl ErrorSource {
    pub fn pointer(pointer: impl Into<String>) -> Self {
        Self {
            pointer: Some(pointer.into()),
            parameter: None,
        }
    }

    pub fn parameter(parameter: impl Into<String>) -> Self {
        Self {
            pointer: None,
            parameter: Some(parameter.into()),
        }
    }
}
