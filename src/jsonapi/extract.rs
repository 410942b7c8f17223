use std::collections::BTreeMap;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use crate::jsonapi::{RelationshipData, ResourceIdentifier};
use crate::utils::error::AppError;

/// Body extractor that maps deserialization failures to JSON:API 422
/// responses instead of axum's plain-text rejection.
pub struct JsonApi<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonApi<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await.map_err(|err| {
            AppError::unprocessable("/data", format!("unable to read request body: {err}"))
        })?;

        let value = serde_json::from_slice(&bytes).map_err(|err| {
            AppError::unprocessable("/data", format!("request body is not a valid document: {err}"))
        })?;

        Ok(JsonApi(value))
    }
}

/// Incoming `{ "data": { ... } }` document for resource writes. Attributes
/// stay untyped here so missing-member errors can carry precise pointers.
#[derive(Debug, Deserialize)]
pub struct ResourceDocument {
    pub data: ResourcePayload,
}

#[derive(Debug, Deserialize)]
pub struct ResourcePayload {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub attributes: serde_json::Value,
    #[serde(default)]
    pub relationships: BTreeMap<String, RelationshipPayload>,
}

#[derive(Debug, Deserialize)]
pub struct RelationshipPayload {
    #[serde(default)]
    pub data: Option<RelationshipData>,
}

/// Incoming document for `PATCH .../relationships/...` endpoints.
#[derive(Debug, Deserialize)]
pub struct RelationshipUpdateDocument {
    pub data: Option<ResourceIdentifier>,
}

impl ResourcePayload {
    /// Rejects documents whose `data.type` does not match the endpoint's
    /// resource type. JSON:API mandates 409 Conflict here.
    pub fn expect_type(&self, expected: &str) -> Result<(), AppError> {
        if self.kind == expected {
            Ok(())
        } else {
            Err(AppError::conflict(
                "/data/type",
                format!("resource type must be {expected}, got {}", self.kind),
            ))
        }
    }

    /// Extracts a mandatory to-one relationship.
    pub fn require_to_one(&self, name: &str) -> Result<ResourceIdentifier, AppError> {
        let pointer = format!("/data/relationships/{name}");
        let linkage = self
            .relationships
            .get(name)
            .and_then(|rel| rel.data.as_ref());

        match linkage {
            Some(RelationshipData::One(Some(identifier))) => Ok(identifier.clone()),
            _ => Err(AppError::unprocessable(
                pointer,
                format!("a relationship with the {name} resource is required"),
            )),
        }
    }
}

/// Parses a resource identifier's id as a UUID, pointing at the
/// relationship member on failure.
pub fn identifier_uuid(identifier: &ResourceIdentifier, name: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(&identifier.id).map_err(|_| {
        AppError::unprocessable(
            format!("/data/relationships/{name}"),
            format!("{name} id must be a valid UUID"),
        )
    })
}

/// Deserializes `data.attributes` into a typed struct, recovering the
/// offending attribute name from serde's missing-field error when possible.
pub fn parse_attributes<T: DeserializeOwned>(attributes: serde_json::Value) -> Result<T, AppError> {
    serde_json::from_value(attributes)
        .map_err(|err| AppError::unprocessable(attribute_pointer(&err), err.to_string()))
}

fn attribute_pointer(err: &serde_json::Error) -> String {
    let message = err.to_string();
    if let Some(rest) = message.strip_prefix("missing field `") {
        if let Some(name) = rest.split('`').next() {
            return format!("/data/attributes/{name}");
        }
    }
    "/data/attributes".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ticket::NewTicket;
    use serde_json::json;

    fn payload(value: serde_json::Value) -> ResourcePayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_expect_type_rejects_mismatch() {
        let resource = payload(json!({"type": "concert", "attributes": {}}));
        let err = resource.expect_type("ticket").unwrap_err();
        match err {
            AppError::Conflict { pointer, .. } => assert_eq!(pointer, "/data/type"),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_require_to_one_missing_relationship() {
        let resource = payload(json!({"type": "ticket", "attributes": {}}));
        let err = resource.require_to_one("event").unwrap_err();
        match err {
            AppError::UnprocessableEntity { pointer, .. } => {
                assert_eq!(pointer, "/data/relationships/event");
            }
            other => panic!("expected unprocessable entity, got {other:?}"),
        }
    }

    #[test]
    fn test_require_to_one_null_linkage_is_rejected() {
        let resource = payload(json!({
            "type": "ticket",
            "relationships": {"event": {"data": null}}
        }));
        assert!(resource.require_to_one("event").is_err());
    }

    #[test]
    fn test_require_to_one_returns_identifier() {
        let resource = payload(json!({
            "type": "ticket",
            "relationships": {"event": {"data": {"type": "event", "id": "e1"}}}
        }));
        let identifier = resource.require_to_one("event").unwrap();
        assert_eq!(identifier.kind, "event");
        assert_eq!(identifier.id, "e1");
    }

    #[test]
    fn test_parse_attributes_points_at_missing_member() {
        let err = parse_attributes::<NewTicket>(json!({
            "name": "GA",
            "type": "paid",
            "sales-starts-at": "2026-01-01T10:00:00Z"
        }))
        .unwrap_err();

        match err {
            AppError::UnprocessableEntity { pointer, .. } => {
                assert_eq!(pointer, "/data/attributes/sales-ends-at");
            }
            other => panic!("expected unprocessable entity, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_attributes_accepts_full_payload() {
        let ticket: NewTicket = parse_attributes(json!({
            "name": "GA",
            "type": "paid",
            "price": 25.0,
            "sales-starts-at": "2026-01-01T10:00:00Z",
            "sales-ends-at": "2026-02-01T10:00:00Z",
            "min-order": 1,
            "max-order": 5
        }))
        .unwrap();

        assert_eq!(ticket.name, "GA");
        assert_eq!(ticket.min_order, Some(1));
    }
}
