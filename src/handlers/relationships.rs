use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::handlers::tickets::fetch_ticket;
use crate::jsonapi::extract::{JsonApi, RelationshipUpdateDocument};
use crate::jsonapi::{
    RelationshipData, RelationshipDocument, RelationshipLinks, ResourceIdentifier, Version,
    ACCESS_CODE_TYPE, ATTENDEE_TYPE, EVENT_TYPE, TICKET_TAG_TYPE,
};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::{auth, models::ticket::Ticket};

fn relationship_links(ticket_id: Uuid, name: &str, related: Option<String>) -> RelationshipLinks {
    RelationshipLinks {
        self_link: format!("/v1/tickets/{ticket_id}/relationships/{name}"),
        related,
    }
}

fn event_relationship_document(ticket: &Ticket) -> RelationshipDocument {
    RelationshipDocument {
        links: relationship_links(
            ticket.id,
            "event",
            Some(format!("/v1/events/{}", ticket.event_id)),
        ),
        data: RelationshipData::One(Some(ResourceIdentifier::new(EVENT_TYPE, ticket.event_id))),
        jsonapi: Version::default(),
    }
}

/// GET /v1/tickets/:ticket_id/relationships/event
pub async fn event_relationship(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = fetch_ticket(&state.pool, ticket_id).await?;
    Ok(Json(event_relationship_document(&ticket)))
}

/// PATCH /v1/tickets/:ticket_id/relationships/event
///
/// The event relationship is mandatory, so the linkage can be replaced but
/// never cleared.
pub async fn update_event_relationship(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    AuthenticatedUser(user): AuthenticatedUser,
    JsonApi(document): JsonApi<RelationshipUpdateDocument>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = fetch_ticket(&state.pool, ticket_id).await?;

    if !auth::is_coorganizer(&state.pool, user.id, ticket.event_id).await? {
        return Err(AppError::Forbidden(format!(
            "coorganizer access required for event {}",
            ticket.event_id
        )));
    }

    let identifier = document.data.ok_or_else(|| {
        AppError::unprocessable("/data", "the event relationship cannot be removed")
    })?;
    if identifier.kind != EVENT_TYPE {
        return Err(AppError::conflict(
            "/data/type",
            format!("resource type must be {EVENT_TYPE}, got {}", identifier.kind),
        ));
    }
    let target = Uuid::parse_str(&identifier.id)
        .map_err(|_| AppError::unprocessable("/data/id", "event id must be a valid UUID"))?;

    if target != ticket.event_id {
        if !auth::is_coorganizer(&state.pool, user.id, target).await? {
            return Err(AppError::not_found(
                "event_id",
                format!("Event: {target} not found"),
            ));
        }

        sqlx::query("UPDATE tickets SET event_id = $2, updated_at = now() WHERE id = $1")
            .bind(ticket.id)
            .bind(target)
            .execute(&state.pool)
            .await?;
        tracing::info!(ticket_id = %ticket.id, event_id = %target, "Ticket moved to event");
    }

    let updated = fetch_ticket(&state.pool, ticket.id).await?;
    Ok(Json(event_relationship_document(&updated)))
}

async fn linkage_ids(pool: &PgPool, sql: &str, ticket_id: Uuid) -> Result<Vec<Uuid>, AppError> {
    let ids = sqlx::query_scalar::<_, Uuid>(sql)
        .bind(ticket_id)
        .fetch_all(pool)
        .await?;
    Ok(ids)
}

fn to_many_document(
    ticket_id: Uuid,
    name: &str,
    kind: &str,
    ids: Vec<Uuid>,
) -> RelationshipDocument {
    RelationshipDocument {
        links: relationship_links(ticket_id, name, None),
        data: RelationshipData::Many(
            ids.into_iter()
                .map(|id| ResourceIdentifier::new(kind, id))
                .collect(),
        ),
        jsonapi: Version::default(),
    }
}

/// GET /v1/tickets/:ticket_id/relationships/ticket-tags
pub async fn ticket_tags_relationship(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = fetch_ticket(&state.pool, ticket_id).await?;
    let ids = linkage_ids(
        &state.pool,
        "SELECT ticket_tag_id FROM ticket_tag_assignments \
         WHERE ticket_id = $1 ORDER BY ticket_tag_id",
        ticket.id,
    )
    .await?;
    Ok(Json(to_many_document(
        ticket.id,
        "ticket-tags",
        TICKET_TAG_TYPE,
        ids,
    )))
}

/// GET /v1/tickets/:ticket_id/relationships/access-codes
pub async fn access_codes_relationship(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = fetch_ticket(&state.pool, ticket_id).await?;
    let ids = linkage_ids(
        &state.pool,
        "SELECT access_code_id FROM access_code_tickets \
         WHERE ticket_id = $1 ORDER BY access_code_id",
        ticket.id,
    )
    .await?;
    Ok(Json(to_many_document(
        ticket.id,
        "access-codes",
        ACCESS_CODE_TYPE,
        ids,
    )))
}

/// GET /v1/tickets/:ticket_id/relationships/attendees
pub async fn attendees_relationship(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = fetch_ticket(&state.pool, ticket_id).await?;
    let ids = linkage_ids(
        &state.pool,
        "SELECT id FROM attendees WHERE ticket_id = $1 ORDER BY id",
        ticket.id,
    )
    .await?;
    Ok(Json(to_many_document(
        ticket.id,
        "attendees",
        ATTENDEE_TYPE,
        ids,
    )))
}
