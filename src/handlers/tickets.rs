use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{self, AuthenticatedUser, CurrentUser};
use crate::jsonapi::extract::{identifier_uuid, parse_attributes, JsonApi, ResourceDocument};
use crate::jsonapi::{
    Document, MetaDocument, Relationship, RelationshipData, RelationshipLinks, Resource,
    ResourceIdentifier, SelfLink, EVENT_TYPE, TICKET_TYPE,
};
use crate::models::access_code::AccessCode;
use crate::models::attendee::Attendee;
use crate::models::event::Event;
use crate::models::order::Order;
use crate::models::ticket::{NewTicket, Ticket, TicketAttributes, TicketPatch, TicketTag};
use crate::models::user::User;
use crate::state::AppState;
use crate::utils::db::safe_query;
use crate::utils::error::AppError;
use crate::validation;

pub(crate) const TICKET_COLUMNS: &str = "id, event_id, name, description, kind, price, quantity, \
     is_description_visible, position, is_fee_absorbed, sales_starts_at, sales_ends_at, \
     is_hidden, min_order, max_order, created_at, updated_at";

const EVENT_BY_ID: &str = "SELECT id, identifier, name, location, starts_at, ends_at, \
     created_at, updated_at FROM events WHERE id = $1";
const EVENT_BY_IDENTIFIER: &str = "SELECT id, identifier, name, location, starts_at, ends_at, \
     created_at, updated_at FROM events WHERE identifier = $1";
const ORDER_BY_ID: &str = "SELECT id, event_id, identifier, status, created_at, updated_at \
     FROM orders WHERE id = $1";
const ORDER_BY_IDENTIFIER: &str = "SELECT id, event_id, identifier, status, created_at, \
     updated_at FROM orders WHERE identifier = $1";

pub(crate) async fn fetch_ticket(pool: &PgPool, ticket_id: Uuid) -> Result<Ticket, AppError> {
    let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = $1");
    safe_query(pool, &sql, ticket_id, "Ticket", "ticket_id").await
}

/// Hidden tickets only exist for coorganizers; everyone else gets the same
/// 404 an unknown id would produce.
async fn ensure_visible(
    pool: &PgPool,
    ticket: &Ticket,
    user: Option<&User>,
    parameter: &str,
) -> Result<(), AppError> {
    if ticket.is_hidden && !auth::can_manage(pool, user, ticket.event_id).await? {
        return Err(AppError::not_found(
            parameter,
            format!("Ticket: {} not found", ticket.id),
        ));
    }
    Ok(())
}

/// POST /v1/tickets
pub async fn create_ticket(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    JsonApi(document): JsonApi<ResourceDocument>,
) -> Result<impl IntoResponse, AppError> {
    let resource = document.data;
    resource.expect_type(TICKET_TYPE)?;

    let event_rel = resource.require_to_one("event")?;
    let event_id = identifier_uuid(&event_rel, "event")?;

    let attributes: NewTicket = parse_attributes(resource.attributes)?;
    validation::validate_new(&attributes)?;

    // Non-coorganizers are told the event does not exist rather than that
    // they lack access. A role row implies the event row, so no extra
    // existence check is needed.
    if !auth::can_manage(&state.pool, user.as_ref(), event_id).await? {
        return Err(AppError::not_found(
            "event_id",
            format!("Event: {event_id} not found"),
        ));
    }

    let sql = format!(
        "INSERT INTO tickets (event_id, name, description, kind, price, quantity, \
         is_description_visible, position, is_fee_absorbed, sales_starts_at, sales_ends_at, \
         is_hidden, min_order, max_order) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
         RETURNING {TICKET_COLUMNS}"
    );
    let ticket = sqlx::query_as::<_, Ticket>(&sql)
        .bind(event_id)
        .bind(&attributes.name)
        .bind(&attributes.description)
        .bind(&attributes.kind)
        .bind(attributes.price)
        .bind(attributes.quantity)
        .bind(attributes.is_description_visible.unwrap_or(false))
        .bind(attributes.position)
        .bind(attributes.is_fee_absorbed.unwrap_or(false))
        .bind(attributes.sales_starts_at)
        .bind(attributes.sales_ends_at)
        .bind(attributes.is_hidden.unwrap_or(false))
        .bind(attributes.min_order)
        .bind(attributes.max_order)
        .fetch_one(&state.pool)
        .await?;

    tracing::info!(ticket_id = %ticket.id, event_id = %event_id, "Ticket created");

    Ok((
        StatusCode::CREATED,
        Json(Document::new(ticket_resource(&ticket))),
    ))
}

/// GET /v1/tickets/:ticket_id
pub async fn ticket_detail(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let ticket = fetch_ticket(&state.pool, ticket_id).await?;
    ensure_visible(&state.pool, &ticket, user.as_ref(), "ticket_id").await?;
    Ok(Json(Document::new(ticket_resource(&ticket))))
}

/// GET /v1/attendees/:attendee_id/ticket
pub async fn attendee_ticket(
    State(state): State<AppState>,
    Path(attendee_id): Path<Uuid>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let attendee: Attendee = safe_query(
        &state.pool,
        "SELECT id, ticket_id, order_id, firstname, lastname, email, created_at, updated_at \
         FROM attendees WHERE id = $1",
        attendee_id,
        "Attendee",
        "attendee_id",
    )
    .await?;

    let ticket_id = attendee.ticket_id.ok_or_else(|| {
        AppError::not_found(
            "attendee_id",
            format!("Attendee: {} has no ticket assigned", attendee.id),
        )
    })?;

    let ticket = fetch_ticket(&state.pool, ticket_id).await?;
    ensure_visible(&state.pool, &ticket, user.as_ref(), "attendee_id").await?;
    Ok(Json(Document::new(ticket_resource(&ticket))))
}

/// PATCH /v1/tickets/:ticket_id
pub async fn update_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    AuthenticatedUser(user): AuthenticatedUser,
    JsonApi(document): JsonApi<ResourceDocument>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = fetch_ticket(&state.pool, ticket_id).await?;

    if !auth::is_coorganizer(&state.pool, user.id, ticket.event_id).await? {
        return Err(AppError::Forbidden(format!(
            "coorganizer access required for event {}",
            ticket.event_id
        )));
    }

    let resource = document.data;
    resource.expect_type(TICKET_TYPE)?;
    if let Some(id) = &resource.id {
        if id != &ticket.id.to_string() {
            return Err(AppError::conflict(
                "/data/id",
                "document id does not match the requested ticket",
            ));
        }
    }

    // The event relationship may be moved in the same request, but only to
    // an event the caller also coorganizes.
    let mut event_id = ticket.event_id;
    if resource.relationships.contains_key("event") {
        let event_rel = resource.require_to_one("event")?;
        let target = identifier_uuid(&event_rel, "event")?;
        if target != ticket.event_id {
            if !auth::is_coorganizer(&state.pool, user.id, target).await? {
                return Err(AppError::not_found(
                    "event_id",
                    format!("Event: {target} not found"),
                ));
            }
            event_id = target;
        }
    }

    let patch: TicketPatch = if resource.attributes.is_null() {
        TicketPatch::default()
    } else {
        parse_attributes(resource.attributes)?
    };
    let merged = validation::validate_patch(&ticket, &patch)?;

    let sql = format!(
        "UPDATE tickets SET event_id = $2, name = $3, description = $4, kind = $5, price = $6, \
         quantity = $7, is_description_visible = $8, position = $9, is_fee_absorbed = $10, \
         sales_starts_at = $11, sales_ends_at = $12, is_hidden = $13, min_order = $14, \
         max_order = $15, updated_at = now() \
         WHERE id = $1 RETURNING {TICKET_COLUMNS}"
    );
    let updated = sqlx::query_as::<_, Ticket>(&sql)
        .bind(ticket.id)
        .bind(event_id)
        .bind(&merged.name)
        .bind(&merged.description)
        .bind(&merged.kind)
        .bind(merged.price)
        .bind(merged.quantity)
        .bind(merged.is_description_visible)
        .bind(merged.position)
        .bind(merged.is_fee_absorbed)
        .bind(merged.sales_starts_at)
        .bind(merged.sales_ends_at)
        .bind(merged.is_hidden)
        .bind(merged.min_order)
        .bind(merged.max_order)
        .fetch_one(&state.pool)
        .await?;

    tracing::info!(ticket_id = %updated.id, "Ticket updated");

    Ok(Json(Document::new(ticket_resource(&updated))))
}

/// DELETE /v1/tickets/:ticket_id
pub async fn delete_ticket(
    State(state): State<AppState>,
    Path(ticket_id): Path<Uuid>,
    AuthenticatedUser(user): AuthenticatedUser,
) -> Result<impl IntoResponse, AppError> {
    let ticket = fetch_ticket(&state.pool, ticket_id).await?;

    if !auth::is_coorganizer(&state.pool, user.id, ticket.event_id).await? {
        return Err(AppError::Forbidden(format!(
            "coorganizer access required for event {}",
            ticket.event_id
        )));
    }

    sqlx::query("DELETE FROM tickets WHERE id = $1")
        .bind(ticket.id)
        .execute(&state.pool)
        .await?;

    tracing::info!(ticket_id = %ticket.id, "Ticket deleted");

    Ok(Json(MetaDocument::new("Object successfully deleted")))
}

/// GET /v1/events/:event_id/tickets
pub async fn event_tickets(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let event: Event = safe_query(&state.pool, EVENT_BY_ID, event_id, "Event", "event_id").await?;
    list_for_event(&state, &event, user).await
}

/// GET /v1/events/identifier/:event_identifier/tickets
pub async fn event_tickets_by_identifier(
    State(state): State<AppState>,
    Path(event_identifier): Path<String>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let event: Event = safe_query(
        &state.pool,
        EVENT_BY_IDENTIFIER,
        event_identifier,
        "Event",
        "event_identifier",
    )
    .await?;
    list_for_event(&state, &event, user).await
}

async fn list_for_event(
    state: &AppState,
    event: &Event,
    user: Option<User>,
) -> Result<Json<Document<Vec<Resource<TicketAttributes>>>>, AppError> {
    let include_hidden = auth::can_manage(&state.pool, user.as_ref(), event.id).await?;
    let sql = format!(
        "SELECT {TICKET_COLUMNS} FROM tickets \
         WHERE event_id = $1 AND ($2 OR NOT is_hidden) \
         ORDER BY position NULLS LAST, created_at"
    );
    let tickets = sqlx::query_as::<_, Ticket>(&sql)
        .bind(event.id)
        .bind(include_hidden)
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(Document::new(ticket_collection(&tickets))))
}

/// GET /v1/ticket-tags/:ticket_tag_id/tickets
pub async fn ticket_tag_tickets(
    State(state): State<AppState>,
    Path(ticket_tag_id): Path<Uuid>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let tag: TicketTag = safe_query(
        &state.pool,
        "SELECT id, event_id, name, created_at, updated_at FROM ticket_tags WHERE id = $1",
        ticket_tag_id,
        "TicketTag",
        "ticket_tag_id",
    )
    .await?;

    let include_hidden = auth::can_manage(&state.pool, user.as_ref(), tag.event_id).await?;
    let tickets = sqlx::query_as::<_, Ticket>(
        "SELECT t.* FROM tickets t \
         JOIN ticket_tag_assignments a ON a.ticket_id = t.id \
         WHERE a.ticket_tag_id = $1 AND ($2 OR NOT t.is_hidden) \
         ORDER BY t.position NULLS LAST, t.created_at",
    )
    .bind(tag.id)
    .bind(include_hidden)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(Document::new(ticket_collection(&tickets))))
}

/// GET /v1/access-codes/:access_code_id/tickets
pub async fn access_code_tickets(
    State(state): State<AppState>,
    Path(access_code_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let access_code: AccessCode = safe_query(
        &state.pool,
        "SELECT id, event_id, code, is_active, created_at, updated_at \
         FROM access_codes WHERE id = $1",
        access_code_id,
        "AccessCode",
        "access_code_id",
    )
    .await?;

    // Access codes exist to unlock hidden tickets, so hidden rows are
    // always included here.
    let tickets = sqlx::query_as::<_, Ticket>(
        "SELECT t.* FROM tickets t \
         JOIN access_code_tickets a ON a.ticket_id = t.id \
         WHERE a.access_code_id = $1 \
         ORDER BY t.position NULLS LAST, t.created_at",
    )
    .bind(access_code.id)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(Document::new(ticket_collection(&tickets))))
}

/// GET /v1/orders/:order_id/tickets
pub async fn order_tickets(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let order: Order = safe_query(&state.pool, ORDER_BY_ID, order_id, "Order", "order_id").await?;
    tickets_for_order(&state.pool, &order).await
}

/// GET /v1/orders/identifier/:order_identifier/tickets
pub async fn order_tickets_by_identifier(
    State(state): State<AppState>,
    Path(order_identifier): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let order: Order = safe_query(
        &state.pool,
        ORDER_BY_IDENTIFIER,
        order_identifier,
        "Order",
        "order_identifier",
    )
    .await?;
    tickets_for_order(&state.pool, &order).await
}

async fn tickets_for_order(
    pool: &PgPool,
    order: &Order,
) -> Result<Json<Document<Vec<Resource<TicketAttributes>>>>, AppError> {
    // Buyers see what they bought, hidden or not.
    let tickets = sqlx::query_as::<_, Ticket>(
        "SELECT t.* FROM tickets t \
         JOIN order_tickets o ON o.ticket_id = t.id \
         WHERE o.order_id = $1 \
         ORDER BY t.position NULLS LAST, t.created_at",
    )
    .bind(order.id)
    .fetch_all(pool)
    .await?;

    Ok(Json(Document::new(ticket_collection(&tickets))))
}

pub(crate) fn ticket_resource(ticket: &Ticket) -> Resource<TicketAttributes> {
    let id = ticket.id;
    let mut relationships = BTreeMap::new();

    relationships.insert(
        "event",
        Relationship {
            links: RelationshipLinks {
                self_link: format!("/v1/tickets/{id}/relationships/event"),
                related: Some(format!("/v1/events/{}", ticket.event_id)),
            },
            data: Some(RelationshipData::One(Some(ResourceIdentifier::new(
                EVENT_TYPE,
                ticket.event_id,
            )))),
        },
    );

    for name in ["ticket-tags", "access-codes", "attendees"] {
        relationships.insert(
            name,
            Relationship {
                links: RelationshipLinks {
                    self_link: format!("/v1/tickets/{id}/relationships/{name}"),
                    related: None,
                },
                data: None,
            },
        );
    }

    Resource {
        kind: TICKET_TYPE,
        id: id.to_string(),
        attributes: ticket.attributes(),
        relationships,
        links: SelfLink {
            self_link: format!("/v1/tickets/{id}"),
        },
    }
}

pub(crate) fn ticket_collection(tickets: &[Ticket]) -> Vec<Resource<TicketAttributes>> {
    tickets.iter().map(ticket_resource).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono::Utc;

    fn ticket() -> Ticket {
        let starts = Utc.with_ymd_and_hms(2026, 1, 1, 10, 0, 0).unwrap();
        Ticket {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            name: "General Admission".to_string(),
            description: None,
            kind: "paid".to_string(),
            price: None,
            quantity: Some(10),
            is_description_visible: false,
            position: None,
            is_fee_absorbed: false,
            sales_starts_at: starts,
            sales_ends_at: starts + chrono::Duration::days(30),
            is_hidden: false,
            min_order: None,
            max_order: None,
            created_at: starts,
            updated_at: starts,
        }
    }

    #[test]
    fn test_resource_shape() {
        let ticket = ticket();
        let value = serde_json::to_value(ticket_resource(&ticket)).unwrap();

        assert_eq!(value["type"], "ticket");
        assert_eq!(value["id"], ticket.id.to_string());
        assert_eq!(value["attributes"]["name"], "General Admission");
        assert_eq!(value["attributes"]["type"], "paid");
        assert_eq!(value["attributes"]["is-fee-absorbed"], false);
        assert_eq!(
            value["links"]["self"],
            format!("/v1/tickets/{}", ticket.id)
        );
    }

    #[test]
    fn test_resource_relationships() {
        let ticket = ticket();
        let value = serde_json::to_value(ticket_resource(&ticket)).unwrap();
        let relationships = &value["relationships"];

        assert_eq!(
            relationships["event"]["data"]["id"],
            ticket.event_id.to_string()
        );
        assert_eq!(relationships["event"]["data"]["type"], "event");
        for name in ["ticket-tags", "access-codes", "attendees"] {
            assert_eq!(
                relationships[name]["links"]["self"],
                format!("/v1/tickets/{}/relationships/{name}", ticket.id)
            );
        }
    }

    #[test]
    fn test_collection_preserves_order() {
        let a = ticket();
        let b = ticket();
        let resources = ticket_collection(&[a.clone(), b.clone()]);
        assert_eq!(resources[0].id, a.id.to_string());
        assert_eq!(resources[1].id, b.id.to_string());
    }
}
