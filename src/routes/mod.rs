use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_media_type_layer, Config};
use crate::handlers::{health_check, relationships, tickets};
use crate::state::AppState;

pub fn create_routes(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/v1", v1_routes())
        .layer(TraceLayer::new_for_http())
        .layer(create_cors_layer(config))
        .with_state(state)
}

fn v1_routes() -> Router<AppState> {
    Router::new()
        .route("/tickets", post(tickets::create_ticket))
        .route(
            "/tickets/:ticket_id",
            get(tickets::ticket_detail)
                .patch(tickets::update_ticket)
                .delete(tickets::delete_ticket),
        )
        .route(
            "/tickets/:ticket_id/relationships/event",
            get(relationships::event_relationship).patch(relationships::update_event_relationship),
        )
        .route(
            "/tickets/:ticket_id/relationships/ticket-tags",
            get(relationships::ticket_tags_relationship),
        )
        .route(
            "/tickets/:ticket_id/relationships/access-codes",
            get(relationships::access_codes_relationship),
        )
        .route(
            "/tickets/:ticket_id/relationships/attendees",
            get(relationships::attendees_relationship),
        )
        .route("/events/:event_id/tickets", get(tickets::event_tickets))
        .route(
            "/events/identifier/:event_identifier/tickets",
            get(tickets::event_tickets_by_identifier),
        )
        .route(
            "/ticket-tags/:ticket_tag_id/tickets",
            get(tickets::ticket_tag_tickets),
        )
        .route(
            "/access-codes/:access_code_id/tickets",
            get(tickets::access_code_tickets),
        )
        .route("/orders/:order_id/tickets", get(tickets::order_tickets))
        .route(
            "/orders/identifier/:order_identifier/tickets",
            get(tickets::order_tickets_by_identifier),
        )
        .route(
            "/attendees/:attendee_id/ticket",
            get(tickets::attendee_ticket),
        )
        .layer(create_media_type_layer())
}
