use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::models::ticket::{NewTicket, Ticket, TicketPatch};
use crate::utils::error::AppError;

/// Validates a create payload. All checks yield 422 with a pointer at the
/// offending attribute.
pub fn validate_new(ticket: &NewTicket) -> Result<(), AppError> {
    non_negative_price(ticket.price)?;
    non_negative("quantity", ticket.quantity)?;
    non_negative("min-order", ticket.min_order)?;
    non_negative("max-order", ticket.max_order)?;
    sales_window(ticket.sales_starts_at, ticket.sales_ends_at)?;
    order_bounds(ticket.min_order, ticket.max_order, ticket.quantity)
}

/// Validates a patch against the stored row and returns the merged ticket.
/// Members absent from the patch are backfilled from the row first, so the
/// sales-window check always sees both timestamps.
pub fn validate_patch(current: &Ticket, patch: &TicketPatch) -> Result<Ticket, AppError> {
    let merged = current.apply_patch(patch);
    non_negative_price(merged.price)?;
    non_negative("quantity", merged.quantity)?;
    non_negative("min-order", merged.min_order)?;
    non_negative("max-order", merged.max_order)?;
    sales_window(merged.sales_starts_at, merged.sales_ends_at)?;
    order_bounds(merged.min_order, merged.max_order, merged.quantity)?;
    Ok(merged)
}

fn sales_window(starts_at: DateTime<Utc>, ends_at: DateTime<Utc>) -> Result<(), AppError> {
    if starts_at >= ends_at {
        return Err(AppError::unprocessable(
            "/data/attributes/sales-ends-at",
            "sales-ends-at should be after sales-starts-at",
        ));
    }
    Ok(())
}

fn order_bounds(
    min_order: Option<i32>,
    max_order: Option<i32>,
    quantity: Option<i32>,
) -> Result<(), AppError> {
    if let (Some(min), Some(max)) = (min_order, max_order) {
        if max < min {
            return Err(AppError::unprocessable(
                "/data/attributes/max-order",
                "max-order should be greater than min-order",
            ));
        }
    }

    if let (Some(min), Some(quantity)) = (min_order, quantity) {
        if quantity < min {
            return Err(AppError::unprocessable(
                "/data/attributes/quantity",
                "quantity should be greater than min-order",
            ));
        }
    }

    Ok(())
}

fn non_negative(member: &str, value: Option<i32>) -> Result<(), AppError> {
    match value {
        Some(v) if v < 0 => Err(AppError::unprocessable(
            format!("/data/attributes/{member}"),
            format!("{member} should not be negative"),
        )),
        _ => Ok(()),
    }
}

fn non_negative_price(price: Option<Decimal>) -> Result<(), AppError> {
    match price {
        Some(p) if p < Decimal::ZERO => Err(AppError::unprocessable(
            "/data/attributes/price",
            "price should not be negative",
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn window(
        start: (i32, u32, u32),
        end: (i32, u32, u32),
    ) -> (DateTime<Utc>, DateTime<Utc>) {
        (
            Utc.with_ymd_and_hms(start.0, start.1, start.2, 10, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(end.0, end.1, end.2, 10, 0, 0).unwrap(),
        )
    }

    fn new_ticket() -> NewTicket {
        let (starts, ends) = window((2026, 1, 1), (2026, 2, 1));
        NewTicket {
            name: "General Admission".to_string(),
            description: None,
            kind: "paid".to_string(),
            price: Some(Decimal::new(2500, 2)),
            quantity: Some(100),
            is_description_visible: None,
            position: None,
            is_fee_absorbed: None,
            sales_starts_at: starts,
            sales_ends_at: ends,
            is_hidden: None,
            min_order: Some(1),
            max_order: Some(10),
        }
    }

    fn stored_ticket() -> Ticket {
        let (starts, ends) = window((2026, 1, 1), (2026, 2, 1));
        Ticket {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            name: "General Admission".to_string(),
            description: None,
            kind: "paid".to_string(),
            price: None,
            quantity: Some(100),
            is_description_visible: false,
            position: None,
            is_fee_absorbed: false,
            sales_starts_at: starts,
            sales_ends_at: ends,
            is_hidden: false,
            min_order: Some(1),
            max_order: Some(10),
            created_at: starts,
            updated_at: starts,
        }
    }

    fn pointer_of(err: AppError) -> String {
        match err {
            AppError::UnprocessableEntity { pointer, .. } => pointer,
            other => panic!("expected unprocessable entity, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_ticket_passes() {
        assert!(validate_new(&new_ticket()).is_ok());
    }

    #[test]
    fn test_sales_window_must_be_ordered() {
        let mut ticket = new_ticket();
        let (starts, ends) = window((2026, 2, 1), (2026, 1, 1));
        ticket.sales_starts_at = starts;
        ticket.sales_ends_at = ends;

        let pointer = pointer_of(validate_new(&ticket).unwrap_err());
        assert_eq!(pointer, "/data/attributes/sales-ends-at");
    }

    #[test]
    fn test_sales_window_rejects_equal_timestamps() {
        let mut ticket = new_ticket();
        ticket.sales_ends_at = ticket.sales_starts_at;
        assert!(validate_new(&ticket).is_err());
    }

    #[test]
    fn test_max_order_must_cover_min_order() {
        let mut ticket = new_ticket();
        ticket.min_order = Some(5);
        ticket.max_order = Some(2);

        let pointer = pointer_of(validate_new(&ticket).unwrap_err());
        assert_eq!(pointer, "/data/attributes/max-order");
    }

    #[test]
    fn test_quantity_must_cover_min_order() {
        let mut ticket = new_ticket();
        ticket.min_order = Some(5);
        ticket.quantity = Some(3);
        ticket.max_order = Some(8);

        let pointer = pointer_of(validate_new(&ticket).unwrap_err());
        assert_eq!(pointer, "/data/attributes/quantity");
    }

    #[test]
    fn test_bounds_are_skipped_when_members_absent() {
        let mut ticket = new_ticket();
        ticket.min_order = None;
        ticket.quantity = None;
        ticket.max_order = Some(2);
        assert!(validate_new(&ticket).is_ok());
    }

    #[test]
    fn test_negative_price_is_rejected() {
        let mut ticket = new_ticket();
        ticket.price = Some(Decimal::new(-100, 2));

        let pointer = pointer_of(validate_new(&ticket).unwrap_err());
        assert_eq!(pointer, "/data/attributes/price");
    }

    #[test]
    fn test_negative_min_order_is_rejected() {
        let mut ticket = new_ticket();
        ticket.min_order = Some(-1);

        let pointer = pointer_of(validate_new(&ticket).unwrap_err());
        assert_eq!(pointer, "/data/attributes/min-order");
    }

    #[test]
    fn test_patch_backfills_sales_window_from_stored_row() {
        let stored = stored_ticket();
        // Moving the end before the stored start must fail even though the
        // patch carries only one timestamp.
        let patch = TicketPatch {
            sales_ends_at: Some(Utc.with_ymd_and_hms(2025, 12, 1, 10, 0, 0).unwrap()),
            ..TicketPatch::default()
        };

        let pointer = pointer_of(validate_patch(&stored, &patch).unwrap_err());
        assert_eq!(pointer, "/data/attributes/sales-ends-at");
    }

    #[test]
    fn test_patch_checks_bounds_against_merged_row() {
        let stored = stored_ticket();
        // Stored min_order is 1; raising it above the stored quantity of 100
        // must be caught.
        let patch = TicketPatch {
            min_order: Some(Some(200)),
            ..TicketPatch::default()
        };

        let pointer = pointer_of(validate_patch(&stored, &patch).unwrap_err());
        assert_eq!(pointer, "/data/attributes/quantity");
    }

    #[test]
    fn test_valid_patch_returns_merged_ticket() {
        let stored = stored_ticket();
        let patch = TicketPatch {
            quantity: Some(Some(50)),
            ..TicketPatch::default()
        };

        let merged = validate_patch(&stored, &patch).unwrap();
        assert_eq!(merged.quantity, Some(50));
        assert_eq!(merged.name, stored.name);
    }
}
