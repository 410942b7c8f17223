use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A ticket type sold for an event (not an individual admission).
/// Admissions are tracked per holder in [`crate::models::attendee::Attendee`].
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub kind: String,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
    pub is_description_visible: bool,
    pub position: Option<i32>,
    pub is_fee_absorbed: bool,
    pub sales_starts_at: DateTime<Utc>,
    pub sales_ends_at: DateTime<Utc>,
    pub is_hidden: bool,
    pub min_order: Option<i32>,
    pub max_order: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TicketTag {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Attribute members of a `ticket` resource, dasherized per JSON:API
/// convention. `kind` is exposed as the `type` attribute.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TicketAttributes {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
    pub is_description_visible: bool,
    pub position: Option<i32>,
    pub is_fee_absorbed: bool,
    pub sales_starts_at: DateTime<Utc>,
    pub sales_ends_at: DateTime<Utc>,
    pub is_hidden: bool,
    pub min_order: Option<i32>,
    pub max_order: Option<i32>,
}

/// Attributes accepted when creating a ticket. Sales window and name/type
/// are mandatory; everything else falls back to a column default.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NewTicket {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub quantity: Option<i32>,
    #[serde(default)]
    pub is_description_visible: Option<bool>,
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    pub is_fee_absorbed: Option<bool>,
    pub sales_starts_at: DateTime<Utc>,
    pub sales_ends_at: DateTime<Utc>,
    #[serde(default)]
    pub is_hidden: Option<bool>,
    #[serde(default)]
    pub min_order: Option<i32>,
    #[serde(default)]
    pub max_order: Option<i32>,
}

/// Partial update payload. Absent members leave the stored value untouched,
/// so invariants are checked against the merged row, not the patch alone.
/// Nullable attributes use a double `Option`: the outer layer distinguishes
/// an absent member from an explicit `null`, which clears the stored value.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TicketPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub price: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "nullable")]
    pub quantity: Option<Option<i32>>,
    #[serde(default)]
    pub is_description_visible: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub position: Option<Option<i32>>,
    #[serde(default)]
    pub is_fee_absorbed: Option<bool>,
    #[serde(default)]
    pub sales_starts_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sales_ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_hidden: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub min_order: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub max_order: Option<Option<i32>>,
}

/// Wraps a present member in `Some`, so `null` arrives as `Some(None)`
/// while `#[serde(default)]` keeps absent members at `None`.
fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl Ticket {
    pub fn attributes(&self) -> TicketAttributes {
        TicketAttributes {
            name: self.name.clone(),
            description: self.description.clone(),
            kind: self.kind.clone(),
            price: self.price,
            quantity: self.quantity,
            is_description_visible: self.is_description_visible,
            position: self.position,
            is_fee_absorbed: self.is_fee_absorbed,
            sales_starts_at: self.sales_starts_at,
            sales_ends_at: self.sales_ends_at,
            is_hidden: self.is_hidden,
            min_order: self.min_order,
            max_order: self.max_order,
        }
    }

    /// Overlays a patch on the stored row. Members the client omitted keep
    /// their stored value, which is what backfills the sales window before
    /// the date-ordering check runs. An explicit `null` on a nullable
    /// member clears it.
    pub fn apply_patch(&self, patch: &TicketPatch) -> Ticket {
        Ticket {
            id: self.id,
            event_id: self.event_id,
            name: patch.name.clone().unwrap_or_else(|| self.name.clone()),
            description: patch
                .description
                .clone()
                .unwrap_or_else(|| self.description.clone()),
            kind: patch.kind.clone().unwrap_or_else(|| self.kind.clone()),
            price: patch.price.unwrap_or(self.price),
            quantity: patch.quantity.unwrap_or(self.quantity),
            is_description_visible: patch
                .is_description_visible
                .unwrap_or(self.is_description_visible),
            position: patch.position.unwrap_or(self.position),
            is_fee_absorbed: patch.is_fee_absorbed.unwrap_or(self.is_fee_absorbed),
            sales_starts_at: patch.sales_starts_at.unwrap_or(self.sales_starts_at),
            sales_ends_at: patch.sales_ends_at.unwrap_or(self.sales_ends_at),
            is_hidden: patch.is_hidden.unwrap_or(self.is_hidden),
            min_order: patch.min_order.unwrap_or(self.min_order),
            max_order: patch.max_order.unwrap_or(self.max_order),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
