use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Whether the catalog entry is a kitchen meal or a ticketed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "item_kind_enum", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemKind {
  Meal,
  Event,
}

/// The sole gate for cart admission. Stock, when tracked, bounds the
/// quantity; availability decides whether the item can be ordered at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "availability_enum", rename_all = "snake_case")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Availability {
  Available,
  OutOfStock,
  Unavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CatalogItem {
  pub id: Uuid,
  pub name: String,
  pub kind: ItemKind,
  /// Price in minor currency units.
  pub price_cents: i64,
  pub availability: Availability,
  /// `None` means the stock counter is untracked (no quantity ceiling).
  pub stock: Option<i32>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl CatalogItem {
  pub fn is_orderable(&self) -> bool {
    self.availability == Availability::Available
  }
}
