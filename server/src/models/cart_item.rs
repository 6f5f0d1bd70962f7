use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One cart row. At most one row exists per (user, item) pair; repeated adds
/// sum into the existing row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CartItem {
  pub id: Uuid,
  pub user_id: Uuid,
  pub item_id: Uuid,
  pub quantity: i32,
  pub note: Option<String>,
  pub added_at: DateTime<Utc>,
}
