//! Postgres-backed store. Mutations that need a check-and-set take row
//! locks (`SELECT ... FOR UPDATE`) inside a transaction so concurrent
//! requests serialize on the rows they touch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::{AuditEntry, Booking, BookingStatus, CartItem, CatalogItem, PaymentStatus};
use crate::store::{admit_to_cart, ReconcileWrite, Store};

pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

/// Row shape for `bookings`; the audit trail lives in a JSONB column.
#[derive(Debug, FromRow)]
struct BookingRow {
  id: Uuid,
  user_id: Uuid,
  reference: String,
  status: BookingStatus,
  payment_status: PaymentStatus,
  payment_reference: Option<String>,
  amount_cents: i64,
  currency: String,
  audit: Json<Vec<AuditEntry>>,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl From<BookingRow> for Booking {
  fn from(row: BookingRow) -> Self {
    Booking {
      id: row.id,
      user_id: row.user_id,
      reference: row.reference,
      status: row.status,
      payment_status: row.payment_status,
      payment_reference: row.payment_reference,
      amount_cents: row.amount_cents,
      currency: row.currency,
      audit: row.audit.0,
      created_at: row.created_at,
      updated_at: row.updated_at,
    }
  }
}

const ITEM_COLUMNS: &str = "id, name, kind, price_cents, availability, stock, created_at, updated_at";
const BOOKING_COLUMNS: &str =
  "id, user_id, reference, status, payment_status, payment_reference, amount_cents, currency, audit, created_at, updated_at";

#[async_trait]
impl Store for PgStore {
  async fn item(&self, id: Uuid) -> Result<Option<CatalogItem>> {
    let item = sqlx::query_as::<_, CatalogItem>(&format!(
      "SELECT {} FROM catalog_items WHERE id = $1",
      ITEM_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(item)
  }

  async fn list_items(&self) -> Result<Vec<CatalogItem>> {
    let items = sqlx::query_as::<_, CatalogItem>(&format!(
      "SELECT {} FROM catalog_items ORDER BY name",
      ITEM_COLUMNS
    ))
    .fetch_all(&self.pool)
    .await?;
    Ok(items)
  }

  async fn upsert_item(&self, item: &CatalogItem) -> Result<()> {
    sqlx::query(
      "INSERT INTO catalog_items (id, name, kind, price_cents, availability, stock, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
       ON CONFLICT (id) DO UPDATE SET \
         name = EXCLUDED.name, kind = EXCLUDED.kind, price_cents = EXCLUDED.price_cents, \
         availability = EXCLUDED.availability, stock = EXCLUDED.stock, updated_at = EXCLUDED.updated_at",
    )
    .bind(item.id)
    .bind(&item.name)
    .bind(item.kind)
    .bind(item.price_cents)
    .bind(item.availability)
    .bind(item.stock)
    .bind(item.created_at)
    .bind(item.updated_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn delete_item(&self, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM catalog_items WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn add_cart_item(
    &self,
    user_id: Uuid,
    item_id: Uuid,
    quantity: i32,
    note: Option<String>,
  ) -> Result<CartItem> {
    let mut tx = self.pool.begin().await?;

    let item = sqlx::query_as::<_, CatalogItem>(&format!(
      "SELECT {} FROM catalog_items WHERE id = $1 FOR UPDATE",
      ITEM_COLUMNS
    ))
    .bind(item_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Item {} not found", item_id)))?;

    let existing = sqlx::query_as::<_, CartItem>(
      "SELECT id, user_id, item_id, quantity, note, added_at FROM cart_items \
       WHERE user_id = $1 AND item_id = $2 FOR UPDATE",
    )
    .bind(user_id)
    .bind(item_id)
    .fetch_optional(&mut *tx)
    .await?;

    let existing_quantity = existing.as_ref().map(|r| r.quantity).unwrap_or(0);
    let combined = admit_to_cart(&item, existing_quantity, quantity)?;

    let note = note.filter(|n| !n.trim().is_empty());
    let row = match existing {
      Some(row) => {
        sqlx::query_as::<_, CartItem>(
          "UPDATE cart_items SET quantity = $2, note = COALESCE($3, note) WHERE id = $1 \
           RETURNING id, user_id, item_id, quantity, note, added_at",
        )
        .bind(row.id)
        .bind(combined)
        .bind(note)
        .fetch_one(&mut *tx)
        .await?
      }
      None => {
        sqlx::query_as::<_, CartItem>(
          "INSERT INTO cart_items (id, user_id, item_id, quantity, note, added_at) \
           VALUES ($1, $2, $3, $4, $5, $6) \
           RETURNING id, user_id, item_id, quantity, note, added_at",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(item_id)
        .bind(quantity)
        .bind(note)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?
      }
    };

    tx.commit().await?;
    Ok(row)
  }

  async fn set_cart_quantity(&self, user_id: Uuid, row_id: Uuid, quantity: i32) -> Result<CartItem> {
    let mut tx = self.pool.begin().await?;

    // Locks are taken item-first everywhere that touches both tables, so
    // this method cannot deadlock against add_cart_item. The first row read
    // is unlocked and only resolves the item id; the locked re-read below is
    // authoritative.
    let row = sqlx::query_as::<_, CartItem>(
      "SELECT id, user_id, item_id, quantity, note, added_at FROM cart_items \
       WHERE id = $1 AND user_id = $2",
    )
    .bind(row_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Cart item not found".to_string()))?;

    let item = sqlx::query_as::<_, CatalogItem>(&format!(
      "SELECT {} FROM catalog_items WHERE id = $1 FOR UPDATE",
      ITEM_COLUMNS
    ))
    .bind(row.item_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Item {} not found", row.item_id)))?;

    sqlx::query_as::<_, CartItem>(
      "SELECT id, user_id, item_id, quantity, note, added_at FROM cart_items \
       WHERE id = $1 AND user_id = $2 FOR UPDATE",
    )
    .bind(row_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound("Cart item not found".to_string()))?;

    let quantity = admit_to_cart(&item, 0, quantity)?;

    let row = sqlx::query_as::<_, CartItem>(
      "UPDATE cart_items SET quantity = $2 WHERE id = $1 \
       RETURNING id, user_id, item_id, quantity, note, added_at",
    )
    .bind(row_id)
    .bind(quantity)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row)
  }

  async fn remove_cart_item(&self, user_id: Uuid, row_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM cart_items WHERE id = $1 AND user_id = $2")
      .bind(row_id)
      .bind(user_id)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn clear_cart(&self, user_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
      .bind(user_id)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn cart_with_items(&self, user_id: Uuid) -> Result<Vec<(CartItem, CatalogItem)>> {
    let rows = sqlx::query_as::<_, CartItem>(
      "SELECT id, user_id, item_id, quantity, note, added_at FROM cart_items \
       WHERE user_id = $1 ORDER BY added_at",
    )
    .bind(user_id)
    .fetch_all(&self.pool)
    .await?;

    let ids: Vec<Uuid> = rows.iter().map(|r| r.item_id).collect();
    let items = sqlx::query_as::<_, CatalogItem>(&format!(
      "SELECT {} FROM catalog_items WHERE id = ANY($1)",
      ITEM_COLUMNS
    ))
    .bind(&ids)
    .fetch_all(&self.pool)
    .await?;

    // Inner join in memory; rows whose item was deleted drop out here.
    let lines = rows
      .into_iter()
      .filter_map(|r| {
        items
          .iter()
          .find(|i| i.id == r.item_id)
          .cloned()
          .map(|i| (r, i))
      })
      .collect();
    Ok(lines)
  }

  async fn create_booking(&self, booking: &Booking) -> Result<()> {
    sqlx::query(
      "INSERT INTO bookings \
         (id, user_id, reference, status, payment_status, payment_reference, amount_cents, currency, audit, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(booking.id)
    .bind(booking.user_id)
    .bind(&booking.reference)
    .bind(booking.status)
    .bind(booking.payment_status)
    .bind(&booking.payment_reference)
    .bind(booking.amount_cents)
    .bind(&booking.currency)
    .bind(Json(&booking.audit))
    .bind(booking.created_at)
    .bind(booking.updated_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn booking_by_reference(&self, reference: &str) -> Result<Option<Booking>> {
    let row = sqlx::query_as::<_, BookingRow>(&format!(
      "SELECT {} FROM bookings WHERE reference = $1",
      BOOKING_COLUMNS
    ))
    .bind(reference)
    .fetch_optional(&self.pool)
    .await?;
    Ok(row.map(Booking::from))
  }

  async fn set_payment_reference(&self, reference: &str, payment_reference: &str) -> Result<()> {
    let result = sqlx::query("UPDATE bookings SET payment_reference = $2, updated_at = $3 WHERE reference = $1")
      .bind(reference)
      .bind(payment_reference)
      .bind(Utc::now())
      .execute(&self.pool)
      .await?;
    if result.rows_affected() == 0 {
      return Err(AppError::NotFound(format!("Booking {} not found", reference)));
    }
    Ok(())
  }

  async fn record_payment_outcome(
    &self,
    reference: &str,
    payment_status: PaymentStatus,
    booking_status: BookingStatus,
    payment_reference: Option<String>,
    entry: AuditEntry,
  ) -> Result<ReconcileWrite> {
    let mut tx = self.pool.begin().await?;

    let row = sqlx::query_as::<_, BookingRow>(&format!(
      "SELECT {} FROM bookings WHERE reference = $1 FOR UPDATE",
      BOOKING_COLUMNS
    ))
    .bind(reference)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", reference)))?;
    let mut booking = Booking::from(row);

    let mut changed = false;
    if booking.payment_status != payment_status || booking.status != booking_status {
      booking.payment_status = payment_status;
      booking.status = booking_status;
      changed = true;
    }
    if let Some(pr) = payment_reference {
      if booking.payment_reference.as_deref() != Some(pr.as_str()) {
        booking.payment_reference = Some(pr);
        changed = true;
      }
    }
    let duplicate = booking
      .audit
      .iter()
      .any(|e| e.transaction_id == entry.transaction_id && e.payload_digest == entry.payload_digest);
    if !duplicate {
      booking.audit.push(entry);
      changed = true;
    }

    if !changed {
      tx.commit().await?;
      return Ok(ReconcileWrite::Unchanged(booking));
    }

    booking.updated_at = Utc::now();
    sqlx::query(
      "UPDATE bookings SET status = $2, payment_status = $3, payment_reference = $4, audit = $5, updated_at = $6 \
       WHERE reference = $1",
    )
    .bind(reference)
    .bind(booking.status)
    .bind(booking.payment_status)
    .bind(&booking.payment_reference)
    .bind(Json(&booking.audit))
    .bind(booking.updated_at)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(ReconcileWrite::Updated(booking))
  }
}
