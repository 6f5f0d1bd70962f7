//! In-memory store used by the test suite and local experiments. A single
//! mutex stands in for the database transaction: every mutating method is
//! one critical section, so check-and-set sequences cannot interleave.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::{AuditEntry, Booking, BookingStatus, CartItem, CatalogItem, PaymentStatus};
use crate::store::{admit_to_cart, ReconcileWrite, Store};

#[derive(Default)]
struct Inner {
  items: HashMap<Uuid, CatalogItem>,
  cart_rows: HashMap<Uuid, CartItem>,
  bookings: HashMap<String, Booking>,
}

#[derive(Default)]
pub struct MemoryStore {
  inner: Mutex<Inner>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl Store for MemoryStore {
  async fn item(&self, id: Uuid) -> Result<Option<CatalogItem>> {
    Ok(self.inner.lock().items.get(&id).cloned())
  }

  async fn list_items(&self) -> Result<Vec<CatalogItem>> {
    let mut items: Vec<_> = self.inner.lock().items.values().cloned().collect();
    items.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(items)
  }

  async fn upsert_item(&self, item: &CatalogItem) -> Result<()> {
    self.inner.lock().items.insert(item.id, item.clone());
    Ok(())
  }

  async fn delete_item(&self, id: Uuid) -> Result<()> {
    self.inner.lock().items.remove(&id);
    Ok(())
  }

  async fn add_cart_item(
    &self,
    user_id: Uuid,
    item_id: Uuid,
    quantity: i32,
    note: Option<String>,
  ) -> Result<CartItem> {
    let mut inner = self.inner.lock();

    let item = inner
      .items
      .get(&item_id)
      .cloned()
      .ok_or_else(|| AppError::NotFound(format!("Item {} not found", item_id)))?;

    let existing_id = inner
      .cart_rows
      .values()
      .find(|r| r.user_id == user_id && r.item_id == item_id)
      .map(|r| r.id);
    let existing_quantity = existing_id
      .and_then(|id| inner.cart_rows.get(&id))
      .map(|r| r.quantity)
      .unwrap_or(0);

    let combined = admit_to_cart(&item, existing_quantity, quantity)?;

    let note = note.filter(|n| !n.trim().is_empty());
    match existing_id {
      Some(id) => {
        let row = inner.cart_rows.get_mut(&id).ok_or_else(|| {
          AppError::Internal("cart row disappeared mid-update".to_string())
        })?;
        row.quantity = combined;
        if let Some(n) = note {
          row.note = Some(n);
        }
        Ok(row.clone())
      }
      None => {
        let row = CartItem {
          id: Uuid::new_v4(),
          user_id,
          item_id,
          quantity,
          note,
          added_at: Utc::now(),
        };
        inner.cart_rows.insert(row.id, row.clone());
        Ok(row)
      }
    }
  }

  async fn set_cart_quantity(&self, user_id: Uuid, row_id: Uuid, quantity: i32) -> Result<CartItem> {
    let mut inner = self.inner.lock();

    let row = inner
      .cart_rows
      .get(&row_id)
      .filter(|r| r.user_id == user_id)
      .cloned()
      .ok_or_else(|| AppError::NotFound("Cart item not found".to_string()))?;
    let item = inner
      .items
      .get(&row.item_id)
      .cloned()
      .ok_or_else(|| AppError::NotFound(format!("Item {} not found", row.item_id)))?;

    // The ceiling applies to the new absolute quantity, not a delta.
    let quantity = admit_to_cart(&item, 0, quantity)?;

    let row = inner.cart_rows.get_mut(&row_id).ok_or_else(|| {
      AppError::Internal("cart row disappeared mid-update".to_string())
    })?;
    row.quantity = quantity;
    Ok(row.clone())
  }

  async fn remove_cart_item(&self, user_id: Uuid, row_id: Uuid) -> Result<()> {
    let mut inner = self.inner.lock();
    if inner.cart_rows.get(&row_id).map(|r| r.user_id) == Some(user_id) {
      inner.cart_rows.remove(&row_id);
    }
    Ok(())
  }

  async fn clear_cart(&self, user_id: Uuid) -> Result<()> {
    self.inner.lock().cart_rows.retain(|_, r| r.user_id != user_id);
    Ok(())
  }

  async fn cart_with_items(&self, user_id: Uuid) -> Result<Vec<(CartItem, CatalogItem)>> {
    let inner = self.inner.lock();
    let mut lines: Vec<_> = inner
      .cart_rows
      .values()
      .filter(|r| r.user_id == user_id)
      .filter_map(|r| inner.items.get(&r.item_id).map(|i| (r.clone(), i.clone())))
      .collect();
    lines.sort_by_key(|(r, _)| r.added_at);
    Ok(lines)
  }

  async fn create_booking(&self, booking: &Booking) -> Result<()> {
    self.inner.lock().bookings.insert(booking.reference.clone(), booking.clone());
    Ok(())
  }

  async fn booking_by_reference(&self, reference: &str) -> Result<Option<Booking>> {
    Ok(self.inner.lock().bookings.get(reference).cloned())
  }

  async fn set_payment_reference(&self, reference: &str, payment_reference: &str) -> Result<()> {
    let mut inner = self.inner.lock();
    let booking = inner
      .bookings
      .get_mut(reference)
      .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", reference)))?;
    booking.payment_reference = Some(payment_reference.to_string());
    booking.updated_at = Utc::now();
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
    let mut inner = self.inner.lock();
    let booking = inner
      .bookings
      .get_mut(reference)
      .ok_or_else(|| AppError::NotFound(format!("Booking {} not found", reference)))?;

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

    if changed {
      booking.updated_at = Utc::now();
      Ok(ReconcileWrite::Updated(booking.clone()))
    } else {
      Ok(ReconcileWrite::Unchanged(booking.clone()))
    }
  }
}
