//! Persistence seam. `PgStore` backs the real server; `MemoryStore` backs
//! tests and local experiments. Every mutating method is a single atomic
//! unit: checks and writes happen inside one transaction (or one lock
//! critical section), never as read-then-write across calls.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{AuditEntry, Booking, BookingStatus, CartItem, CatalogItem, PaymentStatus};

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::errors::AppError;

/// Shared admission check for cart writes. `existing_quantity` is what the
/// row already holds (0 for quantity overwrites, where the ceiling applies
/// to the new absolute value). Returns the admitted row quantity, so callers
/// never repeat the addition themselves.
pub(crate) fn admit_to_cart(item: &CatalogItem, existing_quantity: i32, requested: i32) -> Result<i32> {
  if requested <= 0 {
    return Err(AppError::Validation("Quantity must be at least 1".to_string()));
  }
  if !item.is_orderable() {
    return Err(AppError::Unavailable(format!("{} is not available for ordering", item.name)));
  }
  let combined = existing_quantity
    .checked_add(requested)
    .ok_or_else(|| AppError::Validation("Quantity is too large".to_string()))?;
  if let Some(stock) = item.stock {
    if combined > stock {
      return Err(AppError::InsufficientStock {
        requested,
        remaining: (stock - existing_quantity).max(0),
      });
    }
  }
  Ok(combined)
}

/// Outcome of a reconciliation write. `Unchanged` means the booking was
/// already in the target state and the audit entry was a replay; nothing was
/// persisted.
#[derive(Debug, Clone)]
pub enum ReconcileWrite {
  Updated(Booking),
  Unchanged(Booking),
}

impl ReconcileWrite {
  pub fn booking(&self) -> &Booking {
    match self {
      ReconcileWrite::Updated(b) | ReconcileWrite::Unchanged(b) => b,
    }
  }

  pub fn changed(&self) -> bool {
    matches!(self, ReconcileWrite::Updated(_))
  }
}

#[async_trait]
pub trait Store: Send + Sync {
  // --- catalog ---
  async fn item(&self, id: Uuid) -> Result<Option<CatalogItem>>;
  async fn list_items(&self) -> Result<Vec<CatalogItem>>;
  async fn upsert_item(&self, item: &CatalogItem) -> Result<()>;
  async fn delete_item(&self, id: Uuid) -> Result<()>;

  // --- cart ---

  /// Adds `quantity` of an item to the user's cart, summing into the
  /// existing row if one exists. Fails with `NotFound` when the item does
  /// not exist, `Unavailable` when it is not orderable, and
  /// `InsufficientStock` when the combined quantity would exceed tracked
  /// stock. A non-empty note replaces the stored note.
  async fn add_cart_item(&self, user_id: Uuid, item_id: Uuid, quantity: i32, note: Option<String>)
    -> Result<CartItem>;

  /// Overwrites the quantity on one of the user's cart rows. The stock
  /// ceiling applies to the new absolute quantity.
  async fn set_cart_quantity(&self, user_id: Uuid, row_id: Uuid, quantity: i32) -> Result<CartItem>;

  /// Removes one of the user's cart rows. Removing an absent row is a no-op.
  async fn remove_cart_item(&self, user_id: Uuid, row_id: Uuid) -> Result<()>;

  async fn clear_cart(&self, user_id: Uuid) -> Result<()>;

  /// The user's cart joined with its catalog items. Rows whose item has been
  /// deleted are dropped from the result.
  async fn cart_with_items(&self, user_id: Uuid) -> Result<Vec<(CartItem, CatalogItem)>>;

  // --- bookings ---
  async fn create_booking(&self, booking: &Booking) -> Result<()>;
  async fn booking_by_reference(&self, reference: &str) -> Result<Option<Booking>>;

  /// Stores the provider-side transaction id on a booking.
  async fn set_payment_reference(&self, reference: &str, payment_reference: &str) -> Result<()>;

  /// Applies a reconciliation outcome to a booking: moves both statuses to
  /// the target pair, records the provider transaction id, and appends the
  /// audit entry unless an entry with the same (transaction_id, digest) is
  /// already present. Returns `Unchanged` when nothing needed writing.
  async fn record_payment_outcome(
    &self,
    reference: &str,
    payment_status: PaymentStatus,
    booking_status: BookingStatus,
    payment_reference: Option<String>,
    entry: AuditEntry,
  ) -> Result<ReconcileWrite>;
}
