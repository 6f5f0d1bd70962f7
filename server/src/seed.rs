//! Demo catalog rows for local development.

use chrono::Utc;
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{Availability, CatalogItem, ItemKind};
use crate::store::Store;

pub async fn seed_demo_catalog(store: &dyn Store) -> Result<()> {
  let now = Utc::now();
  // Fixed ids keep reseeding idempotent across restarts.
  let items = [
    (1u128, "Grilled Chicken Platter", ItemKind::Meal, 450_000, Some(40)),
    (2, "Ndole with Plantains", ItemKind::Meal, 350_000, Some(25)),
    (3, "Jazz Night Ticket", ItemKind::Event, 1_000_000, Some(120)),
    (4, "Chef's Tasting Dinner", ItemKind::Event, 2_500_000, Some(12)),
  ];

  for (id, name, kind, price_cents, stock) in items {
    store
      .upsert_item(&CatalogItem {
        id: Uuid::from_u128(id),
        name: name.to_string(),
        kind,
        price_cents,
        availability: Availability::Available,
        stock,
        created_at: now,
        updated_at: now,
      })
      .await?;
  }
  tracing::info!("Demo catalog seeded.");
  Ok(())
}
