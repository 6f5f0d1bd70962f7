//! Data structures representing persisted entities.

pub mod booking;
pub mod cart_item;
pub mod catalog_item;

pub use booking::{AuditEntry, Booking, BookingStatus, PaymentStatus};
pub use cart_item::CartItem;
pub use catalog_item::{Availability, CatalogItem, ItemKind};
