//! Context data types for the application flows. Each write-path operation
//! has its own context; the flow registry dispatches on the context type.

use nyama_flow::Ctx;
use uuid::Uuid;

use crate::models::{Booking, CartItem};
use crate::payments::{PaymentMethod, PaymentNotice, ProviderReport};
use crate::pricing::CartSummary;
use crate::state::AppState;
use crate::store::ReconcileWrite;

pub struct AddToCartCtx {
  pub state: AppState,
  pub user_id: Uuid,
  pub item_id: Uuid,
  pub quantity: i32,
  pub note: Option<String>,
  /// The upserted row, filled by the flow.
  pub row: Option<CartItem>,
}

pub struct MomoCollectionCtx {
  pub state: AppState,
  pub booking: Booking,
  pub payer_msisdn: String,
  pub report: Option<ProviderReport>,
}

pub struct OrangeCollectionCtx {
  pub state: AppState,
  pub booking: Booking,
  pub payer_msisdn: String,
  pub report: Option<ProviderReport>,
}

/// Holds onto the branch sub-context so the parent flow can read the
/// provider report back after the branch returns.
#[derive(Clone, Default)]
pub enum ActiveCollection {
  #[default]
  None,
  Momo(Ctx<MomoCollectionCtx>),
  Orange(Ctx<OrangeCollectionCtx>),
}

impl ActiveCollection {
  pub fn report(&self) -> Option<ProviderReport> {
    match self {
      ActiveCollection::None => None,
      ActiveCollection::Momo(ctx) => ctx.read().report.clone(),
      ActiveCollection::Orange(ctx) => ctx.read().report.clone(),
    }
  }
}

pub struct CheckoutCtx {
  pub state: AppState,
  pub user_id: Uuid,
  pub method: PaymentMethod,
  pub payer_msisdn: String,
  pub summary: Option<CartSummary>,
  pub booking: Option<Booking>,
  pub collection: ActiveCollection,
}

pub struct WebhookCtx {
  pub state: AppState,
  pub method: PaymentMethod,
  /// Raw body bytes, kept for signature verification and the audit trail.
  pub raw: Vec<u8>,
  pub signature: Option<String>,
  pub notice: Option<PaymentNotice>,
  pub write: Option<ReconcileWrite>,
}
