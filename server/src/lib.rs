//! Ordering backend for a restaurant/event venue: catalog, per-user cart
//! ledger, checkout into bookings, and mobile-money payment reconciliation
//! (MTN MoMo, Orange Money).

pub mod config;
pub mod errors;
pub mod flows;
pub mod models;
pub mod payments;
pub mod pricing;
pub mod reconcile;
pub mod seed;
pub mod state;
pub mod store;
pub mod web;
