use actix_web::web;

use crate::web::handlers::{
  booking_handlers, cart_handlers, catalog_handlers, checkout_handlers, webhook_handlers,
};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/catalog")
          .route("", web::get().to(catalog_handlers::list_catalog_handler))
          .route("/{id}", web::get().to(catalog_handlers::get_catalog_item_handler)),
      )
      .service(
        web::scope("/cart")
          .route("", web::get().to(cart_handlers::view_cart_handler))
          .route("", web::delete().to(cart_handlers::clear_cart_handler))
          .route("/items", web::post().to(cart_handlers::add_to_cart_handler))
          .route("/items/{id}", web::put().to(cart_handlers::update_cart_item_handler))
          .route("/items/{id}", web::delete().to(cart_handlers::remove_cart_item_handler)),
      )
      .service(web::scope("/checkout").route("", web::post().to(checkout_handlers::start_checkout_handler)))
      .service(
        web::scope("/bookings")
          .route("/{reference}/status", web::get().to(booking_handlers::booking_status_handler)),
      )
      .service(
        web::scope("/webhooks")
          .route("/{provider}", web::post().to(webhook_handlers::payment_webhook_handler)),
      )
      .service(
        web::scope("/admin")
          .route(
            "/bookings/{reference}/status",
            web::post().to(booking_handlers::override_status_handler),
          ),
      ),
  );
}
