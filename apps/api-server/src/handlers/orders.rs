//! Demo order endpoints, each failing in a different way.

use actix_web::{HttpMessage, HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use faultline_core::domain::{Controller, DispatchException, ReportableError, RequestDiagnostics};

use crate::middleware::ErrorContext;
use crate::middleware::error::{AppError, AppResult};

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: u64,
    pub status: &'static str,
}

/// Order lookup. Order 0 doesn't exist, order 13 hits a broken ledger.
///
/// GET /api/orders/{id}
pub async fn get_order(path: web::Path<u64>, context: ErrorContext) -> AppResult<HttpResponse> {
    let id = path.into_inner();
    context.insert("order_id", id);

    match id {
        0 => Err(AppError::NotFound(format!("order {} not found", id))),
        13 => Err(AppError::Internal("ledger unavailable".to_string())),
        _ => Ok(HttpResponse::Ok().json(OrderResponse {
            id,
            status: "shipped",
        })),
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CheckoutRequest {
    pub cart_id: String,
    pub total_cents: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("card declined for cart {0}")]
    Declined(String),
}

/// Describes a checkout in reports instead of the raw request.
struct CheckoutDiagnostics {
    cart: CheckoutRequest,
}

impl RequestDiagnostics for CheckoutDiagnostics {
    fn request_data(&self) -> Value {
        json!({
            "controller": "checkout",
            "cart_id": self.cart.cart_id,
            "total_cents": self.cart.total_cents,
        })
    }
}

/// Checkout. Payment failures are rescued into an error page and left on
/// the request for the reporter.
///
/// POST /api/checkout
pub async fn checkout(
    req: HttpRequest,
    context: ErrorContext,
    body: web::Json<CheckoutRequest>,
) -> AppResult<HttpResponse> {
    let cart = body.into_inner();
    if cart.cart_id.is_empty() {
        return Err(AppError::BadRequest("cart_id is required".to_string()));
    }

    context.set_controller(Controller::diagnostics(CheckoutDiagnostics { cart: cart.clone() }));

    if cart.total_cents == 0 {
        let error = PaymentError::Declined(cart.cart_id);
        req.extensions_mut()
            .insert(DispatchException(ReportableError::from_error(&error)));
        return Ok(HttpResponse::BadGateway().json(json!({
            "status": 502,
            "title": "Payment failed",
        })));
    }

    Ok(HttpResponse::Ok().json(json!({ "cart_id": cart.cart_id, "status": "paid" })))
}

/// Always panics.
///
/// GET /api/crash
pub async fn crash() -> HttpResponse {
    panic!("simulated crash");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::{App, http::StatusCode, test};
    use faultline_core::ReporterConfig;
    use faultline_infra::InMemoryNotifier;

    use crate::handlers::configure_routes;
    use crate::middleware::{ErrorReporting, error_id};

    #[actix_web::test]
    async fn test_ledger_failure_is_reported_with_context() {
        let notifier = Arc::new(InMemoryNotifier::new());
        let app = test::init_service(
            App::new()
                .wrap(ErrorReporting::new(
                    notifier.clone(),
                    Arc::new(ReporterConfig::default()),
                ))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/orders/13").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(error_id(res.request()).is_some());

        let req = test::TestRequest::get().uri("/api/orders/0").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert!(error_id(res.request()).is_some());

        let notices = notifier.notices().await;
        assert_eq!(notices.len(), 2);
        let ledger = &notices[0].1;
        assert_eq!(ledger.error.class, "Internal");
        assert_eq!(ledger.error.status, Some(500));
        assert_eq!(ledger.context["order_id"], 13);
        assert_eq!(ledger.request["raw_request"]["match_info"]["id"], "13");

        let missing = &notices[1].1;
        assert_eq!(missing.error.class, "NotFound");
        assert_eq!(missing.error.status, Some(404));
        assert_eq!(missing.context["order_id"], 0);
    }

    #[actix_web::test]
    async fn test_declined_checkout_reports_diagnostics() {
        let notifier = Arc::new(InMemoryNotifier::new());
        let app = test::init_service(
            App::new()
                .wrap(ErrorReporting::new(
                    notifier.clone(),
                    Arc::new(ReporterConfig::default()),
                ))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/checkout")
            .set_json(serde_json::json!({ "cart_id": "c-1", "total_cents": 0 }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::BAD_GATEWAY);

        let notices = notifier.notices().await;
        assert_eq!(notices.len(), 1);
        let notice = &notices[0].1;
        assert_eq!(notice.error.class, "PaymentError");
        assert_eq!(notice.error.message, "card declined for cart c-1");
        assert_eq!(
            notice.request,
            serde_json::json!({ "controller": "checkout", "cart_id": "c-1", "total_cents": 0 })
        );
    }
}
