//! Printable reservation slip served at the link handed out after a reservation.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use tera::{Context, Tera};
use tracing::{error, info, warn};
use watchfinder_core::selection::RESERVATION_PATH;

const SLIP_TEMPLATE: &str = "reservation.html";

#[derive(Clone)]
pub struct SlipState {
    templates: Arc<Tera>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlipQuery {
    pub product_name: Option<String>,
    pub product_image: Option<String>,
    pub phone_number: Option<String>,
}

pub fn load_templates() -> Result<Tera, tera::Error> {
    let mut tera = Tera::default();
    tera.add_raw_template(SLIP_TEMPLATE, include_str!("../../../templates/reservation.html"))?;
    Ok(tera)
}

pub fn router(templates: Arc<Tera>) -> Router {
    Router::new().route(RESERVATION_PATH, get(reservation_slip)).with_state(SlipState { templates })
}

fn required(value: Option<String>) -> Option<String> {
    value.map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

pub async fn reservation_slip(
    State(state): State<SlipState>,
    Query(query): Query<SlipQuery>,
) -> Response {
    let (Some(product_name), Some(phone_number)) =
        (required(query.product_name), required(query.phone_number))
    else {
        warn!(
            event_name = "reservation.slip_rejected",
            correlation_id = "reservation-slip",
            "reservation slip requested without product name or phone number"
        );
        return (StatusCode::BAD_REQUEST, "productName and phoneNumber are required")
            .into_response();
    };

    let mut context = Context::new();
    context.insert("product_name", &product_name);
    context.insert("product_image", &required(query.product_image).unwrap_or_default());
    context.insert("phone_number", &phone_number);
    context.insert("issued_at", &Utc::now().format("%Y-%m-%d %H:%M UTC").to_string());

    match state.templates.render(SLIP_TEMPLATE, &context) {
        Ok(html) => {
            info!(
                event_name = "reservation.slip_rendered",
                correlation_id = "reservation-slip",
                product_name = %product_name,
                "reservation slip rendered"
            );
            Html(html).into_response()
        }
        Err(err) => {
            error!(
                event_name = "reservation.slip_render_failed",
                correlation_id = "reservation-slip",
                error = %err,
                "reservation slip template failed to render"
            );
            (StatusCode::INTERNAL_SERVER_ERROR, "reservation slip unavailable").into_response()
        }
    }
}
