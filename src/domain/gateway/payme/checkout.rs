//! Payme hosted checkout links.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use crate::domain::foundation::OrderId;

/// Builds `<base>/<base64("m=…;ac.order_id=…;a=…[;c=…]")>`.
///
/// `amount_tiyin` is already in tiyin.
pub fn checkout_url(
    base: &str,
    merchant_id: &str,
    order_id: &OrderId,
    amount_tiyin: i64,
    return_url: Option<&str>,
) -> String {
    let mut params = format!("m={};ac.order_id={};a={}", merchant_id, order_id, amount_tiyin);
    if let Some(url) = return_url.filter(|u| !u.is_empty()) {
        params.push_str(";c=");
        params.push_str(url);
    }
    format!("{}/{}", base.trim_end_matches('/'), BASE64.encode(params))
}
