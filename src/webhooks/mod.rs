//! Inbound webhook verification.
//!
//! - [`WebhookRequest`]: raw body plus headers of a delivery
//! - [`verify_webhook`]: validates the shop and the body signature
//! - [`WebhookContext`]: the verified shop and delivery metadata
//!
//! All comparisons are constant-time; key rotation is supported through
//! the old secret of the resolved [`ApiCredentials`](crate::ApiCredentials).

mod verification;

pub use verification::{
    verify_webhook, WebhookContext, WebhookRequest, HEADER_API_VERSION, HEADER_HMAC,
    HEADER_SHOP_DOMAIN, HEADER_TOPIC, HEADER_WEBHOOK_ID,
};
