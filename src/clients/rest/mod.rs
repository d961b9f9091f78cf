//! REST Admin API client.
//!
//! [`RestClient`] offers `get`, `post`, `put` and `delete` over an
//! [`HttpClient`](crate::clients::HttpClient), decoding JSON envelopes into
//! caller-chosen types. Non-2xx statuses surface as
//! [`HttpError::Response`](crate::clients::HttpError::Response); a body that
//! does not match the expected envelope surfaces as
//! [`HttpError::InvalidPayload`](crate::clients::HttpError::InvalidPayload).
//!
//! # Path Normalization
//!
//! - Leading slashes are stripped: `/themes` -> `themes.json`
//! - Trailing `.json` is stripped and re-added: `themes.json` -> `themes.json`

mod client;

pub use client::RestClient;
