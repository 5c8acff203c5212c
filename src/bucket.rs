//! Idempotent bucket lifecycle.

use reqwest::Method;
use tracing::debug;

use crate::client::WireClient;
use crate::config::StoreConfig;
use crate::errors::{StatusClass, StoreError};

/// Ensure the configured bucket exists.
///
/// Issues a PUT at the bucket root with a zero-length body.  HTTP 409
/// (bucket already owned by the caller) counts as success: creation is
/// commutative with prior ownership, so calling this any number of times
/// has the same effect as calling it once.
pub fn ensure_bucket(config: &StoreConfig) -> Result<(), StoreError> {
    debug!(bucket = %config.bucket, "ensuring bucket exists");
    let response = WireClient::new(config).execute(Method::PUT, "/", None, false)?;
    match response.class() {
        StatusClass::Success => Ok(()),
        StatusClass::Redirect => Err(response.redirect_error()),
        _ if response.status == 409 => Ok(()),
        _ => Err(response.request_error()),
    }
}
