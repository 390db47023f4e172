//! HTTP client for the record store
//!
//! The store authenticates every request with the project's API key, sent
//! both as `apikey` and as a bearer token. Both go into the client's default
//! headers. Proxy environment variables are honored by reqwest itself.

use crate::store::StoreError;
use reqwest::header::{HeaderMap, HeaderValue, InvalidHeaderValue, AUTHORIZATION};
use reqwest::Client;
use std::time::Duration;

const USER_AGENT: &str = concat!("school-finder/", env!("CARGO_PKG_VERSION"));

/// Build the store client with the given timeout and optional API key
pub fn store_client(timeout: Duration, api_key: Option<&str>) -> Result<Client, StoreError> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .default_headers(auth_headers(api_key)?)
        .build()?;
    Ok(client)
}

/// `apikey` and `Authorization: Bearer` headers; empty when there is no key
fn auth_headers(api_key: Option<&str>) -> Result<HeaderMap, InvalidHeaderValue> {
    let mut headers = HeaderMap::new();
    let Some(key) = api_key.map(str::trim).filter(|k| !k.is_empty()) else {
        return Ok(headers);
    };

    let mut apikey = HeaderValue::from_str(key)?;
    apikey.set_sensitive(true);
    let mut bearer = HeaderValue::from_str(&format!("Bearer {}", key))?;
    bearer.set_sensitive(true);

    headers.insert("apikey", apikey);
    headers.insert(AUTHORIZATION, bearer);
    Ok(headers)
}
