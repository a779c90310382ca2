//! Reading, signing and writing the two cookies the app relies on.
//!
//! Both the session and the flash cookie are HMAC-SHA-384 signed JWTs, so their payloads can't
//! be tampered with and their values never need escaping in a `Set-Cookie` header.

use anyhow::Context;
use axum::http::header::COOKIE;
use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use jwt::{SignWithKey, VerifyWithKey};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::Sha384;

fn signing_key(hmac_key: &str) -> anyhow::Result<Hmac<Sha384>> {
    Hmac::<Sha384>::new_from_slice(hmac_key.as_bytes())
        .map_err(|e| anyhow::anyhow!("invalid HMAC key: {}", e))
}

pub(crate) fn sign<T: Serialize>(claims: T, hmac_key: &str) -> anyhow::Result<String> {
    let key = signing_key(hmac_key)?;
    claims
        .sign_with_key(&key)
        .map_err(|e| anyhow::anyhow!("{:?}", e))
        .context("failed to sign cookie")
}

/// A bad signature or an undecodable payload is treated the same as no cookie at all.
pub(crate) fn verify<T: DeserializeOwned>(token: &str, hmac_key: &str) -> Option<T> {
    let key = signing_key(hmac_key).ok()?;
    token.verify_with_key(&key).ok()
}

/// Find the value of cookie `name` across every `Cookie` header of the request.
pub(crate) fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_string())
}

pub(crate) fn set_cookie(name: &str, value: &str) -> String {
    format!("{}={}; HttpOnly; Path=/; SameSite=Lax", name, value)
}

pub(crate) fn expire_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; Path=/; Max-Age=0; SameSite=Lax", name)
}
