//! Registry credential encoding for the engine's `X-Registry-Auth` header

use crate::config::RegistryCredential;
use crate::error::Result;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE;

/// Serialize a credential to JSON and encode it with the URL-safe base64
/// alphabet, padding included.
pub fn encode_credential(credential: &RegistryCredential) -> Result<String> {
    let json = serde_json::to_vec(credential)?;
    Ok(URL_SAFE.encode(json))
}

/// Inverse of [`encode_credential`]
pub fn decode_credential(token: &str) -> Result<RegistryCredential> {
    let json = URL_SAFE.decode(token)?;
    Ok(serde_json::from_slice(&json)?)
}
