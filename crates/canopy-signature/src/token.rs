//! Token encoding
//!
//! A token is `hex(HMAC-SHA256(salt, kind ‖ RS ‖ canonical))` followed by the
//! canonical string itself, base64url-encoded without padding. Embedding the
//! data lets [`validate`] detect tampering with the token on its own, before
//! any comparison against the current request.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use canopy_core::ActionKind;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::SignatureError;

type HmacSha256 = Hmac<Sha256>;

/// Hex length of the embedded MAC.
pub const MAC_HEX_LEN: usize = 64;

const KIND_SEPARATOR: u8 = 0x1e;

fn mac_for(
    salt: &[u8],
    kind: ActionKind,
    canonical: &[u8],
) -> Result<HmacSha256, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(salt).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(kind.as_str().as_bytes());
    mac.update(&[KIND_SEPARATOR]);
    mac.update(canonical);
    Ok(mac)
}

/// Produce the token for `canonical` under `kind`.
pub fn hash_data(salt: &[u8], kind: ActionKind, canonical: &str) -> Result<String, SignatureError> {
    let tag = mac_for(salt, kind, canonical.as_bytes())?.finalize().into_bytes();
    let mut token = hex::encode(tag);
    token.push_str(&URL_SAFE_NO_PAD.encode(canonical.as_bytes()));
    Ok(token)
}

/// Check a token's embedded MAC and return the canonical string it carries.
pub fn validate(salt: &[u8], kind: ActionKind, token: &str) -> Result<String, SignatureError> {
    if token.len() < MAC_HEX_LEN || !token.is_char_boundary(MAC_HEX_LEN) {
        return Err(SignatureError::Malformed);
    }
    let (tag_hex, data) = token.split_at(MAC_HEX_LEN);
    let tag = hex::decode(tag_hex).map_err(|_| SignatureError::Malformed)?;
    let raw = URL_SAFE_NO_PAD
        .decode(data.as_bytes())
        .map_err(|_| SignatureError::Malformed)?;

    mac_for(salt, kind, &raw)?
        .verify_slice(&tag)
        .map_err(|_| SignatureError::Tampered)?;

    String::from_utf8(raw).map_err(|_| SignatureError::Malformed)
}
