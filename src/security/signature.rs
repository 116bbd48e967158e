//! HMAC-SHA256 body signatures (`X-Hub-Signature-256`).

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

pub(crate) type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// HMAC-SHA256 keyed with `secret`.
///
/// Key setup cannot fail: HMAC pads or hashes keys of any length.
pub(crate) fn keyed_mac(secret: &[u8]) -> HmacSha256 {
    <HmacSha256 as KeyInit>::new_from_slice(secret).expect("HMAC accepts any key length")
}

/// Compute the header value a sender would attach to `body`.
pub fn sign_body(secret: &[u8], body: &[u8]) -> String {
    let mut mac = keyed_mac(secret);
    mac.update(body);
    format!("{}{}", SIGNATURE_PREFIX, hex::encode(mac.finalize().into_bytes()))
}

/// Check raw signature header bytes against `body` in constant time.
pub fn verify_body(secret: &[u8], header: impl AsRef<[u8]>, body: &[u8]) -> bool {
    let expected = sign_body(secret, body);
    expected.as_bytes().ct_eq(header.as_ref()).into()
}
