//! Request signing helpers shared by the exchange protocols

use crate::{ArbitrageError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256, Sha512};

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| ArbitrageError::Config(format!("Invalid signing key: {}", e)))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Lower-case hex HMAC-SHA256 (binance, bybit)
pub fn hmac_sha256_hex(secret: &str, message: &str) -> Result<String> {
    Ok(hex::encode(hmac_sha256(secret.as_bytes(), message.as_bytes())?))
}

/// Base64 HMAC-SHA256 (kucoin)
pub fn hmac_sha256_base64(secret: &str, message: &str) -> Result<String> {
    Ok(STANDARD.encode(hmac_sha256(secret.as_bytes(), message.as_bytes())?))
}

/// Kraken `API-Sign`: base64(HMAC-SHA512(base64-decoded secret, path || SHA256(nonce || body)))
pub fn kraken_signature(secret_b64: &str, path: &str, nonce: &str, body: &str) -> Result<String> {
    let secret = STANDARD
        .decode(secret_b64)
        .map_err(|e| ArbitrageError::Config(format!("Kraken secret is not valid base64: {}", e)))?;

    let mut hasher = Sha256::new();
    hasher.update(nonce.as_bytes());
    hasher.update(body.as_bytes());
    let digest = hasher.finalize();

    let mut message = path.as_bytes().to_vec();
    message.extend_from_slice(&digest);

    let mut mac = HmacSha512::new_from_slice(&secret)
        .map_err(|e| ArbitrageError::Config(format!("Invalid signing key: {}", e)))?;
    mac.update(&message);

    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}
