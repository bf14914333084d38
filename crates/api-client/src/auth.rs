use hmac::{Hmac, Mac};
use sha2::Sha256;

// Create a type alias for the HMAC-SHA256 implementation.
type HmacSha256 = Hmac<Sha256>;

/// Builds the string the broker expects to be signed: timestamp, method,
/// path (with query) and body, concatenated without separators.
pub fn signing_payload(timestamp: i64, method: &str, path: &str, body: &str) -> String {
    format!("{timestamp}{method}{path}{body}")
}

/// Creates a hex-encoded HMAC-SHA256 signature of `payload` with the API secret.
pub fn sign_request(secret: &str, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_matches_reference_vector() {
        // RFC 4231 test case 2.
        let sig = sign_request("Jefe", "what do ya want for nothing?");
        assert_eq!(
            sig,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn payload_concatenates_in_order() {
        let payload = signing_payload(1_700_000_000_000, "POST", "/api/v1/orders", "{}");
        assert_eq!(payload, "1700000000000POST/api/v1/orders{}");
    }
}
