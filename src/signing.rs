//! Legacy HMAC-SHA1 request signing for the object-storage origin.
//!
//! Storage GETs are authenticated with the old AWS signature scheme:
//! an HMAC-SHA1 over a canonical string, base64-encoded, carried as
//! `Authorization: AWS <access-key>:<signature>` together with an
//! `x-amz-date` header.  Only unauthenticated-header GETs are signed,
//! so the Content-MD5, Content-Type and resource-query positions of the
//! canonical string stay empty.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Date format carried in the `x-amz-date` header.
const AMZ_DATE_FORMAT: &str = "%a, %d-%b-%Y %H:%M:%S GMT";

/// Format the current UTC time for the `x-amz-date` header.
pub fn amz_date_now() -> String {
    Utc::now().format(AMZ_DATE_FORMAT).to_string()
}

/// Build the canonical string to sign for a storage request.
///
/// Layout (blank lines are the never-populated Content-MD5 and
/// Content-Type fields):
///
/// ```text
/// METHOD\n\n\n\nx-amz-date:DATE\n/BUCKET/KEY
/// ```
fn string_to_sign(bucket: &str, object_key: &str, method: &str, amz_date: &str) -> String {
    let path = format!("/{}/{}", bucket, object_key.trim_start_matches('/'));
    format!("{method}\n\n\n\nx-amz-date:{amz_date}\n{path}")
}

/// Compute the signature authorizing a storage request.
///
/// Pure and deterministic: the same (bucket, key, method, date) inputs
/// always yield the same signature.  Caller guarantees non-empty bucket
/// and key.
pub fn sign(
    secret_key: &str,
    bucket: &str,
    object_key: &str,
    method: &str,
    amz_date: &str,
) -> String {
    let to_sign = string_to_sign(bucket, object_key, method, amz_date);

    let mut mac =
        HmacSha1::new_from_slice(secret_key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(to_sign.as_bytes());

    BASE64.encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY";
    const DATE: &str = "Tue, 27-Jan-2026 10:00:00 GMT";

    #[test]
    fn canonical_string_layout() {
        let s = string_to_sign("assets", "proj/index.html", "GET", DATE);
        assert_eq!(
            s,
            format!("GET\n\n\n\nx-amz-date:{DATE}\n/assets/proj/index.html")
        );
    }

    #[test]
    fn leading_slash_in_key_is_not_doubled() {
        let s = string_to_sign("assets", "/proj/index.html", "GET", DATE);
        assert!(s.ends_with("\n/assets/proj/index.html"));
    }

    #[test]
    fn signing_is_deterministic() {
        let a = sign(SECRET, "assets", "proj/img.png", "GET", DATE);
        let b = sign(SECRET, "assets", "proj/img.png", "GET", DATE);
        assert_eq!(a, b);
    }

    #[test]
    fn signature_is_base64() {
        let sig = sign(SECRET, "assets", "proj/img.png", "GET", DATE);
        // HMAC-SHA1 output is 20 bytes -> 28 base64 chars with padding.
        assert_eq!(sig.len(), 28);
        assert!(BASE64.decode(&sig).is_ok());
    }

    #[test]
    fn every_input_perturbs_the_signature() {
        let base = sign(SECRET, "assets", "proj/img.png", "GET", DATE);
        assert_ne!(base, sign("other-secret", "assets", "proj/img.png", "GET", DATE));
        assert_ne!(base, sign(SECRET, "other-bucket", "proj/img.png", "GET", DATE));
        assert_ne!(base, sign(SECRET, "assets", "proj/other.png", "GET", DATE));
        assert_ne!(base, sign(SECRET, "assets", "proj/img.png", "HEAD", DATE));
        assert_ne!(
            base,
            sign(SECRET, "assets", "proj/img.png", "GET", "Tue, 27-Jan-2026 10:00:01 GMT")
        );
    }

    #[test]
    fn amz_date_has_expected_shape() {
        let date = amz_date_now();
        // e.g. "Tue, 27-Jan-2026 10:00:00 GMT"
        assert!(date.ends_with(" GMT"));
        assert_eq!(date.as_bytes()[3], b',');
        assert_eq!(date.matches(':').count(), 2);
    }
}
