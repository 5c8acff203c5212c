//! Legacy canonical-string request signing.
//!
//! Every request carries an `Authorization` header of the form
//! `"<realm> <accessKey>:<signature>"` where the signature is the
//! base64-encoded HMAC-SHA1 of the canonical string:
//!
//! ```text
//! Verb + '\n' +
//! Content-MD5 + '\n' +
//! Content-Type + '\n' +
//! Date + '\n' +
//! "/" + Bucket + Path
//! ```
//!
//! The path is signed with any query string stripped and a leading `/`
//! enforced.  Content-MD5 is always signed as the empty string: the
//! backends this scheme targets accept it, and computing one would change
//! the signature and break wire compatibility.  The `Date` value must be
//! the exact string sent in the `Date` header.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

// ── Realm capability ────────────────────────────────────────────────

/// A named signing scheme identifying which backend's authorization
/// format is in use.  The bridge depends only on this interface.
pub trait Realm: Send + Sync {
    /// Header prefix identifying the scheme, e.g. `AWS`.
    fn name(&self) -> &str;

    /// Compute the `Authorization` header value for a canonical string.
    fn auth_header(&self, access_key: &str, secret_key: &str, string_to_sign: &str) -> String {
        format!(
            "{} {}:{}",
            self.name(),
            access_key,
            sign(secret_key, string_to_sign)
        )
    }
}

/// Amazon S3 legacy signing realm.
pub struct AmazonS3Realm;

impl Realm for AmazonS3Realm {
    fn name(&self) -> &str {
        "AWS"
    }
}

/// Google Cloud Storage interoperability signing realm.
pub struct GoogleStorageRealm;

impl Realm for GoogleStorageRealm {
    fn name(&self) -> &str {
        "GOOG1"
    }
}

/// Any other backend's literal header prefix.
pub struct CustomRealm(pub String);

impl Realm for CustomRealm {
    fn name(&self) -> &str {
        &self.0
    }
}

/// Resolve a configured realm name to a [`Realm`] implementation.
///
/// `aws` and `google` select the built-in variants; any other value is
/// used verbatim as the header prefix.
pub fn realm_for(name: &str) -> Box<dyn Realm> {
    match name.to_ascii_lowercase().as_str() {
        "aws" => Box::new(AmazonS3Realm),
        "google" | "goog1" => Box::new(GoogleStorageRealm),
        _ => Box::new(CustomRealm(name.to_string())),
    }
}

// ── Canonical string construction ───────────────────────────────────

/// Build the canonical resource path: `/` + bucket + normalized path.
///
/// Any query string is stripped before signing and a leading `/` on the
/// operation path is enforced.
pub fn canonical_resource(bucket: &str, path: &str) -> String {
    let path = path.split('?').next().unwrap_or("");
    if path.starts_with('/') {
        format!("/{bucket}{path}")
    } else {
        format!("/{bucket}/{path}")
    }
}

/// Build the full string to sign for a request.
///
/// `content_md5` is always empty in this design; the parameter exists so
/// the canonical format stays visible at the call site.
pub fn string_to_sign(
    verb: &str,
    content_md5: &str,
    content_type: &str,
    date: &str,
    bucket: &str,
    path: &str,
) -> String {
    let resource = canonical_resource(bucket, path);
    format!("{verb}\n{content_md5}\n{content_type}\n{date}\n{resource}")
}

/// Compute the base64-encoded HMAC-SHA1 signature of a canonical string.
pub fn sign(secret_key: &str, string_to_sign: &str) -> String {
    BASE64.encode(hmac_sha1(secret_key.as_bytes(), string_to_sign.as_bytes()))
}

/// Compute HMAC-SHA1.
fn hmac_sha1(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha1::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_resource_enforces_leading_slash() {
        assert_eq!(
            canonical_resource("mybucket", "com.example.Foo/1"),
            "/mybucket/com.example.Foo/1"
        );
        assert_eq!(
            canonical_resource("mybucket", "/com.example.Foo/1"),
            "/mybucket/com.example.Foo/1"
        );
    }

    #[test]
    fn test_canonical_resource_strips_query() {
        assert_eq!(
            canonical_resource("mybucket", "com.example.Foo?prefix=com.example.Foo"),
            "/mybucket/com.example.Foo"
        );
    }

    #[test]
    fn test_canonical_resource_bucket_root() {
        assert_eq!(canonical_resource("mybucket", "/"), "/mybucket/");
    }

    #[test]
    fn test_string_to_sign_format() {
        let sts = string_to_sign(
            "PUT",
            "",
            "application/json",
            "Tue, 27 Aug 2026 12:00:00 GMT",
            "mybucket",
            "com.example.Foo/1",
        );
        assert_eq!(
            sts,
            "PUT\n\napplication/json\nTue, 27 Aug 2026 12:00:00 GMT\n/mybucket/com.example.Foo/1"
        );
    }

    #[test]
    fn test_signing_is_deterministic() {
        let sts = "GET\n\n\nTue, 27 Aug 2026 12:00:00 GMT\n/mybucket/Foo/1";
        assert_eq!(sign("secret", sts), sign("secret", sts));
    }

    #[test]
    fn test_signing_depends_on_secret_and_input() {
        let sts = "GET\n\n\nTue, 27 Aug 2026 12:00:00 GMT\n/mybucket/Foo/1";
        assert_ne!(sign("secret-a", sts), sign("secret-b", sts));
        assert_ne!(
            sign("secret", sts),
            sign("secret", "PUT\n\n\nTue, 27 Aug 2026 12:00:00 GMT\n/mybucket/Foo/1")
        );
    }

    #[test]
    fn test_signature_is_base64_of_sha1_digest() {
        // HMAC-SHA1 produces 20 bytes, which base64-encodes to 28 chars.
        let sig = sign("secret", "anything");
        assert_eq!(sig.len(), 28);
        assert!(sig.ends_with('='));
    }

    #[test]
    fn test_realm_header_format() {
        let header = AmazonS3Realm.auth_header("AKID", "secret", "GET\n\n\ndate\n/b/k");
        assert!(header.starts_with("AWS AKID:"));
        let sig = header.strip_prefix("AWS AKID:").unwrap();
        assert_eq!(sig, sign("secret", "GET\n\n\ndate\n/b/k"));
    }

    #[test]
    fn test_realm_for_variants() {
        assert_eq!(realm_for("aws").name(), "AWS");
        assert_eq!(realm_for("AWS").name(), "AWS");
        assert_eq!(realm_for("google").name(), "GOOG1");
        assert_eq!(realm_for("goog1").name(), "GOOG1");
        assert_eq!(realm_for("ACME1").name(), "ACME1");
    }
}
