//! Basic-auth check for inbound Payme calls.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

/// Merchant credentials Payme presents as `Authorization: Basic …`.
pub struct PaymeCredentials {
    login: String,
    key: SecretString,
}

impl PaymeCredentials {
    pub fn new(login: impl Into<String>, key: SecretString) -> Self {
        Self {
            login: login.into(),
            key,
        }
    }

    /// Returns true when the header carries this merchant's login and key.
    pub fn authorize(&self, authorization: Option<&str>) -> bool {
        let Some(encoded) = authorization.and_then(|h| h.trim().strip_prefix("Basic ")) else {
            return false;
        };
        let Ok(decoded) = BASE64.decode(encoded.trim()) else {
            return false;
        };
        let Ok(decoded) = String::from_utf8(decoded) else {
            return false;
        };
        let Some((login, key)) = decoded.split_once(':') else {
            return false;
        };

        let expected = self.key.expose_secret().as_bytes();
        let key_matches =
            key.len() == expected.len() && bool::from(key.as_bytes().ct_eq(expected));
        login == self.login && key_matches
    }

    /// Builds the header value Payme would send.
    pub fn header_value(&self) -> String {
        let raw = format!("{}:{}", self.login, self.key.expose_secret());
        format!("Basic {}", BASE64.encode(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> PaymeCredentials {
        PaymeCredentials::new("Paycom", SecretString::new("s3cr3t-key".to_string()))
    }

    fn basic(raw: &str) -> String {
        format!("Basic {}", BASE64.encode(raw))
    }

    #[test]
    fn accepts_matching_credentials() {
        let creds = credentials();
        assert!(creds.authorize(Some(&basic("Paycom:s3cr3t-key"))));
        assert!(creds.authorize(Some(&creds.header_value())));
    }

    #[test]
    fn rejects_wrong_key_or_login() {
        let creds = credentials();
        assert!(!creds.authorize(Some(&basic("Paycom:guess"))));
        assert!(!creds.authorize(Some(&basic("Admin:s3cr3t-key"))));
    }

    #[test]
    fn rejects_missing_or_malformed_header() {
        let creds = credentials();
        assert!(!creds.authorize(None));
        assert!(!creds.authorize(Some("Bearer abc")));
        assert!(!creds.authorize(Some("Basic !!!not-base64")));
        assert!(!creds.authorize(Some(&basic("no-colon-here"))));
    }
}
