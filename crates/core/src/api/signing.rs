//! Request signing with the public/private key pair.

use chrono::Utc;

/// Authentication parameters appended to every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthParams {
    pub api_key: String,
    pub ts: String,
    pub hash: String,
}

impl AuthParams {
    /// `apikey`, `ts` and `hash` fragments, in that order.
    pub fn fragments(&self) -> [String; 3] {
        [
            format!("apikey={}", urlencoding::encode(&self.api_key)),
            format!("ts={}", urlencoding::encode(&self.ts)),
            format!("hash={}", self.hash),
        ]
    }
}

/// Signs requests as `md5(ts + private_key + public_key)`.
#[derive(Clone)]
pub struct RequestSigner {
    public_key: String,
    private_key: String,
}

impl RequestSigner {
    pub fn new(public_key: impl Into<String>, private_key: impl Into<String>) -> Self {
        Self {
            public_key: public_key.into(),
            private_key: private_key.into(),
        }
    }

    /// Sign with the current Unix time as timestamp.
    pub fn sign_now(&self) -> AuthParams {
        self.sign_at(&Utc::now().timestamp().to_string())
    }

    /// Sign with an explicit timestamp.
    pub fn sign_at(&self, ts: &str) -> AuthParams {
        let digest = md5::compute(format!("{}{}{}", ts, self.private_key, self.public_key));
        AuthParams {
            api_key: self.public_key.clone(),
            ts: ts.to_string(),
            hash: format!("{:x}", digest),
        }
    }
}

// Keys stay out of logs.
impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_known_vector() {
        let signer = RequestSigner::new("1234", "abcd");
        let params = signer.sign_at("1");
        assert_eq!(params.hash, "ffd275c5130566a2916217b101f26150");
        assert_eq!(params.api_key, "1234");
        assert_eq!(params.ts, "1");
    }

    #[test]
    fn test_fragments_order() {
        let signer = RequestSigner::new("pub", "priv");
        let params = signer.sign_at("42");
        let [apikey, ts, hash] = params.fragments();
        assert_eq!(apikey, "apikey=pub");
        assert_eq!(ts, "ts=42");
        assert!(hash.starts_with("hash="));
        assert_eq!(hash.len(), "hash=".len() + 32);
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let signer = RequestSigner::new("pub", "very-secret");
        let debug = format!("{:?}", signer);
        assert!(!debug.contains("very-secret"));
    }
}
