use std::fmt::Write;

use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

/// How long a password reset secret stays valid.
pub const RESET_TOKEN_TTL: Duration = Duration::minutes(15);

/// A freshly generated reset secret. Only `secret_hash` and `expires_at`
/// are ever persisted; the secret itself goes to the user by email and
/// must not be logged.
pub struct ResetToken {
    pub secret: String,
    pub secret_hash: String,
    pub expires_at: OffsetDateTime,
}

pub fn generate() -> ResetToken {
    let mut buf = [0u8; 20];
    OsRng.fill_bytes(&mut buf);
    let secret = hex_encode(&buf);
    let secret_hash = hash_secret(&secret);
    ResetToken {
        secret,
        secret_hash,
        expires_at: OffsetDateTime::now_utc() + RESET_TOKEN_TTL,
    }
}

/// SHA-256 of the secret, hex-encoded. A fast hash is enough here: the
/// secret carries 160 bits of entropy, unlike a user-chosen password.
pub fn hash_secret(secret: &str) -> String {
    hex_encode(&Sha256::digest(secret.as_bytes()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().fold(
        String::with_capacity(bytes.len() * 2),
        |mut out, b| {
            let _ = write!(out, "{:02x}", b);
            out
        },
    )
}
