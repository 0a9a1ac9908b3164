use sha2::{Digest, Sha256};

/// Length of the short display form.
const SHORT_LEN: usize = 16;

/// Derive the stable pseudonym for an external chat user id: a salted
/// SHA-256, hex encoded. One-way — the raw id is never recoverable and
/// never stored alongside a question.
pub fn generate_pseudonym(chat_user_id: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(chat_user_id.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize())
}

/// Short pseudonym for display (first 16 hex chars of the full form).
pub fn generate_short_pseudonym(chat_user_id: &str, salt: &str) -> String {
    let mut full = generate_pseudonym(chat_user_id, salt);
    full.truncate(SHORT_LEN);
    full
}

/// Short display form of an already-derived pseudonym.
pub fn shorten_pseudonym(pseudonym: &str) -> &str {
    &pseudonym[..pseudonym.len().min(SHORT_LEN)]
}

/// Check that a string looks like a pseudonym: 16 or 64 lowercase hex chars.
pub fn validate_pseudonym(pseudonym: &str) -> bool {
    (pseudonym.len() == SHORT_LEN || pseudonym.len() == 64)
        && pseudonym.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Mask a raw chat user id for log output: first 4 chars plus `***`.
pub fn mask_chat_user_id(chat_user_id: &str) -> String {
    if chat_user_id.len() <= 4 {
        chat_user_id.to_string()
    } else {
        format!("{}***", &chat_user_id[..4])
    }
}
