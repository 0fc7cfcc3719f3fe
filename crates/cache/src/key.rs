use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Deterministic cache key for a (provider, voice, text) triple
///
/// The text is reduced to a 64-bit fingerprint; provider and voice stay
/// readable so keys are easy to trace in logs.
pub fn cache_key(provider: &str, voice: &str, text: &str) -> String {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    format!("{}:{}:{:016x}", provider, voice, hasher.finish())
}
