// Request fingerprinting for response-cache keys
// Author: kelexine (https://github.com/kelexine)

use crate::models::request::{GeminiModel, RequestConfig};

/// Characters sampled from each end of an image payload for its digest.
const IMAGE_SAMPLE_LEN: usize = 64;

/// Produce a short, stable cache key for a (prompt, images, config) tuple.
///
/// Only output-relevant config fields participate (aspect ratio, size tier,
/// temperature); session id, retry ceiling, and cancellation state never do,
/// so identical creative inputs share a key across sessions.
///
/// Collisions are an accepted best-effort risk: the hash is a fast
/// non-cryptographic rolling hash, and a collision only risks serving a
/// stale cached result, never corrupting state.
pub fn fingerprint(
    prompt: &str,
    images: &[String],
    model: GeminiModel,
    config: &RequestConfig,
) -> String {
    let mut key = String::with_capacity(prompt.len() + 64 + images.len() * 160);
    key.push_str(model.as_str());
    key.push('|');
    key.push_str(prompt);

    // Order-preserving: reordering images must change the key.
    for image in images {
        key.push('|');
        key.push_str(&image_digest(image));
    }

    // Canonical field order keeps the key independent of caller habits.
    key.push('|');
    key.push_str(&format!(
        "ar={};size={};temp={}",
        config
            .aspect_ratio
            .map(|a| a.as_str())
            .unwrap_or("none"),
        config.image_size.map(|s| s.as_str()).unwrap_or("none"),
        config
            .temperature
            .map(|t| t.to_string())
            .unwrap_or_else(|| "none".to_string()),
    ));

    format!("gen_{:x}", djb2(&key))
}

/// Lightweight per-image digest: both ends of the payload plus its length.
/// Avoids hashing multi-megabyte base64 bodies character by character.
fn image_digest(payload: &str) -> String {
    let len = payload.len();
    let head = payload.get(..IMAGE_SAMPLE_LEN.min(len)).unwrap_or(payload);
    let tail = payload
        .get(len.saturating_sub(IMAGE_SAMPLE_LEN)..)
        .unwrap_or(payload);
    format!("{}:{}:{}", head, tail, len)
}

/// djb2-style rolling hash over the concatenated key material.
fn djb2(input: &str) -> u64 {
    let mut hash: u64 = 5381;
    for byte in input.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(u64::from(byte));
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::request::AspectRatio;

    fn config() -> RequestConfig {
        RequestConfig::default()
    }

    #[test]
    fn test_deterministic() {
        let images = vec!["data:image/png;base64,AAAA".to_string()];
        let a = fingerprint("a castle", &images, GeminiModel::Flash25Image, &config());
        let b = fingerprint("a castle", &images, GeminiModel::Flash25Image, &config());
        assert_eq!(a, b);
        assert!(a.starts_with("gen_"));
    }

    #[test]
    fn test_prompt_changes_key() {
        let a = fingerprint("a castle", &[], GeminiModel::Flash25Image, &config());
        let b = fingerprint("a palace", &[], GeminiModel::Flash25Image, &config());
        assert_ne!(a, b);
    }

    #[test]
    fn test_image_order_changes_key() {
        let ab = vec!["aaaa".to_string(), "bbbb".to_string()];
        let ba = vec!["bbbb".to_string(), "aaaa".to_string()];
        let a = fingerprint("x", &ab, GeminiModel::Flash25Image, &config());
        let b = fingerprint("x", &ba, GeminiModel::Flash25Image, &config());
        assert_ne!(a, b);
    }

    #[test]
    fn test_relevant_config_changes_key() {
        let plain = config();
        let wide = RequestConfig {
            aspect_ratio: Some(AspectRatio::Widescreen),
            ..config()
        };
        let a = fingerprint("x", &[], GeminiModel::Flash25Image, &plain);
        let b = fingerprint("x", &[], GeminiModel::Flash25Image, &wide);
        assert_ne!(a, b);
    }

    #[test]
    fn test_session_and_retries_are_irrelevant() {
        let base = config();
        let other = RequestConfig {
            session_id: "another-session".to_string(),
            max_retries: Some(9),
            ..config()
        };
        let a = fingerprint("x", &[], GeminiModel::Flash25Image, &base);
        let b = fingerprint("x", &[], GeminiModel::Flash25Image, &other);
        assert_eq!(a, b);
    }
}
