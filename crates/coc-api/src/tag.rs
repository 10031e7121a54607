//! Player and clan tag normalization
//!
//! Tags are written by humans in many shapes ("2pp", "#2PP", " #2pO "). The
//! API only ever issues tags drawn from a fixed alphabet, so normalization is
//! uppercase, `O` → `0`, single leading `#`.

/// Characters the API uses in tags.
const TAG_ALPHABET: &str = "0289PYLQGRJCUV";

/// Shortest tag body the API issues.
const MIN_TAG_LEN: usize = 3;

/// Normalize a raw tag, returning `None` when it cannot be a valid tag.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let upper = raw.trim().to_uppercase().replace('O', "0");
    let body = upper.trim_start_matches('#');
    if body.len() < MIN_TAG_LEN || !body.chars().all(|c| TAG_ALPHABET.contains(c)) {
        return None;
    }
    Some(format!("#{body}"))
}

/// Percent-encode the leading `#` so the tag survives as a path segment.
pub fn encode_tag(tag: &str) -> String {
    tag.replace('#', "%23")
}
