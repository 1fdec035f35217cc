//! Pulls the JSON array out of a response body that may carry text around it
//! (tunnel banners, stray chunk markers and the like).
//!
//! This is a substring heuristic, not a tokenizer: it takes the first `[{` and
//! the last `}]` in the body. It assumes at most one top-level array of objects
//! and no literal `[{` / `}]` inside string values elsewhere in the body.
//! Callers only see [`extract_array`], so a streaming parser can replace it
//! without touching them.

const ARRAY_OPEN: &str = "[{";
const ARRAY_CLOSE: &str = "}]";

/// Returns the `[{ ... }]` slice of `raw`, or `None` when no array of objects
/// is present.
pub fn extract_array(raw: &str) -> Option<&str> {
    let start = raw.find(ARRAY_OPEN)?;
    let end = raw.rfind(ARRAY_CLOSE)? + ARRAY_CLOSE.len();

    if end <= start {
        return None;
    }

    Some(&raw[start..end])
}
