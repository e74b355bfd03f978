use once_cell::sync::Lazy;
use regex::Regex;

/// Closed reasoning regions, matched lazily so adjacent regions stay separate.
static CLOSED_REGION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<think>.*?</think>|<thinking>.*?</thinking>|<reasoning>.*?</reasoning>")
        .unwrap()
});

/// An opening marker whose close has not streamed in yet.
static OPEN_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<(think|thinking|reasoning)>").unwrap());

/// Removes `<think>`, `<thinking>` and `<reasoning>` regions from a reply.
///
/// A region still open at the end of the text is dropped up to the end, so a
/// half-streamed reasoning section never reaches the parsers.
pub fn strip_reasoning(text: &str) -> String {
    let stripped = CLOSED_REGION.replace_all(text, "");
    match OPEN_MARKER.find(&stripped) {
        Some(open) => stripped[..open.start()].to_string(),
        None => stripped.into_owned(),
    }
}
