use once_cell::sync::Lazy;
use regex::Regex;

static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s-]").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static HYPHENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"-+").unwrap());

/// URL slug for a group name: lowercase, punctuation stripped, whitespace runs
/// become single hyphens. Returns an empty string when nothing usable is left.
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let stripped = DISALLOWED.replace_all(&lowered, "");
    let hyphenated = WHITESPACE.replace_all(stripped.trim(), "-");
    let collapsed = HYPHENS.replace_all(&hyphenated, "-");
    collapsed.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Outdoor Fun!!"), "outdoor-fun");
        assert_eq!(slugify("Tiny Explorers"), "tiny-explorers");
        assert_eq!(slugify("  Bedtime   &  Calm -- Time "), "bedtime-calm-time");
        assert_eq!(slugify("Ages 3-4"), "ages-3-4");
    }

    #[test]
    fn test_slugify_drops_non_ascii() {
        assert_eq!(slugify("Café Kids 👶"), "caf-kids");
        assert_eq!(slugify("!!!"), "");
    }
}
