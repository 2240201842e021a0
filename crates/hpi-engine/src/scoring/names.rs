/// Lower-cases and collapses whitespace so identifiers from different front-ends compare equal.
pub(crate) fn normalize_name(value: &str) -> String {
    let cleaned = value.replace(['\u{feff}', '\u{200b}', '\u{fe0f}'], "");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.to_lowercase()
}

/// Metric names additionally join words with underscores (`Sleep quality` -> `sleep_quality`).
pub(crate) fn metric_key(value: &str) -> String {
    normalize_name(value).replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_name_removes_invisible_characters_and_case() {
        let source = "\u{feff}Physical   Health\u{200b} ";
        assert_eq!(normalize_name(source), "physical health");
    }

    #[test]
    fn normalize_name_drops_emoji_variation_selector() {
        assert_eq!(normalize_name("\u{2642}\u{fe0f}"), normalize_name("\u{2642}"));
    }

    #[test]
    fn metric_key_joins_words_with_underscores() {
        assert_eq!(metric_key("  Workouts per   Week "), "workouts_per_week");
        assert_eq!(metric_key("качество сна"), "качество_сна");
    }
}
