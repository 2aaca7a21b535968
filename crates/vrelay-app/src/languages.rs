//! Human-readable names for the `${sourceName}`/`${targetName}` system
//! prompt placeholders. Falls back to the raw code for anything not in the
//! table rather than erroring — an unfamiliar code should still degrade
//! gracefully into a readable prompt.

pub fn language_name(code: &str) -> String {
    match code.to_ascii_lowercase().as_str() {
        "en" => "English",
        "ja" => "Japanese",
        "ko" => "Korean",
        "zh" => "Chinese",
        "de" => "German",
        "fr" => "French",
        "es" => "Spanish",
        "pt" => "Portuguese",
        "it" => "Italian",
        "ru" => "Russian",
        "nl" => "Dutch",
        "sv" => "Swedish",
        "pl" => "Polish",
        "vi" => "Vietnamese",
        "th" => "Thai",
        "id" => "Indonesian",
        other => return other.to_string(),
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_code_resolves_to_name() {
        assert_eq!(language_name("en"), "English");
        assert_eq!(language_name("JA"), "Japanese");
    }

    #[test]
    fn unknown_code_falls_back_to_itself() {
        assert_eq!(language_name("xx"), "xx");
    }
}
