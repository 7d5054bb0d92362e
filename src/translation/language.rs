/// Prefix the backend sees in front of the previous segments' text.
const CONTEXT_PREFIX: &str = "Previous context: ";

/// `"zh"` when the text contains Han characters, `"en"` otherwise.
pub fn detect_language(text: &str) -> &'static str {
    if text.chars().any(is_han) {
        "zh"
    } else {
        "en"
    }
}

fn is_han(c: char) -> bool {
    matches!(
        c,
        '\u{4E00}'..='\u{9FFF}'
            | '\u{3400}'..='\u{4DBF}'
            | '\u{F900}'..='\u{FAFF}'
            | '\u{20000}'..='\u{2A6DF}'
    )
}

/// Chinese is translated to English and everything else to Chinese.
pub fn target_language_for(source_language: &str) -> &'static str {
    if source_language == "zh" {
        "en"
    } else {
        "zh"
    }
}

pub fn language_display_name(code: &str) -> &'static str {
    match code {
        "zh" => "Chinese",
        "en" => "English",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "ja" => "Japanese",
        _ => "Unknown",
    }
}

/// Join the texts of the previous segments into one context string.
pub fn build_context(previous_texts: &[String]) -> String {
    if previous_texts.is_empty() {
        return String::new();
    }
    format!("{CONTEXT_PREFIX}{}", previous_texts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_han_text() {
        assert_eq!(detect_language("今天天气很好"), "zh");
        assert_eq!(detect_language("mixed 中文 text"), "zh");
        assert_eq!(detect_language("plain English"), "en");
        assert_eq!(detect_language("Bonjour à tous"), "en");
    }

    #[test]
    fn target_flips_between_chinese_and_english() {
        assert_eq!(target_language_for("zh"), "en");
        assert_eq!(target_language_for("en"), "zh");
    }

    #[test]
    fn context_joins_previous_segments() {
        assert_eq!(build_context(&[]), "");
        let previous = vec!["One.".to_string(), "Two.".to_string()];
        assert_eq!(build_context(&previous), "Previous context: One. Two.");
    }
}
