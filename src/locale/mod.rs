//! Localization
//!
//! Translation tables are embedded JSON objects mapping `t_*` keys to strings with
//! positional `{0}`, `{1}`, ... placeholders. Lookups fall back to English, then to
//! the key itself, so a partially translated language never shows an empty label.

use crate::error::Result;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Supported languages, in menu order
pub const LANGUAGES: [&str; 3] = ["English", "Tiếng Việt", "简体中文"];

/// Language used when the configured one is unknown
pub const DEFAULT_LANGUAGE: &str = LANGUAGES[0];

const TABLE_SOURCES: [&str; 3] = [
    include_str!("lang/en.json"),
    include_str!("lang/vi.json"),
    include_str!("lang/zh.json"),
];

/// Whether `name` is one of [`LANGUAGES`]
pub fn is_supported(name: &str) -> bool {
    LANGUAGES.contains(&name)
}

/// Translation lookup for the active language
#[derive(Debug, Clone)]
pub struct Localizer {
    tables: Vec<HashMap<String, String>>,
    active: usize,
}

impl Localizer {
    /// Parse the embedded tables and activate `language`
    ///
    /// Unknown languages activate [`DEFAULT_LANGUAGE`].
    pub fn new(language: &str) -> Result<Self> {
        let tables = TABLE_SOURCES
            .iter()
            .map(|src| serde_json::from_str::<HashMap<String, String>>(src))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut localizer = Self { tables, active: 0 };
        localizer.set_language(language);
        Ok(localizer)
    }

    /// Switch the active language, returning false if `language` is not supported
    pub fn set_language(&mut self, language: &str) -> bool {
        if let Some(index) = LANGUAGES.iter().position(|l| *l == language) {
            debug!("Active language: {}", language);
            self.active = index;
            true
        } else {
            warn!(
                "Unsupported language '{}', using {}",
                language, DEFAULT_LANGUAGE
            );
            self.active = 0;
            false
        }
    }

    /// Name of the active language
    pub fn language(&self) -> &'static str {
        LANGUAGES[self.active]
    }

    /// Look up `key` and substitute `{n}` placeholders with `args[n]`
    pub fn translate(&self, key: &str, args: &[&dyn std::fmt::Display]) -> String {
        let template = self.tables[self.active]
            .get(key)
            .or_else(|| self.tables[0].get(key))
            .map_or(key, String::as_str);

        if args.is_empty() {
            return template.to_string();
        }
        interpolate(template, args)
    }

    /// Shorthand for [`Localizer::translate`] without arguments
    pub fn get(&self, key: &str) -> String {
        self.translate(key, &[])
    }
}

/// Replace each `{n}` in `template` with `args[n]` in one pass
///
/// Substituted text is never rescanned. Placeholders without a matching
/// argument are kept as written.
fn interpolate(template: &str, args: &[&dyn std::fmt::Display]) -> String {
    use std::fmt::Write;

    let mut text = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        text.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let arg = after.find('}').and_then(|close| {
            let arg = after[..close].parse::<usize>().ok().and_then(|i| args.get(i))?;
            Some((arg, close))
        });
        match arg {
            Some((arg, close)) => {
                let _ = write!(text, "{arg}");
                rest = &after[close + 1..];
            }
            None => {
                text.push('{');
                rest = after;
            }
        }
    }
    text.push_str(rest);
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_tables_parse() {
        let localizer = Localizer::new("English").unwrap();
        assert_eq!(localizer.tables.len(), LANGUAGES.len());
    }

    #[test]
    fn test_english_table_has_every_key() {
        let localizer = Localizer::new("English").unwrap();
        for table in &localizer.tables[1..] {
            for key in table.keys() {
                assert!(
                    localizer.tables[0].contains_key(key),
                    "key {key} missing from the English table"
                );
            }
        }
    }

    #[test]
    fn test_translate_interpolates_arguments() {
        let localizer = Localizer::new("English").unwrap();
        let text = localizer.translate("t_msg_exceeded_display_limit", &[&8]);
        assert_eq!(text, "You cannot add more than 8 virtual displays.");
    }

    #[test]
    fn test_missing_key_falls_back_to_english() {
        let localizer = Localizer::new("Tiếng Việt").unwrap();
        let text = localizer.translate("t_msg_driver_request_failed", &[&"busy"]);
        assert_eq!(
            text,
            "The virtual display driver rejected the request: busy"
        );
    }

    #[test]
    fn test_arguments_are_not_rescanned() {
        let text = interpolate("{0} and {1}", &[&"{1}", &"two"]);
        assert_eq!(text, "{1} and two");

        let localizer = Localizer::new("English").unwrap();
        let text = localizer.translate("t_msg_update_failed", &[&"bad {0} reply"]);
        assert_eq!(text, "Unable to check for updates: bad {0} reply");
    }

    #[test]
    fn test_unmatched_placeholders_kept() {
        let text = interpolate("{0} {2} {x} {", &[&1]);
        assert_eq!(text, "1 {2} {x} {");
    }

    #[test]
    fn test_unknown_key_returns_key() {
        let localizer = Localizer::new("简体中文").unwrap();
        assert_eq!(localizer.get("t_does_not_exist"), "t_does_not_exist");
    }

    #[test]
    fn test_unknown_language_uses_default() {
        let mut localizer = Localizer::new("Klingon").unwrap();
        assert_eq!(localizer.language(), DEFAULT_LANGUAGE);

        assert!(localizer.set_language("简体中文"));
        assert_eq!(localizer.get("t_exit"), "退出");

        assert!(!localizer.set_language("Elvish"));
        assert_eq!(localizer.get("t_exit"), "Exit");
    }
}
