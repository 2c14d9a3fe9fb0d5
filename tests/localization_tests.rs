//! # Localization Tests
//!
//! Message retrieval, argument substitution and language fallback.

use cafebot::localization::LocalizationManager;
use std::collections::HashMap;

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_localization() -> LocalizationManager {
        LocalizationManager::new().expect("Failed to create localization manager")
    }

    #[test]
    fn test_get_message_existing_key() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("help-message", "en", None);
        assert!(message.contains("/cancel"));
    }

    #[test]
    fn test_get_message_nonexistent_key() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("nonexistent-key", "en", None);
        assert_eq!(message, "Missing translation: nonexistent-key");
    }

    #[test]
    fn test_get_message_unsupported_language() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("cancel-done", "de", None);
        let english = manager.get_message_in_language("cancel-done", "en", None);
        assert_eq!(message, english);
    }

    #[test]
    fn test_get_message_with_args() {
        let manager = setup_localization();

        let mut args = HashMap::new();
        args.insert("name", "Latte");
        args.insert("price", "Rp 25000");

        let message = manager.get_message_in_language("menu-created", "en", Some(&args));
        assert!(message.contains("Latte"));
        assert!(message.contains("Rp 25000"));
        // no Unicode isolation marks around arguments
        assert!(!message.contains('\u{2068}'));
    }

    #[test]
    fn test_get_message_missing_args() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("menu-created", "en", None);
        assert!(!message.is_empty());
    }

    #[test]
    fn test_indonesian_localization() {
        let manager = setup_localization();

        let message = manager.get_message_in_language("menu-price-prompt", "id", None);
        let english = manager.get_message_in_language("menu-price-prompt", "en", None);
        assert_ne!(message, english);
        assert!(message.contains("harga"));
    }

    #[test]
    fn test_language_resolution() {
        let manager = setup_localization();

        assert_eq!(manager.resolve_language(Some("en")), "en");
        assert_eq!(manager.resolve_language(Some("en-US")), "en");
        assert_eq!(manager.resolve_language(Some("id")), "id");
        assert_eq!(manager.resolve_language(Some("ID_id")), "id");
        assert_eq!(manager.resolve_language(None), "en");
        assert_eq!(manager.resolve_language(Some("unsupported")), "en");
    }

    #[test]
    fn test_both_languages_define_the_same_keys() {
        let en = include_str!("../locales/en/main.ftl");
        let id = include_str!("../locales/id/main.ftl");

        let keys = |source: &str| -> Vec<String> {
            source
                .lines()
                .filter(|line| !line.starts_with([' ', '#']))
                .filter_map(|line| line.split_once(" ="))
                .map(|(key, _)| key.to_string())
                .collect()
        };
        assert_eq!(keys(en), keys(id));
    }

    #[test]
    fn test_convenience_functions() {
        cafebot::localization::init_localization().expect("Failed to initialize localization");

        let message = cafebot::localization::t_lang("cancel-done", Some("id"));
        assert!(message.contains("dibatalkan"));

        let args = vec![("name", "Dessert")];
        let message = cafebot::localization::t_args_lang("category-created", &args, None);
        assert!(message.contains("Dessert"));
    }
}
