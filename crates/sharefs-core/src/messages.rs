//! Localized message catalog.
//!
//! Failure replies are looked up by `(locale, key)` with the chain:
//! requested locale → configured fallback locale → built-in English
//! baseline → the raw key. The catalog is populated once at startup and
//! immutable afterwards; the `LANG` command only selects among locales that
//! are already registered.

use std::collections::HashMap;

/// Locale of the authoritative built-in table.
pub const BASELINE_LOCALE: &str = "en";

/// English baseline — the authoritative key set.
const EN_MESSAGES: &[(&str, &str)] = &[
    ("ERR_INVALID_PATH", "Invalid path"),
    ("ERR_ACCESS_DENIED", "Access denied"),
    ("ERR_PERMISSION_DENIED_RO", "Permission denied (read-only)"),
    ("ERR_NOT_FOUND", "Not found"),
    ("ERR_SHARE_QUOTA_EXCEEDED", "Share quota exceeded"),
    ("ERR_UPLOAD_LIMIT_EXCEEDED", "File exceeds upload limit"),
    ("ERR_RENAME_CROSS_SHARE", "Rename supported only within the same share"),
    ("ERR_CREATE_DIR_ROOT", "Create a directory inside an existing share"),
    ("ERR_DELETE_FAILED", "Delete failed"),
    ("ERR_CHMOD_UNSUPPORTED", "CHMOD not supported in virtual file system"),
];

const IT_MESSAGES: &[(&str, &str)] = &[
    ("ERR_INVALID_PATH", "Percorso non valido"),
    ("ERR_ACCESS_DENIED", "Accesso negato"),
    ("ERR_PERMISSION_DENIED_RO", "Permesso negato (sola lettura)"),
    ("ERR_NOT_FOUND", "Non trovato"),
    ("ERR_SHARE_QUOTA_EXCEEDED", "Quota della share superata"),
    ("ERR_UPLOAD_LIMIT_EXCEEDED", "Il file supera il limite di upload"),
    (
        "ERR_RENAME_CROSS_SHARE",
        "Rinomina supportata solo all'interno della stessa share",
    ),
    (
        "ERR_CREATE_DIR_ROOT",
        "Creare la directory dentro una share esistente",
    ),
    ("ERR_DELETE_FAILED", "Eliminazione non riuscita"),
    (
        "ERR_CHMOD_UNSUPPORTED",
        "CHMOD non supportato nel file system virtuale",
    ),
];

/// Immutable `(locale, key) → text` lookup table.
#[derive(Debug, Clone)]
pub struct MessageCatalog {
    locales: HashMap<String, HashMap<String, String>>,
    fallback: String,
}

impl MessageCatalog {
    /// The built-in catalog: English baseline plus Italian, falling back
    /// to English.
    pub fn built_in() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> MessageCatalogBuilder {
        MessageCatalogBuilder::new()
    }

    /// Resolve `key` at `locale` through the fallback chain, or echo the
    /// raw key when no table carries it.
    pub fn message<'a>(&'a self, locale: &str, key: &'a str) -> &'a str {
        let requested = locale.to_ascii_lowercase();
        let chain = [requested.as_str(), self.fallback.as_str(), BASELINE_LOCALE];
        for tag in chain {
            if let Some(text) = self.locales.get(tag).and_then(|t| t.get(key)) {
                return text.as_str();
            }
        }
        key
    }

    /// Whether a locale table is registered for `tag`.
    pub fn supports(&self, tag: &str) -> bool {
        self.locales.contains_key(&tag.to_ascii_lowercase())
    }

    /// Registered locale tags: the baseline first, the rest sorted.
    pub fn locales(&self) -> Vec<&str> {
        let mut extra: Vec<&str> = self
            .locales
            .keys()
            .map(String::as_str)
            .filter(|t| *t != BASELINE_LOCALE)
            .collect();
        extra.sort_unstable();
        let mut all = vec![BASELINE_LOCALE];
        all.extend(extra);
        all
    }

    /// The configured fallback locale.
    pub fn fallback(&self) -> &str {
        &self.fallback
    }
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self::built_in()
    }
}

/// Builder collecting locale tables before the catalog freezes.
#[derive(Debug)]
pub struct MessageCatalogBuilder {
    locales: HashMap<String, HashMap<String, String>>,
    fallback: String,
}

impl MessageCatalogBuilder {
    fn new() -> Self {
        let mut locales = HashMap::new();
        locales.insert(BASELINE_LOCALE.to_string(), table(EN_MESSAGES));
        locales.insert("it".to_string(), table(IT_MESSAGES));
        Self {
            locales,
            fallback: BASELINE_LOCALE.to_string(),
        }
    }

    /// Register (or extend) a locale table. Tags are lowercased.
    pub fn locale(mut self, tag: &str, entries: &[(&str, &str)]) -> Self {
        let entry = self
            .locales
            .entry(tag.to_ascii_lowercase())
            .or_default();
        for (key, text) in entries {
            entry.insert((*key).to_string(), (*text).to_string());
        }
        self
    }

    /// Select the fallback locale consulted after the requested one.
    pub fn fallback(mut self, tag: &str) -> Self {
        self.fallback = tag.to_ascii_lowercase();
        self
    }

    pub fn build(self) -> MessageCatalog {
        let fallback = if self.locales.contains_key(&self.fallback) {
            self.fallback
        } else {
            tracing::warn!(
                fallback = %self.fallback,
                "fallback locale not registered, using baseline"
            );
            BASELINE_LOCALE.to_string()
        };
        MessageCatalog {
            locales: self.locales,
            fallback,
        }
    }
}

fn table(entries: &[(&str, &str)]) -> HashMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_resolves_every_key() {
        let catalog = MessageCatalog::built_in();
        for (key, text) in EN_MESSAGES {
            assert_eq!(catalog.message("en", key), *text);
        }
    }

    #[test]
    fn requested_locale_wins() {
        let catalog = MessageCatalog::built_in();
        assert_eq!(catalog.message("it", "ERR_ACCESS_DENIED"), "Accesso negato");
        assert_eq!(catalog.message("IT", "ERR_ACCESS_DENIED"), "Accesso negato");
    }

    #[test]
    fn unknown_locale_falls_back() {
        let catalog = MessageCatalog::builder().fallback("it").build();
        assert_eq!(
            catalog.message("de", "ERR_ACCESS_DENIED"),
            "Accesso negato"
        );
    }

    #[test]
    fn partial_locale_falls_through_per_key() {
        let catalog = MessageCatalog::builder()
            .locale("de", &[("ERR_ACCESS_DENIED", "Zugriff verweigert")])
            .build();
        assert_eq!(
            catalog.message("de", "ERR_ACCESS_DENIED"),
            "Zugriff verweigert"
        );
        // keys missing from the requested table resolve via the baseline
        assert_eq!(catalog.message("de", "ERR_NOT_FOUND"), "Not found");
    }

    #[test]
    fn unknown_key_echoes_raw_key() {
        let catalog = MessageCatalog::built_in();
        assert_eq!(catalog.message("en", "ERR_NO_SUCH_KEY"), "ERR_NO_SUCH_KEY");
    }

    #[test]
    fn unregistered_fallback_degrades_to_baseline() {
        let catalog = MessageCatalog::builder().fallback("xx").build();
        assert_eq!(catalog.fallback(), BASELINE_LOCALE);
    }

    #[test]
    fn locales_list_baseline_first() {
        let catalog = MessageCatalog::builder()
            .locale("de", &[("ERR_NOT_FOUND", "Nicht gefunden")])
            .build();
        assert_eq!(catalog.locales(), ["en", "de", "it"]);
        assert!(catalog.supports("de"));
        assert!(!catalog.supports("fr"));
    }
}
