use serde::{Deserialize, Serialize};

use crate::tracker::hostname;

/// Whether a URL is on the user's blocklist.
///
/// Entries match as plain hostname substrings, NOT anchored to domain
/// boundaries: "afbook" blocks "myafbook.example". Longstanding
/// behavior, kept as-is. Malformed URLs are never blocked.
#[must_use]
pub fn is_blocked(url: &str, blocked_sites: &[String]) -> bool {
    let Some(host) = hostname(url) else {
        return false;
    };
    blocked_sites.iter().any(|entry| host.contains(entry.as_str()))
}

/// Resource type of an intercepted network request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceType {
    Image,
    Stylesheet,
    Script,
    Document,
    Media,
    Other,
}

/// The single network-interception rule: drop image requests while
/// image blocking is on.
///
/// A pure function of the current flag; the flag is overwritten on
/// every change so the rule can never go stale.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterceptRules {
    block_images: bool,
}

impl InterceptRules {
    #[must_use]
    pub fn new(block_images: bool) -> Self {
        Self { block_images }
    }

    pub fn set_image_blocking(&mut self, enabled: bool) {
        self.block_images = enabled;
    }

    #[must_use]
    pub fn image_blocking(&self) -> bool {
        self.block_images
    }

    #[must_use]
    pub fn blocks(&self, resource: ResourceType) -> bool {
        self.block_images && resource == ResourceType::Image
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn substring_match_is_not_anchored() {
        // Documented quirk: a blocklist entry matches anywhere in the
        // hostname, so "example.com" also catches look-alike domains.
        let sites = list(&["example.com"]);
        assert!(is_blocked("https://sub.example.com.evil.test/page", &sites));
        assert!(is_blocked("https://example.com/", &sites));
        assert!(is_blocked("https://www.example.com/", &sites));
    }

    #[test]
    fn partial_entries_match_superstrings() {
        let sites = list(&["afbook"]);
        assert!(is_blocked("https://myafbook.example/feed", &sites));
        assert!(!is_blocked("https://unrelated.example/", &sites));
    }

    #[test]
    fn malformed_urls_are_never_blocked() {
        let sites = list(&["example.com"]);
        assert!(!is_blocked("not a url", &sites));
        assert!(!is_blocked("", &sites));
    }

    #[test]
    fn empty_blocklist_blocks_nothing() {
        assert!(!is_blocked("https://example.com/", &[]));
    }

    #[test]
    fn intercept_rule_only_drops_images_while_enabled() {
        let mut rules = InterceptRules::new(false);
        assert!(!rules.blocks(ResourceType::Image));

        rules.set_image_blocking(true);
        assert!(rules.blocks(ResourceType::Image));
        assert!(!rules.blocks(ResourceType::Document));
        assert!(!rules.blocks(ResourceType::Media));

        rules.set_image_blocking(false);
        assert!(!rules.blocks(ResourceType::Image));
    }
}
