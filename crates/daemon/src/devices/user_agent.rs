//! Browser and operating system labels from a `User-Agent` header.

use woothee::parser::Parser;

/// Family reported when a user agent cannot be classified.
pub const UNKNOWN_FAMILY: &str = "Other";

/// Value woothee uses for fields it could not detect.
const WOOTHEE_UNKNOWN: &str = "UNKNOWN";

/// Parsed client software.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub browser_family: String,
    pub browser_version: String,
    pub os_family: String,
    pub os_version: String,
}

impl ClientInfo {
    /// Parse a raw `User-Agent` value. Missing or empty headers classify as unknown.
    pub fn parse(user_agent: Option<&str>) -> Self {
        let raw = user_agent.map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return Self::unknown();
        }

        match Parser::new().parse(raw) {
            Some(result) => Self {
                browser_family: family(&result.name),
                browser_version: known(&result.version),
                os_family: family(&result.os),
                os_version: known(&result.os_version),
            },
            None => Self::unknown(),
        }
    }

    fn unknown() -> Self {
        Self {
            browser_family: UNKNOWN_FAMILY.to_string(),
            browser_version: String::new(),
            os_family: UNKNOWN_FAMILY.to_string(),
            os_version: String::new(),
        }
    }

    /// Browser family and version, e.g. `Chrome 120.0.0.0`.
    pub fn browser_label(&self) -> String {
        join_label(&self.browser_family, &self.browser_version)
    }

    /// Operating system family and version, e.g. `iPhone 17.1`.
    pub fn os_label(&self) -> String {
        join_label(&self.os_family, &self.os_version)
    }
}

fn family(value: &str) -> String {
    let value = known(value);
    if value.is_empty() {
        UNKNOWN_FAMILY.to_string()
    } else {
        value
    }
}

fn known(value: &str) -> String {
    if value == WOOTHEE_UNKNOWN {
        String::new()
    } else {
        value.to_string()
    }
}

fn join_label(family: &str, version: &str) -> String {
    if version.is_empty() {
        family.to_string()
    } else {
        format!("{} {}", family, version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const FIREFOX_LINUX: &str =
        "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Mobile/15E148 Safari/604.1";

    #[test]
    fn test_chrome_on_mac() {
        let info = ClientInfo::parse(Some(CHROME_MAC));
        assert_eq!(info.browser_family, "Chrome");
        assert_eq!(info.browser_label(), "Chrome 120.0.0.0");
        assert!(info.os_label().starts_with("Mac OSX"));
    }

    #[test]
    fn test_firefox_on_linux() {
        let info = ClientInfo::parse(Some(FIREFOX_LINUX));
        assert_eq!(info.browser_label(), "Firefox 121.0");
        assert!(info.os_label().starts_with("Linux"));
    }

    #[test]
    fn test_safari_on_iphone() {
        let info = ClientInfo::parse(Some(SAFARI_IPHONE));
        assert_eq!(info.browser_family, "Safari");
        assert_eq!(info.os_family, "iPhone");
    }

    #[test]
    fn test_missing_user_agent() {
        for ua in [None, Some(""), Some("   ")] {
            let info = ClientInfo::parse(ua);
            assert_eq!(info.browser_label(), "Other");
            assert_eq!(info.os_label(), "Other");
        }
    }

    #[test]
    fn test_unrecognized_user_agent_still_has_labels() {
        let info = ClientInfo::parse(Some("curl/8.4.0"));
        assert!(!info.browser_label().is_empty());
        assert!(!info.os_label().is_empty());
    }

    #[test]
    fn test_distinct_agents_give_distinct_labels() {
        let a = ClientInfo::parse(Some(CHROME_MAC));
        let b = ClientInfo::parse(Some(FIREFOX_LINUX));
        assert_ne!(a.browser_label(), b.browser_label());
    }
}
