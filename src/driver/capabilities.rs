//! Desired-capability construction
//!
//! Built once per run: logging channels, download directory and the
//! browser-engine family. The map is handed to the WebDriver client verbatim
//! at session negotiation.

use serde_json::{json, Map, Value};
use std::path::Path;

use crate::common::config::BrowserFamily;

/// Immutable capability set negotiated at session start
#[derive(Debug, Clone)]
pub struct Capabilities {
    map: Map<String, Value>,
}

impl Capabilities {
    /// Build capabilities for a browser family
    ///
    /// Enables the `browser` and `performance` logging channels and points
    /// downloads at `download_dir`.
    pub fn build(family: BrowserFamily, download_dir: &Path) -> Self {
        let mut map = Map::new();
        map.insert(
            "browserName".to_string(),
            Value::String(family.browser_name().to_string()),
        );
        map.insert(
            "goog:loggingPrefs".to_string(),
            json!({ "browser": "ALL", "performance": "ALL" }),
        );

        let download_dir = download_dir.display().to_string();
        match family {
            BrowserFamily::Chrome => {
                map.insert(
                    "goog:chromeOptions".to_string(),
                    json!({
                        "prefs": { "download.default_directory": download_dir }
                    }),
                );
            }
            BrowserFamily::Firefox => {
                map.insert(
                    "moz:firefoxOptions".to_string(),
                    json!({
                        "prefs": {
                            "browser.download.dir": download_dir,
                            "browser.download.folderList": 2
                        }
                    }),
                );
            }
        }

        Self { map }
    }

    /// Consume into the raw capability map for session negotiation
    pub fn into_map(self) -> Map<String, Value> {
        self.map
    }

    /// Borrow the raw capability map
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chrome_capabilities() {
        let caps = Capabilities::build(BrowserFamily::Chrome, Path::new("/tmp"));
        let map = caps.as_map();
        assert_eq!(map["browserName"], "chrome");
        assert_eq!(map["goog:loggingPrefs"]["browser"], "ALL");
        assert_eq!(map["goog:loggingPrefs"]["performance"], "ALL");
        assert_eq!(
            map["goog:chromeOptions"]["prefs"]["download.default_directory"],
            "/tmp"
        );
    }

    #[test]
    fn test_firefox_capabilities() {
        let caps = Capabilities::build(BrowserFamily::Firefox, Path::new("/downloads"));
        let map = caps.as_map();
        assert_eq!(map["browserName"], "firefox");
        assert!(map.contains_key("moz:firefoxOptions"));
        assert!(!map.contains_key("goog:chromeOptions"));
        assert_eq!(
            map["moz:firefoxOptions"]["prefs"]["browser.download.dir"],
            "/downloads"
        );
    }
}
