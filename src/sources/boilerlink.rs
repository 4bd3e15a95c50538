//! BoilerLink organization directory
//!
//! Lists student organizations and pulls each one's Instagram link out of the
//! app state embedded in its page.

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

use super::SourceError;
use crate::config::SourcesConfig;
use crate::http::BlockingClient;

/// Script marker preceding the embedded JSON app state
const APP_STATE_MARKER: &str = "window.initialAppState";

/// Organization entry from the discovery search
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Organization {
    #[serde(rename = "Name")]
    pub name: Option<String>,
    #[serde(rename = "WebsiteKey")]
    pub website_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DiscoveryPage {
    #[serde(default)]
    value: Vec<Organization>,
}

/// Organization paired with its Instagram URL, if any
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrgInstagram {
    pub name: Option<String>,
    pub website_key: Option<String>,
    pub instagram: Option<String>,
}

/// Client for the BoilerLink site
pub struct BoilerLinkClient {
    client: BlockingClient,
    base_url: String,
}

impl BoilerLinkClient {
    pub fn new(config: &SourcesConfig) -> Result<Self, SourceError> {
        let client = BlockingClient::new(Duration::from_secs(config.timeout_secs), "Mozilla/5.0")?;
        Ok(Self {
            client,
            base_url: config.boilerlink_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// First `top` organizations from the discovery API
    pub fn fetch_organizations(&self, top: u32) -> Result<Vec<Organization>, SourceError> {
        let url = format!("{}/api/discovery/search/organizations", self.base_url);
        let response = self.client.get_with_query(
            &url,
            &[("top", top.to_string())],
            &[("Accept", "application/json")],
        )?;
        if !response.status.is_success() {
            return Err(SourceError::Status {
                url,
                status: response.status.as_u16(),
            });
        }

        let page: DiscoveryPage = serde_json::from_slice(&response.body)?;
        info!("Fetched {} organizations", page.value.len());
        Ok(page.value)
    }

    /// Organization page HTML; `None` on any non-200 status
    pub fn fetch_org_page(&self, website_key: &str) -> Result<Option<String>, SourceError> {
        let url = format!("{}/organization/{}", self.base_url, website_key);
        let response = self.client.get(&url, &[("Accept", "text/html")])?;
        if response.status.as_u16() != 200 {
            debug!("Org page {} returned {}", website_key, response.status);
            return Ok(None);
        }
        Ok(Some(response.text()))
    }

    /// Resolve Instagram URLs for `orgs`, one page fetch per organization
    pub fn instagram_for_orgs(&self, orgs: &[Organization]) -> Result<Vec<OrgInstagram>, SourceError> {
        let mut results = Vec::with_capacity(orgs.len());

        for (index, org) in orgs.iter().enumerate() {
            if index % 10 == 0 {
                info!("Processing #{}: {:?}", index, org.name);
            }

            let instagram = match &org.website_key {
                Some(key) => self
                    .fetch_org_page(key)?
                    .and_then(|html| extract_instagram_from_html(&html)),
                None => None,
            };

            results.push(OrgInstagram {
                name: org.name.clone(),
                website_key: org.website_key.clone(),
                instagram,
            });
        }

        Ok(results)
    }
}

/// Pull `preFetchedData.organization.socialMedia.instagramUrl` out of the
/// `window.initialAppState = {...};` script in an organization page.
///
/// Only `<script>` elements are searched; the first one mentioning the app
/// state wins.
pub fn extract_instagram_from_html(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("script").ok()?;

    let script = document
        .select(&selector)
        .map(|element| element.text().collect::<String>())
        .find(|text| text.contains(APP_STATE_MARKER))?;

    let (_, json) = script.split_once('=')?;
    let json = json.trim().trim_end_matches(';');

    let state: Value = match serde_json::from_str(json) {
        Ok(state) => state,
        Err(e) => {
            debug!("Unparseable app state: {}", e);
            return None;
        }
    };

    state
        .pointer("/preFetchedData/organization/socialMedia/instagramUrl")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{http_response, serve_once};

    fn page(state: &str) -> String {
        format!(
            "<html><head><script src=\"/app.js\"></script>\
             <script>window.initialAppState = {};</script></head><body></body></html>",
            state
        )
    }

    #[test]
    fn test_extract_instagram_from_html() {
        let html = page(
            r#"{"preFetchedData":{"organization":{"socialMedia":{"instagramUrl":"https://instagram.com/launchpadpurdue"}}}}"#,
        );
        assert_eq!(
            extract_instagram_from_html(&html).as_deref(),
            Some("https://instagram.com/launchpadpurdue")
        );
    }

    #[test]
    fn test_extract_instagram_missing_field() {
        let html = page(r#"{"preFetchedData":{"organization":{"socialMedia":{}}}}"#);
        assert_eq!(extract_instagram_from_html(&html), None);

        let html = page(r#"{"preFetchedData":{"organization":{"socialMedia":{"instagramUrl":null}}}}"#);
        assert_eq!(extract_instagram_from_html(&html), None);
    }

    #[test]
    fn test_extract_instagram_without_script() {
        assert_eq!(extract_instagram_from_html("<html><body>hi</body></html>"), None);
        assert_eq!(extract_instagram_from_html(&page("{not json")), None);
    }

    #[test]
    fn test_extract_instagram_ignores_marker_outside_scripts() {
        let html = format!(
            "<html><head><!-- window.initialAppState=hydrated by app.js --></head>\
             <body><p>window.initialAppState = nope</p>{}</body></html>",
            "<script>window.initialAppState = \
             {\"preFetchedData\":{\"organization\":{\"socialMedia\":{\"instagramUrl\":\"https://instagram.com/x\"}}}};</script>"
        );
        assert_eq!(
            extract_instagram_from_html(&html).as_deref(),
            Some("https://instagram.com/x")
        );
    }

    #[test]
    fn test_extract_instagram_skips_unrelated_scripts() {
        let html = "<script>var config = {\"a\": 1};</script>\
                    <script>window.initialAppState = {\"preFetchedData\":{\"organization\":\
                    {\"socialMedia\":{\"instagramUrl\":\"https://instagram.com/y\"}}}};</script>";
        assert_eq!(
            extract_instagram_from_html(html).as_deref(),
            Some("https://instagram.com/y")
        );
    }

    #[test]
    fn test_organization_deserializes_discovery_names() {
        let page: DiscoveryPage = serde_json::from_str(
            r#"{"value":[{"Name":"Launchpad","WebsiteKey":"launchpad","Id":7},{"Name":"No Key"}]}"#,
        )
        .unwrap();

        assert_eq!(page.value.len(), 2);
        assert_eq!(page.value[0].website_key.as_deref(), Some("launchpad"));
        assert_eq!(page.value[1].website_key, None);
    }

    #[test]
    fn test_fetch_organizations() {
        let body = br#"{"value":[{"Name":"Launchpad","WebsiteKey":"launchpad"}]}"#;
        let base = serve_once(http_response("200 OK", "application/json", body));
        let client = BoilerLinkClient::new(&SourcesConfig {
            timeout_secs: 5,
            boilerlink_base_url: base,
            ..SourcesConfig::default()
        })
        .unwrap();

        let orgs = client.fetch_organizations(100).unwrap();
        assert_eq!(orgs.len(), 1);
        assert_eq!(orgs[0].name.as_deref(), Some("Launchpad"));
    }

    #[test]
    fn test_org_without_key_skips_fetch() {
        // No server: any request would fail
        let client = BoilerLinkClient::new(&SourcesConfig {
            timeout_secs: 1,
            boilerlink_base_url: "http://127.0.0.1:9".to_string(),
            ..SourcesConfig::default()
        })
        .unwrap();
        let orgs = vec![Organization {
            name: Some("No Key".to_string()),
            website_key: None,
        }];

        let mapped = client.instagram_for_orgs(&orgs).unwrap();
        assert_eq!(
            mapped,
            vec![OrgInstagram {
                name: Some("No Key".to_string()),
                website_key: None,
                instagram: None,
            }]
        );
    }
}
