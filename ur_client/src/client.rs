//! UR vacancy API client implementation

use crate::error::{Error, Result};
use crate::models::{Availability, DanchiCode, VacancyResponse};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, USER_AGENT};
use std::time::Duration;
use url::Url;

const DEFAULT_API_URL: &str =
    "https://chintai.r6.ur-net.go.jp/chintai/api/bukken/detail/detail_bukken_room/";
const DEFAULT_SITE_BASE: &str = "https://www.ur-net.go.jp";
const USER_AGENT_VALUE: &str = "Mozilla/5.0";

#[derive(Debug, Clone)]
pub struct UrClientConfig {
    /// Room search endpoint
    pub api_url: String,
    /// Base for relative room detail links
    pub site_base: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for UrClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            site_base: DEFAULT_SITE_BASE.to_string(),
            timeout_secs: 30,
        }
    }
}

/// UR vacancy API client
#[derive(Clone)]
pub struct UrClient {
    client: reqwest::Client,
    api_url: Url,
    site_base: Url,
}

impl UrClient {
    pub fn new(config: UrClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_url: Url::parse(&config.api_url)?,
            site_base: Url::parse(&config.site_base)?,
        })
    }

    fn build_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded; charset=UTF-8"),
        );
        headers
    }

    /// Ask the search endpoint which rooms of a danchi are vacant
    pub async fn query_vacancy(&self, code: &DanchiCode) -> Result<Availability> {
        let form = search_form(code);

        tracing::debug!("Querying vacancies for danchi {}", code);

        let response = self
            .client
            .post(self.api_url.clone())
            .headers(self.build_headers())
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(Error::Api {
                message: text,
                status: status.as_u16(),
            });
        }

        let parsed: Option<VacancyResponse> = serde_json::from_str(&text)?;
        let mut availability = Availability::from_response(parsed);
        for room in &mut availability.rooms {
            room.detail_link = absolute_link(&self.site_base, &room.detail_link);
        }

        Ok(availability)
    }
}

/// Form fields of the room search, unfiltered, first page
fn search_form(code: &DanchiCode) -> Vec<(&'static str, String)> {
    vec![
        ("rent_low", String::new()),
        ("rent_high", String::new()),
        ("floorspace_low", String::new()),
        ("floorspace_high", String::new()),
        ("shisya", code.shisya.clone()),
        ("danchi", code.danchi.clone()),
        ("shikibetu", code.shikibetu.clone()),
        ("newBukkenRoom", String::new()),
        ("orderByField", "0".to_string()),
        ("orderBySort", "0".to_string()),
        ("pageIndex", "0".to_string()),
        ("sp", String::new()),
    ]
}

fn absolute_link(base: &Url, link: &str) -> String {
    if link.is_empty() || link.starts_with("http://") || link.starts_with("https://") {
        return link.to_string();
    }
    base.join(link)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| link.to_string())
}
