use crate::error::{AppError, Result};
use crate::models::FetchConfig;
use crate::services::fund_sync::NavSource;
use crate::services::normalizer::RawNavEntry;
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, REFERER};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

const FUND_LIST_URL: &str = "http://fund.eastmoney.com/js/fundcode_search.js";
const HISTORY_URL: &str = "http://api.fund.eastmoney.com/f10/lsjz";
const JSONP_CALLBACK: &str = "jQuery18303213780505917203_1548395296124";

/// Entry of the public fund directory
#[derive(Debug, Clone, PartialEq)]
pub struct FundListItem {
    pub fund_code: String,
    pub fund_name: String,
    pub fund_type: String,
}

/// One decoded page of the NAV history endpoint
#[derive(Debug, Clone, Default)]
pub struct HistoryPage {
    /// Rows available for the fund across all pages
    pub total_count: usize,
    pub entries: Vec<RawNavEntry>,
}

#[derive(Debug, Deserialize)]
struct HistoryEnvelope {
    #[serde(rename = "Data")]
    data: Option<HistoryData>,
    #[serde(rename = "ErrCode", default)]
    err_code: i64,
    #[serde(rename = "ErrMsg")]
    err_msg: Option<String>,
    #[serde(rename = "TotalCount", default)]
    total_count: usize,
}

#[derive(Debug, Deserialize)]
struct HistoryData {
    #[serde(rename = "LSJZList", default)]
    entries: Option<Vec<RawNavEntry>>,
}

/// Payload between the outermost parentheses of a JSONP response
pub fn extract_jsonp_payload(text: &str) -> Option<&str> {
    let text = text.trim();
    let open = text.find('(')?;
    let close = text.rfind(')')?;
    if close <= open {
        return None;
    }
    let payload = text[open + 1..close].trim();
    if payload.is_empty() {
        None
    } else {
        Some(payload)
    }
}

/// Decode one NAV history page; a plain JSON body is accepted as well
pub fn parse_history_page(text: &str) -> Result<HistoryPage> {
    let payload = extract_jsonp_payload(text).unwrap_or(text.trim());
    let envelope: HistoryEnvelope = serde_json::from_str(payload)
        .map_err(|e| AppError::Parse(format!("Unreadable NAV history page: {}", e)))?;

    if envelope.err_code != 0 {
        return Err(AppError::SourceUnavailable(format!(
            "NAV history endpoint returned error {}: {}",
            envelope.err_code,
            envelope.err_msg.unwrap_or_default()
        )));
    }

    let entries = envelope
        .data
        .and_then(|data| data.entries)
        .unwrap_or_default();

    Ok(HistoryPage {
        total_count: envelope.total_count,
        entries,
    })
}

/// Parse the `var r = [[code, abbr, name, type, pinyin], ...]` directory script
pub fn parse_fund_list(text: &str) -> Result<Vec<FundListItem>> {
    let re = Regex::new(r"(?s)var\s+r\s*=\s*(\[.*\]);?")
        .map_err(|e| AppError::Parse(format!("Invalid fund list pattern: {}", e)))?;
    let Some(json_str) = re.captures(text).and_then(|caps| caps.get(1)) else {
        return Err(AppError::Parse("Fund list script has no 'var r' array".to_string()));
    };

    let value: Value = serde_json::from_str(json_str.as_str())?;
    let Some(items) = value.as_array() else {
        return Err(AppError::Parse("Fund list is not an array".to_string()));
    };

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let Some(fields) = item.as_array() else {
            continue;
        };
        if fields.len() < 4 {
            continue;
        }
        let code = fields[0].as_str().unwrap_or("").trim();
        let name = fields[2].as_str().unwrap_or("").trim();
        let fund_type = fields[3].as_str().unwrap_or("").trim();
        if code.is_empty() || name.is_empty() {
            continue;
        }
        out.push(FundListItem {
            fund_code: code.to_string(),
            fund_name: name.to_string(),
            fund_type: fund_type.to_string(),
        });
    }
    Ok(out)
}

/// Number of pages needed for `total_count` rows
pub fn page_count(total_count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total_count.div_ceil(page_size)
}

/// Client for the EastMoney fund directory and NAV history endpoints
pub struct EastMoneyClient {
    client: reqwest::Client,
    config: FetchConfig,
}

impl EastMoneyClient {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36")
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        debug!(
            "Created EastMoneyClient: page_size={}, request_delay={:?}",
            config.page_size, config.request_delay
        );

        Ok(Self { client, config })
    }

    async fn get_text(&self, url: &str, referer: &str, query: &[(&str, String)]) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header(REFERER, referer)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                error!("Request to {} failed: {}", url, e);
                AppError::SourceUnavailable(format!("Request to {} failed: {}", url, e))
            })?
            .error_for_status()?;

        Ok(response.text().await?)
    }

    /// Fetch the fund directory
    pub async fn fetch_fund_list(&self) -> Result<Vec<FundListItem>> {
        info!("Fetching fund list from {}", FUND_LIST_URL);
        let text = self
            .get_text(FUND_LIST_URL, "http://fund.eastmoney.com/", &[])
            .await?;
        let funds = parse_fund_list(&text)?;
        info!("Fund list holds {} funds", funds.len());
        Ok(funds)
    }

    async fn fetch_history_page(&self, fund_code: &str, page_index: usize) -> Result<HistoryPage> {
        let referer = format!("http://fundf10.eastmoney.com/jjjz_{}.html", fund_code);
        let query = [
            ("callback", JSONP_CALLBACK.to_string()),
            ("fundCode", fund_code.to_string()),
            ("pageIndex", page_index.to_string()),
            ("pageSize", self.config.page_size.to_string()),
        ];

        // Politeness delay ahead of every page
        sleep(self.config.request_delay).await;
        let text = self.get_text(HISTORY_URL, &referer, &query).await?;

        parse_history_page(&text).map_err(|e| {
            error!(fund_code = %fund_code, page = page_index, "Failed to parse NAV history page: {}", e);
            e
        })
    }

    /// Fetch the complete NAV history of one fund, newest page first
    ///
    /// The page count comes from the first page's `TotalCount`. Any failed page
    /// fails the whole fund.
    pub async fn fetch_history(&self, fund_code: &str) -> Result<Vec<RawNavEntry>> {
        let first = self.fetch_history_page(fund_code, 1).await?;
        let pages = page_count(first.total_count, self.config.page_size);
        debug!(
            fund_code = %fund_code,
            total = first.total_count,
            pages,
            "Fetched first NAV history page"
        );

        let mut entries = first.entries;
        for page_index in 2..=pages {
            let page = self.fetch_history_page(fund_code, page_index).await?;
            if page.entries.is_empty() {
                warn!(fund_code = %fund_code, page = page_index, "Empty NAV history page, stopping early");
                break;
            }
            entries.extend(page.entries);
        }

        info!(fund_code = %fund_code, rows = entries.len(), "Fetched NAV history");
        Ok(entries)
    }
}

#[async_trait]
impl NavSource for EastMoneyClient {
    async fn fund_list(&self) -> Result<Vec<FundListItem>> {
        self.fetch_fund_list().await
    }

    async fn history(&self, fund_code: &str) -> Result<Vec<RawNavEntry>> {
        self.fetch_history(fund_code).await
    }
}
