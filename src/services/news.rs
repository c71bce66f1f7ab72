//! Multi-language news search over Google News RSS.
//!
//! Fans out one bounded fetch per (language, query) pair, parses the RSS
//! items, dedups by normalized URL, and returns them newest first within the
//! requested time window. Individual feed failures are tolerated and yield an
//! empty batch.

use crate::config::NewsSettings;
use crate::error::ProxyError;
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use serde::Serialize;
use std::collections::HashSet;
use std::time::Duration as StdDuration;
use url::Url;

/// Hard cap on items returned to the caller.
pub const MAX_RESULTS: usize = 80;

/// Hard cap on the requested time window.
pub const MAX_WINDOW_HOURS: i64 = 24;

/// Google News rejects requests without a browser-looking user agent.
const FEED_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                               (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// A single aggregated news item.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    pub pub_date: String,
    pub source: String,
    pub description: String,
    pub language: String,
    pub origin: &'static str,
}

struct LangParams {
    hl: &'static str,
    gl: &'static str,
    ceid: &'static str,
}

/// Google News locale parameters per language code. Unknown codes fall back
/// to English.
fn lang_params(lang: &str) -> LangParams {
    match lang {
        "he" => LangParams { hl: "iw", gl: "IL", ceid: "IL:he" },
        "ar" => LangParams { hl: "ar", gl: "EG", ceid: "EG:ar" },
        "fa" => LangParams { hl: "fa", gl: "IR", ceid: "IR:fa" },
        "ru" => LangParams { hl: "ru", gl: "RU", ceid: "RU:ru" },
        "fr" => LangParams { hl: "fr", gl: "FR", ceid: "FR:fr" },
        "tr" => LangParams { hl: "tr", gl: "TR", ceid: "TR:tr" },
        _ => LangParams { hl: "en", gl: "US", ceid: "US:en" },
    }
}

/// News feed client. Cheap to clone; the inner `reqwest::Client` is
/// reference-counted.
#[derive(Clone)]
pub struct NewsClient {
    settings: NewsSettings,
    client: Client,
}

impl NewsClient {
    pub fn new(settings: NewsSettings) -> Result<Self, ProxyError> {
        let client = Client::builder()
            .timeout(StdDuration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| {
                ProxyError::Internal(anyhow::anyhow!("Failed to build news HTTP client: {}", e))
            })?;

        Ok(Self { settings, client })
    }

    /// Search all requested languages and return deduped items, newest
    /// first, restricted to the last `max_hours`.
    pub async fn search(&self, keyword: &str, langs: &[String], max_hours: i64) -> Vec<NewsItem> {
        // Two queries per language for broader coverage: the raw keyword and
        // a time-filtered variant.
        let queries = [keyword.to_string(), format!("{keyword} when:{max_hours}h")];

        let mut fetches = Vec::new();
        for lang in langs {
            for query in &queries {
                fetches.push(self.fetch_feed(query, lang));
            }
        }

        let batches = join_all(fetches).await;

        let mut seen = HashSet::new();
        let mut items: Vec<NewsItem> = Vec::new();
        for batch in batches {
            for item in batch {
                if seen.insert(normalize_url(&item.link)) {
                    items.push(item);
                }
            }
        }

        items.sort_by_key(|item| {
            std::cmp::Reverse(
                parse_pub_date(&item.pub_date)
                    .map(|d| d.timestamp())
                    .unwrap_or(i64::MIN),
            )
        });

        let cutoff = Utc::now() - Duration::hours(max_hours);
        items.retain(|item| {
            parse_pub_date(&item.pub_date)
                .map(|d| d > cutoff)
                .unwrap_or(false)
        });

        tracing::debug!(
            keyword,
            languages = langs.len(),
            items = items.len(),
            "Aggregated news feeds"
        );

        items
    }

    /// Fetch and parse one feed. Failures are logged and swallowed; a bad
    /// feed never fails the whole search.
    async fn fetch_feed(&self, query: &str, lang: &str) -> Vec<NewsItem> {
        let params = lang_params(lang);

        let response = self
            .client
            .get(&self.settings.base_url)
            .query(&[
                ("q", query),
                ("hl", params.hl),
                ("gl", params.gl),
                ("ceid", params.ceid),
            ])
            .header(USER_AGENT, FEED_USER_AGENT)
            .header(ACCEPT, "application/rss+xml, application/xml, text/xml")
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => match resp.text().await {
                Ok(xml) => parse_rss(&xml, lang),
                Err(e) => {
                    tracing::debug!(error = %e, lang, "Failed to read feed body");
                    Vec::new()
                }
            },
            Ok(resp) => {
                tracing::debug!(status = %resp.status(), lang, "Feed returned non-success");
                Vec::new()
            }
            Err(e) => {
                tracing::debug!(error = %e, lang, "Feed fetch failed");
                Vec::new()
            }
        }
    }
}

fn parse_rss(xml: &str, lang: &str) -> Vec<NewsItem> {
    let mut items = Vec::new();
    let mut rest = xml;

    while let Some(start) = rest.find("<item>") {
        let after = &rest[start + "<item>".len()..];
        let Some(end) = after.find("</item>") else {
            break;
        };
        let block = &after[..end];
        rest = &after[end + "</item>".len()..];

        let title = extract_tag(block, "title");
        let link = extract_tag(block, "link");
        if title.is_empty() || link.is_empty() {
            continue;
        }

        let pub_date = extract_tag(block, "pubDate");
        let source = clean_html(&extract_tag(block, "source"));
        let description = clean_html(&extract_tag(block, "description"));
        let link = clean_google_url(&link);

        items.push(NewsItem {
            title: clean_html(&title),
            source: if source.is_empty() {
                detect_source(&link)
            } else {
                source
            },
            description: description.chars().take(300).collect(),
            pub_date: if pub_date.is_empty() {
                Utc::now().to_rfc2822()
            } else {
                pub_date
            },
            link,
            language: lang.to_string(),
            origin: "rss",
        });
    }

    items
}

/// Extract the text content of the first `<tag>` in `block`, unwrapping a
/// CDATA section if present. Tags with attributes are handled.
fn extract_tag(block: &str, tag: &str) -> String {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");

    let Some(start) = block.find(&open) else {
        return String::new();
    };
    let after_open = &block[start + open.len()..];
    // Reject prefix matches like <titlex>.
    match after_open.chars().next() {
        Some('>') | Some(' ') | Some('\t') | Some('\n') | Some('\r') | Some('/') => {}
        _ => return String::new(),
    }
    let Some(gt) = after_open.find('>') else {
        return String::new();
    };
    let content = &after_open[gt + 1..];
    let Some(end) = content.find(&close) else {
        return String::new();
    };

    let raw = content[..end].trim();
    let value = raw
        .strip_prefix("<![CDATA[")
        .and_then(|v| v.strip_suffix("]]>"))
        .unwrap_or(raw);
    value.trim().to_string()
}

/// Strip markup and decode the handful of entities Google News emits.
fn clean_html(text: &str) -> String {
    let mut stripped = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            c if !in_tag => stripped.push(c),
            _ => {}
        }
    }

    stripped
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&#x2F;", "/")
        .replace("&nbsp;", " ")
        .trim()
        .to_string()
}

/// Unwrap redirector links carrying the real URL in a `url` or `q` query
/// parameter. Opaque news.google.com article links are kept as-is; they can
/// only be resolved client-side.
fn clean_google_url(link: &str) -> String {
    if link.contains("news.google.com/rss/articles/") {
        return link.to_string();
    }
    if let Ok(u) = Url::parse(link) {
        let pairs: Vec<(String, String)> = u
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let redirect = pairs
            .iter()
            .find(|(k, _)| k == "url")
            .or_else(|| pairs.iter().find(|(k, _)| k == "q"))
            .map(|(_, v)| v.clone());
        if let Some(target) = redirect {
            if target.starts_with("http") {
                return target;
            }
        }
    }
    link.to_string()
}

/// Dedup key: host + path, ignoring scheme and query.
fn normalize_url(link: &str) -> String {
    match Url::parse(link) {
        Ok(u) => format!("{}{}", u.host_str().unwrap_or_default(), u.path()),
        Err(_) => link.to_string(),
    }
}

/// Best-effort publisher name from the link's hostname.
fn detect_source(link: &str) -> String {
    let host = match Url::parse(link) {
        Ok(u) => u.host_str().unwrap_or("").replace("www.", ""),
        Err(_) => return "Unknown".to_string(),
    };
    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() > 1 {
        parts[parts.len() - 2].to_string()
    } else {
        host
    }
}

fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw)
        .map(|d| d.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .map(|d| d.with_timezone(&Utc))
                .ok()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item_block(title: &str, link: &str, pub_date: &str) -> String {
        format!(
            "<item><title><![CDATA[{title}]]></title><link>{link}</link>\
             <pubDate>{pub_date}</pubDate><source url=\"{link}\">Example Wire</source>\
             <description><![CDATA[<b>bold</b> &amp; plain]]></description></item>"
        )
    }

    #[test]
    fn parse_rss_extracts_items_with_cdata_titles() {
        let xml = format!(
            "<rss><channel>{}</channel></rss>",
            item_block(
                "Breaking: \u{05d7}\u{05d3}\u{05e9}\u{05d5}\u{05ea}",
                "https://example.com/story",
                "Mon, 05 Jan 2026 10:00:00 GMT"
            )
        );
        let items = parse_rss(&xml, "he");

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Breaking: \u{05d7}\u{05d3}\u{05e9}\u{05d5}\u{05ea}");
        assert_eq!(items[0].link, "https://example.com/story");
        assert_eq!(items[0].source, "Example Wire");
        assert_eq!(items[0].description, "bold & plain");
        assert_eq!(items[0].language, "he");
        assert_eq!(items[0].origin, "rss");
    }

    #[test]
    fn parse_rss_skips_items_without_title_or_link() {
        let xml = "<rss><item><title>no link</title></item>\
                   <item><link>https://example.com/x</link></item></rss>";
        assert!(parse_rss(xml, "en").is_empty());
    }

    #[test]
    fn parse_rss_falls_back_to_hostname_source() {
        let xml = "<item><title>t</title><link>https://www.haaretz.co.il/news/1</link>\
                   <pubDate>Mon, 05 Jan 2026 10:00:00 GMT</pubDate></item>";
        let items = parse_rss(xml, "he");
        assert_eq!(items[0].source, "co");

        let xml = "<item><title>t</title><link>https://www.cnn.com/world/1</link>\
                   <pubDate>Mon, 05 Jan 2026 10:00:00 GMT</pubDate></item>";
        let items = parse_rss(xml, "en");
        assert_eq!(items[0].source, "cnn");
    }

    #[test]
    fn clean_html_strips_tags_and_decodes_entities() {
        assert_eq!(
            clean_html("<a href=\"x\">Tom &amp; Jerry</a> &quot;quoted&quot;&nbsp;"),
            "Tom & Jerry \"quoted\""
        );
    }

    #[test]
    fn descriptions_are_truncated_to_300_chars() {
        let long = "x".repeat(500);
        let xml = format!(
            "<item><title>t</title><link>https://example.com/a</link>\
             <description>{long}</description></item>"
        );
        let items = parse_rss(&xml, "en");
        assert_eq!(items[0].description.chars().count(), 300);
    }

    #[test]
    fn clean_google_url_unwraps_redirect_params() {
        assert_eq!(
            clean_google_url("https://news.google.com/articles?url=https://example.com/real"),
            "https://example.com/real"
        );
        assert_eq!(
            clean_google_url("https://www.google.com/url?q=https://example.com/q-style"),
            "https://example.com/q-style"
        );
        // Opaque article links cannot be decoded server-side.
        let opaque = "https://news.google.com/rss/articles/CBMiabc?oc=5";
        assert_eq!(clean_google_url(opaque), opaque);
    }

    #[test]
    fn normalize_url_ignores_scheme_and_query() {
        assert_eq!(
            normalize_url("https://example.com/story?utm_source=rss"),
            normalize_url("http://example.com/story")
        );
    }

    #[test]
    fn pub_dates_parse_in_rss_and_iso_forms() {
        assert!(parse_pub_date("Mon, 05 Jan 2026 10:00:00 GMT").is_some());
        assert!(parse_pub_date("2026-01-05T10:00:00+00:00").is_some());
        assert!(parse_pub_date("not a date").is_none());
    }

    #[test]
    fn unknown_language_falls_back_to_english_params() {
        let params = lang_params("xx");
        assert_eq!(params.hl, "en");
        assert_eq!(params.ceid, "US:en");

        let he = lang_params("he");
        assert_eq!(he.hl, "iw");
        assert_eq!(he.gl, "IL");
    }
}
