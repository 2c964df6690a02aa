//! News feed scraper
//!
//! Titles are pulled from the RSS body with a pattern, not an XML parser.
//! Any failure still answers 200 with a readable sentence.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::json;

use super::RelayResponse;
use crate::config::AppState;
use crate::error::RelayError;
use crate::logger;

pub const NEWS_UNAVAILABLE: &str = "Не удалось загрузить новости. Попробуйте позже.";
pub const NEWS_EMPTY: &str = "Свежих новостей не найдено.";

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<title>(.*?)</title>").unwrap());

/// News mode
pub async fn news(state: &AppState) -> RelayResponse {
    let text = match fetch_news(state).await {
        Ok(titles) if titles.is_empty() => NEWS_EMPTY.to_string(),
        Ok(titles) => format_news(&titles),
        Err(e) => {
            logger::log_soft_failure("news", &e);
            NEWS_UNAVAILABLE.to_string()
        }
    };
    RelayResponse::ok(json!({ "news": text }))
}

/// Fetch the feed and return the item titles, channel title excluded
pub async fn fetch_news(state: &AppState) -> Result<Vec<String>, RelayError> {
    let news = &state.config.news;
    let response = state
        .client
        .get(&state.config.upstream.news_url)
        .query(&[
            ("q", news.query.as_str()),
            ("hl", news.hl.as_str()),
            ("gl", news.gl.as_str()),
            ("ceid", news.ceid.as_str()),
        ])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(RelayError::UpstreamStatus {
            context: "News feed request",
            status,
        });
    }

    let xml = response.text().await?;
    Ok(extract_item_titles(&xml, news.max_titles))
}

/// First `limit` `<title>` elements, minus the leading channel title, unescaped.
///
/// Every matched item yields exactly one entry; an empty title stays empty
/// and whitespace runs (line breaks included) collapse to one space.
pub fn extract_item_titles(xml: &str, limit: usize) -> Vec<String> {
    TITLE_RE
        .captures_iter(xml)
        .take(limit)
        .skip(1)
        .filter_map(|caps| caps.get(1))
        .map(|m| collapse_whitespace(&unescape_html(strip_cdata(m.as_str().trim()))))
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_cdata(text: &str) -> &str {
    text.strip_prefix("<![CDATA[")
        .and_then(|t| t.strip_suffix("]]>"))
        .unwrap_or(text)
}

/// Decode the entities RSS titles carry. `&amp;` goes last so `&amp;lt;` stays `&lt;`.
pub fn unescape_html(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// `- title` lines joined with newlines
pub fn format_news(titles: &[String]) -> String {
    titles
        .iter()
        .map(|title| format!("- {title}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(items: usize) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel><title>"курс доллара" - Google Новости</title>"#,
        );
        for i in 0..items {
            xml.push_str(&format!(
                "<item><title>Item {i} &quot;quoted&quot; &amp; Co&apos;s</title><link>https://example.com/{i}</link></item>"
            ));
        }
        xml.push_str("</channel></rss>");
        xml
    }

    #[test]
    fn test_channel_title_is_dropped() {
        let titles = extract_item_titles(&feed(3), 10);
        assert_eq!(titles.len(), 3);
        assert_eq!(titles[0], "Item 0 \"quoted\" & Co's");
    }

    #[test]
    fn test_at_most_nine_items() {
        assert_eq!(extract_item_titles(&feed(25), 10).len(), 9);
        assert_eq!(extract_item_titles(&feed(9), 10).len(), 9);
        assert_eq!(extract_item_titles(&feed(0), 10).len(), 0);
    }

    #[test]
    fn test_unescape_html() {
        assert_eq!(unescape_html("&lt;b&gt; &amp; &quot;x&quot; &apos;y&#39;"), "<b> & \"x\" 'y'");
        assert_eq!(unescape_html("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_cdata_titles() {
        let xml = "<title>channel</title><item><title><![CDATA[Рубль укрепился]]></title></item>";
        assert_eq!(extract_item_titles(xml, 10), vec!["Рубль укрепился".to_string()]);
    }

    #[test]
    fn test_empty_and_multiline_titles_keep_one_line_each() {
        let xml = "<title>channel</title>\
                   <item><title>a</title></item>\
                   <item><title></title></item>\
                   <item><title>Рубль\n   укрепился\r\n к доллару</title></item>";
        let titles = extract_item_titles(xml, 10);
        assert_eq!(titles, vec!["a", "", "Рубль укрепился к доллару"]);

        let news = format_news(&titles);
        assert_eq!(
            news.lines().collect::<Vec<_>>(),
            vec!["- a", "- ", "- Рубль укрепился к доллару"]
        );
    }

    #[test]
    fn test_format_news() {
        let titles = vec!["one".to_string(), "two".to_string()];
        assert_eq!(format_news(&titles), "- one\n- two");
        assert_eq!(format_news(&[]), "");
    }
}
