//! Web lookups: search, Wikipedia, news, translation and market prices

use super::{param_or, required_param, Tool, ToolContext};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

const MAX_HEADLINES: usize = 5;
const MAX_RELATED: usize = 5;

// ---------------------------------------------------------------------------
// searchWeb
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct InstantAnswer {
    heading: String,
    abstract_text: String,
    #[serde(rename = "AbstractURL")]
    abstract_url: String,
    answer: String,
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct RelatedTopic {
    text: Option<String>,
    topics: Vec<RelatedTopic>,
}

impl InstantAnswer {
    fn summarize(&self, query: &str) -> String {
        if !self.abstract_text.is_empty() {
            let mut out = if self.heading.is_empty() {
                self.abstract_text.clone()
            } else {
                format!("{}: {}", self.heading, self.abstract_text)
            };
            if !self.abstract_url.is_empty() {
                out.push_str(&format!(" ({})", self.abstract_url));
            }
            return out;
        }

        if !self.answer.is_empty() {
            return self.answer.clone();
        }

        let topics: Vec<&str> = self
            .related_topics
            .iter()
            .flat_map(|t| std::iter::once(t).chain(t.topics.iter()))
            .filter_map(|t| t.text.as_deref())
            .filter(|t| !t.is_empty())
            .take(MAX_RELATED)
            .collect();

        if topics.is_empty() {
            format!("No results found for '{}'", query)
        } else {
            format!("Results for '{}':\n• {}", query, topics.join("\n• "))
        }
    }
}

pub struct SearchWeb;

#[async_trait]
impl Tool for SearchWeb {
    fn name(&self) -> &'static str {
        "searchWeb"
    }

    fn description(&self) -> &'static str {
        "Search the web (query)"
    }

    fn error_label(&self) -> &'static str {
        "Search error"
    }

    async fn call(&self, params: &Value, ctx: &ToolContext) -> Result<String> {
        let query = required_param(params, "query")?;
        let answer: InstantAnswer = ctx
            .http
            .get(format!("{}/", ctx.endpoints.duckduckgo))
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(answer.summarize(query))
    }
}

// ---------------------------------------------------------------------------
// searchWikipedia
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct PageSummary {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    extract: String,
}

/// First `n` sentences of a plain-text extract
pub fn first_sentences(text: &str, n: usize) -> String {
    let mut end = text.len();
    let mut found = 0;
    for (i, c) in text.char_indices() {
        if matches!(c, '.' | '!' | '?') {
            let next = text[i + c.len_utf8()..].chars().next();
            if next.map_or(true, char::is_whitespace) {
                found += 1;
                if found == n {
                    end = i + c.len_utf8();
                    break;
                }
            }
        }
    }
    text[..end].trim().to_string()
}

pub struct SearchWikipedia;

#[async_trait]
impl Tool for SearchWikipedia {
    fn name(&self) -> &'static str {
        "searchWikipedia"
    }

    fn description(&self) -> &'static str {
        "Summarize a Wikipedia article (query)"
    }

    fn error_label(&self) -> &'static str {
        "Wikipedia search error"
    }

    async fn call(&self, params: &Value, ctx: &ToolContext) -> Result<String> {
        let query = required_param(params, "query")?;
        let base = &ctx.endpoints.wikipedia;

        // [query, [titles], [descriptions], [urls]]
        let search: Value = ctx
            .http
            .get(format!("{}/w/api.php", base))
            .query(&[
                ("action", "opensearch"),
                ("search", query),
                ("limit", "5"),
                ("namespace", "0"),
                ("format", "json"),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let titles: Vec<&str> = search
            .get(1)
            .and_then(Value::as_array)
            .map(|a| a.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let Some(title) = titles.first() else {
            return Ok(format!("No Wikipedia results for '{}'", query));
        };

        let summary: PageSummary = ctx
            .http
            .get(format!(
                "{}/api/rest_v1/page/summary/{}",
                base,
                urlencoding::encode(&title.replace(' ', "_"))
            ))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if summary.kind == "disambiguation" {
            let options: Vec<&str> = titles.iter().skip(1).take(5).copied().collect();
            if options.is_empty() {
                return Ok(format!("Multiple results found for '{}'", title));
            }
            return Ok(format!("Multiple results found: {}", options.join(", ")));
        }

        Ok(format!("Wikipedia: {}", first_sentences(&summary.extract, 3)))
    }
}

// ---------------------------------------------------------------------------
// getNews
// ---------------------------------------------------------------------------

/// (category, feed path) pairs. Unknown categories fall back to the first.
const NEWS_FEEDS: &[(&str, &str)] = &[
    ("technology", "technology"),
    ("world", "world"),
    ("business", "business"),
    ("science", "science_and_environment"),
];

/// Item titles of an RSS document, in order
pub fn parse_rss_titles(xml: &str, limit: usize) -> Vec<String> {
    let mut reader = Reader::from_str(xml);
    let mut titles = Vec::new();
    let mut in_item = false;
    let mut in_title = false;
    let mut current = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"item" => {
                in_item = true;
            }
            Ok(Event::Start(ref e)) if in_item && e.name().as_ref() == b"title" => {
                in_title = true;
                current.clear();
            }
            Ok(Event::Text(ref e)) if in_title => {
                if let Ok(text) = e.unescape() {
                    current.push_str(&text);
                }
            }
            Ok(Event::CData(ref e)) if in_title => {
                current.push_str(&String::from_utf8_lossy(e));
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"title" => {
                if in_title && !current.trim().is_empty() {
                    titles.push(current.trim().to_string());
                    if titles.len() >= limit {
                        break;
                    }
                }
                in_title = false;
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"item" => {
                in_item = false;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!("RSS parse stopped: {}", e);
                break;
            }
            _ => (),
        }
    }

    titles
}

pub struct GetNews;

#[async_trait]
impl Tool for GetNews {
    fn name(&self) -> &'static str {
        "getNews"
    }

    fn description(&self) -> &'static str {
        "Top headlines (category: technology, world, business, science)"
    }

    fn error_label(&self) -> &'static str {
        "Error fetching news"
    }

    async fn call(&self, params: &Value, ctx: &ToolContext) -> Result<String> {
        let requested = param_or(params, "category", "technology").to_lowercase();
        let (category, path) = NEWS_FEEDS
            .iter()
            .find(|(name, _)| *name == requested)
            .copied()
            .unwrap_or(NEWS_FEEDS[0]);

        let xml = ctx
            .http
            .get(format!("{}/{}/rss.xml", ctx.endpoints.news_feeds, path))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let titles = parse_rss_titles(&xml, MAX_HEADLINES);
        if titles.is_empty() {
            return Ok(format!("No {} news available right now", category));
        }

        let lines: Vec<String> = titles.iter().map(|t| format!("• {}", t)).collect();
        Ok(format!("Latest {} news:\n{}", category, lines.join("\n")))
    }
}

// ---------------------------------------------------------------------------
// translateText
// ---------------------------------------------------------------------------

/// Translated text and detected source language from the `translate_a`
/// response: `[[["chunk", "orig", ...], ...], null, "src", ...]`
fn parse_translation(body: &Value) -> Result<(String, Option<String>)> {
    let chunks = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("unexpected response shape"))?;

    let text: String = chunks
        .iter()
        .filter_map(|c| c.get(0).and_then(Value::as_str))
        .collect();
    let source = body.get(2).and_then(Value::as_str).map(str::to_string);
    Ok((text, source))
}

pub struct TranslateText;

#[async_trait]
impl Tool for TranslateText {
    fn name(&self) -> &'static str {
        "translateText"
    }

    fn description(&self) -> &'static str {
        "Translate text (text, target, source)"
    }

    fn error_label(&self) -> &'static str {
        "Translation error"
    }

    async fn call(&self, params: &Value, ctx: &ToolContext) -> Result<String> {
        let text = required_param(params, "text")?;
        let target = param_or(params, "target", "en");
        let source = param_or(params, "source", "auto");

        let body: Value = ctx
            .http
            .get(format!("{}/translate_a/single", ctx.endpoints.translate))
            .query(&[
                ("client", "gtx"),
                ("sl", source.as_str()),
                ("tl", target.as_str()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let (translated, detected) = parse_translation(&body)?;
        let from = detected.unwrap_or(source);
        Ok(format!("Translation: {} (from {} to {})", translated, from, target))
    }
}

// ---------------------------------------------------------------------------
// getCryptoPrice
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
    #[serde(default)]
    regular_market_volume: Option<u64>,
    #[serde(default)]
    currency: Option<String>,
}

pub struct GetCryptoPrice;

#[async_trait]
impl Tool for GetCryptoPrice {
    fn name(&self) -> &'static str {
        "getCryptoPrice"
    }

    fn description(&self) -> &'static str {
        "Current price of a ticker such as BTC-USD (symbol)"
    }

    fn error_label(&self) -> &'static str {
        "Error fetching crypto price"
    }

    async fn call(&self, params: &Value, ctx: &ToolContext) -> Result<String> {
        let symbol = param_or(params, "symbol", "BTC-USD").to_uppercase();

        let chart: ChartResponse = ctx
            .http
            .get(format!(
                "{}/v8/finance/chart/{}",
                ctx.endpoints.yahoo_finance,
                urlencoding::encode(&symbol)
            ))
            .query(&[("range", "1d"), ("interval", "1d")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let meta = chart
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .map(|r| r.meta)
            .context(format!("no market data for {}", symbol))?;
        let price = meta
            .regular_market_price
            .context(format!("no price for {}", symbol))?;
        let currency = meta.currency.unwrap_or_else(|| "USD".to_string());

        let mut out = format!("{} Price: {:.2} {}", symbol, price, currency);
        if let Some(volume) = meta.regular_market_volume {
            out.push_str(&format!(", 24h Volume: {}", volume));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_sentences() {
        let text = "Rust is a language. It is fast. It is safe. It has crabs.";
        assert_eq!(
            first_sentences(text, 3),
            "Rust is a language. It is fast. It is safe."
        );
        assert_eq!(first_sentences("No terminator here", 3), "No terminator here");
        assert_eq!(first_sentences("Version 1.5 shipped. Done.", 1), "Version 1.5 shipped.");
    }

    #[test]
    fn test_parse_rss_titles_skips_channel_title() {
        let xml = r#"<?xml version="1.0"?>
            <rss><channel><title>BBC News</title>
              <item><title><![CDATA[First headline]]></title></item>
              <item><title>Second &amp; third</title></item>
              <item><title>Another</title></item>
            </channel></rss>"#;
        let titles = parse_rss_titles(xml, 2);
        assert_eq!(titles, vec!["First headline", "Second & third"]);
    }

    #[test]
    fn test_instant_answer_fallbacks() {
        let answer: InstantAnswer = serde_json::from_value(json!({
            "Heading": "Rust",
            "AbstractText": "A systems language.",
            "AbstractURL": "https://example.org/rust"
        }))
        .unwrap();
        assert_eq!(
            answer.summarize("rust"),
            "Rust: A systems language. (https://example.org/rust)"
        );

        let related: InstantAnswer = serde_json::from_value(json!({
            "RelatedTopics": [
                {"Text": "One"},
                {"Name": "Group", "Topics": [{"Text": "Two"}]}
            ]
        }))
        .unwrap();
        assert_eq!(related.summarize("q"), "Results for 'q':\n• One\n• Two");

        assert_eq!(
            InstantAnswer::default().summarize("nothing"),
            "No results found for 'nothing'"
        );
    }

    #[test]
    fn test_parse_translation() {
        let body = json!([[["Hola ", "Hello ", null], ["mundo", "world", null]], null, "en"]);
        let (text, src) = parse_translation(&body).unwrap();
        assert_eq!(text, "Hola mundo");
        assert_eq!(src.as_deref(), Some("en"));
        assert!(parse_translation(&json!({"oops": true})).is_err());
    }
}
