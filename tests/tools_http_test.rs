use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use jarvis_bridge::tools::{ToolContext, ToolRegistry};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Registry whose HTTP endpoints all point at `server`
fn registry(server: &MockServer, configure: impl FnOnce(&mut ToolContext)) -> (TempDir, ToolRegistry) {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = ToolContext::for_workspace(dir.path());
    let uri = server.uri();
    ctx.endpoints.duckduckgo = uri.clone();
    ctx.endpoints.wikipedia = uri.clone();
    ctx.endpoints.nominatim = uri.clone();
    ctx.endpoints.openweather = uri.clone();
    ctx.endpoints.translate = uri.clone();
    ctx.endpoints.yahoo_finance = uri.clone();
    ctx.endpoints.news_feeds = uri.clone();
    ctx.endpoints.openai = uri;
    configure(&mut ctx);
    (dir, ToolRegistry::with_defaults(ctx))
}

#[tokio::test]
async fn test_weather_geocodes_then_reports() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Oslo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"lat": "59.91", "lon": "10.75"}])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("appid", "ow-key"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "weather": [{"description": "light snow"}],
            "main": {"temp": -3.5, "feels_like": -8.0, "humidity": 86}
        })))
        .mount(&server)
        .await;

    let (_dir, tools) = registry(&server, |ctx| ctx.openweather_api_key = Some("ow-key".to_string()));
    let outcome = tools.execute("getWeather", &json!({"location": "Oslo"})).await;
    assert!(!outcome.is_error, "{}", outcome.output);
    assert_eq!(
        outcome.output,
        "Weather in Oslo: light snow, Temperature: -3.5°C (feels like -8°C), Humidity: 86%"
    );
}

#[tokio::test]
async fn test_weather_unknown_location() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let (_dir, tools) = registry(&server, |ctx| ctx.openweather_api_key = Some("k".to_string()));
    let outcome = tools.execute("weather", &json!({"location": "Atlantis"})).await;
    assert_eq!(outcome.output, "Location Atlantis not found");
}

#[tokio::test]
async fn test_upstream_failure_becomes_labelled_string() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (_dir, tools) = registry(&server, |ctx| ctx.openweather_api_key = Some("k".to_string()));

    let weather = tools.execute("getWeather", &json!({"location": "Paris"})).await;
    assert!(weather.is_error);
    assert!(weather.output.starts_with("Weather API error: "), "{}", weather.output);

    let news = tools.execute("getNews", &json!({})).await;
    assert!(news.output.starts_with("Error fetching news: "), "{}", news.output);

    let search = tools.execute("searchWeb", &json!({"query": "rust"})).await;
    assert!(search.output.starts_with("Search error: "), "{}", search.output);
}

#[tokio::test]
async fn test_search_web_abstract() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("q", "Rust language"))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Heading": "Rust",
            "AbstractText": "Rust is a systems programming language.",
            "AbstractURL": "https://en.wikipedia.org/wiki/Rust_(programming_language)",
            "RelatedTopics": []
        })))
        .mount(&server)
        .await;

    let (_dir, tools) = registry(&server, |_| {});
    let outcome = tools.execute("search", &json!({"query": "Rust language"})).await;
    assert_eq!(
        outcome.output,
        "Rust: Rust is a systems programming language. (https://en.wikipedia.org/wiki/Rust_(programming_language))"
    );
}

#[tokio::test]
async fn test_wikipedia_summary_and_disambiguation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param("search", "Mercury"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            "Mercury",
            ["Mercury", "Mercury (planet)", "Mercury (element)"],
            ["", "", ""],
            ["", "", ""]
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/rest_v1/page/summary/Mercury"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "disambiguation",
            "extract": "Mercury may refer to:"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/w/api.php"))
        .and(query_param("search", "Ferris"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["Ferris", ["Ferris wheel"], [""], [""]])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/rest_v1/page/summary/Ferris_wheel"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "standard",
            "extract": "A Ferris wheel is an amusement ride. It has a wheel. It rotates. It is tall."
        })))
        .mount(&server)
        .await;

    let (_dir, tools) = registry(&server, |_| {});

    let ambiguous = tools.execute("searchWikipedia", &json!({"query": "Mercury"})).await;
    assert_eq!(
        ambiguous.output,
        "Multiple results found: Mercury (planet), Mercury (element)"
    );

    let article = tools.execute("wiki", &json!({"query": "Ferris"})).await;
    assert_eq!(
        article.output,
        "Wikipedia: A Ferris wheel is an amusement ride. It has a wheel. It rotates."
    );
}

#[tokio::test]
async fn test_news_headlines() {
    let server = MockServer::start().await;
    let rss = r#"<?xml version="1.0"?>
<rss><channel><title>Feed title</title>
<item><title>First story</title></item>
<item><title><![CDATA[Second & story]]></title></item>
</channel></rss>"#;
    Mock::given(method("GET"))
        .and(path("/world/rss.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(rss))
        .mount(&server)
        .await;

    let (_dir, tools) = registry(&server, |_| {});
    let outcome = tools.execute("getNews", &json!({"category": "World"})).await;
    assert_eq!(outcome.output, "Latest world news:\n• First story\n• Second & story");
}

#[tokio::test]
async fn test_translate_and_crypto() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/translate_a/single"))
        .and(query_param("tl", "fr"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([[["Bonjour", "Hello", null, null]], null, "en"])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v8/finance/chart/ETH-USD"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "chart": {"result": [{"meta": {"regularMarketPrice": 3120.456, "currency": "USD"}}]}
        })))
        .mount(&server)
        .await;

    let (_dir, tools) = registry(&server, |_| {});

    let translated = tools
        .execute("translate", &json!({"text": "Hello", "target": "fr"}))
        .await;
    assert_eq!(translated.output, "Translation: Bonjour (from en to fr)");

    let price = tools.execute("crypto", &json!({"symbol": "eth-usd"})).await;
    assert_eq!(price.output, "ETH-USD Price: 3120.46 USD");
}

#[tokio::test]
async fn test_generate_image_saves_png() {
    let server = MockServer::start().await;
    let png = STANDARD.encode(b"\x89PNG fake");
    Mock::given(method("POST"))
        .and(path("/v1/images/generations"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{"b64_json": png}]})))
        .mount(&server)
        .await;

    let (_dir, tools) = registry(&server, |ctx| ctx.openai_api_key = Some("sk-test".to_string()));
    let outcome = tools
        .execute("generateImage", &json!({"prompt": "a crab in a suit"}))
        .await;
    assert!(!outcome.is_error, "{}", outcome.output);

    let path = outcome
        .output
        .strip_prefix("Image generated and saved as ")
        .unwrap();
    assert_eq!(std::fs::read(path).unwrap(), b"\x89PNG fake");
}
