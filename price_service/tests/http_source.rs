use std::sync::Arc;
use std::time::Duration;

use price_common::{PriceError, PriceQuote, SymbolMapping};
use price_service::cache::PriceCache;
use price_service::clock::ManualClock;
use price_service::store::MemoryStore;
use price_service::{CoinGeckoSource, FetchOutcome, PriceFetcher, PriceSource};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Serve exactly one HTTP response and hand back the request head.
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        String::from_utf8_lossy(&request).into_owned()
    });

    (base_url, server)
}

fn source(base_url: &str) -> CoinGeckoSource {
    CoinGeckoSource::new(base_url, Duration::from_secs(5), Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn sends_one_batched_simple_price_request() {
    let (base_url, server) = serve_once(
        "200 OK",
        r#"{"bitcoin":{"eur":43250.0,"eur_24h_change":2.34},"solana":{"eur":98.5,"eur_24h_change":-1.25}}"#,
    )
    .await;

    let ids = vec!["bitcoin".to_string(), "solana".to_string()];
    let quotes = source(&base_url).fetch_quotes(&ids, "eur").await.unwrap();

    assert_eq!(quotes["bitcoin"], PriceQuote::new(43250.0, 2.34));
    assert_eq!(quotes["solana"], PriceQuote::new(98.5, -1.25));

    let request = server.await.unwrap();
    let request_line = request.lines().next().unwrap();
    assert!(request_line.starts_with("GET /simple/price?"), "{}", request_line);
    assert!(request_line.contains("ids=bitcoin%2Csolana"), "{}", request_line);
    assert!(request_line.contains("vs_currencies=eur"), "{}", request_line);
    assert!(request_line.contains("include_24hr_change=true"), "{}", request_line);
}

#[tokio::test]
async fn non_200_status_is_an_error() {
    let (base_url, server) = serve_once("429 Too Many Requests", r#"{"status":{"error_code":429}}"#).await;

    let err = source(&base_url)
        .fetch_quotes(&["bitcoin".to_string()], "eur")
        .await
        .unwrap_err();

    assert!(matches!(err, PriceError::HttpStatus(429)));
    server.await.unwrap();
}

#[tokio::test]
async fn malformed_body_is_an_error() {
    let (base_url, server) = serve_once("200 OK", "<html>maintenance</html>").await;

    let err = source(&base_url)
        .fetch_quotes(&["bitcoin".to_string()], "eur")
        .await
        .unwrap_err();

    assert!(matches!(err, PriceError::MalformedPayload(_)));
    server.await.unwrap();
}

#[tokio::test]
async fn unreachable_provider_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = source(&base_url)
        .fetch_quotes(&["bitcoin".to_string()], "eur")
        .await
        .unwrap_err();

    assert!(matches!(err, PriceError::Transport(_)));
}

#[tokio::test]
async fn fetcher_over_http_falls_back_on_server_error() {
    let (base_url, server) = serve_once("500 Internal Server Error", "").await;
    let clock = Arc::new(ManualClock::new(0.0));
    let cache = Arc::new(PriceCache::new(MemoryStore::new(), clock.clone(), Duration::from_secs(180)));
    let mut stale = price_common::PriceSnapshot::new();
    stale.insert("BTC", PriceQuote::new(40000.0, -3.0));
    cache.store(&stale);
    clock.set(500.0);

    let fetcher = PriceFetcher::new(
        cache,
        Arc::new(source(&base_url)),
        SymbolMapping::default(),
        "eur",
    );
    let (prices, outcome) = fetcher.fetch_prices_with_outcome(["BTC"], true).await;

    assert_eq!(outcome, FetchOutcome::Fallback);
    assert_eq!(prices, stale);
    server.await.unwrap();
}
