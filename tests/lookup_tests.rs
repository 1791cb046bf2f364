//! # Lookup Tests Module
//!
//! Exercises the Open Food Facts client against a local HTTP server that
//! replays canned responses, covering found/unknown barcodes, retries,
//! non-retryable decode failures and the circuit breaker.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use zusatz_scanner::config::LookupConfig;
    use zusatz_scanner::errors::AppError;
    use zusatz_scanner::lookup::{OpenFoodFactsClient, ProductLookup, OPEN_FOOD_FACTS_SUPPLIER};
    use zusatz_scanner::product::Category;

    const FOUND_BODY: &str = r#"{
        "status": 1,
        "product": {
            "product_name": "Haferdrink Barista",
            "allergens": "en:gluten,en:oats",
            "additives_tags": ["en:e340", "en:e452i"]
        }
    }"#;

    /// One canned HTTP answer
    #[derive(Clone)]
    struct Reply {
        status_line: &'static str,
        body: &'static str,
    }

    fn ok(body: &'static str) -> Reply {
        Reply {
            status_line: "200 OK",
            body,
        }
    }

    fn status(status_line: &'static str) -> Reply {
        Reply {
            status_line,
            body: "{}",
        }
    }

    /// Serve `replies` in order (the last one repeats) and count requests
    async fn spawn_server(replies: Vec<Reply>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let addr = listener.local_addr().expect("Failed to read local address");
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let index = counter.fetch_add(1, Ordering::SeqCst);
                let reply = replies[index.min(replies.len() - 1)].clone();

                // Read until the end of the request headers
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }

                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    reply.status_line,
                    reply.body.len(),
                    reply.body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}/api/v0/product", addr), hits)
    }

    fn config(base_url: String) -> LookupConfig {
        LookupConfig {
            base_url,
            http_timeout_secs: 5,
            max_retries: 2,
            base_retry_delay_ms: 5,
            max_retry_delay_ms: 20,
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_secs: 60,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_found_barcode_becomes_external_product() {
        let (url, hits) = spawn_server(vec![ok(FOUND_BODY)]).await;
        let client = OpenFoodFactsClient::new(config(url)).unwrap();

        let product = client.lookup("4099200051236").await.unwrap().unwrap();
        assert_eq!(product.id, "4099200051236");
        assert_eq!(product.name, "Haferdrink Barista");
        assert_eq!(product.category, Category::Meat);
        assert_eq!(product.allergen_codes, vec!["Gluten", "Oats"]);
        assert_eq!(product.additive_codes, vec![340]);
        assert_eq!(product.supplier, OPEN_FOOD_FACTS_SUPPLIER);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unknown_barcode_is_none() {
        let (url, _) = spawn_server(vec![ok(r#"{"status": 0, "status_verbose": "product not found"}"#)]).await;
        let client = OpenFoodFactsClient::new(config(url)).unwrap();
        assert_eq!(client.lookup("0000000000000").await.unwrap(), None);

        let (url, hits) = spawn_server(vec![status("404 Not Found")]).await;
        let client = OpenFoodFactsClient::new(config(url)).unwrap();
        assert_eq!(client.lookup("0000000000000").await.unwrap(), None);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(client.circuit_breaker().failure_count(), 0);
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let (url, hits) = spawn_server(vec![
            status("503 Service Unavailable"),
            status("500 Internal Server Error"),
            ok(FOUND_BODY),
        ])
        .await;
        let client = OpenFoodFactsClient::new(config(url)).unwrap();

        let product = client.lookup("4099200051236").await.unwrap();
        assert!(product.is_some());
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(client.circuit_breaker().failure_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_response_is_not_retried() {
        let (url, hits) = spawn_server(vec![ok("<html>maintenance</html>")]).await;
        let client = OpenFoodFactsClient::new(config(url)).unwrap();

        let err = client.lookup("4099200051236").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!client.circuit_breaker().is_open());
    }

    #[tokio::test]
    async fn test_repeated_failures_open_circuit_breaker() {
        let (url, hits) = spawn_server(vec![status("500 Internal Server Error")]).await;
        let client = OpenFoodFactsClient::new(LookupConfig {
            max_retries: 1,
            circuit_breaker_threshold: 2,
            ..config(url)
        })
        .unwrap();

        for _ in 0..2 {
            let err = client.lookup("4099200051236").await.unwrap_err();
            assert!(matches!(err, AppError::Network(_)));
        }
        assert_eq!(hits.load(Ordering::SeqCst), 4);
        assert!(client.circuit_breaker().is_open());

        // Rejected without another request
        let err = client.lookup("4099200051236").await.unwrap_err();
        assert!(matches!(err, AppError::Network(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_invalid_barcode_never_reaches_the_service() {
        let (url, hits) = spawn_server(vec![ok(FOUND_BODY)]).await;
        let client = OpenFoodFactsClient::new(config(url)).unwrap();

        let err = client.lookup("../../etc/passwd").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
