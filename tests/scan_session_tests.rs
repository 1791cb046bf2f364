//! # Scan Session Tests Module
//!
//! Merging text and barcode results into one session, including concurrent
//! producers and a stub lookup standing in for the external service.

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use zusatz_scanner::catalog::ProductCatalog;
    use zusatz_scanner::errors::{AppError, AppResult};
    use zusatz_scanner::lookup::ProductLookup;
    use zusatz_scanner::product::{Category, Product};
    use zusatz_scanner::scan_session::{MergeOutcome, ScanSession, ScanSource, ViewFilter};

    /// Lookup answering from a fixed table
    #[derive(Default)]
    struct StubLookup {
        products: HashMap<String, Product>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl StubLookup {
        fn with(products: Vec<Product>) -> Self {
            Self {
                products: products.into_iter().map(|p| (p.id.clone(), p)).collect(),
                ..Default::default()
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }
    }

    impl ProductLookup for StubLookup {
        async fn lookup(&self, barcode: &str) -> AppResult<Option<Product>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(AppError::Network("service unreachable".to_string()));
            }
            Ok(self.products.get(barcode).cloned())
        }
    }

    fn external(id: &str, name: &str) -> Product {
        Product {
            id: id.to_string(),
            name: name.to_string(),
            category: Category::Meat,
            allergen_codes: vec!["Milk".to_string()],
            additive_codes: vec![],
            supplier: "Extern (Open Food Facts)".to_string(),
            raw_instruction: String::new(),
        }
    }

    fn catalog() -> ProductCatalog {
        ProductCatalog::from_text(
            "100;Wiener Schnitzel\n200;Currywurst\n1801;Lachsfilet\n1901;Zucchini-Puffer",
        )
    }

    #[tokio::test]
    async fn test_barcode_result_is_merged() {
        let lookup = StubLookup::with(vec![external("4000417025005", "Kakao")]);
        let session = ScanSession::new();

        let outcome = session.search_external(&lookup, "4000417025005").await.unwrap();
        assert_eq!(outcome, Some(MergeOutcome::Added));

        let detected = session.detected();
        assert_eq!(detected.len(), 1);
        assert!(detected[0].is_external());

        let events = session.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].source, ScanSource::Barcode);
        assert_eq!(events[0].content, "4000417025005");
        assert_eq!(events[0].product_id, "4000417025005");
    }

    #[tokio::test]
    async fn test_unknown_barcode_leaves_session_untouched() {
        let lookup = StubLookup::default();
        let session = ScanSession::new();

        let outcome = session.search_external(&lookup, "123").await.unwrap();
        assert_eq!(outcome, None);
        assert!(session.is_empty());
        assert!(session.events().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_failure_is_propagated() {
        let lookup = StubLookup::failing();
        let session = ScanSession::new();

        let err = session.search_external(&lookup, "123").await.unwrap_err();
        assert!(matches!(err, AppError::Network(_)));
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
        assert!(session.is_empty());
        assert!(session.events().is_empty());
    }

    #[tokio::test]
    async fn test_first_occurrence_kept_across_sources() {
        let catalog = catalog();
        // The external service reports a product under a catalog article number
        let lookup = StubLookup::with(vec![external("200", "Currywurst (extern)")]);
        let session = ScanSession::new();

        session.process_text("CURRYWURST", &catalog).unwrap();
        let outcome = session.search_external(&lookup, "200").await.unwrap();

        assert_eq!(outcome, Some(MergeOutcome::AlreadyPresent));
        let detected = session.detected();
        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0].name, "Currywurst");
        assert_eq!(session.events().len(), 1);
        assert_eq!(session.events()[0].source, ScanSource::Text);
    }

    #[tokio::test]
    async fn test_concurrent_text_and_barcode_results() {
        let catalog = Arc::new(catalog());
        let lookup = Arc::new(StubLookup::with(vec![
            external("4000417025005", "Kakao"),
            external("100", "Schnitzel (extern)"),
        ]));
        let session = Arc::new(ScanSession::new());

        let mut handles = Vec::new();
        for i in 0..8 {
            let catalog = Arc::clone(&catalog);
            let lookup = Arc::clone(&lookup);
            let session = Arc::clone(&session);
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    session.process_text("Wiener Schnitzel", &catalog);
                    session.process_text("lachsfilet", &catalog);
                } else {
                    session.search_external(lookup.as_ref(), "4000417025005").await.unwrap();
                    session.search_external(lookup.as_ref(), "100").await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut ids: Vec<String> = session.detected().into_iter().map(|p| p.id).collect();
        ids.sort();
        assert_eq!(ids, vec!["100", "1801", "4000417025005"]);
        // One event per added product, however many captures repeated it
        assert_eq!(session.events().len(), 3);
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 8);
    }

    #[test]
    fn test_concurrent_merges_from_threads() {
        let catalog = Arc::new(catalog());
        let session = Arc::new(ScanSession::new());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let catalog = Arc::clone(&catalog);
                let session = Arc::clone(&session);
                std::thread::spawn(move || {
                    for product in catalog.all() {
                        session.merge(product.clone(), ScanSource::Text);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(session.detected().len(), catalog.len());
        assert_eq!(session.events().len(), catalog.len());
    }

    #[tokio::test]
    async fn test_visible_products_after_scanning() {
        let catalog = catalog();
        let lookup = StubLookup::with(vec![external("4000417025005", "Kakao")]);
        let session = ScanSession::new();

        session.process_text("Zucchini-Puffer", &catalog);
        session.search_external(&lookup, "4000417025005").await.unwrap();

        let shown = session.visible_products(&catalog, &ViewFilter::default());
        let ids: Vec<&str> = shown.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["1901", "4000417025005"]);

        let veggie = ViewFilter {
            search_text: String::new(),
            category: Some(Category::Veggie),
        };
        assert_eq!(session.visible_products(&catalog, &veggie).len(), 1);

        // Search ignores recognized products and covers the catalog only
        let search = ViewFilter {
            search_text: "kakao".to_string(),
            category: None,
        };
        assert!(session.visible_products(&catalog, &search).is_empty());
    }
}
