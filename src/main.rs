use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use zusatz_scanner::catalog::{self, CatalogParser};
use zusatz_scanner::config::AppConfig;
use zusatz_scanner::errors::error_logging;
use zusatz_scanner::lookup::OpenFoodFactsClient;
use zusatz_scanner::observability;
use zusatz_scanner::product::{Category, Product};
use zusatz_scanner::scan_session::{MergeOutcome, ScanSession, ViewFilter};

/// Prefix marking a stdin line as a scanned barcode instead of recognized text
const BARCODE_PREFIX: &str = "barcode:";

/// Prefix marking a stdin line as a manual catalog search
const SEARCH_PREFIX: &str = "search:";

/// Prefix selecting a category filter; `category:all` clears it
const CATEGORY_PREFIX: &str = "category:";

/// Parse a category filter token, `all` (or nothing) meaning no filter
fn parse_category_filter(token: &str) -> Result<Option<Category>> {
    let token = token.trim();
    if token.is_empty() || token.eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    Ok(Some(token.parse::<Category>()?))
}

fn print_product(product: &Product) {
    let mut badges = Vec::new();
    if product.is_external() {
        badges.push("EXTERN");
    }
    if product.is_allergen_free() {
        badges.push("VEGAN");
    }

    println!(
        "{} [{}] {} {}",
        product.id,
        product.category,
        product.name,
        badges.join(" ")
    );
    if !product.allergen_codes.is_empty() {
        println!("    Allergene:    {}", product.allergen_labels().join(", "));
    }
    if !product.additive_codes.is_empty() {
        println!("    Zusatzstoffe: {}", product.additive_labels().join(", "));
    }
    if let Some(instruction) = product.cooking_instruction() {
        println!(
            "    Zubereitung:  {} | Temp: {} | KT: {} | Dauer: {}",
            instruction.method,
            instruction.cooking_temp.as_deref().unwrap_or("-"),
            instruction.core_temp.as_deref().unwrap_or("-"),
            instruction.duration.as_deref().unwrap_or("-"),
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    if let Err(e) = config.validate() {
        error_logging::log_config_error(&e, "app_config", "startup_validation");
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    observability::init_tracing_with_config(&config.observability)?;
    observability::init_metrics_with_config(&config.observability)?;
    info!("{}", config.summary());

    let parser = CatalogParser::with_default_supplier(&config.catalog.default_supplier);
    let mut product_catalog = catalog::load_catalog_or_empty(&parser, &config.catalog.catalog_path);

    if let Some(import_path) = &config.catalog.import_path {
        match catalog::load_import_file(import_path) {
            Ok(products) => {
                info!(count = products.len(), "Appending structured import to catalog");
                product_catalog.extend(products);
            }
            Err(e) => warn!("Structured import skipped: {}", e),
        }
    }

    info!(products = product_catalog.len(), "Catalog ready, reading captures from stdin");

    let lookup = OpenFoodFactsClient::new(config.lookup.clone())?;
    let session = ScanSession::new();
    let mut filter = ViewFilter::default();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.eq_ignore_ascii_case("reset") {
            session.reset();
        } else if let Some(barcode) = line.strip_prefix(BARCODE_PREFIX) {
            match session.search_external(&lookup, barcode).await {
                Ok(Some(MergeOutcome::Added)) => println!("+ barcode {} added", barcode.trim()),
                Ok(Some(MergeOutcome::AlreadyPresent)) => {
                    println!("= barcode {} already listed", barcode.trim())
                }
                Ok(None) => println!("? barcode {} unknown", barcode.trim()),
                Err(e) => warn!("Barcode lookup failed: {}", e),
            }
        } else if let Some(query) = line.strip_prefix(SEARCH_PREFIX) {
            filter.search_text = query.trim().to_string();
            for product in session.visible_products(&product_catalog, &filter) {
                print_product(&product);
            }
        } else if let Some(token) = line.strip_prefix(CATEGORY_PREFIX) {
            match parse_category_filter(token) {
                Ok(category) => {
                    filter.category = category;
                    for product in session.visible_products(&product_catalog, &filter) {
                        print_product(&product);
                    }
                }
                Err(e) => warn!("Category filter ignored: {}", e),
            }
        } else {
            match session.process_text(line, &product_catalog) {
                Some(product) => println!("+ recognized {} ({})", product.name, product.id),
                None => println!("? no catalog product in text"),
            }
        }
    }

    println!("--- {} recognized product(s) ---", session.detected().len());
    for product in session.detected() {
        print_product(&product);
    }

    let events = session.events();
    if !events.is_empty() {
        println!("--- captures ---");
        for event in events {
            println!(
                "{} {:<7} {} <- {}",
                event.timestamp.format("%H:%M:%S"),
                event.source.as_str(),
                event.product_id,
                event.content.replace('\n', " ")
            );
        }
    }

    Ok(())
}
