use chrono::NaiveDate;

use super::*;
use crate::{controller::ListController, export::export_delimited, filter::Query};

fn dummy(id: i64, stock: Option<u32>) -> DummyProduct {
    DummyProduct {
        id,
        title: format!("Product {id}"),
        description: "Sample".into(),
        category: "beauty".into(),
        price: 9.99,
        discount_percentage: Some(7.17),
        rating: Some(4.94),
        stock,
        brand: None,
        thumbnail: None,
    }
}

async fn catalogue() -> ListController<Product> {
    let mut controller = ListController::headless(10, Vec::new());
    let mut items = fallback_products();
    items.extend(local_products());
    controller
        .load(&crate::source::StaticSource::new(items))
        .await
        .expect("load");
    controller
}

#[test]
fn mapping_derives_sku_status_and_defaults() {
    let product = from_dummy(dummy(7, Some(5)));
    assert_eq!(product.sku, "SKU-000007");
    assert_eq!(product.status, StockStatus::LowStock);
    assert_eq!(product.brand, "Unspecified");
    assert_eq!(product.image, PLACEHOLDER_IMAGE);

    let derived = from_dummy(dummy(8, None));
    assert_eq!(derived.stock, from_dummy(dummy(8, None)).stock);
    assert!(derived.stock < 100);
    assert_eq!(derived.status, StockStatus::from_stock(derived.stock));
}

#[tokio::test]
async fn stock_buckets_match_thresholds() {
    let mut controller = catalogue().await;

    controller.apply_query(Query::new().number_range(StockLevel::Low.range()));
    let low: Vec<i64> = controller.filtered_items().iter().map(|p| p.id.0).collect();
    assert_eq!(low, vec![2]);

    controller.apply_query(Query::new().number_range(StockLevel::Out.range()));
    assert_eq!(controller.filtered_items()[0].id, ProductId(3));

    controller.apply_query(Query::new().number_range(StockLevel::Normal.range()));
    assert_eq!(controller.filtered_items().len(), 4);
}

#[tokio::test]
async fn price_bands_split_at_fifty_and_two_hundred() {
    let mut controller = catalogue().await;

    controller.apply_query(Query::new().number_range(PriceBand::Low.range()));
    let low: Vec<i64> = controller.filtered_items().iter().map(|p| p.id.0).collect();
    assert_eq!(low, vec![3, 10003]);

    controller.apply_query(Query::new().number_range(PriceBand::Medium.range()));
    let medium: Vec<i64> = controller.filtered_items().iter().map(|p| p.id.0).collect();
    assert_eq!(medium, vec![2]);

    controller.apply_query(
        Query::new()
            .number_range(PriceBand::High.range())
            .category("brand", "Apple"),
    );
    assert_eq!(controller.filtered_items().len(), 2);
}

#[tokio::test]
async fn create_fills_sku_and_summary_tracks_stock() {
    let mut controller = catalogue().await;
    let id = controller
        .create(draft("Desk Lamp", "Ikea", "home", 25.0, 0))
        .expect("create");

    let created = controller.find(id).expect("created");
    assert_eq!(created.sku, format!("SKU-{:06}", id.0));
    assert_eq!(created.status, StockStatus::OutOfStock);

    let summary = controller.summary();
    assert_eq!(summary.total, 7);
    assert_eq!(summary.low_stock, 1);
    assert_eq!(summary.out_of_stock, 2);
}

#[tokio::test]
async fn stock_patch_rederives_status_unless_given() {
    let mut controller = catalogue().await;
    controller
        .update(
            ProductId(2),
            ProductPatch {
                stock: Some(40),
                ..ProductPatch::default()
            },
        )
        .expect("update");
    assert_eq!(
        controller.find(ProductId(2)).map(|p| p.status),
        Some(StockStatus::Available)
    );

    controller
        .update(
            ProductId(2),
            ProductPatch {
                status: Some(StockStatus::OutOfStock),
                ..ProductPatch::default()
            },
        )
        .expect("update");
    assert_eq!(
        controller.find(ProductId(2)).map(|p| (p.stock, p.status)),
        Some((40, StockStatus::OutOfStock))
    );
}

#[test]
fn bucket_names_parse() {
    assert_eq!("LOW".parse::<StockLevel>(), Ok(StockLevel::Low));
    assert_eq!("high".parse::<PriceBand>(), Ok(PriceBand::High));
    assert!("cheap".parse::<PriceBand>().is_err());
}

#[test]
fn export_uses_semicolons_and_decimal_commas() {
    let csv = export_delimited(&fallback_products()).expect("export");
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "ID;SKU;Name;Brand;Category;Price;Stock;Status;Rating");
    assert_eq!(
        lines[1],
        "1;SKU-SAM-001;Android Smartphone;Samsung;electronics;699,99;45;available;4,5"
    );
}

#[test]
fn empty_export_is_rejected() {
    assert_eq!(
        export_delimited::<Product>(&[]),
        Err(ValidationError::Empty { what: "product" })
    );
}

#[test]
fn stock_report_lists_low_and_out_of_stock() {
    let at = NaiveDate::from_ymd_opt(2023, 10, 20)
        .and_then(|d| d.and_hms_opt(9, 30, 0))
        .expect("timestamp");
    let report = stock_report(&fallback_products(), at);

    assert!(report.starts_with("=== STOCK REPORT ==="));
    assert!(report.contains("Date: 20/10/2023"));
    assert!(report.contains("Low stock (< 10): 1"));
    assert!(report.contains("- Bluetooth Headset (SKU-SONY-001): 8 units"));
    assert!(report.contains("- JavaScript Book (SKU-BOOK-001)\n"));
}
