use std::{borrow::Cow, fmt::Write as _, ops::Bound, str::FromStr};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use shared::{
    domain::{Product, ProductId, StockStatus, LOW_STOCK_THRESHOLD},
    error::{require, LoadError, ValidationError},
    protocol::DummyProduct,
};
use tracing::info;
use url::Url;

use super::below;
use crate::{
    export::{Cell, ExportOptions, Exportable},
    filter::NumberRange,
    record::Record,
    source::{endpoint, DataSource, HttpSource},
};

pub const PRODUCTS_LIMIT: u32 = 50;
const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/150";

pub fn sku_for(id: ProductId) -> String {
    format!("SKU-{:06}", id.0)
}

#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<u32>,
    pub description: Option<String>,
    pub rating: Option<f64>,
    /// Explicit status; when absent a stock change re-derives it.
    pub status: Option<StockStatus>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductSummary {
    pub total: usize,
    pub low_stock: usize,
    pub out_of_stock: usize,
    pub stock_value: f64,
}

impl Record for Product {
    type Id = ProductId;
    type Patch = ProductPatch;
    type Summary = ProductSummary;

    const KIND: &'static str = "product";

    fn id(&self) -> ProductId {
        self.id
    }

    fn set_id(&mut self, id: ProductId) {
        self.id = id;
        if self.sku.trim().is_empty() {
            self.sku = sku_for(id);
        }
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.name.as_str(),
            self.brand.as_str(),
            self.description.as_str(),
            self.sku.as_str(),
        ]
    }

    fn category(&self, key: &str) -> Option<Cow<'_, str>> {
        match key {
            "category" => Some(Cow::Borrowed(self.category.as_str())),
            "status" => Some(Cow::Borrowed(self.status.as_str())),
            "brand" => Some(Cow::Borrowed(self.brand.as_str())),
            _ => None,
        }
    }

    fn number(&self, key: &str) -> Option<f64> {
        match key {
            "price" => Some(self.price),
            "stock" => Some(f64::from(self.stock)),
            "rating" => Some(self.rating),
            _ => None,
        }
    }

    fn apply_patch(&mut self, patch: ProductPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(brand) = patch.brand {
            self.brand = brand;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(rating) = patch.rating {
            self.rating = rating;
        }
        if let Some(image) = patch.image.filter(|image| !image.trim().is_empty()) {
            self.image = image;
        }
        match (patch.stock, patch.status) {
            (_, Some(status)) => {
                if let Some(stock) = patch.stock {
                    self.stock = stock;
                }
                self.status = status;
            }
            (Some(stock), None) => {
                self.stock = stock;
                self.status = StockStatus::from_stock(stock);
            }
            (None, None) => {}
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("category", &self.category)?;
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(ValidationError::InvalidValue {
                field: "price",
                value: self.price.to_string(),
            });
        }
        if !(0.0..=5.0).contains(&self.rating) {
            return Err(ValidationError::InvalidValue {
                field: "rating",
                value: self.rating.to_string(),
            });
        }
        Ok(())
    }

    fn summarize(all: &[Self], _filtered: &[Self]) -> ProductSummary {
        ProductSummary {
            total: all.len(),
            low_stock: all
                .iter()
                .filter(|p| p.status == StockStatus::LowStock)
                .count(),
            out_of_stock: all
                .iter()
                .filter(|p| p.status == StockStatus::OutOfStock)
                .count(),
            stock_value: all.iter().map(Product::stock_value).sum(),
        }
    }
}

impl Exportable for Product {
    const FILE_STEM: &'static str = "products";
    const OPTIONS: ExportOptions = ExportOptions::SEMICOLON_DECIMAL_COMMA;

    fn headers() -> &'static [&'static str] {
        &[
            "ID", "SKU", "Name", "Brand", "Category", "Price", "Stock", "Status", "Rating",
        ]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            self.id.0.into(),
            self.sku.as_str().into(),
            self.name.as_str().into(),
            self.brand.as_str().into(),
            self.category.as_str().into(),
            self.price.into(),
            self.stock.into(),
            self.status.as_str().into(),
            self.rating.into(),
        ]
    }
}

/// Stock bucket offered by the stock filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockLevel {
    /// Between 1 and the low-stock threshold.
    Low,
    Out,
    Normal,
}

impl StockLevel {
    pub fn range(self) -> NumberRange {
        let threshold = f64::from(LOW_STOCK_THRESHOLD);
        match self {
            StockLevel::Low => NumberRange::bounded(
                "stock",
                Bound::Excluded(0.0),
                Bound::Excluded(threshold),
            ),
            StockLevel::Out => NumberRange::inclusive("stock", Some(0.0), Some(0.0)),
            StockLevel::Normal => NumberRange::inclusive("stock", Some(threshold), None),
        }
    }
}

impl FromStr for StockLevel {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(StockLevel::Low),
            "out" => Ok(StockLevel::Out),
            "normal" => Ok(StockLevel::Normal),
            other => Err(ValidationError::InvalidValue {
                field: "stock",
                value: other.to_string(),
            }),
        }
    }
}

/// Price bucket offered by the price filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceBand {
    /// Under 50.
    Low,
    /// 50 to 200 inclusive.
    Medium,
    /// Over 200.
    High,
}

impl PriceBand {
    pub fn range(self) -> NumberRange {
        match self {
            PriceBand::Low => {
                NumberRange::bounded("price", Bound::Unbounded, Bound::Excluded(50.0))
            }
            PriceBand::Medium => NumberRange::inclusive("price", Some(50.0), Some(200.0)),
            PriceBand::High => {
                NumberRange::bounded("price", Bound::Excluded(200.0), Bound::Unbounded)
            }
        }
    }
}

impl FromStr for PriceBand {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(PriceBand::Low),
            "medium" => Ok(PriceBand::Medium),
            "high" => Ok(PriceBand::High),
            other => Err(ValidationError::InvalidValue {
                field: "price",
                value: other.to_string(),
            }),
        }
    }
}

pub fn from_dummy(product: DummyProduct) -> Product {
    let id = ProductId(product.id);
    // Catalogue entries without a stock figure get a derived one in 0..100.
    let stock = product
        .stock
        .unwrap_or_else(|| below(product.id, 21, 100) as u32);
    Product {
        id,
        name: product.title,
        brand: product
            .brand
            .filter(|brand| !brand.trim().is_empty())
            .unwrap_or_else(|| "Unspecified".to_string()),
        category: product.category,
        price: product.price,
        stock,
        description: product.description,
        rating: product.rating.unwrap_or_default(),
        status: StockStatus::from_stock(stock),
        image: product
            .thumbnail
            .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string()),
        discount: product.discount_percentage.unwrap_or_default(),
        sku: sku_for(id),
    }
}

/// Unsaved product from the create form. The status follows the stock and
/// the SKU is derived from the id on `create`.
pub fn draft(
    name: impl Into<String>,
    brand: impl Into<String>,
    category: impl Into<String>,
    price: f64,
    stock: u32,
) -> Product {
    Product {
        id: ProductId(0),
        name: name.into(),
        brand: brand.into(),
        category: category.into(),
        price,
        stock,
        description: String::new(),
        rating: 4.0,
        status: StockStatus::from_stock(stock),
        image: PLACEHOLDER_IMAGE.to_string(),
        discount: 0.0,
        sku: String::new(),
    }
}

#[allow(clippy::too_many_arguments)]
fn product(
    id: i64,
    name: &str,
    brand: &str,
    category: &str,
    price: f64,
    stock: u32,
    description: &str,
    rating: f64,
    discount: f64,
    sku: &str,
) -> Product {
    Product {
        id: ProductId(id),
        name: name.into(),
        brand: brand.into(),
        category: category.into(),
        price,
        stock,
        description: description.into(),
        rating,
        status: StockStatus::from_stock(stock),
        image: PLACEHOLDER_IMAGE.into(),
        discount,
        sku: sku.into(),
    }
}

/// Flagship catalogue entries appended to every catalogue load.
pub fn local_products() -> Vec<Product> {
    vec![
        product(
            10001,
            "iPhone 14 Pro Max",
            "Apple",
            "electronics",
            1299.99,
            25,
            "High-end Apple smartphone with Dynamic Island display",
            4.8,
            0.0,
            "SKU-APPLE-001",
        ),
        product(
            10002,
            "MacBook Pro 16\"",
            "Apple",
            "electronics",
            2499.99,
            12,
            "Professional laptop with M2 Pro chip",
            4.9,
            5.0,
            "SKU-APPLE-002",
        ),
        product(
            10003,
            "T-shirt Logo Basic",
            "Nike",
            "clothing",
            29.99,
            150,
            "100% cotton T-shirt with embroidered logo",
            4.2,
            15.0,
            "SKU-NIKE-001",
        ),
    ]
}

pub fn fallback_products() -> Vec<Product> {
    vec![
        product(
            1,
            "Android Smartphone",
            "Samsung",
            "electronics",
            699.99,
            45,
            "Android smartphone with AMOLED display",
            4.5,
            10.0,
            "SKU-SAM-001",
        ),
        product(
            2,
            "Bluetooth Headset",
            "Sony",
            "electronics",
            199.99,
            8,
            "Wireless headset with noise cancelling",
            4.7,
            0.0,
            "SKU-SONY-001",
        ),
        product(
            3,
            "JavaScript Book",
            "O'Reilly",
            "books",
            39.99,
            0,
            "Complete guide to the JavaScript language",
            4.8,
            0.0,
            "SKU-BOOK-001",
        ),
    ]
}

/// Plain-text stock report over the whole catalogue.
pub fn stock_report(products: &[Product], at: NaiveDateTime) -> String {
    let low: Vec<&Product> = products
        .iter()
        .filter(|p| p.status == StockStatus::LowStock)
        .collect();
    let out: Vec<&Product> = products
        .iter()
        .filter(|p| p.status == StockStatus::OutOfStock)
        .collect();

    let mut report = String::from("=== STOCK REPORT ===\n\n");
    let _ = writeln!(report, "Date: {}", at.format("%d/%m/%Y"));
    let _ = writeln!(report, "Time: {}", at.format("%H:%M:%S"));
    report.push_str("\n--- STATISTICS ---\n");
    let _ = writeln!(report, "Total products: {}", products.len());
    let _ = writeln!(report, "Low stock (< {LOW_STOCK_THRESHOLD}): {}", low.len());
    let _ = writeln!(report, "Out of stock: {}", out.len());

    if !low.is_empty() {
        report.push_str("\n--- LOW STOCK ---\n");
        for p in &low {
            let _ = writeln!(report, "- {} ({}): {} units", p.name, p.sku, p.stock);
        }
    }
    if !out.is_empty() {
        report.push_str("\n--- OUT OF STOCK ---\n");
        for p in &out {
            let _ = writeln!(report, "- {} ({})", p.name, p.sku);
        }
    }
    report
}

/// `GET {dummyjson}/products?limit=50` plus the flagship entries.
#[derive(Debug, Clone)]
pub struct ProductsSource {
    http: HttpSource,
    base: Url,
}

impl ProductsSource {
    pub fn new(http: HttpSource, base: Url) -> Self {
        Self { http, base }
    }
}

#[async_trait]
impl DataSource<Product> for ProductsSource {
    async fn fetch(&self) -> Result<Vec<Product>, LoadError> {
        let url = endpoint(&self.base, "products", Some(PRODUCTS_LIMIT))?;
        let remote: Vec<DummyProduct> = self.http.get_list(&url, Some("products")).await?;
        info!(%url, count = remote.len(), "catalogue fetched");

        let mut products: Vec<Product> = remote.into_iter().map(from_dummy).collect();
        products.extend(local_products());
        Ok(products)
    }
}

#[cfg(test)]
#[path = "../tests/products_tests.rs"]
mod tests;
