use std::{fmt, hash::Hash};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Numeric identity shared by every back-office record.
pub trait RecordId: Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static {
    fn from_raw(raw: i64) -> Self;
    fn raw(self) -> i64;
}

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl RecordId for $name {
            fn from_raw(raw: i64) -> Self {
                Self(raw)
            }

            fn raw(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "#{}", self.0)
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(ProductId);
id_newtype!(OrderId);
id_newtype!(InvoiceId);
id_newtype!(CustomerId);

macro_rules! labeled_enum {
    ($name:ident, $field:literal { $($variant:ident => $label:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim().to_ascii_lowercase().as_str() {
                    $($label => Ok($name::$variant),)+
                    other => Err(ValidationError::InvalidValue {
                        field: $field,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

labeled_enum!(UserRole, "role" {
    Admin => "admin",
    Manager => "manager",
    User => "user",
});

labeled_enum!(UserStatus, "status" {
    Active => "active",
    Inactive => "inactive",
});

labeled_enum!(StockStatus, "status" {
    Available => "available",
    LowStock => "lowstock",
    OutOfStock => "outofstock",
});

labeled_enum!(OrderStatus, "status" {
    Pending => "pending",
    Processing => "processing",
    Shipped => "shipped",
    Delivered => "delivered",
    Cancelled => "cancelled",
});

labeled_enum!(PaymentStatus, "payment_status" {
    Paid => "paid",
    Pending => "pending",
    Failed => "failed",
});

labeled_enum!(PaymentMethod, "payment_method" {
    CreditCard => "credit_card",
    Paypal => "paypal",
    BankTransfer => "bank_transfer",
    Check => "check",
    Cash => "cash",
});

labeled_enum!(ShippingMethod, "shipping_method" {
    Standard => "standard",
    Express => "express",
    Priority => "priority",
});

labeled_enum!(InvoiceStatus, "status" {
    Draft => "draft",
    Sent => "sent",
    Paid => "paid",
    Overdue => "overdue",
    Cancelled => "cancelled",
});

/// Stock below this count is reported as low.
pub const LOW_STOCK_THRESHOLD: u32 = 10;

impl StockStatus {
    pub fn from_stock(stock: u32) -> Self {
        if stock == 0 {
            StockStatus::OutOfStock
        } else if stock < LOW_STOCK_THRESHOLD {
            StockStatus::LowStock
        } else {
            StockStatus::Available
        }
    }
}

impl InvoiceStatus {
    /// Sent and overdue invoices still expect a payment.
    pub fn is_unpaid(self) -> bool {
        matches!(self, InvoiceStatus::Sent | InvoiceStatus::Overdue)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub city: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub company: String,
    pub website: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub price: f64,
    pub stock: u32,
    pub description: String,
    pub rating: f64,
    pub status: StockStatus,
    pub image: String,
    pub discount: f64,
    pub sku: String,
}

impl Product {
    pub fn stock_value(&self) -> f64 {
        self.price * f64::from(self.stock)
    }
}

/// Directory entry used by the orders and invoices screens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub company: String,
    pub tax_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: i64,
    pub name: String,
    pub quantity: u32,
    pub price: f64,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub customer_address: String,
    pub date: NaiveDate,
    pub total: f64,
    pub discounted_total: f64,
    pub lines: Vec<OrderLine>,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub shipping_address: String,
    pub shipping_method: ShippingMethod,
    pub notes: String,
    pub tracking_number: Option<String>,
}

impl Order {
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|line| line.quantity).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub description: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub total: f64,
}

impl InvoiceLine {
    pub fn new(description: impl Into<String>, quantity: u32, unit_price: f64) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
            total: f64::from(quantity) * unit_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub invoice_number: String,
    pub client_id: CustomerId,
    pub client_name: String,
    pub client_email: String,
    pub client_address: String,
    pub client_company: String,
    pub client_tax_number: String,
    pub invoice_date: NaiveDate,
    pub due_date: NaiveDate,
    pub subtotal: f64,
    pub vat_rate: f64,
    pub vat_amount: f64,
    pub total: f64,
    pub status: InvoiceStatus,
    pub payment_method: PaymentMethod,
    pub payment_date: Option<NaiveDate>,
    pub line_items: Vec<InvoiceLine>,
    pub notes: String,
}

impl Invoice {
    /// Recomputes subtotal, tax and total from the line items and VAT rate.
    pub fn recompute_amounts(&mut self) {
        self.subtotal = self.line_items.iter().map(|line| line.total).sum();
        self.vat_amount = self.subtotal * self.vat_rate / 100.0;
        self.total = self.subtotal + self.vat_amount;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_status_follows_thresholds() {
        assert_eq!(StockStatus::from_stock(0), StockStatus::OutOfStock);
        assert_eq!(StockStatus::from_stock(9), StockStatus::LowStock);
        assert_eq!(StockStatus::from_stock(10), StockStatus::Available);
    }

    #[test]
    fn labeled_enums_parse_case_insensitively() {
        assert_eq!("Shipped".parse::<OrderStatus>(), Ok(OrderStatus::Shipped));
        assert_eq!(" lowstock ".parse::<StockStatus>(), Ok(StockStatus::LowStock));
        assert!(matches!(
            "archived".parse::<InvoiceStatus>(),
            Err(ValidationError::InvalidValue { field: "status", .. })
        ));
    }

    #[test]
    fn labeled_enums_serialize_as_labels() {
        let json = serde_json::to_string(&PaymentMethod::BankTransfer).expect("serialize");
        assert_eq!(json, "\"bank_transfer\"");
    }

    #[test]
    fn invoice_amounts_follow_lines_and_rate() {
        let mut invoice = Invoice {
            id: InvoiceId(1),
            invoice_number: "FAC-1".into(),
            client_id: CustomerId(1),
            client_name: "Client".into(),
            client_email: "client@example.com".into(),
            client_address: String::new(),
            client_company: "Client SA".into(),
            client_tax_number: "FR000000001".into(),
            invoice_date: NaiveDate::from_ymd_opt(2023, 10, 1).expect("date"),
            due_date: NaiveDate::from_ymd_opt(2023, 10, 31).expect("date"),
            subtotal: 0.0,
            vat_rate: 20.0,
            vat_amount: 0.0,
            total: 0.0,
            status: InvoiceStatus::Draft,
            payment_method: PaymentMethod::BankTransfer,
            payment_date: None,
            line_items: vec![
                InvoiceLine::new("Consulting", 1, 1000.0),
                InvoiceLine::new("Support", 2, 250.0),
            ],
            notes: String::new(),
        };
        invoice.recompute_amounts();
        assert_eq!(invoice.subtotal, 1500.0);
        assert_eq!(invoice.vat_amount, 300.0);
        assert_eq!(invoice.total, 1800.0);
    }
}
