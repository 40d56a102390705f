use std::borrow::Cow;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use shared::{
    domain::{
        Customer, CustomerId, Order, OrderId, OrderLine, OrderStatus, PaymentMethod,
        PaymentStatus, ShippingMethod,
    },
    error::{require, ListError, LoadError, ValidationError},
    protocol::{DummyCart, PlaceholderUser},
};
use tracing::{debug, info, warn};
use url::Url;

use super::{assign_customer, below, days_before, mix, pick, postal_address};
use crate::{
    controller::{ListController, RenderSink},
    export::{Cell, ExportOptions, Exportable},
    notice::Notice,
    record::Record,
    source::{endpoint, DataSource, HttpSource},
};

pub const CARTS_LIMIT: u32 = 20;

const STATUS_DRAW: [OrderStatus; 5] = [
    OrderStatus::Pending,
    OrderStatus::Processing,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
];
const PAYMENT_METHOD_DRAW: [PaymentMethod; 4] = [
    PaymentMethod::CreditCard,
    PaymentMethod::Paypal,
    PaymentMethod::BankTransfer,
    PaymentMethod::Cash,
];
const PAYMENT_STATUS_DRAW: [PaymentStatus; 3] =
    [PaymentStatus::Paid, PaymentStatus::Pending, PaymentStatus::Failed];
const SHIPPING_DRAW: [ShippingMethod; 3] = [
    ShippingMethod::Standard,
    ShippingMethod::Express,
    ShippingMethod::Priority,
];
const STREETS: [&str; 5] = [
    "Rue de la Paix",
    "Avenue des Champs",
    "Boulevard Haussmann",
    "Rue du Commerce",
    "Avenue de la République",
];
const CITIES: [(&str, &str); 6] = [
    ("Paris", "75000"),
    ("Lyon", "69000"),
    ("Marseille", "13000"),
    ("Toulouse", "31000"),
    ("Nice", "06000"),
    ("Nantes", "44000"),
];

#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub shipping_address: Option<String>,
    pub shipping_method: Option<ShippingMethod>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderSummary {
    pub total: usize,
    pub pending: usize,
    pub delivered: usize,
    /// Sum of order totals, cancelled orders excluded.
    pub revenue: f64,
}

impl Record for Order {
    type Id = OrderId;
    type Patch = OrderPatch;
    type Summary = OrderSummary;

    const KIND: &'static str = "order";

    fn id(&self) -> OrderId {
        self.id
    }

    fn set_id(&mut self, id: OrderId) {
        self.id = id;
        if self.order_number.trim().is_empty() {
            self.order_number = format!("CMD-{}{:04}", self.date.year(), id.0 + 1000);
        }
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.order_number.as_str(),
            self.customer_name.as_str(),
            self.customer_email.as_str(),
        ]
    }

    fn category(&self, key: &str) -> Option<Cow<'_, str>> {
        match key {
            "status" => Some(Cow::Borrowed(self.status.as_str())),
            "customer" => Some(Cow::Owned(self.customer_id.0.to_string())),
            "payment_status" => Some(Cow::Borrowed(self.payment_status.as_str())),
            _ => None,
        }
    }

    fn date(&self, key: &str) -> Option<NaiveDate> {
        (key == "date").then_some(self.date)
    }

    fn number(&self, key: &str) -> Option<f64> {
        (key == "total").then_some(self.total)
    }

    fn apply_patch(&mut self, patch: OrderPatch) {
        if let Some(status) = patch.status {
            apply_status(self, status);
        }
        if let Some(payment_status) = patch.payment_status {
            self.payment_status = payment_status;
        }
        if let Some(address) = patch.shipping_address {
            self.shipping_address = address;
        }
        if let Some(method) = patch.shipping_method {
            self.shipping_method = method;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("order_number", &self.order_number)?;
        require("customer_name", &self.customer_name)
    }

    fn summarize(all: &[Self], _filtered: &[Self]) -> OrderSummary {
        OrderSummary {
            total: all.len(),
            pending: all
                .iter()
                .filter(|o| o.status == OrderStatus::Pending)
                .count(),
            delivered: all
                .iter()
                .filter(|o| o.status == OrderStatus::Delivered)
                .count(),
            revenue: all
                .iter()
                .filter(|o| o.status != OrderStatus::Cancelled)
                .map(|o| o.total)
                .sum(),
        }
    }
}

impl Exportable for Order {
    const FILE_STEM: &'static str = "orders";
    const OPTIONS: ExportOptions = ExportOptions::SEMICOLON_DECIMAL_COMMA;

    fn headers() -> &'static [&'static str] {
        &["Number", "Customer", "Date", "Amount", "Status", "Payment", "Items"]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            self.order_number.as_str().into(),
            self.customer_name.as_str().into(),
            self.date.format("%Y-%m-%d").to_string().into(),
            self.total.into(),
            self.status.as_str().into(),
            self.payment_status.as_str().into(),
            self.item_count().into(),
        ]
    }
}

pub fn tracking_number_for(id: OrderId) -> String {
    format!("TRK{:06}", below(id.0, 31, 1_000_000))
}

/// Sets the status; an order moving to shipped without a tracking number gets one.
pub fn apply_status(order: &mut Order, status: OrderStatus) {
    order.status = status;
    if status == OrderStatus::Shipped && order.tracking_number.is_none() {
        order.tracking_number = Some(tracking_number_for(order.id));
    }
}

pub fn set_status<S: RenderSink<Order>>(
    controller: &mut ListController<Order, S>,
    id: OrderId,
    status: OrderStatus,
) -> Result<(), ListError> {
    controller.transition(id, |order| {
        apply_status(order, status);
        Ok(())
    })?;
    controller.push_notice(Notice::success(format!("order {id} is now {status}")));
    Ok(())
}

pub fn cancel<S: RenderSink<Order>>(
    controller: &mut ListController<Order, S>,
    id: OrderId,
) -> Result<(), ListError> {
    controller.transition(id, |order| {
        if order.status == OrderStatus::Cancelled {
            return Err(ValidationError::AlreadyInState {
                id: order.id.0,
                state: "cancelled",
            });
        }
        order.status = OrderStatus::Cancelled;
        Ok(())
    })?;
    controller.push_notice(Notice::success(format!("order {id} cancelled")));
    Ok(())
}

/// Distinct customers appearing in `orders`, first appearance first.
pub fn customer_options(orders: &[Order]) -> Vec<(CustomerId, String)> {
    let mut options: Vec<(CustomerId, String)> = Vec::new();
    for order in orders {
        if !options.iter().any(|(id, _)| *id == order.customer_id) {
            options.push((order.customer_id, order.customer_name.clone()));
        }
    }
    options
}

pub fn customer_from_placeholder(user: &PlaceholderUser) -> Customer {
    Customer {
        id: CustomerId(user.id),
        name: user.name.clone(),
        email: user.email.clone(),
        phone: user.phone.clone().unwrap_or_default(),
        address: postal_address(&user.address),
        company: user.company.name.clone(),
        tax_number: String::new(),
    }
}

fn customer(id: i64, name: &str, email: &str, phone: &str, address: &str) -> Customer {
    Customer {
        id: CustomerId(id),
        name: name.into(),
        email: email.into(),
        phone: phone.into(),
        address: address.into(),
        company: String::new(),
        tax_number: String::new(),
    }
}

pub fn local_customers() -> Vec<Customer> {
    vec![
        customer(
            101,
            "Client Entreprise",
            "entreprise@client.com",
            "01 11 22 33 44",
            "1 Avenue des Affaires, 75008 Paris",
        ),
        customer(
            102,
            "Particulier VIP",
            "vip@client.com",
            "06 99 88 77 66",
            "22 Rue du Luxe, 75016 Paris",
        ),
    ]
}

/// Customer directory used when the directory endpoint is unreachable.
pub fn fallback_customers() -> Vec<Customer> {
    vec![
        customer(
            1,
            "Jean Dupont",
            "jean@email.com",
            "01 23 45 67 89",
            "12 Rue de la Paix, Paris",
        ),
        customer(
            2,
            "Marie Martin",
            "marie@email.com",
            "06 12 34 56 78",
            "45 Avenue des Champs, Lyon",
        ),
        customer(
            3,
            "Pierre Leroy",
            "pierre@email.com",
            "04 98 76 54 32",
            "78 Boulevard Maritime, Marseille",
        ),
    ]
}

fn shipping_address_for(seed: i64) -> String {
    let street = pick(&STREETS, seed, 41);
    let (city, zipcode) = pick(&CITIES, seed, 42);
    format!("{} {street}, {zipcode} {city}", below(seed, 43, 100) + 1)
}

/// Builds an order from a cart, attributing it to `customer` and dating it
/// within the 30 days before `today`.
pub fn from_cart(cart: DummyCart, customer: &Customer, today: NaiveDate) -> Order {
    let seed = cart.id;
    let status = pick(&STATUS_DRAW, seed, 1);
    let tracking_number = matches!(status, OrderStatus::Shipped | OrderStatus::Delivered)
        .then(|| tracking_number_for(OrderId(seed)));
    Order {
        id: OrderId(seed),
        order_number: format!("CMD-{:06}", seed + 1000),
        customer_id: customer.id,
        customer_name: customer.name.clone(),
        customer_email: customer.email.clone(),
        customer_phone: customer.phone.clone(),
        customer_address: customer.address.clone(),
        date: days_before(today, below(seed, 2, 30)),
        total: cart.total,
        discounted_total: cart.discounted_total.unwrap_or(cart.total),
        lines: cart
            .products
            .into_iter()
            .map(|p| OrderLine {
                product_id: p.id,
                name: p.title.unwrap_or_else(|| format!("Product {}", p.id)),
                quantity: p.quantity,
                price: p.price,
                total: p.total,
            })
            .collect(),
        status,
        payment_method: pick(&PAYMENT_METHOD_DRAW, seed, 3),
        payment_status: pick(&PAYMENT_STATUS_DRAW, seed, 4),
        shipping_address: shipping_address_for(seed),
        shipping_method: pick(&SHIPPING_DRAW, seed, 5),
        notes: if mix(seed, 6) % 10 >= 7 {
            "Special order with handling instructions".to_string()
        } else {
            String::new()
        },
        tracking_number,
    }
}

/// Unsaved manual order for `customer`, dated `today`.
pub fn new_order(customer: &Customer, today: NaiveDate) -> Order {
    let line = OrderLine {
        product_id: 1,
        name: "New product".into(),
        quantity: 1,
        price: 99.99,
        total: 99.99,
    };
    Order {
        id: OrderId(0),
        order_number: String::new(),
        customer_id: customer.id,
        customer_name: customer.name.clone(),
        customer_email: customer.email.clone(),
        customer_phone: customer.phone.clone(),
        customer_address: customer.address.clone(),
        date: today,
        total: line.total,
        discounted_total: line.total,
        lines: vec![line],
        status: OrderStatus::Pending,
        payment_method: PaymentMethod::CreditCard,
        payment_status: PaymentStatus::Pending,
        shipping_address: customer.address.clone(),
        shipping_method: ShippingMethod::Standard,
        notes: "Order created manually".into(),
        tracking_number: None,
    }
}

fn line(product_id: i64, name: &str, quantity: u32, price: f64, total: f64) -> OrderLine {
    OrderLine {
        product_id,
        name: name.into(),
        quantity,
        price,
        total,
    }
}

#[allow(clippy::too_many_arguments)]
fn reference_order(
    id: i64,
    number: &str,
    customer: &Customer,
    date: NaiveDate,
    (total, discounted_total): (f64, f64),
    lines: Vec<OrderLine>,
    status: OrderStatus,
    payment: (PaymentMethod, PaymentStatus),
    shipping_method: ShippingMethod,
    notes: &str,
    tracking_number: Option<&str>,
) -> Order {
    Order {
        id: OrderId(id),
        order_number: number.into(),
        customer_id: customer.id,
        customer_name: customer.name.clone(),
        customer_email: customer.email.clone(),
        customer_phone: customer.phone.clone(),
        customer_address: customer.address.clone(),
        date,
        total,
        discounted_total,
        lines,
        status,
        payment_method: payment.0,
        payment_status: payment.1,
        shipping_address: customer.address.clone(),
        shipping_method,
        notes: notes.into(),
        tracking_number: tracking_number.map(str::to_string),
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

/// Reference orders appended to every order load.
pub fn local_orders() -> Vec<Order> {
    vec![
        reference_order(
            1001,
            "CMD-2023001",
            &customer(
                1,
                "Jean Dupont",
                "jean.dupont@email.com",
                "01 23 45 67 89",
                "12 Rue de la Paix, 75001 Paris",
            ),
            ymd(2023, 10, 15),
            (299.99, 269.99),
            vec![line(1, "Android Smartphone", 1, 299.99, 299.99)],
            OrderStatus::Delivered,
            (PaymentMethod::CreditCard, PaymentStatus::Paid),
            ShippingMethod::Express,
            "",
            Some("TRK123456"),
        ),
        reference_order(
            1002,
            "CMD-2023002",
            &customer(
                2,
                "Marie Martin",
                "marie.martin@email.com",
                "06 12 34 56 78",
                "45 Avenue des Champs, 69000 Lyon",
            ),
            ymd(2023, 10, 20),
            (549.50, 494.55),
            vec![
                line(2, "Bluetooth Headset", 1, 199.99, 199.99),
                line(3, "JavaScript Book", 2, 39.99, 79.98),
                line(4, "Logo T-shirt", 3, 29.99, 89.97),
            ],
            OrderStatus::Processing,
            (PaymentMethod::Paypal, PaymentStatus::Pending),
            ShippingMethod::Standard,
            "Deliver to pickup point",
            None,
        ),
        reference_order(
            1003,
            "CMD-2023003",
            &customer(
                3,
                "Pierre Leroy",
                "pierre.leroy@email.com",
                "04 98 76 54 32",
                "78 Boulevard Maritime, 13000 Marseille",
            ),
            ymd(2023, 10, 25),
            (1299.99, 1169.99),
            vec![line(5, "iPhone 14 Pro", 1, 1299.99, 1299.99)],
            OrderStatus::Pending,
            (PaymentMethod::BankTransfer, PaymentStatus::Pending),
            ShippingMethod::Priority,
            "Birthday present",
            None,
        ),
    ]
}

pub fn fallback_orders() -> Vec<Order> {
    vec![reference_order(
        1,
        "CMD-20231001",
        &customer(
            1,
            "Test Customer",
            "test@email.com",
            "01 11 22 33 44",
            "123 Rue Test, 75000 Paris",
        ),
        ymd(2023, 10, 1),
        (149.99, 134.99),
        vec![
            line(1, "Product A", 2, 49.99, 99.98),
            line(2, "Product B", 1, 50.0, 50.0),
        ],
        OrderStatus::Delivered,
        (PaymentMethod::CreditCard, PaymentStatus::Paid),
        ShippingMethod::Standard,
        "",
        Some("TRK000001"),
    )]
}

/// Customer directory from `/users`, then carts from `/carts?limit=20`.
#[derive(Debug, Clone)]
pub struct OrdersSource {
    http: HttpSource,
    directory_base: Url,
    carts_base: Url,
    today: NaiveDate,
}

impl OrdersSource {
    pub fn new(http: HttpSource, directory_base: Url, carts_base: Url, today: NaiveDate) -> Self {
        Self {
            http,
            directory_base,
            carts_base,
            today,
        }
    }

    /// Directory customers plus the local ones; the fallback directory when
    /// the directory cannot be fetched.
    pub async fn customers(&self) -> Vec<Customer> {
        match self.fetch_directory().await {
            Ok(users) => {
                let mut customers: Vec<Customer> =
                    users.iter().map(customer_from_placeholder).collect();
                customers.extend(local_customers());
                customers
            }
            Err(error) => {
                warn!(%error, "customer directory unavailable; using fallback customers");
                fallback_customers()
            }
        }
    }

    async fn fetch_directory(&self) -> Result<Vec<PlaceholderUser>, LoadError> {
        let url = endpoint(&self.directory_base, "users", None)?;
        self.http.get_list(&url, Some("users")).await
    }
}

#[async_trait]
impl DataSource<Order> for OrdersSource {
    async fn fetch(&self) -> Result<Vec<Order>, LoadError> {
        let customers = self.customers().await;
        let url = endpoint(&self.carts_base, "carts", Some(CARTS_LIMIT))?;
        let carts: Vec<DummyCart> = self.http.get_list(&url, Some("carts")).await?;
        info!(%url, count = carts.len(), customers = customers.len(), "carts fetched");

        let fallback = fallback_customers();
        let directory = if customers.is_empty() { &fallback } else { &customers };
        let before = carts.len();
        let carts: Vec<DummyCart> = carts
            .into_iter()
            .filter(|cart| !cart.products.is_empty())
            .collect();
        if carts.len() != before {
            debug!(skipped = before - carts.len(), "empty carts skipped");
        }
        let mut orders: Vec<Order> = carts
            .into_iter()
            .filter_map(|cart| {
                let customer = assign_customer(directory, cart.id)?;
                Some(from_cart(cart, customer, self.today))
            })
            .collect();
        orders.extend(local_orders());
        Ok(orders)
    }
}

#[cfg(test)]
#[path = "../tests/orders_tests.rs"]
mod tests;
