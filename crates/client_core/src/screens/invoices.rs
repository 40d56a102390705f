use std::{borrow::Cow, collections::HashMap, fmt::Write as _, str::FromStr};

use async_trait::async_trait;
use chrono::{Datelike, Months, NaiveDate};
use shared::{
    domain::{
        Customer, CustomerId, Invoice, InvoiceId, InvoiceLine, InvoiceStatus, PaymentMethod,
    },
    error::{require, ListError, LoadError, ValidationError},
    protocol::PlaceholderUser,
};
use tracing::{info, warn};
use url::Url;

use super::{assign_customer, below, days_after, days_before, mix, pick, postal_address, weighted};
use crate::{
    controller::{ListController, RenderSink},
    export::{Cell, ExportOptions, Exportable},
    filter::DateRange,
    notice::Notice,
    record::Record,
    source::{endpoint, DataSource, HttpSource},
};

/// Number of invoices derived from the client directory.
pub const GENERATED_INVOICES: i64 = 30;
pub const PAYMENT_TERM_DAYS: u64 = 30;

const STATUS_ORDER: [InvoiceStatus; 5] = [
    InvoiceStatus::Draft,
    InvoiceStatus::Sent,
    InvoiceStatus::Paid,
    InvoiceStatus::Overdue,
    InvoiceStatus::Cancelled,
];
const STATUS_WEIGHTS: [u64; 5] = [1, 3, 4, 1, 1];
const VAT_RATES: [f64; 4] = [20.0, 10.0, 5.5, 2.1];
const PAYMENT_METHOD_DRAW: [PaymentMethod; 4] = [
    PaymentMethod::BankTransfer,
    PaymentMethod::CreditCard,
    PaymentMethod::Check,
    PaymentMethod::Cash,
];

#[derive(Debug, Clone, Default)]
pub struct InvoicePatch {
    pub due_date: Option<NaiveDate>,
    pub vat_rate: Option<f64>,
    pub status: Option<InvoiceStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceSummary {
    pub total: usize,
    /// Sent or overdue.
    pub unpaid: usize,
    pub paid: usize,
    /// Sum of invoice totals, cancelled invoices excluded.
    pub amount: f64,
    pub filtered_subtotal: f64,
    pub filtered_vat: f64,
    pub filtered_total: f64,
}

impl Record for Invoice {
    type Id = InvoiceId;
    type Patch = InvoicePatch;
    type Summary = InvoiceSummary;

    const KIND: &'static str = "invoice";

    fn id(&self) -> InvoiceId {
        self.id
    }

    fn set_id(&mut self, id: InvoiceId) {
        self.id = id;
        if self.invoice_number.trim().is_empty() {
            self.invoice_number = format!(
                "FAC-{:02}{:04}",
                self.invoice_date.year().rem_euclid(100),
                id.0 + 1000
            );
        }
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![
            self.invoice_number.as_str(),
            self.client_name.as_str(),
            self.client_company.as_str(),
            self.client_email.as_str(),
        ]
    }

    fn category(&self, key: &str) -> Option<Cow<'_, str>> {
        match key {
            "status" => Some(Cow::Borrowed(self.status.as_str())),
            "client" => Some(Cow::Owned(self.client_id.0.to_string())),
            "payment_method" => Some(Cow::Borrowed(self.payment_method.as_str())),
            _ => None,
        }
    }

    fn date(&self, key: &str) -> Option<NaiveDate> {
        match key {
            "invoice_date" => Some(self.invoice_date),
            "due_date" => Some(self.due_date),
            "payment_date" => self.payment_date,
            _ => None,
        }
    }

    fn number(&self, key: &str) -> Option<f64> {
        match key {
            "total" => Some(self.total),
            "subtotal" => Some(self.subtotal),
            _ => None,
        }
    }

    fn apply_patch(&mut self, patch: InvoicePatch) {
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(vat_rate) = patch.vat_rate {
            self.vat_rate = vat_rate;
            self.recompute_amounts();
        }
        if let Some(status) = patch.status {
            self.status = status;
            if status != InvoiceStatus::Paid {
                self.payment_date = None;
            }
        }
        if let Some(method) = patch.payment_method {
            self.payment_method = method;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require("invoice_number", &self.invoice_number)?;
        require("client_name", &self.client_name)?;
        if self.due_date < self.invoice_date {
            return Err(ValidationError::InvalidValue {
                field: "due_date",
                value: self.due_date.to_string(),
            });
        }
        // A paid invoice always carries its payment date.
        if self.status == InvoiceStatus::Paid && self.payment_date.is_none() {
            return Err(ValidationError::InvalidValue {
                field: "status",
                value: self.status.as_str().to_string(),
            });
        }
        if !self.vat_rate.is_finite() || self.vat_rate < 0.0 {
            return Err(ValidationError::InvalidValue {
                field: "vat_rate",
                value: self.vat_rate.to_string(),
            });
        }
        Ok(())
    }

    fn summarize(all: &[Self], filtered: &[Self]) -> InvoiceSummary {
        let billable = |i: &&Invoice| i.status != InvoiceStatus::Cancelled;
        InvoiceSummary {
            total: all.len(),
            unpaid: all.iter().filter(|i| i.status.is_unpaid()).count(),
            paid: all
                .iter()
                .filter(|i| i.status == InvoiceStatus::Paid)
                .count(),
            amount: all.iter().filter(billable).map(|i| i.total).sum(),
            filtered_subtotal: filtered.iter().filter(billable).map(|i| i.subtotal).sum(),
            filtered_vat: filtered.iter().filter(billable).map(|i| i.vat_amount).sum(),
            filtered_total: filtered.iter().filter(billable).map(|i| i.total).sum(),
        }
    }
}

impl Exportable for Invoice {
    const FILE_STEM: &'static str = "invoices";
    const OPTIONS: ExportOptions = ExportOptions::SEMICOLON_DECIMAL_COMMA;

    fn headers() -> &'static [&'static str] {
        &[
            "Number", "Client", "Date", "Due", "Subtotal", "VAT", "Total", "Status", "Paid on",
        ]
    }

    fn cells(&self) -> Vec<Cell> {
        vec![
            self.invoice_number.as_str().into(),
            self.client_company.as_str().into(),
            self.invoice_date.format("%Y-%m-%d").to_string().into(),
            self.due_date.format("%Y-%m-%d").to_string().into(),
            self.subtotal.into(),
            format!("{}%", self.vat_rate).into(),
            self.total.into(),
            self.status.as_str().into(),
            self.payment_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "Unpaid".to_string())
                .into(),
        ]
    }
}

/// Marks the invoice paid on `on`. Paying a paid invoice is refused.
pub fn settle(invoice: &mut Invoice, on: NaiveDate) -> Result<(), ValidationError> {
    if invoice.status == InvoiceStatus::Paid {
        return Err(ValidationError::AlreadyInState {
            id: invoice.id.0,
            state: "paid",
        });
    }
    invoice.status = InvoiceStatus::Paid;
    invoice.payment_date = Some(on);
    Ok(())
}

pub fn mark_paid<S: RenderSink<Invoice>>(
    controller: &mut ListController<Invoice, S>,
    id: InvoiceId,
    on: NaiveDate,
) -> Result<(), ListError> {
    controller.transition(id, |invoice| settle(invoice, on))?;
    let number = controller
        .find(id)
        .map(|invoice| invoice.invoice_number.clone())
        .unwrap_or_default();
    controller.push_notice(Notice::success(format!("invoice {number} marked as paid")));
    Ok(())
}

/// Preset invoice-date windows ending today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Today,
    Week,
    Month,
    Quarter,
    Year,
}

impl Period {
    /// Invoices dated from the start of the window onwards.
    pub fn range(self, today: NaiveDate) -> DateRange {
        let from = match self {
            Period::Today => today,
            Period::Week => days_before(today, 7),
            Period::Month => months_before(today, 1),
            Period::Quarter => months_before(today, 3),
            Period::Year => months_before(today, 12),
        };
        let to = (self == Period::Today).then_some(today);
        DateRange::new("invoice_date", Some(from), to)
    }
}

impl FromStr for Period {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "today" => Ok(Period::Today),
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "quarter" => Ok(Period::Quarter),
            "year" => Ok(Period::Year),
            other => Err(ValidationError::InvalidValue {
                field: "period",
                value: other.to_string(),
            }),
        }
    }
}

fn months_before(day: NaiveDate, months: u32) -> NaiveDate {
    day.checked_sub_months(Months::new(months)).unwrap_or(day)
}

pub fn tax_number_for(id: CustomerId) -> String {
    format!("FR{:09}", below(id.0, 51, 1_000_000_000))
}

pub fn client_from_placeholder(user: &PlaceholderUser) -> Customer {
    let id = CustomerId(user.id);
    Customer {
        id,
        name: user.name.clone(),
        email: user.email.clone(),
        phone: user.phone.clone().unwrap_or_default(),
        address: postal_address(&user.address),
        company: user.company.name.clone(),
        tax_number: tax_number_for(id),
    }
}

/// Label shown in the client picker.
pub fn client_label(client: &Customer) -> String {
    format!("{} - {}", client.company, client.name)
}

fn client(
    id: i64,
    name: &str,
    email: &str,
    phone: &str,
    address: &str,
    company: &str,
    tax_number: &str,
) -> Customer {
    Customer {
        id: CustomerId(id),
        name: name.into(),
        email: email.into(),
        phone: phone.into(),
        address: address.into(),
        company: company.into(),
        tax_number: tax_number.into(),
    }
}

pub fn local_clients() -> Vec<Customer> {
    vec![
        client(
            101,
            "Entreprise Client SARL",
            "facturation@entreprise.com",
            "01 11 22 33 44",
            "1 Avenue des Affaires, 75008 Paris",
            "Entreprise Client SARL",
            "FR123456789",
        ),
        client(
            102,
            "Particulier VIP",
            "vip@client.com",
            "06 99 88 77 66",
            "22 Rue du Luxe, 75016 Paris",
            "Independent",
            "FR987654321",
        ),
    ]
}

pub fn fallback_clients() -> Vec<Customer> {
    vec![client(
        1,
        "Client Entreprise",
        "client@entreprise.com",
        "01 23 45 67 89",
        "12 Rue de la Paix, 75001 Paris",
        "Entreprise Client SA",
        "FR123456789",
    )]
}

#[allow(clippy::too_many_arguments)]
fn billed(
    id: i64,
    number: String,
    client: &Customer,
    invoice_date: NaiveDate,
    due_date: NaiveDate,
    vat_rate: f64,
    line_items: Vec<InvoiceLine>,
    status: InvoiceStatus,
) -> Invoice {
    let mut invoice = Invoice {
        id: InvoiceId(id),
        invoice_number: number,
        client_id: client.id,
        client_name: client.name.clone(),
        client_email: client.email.clone(),
        client_address: client.address.clone(),
        client_company: client.company.clone(),
        client_tax_number: client.tax_number.clone(),
        invoice_date,
        due_date,
        subtotal: 0.0,
        vat_rate,
        vat_amount: 0.0,
        total: 0.0,
        status,
        payment_method: PaymentMethod::BankTransfer,
        payment_date: None,
        line_items,
        notes: String::new(),
    };
    invoice.recompute_amounts();
    invoice
}

/// Derives [`GENERATED_INVOICES`] invoices over `clients`, dated within the
/// 90 days before `today`. Overdue invoices fall due 15 days early.
pub fn generate_invoices(clients: &[Customer], today: NaiveDate) -> Vec<Invoice> {
    let year = today.year().rem_euclid(100);
    (1..=GENERATED_INVOICES)
        .filter_map(|seed| {
            let client = assign_customer(clients, seed)?;
            let status = STATUS_ORDER[weighted(&STATUS_WEIGHTS, seed, 1)];
            let invoice_date = days_before(today, below(seed, 2, 90));
            let mut due_date = days_after(invoice_date, PAYMENT_TERM_DAYS);
            if status == InvoiceStatus::Overdue {
                due_date = days_before(due_date, 15);
            }
            let line_count = below(seed, 3, 5) + 1;
            let line_items = (0..line_count)
                .map(|n| {
                    let line_seed = seed * 10 + n as i64;
                    InvoiceLine::new(
                        format!("Product/service {}", n + 1),
                        below(line_seed, 4, 10) as u32 + 1,
                        (below(line_seed, 5, 100) + 10) as f64,
                    )
                })
                .collect();

            let mut invoice = billed(
                seed,
                format!("FAC-{year:02}{seed:06}"),
                client,
                invoice_date,
                due_date,
                pick(&VAT_RATES, seed, 6),
                line_items,
                status,
            );
            invoice.payment_method = pick(&PAYMENT_METHOD_DRAW, seed, 7);
            if status == InvoiceStatus::Paid {
                invoice.payment_date =
                    Some(days_after(invoice_date, below(seed, 8, PAYMENT_TERM_DAYS + 1)));
            }
            if mix(seed, 9) % 10 >= 7 {
                invoice.notes = "Invoice with special notes".into();
            }
            Some(invoice)
        })
        .collect()
}

/// Unsaved draft invoice for `client` with the standard consulting lines.
pub fn new_invoice(
    client: &Customer,
    invoice_date: NaiveDate,
    due_date: NaiveDate,
    vat_rate: f64,
    notes: impl Into<String>,
) -> Invoice {
    let mut invoice = billed(
        0,
        String::new(),
        client,
        invoice_date,
        due_date,
        vat_rate,
        vec![
            InvoiceLine::new("Consulting service", 1, 1000.0),
            InvoiceLine::new("Technical support", 2, 250.0),
        ],
        InvoiceStatus::Draft,
    );
    invoice.notes = notes.into();
    invoice
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
}

/// Reference invoices appended to every load.
pub fn local_invoices() -> Vec<Invoice> {
    let clients = local_clients();
    let fallback = fallback_clients();

    let mut paid = billed(
        1001,
        "FAC-230001".into(),
        &clients[0],
        ymd(2023, 10, 1),
        ymd(2023, 10, 31),
        20.0,
        vec![InvoiceLine::new(
            "BackOffice application development",
            1,
            12999.99,
        )],
        InvoiceStatus::Paid,
    );
    paid.payment_date = Some(ymd(2023, 10, 15));
    paid.notes = "Development project invoice".into();

    let mut sent = billed(
        1002,
        "FAC-230002".into(),
        &clients[1],
        ymd(2023, 10, 15),
        ymd(2023, 11, 14),
        20.0,
        vec![
            InvoiceLine::new("Advanced JavaScript training", 1, 1499.99),
            InvoiceLine::new("Technical support, 1 month", 1, 1000.0),
        ],
        InvoiceStatus::Sent,
    );
    sent.payment_method = PaymentMethod::CreditCard;
    sent.notes = "Training and technical support".into();

    let mut overdue = billed(
        1003,
        "FAC-230003".into(),
        &fallback[0],
        ymd(2023, 9, 1),
        ymd(2023, 9, 30),
        20.0,
        vec![InvoiceLine::new("Monthly maintenance", 1, 499.99)],
        InvoiceStatus::Overdue,
    );
    overdue.notes = "Overdue invoice, follow up with client".into();

    vec![paid, sent, overdue]
}

pub fn fallback_invoices() -> Vec<Invoice> {
    let test_client = client(
        1,
        "Test Client",
        "test@client.com",
        "",
        "123 Rue Test, 75000 Paris",
        "Test Company",
        "FR123456789",
    );
    let mut invoice = billed(
        1,
        "FAC-230001".into(),
        &test_client,
        ymd(2023, 10, 1),
        ymd(2023, 10, 31),
        20.0,
        vec![InvoiceLine::new("Consulting service", 1, 1000.0)],
        InvoiceStatus::Paid,
    );
    invoice.payment_date = Some(ymd(2023, 10, 15));
    vec![invoice]
}

fn money(amount: f64) -> String {
    format!("{amount:.2} EUR")
}

/// Plain-text financial report over the whole ledger.
pub fn financial_report(invoices: &[Invoice], today: NaiveDate) -> String {
    let paid: Vec<&Invoice> = invoices
        .iter()
        .filter(|i| i.status == InvoiceStatus::Paid)
        .collect();
    let unpaid: Vec<&Invoice> = invoices.iter().filter(|i| i.status.is_unpaid()).collect();
    let drafts = invoices
        .iter()
        .filter(|i| i.status == InvoiceStatus::Draft)
        .count();

    let mut report = String::from("=== FINANCIAL REPORT ===\n\n");
    let _ = writeln!(report, "Date: {}", today.format("%d/%m/%Y"));
    report.push_str("\n--- OVERVIEW ---\n");
    let _ = writeln!(report, "Total invoices: {}", invoices.len());
    let _ = writeln!(report, "Paid invoices: {}", paid.len());
    let _ = writeln!(report, "Unpaid invoices: {}", unpaid.len());
    let _ = writeln!(report, "Draft invoices: {drafts}");

    let revenue: f64 = paid.iter().map(|i| i.total).sum();
    let outstanding: f64 = unpaid.iter().map(|i| i.total).sum();
    report.push_str("\n--- REVENUE ---\n");
    let _ = writeln!(report, "Collected: {}", money(revenue));
    let _ = writeln!(report, "Awaiting payment: {}", money(outstanding));

    if !unpaid.is_empty() {
        report.push_str("\n--- UNPAID INVOICES ---\n");
        for invoice in &unpaid {
            let late = (today - invoice.due_date).num_days();
            let _ = write!(
                report,
                "- {} - {}: {}",
                invoice.invoice_number,
                invoice.client_company,
                money(invoice.total)
            );
            if late > 0 {
                let _ = writeln!(report, " ({late} day(s) late)");
            } else {
                let _ = writeln!(report, " (due {})", invoice.due_date.format("%d/%m/%Y"));
            }
        }
    }

    report.push_str("\n--- TOP 5 CLIENTS ---\n");
    for (rank, (company, total)) in top_clients(&paid, 5).into_iter().enumerate() {
        let _ = writeln!(report, "{}. {company}: {}", rank + 1, money(total));
    }
    report
}

/// Paid totals per client, largest first.
fn top_clients(paid: &[&Invoice], limit: usize) -> Vec<(String, f64)> {
    let mut totals: HashMap<CustomerId, (String, f64)> = HashMap::new();
    for invoice in paid {
        let entry = totals
            .entry(invoice.client_id)
            .or_insert_with(|| (invoice.client_company.clone(), 0.0));
        entry.1 += invoice.total;
    }
    let mut ranked: Vec<(String, f64)> = totals.into_values().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(limit);
    ranked
}

/// Invoice clients from `/users`; invoices are derived from them.
#[derive(Debug, Clone)]
pub struct InvoicesSource {
    http: HttpSource,
    directory_base: Url,
    today: NaiveDate,
}

impl InvoicesSource {
    pub fn new(http: HttpSource, directory_base: Url, today: NaiveDate) -> Self {
        Self {
            http,
            directory_base,
            today,
        }
    }

    /// Directory clients plus the local ones; the fallback client list when
    /// the directory cannot be fetched.
    pub async fn clients(&self) -> Vec<Customer> {
        match self.fetch_directory().await {
            Ok(users) => {
                let mut clients: Vec<Customer> =
                    users.iter().map(client_from_placeholder).collect();
                clients.extend(local_clients());
                clients
            }
            Err(error) => {
                warn!(%error, "client directory unavailable; using fallback clients");
                fallback_clients()
            }
        }
    }

    async fn fetch_directory(&self) -> Result<Vec<PlaceholderUser>, LoadError> {
        let url = endpoint(&self.directory_base, "users", None)?;
        self.http.get_list(&url, Some("users")).await
    }
}

#[async_trait]
impl DataSource<Invoice> for InvoicesSource {
    async fn fetch(&self) -> Result<Vec<Invoice>, LoadError> {
        let clients = self.clients().await;
        let mut invoices = generate_invoices(&clients, self.today);
        info!(
            clients = clients.len(),
            count = invoices.len(),
            "invoices derived from client directory"
        );
        invoices.extend(local_invoices());
        Ok(invoices)
    }
}

#[cfg(test)]
#[path = "../tests/invoices_tests.rs"]
mod tests;
