use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use client_core::{
    export_delimited, export_file_name, load_settings, open_screen,
    screens::{
        invoices::{self, InvoicesSource, Period},
        orders::{self, OrdersSource},
        products::{self, PriceBand, ProductsSource, StockLevel},
        users::{self, UsersSource},
    },
    DataSource, DateRange, Exportable, FailingSource, HttpSource, ListController, NoticeLevel,
    Query, SessionFlag,
};
use shared::{
    domain::{InvoiceId, OrderId, OrderStatus, RecordId},
    error::LoadError,
};
use tracing::{debug, info, warn};

mod render;

use render::TerminalSink;

#[derive(Parser, Debug)]
#[command(name = "backoffice", about = "Browse the back-office list screens")]
struct Cli {
    /// Settings file; `backoffice.toml` is read when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Skip the network and start from the built-in data.
    #[arg(long, global = true)]
    offline: bool,
    /// Open the screen without an authenticated session.
    #[arg(long, global = true)]
    signed_out: bool,
    #[command(subcommand)]
    screen: Screen,
}

#[derive(Args, Debug, Clone)]
struct ListArgs {
    #[arg(long)]
    search: Option<String>,
    /// Exact-match category filter, e.g. `--filter status=active`.
    #[arg(long = "filter", value_parser = parse_key_value)]
    filters: Vec<(String, String)>,
    #[arg(long, default_value_t = 1)]
    page: usize,
    #[arg(long)]
    page_size: Option<usize>,
    /// Writes the filtered view into this directory.
    #[arg(long)]
    export: Option<PathBuf>,
    #[arg(long)]
    remove: Option<i64>,
}

#[derive(Subcommand, Debug)]
enum Screen {
    Users {
        #[command(flatten)]
        list: ListArgs,
    },
    Products {
        #[command(flatten)]
        list: ListArgs,
        #[arg(long)]
        stock: Option<StockLevel>,
        #[arg(long)]
        price: Option<PriceBand>,
        /// Prints the stock report for the full catalogue.
        #[arg(long)]
        report: bool,
    },
    Orders {
        #[command(flatten)]
        list: ListArgs,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        cancel: Option<i64>,
        /// `ID=STATUS`, e.g. `--set-status 1003=shipped`.
        #[arg(long, value_parser = parse_key_value)]
        set_status: Option<(String, String)>,
    },
    Invoices {
        #[command(flatten)]
        list: ListArgs,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long, conflicts_with_all = ["from", "to"])]
        period: Option<Period>,
        #[arg(long)]
        mark_paid: Option<i64>,
        /// Prints the financial report for all invoices.
        #[arg(long)]
        report: bool,
    },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.trim().is_empty() {
        return Err(format!("missing key in '{raw}'"));
    }
    Ok((key.trim().to_string(), value.trim().to_string()))
}

fn base_query(list: &ListArgs) -> Query {
    let mut query = Query::new();
    if let Some(search) = &list.search {
        query = query.search(search.clone());
    }
    for (key, value) in &list.filters {
        query = query.category(key.clone(), value.clone());
    }
    query
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let settings = load_settings(cli.config.as_deref())?;
    let endpoints = settings.endpoints()?;
    let http = HttpSource::new(settings.request_timeout());
    let gate = SessionFlag(!cli.signed_out);
    let today = Local::now().date_naive();
    info!(?endpoints, offline = cli.offline, "settings loaded");

    match cli.screen {
        Screen::Users { list } => {
            let mut controller = open_screen(
                &gate,
                list.page_size.unwrap_or(settings.page_size),
                users::fallback_users(),
                TerminalSink::default(),
            )?;
            let source = UsersSource::new(http, endpoints.json_placeholder);
            load(&mut controller, &source, cli.offline).await;
            remove(&mut controller, list.remove);
            show(&mut controller, base_query(&list), &list, today)?;
        }
        Screen::Products {
            list,
            stock,
            price,
            report,
        } => {
            let mut controller = open_screen(
                &gate,
                list.page_size.unwrap_or(settings.page_size),
                products::fallback_products(),
                TerminalSink::default(),
            )?;
            let source = ProductsSource::new(http, endpoints.dummy_json);
            load(&mut controller, &source, cli.offline).await;
            remove(&mut controller, list.remove);

            let mut query = base_query(&list);
            if let Some(level) = stock {
                query = query.number_range(level.range());
            }
            if let Some(band) = price {
                query = query.number_range(band.range());
            }
            show(&mut controller, query, &list, today)?;
            if report {
                println!(
                    "\n{}",
                    products::stock_report(controller.all_items(), Local::now().naive_local())
                );
            }
        }
        Screen::Orders {
            list,
            from,
            to,
            cancel,
            set_status,
        } => {
            let mut controller = open_screen(
                &gate,
                list.page_size.unwrap_or(settings.page_size),
                orders::fallback_orders(),
                TerminalSink::default(),
            )?;
            let source = OrdersSource::new(
                http,
                endpoints.json_placeholder,
                endpoints.dummy_json,
                today,
            );
            load(&mut controller, &source, cli.offline).await;
            remove(&mut controller, list.remove);

            if let Some(id) = cancel {
                if let Err(error) = orders::cancel(&mut controller, OrderId(id)) {
                    warn!(order = id, %error, "cancel refused");
                }
            }
            if let Some((id, status)) = set_status {
                let id: i64 = id
                    .parse()
                    .with_context(|| format!("invalid order id '{id}'"))?;
                let status: OrderStatus = status.parse()?;
                if let Err(error) = orders::set_status(&mut controller, OrderId(id), status) {
                    warn!(order = id, %error, "status change refused");
                }
            }

            let mut query = base_query(&list);
            if from.is_some() || to.is_some() {
                query = query.date_range(DateRange::new("date", from, to));
            }
            show(&mut controller, query, &list, today)?;
        }
        Screen::Invoices {
            list,
            from,
            to,
            period,
            mark_paid,
            report,
        } => {
            let mut controller = open_screen(
                &gate,
                list.page_size.unwrap_or(settings.page_size),
                invoices::fallback_invoices(),
                TerminalSink::default(),
            )?;
            let source = InvoicesSource::new(http, endpoints.json_placeholder, today);
            load(&mut controller, &source, cli.offline).await;
            remove(&mut controller, list.remove);

            if let Some(id) = mark_paid {
                if let Err(error) = invoices::mark_paid(&mut controller, InvoiceId(id), today) {
                    warn!(invoice = id, %error, "payment not recorded");
                }
            }

            let mut query = base_query(&list);
            if let Some(period) = period {
                query = query.date_range(period.range(today));
            } else if from.is_some() || to.is_some() {
                query = query.date_range(DateRange::new("invoice_date", from, to));
            }
            show(&mut controller, query, &list, today)?;
            if report {
                println!(
                    "\n{}",
                    invoices::financial_report(controller.all_items(), today)
                );
            }
        }
    }

    Ok(())
}

async fn load<T, D>(controller: &mut ListController<T, TerminalSink>, source: &D, offline: bool)
where
    T: Exportable,
    D: DataSource<T>,
{
    let offline_source = FailingSource::new(LoadError::Transport {
        url: "offline".to_string(),
        message: "network disabled by --offline".to_string(),
    });
    let source: &dyn DataSource<T> = if offline { &offline_source } else { source };
    if let Err(error) = controller.load(source).await {
        debug!(%error, "continuing with built-in data");
    }
}

fn remove<T: Exportable>(controller: &mut ListController<T, TerminalSink>, id: Option<i64>) {
    if let Some(id) = id {
        if let Err(error) = controller.remove(T::Id::from_raw(id)) {
            debug!(%error, "nothing removed");
        }
    }
}

/// Filters, pages, prints and optionally exports the screen.
fn show<T: Exportable>(
    controller: &mut ListController<T, TerminalSink>,
    query: Query,
    list: &ListArgs,
    today: NaiveDate,
) -> Result<()> {
    controller.apply_query(query);
    if list.page > 1 && !controller.go_to_page(list.page) {
        warn!(
            page = list.page,
            total_pages = controller.total_pages(),
            "page out of range; staying on page 1"
        );
    }

    for notice in controller.take_notices() {
        let tag = match notice.level {
            NoticeLevel::Success => "ok",
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        };
        eprintln!("[{tag}] {}", notice.message);
    }
    print!("{}", controller.sink().frame());

    if let Some(dir) = &list.export {
        let body = export_delimited(controller.filtered_items())?;
        let path = dir.join(export_file_name::<T>(today));
        fs::write(&path, body).with_context(|| format!("failed to write {}", path.display()))?;
        println!("\nExported {} row(s) to {}", controller.filtered_items().len(), path.display());
    }
    Ok(())
}
