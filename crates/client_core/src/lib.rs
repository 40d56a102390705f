//! Client-side list screens for the back-office: fetch a collection once,
//! then filter, paginate, mutate and render it locally.

pub mod config;
pub mod controller;
pub mod export;
pub mod filter;
pub mod notice;
pub mod record;
pub mod screens;
pub mod session;
pub mod source;

pub use config::{load_settings, Endpoints, Settings};
pub use controller::{
    ListController, NullSink, PageStats, Predicate, RenderSink, DEFAULT_PAGE_SIZE,
};
pub use export::{export_delimited, export_file_name, Cell, ExportOptions, Exportable};
pub use filter::{DateRange, NumberRange, Query};
pub use notice::{Notice, NoticeLevel};
pub use record::Record;
pub use session::{open_screen, SessionFlag, SessionGate};
pub use source::{DataSource, FailingSource, HttpSource, StaticSource};
