//! Filter / paginate / render state for one list screen.

use std::sync::Arc;

use shared::{
    domain::RecordId,
    error::{ErrorCode, ListError, LoadError, NotFoundError, ValidationError},
};
use tracing::{debug, info, warn};

use crate::{
    filter::Query,
    notice::Notice,
    record::{next_id, Record},
    source::DataSource,
};

pub const DEFAULT_PAGE_SIZE: usize = 10;

pub type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Row window of the current page, 1-based. `start_row` is 0 for an empty view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageStats {
    pub start_row: usize,
    pub end_row: usize,
    pub total_rows: usize,
}

/// Receives the output of every state transition; the controller never formats rows itself.
pub trait RenderSink<T: Record> {
    fn render_table(&mut self, rows: &[T]);
    fn render_pagination(&mut self, current_page: usize, total_pages: usize);
    fn render_stats(&mut self, page: &PageStats, summary: &T::Summary);
}

/// Sink for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl<T: Record> RenderSink<T> for NullSink {
    fn render_table(&mut self, _rows: &[T]) {}
    fn render_pagination(&mut self, _current_page: usize, _total_pages: usize) {}
    fn render_stats(&mut self, _page: &PageStats, _summary: &T::Summary) {}
}

pub struct ListController<T: Record, S: RenderSink<T> = NullSink> {
    all_items: Vec<T>,
    filtered_items: Vec<T>,
    current_page: usize,
    page_size: usize,
    predicate: Option<Predicate<T>>,
    fallback: Vec<T>,
    notices: Vec<Notice>,
    sink: S,
}

impl<T: Record> ListController<T> {
    pub fn headless(page_size: usize, fallback: Vec<T>) -> Self {
        Self::new(page_size, fallback, NullSink)
    }
}

impl<T: Record, S: RenderSink<T>> ListController<T, S> {
    pub fn new(page_size: usize, fallback: Vec<T>, sink: S) -> Self {
        Self {
            all_items: Vec::new(),
            filtered_items: Vec::new(),
            current_page: 1,
            page_size: page_size.max(1),
            predicate: None,
            fallback,
            notices: Vec::new(),
            sink,
        }
    }

    /// Replaces the collection from `source`. A failed fetch installs the
    /// fallback seed set, records one warning and hands the error back; the
    /// screen stays usable either way.
    pub async fn load<D>(&mut self, source: &D) -> Result<usize, LoadError>
    where
        D: DataSource<T> + ?Sized,
    {
        let outcome = match source.fetch().await {
            Ok(items) => {
                info!(screen = T::KIND, count = items.len(), "collection loaded");
                self.all_items = dedupe_ids(items);
                Ok(self.all_items.len())
            }
            Err(error) => {
                warn!(screen = T::KIND, %error, "load failed; using fallback seed data");
                self.all_items = dedupe_ids(self.fallback.clone());
                self.notices.push(Notice::warning(
                    ErrorCode::Load,
                    format!("Could not load {}: {error}. Showing fallback data.", T::KIND),
                ));
                Err(error)
            }
        };
        self.predicate = None;
        self.current_page = 1;
        self.refresh();
        outcome
    }

    /// Re-derives the filtered view from the full collection and returns to page 1.
    pub fn apply_filters<P>(&mut self, predicate: P)
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Arc::new(predicate));
        self.current_page = 1;
        self.refresh();
    }

    pub fn apply_query(&mut self, query: Query) {
        if query.is_empty() {
            self.clear_filters();
        } else {
            self.apply_filters(query.into_predicate());
        }
    }

    pub fn clear_filters(&mut self) {
        self.predicate = None;
        self.current_page = 1;
        self.refresh();
    }

    pub fn page(&self) -> &[T] {
        let (start, end) = self.page_bounds();
        &self.filtered_items[start..end]
    }

    /// Moves to page `n`; out-of-range requests leave the state untouched.
    pub fn go_to_page(&mut self, n: usize) -> bool {
        if n < 1 || n > self.total_pages() {
            return false;
        }
        self.current_page = n;
        self.render();
        true
    }

    /// Always at least 1: an empty view is a single empty page.
    pub fn total_pages(&self) -> usize {
        self.filtered_items.len().div_ceil(self.page_size).max(1)
    }

    /// Adds `item` at the head of the collection under a fresh id. Filters are
    /// cleared so the new record is visible on page 1.
    pub fn create(&mut self, mut item: T) -> Result<T::Id, ValidationError> {
        let id = next_id(&self.all_items)?;
        item.set_id(id);
        item.validate()?;

        self.all_items.insert(0, item);
        self.predicate = None;
        self.current_page = 1;
        self.refresh();

        debug!(screen = T::KIND, id = id.raw(), "record created");
        self.notices
            .push(Notice::success(format!("{} {id} created", T::KIND)));
        Ok(id)
    }

    pub fn update(&mut self, id: T::Id, patch: T::Patch) -> Result<(), ListError> {
        self.transition(id, |record| {
            record.apply_patch(patch);
            Ok(())
        })?;
        self.notices
            .push(Notice::success(format!("{} {id} updated", T::KIND)));
        Ok(())
    }

    /// Applies `change` to a copy of the record and commits it only if both the
    /// change and the record's validation succeed. A refusal is also recorded
    /// as an error notice.
    pub fn transition<F>(&mut self, id: T::Id, change: F) -> Result<(), ListError>
    where
        F: FnOnce(&mut T) -> Result<(), ValidationError>,
    {
        let Some(index) = self.position(id) else {
            return Err(self.not_found(id).into());
        };

        let mut candidate = self.all_items[index].clone();
        let checked = change(&mut candidate).and_then(|()| {
            candidate.set_id(id);
            candidate.validate()
        });
        if let Err(error) = checked {
            let error = ListError::from(error);
            debug!(screen = T::KIND, id = id.raw(), %error, "change refused");
            self.notices.push(Notice::error(&error));
            return Err(error);
        }

        self.all_items[index] = candidate;
        self.refresh();
        debug!(screen = T::KIND, id = id.raw(), "record changed");
        Ok(())
    }

    pub fn remove(&mut self, id: T::Id) -> Result<T, NotFoundError> {
        let Some(index) = self.position(id) else {
            return Err(self.not_found(id));
        };
        let removed = self.all_items.remove(index);
        self.refresh();

        debug!(screen = T::KIND, id = id.raw(), "record removed");
        self.notices
            .push(Notice::success(format!("{} {id} removed", T::KIND)));
        Ok(removed)
    }

    pub fn find(&self, id: T::Id) -> Option<&T> {
        self.all_items.iter().find(|item| item.id() == id)
    }

    pub fn page_stats(&self) -> PageStats {
        let (start, end) = self.page_bounds();
        PageStats {
            start_row: if start == end { 0 } else { start + 1 },
            end_row: end,
            total_rows: self.filtered_items.len(),
        }
    }

    pub fn summary(&self) -> T::Summary {
        T::summarize(&self.all_items, &self.filtered_items)
    }

    pub fn all_items(&self) -> &[T] {
        &self.all_items
    }

    pub fn filtered_items(&self) -> &[T] {
        &self.filtered_items
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn is_filtered(&self) -> bool {
        self.predicate.is_some()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    fn position(&self, id: T::Id) -> Option<usize> {
        self.all_items.iter().position(|item| item.id() == id)
    }

    fn not_found(&mut self, id: T::Id) -> NotFoundError {
        let error = NotFoundError { id: id.raw() };
        warn!(screen = T::KIND, id = id.raw(), "mutation target missing");
        self.notices.push(Notice::error(&ListError::from(error)));
        error
    }

    fn page_bounds(&self) -> (usize, usize) {
        let len = self.filtered_items.len();
        let start = (self.current_page - 1)
            .saturating_mul(self.page_size)
            .min(len);
        let end = start.saturating_add(self.page_size).min(len);
        (start, end)
    }

    /// Recompute view, clamp page, then render table, pagination and stats.
    fn refresh(&mut self) {
        self.filtered_items = match &self.predicate {
            Some(predicate) => self
                .all_items
                .iter()
                .filter(|item| predicate(*item))
                .cloned()
                .collect(),
            None => self.all_items.clone(),
        };
        self.current_page = self.current_page.clamp(1, self.total_pages());
        self.render();
    }

    fn render(&mut self) {
        let (start, end) = self.page_bounds();
        let stats = self.page_stats();
        let total_pages = self.total_pages();
        let summary = T::summarize(&self.all_items, &self.filtered_items);

        self.sink.render_table(&self.filtered_items[start..end]);
        self.sink
            .render_pagination(self.current_page, total_pages);
        self.sink.render_stats(&stats, &summary);
    }
}

/// Keeps the first record seen for each id.
fn dedupe_ids<T: Record>(items: Vec<T>) -> Vec<T> {
    let mut seen = std::collections::HashSet::new();
    let before = items.len();
    let unique: Vec<T> = items
        .into_iter()
        .filter(|item| seen.insert(item.id()))
        .collect();
    if unique.len() != before {
        warn!(
            screen = T::KIND,
            dropped = before - unique.len(),
            "dropped records with duplicate ids"
        );
    }
    unique
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
