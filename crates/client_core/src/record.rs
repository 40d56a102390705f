//! The contract every list-screen entity fulfils.

use std::{borrow::Cow, fmt};

use chrono::NaiveDate;
use shared::{domain::RecordId, error::ValidationError};

/// A record managed by a [`ListController`](crate::controller::ListController).
///
/// Field lookups are keyed by name so that one [`Query`](crate::filter::Query)
/// type can drive all four screens. A lookup returning `None` means the record
/// has no such field and fails any term naming it.
pub trait Record: Clone + Send + Sync + 'static {
    type Id: RecordId;
    /// Partial update merged into an existing record.
    type Patch;
    /// Aggregates refreshed after every mutation.
    type Summary: Default + Clone + fmt::Debug;

    /// Screen name used in logs and notices.
    const KIND: &'static str;

    fn id(&self) -> Self::Id;

    /// Assigns the id and fills any identifier derived from it.
    fn set_id(&mut self, id: Self::Id);

    /// Fields covered by free-text search.
    fn search_fields(&self) -> Vec<&str>;

    fn category(&self, _key: &str) -> Option<Cow<'_, str>> {
        None
    }

    fn date(&self, _key: &str) -> Option<NaiveDate> {
        None
    }

    fn number(&self, _key: &str) -> Option<f64> {
        None
    }

    fn apply_patch(&mut self, patch: Self::Patch);

    /// Required-field check run before a record enters or changes in the collection.
    fn validate(&self) -> Result<(), ValidationError>;

    fn summarize(all: &[Self], filtered: &[Self]) -> Self::Summary;
}

/// Next id for a collection: one past the current maximum, or 1 when empty.
pub fn next_id<T: Record>(items: &[T]) -> Result<T::Id, ValidationError> {
    let max = items.iter().map(|item| item.id().raw()).max().unwrap_or(0);
    max.checked_add(1)
        .map(T::Id::from_raw)
        .ok_or_else(|| ValidationError::InvalidValue {
            field: "id",
            value: max.to_string(),
        })
}
