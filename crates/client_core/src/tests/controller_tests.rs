use std::borrow::Cow;

use shared::domain::ProductId;

use super::*;
use crate::{
    notice::NoticeLevel,
    source::{FailingSource, StaticSource},
};

#[derive(Debug, Clone, PartialEq)]
struct Item {
    id: ProductId,
    name: String,
    group: String,
}

#[derive(Debug, Default)]
struct ItemPatch {
    name: Option<String>,
    group: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct ItemSummary {
    total: usize,
    shown: usize,
}

impl Record for Item {
    type Id = ProductId;
    type Patch = ItemPatch;
    type Summary = ItemSummary;

    const KIND: &'static str = "item";

    fn id(&self) -> ProductId {
        self.id
    }

    fn set_id(&mut self, id: ProductId) {
        self.id = id;
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.name.as_str()]
    }

    fn category(&self, key: &str) -> Option<Cow<'_, str>> {
        (key == "group").then(|| Cow::Borrowed(self.group.as_str()))
    }

    fn apply_patch(&mut self, patch: ItemPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(group) = patch.group {
            self.group = group;
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        shared::error::require("name", &self.name)
    }

    fn summarize(all: &[Self], filtered: &[Self]) -> ItemSummary {
        ItemSummary {
            total: all.len(),
            shown: filtered.len(),
        }
    }
}

fn item(id: i64) -> Item {
    Item {
        id: ProductId(id),
        name: format!("item {id}"),
        group: if id % 2 == 0 { "even" } else { "odd" }.into(),
    }
}

fn items(n: i64) -> Vec<Item> {
    (1..=n).map(item).collect()
}

async fn loaded(n: i64) -> ListController<Item> {
    let mut controller = ListController::headless(10, Vec::new());
    controller
        .load(&StaticSource::new(items(n)))
        .await
        .expect("static load");
    controller
}

fn assert_page_in_bounds<S: RenderSink<Item>>(controller: &ListController<Item, S>) {
    let total = controller.total_pages();
    assert!(controller.current_page() >= 1);
    assert!(controller.current_page() <= total);
}

#[derive(Debug, Default)]
struct RecordingSink {
    calls: Vec<String>,
    last_rows: Vec<i64>,
    last_stats: Option<(PageStats, ItemSummary)>,
}

impl RenderSink<Item> for RecordingSink {
    fn render_table(&mut self, rows: &[Item]) {
        self.calls.push("table".into());
        self.last_rows = rows.iter().map(|row| row.id.0).collect();
    }

    fn render_pagination(&mut self, current_page: usize, total_pages: usize) {
        self.calls.push(format!("pagination {current_page}/{total_pages}"));
    }

    fn render_stats(&mut self, page: &PageStats, summary: &ItemSummary) {
        self.calls.push("stats".into());
        self.last_stats = Some((*page, summary.clone()));
    }
}

#[tokio::test]
async fn twenty_five_items_split_into_three_pages() {
    let mut controller = loaded(25).await;

    assert_eq!(controller.total_pages(), 3);
    assert_eq!(controller.current_page(), 1);
    assert_eq!(controller.page().len(), 10);

    assert!(controller.go_to_page(3));
    let ids: Vec<i64> = controller.page().iter().map(|i| i.id.0).collect();
    assert_eq!(ids, vec![21, 22, 23, 24, 25]);
    assert_eq!(
        controller.page_stats(),
        PageStats {
            start_row: 21,
            end_row: 25,
            total_rows: 25
        }
    );
}

#[tokio::test]
async fn out_of_range_pages_are_ignored() {
    let mut controller = loaded(25).await;
    assert!(controller.go_to_page(2));

    assert!(!controller.go_to_page(0));
    assert!(!controller.go_to_page(4));
    assert_eq!(controller.current_page(), 2);
}

#[tokio::test]
async fn removing_the_last_row_of_the_last_page_steps_back() {
    let mut controller = loaded(21).await;
    assert!(controller.go_to_page(3));
    assert_eq!(controller.page().len(), 1);

    controller.remove(ProductId(21)).expect("remove last row");

    assert_eq!(controller.total_pages(), 2);
    assert_eq!(controller.current_page(), 2);
    assert_eq!(controller.page().len(), 10);
}

#[tokio::test]
async fn second_remove_reports_not_found_and_keeps_data() {
    let mut controller = loaded(5).await;
    controller.remove(ProductId(3)).expect("first remove");
    let before = controller.all_items().to_vec();

    let err = controller.remove(ProductId(3)).expect_err("second remove");

    assert_eq!(err, NotFoundError { id: 3 });
    assert_eq!(controller.all_items(), before.as_slice());
    let last = controller.notices().last().expect("notice");
    assert_eq!(last.level, NoticeLevel::Error);
    assert_eq!(last.code, Some(ErrorCode::NotFound));
}

#[tokio::test]
async fn create_assigns_next_id_and_shows_record_first() {
    let mut controller = loaded(12).await;
    controller.apply_filters(|item: &Item| item.group == "odd");
    assert!(controller.is_filtered());

    let mut draft = item(0);
    draft.name = "fresh".into();
    let id = controller.create(draft).expect("create");

    assert_eq!(id, ProductId(13));
    assert!(!controller.is_filtered());
    assert_eq!(controller.current_page(), 1);
    assert_eq!(controller.page()[0].id, id);
    assert_eq!(controller.filtered_items(), controller.all_items());
}

#[tokio::test]
async fn create_on_an_empty_collection_starts_at_one() {
    let mut controller: ListController<Item> = ListController::headless(10, Vec::new());
    let id = controller.create(item(0)).expect("create");
    assert_eq!(id, ProductId(1));
}

#[tokio::test]
async fn create_rejects_missing_required_fields() {
    let mut controller = loaded(3).await;
    let mut draft = item(0);
    draft.name = "   ".into();

    let err = controller.create(draft).expect_err("blank name");

    assert_eq!(err, ValidationError::MissingField { field: "name" });
    assert_eq!(controller.all_items().len(), 3);
}

#[tokio::test]
async fn update_keeps_the_active_filter() {
    let mut controller = loaded(6).await;
    controller.apply_query(Query::new().category("group", "even"));
    assert_eq!(controller.filtered_items().len(), 3);

    controller
        .update(
            ProductId(2),
            ItemPatch {
                group: Some("odd".into()),
                ..ItemPatch::default()
            },
        )
        .expect("update");

    assert!(controller.is_filtered());
    let ids: Vec<i64> = controller.filtered_items().iter().map(|i| i.id.0).collect();
    assert_eq!(ids, vec![4, 6]);
}

#[tokio::test]
async fn failed_transition_leaves_the_record_untouched() {
    let mut controller = loaded(2).await;

    let err = controller
        .update(
            ProductId(1),
            ItemPatch {
                name: Some(String::new()),
                ..ItemPatch::default()
            },
        )
        .expect_err("blank name");

    assert_eq!(err.code(), ErrorCode::Validation);
    assert_eq!(controller.find(ProductId(1)), Some(&item(1)));
    assert_eq!(controller.notices().len(), 1);
    assert_eq!(controller.notices()[0].level, NoticeLevel::Error);
    assert_eq!(controller.notices()[0].code, Some(ErrorCode::Validation));
}

#[tokio::test]
async fn create_refuses_when_ids_are_exhausted() {
    let mut controller: ListController<Item> = ListController::headless(10, Vec::new());
    controller
        .load(&StaticSource::new(vec![item(i64::MAX)]))
        .await
        .expect("load");

    let err = controller.create(item(0)).expect_err("no id left");

    assert!(matches!(err, ValidationError::InvalidValue { field: "id", .. }));
    assert_eq!(controller.all_items().len(), 1);
}

#[tokio::test]
async fn update_of_unknown_id_is_not_found() {
    let mut controller = loaded(2).await;
    let err = controller
        .update(ProductId(99), ItemPatch::default())
        .expect_err("unknown id");
    assert_eq!(err, ListError::NotFound(NotFoundError { id: 99 }));
}

#[tokio::test]
async fn filter_narrowing_past_current_page_returns_to_first_page() {
    let mut controller = loaded(25).await;
    assert!(controller.go_to_page(3));

    controller.apply_query(Query::new().search("item 7"));

    assert_eq!(controller.current_page(), 1);
    assert_eq!(controller.total_pages(), 1);
    assert_page_in_bounds(&controller);
}

#[tokio::test]
async fn empty_view_is_a_single_empty_page() {
    let mut controller = loaded(4).await;
    controller.apply_query(Query::new().search("no such item"));

    assert_eq!(controller.total_pages(), 1);
    assert!(controller.page().is_empty());
    assert_eq!(controller.page_stats(), PageStats::default());
}

#[tokio::test]
async fn page_stays_in_bounds_through_a_mutation_sequence() {
    let mut controller = loaded(31).await;
    assert!(controller.go_to_page(4));
    for id in (22..=31).rev() {
        controller.remove(ProductId(id)).expect("remove");
        assert_page_in_bounds(&controller);
    }
    controller.apply_query(Query::new().category("group", "odd"));
    assert_page_in_bounds(&controller);
    controller.create(item(0)).expect("create");
    assert_page_in_bounds(&controller);
    for id in 1..=21 {
        let _ = controller.remove(ProductId(id));
        assert_page_in_bounds(&controller);
    }
}

#[tokio::test]
async fn load_failure_installs_fallback_with_one_notice() {
    let mut controller = ListController::headless(10, items(3));
    let timeout = LoadError::Timeout {
        url: "http://127.0.0.1:9/items".into(),
        timeout_ms: 10,
    };

    let err = controller
        .load(&FailingSource::new(timeout.clone()))
        .await
        .expect_err("failing source");

    assert_eq!(err, timeout);
    assert_eq!(controller.all_items(), items(3).as_slice());
    assert_eq!(controller.notices().len(), 1);
    assert_eq!(controller.notices()[0].level, NoticeLevel::Warning);
    assert_eq!(controller.notices()[0].code, Some(ErrorCode::Load));
}

#[tokio::test]
async fn load_drops_duplicate_ids() {
    let mut controller: ListController<Item> = ListController::headless(10, Vec::new());
    let mut duplicate = item(2);
    duplicate.name = "shadow".into();
    let mut rows = items(3);
    rows.push(duplicate);

    let count = controller
        .load(&StaticSource::new(rows))
        .await
        .expect("load");

    assert_eq!(count, 3);
    assert_eq!(controller.find(ProductId(2)).map(|i| i.name.as_str()), Some("item 2"));
}

#[tokio::test]
async fn every_change_renders_table_then_pagination_then_stats() {
    let mut controller = ListController::new(2, Vec::new(), RecordingSink::default());
    controller
        .load(&StaticSource::new(items(5)))
        .await
        .expect("load");
    controller.sink_mut().calls.clear();

    assert!(controller.go_to_page(3));

    let sink = controller.sink();
    assert_eq!(sink.calls, vec!["table", "pagination 3/3", "stats"]);
    assert_eq!(sink.last_rows, vec![5]);
    let (stats, summary) = sink.last_stats.clone().expect("stats rendered");
    assert_eq!(stats.start_row, 5);
    assert_eq!(summary, ItemSummary { total: 5, shown: 5 });
}

#[test]
fn page_size_of_zero_is_raised_to_one() {
    let controller: ListController<Item> = ListController::headless(0, Vec::new());
    assert_eq!(controller.page_size(), 1);
}
