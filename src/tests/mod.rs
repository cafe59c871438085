use std::collections::{HashSet, VecDeque};
use std::ops::Range;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::gateway::{ApiError, CatalogApi, KeywordQuery, ListQuery, SemanticQuery};
use crate::modal::DetailOutcome;
use crate::model::{CardRecord, ProductDetail, ProductPage, ProductRecord, ScoredSuggestion, SourceId};
use crate::orchestrator::{
    FetchOutcome, LoadMore, Phase, Storefront, StorefrontError, StorefrontOptions, Submission,
};
use crate::surface::{ClickTarget, Interaction, Key, MessageKind, SurfaceKind};

type Queue<T> = Mutex<VecDeque<Result<T, ApiError>>>;

#[derive(Default)]
struct Gate {
    started: Notify,
    release: Notify,
}

/// In-memory catalog answering from per-endpoint queues. An endpoint marked
/// with `hold` blocks its next call until `gate.release` is notified.
#[derive(Default)]
struct ScriptedCatalog {
    listings: Queue<ProductPage>,
    keyword: Queue<Vec<CardRecord>>,
    semantic: Queue<Vec<CardRecord>>,
    details: Queue<ProductDetail>,
    categories: Queue<Vec<String>>,
    held: Mutex<HashSet<&'static str>>,
    gate: Gate,
    calls: Mutex<Vec<String>>,
}

impl ScriptedCatalog {
    fn hold(&self, endpoint: &'static str) {
        self.held.lock().unwrap().insert(endpoint);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    async fn enter<T>(&self, endpoint: &'static str, call: String, queue: &Queue<T>) -> Option<Result<T, ApiError>> {
        self.calls.lock().unwrap().push(call);
        let response = queue.lock().unwrap().pop_front();
        let held = self.held.lock().unwrap().remove(endpoint);
        if held {
            self.gate.started.notify_one();
            self.gate.release.notified().await;
        }
        response
    }
}

#[async_trait]
impl CatalogApi for ScriptedCatalog {
    async fn list_products(&self, query: &ListQuery) -> Result<ProductPage, ApiError> {
        let call = format!(
            "list page={} size={} category={}",
            query.page,
            query.size,
            query.category.as_deref().unwrap_or("")
        );
        self.enter("list", call, &self.listings)
            .await
            .unwrap_or_else(|| Ok(ProductPage { data: Vec::new(), total: 0 }))
    }

    async fn categories(&self) -> Result<Vec<String>, ApiError> {
        self.enter("categories", "categories".to_string(), &self.categories)
            .await
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn search_keyword(&self, query: &KeywordQuery) -> Result<Vec<CardRecord>, ApiError> {
        let call = format!("keyword query={} page={}", query.query, query.page);
        self.enter("keyword", call, &self.keyword)
            .await
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn semantic_suggestions(&self, query: &SemanticQuery) -> Result<Vec<CardRecord>, ApiError> {
        let call = format!("semantic query={}", query.query);
        self.enter("semantic", call, &self.semantic)
            .await
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn recommend(&self, doc_id: &str) -> Result<ProductDetail, ApiError> {
        self.enter("recommend", format!("recommend {doc_id}"), &self.details)
            .await
            .unwrap_or_else(|| Err(not_found()))
    }
}

fn product_record(n: usize) -> ProductRecord {
    ProductRecord {
        doc_id: Some(format!("doc-{n}")),
        source_id: Some(SourceId::Int(n as i64)),
        name: Some(format!("Product {n}")),
        category: Some("Kitchen".to_string()),
        price: Some(100_000.0),
        ..Default::default()
    }
}

fn products(range: Range<usize>) -> Vec<CardRecord> {
    range.map(|n| CardRecord::Product(product_record(n))).collect()
}

fn page(range: Range<usize>, total: u64) -> Result<ProductPage, ApiError> {
    Ok(ProductPage {
        data: products(range),
        total,
    })
}

fn suggestion(n: usize, score: f64) -> CardRecord {
    CardRecord::Suggestion(ScoredSuggestion {
        doc_id: format!("doc-{n}"),
        product: product_record(n),
        score,
    })
}

fn detail(n: usize, recommendations: Vec<CardRecord>) -> Result<ProductDetail, ApiError> {
    Ok(ProductDetail {
        original_product: product_record(n),
        recommendations,
    })
}

fn server_error() -> ApiError {
    ApiError::Status {
        status: 500,
        status_text: "Internal Server Error".to_string(),
        message: "boom".to_string(),
    }
}

fn not_found() -> ApiError {
    ApiError::Status {
        status: 404,
        status_text: "Not Found".to_string(),
        message: "Product not found".to_string(),
    }
}

fn push<T>(queue: &Queue<T>, response: Result<T, ApiError>) {
    queue.lock().unwrap().push_back(response);
}

fn storefront(api: &Arc<ScriptedCatalog>) -> Storefront {
    let options = StorefrontOptions {
        reopen_delay: Duration::ZERO,
        ..Default::default()
    };
    Storefront::new(api.clone(), options).unwrap()
}

#[test]
fn zero_page_size_is_rejected() {
    let api = Arc::new(ScriptedCatalog::default());
    let options = StorefrontOptions {
        page_size: 0,
        ..Default::default()
    };
    assert!(matches!(
        Storefront::new(api, options),
        Err(StorefrontError::InvalidPageSize { value: 0 })
    ));
}

#[tokio::test]
async fn startup_renders_first_page_and_categories() {
    let api = Arc::new(ScriptedCatalog::default());
    push(&api.listings, page(0..20, 45));
    push(&api.categories, Ok(vec!["Kitchen".to_string(), "Toys".to_string()]));
    let store = storefront(&api);

    assert_eq!(store.start().await, FetchOutcome::Rendered { cards: 20 });

    let view = store.snapshot().await;
    assert_eq!(view.phase, Phase::Idle);
    assert!(view.all_products.visible);
    assert!(!view.keyword.visible);
    assert!(!view.semantic.visible);
    assert_eq!(view.all_products.cards.len(), 20);
    assert!(view.all_products.load_more);
    assert_eq!(view.categories, vec!["Kitchen", "Toys"]);
    assert!(api.calls().contains(&"list page=1 size=20 category=".to_string()));
}

#[tokio::test]
async fn load_more_appends_until_total_is_reached() {
    let api = Arc::new(ScriptedCatalog::default());
    push(&api.listings, page(0..20, 45));
    push(&api.listings, page(20..40, 45));
    push(&api.listings, page(40..45, 45));
    let store = storefront(&api);
    store.start().await;

    assert_eq!(store.load_more().await, LoadMore::Loaded { page: 2, cards: 20 });
    assert!(store.snapshot().await.all_products.load_more);

    assert_eq!(store.load_more().await, LoadMore::Loaded { page: 3, cards: 5 });
    let view = store.snapshot().await;
    assert!(!view.all_products.load_more);
    assert_eq!(view.all_products.cards.len(), 45);
    assert_eq!(view.state.current_page, 3);

    assert_eq!(store.load_more().await, LoadMore::Exhausted);
    assert_eq!(api.count("list"), 3);
    assert!(api.calls().contains(&"list page=3 size=20 category=".to_string()));
}

#[tokio::test]
async fn second_load_more_while_loading_is_ignored() {
    let api = Arc::new(ScriptedCatalog::default());
    push(&api.listings, page(0..20, 45));
    push(&api.listings, page(20..40, 45));
    let store = storefront(&api);
    store.start().await;

    api.hold("list");
    let pending = {
        let store = store.clone();
        tokio::spawn(async move { store.load_more().await })
    };
    api.gate.started.notified().await;

    let view = store.snapshot().await;
    assert_eq!(view.phase, Phase::Paginating);
    assert!(view.state.is_loading);
    assert_eq!(store.load_more().await, LoadMore::Busy);

    api.gate.release.notify_one();
    assert_eq!(pending.await.unwrap(), LoadMore::Loaded { page: 2, cards: 20 });
    assert_eq!(api.count("list"), 2);

    let view = store.snapshot().await;
    assert!(!view.state.is_loading);
    assert_eq!(view.phase, Phase::Idle);
    assert_eq!(view.all_products.cards.len(), 40);
}

#[tokio::test]
async fn page_request_outlived_by_a_search_leaves_page_at_one() {
    let api = Arc::new(ScriptedCatalog::default());
    push(&api.listings, page(0..20, 45));
    push(&api.listings, page(20..40, 45));
    let store = storefront(&api);
    store.start().await;

    api.hold("list");
    let pending = {
        let store = store.clone();
        tokio::spawn(async move { store.load_more().await })
    };
    api.gate.started.notified().await;

    store.search("fan", "").await;
    assert_eq!(store.snapshot().await.state.current_page, 1);

    api.gate.release.notify_one();
    assert_eq!(pending.await.unwrap(), LoadMore::Stale);

    let view = store.snapshot().await;
    assert_eq!(view.phase, Phase::Searching);
    assert_eq!(view.state.current_page, 1);
    assert!(!view.state.is_loading);
    assert_eq!(view.all_products.cards.len(), 20);
    assert_eq!(view.keyword.page(), 1);

    assert!(store.set_query_input("").await);
    assert_eq!(store.snapshot().await.state.current_page, 1);
}

#[tokio::test]
async fn failed_page_hides_the_control_and_keeps_cards() {
    let api = Arc::new(ScriptedCatalog::default());
    push(&api.listings, page(0..20, 45));
    push(&api.listings, Err(server_error()));
    let store = storefront(&api);
    store.start().await;

    assert_eq!(store.load_more().await, LoadMore::Failed(server_error()));
    let view = store.snapshot().await;
    assert!(!view.state.is_loading);
    assert!(!view.all_products.load_more);
    assert_eq!(view.all_products.cards.len(), 20);
    assert_eq!(view.state.current_page, 1);
    let message = view.all_products.message.unwrap();
    assert_eq!(message.kind, MessageKind::Error);
    assert!(message.text.contains("API error 500"));
}

#[tokio::test]
async fn keyword_failure_does_not_block_semantic_suggestions() {
    let api = Arc::new(ScriptedCatalog::default());
    push(&api.keyword, Err(server_error()));
    push(&api.semantic, Ok(vec![suggestion(7, 0.873)]));
    let store = storefront(&api);
    store.start().await;

    let submitted = store.search("fan", "").await;
    assert_eq!(
        submitted,
        Submission::Search {
            keyword: FetchOutcome::Failed(server_error()),
            semantic: FetchOutcome::Rendered { cards: 1 },
        }
    );

    let view = store.snapshot().await;
    assert_eq!(view.phase, Phase::Searching);
    assert_eq!(view.state.active_query.as_deref(), Some("fan"));
    assert!(!view.all_products.visible);
    assert!(view.keyword.visible);
    assert_eq!(view.keyword.title, "Keyword matches for \"fan\"");
    assert_eq!(view.keyword.message.as_ref().map(|m| m.kind), Some(MessageKind::Error));
    assert_eq!(view.semantic.cards.len(), 1);
    assert!(view.semantic.cards[0].html.as_str().contains("87%"));
}

#[tokio::test]
async fn keyword_results_paginate_while_pages_are_full() {
    let api = Arc::new(ScriptedCatalog::default());
    push(&api.keyword, Ok(products(0..20)));
    push(&api.keyword, Ok(products(20..27)));
    let store = storefront(&api);

    store.search("pan", "Kitchen").await;
    let view = store.snapshot().await;
    assert_eq!(view.keyword.title, "Keyword matches for \"pan\" in \"Kitchen\"");
    assert!(view.keyword.load_more);

    assert_eq!(store.load_more().await, LoadMore::Loaded { page: 2, cards: 7 });
    assert!(api.calls().contains(&"keyword query=pan page=2".to_string()));
    let view = store.snapshot().await;
    assert!(!view.keyword.load_more);
    assert_eq!(view.keyword.cards.len(), 27);
}

#[tokio::test]
async fn category_without_query_lists_into_keyword_surface() {
    let api = Arc::new(ScriptedCatalog::default());
    push(&api.listings, page(0..20, 45));
    push(&api.listings, page(100..103, 3));
    let store = storefront(&api);
    store.start().await;

    let submitted = store.search("  ", "Kitchen").await;
    assert_eq!(submitted, Submission::Category(FetchOutcome::Rendered { cards: 3 }));

    let view = store.snapshot().await;
    assert_eq!(view.phase, Phase::CategoryOnly);
    assert_eq!(view.state.active_category.as_deref(), Some("Kitchen"));
    assert!(!view.all_products.visible);
    assert!(!view.semantic.visible);
    assert_eq!(view.keyword.title, "Products in \"Kitchen\" (3 found)");
    assert!(!view.keyword.load_more);
    assert_eq!(api.count("semantic"), 0);
    assert!(api.calls().contains(&"list page=1 size=20 category=Kitchen".to_string()));
}

#[tokio::test]
async fn clearing_the_query_returns_home_without_a_request() {
    let api = Arc::new(ScriptedCatalog::default());
    push(&api.listings, page(0..20, 45));
    let store = storefront(&api);
    store.start().await;
    store.search("fan", "").await;
    let before = api.calls().len();

    assert!(store.set_query_input("").await);

    let view = store.snapshot().await;
    assert_eq!(view.phase, Phase::Idle);
    assert!(view.all_products.visible);
    assert_eq!(view.all_products.cards.len(), 20);
    assert!(!view.keyword.visible);
    assert!(!view.semantic.visible);
    assert_eq!(view.state.active_query, None);
    assert_eq!(api.calls().len(), before);
}

#[tokio::test]
async fn typing_keeps_the_current_results() {
    let api = Arc::new(ScriptedCatalog::default());
    let store = storefront(&api);
    store.search("fan", "").await;

    assert!(!store.set_query_input("fans").await);
    let view = store.snapshot().await;
    assert_eq!(view.phase, Phase::Searching);
    assert_eq!(view.form.query, "fans");
}

#[tokio::test]
async fn choosing_all_categories_with_empty_query_reloads_home() {
    let api = Arc::new(ScriptedCatalog::default());
    push(&api.listings, page(0..20, 45));
    let store = storefront(&api);

    assert_eq!(store.select_category("Kitchen").await, None);
    assert_eq!(api.count("list"), 0);

    assert_eq!(
        store.select_category("").await,
        Some(FetchOutcome::Rendered { cards: 20 })
    );
    assert_eq!(store.snapshot().await.phase, Phase::Idle);
}

#[tokio::test]
async fn stale_keyword_response_is_discarded() {
    let api = Arc::new(ScriptedCatalog::default());
    push(&api.keyword, Ok(products(0..1)));
    push(&api.keyword, Ok(products(10..12)));
    let store = storefront(&api);

    api.hold("keyword");
    let first = {
        let store = store.clone();
        tokio::spawn(async move { store.search("old", "").await })
    };
    api.gate.started.notified().await;

    let second = store.search("new", "").await;
    assert!(matches!(
        second,
        Submission::Search {
            keyword: FetchOutcome::Rendered { cards: 2 },
            ..
        }
    ));

    api.gate.release.notify_one();
    match first.await.unwrap() {
        Submission::Search { keyword, .. } => assert_eq!(keyword, FetchOutcome::Stale),
        other => panic!("unexpected submission {other:?}"),
    }

    let view = store.snapshot().await;
    assert_eq!(view.keyword.title, "Keyword matches for \"new\"");
    let ids: Vec<_> = view.keyword.cards.iter().filter_map(|c| c.doc_id.clone()).collect();
    assert_eq!(ids, vec!["doc-10", "doc-11"]);
}

#[tokio::test]
async fn grid_cards_open_only_from_the_detail_button_or_keys() {
    let api = Arc::new(ScriptedCatalog::default());
    push(&api.listings, page(0..3, 3));
    push(&api.details, detail(1, vec![suggestion(2, 0.9)]));
    let store = storefront(&api);
    store.start().await;

    let card_click = Interaction::Click(ClickTarget::Card);
    assert_eq!(store.activate(SurfaceKind::AllProducts, 1, card_click).await, None);
    assert_eq!(
        store
            .activate(SurfaceKind::Keyword, 0, Interaction::Key(Key::Enter))
            .await,
        None
    );

    let outcome = store
        .activate(SurfaceKind::AllProducts, 1, Interaction::Key(Key::Space))
        .await;
    assert_eq!(outcome, Some(DetailOutcome::Loaded { recommendations: 1 }));
    assert!(api.calls().contains(&"recommend doc-1".to_string()));

    let modal = store.snapshot().await.modal;
    assert!(modal.open);
    assert_eq!(modal.title, "Product 1");
    assert!(modal.body.as_str().contains("100.000 ₫"));
    assert!(modal.recommendations[0].html.as_str().contains("Similarity: 90.0%"));
}

#[tokio::test]
async fn stale_detail_response_is_discarded() {
    let api = Arc::new(ScriptedCatalog::default());
    push(&api.details, detail(1, Vec::new()));
    push(&api.details, detail(2, Vec::new()));
    let store = storefront(&api);

    api.hold("recommend");
    let first = {
        let store = store.clone();
        tokio::spawn(async move { store.open_detail("doc-1").await })
    };
    api.gate.started.notified().await;
    assert!(store.snapshot().await.modal.loading);

    assert_eq!(
        store.open_detail("doc-2").await,
        DetailOutcome::Loaded { recommendations: 0 }
    );
    api.gate.release.notify_one();
    assert_eq!(first.await.unwrap(), DetailOutcome::Stale);

    let modal = store.snapshot().await.modal;
    assert_eq!(modal.doc_id.as_deref(), Some("doc-2"));
    assert_eq!(modal.title, "Product 2");
    assert_eq!(
        modal.recommendations_message.map(|m| m.text),
        Some("No recommendations.".to_string())
    );
}

#[tokio::test]
async fn recommendation_click_reopens_the_overlay() {
    let api = Arc::new(ScriptedCatalog::default());
    push(&api.details, detail(1, vec![suggestion(2, 0.5), CardRecord::Product(product_record(3))]));
    push(&api.details, detail(2, Vec::new()));
    let store = storefront(&api);

    assert_eq!(
        store.open_detail("doc-1").await,
        DetailOutcome::Loaded { recommendations: 1 }
    );
    assert_eq!(
        store
            .activate_recommendation(0, Interaction::Key(Key::Other))
            .await,
        None
    );

    let outcome = store
        .activate_recommendation(0, Interaction::Click(ClickTarget::Card))
        .await;
    assert_eq!(outcome, Some(DetailOutcome::Loaded { recommendations: 0 }));
    let modal = store.snapshot().await.modal;
    assert!(modal.open);
    assert_eq!(modal.doc_id.as_deref(), Some("doc-2"));

    store.close_detail().await;
    assert!(!store.snapshot().await.modal.open);
    assert_eq!(
        store
            .activate_recommendation(0, Interaction::Click(ClickTarget::Card))
            .await,
        None
    );
}

#[tokio::test]
async fn detail_failure_shows_error_blocks() {
    let api = Arc::new(ScriptedCatalog::default());
    let store = storefront(&api);

    assert_eq!(store.open_detail("doc-404").await, DetailOutcome::Failed(not_found()));
    let modal = store.snapshot().await.modal;
    assert!(modal.open);
    assert!(!modal.loading);
    assert_eq!(modal.title, "Error");
    assert!(modal.body.as_str().contains("Product not found"));
    assert_eq!(
        modal.recommendations_message.map(|m| m.kind),
        Some(MessageKind::Error)
    );
}

#[tokio::test]
async fn category_refresh_keeps_selection_only_when_present() {
    let api = Arc::new(ScriptedCatalog::default());
    push(&api.categories, Ok(vec!["A".to_string(), "B".to_string()]));
    push(&api.categories, Ok(vec!["B".to_string(), "C".to_string()]));
    push(&api.categories, Ok(vec!["C".to_string()]));
    push(&api.categories, Err(server_error()));
    let store = storefront(&api);

    assert_eq!(store.refresh_categories().await, 2);
    store.select_category("B").await;

    assert_eq!(store.refresh_categories().await, 2);
    assert_eq!(store.snapshot().await.form.category, "B");

    assert_eq!(store.refresh_categories().await, 1);
    assert_eq!(store.snapshot().await.form.category, "");

    assert_eq!(store.refresh_categories().await, 0);
    assert!(store.snapshot().await.categories.is_empty());
}

#[tokio::test]
async fn malformed_records_render_inline_errors() {
    let api = Arc::new(ScriptedCatalog::default());
    let records = CardRecord::classify_all(vec![
        serde_json::json!({"_id": "doc-1", "id": 1, "name": "Kettle"}),
        serde_json::json!({"id": 2, "name": "No doc id"}),
        serde_json::json!({"_id": "doc-3", "id": 3, "name": "Toaster"}),
    ]);
    push(
        &api.listings,
        Ok(ProductPage {
            data: records,
            total: 3,
        }),
    );
    let store = storefront(&api);

    assert_eq!(store.start().await, FetchOutcome::Rendered { cards: 3 });
    let cards = store.snapshot().await.all_products.cards;
    assert!(cards[1].html.as_str().contains("error-card"));
    assert_eq!(cards[1].doc_id, None);
    assert_eq!(cards[2].doc_id.as_deref(), Some("doc-3"));
}

#[tokio::test]
async fn empty_home_page_shows_no_results() {
    let api = Arc::new(ScriptedCatalog::default());
    let store = storefront(&api);

    assert_eq!(store.start().await, FetchOutcome::Rendered { cards: 0 });
    let view = store.snapshot().await;
    assert!(view.all_products.cards.is_empty());
    assert_eq!(
        view.all_products.message.map(|m| m.text),
        Some("No results found.".to_string())
    );
    assert!(!view.all_products.load_more);
}

#[tokio::test]
async fn page_renders_in_every_format() {
    let api = Arc::new(ScriptedCatalog::default());
    push(&api.listings, page(0..2, 2));
    push(&api.categories, Ok(vec!["Kitchen".to_string()]));
    let store = storefront(&api);
    store.start().await;
    store.select_category("Kitchen").await;
    let view = store.snapshot().await;

    let html = String::from_utf8(crate::output::render_html(&view)).unwrap();
    assert!(html.contains(r#"id="all-products-section""#));
    assert!(html.contains(r#"<option value="Kitchen" selected>"#));
    assert!(html.contains(r#"data-doc-id="doc-1""#));

    let json: serde_json::Value = serde_json::from_slice(&crate::output::render_json(&view)).unwrap();
    assert_eq!(json["phase"], "idle");
    assert_eq!(json["all_products"]["cards"].as_array().map(Vec::len), Some(2));

    let text = String::from_utf8(crate::output::render_text(&view)).unwrap();
    assert!(text.contains("== All products =="));
    assert!(text.contains("Product 1"));
}
