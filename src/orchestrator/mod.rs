//! Top-level page state and the transitions driven by user actions.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::gateway::{
    ApiError, CatalogApi, GatewayBuildError, HttpCatalog, KeywordQuery, ListQuery, SemanticQuery,
};
use crate::modal::{DetailModal, DetailOutcome, ModalController, DEFAULT_REOPEN_DELAY};
use crate::model::CardRecord;
use crate::render::RenderOptions;
use crate::surface::{
    CardBinding, Interaction, PageSource, Pager, RenderMode, Surface, SurfaceKind, SurfaceMessage,
};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const ALL_PRODUCTS_TITLE: &str = "All products";
pub const SEMANTIC_TITLE: &str = "Related suggestions";

#[derive(Clone, Debug)]
pub struct StorefrontOptions {
    /// Page size of the product listing.
    pub page_size: u32,
    /// Page size of keyword search.
    pub keyword_size: u32,
    pub reopen_delay: Duration,
    pub render: RenderOptions,
}

impl Default for StorefrontOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            keyword_size: DEFAULT_PAGE_SIZE,
            reopen_delay: DEFAULT_REOPEN_DELAY,
            render: RenderOptions::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StorefrontError {
    #[error("invalid page_size {value}, expected positive integer")]
    InvalidPageSize { value: u32 },

    #[error("invalid keyword_size {value}, expected positive integer")]
    InvalidKeywordSize { value: u32 },

    #[error(transparent)]
    Gateway(#[from] GatewayBuildError),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SearchState {
    pub current_page: u32,
    pub is_loading: bool,
    pub active_category: Option<String>,
    pub active_query: Option<String>,
}

impl Default for SearchState {
    fn default() -> Self {
        Self {
            current_page: 1,
            is_loading: false,
            active_category: None,
            active_query: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Searching,
    CategoryOnly,
    Paginating,
}

/// Current values of the search input and the category select.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SearchForm {
    pub query: String,
    pub category: String,
}

/// Everything the page shows at one moment.
#[derive(Clone, Debug, Serialize)]
pub struct PageView {
    pub phase: Phase,
    pub state: SearchState,
    pub form: SearchForm,
    pub categories: Vec<String>,
    pub all_products: Surface,
    pub keyword: Surface,
    pub semantic: Surface,
    pub modal: DetailModal,
}

impl PageView {
    pub fn surfaces(&self) -> [&Surface; 3] {
        [&self.all_products, &self.keyword, &self.semantic]
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FetchOutcome {
    Rendered { cards: usize },
    Failed(ApiError),
    /// A newer request for the same surface was issued before this one
    /// completed; its result was dropped.
    Stale,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Submission {
    Search {
        keyword: FetchOutcome,
        semantic: FetchOutcome,
    },
    Category(FetchOutcome),
    Home(FetchOutcome),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadMore {
    Loaded { page: u32, cards: usize },
    /// Another page request is still outstanding.
    Busy,
    /// The active surface has no further pages.
    Exhausted,
    Failed(ApiError),
    Stale,
}

/// Which endpoint serves a surface's next page.
enum PageRequest {
    Listing(ListQuery),
    Keyword(KeywordQuery),
}

struct Page {
    mode: Phase,
    state: SearchState,
    form: SearchForm,
    categories: Vec<String>,
    all_products: Surface,
    keyword: Surface,
    semantic: Surface,
}

impl Page {
    fn new() -> Self {
        let mut all_products = Surface::new(
            SurfaceKind::AllProducts,
            CardBinding::DetailButton,
            ALL_PRODUCTS_TITLE,
        );
        all_products.show();
        Self {
            mode: Phase::Idle,
            state: SearchState::default(),
            form: SearchForm::default(),
            categories: Vec::new(),
            all_products,
            keyword: Surface::new(SurfaceKind::Keyword, CardBinding::DetailButton, ""),
            semantic: Surface::new(SurfaceKind::Semantic, CardBinding::DetailButton, SEMANTIC_TITLE),
        }
    }

    fn phase(&self) -> Phase {
        if self.state.is_loading {
            Phase::Paginating
        } else {
            self.mode
        }
    }

    fn surface(&self, kind: SurfaceKind) -> &Surface {
        match kind {
            SurfaceKind::AllProducts => &self.all_products,
            SurfaceKind::Keyword => &self.keyword,
            SurfaceKind::Semantic => &self.semantic,
        }
    }

    fn surface_mut(&mut self, kind: SurfaceKind) -> &mut Surface {
        match kind {
            SurfaceKind::AllProducts => &mut self.all_products,
            SurfaceKind::Keyword => &mut self.keyword,
            SurfaceKind::Semantic => &mut self.semantic,
        }
    }

    /// The surface "load more" applies to in the current mode.
    fn paginated_surface(&self) -> SurfaceKind {
        match self.mode {
            Phase::Searching | Phase::CategoryOnly => SurfaceKind::Keyword,
            Phase::Idle | Phase::Paginating => SurfaceKind::AllProducts,
        }
    }

    fn begin(&mut self, mode: Phase, query: Option<String>, category: Option<String>) {
        self.mode = mode;
        self.state.current_page = 1;
        self.state.active_query = query;
        self.state.active_category = category;
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

pub fn keyword_title(query: &str, category: Option<&str>) -> String {
    match category {
        Some(c) => format!("Keyword matches for \"{query}\" in \"{c}\""),
        None => format!("Keyword matches for \"{query}\""),
    }
}

pub fn category_title(category: &str, total: Option<u64>) -> String {
    match total {
        Some(total) => format!("Products in \"{category}\" ({total} found)"),
        None => format!("Products in \"{category}\""),
    }
}

/// Owns the page state and the backend handle; every user action goes
/// through here.
#[derive(Clone)]
pub struct Storefront {
    api: Arc<dyn CatalogApi>,
    page: Arc<Mutex<Page>>,
    modal: ModalController,
    render: Arc<RenderOptions>,
    page_size: u32,
    keyword_size: u32,
}

impl Storefront {
    pub fn new(api: Arc<dyn CatalogApi>, options: StorefrontOptions) -> Result<Self, StorefrontError> {
        if options.page_size == 0 {
            return Err(StorefrontError::InvalidPageSize {
                value: options.page_size,
            });
        }
        if options.keyword_size == 0 {
            return Err(StorefrontError::InvalidKeywordSize {
                value: options.keyword_size,
            });
        }
        let render = Arc::new(options.render);
        Ok(Self {
            modal: ModalController::new(api.clone(), render.clone(), options.reopen_delay),
            api,
            page: Arc::new(Mutex::new(Page::new())),
            render,
            page_size: options.page_size,
            keyword_size: options.keyword_size,
        })
    }

    /// Builds a storefront talking to the backend at `api_url` over HTTP.
    pub fn connect(
        api_url: &str,
        timeout: Duration,
        options: StorefrontOptions,
    ) -> Result<Self, StorefrontError> {
        let catalog = HttpCatalog::new(api_url, timeout)?;
        Self::new(Arc::new(catalog), options)
    }

    pub async fn snapshot(&self) -> PageView {
        let modal = self.modal.snapshot().await;
        let page = self.page.lock().await;
        PageView {
            phase: page.phase(),
            state: page.state.clone(),
            form: page.form.clone(),
            categories: page.categories.clone(),
            all_products: page.all_products.clone(),
            keyword: page.keyword.clone(),
            semantic: page.semantic.clone(),
            modal,
        }
    }

    /// Page load: categories and the first page of all products.
    pub async fn start(&self) -> FetchOutcome {
        let (_, home) = futures::join!(self.refresh_categories(), self.reset_home());
        home
    }

    /// Reloads the category list. A failure leaves the list empty.
    pub async fn refresh_categories(&self) -> usize {
        let result = self.api.categories().await;
        let mut page = self.page.lock().await;
        match result {
            Ok(categories) => {
                page.categories = categories;
                if !page.form.category.is_empty()
                    && !page.categories.contains(&page.form.category)
                {
                    page.form.category.clear();
                }
            }
            Err(e) => {
                warn!(error = %e, "could not load categories");
                page.categories.clear();
            }
        }
        page.categories.len()
    }

    /// Input event on the search box. Clearing it while no category is
    /// selected returns to the all-products view without a request.
    pub async fn set_query_input(&self, text: &str) -> bool {
        let mut guard = self.page.lock().await;
        let page = &mut *guard;
        page.form.query = text.to_string();
        if !text.trim().is_empty() || !page.form.category.trim().is_empty() {
            return false;
        }
        page.keyword.hide();
        page.keyword.issue_generation();
        page.semantic.hide();
        page.semantic.issue_generation();
        page.all_products.show();
        page.begin(Phase::Idle, None, None);
        page.state.current_page = page.all_products.page();
        true
    }

    /// Change event on the category select. Choosing "all categories" with
    /// an empty search box reloads the all-products view.
    pub async fn select_category(&self, category: &str) -> Option<FetchOutcome> {
        let reset = {
            let mut page = self.page.lock().await;
            page.form.category = category.to_string();
            category.trim().is_empty() && page.form.query.trim().is_empty()
        };
        if reset {
            Some(self.reset_home().await)
        } else {
            None
        }
    }

    /// Fills the form and submits it.
    pub async fn search(&self, query: &str, category: &str) -> Submission {
        {
            let mut page = self.page.lock().await;
            page.form.query = query.to_string();
            page.form.category = category.to_string();
        }
        self.submit().await
    }

    pub async fn submit(&self) -> Submission {
        let (query, category) = {
            let page = self.page.lock().await;
            (non_empty(&page.form.query), non_empty(&page.form.category))
        };
        match (query, category) {
            (Some(query), category) => self.run_search(query, category).await,
            (None, Some(category)) => Submission::Category(self.run_category(category).await),
            (None, None) => Submission::Home(self.reset_home().await),
        }
    }

    /// Back to the unfiltered first page of all products.
    pub async fn reset_home(&self) -> FetchOutcome {
        let generation = {
            let mut guard = self.page.lock().await;
            let page = &mut *guard;
            page.begin(Phase::Idle, None, None);
            page.keyword.hide();
            page.keyword.issue_generation();
            page.semantic.hide();
            page.semantic.issue_generation();
            let surface = &mut page.all_products;
            surface.show();
            surface.show_loading(&self.render.labels.loading);
            surface.pager = None;
            surface.issue_generation()
        };
        self.fetch_listing(SurfaceKind::AllProducts, None, generation)
            .await
    }

    async fn run_category(&self, category: String) -> FetchOutcome {
        info!(category = %category, "filtering by category");
        let generation = {
            let mut guard = self.page.lock().await;
            let page = &mut *guard;
            page.begin(Phase::CategoryOnly, None, Some(category.clone()));
            page.all_products.hide();
            page.all_products.issue_generation();
            page.semantic.hide();
            page.semantic.issue_generation();
            let surface = &mut page.keyword;
            surface.title = category_title(&category, None);
            surface.show();
            surface.show_loading(&self.render.labels.loading);
            surface.pager = None;
            surface.issue_generation()
        };
        self.fetch_listing(SurfaceKind::Keyword, Some(category), generation)
            .await
    }

    async fn run_search(&self, query: String, category: Option<String>) -> Submission {
        info!(query = %query, category = ?category, "searching");
        let (keyword_gen, semantic_gen) = {
            let mut guard = self.page.lock().await;
            let page = &mut *guard;
            page.begin(Phase::Searching, Some(query.clone()), category.clone());
            page.all_products.hide();
            page.all_products.issue_generation();

            let keyword = &mut page.keyword;
            keyword.title = keyword_title(&query, category.as_deref());
            keyword.show();
            keyword.show_loading(&self.render.labels.loading);
            keyword.pager = None;
            let keyword_gen = keyword.issue_generation();

            let semantic = &mut page.semantic;
            semantic.title = SEMANTIC_TITLE.to_string();
            semantic.show();
            semantic.show_loading(&self.render.labels.loading);
            let semantic_gen = semantic.issue_generation();
            (keyword_gen, semantic_gen)
        };

        let (keyword, semantic) = futures::join!(
            self.fetch_keyword(query.clone(), category.clone(), keyword_gen),
            self.fetch_semantic(query, category, semantic_gen),
        );
        Submission::Search { keyword, semantic }
    }

    async fn fetch_listing(
        &self,
        kind: SurfaceKind,
        category: Option<String>,
        generation: u64,
    ) -> FetchOutcome {
        let query = ListQuery {
            page: 1,
            size: self.page_size,
            category: category.clone(),
        };
        let result = self.api.list_products(&query).await;

        let mut page = self.page.lock().await;
        let surface = page.surface_mut(kind);
        if !surface.is_current(generation) {
            debug!(surface = ?kind, generation, "discarding stale listing");
            return FetchOutcome::Stale;
        }
        match result {
            Ok(listing) => {
                let cards = surface.render(&listing.data, RenderMode::Replace, &self.render);
                let pager = Pager {
                    source: PageSource::Listing {
                        category: category.clone(),
                        total: listing.total,
                    },
                    page: 1,
                    size: self.page_size,
                };
                surface.load_more = pager.has_more(listing.data.len());
                surface.pager = Some(pager);
                if let (SurfaceKind::Keyword, Some(c)) = (kind, category.as_deref()) {
                    surface.title = category_title(c, Some(listing.total));
                }
                FetchOutcome::Rendered { cards }
            }
            Err(e) => {
                error!(surface = ?kind, error = %e, "listing failed");
                surface.show_error(&e.to_string());
                surface.pager = None;
                FetchOutcome::Failed(e)
            }
        }
    }

    async fn fetch_keyword(
        &self,
        query: String,
        category: Option<String>,
        generation: u64,
    ) -> FetchOutcome {
        let request = KeywordQuery {
            query: query.clone(),
            page: 1,
            size: self.keyword_size,
            category: category.clone(),
        };
        let result = self.api.search_keyword(&request).await;

        let mut page = self.page.lock().await;
        let surface = &mut page.keyword;
        if !surface.is_current(generation) {
            debug!(generation, "discarding stale keyword results");
            return FetchOutcome::Stale;
        }
        match result {
            Ok(records) => {
                let cards = surface.render(&records, RenderMode::Replace, &self.render);
                let pager = Pager {
                    source: PageSource::Keyword { query, category },
                    page: 1,
                    size: self.keyword_size,
                };
                surface.load_more = pager.has_more(records.len());
                surface.pager = Some(pager);
                FetchOutcome::Rendered { cards }
            }
            Err(e) => {
                error!(error = %e, "keyword search failed");
                surface.show_error(&e.to_string());
                surface.pager = None;
                FetchOutcome::Failed(e)
            }
        }
    }

    async fn fetch_semantic(
        &self,
        query: String,
        category: Option<String>,
        generation: u64,
    ) -> FetchOutcome {
        let request = SemanticQuery { query, category };
        let result = self.api.semantic_suggestions(&request).await;

        let mut page = self.page.lock().await;
        let surface = &mut page.semantic;
        if !surface.is_current(generation) {
            debug!(generation, "discarding stale suggestions");
            return FetchOutcome::Stale;
        }
        match result {
            Ok(records) => FetchOutcome::Rendered {
                cards: surface.render(&records, RenderMode::Replace, &self.render),
            },
            Err(e) => {
                error!(error = %e, "semantic suggestions failed");
                surface.show_error(&e.to_string());
                FetchOutcome::Failed(e)
            }
        }
    }

    /// "Load more" on the active result surface. Only one page request may
    /// be outstanding; a second activation meanwhile is a no-op.
    pub async fn load_more(&self) -> LoadMore {
        let (kind, request, generation, next) = {
            let mut page = self.page.lock().await;
            if page.state.is_loading {
                debug!("load more ignored, a page request is in flight");
                return LoadMore::Busy;
            }
            let kind = page.paginated_surface();
            let surface = page.surface(kind);
            if !surface.visible || !surface.load_more {
                return LoadMore::Exhausted;
            }
            let Some(pager) = surface.pager.as_ref() else {
                return LoadMore::Exhausted;
            };
            let next = pager.page + 1;
            let request = match &pager.source {
                PageSource::Listing { category, .. } => PageRequest::Listing(ListQuery {
                    page: next,
                    size: pager.size,
                    category: category.clone(),
                }),
                PageSource::Keyword { query, category } => PageRequest::Keyword(KeywordQuery {
                    query: query.clone(),
                    page: next,
                    size: pager.size,
                    category: category.clone(),
                }),
            };
            let generation = surface.generation();
            page.state.is_loading = true;
            (kind, request, generation, next)
        };
        debug!(surface = ?kind, page = next, "loading next page");

        let result: Result<(Vec<CardRecord>, Option<u64>), ApiError> = match &request {
            PageRequest::Listing(q) => self
                .api
                .list_products(q)
                .await
                .map(|p| (p.data, Some(p.total))),
            PageRequest::Keyword(q) => self.api.search_keyword(q).await.map(|r| (r, None)),
        };

        let mut guard = self.page.lock().await;
        let page = &mut *guard;
        page.state.is_loading = false;
        let still_active = page.paginated_surface() == kind;
        let surface = page.surface_mut(kind);
        if !surface.is_current(generation) {
            debug!(surface = ?kind, page = next, "discarding stale page");
            return LoadMore::Stale;
        }
        match result {
            Ok((records, total)) => {
                let cards = surface.render(&records, RenderMode::Append, &self.render);
                if let Some(pager) = surface.pager.as_mut() {
                    pager.page = next;
                    if let (PageSource::Listing { total: known, .. }, Some(reported)) =
                        (&mut pager.source, total)
                    {
                        *known = reported;
                    }
                    surface.load_more = pager.has_more(records.len());
                }
                if still_active {
                    page.state.current_page = next;
                }
                LoadMore::Loaded { page: next, cards }
            }
            Err(e) => {
                error!(surface = ?kind, page = next, error = %e, "load more failed");
                surface.load_more = false;
                surface.message = Some(SurfaceMessage::error(e.to_string()));
                LoadMore::Failed(e)
            }
        }
    }

    /// A gesture on a card of a visible surface; opens the detail overlay
    /// when the surface's binding accepts it.
    pub async fn activate(
        &self,
        kind: SurfaceKind,
        index: usize,
        interaction: Interaction,
    ) -> Option<DetailOutcome> {
        let doc_id = {
            let page = self.page.lock().await;
            let surface = page.surface(kind);
            if !surface.visible {
                return None;
            }
            surface.activation(index, interaction)?.to_string()
        };
        Some(self.modal.open(&doc_id).await)
    }

    pub async fn open_detail(&self, doc_id: &str) -> DetailOutcome {
        self.modal.open(doc_id).await
    }

    pub async fn activate_recommendation(
        &self,
        index: usize,
        interaction: Interaction,
    ) -> Option<DetailOutcome> {
        self.modal.activate_recommendation(index, interaction).await
    }

    pub async fn close_detail(&self) {
        self.modal.close().await;
    }
}
