use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::gateway::{ApiError, CatalogApi};
use crate::model::{CardRecord, ProductDetail};
use crate::render::{self, Fragment, RenderOptions};
use crate::surface::{Card, CardBinding, Interaction, SurfaceMessage};

pub const DEFAULT_REOPEN_DELAY: Duration = Duration::from_millis(150);

/// The product-detail overlay.
#[derive(Clone, Debug, Default, Serialize)]
pub struct DetailModal {
    pub open: bool,
    pub loading: bool,
    pub doc_id: Option<String>,
    pub title: String,
    pub body: Fragment,
    pub recommendations: Vec<Card>,
    pub recommendations_message: Option<SurfaceMessage>,
    generation: u64,
}

impl DetailModal {
    fn begin_loading(&mut self, doc_id: &str, opts: &RenderOptions) -> u64 {
        self.generation += 1;
        self.open = true;
        self.loading = true;
        self.doc_id = Some(doc_id.to_string());
        self.title = opts.labels.loading.clone();
        self.body = render::message(&opts.labels.loading, false);
        self.recommendations.clear();
        self.recommendations_message = Some(SurfaceMessage::loading(opts.labels.loading.clone()));
        self.generation
    }

    fn show_detail(&mut self, detail: &ProductDetail, opts: &RenderOptions) -> usize {
        self.loading = false;
        let product = &detail.original_product;
        self.title = product
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| opts.labels.details_title.clone());
        self.body = render::render_detail(product, opts);
        self.recommendations.clear();
        for item in &detail.recommendations {
            match item {
                CardRecord::Suggestion(s) => self.recommendations.push(Card {
                    doc_id: Some(s.doc_id.clone()),
                    html: render::render_recommendation(s),
                }),
                other => warn!(?other, "skipping recommendation without product"),
            }
        }
        self.recommendations_message = if self.recommendations.is_empty() {
            Some(SurfaceMessage::info(opts.labels.no_recommendations.clone()))
        } else {
            None
        };
        self.recommendations.len()
    }

    fn show_error(&mut self, err: &ApiError, opts: &RenderOptions) {
        self.loading = false;
        self.title = opts.labels.error_title.clone();
        self.body = render::message(&err.to_string(), true);
        self.recommendations.clear();
        self.recommendations_message =
            Some(SurfaceMessage::error(opts.labels.recommendation_error.clone()));
    }

    pub fn close(&mut self) {
        self.open = false;
        self.loading = false;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DetailOutcome {
    Loaded { recommendations: usize },
    Failed(ApiError),
    /// A newer open superseded this one before it completed.
    Stale,
}

/// Opens the overlay for a doc-id and keeps it populated.
#[derive(Clone)]
pub struct ModalController {
    api: Arc<dyn CatalogApi>,
    modal: Arc<Mutex<DetailModal>>,
    render: Arc<RenderOptions>,
    reopen_delay: Duration,
}

impl ModalController {
    pub fn new(api: Arc<dyn CatalogApi>, render: Arc<RenderOptions>, reopen_delay: Duration) -> Self {
        Self {
            api,
            modal: Arc::new(Mutex::new(DetailModal::default())),
            render,
            reopen_delay,
        }
    }

    pub async fn snapshot(&self) -> DetailModal {
        self.modal.lock().await.clone()
    }

    pub async fn close(&self) {
        self.modal.lock().await.close();
    }

    /// Shows the overlay in its loading state at once, then fills it with the
    /// product and its recommendations.
    pub async fn open(&self, doc_id: &str) -> DetailOutcome {
        let generation = self.modal.lock().await.begin_loading(doc_id, &self.render);
        debug!(doc_id, generation, "opening detail");

        let result = self.api.recommend(doc_id).await;

        let mut modal = self.modal.lock().await;
        if modal.generation() != generation {
            debug!(doc_id, generation, "discarding stale detail response");
            return DetailOutcome::Stale;
        }
        match result {
            Ok(detail) => DetailOutcome::Loaded {
                recommendations: modal.show_detail(&detail, &self.render),
            },
            Err(e) => {
                error!(doc_id, error = %e, "detail fetch failed");
                modal.show_error(&e, &self.render);
                DetailOutcome::Failed(e)
            }
        }
    }

    /// A gesture on the recommendation at `index`: close the overlay, wait for
    /// the close transition, then reopen it for that recommendation.
    pub async fn activate_recommendation(
        &self,
        index: usize,
        interaction: Interaction,
    ) -> Option<DetailOutcome> {
        let doc_id = {
            let mut modal = self.modal.lock().await;
            if !modal.open || !CardBinding::WholeCard.accepts(interaction) {
                return None;
            }
            let doc_id = modal.recommendations.get(index)?.doc_id.clone()?;
            modal.close();
            doc_id
        };
        if !self.reopen_delay.is_zero() {
            tokio::time::sleep(self.reopen_delay).await;
        }
        Some(self.open(&doc_id).await)
    }
}
