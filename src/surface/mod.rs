use serde::Serialize;

use crate::model::CardRecord;
use crate::render::{self, Fragment, RenderOptions};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    AllProducts,
    Keyword,
    Semantic,
}

impl SurfaceKind {
    pub fn element_id(&self) -> &'static str {
        match self {
            SurfaceKind::AllProducts => "all-products-section",
            SurfaceKind::Keyword => "keyword-results-section",
            SurfaceKind::Semantic => "semantic-suggestions-section",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    Replace,
    Append,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClickTarget {
    DetailButton,
    Card,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Enter,
    Space,
    Other,
}

/// A user gesture on a card that currently has focus or was clicked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interaction {
    Click(ClickTarget),
    Key(Key),
}

/// Which gestures activate a card. Fixed when the surface is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardBinding {
    /// Product grids: only the detail button or Enter/Space.
    DetailButton,
    /// Recommendation lists: a click anywhere on the card or Enter/Space.
    WholeCard,
}

impl CardBinding {
    pub fn accepts(&self, interaction: Interaction) -> bool {
        match interaction {
            Interaction::Key(Key::Enter | Key::Space) => true,
            Interaction::Key(Key::Other) => false,
            Interaction::Click(ClickTarget::DetailButton) => true,
            Interaction::Click(ClickTarget::Card) => *self == CardBinding::WholeCard,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Info,
    Loading,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SurfaceMessage {
    pub kind: MessageKind,
    pub text: String,
}

impl SurfaceMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Info,
            text: text.into(),
        }
    }

    pub fn loading(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Loading,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Error,
            text: text.into(),
        }
    }

    pub fn to_fragment(&self) -> Fragment {
        render::message(&self.text, self.kind == MessageKind::Error)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Card {
    pub doc_id: Option<String>,
    pub html: Fragment,
}

/// Where the next page of a surface comes from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum PageSource {
    /// `/products`, which reports the total number of matches.
    Listing {
        category: Option<String>,
        total: u64,
    },
    /// `/search-keyword`, which reports no total; a full page implies more.
    Keyword {
        query: String,
        category: Option<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Pager {
    pub source: PageSource,
    pub page: u32,
    pub size: u32,
}

impl Pager {
    pub fn has_more(&self, last_batch: usize) -> bool {
        match &self.source {
            PageSource::Listing { total, .. } => {
                u64::from(self.page) * u64::from(self.size) < *total
            }
            PageSource::Keyword { .. } => last_batch >= self.size as usize,
        }
    }
}

/// One result container: title, message area, card grid and the optional
/// "load more" control.
#[derive(Clone, Debug, Serialize)]
pub struct Surface {
    pub kind: SurfaceKind,
    pub binding: CardBinding,
    pub title: String,
    pub visible: bool,
    pub message: Option<SurfaceMessage>,
    pub cards: Vec<Card>,
    pub load_more: bool,
    pub pager: Option<Pager>,
    generation: u64,
}

impl Surface {
    pub fn new(kind: SurfaceKind, binding: CardBinding, title: impl Into<String>) -> Self {
        Self {
            kind,
            binding,
            title: title.into(),
            visible: false,
            message: None,
            cards: Vec::new(),
            load_more: false,
            pager: None,
            generation: 0,
        }
    }

    /// Starts a new request for this surface; any earlier request's result
    /// is stale from now on.
    pub fn issue_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn page(&self) -> u32 {
        self.pager.as_ref().map(|p| p.page).unwrap_or(1)
    }

    pub fn show_loading(&mut self, text: &str) {
        self.cards.clear();
        self.load_more = false;
        self.message = Some(SurfaceMessage::loading(text));
    }

    pub fn show_error(&mut self, text: &str) {
        self.cards.clear();
        self.load_more = false;
        self.message = Some(SurfaceMessage::error(text));
    }

    /// Renders `records` into the grid and returns how many cards were added.
    ///
    /// Replace clears the grid first and shows the no-results message for an
    /// empty list. Append never clears and never shows that message.
    pub fn render(&mut self, records: &[CardRecord], mode: RenderMode, opts: &RenderOptions) -> usize {
        if mode == RenderMode::Replace {
            self.cards.clear();
            self.message = None;
            if records.is_empty() {
                self.message = Some(SurfaceMessage::info(opts.labels.no_results.clone()));
                return 0;
            }
        }
        for record in records {
            self.cards.push(Card {
                doc_id: record.doc_id().map(str::to_string),
                html: render::render_card(record, opts),
            });
        }
        records.len()
    }

    /// Resolves a gesture on the card at `index` to the doc-id to open.
    pub fn activation(&self, index: usize, interaction: Interaction) -> Option<&str> {
        if !self.binding.accepts(interaction) {
            return None;
        }
        self.cards.get(index)?.doc_id.as_deref()
    }
}
