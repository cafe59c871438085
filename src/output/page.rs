use crate::modal::DetailModal;
use crate::orchestrator::PageView;
use crate::render::escape_html;
use crate::surface::{Surface, SurfaceKind};

fn grid_id(kind: SurfaceKind) -> &'static str {
    match kind {
        SurfaceKind::AllProducts => "product-grid",
        SurfaceKind::Keyword => "keyword-results-grid",
        SurfaceKind::Semantic => "semantic-suggestions-grid",
    }
}

fn section_html(surface: &Surface, load_more_label: &str) -> String {
    let mut out = String::new();
    let hidden = if surface.visible { "" } else { " hidden" };
    out.push_str(&format!(
        "    <section id=\"{}\" class=\"results-section\"{hidden}>\n",
        surface.kind.element_id()
    ));
    out.push_str(&format!("      <h2>{}</h2>\n", escape_html(&surface.title)));
    if let Some(message) = surface.message.as_ref() {
        out.push_str("      ");
        out.push_str(message.to_fragment().as_str());
        out.push('\n');
    }
    out.push_str(&format!(
        "      <div id=\"{}\" class=\"product-grid\">\n",
        grid_id(surface.kind)
    ));
    for card in &surface.cards {
        out.push_str("        ");
        out.push_str(card.html.as_str());
        out.push('\n');
    }
    out.push_str("      </div>\n");
    if surface.load_more {
        out.push_str(&format!(
            "      <button class=\"btn-load-more\" type=\"button\">{}</button>\n",
            escape_html(load_more_label)
        ));
    }
    out.push_str("    </section>\n");
    out
}

fn category_select(view: &PageView) -> String {
    let mut out = String::from("      <select id=\"category-select\">\n");
    out.push_str("        <option value=\"\">All categories</option>\n");
    for category in &view.categories {
        let selected = if *category == view.form.category {
            " selected"
        } else {
            ""
        };
        let category = escape_html(category);
        out.push_str(&format!(
            "        <option value=\"{category}\"{selected}>{category}</option>\n"
        ));
    }
    out.push_str("      </select>\n");
    out
}

fn modal_html(modal: &DetailModal) -> String {
    if !modal.open {
        return String::new();
    }
    let mut out = String::new();
    out.push_str("  <div id=\"product-modal\" class=\"modal is-open\" aria-hidden=\"false\">\n");
    out.push_str("    <div class=\"modal-container\" role=\"dialog\" aria-modal=\"true\">\n");
    out.push_str(&format!(
        "      <h2 id=\"modal-title\">{}</h2>\n",
        escape_html(&modal.title)
    ));
    out.push_str("      <div id=\"modal-content-main\"><div class=\"modal-product-details\">");
    out.push_str(modal.body.as_str());
    out.push_str("</div></div>\n");
    out.push_str("      <div id=\"modal-recommendation-list\">\n");
    if let Some(message) = modal.recommendations_message.as_ref() {
        out.push_str("        ");
        out.push_str(message.to_fragment().as_str());
        out.push('\n');
    }
    for card in &modal.recommendations {
        out.push_str("        ");
        out.push_str(card.html.as_str());
        out.push('\n');
    }
    out.push_str("      </div>\n    </div>\n  </div>\n");
    out
}

/// A standalone HTML document of the page as it currently stands.
pub fn render_html(view: &PageView) -> Vec<u8> {
    let sections: String = view
        .surfaces()
        .iter()
        .map(|s| section_html(s, "Load more"))
        .collect();

    let html = format!(
        r####"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8"/>
  <meta content="width=device-width, initial-scale=1.0" name="viewport"/>
  <title>Storefront</title>
  <link href="https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.5.1/css/all.min.css" rel="stylesheet"/>
</head>
<body>
  <header>
    <form id="search-form">
      <input id="search-input" type="search" value="{query}" placeholder="Search products..."/>
{select}      <button type="submit">Search</button>
    </form>
  </header>
  <main>
{sections}  </main>
{modal}</body>
</html>
"####,
        query = escape_html(&view.form.query),
        select = category_select(view),
        modal = modal_html(&view.modal),
    );

    html.into_bytes()
}
