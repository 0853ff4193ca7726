//! Projection of grouped entries into page content.
//!
//! Nothing here looks at the index or the UI state directly: callers pass the
//! already computed groups and counts, and get back a [`Content`] value that
//! can be inspected structurally or serialized to HTML.

use crate::config::Labels;
use crate::index::LetterGroup;
use askama::Template;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Content {
    Loading,
    Error(ErrorView),
    Empty(EmptyView),
    Listing(Listing),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorView {
    pub message: String,
    pub retry_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmptyView {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub sections: Vec<Section>,
    pub counter: Counter,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub letter: char,
    pub cards: Vec<Card>,
}

/// One clickable name. `index` is the card's position across all sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    pub index: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Counter {
    pub label: String,
    pub count: usize,
    pub noun: String,
}

/// What a card click copies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyBinding {
    pub index: usize,
    pub text: String,
}

pub fn render(
    groups: &[LetterGroup],
    search_active: bool,
    total: usize,
    labels: &Labels,
) -> Content {
    if groups.is_empty() {
        return Content::Empty(EmptyView {
            message: labels.empty.clone(),
        });
    }
    let mut next_index = 0usize;
    let sections = groups
        .iter()
        .map(|group| Section {
            letter: group.letter,
            cards: group
                .names
                .iter()
                .map(|name| {
                    let card = Card {
                        index: next_index,
                        text: name.as_str().to_string(),
                    };
                    next_index += 1;
                    card
                })
                .collect(),
        })
        .collect();
    Content::Listing(Listing {
        sections,
        counter: counter(search_active, total, labels),
    })
}

pub fn render_loading() -> Content {
    Content::Loading
}

pub fn render_error(message: impl Into<String>, labels: &Labels) -> Content {
    Content::Error(ErrorView {
        message: message.into(),
        retry_label: labels.retry.clone(),
    })
}

pub fn counter(search_active: bool, count: usize, labels: &Labels) -> Counter {
    let label = if search_active {
        &labels.counter_found
    } else {
        &labels.counter_total
    };
    let noun = if count == 1 {
        &labels.noun_singular
    } else {
        &labels.noun_plural
    };
    Counter {
        label: label.clone(),
        count,
        noun: noun.clone(),
    }
}

pub fn subtitle(search_active: bool, labels: &Labels) -> &str {
    if search_active {
        &labels.subtitle_search
    } else {
        &labels.subtitle_all
    }
}

impl Content {
    pub fn cards(&self) -> impl Iterator<Item = &Card> + '_ {
        let sections: &[Section] = match self {
            Content::Listing(listing) => &listing.sections,
            _ => &[],
        };
        sections.iter().flat_map(|section| section.cards.iter())
    }

    /// Click targets for every rendered card, in display order.
    pub fn copy_bindings(&self) -> Vec<CopyBinding> {
        self.cards()
            .map(|card| CopyBinding {
                index: card.index,
                text: card.text.clone(),
            })
            .collect()
    }

    pub fn to_html(&self) -> Result<String, askama::Error> {
        match self {
            Content::Loading => LoadingTemplate.render(),
            Content::Error(view) => ErrorTemplate { view }.render(),
            Content::Empty(view) => EmptyTemplate { view }.render(),
            Content::Listing(listing) => ListingTemplate { listing }.render(),
        }
    }
}

#[derive(Template)]
#[template(
    source = r#"<div class="loading">
  <div class="spinner"></div>
</div>"#,
    ext = "html"
)]
struct LoadingTemplate;

#[derive(Template)]
#[template(
    source = r#"<div class="error-container">
  <svg class="error-icon" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2">
    <circle cx="12" cy="12" r="10"></circle>
    <line x1="12" y1="8" x2="12" y2="12"></line>
    <line x1="12" y1="16" x2="12.01" y2="16"></line>
  </svg>
  <p class="error-message">{{ view.message }}</p>
  <button class="retry-button" type="button" data-action="retry">
    <svg viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2">
      <path d="M21 2v6h-6"></path>
      <path d="M3 12a9 9 0 0 1 15-6.7L21 8"></path>
      <path d="M3 22v-6h6"></path>
      <path d="M21 12a9 9 0 0 1-15 6.7L3 16"></path>
    </svg>
    {{ view.retry_label }}
  </button>
</div>"#,
    ext = "html"
)]
struct ErrorTemplate<'a> {
    view: &'a ErrorView,
}

#[derive(Template)]
#[template(
    source = r#"<div class="empty-state">
  <p>{{ view.message }}</p>
</div>"#,
    ext = "html"
)]
struct EmptyTemplate<'a> {
    view: &'a EmptyView,
}

#[derive(Template)]
#[template(
    source = r#"{% for section in listing.sections %}
<div class="names-section">
  <h2 class="letter-heading">{{ section.letter }}</h2>
  <div class="names-grid">
    {% for card in section.cards %}
    <div class="name-card" data-card="{{ card.index }}" role="button" tabindex="0">
      <p>{{ card.text }}</p>
    </div>
    {% endfor %}
  </div>
</div>
{% endfor %}
<div class="total-counter">
  <p>{{ listing.counter.label }} <span>{{ listing.counter.count }}</span> {{ listing.counter.noun }}</p>
</div>"#,
    ext = "html"
)]
struct ListingTemplate<'a> {
    listing: &'a Listing,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::group_by_initial;
    use crate::parser::parse_entries;

    fn listing_for(raw: &str, search_active: bool) -> Content {
        let entries = parse_entries(raw);
        let groups = group_by_initial(&entries);
        render(&groups, search_active, entries.len(), &Labels::default())
    }

    #[test]
    fn no_groups_renders_only_the_placeholder() {
        let content = render(&[], true, 0, &Labels::default());
        assert_eq!(
            content,
            Content::Empty(EmptyView {
                message: "Nenhum nome encontrado".to_string()
            })
        );
        assert_eq!(content.cards().count(), 0);
        let html = content.to_html().unwrap();
        assert!(html.contains("empty-state"));
        assert!(!html.contains("names-grid"));
        assert!(!html.contains("total-counter"));
    }

    #[test]
    fn sections_follow_group_order_with_global_card_indexes() {
        let content = listing_for("Bia\nAna\nAlice", false);
        let Content::Listing(listing) = &content else {
            panic!("expected a listing");
        };
        let letters: Vec<char> = listing.sections.iter().map(|s| s.letter).collect();
        assert_eq!(letters, vec!['A', 'B']);
        let bindings = content.copy_bindings();
        let texts: Vec<&str> = bindings.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(texts, vec!["Alice", "Ana", "Bia"]);
        let indexes: Vec<usize> = bindings.iter().map(|b| b.index).collect();
        assert_eq!(indexes, vec![0, 1, 2]);
    }

    #[test]
    fn counter_label_and_pluralization() {
        let labels = Labels::default();
        let one = counter(false, 1, &labels);
        assert_eq!((one.label.as_str(), one.noun.as_str()), ("Total de", "nome"));
        let none = counter(true, 0, &labels);
        assert_eq!((none.label.as_str(), none.noun.as_str()), ("Encontrados", "nomes"));
        let many = counter(false, 7, &labels);
        assert_eq!(many.noun, "nomes");
    }

    #[test]
    fn counter_is_rendered_in_the_footer() {
        let html = listing_for("Ana", true).to_html().unwrap();
        assert!(html.contains("Encontrados <span>1</span> nome</p>"));
        let html = listing_for("Ana\nBia", false).to_html().unwrap();
        assert!(html.contains("Total de <span>2</span> nomes</p>"));
    }

    #[test]
    fn entry_text_is_escaped() {
        let html = listing_for("<i>Ana & \"Bia\"", false).to_html().unwrap();
        assert!(html.contains("&lt;i&gt;Ana &amp; &quot;Bia&quot;"));
        assert!(!html.contains("<i>"));
    }

    #[test]
    fn error_view_carries_a_retry_control() {
        let labels = Labels::default();
        let content = render_error(labels.load_error.clone(), &labels);
        let html = content.to_html().unwrap();
        assert!(html.contains(r#"data-action="retry""#));
        assert!(html.contains("Tentar novamente"));
        assert!(html.contains("Nao foi possivel carregar os nomes."));
    }

    #[test]
    fn loading_has_no_cards() {
        let content = render_loading();
        assert_eq!(content.copy_bindings(), Vec::new());
        assert!(content.to_html().unwrap().contains("spinner"));
    }

    #[test]
    fn subtitle_tracks_search_activity() {
        let labels = Labels::default();
        assert_eq!(subtitle(true, &labels), "Resultados da busca");
        assert_eq!(subtitle(false, &labels), "Lista completa de nomes");
    }
}
