//! Catalog listing extraction.
//!
//! One listing page yields a deduplicated map of product id to listing
//! identity plus the next-page link. The storefront serves two catalog
//! layouts; the primary container selector is tried first and the fallback
//! is used when it matches nothing, so both flow through the same pass.

use std::collections::HashMap;

use scraper::{ElementRef, Html, Selector};

use gamedeals_core::{ListingIdentity, SelectorConfig};

use crate::error::ScraperError;

/// Compiled selector set; build once and reuse across pages.
#[derive(Debug, Clone)]
pub struct ListingSelectors {
    item_primary: Selector,
    item_fallback: Selector,
    link: Selector,
    image: Selector,
    name: Selector,
    next_page: Selector,
    id_prefix: String,
}

impl ListingSelectors {
    /// Compiles all configured CSS selectors.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidSelector`] naming the first selector
    /// string that fails to parse.
    pub fn compile(config: &SelectorConfig) -> Result<Self, ScraperError> {
        Ok(Self {
            item_primary: compile_one(&config.item_primary)?,
            item_fallback: compile_one(&config.item_fallback)?,
            link: compile_one(&config.link)?,
            image: compile_one(&config.image)?,
            name: compile_one(&config.name)?,
            next_page: compile_one(&config.next_page)?,
            id_prefix: config.id_prefix.clone(),
        })
    }
}

fn compile_one(selector: &str) -> Result<Selector, ScraperError> {
    Selector::parse(selector).map_err(|e| ScraperError::InvalidSelector {
        selector: selector.to_owned(),
        reason: e.to_string(),
    })
}

/// Result of extracting one catalog page.
#[derive(Debug, Clone, Default)]
pub struct ListingPage {
    /// Product id → identity, deduplicated (a later tile with the same id
    /// wins). Empty means the catalog is exhausted.
    pub items: HashMap<String, ListingIdentity>,
    /// Absolute URL of the next catalog page; `None` when the pagination
    /// control is absent (end of catalog).
    pub next_url: Option<String>,
}

/// Extracts product identities and the next-page link from raw listing HTML.
#[must_use]
pub fn extract_listing(html: &str, selectors: &ListingSelectors) -> ListingPage {
    let document = Html::parse_document(html);

    let mut items = HashMap::new();
    let mut tiles = document.select(&selectors.item_primary).peekable();
    if tiles.peek().is_some() {
        for tile in tiles {
            extract_tile(tile, selectors, &mut items);
        }
    } else {
        for tile in document.select(&selectors.item_fallback) {
            extract_tile(tile, selectors, &mut items);
        }
    }

    // Navigation tiles share the product CSS classes; the id prefix
    // convention is what tells them apart.
    items.retain(|id, _| id.starts_with(&selectors.id_prefix));

    let next_url = document
        .select(&selectors.next_page)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(str::to_owned);

    ListingPage { items, next_url }
}

fn extract_tile(
    tile: ElementRef<'_>,
    selectors: &ListingSelectors,
    items: &mut HashMap<String, ListingIdentity>,
) {
    let Some(link_el) = tile.select(&selectors.link).next() else {
        return;
    };
    let Some(href) = link_el.value().attr("href") else {
        return;
    };
    let Some(id) = trailing_path_segment(href) else {
        return;
    };

    let image = tile
        .select(&selectors.image)
        .next()
        .and_then(|el| el.value().attr("data-src"))
        .map(str::to_owned);

    let name = tile
        .select(&selectors.name)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_owned())
        .unwrap_or_default();

    items.insert(
        id.to_owned(),
        ListingIdentity {
            name,
            image,
            link: Some(href.to_owned()),
        },
    );
}

/// The final path segment of a product link, which doubles as its id.
fn trailing_path_segment(href: &str) -> Option<&str> {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selectors() -> ListingSelectors {
        ListingSelectors::compile(&SelectorConfig::default()).unwrap()
    }

    fn product_tile(id: &str, name: &str) -> String {
        format!(
            r#"<li class="product-item-info">
                 <a class="product-item-photo" href="https://store.example.com/games/{id}"></a>
                 <img class="product-image-photo" data-src="https://img.example.com/{id}.png"/>
                 <a class="product-item-link"> {name} </a>
               </li>"#
        )
    }

    fn category_tile(id: &str, name: &str) -> String {
        format!(
            r#"<li class="category-item-info">
                 <a class="product-item-photo" href="https://store.example.com/games/{id}"></a>
                 <img class="product-image-photo" data-src="https://img.example.com/{id}.png"/>
                 <a class="product-item-link">{name}</a>
               </li>"#
        )
    }

    const NEXT_LINK: &str = r#"<li class="pages-item-next">
        <a class="next" href="https://store.example.com/games?product_list_limit=24&p=2">Next</a>
    </li>"#;

    #[test]
    fn extracts_identity_from_product_layout() {
        let html = format!("<ul>{}</ul>", product_tile("70000001", "Game A"));
        let page = extract_listing(&html, &selectors());

        let identity = &page.items["70000001"];
        assert_eq!(identity.name, "Game A");
        assert_eq!(
            identity.image.as_deref(),
            Some("https://img.example.com/70000001.png")
        );
        assert_eq!(
            identity.link.as_deref(),
            Some("https://store.example.com/games/70000001")
        );
    }

    #[test]
    fn primary_layout_wins_when_present() {
        let html = format!(
            "<ul>{}{}</ul>",
            category_tile("70000001", "Category Game"),
            product_tile("70000002", "Grid Game"),
        );
        let page = extract_listing(&html, &selectors());
        // Category tiles matched, so the fallback pass never ran.
        assert_eq!(page.items.len(), 1);
        assert!(page.items.contains_key("70000001"));
    }

    #[test]
    fn falls_back_to_product_layout() {
        let html = format!("<ul>{}</ul>", product_tile("70000002", "Grid Game"));
        let page = extract_listing(&html, &selectors());
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items["70000002"].name, "Grid Game");
    }

    #[test]
    fn drops_ids_without_required_prefix() {
        let html = format!(
            "<ul>{}{}</ul>",
            product_tile("70012345", "Real Game"),
            product_tile("12345", "Navigation Tile"),
        );
        let page = extract_listing(&html, &selectors());
        assert!(page.items.contains_key("70012345"));
        assert!(!page.items.contains_key("12345"));
    }

    #[test]
    fn duplicate_ids_deduplicate_to_last_tile() {
        let html = format!(
            "<ul>{}{}</ul>",
            product_tile("70000001", "First"),
            product_tile("70000001", "Second"),
        );
        let page = extract_listing(&html, &selectors());
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items["70000001"].name, "Second");
    }

    #[test]
    fn name_text_is_trimmed() {
        let page = extract_listing(
            &format!("<ul>{}</ul>", product_tile("70000001", "  Spaced Out  ")),
            &selectors(),
        );
        assert_eq!(page.items["70000001"].name, "Spaced Out");
    }

    #[test]
    fn no_matches_for_either_layout_yields_empty_map() {
        let page = extract_listing("<div><p>maintenance page</p></div>", &selectors());
        assert!(page.items.is_empty());
        assert!(page.next_url.is_none());
    }

    #[test]
    fn extracts_next_page_link() {
        let html = format!(
            "<ul>{}</ul>{NEXT_LINK}",
            product_tile("70000001", "Game A")
        );
        let page = extract_listing(&html, &selectors());
        assert_eq!(
            page.next_url.as_deref(),
            Some("https://store.example.com/games?product_list_limit=24&p=2")
        );
    }

    #[test]
    fn absent_pagination_control_yields_no_next_url() {
        let html = format!("<ul>{}</ul>", product_tile("70000001", "Game A"));
        let page = extract_listing(&html, &selectors());
        assert!(page.next_url.is_none());
    }

    #[test]
    fn tile_without_link_is_skipped() {
        let html = r#"<li class="product-item-info">
            <img class="product-image-photo" data-src="https://img.example.com/x.png"/>
        </li>"#;
        let page = extract_listing(html, &selectors());
        assert!(page.items.is_empty());
    }

    #[test]
    fn trailing_path_segment_handles_query_and_slash() {
        assert_eq!(
            trailing_path_segment("https://s.example/games/70000001"),
            Some("70000001")
        );
        assert_eq!(
            trailing_path_segment("https://s.example/games/70000001/"),
            Some("70000001")
        );
        assert_eq!(
            trailing_path_segment("https://s.example/games/70000001?ref=home"),
            Some("70000001")
        );
        assert_eq!(trailing_path_segment(""), None);
    }

    #[test]
    fn compile_rejects_bad_selector() {
        let config = SelectorConfig {
            item_primary: ":::".to_owned(),
            ..SelectorConfig::default()
        };
        let err = ListingSelectors::compile(&config).unwrap_err();
        assert!(
            matches!(err, ScraperError::InvalidSelector { ref selector, .. } if selector == ":::"),
            "expected InvalidSelector, got: {err:?}"
        );
    }
}
