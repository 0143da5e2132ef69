//! Fixed-position extraction for the three sillok page shapes.
//!
//! Every locator here is hand-bound to this one site's markup; nothing
//! generalizes. Positional `nth-of-type` steps mirror the nesting the pages
//! actually use, so a site redesign breaks these first.

use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::output::Record;

/// Main listing on a section page; each `li > ul` inside it is one
/// sub-section group of volume links.
const SECTION_LISTING: &str = "#cont_area > div > div:nth-of-type(2) > ul:nth-of-type(2)";
const VOLUME_GROUP: &str = "li > ul";

/// Definition list of article links on a volume page (first match only).
const ARTICLE_LIST: &str = "#cont_area > div:nth-of-type(1) > div:nth-of-type(3) > div > dl";

const ARTICLE_TITLE: &str = "#cont_area > div:nth-of-type(1) > ul:nth-of-type(1)";
const HANGUL_COLUMN: &str =
    "#cont_area > div:nth-of-type(1) > div:nth-of-type(3) > div:nth-of-type(1) > div > div";
const HANJA_COLUMN: &str =
    "#cont_area > div:nth-of-type(1) > div:nth-of-type(3) > div:nth-of-type(2) > div > div";

/// Search form whose action attribute is the article's canonical URL.
const SEARCH_FORM: &str = "form#topSearchForm";

// Selector constants are known-valid CSS, so unwrap is fine here.
fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap()
}

/// Volume links from a section page, grouped by sub-section block.
pub fn volume_groups(html: &str, page_url: &Url) -> Result<Vec<Vec<String>>> {
    let document = Html::parse_document(html);
    let listing = document
        .select(&selector(SECTION_LISTING))
        .next()
        .ok_or_else(|| anyhow!("Section listing not found"))?;

    Ok(listing
        .select(&selector(VOLUME_GROUP))
        .map(|group| anchor_hrefs(group, page_url))
        .collect())
}

/// Leaf article links from a volume page.
pub fn article_links(html: &str, page_url: &Url) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let list = document
        .select(&selector(ARTICLE_LIST))
        .next()
        .ok_or_else(|| anyhow!("Article list not found"))?;

    Ok(anchor_hrefs(list, page_url))
}

fn anchor_hrefs(scope: ElementRef<'_>, page_url: &Url) -> Vec<String> {
    scope
        .select(&selector("a"))
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| page_url.join(href).ok())
        .map(|url| url.to_string())
        .collect()
}

/// Extract one bilingual record from an article page.
///
/// Fails if any of the four lookups comes up empty; the caller logs and
/// skips the page, so a failed extraction never produces a record.
pub fn extract_record(html: &str) -> Result<Record> {
    let document = Html::parse_document(html);

    let url = document
        .select(&selector(SEARCH_FORM))
        .next()
        .and_then(|form| form.value().attr("action"))
        .map(str::trim)
        .filter(|action| !action.is_empty())
        .ok_or_else(|| anyhow!("Search form action not found"))?
        .to_string();

    let title = element_text(&document, ARTICLE_TITLE)
        .ok_or_else(|| anyhow!("Title block not found"))?;
    let hangul = paragraph_text(&document, HANGUL_COLUMN)
        .ok_or_else(|| anyhow!("Hangul column not found"))?;
    let hanja = paragraph_text(&document, HANJA_COLUMN)
        .ok_or_else(|| anyhow!("Hanja column not found"))?;

    Ok(Record {
        title,
        hangul,
        hanja,
        url,
    })
}

fn element_text(document: &Html, css: &str) -> Option<String> {
    document
        .select(&selector(css))
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Concatenated `<p>` texts under the first match, no separator — the
/// columns split one continuous text over many paragraphs.
fn paragraph_text(document: &Html, css: &str) -> Option<String> {
    let column = document.select(&selector(css)).next()?;
    let text: String = column
        .select(&selector("p"))
        .map(|p| p.text().collect::<String>())
        .collect();
    let text = text.trim().to_string();
    (!text.is_empty()).then_some(text)
}
