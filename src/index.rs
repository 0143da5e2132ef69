use anyhow::{Context, Result};
use regex::Regex;
use scraper::{Html, Selector};
use tracing::info;
use url::Url;

pub const START_URL: &str = "https://sillok.history.go.kr/";

/// A top-level section of the annals (one reign, one output file).
#[derive(Debug, Clone)]
pub struct SectionLink {
    pub title: String,
    pub url: String,
    pub slug: String,
}

/// Fetch the index page and return the numbered section links.
pub async fn fetch_sections(client: &reqwest::Client) -> Result<Vec<SectionLink>> {
    info!("Fetching section index: {}", START_URL);
    let html = client
        .get(START_URL)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await
        .context("Failed to fetch the section index")?;

    let base = Url::parse(START_URL)?;
    let sections = section_links(&html, &base);
    info!("Sections discovered: {}", sections.len());
    Ok(sections)
}

/// Collect links from the index content list whose text starts with a digit —
/// the numbered reign entries; header and utility links do not.
pub fn section_links(html: &str, base: &Url) -> Vec<SectionLink> {
    let document = Html::parse_document(html);
    let anchors = Selector::parse("#m_cont_list .m_cont_top a").unwrap();

    let mut sections = Vec::new();
    for element in document.select(&anchors) {
        let title = element.text().collect::<String>().trim().to_string();
        if !title.chars().next().is_some_and(|c| c.is_ascii_digit()) {
            continue;
        }
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Ok(url) = base.join(href) else {
            continue;
        };
        // Slug from the raw href: quoted script arguments survive there.
        let slug = section_slug(href);
        sections.push(SectionLink {
            title,
            url: url.to_string(),
            slug,
        });
    }
    sections
}

/// Derive a filesystem name for a section from its href.
///
/// Section links carry their id in a quoted script argument, e.g.
/// `javascript:goKing('kaa')`; prefer that fragment, fall back to the whole
/// href, then keep only `[a-zA-Z0-9_-]`.
pub fn section_slug(href: &str) -> String {
    let quoted = Regex::new(r"'([^']*)'").unwrap();
    let fragment = quoted
        .captures(href)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(href);

    fragment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(fixture: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", fixture)).unwrap()
    }

    #[test]
    fn index_keeps_only_numbered_entries() {
        let html = parse("index");
        let base = Url::parse(START_URL).unwrap();
        let sections = section_links(&html, &base);

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "1대 태조실록");
        assert_eq!(sections[1].title, "2대 정종실록");
        assert!(sections.iter().all(|s| s.url.starts_with("https://sillok.history.go.kr/")));
    }

    #[test]
    fn slug_prefers_quoted_fragment() {
        assert_eq!(section_slug("javascript:goKing('kaa')"), "kaa");
        assert_eq!(section_slug("javascript:goKing('kaa(1)')"), "kaa_1_");
    }

    #[test]
    fn slug_falls_back_to_whole_href() {
        assert_eq!(
            section_slug("/search/inspectionMonthList.do?id=kaa"),
            "_search_inspectionMonthList_do_id_kaa"
        );
    }

    #[test]
    fn slug_is_always_filesystem_safe() {
        let inputs = [
            "javascript:goKing('태조/실록')",
            "https://sillok.history.go.kr/?a=b&c=d#frag",
            "weird \"quotes\" and spaces",
            "",
        ];
        for input in inputs {
            let slug = section_slug(input);
            assert!(
                slug.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'),
                "unsafe slug {:?} from {:?}",
                slug,
                input
            );
        }
    }
}
