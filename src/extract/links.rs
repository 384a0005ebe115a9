// src/extract/links.rs
// =============================================================================
// Pulls detail-page links and the "next page" link out of a listing page.
//
// A listing page shows preview thumbnails, each wrapped in a link to its
// detail page. We find them the other way round:
// 1. Look at every <img>
// 2. Work out which URL it really shows (lazy-load attributes first, then
//    srcset, then src)
// 3. Keep it if that URL looks like a gallery preview (host marker AND path
//    marker are both in it - a cheap substring check)
// 4. Walk up to the nearest enclosing <a> and take its href
//
// All URLs come back absolute, resolved against the page they were found on.
// =============================================================================

use crate::config::SiteProfile;
use anyhow::{anyhow, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;
use url::Url;

// Attributes that may carry an image's real source, most trustworthy first.
// Lazy loaders park the genuine asset in data-* and leave a placeholder in src.
pub const SOURCE_ATTRIBUTES: [&str; 8] = [
    "data-src",
    "data-original",
    "data-lazy-src",
    "data-lazy-load",
    "data-img",
    "data-image",
    "srcset",
    "src",
];

pub struct LinkExtractor {
    images: Selector,
    anchors: Selector,
    rel_next: Selector,
    next_label: Regex,
    host_marker: String,
    path_marker: String,
}

impl LinkExtractor {
    pub fn new(site: &SiteProfile) -> Result<Self> {
        let pattern = site
            .next_page_labels
            .iter()
            .map(|label| regex::escape(label))
            .collect::<Vec<_>>()
            .join("|");

        Ok(Self {
            images: parse_selector("img")?,
            anchors: parse_selector("a[href]")?,
            rel_next: parse_selector(r#"a[rel~="next"][href]"#)?,
            next_label: Regex::new(&pattern)?,
            host_marker: site.host_marker.clone(),
            path_marker: site.path_marker.clone(),
        })
    }

    // Every detail page linked from a preview image on this listing page
    pub fn extract_detail_links(&self, html: &str, base: &Url) -> BTreeSet<Url> {
        let document = Html::parse_document(html);
        let mut links = BTreeSet::new();

        for img in document.select(&self.images) {
            let Some(source) = image_source(&img) else {
                continue;
            };
            let Some(image_url) = resolve_link(base, source) else {
                continue;
            };
            if !self.is_preview(&image_url) {
                continue;
            }

            tracing::trace!("Preview image: {}", image_url);

            let detail = enclosing_anchor(img)
                .and_then(|a| a.value().attr("href"))
                .and_then(|href| resolve_link(base, href));

            if let Some(detail) = detail {
                links.insert(detail);
            }
        }

        links
    }

    // The link to the following listing page, if there is one
    pub fn extract_next_page(&self, html: &str, base: &Url) -> Option<Url> {
        let document = Html::parse_document(html);

        let by_rel = document
            .select(&self.rel_next)
            .find_map(|a| a.value().attr("href").and_then(|href| resolve_link(base, href)));
        if by_rel.is_some() {
            return by_rel;
        }

        document
            .select(&self.anchors)
            .filter(|a| self.next_label.is_match(&a.text().collect::<String>()))
            .find_map(|a| a.value().attr("href").and_then(|href| resolve_link(base, href)))
    }

    fn is_preview(&self, url: &Url) -> bool {
        let url = url.as_str();
        url.contains(&self.host_marker) && url.contains(&self.path_marker)
    }
}

fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("bad selector '{}': {}", css, e))
}

// The first non-empty source attribute of an <img>.
// For srcset the last candidate wins (usually the largest), minus its
// width/density descriptor.
fn image_source<'a>(img: &ElementRef<'a>) -> Option<&'a str> {
    let element = img.value();

    for name in SOURCE_ATTRIBUTES {
        let Some(value) = element.attr(name).map(str::trim) else {
            continue;
        };
        if value.is_empty() {
            continue;
        }
        if name == "srcset" {
            return last_srcset_candidate(value);
        }
        return Some(value);
    }

    None
}

// "a.jpg 1x, b.jpg 2x" -> "b.jpg"
fn last_srcset_candidate(srcset: &str) -> Option<&str> {
    srcset.split(',').last()?.split_whitespace().next()
}

fn enclosing_anchor(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "a")
}

// Resolves a possibly-relative link; only http(s) results are kept
pub(crate) fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();

    // Skip empty links, anchors and special protocols
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("javascript:")
    {
        return None;
    }

    let url = base.join(href).ok()?;
    match url.scheme() {
        "http" | "https" => Some(url),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://wallspic.com/cn/album/anime";

    fn extractor() -> LinkExtractor {
        LinkExtractor::new(&SiteProfile::default()).unwrap()
    }

    fn base() -> Url {
        Url::parse(BASE).unwrap()
    }

    fn detail_links(html: &str) -> Vec<String> {
        extractor()
            .extract_detail_links(html, &base())
            .into_iter()
            .map(|u| u.to_string())
            .collect()
    }

    #[test]
    fn test_srcset_uses_last_candidate_first_token() {
        assert_eq!(last_srcset_candidate("a.jpg 1x, b.jpg 2x"), Some("b.jpg"));
        assert_eq!(last_srcset_candidate("only.jpg"), Some("only.jpg"));
        assert_eq!(last_srcset_candidate("a.jpg 320w,   "), None);
    }

    #[test]
    fn test_srcset_candidate_decides_the_match() {
        // Only the last candidate is a preview, so only it can produce a link
        let html = r#"
            <a href="/cn/image/42">
              <img srcset="https://img.wallspic.com/thumbs/a.jpg 1x, https://img.wallspic.com/previews/b.jpg 2x">
            </a>"#;
        assert_eq!(detail_links(html), vec!["https://wallspic.com/cn/image/42"]);

        let reversed = r#"
            <a href="/cn/image/42">
              <img srcset="https://img.wallspic.com/previews/a.jpg 1x, https://img.wallspic.com/thumbs/b.jpg 2x">
            </a>"#;
        assert!(detail_links(reversed).is_empty());
    }

    #[test]
    fn test_lazy_attribute_beats_src() {
        let html = r#"
            <a href="https://wallspic.com/cn/image/7">
              <img src="/static/placeholder.gif" data-src="https://img.wallspic.com/previews/7.jpg">
            </a>"#;
        assert_eq!(detail_links(html), vec!["https://wallspic.com/cn/image/7"]);
    }

    #[test]
    fn test_empty_lazy_attribute_falls_back_to_src() {
        let html = r#"
            <a href="/cn/image/8">
              <img data-src="" src="https://img.wallspic.com/previews/8.jpg">
            </a>"#;
        assert_eq!(detail_links(html), vec!["https://wallspic.com/cn/image/8"]);
    }

    #[test]
    fn test_relative_image_source_is_resolved_before_matching() {
        let base = Url::parse("https://wallspic.com/previews/list").unwrap();
        let html = r#"<a href="detail/9"><img src="nine.jpg"></a>"#;
        let links = extractor().extract_detail_links(html, &base);
        let links: Vec<String> = links.into_iter().map(|u| u.to_string()).collect();
        assert_eq!(links, vec!["https://wallspic.com/previews/detail/9"]);
    }

    #[test]
    fn test_non_preview_images_are_ignored() {
        let html = r#"
            <a href="/ad"><img src="https://ads.example.com/previews/banner.png"></a>
            <a href="/logo"><img src="https://wallspic.com/static/logo.png"></a>"#;
        assert!(detail_links(html).is_empty());
    }

    #[test]
    fn test_preview_without_usable_anchor_is_skipped() {
        let html = r#"
            <div><img src="https://img.wallspic.com/previews/1.jpg"></div>
            <a><img src="https://img.wallspic.com/previews/2.jpg"></a>
            <a href="javascript:void(0)"><img src="https://img.wallspic.com/previews/3.jpg"></a>"#;
        assert!(detail_links(html).is_empty());
    }

    #[test]
    fn test_anchor_found_through_wrappers() {
        let html = r#"
            <div class="card" data-href="/ignored">
              <a href="/cn/image/inner"><figure><picture><img src="https://img.wallspic.com/previews/x.jpg"></picture></figure></a>
            </div>"#;
        assert_eq!(detail_links(html), vec!["https://wallspic.com/cn/image/inner"]);
    }

    #[test]
    fn test_duplicates_collapse_into_one_link() {
        let html = r#"
            <a href="/cn/image/5"><img src="https://img.wallspic.com/previews/5.jpg"></a>
            <a href="https://wallspic.com/cn/image/5"><img src="https://img.wallspic.com/previews/5-alt.jpg"></a>
            <a href="/cn/image/6"><img src="https://img.wallspic.com/previews/6.jpg"></a>"#;
        assert_eq!(
            detail_links(html),
            vec!["https://wallspic.com/cn/image/5", "https://wallspic.com/cn/image/6"]
        );
    }

    #[test]
    fn test_next_page_by_rel() {
        let html = r#"<a href="/cn/album/anime?page=1">1</a><a rel="nofollow next" href="?page=2">»</a>"#;
        let next = extractor().extract_next_page(html, &base());
        assert_eq!(next.unwrap().as_str(), "https://wallspic.com/cn/album/anime?page=2");
    }

    #[test]
    fn test_next_page_by_text_in_either_locale() {
        let zh = r#"<a href="/cn/album/anime/2">下一页</a>"#;
        let en = r#"<a href="/en/album/anime/2"><span>Next</span> page</a>"#;

        let next = extractor().extract_next_page(zh, &base()).unwrap();
        assert_eq!(next.as_str(), "https://wallspic.com/cn/album/anime/2");

        let next = extractor().extract_next_page(en, &base()).unwrap();
        assert_eq!(next.as_str(), "https://wallspic.com/en/album/anime/2");
    }

    #[test]
    fn test_no_next_page() {
        let html = r#"<a href="/cn/album/anime?page=1">Previous</a><a rel="next">dead</a>"#;
        assert_eq!(extractor().extract_next_page(html, &base()), None);
    }

    #[test]
    fn test_resolve_skips_special_links() {
        let base = base();
        assert_eq!(resolve_link(&base, "#top"), None);
        assert_eq!(resolve_link(&base, "mailto:someone@example.com"), None);
        assert_eq!(resolve_link(&base, "  "), None);
        assert_eq!(
            resolve_link(&base, "/cn/image/1").unwrap().as_str(),
            "https://wallspic.com/cn/image/1"
        );
    }
}
