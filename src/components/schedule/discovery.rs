use lazy_static::lazy_static;
use scraper::{Html, Selector};
use url::Url;

/// Markers of an events widget or feed link
const FEED_MARKERS: &[&str] = &["/live/widget/", "/live/feed/"];

lazy_static! {
    static ref LINKS: Selector =
        Selector::parse("a[href], iframe[src], script[src], link[href]").expect("valid selector");
}

/// Outcome of looking for a schedule feed on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    Found(Url),
    NotFound,
}

impl Discovery {
    pub fn url(&self) -> Option<&Url> {
        match self {
            Discovery::Found(url) => Some(url),
            Discovery::NotFound => None,
        }
    }
}

/// Find the first widget/feed link on `page`, resolving relative links
/// against `base_url`.
///
/// iCal and JSON feeds are skipped since no segmenter reads them.
pub fn discover_feed(page: &str, base_url: &str) -> Discovery {
    let base = Url::parse(base_url).ok();
    let html = Html::parse_document(page);

    html.select(&LINKS)
        .filter_map(|element| {
            let value = element.value();
            value.attr("href").or_else(|| value.attr("src"))
        })
        .filter(|link| FEED_MARKERS.iter().any(|marker| link.contains(marker)))
        .find_map(|link| match &base {
            Some(base) => base.join(link).ok(),
            None => Url::parse(link).ok(),
        })
        .map(Discovery::Found)
        .unwrap_or(Discovery::NotFound)
}
