use scraper::{Html, Selector};

use crate::core::types::SearchResult;
use crate::providers::{resolve_tracker_redirect, SearchLimits};

use super::fetch_serp_html;

pub fn parse_results(html: &str, max_results: usize) -> Vec<SearchResult> {
    let doc = Html::parse_document(html);
    let sel_item = Selector::parse("li.b_algo").unwrap();
    let sel_link = Selector::parse("h2 a").unwrap();
    let sel_snip = Selector::parse("div.b_caption p").unwrap();

    let mut out = Vec::new();
    for item in doc.select(&sel_item) {
        if out.len() >= max_results {
            break;
        }
        let Some(link) = item.select(&sel_link).next() else {
            continue;
        };
        let href_raw = link.value().attr("href").unwrap_or("");
        if href_raw.is_empty() {
            continue;
        }
        let href = resolve_tracker_redirect(href_raw);
        if !(href.starts_with("http://") || href.starts_with("https://")) {
            continue;
        }

        let title = link.text().collect::<Vec<_>>().join(" ");
        let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
        let snippet = item
            .select(&sel_snip)
            .next()
            .map(|p| p.text().collect::<Vec<_>>().join(" "))
            .unwrap_or_default();
        let snippet = snippet.split_whitespace().collect::<Vec<_>>().join(" ");

        out.push(SearchResult {
            title,
            url: href,
            snippet,
            source_provider: "html_search_bing".to_string(),
            relevance_score: 0.5,
            published_at: None,
        });
    }
    out
}

pub async fn search(
    http: &reqwest::Client,
    query: &str,
    limits: SearchLimits,
) -> Result<Vec<SearchResult>, String> {
    let mut url = reqwest::Url::parse("https://www.bing.com/search").map_err(|e| e.to_string())?;
    url.query_pairs_mut().append_pair("q", query);

    let body = fetch_serp_html(http, url, limits.timeout).await?;
    Ok(parse_results(&body, limits.max_results))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_results_on_empty_html_yields_nothing() {
        assert!(parse_results("<html><body></body></html>", 10).is_empty());
    }
}
