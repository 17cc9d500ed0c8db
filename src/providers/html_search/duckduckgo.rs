use scraper::{Html, Selector};

use crate::core::types::SearchResult;
use crate::providers::SearchLimits;

use super::fetch_serp_html;

fn normalize_ddg_href(href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let candidate = if href.starts_with("//") {
        format!("https:{href}")
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{href}")
    } else {
        href.to_string()
    };

    if let Ok(url) = reqwest::Url::parse(&candidate) {
        if matches!(url.host_str(), Some("duckduckgo.com")) && url.path().starts_with("/l/") {
            for (k, v) in url.query_pairs() {
                if k == "uddg" && !v.trim().is_empty() {
                    return Some(v.to_string());
                }
            }
        }
    }

    if candidate.starts_with("http://") || candidate.starts_with("https://") {
        return Some(candidate);
    }

    None
}

pub fn parse_results(html: &str, max_results: usize) -> Vec<SearchResult> {
    let doc = Html::parse_document(html);
    let sel_item = Selector::parse("div.results_links").unwrap();
    let sel_link = Selector::parse("a.result__a").unwrap();
    let sel_snip = Selector::parse("a.result__snippet, div.result__snippet").unwrap();

    let mut out = Vec::new();
    for item in doc.select(&sel_item) {
        if out.len() >= max_results {
            break;
        }

        let Some(link) = item.select(&sel_link).next() else {
            continue;
        };
        let href_raw = link.value().attr("href").unwrap_or("");
        let Some(href) = normalize_ddg_href(href_raw) else {
            continue;
        };
        let title = link.text().collect::<Vec<_>>().join(" ");
        let title = title.split_whitespace().collect::<Vec<_>>().join(" ");

        let snippet = item
            .select(&sel_snip)
            .next()
            .map(|n| n.text().collect::<Vec<_>>().join(" "))
            .unwrap_or_default();
        let snippet = snippet.split_whitespace().collect::<Vec<_>>().join(" ");

        out.push(SearchResult {
            title,
            url: href,
            snippet,
            source_provider: "html_search_duckduckgo".to_string(),
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
    let mut url =
        reqwest::Url::parse("https://duckduckgo.com/html/").map_err(|e| e.to_string())?;
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

    #[test]
    fn normalize_ddg_href_extracts_uddg_target() {
        let wrapped = "//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com%2Fpage&rut=abc";
        assert_eq!(
            normalize_ddg_href(wrapped),
            Some("https://example.com/page".to_string())
        );
    }
}
