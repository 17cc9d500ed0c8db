use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use scraper::{ElementRef, Html, Selector};

use crate::core::types::SearchResult;
use crate::providers::{resolve_tracker_redirect, SearchLimits};

use super::fetch_serp_html;

fn normalize_google_href(href: &str) -> Option<String> {
    if href.is_empty() {
        return None;
    }
    if href.starts_with("/url?") {
        if let Ok(url) = reqwest::Url::parse(&format!("https://www.google.com{href}")) {
            for (k, v) in url.query_pairs() {
                if k == "q" && !v.is_empty() {
                    return Some(v.to_string());
                }
            }
        }
        return None;
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(resolve_tracker_redirect(href));
    }
    None
}

fn extract_snippet(container: &ElementRef<'_>) -> String {
    let candidates = ["div.VwiC3b", "div.IsZvec", "span.aCOpRe", "div.MUxGbd"];
    for css in candidates {
        if let Ok(sel) = Selector::parse(css) {
            if let Some(n) = container.select(&sel).next() {
                let trimmed = n.text().collect::<Vec<_>>().join(" ");
                let trimmed = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
                if trimmed.len() >= 20 {
                    return trimmed;
                }
            }
        }
    }
    String::new()
}

pub fn parse_results(html: &str, max_results: usize) -> Vec<SearchResult> {
    let doc = Html::parse_document(html);
    let container_selectors = ["div#search div.MjjYud", "div#search div.g"];
    let link_sel = Selector::parse("a").unwrap();
    let h3_sel = Selector::parse("h3").unwrap();

    let mut out = Vec::new();
    'outer: for css in container_selectors {
        let Ok(container_sel) = Selector::parse(css) else {
            continue;
        };

        for container in doc.select(&container_sel) {
            if out.len() >= max_results {
                break 'outer;
            }

            let mut chosen: Option<(String, String)> = None;
            for a in container.select(&link_sel) {
                if a.select(&h3_sel).next().is_some() {
                    let href = a.value().attr("href").unwrap_or("");
                    let Some(url) = normalize_google_href(href) else {
                        continue;
                    };
                    let title = a
                        .select(&h3_sel)
                        .next()
                        .map(|h| h.text().collect::<Vec<_>>().join(" "))
                        .unwrap_or_default();
                    let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
                    if title.is_empty() {
                        continue;
                    }
                    chosen = Some((url, title));
                    break;
                }
            }

            let Some((url, title)) = chosen else {
                continue;
            };
            if url.contains("google.com") {
                continue;
            }

            let snippet = extract_snippet(&container);
            out.push(SearchResult {
                title,
                url,
                snippet,
                source_provider: "html_search_google".to_string(),
                relevance_score: 0.55,
                published_at: None,
            });
        }

        if !out.is_empty() {
            break;
        }
    }

    out
}

pub async fn search(
    http: &reqwest::Client,
    query: &str,
    limits: SearchLimits,
) -> Result<Vec<SearchResult>, String> {
    let encoded = utf8_percent_encode(query, NON_ALPHANUMERIC).to_string();
    let url = reqwest::Url::parse(&format!(
        "https://www.google.com/search?q={}&hl=pt-BR&num={}",
        encoded,
        limits.max_results.clamp(5, 10)
    ))
    .map_err(|e| e.to_string())?;

    let body = fetch_serp_html(http, url, limits.timeout).await?;
    Ok(parse_results(&body, limits.max_results))
}
