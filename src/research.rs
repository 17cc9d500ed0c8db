//! Deep Researcher (C6).
//!
//! Three nested fan-outs: multi-engine search → internal-link
//! expansion on the best level-1 pages → AI-free vocabulary-derived related
//! queries. Uses C2 (providers), C3 (filter), C4 (extractor), C5 (quality).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use moka::future::Cache;
use scraper::{Html, Selector};

use crate::core::types::{Context, ExtractedPage, ResearchData, SourceDetail};
use crate::extractor;
use crate::filter;
use crate::keypool::SharedKeyPool;
use crate::providers::{is_preferred_domain, Searcher, SearchLimits};
use crate::quality;

/// Within-run dedup cache: levels 1-3 frequently rediscover the same URL
/// (an internal link from level 2 often matches a level-1 or level-3 hit),
/// and extraction is the single most expensive step in the pipeline.
/// Scoped to one `research()` call — never shared across sessions, so a
/// stale score from an earlier run can never leak into a later one.
type ExtractionCache = Cache<String, Option<ExtractedPage>>;

fn new_extraction_cache() -> ExtractionCache {
    Cache::builder().max_capacity(10_000).build()
}

const STOPWORDS: &[&str] = &[
    "para", "como", "mais", "esse", "essa", "isso", "sobre", "entre", "também", "pode", "ser",
    "seus", "suas", "qual", "quais", "quando", "onde", "porque", "the", "and", "for", "with",
    "that", "this", "from", "have", "has", "are", "was", "were",
];

const TREND_KEYWORDS: &[&str] = &[
    "ia", "inteligência artificial", "automação", "sustentabilidade", "personalização", "mobile",
    "cloud", "analytics", "ai", "automation", "sustainability", "personalization",
];

const OPPORTUNITY_KEYWORDS: &[&str] = &["oportunidade", "potencial", "lacuna", "demanda reprimida", "mercado emergente", "opportunity", "potential", "gap", "unmet demand", "emerging market"];

const INSIGHT_MARKERS: &[&str] = &["growth", "market", "opportunity", "trend", "crescimento", "mercado", "oportunidade", "tendência"];

/// `Collect`'s research phase entry point: run the full 3-level dig for
/// `query` against every registered web provider.
pub async fn research(
    http: &reqwest::Client,
    keypool: &SharedKeyPool,
    providers: &[Arc<dyn Searcher>],
    query: &str,
    context: &Context,
    max_pages: usize,
) -> (ResearchData, Vec<ExtractedPage>) {
    let cache = new_extraction_cache();
    let level1 = level1_fanout(http, keypool, providers, query, context, max_pages, &cache).await;

    if level1.is_empty() {
        let data = ResearchData {
            emergency_mode: true,
            emergency_reason: Some("level 1 fan-out produced zero qualifying pages".to_string()),
            ..Default::default()
        };
        return (data, Vec::new());
    }

    let level2 = level2_expansion(http, keypool, &level1, context, &cache).await;

    let mut ranked = level1;
    ranked.extend(level2);
    ranked = dedup_by_url(ranked);

    let level3 = level3_related_queries(http, keypool, providers, &ranked, context, &cache).await;
    ranked.extend(level3);
    ranked = dedup_by_url(ranked);

    ranked.sort_by(|a, b| b.quality_score.partial_cmp(&a.quality_score).unwrap_or(std::cmp::Ordering::Equal));

    let data = build_research_data(ranked.clone());
    (data, ranked)
}

fn dedup_by_url(pages: Vec<ExtractedPage>) -> Vec<ExtractedPage> {
    let mut seen = HashSet::new();
    pages.into_iter().filter(|p| seen.insert(p.url.clone())).collect()
}

async fn extract_and_score(
    http: &reqwest::Client,
    keypool: &SharedKeyPool,
    url: &str,
    title_hint: &str,
    snippet: &str,
    source_provider: &str,
    context: &Context,
    cache: &ExtractionCache,
) -> Option<ExtractedPage> {
    if !filter::is_relevant(url, title_hint, snippet) {
        return None;
    }

    let cache_key = crate::providers::normalize_url_key(url);
    if let Some(cached) = cache.get(&cache_key).await {
        return cached;
    }

    let result = extract_one(http, keypool, url, title_hint, source_provider, context).await;
    cache.insert(cache_key, result.clone()).await;
    result
}

async fn extract_one(
    http: &reqwest::Client,
    keypool: &SharedKeyPool,
    url: &str,
    title_hint: &str,
    source_provider: &str,
    context: &Context,
) -> Option<ExtractedPage> {
    let extraction = extractor::extract(http, keypool, url).await.ok()?;
    let score = quality::score(&extraction.content, url, context);
    if score < quality::MIN_QUALITY_SCORE {
        return None;
    }
    let host = url::Url::parse(url).ok().and_then(|u| u.host_str().map(|h| h.to_string())).unwrap_or_default();
    let word_count = extraction.content.split_whitespace().count();
    Some(ExtractedPage {
        url: url.to_string(),
        title: extraction.title.unwrap_or_else(|| title_hint.to_string()),
        content_text: extraction.content,
        quality_score: score,
        insights: Vec::new(),
        is_preferred_source: is_preferred_domain(&host),
        word_count,
        extraction_method: extraction.method.as_str().to_string(),
        extracted_at: crate::core::now_iso8601(),
        source_provider: Some(source_provider.to_string()),
    })
}

async fn level1_fanout(
    http: &reqwest::Client,
    keypool: &SharedKeyPool,
    providers: &[Arc<dyn Searcher>],
    query: &str,
    context: &Context,
    max_pages: usize,
    cache: &ExtractionCache,
) -> Vec<ExtractedPage> {
    if providers.is_empty() {
        return Vec::new();
    }
    let per_engine_cap = (max_pages / providers.len()).max(1);
    let limits = SearchLimits {
        max_results: per_engine_cap,
        timeout: Duration::from_secs(30),
    };

    let searches = providers.iter().map(|p| {
        let http = http.clone();
        let keypool = keypool.clone();
        let query = query.to_string();
        let p = p.clone();
        async move { p.search(&http, &keypool, &query, limits).await.into_items() }
    });
    let results = join_all(searches).await.into_iter().flatten().collect::<Vec<_>>();

    let extractions = results.into_iter().map(|r| {
        let http = http.clone();
        let keypool = keypool.clone();
        let context = context.clone();
        async move {
            extract_and_score(&http, &keypool, &r.url, &r.title, &r.snippet, &r.source_provider, &context, cache).await
        }
    });

    join_all(extractions).await.into_iter().flatten().collect()
}

/// From the top 5 level-1 pages, enumerate same-host anchors (excluding
/// self, fragments, and binary extensions), take up to 3 per parent, and
/// run each through filter → extract → score.
async fn level2_expansion(
    http: &reqwest::Client,
    keypool: &SharedKeyPool,
    level1: &[ExtractedPage],
    context: &Context,
    cache: &ExtractionCache,
) -> Vec<ExtractedPage> {
    let mut top5 = level1.to_vec();
    top5.sort_by(|a, b| b.quality_score.partial_cmp(&a.quality_score).unwrap_or(std::cmp::Ordering::Equal));
    top5.truncate(5);

    let mut tasks = Vec::new();
    for parent in &top5 {
        let Ok(parent_url) = url::Url::parse(&parent.url) else { continue };
        let Ok(resp) = http.get(parent_url.clone()).timeout(Duration::from_secs(20)).send().await else { continue };
        let Ok(html) = resp.text().await else { continue };
        let links = same_host_links(&html, &parent_url);
        for link in links.into_iter().take(3) {
            let http = http.clone();
            let keypool = keypool.clone();
            let context = context.clone();
            tasks.push(async move {
                extract_and_score(&http, &keypool, &link, "", "", "internal_link", &context, cache).await
            });
        }
    }

    join_all(tasks).await.into_iter().flatten().collect()
}

fn same_host_links(html: &str, base: &url::Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(sel) = Selector::parse("a[href]") else { return Vec::new() };
    let base_host = base.host_str().unwrap_or("").to_string();

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for el in document.select(&sel) {
        let Some(href) = el.value().attr("href") else { continue };
        if href.starts_with('#') {
            continue;
        }
        let Ok(joined) = base.join(href) else { continue };
        if joined.as_str() == base.as_str() {
            continue;
        }
        if joined.host_str() != Some(base_host.as_str()) {
            continue;
        }
        let lower = joined.path().to_ascii_lowercase();
        if [".pdf", ".jpg", ".jpeg", ".png", ".gif", ".zip", ".mp4"].iter().any(|ext| lower.ends_with(ext)) {
            continue;
        }
        let key = joined.to_string();
        if seen.insert(key.clone()) {
            out.push(key);
        }
    }
    out
}

/// Build a vocabulary from level-1 content (4+ letter tokens, frequency >
/// 3, stopword-filtered), combine with segment/product slots, synthesize
/// up to 8 related queries, run the top 3 through the primary web provider.
async fn level3_related_queries(
    http: &reqwest::Client,
    keypool: &SharedKeyPool,
    providers: &[Arc<dyn Searcher>],
    level1_and_2: &[ExtractedPage],
    context: &Context,
    cache: &ExtractionCache,
) -> Vec<ExtractedPage> {
    let Some(primary) = providers.first() else { return Vec::new() };

    let mut freq: HashMap<String, usize> = HashMap::new();
    for page in level1_and_2 {
        for token in page.content_text.split_whitespace() {
            let t = token
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if t.chars().count() < 4 || STOPWORDS.contains(&t.as_str()) {
                continue;
            }
            *freq.entry(t).or_insert(0) += 1;
        }
    }

    let mut terms: Vec<(String, usize)> = freq.into_iter().filter(|(_, n)| *n > 3).collect();
    terms.sort_by(|a, b| b.1.cmp(&a.1));

    let segment = context.segment.clone().unwrap_or_default();
    let related: Vec<String> = terms
        .iter()
        .take(8)
        .map(|(term, _)| format!("{term} {segment} opportunities").trim().to_string())
        .collect();

    let limits = SearchLimits {
        max_results: 5,
        timeout: Duration::from_secs(30),
    };

    let mut tasks = Vec::new();
    for q in related.into_iter().take(3) {
        let http = http.clone();
        let keypool = keypool.clone();
        let primary = primary.clone();
        let context = context.clone();
        tasks.push(async move {
            let items = primary.search(&http, &keypool, &q, limits).await.into_items();
            let mut pages = Vec::new();
            for item in items {
                if let Some(page) = extract_and_score(&http, &keypool, &item.url, &item.title, &item.snippet, &item.source_provider, &context, cache).await {
                    pages.push(page);
                }
            }
            pages
        });
    }

    join_all(tasks).await.into_iter().flatten().collect()
}

/// Mine `top_insights`, `trends`, and `opportunities` as sentence-level
/// snippets, plus per-source details, from the final ranked page set.
fn build_research_data(pages: Vec<ExtractedPage>) -> ResearchData {
    let mut top_insights = Vec::new();
    let mut trends = Vec::new();
    let mut opportunities = Vec::new();
    let mut seen_insights = HashSet::new();

    for page in &pages {
        for sentence in split_sentences(&page.content_text) {
            let trimmed = sentence.trim();
            if trimmed.chars().count() < 80 {
                continue;
            }
            let lower = trimmed.to_lowercase();

            if top_insights.len() < 20
                && INSIGHT_MARKERS.iter().any(|m| lower.contains(m))
                && seen_insights.insert(trimmed.to_string())
            {
                top_insights.push(trimmed.to_string());
            }
            if trends.len() < 20 && TREND_KEYWORDS.iter().any(|k| lower.contains(k)) {
                trends.push(trimmed.to_string());
            }
            if opportunities.len() < 20 && OPPORTUNITY_KEYWORDS.iter().any(|k| lower.contains(k)) {
                opportunities.push(trimmed.to_string());
            }
        }
        if top_insights.len() >= 20 {
            break;
        }
    }

    let sources = pages
        .iter()
        .map(|p| SourceDetail {
            url: p.url.clone(),
            title: p.title.clone(),
            quality_score: p.quality_score,
            source_provider: p.source_provider.clone().unwrap_or_default(),
            is_preferred_source: p.is_preferred_source,
        })
        .collect();

    ResearchData {
        top_insights,
        trends,
        opportunities,
        sources,
        emergency_mode: false,
        emergency_reason: None,
    }
}

fn split_sentences(text: &str) -> Vec<String> {
    text.split(['.', '!', '?'])
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_sentences_strips_punctuation_and_blanks() {
        let sentences = split_sentences("First sentence. Second one! Third? ");
        assert_eq!(sentences, vec!["First sentence", "Second one", "Third"]);
    }

    #[test]
    fn build_research_data_mines_insights_trends_opportunities() {
        let pages = vec![ExtractedPage {
            url: "https://example.com/a".into(),
            title: "A".into(),
            content_text: "O mercado de telemedicina no Brasil apresenta grande oportunidade de crescimento para novos entrantes no setor de saude digital. A automação e a inteligência artificial são tendências fortes no setor em 2026.".into(),
            quality_score: 80.0,
            insights: vec![],
            is_preferred_source: true,
            word_count: 30,
            extraction_method: "readability".into(),
            extracted_at: "now".into(),
            source_provider: Some("custom_web_search".into()),
        }];
        let data = build_research_data(pages);
        assert!(!data.top_insights.is_empty());
        assert!(!data.trends.is_empty());
        assert!(!data.opportunities.is_empty());
        assert_eq!(data.sources.len(), 1);
    }

    #[test]
    fn dedup_by_url_keeps_first_occurrence() {
        let page = |u: &str| ExtractedPage {
            url: u.into(),
            title: String::new(),
            content_text: String::new(),
            quality_score: 0.0,
            insights: vec![],
            is_preferred_source: false,
            word_count: 0,
            extraction_method: "readability".into(),
            extracted_at: String::new(),
            source_provider: None,
        };
        let deduped = dedup_by_url(vec![page("https://a.com"), page("https://a.com"), page("https://b.com")]);
        assert_eq!(deduped.len(), 2);
    }
}
