//! Collection Orchestrator (C10).
//!
//! The top-level coordinator of one collection run: a single struct wiring
//! every subsystem together, built once and handed around as
//! `Arc<Orchestrator>`. Holds the key pool, the provider registry, and the
//! resolved `Settings`, and exposes one entry point, `collect`, that runs
//! phases A-F of a full search-and-discovery pass.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;

use crate::core::config::Settings;
use crate::core::types::{
    Context, MassiveData, PlatformBucket, SearchResult, SectionResult, SocialMediaData, SocialPost, Stats, ViralImage,
};
use crate::deep_study::{OpenAiCompatibleGenerator, TextGenerator};
use crate::keypool::{KeyPool, SharedKeyPool};
use crate::providers::html_search::{BingHtmlSearchClient, DuckDuckGoHtmlSearchClient, GoogleHtmlSearchClient};
use crate::providers::{meta_search, microblog, neural_search, social_aggregator, trends, video, web_search};
use crate::providers::{ProviderRegistry, SearchLimits, Searcher};
use crate::{capture, discovery, report, research, viral};

/// A run that exceeds this wall-clock budget is cancelled and whatever has
/// completed is assembled into the final artifact. Not configurable via
/// `Settings` — no scenario calls for a different value, so it stays a
/// constant rather than an unused knob.
const RUN_BUDGET: Duration = Duration::from_secs(20 * 60);

pub struct Orchestrator {
    pub http: reqwest::Client,
    pub keypool: SharedKeyPool,
    pub providers: ProviderRegistry,
    pub settings: Settings,
    pub generator: Option<Arc<dyn TextGenerator>>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("provider_count", &self.providers.all().len())
            .field("deep_study_enabled", &self.settings.enable_deep_study)
            .finish()
    }
}

impl Orchestrator {
    /// Build the orchestrator from resolved `Settings`: one HTTP client
    /// shared by every provider and extraction call, one key pool populated
    /// from every provider's discovered credentials, and the provider
    /// registry wired with every provider client.
    pub async fn new(settings: Settings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(Duration::from_secs(30)).build()?;

        let keypool = Arc::new(KeyPool::new(settings.key_cooldown));
        let mut providers = ProviderRegistry::new();

        register_credentialed(&keypool, &mut providers, web_search::PROVIDER, || {
            Arc::new(web_search::CustomWebSearchClient {
                search_engine_id: std::env::var("CUSTOM_SEARCH_ENGINE_ID").unwrap_or_default(),
            })
        })
        .await;
        register_credentialed(&keypool, &mut providers, neural_search::PROVIDER, || {
            Arc::new(neural_search::NeuralSearchClient {
                preferred_domains: Vec::new(),
            })
        })
        .await;
        register_credentialed(&keypool, &mut providers, meta_search::PROVIDER, || Arc::new(meta_search::MetaSearchClient)).await;
        register_credentialed(&keypool, &mut providers, crate::providers::reader::PROVIDER, || {
            Arc::new(crate::providers::reader::ReaderClient)
        })
        .await;
        register_credentialed(&keypool, &mut providers, video::PROVIDER, || Arc::new(video::VideoSearchClient)).await;
        register_credentialed(&keypool, &mut providers, social_aggregator::PROVIDER, || {
            Arc::new(social_aggregator::SocialAggregatorClient)
        })
        .await;
        register_credentialed(&keypool, &mut providers, microblog::PROVIDER, || Arc::new(microblog::MicroblogSearchClient)).await;
        register_credentialed(&keypool, &mut providers, trends::PROVIDER, || Arc::new(trends::TrendsClient)).await;

        // HTML-scrape engines need no credential; always registered.
        providers.register(Arc::new(GoogleHtmlSearchClient));
        providers.register(Arc::new(BingHtmlSearchClient));
        providers.register(Arc::new(DuckDuckGoHtmlSearchClient));

        let generator: Option<Arc<dyn TextGenerator>> = settings.llm_api_key.as_ref().map(|key| {
            Arc::new(OpenAiCompatibleGenerator {
                http: http.clone(),
                base_url: settings.llm_base_url.clone(),
                api_key: Some(key.clone()),
                model: settings.llm_model.clone(),
            }) as Arc<dyn TextGenerator>
        });

        Ok(Self {
            http,
            keypool,
            providers,
            settings,
            generator,
        })
    }

    /// `Collect(query, context, session_id) → MassiveData`. Runs
    /// phases A–F under a single wall-clock budget; a budget overrun still
    /// yields an artifact built from whatever completed rather than an error.
    pub async fn collect(&self, query: &str, context: Context, session_id: &str) -> MassiveData {
        match tokio::time::timeout(RUN_BUDGET, self.collect_inner(query, context.clone(), session_id)).await {
            Ok(data) => data,
            Err(_) => {
                tracing::warn!(session_id, "collection run exceeded wall-clock budget; emitting emergency artifact");
                MassiveData::emergency(
                    session_id.to_string(),
                    query.to_string(),
                    context,
                    "collection run exceeded its wall-clock budget",
                )
            }
        }
    }

    async fn collect_inner(&self, query: &str, context: Context, session_id: &str) -> MassiveData {
        let started = Instant::now();
        let collection_started = crate::core::now_iso8601();

        let web_providers = self.providers.web_providers();
        if web_providers.is_empty() {
            return MassiveData::emergency(session_id.to_string(), query.to_string(), context, "no web providers registered for this run");
        }

        let enhanced_query = enhance_query_for_brazil(query);

        // Phase A (direct fan-out, feeds web_search_data) and Phase B
        // (trends + social aggregator) run concurrently; Phase A also kicks
        // off C6's deep dig, which performs its own internal fan-out.
        let (web_search_data, research_and_pages, trends_data, aggregator_posts) = tokio::join!(
            self.direct_web_fanout(&enhanced_query, &web_providers),
            research::research(&self.http, &self.keypool, &web_providers, &enhanced_query, &context, self.settings.max_pages),
            self.fetch_trends(&enhanced_query),
            self.fetch_aggregator_posts(&enhanced_query),
        );
        let (research, extracted_content) = research_and_pages;

        // Phase C — social fan-out (video + microblog), parallel.
        let (video_posts, microblog_posts) = tokio::join!(self.fetch_video_posts(&enhanced_query), self.fetch_microblog_posts(&enhanced_query));

        let mut all_social_posts = Vec::new();
        all_social_posts.extend(aggregator_posts.clone());
        all_social_posts.extend(video_posts.clone());
        all_social_posts.extend(microblog_posts.clone());
        for post in &mut all_social_posts {
            viral::score_post(post);
        }

        let social_media_data = build_social_media_data(aggregator_posts, video_posts, microblog_posts);

        // Phase D — viral identification over every social+video post.
        let mut viral_posts = viral::identify_viral(all_social_posts);
        viral_posts.truncate(10);
        let viral_images: Vec<ViralImage> = viral_posts
            .iter()
            .filter_map(|p| discovery::build_viral_image(p, self.settings.disable_fallbacks))
            .collect();

        // Phase E — visual capture, ranked viral desc then quality desc,
        // bounded to spec's 8 general + 10 viral caps.
        let screenshots = if self.settings.enable_screenshots {
            self.capture_visual_evidence(&web_search_data, &viral_images, session_id).await
        } else {
            Vec::new()
        };
        let local_images = if self.settings.enable_image_downloads {
            self.download_viral_images(&viral_images, session_id).await
        } else {
            Vec::new()
        };
        let viral_images = attach_local_paths(viral_images, &screenshots, &local_images);

        // Phase F — aggregate & persist.
        let statistics = self
            .build_stats(&web_search_data, &social_media_data, &trends_data, &screenshots, &extracted_content, started)
            .await;

        let mut data = MassiveData {
            session_id: session_id.to_string(),
            query: query.to_string(),
            context,
            collection_started,
            collection_ended: Some(crate::core::now_iso8601()),
            web_search_data: section_from(web_search_data, "web fan-out produced zero results"),
            social_media_data: SectionResult::ok(social_media_data),
            trends_data: section_from(trends_data, "trends provider unavailable"),
            viral_content: SectionResult::ok(viral_images),
            screenshots_captured: SectionResult::ok(screenshots),
            extracted_content,
            research,
            expert_knowledge: None,
            statistics,
            emergency_mode: false,
            emergency: None,
        };

        if self.settings.enable_deep_study {
            if let Some(generator) = &self.generator {
                data.expert_knowledge = Some(crate::deep_study::run_deep_study(generator.as_ref(), &data, self.settings.study_minutes).await);
            }
        }

        data
    }

    async fn direct_web_fanout(&self, query: &str, providers: &[Arc<dyn Searcher>]) -> Vec<SearchResult> {
        let limits = SearchLimits {
            max_results: (self.settings.max_pages / providers.len().max(1)).max(1),
            timeout: Duration::from_secs(30),
        };
        let calls = providers.iter().map(|p| {
            let http = self.http.clone();
            let keypool = self.keypool.clone();
            let query = query.to_string();
            let p = p.clone();
            async move { p.search(&http, &keypool, &query, limits).await.into_items() }
        });
        let mut results = join_all(calls).await.into_iter().flatten().collect::<Vec<_>>();
        dedup_search_results(&mut results);
        results
    }

    async fn fetch_trends(&self, query: &str) -> Vec<String> {
        if !self.settings.enable_trends {
            return Vec::new();
        }
        trends::fetch_trends(&self.http, &self.keypool, query, Duration::from_secs(20))
            .await
            .map(|trends| trends.into_iter().map(|t| t.term).collect())
            .unwrap_or_default()
    }

    async fn fetch_aggregator_posts(&self, query: &str) -> Vec<SocialPost> {
        social_aggregator::fetch_posts(&self.http, &self.keypool, query, SearchLimits::default()).await.unwrap_or_default()
    }

    async fn fetch_video_posts(&self, query: &str) -> Vec<SocialPost> {
        video::search_videos(&self.http, &self.keypool, query, SearchLimits::default()).await.unwrap_or_default()
    }

    async fn fetch_microblog_posts(&self, query: &str) -> Vec<SocialPost> {
        microblog::search_posts(&self.http, &self.keypool, query, SearchLimits::default()).await.unwrap_or_default()
    }

    async fn capture_visual_evidence(&self, web_results: &[SearchResult], viral_images: &[ViralImage], session_id: &str) -> Vec<crate::core::types::Screenshot> {
        let mut general_targets: Vec<capture::screenshots::CaptureTarget> = web_results
            .iter()
            .take(8)
            .map(|r| capture::screenshots::CaptureTarget {
                url: r.url.clone(),
                title: r.title.clone(),
                platform: None,
                viral_score: Some(r.relevance_score * 10.0),
                viral_category: None,
            })
            .collect();
        general_targets.sort_by(|a, b| b.viral_score.partial_cmp(&a.viral_score).unwrap_or(std::cmp::Ordering::Equal));

        let viral_targets: Vec<capture::screenshots::CaptureTarget> = viral_images
            .iter()
            .take(10)
            .map(|v| capture::screenshots::CaptureTarget {
                url: v.post_url.clone(),
                title: v.title.clone(),
                platform: Some(v.platform),
                viral_score: Some(v.engagement_score),
                viral_category: Some(crate::core::types::ViralCategory::from_score(v.engagement_score)),
            })
            .collect();

        let (mut general, viral) = tokio::join!(
            capture::screenshots::capture_screenshots(&general_targets, &self.settings.sessions_root, session_id, "files", "capture"),
            capture::screenshots::capture_screenshots(&viral_targets, &self.settings.sessions_root, session_id, "files/viral_screenshots", "viral_content"),
        );
        general.extend(viral);
        general
    }

    async fn download_viral_images(&self, viral_images: &[ViralImage], session_id: &str) -> Vec<crate::core::types::LocalImage> {
        let targets: Vec<capture::images::ImageDownloadTarget> = viral_images
            .iter()
            .filter(|v| !v.is_estimate)
            .take(self.settings.max_images_per_platform * 6)
            .map(|v| capture::images::ImageDownloadTarget {
                image_url: v.image_url.clone(),
                title_hint: v.title.clone(),
                platform: Some(v.platform),
                viral_score: Some(v.engagement_score),
            })
            .collect();
        capture::images::download_images(&self.http, &targets, &self.settings.images_root, session_id, self.settings.min_image_bytes).await
    }

    async fn build_stats(
        &self,
        web_results: &[SearchResult],
        social_media_data: &SocialMediaData,
        trends_data: &[String],
        screenshots: &[crate::core::types::Screenshot],
        extracted_content: &[crate::core::types::ExtractedPage],
        started: Instant,
    ) -> Stats {
        let social_count: usize = social_media_data.platforms.values().map(|b| b.posts.len()).sum();
        let total_content_chars: usize = extracted_content.iter().map(|p| p.content_text.chars().count()).sum();
        let key_stats = self.keypool.stats().await;

        let mut api_calls_per_provider = std::collections::HashMap::new();
        let mut api_rotations_per_provider = std::collections::HashMap::new();
        let mut success_rate_per_provider = std::collections::HashMap::new();
        for (provider, stats) in key_stats {
            api_calls_per_provider.insert(provider.clone(), stats.calls);
            api_rotations_per_provider.insert(provider.clone(), stats.rotations);
            let rate = if stats.calls == 0 { 0.0 } else { 1.0 - (stats.failures as f64 / stats.calls as f64) };
            success_rate_per_provider.insert(provider, rate);
        }

        Stats {
            total_sources: web_results.len() + social_count + trends_data.len(),
            unique_urls: web_results.len(),
            total_content_chars,
            api_calls_per_provider,
            api_rotations_per_provider,
            screenshots_captured: screenshots.len(),
            collection_duration_seconds: started.elapsed().as_secs_f64(),
            success_rate_per_provider,
        }
    }
}

async fn register_credentialed<F>(keypool: &SharedKeyPool, registry: &mut ProviderRegistry, provider: &'static str, build: F)
where
    F: FnOnce() -> Arc<dyn Searcher>,
{
    let prefix = provider.to_ascii_uppercase();
    let keys = crate::core::config::discover_provider_keys(&prefix);
    keypool.register(provider, keys).await;
    registry.register(build());
}

/// Query enhancement belongs at the orchestrator layer: append a
/// Brazil-hinting term and the current year when neither is already present.
fn enhance_query_for_brazil(query: &str) -> String {
    let lower = query.to_lowercase();
    let has_brazil_hint = ["brasil", "brazil", ".br"].iter().any(|t| lower.contains(t));
    let current_year = chrono::Utc::now().format("%Y").to_string();
    let has_year = lower.contains(&current_year);

    let mut out = query.to_string();
    if !has_brazil_hint {
        out.push_str(" Brasil");
    }
    if !has_year {
        out.push(' ');
        out.push_str(&current_year);
    }
    out
}

/// Dedup by URL; on collision keep the higher `relevance_score`.
fn dedup_search_results(results: &mut Vec<SearchResult>) {
    let mut best: std::collections::HashMap<String, SearchResult> = std::collections::HashMap::new();
    for r in results.drain(..) {
        let key = crate::providers::normalize_url_key(&r.url);
        match best.get(&key) {
            Some(existing) if existing.relevance_score >= r.relevance_score => {}
            _ => {
                best.insert(key, r);
            }
        }
    }
    *results = best.into_values().collect();
}

fn build_social_media_data(aggregator: Vec<SocialPost>, video: Vec<SocialPost>, microblog: Vec<SocialPost>) -> SocialMediaData {
    let mut platforms: std::collections::HashMap<String, PlatformBucket> = std::collections::HashMap::new();
    for post in aggregator.into_iter().chain(video).chain(microblog) {
        let bucket = platforms.entry(post.platform.as_str().to_string()).or_default();
        bucket.posts.push(post);
    }
    SocialMediaData { platforms }
}

fn section_from<T>(items: Vec<T>, empty_reason: &str) -> SectionResult<Vec<T>> {
    if items.is_empty() {
        SectionResult::failed(empty_reason, items)
    } else {
        SectionResult::ok(items)
    }
}

fn attach_local_paths(mut viral_images: Vec<ViralImage>, screenshots: &[crate::core::types::Screenshot], local_images: &[crate::core::types::LocalImage]) -> Vec<ViralImage> {
    for image in &mut viral_images {
        if let Some(shot) = screenshots.iter().find(|s| s.source_url == image.post_url) {
            image.screenshot_local_path = Some(shot.relative_path.clone());
        }
        if let Some(local) = local_images.iter().find(|l| l.source_url == image.image_url) {
            image.image_local_path = Some(local.local_path.clone());
        }
    }
    viral_images
}

/// Write every output artifact for a completed run: `massive_data.json`,
/// `relatorio_coleta.md`, and the incorporation report.
pub async fn persist_artifacts(settings: &Settings, data: &MassiveData) -> anyhow::Result<()> {
    report::write_artifacts(&settings.sessions_root, data).await
}
