//! Spec scenario 6 ("idempotent Markdown") plus §8's "pure function of the
//! JSON artifact" law, exercised end-to-end against a realistic
//! `MassiveData` rather than the degenerate emergency record the unit
//! tests in `report::mod` use.

use viral_scout::core::types::{
    Context, EngagementEstimate, ExtractedPage, MassiveData, Platform, PlatformBucket, PlatformMetrics,
    SearchResult, SectionResult, SocialMediaData, SocialPost, Stats, ViralCategory, ViralImage,
};
use viral_scout::report;

fn sample_massive_data() -> MassiveData {
    let web_results = vec![
        SearchResult {
            title: "Mercado de telemedicina cresce no Brasil".into(),
            url: "https://g1.globo.com/saude/telemedicina.ghtml".into(),
            snippet: "Setor de telemedicina registra crescimento de 40% em 2026".into(),
            source_provider: "custom_web_search".into(),
            relevance_score: 0.92,
            published_at: Some("2026-02-01".into()),
        },
        SearchResult {
            title: "Telemedicina no Brasil: panorama 2026".into(),
            url: "https://exame.com/telemedicina-panorama".into(),
            snippet: "Análise do setor de saúde digital no país".into(),
            source_provider: "neural_search".into(),
            relevance_score: 0.81,
            published_at: None,
        },
    ];

    let mut platforms = std::collections::HashMap::new();
    platforms.insert(
        "youtube".to_string(),
        PlatformBucket {
            posts: vec![SocialPost {
                platform: Platform::Youtube,
                url: "https://www.youtube.com/watch?v=abc".into(),
                title: "Telemedicina explicada".into(),
                description: "video explicativo".into(),
                author: "canal saude".into(),
                author_followers: Some(120_000),
                metrics: PlatformMetrics {
                    views: 2_000_000,
                    likes: 80_000,
                    comments: 3_000,
                    ..Default::default()
                },
                hashtags: vec!["#saude".into()],
                mentions: vec![],
                posted_at: Some("2026-01-15".into()),
                viral_score: 8.3,
                viral_category: ViralCategory::Viral,
            }],
            success: true,
            error: None,
        },
    );

    let viral_content = vec![ViralImage {
        image_url: "https://img.youtube.com/vi/abc/maxresdefault.jpg".into(),
        post_url: "https://www.youtube.com/watch?v=abc".into(),
        platform: Platform::Youtube,
        title: "Telemedicina explicada".into(),
        description: "video explicativo".into(),
        engagement_score: 8.3,
        estimates: EngagementEstimate {
            views: 2_000_000,
            likes: 80_000,
            comments: 3_000,
            shares: 0,
        },
        author: "canal saude".into(),
        author_followers: Some(120_000),
        posted_at: Some("2026-01-15".into()),
        hashtags: vec!["#saude".into()],
        image_local_path: None,
        screenshot_local_path: None,
        quality_score: 83.0,
        viral_indicators: vec!["social-proof language detected".into()],
        is_estimate: false,
    }];

    let extracted_content = vec![ExtractedPage {
        url: "https://g1.globo.com/saude/telemedicina.ghtml".into(),
        title: "Mercado de telemedicina cresce no Brasil".into(),
        content_text: "conteúdo completo sobre o crescimento da telemedicina no brasil em 2026".repeat(10),
        quality_score: 78.0,
        insights: vec![],
        is_preferred_source: true,
        word_count: 400,
        extraction_method: "readability".into(),
        extracted_at: "2026-02-01T00:00:00Z".into(),
        source_provider: Some("custom_web_search".into()),
    }];

    let mut api_calls = std::collections::HashMap::new();
    api_calls.insert("custom_web_search".to_string(), 5u64);
    let mut rotations = std::collections::HashMap::new();
    rotations.insert("custom_web_search".to_string(), 2u64);
    let mut success_rate = std::collections::HashMap::new();
    success_rate.insert("custom_web_search".to_string(), 0.8);

    MassiveData {
        session_id: "sess-report-test".into(),
        query: "mercado de telemedicina no Brasil".into(),
        context: Context {
            segment: Some("telemedicina".into()),
            ..Default::default()
        },
        collection_started: "2026-02-01T00:00:00Z".into(),
        collection_ended: Some("2026-02-01T00:05:00Z".into()),
        web_search_data: SectionResult::ok(web_results),
        social_media_data: SectionResult::ok(SocialMediaData { platforms }),
        trends_data: SectionResult::failed("trends provider unavailable", Vec::new()),
        viral_content: SectionResult::ok(viral_content),
        screenshots_captured: SectionResult::ok(Vec::new()),
        extracted_content,
        research: Default::default(),
        expert_knowledge: None,
        statistics: Stats {
            total_sources: 3,
            unique_urls: 2,
            total_content_chars: 700,
            api_calls_per_provider: api_calls,
            api_rotations_per_provider: rotations,
            screenshots_captured: 0,
            collection_duration_seconds: 12.5,
            success_rate_per_provider: success_rate,
        },
        emergency_mode: false,
        emergency: None,
    }
}

#[test]
fn markdown_report_is_byte_identical_across_renders() {
    let data = sample_massive_data();
    let first = report::render_markdown(&data);
    let second = report::render_markdown(&data);
    assert_eq!(first, second, "regenerating the report from the same MassiveData must be byte-identical");
}

#[test]
fn markdown_report_contains_expected_sections() {
    let data = sample_massive_data();
    let md = report::render_markdown(&data);

    assert!(md.contains("# Relatório de Coleta de Dados"));
    assert!(md.contains("## Resumo da Coleta"));
    assert!(md.contains("## Fontes por Tipo"));
    assert!(md.contains("## Destaques por Provedor"));
    assert!(md.contains("## Principais Resultados Web"));
    assert!(md.contains("## Principais Posts por Plataforma"));
    assert!(md.contains("## Conteúdo Viral Identificado"));
    assert!(md.contains("## Erros"));
    assert!(md.contains("trends provider unavailable"));
    assert!(md.contains("Mercado de telemedicina cresce no Brasil"));
    assert!(md.contains("YOUTUBE"));
}

#[test]
fn incorporation_report_is_bounded_and_mentions_top_item() {
    let data = sample_massive_data();
    let report_text = report::incorporation_report(&data);
    assert!(report_text.len() <= 8 * 1024);
    assert!(report_text.contains("Telemedicina explicada"));
    assert!(report_text.contains("engagement=8.3"));
}
