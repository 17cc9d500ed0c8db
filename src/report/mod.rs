//! Output artifacts for a completed run: the JSON artifact, the Markdown
//! report, and the incorporation report. The split into "full session
//! report" and "compact embeddable summary" lets a caller embed the
//! second in a parent document without parsing the first.

use std::collections::BTreeMap;
use std::path::Path;

use crate::core::types::{MassiveData, Platform, SourceDetail, ViralImage};

/// Write every artifact for a completed run: `massive_data.json`,
/// `relatorio_coleta.md`, and `incorporation_report.txt`, under
/// `{sessions_root}/{session_id}/`.
pub async fn write_artifacts(sessions_root: &str, data: &MassiveData) -> anyhow::Result<()> {
    let session_dir = Path::new(sessions_root).join(&data.session_id);
    tokio::fs::create_dir_all(&session_dir).await?;
    tokio::fs::create_dir_all(session_dir.join("modules")).await?;

    let json = serde_json::to_string_pretty(data)?;
    tokio::fs::write(session_dir.join("massive_data.json"), json).await?;

    let markdown = render_markdown(data);
    tokio::fs::write(session_dir.join("relatorio_coleta.md"), markdown).await?;

    let incorporation = incorporation_report(data);
    tokio::fs::write(session_dir.join("incorporation_report.txt"), incorporation).await?;

    Ok(())
}

/// The Markdown report is a pure function of `MassiveData`: regenerating it
/// from the same artifact yields byte-identical output.
/// Every collection below is sorted by a stable key before rendering so the
/// output never depends on `HashMap` iteration order.
pub fn render_markdown(data: &MassiveData) -> String {
    let mut out = String::new();

    render_header(&mut out, data);
    render_summary(&mut out, data);
    render_sources_by_type(&mut out, data);
    render_provider_highlights(&mut out, data);
    render_top_web_results(&mut out, data);
    render_top_posts_per_platform(&mut out, data);
    render_top_viral_items(&mut out, data);
    render_visual_evidence(&mut out, data);
    render_errors(&mut out, data);

    out
}

fn render_header(out: &mut String, data: &MassiveData) {
    let duration = data.statistics.collection_duration_seconds;
    out.push_str("# Relatório de Coleta de Dados\n\n");
    out.push_str(&format!("**Sessão:** `{}`  \n", data.session_id));
    out.push_str(&format!("**Query:** `{}`  \n", data.query));
    out.push_str(&format!("**Iniciado em:** {}  \n", data.collection_started));
    out.push_str(&format!("**Duração Total:** {duration:.2} segundos\n\n---\n\n"));
}

fn render_summary(out: &mut String, data: &MassiveData) {
    let stats = &data.statistics;
    out.push_str("## Resumo da Coleta\n\n");
    out.push_str(&format!("- **Total de Fontes:** {}\n", stats.total_sources));
    out.push_str(&format!("- **URLs Únicas:** {}\n", stats.unique_urls));
    out.push_str(&format!("- **Total de Caracteres:** {}\n", stats.total_content_chars));
    out.push_str(&format!("- **Screenshots Capturados:** {}\n", stats.screenshots_captured));
    if data.emergency_mode {
        out.push_str("- **Modo de Emergência:** sim\n");
    }
    out.push('\n');
}

/// `sources_by_type`: counts per `source_provider` across web results and
/// extracted pages, plus one row per social platform with at least one post.
fn render_sources_by_type(out: &mut String, data: &MassiveData) {
    out.push_str("## Fontes por Tipo\n\n");
    out.push_str("| Tipo | Quantidade |\n|---|---|\n");

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for r in &data.web_search_data.data {
        *counts.entry(r.source_provider.clone()).or_insert(0) += 1;
    }
    for (platform, bucket) in sorted_platforms(data) {
        if !bucket.posts.is_empty() {
            counts.insert(platform.to_string(), bucket.posts.len());
        }
    }
    if !data.trends_data.data.is_empty() {
        counts.insert("trends".to_string(), data.trends_data.data.len());
    }

    let mut rows: Vec<(String, usize)> = counts.into_iter().collect();
    rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    for (kind, count) in rows {
        out.push_str(&format!("| {kind} | {count} |\n"));
    }
    out.push('\n');
}

fn render_provider_highlights(out: &mut String, data: &MassiveData) {
    if data.statistics.api_calls_per_provider.is_empty() {
        return;
    }
    out.push_str("## Destaques por Provedor\n\n");
    out.push_str("| Provedor | Chamadas | Rotações | Taxa de Sucesso |\n|---|---|---|---|\n");

    let mut providers: Vec<&String> = data.statistics.api_calls_per_provider.keys().collect();
    providers.sort();
    for provider in providers {
        let calls = data.statistics.api_calls_per_provider.get(provider).copied().unwrap_or(0);
        let rotations = data.statistics.api_rotations_per_provider.get(provider).copied().unwrap_or(0);
        let success = data.statistics.success_rate_per_provider.get(provider).copied().unwrap_or(0.0);
        out.push_str(&format!("| {provider} | {calls} | {rotations} | {:.0}% |\n", success * 100.0));
    }
    out.push('\n');
}

fn render_top_web_results(out: &mut String, data: &MassiveData) {
    if data.web_search_data.data.is_empty() {
        return;
    }
    out.push_str("## Principais Resultados Web\n\n");
    let mut results = data.web_search_data.data.clone();
    results.sort_by(|a, b| b.relevance_score.partial_cmp(&a.relevance_score).unwrap_or(std::cmp::Ordering::Equal));
    for (i, r) in results.iter().take(5).enumerate() {
        out.push_str(&format!("**{}. [{}]({})**  \n", i + 1, r.title, r.url));
        out.push_str(&format!("   Fonte: `{}` | Relevância: {:.2}\n", r.source_provider, r.relevance_score));
        out.push_str(&format!("   {}\n\n", truncate(&r.snippet, 200)));
    }
}

fn sorted_platforms(data: &MassiveData) -> Vec<(&String, &crate::core::types::PlatformBucket)> {
    let mut platforms: Vec<(&String, &crate::core::types::PlatformBucket)> = data.social_media_data.data.platforms.iter().collect();
    platforms.sort_by(|a, b| a.0.cmp(b.0));
    platforms
}

fn render_top_posts_per_platform(out: &mut String, data: &MassiveData) {
    let platforms = sorted_platforms(data);
    if platforms.iter().all(|(_, b)| b.posts.is_empty()) {
        return;
    }
    out.push_str("## Principais Posts por Plataforma\n\n");
    for (platform, bucket) in platforms {
        if bucket.posts.is_empty() {
            continue;
        }
        let mut posts = bucket.posts.clone();
        posts.sort_by(|a, b| b.viral_score.partial_cmp(&a.viral_score).unwrap_or(std::cmp::Ordering::Equal));
        out.push_str(&format!("### {} ({} posts)\n\n", title_case(platform), posts.len()));
        for (i, post) in posts.iter().take(3).enumerate() {
            out.push_str(&format!("**{}. [{}]({})** por **{}** (Score: {:.1})  \n", i + 1, truncate(&post.title, 100), post.url, post.author, post.viral_score));
        }
        out.push('\n');
    }
}

fn render_top_viral_items(out: &mut String, data: &MassiveData) {
    if data.viral_content.data.is_empty() {
        return;
    }
    out.push_str("## Conteúdo Viral Identificado\n\n");
    let mut items: Vec<&ViralImage> = data.viral_content.data.iter().collect();
    items.sort_by(|a, b| b.engagement_score.partial_cmp(&a.engagement_score).unwrap_or(std::cmp::Ordering::Equal));
    for (i, item) in items.iter().enumerate() {
        out.push_str(&format!(
            "**{}. [{}] {}** — [{}]({})  \n",
            i + 1,
            item.platform.as_str().to_uppercase(),
            truncate(&item.title, 100),
            item.author,
            item.post_url
        ));
        out.push_str(&format!(
            "   Engagement: {:.1} | Views est.: {} | Likes est.: {} | Categoria: {:?}\n\n",
            item.engagement_score,
            item.estimates.views,
            item.estimates.likes,
            crate::core::types::ViralCategory::from_score(item.engagement_score)
        ));
    }
}

fn render_visual_evidence(out: &mut String, data: &MassiveData) {
    if data.screenshots_captured.data.is_empty() {
        return;
    }
    out.push_str("## Evidências Visuais\n\n");
    for (i, shot) in data.screenshots_captured.data.iter().enumerate() {
        out.push_str(&format!("### Screenshot {}\n", i + 1));
        out.push_str(&format!("**URL Original:** {}\n", shot.source_url));
        out.push_str(&format!("**Título:** {}\n", shot.title));
        out.push_str(&format!("![Screenshot {}]({})\n\n", i + 1, shot.relative_path));
    }
}

fn render_errors(out: &mut String, data: &MassiveData) {
    let mut errors: Vec<(&str, &str)> = Vec::new();
    if let Some(e) = &data.web_search_data.error {
        errors.push(("Web Search", e.as_str()));
    }
    if let Some(e) = &data.social_media_data.error {
        errors.push(("Social Media", e.as_str()));
    }
    if let Some(e) = &data.trends_data.error {
        errors.push(("Trends", e.as_str()));
    }
    if let Some(e) = &data.viral_content.error {
        errors.push(("Viral Content", e.as_str()));
    }
    if let Some(e) = &data.screenshots_captured.error {
        errors.push(("Screenshots", e.as_str()));
    }
    if let Some(reason) = &data.research.emergency_reason {
        errors.push(("Deep Research", reason.as_str()));
    }
    if let Some(emergency) = &data.emergency {
        errors.push(("Run", emergency.reason.as_str()));
    }

    out.push_str("## Erros\n\n");
    if errors.is_empty() {
        out.push_str("Nenhum erro registrado.\n");
        return;
    }
    for (source, message) in errors {
        out.push_str(&format!("- **{source}:** {message}\n"));
    }
}

/// `incorporation_report(data) → String` — plain-text summary embeddable in
/// a parent document, ≤ ~8 KB. Format: banner, query, totals, then numbered
/// `[{PLATFORM}] {title} — engagement={score}, likes={n}` lines.
pub fn incorporation_report(data: &MassiveData) -> String {
    let mut lines = Vec::new();
    let banner = "=".repeat(60);

    lines.push(banner.clone());
    lines.push("CONTEÚDO VIRAL IDENTIFICADO".to_string());
    lines.push(banner.clone());
    lines.push(format!("Busca: {}", data.query));
    lines.push(format!("Total: {} conteúdos virais", data.viral_content.data.len()));

    let avg_engagement = if data.viral_content.data.is_empty() {
        0.0
    } else {
        data.viral_content.data.iter().map(|v| v.engagement_score).sum::<f64>() / data.viral_content.data.len() as f64
    };
    lines.push(format!("Engagement médio: {avg_engagement:.1}"));
    lines.push(String::new());

    let mut items: Vec<&ViralImage> = data.viral_content.data.iter().collect();
    items.sort_by(|a, b| b.engagement_score.partial_cmp(&a.engagement_score).unwrap_or(std::cmp::Ordering::Equal));

    for (i, item) in items.iter().take(10).enumerate() {
        lines.push(format!(
            "{}. [{}] {}",
            i + 1,
            platform_banner_tag(item.platform),
            truncate(&item.title, 80)
        ));
        lines.push(format!(
            "   engagement={:.1}, likes={}",
            item.engagement_score, item.estimates.likes
        ));
        if !item.viral_indicators.is_empty() {
            lines.push(format!("   Indicadores: {}", item.viral_indicators.iter().take(3).cloned().collect::<Vec<_>>().join(", ")));
        }
        lines.push(String::new());
    }

    lines.push(banner);
    let joined = lines.join("\n");
    // Never exceeds ~8KB in practice; if an unusually large item set slips
    // through, truncate defensively rather than emit an oversized blob.
    if joined.len() > 8 * 1024 {
        joined.chars().take(8 * 1024).collect()
    } else {
        joined
    }
}

fn platform_banner_tag(platform: Platform) -> String {
    platform.as_str().to_uppercase()
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}

/// Per-source detail rows used by callers that want a per-source details
/// view directly (research sources already expose this shape via
/// `ResearchData::sources`; kept here so report consumers don't need to
/// reach back into `crate::research`).
pub fn source_details(data: &MassiveData) -> &[SourceDetail] {
    &data.research.sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Context;

    #[test]
    fn markdown_rendering_is_idempotent() {
        let data = MassiveData::emergency("s1".into(), "q".into(), Context::default(), "no providers");
        let first = render_markdown(&data);
        let second = render_markdown(&data);
        assert_eq!(first, second);
    }

    #[test]
    fn markdown_header_includes_session_and_query() {
        let data = MassiveData::emergency("sess-123".into(), "telemedicina".into(), Context::default(), "x");
        let md = render_markdown(&data);
        assert!(md.contains("sess-123"));
        assert!(md.contains("telemedicina"));
    }

    #[test]
    fn errors_section_lists_emergency_reason() {
        let data = MassiveData::emergency("s1".into(), "q".into(), Context::default(), "storage root unwritable");
        let md = render_markdown(&data);
        assert!(md.contains("storage root unwritable"));
    }

    #[test]
    fn incorporation_report_has_banner_and_query() {
        let data = MassiveData::emergency("s1".into(), "telemedicina no Brasil".into(), Context::default(), "x");
        let report = incorporation_report(&data);
        assert!(report.starts_with("="));
        assert!(report.contains("telemedicina no Brasil"));
        assert!(report.contains("Total: 0 conteúdos virais"));
    }

    #[test]
    fn incorporation_report_numbers_items() {
        let mut data = MassiveData::emergency("s1".into(), "q".into(), Context::default(), "x");
        data.viral_content.data.push(ViralImage {
            image_url: "https://img.youtube.com/vi/abc/maxresdefault.jpg".into(),
            post_url: "https://youtube.com/watch?v=abc".into(),
            platform: Platform::Youtube,
            title: "Great video".into(),
            description: String::new(),
            engagement_score: 8.5,
            estimates: crate::core::types::EngagementEstimate {
                views: 1_000_000,
                likes: 50_000,
                comments: 1000,
                shares: 0,
            },
            author: "creator".into(),
            author_followers: None,
            posted_at: None,
            hashtags: vec![],
            image_local_path: None,
            screenshot_local_path: None,
            quality_score: 85.0,
            viral_indicators: vec!["call-to-action language detected".into()],
            is_estimate: false,
        });
        let report = incorporation_report(&data);
        assert!(report.contains("[YOUTUBE] Great video"));
        assert!(report.contains("engagement=8.5, likes=50000"));
    }
}
