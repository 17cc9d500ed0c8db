use viral_scout::core::config::Settings;
use viral_scout::core::types::Context;
use viral_scout::core::Orchestrator;

fn usage() -> &'static str {
    "viral-scout --query <text> [--session-id <id>] [--context <json>]\n\n\
     Runs one collection (spec C10 `Collect`) and writes massive_data.json,\n\
     relatorio_coleta.md, and incorporation_report.txt under SESSIONS_ROOT,\n\
     then prints the incorporation report to stdout."
}

struct Args {
    query: String,
    session_id: String,
    context: Context,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut query: Option<String> = None;
    let mut session_id: Option<String> = None;
    let mut context_json: Option<String> = None;

    let mut args = std::env::args().skip(1).peekable();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--query" | "-q" => query = Some(args.next().ok_or_else(|| anyhow::anyhow!("--query requires a value"))?),
            "--session-id" | "-s" => session_id = Some(args.next().ok_or_else(|| anyhow::anyhow!("--session-id requires a value"))?),
            "--context" | "-c" => context_json = Some(args.next().ok_or_else(|| anyhow::anyhow!("--context requires a value"))?),
            "--help" | "-h" => {
                println!("{}", usage());
                std::process::exit(0);
            }
            other => anyhow::bail!("unrecognized argument: {other}\n\n{}", usage()),
        }
    }

    let query = query.ok_or_else(|| anyhow::anyhow!("--query is required\n\n{}", usage()))?;
    if query.trim().is_empty() {
        anyhow::bail!("--query must not be empty");
    }

    let session_id = session_id.unwrap_or_else(|| format!("session-{}", uuid::Uuid::new_v4()));
    if !session_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        anyhow::bail!("--session-id must match [A-Za-z0-9_-]+, got: {session_id}");
    }

    let context = match context_json {
        Some(raw) => serde_json::from_str(&raw).map_err(|e| anyhow::anyhow!("--context is not valid JSON: {e}"))?,
        None => Context::default(),
    };

    Ok(Args { query, session_id, context })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    tracing::info!(session_id = %args.session_id, query = %args.query, "starting collection run");

    let settings = Settings::load();
    let orchestrator = Orchestrator::new(settings.clone()).await?;

    let data = orchestrator.collect(&args.query, args.context, &args.session_id).await;

    if data.emergency_mode {
        tracing::warn!(
            session_id = %args.session_id,
            reason = data.emergency.as_ref().map(|e| e.reason.as_str()).unwrap_or("unknown"),
            "collection run completed in emergency mode"
        );
    } else {
        tracing::info!(
            session_id = %args.session_id,
            total_sources = data.statistics.total_sources,
            screenshots = data.statistics.screenshots_captured,
            duration_seconds = data.statistics.collection_duration_seconds,
            "collection run completed"
        );
    }

    viral_scout::core::app_state::persist_artifacts(&settings, &data).await?;

    println!("{}", viral_scout::report::incorporation_report(&data));
    println!(
        "\nArtifacts written under {}/{}/",
        settings.sessions_root, args.session_id
    );

    if data.emergency_mode {
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_mentions_required_flag() {
        assert!(usage().contains("--query"));
    }
}
