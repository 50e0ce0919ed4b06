use std::error::Error;

use dialogue_store::{
    BarProgress, DialogueStore, ScenarioType, SearchFilter, StoreConfig, group_results,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load environment variables from .env file when present.
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let query = parse_args()?;

    let cfg = StoreConfig::from_env();
    let store = DialogueStore::new(cfg);

    let progress = BarProgress::new();
    store.ensure_loaded(&progress).await?;

    let hits = store.search(&query)?;
    let groups = group_results(&hits);
    println!("{} dialogues in {} scenarios", hits.len(), groups.len());
    for g in &groups {
        if g.title.is_empty() {
            println!("\n[{}] {}", g.scenario_type, g.scenario_id);
        } else {
            println!("\n[{}] {} ({})", g.scenario_type, g.scenario_id, g.title);
        }
        for d in &g.records {
            println!("  {}: {}", d.speaker, d.content.replace('\n', " "));
        }
    }

    let bytes = store.estimate_cache_size().await?;
    tracing::info!(bytes, "cache size estimate");

    Ok(())
}

/// CLI shape: `scenario-search [PATTERN] [--speaker NAME]... [--type TAG]...`
fn parse_args() -> Result<SearchFilter, Box<dyn Error>> {
    let mut query = SearchFilter::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--speaker" => {
                let name = args.next().ok_or("--speaker needs a value")?;
                query.speakers.push(name);
            }
            "--type" => {
                let tag = args.next().ok_or("--type needs a value")?;
                let ty = ScenarioType::parse(&tag)
                    .ok_or_else(|| format!("unknown scenario type: {tag}"))?;
                query.scenario_types.insert(ty);
            }
            pattern => query.content_pattern = Some(pattern.to_string()),
        }
    }
    Ok(query)
}
