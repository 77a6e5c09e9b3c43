//! Analyze command implementation

use std::sync::Arc;
use tracing::info;

use crate::cli::{apply_overrides, AnalyzeArgs};
use crate::config::{load_config, SearchConfig};
use crate::error::{Error, Result};
use crate::generation::openai::{load_dotenv_if_present, LlmSettings, OpenAiService};
use crate::generation::stub::ScriptedService;
use crate::generation::GenerationService;
use crate::persistence::{AnalysisRecord, JsonDirStore};
use crate::service::AnalysisService;

/// Human-readable summary of a finished analysis
pub fn format_record_summary(record: &AnalysisRecord) -> String {
    let stats = &record.outcome.mcts_statistics;
    let mut lines = vec![
        format!("Selected response {}:", record.outcome.selected_branch_index + 1),
        format!("  {}", record.outcome.selected_response),
        format!("Rationale: {}", record.outcome.rationale),
        format!(
            "Iterations: {}  Nodes: {}  Pruned: {}  Best score: {:.2}",
            stats.total_iterations, stats.nodes_created, stats.pruned_branches, record.overall_scores.best_score
        ),
    ];
    if stats.partial {
        lines.push("Search stopped at the time budget; results are partial.".to_string());
    }
    lines.join("\n")
}

fn generation_service(scripted: bool) -> Result<Arc<dyn GenerationService>> {
    if scripted {
        return Ok(Arc::new(ScriptedService::new()));
    }
    if let Ok(cwd) = std::env::current_dir() {
        load_dotenv_if_present(&cwd);
    }
    let settings = LlmSettings::from_env()?;
    info!(model = %settings.model, base_url = %settings.base_url, "using OpenAI-compatible service");
    let service = OpenAiService::new(settings).map_err(|e| Error::ConfigError(e.to_string()))?;
    Ok(Arc::new(service))
}

pub async fn run_analyze(args: AnalyzeArgs, quiet: bool) -> Result<()> {
    let base = match &args.config {
        Some(path) => load_config(path)?,
        None => SearchConfig::default(),
    };
    let config = apply_overrides(base, &args);

    let store = Arc::new(JsonDirStore::new(&args.store));
    let service = AnalysisService::new(generation_service(args.scripted)?, store.clone(), store.clone());
    let record = service.analyze(&args.chat_id, config).await?;

    if args.print {
        let json = serde_json::to_string_pretty(&record).map_err(|e| Error::Serialization(e.to_string()))?;
        println!("{json}");
    } else if !quiet {
        println!("{}", format_record_summary(&record));
        println!("Record written to {}", store.result_path(&args.chat_id).display());
    }
    Ok(())
}
