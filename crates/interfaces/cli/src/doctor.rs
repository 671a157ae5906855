use std::path::Path;

use anyhow::Result;
use chrono::NaiveDate;

use vaultwise_config::AppConfig;
use vaultwise_llm::{list_ollama_models, list_openrouter_models};
use vaultwise_notes::{IsoWeek, VaultPaths};

pub(crate) async fn run(
    config: &AppConfig,
    config_path: &Path,
    today: NaiveDate,
    model_catalog: bool,
) -> Result<()> {
    if model_catalog {
        for line in collect_model_lines(config).await {
            println!("{line}");
        }
        return Ok(());
    }

    for line in report_lines(config, config_path, today) {
        println!("{line}");
    }
    Ok(())
}

fn report_lines(config: &AppConfig, config_path: &Path, today: NaiveDate) -> Vec<String> {
    let paths = VaultPaths::new(&config.vault);
    let week = IsoWeek::of(today);
    let presence = |path: &Path| if path.exists() { "present" } else { "missing" };

    let config_source = if config_path.exists() { "file" } else { "defaults" };
    let api_key = match std::env::var("OPENROUTER_API_KEY") {
        Ok(key) if !key.trim().is_empty() => "set",
        _ => "missing",
    };
    let tags = config
        .tags
        .iter()
        .map(|tag| match tag.prompt {
            Some(_) => format!("{} (custom prompt)", tag.name),
            None => tag.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ");

    let inbox = paths.inbox();
    let focus = paths.focus_file(week);
    let archive = paths.archive_dir(week.previous());
    let summary = paths.summary_file(week.previous());

    vec![
        "vaultwise doctor".to_string(),
        format!("- config: {} ({config_source})", config_path.display()),
        format!("- vault root: {}", paths.root().display()),
        format!("- today: {today} ({week})"),
        format!("- inbox: {} [{}]", inbox.display(), presence(&inbox)),
        format!("- focus file: {} [{}]", focus.display(), presence(&focus)),
        format!("- last week's archive: {} [{}]", archive.display(), presence(&archive)),
        format!("- last week's summary: {} [{}]", summary.display(), presence(&summary)),
        format!("- weekly day: {}", config.schedule.weekly_day),
        format!("- provider: {}", config.llm.provider),
        format!("- model: {}", config.active_model()),
        format!("- openrouter api key: {api_key}"),
        format!("- tags: {tags}"),
    ]
}

async fn collect_model_lines(config: &AppConfig) -> Vec<String> {
    let mut lines = Vec::new();

    match list_ollama_models().await {
        Ok(models) => {
            lines.push(format!("ollama models ({})", models.len()));
            lines.extend(models.into_iter().map(|model| format!("- {model}")));
        }
        Err(err) => lines.push(format!("ollama models unavailable: {err}")),
    }

    match list_openrouter_models(&config.llm.openrouter_base_url).await {
        Ok(models) => {
            lines.push(format!("openrouter models ({})", models.len()));
            lines.extend(models.into_iter().map(|model| format!("- {model}")));
        }
        Err(err) => lines.push(format!("openrouter models unavailable: {err}")),
    }

    lines
}
