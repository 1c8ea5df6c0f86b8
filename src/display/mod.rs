//! # Display Module
//!
//! Console rendering for registry listings and rerank scores.

use comfy_table::{Table, Cell, ContentArrangement, Attribute};
use colored::*;
use crate::model::ModelEntry;
use crate::pipeline::GenerationResult;
use crate::rerank::SentenceScore;

/// Displays a table of registered models with colorful formatting.
pub fn display_models_table(models: &[ModelEntry]) {
    if models.is_empty() {
        println!("{}", "No models found in registry".yellow());
        return;
    }

    let mut table = Table::new();
    table
        .set_header(vec![
            Cell::new("#").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Name").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Architecture").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Vocab Size").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Added Date").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
        ])
        .load_preset(comfy_table::presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    for model in models {
        table.add_row(vec![
            Cell::new(model.number.map(|n| n.to_string()).unwrap_or_default()),
            Cell::new(&model.name),
            Cell::new(&model.architecture),
            Cell::new(model.vocab_size.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())),
            Cell::new(model.added_date.format("%Y-%m-%d %H:%M").to_string()),
        ]);
    }

    println!("{table}");
    println!("{}", format!("{} model(s) in registry", models.len()).green());
}

/// Prints a generation result in the `prompt => text` form the smoke runs
/// use.
pub fn display_generation(result: &GenerationResult) {
    println!(
        "{} {} {}",
        result.prompt.cyan(),
        "=>".bright_cyan(),
        result.text
    );
}

/// Displays a comparison set as a table, most plausible sentence first.
pub fn display_rerank_table(scores: &[SentenceScore]) {
    let mut ranked: Vec<&SentenceScore> = scores.iter().collect();
    ranked.sort_by(|a, b| b.log_prob.total_cmp(&a.log_prob));

    let mut table = Table::new();
    table
        .set_header(vec![
            Cell::new("Rank").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Sentence").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Tokens").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Log Prob").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Diff Log Prob").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
        ])
        .load_preset(comfy_table::presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    for (rank, score) in ranked.iter().enumerate() {
        table.add_row(vec![
            Cell::new((rank + 1).to_string()),
            Cell::new(&score.sentence),
            Cell::new(score.tokens.len().to_string()),
            Cell::new(format!("{:.4}", score.log_prob)),
            Cell::new(format!("{:.4}", score.diff_log_prob)),
        ]);
    }

    println!("{table}");
    if let Some(best) = ranked.first() {
        println!("{} {}", "Most plausible:".green().bold(), best.sentence);
    }
}

/// Prints a tokenizer round trip: ids first, decoded text second.
pub fn display_tokens(text: &str, tokens: &[i64], decoded: &str) {
    let ids = tokens
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    println!("{} {}", "Text:".cyan(), text);
    println!("{} [{}]", "Tokens:".cyan(), ids);
    println!("{} {}", "Decoded:".cyan(), decoded);
}
