//! # Verify Module
//!
//! Built-in smoke suites for a freshly converted model. The prompts and
//! comparison sets are fixed inputs with well-understood behavior on the
//! Japanese GPT exports this harness was written for: the generation prompts
//! are common opening phrases, the name-recall prompts check that the model
//! repeats the right spelling of a name it was just told, and each rerank
//! set contrasts homophone spellings of which exactly one is natural in
//! context.

use std::error::Error;
use tracing::info;
use crate::display;
use crate::pipeline::GenerationPipeline;

/// Opening phrases for the generation smoke run.
pub const GENERATION_PROMPTS: [&str; 3] = [
    "昔々あるところに",
    "このたびは誠に",
    "本日はお日柄もよく",
];

/// Name-recall prompts. Each introduces two relatives whose names are
/// homophones (all read ようこ) and asks for one of them back, so the
/// continuation shows whether the model tracks who carries which spelling.
pub const NAME_RECALL_PROMPTS: [&str; 6] = [
    "私の姉は陽子で、旦那の妹は葉子です。姉の名前は",
    "私の姉は葉子で、旦那の妹は洋子です。姉の名前は",
    "私の姉は陽子で、旦那の妹は葉子です。義理の妹の名前は",
    "私の姉は葉子で、旦那の妹は陽子です。義理の妹の名前は",
    "旦那の妹は葉子で、私の姉は陽子です。義理の妹の名前は",
    "旦那の妹は洋子で、私の姉は葉子です。義理の妹の名前は",
];

/// Homophone comparison sets for the rerank smoke run. Within each set the
/// sentences differ only in the spelling of one word: a verb or adjective
/// reading in the first four sets, a person's name in the rest.
pub const RERANK_SUITES: [&[&str]; 8] = [
    &["庭で犬を飼う", "庭で犬を買う", "庭で犬をかう"],
    &["店で犬を飼う", "店で犬を買う", "店で犬をかう"],
    &["登校時間が、いつもよりとても速い", "登校時間が、いつもよりとても早い"],
    &["彼の足は、いつもよりとても速い", "彼の足は、いつもよりとても早い"],
    &[
        "私の姉の名前は陽子です。先日、姉の陽子",
        "私の姉の名前は陽子です。先日、姉の葉子",
        "私の姉の名前は陽子です。先日、姉の洋子",
    ],
    &[
        "私の姉の名前は葉子です。先日、姉の陽子",
        "私の姉の名前は葉子です。先日、姉の葉子",
        "私の姉の名前は葉子です。先日、姉の洋子",
    ],
    &[
        "私の姉の名前は陽子で、いとこの名前は葉子です。先日、姉の陽子",
        "私の姉の名前は陽子で、いとこの名前は葉子です。先日、姉の葉子",
    ],
    &[
        "私の姉の名前は陽子で、いとこの名前は葉子です。先日、いとこの陽子",
        "私の姉の名前は陽子で、いとこの名前は葉子です。先日、いとこの葉子",
    ],
];

/// Runs all smoke suites against a loaded pipeline.
///
/// Prints `prompt => generated text` for each generation and name-recall
/// prompt, then a score table per comparison set. Any model that loads
/// correctly produces non-empty output for every prompt.
pub fn run(pipeline: &mut GenerationPipeline) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!("Running generation smoke suite ({} prompts)", GENERATION_PROMPTS.len());
    for prompt in GENERATION_PROMPTS {
        let result = pipeline.generate(prompt)?;
        display::display_generation(&result);
    }

    info!("Running name-recall smoke suite ({} prompts)", NAME_RECALL_PROMPTS.len());
    for prompt in NAME_RECALL_PROMPTS {
        let result = pipeline.generate(prompt)?;
        display::display_generation(&result);
    }

    info!("Running rerank smoke suite ({} sets)", RERANK_SUITES.len());
    for suite in RERANK_SUITES {
        let sentences: Vec<String> = suite.iter().map(|s| s.to_string()).collect();
        let scores = pipeline.rerank(&sentences)?;
        display::display_rerank_table(&scores);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suites_are_well_formed() {
        assert!(GENERATION_PROMPTS.iter().all(|p| !p.is_empty()));
        assert!(NAME_RECALL_PROMPTS.iter().all(|p| !p.is_empty()));
        for suite in RERANK_SUITES {
            // Reranking needs at least two sentences to compare
            assert!(suite.len() >= 2);
            assert!(suite.iter().all(|s| !s.is_empty()));
        }
    }

    #[test]
    fn test_name_suites_cover_every_spelling() {
        for spelling in ["陽子", "葉子", "洋子"] {
            assert!(
                NAME_RECALL_PROMPTS.iter().any(|p| p.contains(spelling)),
                "name-recall prompts missing {}",
                spelling
            );
            assert!(
                RERANK_SUITES
                    .iter()
                    .flat_map(|suite| suite.iter())
                    .any(|s| s.contains(spelling)),
                "rerank sets missing {}",
                spelling
            );
        }
    }

    #[test]
    fn test_rerank_sets_differ_only_past_shared_prefix() {
        for suite in RERANK_SUITES {
            // Every sentence pair in a set shares a non-empty prefix
            let first = suite[0];
            for other in &suite[1..] {
                let shared = first
                    .chars()
                    .zip(other.chars())
                    .take_while(|(a, b)| a == b)
                    .count();
                assert!(shared > 0, "{:?} and {:?} share no prefix", first, other);
            }
        }
    }
}
