//! Ask command handler.
//!
//! Loads the persisted index and prints the best-matching chunks.

use clap::Args;
use vaultqa_core::{config::AppConfig, AppError, AppResult};
use vaultqa_knowledge::config::{get_index_path, load_config};
use vaultqa_knowledge::{Answer, ErrorBody, QueryOutcome, ServingState};

/// Retrieve the chunks most relevant to a question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// Question text
    pub query: String,

    /// Number of chunks to retrieve (default: `default_top_k` from config)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let engine = load_config(&config.workspace)?;
        let state = ServingState::from_config(&engine);

        match state.load_from(&get_index_path(&config.workspace), &engine) {
            Ok(_) | Err(AppError::IndexNotReady) => {}
            Err(e) => {
                if self.json {
                    print_json(&QueryOutcome::Error(ErrorBody::from(&e)))?;
                }
                return Err(e);
            }
        }

        if self.json {
            let outcome = state.query_response(&self.query, self.top_k).await;
            print_json(&outcome)?;
            return match outcome {
                QueryOutcome::Answer(_) => Ok(()),
                QueryOutcome::Error(body) => {
                    Err(AppError::Other(format!("{}: {}", body.kind, body.message)))
                }
            };
        }

        let answer = state.query(&self.query, self.top_k).await?;
        print_answer(&answer);
        Ok(())
    }
}

fn print_json(outcome: &QueryOutcome) -> AppResult<()> {
    println!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(())
}

fn print_answer(answer: &Answer) {
    let convention = if answer.higher_is_better {
        "higher is better"
    } else {
        "lower is better"
    };
    println!(
        "Best score: {:.4} ({}, {})",
        answer.best_score, answer.metric, convention
    );

    if answer.results.is_empty() {
        println!("No results.");
        return;
    }

    for (rank, result) in answer.results.iter().enumerate() {
        println!();
        println!(
            "{}. {} #{} (score {:.4})",
            rank + 1,
            result.chunk.source,
            result.chunk.chunk_id,
            result.score
        );
        println!("{}", result.chunk.text.trim());
    }
}
