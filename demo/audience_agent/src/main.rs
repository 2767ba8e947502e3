mod config;

use audience_core::{AudienceAgent, BoundedQueryOutcome, FeedbackRecord, Verdict};
use serde_json::json;
use tracing::{error, info};

const USAGE: &str = "\
usage:
  audience_agent generate <attribute goal>
  audience_agent validate <nl query> <filter clause> <ground truth clause>
  audience_agent query <sql>
  audience_agent feedback <attribute goal> <filter clause> <up|down> [comment]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    // Logging / tracing
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,audience_core=info,audience_agent=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((command, rest)) = args.split_first() else {
        eprintln!("{USAGE}");
        std::process::exit(2);
    };

    // Load configuration (env + optional TOML overlay) and build clients once
    let cfg = config::load();
    let agent = AudienceAgent::from_config(cfg)?;
    info!(target: "audience_agent", table = %agent.table(), "Agent ready");

    match (command.as_str(), rest) {
        ("generate", [goal, ..]) => {
            let result = agent.run_audience_agent(goal).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({"success": true, "result": result}))?
            );
        }
        ("validate", [nl_query, clause, truth, ..]) => {
            let judgment = agent.validate_query(nl_query, clause, truth).await?;
            println!("{}", serde_json::to_string_pretty(&judgment)?);
        }
        ("query", [sql, ..]) => match agent.run_bounded_query(sql).await {
            BoundedQueryOutcome::Rows(rows) => {
                println!("{}", serde_json::to_string_pretty(&rows.records())?)
            }
            other => println!("{other}"),
        },
        ("feedback", [goal, clause, verdict, comment @ ..]) => {
            let verdict = match verdict.as_str() {
                "up" | "thumbs_up" => Verdict::ThumbsUp,
                "down" | "thumbs_down" => Verdict::ThumbsDown,
                other => {
                    error!(target: "audience_agent", verdict = %other, "Unknown verdict");
                    eprintln!("{USAGE}");
                    std::process::exit(2);
                }
            };
            let record = FeedbackRecord::new(goal.as_str(), clause.as_str())
                .with_verdict(verdict)
                .with_text(comment.join(" "));
            agent.submit_feedback(&record).await?;
            println!(
                "{}",
                json!({"success": true, "message": "Feedback recorded successfully"})
            );
        }
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    }

    Ok(())
}
