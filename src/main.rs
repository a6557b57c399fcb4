//! Persona Factory CLI
//!
//! 用法：persona-factory [--config PATH] [--max-retries N] [--no-save] [--latest] [goal...]
//! 未给出目标时从标准输入读取一行；结果以 JSON 打印到标准输出，日志写到标准错误。

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{bail, Context};
use persona_factory::agents::format_characters;
use persona_factory::config::load_config_or_default;
use persona_factory::core::{PipelineEvent, PipelineOutcome, PipelineRunner};
use persona_factory::observability;
use persona_factory::store::RunStore;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct CliArgs {
    config: Option<PathBuf>,
    max_retries: Option<u32>,
    no_save: bool,
    latest: bool,
    goal: Vec<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<CliArgs> {
    let mut parsed = CliArgs::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let path = args.next().context("--config requires a path")?;
                parsed.config = Some(PathBuf::from(path));
            }
            "--max-retries" => {
                let n = args.next().context("--max-retries requires a number")?;
                parsed.max_retries = Some(n.parse().with_context(|| format!("invalid --max-retries value: {}", n))?);
            }
            "--no-save" => parsed.no_save = true,
            "--latest" => parsed.latest = true,
            "--" => parsed.goal.extend(args.by_ref()),
            flag if flag.starts_with("--") => bail!("unknown flag: {}", flag),
            _ => parsed.goal.push(arg),
        }
    }
    Ok(parsed)
}

fn read_goal_from_stdin() -> anyhow::Result<String> {
    eprint!("Enter a high-level goal for the persona team: ");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read goal from stdin")?;
    Ok(line.trim().to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let args = parse_args(std::env::args().skip(1))?;
    let cfg = load_config_or_default(args.config.clone());
    tracing::info!("{} starting (data dir: {})", cfg.app.name, cfg.app.data_dir.display());

    if args.latest {
        let store = RunStore::open_at(cfg.db_path()).context("Failed to open run store")?;
        let personas = store.latest().context("Failed to query latest run")?;
        println!("{}", serde_json::to_string_pretty(&personas)?);
        return Ok(());
    }

    let goal = if args.goal.is_empty() {
        read_goal_from_stdin()?
    } else {
        args.goal.join(" ")
    };
    if goal.is_empty() {
        bail!("goal must not be empty");
    }

    // Ctrl+C 取消当前运行
    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Ctrl+C received, cancelling pipeline");
            ctrl_c_token.cancel();
        }
    });

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let progress = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                PipelineEvent::StageStarted { status } => eprintln!("==> {}", status),
                PipelineEvent::ValidationFailed { attempt, errors } => {
                    eprintln!("    validation attempt {} failed: {}", attempt, errors.join("; "))
                }
                PipelineEvent::Finished { success } => {
                    eprintln!("==> {}", if success { "done" } else { "failed" })
                }
            }
        }
    });

    let runner = PipelineRunner::from_config(&cfg)
        .with_max_retries(args.max_retries.unwrap_or(cfg.pipeline.max_retries))
        .with_event_tx(event_tx)
        .with_cancel_token(cancel);
    let outcome = runner.run(&goal).await;
    drop(runner);
    let _ = progress.await;

    match outcome {
        PipelineOutcome::Success { personas } => {
            if cfg.pipeline.persist_results && !args.no_save {
                let store = RunStore::open_at(cfg.db_path()).context("Failed to open run store")?;
                let run_id = store.save(&goal, &personas).context("Failed to save run")?;
                eprintln!("Saved run {} to {}", run_id, cfg.db_path().display());
            }
            let characters = format_characters(&personas, &cfg.formatter);
            println!("{}", serde_json::to_string_pretty(&characters)?);
            Ok(())
        }
        PipelineOutcome::Failed { reason } => bail!("Pipeline failed: {}", reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<CliArgs> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_flags_and_goal_words() {
        let args = parse(&["--max-retries", "3", "--no-save", "promote", "a", "sneaker", "drop"]).unwrap();
        assert_eq!(args.max_retries, Some(3));
        assert!(args.no_save);
        assert!(!args.latest);
        assert_eq!(args.goal.join(" "), "promote a sneaker drop");
    }

    #[test]
    fn test_double_dash_keeps_flag_like_words() {
        let args = parse(&["--", "--latest", "news"]).unwrap();
        assert!(!args.latest);
        assert_eq!(args.goal, ["--latest", "news"]);
    }

    #[test]
    fn test_bad_values_are_rejected() {
        assert!(parse(&["--max-retries", "many"]).is_err());
        assert!(parse(&["--config"]).is_err());
        assert!(parse(&["--verbose"]).is_err());
    }
}
