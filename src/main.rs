use anyhow::Context;
use clap::Parser;
use doctype_prune::config::Config;
use doctype_prune::driver::{self, RunOutcome};
use doctype_prune::execution::ExecutionMethod;
use doctype_prune::logging;
use std::path::PathBuf;
use std::process::ExitCode;

/// Remove custom properties from document types.
#[derive(Parser, Debug)]
#[command(name = "doctype-prune", version)]
struct Args {
    /// Configuration file (TOML)
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// How this run was launched; must be in the configured allow-list
    #[arg(long, env = "DOCTYPE_PRUNE_EXECUTION_METHOD", default_value = "INTOOL")]
    execution_method: ExecutionMethod,

    /// Persist changes (dry run is the default)
    #[arg(long, conflicts_with = "dry_run")]
    live: bool,

    #[arg(long)]
    dry_run: bool,

    /// Document type to modify; repeatable, replaces the configured list
    #[arg(long = "doc-type")]
    doc_types: Vec<String>,

    /// Custom property to remove; repeatable, replaces the configured list
    #[arg(long = "remove-prop")]
    remove_props: Vec<String>,

    #[arg(long)]
    postgres_url: Option<String>,

    /// JSON snapshot to use instead of PostgreSQL
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// 5 = debug .. 1 = critical
    #[arg(long)]
    debug_level: Option<u8>,
}

impl Args {
    fn apply(&self, mut cfg: Config) -> Config {
        if self.live {
            cfg.dry_run = false;
        }
        if self.dry_run {
            cfg.dry_run = true;
        }
        if !self.doc_types.is_empty() {
            cfg.doc_types = self.doc_types.clone();
        }
        if !self.remove_props.is_empty() {
            cfg.remove_props = self.remove_props.clone();
        }
        if let Some(url) = &self.postgres_url {
            cfg.postgres_url = Some(url.clone());
        }
        if let Some(path) = &self.snapshot {
            cfg.snapshot = Some(path.clone());
        }
        if let Some(level) = self.debug_level {
            cfg.debug_level = level;
        }
        cfg
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    let cfg = args.apply(Config::load(args.config.as_deref()).context("loading configuration")?);
    let logging = logging::init(&cfg).context("initializing logging")?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), method = %args.execution_method, "starting doctype-prune");
    if cfg.dry_run {
        println!("\nDRY RUN: No write operations will occur.\n");
    }

    let code = match driver::execute(&cfg, args.execution_method).await {
        Ok(report) => match &report.outcome {
            RunOutcome::Completed => {
                println!("Results:\n{}", report.stats);
                println!("Elapsed: {:.2?}", report.elapsed);
                ExitCode::SUCCESS
            }
            RunOutcome::Aborted(e) => {
                println!("CRITICAL: One or more inputs failed to validate ({e}). {}", log_pointer(&cfg));
                ExitCode::from(2)
            }
        },
        Err(e) if e.is_fatal_config() => {
            eprintln!("CRITICAL: {e}. {}", log_pointer(&cfg));
            ExitCode::from(1)
        }
        Err(e) => {
            tracing::error!(error = %e, "fatal error");
            if cfg.debug_level < 3 {
                tracing::error!("log history:\n\n{}\n", logging.history.render());
            }
            eprintln!("\n\nFATAL ERROR: {e}\n{}\n", log_pointer(&cfg));
            ExitCode::from(1)
        }
    };
    tracing::info!("ending doctype-prune");
    Ok(code)
}

fn log_pointer(cfg: &Config) -> String {
    if cfg.log.to_file {
        format!(
            "Review the log in {} ({}*) for further details.",
            cfg.log.dir.display(),
            logging::LOG_FILE_NAME
        )
    } else {
        "Review the log output above for further details.".to_string()
    }
}
