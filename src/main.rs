use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use require_packer::config::parse_list;
use require_packer::{PackConfig, Packer};

/// Rewrite runtime-computed `require` paths so a static bundler can see every dependency.
#[derive(Debug, Parser)]
#[command(name = "require-packer", version, about)]
struct Cli {
  /// Project directory whose top-level folders are packed.
  #[arg(long)]
  target: PathBuf,

  /// Folder, relative to the target, that receives rewritten entry files.
  #[arg(long)]
  dist: Option<String>,

  /// Top-level names to skip, as an array: "['node_modules','.git']".
  #[arg(long)]
  exclude: Option<String>,

  /// Configuration file to use instead of discovering one in the target.
  #[arg(long)]
  config: Option<PathBuf>,

  /// Print the run report as JSON.
  #[arg(long)]
  json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let root = std::fs::canonicalize(&cli.target)
    .with_context(|| format!("target {} does not exist", cli.target.display()))?;

  let mut config = match &cli.config {
    Some(path) => PackConfig::from_path(path)
      .with_context(|| format!("failed to load configuration from {}", path.display()))?,
    None => PackConfig::discover(&root),
  }
  .with_env_overrides();

  if let Some(dist) = cli.dist {
    config.output_folder = dist;
  }
  if let Some(exclude) = cli.exclude.as_deref() {
    match parse_list("exclude", exclude) {
      Some(items) => config.excluded_items = items,
      None => bail!("--exclude must be an array, e.g. \"['dist','node_modules']\""),
    }
  }

  let layout = config.exclude_output_folder().into_layout(&root);
  let report = Packer::new(&layout)
    .pack_project()
    .await
    .with_context(|| format!("failed to pack {}", root.display()))?;

  if cli.json {
    println!("{}", serde_json::to_string_pretty(&report)?);
  } else {
    println!(
      "Packed {} unit(s) into {} ({} registry keys, {} skipped, {} unresolved)",
      report.rewritten.len(),
      layout.output_root.display(),
      report.registry_keys,
      report.skipped.len(),
      report.unresolved.len(),
    );
    for failure in &report.failures {
      eprintln!("failed: {}: {}", failure.path.display(), failure.error);
    }
  }

  if !report.is_success() {
    bail!("{} unit(s) failed", report.failures.len());
  }
  Ok(())
}
