use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::debug;

use mlops_artifact::{ArtifactClient, Connector, FsConnector, run_scoped_path};
use mlops_config::{BackendConfig, Config, Overrides};

/// mlops - store, fetch and delete pipeline artifacts in an object store bucket
#[derive(Parser)]
#[command(name = "mlops")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the config file (default: ~/.mlops/config.json)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Cloud project that owns the bucket
  #[arg(long, global = true, env = "MLOPS_PROJECT")]
  project: Option<String>,

  /// Bucket to operate on
  #[arg(long, global = true, env = "MLOPS_BUCKET")]
  bucket: Option<String>,

  /// Use a local directory of buckets instead of the cloud backend
  #[arg(long, global = true, env = "MLOPS_FS_ROOT")]
  fs_root: Option<PathBuf>,

  /// Log filter, e.g. `debug` or `mlops_artifact=trace`
  #[arg(long, global = true)]
  log_level: Option<String>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Upload a local file to a new object; fails if the object already exists
  Store {
    /// File to upload
    local_file: PathBuf,
    /// Destination key in the bucket
    remote_path: String,
  },

  /// Download an object to a local file, creating parent directories
  Fetch {
    /// Key of the object to download
    remote_path: String,
    /// Where to write it
    local_file: PathBuf,
  },

  /// Delete an object
  Delete {
    /// Key of the object to delete
    remote_path: String,
  },

  /// Print the run-scoped key for an artifact
  Path {
    flow_name: String,
    run_id: String,
    file_name: String,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  // Pure helper; needs no config or backend.
  if let Commands::Path {
    flow_name,
    run_id,
    file_name,
  } = &cli.command
  {
    println!("{}", run_scoped_path(flow_name, run_id, file_name));
    return Ok(());
  }

  let config = load_config(&cli)?;
  mlops_log::init(&config.log).context("failed to initialise logging")?;
  debug!(?config, "loaded configuration");

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { dispatch(cli.command, config).await })
}

fn load_config(cli: &Cli) -> Result<Config> {
  let mut config = match &cli.config {
    Some(path) => Config::load(path)?,
    None => match dirs::home_dir() {
      Some(home) => Config::load_or_default(home.join(".mlops").join("config.json"))?,
      None => Config::default(),
    },
  };

  config.apply(Overrides {
    project_id: cli.project.clone(),
    bucket_id: cli.bucket.clone(),
    fs_root: cli.fs_root.clone(),
    log_level: cli.log_level.clone(),
  });
  config.validate()?;

  Ok(config)
}

async fn dispatch(command: Commands, config: Config) -> Result<()> {
  match config.backend.clone() {
    BackendConfig::Filesystem { root } => run(command, &config, FsConnector::new(root)).await,
    BackendConfig::Gcs => run_gcs(command, &config).await,
  }
}

#[cfg(feature = "gcs")]
async fn run_gcs(command: Commands, config: &Config) -> Result<()> {
  run(command, config, mlops_artifact::GcsConnector::new()).await
}

#[cfg(not(feature = "gcs"))]
async fn run_gcs(_command: Commands, _config: &Config) -> Result<()> {
  bail!("this build of mlops has no Google Cloud Storage support; use --fs-root")
}

async fn run<C: Connector>(command: Commands, config: &Config, connector: C) -> Result<()> {
  let client = ArtifactClient::new(&config.project_id, &config.bucket_id, connector)?;

  match command {
    Commands::Store {
      local_file,
      remote_path,
    } => {
      let data = read_local(&local_file).await?;
      let path = client.store(data, &remote_path).await?;
      println!("{}", path);
    }
    Commands::Fetch {
      remote_path,
      local_file,
    } => {
      client.fetch(&remote_path, &local_file).await?;
      eprintln!("Fetched {} to {}", remote_path, local_file.display());
    }
    Commands::Delete { remote_path } => {
      client.delete(&remote_path).await?;
      eprintln!("Deleted {}", remote_path);
    }
    Commands::Path { .. } => bail!("path does not talk to the store"),
  }

  Ok(())
}

async fn read_local(path: &Path) -> Result<Vec<u8>> {
  tokio::fs::read(path)
    .await
    .with_context(|| format!("failed to read local file: {}", path.display()))
}
