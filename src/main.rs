use std::{path::PathBuf, process::ExitCode};

use anyhow::Context;
use aura_fetch::{
    config::Settings,
    google::{self, GoogleDrive, GoogleSheets, InstalledAppFlow, TokenStore},
    FolderMatch,
};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Extracts one column from the CSV files in each patient's Drive folder.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// JSON settings file; flags below override it.
    #[arg(long, env = "AURA_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "AURA_SPREADSHEET_ID")]
    spreadsheet_id: Option<String>,

    /// Cell range listing the patients, e.g. `AURA!A3:F`.
    #[arg(long)]
    range: Option<String>,

    /// Zero-based column of the range holding patient ids.
    #[arg(long)]
    id_column: Option<usize>,

    /// CSV column to extract.
    #[arg(long)]
    column: Option<String>,

    /// Number of patients fetched from the top of the sheet.
    #[arg(long, env = "AURA_PATIENT_LIMIT")]
    patient_limit: Option<usize>,

    #[arg(long, value_enum)]
    folder_match: Option<FolderMatch>,

    /// Where the OAuth token is cached.
    #[arg(long)]
    token: Option<PathBuf>,

    /// OAuth client secrets, needed the first time only.
    #[arg(long)]
    client_secrets: Option<PathBuf>,

    #[arg(long)]
    max_retries: Option<u32>,

    /// Delay before the first retry; doubles on each further attempt.
    #[arg(long)]
    retry_backoff_ms: Option<u64>,

    #[arg(long, env = "AURA_LOG", default_value_t = tracing::Level::INFO)]
    log_level: tracing::Level,

    /// Pretty-print the result.
    #[arg(long)]
    pretty: bool,
}

impl Cli {
    fn apply(&self, settings: &mut Settings) {
        if let Some(v) = &self.spreadsheet_id {
            settings.spreadsheet_id = v.clone();
        }
        if let Some(v) = &self.range {
            settings.range = v.clone();
        }
        if let Some(v) = self.id_column {
            settings.id_column = v;
        }
        if let Some(v) = &self.column {
            settings.column = v.clone();
        }
        if let Some(v) = self.patient_limit {
            settings.patient_limit = v;
        }
        if let Some(v) = self.folder_match {
            settings.folder_match = v;
        }
        if let Some(v) = &self.token {
            settings.token_path = v.clone();
        }
        if let Some(v) = &self.client_secrets {
            settings.client_secrets_path = v.clone();
        }
        if let Some(v) = self.max_retries {
            settings.max_retries = v;
        }
        if let Some(v) = self.retry_backoff_ms {
            settings.retry_backoff_ms = v;
        }
    }
}

fn init_logging(level: tracing::Level) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Could not install logger: {e}");
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_level);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings = match &cli.config {
        Some(path) => Settings::from_file(path).await?,
        None => Settings::default(),
    };
    cli.apply(&mut settings);
    settings.validate()?;

    let store = TokenStore::new(settings.token_path.clone());
    let flow = InstalledAppFlow::new(settings.client_secrets_path.clone(), google::SCOPES);
    let credential = google::obtain_credentials(&store, &flow)
        .await
        .with_context(|| format!("Could not obtain credentials (`{}`)", store.path().display()))?;

    let reports = aura_fetch::run(&GoogleSheets, &GoogleDrive, &credential, &settings)
        .await
        .context("Run aborted")?;

    let with_data = reports.iter().filter(|r| r.values.is_some()).count();
    info!(patients = reports.len(), with_data, "done");

    let nested: Vec<_> = reports.iter().map(|r| &r.values).collect();
    let out = match cli.pretty {
        true => serde_json::to_string_pretty(&nested)?,
        false => serde_json::to_string(&nested)?,
    };
    println!("{out}");

    Ok(())
}
