use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, error::ErrorKind};
use tracing::info;

use crate::config::{Category, Credentials, ExportConfig};
use crate::constants::export::DOWNLOADS_PER_DISK_WRITE;
use crate::constants::files::DEFAULT_CREDENTIALS_PATH;
use crate::constants::request::DEFAULT_API_BASE_URL;
use crate::constants::snapshot::DEFAULT_SNAPSHOT_BASE_URL;
use crate::errors::ExportError;
use crate::fetch::{DetailFetcher, download_ids};
use crate::metrics::FetchReport;
use crate::source::{IdentifierSource, SnapshotIdSource};
use crate::transport::fs::OutputStore;
use crate::transport::http::CatalogClient;

#[derive(Debug, Parser)]
#[command(
    name = "catalog-export",
    disable_help_subcommand = true,
    about = "Fetch catalog detail records into append-only CSV tables",
    long_about = "Download the daily identifier snapshot (cached after the first run), fetch every detail record not yet exported, and append normalized rows to <category>_data.csv and <category>_credits.csv.",
    after_help = "Every flag is optional; a bare invocation runs all configured categories against the production endpoints."
)]
struct ExportCli {
    #[arg(
        long,
        value_name = "PATH",
        default_value = DEFAULT_CREDENTIALS_PATH,
        help = "JSON file holding {\"api_key\": \"...\"}"
    )]
    credentials: PathBuf,
    #[arg(
        long = "output-dir",
        value_name = "DIR",
        default_value = ".",
        help = "Directory for the id cache and output tables"
    )]
    output_dir: PathBuf,
    #[arg(
        long = "api-base-url",
        value_name = "URL",
        default_value = DEFAULT_API_BASE_URL,
        help = "Detail endpoint root"
    )]
    api_base_url: String,
    #[arg(
        long = "snapshot-base-url",
        value_name = "URL",
        default_value = DEFAULT_SNAPSHOT_BASE_URL,
        help = "Daily snapshot hosting root"
    )]
    snapshot_base_url: String,
    #[arg(
        long = "flush-every",
        value_name = "N",
        default_value_t = DOWNLOADS_PER_DISK_WRITE,
        value_parser = parse_positive_usize,
        help = "Successful fetches between disk writes"
    )]
    flush_every: usize,
}

impl ExportCli {
    fn into_config(self) -> (ExportConfig, PathBuf) {
        let config = ExportConfig {
            api_base_url: self.api_base_url,
            snapshot_base_url: self.snapshot_base_url,
            output_dir: self.output_dir,
            flush_every: self.flush_every,
            ..ExportConfig::default()
        };
        (config, self.credentials)
    }
}

/// Parse `args_iter` (without the program name) and run a full export.
pub fn run<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let Some(cli) = parse_cli::<ExportCli, _>(
        std::iter::once("catalog-export".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };
    let (config, credentials_path) = cli.into_config();
    let credentials = Credentials::load(&credentials_path)?;
    download_all_data(&config, &credentials)?;
    Ok(())
}

/// Process every configured category against the live provider.
pub fn download_all_data(
    config: &ExportConfig,
    credentials: &Credentials,
) -> Result<Vec<(&'static str, FetchReport)>, ExportError> {
    config.validate()?;
    let client = CatalogClient::new(config, credentials);
    let store = OutputStore::new(&config.output_dir);
    store.ensure_root()?;
    let source = SnapshotIdSource::new(&client, &store, config.snapshot_base_url.as_str());
    run_categories(
        &store,
        &source,
        &client,
        &config.categories,
        config.flush_every,
    )
}

/// Load ids and run the fetch loop for each category in order.
pub fn run_categories<S, F>(
    store: &OutputStore,
    source: &S,
    fetcher: &F,
    categories: &[Category],
    flush_every: usize,
) -> Result<Vec<(&'static str, FetchReport)>, ExportError>
where
    S: IdentifierSource + ?Sized,
    F: DetailFetcher + ?Sized,
{
    let mut reports = Vec::with_capacity(categories.len());
    for category in categories {
        let ids = source.load_ids(category)?;
        let report = download_ids(store, fetcher, category, ids, flush_every)?;
        reports.push((category.name, report));
    }
    info!(
        "[catalog_export:app] finished {} categories in {}",
        reports.len(),
        store.root().display()
    );
    Ok(reports)
}

fn parse_positive_usize(raw: &str) -> Result<usize, String> {
    let parsed = raw
        .parse::<usize>()
        .map_err(|_| format!("Could not parse '{}' as a positive integer", raw))?;
    if parsed == 0 {
        return Err("value must be greater than zero".to_string());
    }
    Ok(parsed)
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}
