//! Command-line listing: open a collection, build a browser session and print
//! the sorted cards as a table.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::collection::Collection;
use crate::columns::builtin_contributors;
use crate::config::{ConfigFile, EffectiveConfig};
use crate::session::{BrowserSession, BrowserState};
use crate::sort::{SearchScope, SortDirection};

pub mod outputformatter;

pub const DEFAULT_COLUMNS: &[&str] = &["note", "template", "deck", "noteTags"];

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CliArgs {
    pub collection: PathBuf,
    pub columns: Vec<String>,
    pub sort: Option<String>,
    pub descending: bool,
    pub predicate: Option<String>,
    pub config: Option<PathBuf>,
    pub internal: bool,
}

pub fn usage(program: &str) -> String {
    format!(
        "Usage: {} <collection.sqlite> [--columns a,b] [--sort id] [--desc] [--where SQL] [--config file.json] [--internal]",
        program
    )
}

impl CliArgs {
    /// Parse everything after the program name.
    pub fn parse(args: &[String]) -> Result<Self> {
        let mut out = CliArgs::default();
        let mut collection: Option<PathBuf> = None;
        let mut i = 0;
        while i < args.len() {
            let value = |name: &str| -> Result<String> {
                args.get(i + 1).cloned().with_context(|| format!("{} requires a value", name))
            };
            match args[i].as_str() {
                "--columns" => {
                    out.columns = value("--columns")?
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect();
                    i += 2;
                }
                "--sort" => { out.sort = Some(value("--sort")?); i += 2; }
                "--where" => { out.predicate = Some(value("--where")?); i += 2; }
                "--config" => { out.config = Some(PathBuf::from(value("--config")?)); i += 2; }
                "--desc" => { out.descending = true; i += 1; }
                "--internal" => { out.internal = true; i += 1; }
                other if other.starts_with("--") => bail!("unknown option {}", other),
                other => {
                    if collection.is_some() {
                        bail!("unexpected argument {}", other);
                    }
                    collection = Some(PathBuf::from(other));
                    i += 1;
                }
            }
        }
        out.collection = collection.context("missing collection path")?;
        if out.columns.is_empty() {
            out.columns = DEFAULT_COLUMNS.iter().map(|s| s.to_string()).collect();
        }
        Ok(out)
    }

    pub fn effective_config(&self) -> Result<EffectiveConfig> {
        let mut config = match &self.config {
            Some(path) => ConfigFile::load(path)?.effective(),
            None => EffectiveConfig::default(),
        };
        if self.internal {
            config.show_internal_fields = true;
        }
        Ok(config)
    }

    fn state(&self) -> BrowserState {
        BrowserState {
            active_columns: self.columns.clone(),
            sort_column: self.sort.clone(),
            sort_direction: if self.descending { SortDirection::Descending } else { SortDirection::Ascending },
        }
    }
}

pub fn run(args: &CliArgs) -> Result<()> {
    let config = args.effective_config()?;
    let collection = Collection::open(&args.collection)?;
    let contributors = builtin_contributors();
    let session = BrowserSession::open(&collection, config, &contributors).with_state(args.state());

    let dropped: Vec<&String> = args.columns.iter().filter(|c| !session.state().active_columns.contains(c)).collect();
    if !dropped.is_empty() {
        info!(target: "browsecol::session", "ignoring unknown columns: {:?}", dropped);
    }

    let scope = match &args.predicate {
        Some(sql) => SearchScope::predicate(sql.clone()),
        None => SearchScope::All,
    };
    let ids = session.search(&scope)?;

    let headers: Vec<String> = session
        .state()
        .active_columns
        .iter()
        .map(|id| session.registry().get(id).map(|d| d.label().to_string()).unwrap_or_else(|| id.clone()))
        .collect();
    let rows: Vec<Vec<String>> = ids
        .iter()
        .map(|cid| session.row(*cid).iter().map(|c| c.as_str().to_string()).collect())
        .collect();
    outputformatter::print_table(&headers, &rows, session.config().column_alignment);
    Ok(())
}
