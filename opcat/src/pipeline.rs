//! Orchestration of the full sync pipeline.
//!
//! fetch → stage → manifest → prune → catalog load. Infrastructure
//! failures (store unreachable, family load) abort the run; per-operator
//! failures are recorded in the run report and the pipeline continues.

use crate::fetch::{self, FetchOutcome};
use crate::manifest::Manifest;
use crate::stage;
use anyhow::Context;
use opcat_common::config::{OpcatConfig, OperatorList};
use opcat_common::OperatorName;
use opcat_catalog::report::{OperatorOutcome, OperatorReport, RunReport};
use opcat_catalog::{CatalogStore, GeneratorConfig, extract_catalogs, generate, normalize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Run the full pipeline: fetch every configured operator, stage the
/// successful ones, write the versions manifest, prune unlisted staged
/// operators, then rebuild the catalog store.
pub async fn run_sync(cfg: &OpcatConfig, list: OperatorList) -> anyhow::Result<RunReport> {
    let outcomes = run_fetch(cfg, list).await;

    let mut staged = Vec::new();
    for outcome in &outcomes {
        if !outcome.succeeded() {
            continue;
        }
        let repo_dir = cfg.general.fetch_dir.join(format!("op-{}", outcome.name));
        if !stage::has_catalog_file(&repo_dir) {
            warn!(operator = %outcome.name, "no catalog file, staging anyway");
        }
        match stage::stage_operator(&cfg.general.fetch_dir, &cfg.general.stage_dir, &outcome.name)
        {
            Ok(()) => staged.push(outcome.name.clone()),
            Err(e) => warn!(operator = %outcome.name, error = %e, "staging failed"),
        }
    }
    info!(staged = staged.len(), total = outcomes.len(), "staging complete");

    Manifest::from_outcomes(&outcomes)
        .write(&cfg.general.stage_dir)
        .context("writing versions manifest")?;

    // Only operators that actually staged stay in the stage directory and
    // reach the catalog; a failed fetch or stage drops the operator from
    // the run entirely.
    let keep: HashSet<OperatorName> = staged.iter().cloned().collect();
    stage::prune_unlisted(&cfg.general.stage_dir, &keep)
        .context("pruning unlisted staged operators")?;

    run_load(cfg, &staged)
}

/// Fetch every configured operator without touching stage or catalog.
pub async fn run_fetch(cfg: &OpcatConfig, list: OperatorList) -> Vec<FetchOutcome> {
    info!(
        operators = list.operators.len(),
        jobs = cfg.fetch.effective_jobs(),
        "fetching operator repositories"
    );
    let outcomes = fetch::fetch_all(list.operators, &cfg.fetch, &cfg.general.fetch_dir).await;
    let failed = outcomes.iter().filter(|o| !o.succeeded()).count();
    info!(total = outcomes.len(), failed, "fetch complete");
    outcomes
}

/// Rebuild the catalog store from the named fetched operators.
///
/// The store is wiped first; every operator is then extracted, normalized,
/// generated, and loaded in its own transaction per definition.
pub fn run_load(cfg: &OpcatConfig, operators: &[OperatorName]) -> anyhow::Result<RunReport> {
    let registry = cfg.family_registry().context("loading family registry")?;
    let mut store = CatalogStore::open(&cfg.catalog.db_path, cfg.catalog.busy_timeout())
        .with_context(|| format!("opening catalog store {}", cfg.catalog.db_path.display()))?;

    store
        .wipe(cfg.catalog.wipe_families)
        .context("wiping catalog store")?;
    if cfg.catalog.wipe_families || store.count("family")? == 0 {
        store
            .load_families(&registry)
            .context("loading family registry into store")?;
    }

    let generator = GeneratorConfig::from(&cfg.catalog);
    let mut report = RunReport::new();
    for name in operators {
        let repo_dir = cfg.general.fetch_dir.join(format!("op-{name}"));
        report.record(load_operator(&mut store, &registry, &generator, name, &repo_dir));
    }
    Ok(report)
}

fn load_operator(
    store: &mut CatalogStore,
    registry: &opcat_common::FamilyRegistry,
    generator: &GeneratorConfig,
    name: &OperatorName,
    repo_dir: &Path,
) -> OperatorReport {
    let extraction = extract_catalogs(repo_dir);

    if extraction.definitions.is_empty() {
        let reason = if extraction.skipped.is_empty() {
            "no catalog file".to_string()
        } else {
            "every catalog file was skipped".to_string()
        };
        return OperatorReport {
            operator: name.to_string(),
            outcome: OperatorOutcome::Skipped { reason },
            skipped_files: extraction.skipped,
        };
    }

    let mut loaded = 0;
    for mut def in extraction.definitions {
        normalize(&mut def, registry);
        let batch = generate(&def, generator);
        if let Err(e) = store.load_catalog(&batch) {
            return OperatorReport {
                operator: name.to_string(),
                outcome: OperatorOutcome::Failed {
                    error: e.to_string(),
                },
                skipped_files: extraction.skipped,
            };
        }
        loaded += 1;
    }

    OperatorReport {
        operator: name.to_string(),
        outcome: OperatorOutcome::Loaded {
            definitions: loaded,
        },
        skipped_files: extraction.skipped,
    }
}

/// Operators present in the fetch cache, sorted by name. Used when the
/// catalog stage runs without a preceding fetch.
pub fn discover_fetched(fetch_dir: &Path) -> anyhow::Result<Vec<OperatorName>> {
    let mut names = Vec::new();
    if !fetch_dir.is_dir() {
        return Ok(names);
    }
    for entry in std::fs::read_dir(fetch_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let dir_name = entry.file_name().to_string_lossy().into_owned();
        if let Some(stripped) = dir_name.strip_prefix("op-") {
            names.push(OperatorName::new(stripped));
        }
    }
    names.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    Ok(names)
}

/// Generate (without executing) the statement batches for the named
/// operators, rendered for display.
pub fn dump_sql(cfg: &OpcatConfig, operators: &[OperatorName]) -> anyhow::Result<Vec<String>> {
    let registry = cfg.family_registry().context("loading family registry")?;
    let generator = GeneratorConfig::from(&cfg.catalog);

    let mut rendered = Vec::new();
    for name in operators {
        let repo_dir: PathBuf = cfg.general.fetch_dir.join(format!("op-{name}"));
        let extraction = extract_catalogs(&repo_dir);
        for mut def in extraction.definitions {
            normalize(&mut def, &registry);
            for statement in generate(&def, &generator) {
                rendered.push(statement.render());
            }
        }
    }
    Ok(rendered)
}
