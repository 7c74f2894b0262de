//! Définition et implémentation des commandes CLI
//!
//! - `run`: requêtes + analyses pour des anneaux de feux GeoJSON
//! - `validate`: vérification d'un plan sans réseau

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tracing::{info, warn};

use wildfire_var::config::{self, PlanConfig, RunSettings};
use wildfire_var::export::export_attributed_rings;
use wildfire_var::fires::read_fire_rings;
use wildfire_var::transport::ReqwestClient;
use wildfire_var::Pipeline;

/// Timeout HTTP d'une requête individuelle
const REQUEST_TIMEOUT: Duration = Duration::from_secs(900);

#[derive(Subcommand)]
pub enum Commands {
    /// Query every dataset around each fire and compute values at risk
    Run(RunArgs),

    /// Check a plan file (directives, parameters, tokens) without querying
    Validate {
        /// Path to the JSON plan
        #[arg(long)]
        plan: PathBuf,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// GeoJSON FeatureCollection of fire rings (EPSG:3338, properties fire_id and ring)
    #[arg(long)]
    pub fires: PathBuf,

    /// Path to the JSON plan
    #[arg(long)]
    pub plan: PathBuf,

    /// Output directory
    #[arg(short, long)]
    pub output: PathBuf,

    /// Also write attributed rings as GeoJSON
    #[arg(long)]
    pub geojson: bool,

    /// Number of concurrent analysis workers (default: CPU count, env VAR_WAVE_SIZE)
    #[arg(long)]
    pub wave_size: Option<usize>,

    /// Total timeout for the query fan-out in seconds (default: 900, env VAR_TIMEOUT_SECS)
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

/// Commande `run`
pub async fn cmd_run(args: RunArgs) -> Result<()> {
    let plan = PlanConfig::load(&args.plan)?;
    let directives = plan.directives()?;
    let templates = plan.templates()?;
    let tokens = config::tokens_from_env(plan.auth_scopes());
    let fires = read_fire_rings(&args.fires)?;

    let mut settings = RunSettings::from_env();
    if let Some(size) = args.wave_size.filter(|&n| n > 0) {
        settings.waves.wave_size = size;
        settings.waves.channel_capacity = size;
    }
    if let Some(secs) = args.timeout_secs {
        settings.total_timeout = Duration::from_secs(secs);
    }

    std::fs::create_dir_all(&args.output)
        .context(format!("Failed to create output directory: {}", args.output.display()))?;

    info!(
        fires = fires.len(),
        datasets = templates.len(),
        wave_size = settings.waves.wave_size,
        timeout_secs = settings.total_timeout.as_secs(),
        "Starting values-at-risk run"
    );

    let client = ReqwestClient::new(REQUEST_TIMEOUT).context("Failed to create HTTP client")?;
    let pipeline = Pipeline::new(Arc::new(client), settings);

    let output = match pipeline.run(&fires, &templates, &directives, &tokens).await {
        Ok(output) => output,
        Err(e) => {
            let mut report = wildfire_var::RunReport::new(fires.len(), templates.len());
            report.record_fatal(e.to_string());
            report.finalize();
            report.save_to_file(&args.output.join("report.json"))?;
            report.display();
            return Err(e).context("Values-at-risk run failed");
        }
    };

    let table_path = args.output.join("attributes.json");
    output.table.save_to_file(&table_path)?;
    info!(path = %table_path.display(), rows = output.table.len(), "Attribute table written");

    if args.geojson {
        let geojson_path = args.output.join("rings.geojson");
        let count = export_attributed_rings(&fires, &output.table, &geojson_path)?;
        info!(path = %geojson_path.display(), features = count, "GeoJSON written");
    }

    output.report.save_to_file(&args.output.join("report.json"))?;
    output.report.display();
    info!("{}", output.report.summary());

    Ok(())
}

/// Commande `validate`
pub fn cmd_validate(plan_path: &Path) -> Result<()> {
    let plan = PlanConfig::load(plan_path)?;
    let directives = plan.directives()?;
    let templates = plan.templates()?;

    for template in &templates {
        let names = directives
            .get(&template.alias)
            .map(|d| {
                let mut names = d.ring_attribute_names();
                if d.nearest_fields().is_some() {
                    names.push(d.nearest_name());
                    names.push(d.interior_name());
                }
                names
            })
            .unwrap_or_default();
        println!("{} ({}): {}", template.alias, template.url, names.join(", "));
    }

    for scope in plan.auth_scopes() {
        let var = config::token_var(scope);
        if std::env::var(&var).map(|v| v.is_empty()).unwrap_or(true) {
            warn!(scope = scope, var = %var, "No token set for auth scope");
        }
    }

    info!(datasets = templates.len(), "Plan is valid");
    Ok(())
}
