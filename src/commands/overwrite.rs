use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use arcgis_client::{AgolConfig, ArcGisClient};
use clap::Args;
use colored::Colorize;
use layer_overwrite::{
    ArcGisLayerResolver, DouglasPeucker, FeatureSetFile, LayerOverwriteUploader,
    OverwriteRequest, RowFilter, UploadPolicy, UploadReport,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Debug, Args)]
pub struct OverwriteArgs {
    /// Catalog item id of the hosted feature layer to overwrite.
    #[arg(long)]
    pub item_id: String,

    /// Esri JSON feature set to upload (e.g. the `--raw` output of `download`).
    #[arg(long)]
    pub source: PathBuf,

    /// Row filter evaluated against the source attributes.
    #[arg(long = "where", default_value = "1=1")]
    pub where_clause: String,

    /// Attribute identifying a record in logs and in the failure list.
    #[arg(long)]
    pub unique_id_field: String,

    /// Add attempts per record; overrides UPLOAD_MAX_ATTEMPTS.
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Simplification tolerance in the source's own units; overrides UPLOAD_SIMPLIFY_TOLERANCE.
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Pause after each uploaded record; overrides UPLOAD_PAUSE_MS.
    #[arg(long)]
    pub pause_ms: Option<u64>,

    /// Layer of the feature service, when the item is a service.
    #[arg(long, default_value_t = 0)]
    pub layer_index: u32,
}

impl OverwriteArgs {
    fn policy(&self) -> anyhow::Result<UploadPolicy> {
        let mut policy = UploadPolicy::from_env()?;
        if let Some(n) = self.max_attempts {
            policy.max_attempts = n;
        }
        if let Some(t) = self.tolerance {
            policy.simplify_tolerance = t;
        }
        if let Some(ms) = self.pause_ms {
            policy.pause = Duration::from_millis(ms);
        }
        policy.validate()?;
        Ok(policy)
    }
}

pub async fn run(args: OverwriteArgs, cancel: &CancellationToken) -> anyhow::Result<()> {
    // Everything local is checked before the first remote call.
    let filter = RowFilter::parse(&args.where_clause)
        .with_context(|| format!("invalid --where expression: {}", args.where_clause))?;
    let policy = args.policy()?;
    let source = FeatureSetFile::open(&args.source)?;

    let cfg = AgolConfig::from_env().context("loading ArcGIS connection settings")?;
    let client = ArcGisClient::sign_in(cfg).await?;

    info!(
        item_id = %args.item_id,
        source = %args.source.display(),
        max_attempts = policy.max_attempts,
        tolerance = policy.simplify_tolerance,
        pause_ms = policy.pause.as_millis() as u64,
        "starting overwrite"
    );

    let uploader = LayerOverwriteUploader::new(
        ArcGisLayerResolver::new(&client, args.layer_index),
        DouglasPeucker,
        policy,
    );
    let request = OverwriteRequest {
        item_id: args.item_id,
        filter,
        unique_id_field: args.unique_id_field,
    };

    let report = uploader.run(&request, &source, cancel).await?;
    print_report(&report);
    Ok(())
}

fn print_report(report: &UploadReport) {
    println!(
        "{} uploaded, {} after simplification, {} failed, {} skipped (no geometry)",
        report.succeeded, report.succeeded_after_simplification, report.failed, report.skipped
    );
    if report.is_clean() {
        println!("{}", "All records uploaded successfully.".green().bold());
    } else {
        println!("{}", "Records that failed every attempt:".red().bold());
        for id in &report.failed_ids {
            println!("  {id}");
        }
    }
    if report.cancelled {
        println!("{}", "Run cancelled before all rows were processed.".yellow());
    }
}
