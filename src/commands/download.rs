use std::path::PathBuf;

use anyhow::Context;
use arcgis_client::{AgolConfig, ArcGisClient, FeatureLayer, QueryParams};
use clap::Args;
use colored::Colorize;
use esri_geometry::GeoTable;
use tracing::info;

/// Output spatial reference of downloads.
const OUT_WKID: u32 = 4326;
const GEOMETRY_PRECISION: u32 = 6;

#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Hosted feature service name under the organisation account.
    #[arg(long)]
    pub service: String,

    #[arg(long, default_value_t = 0)]
    pub layer_index: u32,

    /// JSON Lines output: attributes plus a `wkt` column per row.
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Merged Esri JSON feature set, reusable as an `overwrite --source`.
    #[arg(long)]
    pub raw: Option<PathBuf>,
}

pub async fn run(args: DownloadArgs) -> anyhow::Result<()> {
    let cfg = AgolConfig::from_env().context("loading ArcGIS connection settings")?;
    let url = cfg.hosted_layer_url(&args.service, args.layer_index)?;
    let client = ArcGisClient::sign_in(cfg).await?;

    let layer = FeatureLayer::from_url(url)?;
    let params = QueryParams {
        out_sr: Some(OUT_WKID),
        geometry_precision: Some(GEOMETRY_PRECISION),
        ..Default::default()
    };
    let set = client
        .query_all(&layer, &params)
        .await
        .with_context(|| format!("querying {}", layer.url))?;

    if let Some(path) = &args.raw {
        set.write_to(path)
            .with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "raw feature set written");
    }

    let mut table = GeoTable::from_feature_set(&set)?;
    table.wkid.get_or_insert(OUT_WKID);
    info!(
        service = %args.service,
        rows = table.len(),
        fields = table.fields.len(),
        wkid = ?table.wkid,
        "layer downloaded"
    );

    if let Some(path) = &args.output {
        table
            .write_jsonl(path)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    println!(
        "{} {} rows from {}",
        "Downloaded".green().bold(),
        table.len(),
        args.service
    );
    Ok(())
}
