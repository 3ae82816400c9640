//! Feature layer endpoints: query, truncate and addFeatures.
//!
//! Endpoints used:
//!   * GET  {layer}/query
//!   * POST {admin layer}/truncate
//!   * POST {layer}/addFeatures

use esri_geometry::{Feature, FeatureSet};
use tracing::{debug, info, instrument};

use crate::{
    client::ArcGisClient,
    errors::{ArcGisError, Result},
    types::{AddFeaturesResponse, ItemInfo, TruncateResponse},
};

/// Addresses of one layer of a feature service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureLayer {
    /// `.../rest/services/{name}/FeatureServer/{index}`
    pub url: String,
    /// `.../rest/admin/services/{name}/FeatureServer/{index}`
    pub admin_url: String,
}

impl FeatureLayer {
    pub fn from_url(url: impl Into<String>) -> Result<Self> {
        let url = url.into().trim_end_matches('/').to_string();
        let admin_url = admin_url_of(&url)?;
        Ok(Self { url, admin_url })
    }

    /// Layer `layer_index` of the service behind a catalog item.
    pub fn from_item(item: &ItemInfo, layer_index: u32) -> Result<Self> {
        let service = item
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ArcGisError::NotFound(format!("item {} has no service url", item.id)))?
            .trim_end_matches('/');

        // Items can point straight at a layer (`.../FeatureServer/3`).
        let last = service.rsplit('/').next().unwrap_or_default();
        if last.parse::<u32>().is_ok() {
            return Self::from_url(service);
        }
        Self::from_url(format!("{service}/{layer_index}"))
    }
}

/// Maps a hosted layer URL to its admin counterpart.
pub fn admin_url_of(url: &str) -> Result<String> {
    const PUBLIC: &str = "/rest/services/";
    const ADMIN: &str = "/rest/admin/services/";

    if url.contains(ADMIN) {
        return Ok(url.to_string());
    }
    if !url.contains(PUBLIC) {
        return Err(ArcGisError::InvalidResponse(format!(
            "not a hosted service url: {url}"
        )));
    }
    Ok(url.replacen(PUBLIC, ADMIN, 1))
}

/// `query` parameters.
#[derive(Debug, Clone)]
pub struct QueryParams {
    pub where_clause: String,
    pub out_fields: String,
    pub return_geometry: bool,
    pub out_sr: Option<u32>,
    pub geometry_precision: Option<u32>,
    /// Rows per request; `None` lets the server decide.
    pub page_size: Option<u32>,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            where_clause: "1=1".into(),
            out_fields: "*".into(),
            return_geometry: true,
            out_sr: None,
            geometry_precision: None,
            page_size: None,
        }
    }
}

impl QueryParams {
    fn to_pairs(&self, offset: usize) -> Vec<(&'static str, String)> {
        let mut p = vec![
            ("where", self.where_clause.clone()),
            ("outFields", self.out_fields.clone()),
            ("returnGeometry", self.return_geometry.to_string()),
        ];
        if let Some(sr) = self.out_sr {
            p.push(("outSR", sr.to_string()));
        }
        if let Some(precision) = self.geometry_precision {
            p.push(("geometryPrecision", precision.to_string()));
        }
        if offset > 0 {
            p.push(("resultOffset", offset.to_string()));
        }
        if let Some(n) = self.page_size {
            p.push(("resultRecordCount", n.to_string()));
        }
        p
    }
}

/// Fetches offset 0, then keeps asking from the current row count while the
/// last page set `exceededTransferLimit`. An empty page ends paging too.
/// Returns the merged set (limit flag cleared) and the number of pages read.
async fn collect_query_pages<F, Fut>(mut fetch: F) -> Result<(FeatureSet, usize)>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<FeatureSet>>,
{
    let mut set = fetch(0).await?;
    let mut pages = 1usize;
    while set.exceeded_transfer_limit {
        let next = fetch(set.features.len()).await?;
        if next.features.is_empty() {
            break;
        }
        set.extend_page(next);
        pages += 1;
        debug!(pages, rows = set.features.len(), "query page");
    }
    set.exceeded_transfer_limit = false;
    Ok((set, pages))
}

impl ArcGisClient {
    /// Runs a query and follows `exceededTransferLimit` pages to the end.
    #[instrument(skip(self, layer, params), fields(layer = %layer.url, filter = %params.where_clause))]
    pub async fn query_all(&self, layer: &FeatureLayer, params: &QueryParams) -> Result<FeatureSet> {
        let url = &format!("{}/query", layer.url);
        let (set, pages) = collect_query_pages(|offset| async move {
            self.get_json::<FeatureSet>(url, &params.to_pairs(offset))
                .await
        })
        .await?;

        info!(pages, rows = set.features.len(), "query complete");
        Ok(set)
    }

    /// Deletes every row of the layer (synchronous truncate).
    /// Returns the server's success flag.
    #[instrument(skip(self, layer), fields(layer = %layer.admin_url))]
    pub async fn truncate(&self, layer: &FeatureLayer) -> Result<bool> {
        let url = format!("{}/truncate", layer.admin_url);
        let resp: TruncateResponse = self
            .post_form(
                &url,
                &[
                    ("async", "false".to_string()),
                    ("attachmentOnly", "false".to_string()),
                ],
            )
            .await?;
        Ok(resp.success.unwrap_or(false))
    }

    /// Adds features in one request (`rollbackOnFailure=true`).
    pub async fn add_features(
        &self,
        layer: &FeatureLayer,
        features: &[Feature],
    ) -> Result<AddFeaturesResponse> {
        let url = format!("{}/addFeatures", layer.url);
        let payload = serde_json::to_string(features)?;
        self.post_form(
            &url,
            &[
                ("features", payload),
                ("rollbackOnFailure", "true".to_string()),
            ],
        )
        .await
    }
}
