//! Port implementations backed by `arcgis-client` and `esri-geometry`.

use arcgis_client::{AddFeaturesResponse, ArcGisClient, ArcGisError, FeatureLayer};
use esri_geometry::EsriGeometry;
use tracing::{debug, instrument};

use crate::{
    errors::{Result, UploadError},
    ports::{AddResult, AddResultEntry, GeometrySimplifier, LayerResolver, RemoteLayer},
    record::Record,
};

/// Resolves catalog item ids to hosted feature layers through the portal.
#[derive(Debug, Clone, Copy)]
pub struct ArcGisLayerResolver<'a> {
    client: &'a ArcGisClient,
    layer_index: u32,
}

impl<'a> ArcGisLayerResolver<'a> {
    pub fn new(client: &'a ArcGisClient, layer_index: u32) -> Self {
        Self {
            client,
            layer_index,
        }
    }
}

impl<'a> LayerResolver for ArcGisLayerResolver<'a> {
    type Layer = ArcGisRemoteLayer<'a>;

    #[instrument(skip(self), fields(layer_index = self.layer_index))]
    async fn resolve_layer(&self, catalog_id: &str) -> Result<ArcGisRemoteLayer<'a>> {
        let item = self.client.get_item(catalog_id).await.map_err(not_found)?;
        let layer = FeatureLayer::from_item(&item, self.layer_index).map_err(not_found)?;
        debug!(url = %layer.url, title = %item.title, "layer resolved");
        Ok(ArcGisRemoteLayer {
            client: self.client,
            layer,
            title: item.title,
        })
    }
}

fn not_found(e: ArcGisError) -> UploadError {
    match e {
        ArcGisError::NotFound(what) => UploadError::NotFound(what),
        other => other.into(),
    }
}

#[derive(Debug, Clone)]
pub struct ArcGisRemoteLayer<'a> {
    client: &'a ArcGisClient,
    layer: FeatureLayer,
    title: String,
}

impl RemoteLayer for ArcGisRemoteLayer<'_> {
    fn describe(&self) -> String {
        format!("{} ({})", self.title, self.layer.url)
    }

    async fn truncate(&self) -> Result<bool> {
        Ok(self.client.truncate(&self.layer).await?)
    }

    async fn add_feature(&self, record: &Record) -> Result<AddResult> {
        let resp = self
            .client
            .add_features(&self.layer, &[record.to_feature()])
            .await?;
        Ok(resp.into())
    }
}

impl From<AddFeaturesResponse> for AddResult {
    fn from(resp: AddFeaturesResponse) -> Self {
        AddResult {
            add_results: resp.add_results.map(|results| {
                results
                    .into_iter()
                    .map(|r| AddResultEntry {
                        success: r.success,
                        error: r.error.map(|e| e.to_string()),
                    })
                    .collect()
            }),
        }
    }
}

/// Douglas–Peucker per ring and path, in the geometry's own units.
#[derive(Debug, Clone, Copy, Default)]
pub struct DouglasPeucker;

impl GeometrySimplifier for DouglasPeucker {
    fn simplify(&self, geometry: &EsriGeometry, tolerance: f64) -> Result<EsriGeometry> {
        Ok(esri_geometry::simplify(geometry, tolerance)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn add_features_response_maps_to_add_result() {
        let resp: AddFeaturesResponse = serde_json::from_value(json!({
            "addResults": [{
                "objectId": -1,
                "success": false,
                "error": { "code": 1000, "description": "Invalid ring" }
            }]
        }))
        .unwrap();
        let result = AddResult::from(resp);
        assert_eq!(result.classify(), Err("1000: Invalid ring".to_string()));

        let missing = AddResult::from(AddFeaturesResponse::default());
        assert_eq!(missing.classify(), Err("Unknown error".to_string()));
    }

    #[test]
    fn douglas_peucker_rejects_negative_tolerance() {
        let g = EsriGeometry::from_value(json!({ "paths": [[[0, 0], [1, 1]]] })).unwrap();
        assert!(matches!(
            DouglasPeucker.simplify(&g, -1.0),
            Err(UploadError::Geometry(_))
        ));
        assert_eq!(DouglasPeucker.simplify(&g, 0.0).unwrap(), g);
    }
}
