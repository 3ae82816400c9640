//! Wire types for the REST responses this client reads.

use std::fmt;

use serde::{Deserialize, Serialize};

/// `{"error": {...}}` envelope. ArcGIS sends it with HTTP 200.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Vec<String>,
}

/// `generateToken` response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    /// Expiry as epoch milliseconds.
    #[serde(default)]
    pub expires: Option<i64>,
    #[serde(default)]
    pub ssl: Option<bool>,
}

/// `community/self`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalUser {
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub org_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: String,
    pub title: String,
}

/// Item metadata (`content/items/{id}` and folder listings).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemInfo {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default)]
    pub owner: Option<String>,
    /// Service URL for service-backed items (feature services, map services).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub owner_folder: Option<String>,
}

/// `content/users/{user}` - root items plus folder list.
#[derive(Debug, Clone, Deserialize)]
pub struct UserContent {
    #[serde(default)]
    pub folders: Vec<Folder>,
    #[serde(default)]
    pub items: Vec<ItemInfo>,
}

/// `content/users/{user}/{folder}` page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderPage {
    #[serde(default)]
    pub items: Vec<ItemInfo>,
    /// `-1` when there are no more pages.
    #[serde(default = "no_next_page")]
    pub next_start: i64,
}

fn no_next_page() -> i64 {
    -1
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateFolderResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub folder: Option<Folder>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyItemResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub item_id: Option<String>,
}

/// `truncate` response (synchronous mode).
#[derive(Debug, Clone, Deserialize)]
pub struct TruncateResponse {
    #[serde(default)]
    pub success: Option<bool>,
}

/// `addFeatures` response. A missing list is distinct from an empty one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFeaturesResponse {
    #[serde(default)]
    pub add_results: Option<Vec<EditResult>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditResult {
    #[serde(default)]
    pub object_id: Option<i64>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub error: Option<EditError>,
}

/// Per-feature edit error. Services send `{code, description}`; some
/// proxies flatten it to a string.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EditError {
    Detailed {
        #[serde(default)]
        code: Option<i64>,
        #[serde(default)]
        description: Option<String>,
    },
    Text(String),
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditError::Text(s) => f.write_str(s),
            EditError::Detailed {
                code: Some(code),
                description: Some(d),
            } => write!(f, "{code}: {d}"),
            EditError::Detailed {
                code: None,
                description: Some(d),
            } => f.write_str(d),
            EditError::Detailed {
                code: Some(code),
                description: None,
            } => write!(f, "error code {code}"),
            EditError::Detailed {
                code: None,
                description: None,
            } => f.write_str("Unknown error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn add_results_distinguish_missing_and_empty() {
        let missing: AddFeaturesResponse = serde_json::from_value(json!({})).unwrap();
        assert!(missing.add_results.is_none());

        let empty: AddFeaturesResponse =
            serde_json::from_value(json!({ "addResults": [] })).unwrap();
        assert_eq!(empty.add_results.map(|v| v.len()), Some(0));
    }

    #[test]
    fn edit_error_renders_both_shapes() {
        let r: AddFeaturesResponse = serde_json::from_value(json!({
            "addResults": [{
                "objectId": -1,
                "success": false,
                "error": { "code": 1000, "description": "Invalid ring" }
            }]
        }))
        .unwrap();
        let err = r.add_results.unwrap()[0].error.clone().unwrap();
        assert_eq!(err.to_string(), "1000: Invalid ring");

        let text: EditError = serde_json::from_value(json!("topology error")).unwrap();
        assert_eq!(text.to_string(), "topology error");
    }

    #[test]
    fn folder_page_defaults_to_last_page() {
        let page: FolderPage = serde_json::from_value(json!({ "items": [] })).unwrap();
        assert_eq!(page.next_start, -1);
    }
}
