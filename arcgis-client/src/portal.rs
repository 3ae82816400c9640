//! Portal content: users, items, folders and item copies.
//!
//! Endpoints used:
//!   * GET  /sharing/rest/community/self
//!   * GET  /sharing/rest/content/items/:id
//!   * GET  /sharing/rest/content/users/:user
//!   * GET  /sharing/rest/content/users/:user/:folderId
//!   * POST /sharing/rest/content/users/:user/createFolder
//!   * POST /sharing/rest/content/users/:user/items/:id/copy

use tracing::{debug, instrument};

use crate::{
    client::ArcGisClient,
    errors::{ArcGisError, Result},
    types::{
        CopyItemResponse, CreateFolderResponse, Folder, FolderPage, ItemInfo, PortalUser,
        UserContent,
    },
};

const PAGE_SIZE: usize = 100;

impl ArcGisClient {
    /// The signed-in user.
    pub async fn self_user(&self) -> Result<PortalUser> {
        let url = format!("{}/community/self", self.config().sharing_url());
        self.get_json(&url, &[]).await
    }

    /// Item metadata by catalog id. Missing or inaccessible items map to
    /// [`ArcGisError::NotFound`] carrying the portal's message; other
    /// errors pass through unchanged.
    #[instrument(skip(self))]
    pub async fn get_item(&self, item_id: &str) -> Result<ItemInfo> {
        let url = format!(
            "{}/content/items/{}",
            self.config().sharing_url(),
            urlencoding::encode(item_id)
        );
        match self.get_json::<ItemInfo>(&url, &[]).await {
            Ok(item) => Ok(item),
            Err(e) if is_missing_item(&e) => {
                Err(ArcGisError::NotFound(format!("item {item_id} ({e})")))
            }
            Err(e) => Err(e),
        }
    }

    /// Folders owned by `username`.
    pub async fn user_folders(&self, username: &str) -> Result<Vec<Folder>> {
        let url = format!(
            "{}/content/users/{}",
            self.config().sharing_url(),
            urlencoding::encode(username)
        );
        let content: UserContent = self.get_json(&url, &[]).await?;
        debug!(count = content.folders.len(), "folders listed");
        Ok(content.folders)
    }

    /// Items of one folder, following `nextStart` until exhausted or
    /// `max_items` have been collected.
    #[instrument(skip(self))]
    pub async fn folder_items(
        &self,
        username: &str,
        folder_id: &str,
        max_items: usize,
    ) -> Result<Vec<ItemInfo>> {
        let url = format!(
            "{}/content/users/{}/{}",
            self.config().sharing_url(),
            urlencoding::encode(username),
            urlencoding::encode(folder_id)
        );

        let url = &url;
        collect_folder_pages(max_items, |start, num| async move {
            self.get_json::<FolderPage>(
                url,
                &[("start", start.to_string()), ("num", num.to_string())],
            )
            .await
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn create_folder(&self, username: &str, title: &str) -> Result<Folder> {
        let url = format!(
            "{}/content/users/{}/createFolder",
            self.config().sharing_url(),
            urlencoding::encode(username)
        );
        let resp: CreateFolderResponse = self
            .post_form(&url, &[("title", title.to_string())])
            .await?;
        match resp.folder {
            Some(folder) if resp.success => Ok(folder),
            _ => Err(ArcGisError::InvalidResponse(format!(
                "createFolder did not return a folder for '{title}'"
            ))),
        }
    }

    /// Copies an item (and its data) into `folder_id`; returns the new item id.
    #[instrument(skip(self))]
    pub async fn copy_item(&self, username: &str, item_id: &str, folder_id: &str) -> Result<String> {
        let url = format!(
            "{}/content/users/{}/items/{}/copy",
            self.config().sharing_url(),
            urlencoding::encode(username),
            urlencoding::encode(item_id)
        );
        let resp: CopyItemResponse = self
            .post_form(
                &url,
                &[
                    ("folder", folder_id.to_string()),
                    ("copyPrivateData", "true".to_string()),
                ],
            )
            .await?;
        match resp.item_id {
            Some(id) if resp.success => Ok(id),
            _ => Err(ArcGisError::InvalidResponse(format!(
                "copy of item {item_id} reported no new item"
            ))),
        }
    }
}

/// Drives `nextStart` paging. `fetch(start, num)` returns one page. Paging
/// ends when the server has no next page or once `max_items` are held.
async fn collect_folder_pages<F, Fut>(max_items: usize, mut fetch: F) -> Result<Vec<ItemInfo>>
where
    F: FnMut(i64, usize) -> Fut,
    Fut: Future<Output = Result<FolderPage>>,
{
    let mut items = Vec::new();
    let mut start: i64 = 1;
    while items.len() < max_items {
        let num = PAGE_SIZE.min(max_items - items.len());
        let page = fetch(start, num).await?;
        let got = page.items.len();
        items.extend(page.items);
        debug!(start, got, next = page.next_start, "folder page");

        if page.next_start <= 0 || got == 0 {
            break;
        }
        start = page.next_start;
    }
    items.truncate(max_items);
    Ok(items)
}

/// Whether an item lookup failed because the item is gone or hidden from
/// this user. Portals answer that with 400 and a fixed message; any other
/// 400 is a real request error.
fn is_missing_item(err: &ArcGisError) -> bool {
    match err {
        ArcGisError::NotFound(_) => true,
        ArcGisError::Api { code: 404, .. } => true,
        ArcGisError::Api {
            code: 400,
            message,
            details,
        } => std::iter::once(message)
            .chain(details)
            .map(|m| m.to_ascii_lowercase())
            .any(|m| m.contains("does not exist") || m.contains("inaccessible")),
        _ => false,
    }
}

/// Finds a folder by exact title.
pub fn find_folder<'a>(folders: &'a [Folder], title: &str) -> Option<&'a Folder> {
    folders.iter().find(|f| f.title == title)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn items(prefix: &str, n: usize) -> Vec<ItemInfo> {
        (0..n)
            .map(|i| ItemInfo {
                id: format!("{prefix}{i}"),
                title: format!("{prefix} {i}"),
                item_type: "Feature Service".into(),
                owner: None,
                url: None,
                owner_folder: None,
            })
            .collect()
    }

    fn api(code: i64, message: &str) -> ArcGisError {
        ArcGisError::Api {
            code,
            message: message.into(),
            details: vec![],
        }
    }

    #[tokio::test]
    async fn folder_paging_follows_next_start_until_exhausted() {
        let calls = Mutex::new(Vec::new());
        let got = collect_folder_pages(1000, |start, num| {
            calls.lock().unwrap().push((start, num));
            async move {
                Ok::<_, ArcGisError>(match start {
                    1 => FolderPage {
                        items: items("a", 100),
                        next_start: 101,
                    },
                    101 => FolderPage {
                        items: items("b", 30),
                        next_start: -1,
                    },
                    other => panic!("unexpected start {other}"),
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(got.len(), 130);
        assert_eq!(got[100].id, "b0");
        assert_eq!(*calls.lock().unwrap(), vec![(1, 100), (101, 100)]);
    }

    #[tokio::test]
    async fn folder_paging_stops_at_max_items() {
        let calls = Mutex::new(Vec::new());
        let got = collect_folder_pages(150, |start, num| {
            calls.lock().unwrap().push((start, num));
            async move {
                Ok::<_, ArcGisError>(FolderPage {
                    items: items("x", num),
                    next_start: start + num as i64,
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(got.len(), 150);
        assert_eq!(*calls.lock().unwrap(), vec![(1, 100), (101, 50)]);
    }

    #[tokio::test]
    async fn folder_paging_stops_on_empty_page_and_propagates_errors() {
        let got = collect_folder_pages(1000, |_, _| async {
            Ok::<_, ArcGisError>(FolderPage {
                items: vec![],
                next_start: 5,
            })
        })
        .await
        .unwrap();
        assert!(got.is_empty());

        let err = collect_folder_pages(1000, |_, _| async {
            Err::<FolderPage, _>(ArcGisError::Timeout)
        })
            .await
            .unwrap_err();
        assert!(matches!(err, ArcGisError::Timeout));
    }

    #[test]
    fn only_missing_item_errors_read_as_not_found() {
        assert!(is_missing_item(&api(
            400,
            "Item does not exist or is inaccessible."
        )));
        assert!(is_missing_item(&api(404, "Not Found")));
        assert!(is_missing_item(&ArcGisError::NotFound("x".into())));

        assert!(!is_missing_item(&api(400, "Invalid token.")));
        assert!(!is_missing_item(&api(400, "Unable to generate token.")));
        assert!(!is_missing_item(&ArcGisError::Forbidden));
        assert!(is_missing_item(&ArcGisError::Api {
            code: 400,
            message: "Unable to complete operation.".into(),
            details: vec!["Item 'abc' does not exist or is inaccessible.".into()],
        }));
    }

    #[test]
    fn find_folder_matches_exact_title() {
        let folders = vec![
            Folder {
                id: "a1".into(),
                title: "Survey-5NP _test".into(),
            },
            Folder {
                id: "b2".into(),
                title: "Survey-5NP _test Copy".into(),
            },
        ];
        assert_eq!(find_folder(&folders, "Survey-5NP _test").unwrap().id, "a1");
        assert_eq!(find_folder(&folders, "Survey-5NP _test Copy").unwrap().id, "b2");
        assert!(find_folder(&folders, "survey-5np _test").is_none());
    }
}
