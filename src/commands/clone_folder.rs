use arcgis_client::{AgolConfig, ArcGisClient, ArcGisError, Folder, ItemInfo, find_folder};
use clap::Args;
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Upper bound on items listed from the source folder.
const MAX_ITEMS: usize = 1000;

#[derive(Debug, Args)]
pub struct CloneFolderArgs {
    /// Title of the folder to copy from.
    #[arg(long)]
    pub source: String,

    /// Title of the folder to copy into; created when missing.
    #[arg(long)]
    pub dest: String,
}

/// Folder operations of one portal user.
trait FolderContent {
    fn create_folder(&self, title: &str)
    -> impl Future<Output = Result<Folder, ArcGisError>> + Send;

    fn copy_item(
        &self,
        item_id: &str,
        folder_id: &str,
    ) -> impl Future<Output = Result<String, ArcGisError>> + Send;
}

struct UserContent<'a> {
    client: &'a ArcGisClient,
    username: String,
}

impl FolderContent for UserContent<'_> {
    async fn create_folder(&self, title: &str) -> Result<Folder, ArcGisError> {
        self.client.create_folder(&self.username, title).await
    }

    async fn copy_item(&self, item_id: &str, folder_id: &str) -> Result<String, ArcGisError> {
        self.client
            .copy_item(&self.username, item_id, folder_id)
            .await
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct CloneTally {
    cloned: usize,
    failed: usize,
    cancelled: bool,
}

pub async fn run(args: CloneFolderArgs, cancel: &CancellationToken) -> anyhow::Result<()> {
    let cfg = AgolConfig::from_env()?;
    let client = ArcGisClient::sign_in(cfg).await?;

    let user = client.self_user().await?;
    let folders = client.user_folders(&user.username).await?;
    let content = UserContent {
        client: &client,
        username: user.username.clone(),
    };

    let source = source_folder(&folders, &args.source)?;
    let dest = destination_folder(&content, &folders, &args.dest).await?;

    let items = client
        .folder_items(&user.username, &source.id, MAX_ITEMS)
        .await?;
    info!(count = items.len(), from = %source.title, "items to clone");

    let tally = copy_items(&content, &items, &dest, cancel).await;

    println!(
        "{} {} item(s) from '{}' to '{}'",
        "Cloned".green().bold(),
        tally.cloned,
        source.title,
        dest.title
    );
    if tally.failed > 0 {
        println!("{}", format!("{} item(s) could not be cloned", tally.failed).red());
    }
    Ok(())
}

fn source_folder(folders: &[Folder], title: &str) -> Result<Folder, ArcGisError> {
    find_folder(folders, title)
        .cloned()
        .ok_or_else(|| ArcGisError::NotFound(format!("folder '{title}'")))
}

/// Existing folder titled `title`, or a freshly created one.
async fn destination_folder<C: FolderContent>(
    content: &C,
    folders: &[Folder],
    title: &str,
) -> Result<Folder, ArcGisError> {
    if let Some(f) = find_folder(folders, title) {
        info!(folder = %f.title, id = %f.id, "destination folder exists");
        return Ok(f.clone());
    }
    let f = content.create_folder(title).await?;
    info!(folder = %f.title, id = %f.id, "destination folder created");
    Ok(f)
}

/// Copies items one by one. A failed copy is logged and counted; the rest
/// still run. Cancellation is checked before each copy.
async fn copy_items<C: FolderContent>(
    content: &C,
    items: &[ItemInfo],
    dest: &Folder,
    cancel: &CancellationToken,
) -> CloneTally {
    let mut tally = CloneTally::default();
    for item in items {
        if cancel.is_cancelled() {
            warn!(
                cloned = tally.cloned,
                remaining = items.len() - tally.cloned - tally.failed,
                "cancelled"
            );
            tally.cancelled = true;
            break;
        }
        match content.copy_item(&item.id, &dest.id).await {
            Ok(new_id) => {
                tally.cloned += 1;
                info!(item = %item.title, %new_id, "cloned");
            }
            Err(e) => {
                tally.failed += 1;
                error!(item = %item.title, id = %item.id, error = %e, "clone failed");
            }
        }
    }
    tally
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeContent {
        created: Mutex<Vec<String>>,
        copied: Mutex<Vec<(String, String)>>,
        refuse: Vec<&'static str>,
        cancel_after: Option<(usize, CancellationToken)>,
    }

    impl FolderContent for FakeContent {
        async fn create_folder(&self, title: &str) -> Result<Folder, ArcGisError> {
            self.created.lock().unwrap().push(title.to_string());
            Ok(Folder {
                id: "new-folder".into(),
                title: title.to_string(),
            })
        }

        async fn copy_item(&self, item_id: &str, folder_id: &str) -> Result<String, ArcGisError> {
            let mut copied = self.copied.lock().unwrap();
            copied.push((item_id.to_string(), folder_id.to_string()));
            if let Some((n, token)) = &self.cancel_after {
                if copied.len() == *n {
                    token.cancel();
                }
            }
            if self.refuse.iter().any(|r| *r == item_id) {
                return Err(ArcGisError::Api {
                    code: 400,
                    message: "Unable to copy item.".into(),
                    details: vec![],
                });
            }
            Ok(format!("{item_id}-copy"))
        }
    }

    fn folder(id: &str, title: &str) -> Folder {
        Folder {
            id: id.into(),
            title: title.into(),
        }
    }

    fn item(id: &str) -> ItemInfo {
        ItemInfo {
            id: id.into(),
            title: format!("Item {id}"),
            item_type: "Feature Service".into(),
            owner: None,
            url: None,
            owner_folder: None,
        }
    }

    #[test]
    fn missing_source_folder_is_not_found() {
        let folders = vec![folder("f1", "Survey")];
        assert_eq!(source_folder(&folders, "Survey").unwrap().id, "f1");
        let err = source_folder(&folders, "Survey Copy").unwrap_err();
        assert!(matches!(err, ArcGisError::NotFound(ref m) if m.contains("Survey Copy")));
    }

    #[tokio::test]
    async fn existing_destination_is_reused() {
        let content = FakeContent::default();
        let folders = vec![folder("f1", "Survey"), folder("f2", "Survey Copy")];

        let dest = destination_folder(&content, &folders, "Survey Copy")
            .await
            .unwrap();
        assert_eq!(dest.id, "f2");
        assert!(content.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_destination_is_created() {
        let content = FakeContent::default();
        let folders = vec![folder("f1", "Survey")];

        let dest = destination_folder(&content, &folders, "Survey Copy")
            .await
            .unwrap();
        assert_eq!(dest.id, "new-folder");
        assert_eq!(*content.created.lock().unwrap(), vec!["Survey Copy"]);
    }

    #[tokio::test]
    async fn failed_copy_is_counted_and_the_rest_continue() {
        let content = FakeContent {
            refuse: vec!["b"],
            ..Default::default()
        };
        let items = vec![item("a"), item("b"), item("c")];
        let dest = folder("f2", "Survey Copy");

        let tally = copy_items(&content, &items, &dest, &CancellationToken::new()).await;

        assert_eq!(
            tally,
            CloneTally {
                cloned: 2,
                failed: 1,
                cancelled: false,
            }
        );
        let copied = content.copied.lock().unwrap();
        assert_eq!(copied.len(), 3);
        assert!(copied.iter().all(|(_, to)| to == "f2"));
    }

    #[tokio::test]
    async fn cancellation_stops_before_the_next_copy() {
        let token = CancellationToken::new();
        let content = FakeContent {
            cancel_after: Some((2, token.clone())),
            ..Default::default()
        };
        let items = vec![item("a"), item("b"), item("c"), item("d")];

        let tally = copy_items(&content, &items, &folder("f2", "Dest"), &token).await;

        assert_eq!(tally.cloned, 2);
        assert!(tally.cancelled);
        assert_eq!(content.copied.lock().unwrap().len(), 2);
    }
}
