use aquarent_store::{FileStore, KeyValueStore, StoreError};
use tempfile::tempdir;

fn file_names(dir: &std::path::Path) -> std::io::Result<Vec<String>> {
    let mut names = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|entry| entry.file_name().to_string_lossy().into_owned()))
        .collect::<Result<Vec<_>, _>>()?;
    names.sort();
    Ok(names)
}

#[tokio::test]
async fn values_survive_reopen() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("session").join("store.json");

    let store = FileStore::open(&path).await?;
    store
        .set_many(&[("accessToken", "access-1"), ("refreshToken", "refresh-1")])
        .await?;
    store.set("userProfile", r#"{"id":"u-1"}"#).await?;
    drop(store);

    let reopened = FileStore::open(&path).await?;
    assert_eq!(
        reopened
            .get_many(&["accessToken", "refreshToken", "userProfile"])
            .await?,
        vec![
            Some("access-1".to_string()),
            Some("refresh-1".to_string()),
            Some(r#"{"id":"u-1"}"#.to_string()),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn remove_many_clears_file_entries() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("store.json");

    let store = FileStore::open(&path).await?;
    store
        .set_many(&[("accessToken", "a"), ("refreshToken", "r"), ("theme", "dark")])
        .await?;
    store.remove_many(&["accessToken", "refreshToken"]).await?;
    store.remove_many(&["accessToken", "refreshToken"]).await?;

    let reopened = FileStore::open(&path).await?;
    assert_eq!(reopened.get("accessToken").await?, None);
    assert_eq!(reopened.get("theme").await?, Some("dark".to_string()));
    assert_eq!(file_names(dir.path())?, vec!["store.json".to_string()]);
    Ok(())
}

#[tokio::test]
async fn missing_and_empty_files_open_empty() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let missing = FileStore::open(dir.path().join("absent.json")).await?;
    assert_eq!(missing.get("accessToken").await?, None);

    let empty_path = dir.path().join("empty.json");
    std::fs::write(&empty_path, "  \n")?;
    let empty = FileStore::open(&empty_path).await?;
    assert_eq!(empty.get("accessToken").await?, None);
    Ok(())
}

#[tokio::test]
async fn corrupt_file_is_reported() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("store.json");
    std::fs::write(&path, "{not json")?;
    let err = FileStore::open(&path).await.expect_err("corrupt file");
    assert!(matches!(err, StoreError::Corrupt(_)));
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn store_file_is_private() -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir()?;
    let path = dir.path().join("store.json");
    let store = FileStore::open(&path).await?;
    store.set("accessToken", "secret").await?;
    store.set("refreshToken", "secret-2").await?;
    let mode = std::fs::metadata(&path)?.permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    assert_eq!(file_names(dir.path())?, vec!["store.json".to_string()]);
    Ok(())
}

#[cfg(unix)]
#[tokio::test]
async fn failed_write_leaves_no_temp_file() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("store.json");
    let store = FileStore::open(&path).await?;
    std::fs::create_dir(&path)?;

    let err = store
        .set("accessToken", "secret")
        .await
        .expect_err("rename onto a directory");
    assert!(matches!(err, StoreError::Io(_)));
    assert_eq!(store.get("accessToken").await?, None);
    assert_eq!(file_names(dir.path())?, vec!["store.json".to_string()]);
    Ok(())
}

#[tokio::test]
async fn two_stores_on_one_path_do_not_clobber_temp_files() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("store.json");
    let first = FileStore::open(&path).await?;
    let second = FileStore::open(&path).await?;

    let (a, b) = tokio::join!(
        first.set("accessToken", "from-first"),
        second.set("refreshToken", "from-second"),
    );
    a?;
    b?;

    let reopened = FileStore::open(&path).await?;
    let access = reopened.get("accessToken").await?;
    let refresh = reopened.get("refreshToken").await?;
    assert!(access.is_some() || refresh.is_some());
    assert_eq!(file_names(dir.path())?, vec!["store.json".to_string()]);
    Ok(())
}
