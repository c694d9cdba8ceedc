mod common;
use common::{memory_store, setup_repo};
use tabnotes_core::repository::{DEFAULT_FOLDER_COLOR, DEFAULT_FOLDER_NAME, STORE_VERSION};
use tabnotes_core::{DocumentRepository, KeyValueStore, OpendalStore, Settings, SettingsPatch};

#[tokio::test]
async fn test_initialize_defaults_writes_root_once() -> anyhow::Result<()> {
    let repo = DocumentRepository::new(memory_store()?);
    assert_eq!(repo.version().await?, None);

    assert!(repo.initialize_defaults().await?);
    let first = repo.store().get(None).await?;
    assert_eq!(first["version"], STORE_VERSION);
    assert_eq!(first["notes"], serde_json::json!([]));

    let folders = repo.get_folders().await?;
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0].name, DEFAULT_FOLDER_NAME);
    assert_eq!(folders[0].color, DEFAULT_FOLDER_COLOR);
    assert_eq!(folders[0].note_count, 0);
    assert_eq!(repo.get_settings().await?, Settings::default());

    assert!(!repo.initialize_defaults().await?);
    let second = repo.store().get(None).await?;
    assert_eq!(first, second);

    Ok(())
}

#[tokio::test]
async fn test_accessors_default_when_keys_absent() -> anyhow::Result<()> {
    let repo = DocumentRepository::new(memory_store()?);

    assert!(repo.get_notes().await?.is_empty());
    assert!(repo.get_folders().await?.is_empty());
    assert_eq!(repo.get_settings().await?, Settings::default());

    Ok(())
}

#[tokio::test]
async fn test_update_settings_merges_fields() -> anyhow::Result<()> {
    let repo = setup_repo().await?;

    repo.update_settings(SettingsPatch {
        dark_mode: Some(true),
        ..SettingsPatch::default()
    })
    .await?;
    let settings = repo
        .update_settings(SettingsPatch::open_tabs(vec!["note_a".to_string()]))
        .await?;

    assert!(settings.dark_mode);
    assert_eq!(settings.open_tabs, vec!["note_a".to_string()]);
    assert_eq!(repo.get_settings().await?, settings);

    Ok(())
}

#[tokio::test]
async fn test_storage_usage_reports_against_ceiling() -> anyhow::Result<()> {
    let store = memory_store()?;
    let repo = DocumentRepository::with_limits(store, 1000, 80.0);
    repo.initialize_defaults().await?;

    let usage = repo.storage_usage().await?;
    let bytes = repo.store().bytes_in_use(None).await?;
    assert_eq!(usage.bytes_used, bytes);
    assert!(usage.bytes_used > 0);
    let raw = bytes as f64 / 1000.0 * 100.0;
    let expected = (raw * 100.0).round() / 100.0;
    assert_eq!(usage.percentage_of_limit, expected);
    assert_eq!(usage.warning, raw > 80.0);

    let tiny = DocumentRepository::with_limits(memory_store()?, 10, 80.0);
    tiny.initialize_defaults().await?;
    let usage = tiny.storage_usage().await?;
    assert!(usage.warning);
    assert!(usage.message.is_some());

    Ok(())
}

#[tokio::test]
async fn test_storage_warning_uses_unrounded_percentage() -> anyhow::Result<()> {
    let repo = setup_repo().await?;
    let tabs: Vec<String> = (0..3000).map(|i| format!("note_{:08}", i)).collect();
    repo.update_settings(SettingsPatch::open_tabs(tabs)).await?;
    let bytes = repo.store().bytes_in_use(None).await?;

    // Largest capacity that still puts usage strictly above 80%.
    let capacity = (bytes * 5).div_ceil(4) - 1;
    let store = OpendalStore::new(repo.store().operator().clone(), repo.store().path());
    let bounded = DocumentRepository::with_limits(store, capacity, 80.0);

    let usage = bounded.storage_usage().await?;
    assert_eq!(usage.bytes_used, bytes);
    assert!(bytes as f64 / capacity as f64 * 100.0 > 80.0);
    assert_eq!(usage.percentage_of_limit, 80.0);
    assert!(usage.warning);
    assert!(usage.message.is_some());

    // Exactly at the threshold is not a warning.
    let exact = DocumentRepository::with_limits(
        OpendalStore::new(repo.store().operator().clone(), repo.store().path()),
        bytes * 4,
        25.0,
    );
    let usage = exact.storage_usage().await?;
    assert_eq!(usage.percentage_of_limit, 25.0);
    assert!(!usage.warning);

    Ok(())
}
