mod common;
use base64::{engine::general_purpose, Engine as _};
use common::{memory_store, setup_repo, SlowStore};
use std::sync::Arc;
use std::time::Duration;
use tabnotes_core::settings::{
    remove_wallpaper, set_color_background, set_custom_wallpaper, set_dark_mode,
    set_wallpaper_opacity, MAX_WALLPAPER_BYTES,
};
use tabnotes_core::{DocumentRepository, Error, Wallpaper, WallpaperKind};

fn png_data_uri(len: usize) -> String {
    format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(vec![7u8; len])
    )
}

#[tokio::test]
async fn test_dark_mode_is_persisted() -> anyhow::Result<()> {
    let repo = setup_repo().await?;
    assert!(!repo.get_settings().await?.dark_mode);

    set_dark_mode(&repo, true).await?;
    let settings = repo.get_settings().await?;
    assert!(settings.dark_mode);
    assert_eq!(settings.wallpaper, Wallpaper::default());

    Ok(())
}

#[tokio::test]
async fn test_custom_wallpaper_lifecycle() -> anyhow::Result<()> {
    let repo = setup_repo().await?;
    let uri = png_data_uri(64);

    let wallpaper = set_custom_wallpaper(&repo, &uri).await?;
    assert_eq!(wallpaper.kind, WallpaperKind::Custom);
    assert_eq!(repo.get_settings().await?.wallpaper.value, uri);

    let dimmed = set_wallpaper_opacity(&repo, 0.75).await?;
    assert_eq!(dimmed.kind, WallpaperKind::Custom);
    assert_eq!(dimmed.opacity, 0.75);

    assert_eq!(set_wallpaper_opacity(&repo, 4.0).await?.opacity, 1.0);
    assert_eq!(set_wallpaper_opacity(&repo, -1.0).await?.opacity, 0.0);
    assert!(matches!(
        set_wallpaper_opacity(&repo, f64::NAN).await,
        Err(Error::Validation(_))
    ));

    let reset = remove_wallpaper(&repo).await?;
    assert_eq!(reset, Wallpaper::default());
    assert_eq!(repo.get_settings().await?.wallpaper, Wallpaper::default());

    Ok(())
}

#[tokio::test]
async fn test_custom_wallpaper_rejects_bad_input() -> anyhow::Result<()> {
    let repo = setup_repo().await?;

    let too_big = png_data_uri(MAX_WALLPAPER_BYTES + 1);
    assert!(matches!(
        set_custom_wallpaper(&repo, &too_big).await,
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        set_custom_wallpaper(&repo, "data:text/plain;base64,aGk=").await,
        Err(Error::Validation(_))
    ));
    assert!(matches!(
        set_custom_wallpaper(&repo, "https://example.com/a.png").await,
        Err(Error::Validation(_))
    ));
    assert_eq!(repo.get_settings().await?.wallpaper, Wallpaper::default());

    Ok(())
}

#[tokio::test]
async fn test_color_background() -> anyhow::Result<()> {
    let repo = setup_repo().await?;

    let wallpaper = set_color_background(&repo, "#202020").await?;
    assert_eq!(wallpaper.kind, WallpaperKind::Color);
    assert_eq!(wallpaper.opacity, 1.0);
    assert_eq!(repo.get_settings().await?.wallpaper, wallpaper);

    assert!(set_color_background(&repo, "grey").await.is_err());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_settings_writers_do_not_lose_updates() -> anyhow::Result<()> {
    let store = SlowStore::new(memory_store()?, Duration::from_millis(50));
    let repo = Arc::new(DocumentRepository::new(store));
    repo.initialize_defaults().await?;

    let opacity_repo = Arc::clone(&repo);
    let opacity = tokio::spawn(async move { set_wallpaper_opacity(&opacity_repo, 0.5).await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    let custom_repo = Arc::clone(&repo);
    let uri = png_data_uri(3);
    let custom = tokio::spawn(async move { set_custom_wallpaper(&custom_repo, &uri).await });

    opacity.await??;
    custom.await??;

    let wallpaper = repo.get_settings().await?.wallpaper;
    assert_eq!(wallpaper.kind, WallpaperKind::Custom);
    assert_eq!(wallpaper.value, png_data_uri(3));

    Ok(())
}
