use crate::error::{Error, Result};
use crate::repository::DocumentRepository;
use crate::storage::KeyValueStore;
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WALLPAPER: &str = "default-wallpaper.jpg";
pub const DEFAULT_WALLPAPER_OPACITY: f64 = 0.3;

/// Largest decoded custom wallpaper accepted (5 MiB).
pub const MAX_WALLPAPER_BYTES: usize = 5 * 1024 * 1024;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WallpaperKind {
    Default,
    Custom,
    Color,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Wallpaper {
    #[serde(rename = "type")]
    pub kind: WallpaperKind,
    pub value: String,
    pub opacity: f64,
}

impl Default for Wallpaper {
    fn default() -> Self {
        Self {
            kind: WallpaperKind::Default,
            value: DEFAULT_WALLPAPER.to_string(),
            opacity: DEFAULT_WALLPAPER_OPACITY,
        }
    }
}

/// Process-wide settings record.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub dark_mode: bool,
    pub wallpaper: Wallpaper,
    pub default_folder_id: Option<String>,
    pub open_tabs: Vec<String>,
}

/// Shallow, field-level settings update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub dark_mode: Option<bool>,
    pub wallpaper: Option<Wallpaper>,
    pub default_folder_id: Option<Option<String>>,
    pub open_tabs: Option<Vec<String>>,
}

impl SettingsPatch {
    pub fn open_tabs(tabs: Vec<String>) -> Self {
        Self {
            open_tabs: Some(tabs),
            ..Self::default()
        }
    }

    pub fn wallpaper(wallpaper: Wallpaper) -> Self {
        Self {
            wallpaper: Some(wallpaper),
            ..Self::default()
        }
    }

    pub(crate) fn apply(self, settings: &mut Settings) {
        if let Some(dark_mode) = self.dark_mode {
            settings.dark_mode = dark_mode;
        }
        if let Some(wallpaper) = self.wallpaper {
            settings.wallpaper = wallpaper;
        }
        if let Some(default_folder_id) = self.default_folder_id {
            settings.default_folder_id = default_folder_id;
        }
        if let Some(open_tabs) = self.open_tabs {
            settings.open_tabs = open_tabs;
        }
    }
}

pub async fn set_dark_mode<S: KeyValueStore>(
    repo: &DocumentRepository<S>,
    enabled: bool,
) -> Result<Settings> {
    repo.update_settings(SettingsPatch {
        dark_mode: Some(enabled),
        ..SettingsPatch::default()
    })
    .await
}

/// Stores an already-compressed image as the wallpaper.
///
/// `data_uri` must be a base64 `data:image/*` URI no larger than
/// [`MAX_WALLPAPER_BYTES`] once decoded.
pub async fn set_custom_wallpaper<S: KeyValueStore>(
    repo: &DocumentRepository<S>,
    data_uri: &str,
) -> Result<Wallpaper> {
    let size = decoded_image_size(data_uri)?;
    if size > MAX_WALLPAPER_BYTES {
        return Err(Error::Validation(format!(
            "wallpaper is {} bytes, limit is {}",
            size, MAX_WALLPAPER_BYTES
        )));
    }

    let wallpaper = Wallpaper {
        kind: WallpaperKind::Custom,
        value: data_uri.to_string(),
        opacity: DEFAULT_WALLPAPER_OPACITY,
    };
    repo.update_settings(SettingsPatch::wallpaper(wallpaper.clone()))
        .await?;
    log::info!("custom wallpaper stored ({} bytes)", size);
    Ok(wallpaper)
}

pub async fn set_color_background<S: KeyValueStore>(
    repo: &DocumentRepository<S>,
    color: &str,
) -> Result<Wallpaper> {
    crate::folder::validate_color(color)?;
    let wallpaper = Wallpaper {
        kind: WallpaperKind::Color,
        value: color.to_string(),
        opacity: 1.0,
    };
    repo.update_settings(SettingsPatch::wallpaper(wallpaper.clone()))
        .await?;
    Ok(wallpaper)
}

pub async fn remove_wallpaper<S: KeyValueStore>(repo: &DocumentRepository<S>) -> Result<Wallpaper> {
    let wallpaper = Wallpaper::default();
    repo.update_settings(SettingsPatch::wallpaper(wallpaper.clone()))
        .await?;
    Ok(wallpaper)
}

/// Sets the wallpaper opacity, clamped to `[0, 1]`.
pub async fn set_wallpaper_opacity<S: KeyValueStore>(
    repo: &DocumentRepository<S>,
    opacity: f64,
) -> Result<Wallpaper> {
    if opacity.is_nan() {
        return Err(Error::Validation("opacity is not a number".to_string()));
    }
    let settings = repo
        .modify_settings(|settings| {
            settings.wallpaper.opacity = opacity.clamp(0.0, 1.0);
            Ok(())
        })
        .await?;
    Ok(settings.wallpaper)
}

fn decoded_image_size(data_uri: &str) -> Result<usize> {
    let rest = data_uri
        .strip_prefix("data:")
        .ok_or_else(|| Error::Validation("wallpaper must be a data URI".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::Validation("data URI has no payload".to_string()))?;
    let Some(mime) = header.strip_suffix(";base64") else {
        return Err(Error::Validation(
            "wallpaper data URI must be base64 encoded".to_string(),
        ));
    };
    if !mime.starts_with("image/") {
        return Err(Error::Validation(format!(
            "invalid file type {}, expected an image",
            mime
        )));
    }
    let bytes = general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| Error::Validation(format!("invalid base64 payload: {}", e)))?;
    Ok(bytes.len())
}
