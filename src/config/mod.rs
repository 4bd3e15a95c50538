//! Application Configuration
//!
//! Fetch, detector, annotation and source settings stored in TOML format.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Browser-like user agent sent with every outgoing request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/62.0.3202.94 Safari/537.36";

/// Application settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Image download settings
    pub fetch: FetchConfig,
    /// Text detector settings
    pub detector: DetectorConfig,
    /// Overlay rendering settings
    pub annotation: AnnotationConfig,
    /// Where annotated images go
    pub output: OutputConfig,
    /// Instagram / BoilerLink settings
    pub sources: SourcesConfig,
}

/// Image download settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// User-Agent header
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Tesseract settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Tesseract language code (e.g., "eng")
    pub language: String,
    /// Page segmentation mode
    pub psm: Option<i32>,
    /// OCR engine mode
    pub oem: Option<i32>,
    /// Resolution hint passed to tesseract
    pub dpi: Option<i32>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            // Sparse text: posters and flyers rarely have page layout
            psm: Some(11),
            oem: Some(3),
            dpi: Some(150),
        }
    }
}

/// Overlay rendering settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// Detections below this confidence are not drawn
    pub min_confidence: f64,
    /// TrueType/OpenType font for labels; the built-in font is used when unset
    pub font_path: Option<PathBuf>,
    /// Label font size in pixels
    pub font_scale: f32,
    /// Box outline width in pixels
    pub stroke_width: u32,
    /// Box outline color (RGB)
    pub box_color: [u8; 3],
    /// Label background color (RGB)
    pub label_background: [u8; 3],
    /// Label text color (RGB)
    pub label_color: [u8; 3],
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.0,
            font_path: None,
            font_scale: 11.0,
            stroke_width: 2,
            box_color: [255, 0, 0],
            label_background: [255, 255, 255],
            label_color: [0, 0, 0],
        }
    }
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Try to open the annotated image in the desktop viewer
    pub open_viewer: bool,
    /// Directory for generated output files (system temp dir when unset)
    pub directory: Option<PathBuf>,
    /// Viewer program, called with the image path (platform default when unset)
    pub viewer: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            open_viewer: true,
            directory: None,
            viewer: None,
        }
    }
}

/// Instagram and BoilerLink settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Instagram web app id sent as `x-ig-app-id`
    pub instagram_app_id: String,
    /// Instagram API base URL
    pub instagram_base_url: String,
    /// BoilerLink base URL
    pub boilerlink_base_url: String,
    /// Window for "recent" posts, in hours
    pub recent_window_hours: i64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            instagram_app_id: "936619743392459".to_string(),
            instagram_base_url: "https://i.instagram.com".to_string(),
            boilerlink_base_url: "https://boilerlink.purdue.edu".to_string(),
            recent_window_hours: 24,
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {:?}", path))?;
    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file {:?}", path))?;
    Ok(config)
}

/// Save configuration to file
pub fn save_config(config: &AppConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
