//! Output parameters for a merge job.
//!
//! [`MergeConfig`] starts from defaults and is changed through partial
//! updates ([`MergeConfigUpdate`]): only the fields an update carries are
//! overwritten. Nothing is validated while the user is editing; the executor
//! calls [`MergeConfig::validate`] once, right before submitting a job.

use crate::error::MergeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default name for the merged document.
pub const DEFAULT_OUTPUT_FILE_NAME: &str = "merged.pdf";

/// Output configuration for a merge job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Target page size. Default: [`PageSize::Auto`] (keep each page's own size).
    pub page_size: PageSize,
    /// Target orientation. Default: [`Orientation::KeepOriginal`].
    pub orientation: Orientation,
    /// File name of the merged document. Default: `merged.pdf`.
    pub output_file_name: String,
    /// Carry source-document bookmarks into the output. Default: false.
    pub include_bookmarks: bool,
    /// Document-info fields written into the output, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocumentInfo>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            page_size: PageSize::default(),
            orientation: Orientation::default(),
            output_file_name: DEFAULT_OUTPUT_FILE_NAME.to_string(),
            include_bookmarks: false,
            metadata: None,
        }
    }
}

impl MergeConfig {
    /// Overwrite only the fields `partial` carries.
    pub fn update(&mut self, partial: MergeConfigUpdate) {
        let MergeConfigUpdate {
            page_size,
            orientation,
            output_file_name,
            include_bookmarks,
            metadata,
        } = partial;

        if let Some(v) = page_size {
            self.page_size = v;
        }
        if let Some(v) = orientation {
            self.orientation = v;
        }
        if let Some(v) = output_file_name {
            self.output_file_name = v;
        }
        if let Some(v) = include_bookmarks {
            self.include_bookmarks = v;
        }
        if let Some(v) = metadata {
            self.metadata = v;
        }
    }

    /// Check the config is submittable.
    pub fn validate(&self) -> Result<(), MergeError> {
        let name = self.output_file_name.trim();
        if name.is_empty() {
            return Err(MergeError::InvalidConfig(
                "output file name must not be empty".into(),
            ));
        }
        if name.contains(['/', '\\']) {
            return Err(MergeError::InvalidConfig(format!(
                "output file name must be a bare file name, got '{name}'"
            )));
        }
        Ok(())
    }
}

/// A partial [`MergeConfig`]: `None` fields keep their current value.
///
/// # Example
/// ```rust
/// use docmerge_client::{MergeConfig, MergeConfigUpdate, Orientation};
///
/// let mut config = MergeConfig::default();
/// config.update(MergeConfigUpdate::new().orientation(Orientation::Landscape));
/// assert_eq!(config.orientation, Orientation::Landscape);
/// assert_eq!(config.output_file_name, "merged.pdf");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeConfigUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<PageSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_bookmarks: Option<bool>,
    /// `Some(None)` clears the metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Option<DocumentInfo>>,
}

impl MergeConfigUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_size(mut self, size: PageSize) -> Self {
        self.page_size = Some(size);
        self
    }

    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = Some(orientation);
        self
    }

    pub fn output_file_name(mut self, name: impl Into<String>) -> Self {
        self.output_file_name = Some(name.into());
        self
    }

    pub fn include_bookmarks(mut self, v: bool) -> Self {
        self.include_bookmarks = Some(v);
        self
    }

    pub fn metadata(mut self, info: Option<DocumentInfo>) -> Self {
        self.metadata = Some(info);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Document-info dictionary entries for the merged output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Page size of the merged document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    /// Each page keeps its source size. (default)
    #[default]
    Auto,
    A3,
    A4,
    A5,
    Letter,
    Legal,
}

impl PageSize {
    fn as_str(self) -> &'static str {
        match self {
            PageSize::Auto => "auto",
            PageSize::A3 => "a3",
            PageSize::A4 => "a4",
            PageSize::A5 => "a5",
            PageSize::Letter => "letter",
            PageSize::Legal => "legal",
        }
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageSize {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(PageSize::Auto),
            "a3" => Ok(PageSize::A3),
            "a4" => Ok(PageSize::A4),
            "a5" => Ok(PageSize::A5),
            "letter" => Ok(PageSize::Letter),
            "legal" => Ok(PageSize::Legal),
            other => Err(MergeError::InvalidConfig(format!(
                "unknown page size '{other}' (expected auto, a3, a4, a5, letter or legal)"
            ))),
        }
    }
}

/// Page orientation of the merged document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Orientation {
    /// Each page keeps its source orientation. (default)
    #[default]
    KeepOriginal,
    Portrait,
    Landscape,
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Orientation::KeepOriginal => "keep-original",
            Orientation::Portrait => "portrait",
            Orientation::Landscape => "landscape",
        })
    }
}

impl FromStr for Orientation {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep-original" | "keep" | "original" => Ok(Orientation::KeepOriginal),
            "portrait" => Ok(Orientation::Portrait),
            "landscape" => Ok(Orientation::Landscape),
            other => Err(MergeError::InvalidConfig(format!(
                "unknown orientation '{other}' (expected keep-original, portrait or landscape)"
            ))),
        }
    }
}
