//! Page references: the unit the merge queue is made of.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One page of one source document, as tracked by the merge queue.
///
/// Identity is `id` alone. The server issues ids, and may issue distinct ids
/// for two selections of the same (`document_id`, `page_index`) pair, so the
/// client never deduplicates by content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRef {
    /// Server-issued opaque id, unique within a queue.
    pub id: String,
    /// Owning source document.
    pub document_id: String,
    /// Zero-based page position within the source document.
    pub page_index: usize,
    /// Display label only.
    #[serde(default)]
    pub original_document_name: String,
    /// Opaque reference to a preview image.
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub page_width: f64,
    #[serde(default)]
    pub page_height: f64,
    #[serde(default)]
    pub rotation: Rotation,
}

impl PageRef {
    /// A page reference with empty display metadata.
    pub fn new(id: impl Into<String>, document_id: impl Into<String>, page_index: usize) -> Self {
        Self {
            id: id.into(),
            document_id: document_id.into(),
            page_index,
            original_document_name: String::new(),
            thumbnail: String::new(),
            page_width: 0.0,
            page_height: 0.0,
            rotation: Rotation::None,
        }
    }

    pub fn with_document_name(mut self, name: impl Into<String>) -> Self {
        self.original_document_name = name.into();
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = thumbnail.into();
        self
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.page_width = width;
        self.page_height = height;
        self
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    /// Width and height as displayed, i.e. swapped for quarter turns.
    pub fn display_size(&self) -> (f64, f64) {
        match self.rotation {
            Rotation::Cw90 | Rotation::Cw270 => (self.page_height, self.page_width),
            Rotation::None | Rotation::Cw180 => (self.page_width, self.page_height),
        }
    }
}

/// Clockwise page rotation. Serialized as the integer degree value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Rotation {
    #[default]
    None,
    Cw90,
    Cw180,
    Cw270,
}

impl Rotation {
    pub fn degrees(self) -> i32 {
        match self {
            Rotation::None => 0,
            Rotation::Cw90 => 90,
            Rotation::Cw180 => 180,
            Rotation::Cw270 => 270,
        }
    }
}

impl TryFrom<i32> for Rotation {
    type Error = String;

    fn try_from(degrees: i32) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Rotation::None),
            90 => Ok(Rotation::Cw90),
            180 => Ok(Rotation::Cw180),
            270 => Ok(Rotation::Cw270),
            other => Err(format!("rotation must be 0, 90, 180 or 270 degrees, got {other}")),
        }
    }
}

impl From<Rotation> for i32 {
    fn from(r: Rotation) -> Self {
        r.degrees()
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}
