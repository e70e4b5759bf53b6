//! Attachment kinds for direct-message files.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Kind of file attached to a direct message.
///
/// The backend stores the kind as a free-form string. Known kinds are
/// matched case-insensitively; anything else is preserved lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum FileType {
    Image,
    Video,
    #[default]
    File,
    Other(String),
}

impl FileType {
    /// Parse a kind string leniently. Blank input yields `File`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase();
        match lower.as_str() {
            "" | "file" => Self::File,
            "image" => Self::Image,
            "video" => Self::Video,
            _ => Self::Other(lower),
        }
    }

    /// Guess the kind from a file name's extension.
    #[must_use]
    pub fn from_file_name(name: &str) -> Self {
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" | "svg" | "heic" => Self::Image,
            "mp4" | "mov" | "webm" | "mkv" | "avi" | "m4v" => Self::Video,
            _ => Self::File,
        }
    }

    /// Lower-case wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::File => "file",
            Self::Other(s) => s,
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FileType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FileType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}
