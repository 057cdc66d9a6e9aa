//! Volume and page value types shared by the API and the reader.

use serde::{Deserialize, Serialize};

use super::urls::DisplayUrls;
use crate::drive::{DriveFile, DriveFolder};

/// One comic tome, backed by a Drive folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub id: String,
    pub name: String,
    pub mime_type: String,
}

impl Volume {
    /// Parsed display title.
    pub fn title(&self) -> VolumeTitle {
        VolumeTitle::parse(&self.name)
    }
}

impl From<DriveFolder> for Volume {
    fn from(folder: DriveFolder) -> Self {
        Self {
            id: folder.id,
            name: folder.name,
            mime_type: folder.mime_type,
        }
    }
}

/// A volume name split into its number and title.
///
/// Names follow `"<Series> - NN - <Title>"`; anything else is kept whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeTitle {
    pub number: Option<u32>,
    pub title: String,
}

impl VolumeTitle {
    pub fn parse(name: &str) -> Self {
        let mut parts = name.splitn(3, " - ");
        if let (Some(_series), Some(number), Some(title)) = (parts.next(), parts.next(), parts.next())
        {
            if let Ok(number) = number.trim().parse::<u32>() {
                if !title.trim().is_empty() {
                    return Self {
                        number: Some(number),
                        title: title.trim().to_string(),
                    };
                }
            }
        }

        Self {
            number: None,
            title: name.to_string(),
        }
    }
}

/// One page image inside a volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageFile {
    pub id: String,
    pub name: String,
    pub mime_type: String,

    /// Drive's own download link, used as the last image fallback
    #[serde(
        rename = "webContentLink",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub source_link: Option<String>,
}

impl From<DriveFile> for PageFile {
    fn from(file: DriveFile) -> Self {
        Self {
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
            source_link: file.web_content_link,
        }
    }
}

/// A page as returned by the pages endpoint: the file plus derived URLs.
#[derive(Debug, Clone, Serialize)]
pub struct PageEntry {
    #[serde(flatten)]
    pub file: PageFile,

    #[serde(flatten)]
    pub urls: DisplayUrls,
}

impl From<PageFile> for PageEntry {
    fn from(file: PageFile) -> Self {
        let urls = DisplayUrls::derive(&file.id);
        Self { file, urls }
    }
}
