use serde::{Deserialize, Serialize};

use crate::PhotoSource;

/// One stored version of a subject's details.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsRow {
    pub version: i32,
    /// JSON object.
    pub payload: String,
    /// Local reference of the downloaded (or locally chosen) photo.
    pub photo_url: Option<String>,
    pub photo_source: Option<PhotoSource>,
}

/// Published details as they arrive from the outside.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncomingDetails {
    pub version: i32,
    pub payload: String,
    pub photo_source: Option<PhotoSource>,
}

impl IncomingDetails {
    pub fn new(version: i32, payload: impl Into<String>) -> Self {
        Self {
            version,
            payload: payload.into(),
            photo_source: None,
        }
    }

    pub fn with_photo(mut self, photo: PhotoSource) -> Self {
        self.photo_source = Some(photo);
        self
    }
}
