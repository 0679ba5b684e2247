use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::db::{GeoJsonFile, GeoJsonSummary};
use crate::domain::{FileId, UserId};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Map payload: the stored document is embedded as-is, never re-encoded.
#[derive(Debug, Serialize)]
pub struct GeoJsonEntry {
    pub id: FileId,
    pub name: String,
    #[serde(rename = "geojsonContent")]
    pub geojson_content: Box<RawValue>,
}

impl TryFrom<GeoJsonFile> for GeoJsonEntry {
    type Error = serde_json::Error;

    fn try_from(file: GeoJsonFile) -> Result<Self, Self::Error> {
        Ok(Self {
            id: file.id,
            name: file.name,
            geojson_content: RawValue::from_string(file.content)?,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct GeoJsonFileDto {
    pub id: FileId,
    pub owner_id: UserId,
    pub name: String,
    pub size_bytes: i64,
    pub created_at: String,
}

impl From<GeoJsonSummary> for GeoJsonFileDto {
    fn from(file: GeoJsonSummary) -> Self {
        Self {
            id: file.id,
            owner_id: file.owner,
            name: file.name,
            size_bytes: file.size_bytes,
            created_at: file.created_at,
        }
    }
}

/// A single file with its body, for detail endpoints.
#[derive(Debug, Serialize)]
pub struct GeoJsonDetailDto {
    pub id: FileId,
    pub owner_id: UserId,
    pub name: String,
    pub size_bytes: i64,
    pub created_at: String,
    #[serde(rename = "geojsonContent")]
    pub geojson_content: Box<RawValue>,
}

impl TryFrom<GeoJsonFile> for GeoJsonDetailDto {
    type Error = serde_json::Error;

    fn try_from(file: GeoJsonFile) -> Result<Self, Self::Error> {
        Ok(Self {
            id: file.id,
            owner_id: file.owner,
            name: file.name,
            size_bytes: file.size_bytes,
            created_at: file.created_at,
            geojson_content: RawValue::from_string(file.content)?,
        })
    }
}

/// JSON body accepted by `/sig/api/upload`.
#[derive(Debug, Deserialize)]
pub struct UploadJsonRequest {
    pub name: Option<String>,
    /// Either a JSON string holding the document or the document itself.
    #[serde(alias = "raw_json")]
    pub geojson: Box<RawValue>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
