//! Wire DTOs and domain types for the MakerWorld catalog
//!
//! Wire structs mirror the platform's JSON (camelCase, tolerant of unknown
//! fields via a flattened extras map). Domain types are what the rest of the
//! application consumes; conversion happens inside the catalog client.

use serde::Deserialize;
use std::collections::HashMap;

/// One design as returned by the published-design listing endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignHitDto {
    pub id: i64,
    #[serde(default)]
    pub design_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub create_time: Option<String>,
    #[serde(default)]
    pub update_time: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Envelope around the published-design listing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignListDto {
    #[serde(default)]
    pub hits: Vec<DesignHitDto>,
    #[serde(default)]
    pub total: i64,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Full design detail payload
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignDetailDto {
    pub id: i64,
    #[serde(default)]
    pub design_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub model_files: Vec<ModelFileDto>,
    #[serde(default)]
    pub instances: Vec<InstanceDto>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelFileDto {
    pub name: String,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceDto {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Envelope for the short-lived download URL endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadUrlDto {
    pub url: String,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A published design as seen in the catalog listing
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDesignSummary {
    /// Internal numeric id used by detail and download endpoints
    pub id: i64,
    /// Public-facing id, present once the design is published
    pub public_id: Option<String>,
    pub title: String,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub category_id: Option<i64>,
    pub tags: Vec<String>,
    pub license: Option<String>,
    pub cover_url: Option<String>,
}

impl RemoteDesignSummary {
    /// Remote-id candidates for platform-link lookups, public id first
    pub fn remote_id_candidates(&self) -> Vec<String> {
        let internal = self.id.to_string();
        match &self.public_id {
            Some(public) if *public != internal => vec![public.clone(), internal],
            _ => vec![internal],
        }
    }
}

/// A model file listed inside a design's detail payload
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteModelFile {
    pub name: String,
    pub size: Option<i64>,
}

/// A print-profile instance listed inside a design's detail payload
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteInstance {
    pub id: i64,
    pub name: String,
}

/// Full detail for one design
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDesignDetail {
    pub summary: RemoteDesignSummary,
    pub model_files: Vec<RemoteModelFile>,
    pub instances: Vec<RemoteInstance>,
}

impl From<DesignHitDto> for RemoteDesignSummary {
    fn from(dto: DesignHitDto) -> Self {
        Self {
            id: dto.id,
            public_id: dto.design_id,
            title: dto.title,
            summary: dto.summary,
            description: None,
            category_id: dto.category_id,
            tags: dto.tags,
            license: dto.license,
            cover_url: dto.cover_url,
        }
    }
}

impl From<DesignDetailDto> for RemoteDesignDetail {
    fn from(dto: DesignDetailDto) -> Self {
        let summary = RemoteDesignSummary {
            id: dto.id,
            public_id: dto.design_id,
            title: dto.title,
            summary: dto.summary,
            description: dto.description,
            category_id: dto.category_id,
            tags: dto.tags,
            license: dto.license,
            cover_url: dto.cover_url,
        };
        let model_files = dto
            .model_files
            .into_iter()
            .map(|f| RemoteModelFile {
                name: f.name,
                size: f.size,
            })
            .collect();
        let instances = dto
            .instances
            .into_iter()
            .map(|i| RemoteInstance {
                name: i.title.unwrap_or_else(|| format!("instance-{}", i.id)),
                id: i.id,
            })
            .collect();

        Self {
            summary,
            model_files,
            instances,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_dto_tolerates_unknown_fields() {
        let json = r#"{
            "id": 42,
            "designId": "MW-42",
            "title": "Cube",
            "tags": ["calibration"],
            "likeCount": 9000,
            "nested": {"a": 1}
        }"#;

        let dto: DesignHitDto = serde_json::from_str(json).unwrap();
        assert_eq!(dto.id, 42);
        assert_eq!(dto.design_id.as_deref(), Some("MW-42"));
        assert!(dto.extra.contains_key("likeCount"));

        let summary: RemoteDesignSummary = dto.into();
        assert_eq!(summary.remote_id_candidates(), vec!["MW-42", "42"]);
    }

    #[test]
    fn test_candidates_without_public_id() {
        let summary = RemoteDesignSummary {
            id: 7,
            public_id: None,
            title: "Draft".to_string(),
            summary: None,
            description: None,
            category_id: None,
            tags: vec![],
            license: None,
            cover_url: None,
        };
        assert_eq!(summary.remote_id_candidates(), vec!["7"]);
    }

    #[test]
    fn test_detail_dto_conversion() {
        let json = r#"{
            "id": 5,
            "title": "Boat",
            "description": "<p>hull</p>",
            "modelFiles": [{"name": "boat.stl", "size": 1024}],
            "instances": [{"id": 90, "title": "0.2mm PLA"}, {"id": 91}]
        }"#;

        let dto: DesignDetailDto = serde_json::from_str(json).unwrap();
        let detail: RemoteDesignDetail = dto.into();

        assert_eq!(detail.model_files.len(), 1);
        assert_eq!(detail.model_files[0].name, "boat.stl");
        assert_eq!(detail.instances[0].name, "0.2mm PLA");
        assert_eq!(detail.instances[1].name, "instance-91");
    }
}
