//! Request DTOs for Web API.

use serde::Deserialize;
use validator::Validate;

use super::validation::valid_item_name;

/// JSON body for `POST /items`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    /// Item name.
    #[serde(default)]
    #[validate(
        length(max = 255, message = "Name must be at most 255 characters"),
        custom(function = "valid_item_name")
    )]
    pub name: String,
    /// Item type; only `"folder"` is accepted as JSON.
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Parent folder ID, `"root"` or absent for the top level.
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Text fields of a multipart upload form.
#[derive(Debug, Default, Clone)]
pub struct UploadFields {
    /// `type` field.
    pub kind: Option<String>,
    /// `name` field.
    pub name: Option<String>,
    /// `parentId` field.
    pub parent_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_item_request_deserialize() {
        let req: CreateItemRequest =
            serde_json::from_str(r#"{"name":"Docs","type":"folder","parentId":"abc"}"#).unwrap();
        assert_eq!(req.name, "Docs");
        assert_eq!(req.kind.as_deref(), Some("folder"));
        assert_eq!(req.parent_id.as_deref(), Some("abc"));
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_create_item_request_missing_name() {
        let req: CreateItemRequest = serde_json::from_str(r#"{"type":"folder"}"#).unwrap();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("name"));
    }

    #[test]
    fn test_create_item_request_too_long() {
        let req = CreateItemRequest {
            name: "x".repeat(256),
            kind: Some("folder".to_string()),
            parent_id: None,
        };
        assert!(req.validate().is_err());
    }
}
