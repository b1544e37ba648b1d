//! Base64 document uploads: decode, validate, persist under `uploads/`.

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::Value;

use crate::core::config::AppPaths;
use crate::core::errors::ApiError;
use crate::rag::engine::file_extension;

const DEFAULT_MAX_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &["pdf", "txt", "md", "doc", "docx"];

#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_bytes: usize,
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl UploadPolicy {
    pub fn from_config(config: &Value) -> Self {
        let defaults = Self::default();
        let max_bytes = config
            .get("uploads")
            .and_then(|v| v.get("max_bytes"))
            .and_then(|v| v.as_u64())
            .map(|v| v as usize)
            .unwrap_or(defaults.max_bytes);
        let allowed_extensions = config
            .get("uploads")
            .and_then(|v| v.get("allowed_extensions"))
            .and_then(|v| v.as_array())
            .map(|list| {
                list.iter()
                    .filter_map(|item| item.as_str())
                    .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                    .filter(|ext| !ext.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|list: &Vec<String>| !list.is_empty())
            .unwrap_or(defaults.allowed_extensions);
        Self {
            max_bytes,
            allowed_extensions,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidatedUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Decodes and validates an uploaded document. All rejections are 400s so the
/// client can tell a bad upload apart from a server fault.
pub fn decode_upload(
    file_name: &str,
    file_data: &str,
    policy: &UploadPolicy,
) -> Result<ValidatedUpload, ApiError> {
    let file_name = sanitize_file_name(file_name)?;

    let extension = file_extension(&file_name);
    if !policy.allowed_extensions.iter().any(|ext| ext == &extension) {
        return Err(ApiError::BadRequest(format!(
            "File type '{}' is not supported (allowed: {})",
            extension,
            policy.allowed_extensions.join(", ")
        )));
    }

    let bytes = BASE64
        .decode(file_data.trim())
        .map_err(|err| ApiError::BadRequest(format!("Invalid base64 file data: {}", err)))?;

    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
    }
    if bytes.len() > policy.max_bytes {
        return Err(ApiError::BadRequest(format!(
            "File exceeds the {} byte upload limit",
            policy.max_bytes
        )));
    }

    Ok(ValidatedUpload { file_name, bytes })
}

/// Persists a validated upload under the data directory's `uploads/`.
pub async fn save_upload(paths: &AppPaths, upload: &ValidatedUpload) -> Result<PathBuf, ApiError> {
    let target = paths.uploads_dir.join(&upload.file_name);
    tokio::fs::write(&target, &upload.bytes)
        .await
        .map_err(|err| ApiError::internal(format!("Failed to save upload: {}", err)))?;
    Ok(target)
}

/// Keeps only the final path component so uploads cannot escape `uploads/`.
fn sanitize_file_name(file_name: &str) -> Result<String, ApiError> {
    let name = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();
    if name.is_empty() || name == "." || name == ".." {
        return Err(ApiError::BadRequest("Invalid file name".to_string()));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encode(bytes: &[u8]) -> String {
        BASE64.encode(bytes)
    }

    #[test]
    fn disallowed_extension_is_rejected() {
        let policy = UploadPolicy::default();
        let err = decode_upload("payload.exe", &encode(b"MZ"), &policy).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn oversized_upload_is_rejected() {
        let policy = UploadPolicy {
            max_bytes: 8,
            ..UploadPolicy::default()
        };
        let err = decode_upload("notes.txt", &encode(b"way past the limit"), &policy).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn valid_upload_decodes() {
        let policy = UploadPolicy::default();
        let upload = decode_upload("brochure.txt", &encode(b"fleet brochure"), &policy).unwrap();
        assert_eq!(upload.file_name, "brochure.txt");
        assert_eq!(upload.bytes, b"fleet brochure");
    }

    #[test]
    fn path_components_are_stripped_from_file_names() {
        let policy = UploadPolicy::default();
        let upload =
            decode_upload("../../etc/cron.d/notes.txt", &encode(b"hello"), &policy).unwrap();
        assert_eq!(upload.file_name, "notes.txt");
    }

    #[test]
    fn malformed_base64_is_a_bad_request() {
        let policy = UploadPolicy::default();
        let err = decode_upload("notes.txt", "this is not base64!!!", &policy).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn policy_reads_overrides_from_config() {
        let config = json!({
            "uploads": { "max_bytes": 1024, "allowed_extensions": [".TXT", "pdf"] }
        });
        let policy = UploadPolicy::from_config(&config);
        assert_eq!(policy.max_bytes, 1024);
        assert_eq!(policy.allowed_extensions, vec!["txt", "pdf"]);
    }
}
