/// Reading `multipart/form-data` bodies
///
/// Album and profile forms mix text fields with file uploads. The whole body
/// is drained into a [`MultipartForm`] before any validation runs, so a
/// handler can check every field and report all problems at once.

use axum::extract::Multipart;
use bytes::Bytes;
use std::collections::HashMap;

use crate::error::AppResult;

/// One uploaded file
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-side file name, for logs only
    pub file_name: Option<String>,
    pub data: Bytes,
}

/// Drained multipart body
#[derive(Debug, Default)]
pub struct MultipartForm {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, Vec<UploadedFile>>,
}

impl MultipartForm {
    /// Reads every part of `multipart`
    ///
    /// Parts with a file name are treated as files; browsers send an empty
    /// part for a file input left blank, and those are skipped.
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let data = field.bytes().await?;
                    if data.is_empty() {
                        continue;
                    }
                    form.files.entry(name).or_default().push(UploadedFile {
                        file_name: Some(file_name).filter(|n| !n.is_empty()),
                        data,
                    });
                }
                None => {
                    let value = field.text().await?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    /// First file uploaded under `name`
    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name).and_then(|files| files.first())
    }

    /// Every file uploaded under `name`
    pub fn files(&self, name: &str) -> &[UploadedFile] {
        self.files.get(name).map(Vec::as_slice).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_lookup() {
        let mut form = MultipartForm::default();
        form.files.insert(
            "images".to_string(),
            vec![
                UploadedFile {
                    file_name: Some("a.png".to_string()),
                    data: Bytes::from_static(b"a"),
                },
                UploadedFile {
                    file_name: None,
                    data: Bytes::from_static(b"b"),
                },
            ],
        );

        assert_eq!(form.files("images").len(), 2);
        assert_eq!(form.file("images").unwrap().data, Bytes::from_static(b"a"));
        assert!(form.file("banner").is_none());
        assert!(form.files("banner").is_empty());
    }
}
