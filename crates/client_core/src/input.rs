//! User-supplied submission input and the validation gate in front of dispatch.

use std::{fs, io, path::Path};

use crate::error::SubmissionError;

/// A selected resume file, forwarded to the service as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl ResumeFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = mime_guess::from_path(&file_name)
            .first_raw()
            .map(str::to_string);
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    pub fn load(path: &Path) -> io::Result<Self> {
        let bytes = fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "resume".to_string());
        Ok(Self::new(file_name, bytes))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionInput {
    pub resume: Option<ResumeFile>,
    pub job_description: String,
}

impl SubmissionInput {
    /// Checks the resume first, then the description. File type and size are
    /// never inspected.
    pub fn validate(&self) -> Result<(&ResumeFile, &str), SubmissionError> {
        let resume = self.resume.as_ref().ok_or(SubmissionError::MissingResume)?;
        if self.job_description.is_empty() {
            return Err(SubmissionError::MissingJobDescription);
        }
        Ok((resume, self.job_description.as_str()))
    }
}
