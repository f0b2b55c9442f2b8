use std::path::PathBuf;
use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use thiserror::Error;

/// Instructions used whenever the configured template cannot be loaded.
pub const FALLBACK_PROMPT: &str = "\
You are a bibliography assistant. Convert the APA 7th-edition reference below \
into a single BibTeX entry.

Rules:
- Choose the most specific entry type (@article, @book, @incollection, \
@inproceedings, @phdthesis, @techreport, @misc, ...).
- Build the citation key from the first author's family name in lower case \
followed by the year, e.g. smith2020.
- Include every field present in the reference: author, title, journal or \
booktitle, year, volume, number, pages, publisher, doi, url.
- Write authors as \"Family, Given and Family, Given\".
- Use -- for page ranges and protect capitalised words in titles with braces.
- Output only the BibTeX entry, with no explanation and no markdown.";

pub const DEFAULT_PROMPT_LOAD_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt template unavailable: {0}")]
    Unavailable(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait::async_trait]
pub trait PromptSource: Send + Sync {
    async fn load(&self) -> Result<String, PromptError>;
}

#[derive(Debug, Clone)]
pub struct StaticPromptSource {
    template: String,
}

impl StaticPromptSource {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }
}

#[async_trait::async_trait]
impl PromptSource for StaticPromptSource {
    async fn load(&self) -> Result<String, PromptError> {
        Ok(self.template.clone())
    }
}

#[derive(Debug, Clone)]
pub struct FilePromptSource {
    path: PathBuf,
}

impl FilePromptSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl PromptSource for FilePromptSource {
    async fn load(&self) -> Result<String, PromptError> {
        Ok(tokio::fs::read_to_string(&self.path).await?)
    }
}

/// Loads the template from `source`, falling back to [`FALLBACK_PROMPT`] when
/// the source errors, returns blank text, or takes longer than `timeout`.
pub async fn resolve_prompt(source: &dyn PromptSource, timeout: Duration) -> String {
    match tokio::time::timeout(timeout, source.load()).await {
        Ok(Ok(template)) if !template.trim().is_empty() => {
            engine_debug!("loaded prompt template ({} bytes)", template.len());
            template
        }
        Ok(Ok(_)) => {
            engine_warn!("prompt template is blank; using built-in instructions");
            FALLBACK_PROMPT.to_string()
        }
        Ok(Err(err)) => {
            engine_warn!("{}; using built-in instructions", err);
            FALLBACK_PROMPT.to_string()
        }
        Err(_) => {
            engine_warn!(
                "prompt template not loaded within {:?}; using built-in instructions",
                timeout
            );
            FALLBACK_PROMPT.to_string()
        }
    }
}

/// Joins the instruction template and the reference with a blank line.
pub fn build_prompt(template: &str, reference: &str) -> String {
    format!("{}\n\n{}", template.trim_end(), reference)
}
