use crate::Status;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub input: String,
    pub output: Option<String>,
    pub status: Status,
    pub dirty: bool,
}

impl AppViewModel {
    /// One-line status text for the status bar.
    pub fn status_line(&self) -> String {
        match &self.status {
            Status::Idle => "Paste an APA reference to convert.".to_string(),
            Status::Waiting => "Waiting for typing to stop...".to_string(),
            Status::Converting { attempt: 1, .. } => "Converting...".to_string(),
            Status::Converting { attempt, .. } => format!("Converting (attempt {attempt})..."),
            Status::Converted { from_cache: true } => "Converted (cached).".to_string(),
            Status::Converted { from_cache: false } => "Converted.".to_string(),
            Status::Failed { message } => format!("Error: {message}"),
        }
    }
}
