use std::time::Duration;

use crate::view_model::AppViewModel;

pub type RequestId = u64;
pub type Revision = u64;

/// Time without edits before the input is sent for conversion.
pub const DEBOUNCE_QUIET_PERIOD: Duration = Duration::from_millis(750);

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Idle,
    /// An edit is waiting out the quiet period.
    Waiting,
    Converting {
        request_id: RequestId,
        attempt: u32,
    },
    Converted {
        from_cache: bool,
    },
    Failed {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionResult {
    Converted { bibtex: String, from_cache: bool },
    NothingToConvert,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    input: String,
    output: Option<String>,
    status: Status,
    revision: Revision,
    last_request_id: RequestId,
    active_request: Option<RequestId>,
    last_submitted: Option<String>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            input: self.input.clone(),
            output: self.output.clone(),
            status: self.status.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns whether a re-render is due and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn input(&self) -> &str {
        &self.input
    }

    pub(crate) fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub(crate) fn revision(&self) -> Revision {
        self.revision
    }

    pub(crate) fn active_request(&self) -> Option<RequestId> {
        self.active_request
    }

    /// Whether the live request was made for exactly `text`.
    pub(crate) fn is_in_flight(&self, text: &str) -> bool {
        self.active_request.is_some() && self.last_submitted.as_deref() == Some(text)
    }

    /// Stores an edit and returns its revision.
    pub(crate) fn set_input(&mut self, text: String) -> Revision {
        self.input = text;
        self.revision += 1;
        if self.input.trim().is_empty() {
            self.status = Status::Idle;
        } else if self.active_request.is_none() {
            self.status = Status::Waiting;
        }
        self.mark_dirty();
        self.revision
    }

    /// Issues a request id for the trimmed input and makes it the only live one.
    pub(crate) fn begin_request(&mut self) -> (RequestId, String) {
        let text = self.input.trim().to_string();
        // Any debounce still pending for this input is now moot.
        self.revision += 1;
        self.last_request_id += 1;
        let request_id = self.last_request_id;
        self.active_request = Some(request_id);
        self.last_submitted = Some(text.clone());
        self.status = Status::Converting {
            request_id,
            attempt: 1,
        };
        self.mark_dirty();
        (request_id, text)
    }

    /// Forgets the live request; returns whether there was one.
    pub(crate) fn drop_active_request(&mut self) -> bool {
        self.active_request.take().is_some()
    }

    pub(crate) fn apply_attempt(&mut self, request_id: RequestId, attempt: u32) {
        self.status = Status::Converting {
            request_id,
            attempt,
        };
        self.mark_dirty();
    }

    pub(crate) fn apply_result(&mut self, result: ConversionResult) {
        self.active_request = None;
        match result {
            ConversionResult::Converted { bibtex, from_cache } => {
                self.output = Some(bibtex);
                self.status = Status::Converted { from_cache };
            }
            ConversionResult::NothingToConvert => {
                self.status = Status::Idle;
            }
            ConversionResult::Failed { message } => {
                self.status = Status::Failed { message };
            }
        }
        self.mark_dirty();
    }

    pub(crate) fn clear(&mut self) {
        self.input.clear();
        self.output = None;
        self.status = Status::Idle;
        self.revision += 1;
        self.active_request = None;
        self.last_submitted = None;
        self.mark_dirty();
    }

    pub(crate) fn is_blank(&self) -> bool {
        self.input.is_empty() && self.output.is_none() && self.status == Status::Idle
    }
}
