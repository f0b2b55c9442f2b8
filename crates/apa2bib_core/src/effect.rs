use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Deliver `Msg::DebounceElapsed { revision }` after `delay`.
    ScheduleDebounce {
        revision: crate::Revision,
        delay: Duration,
    },
    Convert {
        request_id: crate::RequestId,
        text: String,
    },
    CancelConversion,
    CopyOutput(String),
}
