#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User edited the reference input box.
    InputChanged(String),
    /// Quiet period after the edit with this revision has passed.
    DebounceElapsed { revision: crate::Revision },
    /// User asked for conversion now, skipping the quiet period.
    ConvertClicked,
    /// Engine started an attempt for a request.
    AttemptStarted {
        request_id: crate::RequestId,
        attempt: u32,
    },
    /// Engine finished a request.
    ConversionFinished {
        request_id: crate::RequestId,
        result: crate::ConversionResult,
    },
    ClearClicked,
    CopyClicked,
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
