use crate::{AppState, Effect, Msg, DEBOUNCE_QUIET_PERIOD};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::InputChanged(text) => {
            if text == state.input() {
                return (state, Vec::new());
            }
            let blank = text.trim().is_empty();
            let revision = state.set_input(text);
            if blank {
                // Nothing to convert; a result for the old text must not land.
                if state.drop_active_request() {
                    vec![Effect::CancelConversion]
                } else {
                    Vec::new()
                }
            } else {
                vec![Effect::ScheduleDebounce {
                    revision,
                    delay: DEBOUNCE_QUIET_PERIOD,
                }]
            }
        }
        Msg::DebounceElapsed { revision } => {
            if revision != state.revision() {
                return (state, Vec::new());
            }
            let text = state.input().trim();
            if text.is_empty() || state.is_in_flight(text) {
                return (state, Vec::new());
            }
            let (request_id, text) = state.begin_request();
            vec![Effect::Convert { request_id, text }]
        }
        Msg::ConvertClicked => {
            if state.input().trim().is_empty() {
                return (state, Vec::new());
            }
            let (request_id, text) = state.begin_request();
            vec![Effect::Convert { request_id, text }]
        }
        Msg::AttemptStarted {
            request_id,
            attempt,
        } => {
            if state.active_request() == Some(request_id) {
                state.apply_attempt(request_id, attempt);
            }
            Vec::new()
        }
        Msg::ConversionFinished { request_id, result } => {
            if state.active_request() == Some(request_id) {
                state.apply_result(result);
            }
            Vec::new()
        }
        Msg::ClearClicked => {
            if state.is_blank() {
                return (state, Vec::new());
            }
            let had_request = state.active_request().is_some();
            state.clear();
            if had_request {
                vec![Effect::CancelConversion]
            } else {
                Vec::new()
            }
        }
        Msg::CopyClicked => match state.output() {
            Some(output) => vec![Effect::CopyOutput(output.to_string())],
            None => Vec::new(),
        },
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}
