use apa2bib_core::{update, AppState, ConversionResult, Effect, Msg, Status};

const FIRST: &str = "Doe, J. (2021). A book title. Publisher.";
const SECOND: &str = "Roe, R. (2019). Another title. Journal, 3(1), 1-10.";

fn init_logging() {
    engine_logging::initialize_for_tests();
}

/// Types `text`, lets the quiet period pass, and returns the issued request id.
fn submit(state: AppState, text: &str) -> (AppState, u64) {
    let (state, effects) = update(state, Msg::InputChanged(text.to_string()));
    let revision = match effects.as_slice() {
        [Effect::ScheduleDebounce { revision, .. }] => *revision,
        other => panic!("expected debounce, got {other:?}"),
    };
    let (state, effects) = update(state, Msg::DebounceElapsed { revision });
    match effects.as_slice() {
        [Effect::Convert { request_id, .. }] => (state, *request_id),
        other => panic!("expected convert, got {other:?}"),
    }
}

fn converted(bibtex: &str) -> ConversionResult {
    ConversionResult::Converted {
        bibtex: bibtex.to_string(),
        from_cache: false,
    }
}

#[test]
fn completion_shows_output() {
    init_logging();
    let (state, request_id) = submit(AppState::new(), FIRST);

    let (mut state, effects) = update(
        state,
        Msg::ConversionFinished {
            request_id,
            result: converted("@book{doe2021}"),
        },
    );

    assert!(effects.is_empty());
    let view = state.view();
    assert_eq!(view.output.as_deref(), Some("@book{doe2021}"));
    assert_eq!(view.status, Status::Converted { from_cache: false });
    assert_eq!(view.status_line(), "Converted.");
    assert!(state.consume_dirty());
}

#[test]
fn stale_completion_is_discarded() {
    init_logging();
    let (state, first_id) = submit(AppState::new(), FIRST);
    let (mut state, second_id) = submit(state, SECOND);
    assert!(second_id > first_id);
    assert!(state.consume_dirty());

    let (mut state, _) = update(
        state,
        Msg::ConversionFinished {
            request_id: first_id,
            result: converted("@book{doe2021}"),
        },
    );
    assert_eq!(state.view().output, None);
    assert!(!state.consume_dirty());

    let (state, _) = update(
        state,
        Msg::ConversionFinished {
            request_id: second_id,
            result: converted("@article{roe2019}"),
        },
    );
    assert_eq!(state.view().output.as_deref(), Some("@article{roe2019}"));
}

#[test]
fn attempts_are_reported_for_live_request_only() {
    init_logging();
    let (state, first_id) = submit(AppState::new(), FIRST);
    let (state, second_id) = submit(state, SECOND);

    let (state, _) = update(
        state,
        Msg::AttemptStarted {
            request_id: first_id,
            attempt: 3,
        },
    );
    assert_eq!(
        state.view().status,
        Status::Converting {
            request_id: second_id,
            attempt: 1
        }
    );

    let (state, _) = update(
        state,
        Msg::AttemptStarted {
            request_id: second_id,
            attempt: 2,
        },
    );
    assert_eq!(state.view().status_line(), "Converting (attempt 2)...");
}

#[test]
fn failure_keeps_previous_output_and_shows_message() {
    init_logging();
    let (state, first_id) = submit(AppState::new(), FIRST);
    let (state, _) = update(
        state,
        Msg::ConversionFinished {
            request_id: first_id,
            result: converted("@book{doe2021}"),
        },
    );
    let (state, second_id) = submit(state, SECOND);

    let (state, _) = update(
        state,
        Msg::ConversionFinished {
            request_id: second_id,
            result: ConversionResult::Failed {
                message: "Too many requests.".to_string(),
            },
        },
    );

    let view = state.view();
    assert_eq!(view.output.as_deref(), Some("@book{doe2021}"));
    assert_eq!(view.status_line(), "Error: Too many requests.");
}

#[test]
fn failed_text_can_be_retried_after_quiet_period() {
    init_logging();
    let (state, request_id) = submit(AppState::new(), FIRST);
    let (state, _) = update(
        state,
        Msg::ConversionFinished {
            request_id,
            result: ConversionResult::Failed {
                message: "timeout".to_string(),
            },
        },
    );

    let (_state, retry_id) = submit(state, &format!("{FIRST} "));
    assert!(retry_id > request_id);
}

#[test]
fn clearing_input_cancels_live_request() {
    init_logging();
    let (state, request_id) = submit(AppState::new(), FIRST);

    let (state, effects) = update(state, Msg::InputChanged(String::new()));
    assert_eq!(effects, vec![Effect::CancelConversion]);

    let (state, _) = update(
        state,
        Msg::ConversionFinished {
            request_id,
            result: converted("@book{doe2021}"),
        },
    );
    assert_eq!(state.view().output, None);
    assert_eq!(state.view().status, Status::Idle);
}

#[test]
fn clear_click_resets_everything() {
    init_logging();
    let (state, _request_id) = submit(AppState::new(), FIRST);

    let (state, effects) = update(state, Msg::ClearClicked);

    assert_eq!(effects, vec![Effect::CancelConversion]);
    let view = state.view();
    assert_eq!(view.input, "");
    assert_eq!(view.output, None);
    assert_eq!(view.status, Status::Idle);
}

#[test]
fn copy_emits_current_output() {
    init_logging();
    let (state, request_id) = submit(AppState::new(), FIRST);
    let (state, _) = update(
        state,
        Msg::ConversionFinished {
            request_id,
            result: converted("@book{doe2021}"),
        },
    );

    let (_state, effects) = update(state, Msg::CopyClicked);
    assert_eq!(effects, vec![Effect::CopyOutput("@book{doe2021}".to_string())]);
}

#[test]
fn nothing_to_convert_returns_to_idle() {
    init_logging();
    let (state, request_id) = submit(AppState::new(), FIRST);

    let (state, _) = update(
        state,
        Msg::ConversionFinished {
            request_id,
            result: ConversionResult::NothingToConvert,
        },
    );
    assert_eq!(state.view().status, Status::Idle);
}
