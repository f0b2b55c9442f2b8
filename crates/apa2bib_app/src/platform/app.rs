use std::io::{self, BufRead, Read};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use apa2bib_core::{update, AppState, Msg, Status};
use apa2bib_engine::{
    resolve_prompt, BibFileWriter, Converter, EngineHandle, FilePromptSource,
    ReqwestCompletionClient, DEFAULT_PROMPT_LOAD_TIMEOUT, FALLBACK_PROMPT,
};
use engine_logging::{engine_error, engine_info, engine_warn};

use super::cli::Cli;
use super::effects::EffectRunner;
use super::logging;
use super::render::Renderer;
use super::settings::{default_settings_path, load_settings, Settings};

const POLL_INTERVAL: Duration = Duration::from_millis(20);

pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    logging::initialize(cli.log, cli.verbose);

    let settings_path = cli.config.clone().or_else(default_settings_path);
    let settings = match &settings_path {
        Some(path) => load_settings(path)?,
        None => Settings::default(),
    }
    .with_overrides(|name| std::env::var(name).ok(), cli.model.clone());
    if settings.api_key.is_none() {
        engine_warn!("No API key configured; conversions will fail until one is set");
    }

    let template = load_template(&settings)?;
    let client = ReqwestCompletionClient::new(settings.client_settings())
        .context("building HTTP client")?;
    let converter =
        Converter::new(settings.converter_settings(), Arc::new(client)).with_template(template);

    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    let runner = EffectRunner::new(
        EngineHandle::new(converter),
        msg_tx.clone(),
        cli.output.map(BibFileWriter::new),
    );

    if cli.once {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("reading reference from stdin")?;
        Ok(run_once(Session::new(runner, false), &msg_rx, text))
    } else {
        let input_closed = Arc::new(AtomicBool::new(false));
        spawn_stdin_reader(msg_tx, input_closed.clone());
        run_interactive(Session::new(runner, true), &msg_rx, &input_closed);
        Ok(ExitCode::SUCCESS)
    }
}

fn load_template(settings: &Settings) -> anyhow::Result<String> {
    let Some(path) = &settings.prompt_path else {
        return Ok(FALLBACK_PROMPT.to_string());
    };
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("starting prompt loader")?;
    let source = FilePromptSource::new(path);
    Ok(runtime.block_on(resolve_prompt(&source, DEFAULT_PROMPT_LOAD_TIMEOUT)))
}

struct Session {
    state: AppState,
    runner: EffectRunner,
    renderer: Renderer,
}

impl Session {
    fn new(runner: EffectRunner, show_status: bool) -> Self {
        Self {
            state: AppState::new(),
            runner,
            renderer: Renderer::new(show_status),
        }
    }

    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        let was_dirty = state.consume_dirty();
        let view = state.view();
        self.state = state;
        self.runner.run(effects);
        if was_dirty {
            self.renderer.render(&view);
        }
    }

    /// Handles engine events, then waits briefly for the next UI message.
    /// Returns false once every sender is gone.
    fn pump(&mut self, msg_rx: &mpsc::Receiver<Msg>) -> bool {
        for msg in self.runner.poll_engine() {
            self.dispatch(msg);
        }
        match msg_rx.recv_timeout(POLL_INTERVAL) {
            Ok(msg) => {
                self.dispatch(msg);
                true
            }
            Err(mpsc::RecvTimeoutError::Timeout) => true,
            Err(mpsc::RecvTimeoutError::Disconnected) => false,
        }
    }

    fn status(&self) -> Status {
        self.state.view().status
    }

    fn is_busy(&self) -> bool {
        matches!(self.status(), Status::Waiting | Status::Converting { .. })
    }
}

fn run_once(mut session: Session, msg_rx: &mpsc::Receiver<Msg>, text: String) -> ExitCode {
    session.dispatch(Msg::InputChanged(text));
    session.dispatch(Msg::ConvertClicked);

    while matches!(session.status(), Status::Converting { .. }) {
        if session.runner.engine_stopped() {
            engine_error!("Conversion engine stopped before the request finished");
            eprintln!("Conversion engine is not running.");
            return ExitCode::FAILURE;
        }
        if !session.pump(msg_rx) {
            break;
        }
    }

    let view = session.state.view();
    match (&view.status, &view.output) {
        (Status::Converted { .. }, Some(bibtex)) => {
            if session.runner.has_bib_file() {
                session.runner.save_entry(bibtex);
            }
            ExitCode::SUCCESS
        }
        (Status::Failed { message }, _) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
        _ => {
            eprintln!("Nothing to convert.");
            ExitCode::SUCCESS
        }
    }
}

fn run_interactive(
    mut session: Session,
    msg_rx: &mpsc::Receiver<Msg>,
    input_closed: &AtomicBool,
) {
    session.renderer.render(&session.state.view());
    while session.pump(msg_rx) {
        if session.runner.engine_stopped() {
            engine_error!("Conversion engine stopped; exiting");
            eprintln!("Conversion engine is not running.");
            break;
        }
        if input_closed.load(Ordering::SeqCst) && !session.is_busy() {
            break;
        }
    }
    engine_info!("Input closed; exiting");
}

fn spawn_stdin_reader(msg_tx: mpsc::Sender<Msg>, input_closed: Arc<AtomicBool>) {
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            let msg = match line.trim() {
                ":quit" | ":q" => break,
                ":convert" => Msg::ConvertClicked,
                ":save" => Msg::CopyClicked,
                ":clear" => Msg::ClearClicked,
                _ => Msg::InputChanged(line),
            };
            if msg_tx.send(msg).is_err() {
                break;
            }
        }
        input_closed.store(true, Ordering::SeqCst);
        let _ = msg_tx.send(Msg::Tick);
    });
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::process::ExitCode;
    use std::sync::{mpsc, Arc};

    use apa2bib_engine::{
        ClientSettings, Converter, ConverterSettings, EngineHandle, ReqwestCompletionClient,
    };

    use super::{run_once, EffectRunner, Session};

    #[test]
    fn once_mode_fails_when_engine_cannot_start() {
        let client = ReqwestCompletionClient::new(ClientSettings::default()).unwrap();
        let settings = ConverterSettings {
            api_key: Some("key".to_string()),
            ..ConverterSettings::default()
        };
        let engine = EngineHandle::with_runtime(Converter::new(settings, Arc::new(client)), || {
            Err(io::Error::other("no runtime"))
        });
        let (msg_tx, msg_rx) = mpsc::channel();
        let runner = EffectRunner::new(engine, msg_tx, None);

        let code = run_once(
            Session::new(runner, false),
            &msg_rx,
            "Smith, J. (2020). A study of things.".to_string(),
        );

        assert_eq!(code, ExitCode::FAILURE);
    }
}
