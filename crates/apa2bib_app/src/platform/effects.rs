use std::sync::mpsc;
use std::thread;

use apa2bib_core::{ConversionResult, Effect, Msg};
use apa2bib_engine::{BibFileWriter, ConversionOutcome, EngineEvent, EngineHandle, Stage};
use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};

/// Executes core effects against the engine and the terminal.
pub struct EffectRunner {
    engine: EngineHandle,
    msg_tx: mpsc::Sender<Msg>,
    bib_writer: Option<BibFileWriter>,
}

impl EffectRunner {
    pub fn new(
        engine: EngineHandle,
        msg_tx: mpsc::Sender<Msg>,
        bib_writer: Option<BibFileWriter>,
    ) -> Self {
        Self {
            engine,
            msg_tx,
            bib_writer,
        }
    }

    pub fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ScheduleDebounce { revision, delay } => {
                    let msg_tx = self.msg_tx.clone();
                    thread::spawn(move || {
                        thread::sleep(delay);
                        let _ = msg_tx.send(Msg::DebounceElapsed { revision });
                    });
                }
                Effect::Convert { request_id, text } => {
                    engine_info!("Convert request_id={} input_len={}", request_id, text.len());
                    self.engine.submit(request_id, text);
                }
                Effect::CancelConversion => {
                    engine_debug!("Cancelling live conversion");
                    self.engine.cancel();
                }
                Effect::CopyOutput(bibtex) => self.save_entry(&bibtex),
            }
        }
    }

    pub fn engine_stopped(&self) -> bool {
        self.engine.is_stopped()
    }

    pub fn has_bib_file(&self) -> bool {
        self.bib_writer.is_some()
    }

    /// Saves an entry to the `.bib` file, or prints it when none is configured.
    pub fn save_entry(&self, bibtex: &str) {
        match &self.bib_writer {
            Some(writer) => match writer.append(bibtex) {
                Ok(()) => eprintln!("Saved entry to {}", writer.path().display()),
                Err(err) => {
                    engine_error!("Failed to save entry to {:?}: {}", writer.path(), err);
                    eprintln!("Could not save entry: {err}");
                }
            },
            None => println!("{bibtex}"),
        }
    }

    /// Drains engine events, translated into core messages.
    pub fn poll_engine(&self) -> Vec<Msg> {
        let mut msgs = Vec::new();
        while let Some(event) = self.engine.try_recv() {
            if let Some(msg) = map_event(event) {
                msgs.push(msg);
            }
        }
        msgs
    }
}

fn map_event(event: EngineEvent) -> Option<Msg> {
    match event {
        EngineEvent::Progress(progress) => match progress.stage {
            Stage::Requesting { attempt } => Some(Msg::AttemptStarted {
                request_id: progress.request_id,
                attempt,
            }),
            Stage::CacheHit | Stage::BackingOff { .. } | Stage::Done => None,
        },
        EngineEvent::ConversionCompleted {
            request_id,
            outcome,
        } => map_outcome(outcome).map(|result| Msg::ConversionFinished { request_id, result }),
    }
}

fn map_outcome(outcome: ConversionOutcome) -> Option<ConversionResult> {
    match outcome {
        ConversionOutcome::Converted { bibtex, from_cache } => {
            Some(ConversionResult::Converted { bibtex, from_cache })
        }
        ConversionOutcome::NothingToConvert => Some(ConversionResult::NothingToConvert),
        ConversionOutcome::Failed(err) => {
            engine_warn!("Conversion failed: {}", err);
            Some(ConversionResult::Failed {
                message: err.user_message(),
            })
        }
        ConversionOutcome::Superseded => None,
    }
}
