use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use engine_logging::{engine_debug, engine_error};
use tokio::runtime::Runtime;

use crate::converter::{Admission, CallSlot, ChannelProgressSink, Converter};
use crate::{EngineEvent, RequestId};

enum EngineCommand {
    Convert { request_id: RequestId, text: String },
    Cancel,
}

/// Runs a [`Converter`] on a background tokio runtime.
///
/// Completions of superseded requests are never published. A request that
/// is settled without the network (blank, unconfigured, cached) does not
/// supersede anything, so callers still match completions by request id.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    stopped: Arc<AtomicBool>,
}

impl EngineHandle {
    pub fn new(converter: Converter) -> Self {
        Self::with_runtime(converter, Runtime::new)
    }

    /// Like [`EngineHandle::new`], with the runtime built by `build_runtime`
    /// on the engine thread.
    pub fn with_runtime<F>(converter: Converter, build_runtime: F) -> Self
    where
        F: FnOnce() -> io::Result<Runtime> + Send + 'static,
    {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let converter = Arc::new(converter);
        let stopped = Arc::new(AtomicBool::new(false));

        let thread_stopped = stopped.clone();
        thread::spawn(move || {
            let runtime = match build_runtime() {
                Ok(runtime) => runtime,
                Err(err) => {
                    engine_error!("failed to start engine runtime: {}", err);
                    thread_stopped.store(true, Ordering::SeqCst);
                    return;
                }
            };
            while let Ok(command) = cmd_rx.recv() {
                let converter = converter.clone();
                let event_tx = event_tx.clone();
                match command {
                    EngineCommand::Convert { request_id, text } => {
                        // Admit here, in submission order, not inside the task.
                        let sink = ChannelProgressSink::new(event_tx.clone());
                        match converter.admit(request_id, &text, &sink) {
                            Admission::Settled(outcome) => {
                                let _ = event_tx.send(EngineEvent::ConversionCompleted {
                                    request_id,
                                    outcome,
                                });
                            }
                            Admission::Claimed(slot) => {
                                runtime.spawn(async move {
                                    handle_convert(converter.as_ref(), slot, request_id, event_tx)
                                        .await;
                                });
                            }
                        }
                    }
                    EngineCommand::Cancel => converter.cancel(),
                }
            }
            thread_stopped.store(true, Ordering::SeqCst);
        });

        Self {
            cmd_tx,
            event_rx,
            stopped,
        }
    }

    /// True once the engine thread has exited; nothing submitted after that
    /// will complete.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn submit(&self, request_id: RequestId, text: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::Convert {
            request_id,
            text: text.into(),
        });
    }

    pub fn cancel(&self) {
        let _ = self.cmd_tx.send(EngineCommand::Cancel);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}

async fn handle_convert(
    converter: &Converter,
    slot: CallSlot,
    request_id: RequestId,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let sink = ChannelProgressSink::new(event_tx.clone());
    let outcome = converter.convert_claimed(slot, request_id, &sink).await;
    if outcome.is_superseded() {
        engine_debug!("dropping superseded request {}", request_id);
        return;
    }
    let _ = event_tx.send(EngineEvent::ConversionCompleted {
        request_id,
        outcome,
    });
}
