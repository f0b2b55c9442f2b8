//! apa2bib engine: conversion orchestration and the completion client.
mod cache;
mod clean;
mod completion;
mod converter;
mod engine;
mod persist;
mod prompt;
mod timer;
mod types;

pub use cache::ConversionCache;
pub use clean::clean_response;
pub use completion::{
    classify_status, ClientSettings, CompletionClient, CompletionRequest,
    ReqwestCompletionClient, DEFAULT_BASE_URL, DEFAULT_MODEL,
};
pub use converter::{
    Admission, CallSlot, ChannelProgressSink, Converter, ConverterSettings, NullProgressSink, ProgressSink,
};
pub use engine::EngineHandle;
pub use persist::{BibFileWriter, PersistError};
pub use prompt::{
    build_prompt, resolve_prompt, FilePromptSource, PromptError, PromptSource,
    StaticPromptSource, DEFAULT_PROMPT_LOAD_TIMEOUT, FALLBACK_PROMPT,
};
pub use timer::{BackoffPolicy, Timer, TokioTimer};
pub use types::{
    ConversionError, ConversionOutcome, ConversionProgress, EngineEvent, FailureKind, RequestId,
    Stage,
};
