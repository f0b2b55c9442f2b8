//! apa2bib core: pure input-gate state machine and view-model helpers.
mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use state::{AppState, ConversionResult, RequestId, Revision, Status, DEBOUNCE_QUIET_PERIOD};
pub use update::update;
pub use view_model::AppViewModel;
