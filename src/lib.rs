pub mod slot;
pub mod host;
pub mod ledger;
pub mod window;
pub mod engine;
pub mod validate;
pub mod events;
pub mod list;
pub mod tree;
pub mod config;
pub mod script;
pub mod error;

// Export layout bookkeeping
pub use slot::{Extent, HeightState, OffsetState, Slot, SlotStore};
pub use ledger::OffsetLedger;
pub use window::{Viewport, WindowDelta, WindowManager};
pub use engine::Engine;

// Export host capabilities
pub use host::{AllSelectable, FnHost, HostStats, ItemHost, MeasureHost, Measurable, RecordingHost, Selectable};

// Export containers
pub use list::VirtualList;
pub use tree::{NodeId, VirtualTree};
pub use events::{EventQueue, ListEvent, TreeEvent};

// Export configuration, scripts and errors
pub use config::EngineConfig;
pub use script::{apply_list_op, replay, Op, ReplayReport, Script, Target, TreeReplay};
pub use error::{ConfigError, ScriptError};
pub use validate::{validate_store, InvariantViolation};
