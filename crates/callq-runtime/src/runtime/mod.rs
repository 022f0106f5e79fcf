pub mod call_queue;
pub mod conversions;
pub mod host;
pub mod supplier;

mod bindings;


pub use call_queue::{CallQueue, CallRecord};
pub use host::ScriptHost;
pub use supplier::{forward_json, ArgumentSupplier, JsonArguments, ResultCallback};
