/// Process boundary around the external classifier runner.
///
/// `command` builds argv for each mode; `invoker` runs it and captures the
/// streams without interpreting them.

pub mod command;
pub mod invoker;

pub use command::{ReportStyle, WekaCommand, resolve_classifier};
pub use invoker::{Invocation, ProcessRunner, ToolOutput, ToolRunner};
