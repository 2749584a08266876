//! Reload engine runtime: reloadable units, source watchers, reload timers and
//! the process-wide manager that can stop them in bulk.
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::time::Duration;
//!
//! use reloadable_core::{read_source, ReloadError, UnitImplementation, UnitKind, UnitName};
//! use reloadable_runtime::Reloadable;
//!
//! struct Greeting(String);
//!
//! impl UnitImplementation for Greeting {
//!     fn kind(&self) -> UnitKind {
//!         UnitKind::Function
//!     }
//! }
//!
//! fn provide(path: &Path, _name: &UnitName) -> Result<Greeting, ReloadError> {
//!     Ok(Greeting(read_source(path)?))
//! }
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let unit = Reloadable::load("greeting", "greeting.txt", provide)?;
//! unit.start_on_modified_update()?;
//! unit.start_periodic_update(Duration::from_secs(5))?;
//! println!("{}", unit.current().0);
//! # Ok(())
//! # }
//! ```

mod builder;
mod error;
mod handler;
mod logging;
mod manager;
mod task;
mod timer;
mod unit;
mod watcher;

pub use builder::ReloadableBuilder;
pub use error::RuntimeError;
pub use handler::{HandlerError, HandlerResult, ReloadHandler};
pub use logging::{init_json_tracing, init_tracing, init_tracing_with};
pub use manager::{ManagerStatus, ReloadableManager, TaskSummary};
pub use task::{TaskControl, TaskId, TaskKind};
pub use unit::{Reloadable, UnitStatus};
