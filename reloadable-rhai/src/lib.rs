//! # reloadable-rhai
//!
//! Rhai scripts as reloadable units. A script file defines either a function
//! (`fn area(w, h) { w * h }`) or a class, which is an object map whose
//! function-pointer members are its methods:
//!
//! ```rhai
//! fn describe() { `${this.sides} sides` }
//! let Shape = #{ sides: 4, describe: Fn("describe") };
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use reloadable_rhai::{ReloadableFunction, RhaiProvider};
//!
//! # fn demo() -> Result<(), reloadable_rhai::ScriptError> {
//! let provider = RhaiProvider::default();
//! let area = ReloadableFunction::load("area", "scripts/area.rhai", &provider)?;
//! area.unit().start_on_modified_update()?;
//! let value = area.call((3_i64, 4_i64))?;
//! println!("area = {value}");
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod handle;
pub mod provider;
pub mod script;

pub use engine::{build_engine, ScriptEngineConfig};
pub use error::ScriptError;
pub use handle::{ClassInstance, ReloadableClass, ReloadableFunction};
pub use provider::RhaiProvider;
pub use script::{ScriptClass, ScriptFunction, ScriptUnit};
