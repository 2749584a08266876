//! Typed handles over script units. Every call goes through the unit's
//! current implementation, so callers holding a handle see reloads.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use rhai::{Dynamic, FuncArgs, Map};

use reloadable_core::{ReloadError, UnitKind, UnitName};
use reloadable_runtime::Reloadable;

use crate::error::ScriptError;
use crate::provider::RhaiProvider;
use crate::script::ScriptUnit;

fn expect_kind(unit: &Reloadable<ScriptUnit>, expected: UnitKind) -> Result<(), ScriptError> {
    if unit.kind() != expected {
        return Err(ReloadError::KindMismatch {
            name: unit.name().clone(),
            expected,
            found: unit.kind(),
        }
        .into());
    }
    Ok(())
}

/// A reloadable script function.
#[derive(Debug, Clone)]
pub struct ReloadableFunction {
    unit: Arc<Reloadable<ScriptUnit>>,
}

impl ReloadableFunction {
    /// Fails with `KindMismatch` if `unit` holds a class.
    pub fn new(unit: Arc<Reloadable<ScriptUnit>>) -> Result<Self, ScriptError> {
        expect_kind(&unit, UnitKind::Function)?;
        Ok(Self { unit })
    }

    pub fn load(
        name: impl Into<UnitName>,
        path: impl Into<PathBuf>,
        provider: &RhaiProvider,
    ) -> Result<Self, ScriptError> {
        Self::new(Reloadable::load(name, path, provider.clone())?)
    }

    pub fn call(&self, args: impl FuncArgs) -> Result<Dynamic, ScriptError> {
        let current = self.unit.current();
        let function = current
            .as_function()
            .ok_or_else(|| ScriptError::NotAFunction(self.unit.name().clone()))?;
        function.call(args)
    }

    pub fn unit(&self) -> &Arc<Reloadable<ScriptUnit>> {
        &self.unit
    }
}

/// A reloadable script class.
#[derive(Debug, Clone)]
pub struct ReloadableClass {
    unit: Arc<Reloadable<ScriptUnit>>,
}

impl ReloadableClass {
    /// Fails with `KindMismatch` if `unit` holds a function.
    pub fn new(unit: Arc<Reloadable<ScriptUnit>>) -> Result<Self, ScriptError> {
        expect_kind(&unit, UnitKind::Class)?;
        Ok(Self { unit })
    }

    pub fn load(
        name: impl Into<UnitName>,
        path: impl Into<PathBuf>,
        provider: &RhaiProvider,
    ) -> Result<Self, ScriptError> {
        Self::new(Reloadable::load(name, path, provider.clone())?)
    }

    /// New instance whose state starts as a copy of the class's current
    /// field defaults.
    pub fn instantiate(&self) -> Result<ClassInstance, ScriptError> {
        let current = self.unit.current();
        let class = current
            .as_class()
            .ok_or_else(|| ScriptError::NotAClass(self.unit.name().clone()))?;
        Ok(ClassInstance {
            class: self.clone(),
            state: Mutex::new(Dynamic::from_map(class.fields())),
        })
    }

    pub fn unit(&self) -> &Arc<Reloadable<ScriptUnit>> {
        &self.unit
    }
}

/// An instance of a [`ReloadableClass`].
///
/// Holds its own state but no methods: every method call and every read of
/// a field the instance never set resolves against the class's current
/// implementation, so instances created before a reload use the new code.
#[derive(Debug)]
pub struct ClassInstance {
    class: ReloadableClass,
    state: Mutex<Dynamic>,
}

impl ClassInstance {
    pub fn call(&self, method: &str, args: Vec<Dynamic>) -> Result<Dynamic, ScriptError> {
        let current = self.class.unit.current();
        let class = current
            .as_class()
            .ok_or_else(|| ScriptError::NotAClass(self.class.unit.name().clone()))?;
        let mut state = self.state.lock();
        class.call_method(&mut state, method, args)
    }

    pub fn get(&self, field: &str) -> Option<Dynamic> {
        let own = self
            .state
            .lock()
            .read_lock::<Map>()
            .and_then(|map| map.get(field).cloned());
        own.or_else(|| {
            let current = self.class.unit.current();
            current
                .as_class()
                .and_then(|class| class.member(field))
                .filter(|member| !member.is_fnptr())
                .cloned()
        })
    }

    /// Fails with `StateNotAMap` once a method has replaced `this` with a
    /// value that has no fields.
    pub fn set(&self, field: &str, value: Dynamic) -> Result<(), ScriptError> {
        let mut state = self.state.lock();
        if let Some(mut map) = state.write_lock::<Map>() {
            map.insert(field.into(), value);
            return Ok(());
        }
        tracing::warn!(
            class = %self.class.unit.name(),
            field,
            state_type = state.type_name(),
            "instance state is not a map; field not set",
        );
        Err(ScriptError::StateNotAMap {
            class: self.class.unit.name().clone(),
            field: field.to_string(),
        })
    }

    pub fn state(&self) -> Dynamic {
        self.state.lock().clone()
    }

    pub fn class(&self) -> &ReloadableClass {
        &self.class
    }
}
