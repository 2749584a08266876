//! Compiled script members bound to a unit.

use std::fmt;
use std::sync::Arc;

use rhai::{CallFnOptions, Dynamic, Engine, FnPtr, FuncArgs, Map, Scope, AST};

use reloadable_core::{UnitImplementation, UnitKind, UnitName};

use crate::error::{call_err, ScriptError};

/// One implementation of a script unit, produced by a single reload.
pub enum ScriptUnit {
    Function(ScriptFunction),
    Class(ScriptClass),
}

impl ScriptUnit {
    pub fn as_function(&self) -> Option<&ScriptFunction> {
        match self {
            ScriptUnit::Function(function) => Some(function),
            ScriptUnit::Class(_) => None,
        }
    }

    pub fn as_class(&self) -> Option<&ScriptClass> {
        match self {
            ScriptUnit::Class(class) => Some(class),
            ScriptUnit::Function(_) => None,
        }
    }
}

impl UnitImplementation for ScriptUnit {
    fn kind(&self) -> UnitKind {
        match self {
            ScriptUnit::Function(_) => UnitKind::Function,
            ScriptUnit::Class(_) => UnitKind::Class,
        }
    }
}

impl fmt::Debug for ScriptUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptUnit::Function(function) => write!(f, "ScriptUnit::Function({})", function.name),
            ScriptUnit::Class(class) => write!(f, "ScriptUnit::Class({})", class.name),
        }
    }
}

/// A script-defined function.
pub struct ScriptFunction {
    engine: Arc<Engine>,
    ast: Arc<AST>,
    name: UnitName,
}

impl ScriptFunction {
    pub(crate) fn new(engine: Arc<Engine>, ast: Arc<AST>, name: UnitName) -> Self {
        Self { engine, ast, name }
    }

    pub fn name(&self) -> &UnitName {
        &self.name
    }

    /// Call the function. The script's top-level statements are not re-run.
    pub fn call(&self, args: impl FuncArgs) -> Result<Dynamic, ScriptError> {
        self.engine
            .call_fn_with_options::<Dynamic>(
                CallFnOptions::new().eval_ast(false),
                &mut Scope::new(),
                &self.ast,
                self.name.as_str(),
                args,
            )
            .map_err(|e| call_err(self.name.as_str(), e))
    }
}

/// A script-defined object map. Function-pointer members are methods, all
/// other members are field defaults for new instances.
pub struct ScriptClass {
    engine: Arc<Engine>,
    ast: Arc<AST>,
    name: UnitName,
    members: Map,
}

impl ScriptClass {
    pub(crate) fn new(engine: Arc<Engine>, ast: Arc<AST>, name: UnitName, members: Map) -> Self {
        Self {
            engine,
            ast,
            name,
            members,
        }
    }

    pub fn name(&self) -> &UnitName {
        &self.name
    }

    pub fn member(&self, name: &str) -> Option<&Dynamic> {
        self.members.get(name)
    }

    pub fn fields(&self) -> Map {
        self.members
            .iter()
            .filter(|(_, value)| !value.is_fnptr())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn method_names(&self) -> Vec<String> {
        self.members
            .iter()
            .filter(|(_, value)| value.is_fnptr())
            .map(|(key, _)| key.to_string())
            .collect()
    }

    /// Call `method` with `this` bound to `this`. Curried arguments of the
    /// method's function pointer come before `args`.
    pub fn call_method(
        &self,
        this: &mut Dynamic,
        method: &str,
        args: Vec<Dynamic>,
    ) -> Result<Dynamic, ScriptError> {
        let fn_ptr = self
            .members
            .get(method)
            .and_then(|member| member.clone().try_cast::<FnPtr>())
            .ok_or_else(|| ScriptError::MethodMissing {
                class: self.name.clone(),
                method: method.to_string(),
            })?;

        let mut call_args: Vec<Dynamic> = fn_ptr.curry().to_vec();
        call_args.extend(args);
        let options = CallFnOptions::new().eval_ast(false).bind_this_ptr(this);
        self.engine
            .call_fn_with_options::<Dynamic>(
                options,
                &mut Scope::new(),
                &self.ast,
                fn_ptr.fn_name(),
                call_args,
            )
            .map_err(|e| call_err(format!("{}.{method}", self.name), e))
    }
}
