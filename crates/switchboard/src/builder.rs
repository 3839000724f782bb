//! Composite command declaration and lazy dispatch.
//!
//! A [`CompositeCommand`] owns a declared sub-command set and builds its
//! dispatch table on first use. The build is idempotent and safe under
//! concurrent first access: exactly one build runs, other callers wait
//! and then share the immutable table. A failed build leaves nothing
//! behind, so every later call re-reports the same configuration error
//! and no dispatch ever proceeds over a bad definition.

use crate::parsers::default_registry;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use switchboard_dispatch::{
    flatten, BuildError, Caller, DefaultHandler, DefaultSubCommand, DispatchError, DispatchTable,
    Message, Outcome, ParserRegistry, Permission, PermissionGate, Resolution, SubCommandSpec,
    UsageStyle,
};
use tracing::debug;

/// A base command with named sub-commands, built declaratively.
///
/// ```rust,ignore
/// let command = CompositeCommand::builder("backup")
///     .description("Backup management")
///     .sub(
///         SubCommandSpec::new("save", save_handler)
///             .name("save here")
///             .param(CommandParam::required("target", ArgType::STRING)),
///     )
///     .build();
///
/// command.dispatch(caller, &Message::text("save here vault-1")).await?;
/// ```
pub struct CompositeCommand {
    name: String,
    description: String,
    style: UsageStyle,
    permission: Permission,
    registry: Arc<ParserRegistry>,
    gate: Option<Arc<dyn PermissionGate>>,
    specs: Vec<SubCommandSpec>,
    default: DefaultSubCommand,
    table: OnceCell<DispatchTable>,
}

impl CompositeCommand {
    /// Starts a builder for a command with the given primary name.
    pub fn builder(name: impl Into<String>) -> CompositeCommandBuilder {
        CompositeCommandBuilder::new(name)
    }

    /// The command's primary name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The command description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The command's own capability requirement.
    pub fn permission(&self) -> &Permission {
        &self.permission
    }

    /// Forces table construction, reporting any configuration error now
    /// instead of on first dispatch.
    pub fn prepare(&self) -> Result<(), BuildError> {
        self.table().map(|_| ())
    }

    /// The composite usage text, building the table if needed.
    pub fn usage(&self) -> Result<&str, BuildError> {
        self.table().map(DispatchTable::usage)
    }

    /// Dispatches an inbound message from the caller.
    ///
    /// Flattens the message, resolves it against the (lazily built)
    /// table, checks the matched descriptor's permission against the
    /// configured gate, and invokes. With no gate configured every
    /// permission is granted.
    pub async fn dispatch(
        &self,
        caller: Arc<dyn Caller>,
        message: &Message,
    ) -> Result<Outcome, DispatchError> {
        let table = self.table()?;
        let tokens = flatten(message);
        match table.resolve(&tokens)? {
            Resolution::Matched {
                descriptor, args, ..
            } => {
                self.check_permission(caller.as_ref(), descriptor.permission())?;
                descriptor
                    .invoke(caller, args)
                    .await
                    .map_err(DispatchError::Handler)
            }
            Resolution::Default(default) => {
                self.check_permission(caller.as_ref(), default.permission())?;
                default
                    .invoke(caller, message.clone())
                    .await
                    .map_err(DispatchError::Handler)
            }
        }
    }

    /// Returns the built table, building it on first call.
    ///
    /// A failed build leaves the cell empty, so the same configuration
    /// error is re-derived and re-reported on every subsequent call.
    fn table(&self) -> Result<&DispatchTable, BuildError> {
        self.table.get_or_try_init(|| {
            debug!(command = %self.name, subs = self.specs.len(), "building dispatch table");
            DispatchTable::build(
                self.description.clone(),
                self.specs.clone(),
                self.default.clone(),
                &self.style,
                Arc::clone(&self.registry),
            )
        })
    }

    fn check_permission(
        &self,
        caller: &dyn Caller,
        permission: &Permission,
    ) -> Result<(), DispatchError> {
        if let Some(gate) = &self.gate {
            if !gate.check(caller, permission) {
                return Err(DispatchError::PermissionDenied {
                    permission: permission.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Builder for [`CompositeCommand`].
pub struct CompositeCommandBuilder {
    name: String,
    description: String,
    prefix: String,
    prefix_optional: bool,
    permission: Option<Permission>,
    registry: Option<Arc<ParserRegistry>>,
    gate: Option<Arc<dyn PermissionGate>>,
    specs: Vec<SubCommandSpec>,
    default: Option<Arc<dyn DefaultHandler>>,
}

impl CompositeCommandBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: "<no description available>".to_string(),
            prefix: "/".to_string(),
            prefix_optional: false,
            permission: None,
            registry: None,
            gate: None,
            specs: Vec::new(),
            default: None,
        }
    }

    /// Sets the command description shown at the top of usage output.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the invocation prefix (default `/`).
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Marks the prefix optional; usage renders it parenthesized.
    pub fn prefix_optional(mut self, optional: bool) -> Self {
        self.prefix_optional = optional;
        self
    }

    /// Overrides the command permission
    /// (default `command.<lowercased name>`).
    pub fn permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }

    /// Replaces the parser registry (default: the built-in set).
    pub fn parsers(mut self, registry: ParserRegistry) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    /// Installs an authorization gate consulted before every invocation.
    pub fn gate(mut self, gate: impl PermissionGate + 'static) -> Self {
        self.gate = Some(Arc::new(gate));
        self
    }

    /// Declares a sub-command.
    pub fn sub(mut self, spec: SubCommandSpec) -> Self {
        self.specs.push(spec);
        self
    }

    /// Installs the fallback handler invoked when no name matches.
    /// Without one, unmatched input resolves to `Outcome::Unhandled`.
    pub fn on_default(mut self, handler: impl DefaultHandler + 'static) -> Self {
        self.default = Some(Arc::new(handler));
        self
    }

    /// Finishes the declaration.
    ///
    /// Infallible: validation happens when the table is first used (or
    /// eagerly via [`CompositeCommand::prepare`]).
    pub fn build(self) -> CompositeCommand {
        let permission = self
            .permission
            .unwrap_or_else(|| Permission::new(format!("command.{}", self.name.to_lowercase())));
        let default = match self.default {
            Some(handler) => DefaultSubCommand::from_arc(permission.clone(), handler),
            None => DefaultSubCommand::unhandled(permission.clone()),
        };
        let style = UsageStyle {
            prefix: self.prefix,
            prefix_optional: self.prefix_optional,
            primary: Some(self.name.clone()),
        };
        CompositeCommand {
            name: self.name,
            description: self.description,
            style,
            permission,
            registry: self
                .registry
                .unwrap_or_else(|| Arc::new(default_registry())),
            gate: self.gate,
            specs: self.specs,
            default,
            table: OnceCell::new(),
        }
    }
}
