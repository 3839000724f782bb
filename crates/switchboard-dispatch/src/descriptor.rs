//! Sub-command declarations, validation, and built descriptors.
//!
//! A [`SubCommandSpec`] is what the host declares: an identifier, optional
//! name variants, a positional parameter list, and a handler. The builder
//! validates the whole set at once and produces immutable
//! [`SubCommandDescriptor`]s with pre-tokenized ("baked") name variants.
//! Any violation aborts the entire build; a base command with a bad
//! definition never dispatches.

use crate::args::{ArgType, ParserRegistry};
use crate::handler::{Caller, DefaultHandler, Outcome, SubCommandHandler};
use crate::message::Message;
use crate::permission::Permission;
use crate::usage::{render_line, UsageStyle};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Characters that may not appear in a declared name variant.
const ILLEGAL_NAME_CHARS: &str = "\\/!@#$%^&*()_+-={}[];':\",.<>?`~";

/// Returns whether a declared name variant uses only allowed characters.
pub fn is_valid_sub_name(name: &str) -> bool {
    !name.chars().any(|c| ILLEGAL_NAME_CHARS.contains(c))
}

/// Splits a name variant into its baked token sequence: lowercased,
/// space-delimited, blank pieces dropped.
pub fn bake_sub_name(name: &str) -> Vec<String> {
    name.split(' ')
        .filter(|piece| !piece.chars().all(char::is_whitespace))
        .map(str::to_lowercase)
        .collect()
}

/// A configuration error in a declared handler set.
///
/// Fatal: reported at build time (first use) and no dispatch proceeds.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("sub-command overloading is not supported (at {ident})")]
    Overload { ident: String },

    #[error("name {name:?} of sub-command {ident} contains illegal characters")]
    InvalidName { ident: String, name: String },

    #[error("name {name:?} of sub-command {ident} bakes to no tokens")]
    EmptyName { ident: String, name: String },

    #[error("required parameter '{parameter}' of sub-command {ident} follows an optional one")]
    RequiredAfterOptional { ident: String, parameter: String },

    #[error("parameter '{parameter}' of sub-command {ident} has no parser for type '{ty}'")]
    UnknownArgType {
        ident: String,
        parameter: String,
        ty: ArgType,
    },

    #[error("baked name {name:?} is registered by more than one sub-command")]
    DuplicateName { name: String },
}

/// A positional parameter: a reported name and a type handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandParam {
    pub name: String,
    pub ty: ArgType,
    pub optional: bool,
}

impl CommandParam {
    /// A required positional parameter.
    pub fn required(name: impl Into<String>, ty: ArgType) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
        }
    }

    /// An optional positional parameter. Only valid as a trailing suffix.
    pub fn optional(name: impl Into<String>, ty: ArgType) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: true,
        }
    }
}

/// One declared handler: the input to the descriptor builder.
#[derive(Clone)]
pub struct SubCommandSpec {
    ident: String,
    names: Vec<String>,
    params: Vec<CommandParam>,
    description: String,
    permission: Option<Permission>,
    handler: Arc<dyn SubCommandHandler>,
}

impl SubCommandSpec {
    /// Declares a handler under the given identifier.
    ///
    /// Without explicit [`name`](Self::name) overrides the lowercased
    /// identifier becomes the single name variant.
    pub fn new(ident: impl Into<String>, handler: impl SubCommandHandler + 'static) -> Self {
        Self {
            ident: ident.into(),
            names: Vec::new(),
            params: Vec::new(),
            description: String::new(),
            permission: None,
            handler: Arc::new(handler),
        }
    }

    /// Adds a name variant (may contain spaces for multi-word names).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    /// Appends a positional parameter.
    pub fn param(mut self, param: CommandParam) -> Self {
        self.params.push(param);
        self
    }

    /// Sets the description shown in usage output.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Overrides the permission carried by this sub-command.
    ///
    /// Without an override the sub-command inherits the base command's
    /// permission.
    pub fn permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }

    /// The declared identifier.
    pub fn ident(&self) -> &str {
        &self.ident
    }
}

impl fmt::Debug for SubCommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubCommandSpec")
            .field("ident", &self.ident)
            .field("names", &self.names)
            .field("params", &self.params)
            .field("description", &self.description)
            .field("permission", &self.permission)
            .finish_non_exhaustive()
    }
}

/// An immutable, validated sub-command record.
///
/// Built once per base command; shared read-only across concurrent
/// dispatches.
pub struct SubCommandDescriptor {
    names: Vec<String>,
    baked_names: Vec<Vec<String>>,
    params: Vec<CommandParam>,
    description: String,
    permission: Permission,
    min_args: usize,
    usage: String,
    handler: Arc<dyn SubCommandHandler>,
}

impl SubCommandDescriptor {
    /// Name variants, lowercased, in declaration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// The first declared name variant.
    pub fn primary_name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or_default()
    }

    /// Baked token sequences, one per name variant.
    pub fn baked_names(&self) -> &[Vec<String>] {
        &self.baked_names
    }

    /// Positional parameters in declaration order.
    pub fn params(&self) -> &[CommandParam] {
        &self.params
    }

    /// Description shown in usage output.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The capability requirement carried by this sub-command.
    pub fn permission(&self) -> &Permission {
        &self.permission
    }

    /// Number of required (non-optional) parameters; calls supplying fewer
    /// tokens are rejected before any parsing happens.
    pub fn min_args(&self) -> usize {
        self.min_args
    }

    /// The rendered usage line for this sub-command.
    pub fn usage(&self) -> &str {
        &self.usage
    }

    /// Invokes the handler with the caller and bound arguments.
    pub async fn invoke(
        &self,
        caller: Arc<dyn Caller>,
        args: crate::args::Args,
    ) -> anyhow::Result<Outcome> {
        self.handler.invoke(caller, args).await
    }
}

impl fmt::Debug for SubCommandDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubCommandDescriptor")
            .field("names", &self.names)
            .field("params", &self.params)
            .field("min_args", &self.min_args)
            .field("permission", &self.permission)
            .finish_non_exhaustive()
    }
}

/// The fallback invoked when no baked name matches any prefix of the
/// input. Receives the entire unconsumed message instead of bound
/// arguments.
#[derive(Clone)]
pub struct DefaultSubCommand {
    permission: Permission,
    handler: Arc<dyn DefaultHandler>,
}

impl DefaultSubCommand {
    /// Creates a default sub-command with the given fallback handler.
    pub fn new(permission: Permission, handler: impl DefaultHandler + 'static) -> Self {
        Self::from_arc(permission, Arc::new(handler))
    }

    /// Creates a default sub-command from an already-shared handler.
    pub fn from_arc(permission: Permission, handler: Arc<dyn DefaultHandler>) -> Self {
        Self {
            permission,
            handler,
        }
    }

    /// A default sub-command that declines every call, so unmatched input
    /// surfaces as [`Outcome::Unhandled`].
    pub fn unhandled(permission: Permission) -> Self {
        Self::new(permission, DeclineAll)
    }

    /// The capability requirement carried by the fallback.
    pub fn permission(&self) -> &Permission {
        &self.permission
    }

    /// Invokes the fallback with the full remainder.
    pub async fn invoke(
        &self,
        caller: Arc<dyn Caller>,
        remainder: Message,
    ) -> anyhow::Result<Outcome> {
        self.handler.invoke(caller, remainder).await
    }
}

impl fmt::Debug for DefaultSubCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultSubCommand")
            .field("permission", &self.permission)
            .finish_non_exhaustive()
    }
}

struct DeclineAll;

#[async_trait]
impl DefaultHandler for DeclineAll {
    async fn invoke(&self, _caller: Arc<dyn Caller>, _remainder: Message) -> anyhow::Result<Outcome> {
        Ok(Outcome::Unhandled)
    }
}

/// Validates a declared handler set and produces its descriptors.
///
/// Specs without a permission override inherit `fallback_permission`.
/// Fails fast on the first violation; the caller must not dispatch over a
/// partially validated set.
pub(crate) fn build_descriptors(
    specs: Vec<SubCommandSpec>,
    fallback_permission: &Permission,
    registry: &ParserRegistry,
    style: &UsageStyle,
) -> Result<Vec<Arc<SubCommandDescriptor>>, BuildError> {
    let mut seen_idents: HashSet<String> = HashSet::new();
    let mut descriptors = Vec::with_capacity(specs.len());

    for spec in specs {
        if !seen_idents.insert(spec.ident.clone()) {
            return Err(BuildError::Overload { ident: spec.ident });
        }

        let names: Vec<String> = if spec.names.is_empty() {
            vec![spec.ident.to_lowercase()]
        } else {
            spec.names.iter().map(|name| name.to_lowercase()).collect()
        };

        let mut baked_names = Vec::with_capacity(names.len());
        for name in &names {
            if !is_valid_sub_name(name) {
                return Err(BuildError::InvalidName {
                    ident: spec.ident,
                    name: name.clone(),
                });
            }
            let baked = bake_sub_name(name);
            if baked.is_empty() {
                return Err(BuildError::EmptyName {
                    ident: spec.ident,
                    name: name.clone(),
                });
            }
            baked_names.push(baked);
        }

        let mut optional_seen = false;
        for param in &spec.params {
            if param.optional {
                optional_seen = true;
            } else if optional_seen {
                return Err(BuildError::RequiredAfterOptional {
                    ident: spec.ident,
                    parameter: param.name.clone(),
                });
            }
            if !registry.contains(&param.ty) {
                return Err(BuildError::UnknownArgType {
                    ident: spec.ident,
                    parameter: param.name.clone(),
                    ty: param.ty.clone(),
                });
            }
        }

        let min_args = spec.params.iter().filter(|param| !param.optional).count();
        let primary = names.first().map(String::as_str).unwrap_or_default();
        let usage = render_line(primary, &spec.params, &spec.description, style);

        descriptors.push(Arc::new(SubCommandDescriptor {
            names,
            baked_names,
            params: spec.params,
            description: spec.description,
            permission: spec.permission.unwrap_or_else(|| fallback_permission.clone()),
            min_args,
            usage,
            handler: spec.handler,
        }));
    }

    Ok(descriptors)
}
