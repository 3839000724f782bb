//! Sub-command dispatch and routing for chat-style command frameworks.
//!
//! `switchboard-dispatch` resolves an inbound message against a declared
//! set of sub-commands and drives typed argument binding and handler
//! invocation. It is transport-agnostic: anything that can produce a
//! [`Message`] (plain text plus opaque rich elements) can dispatch.
//!
//! # Pipeline
//!
//! ```text
//! inbound message
//!   → flatten          (text split on spaces, rich elements opaque)
//!   → longest match    (baked multi-word names, case-insensitive)
//!   → bind arguments   (positional, typed, all-or-nothing)
//!   → invoke handler   (async; Handled / Unhandled outcome)
//! ```
//!
//! When no registered name prefixes the input, the default sub-command
//! receives the entire original message instead.
//!
//! # Building a table
//!
//! Declarations are validated as a whole and baked into an immutable
//! [`DispatchTable`]; a bad definition (duplicate identifiers, illegal
//! name characters, misordered optionals, unknown argument types) fails
//! the build and no dispatch ever runs over it.
//!
//! ```rust,ignore
//! let table = DispatchTable::build(
//!     "Backup management",
//!     vec![
//!         SubCommandSpec::new("list", list_handler)
//!             .description("list backups")
//!             .param(CommandParam::optional("page", ArgType::INT)),
//!         SubCommandSpec::new("save", save_handler)
//!             .name("save here")
//!             .param(CommandParam::required("target", ArgType::STRING)),
//!     ],
//!     DefaultSubCommand::unhandled(permission),
//!     &UsageStyle::default(),
//!     registry,
//! )?;
//! table.dispatch(caller, &Message::text("save here vault-1")).await?;
//! ```
//!
//! The `switchboard` crate layers the composite-command builder, lazy
//! table construction, permission gating, and the built-in parser set on
//! top of this core.

mod args;
mod descriptor;
mod dispatch;
mod handler;
mod index;
mod message;
mod permission;
mod usage;

pub use args::{ArgType, ArgValue, Args, ArgumentParser, ParseFailure, ParserRegistry};

pub use descriptor::{
    bake_sub_name, is_valid_sub_name, BuildError, CommandParam, DefaultSubCommand,
    SubCommandDescriptor, SubCommandSpec,
};

pub use dispatch::{DispatchError, DispatchTable, Resolution};

pub use handler::{
    Caller, DefaultHandler, FnDefaultHandler, FnHandler, IntoOutcome, Outcome, SubCommandHandler,
};

pub use index::NameIndex;

pub use message::{flatten, Message, Segment, Token};

pub use permission::{AllowAll, Permission, PermissionGate};

pub use usage::{render_usage, UsageStyle};
