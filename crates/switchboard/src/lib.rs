//! Composite chat commands: multi-word routing with typed argument
//! binding.
//!
//! `switchboard` is the front crate over [`switchboard-dispatch`]. It
//! provides the declarative [`CompositeCommand`] builder, lazy dispatch
//! table construction (idempotent under concurrent first use), permission
//! gating, and a built-in argument parser set, and re-exports the core
//! routing types.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use switchboard::{
//!     ArgType, ArgValue, Args, Caller, CommandParam, CompositeCommand, FnHandler, Message,
//!     SubCommandSpec,
//! };
//!
//! struct Console;
//!
//! impl Caller for Console {
//!     fn name(&self) -> &str {
//!         "console"
//!     }
//! }
//!
//! # async fn run() -> anyhow::Result<()> {
//! let command = CompositeCommand::builder("backup")
//!     .description("Backup management")
//!     .sub(
//!         SubCommandSpec::new("save", FnHandler::new(
//!             |_caller: Arc<dyn Caller>, args: Args| async move {
//!                 let target = args.get("target").and_then(ArgValue::as_str);
//!                 target.is_some()
//!             },
//!         ))
//!         .name("save here")
//!         .description("save a backup")
//!         .param(CommandParam::required("target", ArgType::STRING)),
//!     )
//!     .build();
//!
//! let outcome = command
//!     .dispatch(Arc::new(Console), &Message::text("save here vault-1"))
//!     .await?;
//! assert!(outcome.is_handled());
//! # Ok(())
//! # }
//! ```
//!
//! [`switchboard-dispatch`]: switchboard_dispatch

mod builder;
mod parsers;

pub use builder::{CompositeCommand, CompositeCommandBuilder};

pub use parsers::{
    default_registry, BoolParser, ElementParser, FloatParser, IntParser, RemainderParser,
    StringParser,
};

// Core routing types, re-exported for hosts that only depend on this
// crate.
pub use switchboard_dispatch::{
    bake_sub_name, flatten, is_valid_sub_name, render_usage, AllowAll, ArgType, ArgValue, Args,
    ArgumentParser, BuildError, Caller, CommandParam, DefaultHandler, DefaultSubCommand,
    DispatchError, DispatchTable, FnDefaultHandler, FnHandler, IntoOutcome, Message, NameIndex,
    Outcome, ParseFailure, ParserRegistry, Permission, PermissionGate, Resolution, Segment,
    SubCommandDescriptor, SubCommandHandler, SubCommandSpec, Token, UsageStyle,
};
