//! Handler traits and invocation outcomes.
//!
//! A sub-command handler receives the resolved caller and the bound,
//! typed arguments; a default handler receives the whole unmatched
//! remainder instead. Both are async: handlers are free to await I/O, and
//! concurrent dispatches on the same command may run them in parallel, so
//! implementations must be `Send + Sync`.
//!
//! Handler errors are `anyhow::Error` and propagate out of dispatch
//! unchanged; the router never swallows them.

use crate::args::Args;
use crate::message::Message;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// The author of an inbound message, opaque to the router.
///
/// The router only needs a display name for diagnostics; hosts downcast or
/// wrap their own session/user types behind this trait.
pub trait Caller: Send + Sync {
    /// Display name for diagnostics and usage replies.
    fn name(&self) -> &str;
}

/// Whether an invocation considered the call handled.
///
/// `Unhandled` is a valid, non-error result: it tells the surrounding
/// system "this handler declined", distinguishable from "no name matched"
/// (which routes to the default handler instead). The router never retries
/// another candidate on `Unhandled`; that policy belongs to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Handled,
    Unhandled,
}

impl Outcome {
    /// Returns `true` for [`Outcome::Handled`].
    pub fn is_handled(&self) -> bool {
        matches!(self, Outcome::Handled)
    }
}

/// Conversion of handler return values into an [`Outcome`].
///
/// Mirrors the return contract of the declaration surface: returning
/// nothing means success, a boolean is taken as handled/not-handled, and
/// errors propagate.
pub trait IntoOutcome {
    /// Convert this value into an invocation outcome.
    fn into_outcome(self) -> anyhow::Result<Outcome>;
}

impl IntoOutcome for Outcome {
    fn into_outcome(self) -> anyhow::Result<Outcome> {
        Ok(self)
    }
}

impl IntoOutcome for () {
    fn into_outcome(self) -> anyhow::Result<Outcome> {
        Ok(Outcome::Handled)
    }
}

impl IntoOutcome for bool {
    fn into_outcome(self) -> anyhow::Result<Outcome> {
        Ok(if self {
            Outcome::Handled
        } else {
            Outcome::Unhandled
        })
    }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: IntoOutcome,
    E: Into<anyhow::Error>,
{
    fn into_outcome(self) -> anyhow::Result<Outcome> {
        self.map_err(Into::into).and_then(IntoOutcome::into_outcome)
    }
}

/// An invocable sub-command body.
#[async_trait]
pub trait SubCommandHandler: Send + Sync {
    /// Invoke the handler with the caller and the bound arguments.
    async fn invoke(&self, caller: Arc<dyn Caller>, args: Args) -> anyhow::Result<Outcome>;
}

/// The fallback body invoked when no registered name matches.
///
/// Unlike [`SubCommandHandler`] it receives the entire unconsumed message
/// rather than bound typed arguments.
#[async_trait]
pub trait DefaultHandler: Send + Sync {
    /// Invoke the fallback with the caller and the full remainder.
    async fn invoke(&self, caller: Arc<dyn Caller>, remainder: Message) -> anyhow::Result<Outcome>;
}

/// Wraps an async closure as a [`SubCommandHandler`].
///
/// The closure's return value goes through [`IntoOutcome`], so `()`,
/// `bool`, [`Outcome`], and `Result`s of those all work:
///
/// ```rust
/// use switchboard_dispatch::{Args, Caller, FnHandler};
/// use std::sync::Arc;
///
/// let handler = FnHandler::new(|_caller: Arc<dyn Caller>, args: Args| async move {
///     args.get("page").is_some()
/// });
/// # let _ = handler;
/// ```
pub struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F> {
    /// Creates a handler from an async closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut, R> SubCommandHandler for FnHandler<F>
where
    F: Fn(Arc<dyn Caller>, Args) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send,
    R: IntoOutcome,
{
    async fn invoke(&self, caller: Arc<dyn Caller>, args: Args) -> anyhow::Result<Outcome> {
        (self.f)(caller, args).await.into_outcome()
    }
}

/// Wraps an async closure as a [`DefaultHandler`].
pub struct FnDefaultHandler<F> {
    f: F,
}

impl<F> FnDefaultHandler<F> {
    /// Creates a default handler from an async closure.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut, R> DefaultHandler for FnDefaultHandler<F>
where
    F: Fn(Arc<dyn Caller>, Message) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send,
    R: IntoOutcome,
{
    async fn invoke(&self, caller: Arc<dyn Caller>, remainder: Message) -> anyhow::Result<Outcome> {
        (self.f)(caller, remainder).await.into_outcome()
    }
}
