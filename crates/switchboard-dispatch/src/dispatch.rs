//! The dispatch engine.
//!
//! A [`DispatchTable`] is the immutable product of a successful build:
//! validated descriptors, the name index over their baked names, the
//! default sub-command, the parser registry handle, and the cached usage
//! text. Tables are `Send + Sync` and shared freely; every dispatch call
//! is independent and carries no shared mutable state.
//!
//! Resolution and invocation are separate steps so a surrounding
//! dispatcher can apply permission checks between them; [`dispatch`]
//! glues them together for hosts that gate elsewhere.
//!
//! [`dispatch`]: DispatchTable::dispatch

use crate::args::{ArgValue, Args, ParseFailure, ParserRegistry};
use crate::descriptor::{
    build_descriptors, BuildError, DefaultSubCommand, SubCommandDescriptor, SubCommandSpec,
};
use crate::handler::{Caller, Outcome};
use crate::index::NameIndex;
use crate::message::{flatten, Message, Token};
use crate::permission::Permission;
use crate::usage::{render_usage, UsageStyle};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, trace};

/// A per-call dispatch failure. Never corrupts shared state; the next
/// call starts fresh.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The declared handler set is invalid; surfaced on every call until
    /// the definition is fixed.
    #[error("bad command definition: {0}")]
    Definition(#[from] BuildError),

    /// Fewer tokens remained than the matched sub-command requires.
    /// Carries the sub-command's usage line for reporting back to the
    /// caller.
    #[error("insufficient arguments for '{name}': expected at least {expected}, got {given}")]
    InsufficientArguments {
        name: String,
        expected: usize,
        given: usize,
        usage: String,
    },

    /// A parameter failed to parse; the whole call is rejected and
    /// nothing was invoked.
    #[error("cannot bind parameter '{parameter}' at position {position}: {source}")]
    Binding {
        parameter: String,
        position: usize,
        #[source]
        source: ParseFailure,
    },

    /// The gate refused the caller the descriptor's permission.
    #[error("permission '{permission}' denied")]
    PermissionDenied { permission: Permission },

    /// The handler itself failed; propagated, never swallowed.
    #[error("sub-command handler failed")]
    Handler(#[source] anyhow::Error),
}

/// What a token stream resolved to, before invocation.
#[derive(Debug)]
pub enum Resolution<'a> {
    /// A registered name matched and all arguments bound.
    Matched {
        descriptor: &'a Arc<SubCommandDescriptor>,
        args: Args,
        /// Tokens consumed by the name match.
        consumed: usize,
    },
    /// No registered name prefixes the input; route to the default
    /// sub-command with the entire original stream.
    Default(&'a DefaultSubCommand),
}

/// Immutable dispatch state for one base command.
pub struct DispatchTable {
    description: String,
    descriptors: Vec<Arc<SubCommandDescriptor>>,
    index: NameIndex,
    default: DefaultSubCommand,
    registry: Arc<ParserRegistry>,
    usage: String,
}

impl DispatchTable {
    /// Validates a declared handler set and builds the table.
    ///
    /// Sub-commands without a permission override inherit the default
    /// sub-command's permission (the base command's own requirement).
    /// Fails fast on any configuration error; no partially built table is
    /// ever observable.
    pub fn build(
        description: impl Into<String>,
        specs: Vec<SubCommandSpec>,
        default: DefaultSubCommand,
        style: &UsageStyle,
        registry: Arc<ParserRegistry>,
    ) -> Result<Self, BuildError> {
        let description = description.into();
        let descriptors = build_descriptors(specs, default.permission(), &registry, style)?;
        let index = NameIndex::build(&descriptors)?;
        let usage = render_usage(&description, &descriptors);
        debug!(
            subs = descriptors.len(),
            names = index.len(),
            "built dispatch table"
        );
        Ok(Self {
            description,
            descriptors,
            index,
            default,
            registry,
            usage,
        })
    }

    /// The base command description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> &[Arc<SubCommandDescriptor>] {
        &self.descriptors
    }

    /// The default sub-command.
    pub fn default_sub_command(&self) -> &DefaultSubCommand {
        &self.default
    }

    /// The cached composite usage text.
    pub fn usage(&self) -> &str {
        &self.usage
    }

    /// Resolves a token stream to a sub-command and binds its arguments.
    ///
    /// Pure with respect to the table: no handler runs. Binding is
    /// all-or-nothing; any parameter failure rejects the whole call.
    pub fn resolve(&self, tokens: &[Token]) -> Result<Resolution<'_>, DispatchError> {
        let Some((descriptor, consumed)) = self.index.match_prefix(tokens) else {
            trace!("no sub-command name matched, routing to default");
            return Ok(Resolution::Default(&self.default));
        };

        let remaining = &tokens[consumed..];
        debug!(
            name = %descriptor.primary_name(),
            consumed,
            remaining = remaining.len(),
            "matched sub-command"
        );

        if remaining.len() < descriptor.min_args() {
            return Err(DispatchError::InsufficientArguments {
                name: descriptor.primary_name().to_string(),
                expected: descriptor.min_args(),
                given: remaining.len(),
                usage: descriptor.usage().to_string(),
            });
        }

        let args = self.bind(descriptor, remaining)?;
        Ok(Resolution::Matched {
            descriptor,
            args,
            consumed,
        })
    }

    /// Flattens, resolves, and invokes in one step.
    ///
    /// The default sub-command receives the entire original message. A
    /// handler's `Unhandled` surfaces as `Ok(Outcome::Unhandled)`; the
    /// caller decides whether that counts as "no match". No internal
    /// retry of other candidates happens on either path.
    pub async fn dispatch(
        &self,
        caller: Arc<dyn Caller>,
        message: &Message,
    ) -> Result<Outcome, DispatchError> {
        let tokens = flatten(message);
        match self.resolve(&tokens)? {
            Resolution::Matched {
                descriptor, args, ..
            } => descriptor
                .invoke(caller, args)
                .await
                .map_err(DispatchError::Handler),
            Resolution::Default(default) => default
                .invoke(caller, message.clone())
                .await
                .map_err(DispatchError::Handler),
        }
    }

    /// Binds the unconsumed tokens to the descriptor's parameters,
    /// positionally and all-or-nothing.
    fn bind(
        &self,
        descriptor: &SubCommandDescriptor,
        remaining: &[Token],
    ) -> Result<Args, DispatchError> {
        let params = descriptor.params();
        let mut values: Vec<(String, ArgValue)> = Vec::with_capacity(params.len());

        for (position, param) in params.iter().enumerate() {
            let Some(parser) = self.registry.get(&param.ty) else {
                // Excluded at build time; reachable only if the host
                // swapped registries between build and call.
                return Err(DispatchError::Binding {
                    parameter: param.name.clone(),
                    position,
                    source: ParseFailure::new(param.ty.name(), "no parser registered"),
                });
            };

            let last = position + 1 == params.len();
            if position >= remaining.len() {
                // Unsupplied trailing optionals are simply omitted; the
                // minimum-count check already rejected missing required
                // parameters.
                break;
            }

            let parsed = if last && parser.consumes_rest() {
                parser.parse_rest(&remaining[position..])
            } else {
                parser.parse_token(&remaining[position])
            };

            match parsed {
                Ok(value) => values.push((param.name.clone(), value)),
                Err(source) => {
                    debug!(
                        parameter = %param.name,
                        position,
                        %source,
                        "argument binding failed"
                    );
                    return Err(DispatchError::Binding {
                        parameter: param.name.clone(),
                        position,
                        source,
                    });
                }
            }
        }

        Ok(Args::new(values))
    }
}

impl std::fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchTable")
            .field("description", &self.description)
            .field("subs", &self.descriptors.len())
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args::{ArgType, ArgumentParser};
    use crate::descriptor::CommandParam;
    use crate::handler::{FnDefaultHandler, FnHandler};
    use crate::message::Segment;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct TestCaller;

    impl Caller for TestCaller {
        fn name(&self) -> &str {
            "tester"
        }
    }

    fn caller() -> Arc<dyn Caller> {
        Arc::new(TestCaller)
    }

    struct StrParser;

    impl ArgumentParser for StrParser {
        fn parse_token(&self, token: &Token) -> Result<ArgValue, ParseFailure> {
            Ok(ArgValue::Str(token.text().to_string()))
        }
    }

    struct IntParser;

    impl ArgumentParser for IntParser {
        fn parse_token(&self, token: &Token) -> Result<ArgValue, ParseFailure> {
            token
                .text()
                .parse::<i64>()
                .map(ArgValue::Int)
                .map_err(|_| ParseFailure::new("int", token.text()))
        }
    }

    struct TailParser;

    impl ArgumentParser for TailParser {
        fn parse_token(&self, token: &Token) -> Result<ArgValue, ParseFailure> {
            Ok(ArgValue::Remainder(Message::from_tokens(
                std::slice::from_ref(token),
            )))
        }

        fn consumes_rest(&self) -> bool {
            true
        }

        fn parse_rest(&self, tail: &[Token]) -> Result<ArgValue, ParseFailure> {
            Ok(ArgValue::Remainder(Message::from_tokens(tail)))
        }
    }

    fn registry() -> Arc<ParserRegistry> {
        let mut registry = ParserRegistry::new();
        registry.register(ArgType::STRING, StrParser);
        registry.register(ArgType::INT, IntParser);
        registry.register(ArgType::REMAINDER, TailParser);
        Arc::new(registry)
    }

    fn unhandled_default() -> DefaultSubCommand {
        DefaultSubCommand::unhandled(Permission::new("command.test"))
    }

    fn table(specs: Vec<SubCommandSpec>) -> DispatchTable {
        DispatchTable::build(
            "test command",
            specs,
            unhandled_default(),
            &UsageStyle::default(),
            registry(),
        )
        .unwrap()
    }

    fn recording_handler(
        seen: Arc<Mutex<Vec<Args>>>,
    ) -> FnHandler<impl Fn(Arc<dyn Caller>, Args) -> std::future::Ready<Outcome> + Send + Sync>
    {
        FnHandler::new(move |_caller: Arc<dyn Caller>, args: Args| {
            seen.lock().unwrap().push(args);
            std::future::ready(Outcome::Handled)
        })
    }

    #[tokio::test]
    async fn test_longest_match_consumes_and_leaves_tail() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let table = table(vec![
            SubCommandSpec::new("foo", recording_handler(Arc::clone(&seen)))
                .param(CommandParam::optional("rest", ArgType::STRING)),
            SubCommandSpec::new("foo_bar", recording_handler(Arc::clone(&seen)))
                .name("foo bar")
                .param(CommandParam::required("arg", ArgType::STRING)),
        ]);

        let outcome = table
            .dispatch(caller(), &Message::text("foo bar baz"))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Handled);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].get("arg").and_then(ArgValue::as_str), Some("baz"));
    }

    #[tokio::test]
    async fn test_shorter_name_matches_when_longer_does_not() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let table = table(vec![
            SubCommandSpec::new("foo", recording_handler(Arc::clone(&seen)))
                .param(CommandParam::required("arg", ArgType::STRING)),
            SubCommandSpec::new("foo_bar", recording_handler(Arc::clone(&seen))).name("foo bar"),
        ]);

        table
            .dispatch(caller(), &Message::text("foo qux"))
            .await
            .unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].get("arg").and_then(ArgValue::as_str), Some("qux"));
    }

    #[tokio::test]
    async fn test_insufficient_arguments() {
        let table = table(vec![SubCommandSpec::new(
            "foo",
            FnHandler::new(|_caller: Arc<dyn Caller>, _args: Args| std::future::ready(true)),
        )
        .param(CommandParam::required("n", ArgType::INT))]);

        let err = table
            .dispatch(caller(), &Message::text("foo"))
            .await
            .unwrap_err();
        match err {
            DispatchError::InsufficientArguments {
                name,
                expected,
                given,
                usage,
            } => {
                assert_eq!(name, "foo");
                assert_eq!(expected, 1);
                assert_eq!(given, 0);
                assert!(usage.contains("<n>"));
            }
            other => panic!("expected InsufficientArguments, got {other:?}"),
        }

        let outcome = table
            .dispatch(caller(), &Message::text("foo 1"))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Handled);
    }

    #[tokio::test]
    async fn test_binding_failure_identifies_parameter_and_skips_invocation() {
        let invoked = Arc::new(AtomicUsize::new(0));
        let invoked_clone = Arc::clone(&invoked);
        let table = table(vec![SubCommandSpec::new(
            "save",
            FnHandler::new(move |_caller: Arc<dyn Caller>, _args: Args| {
                invoked_clone.fetch_add(1, Ordering::SeqCst);
                std::future::ready(true)
            }),
        )
        .param(CommandParam::required("target", ArgType::STRING))
        .param(CommandParam::required("slot", ArgType::INT))]);

        let err = table
            .dispatch(caller(), &Message::text("save here nope"))
            .await
            .unwrap_err();
        match err {
            DispatchError::Binding {
                parameter,
                position,
                source,
            } => {
                assert_eq!(parameter, "slot");
                assert_eq!(position, 1);
                assert_eq!(source.input(), "nope");
            }
            other => panic!("expected Binding, got {other:?}"),
        }
        assert_eq!(invoked.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unmatched_routes_whole_message_to_default() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let default = DefaultSubCommand::new(
            Permission::new("command.test"),
            FnDefaultHandler::new(move |_caller: Arc<dyn Caller>, remainder: Message| {
                seen_clone.lock().unwrap().push(remainder);
                std::future::ready(true)
            }),
        );
        let table = DispatchTable::build(
            "test command",
            vec![SubCommandSpec::new(
                "known",
                FnHandler::new(|_caller: Arc<dyn Caller>, _args: Args| std::future::ready(true)),
            )],
            default,
            &UsageStyle::default(),
            registry(),
        )
        .unwrap();

        let message: Message = [Segment::text("mystery input"), Segment::element("[img]")]
            .into_iter()
            .collect();
        let outcome = table.dispatch(caller(), &message).await.unwrap();
        assert_eq!(outcome, Outcome::Handled);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], message);
    }

    #[tokio::test]
    async fn test_default_unhandled_surfaces() {
        let table = table(vec![SubCommandSpec::new(
            "known",
            FnHandler::new(|_caller: Arc<dyn Caller>, _args: Args| std::future::ready(true)),
        )]);
        let outcome = table
            .dispatch(caller(), &Message::text("unknown"))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Unhandled);
    }

    #[tokio::test]
    async fn test_handler_false_surfaces_as_unhandled() {
        let table = table(vec![SubCommandSpec::new(
            "decline",
            FnHandler::new(|_caller: Arc<dyn Caller>, _args: Args| std::future::ready(false)),
        )]);
        let outcome = table
            .dispatch(caller(), &Message::text("decline"))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Unhandled);
    }

    #[tokio::test]
    async fn test_handler_error_propagates() {
        let table = table(vec![SubCommandSpec::new(
            "boom",
            FnHandler::new(|_caller: Arc<dyn Caller>, _args: Args| async move {
                Err::<Outcome, _>(anyhow::anyhow!("handler exploded"))
            }),
        )]);
        let err = table
            .dispatch(caller(), &Message::text("boom"))
            .await
            .unwrap_err();
        match err {
            DispatchError::Handler(source) => {
                assert!(source.to_string().contains("handler exploded"))
            }
            other => panic!("expected Handler, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_greedy_tail_receives_unflattened_remainder() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let table = table(vec![SubCommandSpec::new(
            "say",
            recording_handler(Arc::clone(&seen)),
        )
        .param(CommandParam::required("to", ArgType::STRING))
        .param(CommandParam::required("what", ArgType::REMAINDER))]);

        let message: Message = [Segment::text("say alice hello there"), Segment::element("[img]")]
            .into_iter()
            .collect();
        table.dispatch(caller(), &message).await.unwrap();

        let seen = seen.lock().unwrap();
        let tail = seen[0].get("what").and_then(ArgValue::as_message).unwrap();
        let tail_tokens = flatten(tail);
        assert_eq!(tail_tokens.len(), 3);
        assert_eq!(tail_tokens[0].text(), "hello");
        assert_eq!(tail_tokens[1].text(), "there");
        assert_eq!(tail_tokens[2].text(), "[img]");
    }

    #[tokio::test]
    async fn test_unsupplied_trailing_optional_is_omitted() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let table = table(vec![SubCommandSpec::new(
            "list",
            recording_handler(Arc::clone(&seen)),
        )
        .param(CommandParam::optional("page", ArgType::INT))]);

        table.dispatch(caller(), &Message::text("list")).await.unwrap();
        table
            .dispatch(caller(), &Message::text("list 3"))
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert!(seen[0].get("page").is_none());
        assert_eq!(seen[1].get("page").and_then(ArgValue::as_int), Some(3));
    }

    #[tokio::test]
    async fn test_surplus_tokens_are_ignored() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let table = table(vec![SubCommandSpec::new(
            "del",
            recording_handler(Arc::clone(&seen)),
        )
        .param(CommandParam::required("slot", ArgType::INT))]);

        table
            .dispatch(caller(), &Message::text("del 4 trailing junk"))
            .await
            .unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].len(), 1);
        assert_eq!(seen[0].get("slot").and_then(ArgValue::as_int), Some(4));
    }

    #[test]
    fn test_build_failure_prevents_table() {
        let err = DispatchTable::build(
            "test command",
            vec![SubCommandSpec::new(
                "bad/name",
                FnHandler::new(|_caller: Arc<dyn Caller>, _args: Args| std::future::ready(true)),
            )],
            unhandled_default(),
            &UsageStyle::default(),
            registry(),
        )
        .unwrap_err();
        assert!(matches!(err, BuildError::InvalidName { .. }));
    }

    #[test]
    fn test_usage_cached_on_table() {
        let table = table(vec![
            SubCommandSpec::new("list", FnHandler::new(
                |_caller: Arc<dyn Caller>, _args: Args| std::future::ready(true),
            ))
            .description("list things"),
        ]);
        assert_eq!(table.usage(), "test command\n\n/list   list things");
    }
}
