use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use anyhow::bail;
use parley_common::util::format_duration;

use super::collector::Session;
use super::errors::{CancelReason, ConfigurationError};
use super::types::{ArgValue, ArgValues, TArgumentType, TypeCtxt, TypeRegistry, Validation};
use crate::gateway_handler::ResponseHandle;

pub type DefaultProducer = Arc<dyn Fn(&TypeCtxt<'_>) -> ArgValue + Send + Sync>;

/// Value used when an argument is given empty.
#[derive(Clone)]
pub enum ArgDefault {
    Value(ArgValue),
    /// Computed from the invocation, e.g. "the author".
    Producer(DefaultProducer),
}
impl Debug for ArgDefault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Producer(_) => f.write_str("Producer(..)"),
        }
    }
}

/// Declaration of one command parameter.
#[derive(Clone, Debug)]
pub struct ArgumentSpec {
    /// Unique within the command. Values are stored under this key.
    pub key: String,
    pub label: String,
    pub prompt: String,
    /// Candidate type IDs, tried in order.
    pub types: Vec<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub one_of: Option<Vec<String>>,
    pub default: Option<ArgDefault>,
    pub required: bool,
    pub infinite: bool,
    /// Cap on how many values an infinite argument accepts.
    pub max_items: Option<usize>,
    /// Overrides the default reply wait.
    pub wait: Option<Duration>,
    /// Shown instead of the generic message when a value is rejected without a reason.
    pub error: Option<String>,
}
impl ArgumentSpec {
    pub fn usage(&self) -> String {
        let dots = if self.infinite { "..." } else { "" };
        if self.required && self.default.is_none() {
            format!("<{}{dots}>", self.key)
        } else {
            format!("[{}{dots}]", self.key)
        }
    }
}

pub struct ArgumentBuilder {
    spec: ArgumentSpec,
}
impl ArgumentBuilder {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            spec: ArgumentSpec {
                label: key.clone(),
                prompt: format!("What {key} would you like to use?"),
                key,
                types: vec![],
                min: None,
                max: None,
                one_of: None,
                default: None,
                required: true,
                infinite: false,
                max_items: None,
                wait: None,
                error: None,
            },
        }
    }

    pub fn label(&mut self, label: impl Into<String>) -> &mut Self {
        self.spec.label = label.into();
        self
    }

    pub fn prompt(&mut self, prompt: impl Into<String>) -> &mut Self {
        self.spec.prompt = prompt.into();
        self
    }

    pub fn types<I, S>(&mut self, types: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn min(&mut self, min: f64) -> &mut Self {
        self.spec.min = Some(min);
        self
    }

    pub fn max(&mut self, max: f64) -> &mut Self {
        self.spec.max = Some(max);
        self
    }

    pub fn one_of<I, S>(&mut self, options: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.one_of = Some(options.into_iter().map(Into::into).collect());
        self
    }

    pub fn default(&mut self, default: ArgDefault) -> &mut Self {
        self.spec.default = Some(default);
        self
    }

    pub fn required(&mut self, required: bool) -> &mut Self {
        self.spec.required = required;
        self
    }

    pub fn infinite(&mut self, infinite: bool) -> &mut Self {
        self.spec.infinite = infinite;
        self
    }

    pub fn max_items(&mut self, max_items: usize) -> &mut Self {
        self.spec.max_items = Some(max_items);
        self
    }

    pub fn wait(&mut self, wait: Duration) -> &mut Self {
        self.spec.wait = Some(wait);
        self
    }

    pub fn error(&mut self, error: impl Into<String>) -> &mut Self {
        self.spec.error = Some(error.into());
        self
    }

    pub fn build(&self) -> ArgumentSpec {
        self.spec.clone()
    }
}

/// What obtaining one argument produced.
#[derive(Debug, Default)]
pub struct ArgumentResult {
    /// `None` when cancelled, or when an optional argument was left out.
    pub value: Option<ArgValue>,
    pub cancelled: Option<CancelReason>,
    pub prompts: Vec<ResponseHandle>,
    pub answers: Vec<String>,
}
impl ArgumentResult {
    fn cancel(mut self, reason: CancelReason) -> Self {
        self.value = None;
        self.cancelled = Some(reason);
        self
    }
}

enum Reply {
    Value(ArgValue),
    /// Empty reply to an optional argument without default.
    Absent,
    /// The finish token (or an empty reply) while obtaining an infinite argument.
    Finished,
    Cancelled(CancelReason),
}

/// An [`ArgumentSpec`] bound to its resolved type.
pub struct Argument {
    pub spec: ArgumentSpec,
    ty: TArgumentType,
}
impl Argument {
    /// Resolves the spec's type IDs. Fails if there are none or one of them is unknown.
    pub fn new(spec: ArgumentSpec, types: &TypeRegistry, command: &str) -> Result<Self, ConfigurationError> {
        if spec.types.is_empty() {
            return Err(ConfigurationError::EmptyArgumentTypes {
                command: command.to_owned(),
                argument: spec.key.clone(),
            });
        }

        for id in spec.types.iter().flat_map(|t| t.split('|')) {
            if !types.contains(id.trim()) {
                return Err(ConfigurationError::UnknownArgumentType {
                    command: command.to_owned(),
                    argument: spec.key.clone(),
                    type_id: id.to_owned(),
                });
            }
        }

        let ty = types
            .resolve_union(spec.types.iter().flat_map(|t| t.split('|')))
            .ok_or_else(|| ConfigurationError::UnknownArgumentType {
                command: command.to_owned(),
                argument: spec.key.clone(),
                type_id: spec.types.join("|"),
            })?;

        Ok(Self { spec, ty })
    }

    pub fn default_value(&self, cx: &TypeCtxt<'_>) -> Option<ArgValue> {
        match self.spec.default.as_ref()? {
            ArgDefault::Value(value) => Some(value.clone()),
            ArgDefault::Producer(producer) => Some(producer(cx)),
        }
    }

    fn footer(&self, session: &Session<'_>, wait: Duration) -> String {
        let options = session.options();
        let finish = if self.spec.infinite {
            format!(" Respond with `{}` when you are done.", options.finish_token)
        } else {
            String::new()
        };

        format!(
            "Respond with `{}` to cancel the command.{finish} The command will automatically be cancelled in {}.",
            options.cancel_token,
            format_duration(&wait)
        )
    }

    fn prompt_text(&self, session: &Session<'_>, wait: Duration) -> String {
        format!("{}\n{}", self.spec.prompt, self.footer(session, wait))
    }

    fn error_text(&self, validation: &Validation, session: &Session<'_>, wait: Duration) -> String {
        let reason = validation
            .reason()
            .map(str::to_owned)
            .or_else(|| self.spec.error.clone())
            .unwrap_or_else(|| format!("You provided an invalid {}. Please try again.", self.spec.label));

        format!("{reason}\n{}", self.footer(session, wait))
    }

    async fn parse(&self, raw: &str, cx: &TypeCtxt<'_>) -> anyhow::Result<ArgValue> {
        match self.ty.parse(raw, cx, &self.spec).await {
            Some(value) => Ok(value),
            None => bail!("argument {} accepted {raw:?} but could not parse it", self.spec.key),
        }
    }

    /// Runs the prompt loop until a usable reply comes in or the loop is cancelled.
    ///
    /// `message` is sent before the first wait, if set. `attempts` counts invalid values and
    /// carries over between calls for the same item.
    async fn read(
        &self,
        session: &mut Session<'_>,
        collected: &ArgValues,
        mut message: Option<String>,
        attempts: &mut u32,
        limit: u32,
        result: &mut ArgumentResult,
    ) -> anyhow::Result<Reply> {
        let wait = self.spec.wait.unwrap_or(session.options().wait);

        loop {
            if let Some(text) = message.take()
                && let Some(handle) = session.prompt(text).await
            {
                result.prompts.push(handle);
            }

            let Some(reply) = session.next_reply(wait).await else {
                return Ok(Reply::Cancelled(CancelReason::Time));
            };
            result.answers.push(reply.clone());

            let trimmed = reply.trim();
            if trimmed.eq_ignore_ascii_case(&session.options().cancel_token) {
                return Ok(Reply::Cancelled(CancelReason::User));
            }

            let cx = session.type_ctxt(collected);
            if self.spec.infinite && trimmed.eq_ignore_ascii_case(&session.options().finish_token) {
                return Ok(Reply::Finished);
            }

            if self.ty.is_empty(&reply, &cx, &self.spec) {
                if self.spec.infinite {
                    return Ok(Reply::Finished);
                }
                if let Some(default) = self.default_value(&cx) {
                    return Ok(Reply::Value(default));
                }
                if !self.spec.required {
                    return Ok(Reply::Absent);
                }

                *attempts += 1;
                if *attempts > limit {
                    return Ok(Reply::Cancelled(CancelReason::PromptLimit));
                }
                message = Some(self.prompt_text(session, wait));
                continue;
            }

            let validation = self.ty.validate(&reply, &cx, &self.spec).await;
            if validation.is_valid() {
                return Ok(Reply::Value(self.parse(&reply, &cx).await?));
            }

            *attempts += 1;
            if *attempts > limit {
                return Ok(Reply::Cancelled(CancelReason::PromptLimit));
            }
            message = Some(self.error_text(&validation, session, wait));
        }
    }

    /// Obtains a single value, from `provided` if it's usable, otherwise by prompting.
    pub async fn obtain(
        &self,
        session: &mut Session<'_>,
        collected: &ArgValues,
        provided: Option<&str>,
        limit: u32,
    ) -> anyhow::Result<ArgumentResult> {
        let mut result = ArgumentResult::default();
        let wait = self.spec.wait.unwrap_or(session.options().wait);
        let mut attempts = 0;

        let first_message = {
            let cx = session.type_ctxt(collected);
            match provided {
                Some(raw) if !self.ty.is_empty(raw, &cx, &self.spec) => {
                    let validation = self.ty.validate(raw, &cx, &self.spec).await;
                    if validation.is_valid() {
                        result.value = Some(self.parse(raw, &cx).await?);
                        return Ok(result);
                    }

                    attempts += 1;
                    if attempts > limit {
                        return Ok(result.cancel(CancelReason::PromptLimit));
                    }
                    self.error_text(&validation, session, wait)
                },
                _ => {
                    if let Some(default) = self.default_value(&cx) {
                        result.value = Some(default);
                        return Ok(result);
                    }
                    if !self.spec.required {
                        return Ok(result);
                    }
                    self.prompt_text(session, wait)
                },
            }
        };

        match self
            .read(session, collected, Some(first_message), &mut attempts, limit, &mut result)
            .await?
        {
            Reply::Value(value) => result.value = Some(value),
            Reply::Absent | Reply::Finished => {},
            Reply::Cancelled(reason) => return Ok(result.cancel(reason)),
        }

        Ok(result)
    }

    /// Obtains a list of values. Every provided value is checked in order; an invalid one is
    /// re-asked for in place. With nothing provided, items are read one reply at a time until
    /// the finish token, an empty reply or `max_items`.
    pub async fn obtain_infinite(
        &self,
        session: &mut Session<'_>,
        collected: &ArgValues,
        provided: &[String],
        limit: u32,
    ) -> anyhow::Result<ArgumentResult> {
        let mut result = ArgumentResult::default();
        let wait = self.spec.wait.unwrap_or(session.options().wait);
        let cap = self.spec.max_items.unwrap_or(usize::MAX);
        let mut values = Vec::new();

        let provided = {
            let cx = session.type_ctxt(collected);
            provided
                .iter()
                .filter(|raw| !self.ty.is_empty(raw, &cx, &self.spec))
                .take(cap)
                .collect::<Vec<_>>()
        };

        for raw in provided {
            let validation = {
                let cx = session.type_ctxt(collected);
                let validation = self.ty.validate(raw, &cx, &self.spec).await;
                if validation.is_valid() {
                    values.push(self.parse(raw, &cx).await?);
                    continue;
                }
                validation
            };

            let mut attempts = 1;
            if attempts > limit {
                return Ok(result.cancel(CancelReason::PromptLimit));
            }
            let message = self.error_text(&validation, session, wait);
            match self
                .read(session, collected, Some(message), &mut attempts, limit, &mut result)
                .await?
            {
                Reply::Value(value) => values.push(value),
                // drops this item only, later provided values still count
                Reply::Absent | Reply::Finished => continue,
                Reply::Cancelled(reason) => return Ok(result.cancel(reason)),
            }
        }

        if values.is_empty() {
            let cx = session.type_ctxt(collected);
            if let Some(default) = self.default_value(&cx) {
                result.value = Some(default);
                return Ok(result);
            }
            if !self.spec.required {
                return Ok(result);
            }

            let mut message = Some(self.prompt_text(session, wait));
            let mut attempts = 0;
            while values.len() < cap {
                match self
                    .read(session, collected, message.take(), &mut attempts, limit, &mut result)
                    .await?
                {
                    Reply::Value(value) => {
                        values.push(value);
                        attempts = 0;
                    },
                    Reply::Finished if values.is_empty() => {
                        attempts += 1;
                        if attempts > limit {
                            return Ok(result.cancel(CancelReason::PromptLimit));
                        }
                        message = Some(self.prompt_text(session, wait));
                    },
                    Reply::Absent | Reply::Finished => break,
                    Reply::Cancelled(reason) => return Ok(result.cancel(reason)),
                }
            }
        }

        result.value = Some(ArgValue::List(values));
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_marks_optional_and_infinite_arguments() {
        assert_eq!(ArgumentBuilder::new("text").build().usage(), "<text>");
        assert_eq!(ArgumentBuilder::new("text").required(false).build().usage(), "[text]");
        assert_eq!(
            ArgumentBuilder::new("numbers").infinite(true).build().usage(),
            "<numbers...>"
        );
        assert_eq!(
            ArgumentBuilder::new("sides")
                .default(ArgDefault::Value(ArgValue::Integer(6)))
                .build()
                .usage(),
            "[sides]"
        );
    }

    #[test]
    fn arguments_need_known_types() {
        let types = TypeRegistry::with_builtins();

        let err = Argument::new(ArgumentBuilder::new("x").build(), &types, "cmd").err();
        assert!(matches!(err, Some(ConfigurationError::EmptyArgumentTypes { .. })));

        let err = Argument::new(ArgumentBuilder::new("x").types(["colour"]).build(), &types, "cmd").err();
        assert!(matches!(
            err,
            Some(ConfigurationError::UnknownArgumentType { type_id, .. }) if type_id == "colour"
        ));

        assert!(Argument::new(ArgumentBuilder::new("x").types(["group|command"]).build(), &types, "cmd").is_ok());
    }
}
