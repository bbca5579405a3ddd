use std::fmt::Display;
use std::str::FromStr;

use async_trait::async_trait;
use parley_common::util::discord::{channel_mention_to_id, role_mention_to_id, user_mention_to_id};
use parley_string_fmt::disambiguation;
use twilight_model::id::Id;

use super::{ArgValue, ArgumentType, TypeCtxt, Validation};
use crate::command::arguments::ArgumentSpec;
use crate::command::errors::ResolveError;

pub const TRUTHY: &[&str] = &["true", "t", "yes", "y", "on", "enable", "enabled", "1", "+"];
pub const FALSY: &[&str] = &["false", "f", "no", "n", "off", "disable", "disabled", "0", "-"];

/// The types every registry starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinType {
    String,
    Integer,
    Float,
    Boolean,
    User,
    Channel,
    Role,
    Command,
    Group,
}
impl BuiltinType {
    pub const ALL: [BuiltinType; 9] = [
        Self::String,
        Self::Integer,
        Self::Float,
        Self::Boolean,
        Self::User,
        Self::Channel,
        Self::Role,
        Self::Command,
        Self::Group,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::User => "user",
            Self::Channel => "channel",
            Self::Role => "role",
            Self::Command => "command",
            Self::Group => "group",
        }
    }
}

fn check_one_of(raw: &str, arg: &ArgumentSpec) -> Option<Validation> {
    let options = arg.one_of.as_ref()?;
    if options.iter().any(|o| o.eq_ignore_ascii_case(raw.trim())) {
        None
    } else {
        Some(Validation::invalid(format!(
            "Please enter one of the following options: {}",
            options.join(", ")
        )))
    }
}

fn check_bounds(value: f64, arg: &ArgumentSpec, what: &str) -> Validation {
    if let Some(min) = arg.min
        && value < min
    {
        return Validation::invalid(format!("Please enter {what} above or exactly {min}."));
    }
    if let Some(max) = arg.max
        && value > max
    {
        return Validation::invalid(format!("Please enter {what} below or exactly {max}."));
    }
    Validation::Valid
}

fn validate_number<T>(raw: &str, arg: &ArgumentSpec) -> Validation
where
    T: FromStr + Into<f64>,
{
    let Ok(value) = raw.trim().parse::<T>() else {
        return Validation::Invalid(None);
    };
    let value: f64 = value.into();
    if !value.is_finite() {
        return Validation::Invalid(None);
    }
    if let Some(invalid) = check_one_of(raw, arg) {
        return invalid;
    }
    check_bounds(value, arg, "a number")
}

fn parse_boolean(raw: &str) -> Option<bool> {
    let raw = raw.trim().to_lowercase();
    if TRUTHY.contains(&raw.as_str()) {
        Some(true)
    } else if FALSY.contains(&raw.as_str()) {
        Some(false)
    } else {
        None
    }
}

fn not_found(what: impl Display) -> Validation {
    Validation::invalid(format!("Couldn't find that {what}."))
}

impl BuiltinType {
    async fn check(&self, raw: &str, cx: &TypeCtxt<'_>, arg: &ArgumentSpec) -> Validation {
        match self {
            Self::String => {
                if let Some(invalid) = check_one_of(raw, arg) {
                    return invalid;
                }
                let length = raw.chars().count() as f64;
                if let Some(min) = arg.min
                    && length < min
                {
                    return Validation::invalid(format!("{} must be at least {min} characters long.", arg.label));
                }
                if let Some(max) = arg.max
                    && length > max
                {
                    return Validation::invalid(format!("{} can be at most {max} characters long.", arg.label));
                }
                Validation::Valid
            },
            Self::Integer => {
                // i64 doesn't convert into f64 losslessly, so bounds are checked on the parsed value
                let Ok(value) = raw.trim().parse::<i64>() else {
                    return Validation::Invalid(None);
                };
                if let Some(invalid) = check_one_of(raw, arg) {
                    return invalid;
                }
                check_bounds(value as f64, arg, "a number")
            },
            Self::Float => validate_number::<f64>(raw, arg),
            Self::Boolean => match parse_boolean(raw) {
                Some(_) => Validation::Valid,
                None => Validation::invalid("Unknown boolean value."),
            },
            Self::User => {
                let Some(id) = user_mention_to_id(raw).and_then(Id::new_checked) else {
                    return Validation::Invalid(None);
                };
                let Some(guild_id) = cx.guild_id else {
                    return Validation::Valid;
                };
                match cx.directory.member_exists(guild_id, id).await {
                    Ok(true) => Validation::Valid,
                    Ok(false) => not_found("member"),
                    Err(e) => {
                        tracing::warn!("Member lookup for {id} in {guild_id} failed: {e:#}");
                        not_found("member")
                    },
                }
            },
            Self::Channel => {
                let Some(id) = channel_mention_to_id(raw).and_then(Id::new_checked) else {
                    return Validation::Invalid(None);
                };
                let Some(guild_id) = cx.guild_id else {
                    return if id == cx.channel_id {
                        Validation::Valid
                    } else {
                        not_found("channel")
                    };
                };
                match cx.directory.channel_exists(guild_id, id).await {
                    Ok(true) => Validation::Valid,
                    Ok(false) => not_found("channel"),
                    Err(e) => {
                        tracing::warn!("Channel lookup for {id} in {guild_id} failed: {e:#}");
                        not_found("channel")
                    },
                }
            },
            Self::Role => {
                let Some(guild_id) = cx.guild_id else {
                    return Validation::invalid("Roles can only be used in a server.");
                };
                let Some(id) = role_mention_to_id(raw).and_then(Id::new_checked) else {
                    return Validation::Invalid(None);
                };
                match cx.directory.role_exists(guild_id, id).await {
                    Ok(true) => Validation::Valid,
                    Ok(false) => not_found("role"),
                    Err(e) => {
                        tracing::warn!("Role lookup for {id} in {guild_id} failed: {e:#}");
                        not_found("role")
                    },
                }
            },
            Self::Command => match cx.registry.resolve_command(raw.trim()) {
                Ok(_) => Validation::Valid,
                Err(e @ ResolveError::Ambiguous(_)) => Validation::invalid(disambiguation(e.candidates(), "commands")),
                Err(ResolveError::NotFound) => Validation::Invalid(None),
            },
            Self::Group => {
                // exact only, so a similarly named group never shadows a command in a union
                let groups = cx.registry.find_groups(raw.trim(), true);
                match groups.len() {
                    0 => Validation::Invalid(None),
                    1 => Validation::Valid,
                    _ => Validation::invalid(disambiguation(groups.iter().map(|g| &g.id), "groups")),
                }
            },
        }
    }

    fn convert(&self, raw: &str, cx: &TypeCtxt<'_>) -> Option<ArgValue> {
        let raw = raw.trim();
        match self {
            Self::String => Some(ArgValue::String(raw.to_owned())),
            Self::Integer => raw.parse().ok().map(ArgValue::Integer),
            Self::Float => raw.parse::<f64>().ok().filter(|v| v.is_finite()).map(ArgValue::Float),
            Self::Boolean => parse_boolean(raw).map(ArgValue::Boolean),
            Self::User => user_mention_to_id(raw)
                .and_then(Id::new_checked)
                .map(ArgValue::User),
            Self::Channel => channel_mention_to_id(raw)
                .and_then(Id::new_checked)
                .map(ArgValue::Channel),
            Self::Role => role_mention_to_id(raw)
                .and_then(Id::new_checked)
                .map(ArgValue::Role),
            Self::Command => cx.registry.resolve_command(raw).ok().map(ArgValue::Command),
            Self::Group => {
                let mut groups = cx.registry.find_groups(raw, true);
                if groups.len() == 1 { groups.pop().map(ArgValue::Group) } else { None }
            },
        }
    }
}

#[async_trait]
impl ArgumentType for BuiltinType {
    async fn validate(&self, raw: &str, cx: &TypeCtxt<'_>, arg: &ArgumentSpec) -> Validation {
        self.check(raw, cx, arg).await
    }

    async fn parse(&self, raw: &str, cx: &TypeCtxt<'_>, _arg: &ArgumentSpec) -> Option<ArgValue> {
        self.convert(raw, cx)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::command::arguments::ArgumentBuilder;
    use crate::command::registry::CommandRegistry;
    use crate::command::types::ArgValues;
    use crate::settings::MemorySettings;
    use crate::testing::{AUTHOR, CHANNEL, GUILD, MockDirectory, registry_with_ping};

    fn ctxt<'a>(registry: &'a CommandRegistry, directory: &'a MockDirectory, collected: &'a ArgValues) -> TypeCtxt<'a> {
        TypeCtxt {
            author: AUTHOR,
            channel_id: CHANNEL,
            guild_id: Some(GUILD),
            registry,
            directory,
            collected,
        }
    }

    #[tokio::test]
    async fn integers_respect_bounds() {
        let registry = CommandRegistry::new(Arc::new(MemorySettings::new()));
        let directory = MockDirectory::default();
        let collected = ArgValues::new();
        let cx = ctxt(&registry, &directory, &collected);
        let arg = ArgumentBuilder::new("count").types(["integer"]).min(1.0).max(10.0).build();

        assert!(BuiltinType::Integer.validate("5", &cx, &arg).await.is_valid());
        assert_eq!(BuiltinType::Integer.validate("abc", &cx, &arg).await, Validation::Invalid(None));
        assert!(!BuiltinType::Integer.validate("11", &cx, &arg).await.is_valid());
        assert!(!BuiltinType::Integer.validate("0", &cx, &arg).await.is_valid());
        // bounds are never clamped at parse time
        assert!(matches!(
            BuiltinType::Integer.parse("11", &cx, &arg).await,
            Some(ArgValue::Integer(11))
        ));
    }

    #[tokio::test]
    async fn strings_check_one_of_case_insensitively() {
        let registry = CommandRegistry::new(Arc::new(MemorySettings::new()));
        let directory = MockDirectory::default();
        let collected = ArgValues::new();
        let cx = ctxt(&registry, &directory, &collected);
        let arg = ArgumentBuilder::new("colour").types(["string"]).one_of(["red", "blue"]).build();

        assert!(BuiltinType::String.validate("RED", &cx, &arg).await.is_valid());
        let invalid = BuiltinType::String.validate("green", &cx, &arg).await;
        assert_eq!(invalid.reason(), Some("Please enter one of the following options: red, blue"));
    }

    #[tokio::test]
    async fn booleans() {
        let registry = CommandRegistry::new(Arc::new(MemorySettings::new()));
        let directory = MockDirectory::default();
        let collected = ArgValues::new();
        let cx = ctxt(&registry, &directory, &collected);
        let arg = ArgumentBuilder::new("flag").types(["boolean"]).build();

        assert!(matches!(BuiltinType::Boolean.parse("Yes", &cx, &arg).await, Some(ArgValue::Boolean(true))));
        assert!(matches!(BuiltinType::Boolean.parse("off", &cx, &arg).await, Some(ArgValue::Boolean(false))));
        assert!(!BuiltinType::Boolean.validate("maybe", &cx, &arg).await.is_valid());
    }

    #[tokio::test]
    async fn users_must_be_members() {
        let registry = CommandRegistry::new(Arc::new(MemorySettings::new()));
        let directory = MockDirectory::default().with_member(42);
        let collected = ArgValues::new();
        let cx = ctxt(&registry, &directory, &collected);
        let arg = ArgumentBuilder::new("target").types(["user"]).build();

        assert!(BuiltinType::User.validate("<@42>", &cx, &arg).await.is_valid());
        assert!(BuiltinType::User.validate("<@!42>", &cx, &arg).await.is_valid());
        assert_eq!(
            BuiltinType::User.validate("<@43>", &cx, &arg).await.reason(),
            Some("Couldn't find that member.")
        );
        assert!(matches!(
            BuiltinType::User.parse("42", &cx, &arg).await,
            Some(ArgValue::User(id)) if id.get() == 42
        ));
    }

    #[tokio::test]
    async fn commands_report_ambiguity() {
        let registry = registry_with_ping();
        let directory = MockDirectory::default();
        let collected = ArgValues::new();
        let cx = ctxt(&registry, &directory, &collected);
        let arg = ArgumentBuilder::new("command").types(["command"]).build();

        assert!(BuiltinType::Command.validate("pingall", &cx, &arg).await.is_valid());
        assert!(BuiltinType::Command.validate("all", &cx, &arg).await.is_valid());
        let ambiguous = BuiltinType::Command.validate("pin", &cx, &arg).await;
        assert_eq!(
            ambiguous.reason(),
            Some("Multiple commands found, please be more specific: `ping`, `pingall`")
        );
    }

    #[tokio::test]
    async fn floats_must_be_finite() {
        let registry = CommandRegistry::new(Arc::new(MemorySettings::new()));
        let directory = MockDirectory::default();
        let collected = ArgValues::new();
        let cx = ctxt(&registry, &directory, &collected);
        let arg = ArgumentBuilder::new("ratio").types(["float"]).min(0.0).max(1.0).build();

        assert!(BuiltinType::Float.validate("0.5", &cx, &arg).await.is_valid());
        for raw in ["nan", "NaN", "inf", "-infinity"] {
            assert_eq!(BuiltinType::Float.validate(raw, &cx, &arg).await, Validation::Invalid(None), "{raw}");
            assert!(BuiltinType::Float.parse(raw, &cx, &arg).await.is_none(), "{raw}");
        }
    }

    #[tokio::test]
    async fn groups_need_an_exact_id_or_name() {
        let registry = registry_with_ping();
        registry
            .register_group(crate::command::group::CommandGroup::new("pinger", "Pinger"))
            .unwrap();
        let directory = MockDirectory::default();
        let collected = ArgValues::new();
        let cx = ctxt(&registry, &directory, &collected);
        let arg = ArgumentBuilder::new("group").types(["group"]).build();

        assert!(BuiltinType::Group.validate("PINGER", &cx, &arg).await.is_valid());
        assert!(BuiltinType::Group.validate("test", &cx, &arg).await.is_valid());
        assert!(!BuiltinType::Group.validate("ping", &cx, &arg).await.is_valid());
        assert!(BuiltinType::Group.parse("ping", &cx, &arg).await.is_none());
    }
}
