use async_trait::async_trait;

use super::{ArgValue, ArgumentType, TArgumentType, TypeCtxt, Validation};
use crate::command::arguments::ArgumentSpec;

/// Tries each delegate in declared order. The first one to accept a value wins.
pub struct UnionType {
    delegates: Vec<TArgumentType>,
}
impl UnionType {
    pub fn new(delegates: Vec<TArgumentType>) -> Self {
        Self { delegates }
    }
}

#[async_trait]
impl ArgumentType for UnionType {
    /// If no delegate accepts the value, the rejection of the last one is returned.
    async fn validate(&self, raw: &str, cx: &TypeCtxt<'_>, arg: &ArgumentSpec) -> Validation {
        let mut last = Validation::Invalid(None);
        for delegate in &self.delegates {
            last = delegate.validate(raw, cx, arg).await;
            if last.is_valid() {
                return last;
            }
        }
        last
    }

    async fn parse(&self, raw: &str, cx: &TypeCtxt<'_>, arg: &ArgumentSpec) -> Option<ArgValue> {
        for delegate in &self.delegates {
            if delegate.validate(raw, cx, arg).await.is_valid()
                && let Some(value) = delegate.parse(raw, cx, arg).await
            {
                return Some(value);
            }
        }
        None
    }

    fn is_empty(&self, raw: &str, cx: &TypeCtxt<'_>, arg: &ArgumentSpec) -> bool {
        self.delegates.iter().all(|d| d.is_empty(raw, cx, arg))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::arguments::ArgumentBuilder;
    use crate::command::types::ArgValues;
    use crate::testing::{AUTHOR, CHANNEL, GUILD, MockDirectory, registry_with_ping};

    #[tokio::test]
    async fn group_or_command_resolves_commands() {
        let registry = registry_with_ping();
        let directory = MockDirectory::default();
        let collected = ArgValues::new();
        let cx = TypeCtxt {
            author: AUTHOR,
            channel_id: CHANNEL,
            guild_id: Some(GUILD),
            registry: &registry,
            directory: &directory,
            collected: &collected,
        };
        let arg = ArgumentBuilder::new("target").types(["group", "command"]).build();
        let union = registry.types().resolve("group|command").unwrap();

        assert!(union.validate("pingall", &cx, &arg).await.is_valid());
        match union.parse("pingall", &cx, &arg).await {
            Some(ArgValue::Command(command)) => assert_eq!(command.name(), "pingall"),
            other => panic!("expected a command, got {other:?}"),
        }
        match union.parse("test", &cx, &arg).await {
            Some(ArgValue::Group(group)) => assert_eq!(group.id, "test"),
            other => panic!("expected a group, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn last_rejection_is_reported() {
        let registry = registry_with_ping();
        let directory = MockDirectory::default();
        let collected = ArgValues::new();
        let cx = TypeCtxt {
            author: AUTHOR,
            channel_id: CHANNEL,
            guild_id: Some(GUILD),
            registry: &registry,
            directory: &directory,
            collected: &collected,
        };
        let arg = ArgumentBuilder::new("target").types(["command", "boolean"]).build();
        let union = UnionType::new(vec![
            registry.types().resolve("command").unwrap(),
            registry.types().resolve("boolean").unwrap(),
        ]);

        assert_eq!(union.validate("nope", &cx, &arg).await.reason(), Some("Unknown boolean value."));
        assert!(union.is_empty("  ", &cx, &arg));
        assert!(!union.is_empty("x", &cx, &arg));
    }

    #[tokio::test]
    async fn similarly_named_groups_do_not_shadow_commands() {
        let registry = registry_with_ping();
        registry
            .register_group(crate::command::group::CommandGroup::new("pinger", "Pinger"))
            .unwrap();
        let directory = MockDirectory::default();
        let collected = ArgValues::new();
        let cx = TypeCtxt {
            author: AUTHOR,
            channel_id: CHANNEL,
            guild_id: Some(GUILD),
            registry: &registry,
            directory: &directory,
            collected: &collected,
        };
        let arg = ArgumentBuilder::new("target").types(["group", "command"]).build();
        let union = registry.types().resolve("group|command").unwrap();

        assert!(union.validate("ping", &cx, &arg).await.is_valid());
        match union.parse("ping", &cx, &arg).await {
            Some(ArgValue::Command(command)) => assert_eq!(command.name(), "ping"),
            other => panic!("expected a command, got {other:?}"),
        }
    }
}
