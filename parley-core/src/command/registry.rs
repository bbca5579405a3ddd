//! The command registry: every registered group, command and argument type, plus the global
//! enablement layer.
//!
//! The registry is built explicitly and shared by reference (usually behind an `Arc`). Commands
//! are stored as `Arc<RegisteredCommand>`, so a [`CommandRegistry::reregister`] swaps the entry
//! without disturbing invocations still running the old definition.

use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use regex::Regex;
use twilight_model::id::Id;
use twilight_model::id::marker::GuildMarker;

use super::arguments::Argument;
use super::collector::ArgumentCollector;
use super::errors::{ConfigurationError, RegistryError, ResolveError};
use super::group::CommandGroup;
use super::types::{TArgumentType, TypeRegistry};
use super::{CommandMetadata, TCommand};
use crate::settings::Settings;

/// Something that can be enabled or disabled.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EnablementTarget {
    Command(String),
    Group(String),
}
impl EnablementTarget {
    /// Key the per-scope layer is stored under.
    pub fn settings_key(&self) -> String {
        match self {
            Self::Command(name) => format!("cmd-{name}"),
            Self::Group(id) => format!("grp-{id}"),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Command(name) | Self::Group(name) => name,
        }
    }
}

/// A command as the registry holds it: its metadata, resolved group, argument collector and
/// compiled patterns.
pub struct RegisteredCommand {
    pub metadata: CommandMetadata,
    pub group: Arc<CommandGroup>,
    pub collector: ArgumentCollector,
    pub patterns: Vec<Regex>,
    pub command: TCommand,
}
impl RegisteredCommand {
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.metadata.aliases
    }

    pub fn member_name(&self) -> &str {
        self.metadata.member_name.as_deref().unwrap_or(&self.metadata.name)
    }

    /// `group:member`.
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.group.id, self.member_name())
    }

    /// Guarded commands, and commands in guarded groups, can't be disabled.
    pub fn is_guarded(&self) -> bool {
        self.metadata.guarded || self.group.guarded
    }

    pub fn target(&self) -> EnablementTarget {
        EnablementTarget::Command(self.metadata.name.clone())
    }

    /// Usage string, e.g. `sum <numbers...>`.
    pub fn usage(&self) -> String {
        if let Some(format) = &self.metadata.format {
            return format!("{} {format}", self.name());
        }

        let args = self
            .collector
            .arguments()
            .iter()
            .map(|a| a.spec.usage())
            .collect::<Vec<_>>();

        if args.is_empty() {
            self.name().to_owned()
        } else {
            format!("{} {}", self.name(), args.join(" "))
        }
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.metadata.name.as_str()).chain(self.metadata.aliases.iter().map(String::as_str))
    }

    fn matches_exact(&self, search: &str) -> bool {
        self.names().any(|n| n == search) || self.qualified_name() == search
    }

    fn matches_partial(&self, search: &str) -> bool {
        self.names().any(|n| n.contains(search)) || self.qualified_name().contains(search)
    }
}
impl Debug for RegisteredCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredCommand")
            .field("name", &self.metadata.name)
            .field("group", &self.group.id)
            .field("aliases", &self.metadata.aliases)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct RegistryState {
    groups: Vec<Arc<CommandGroup>>,
    commands: Vec<Arc<RegisteredCommand>>,
    /// Global layer. Anything not in here is globally enabled.
    disabled: HashSet<EnablementTarget>,
}

pub struct CommandRegistry {
    state: RwLock<RegistryState>,
    types: TypeRegistry,
    settings: Arc<dyn Settings>,
}

fn valid_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(char::is_whitespace) && !name.contains(':') && name.to_lowercase() == name
}

impl CommandRegistry {
    pub fn new(settings: Arc<dyn Settings>) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            types: TypeRegistry::with_builtins(),
            settings,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn settings(&self) -> &Arc<dyn Settings> {
        &self.settings
    }

    pub fn register_type(&self, id: impl Into<String>, strategy: TArgumentType) -> Result<(), ConfigurationError> {
        self.types.register(id, strategy)
    }

    pub fn register_group(&self, group: CommandGroup) -> Result<Arc<CommandGroup>, ConfigurationError> {
        if !valid_name(&group.id) {
            return Err(ConfigurationError::InvalidName(group.id));
        }

        let mut state = self.write();
        if state.groups.iter().any(|g| g.id == group.id) {
            return Err(ConfigurationError::DuplicateGroup(group.id));
        }

        let group = Arc::new(group);
        state.groups.push(group.clone());
        Ok(group)
    }

    /// Validates `command`'s metadata and turns it into a [`RegisteredCommand`]. Conflicts with
    /// other commands are checked by the caller, which holds the write lock.
    fn build(&self, state: &RegistryState, command: TCommand) -> Result<RegisteredCommand, ConfigurationError> {
        let metadata = command.metadata();
        let name = metadata.name.clone();

        for n in std::iter::once(&metadata.name)
            .chain(&metadata.aliases)
            .chain(&metadata.member_name)
        {
            if !valid_name(n) {
                return Err(ConfigurationError::InvalidName(n.clone()));
            }
        }

        let group = state
            .groups
            .iter()
            .find(|g| g.id == metadata.group)
            .cloned()
            .ok_or_else(|| ConfigurationError::UnknownGroup {
                command: name.clone(),
                group: metadata.group.clone(),
            })?;

        let mut keys = HashSet::new();
        let mut after_infinite = false;
        let mut args = Vec::with_capacity(metadata.arguments.len());
        for spec in &metadata.arguments {
            if !keys.insert(spec.key.clone()) {
                return Err(ConfigurationError::DuplicateArgumentKey {
                    command: name.clone(),
                    key: spec.key.clone(),
                });
            }
            if after_infinite && spec.required && spec.default.is_none() {
                return Err(ConfigurationError::RequiredAfterInfinite {
                    command: name.clone(),
                    argument: spec.key.clone(),
                });
            }
            after_infinite |= spec.infinite;
            args.push(Argument::new(spec.clone(), &self.types, &name)?);
        }

        let patterns = metadata
            .patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| ConfigurationError::InvalidPattern {
                    command: name.clone(),
                    pattern: p.clone(),
                    error: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let collector = ArgumentCollector::new(args, metadata.args_prompt_limit);

        Ok(RegisteredCommand {
            metadata,
            group,
            collector,
            patterns,
            command,
        })
    }

    /// Checks `new` against every registered command except `replacing`.
    fn check_conflicts(
        state: &RegistryState,
        new: &RegisteredCommand,
        replacing: Option<&Arc<RegisteredCommand>>,
    ) -> Result<(), ConfigurationError> {
        let others = state
            .commands
            .iter()
            .filter(|c| replacing.is_none_or(|r| !Arc::ptr_eq(c, r)));

        for other in others {
            if let Some(name) = new.names().find(|n| other.names().any(|o| o == *n)) {
                return Err(ConfigurationError::NameConflict {
                    command: new.metadata.name.clone(),
                    name: name.to_owned(),
                });
            }
            if new.qualified_name() == other.qualified_name() {
                return Err(ConfigurationError::NameConflict {
                    command: new.metadata.name.clone(),
                    name: new.qualified_name(),
                });
            }
            if new.metadata.unknown && other.metadata.unknown {
                return Err(ConfigurationError::DuplicateUnknownCommand {
                    existing: other.metadata.name.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn register_command(&self, command: TCommand) -> Result<Arc<RegisteredCommand>, ConfigurationError> {
        let mut state = self.write();
        let registered = Arc::new(self.build(&state, command)?);
        Self::check_conflicts(&state, &registered, None)?;

        if !registered.metadata.default_enabled {
            state.disabled.insert(registered.target());
        }

        tracing::debug!("registered command {}", registered.qualified_name());
        state.commands.push(registered.clone());
        Ok(registered)
    }

    pub fn register_commands(&self, commands: impl IntoIterator<Item = TCommand>) -> Result<(), ConfigurationError> {
        for command in commands {
            self.register_command(command)?;
        }
        Ok(())
    }

    /// Replaces a registered command with a new definition of the same name, group and member
    /// name. Enablement state carries over.
    pub fn reregister(&self, command: TCommand) -> Result<Arc<RegisteredCommand>, ConfigurationError> {
        let mut state = self.write();
        let registered = self.build(&state, command)?;

        let Some(index) = state
            .commands
            .iter()
            .position(|c| c.metadata.name == registered.metadata.name)
        else {
            return Err(ConfigurationError::NotRegistered(registered.metadata.name.clone()));
        };

        let old = state.commands[index].clone();
        if old.group.id != registered.group.id || old.member_name() != registered.member_name() {
            return Err(ConfigurationError::IdentityChanged {
                command: registered.metadata.name.clone(),
            });
        }
        Self::check_conflicts(&state, &registered, Some(&old))?;

        let registered = Arc::new(registered);
        state.commands[index] = registered.clone();
        tracing::debug!("reregistered command {}", registered.qualified_name());
        Ok(registered)
    }

    pub fn unregister(&self, name: &str) -> Result<Arc<RegisteredCommand>, ConfigurationError> {
        let mut state = self.write();
        let index = state
            .commands
            .iter()
            .position(|c| c.metadata.name == name)
            .ok_or_else(|| ConfigurationError::NotRegistered(name.to_owned()))?;

        let removed = state.commands.remove(index);
        state.disabled.remove(&removed.target());
        tracing::debug!("unregistered command {}", removed.qualified_name());
        Ok(removed)
    }

    pub fn commands(&self) -> Vec<Arc<RegisteredCommand>> {
        self.read().commands.clone()
    }

    pub fn groups(&self) -> Vec<Arc<CommandGroup>> {
        self.read().groups.clone()
    }

    pub fn group(&self, id: &str) -> Option<Arc<CommandGroup>> {
        self.read().groups.iter().find(|g| g.id == id).cloned()
    }

    pub fn group_commands(&self, id: &str) -> Vec<Arc<RegisteredCommand>> {
        self.read()
            .commands
            .iter()
            .filter(|c| c.group.id == id)
            .cloned()
            .collect()
    }

    /// The fallback run when a prefixed token names no command.
    pub fn unknown_command(&self) -> Option<Arc<RegisteredCommand>> {
        self.read().commands.iter().find(|c| c.metadata.unknown).cloned()
    }

    /// Commands with at least one pattern, in registration order.
    pub fn commands_with_patterns(&self) -> Vec<Arc<RegisteredCommand>> {
        self.read()
            .commands
            .iter()
            .filter(|c| !c.patterns.is_empty())
            .cloned()
            .collect()
    }

    /// Resolves a token to exactly one command: exact name, then exact alias (or `group:member`),
    /// then a unique partial match. Case-insensitive. The unknown-command fallback never
    /// matches partially.
    pub fn resolve_command(&self, token: &str) -> Result<Arc<RegisteredCommand>, ResolveError> {
        let token = token.trim().to_lowercase();
        if token.is_empty() {
            return Err(ResolveError::NotFound);
        }

        let state = self.read();
        if let Some(command) = state.commands.iter().find(|c| c.metadata.name == token) {
            return Ok(command.clone());
        }
        if let Some(command) = state.commands.iter().find(|c| c.matches_exact(&token)) {
            return Ok(command.clone());
        }

        let mut partial = state
            .commands
            .iter()
            .filter(|c| !c.metadata.unknown && c.matches_partial(&token))
            .cloned()
            .collect::<Vec<_>>();

        match partial.len() {
            0 => Err(ResolveError::NotFound),
            1 => Ok(partial.remove(0)),
            _ => Err(ResolveError::Ambiguous(partial)),
        }
    }

    /// Every command matching `search`, in registration order, that passes `usable`.
    ///
    /// Exact searches compare whole names, aliases and `group:member`; other searches are
    /// case-insensitive substring matches. An empty search matches everything.
    pub fn find_commands(
        &self,
        search: &str,
        exact: bool,
        usable: impl Fn(&RegisteredCommand) -> bool,
    ) -> Vec<Arc<RegisteredCommand>> {
        let search = search.trim().to_lowercase();
        self.read()
            .commands
            .iter()
            .filter(|c| {
                search.is_empty() || if exact { c.matches_exact(&search) } else { c.matches_partial(&search) }
            })
            .filter(|c| usable(c))
            .cloned()
            .collect()
    }

    /// Groups matching `search` by ID or name. A non-exact search that matches one group exactly
    /// returns only that group.
    pub fn find_groups(&self, search: &str, exact: bool) -> Vec<Arc<CommandGroup>> {
        let search = search.trim().to_lowercase();
        let state = self.read();

        let exact_matches = state
            .groups
            .iter()
            .filter(|g| g.id == search || g.name.to_lowercase() == search)
            .cloned()
            .collect::<Vec<_>>();

        if exact || !exact_matches.is_empty() {
            return exact_matches;
        }

        state
            .groups
            .iter()
            .filter(|g| g.id.contains(&search) || g.name.to_lowercase().contains(&search))
            .cloned()
            .collect()
    }

    fn guarded(&self, target: &EnablementTarget) -> Result<bool, RegistryError> {
        let state = self.read();
        match target {
            EnablementTarget::Command(name) => state
                .commands
                .iter()
                .find(|c| c.metadata.name == *name)
                .map(|c| c.is_guarded()),
            EnablementTarget::Group(id) => state.groups.iter().find(|g| g.id == *id).map(|g| g.guarded),
        }
        .ok_or_else(|| RegistryError::UnknownTarget(target.name().to_owned()))
    }

    /// Enables or disables `target`, globally when `guild_id` is `None`. Guarded targets can't
    /// be disabled.
    pub async fn set_enabled(
        &self,
        target: &EnablementTarget,
        guild_id: Option<Id<GuildMarker>>,
        enabled: bool,
    ) -> Result<(), RegistryError> {
        if self.guarded(target)? && !enabled {
            return Err(RegistryError::Guarded(target.name().to_owned()));
        }
        self.force_enabled(target, guild_id, enabled).await
    }

    /// Like [`CommandRegistry::set_enabled`], without the guard check. For privileged internal
    /// callers only.
    pub async fn force_enabled(
        &self,
        target: &EnablementTarget,
        guild_id: Option<Id<GuildMarker>>,
        enabled: bool,
    ) -> Result<(), RegistryError> {
        self.guarded(target)?;

        match guild_id {
            Some(guild_id) => self
                .settings
                .set_enabled(guild_id, &target.settings_key(), enabled)
                .await
                .map_err(RegistryError::Settings)?,
            None => {
                let mut state = self.write();
                if enabled {
                    state.disabled.remove(target);
                } else {
                    state.disabled.insert(target.clone());
                }
            },
        }

        tracing::info!(
            "{} {} {}",
            if enabled { "enabled" } else { "disabled" },
            target.settings_key(),
            guild_id.map_or_else(|| "globally".to_owned(), |g| format!("in guild {g}"))
        );
        Ok(())
    }

    fn globally_enabled(&self, target: &EnablementTarget) -> bool {
        !self.read().disabled.contains(target)
    }

    async fn scope_enabled(&self, target: &EnablementTarget, guild_id: Option<Id<GuildMarker>>) -> anyhow::Result<bool> {
        match guild_id {
            Some(guild_id) => Ok(self
                .settings
                .enabled(guild_id, &target.settings_key())
                .await?
                .unwrap_or(true)),
            None => Ok(true),
        }
    }

    pub async fn is_group_enabled(&self, group: &CommandGroup, guild_id: Option<Id<GuildMarker>>) -> anyhow::Result<bool> {
        let target = EnablementTarget::Group(group.id.clone());
        Ok(self.globally_enabled(&target) && self.scope_enabled(&target, guild_id).await?)
    }

    /// Effective enablement: the command and its group must both be enabled globally and in
    /// the scope.
    pub async fn is_enabled(&self, command: &RegisteredCommand, guild_id: Option<Id<GuildMarker>>) -> anyhow::Result<bool> {
        let target = command.target();
        if !self.globally_enabled(&target) || !self.is_group_enabled(&command.group, guild_id).await? {
            return Ok(false);
        }
        self.scope_enabled(&target, guild_id).await
    }
}
