//! The argument type system.
//!
//! Every argument names one or more type IDs. A type ID resolves to an [`ArgumentType`], which
//! knows how to check a raw reply ([`ArgumentType::validate`]), turn it into an [`ArgValue`]
//! ([`ArgumentType::parse`]) and decide whether the reply counts as "nothing given"
//! ([`ArgumentType::is_empty`]).
//!
//! The built-in types live in [`builtin`]. An argument with several type IDs is backed by a
//! [`union::UnionType`], which the registry builds on demand for IDs written as `a|b`.

use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use twilight_model::id::Id;
use twilight_model::id::marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker};

use self::builtin::BuiltinType;
use self::union::UnionType;
use super::arguments::ArgumentSpec;
use super::errors::ConfigurationError;
use super::group::CommandGroup;
use super::registry::{CommandRegistry, RegisteredCommand};
use crate::directory::GuildDirectory;

pub mod builtin;
pub mod union;

/// A parsed argument value.
#[derive(Clone, Debug)]
pub enum ArgValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    User(Id<UserMarker>),
    Channel(Id<ChannelMarker>),
    Role(Id<RoleMarker>),
    Command(Arc<RegisteredCommand>),
    Group(Arc<CommandGroup>),
    /// Values of an infinite argument, in the order they were given.
    List(Vec<ArgValue>),
}
impl ArgValue {
    pub fn as_str(&self) -> Option<&str> {
        if let Self::String(s) = self { Some(s) } else { None }
    }

    pub fn as_integer(&self) -> Option<i64> {
        if let Self::Integer(i) = self { Some(*i) } else { None }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        if let Self::Boolean(b) = self { Some(*b) } else { None }
    }

    pub fn as_user(&self) -> Option<Id<UserMarker>> {
        if let Self::User(id) = self { Some(*id) } else { None }
    }

    pub fn as_channel(&self) -> Option<Id<ChannelMarker>> {
        if let Self::Channel(id) = self { Some(*id) } else { None }
    }

    pub fn as_role(&self) -> Option<Id<RoleMarker>> {
        if let Self::Role(id) = self { Some(*id) } else { None }
    }

    pub fn as_command(&self) -> Option<&Arc<RegisteredCommand>> {
        if let Self::Command(c) = self { Some(c) } else { None }
    }

    pub fn as_group(&self) -> Option<&Arc<CommandGroup>> {
        if let Self::Group(g) = self { Some(g) } else { None }
    }

    pub fn as_list(&self) -> Option<&[ArgValue]> {
        if let Self::List(l) = self { Some(l) } else { None }
    }
}
impl Display for ArgValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s:?}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::User(id) => write!(f, "<@{id}>"),
            Self::Channel(id) => write!(f, "<#{id}>"),
            Self::Role(id) => write!(f, "<@&{id}>"),
            Self::Command(c) => write!(f, "command:{}", c.name()),
            Self::Group(g) => write!(f, "group:{}", g.id),
            Self::List(values) => {
                f.write_str("[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            },
        }
    }
}

/// Collected argument values keyed by argument key, in declaration order.
#[derive(Clone, Debug, Default)]
pub struct ArgValues(Vec<(String, ArgValue)>);
impl ArgValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ArgValue) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ArgValue::as_str)
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(ArgValue::as_integer)
    }

    pub fn list(&self, key: &str) -> Option<&[ArgValue]> {
        self.get(key).and_then(ArgValue::as_list)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}
impl Display for ArgValues {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key}: {value}")?;
        }
        f.write_str("}")
    }
}

/// Result of validating a raw value.
#[derive(Clone, Debug, PartialEq)]
pub enum Validation {
    Valid,
    /// Rejected, optionally with a message to show instead of the generic retry prompt.
    Invalid(Option<String>),
}
impl Validation {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid(Some(reason.into()))
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Invalid(Some(reason)) => Some(reason),
            _ => None,
        }
    }
}

/// Who and where a value is being coerced for, plus what has been collected so far.
pub struct TypeCtxt<'a> {
    pub author: Id<UserMarker>,
    pub channel_id: Id<ChannelMarker>,
    pub guild_id: Option<Id<GuildMarker>>,
    pub registry: &'a CommandRegistry,
    pub directory: &'a dyn GuildDirectory,
    /// Values of the arguments declared before the one being obtained.
    pub collected: &'a ArgValues,
}

/// A coercion strategy for one type ID.
#[async_trait]
pub trait ArgumentType: Send + Sync {
    async fn validate(&self, raw: &str, cx: &TypeCtxt<'_>, arg: &ArgumentSpec) -> Validation;

    /// Converts a value that passed [`ArgumentType::validate`].
    async fn parse(&self, raw: &str, cx: &TypeCtxt<'_>, arg: &ArgumentSpec) -> Option<ArgValue>;

    fn is_empty(&self, raw: &str, _cx: &TypeCtxt<'_>, _arg: &ArgumentSpec) -> bool {
        raw.trim().is_empty()
    }
}

pub type TArgumentType = Arc<dyn ArgumentType>;

/// Type ID → strategy map.
pub struct TypeRegistry {
    types: RwLock<HashMap<String, TArgumentType>>,
}
impl TypeRegistry {
    /// An empty registry. Most callers want [`TypeRegistry::with_builtins`].
    pub fn new() -> Self {
        Self {
            types: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_builtins() -> Self {
        let registry = Self::new();
        {
            let mut types = registry.types.write().unwrap_or_else(|e| e.into_inner());
            for builtin in BuiltinType::ALL {
                types.insert(builtin.id().to_owned(), Arc::new(builtin) as TArgumentType);
            }
        }
        registry
    }

    pub fn register(&self, id: impl Into<String>, strategy: TArgumentType) -> Result<(), ConfigurationError> {
        let id = id.into();
        if id.contains('|') {
            return Err(ConfigurationError::InvalidName(id));
        }

        let mut types = self.types.write().unwrap_or_else(|e| e.into_inner());
        if types.contains_key(&id) {
            return Err(ConfigurationError::DuplicateType(id));
        }
        types.insert(id, strategy);
        Ok(())
    }

    /// Resolves a type ID. `a|b|c` resolves to a union of `a`, `b` and `c` (in that order) as long
    /// as every member resolves.
    pub fn resolve(&self, id: &str) -> Option<TArgumentType> {
        if id.contains('|') {
            return self.resolve_union(id.split('|'));
        }

        let types = self.types.read().unwrap_or_else(|e| e.into_inner());
        types.get(id).cloned()
    }

    /// Resolves a list of candidate IDs into one strategy: the type itself for a single ID, a
    /// union otherwise.
    pub fn resolve_union<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> Option<TArgumentType> {
        let mut delegates = ids
            .into_iter()
            .map(|id| self.resolve(id.trim()))
            .collect::<Option<Vec<_>>>()?;

        match delegates.len() {
            0 => None,
            1 => delegates.pop(),
            _ => Some(Arc::new(UnionType::new(delegates))),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.resolve(id).is_some()
    }
}
impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
