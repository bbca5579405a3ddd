/// A named bucket of commands. Disabling a group disables every command in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandGroup {
    /// Lowercase identifier commands refer to.
    pub id: String,
    /// Display name used by help.
    pub name: String,
    pub description: String,
    /// Guarded groups can't be disabled.
    pub guarded: bool,
}
impl CommandGroup {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            guarded: false,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn guarded(mut self, guarded: bool) -> Self {
        self.guarded = guarded;
        self
    }
}
