//! Pre-dispatch session commands.
//!
//! The protocol engine consults this table before its default command
//! handling; a hit fully answers the command with a [`CommandReply`], a
//! miss falls through to the engine. Commands that advertise a feature
//! token show up in `features()` for the engine's FEAT response.
//!
//! The table ships with [`LangCommand`], which switches the session
//! locale among the catalog's registered tags.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::vfs::session::VirtualFs;

/// A finished protocol reply: status code plus one line of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub code: u16,
    pub text: String,
}

impl CommandReply {
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
        }
    }
}

/// A session-scoped command the engine does not handle itself.
#[async_trait]
pub trait SessionCommand: Send + Sync {
    /// Command verb, uppercase.
    fn name(&self) -> &'static str;

    /// Token to advertise in the engine's feature list, if any.
    fn feature(&self) -> Option<&'static str> {
        None
    }

    /// Answer the command against the session's filesystem state.
    async fn handle(&self, args: &str, session: &mut VirtualFs) -> CommandReply;
}

/// Capability table the engine checks before default dispatch.
#[derive(Default)]
pub struct CommandTable {
    commands: HashMap<String, Arc<dyn SessionCommand>>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table pre-loaded with the built-in commands.
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        table.register(LangCommand);
        table
    }

    pub fn register(&mut self, command: impl SessionCommand + 'static) {
        self.commands
            .insert(command.name().to_ascii_uppercase(), Arc::new(command));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(&name.to_ascii_uppercase())
    }

    /// Run `command` if the table owns it; `None` means the engine should
    /// proceed with its own handling.
    pub async fn dispatch(
        &self,
        command: &str,
        args: &str,
        session: &mut VirtualFs,
    ) -> Option<CommandReply> {
        let handler = self.commands.get(&command.to_ascii_uppercase())?;
        Some(handler.handle(args, session).await)
    }

    /// Feature tokens of every registered command, sorted.
    pub fn features(&self) -> Vec<&'static str> {
        let mut features: Vec<_> = self
            .commands
            .values()
            .filter_map(|command| command.feature())
            .collect();
        features.sort_unstable();
        features
    }
}

impl std::fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.commands.keys().collect();
        names.sort();
        f.debug_struct("CommandTable").field("commands", &names).finish()
    }
}

/// `LANG <tag>` — switch the session locale.
pub struct LangCommand;

#[async_trait]
impl SessionCommand for LangCommand {
    fn name(&self) -> &'static str {
        "LANG"
    }

    fn feature(&self) -> Option<&'static str> {
        Some("LANG")
    }

    async fn handle(&self, args: &str, session: &mut VirtualFs) -> CommandReply {
        let Some(tag) = args.split_whitespace().next() else {
            return CommandReply::new(501, "Missing language code");
        };
        let tag = tag.to_ascii_lowercase();
        if session.messages().supports(&tag) {
            session.set_locale(&tag);
            CommandReply::new(200, format!("Language set to {tag}"))
        } else {
            CommandReply::new(504, "Language not supported")
        }
    }
}
