//! The line-oriented editing protocol.
//!
//! An editor types a command such as `quantity 5` or `bind colour $2`. The
//! host tokenizes it into [`CommandTokens`] and routes it to a product, which
//! either applies the change and answers with an [`EditReport`] or rejects it
//! with an [`EditError`] and leaves its configuration untouched.

use crate::id::{CharacterId, ProductId};
use crate::input::RecipeInput;
use crate::world::WorldCatalog;
use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

/// A tokenized editing command, consumed front to back.
///
/// Whitespace separates tokens; double quotes group words into one token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandTokens {
    pending: VecDeque<String>,
}

impl CommandTokens {
    pub fn parse(line: &str) -> Self {
        let mut pending = VecDeque::new();
        let mut current = String::new();
        let mut quoted = false;
        let mut has_token = false;
        for ch in line.chars() {
            match ch {
                '"' => {
                    quoted = !quoted;
                    has_token = true;
                }
                c if c.is_whitespace() && !quoted => {
                    if has_token {
                        pending.push_back(std::mem::take(&mut current));
                        has_token = false;
                    }
                }
                c => {
                    current.push(c);
                    has_token = true;
                }
            }
        }
        if has_token {
            pending.push_back(current);
        }
        Self { pending }
    }

    /// Take the next token.
    pub fn pop(&mut self) -> Option<String> {
        self.pending.pop_front()
    }

    /// Take the next token, lower-cased, for keyword matching.
    pub fn pop_keyword(&mut self) -> Option<String> {
        self.pop().map(|t| t.to_ascii_lowercase())
    }

    pub fn peek(&self) -> Option<&str> {
        self.pending.front().map(String::as_str)
    }

    /// Take every remaining token joined by single spaces.
    pub fn pop_rest(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest: Vec<String> = self.pending.drain(..).collect();
        Some(rest.join(" "))
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl From<&str> for CommandTokens {
    fn from(line: &str) -> Self {
        Self::parse(line)
    }
}

// ---------------------------------------------------------------------------
// Context and results
// ---------------------------------------------------------------------------

/// The character issuing an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: CharacterId,
    pub name: String,
}

/// What an edit may look at: the catalog, the owning revision's inputs and
/// the acting character.
pub struct EditContext<'a> {
    pub catalog: &'a dyn WorldCatalog,
    pub inputs: &'a [RecipeInput],
    pub actor: &'a Actor,
}

/// Feedback for an applied edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditReport {
    pub message: String,
}

impl EditReport {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A rejected edit. The product is unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("{usage}")]
    MissingArgument { usage: &'static str },
    #[error("{0}")]
    InvalidArgument(String),
    #[error("there is no {kind} identified by \"{text}\"")]
    UnknownName { kind: &'static str, text: String },
    #[error("\"{text}\" is not a valid input; this recipe has {count} input(s)")]
    InputOrdinal { text: String, count: usize },
    #[error("input ${ordinal} is {actual}, but {expected} is required")]
    IncompatibleInput {
        ordinal: usize,
        actual: &'static str,
        expected: &'static str,
    },
    #[error("{help}")]
    UnknownCommand { help: String },
}

/// Resolve an editor-typed input ordinal (`2` or `$2`, 1-based) to the input
/// and its 0-based position.
pub fn resolve_input<'a>(
    inputs: &'a [RecipeInput],
    text: &str,
) -> Result<(usize, &'a RecipeInput), EditError> {
    let trimmed = text.trim();
    let digits = trimmed.strip_prefix('$').unwrap_or(trimmed);
    let ordinal: usize = digits.parse().map_err(|_| EditError::InputOrdinal {
        text: text.to_string(),
        count: inputs.len(),
    })?;
    if ordinal == 0 || ordinal > inputs.len() {
        return Err(EditError::InputOrdinal {
            text: text.to_string(),
            count: inputs.len(),
        });
    }
    Ok((ordinal - 1, &inputs[ordinal - 1]))
}

// ---------------------------------------------------------------------------
// Edit history
// ---------------------------------------------------------------------------

/// Bounded history of applied edits, newest last.
#[derive(Debug, Clone, Default)]
pub struct EditHistory {
    entries: Vec<(ProductId, String)>,
    max_history: usize,
}

impl EditHistory {
    /// A history that keeps nothing.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_history,
        }
    }

    pub fn record(&mut self, product: ProductId, report: &EditReport) {
        if self.max_history == 0 {
            return;
        }
        self.entries.push((product, report.message.clone()));
        let excess = self.entries.len().saturating_sub(self.max_history);
        if excess > 0 {
            self.entries.drain(..excess);
        }
    }

    pub fn entries(&self) -> &[(ProductId, String)] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::InputId;
    use crate::input::InputKind;

    #[test]
    fn tokens_split_on_whitespace() {
        let mut tokens = CommandTokens::parse("  quantity   5 ");
        assert_eq!(tokens.remaining(), 2);
        assert_eq!(tokens.pop().as_deref(), Some("quantity"));
        assert_eq!(tokens.pop().as_deref(), Some("5"));
        assert!(tokens.pop().is_none());
    }

    #[test]
    fn quotes_group_words() {
        let mut tokens = CommandTokens::parse(r#"item "iron sword" extra"#);
        assert_eq!(tokens.pop().as_deref(), Some("item"));
        assert_eq!(tokens.pop().as_deref(), Some("iron sword"));
        assert_eq!(tokens.peek(), Some("extra"));
    }

    #[test]
    fn empty_quotes_make_empty_token() {
        let mut tokens = CommandTokens::parse(r#"tag """#);
        assert_eq!(tokens.pop().as_deref(), Some("tag"));
        assert_eq!(tokens.pop().as_deref(), Some(""));
    }

    #[test]
    fn keyword_is_lowercased_and_rest_is_joined() {
        let mut tokens = CommandTokens::from("BIND fine colour");
        assert_eq!(tokens.pop_keyword().as_deref(), Some("bind"));
        assert_eq!(tokens.pop_rest().as_deref(), Some("fine colour"));
        assert!(tokens.is_empty());
        assert!(tokens.pop_rest().is_none());
    }

    #[test]
    fn resolve_input_accepts_both_forms() {
        let inputs = vec![
            RecipeInput::new(InputId(7), InputKind::Item),
            RecipeInput::new(InputId(8), InputKind::Liquid),
        ];
        assert_eq!(resolve_input(&inputs, "2").unwrap().1.id, InputId(8));
        assert_eq!(resolve_input(&inputs, "$1").unwrap().0, 0);
        assert!(matches!(
            resolve_input(&inputs, "0"),
            Err(EditError::InputOrdinal { count: 2, .. })
        ));
        assert!(resolve_input(&inputs, "3").is_err());
        assert!(resolve_input(&inputs, "first").is_err());
    }

    #[test]
    fn history_is_bounded() {
        let mut history = EditHistory::with_max_history(2);
        for i in 0..3 {
            history.record(ProductId(i), &EditReport::new(format!("edit {i}")));
        }
        assert_eq!(history.entries().len(), 2);
        assert_eq!(history.entries()[0].0, ProductId(1));
    }

    #[test]
    fn no_history_by_default() {
        let mut history = EditHistory::new();
        history.record(ProductId(1), &EditReport::new("x"));
        assert!(history.entries().is_empty());
    }

    #[test]
    fn unknown_command_shows_help() {
        let err = EditError::UnknownCommand {
            help: "item <which>".into(),
        };
        assert_eq!(err.to_string(), "item <which>");
    }
}
