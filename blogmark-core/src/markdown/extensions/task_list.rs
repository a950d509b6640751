//! `- [ ]` / `- [x]` task list items.

use crate::markdown::registry::{DocumentEnv, Extension, ExtensionError, Hook};
use crate::markdown::token::{walk_tokens_mut, Token, TokenType};
use serde::{Deserialize, Serialize};

pub const NAME: &str = "task-list";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskListOptions {
    /// Leave checkboxes clickable instead of `disabled`.
    pub enabled: bool,
    /// Wrap the item text in a `<label for=…>`.
    pub label: bool,
}

impl Default for TaskListOptions {
    fn default() -> Self {
        Self {
            enabled: false,
            label: true,
        }
    }
}

pub struct TaskList {
    options: TaskListOptions,
}

impl TaskList {
    pub fn new(options: TaskListOptions) -> Self {
        Self { options }
    }

    /// Turn `item` into a task item if its text starts with a marker.
    fn convert_item(&self, item: &mut Token, env: &mut DocumentEnv) -> bool {
        let run = match item.children.first().map(|t| t.ty) {
            Some(TokenType::Paragraph) => &mut item.children[0].children,
            Some(TokenType::Text) => &mut item.children,
            _ => return false,
        };
        let Some(checked) = strip_marker(run) else {
            return false;
        };

        let id = env.next_id("task-item");
        let mut checkbox = Token::new(TokenType::TaskCheckbox)
            .with_attr("class", "task-list-item-checkbox")
            .with_attr("type", "checkbox");
        if self.options.label {
            checkbox.attrs.set("id", id.clone());
        }
        if checked {
            checkbox.attrs.set("checked", "");
        }
        if !self.options.enabled {
            checkbox.attrs.set("disabled", "");
        }

        if self.options.label {
            let inline_len = run.iter().take_while(|t| t.ty.is_inline()).count();
            let text: Vec<Token> = run.drain(..inline_len).collect();
            let label = Token::new(TokenType::Label)
                .with_attr("for", id)
                .with_children(text);
            run.insert(0, label);
        }
        run.insert(0, checkbox);

        item.attrs.add_class("task-list-item");
        true
    }
}

/// Remove a leading `[ ] `, `[x] ` or `[X] ` and report whether it was checked.
fn strip_marker(run: &mut Vec<Token>) -> Option<bool> {
    let first = run.first_mut().filter(|t| t.ty == TokenType::Text)?;
    let checked = match first.content.get(..4)? {
        "[ ] " => false,
        "[x] " | "[X] " => true,
        _ => return None,
    };
    first.content.drain(..4);
    if first.content.is_empty() {
        run.remove(0);
    }
    Some(checked)
}

impl Extension for TaskList {
    fn name(&self) -> &'static str {
        NAME
    }

    fn hooks(&self) -> Vec<Hook> {
        vec![Hook::Core]
    }

    fn transform(&self, tokens: &mut Vec<Token>, env: &mut DocumentEnv) -> Result<(), ExtensionError> {
        walk_tokens_mut(tokens, &mut |token| {
            if !matches!(token.ty, TokenType::BulletList | TokenType::OrderedList) {
                return;
            }
            let mut any = false;
            for item in token
                .children
                .iter_mut()
                .filter(|t| t.ty == TokenType::ListItem)
            {
                any |= self.convert_item(item, env);
            }
            if any {
                token.attrs.add_class("contains-task-list");
            }
        });
        Ok(())
    }
}
