use std::fmt;

use colored::Colorize;
use dialoguer::{console::Term, theme::ColorfulTheme, Input, Password, Select};
use error_stack::{IntoReport, Result, ResultExt};

#[derive(Debug)]
pub struct DialoguerError;

impl fmt::Display for DialoguerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Dialoguer error")
    }
}

impl std::error::Error for DialoguerError {}

pub type DialoguerResult<T> = error_stack::Result<T, DialoguerError>;

const NONE_LABEL: &str = "None";
const ABORT_LABEL: &str = "❌ Abort";

/// Answer to a question that offers an abort entry and, optionally, a "None" entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Item(usize),
    None,
    Abort,
}

impl Choice {
    /// Maps a raw menu index back to a choice, given the layout built by [`Dialoguer::question`].
    fn from_index(index: usize, items_len: usize, none_choice: bool) -> Self {
        let offset = usize::from(none_choice);
        if none_choice && index == 0 {
            Choice::None
        } else if index >= items_len + offset {
            Choice::Abort
        } else {
            Choice::Item(index - offset)
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dialoguer;

impl Dialoguer {
    /// Asks the user to pick one of `items`, with an abort entry appended.
    ///
    /// A single item is answered without prompting, unless a "None" entry is requested.
    /// Escaping the prompt counts as an abort.
    pub fn question<T>(prompt_text: String, items: &[T], none_choice: bool) -> DialoguerResult<Choice>
    where
        T: ToString,
    {
        if items.len() == 1 && !none_choice {
            return Ok(Choice::Item(0));
        }

        let mut choices = vec![];
        if none_choice {
            choices.push(NONE_LABEL.to_string());
        }
        choices.extend(items.iter().map(|item| item.to_string()));
        choices.push(ABORT_LABEL.to_string());

        let colorful_theme = &ColorfulTheme::default();
        let mut select = Select::with_theme(colorful_theme);
        let dialog = select
            .with_prompt(&prompt_text)
            .items(&choices)
            .default(0);
        let selection = dialog
            .interact_on_opt(&Term::stderr())
            .into_report()
            .change_context(DialoguerError)?;

        Ok(match selection {
            Some(index) => Choice::from_index(index, items.len(), none_choice),
            None => Choice::Abort,
        })
    }

    pub fn select_yes_or_no(prompt_text: String, default: bool) -> Result<bool, DialoguerError> {
        let colorful_theme = &ColorfulTheme::default();
        let mut select = Select::with_theme(colorful_theme);
        let dialog = select
            .with_prompt(&prompt_text)
            .item("yes")
            .item("no")
            .default(if default { 0 } else { 1 });
        let opt = dialog
            .interact_on_opt(&Term::stderr())
            .into_report()
            .change_context(DialoguerError)?
            .ok_or(DialoguerError)
            .into_report()
            .attach_printable("No answer was given")?;

        Ok(opt == 0)
    }

    pub fn input(prompt_text: String) -> Result<String, DialoguerError> {
        let colorful_theme = &ColorfulTheme::default();
        let mut input = Input::with_theme(colorful_theme);
        let dialog: String = input
            .with_prompt(&prompt_text)
            .interact_text()
            .into_report()
            .change_context(DialoguerError)?;

        Ok(dialog)
    }

    pub fn password(prompt_text: String) -> Result<String, DialoguerError> {
        let colorful_theme = &ColorfulTheme::default();
        let mut input = Password::with_theme(colorful_theme);
        let dialog: String = input
            .with_prompt(&prompt_text)
            .interact()
            .into_report()
            .change_context(DialoguerError)?;

        Ok(dialog)
    }

    pub fn clear() {
        if Term::stdout().clear_screen().is_err() {
            println!("{}", "-".repeat(40).dimmed());
        }
    }
}
