//! Parsing of `:` commands.
//!
//! Counts are optional and default to 1. Descriptions and texts run to the
//! end of the line; where a colour follows a description, the colour is the
//! last word.

use thiserror::Error;

/// A parsed `:` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorCommand {
    /// `q` / `q!`
    Quit { force: bool },
    /// `w [path]`
    Write(Option<String>),
    /// `e path`
    Open(String),
    /// `e!`: reload the current file, discarding changes (undoable)
    Reload,
    /// `import path`: append the sequences of a file
    Import(String),
    /// `new`
    New,
    Undo,
    Redo,
    Help,
    /// `<n>`: 1-based column
    GotoColumn(usize),
    /// `gap [n]`
    InsertGaps(usize),
    /// `ins TEXT`
    Insert(String),
    /// `del [n]`
    Delete(usize),
    /// `mark [n] DESCRIPTION`
    Mark { count: usize, description: String },
    /// `unmark [n]`
    Unmark(usize),
    /// `ann DESCRIPTION COLOR`
    AddAnnotation { description: String, color: String },
    /// `rmann DESCRIPTION`
    RemoveAnnotation(String),
    /// `color DESCRIPTION COLOR`
    Recolor { description: String, color: String },
    /// `annname DESCRIPTION = NEW DESCRIPTION`
    RenameAnnotation { description: String, new_description: String },
    /// `rename NAME`
    Rename(String),
    /// `seq NAME [TEXT]`
    AddSequence { name: String, text: String },
    /// `drop`
    DropSequence,
    /// `replace TEXT`
    Replace(String),
    /// `aa`
    AminoAcids,
    /// `hide [n]`
    Hide(usize),
    /// `reveal [n]`, all hidden columns without a count
    Reveal(Option<usize>),
    /// `wrap`
    ToggleWrap,
    /// `cols n`
    Columns(usize),
    /// `showhidden`
    ToggleShowHidden,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    Unknown(String),

    #[error("{0}: missing {1}")]
    MissingArgument(&'static str, &'static str),

    #[error("Not a valid number: {0}")]
    InvalidNumber(String),
}

/// Parses the text typed after `:`.
pub fn parse_command(input: &str) -> Result<EditorCommand, CommandError> {
    let input = input.trim();
    let (word, rest) = match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (input, ""),
    };

    let command = match word {
        "q" | "quit" => EditorCommand::Quit { force: false },
        "q!" | "quit!" => EditorCommand::Quit { force: true },
        "w" | "write" => EditorCommand::Write(non_empty(rest)),
        "e!" | "edit!" => EditorCommand::Reload,
        "e" | "edit" => EditorCommand::Open(required(rest, "e", "file path")?),
        "import" => EditorCommand::Import(required(rest, "import", "file path")?),
        "new" => EditorCommand::New,
        "u" | "undo" => EditorCommand::Undo,
        "redo" => EditorCommand::Redo,
        "h" | "help" => EditorCommand::Help,
        "gap" => EditorCommand::InsertGaps(count(rest)?),
        "ins" => EditorCommand::Insert(required(rest, "ins", "letters")?),
        "del" => EditorCommand::Delete(count(rest)?),
        "mark" => {
            let (count, description) = leading_count(rest)?;
            EditorCommand::Mark {
                count,
                description: required(description, "mark", "annotation")?,
            }
        }
        "unmark" => EditorCommand::Unmark(count(rest)?),
        "ann" => {
            let (description, color) = description_and_color(rest, "ann")?;
            EditorCommand::AddAnnotation { description, color }
        }
        "rmann" => EditorCommand::RemoveAnnotation(required(rest, "rmann", "annotation")?),
        "color" => {
            let (description, color) = description_and_color(rest, "color")?;
            EditorCommand::Recolor { description, color }
        }
        "annname" => match rest.split_once('=') {
            Some((old, new)) if !old.trim().is_empty() && !new.trim().is_empty() => {
                EditorCommand::RenameAnnotation {
                    description: old.trim().to_string(),
                    new_description: new.trim().to_string(),
                }
            }
            _ => return Err(CommandError::MissingArgument("annname", "OLD = NEW")),
        },
        "rename" => EditorCommand::Rename(required(rest, "rename", "name")?),
        "seq" => {
            let name_and_text = required(rest, "seq", "name")?;
            let (name, text) = match name_and_text.split_once(char::is_whitespace) {
                Some((name, text)) => (name.to_string(), text.trim().to_string()),
                None => (name_and_text, String::new()),
            };
            EditorCommand::AddSequence { name, text }
        }
        "drop" => EditorCommand::DropSequence,
        "replace" => EditorCommand::Replace(rest.to_string()),
        "aa" => EditorCommand::AminoAcids,
        "hide" => EditorCommand::Hide(count(rest)?),
        "reveal" => EditorCommand::Reveal(if rest.is_empty() { None } else { Some(count(rest)?) }),
        "wrap" => EditorCommand::ToggleWrap,
        "cols" => {
            let value = required(rest, "cols", "column count")?;
            EditorCommand::Columns(number(&value)?)
        }
        "showhidden" => EditorCommand::ToggleShowHidden,
        _ => match input.parse::<usize>() {
            Ok(col) => EditorCommand::GotoColumn(col),
            Err(_) => return Err(CommandError::Unknown(input.to_string())),
        },
    };
    Ok(command)
}

fn non_empty(rest: &str) -> Option<String> {
    (!rest.is_empty()).then(|| rest.to_string())
}

fn required(rest: &str, command: &'static str, what: &'static str) -> Result<String, CommandError> {
    non_empty(rest).ok_or(CommandError::MissingArgument(command, what))
}

fn number(value: &str) -> Result<usize, CommandError> {
    value
        .parse()
        .map_err(|_| CommandError::InvalidNumber(value.to_string()))
}

fn count(rest: &str) -> Result<usize, CommandError> {
    if rest.is_empty() {
        Ok(1)
    } else {
        number(rest)
    }
}

/// Splits an optional leading count from the rest of the line.
fn leading_count(rest: &str) -> Result<(usize, &str), CommandError> {
    let (first, tail) = match rest.split_once(char::is_whitespace) {
        Some((first, tail)) => (first, tail.trim()),
        None => (rest, ""),
    };
    if !first.is_empty() && first.chars().all(|c| c.is_ascii_digit()) {
        Ok((number(first)?, tail))
    } else {
        Ok((1, rest))
    }
}

fn description_and_color(rest: &str, command: &'static str) -> Result<(String, String), CommandError> {
    match rest.rsplit_once(char::is_whitespace) {
        Some((description, color)) if !description.trim().is_empty() => {
            Ok((description.trim().to_string(), color.to_string()))
        }
        _ if rest.is_empty() => Err(CommandError::MissingArgument(command, "annotation")),
        _ => Err(CommandError::MissingArgument(command, "colour")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse_command("q"), Ok(EditorCommand::Quit { force: false }));
        assert_eq!(parse_command("q!"), Ok(EditorCommand::Quit { force: true }));
        assert_eq!(parse_command("  new "), Ok(EditorCommand::New));
        assert_eq!(parse_command("undo"), Ok(EditorCommand::Undo));
        assert_eq!(parse_command("redo"), Ok(EditorCommand::Redo));
        assert_eq!(parse_command("drop"), Ok(EditorCommand::DropSequence));
        assert_eq!(parse_command("aa"), Ok(EditorCommand::AminoAcids));
        assert_eq!(parse_command("wrap"), Ok(EditorCommand::ToggleWrap));
        assert_eq!(parse_command("showhidden"), Ok(EditorCommand::ToggleShowHidden));
    }

    #[test]
    fn test_write_and_open() {
        assert_eq!(parse_command("w"), Ok(EditorCommand::Write(None)));
        assert_eq!(
            parse_command("w out dir/doc.json"),
            Ok(EditorCommand::Write(Some("out dir/doc.json".to_string())))
        );
        assert_eq!(parse_command("e doc.json"), Ok(EditorCommand::Open("doc.json".to_string())));
        assert_eq!(parse_command("e"), Err(CommandError::MissingArgument("e", "file path")));
        assert_eq!(parse_command("e!"), Ok(EditorCommand::Reload));
        assert_eq!(
            parse_command("import more.fa"),
            Ok(EditorCommand::Import("more.fa".to_string()))
        );
    }

    #[test]
    fn test_counts() {
        assert_eq!(parse_command("gap"), Ok(EditorCommand::InsertGaps(1)));
        assert_eq!(parse_command("gap 3"), Ok(EditorCommand::InsertGaps(3)));
        assert_eq!(parse_command("del 2"), Ok(EditorCommand::Delete(2)));
        assert_eq!(parse_command("hide 4"), Ok(EditorCommand::Hide(4)));
        assert_eq!(parse_command("reveal"), Ok(EditorCommand::Reveal(None)));
        assert_eq!(parse_command("reveal 2"), Ok(EditorCommand::Reveal(Some(2))));
        assert_eq!(parse_command("cols 60"), Ok(EditorCommand::Columns(60)));
        assert_eq!(
            parse_command("gap -1"),
            Err(CommandError::InvalidNumber("-1".to_string()))
        );
        assert_eq!(parse_command("cols"), Err(CommandError::MissingArgument("cols", "column count")));
    }

    #[test]
    fn test_goto_column() {
        assert_eq!(parse_command("42"), Ok(EditorCommand::GotoColumn(42)));
    }

    #[test]
    fn test_mark() {
        assert_eq!(
            parse_command("mark 3 exon one"),
            Ok(EditorCommand::Mark {
                count: 3,
                description: "exon one".to_string()
            })
        );
        assert_eq!(
            parse_command("mark exon1"),
            Ok(EditorCommand::Mark {
                count: 1,
                description: "exon1".to_string()
            })
        );
        assert_eq!(parse_command("mark 3"), Err(CommandError::MissingArgument("mark", "annotation")));
        assert_eq!(parse_command("unmark 5"), Ok(EditorCommand::Unmark(5)));
    }

    #[test]
    fn test_annotation_commands() {
        assert_eq!(
            parse_command("ann signal peptide #00ff00"),
            Ok(EditorCommand::AddAnnotation {
                description: "signal peptide".to_string(),
                color: "#00ff00".to_string()
            })
        );
        assert_eq!(
            parse_command("color exon1 red"),
            Ok(EditorCommand::Recolor {
                description: "exon1".to_string(),
                color: "red".to_string()
            })
        );
        assert_eq!(parse_command("ann exon1"), Err(CommandError::MissingArgument("ann", "colour")));
        assert_eq!(parse_command("ann"), Err(CommandError::MissingArgument("ann", "annotation")));
        assert_eq!(
            parse_command("annname exon 1 = exon one"),
            Ok(EditorCommand::RenameAnnotation {
                description: "exon 1".to_string(),
                new_description: "exon one".to_string()
            })
        );
        assert_eq!(
            parse_command("annname exon1"),
            Err(CommandError::MissingArgument("annname", "OLD = NEW"))
        );
        assert_eq!(
            parse_command("rmann signal peptide"),
            Ok(EditorCommand::RemoveAnnotation("signal peptide".to_string()))
        );
    }

    #[test]
    fn test_sequence_commands() {
        assert_eq!(
            parse_command("seq gene2 ac gt"),
            Ok(EditorCommand::AddSequence {
                name: "gene2".to_string(),
                text: "ac gt".to_string()
            })
        );
        assert_eq!(
            parse_command("seq empty"),
            Ok(EditorCommand::AddSequence {
                name: "empty".to_string(),
                text: String::new()
            })
        );
        assert_eq!(parse_command("rename new name"), Ok(EditorCommand::Rename("new name".to_string())));
        assert_eq!(parse_command("ins acg"), Ok(EditorCommand::Insert("acg".to_string())));
        assert_eq!(parse_command("replace"), Ok(EditorCommand::Replace(String::new())));
    }

    #[test]
    fn test_unknown() {
        assert_eq!(parse_command("frobnicate"), Err(CommandError::Unknown("frobnicate".to_string())));
        assert_eq!(parse_command(""), Err(CommandError::Unknown(String::new())));
    }
}
