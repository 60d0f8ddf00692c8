//! Chat command line parsing.

/// A chat line resolved into a command word and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Whether the line used the privileged-dispatch keyword.
    pub privileged: bool,
    /// Command name; empty when the keyword was given without a name.
    pub name: String,
    pub args: Vec<String>,
}

/// Resolves a chat line into a [`CommandLine`].
///
/// The leading `/` is stripped and the rest is split with [`shell_split`].
/// When the first word is `keyword`, the second word is the command name
/// and the line is privileged. Returns `None` for a line with no words.
pub fn parse_command_line(text: &str, keyword: &str) -> Option<CommandLine> {
    let body = text.trim_start().strip_prefix('/').unwrap_or(text);
    let mut words = shell_split(body).into_iter();
    let first = words.next()?;

    if first == keyword {
        Some(CommandLine {
            privileged: true,
            name: words.next().unwrap_or_default(),
            args: words.collect(),
        })
    } else {
        Some(CommandLine {
            privileged: false,
            name: first,
            args: words.collect(),
        })
    }
}

/// Simple shell-like argument splitting for plain text.
///
/// Handles:
/// - Whitespace-separated arguments
/// - Quoted strings (single and double quotes)
/// - Escape sequences within double quotes
pub fn shell_split(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escape_next = false;
    // Distinguishes `""` (an empty argument) from no argument at all.
    let mut quoted = false;

    for ch in input.chars() {
        if escape_next {
            current.push(ch);
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_double_quote => {
                escape_next = true;
            }
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
                quoted = true;
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
                quoted = true;
            }
            c if c.is_whitespace() && !in_single_quote && !in_double_quote => {
                if !current.is_empty() || quoted {
                    args.push(std::mem::take(&mut current));
                }
                quoted = false;
            }
            _ => {
                current.push(ch);
            }
        }
    }

    if !current.is_empty() || quoted {
        args.push(current);
    }

    args
}
