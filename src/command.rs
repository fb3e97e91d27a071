use crate::error::{BatchError, Result};

/// Split a job command string into an argument vector with shell-lexer
/// semantics: whitespace separates tokens, quoted substrings stay whole.
///
/// Unbalanced quoting and empty commands are rejected; the scheduler treats
/// such jobs as if they never existed.
pub fn split(command: &str) -> Result<Vec<String>> {
    let argv = shell_words::split(command)
        .map_err(|e| BatchError::MalformedCommand(format!("{command}: {e}")))?;
    if argv.is_empty() {
        return Err(BatchError::MalformedCommand(format!(
            "{command}: empty command"
        )));
    }
    Ok(argv)
}
