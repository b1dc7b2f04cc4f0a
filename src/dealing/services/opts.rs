//! Transcoder option templating and tokenization.
//!
//! Orders store option templates as percent-style strings with
//! `%{input_path}`, `%{output_path}` and `%{basename}` placeholders; tasks
//! store the instantiated argument vector. The string form quotes
//! whitespace-containing tokens and starts a new line for each `-`-leading
//! option group. That is a readability convention for the stored list, not
//! a parsing rule.

/// Instantiates an option template for one source file.
#[must_use]
pub fn render_template(template: &str, input_path: &str, output_path: &str, basename: &str) -> String {
    template
        .replace("%{input_path}", input_path)
        .replace("%{output_path}", output_path)
        .replace("%{basename}", basename)
}

/// Tokenizes an option string with shell-like double-quote rules.
#[must_use]
pub fn string_to_args(raw: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in raw.chars() {
        match ch {
            '"' => {
                in_quotes = !in_quotes;
            }
            ch if ch.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    args.push(std::mem::take(&mut current));
                }
            }
            ch => current.push(ch),
        }
    }
    if !current.is_empty() {
        args.push(current);
    }
    args
}

/// Renders an argument vector back into the stored display string.
#[must_use]
pub fn args_to_string(args: &[String]) -> String {
    args.iter()
        .map(|arg| arg.trim())
        .enumerate()
        .map(|(index, arg)| {
            if arg.chars().any(char::is_whitespace) {
                format!("\"{arg}\"")
            } else if arg.starts_with('-') && index != 0 {
                format!("\n{arg}")
            } else {
                arg.to_owned()
            }
        })
        .filter(|rendered| !rendered.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
