//! Rendering of `{placeholder}` URL templates.
//!
//! Placeholders are resolved by exact name. Doubled braces (`{{`, `}}`) stand
//! for literal braces, any other unmatched brace is an error.

use std::borrow::Cow;

/// Errors produced while rendering a template.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    /// The template references a placeholder without a value.
    #[error("URL template references placeholder '{{{0}}}', but no value was provided for it")]
    UnknownPlaceholder(String),

    /// A `{` at the given byte offset is never closed.
    #[error("Unclosed '{{' at position {0} in URL template")]
    UnclosedBrace(usize),

    /// A lone `}` at the given byte offset.
    #[error("Single '}}' encountered at position {0} in URL template")]
    UnmatchedClosingBrace(usize),
}

/// Render `template`, asking `lookup` for the value of every placeholder.
///
/// ```
/// use xyzservices_core::template::render;
///
/// let url = render("https://{s}.tile.example/{z}.png", |key| match key {
///     "s" => Some("a".into()),
///     "z" => Some("3".into()),
///     _ => None,
/// });
/// assert_eq!(url.unwrap(), "https://a.tile.example/3.png");
/// ```
pub fn render<'a, F>(template: &str, mut lookup: F) -> Result<String, TemplateError>
where
    F: FnMut(&str) -> Option<Cow<'a, str>>,
{
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '{' => {
                if chars.next_if(|&(_, c)| c == '{').is_some() {
                    out.push('{');
                    continue;
                }
                let mut end = None;
                for (i, c) in chars.by_ref() {
                    match c {
                        '}' => {
                            end = Some(i);
                            break;
                        }
                        '{' => return Err(TemplateError::UnclosedBrace(pos)),
                        _ => {}
                    }
                }
                let Some(end) = end else {
                    return Err(TemplateError::UnclosedBrace(pos));
                };
                let key = &template[pos + 1..end];
                match lookup(key) {
                    Some(value) => out.push_str(&value),
                    None => return Err(TemplateError::UnknownPlaceholder(key.to_string())),
                }
            }
            '}' => {
                if chars.next_if(|&(_, c)| c == '}').is_some() {
                    out.push('}');
                } else {
                    return Err(TemplateError::UnmatchedClosingBrace(pos));
                }
            }
            c => out.push(c),
        }
    }

    Ok(out)
}
