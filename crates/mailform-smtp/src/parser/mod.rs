//! Reply parsing.
//!
//! A reply is one or more lines `CCC-text` closed by a line `CCC text`
//! (or a bare `CCC`). The code of the reply is the code of its last line.

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// Builds a [`Reply`] from the lines of one response, terminators removed.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if there are no lines or any line lacks a
/// three-digit code.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    let mut code = None;
    let mut texts = Vec::with_capacity(lines.len());

    for line in lines {
        let (line_code, text) = split_line(line)?;
        code = Some(line_code);
        texts.push(text.to_string());
    }

    code.map(|code| Reply::new(code, texts))
        .ok_or_else(|| Error::Protocol("Empty reply".into()))
}

/// Returns true if `line` closes a reply.
///
/// Continuation lines carry `-` after the code, the last line a space.
/// A bare three-character code line is also final.
#[must_use]
pub fn is_last_reply_line(line: &str) -> bool {
    matches!(line.as_bytes(), [_, _, _] | [_, _, _, b' ', ..])
}

fn split_line(line: &str) -> Result<(ReplyCode, &str)> {
    let bytes = line.as_bytes();
    let (digits, rest) = match bytes {
        [a, b, c, rest @ ..] if [a, b, c].iter().all(|d| d.is_ascii_digit()) => {
            ([*a, *b, *c], rest)
        }
        _ => return Err(Error::Protocol(format!("Malformed reply line: {line:?}"))),
    };

    let code = digits
        .iter()
        .fold(0u16, |acc, d| acc * 10 + u16::from(d - b'0'));

    let text = match rest {
        [] => "",
        [b' ' | b'-', ..] => &line[4..],
        _ => return Err(Error::Protocol(format!("Malformed reply line: {line:?}"))),
    };

    Ok((ReplyCode::new(code), text))
}
