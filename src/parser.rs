//! Turns a raw command line into a classified [`CommandLine`].
//!
//! The line is split on unquoted `|` characters, each segment is tokenized
//! by the lexer, its redirects are checked against its position in the
//! pipeline, and finally each segment becomes a [`Stage`]. Any failure
//! rejects the whole line.

use crate::error::MalformedLine;
use crate::lexer::{Token, TokenKind, split_into_tokens};
use crate::pipeline::{CommandLine, InputSource, OutputMode, OutputSink, Pipeline, Stage, StagePosition};
use std::path::PathBuf;

const PIPE: char = '|';
const QUOTE: char = '"';

/// Whether a line should be skipped without producing a pipeline.
///
/// Lines that are empty, only whitespace, or start with a space are ignored.
pub fn is_empty_line(line: &str) -> bool {
    line.starts_with(' ') || line.trim().is_empty()
}

/// Splits a line into pipeline segments.
///
/// A `|` inside a double-quoted span is ordinary text. The number of
/// segments is always the number of separating pipes plus one, so `a |`
/// yields an empty second segment.
pub fn split_segments(line: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut quoted = false;

    for (i, ch) in line.char_indices() {
        match ch {
            QUOTE => quoted = !quoted,
            PIPE if !quoted => {
                segments.push(&line[start..i]);
                start = i + PIPE.len_utf8();
            }
            _ => {}
        }
    }
    segments.push(&line[start..]);
    segments
}

/// Checks the redirect counts of the stage at `index` (0-based) of `count`.
pub fn validate_redirects(tokens: &[Token], index: usize, count: usize) -> Result<(), MalformedLine> {
    let inputs = tokens.iter().filter(|t| t.kind == TokenKind::RedirectIn).count();
    let outputs = tokens
        .iter()
        .filter(|t| matches!(t.kind, TokenKind::RedirectOutTruncate | TokenKind::RedirectOutAppend))
        .count();

    let position = StagePosition::of(index, count);
    let (max_inputs, max_outputs) = position.redirect_limits();
    if inputs > max_inputs || outputs > max_outputs {
        return Err(MalformedLine::IllegalRedirect {
            stage: index + 1,
            position,
        });
    }
    Ok(())
}

/// Builds a stage from its tokens.
///
/// Each redirect consumes the following word as its file name; neither
/// appears in the resulting `argv`. `stage` is the 1-based stage number
/// used in error reports. Redirect counts are assumed to have been
/// checked by [`validate_redirects`] already.
pub fn build_stage(tokens: Vec<Token>, stage: usize) -> Result<Stage, MalformedLine> {
    let mut argv = Vec::new();
    let mut input = InputSource::Inherit;
    let mut output = OutputSink::Inherit;
    let mut mode = OutputMode::Truncate;

    let mut tokens = tokens.into_iter();
    while let Some(token) = tokens.next() {
        match token.kind {
            TokenKind::Word => argv.push(token.text),
            TokenKind::Terminator => break,
            kind => {
                let target = match tokens.next() {
                    Some(Token {
                        kind: TokenKind::Word,
                        text,
                    }) if !text.is_empty() => PathBuf::from(text),
                    _ => return Err(MalformedLine::MissingRedirectTarget { stage }),
                };
                match kind {
                    TokenKind::RedirectIn => input = InputSource::File(target),
                    TokenKind::RedirectOutAppend => {
                        output = OutputSink::File(target);
                        mode = OutputMode::Append;
                    }
                    _ => {
                        output = OutputSink::File(target);
                        mode = OutputMode::Truncate;
                    }
                }
            }
        }
    }

    match argv.first() {
        Some(name) if !name.is_empty() => Ok(Stage {
            argv,
            input,
            output,
            mode,
        }),
        _ => Err(MalformedLine::EmptyCommand { stage }),
    }
}

/// Parses and classifies a full command line.
///
/// `is_internal` decides whether a command name belongs to a built-in. When
/// the first stage starts with one, the line becomes
/// [`CommandLine::Internal`] carrying that stage's words as typed, redirect
/// operators included; downstream stages are dropped. Every stage, built-in
/// or not, must still form a valid stage, so `setenv A >` is rejected for
/// its missing redirect target. A trailing newline is ignored.
///
/// # Errors
/// Any [`MalformedLine`] in any stage rejects the whole line.
pub fn parse_line(line: &str, is_internal: impl Fn(&str) -> bool) -> Result<CommandLine, MalformedLine> {
    let line = line.trim_end_matches(['\n', '\r']);
    if is_empty_line(line) {
        return Ok(CommandLine::Empty);
    }

    let segments = split_segments(line);
    let count = segments.len();
    tracing::debug!("parsing {count} segment(s): {segments:?}");

    let mut lexed = Vec::with_capacity(count);
    for (index, segment) in segments.iter().enumerate() {
        let tokens = split_into_tokens(segment)?;
        validate_redirects(&tokens, index, count)?;
        if !tokens.iter().any(|t| t.kind == TokenKind::Word) {
            return Err(MalformedLine::EmptyCommand { stage: index + 1 });
        }
        lexed.push(tokens);
    }

    let first = &lexed[0][0];
    let internal = (first.kind == TokenKind::Word && is_internal(&first.text)).then(|| {
        lexed[0]
            .iter()
            .filter(|t| t.kind != TokenKind::Terminator)
            .map(|t| t.text.clone())
            .collect::<Vec<_>>()
    });

    // Built-in lines go through the stage builder too, so a dangling
    // redirect is rejected the same way for every command.
    let stages = lexed
        .into_iter()
        .enumerate()
        .map(|(index, tokens)| build_stage(tokens, index + 1))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(words) = internal {
        if count > 1 {
            tracing::debug!("built-in {} ignores {} downstream stage(s)", words[0], count - 1);
        }
        return Ok(CommandLine::Internal(words));
    }

    Pipeline::new(stages)
        .map(CommandLine::External)
        .ok_or(MalformedLine::EmptyCommand { stage: 1 })
}
