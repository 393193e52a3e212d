//! Pattern compilation.
//!
//! This module holds the *static* side of the engine: everything derived from
//! the pattern set once, before any message is processed.
//!
//! A composite pattern is ordinary regular-expression text with `@type`
//! placeholders mixed in. Compilation rewrites each placeholder into a named
//! capturing group that matches exactly one entity marker of the projected text
//! (see `projection.rs`) whose type label satisfies the placeholder's type
//! expression. Every other character passes through unchanged, so groups,
//! alternation and quantifiers keep their standard meaning.
//!
//! ```text
//! "@color (@pattern )?@product"
//!     │
//!     ▼ rewrite
//! "(?P<__amalgam_p0>⟪(?:color)⟫) ((?P<__amalgam_p1>⟪(?:pattern)⟫) )?(?P<__amalgam_p2>⟪(?:product)⟫)"
//!                                                           ⟪ ⟫ = MARKER_OPEN / MARKER_CLOSE
//! ```
//!
//! ## Placeholder syntax
//!
//! - `@name`: a run of word characters, inner `-`, and optionally wildcards and
//!   quantifiers (`@colou?r`, `@\w+`, `@[a-z]+`, `@poi_.*`). The run is itself
//!   a regular expression over type labels. A quantifier right after a literal
//!   name quantifies the placeholder (`@color?` is an optional color), and a
//!   trailing `-` is literal text (`@start-@end` holds two placeholders).
//! - `@(expr)`: `expr` is any regular expression over type labels (families of
//!   types, e.g. `@(color|shade)` or `@(size_.*)`). `@(?:...)` keeps its group
//!   syntax.
//! - `\@`, a bare `@` and an `@` inside a character class are literal. An `@`
//!   followed by an escape no label can match (`@\s`) is a compile error.
//!
//! A type expression must match the whole label. The rewrite is done on the
//! pattern text with escapes and character classes tracked, not by naive string
//! concatenation: the expression is wrapped in its own non-capturing group, and
//! `.` / negated classes inside it are narrowed so they can never run across a
//! marker delimiter.
//!
//! ## Invariants
//!
//! - `PatternId` is an index into `CompiledPatterns::patterns`; definition order
//!   and alternative order are preserved.
//! - `CompiledPattern::slots[i]` is the capture index of placeholder `i`, and
//!   `CompiledPattern::type_filters[i]` is its anchored type expression. Those
//!   vectors stay aligned.

use crate::config::PatternSet;
use crate::error::PatternCompileError;
use crate::{MARKER_CLOSE, MARKER_OPEN};
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::iter::Peekable;
use std::str::CharIndices;

/// Prefix of the capture group names generated for placeholders.
const PLACEHOLDER_GROUP: &str = "__amalgam_p";

/// Replacement for `.` inside a type expression.
const LABEL_CHAR: &str = "[^\u{E000}\u{E001}]";

bitflags::bitflags! {
    /// Regular-expression flags applied to every compiled pattern.
    ///
    /// Type expressions inherit the same flags, so `CASE_INSENSITIVE` also makes
    /// `@Color` match an entity labelled `color`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PatternFlags: u8 {
        const CASE_INSENSITIVE     = 1 << 0;
        const MULTI_LINE           = 1 << 1;
        const DOT_MATCHES_NEW_LINE = 1 << 2;
        const IGNORE_WHITESPACE    = 1 << 3;
    }
}

impl Default for PatternFlags {
    fn default() -> Self {
        PatternFlags::empty()
    }
}

impl PatternFlags {
    fn builder(self, source: &str) -> RegexBuilder {
        let mut builder = RegexBuilder::new(source);
        builder
            .case_insensitive(self.contains(PatternFlags::CASE_INSENSITIVE))
            .multi_line(self.contains(PatternFlags::MULTI_LINE))
            .dot_matches_new_line(self.contains(PatternFlags::DOT_MATCHES_NEW_LINE))
            .ignore_whitespace(self.contains(PatternFlags::IGNORE_WHITESPACE));
        builder
    }
}

/// One compiled alternative of a composite definition.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    /// Composite entity name shared by all alternatives of a definition.
    pub name: String,
    /// Pattern text exactly as configured.
    pub raw: String,
    /// Matcher over the projected text.
    pub regex: Regex,
    /// Number of `@` placeholders in `raw`.
    pub placeholder_count: usize,
    /// Character length of `raw`; the precedence metric.
    pub source_length: usize,
    pub(crate) slots: Vec<usize>,
    pub(crate) type_filters: Vec<Regex>,
}

impl CompiledPattern {
    /// Compile one pattern string belonging to composite `name`.
    pub fn compile(name: &str, raw: &str, flags: PatternFlags) -> Result<Self, PatternCompileError> {
        let rewritten = rewrite(name, raw)?;

        let mut type_filters = Vec::with_capacity(rewritten.expressions.len());
        for expression in &rewritten.expressions {
            let filter = flags.builder(&format!(r"\A(?:{expression})\z")).build().map_err(|source| {
                PatternCompileError::InvalidTypeExpression {
                    name: name.to_string(),
                    pattern: raw.to_string(),
                    expression: expression.clone(),
                    source,
                }
            })?;
            type_filters.push(filter);
        }

        let regex = flags.builder(&rewritten.source).build().map_err(|source| PatternCompileError::InvalidPattern {
            name: name.to_string(),
            pattern: raw.to_string(),
            source,
        })?;

        let mut slots = vec![0; type_filters.len()];
        for (index, group) in regex.capture_names().enumerate() {
            let placeholder = group
                .and_then(|g| g.strip_prefix(PLACEHOLDER_GROUP))
                .and_then(|n| n.parse::<usize>().ok())
                .filter(|&n| n < slots.len());
            if let Some(placeholder) = placeholder {
                slots[placeholder] = index;
            }
        }

        Ok(CompiledPattern {
            name: name.to_string(),
            raw: raw.to_string(),
            regex,
            placeholder_count: type_filters.len(),
            source_length: raw.chars().count(),
            slots,
            type_filters,
        })
    }

    /// Whether any placeholder of this pattern accepts at least one of `labels`.
    ///
    /// A pattern failing this check can only produce matches without entities,
    /// which are discarded, so it is safe to skip.
    pub(crate) fn could_match(&self, labels: &HashSet<&str>) -> bool {
        self.type_filters.iter().any(|filter| labels.iter().any(|label| filter.is_match(label)))
    }
}

/// The compiled pattern set. Immutable once built; share it by reference.
#[derive(Debug, Clone, Default)]
pub struct CompiledPatterns {
    pub patterns: Vec<CompiledPattern>,
    pub flags: PatternFlags,
}

impl CompiledPatterns {
    /// Compile every alternative of every definition, in order.
    ///
    /// Fails on the first invalid alternative: a pattern set is usable only if
    /// all of it compiles.
    pub fn new(set: &PatternSet, flags: PatternFlags) -> Result<Self, PatternCompileError> {
        let mut patterns = Vec::with_capacity(set.pattern_count());
        for definition in &set.composite_entities {
            for raw in &definition.patterns {
                patterns.push(CompiledPattern::compile(&definition.name, raw, flags)?);
            }
        }

        tracing::debug!(
            definitions = set.composite_entities.len(),
            patterns = patterns.len(),
            ?flags,
            "compiled composite patterns"
        );

        Ok(CompiledPatterns { patterns, flags })
    }
}

// --- Rewriting ---------------------------------------------------------------

struct Rewritten {
    source: String,
    expressions: Vec<String>,
}

/// Rewrite placeholders of `raw` into marker-matching capture groups.
fn rewrite(name: &str, raw: &str) -> Result<Rewritten, PatternCompileError> {
    let mut out = String::with_capacity(raw.len() + 32);
    let mut expressions: Vec<String> = Vec::new();
    let mut class_depth = 0usize;
    let mut chars = raw.char_indices().peekable();

    while let Some((offset, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, '@')) => out.push('@'),
                Some((_, escaped)) => {
                    out.push('\\');
                    out.push(escaped);
                }
                // Trailing backslash: let the regex parser report it.
                None => out.push('\\'),
            },
            '[' => {
                class_depth += 1;
                open_class(&mut chars, &mut out, false);
            }
            ']' if class_depth > 0 => {
                class_depth -= 1;
                out.push(']');
            }
            '@' if class_depth == 0 => {
                let after = offset + c.len_utf8();
                let tail = &raw[after..];

                let (expression, consumed) = if tail.starts_with('(') {
                    let (inner, consumed) =
                        balanced_group(tail).ok_or_else(|| PatternCompileError::UnbalancedTypeExpression {
                            name: name.to_string(),
                            pattern: raw.to_string(),
                            offset,
                        })?;
                    // `@(?:...)`, `@(?i)...`: the group syntax is part of the expression.
                    if inner.starts_with('?') { (&tail[..consumed], consumed) } else { (inner, consumed) }
                } else {
                    match bare_type_expression(tail) {
                        0 if tail.starts_with('\\') => {
                            return Err(PatternCompileError::InvalidPlaceholder {
                                name: name.to_string(),
                                pattern: raw.to_string(),
                                offset,
                            });
                        }
                        0 => {
                            out.push('@');
                            continue;
                        }
                        len => (&tail[..len], len),
                    }
                };

                while chars.next_if(|&(i, _)| i < after + consumed).is_some() {}

                let slot = expressions.len();
                let _ = write!(
                    out,
                    "(?P<{PLACEHOLDER_GROUP}{slot}>{MARKER_OPEN}(?:{}){MARKER_CLOSE})",
                    scope_type_expression(expression)
                );
                expressions.push(expression.to_string());
            }
            _ => out.push(c),
        }
    }

    Ok(Rewritten { source: out, expressions })
}

/// Copy the opening of a character class whose `[` was just consumed.
///
/// A `]` directly after `[` or `[^` is a literal and must not close the class.
/// With `exclude_markers`, a negated class is extended so it never matches a
/// marker delimiter.
fn open_class(chars: &mut Peekable<impl Iterator<Item = (usize, char)>>, out: &mut String, exclude_markers: bool) {
    out.push('[');
    let negated = chars.next_if(|&(_, c)| c == '^').is_some();
    if negated {
        out.push('^');
    }
    if chars.next_if(|&(_, c)| c == ']').is_some() {
        out.push(']');
    }
    if negated && exclude_markers {
        out.push(MARKER_OPEN);
        out.push(MARKER_CLOSE);
    }
}

/// Byte length of the unparenthesized type expression at the front of `tail`
/// (the text right after `@`); `0` when `tail` does not start one.
///
/// The expression is a run of label atoms, each optionally quantified. A
/// quantifier trailing a literal name (`@color?`, `@color{2}`) applies to the
/// whole placeholder instead, and a `-` that no further atom follows ends the
/// run (`@start-@end`).
fn bare_type_expression(tail: &str) -> usize {
    let mut end = 0;
    while let Some((len, literal)) = label_atom(&tail[end..], end == 0) {
        end += len;
        let Some(q) = quantifier(&tail[end..]) else {
            continue;
        };
        if literal && label_atom(&tail[end + q..], false).is_none() {
            break;
        }
        end += q;
    }
    end
}

/// One label atom at the front of `s`: its byte length and whether it is
/// literal text.
///
/// Past the first atom, a wildcard (`.`, a class or an escape) only belongs to
/// the label when a quantifier or another atom follows it, so `@color[,;]`
/// keeps its class for the text after the placeholder.
fn label_atom(s: &str, first: bool) -> Option<(usize, bool)> {
    let len = match s.chars().next()? {
        '-' => return label_atom(&s[1..], false).map(|_| (1, true)),
        '.' => 1,
        '[' => class_len(s),
        // `\W`, `\D` and `\P{..}` would match marker delimiters.
        '\\' => regex!(r"^\\(?:[wd\-]|p(?:\{[^}]*\}|\w))").find(s)?.end(),
        _ => return regex!(r"^\w+").find(s).map(|m| (m.end(), true)),
    };
    let rest = &s[len..];
    (first || quantifier(rest).is_some() || label_atom(rest, false).is_some()).then_some((len, false))
}

fn quantifier(s: &str) -> Option<usize> {
    regex!(r"^(?:[?*+]|\{\d+(?:,\d*)?\})\??").find(s).map(|m| m.end())
}

/// Byte length of the character class opening `s`, nested classes included.
/// An unterminated class runs to the end so that compilation reports it.
fn class_len(s: &str) -> usize {
    let mut depth = 0usize;
    let mut chars = s.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '[' => {
                depth += 1;
                chars.next_if(|&(_, c)| c == '^');
                chars.next_if(|&(_, c)| c == ']');
            }
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return i + 1;
                }
            }
            _ => {}
        }
    }
    s.len()
}

/// Split `(...)` off the front of `s`, honoring escapes and character classes.
///
/// Returns the inner text and the number of bytes consumed, or `None` when the
/// group is never closed.
fn balanced_group(s: &str) -> Option<(&str, usize)> {
    let mut depth = 0usize;
    let mut class_depth = 0usize;
    let mut chars: Peekable<CharIndices> = s.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '[' => {
                class_depth += 1;
                chars.next_if(|&(_, c)| c == '^');
                chars.next_if(|&(_, c)| c == ']');
            }
            ']' if class_depth > 0 => class_depth -= 1,
            '(' if class_depth == 0 => depth += 1,
            ')' if class_depth == 0 => {
                depth -= 1;
                if depth == 0 {
                    return Some((&s[1..i], i + 1));
                }
            }
            _ => {}
        }
    }
    None
}

/// Narrow a type expression so it can only match inside one marker.
fn scope_type_expression(expression: &str) -> String {
    let mut out = String::with_capacity(expression.len() + 8);
    let mut class_depth = 0usize;
    let mut chars = expression.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        match c {
            '\\' => {
                out.push('\\');
                if let Some((_, escaped)) = chars.next() {
                    out.push(escaped);
                }
            }
            '[' => {
                class_depth += 1;
                open_class(&mut chars, &mut out, true);
            }
            ']' if class_depth > 0 => {
                class_depth -= 1;
                out.push(']');
            }
            '.' if class_depth == 0 => out.push_str(LABEL_CHAR),
            _ => out.push(c),
        }
    }
    out
}
