//! Markup scanner that splits a document into text runs and `<img>` tags.
//!
//! Only `<img>` start tags are parsed into structure. Everything else stays
//! as raw text, which is what keeps serialization byte-exact. Every other
//! start tag is stepped over as a whole, so an `<img` inside an attribute
//! value, a comment or the body of a raw-text element is never touched.
//!
//! The scanner never rejects text. A tag that runs to end of input, like an
//! unclosed quoted attribute, turns the rest of the input into plain text,
//! as browsers do.

use nom::branch::alt;
use nom::bytes::complete::{tag, take, take_till1, take_while, take_while1};
use nom::character::complete::multispace0;
use nom::error::{Error, ErrorKind};
use nom::{IResult, Offset, Parser};
use thiserror::Error as ThisError;

use super::{ImageNode, Node};

/// Elements whose content is not markup.
const RAW_TEXT_ELEMENTS: [&str; 4] = ["script", "style", "textarea", "title"];

/// Fatal errors that prevent a document from being scanned at all.
#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum ParseError {
    /// The input bytes are not valid UTF-8 text.
    #[error("Document is not valid UTF-8 (valid up to byte {valid_up_to})")]
    InvalidUtf8 { valid_up_to: usize },
}

/// One `name[=value]` pair inside a start tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Attribute<'a> {
    name: &'a str,
    value: Option<&'a str>,
}

/// A start tag: its name and the first `src` attribute value, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct StartTag<'a> {
    name: &'a str,
    src: Option<&'a str>,
}

impl StartTag<'_> {
    fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

fn is_attribute_name_char(c: char) -> bool {
    !c.is_ascii_whitespace() && c != '=' && c != '>' && c != '/'
}

/// Parse an attribute value: double-quoted, single-quoted or bare.
fn attribute_value(input: &str) -> IResult<&str, &str> {
    if let Some(quote) = input.chars().next().filter(|c| *c == '"' || *c == '\'') {
        let body = &input[1..];
        return match body.find(quote) {
            Some(end) => Ok((&body[end + 1..], &body[..end])),
            None => Err(nom::Err::Failure(Error::new(input, ErrorKind::Char))),
        };
    }
    take_till1(|c: char| c.is_ascii_whitespace() || c == '>')(input)
}

/// Parse one attribute. A stray `=` is consumed as a one-character name.
fn attribute(input: &str) -> IResult<&str, Attribute<'_>> {
    let (input, name) = alt((take_while1(is_attribute_name_char), take(1usize))).parse(input)?;

    let (after_space, _) = multispace0(input)?;
    let Some(after_eq) = after_space.strip_prefix('=') else {
        return Ok((input, Attribute { name, value: None }));
    };

    let (after_eq, _) = multispace0(after_eq)?;
    if after_eq.is_empty() || after_eq.starts_with('>') {
        return Ok((
            after_eq,
            Attribute {
                name,
                value: Some(&after_eq[..0]),
            },
        ));
    }

    let (rest, value) = attribute_value(after_eq)?;
    Ok((
        rest,
        Attribute {
            name,
            value: Some(value),
        },
    ))
}

/// Parse a start tag such as `<img ...>` or `<div ...>`.
///
/// Fails with `ErrorKind::Eof` when the input ends before `>`, and with
/// `ErrorKind::Char` when a quoted attribute value never closes.
fn start_tag(input: &str) -> IResult<&str, StartTag<'_>> {
    let (input, _) = tag("<")(input)?;
    if !input.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(nom::Err::Error(Error::new(input, ErrorKind::Alpha)));
    }
    let (mut input, name) = take_while1(is_attribute_name_char)(input)?;
    let mut src: Option<Option<&str>> = None;

    loop {
        let (rest, _) = take_while(|c: char| c.is_ascii_whitespace() || c == '/')(input)?;
        if let Some(after) = rest.strip_prefix('>') {
            return Ok((
                after,
                StartTag {
                    name,
                    src: src.flatten(),
                },
            ));
        }
        if rest.is_empty() {
            return Err(nom::Err::Failure(Error::new(rest, ErrorKind::Eof)));
        }

        let (rest, attr) = attribute(rest)?;
        if src.is_none() && attr.name.eq_ignore_ascii_case("src") {
            src = Some(attr.value);
        }
        input = rest;
    }
}

/// True when `input` opens a start tag or an end tag.
fn opens_tag(input: &str) -> bool {
    let bytes = input.as_bytes();
    match bytes.get(1) {
        Some(b'/') => bytes.get(2).is_some_and(u8::is_ascii_alphabetic),
        Some(c) => c.is_ascii_alphabetic(),
        None => false,
    }
}

/// Case-insensitive search for an ASCII needle, returning a byte offset.
fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}

/// Byte length of the raw-text body of `name` plus its closing `</name`.
/// An element that is never closed runs to end of input.
fn raw_text_len(body: &str, name: &str) -> usize {
    let closing = format!("</{name}");
    find_ignore_ascii_case(body, &closing).map_or(body.len(), |end| end + closing.len())
}

fn split_image_tag(tag_text: &str, src: Option<&str>) -> ImageNode {
    match src {
        Some(value) => {
            let start = tag_text.offset(value);
            let end = start + value.len();
            ImageNode::new(&tag_text[..start], Some(value), &tag_text[end..])
        }
        None => ImageNode::new(tag_text, None, ""),
    }
}

/// Scan `input` into an ordered node list.
///
/// Concatenating the returned nodes reproduces `input` exactly.
pub(super) fn parse_nodes(input: &str) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;

    while let Some(rel) = input[pos..].find('<') {
        let at = pos + rel;
        let rest = &input[at..];

        if let Some(body) = rest.strip_prefix("<!--") {
            pos = body.find("-->").map_or(input.len(), |end| at + 4 + end + 3);
            continue;
        }

        if !opens_tag(rest) {
            pos = at + 1;
            continue;
        }

        if rest[1..].starts_with('/') {
            match rest.find('>') {
                Some(end) => pos = at + end + 1,
                None => break,
            }
            continue;
        }

        let Ok((remaining, start)) = start_tag(rest) else {
            log::debug!("unterminated tag at byte {at}; keeping the rest as text");
            break;
        };
        let consumed = rest.offset(remaining);

        if start.is_named("img") {
            if text_start < at {
                nodes.push(Node::Text(input[text_start..at].to_string()));
            }
            nodes.push(Node::Image(split_image_tag(&rest[..consumed], start.src)));
            pos = at + consumed;
            text_start = pos;
        } else if let Some(name) = RAW_TEXT_ELEMENTS.iter().find(|name| start.is_named(name)) {
            pos = at + consumed + raw_text_len(remaining, name);
        } else {
            pos = at + consumed;
        }
    }

    if text_start < input.len() {
        nodes.push(Node::Text(input[text_start..].to_string()));
    }

    nodes
}
