//! Markup tokenizer built on logos.
//!
//! Two token sets are used: `ContentToken` outside of tags and `TagToken`
//! between `<name` and the closing `>`. The lexer is morphed between them.
//! Comments and raw-text element bodies are scanned by hand from the
//! lexer remainder because they end on a literal terminator, not a token.

use crate::entities::decode_entities;
use crate::error::ParseError;
use crate::tags;
use logos::{Lexer, Logos};
use std::ops::Range;

/// Tokens outside of tags
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
pub enum ContentToken<'src> {
    #[token("<!--")]
    CommentOpen,

    #[regex(r"<![a-zA-Z][^>]*>", |lex| lex.slice())]
    Doctype(&'src str),

    #[regex(r"<\?[^>]*>")]
    ProcessingInstruction,

    #[regex(r"</[a-zA-Z][^\s>]*\s*>", |lex| lex.slice())]
    CloseTag(&'src str),

    #[regex(r"<[a-zA-Z][^\s/>]*", |lex| lex.slice())]
    OpenTag(&'src str),

    #[regex(r"[^<]+", |lex| lex.slice())]
    Text(&'src str),

    #[token("<")]
    Lt,
}

/// Tokens between `<name` and `>`
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum TagToken<'src> {
    #[token(">")]
    End,

    #[token("/>")]
    SelfClosingEnd,

    #[token("/")]
    Slash,

    #[token("=")]
    Equals,

    #[regex(r#""[^"]*""#, |lex| { let s = lex.slice(); &s[1..s.len() - 1] })]
    #[regex(r"'[^']*'", |lex| { let s = lex.slice(); &s[1..s.len() - 1] })]
    Quoted(&'src str),

    #[regex(r#"[^\s"'>/=]+"#, |lex| lex.slice())]
    Word(&'src str),
}

/// Markup events consumed by the tree builder
#[derive(Debug, Clone, PartialEq)]
pub enum MarkupEvent {
    Doctype(String),
    StartTag {
        name: String,
        attributes: Vec<(String, String)>,
        self_closing: bool,
    },
    EndTag(String),
    /// Decoded text
    Text(String),
    /// Raw-text element body (script, style, ...), not decoded
    RawText(String),
    Comment(String),
}

/// Tokenizer output: events with byte spans, plus recovered problems
#[derive(Debug, Default)]
pub struct Tokenized {
    pub events: Vec<(MarkupEvent, Range<usize>)>,
    pub issues: Vec<ParseError>,
}

/// Tokenize markup. Never fails; structural problems are recorded in
/// `issues` and tokenizing continues.
pub fn tokenize(source: &str) -> Tokenized {
    let mut out = Tokenized::default();
    let mut lex = ContentToken::lexer(source);

    while let Some(token) = lex.next() {
        let span = lex.span();
        match token {
            Ok(ContentToken::Text(text)) => {
                out.events.push((MarkupEvent::Text(decode_entities(text)), span));
            }
            Ok(ContentToken::Lt) => {
                out.events.push((MarkupEvent::Text("<".to_string()), span));
            }
            Ok(ContentToken::CommentOpen) => {
                let rest = lex.remainder();
                let (body, consumed) = match rest.find("-->") {
                    Some(end) => (&rest[..end], end + 3),
                    None => {
                        out.issues.push(ParseError::unterminated_comment(span.start));
                        (rest, rest.len())
                    }
                };
                lex.bump(consumed);
                out.events
                    .push((MarkupEvent::Comment(body.to_string()), span.start..span.end + consumed));
            }
            Ok(ContentToken::Doctype(raw)) => {
                let inner = raw[2..raw.len() - 1].trim().to_string();
                out.events.push((MarkupEvent::Doctype(inner), span));
            }
            Ok(ContentToken::ProcessingInstruction) => {}
            Ok(ContentToken::CloseTag(raw)) => {
                let name = raw[2..raw.len() - 1].trim().to_string();
                out.events.push((MarkupEvent::EndTag(name), span));
            }
            Ok(ContentToken::OpenTag(raw)) => {
                let name = raw[1..].to_string();
                let start = span.start;

                let mut tag_lex: Lexer<'_, TagToken<'_>> = lex.morph();
                let (attributes, self_closing, terminated) = read_attributes(&mut tag_lex);
                let end = tag_lex.span().end;
                lex = tag_lex.morph();

                if !terminated {
                    out.issues.push(ParseError::unterminated_tag(start, name.clone()));
                }

                let raw_text = !self_closing && tags::is_raw_text(&name);
                out.events.push((
                    MarkupEvent::StartTag {
                        name: name.clone(),
                        attributes,
                        self_closing,
                    },
                    start..end,
                ));

                if raw_text && terminated {
                    let rest = lex.remainder();
                    let needle = format!("</{}", name.to_ascii_lowercase());
                    let body_len = match rest.to_ascii_lowercase().find(&needle) {
                        Some(close) => close,
                        None => {
                            out.issues.push(ParseError::unterminated_raw_text(start, name.clone()));
                            rest.len()
                        }
                    };
                    let body = rest[..body_len].to_string();
                    lex.bump(body_len);
                    if !body.is_empty() {
                        out.events.push((MarkupEvent::RawText(body), end..end + body_len));
                    }
                }
            }
            Err(()) => {
                out.issues.push(ParseError::lexer_error(span.start));
                out.events
                    .push((MarkupEvent::Text(lex.slice().to_string()), span));
            }
        }
    }

    out
}

enum AttrState {
    Name,
    AfterName(String),
    BeforeValue(String),
    Unquoted {
        name: String,
        value: String,
        end: usize,
    },
}

/// Read attributes up to the end of the tag.
/// Returns `(attributes, self_closing, terminated)`.
fn read_attributes<'src>(lex: &mut Lexer<'src, TagToken<'src>>) -> (Vec<(String, String)>, bool, bool) {
    let mut attributes: Vec<(String, String)> = Vec::new();
    let mut state = AttrState::Name;

    fn push(attributes: &mut Vec<(String, String)>, name: String, value: String) {
        if !attributes.iter().any(|(existing, _)| existing.eq_ignore_ascii_case(&name)) {
            attributes.push((name, value));
        }
    }

    while let Some(token) = lex.next() {
        let span = lex.span();
        let token = match token {
            Ok(token) => token,
            // stray quote: skip it
            Err(()) => continue,
        };

        // An unquoted value continues while tokens are directly adjacent
        if let AttrState::Unquoted { name, value, end } = &mut state {
            match token {
                TagToken::Word(part) if span.start == *end => {
                    value.push_str(part);
                    *end = span.end;
                    continue;
                }
                TagToken::Slash if span.start == *end => {
                    value.push('/');
                    *end = span.end;
                    continue;
                }
                _ => {
                    let name = std::mem::take(name);
                    let value = decode_entities(value);
                    push(&mut attributes, name, value);
                    state = AttrState::Name;
                }
            }
        }

        match token {
            TagToken::End | TagToken::SelfClosingEnd => {
                match std::mem::replace(&mut state, AttrState::Name) {
                    AttrState::AfterName(name) | AttrState::BeforeValue(name) => {
                        push(&mut attributes, name, String::new());
                    }
                    AttrState::Unquoted { .. } | AttrState::Name => {}
                }
                return (attributes, token == TagToken::SelfClosingEnd, true);
            }
            TagToken::Equals => {
                state = match state {
                    AttrState::AfterName(name) => AttrState::BeforeValue(name),
                    other => other,
                };
            }
            TagToken::Quoted(value) => {
                state = match state {
                    AttrState::BeforeValue(name) => {
                        push(&mut attributes, name, decode_entities(value));
                        AttrState::Name
                    }
                    AttrState::AfterName(name) => {
                        push(&mut attributes, name, String::new());
                        AttrState::Name
                    }
                    other => other,
                };
            }
            TagToken::Word(word) => {
                state = match state {
                    AttrState::BeforeValue(name) => AttrState::Unquoted {
                        name,
                        value: word.to_string(),
                        end: span.end,
                    },
                    AttrState::AfterName(name) => {
                        push(&mut attributes, name, String::new());
                        AttrState::AfterName(word.to_string())
                    }
                    _ => AttrState::AfterName(word.to_string()),
                };
            }
            TagToken::Slash => {
                state = match state {
                    AttrState::BeforeValue(name) => AttrState::Unquoted {
                        name,
                        value: "/".to_string(),
                        end: span.end,
                    },
                    other => other,
                };
            }
        }
    }

    match state {
        AttrState::AfterName(name) | AttrState::BeforeValue(name) => {
            push(&mut attributes, name, String::new());
        }
        AttrState::Unquoted { name, value, .. } => {
            push(&mut attributes, name, decode_entities(&value));
        }
        AttrState::Name => {}
    }
    (attributes, false, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(source: &str) -> Vec<MarkupEvent> {
        tokenize(source).events.into_iter().map(|(event, _)| event).collect()
    }

    #[test]
    fn test_tokenize_basic_element() {
        let events = events(r#"<p class="lead">Hi &amp; bye</p>"#);
        assert_eq!(
            events,
            vec![
                MarkupEvent::StartTag {
                    name: "p".to_string(),
                    attributes: vec![("class".to_string(), "lead".to_string())],
                    self_closing: false,
                },
                MarkupEvent::Text("Hi & bye".to_string()),
                MarkupEvent::EndTag("p".to_string()),
            ]
        );
    }

    #[test]
    fn test_attribute_forms() {
        let events = events(r#"<input disabled value=42 data-x='a b' href=/a/b.png>"#);
        match &events[0] {
            MarkupEvent::StartTag { attributes, .. } => {
                assert_eq!(
                    attributes,
                    &vec![
                        ("disabled".to_string(), String::new()),
                        ("value".to_string(), "42".to_string()),
                        ("data-x".to_string(), "a b".to_string()),
                        ("href".to_string(), "/a/b.png".to_string()),
                    ]
                );
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_self_closing_svg() {
        let events = events(r#"<circle r="4" />"#);
        assert!(matches!(
            &events[0],
            MarkupEvent::StartTag { name, self_closing: true, .. } if name == "circle"
        ));
    }

    #[test]
    fn test_raw_text_not_tokenized() {
        let events = events("<style>a < b { color: red }</STYLE><p>x</p>");
        assert_eq!(events[1], MarkupEvent::RawText("a < b { color: red }".to_string()));
        assert_eq!(events[2], MarkupEvent::EndTag("STYLE".to_string()));
    }

    #[test]
    fn test_comments_and_doctype() {
        let events = events("<!DOCTYPE html><!-- note -->text");
        assert_eq!(events[0], MarkupEvent::Doctype("DOCTYPE html".to_string()));
        assert_eq!(events[1], MarkupEvent::Comment(" note ".to_string()));
        assert_eq!(events[2], MarkupEvent::Text("text".to_string()));
    }

    #[test]
    fn test_unterminated_comment_recorded() {
        let result = tokenize("<p>a</p><!-- never closed");
        assert_eq!(result.issues, vec![ParseError::unterminated_comment(8)]);
        assert!(matches!(result.events.last(), Some((MarkupEvent::Comment(_), _))));
    }

    #[test]
    fn test_stray_angle_is_text() {
        let events = events("1 < 2");
        assert_eq!(
            events,
            vec![
                MarkupEvent::Text("1 ".to_string()),
                MarkupEvent::Text("<".to_string()),
                MarkupEvent::Text(" 2".to_string()),
            ]
        );
    }
}
