//! Simplified HTML tokenizer for editor-produced markup.
//!
//! Tag and attribute names are restricted to ASCII `[A-Za-z0-9:_-]` and are
//! lowercased during tokenization. Entities pass through verbatim so that
//! parse → serialize round-trips editor content byte for byte. This is not a
//! full HTML5 state machine; rich-text editor output never exercises the
//! error-recovery paths one would need.

use memchr::memchr;

use crate::error::{ParseError, ParseResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    StartTag {
        name: String,
        attrs: Vec<(String, String)>,
        self_closing: bool,
    },
    EndTag(String),
    Text(String),
    Comment(String),
    Doctype(String),
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b':' || b == b'_' || b == b'-'
}

pub fn tokenize(source: &str) -> ParseResult<Vec<Token>> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        match memchr(b'<', &bytes[pos..]) {
            None => {
                tokens.push(Token::Text(source[pos..].to_string()));
                break;
            }
            Some(rel) => {
                if rel > 0 {
                    tokens.push(Token::Text(source[pos..pos + rel].to_string()));
                    pos += rel;
                }
                pos = lex_angle(source, pos, &mut tokens)?;
            }
        }
    }

    Ok(tokens)
}

/// Lex one construct starting at a `<`. Returns the position after it.
fn lex_angle(source: &str, start: usize, tokens: &mut Vec<Token>) -> ParseResult<usize> {
    let bytes = source.as_bytes();
    let rest = &source[start..];

    if rest.starts_with("<!--") {
        return match rest.find("-->") {
            Some(end) => {
                tokens.push(Token::Comment(rest[4..end].to_string()));
                Ok(start + end + 3)
            }
            None => Err(ParseError::UnterminatedComment { pos: start }),
        };
    }

    if rest.starts_with("<!") {
        return match rest.find('>') {
            Some(end) => {
                tokens.push(Token::Doctype(rest[2..end].trim().to_string()));
                Ok(start + end + 1)
            }
            None => Err(ParseError::UnterminatedTag { pos: start }),
        };
    }

    if rest.starts_with("</") {
        let mut i = start + 2;
        let name_start = i;
        while i < bytes.len() && is_name_byte(bytes[i]) {
            i += 1;
        }
        let name = source[name_start..i].to_ascii_lowercase();
        match memchr(b'>', &bytes[i..]) {
            Some(rel) => {
                if !name.is_empty() {
                    tokens.push(Token::EndTag(name));
                }
                Ok(i + rel + 1)
            }
            None => Err(ParseError::UnterminatedTag { pos: start }),
        }
    } else if start + 1 < bytes.len() && bytes[start + 1].is_ascii_alphabetic() {
        lex_start_tag(source, start, tokens)
    } else {
        // Bare '<' in text content.
        tokens.push(Token::Text("<".to_string()));
        Ok(start + 1)
    }
}

fn lex_start_tag(source: &str, start: usize, tokens: &mut Vec<Token>) -> ParseResult<usize> {
    let bytes = source.as_bytes();
    let mut i = start + 1;

    let name_start = i;
    while i < bytes.len() && is_name_byte(bytes[i]) {
        i += 1;
    }
    let name = source[name_start..i].to_ascii_lowercase();

    let mut attrs = Vec::new();
    let mut self_closing = false;

    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            return Err(ParseError::UnterminatedTag { pos: start });
        }
        match bytes[i] {
            b'>' => {
                i += 1;
                break;
            }
            b'/' if i + 1 < bytes.len() && bytes[i + 1] == b'>' => {
                self_closing = true;
                i += 2;
                break;
            }
            _ => {
                let attr_start = i;
                while i < bytes.len() && is_name_byte(bytes[i]) {
                    i += 1;
                }
                if i == attr_start {
                    // Unlexable byte inside the tag; skip it rather than loop
                    // forever.
                    i += 1;
                    continue;
                }
                let attr_name = source[attr_start..i].to_ascii_lowercase();
                let mut value = String::new();
                if i < bytes.len() && bytes[i] == b'=' {
                    i += 1;
                    if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
                        let quote = bytes[i];
                        i += 1;
                        let value_start = i;
                        match memchr(quote, &bytes[i..]) {
                            Some(rel) => {
                                value = source[value_start..i + rel].to_string();
                                i += rel + 1;
                            }
                            None => return Err(ParseError::UnterminatedTag { pos: start }),
                        }
                    } else {
                        let value_start = i;
                        while i < bytes.len()
                            && !bytes[i].is_ascii_whitespace()
                            && bytes[i] != b'>'
                        {
                            i += 1;
                        }
                        value = source[value_start..i].to_string();
                    }
                }
                attrs.push((attr_name, value));
            }
        }
    }

    tokens.push(Token::StartTag {
        name,
        attrs,
        self_closing,
    });
    Ok(i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_basic() {
        let tokens = tokenize("<p>Hello</p>").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1], Token::Text("Hello".to_string()));
        assert_eq!(tokens[2], Token::EndTag("p".to_string()));
    }

    #[test]
    fn test_tokenize_attributes() {
        let tokens = tokenize(r#"<p class="intro" data-node-id="n1">x</p>"#).unwrap();
        match &tokens[0] {
            Token::StartTag { name, attrs, .. } => {
                assert_eq!(name, "p");
                assert_eq!(attrs[0], ("class".to_string(), "intro".to_string()));
                assert_eq!(attrs[1], ("data-node-id".to_string(), "n1".to_string()));
            }
            other => panic!("expected start tag, got {:?}", other),
        }
    }

    #[test]
    fn test_tag_names_lowercased() {
        let tokens = tokenize("<DIV>x</DIV>").unwrap();
        assert!(matches!(&tokens[0], Token::StartTag { name, .. } if name == "div"));
        assert_eq!(tokens[2], Token::EndTag("div".to_string()));
    }

    #[test]
    fn test_bare_angle_bracket_is_text() {
        let tokens = tokenize("1 < 2").unwrap();
        let text: String = tokens
            .iter()
            .map(|t| match t {
                Token::Text(s) => s.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(text, "1 < 2");
    }

    #[test]
    fn test_unterminated_tag_is_an_error() {
        assert!(matches!(
            tokenize("<p class=\"x"),
            Err(ParseError::UnterminatedTag { .. })
        ));
    }

    #[test]
    fn test_comment_and_doctype() {
        let tokens = tokenize("<!DOCTYPE html><!-- note --><p>x</p>").unwrap();
        assert_eq!(tokens[0], Token::Doctype("DOCTYPE html".to_string()));
        assert_eq!(tokens[1], Token::Comment(" note ".to_string()));
    }
}
