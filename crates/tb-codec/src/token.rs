//! Tag-level tokenizer.
//!
//! The decoder reads the stream one `>`-terminated chunk at a time and hands
//! the markup part of each chunk to [`tokenize`]. A chunk that does not parse
//! as a complete tag is reported by the caller and skipped; it never stops
//! the parse.

use nom::branch::alt;
use nom::bytes::complete::{tag, take_until, take_while, take_while1};
use nom::character::complete::{char, multispace0, multispace1};
use nom::combinator::{all_consuming, map};
use nom::multi::many0;
use nom::sequence::{delimited, preceded, separated_pair};
use nom::{IResult, Parser};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token<'a> {
    Start {
        name: &'a str,
        attrs: Vec<(&'a str, &'a str)>,
    },
    Empty {
        name: &'a str,
        attrs: Vec<(&'a str, &'a str)>,
    },
    End {
        name: &'a str,
    },
    /// `<?...?>` or `<!...>`; carries nothing the decoder needs.
    Ignorable,
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

fn name(input: &str) -> IResult<&str, &str> {
    take_while1(is_name_char).parse(input)
}

fn quoted(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_while(|c: char| c != '"'), char('"')),
        delimited(char('\''), take_while(|c: char| c != '\''), char('\'')),
    ))
    .parse(input)
}

fn attribute(input: &str) -> IResult<&str, (&str, &str)> {
    preceded(
        multispace1,
        separated_pair(name, delimited(multispace0, char('='), multispace0), quoted),
    )
    .parse(input)
}

fn start_tag(input: &str) -> IResult<&str, Token<'_>> {
    let (input, (_, name, attrs, _, close)) = (
        char('<'),
        name,
        many0(attribute),
        multispace0,
        alt((tag("/>"), tag(">"))),
    )
        .parse(input)?;
    let token = if close == "/>" {
        Token::Empty { name, attrs }
    } else {
        Token::Start { name, attrs }
    };
    Ok((input, token))
}

fn end_tag(input: &str) -> IResult<&str, Token<'_>> {
    map(
        delimited(tag("</"), name, preceded(multispace0, char('>'))),
        |name| Token::End { name },
    )
    .parse(input)
}

fn declaration(input: &str) -> IResult<&str, Token<'_>> {
    map(
        delimited(tag("<?"), take_until("?>"), tag("?>")),
        |_| Token::Ignorable,
    )
    .parse(input)
}

fn comment(input: &str) -> IResult<&str, Token<'_>> {
    map(
        delimited(tag("<!--"), take_until("-->"), tag("-->")),
        |_| Token::Ignorable,
    )
    .parse(input)
}

fn doctype(input: &str) -> IResult<&str, Token<'_>> {
    map(
        delimited(tag("<!"), take_while(|c: char| c != '>'), char('>')),
        |_| Token::Ignorable,
    )
    .parse(input)
}

/// Parse one complete tag, e.g. `<rectangle x="1" y="2"/>`.
pub(crate) fn tokenize(markup: &str) -> Option<Token<'_>> {
    all_consuming(alt((declaration, comment, doctype, end_tag, start_tag)))
        .parse(markup.trim_end())
        .ok()
        .map(|(_, token)| token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_end_and_empty() {
        assert_eq!(
            tokenize("<model>"),
            Some(Token::Start {
                name: "model",
                attrs: vec![]
            })
        );
        assert_eq!(tokenize("</model >"), Some(Token::End { name: "model" }));
        assert_eq!(
            tokenize(r#"<rectangle x="1.0" y='2.0' />"#),
            Some(Token::Empty {
                name: "rectangle",
                attrs: vec![("x", "1.0"), ("y", "2.0")]
            })
        );
    }

    #[test]
    fn declarations_and_comments_are_ignorable() {
        assert_eq!(
            tokenize(r#"<?xml version="1.0" encoding="UTF-8"?>"#),
            Some(Token::Ignorable)
        );
        assert_eq!(tokenize("<!-- note -->"), Some(Token::Ignorable));
    }

    #[test]
    fn malformed_tags_rejected() {
        assert_eq!(tokenize("<sun_angle 1.0>"), None);
        assert_eq!(tokenize(r#"<a x="1>"#), None);
        assert_eq!(tokenize("< >"), None);
        assert_eq!(tokenize("<a>trailing"), None);
    }
}
