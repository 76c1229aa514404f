use std::ffi::OsString;
use std::path::PathBuf;

use thiserror::Error;

use crate::model::Sequence;

pub const DEFAULT_DIR_TEMPLATE: &str = "{path_prefix}[{first}-{last}]{suffix}";

const FIELD_FILLER: char = '#';

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unknown template token {{{token}}} at offset {offset}")]
    UnknownToken { token: String, offset: usize },
    #[error("unclosed '{{' at offset {offset}")]
    Unclosed { offset: usize },
    #[error("single '}}' at offset {offset}; write '}}}}' for a literal brace")]
    StrayClose { offset: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    PathPrefix,
    NamePrefix,
    Suffix,
    First,
    Last,
    Field,
}

/// Compiled directory-name template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirTemplate {
    tokens: Vec<Token>,
}

impl Default for DirTemplate {
    fn default() -> Self {
        Self {
            tokens: vec![
                Token::PathPrefix,
                Token::Literal("[".to_string()),
                Token::First,
                Token::Literal("-".to_string()),
                Token::Last,
                Token::Literal("]".to_string()),
                Token::Suffix,
            ],
        }
    }
}

impl DirTemplate {
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        let mut tokens = Vec::new();
        let mut literal = String::new();
        let mut chars = template.char_indices().peekable();

        while let Some((offset, ch)) = chars.next() {
            match ch {
                '{' if chars.peek().is_some_and(|(_, next)| *next == '{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek().is_some_and(|(_, next)| *next == '}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err(TemplateError::StrayClose { offset }),
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, inner) in chars.by_ref() {
                        if inner == '}' {
                            closed = true;
                            break;
                        }
                        name.push(inner);
                    }
                    if !closed {
                        return Err(TemplateError::Unclosed { offset });
                    }

                    let token = match name.as_str() {
                        "path_prefix" => Token::PathPrefix,
                        "name_prefix" => Token::NamePrefix,
                        "suffix" => Token::Suffix,
                        "first" => Token::First,
                        "last" => Token::Last,
                        "field" => Token::Field,
                        _ => return Err(TemplateError::UnknownToken { token: name, offset }),
                    };
                    if !literal.is_empty() {
                        tokens.push(Token::Literal(std::mem::take(&mut literal)));
                    }
                    tokens.push(token);
                }
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            tokens.push(Token::Literal(literal));
        }
        Ok(Self { tokens })
    }

    pub fn render(&self, sequence: &Sequence) -> PathBuf {
        let mut rendered = OsString::new();
        for token in &self.tokens {
            match token {
                Token::Literal(text) => rendered.push(text),
                Token::PathPrefix => rendered.push(sequence.container().join(sequence.prefix())),
                Token::NamePrefix => rendered.push(sequence.prefix()),
                Token::Suffix => rendered.push(sequence.suffix()),
                Token::First => rendered.push(&sequence.first.number),
                Token::Last => rendered.push(&sequence.last.number),
                Token::Field => rendered.push(
                    std::iter::repeat(FIELD_FILLER)
                        .take(sequence.first.digit_count)
                        .collect::<String>(),
                ),
            }
        }
        PathBuf::from(rendered)
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::{DirTemplate, TemplateError, DEFAULT_DIR_TEMPLATE};
    use crate::collect::Collector;
    use crate::model::Sequence;

    fn sequence(names: &[&str]) -> Sequence {
        let mut collector = Collector::new();
        collector.collect_all(names);
        collector
            .sequences()
            .into_iter()
            .next()
            .expect("one sequence")
    }

    #[test]
    fn default_template_brackets_the_range() {
        let template = DirTemplate::parse(DEFAULT_DIR_TEMPLATE).expect("parses");
        assert_eq!(template, DirTemplate::default());

        let run = sequence(&["img9.png", "img10.png", "img11.png"]);
        assert_eq!(template.render(&run), PathBuf::from("img[9-11].png"));

        let nested = sequence(&["shots/a/frame0098.exr", "shots/a/frame0099.exr"]);
        assert_eq!(
            template.render(&nested),
            Path::new("shots/a").join("frame[0098-0099].exr")
        );
    }

    #[test]
    fn every_token_renders() {
        let template =
            DirTemplate::parse("out/{name_prefix}{field}{suffix} ({first} to {last})")
                .expect("parses");
        let run = sequence(&["src/take007.wav", "src/take008.wav"]);

        assert_eq!(
            template.render(&run),
            PathBuf::from("out/take###.wav (007 to 008)")
        );
    }

    #[test]
    fn doubled_braces_are_literal() {
        let template = DirTemplate::parse("{{{first}}}").expect("parses");
        let run = sequence(&["p1", "p2"]);
        assert_eq!(template.render(&run), PathBuf::from("{1}"));
    }

    #[test]
    fn malformed_templates_are_rejected() {
        assert_eq!(
            DirTemplate::parse("{prefix}"),
            Err(TemplateError::UnknownToken {
                token: "prefix".to_string(),
                offset: 0
            })
        );
        assert_eq!(
            DirTemplate::parse("abc{first"),
            Err(TemplateError::Unclosed { offset: 3 })
        );
        assert_eq!(
            DirTemplate::parse("a}b"),
            Err(TemplateError::StrayClose { offset: 1 })
        );
    }
}
