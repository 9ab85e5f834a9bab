use std::fmt;

/// A boolean expression over case tags, such as `slow and not (flaky or network)`.
///
/// Tags are arbitrary tokens made of alphanumerics, `_`, `-`, `.` and `:`; the words `and`,
/// `or` and `not` are reserved. `not` binds tighter than `and`, which binds tighter than `or`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFilter {
    source: String,
    expr: TagExpr,
}

impl TagFilter {
    pub fn parse(source: &str) -> Result<Self, TagFilterError> {
        let tokens = lex(source)?;
        let mut parser = ExprParser {
            source,
            tokens: &tokens,
            cursor: 0,
        };
        let expr = parser.disjunction()?;
        if let Some(token) = parser.peek() {
            return Err(TagFilterError::UnexpectedToken {
                token: token.to_string(),
                expression: source.to_string(),
            });
        }
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn matches<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        self.expr.eval(tags)
    }
}

impl fmt::Display for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagFilterError {
    #[error("empty tag expression `{expression}`")]
    Empty { expression: String },

    #[error("unexpected character `{ch}` in tag expression `{expression}`")]
    UnexpectedChar { ch: char, expression: String },

    #[error("unexpected `{token}` in tag expression `{expression}`")]
    UnexpectedToken { token: String, expression: String },

    #[error("missing closing `)` in tag expression `{expression}`")]
    UnclosedParen { expression: String },

    #[error("tag expression `{expression}` ends unexpectedly")]
    UnexpectedEnd { expression: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TagExpr {
    Tag(String),
    Not(Box<Self>),
    All(Vec<Self>),
    Any(Vec<Self>),
}

impl TagExpr {
    fn eval<S: AsRef<str>>(&self, tags: &[S]) -> bool {
        match self {
            Self::Tag(tag) => tags.iter().any(|candidate| candidate.as_ref() == tag),
            Self::Not(inner) => !inner.eval(tags),
            Self::All(operands) => operands.iter().all(|operand| operand.eval(tags)),
            Self::Any(operands) => operands.iter().any(|operand| operand.eval(tags)),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Token<'a> {
    Word(&'a str),
    And,
    Or,
    Not,
    Open,
    Close,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Word(word) => f.write_str(word),
            Self::And => f.write_str("and"),
            Self::Or => f.write_str("or"),
            Self::Not => f.write_str("not"),
            Self::Open => f.write_str("("),
            Self::Close => f.write_str(")"),
        }
    }
}

const fn is_tag_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '-' | '.' | ':')
}

fn lex(source: &str) -> Result<Vec<Token<'_>>, TagFilterError> {
    let mut tokens = Vec::new();
    let mut rest = source;

    while let Some(ch) = rest.chars().next() {
        if ch.is_whitespace() {
            rest = &rest[ch.len_utf8()..];
            continue;
        }

        match ch {
            '(' => {
                tokens.push(Token::Open);
                rest = &rest[1..];
            }
            ')' => {
                tokens.push(Token::Close);
                rest = &rest[1..];
            }
            ch if is_tag_char(ch) => {
                let end = rest.find(|c: char| !is_tag_char(c)).unwrap_or(rest.len());
                let word = &rest[..end];
                tokens.push(match word {
                    "and" => Token::And,
                    "or" => Token::Or,
                    "not" => Token::Not,
                    _ => Token::Word(word),
                });
                rest = &rest[end..];
            }
            ch => {
                return Err(TagFilterError::UnexpectedChar {
                    ch,
                    expression: source.to_string(),
                });
            }
        }
    }

    if tokens.is_empty() {
        return Err(TagFilterError::Empty {
            expression: source.to_string(),
        });
    }

    Ok(tokens)
}

struct ExprParser<'a> {
    source: &'a str,
    tokens: &'a [Token<'a>],
    cursor: usize,
}

impl ExprParser<'_> {
    fn peek(&self) -> Option<&Token<'_>> {
        self.tokens.get(self.cursor)
    }

    fn eat(&mut self, expected: &Token<'_>) -> bool {
        if self.peek() == Some(expected) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn disjunction(&mut self) -> Result<TagExpr, TagFilterError> {
        let mut operands = vec![self.conjunction()?];
        while self.eat(&Token::Or) {
            operands.push(self.conjunction()?);
        }
        Ok(if operands.len() == 1 {
            operands.remove(0)
        } else {
            TagExpr::Any(operands)
        })
    }

    fn conjunction(&mut self) -> Result<TagExpr, TagFilterError> {
        let mut operands = vec![self.negation()?];
        while self.eat(&Token::And) {
            operands.push(self.negation()?);
        }
        Ok(if operands.len() == 1 {
            operands.remove(0)
        } else {
            TagExpr::All(operands)
        })
    }

    fn negation(&mut self) -> Result<TagExpr, TagFilterError> {
        if self.eat(&Token::Not) {
            return Ok(TagExpr::Not(Box::new(self.negation()?)));
        }
        self.atom()
    }

    fn atom(&mut self) -> Result<TagExpr, TagFilterError> {
        let expression = self.source.to_string();
        match self.peek() {
            Some(Token::Word(word)) => {
                let tag = TagExpr::Tag((*word).to_string());
                self.cursor += 1;
                Ok(tag)
            }
            Some(Token::Open) => {
                self.cursor += 1;
                let inner = self.disjunction()?;
                if self.eat(&Token::Close) {
                    Ok(inner)
                } else {
                    Err(TagFilterError::UnclosedParen { expression })
                }
            }
            Some(token) => Err(TagFilterError::UnexpectedToken {
                token: token.to_string(),
                expression,
            }),
            None => Err(TagFilterError::UnexpectedEnd { expression }),
        }
    }
}
