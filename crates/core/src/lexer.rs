//! Line-oriented lexer for spec source text.
//!
//! Physical lines ending in `\` are joined with the following line; the
//! joined logical line keeps the number of its first physical line. Each
//! logical line is classified as blank, a doc comment, a hidden comment, or
//! a code line carrying its token stream. A code line that cannot be
//! tokenized is reported as `Invalid` and the scan moves on.

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Identifiers and keywords, distinguished in the parser
    Word(String),
    /// Double-quoted literal, content without quotes
    Str(String),
    /// Numeric literal, kept as written
    Number(String),
    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Colon,
    Comma,
    // Comparison operators
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    Blank,
    /// `#` comment; text after the marker, trimmed
    Doc(String),
    /// `#-` comment, never attached as documentation
    Hidden,
    Code {
        indented: bool,
        tokens: Vec<Token>,
    },
    Invalid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceLine {
    pub line: u32,
    pub kind: LineKind,
}

pub fn lex(src: &str, start_line: u32) -> Vec<SourceLine> {
    let mut lines = Vec::new();
    let mut pending: Option<(u32, String)> = None;

    for (idx, raw) in src.lines().enumerate() {
        let line = start_line + idx as u32;
        let (first_line, mut text) = match pending.take() {
            Some((first, mut acc)) => {
                acc.push(' ');
                acc.push_str(raw);
                (first, acc)
            }
            None => (line, raw.to_owned()),
        };

        let trimmed_len = text.trim_end().len();
        if text[..trimmed_len].ends_with('\\') {
            text.truncate(trimmed_len - 1);
            pending = Some((first_line, text));
            continue;
        }

        lines.push(classify(first_line, &text));
    }

    // A continuation on the final line has nothing left to join.
    if let Some((first_line, text)) = pending {
        lines.push(classify(first_line, &text));
    }

    lines
}

fn classify(line: u32, text: &str) -> SourceLine {
    let body = text.trim_start();
    let kind = if body.trim_end().is_empty() {
        LineKind::Blank
    } else if let Some(rest) = body.strip_prefix('#') {
        if rest.starts_with('-') {
            LineKind::Hidden
        } else {
            LineKind::Doc(rest.trim().to_owned())
        }
    } else {
        match tokenize(body) {
            Some(tokens) => LineKind::Code {
                indented: body.len() != text.len(),
                tokens,
            },
            None => LineKind::Invalid,
        }
    };
    SourceLine { line, kind }
}

fn tokenize(text: &str) -> Option<Vec<Token>> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut pos = 0usize;

    while pos < chars.len() {
        let c = chars[pos];

        if c.is_whitespace() {
            pos += 1;
            continue;
        }

        // Quoted literal, no escapes, must close on this line
        if c == '"' {
            pos += 1;
            let start = pos;
            while pos < chars.len() && chars[pos] != '"' {
                pos += 1;
            }
            if pos >= chars.len() {
                return None;
            }
            tokens.push(Token::Str(chars[start..pos].iter().collect()));
            pos += 1;
            continue;
        }

        if c.is_ascii_alphabetic() || c == '_' {
            let start = pos;
            while pos < chars.len() && (chars[pos].is_ascii_alphanumeric() || chars[pos] == '_') {
                pos += 1;
            }
            tokens.push(Token::Word(chars[start..pos].iter().collect()));
            continue;
        }

        let starts_number = c.is_ascii_digit()
            || (c == '-' && pos + 1 < chars.len() && chars[pos + 1].is_ascii_digit());
        if starts_number {
            let start = pos;
            pos += 1;
            while pos < chars.len() && chars[pos].is_ascii_digit() {
                pos += 1;
            }
            if pos + 1 < chars.len() && chars[pos] == '.' && chars[pos + 1].is_ascii_digit() {
                pos += 1;
                while pos < chars.len() && chars[pos].is_ascii_digit() {
                    pos += 1;
                }
            }
            tokens.push(Token::Number(chars[start..pos].iter().collect()));
            continue;
        }

        let next = chars.get(pos + 1).copied();
        let (token, width) = match (c, next) {
            ('=', Some('=')) => (Token::Eq, 2),
            ('<', Some('=')) => (Token::Lte, 2),
            ('>', Some('=')) => (Token::Gte, 2),
            ('<', _) => (Token::Lt, 1),
            ('>', _) => (Token::Gt, 1),
            ('(', _) => (Token::LParen, 1),
            (')', _) => (Token::RParen, 1),
            ('[', _) => (Token::LBracket, 1),
            (']', _) => (Token::RBracket, 1),
            ('{', _) => (Token::LBrace, 1),
            ('}', _) => (Token::RBrace, 1),
            (':', _) => (Token::Colon, 1),
            (',', _) => (Token::Comma, 1),
            _ => return None,
        };
        tokens.push(token);
        pos += width;
    }

    Some(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<LineKind> {
        lex(src, 1).into_iter().map(|l| l.kind).collect()
    }

    #[test]
    fn classifies_comments_and_blank_lines() {
        let k = kinds("# Doc text\n#\n#- hidden\n\n   \n");
        assert_eq!(
            k,
            vec![
                LineKind::Doc("Doc text".into()),
                LineKind::Doc(String::new()),
                LineKind::Hidden,
                LineKind::Blank,
                LineKind::Blank,
            ]
        );
    }

    #[test]
    fn tokenizes_member_with_attributes() {
        let k = kinds("    optional int(> 1, <= 10.5) a");
        assert_eq!(
            k,
            vec![LineKind::Code {
                indented: true,
                tokens: vec![
                    Token::Word("optional".into()),
                    Token::Word("int".into()),
                    Token::LParen,
                    Token::Gt,
                    Token::Number("1".into()),
                    Token::Comma,
                    Token::Lte,
                    Token::Number("10.5".into()),
                    Token::RParen,
                    Token::Word("a".into()),
                ],
            }]
        );
    }

    #[test]
    fn negative_numbers_and_operators() {
        let k = kinds("x(== -4, >= -1.4)");
        let LineKind::Code { indented, tokens } = &k[0] else {
            panic!("expected code line");
        };
        assert!(!indented);
        assert_eq!(tokens[2], Token::Eq);
        assert_eq!(tokens[3], Token::Number("-4".into()));
        assert_eq!(tokens[5], Token::Gte);
        assert_eq!(tokens[6], Token::Number("-1.4".into()));
    }

    #[test]
    fn continuation_joins_lines_and_keeps_first_line_number() {
        let lines = lex("struct Foo\n    optional \\\n  float b\n    int c", 1);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].line, 2);
        assert_eq!(
            lines[1].kind,
            LineKind::Code {
                indented: true,
                tokens: vec![
                    Token::Word("optional".into()),
                    Token::Word("float".into()),
                    Token::Word("b".into()),
                ],
            }
        );
        assert_eq!(lines[2].line, 4);
    }

    #[test]
    fn start_line_offsets_numbers() {
        let lines = lex("a\nb", 10);
        assert_eq!(lines[0].line, 10);
        assert_eq!(lines[1].line, 11);
    }

    #[test]
    fn unterminated_string_and_stray_characters_are_invalid() {
        assert_eq!(kinds("    \"abc"), vec![LineKind::Invalid]);
        assert_eq!(kinds("    string(regex=\"x\") a"), vec![LineKind::Invalid]);
    }

    #[test]
    fn quoted_values() {
        let k = kinds("  \"Foo and Bar\"");
        assert_eq!(
            k,
            vec![LineKind::Code {
                indented: true,
                tokens: vec![Token::Str("Foo and Bar".into())],
            }]
        );
    }
}
