use crate::ast::RawTypeSpec;
use crate::lexer::Token;
use crate::model::{Attr, AttrOp, BuiltinType};

/// Token cursor over a single logical line.
///
/// Every `parse_*` method returns `None` when the line does not match the
/// grammar; the caller reports that as a syntax error on the line.
pub(super) struct Cursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(super) fn new(tokens: &'a [Token]) -> Self {
        Cursor { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'a Token> {
        let t = self.tokens.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    pub(super) fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// `Some(())` only if every token was consumed.
    pub(super) fn finish(&self) -> Option<()> {
        self.at_end().then_some(())
    }

    fn is(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.is(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(super) fn eat_word(&mut self, word: &str) -> bool {
        match self.peek() {
            Some(Token::Word(w)) if w == word => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn expect(&mut self, token: &Token) -> Option<()> {
        self.eat(token).then_some(())
    }

    /// An identifier: a letter followed by letters, digits, or underscores.
    pub(super) fn take_ident(&mut self) -> Option<String> {
        match self.peek() {
            Some(Token::Word(w)) if is_ident(w) => {
                self.pos += 1;
                Some(w.clone())
            }
            _ => None,
        }
    }

    // -- Base type lists ----------------------------------------

    /// Optional `( Name, Name, ... )`. An empty pair of parens is a syntax error.
    pub(super) fn parse_base_list(&mut self) -> Option<Vec<String>> {
        let mut bases = Vec::new();
        if !self.eat(&Token::LParen) {
            return Some(bases);
        }
        loop {
            bases.push(self.take_ident()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RParen)?;
            return Some(bases);
        }
    }

    // -- Type specs ---------------------------------------------

    /// Parse a typespec and its trailing attribute.
    ///
    /// ```text
    /// T(attr)
    /// T(elem_attr)[len_attr]
    /// K(key_attr) : V(value_attr){len_attr}
    /// V(value_attr){len_attr}
    /// ```
    pub(super) fn parse_typespec(&mut self) -> Option<(RawTypeSpec, Option<Attr>)> {
        let (first, first_attr) = self.parse_element()?;

        if self.eat(&Token::Colon) {
            let (value, value_attr) = self.parse_element()?;
            self.expect(&Token::LBrace)?;
            let attr = self.parse_attr(&Token::RBrace)?;
            let spec = RawTypeSpec::Dict {
                key: Box::new(first),
                key_attr: first_attr,
                value: Box::new(value),
                value_attr,
            };
            return Some((spec, attr));
        }

        if self.eat(&Token::LBracket) {
            let attr = self.parse_attr(&Token::RBracket)?;
            let spec = RawTypeSpec::Array {
                element: Box::new(first),
                element_attr: first_attr,
            };
            return Some((spec, attr));
        }

        if self.eat(&Token::LBrace) {
            let attr = self.parse_attr(&Token::RBrace)?;
            let spec = RawTypeSpec::Dict {
                key: Box::new(RawTypeSpec::Builtin(BuiltinType::String)),
                key_attr: None,
                value: Box::new(first),
                value_attr: first_attr,
            };
            return Some((spec, attr));
        }

        Some((first, first_attr))
    }

    /// A type name with an optional parenthesized attribute.
    fn parse_element(&mut self) -> Option<(RawTypeSpec, Option<Attr>)> {
        let name = self.take_ident()?;
        let spec = match BuiltinType::from_keyword(&name) {
            Some(b) => RawTypeSpec::Builtin(b),
            None => RawTypeSpec::Named(name),
        };
        let attr = if self.eat(&Token::LParen) {
            self.parse_attr(&Token::RParen)?
        } else {
            None
        };
        Some((spec, attr))
    }

    /// Comma-separated `[len] op number` pairs up to `close`; empty gives `None`.
    fn parse_attr(&mut self, close: &Token) -> Option<Option<Attr>> {
        if self.eat(close) {
            return Some(None);
        }
        let mut attr = Attr::new();
        loop {
            let len = self.eat_word("len");
            let op = match (self.advance()?, len) {
                (Token::Lt, false) => AttrOp::Lt,
                (Token::Lte, false) => AttrOp::Lte,
                (Token::Gt, false) => AttrOp::Gt,
                (Token::Gte, false) => AttrOp::Gte,
                (Token::Eq, false) => AttrOp::Eq,
                (Token::Lt, true) => AttrOp::LenLt,
                (Token::Lte, true) => AttrOp::LenLte,
                (Token::Gt, true) => AttrOp::LenGt,
                (Token::Gte, true) => AttrOp::LenGte,
                (Token::Eq, true) => AttrOp::LenEq,
                _ => return None,
            };
            let operand = match self.advance()? {
                Token::Number(n) => n.parse::<f64>().ok()?,
                _ => return None,
            };
            attr.set(op, operand);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(close)?;
            return Some(Some(attr));
        }
    }
}

fn is_ident(word: &str) -> bool {
    word.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
}
