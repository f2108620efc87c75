// helium-parser - Parser for Helium
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Recursive descent parser for Helium source code.
//!
//! Statements are recognised by their leading token; expressions are parsed
//! with a shunting-yard loop over primaries and binary operators. Newlines
//! separate statements and are stripped between statements, between a
//! control keyword's condition and its `{`, and around table entries, but
//! never inside an expression.

use std::fmt;

use crate::ast::{AstKind, AstNode};
use crate::lexer::{LexError, Token, TokenKind};
use crate::pos::Position;
use crate::report;

/// Parser error with position information.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub message: String,
    pub pos: Position,
    pub line_text: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        report::write_diagnostic(f, &self.message, &self.pos, &self.line_text)
    }
}

impl std::error::Error for ParseError {}

impl From<LexError> for ParseError {
    fn from(e: LexError) -> Self {
        ParseError {
            message: e.message,
            pos: e.pos,
            line_text: e.line_text,
        }
    }
}

/// The parser walks a lexed token stream and builds the syntax tree.
pub struct Parser<'a> {
    tokens: &'a [Token],
    position: usize,
    source: &'a str,
}

impl<'a> Parser<'a> {
    /// Parse a full token stream into a `Block` node holding the top-level
    /// statements. `source` is the text the tokens came from, used to quote
    /// offending lines in errors.
    pub fn parse(tokens: &'a [Token], source: &'a str) -> Result<AstNode, ParseError> {
        if tokens.is_empty() {
            return Err(ParseError {
                message: "empty token stream".to_string(),
                pos: Position::start(""),
                line_text: String::new(),
            });
        }

        let mut parser = Parser {
            tokens,
            position: 0,
            source,
        };
        parser.parse_block(TokenKind::Eof)
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn peek(&self) -> &'a Token {
        let tokens = self.tokens;
        &tokens[self.position.min(tokens.len() - 1)]
    }

    fn lookahead1(&self) -> &'a Token {
        let tokens = self.tokens;
        &tokens[(self.position + 1).min(tokens.len() - 1)]
    }

    fn eat(&mut self) -> &'a Token {
        let token = self.peek();
        if self.position < self.tokens.len() {
            self.position += 1;
        }
        token
    }

    fn consume(&mut self, kind: TokenKind) -> Result<&'a Token, ParseError> {
        let token = self.peek();
        if token.kind == kind {
            Ok(self.eat())
        } else if token.kind == TokenKind::Eof {
            Err(self.error_at(token, "unexpected end of input"))
        } else {
            Err(self.error_at(token, format!("unexpected token '{}'", token.value)))
        }
    }

    fn consume_optional(&mut self, kind: TokenKind) -> bool {
        if self.peek().kind == kind {
            self.eat();
            true
        } else {
            false
        }
    }

    fn is_empty(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn skip_newlines(&mut self) {
        while self.peek().kind == TokenKind::Newline {
            self.eat();
        }
    }

    fn error_at(&self, token: &Token, message: impl Into<String>) -> ParseError {
        ParseError {
            message: message.into(),
            pos: token.pos.clone(),
            line_text: report::line_at(self.source, token.pos.line_offset),
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn parse_block(&mut self, term: TokenKind) -> Result<AstNode, ParseError> {
        let mut block = AstNode::new(AstKind::Block, "block", self.peek().pos.clone());

        loop {
            self.skip_newlines();
            if self.peek().kind == term || self.is_empty() {
                break;
            }
            block.push(self.parse_statement()?);
        }

        Ok(block)
    }

    fn parse_statement(&mut self) -> Result<AstNode, ParseError> {
        match self.peek().kind {
            TokenKind::Symbol => match self.lookahead1().kind {
                TokenKind::LeftSquare | TokenKind::Dot => self.parse_table_put(),
                _ => self.parse_assignment(),
            },
            TokenKind::Call => self.parse_function_call(),
            // A bare function definition is allowed in statement position so
            // a body can consist of nothing but a nested definition.
            TokenKind::Function => self.parse_expression(),
            TokenKind::Loop => self.parse_loop(),
            TokenKind::If => self.parse_branches(),
            TokenKind::Include => self.parse_include(),
            TokenKind::Return => self.parse_return(),
            _ => Err(self.error_at(self.peek(), "failed to parse statement")),
        }
    }

    fn parse_assignment(&mut self) -> Result<AstNode, ParseError> {
        let name = self.consume(TokenKind::Symbol)?;
        let mut assign = AstNode::new(AstKind::Assign, name.value.clone(), name.pos.clone());
        self.consume(TokenKind::Assign)?;
        assign.push(self.parse_expression()?);
        Ok(assign)
    }

    fn parse_table_put(&mut self) -> Result<AstNode, ParseError> {
        let name = self.consume(TokenKind::Symbol)?;
        let key = self.parse_accessor()?;
        let mut put = AstNode::new(AstKind::Put, name.value.clone(), name.pos.clone());
        self.consume(TokenKind::Assign)?;
        put.push(key);
        put.push(self.parse_expression()?);
        Ok(put)
    }

    /// The key of a `t[expr]` or `t.field` access; a dotted field is sugar
    /// for a string key.
    fn parse_accessor(&mut self) -> Result<AstNode, ParseError> {
        if self.consume_optional(TokenKind::LeftSquare) {
            let key = self.parse_expression()?;
            self.consume(TokenKind::RightSquare)?;
            Ok(key)
        } else {
            self.consume(TokenKind::Dot)?;
            let field = self.consume(TokenKind::Symbol)?;
            Ok(AstNode::new(
                AstKind::String,
                field.value.clone(),
                field.pos.clone(),
            ))
        }
    }

    fn parse_function_call(&mut self) -> Result<AstNode, ParseError> {
        let pos = self.consume(TokenKind::Call)?.pos.clone();
        let mut call = AstNode::new(AstKind::Call, "call", pos);

        // First child is the callee, the rest are arguments.
        call.push(self.parse_expression()?);

        self.consume(TokenKind::LeftParen)?;
        if self.peek().kind != TokenKind::RightParen {
            loop {
                call.push(self.parse_expression()?);
                if !self.consume_optional(TokenKind::Separator) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen)?;

        Ok(call)
    }

    fn parse_loop(&mut self) -> Result<AstNode, ParseError> {
        let pos = self.consume(TokenKind::Loop)?.pos.clone();
        let mut node = AstNode::new(AstKind::Loop, "loop", pos);
        node.push(self.parse_expression()?);
        node.push(self.parse_braced_block()?);
        Ok(node)
    }

    fn parse_branches(&mut self) -> Result<AstNode, ParseError> {
        let pos = self.consume(TokenKind::If)?.pos.clone();
        let mut branch = AstNode::new(AstKind::Branches, "conditional", pos);
        branch.push(self.parse_expression()?);
        branch.push(self.parse_braced_block()?);

        // An `else if` extends the chain as the last child; a bare `else`
        // terminates it with an "alt" node.
        if self.peek().kind == TokenKind::Else {
            let alt_pos = self.eat().pos.clone();
            if self.peek().kind == TokenKind::If {
                branch.push(self.parse_branches()?);
            } else {
                let mut alt = AstNode::new(AstKind::Branches, "alt", alt_pos);
                alt.push(self.parse_braced_block()?);
                branch.push(alt);
            }
        }

        Ok(branch)
    }

    fn parse_include(&mut self) -> Result<AstNode, ParseError> {
        let pos = self.consume(TokenKind::Include)?.pos.clone();
        if self.peek().kind != TokenKind::String {
            return Err(self.error_at(self.peek(), "include expects a string path"));
        }
        let path = self.eat();
        let mut node = AstNode::new(AstKind::Include, "include", pos);
        node.push(AstNode::new(
            AstKind::String,
            path.value.clone(),
            path.pos.clone(),
        ));
        Ok(node)
    }

    fn parse_return(&mut self) -> Result<AstNode, ParseError> {
        let pos = self.consume(TokenKind::Return)?.pos.clone();
        let mut node = AstNode::new(AstKind::Return, "ret", pos);
        node.push(self.parse_expression()?);
        Ok(node)
    }

    /// `{ Block }` after a control keyword's condition, with the newlines
    /// before `{` stripped.
    fn parse_braced_block(&mut self) -> Result<AstNode, ParseError> {
        self.skip_newlines();
        self.consume(TokenKind::LeftBrace)?;
        let block = self.parse_block(TokenKind::RightBrace)?;
        self.consume(TokenKind::RightBrace)?;
        Ok(block)
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Shunting yard over primaries and binary operators. All binary
    /// operators are left-associative: the stack is reduced while its top
    /// has precedence greater than or equal to the incoming operator.
    fn parse_expression(&mut self) -> Result<AstNode, ParseError> {
        let mut operands: Vec<AstNode> = Vec::new();
        let mut operators: Vec<&'a Token> = Vec::new();

        operands.push(self.parse_primary()?);

        while !self.is_empty() && self.peek().kind == TokenKind::Operator {
            let op = self.eat();

            while let Some(&top) = operators.last() {
                if self.precedence(top)? >= self.precedence(op)? {
                    let reduced = Self::apply_op(&mut operands, &mut operators);
                    operands.push(reduced);
                } else {
                    break;
                }
            }

            operators.push(op);
            operands.push(self.parse_primary()?);
        }

        while !operators.is_empty() {
            let reduced = Self::apply_op(&mut operands, &mut operators);
            operands.push(reduced);
        }

        Ok(operands.pop().unwrap())
    }

    fn parse_primary(&mut self) -> Result<AstNode, ParseError> {
        let token = self.peek();
        match token.kind {
            TokenKind::Integer => Ok(self.leaf(AstKind::Integer)),
            TokenKind::Float => Ok(self.leaf(AstKind::Float)),
            TokenKind::Bool => Ok(self.leaf(AstKind::Bool)),
            TokenKind::String => Ok(self.leaf(AstKind::String)),
            TokenKind::Null => Ok(self.leaf(AstKind::Null)),

            TokenKind::Symbol => match self.lookahead1().kind {
                TokenKind::LeftSquare | TokenKind::Dot => self.parse_table_get(),
                _ => Ok(self.leaf(AstKind::Reference)),
            },

            TokenKind::Call => self.parse_function_call(),
            TokenKind::Function => self.parse_function_def(),
            TokenKind::LeftBrace => self.parse_table_instance(),

            TokenKind::LeftParen => {
                self.eat();
                let expr = self.parse_expression()?;
                self.consume(TokenKind::RightParen)?;
                Ok(expr)
            }

            TokenKind::Operator => {
                if !matches!(token.value.as_str(), "-" | "+" | "!" | "~") {
                    return Err(self.error_at(token, "invalid unary operator"));
                }
                let op = self.eat();
                let mut unary = AstNode::new(AstKind::UnaryExpr, op.value.clone(), op.pos.clone());
                unary.push(self.parse_primary()?);
                Ok(unary)
            }

            TokenKind::Eof => Err(self.error_at(token, "program has ended prematurely")),
            _ => Err(self.error_at(token, "failed to parse token")),
        }
    }

    fn parse_function_def(&mut self) -> Result<AstNode, ParseError> {
        let pos = self.consume(TokenKind::Function)?.pos.clone();
        let mut function = AstNode::new(AstKind::Function, "$", pos);

        let paren = self.consume(TokenKind::LeftParen)?;
        let mut params = AstNode::new(AstKind::Params, "args", paren.pos.clone());
        if self.peek().kind != TokenKind::RightParen {
            loop {
                let param = self.consume(TokenKind::Symbol)?;
                params.push(AstNode::new(
                    AstKind::Param,
                    param.value.clone(),
                    param.pos.clone(),
                ));
                if !self.consume_optional(TokenKind::Separator) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen)?;

        function.push(params);
        function.push(self.parse_braced_block()?);
        Ok(function)
    }

    fn parse_table_instance(&mut self) -> Result<AstNode, ParseError> {
        let pos = self.consume(TokenKind::LeftBrace)?.pos.clone();
        let mut table = AstNode::new(AstKind::Table, "table", pos);

        self.skip_newlines();
        while self.peek().kind != TokenKind::RightBrace {
            let key = self.parse_expression()?;
            self.skip_newlines();
            let colon = self.consume(TokenKind::Colon)?;
            self.skip_newlines();
            let value = self.parse_expression()?;

            let mut pair = AstNode::new(AstKind::KvPair, ":", colon.pos.clone());
            pair.push(key);
            pair.push(value);
            table.push(pair);

            self.skip_newlines();
            if !self.consume_optional(TokenKind::Separator) {
                break;
            }
            self.skip_newlines();
        }
        self.consume(TokenKind::RightBrace)?;

        Ok(table)
    }

    fn parse_table_get(&mut self) -> Result<AstNode, ParseError> {
        let name = self.consume(TokenKind::Symbol)?;
        let key = self.parse_accessor()?;
        let mut get = AstNode::new(AstKind::Get, name.value.clone(), name.pos.clone());
        get.push(key);
        Ok(get)
    }

    fn leaf(&mut self, kind: AstKind) -> AstNode {
        let token = self.eat();
        AstNode::new(kind, token.value.clone(), token.pos.clone())
    }

    /// Operator order precedence; higher binds tighter. Multi-character
    /// operators are matched by full string before the first-character
    /// fallback.
    fn precedence(&self, op: &Token) -> Result<u8, ParseError> {
        match op.value.as_str() {
            "<=" | ">=" => return Ok(8),
            "==" | "!=" => return Ok(7),
            "&&" => return Ok(3),
            "||" => return Ok(2),
            _ => {}
        }

        match op.value.as_bytes().first() {
            Some(b'*') | Some(b'/') | Some(b'%') => Ok(10),
            Some(b'+') | Some(b'-') => Ok(9),
            Some(b'<') | Some(b'>') => Ok(8),
            Some(b'&') => Ok(6),
            Some(b'^') => Ok(5),
            Some(b'|') => Ok(4),
            _ => Err(self.error_at(op, format!("unknown operator '{}'", op.value))),
        }
    }

    /// Pop one operator and two operands, push the combined binary node.
    fn apply_op(operands: &mut Vec<AstNode>, operators: &mut Vec<&Token>) -> AstNode {
        let op = operators.pop().unwrap();
        let rhs = operands.pop().unwrap();
        let lhs = operands.pop().unwrap();

        let mut node = AstNode::new(AstKind::BinaryExpr, op.value.clone(), op.pos.clone());
        node.push(lhs);
        node.push(rhs);
        node
    }
}

// ============================================================================
// Tests
// ============================================================================
