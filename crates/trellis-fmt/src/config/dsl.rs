//! Recursive-descent parser compiling DSL text into a
//! [`FormattingConfiguration`].
//!
//! ```text
//! ws_allowed: nil;
//! ws_required: nbsp;
//! preserve comment;
//! after operator { nbsp; }
//! omit ";";
//! rule block {
//!     nest from after "{" to before "}";
//!     join from after "{" to before "}" hard;
//! }
//! ```

use trellis_common::span::Span;

use super::lexer::{self, Token, TokenKind};
use super::{AnchorKey, Disposition, FormattingConfiguration, Operation, Position, TriviaPolicy};
use crate::doc::{self, Doc};
use crate::error::{ConfigError, ConfigErrorKind};

pub(crate) fn parse(source: &str) -> Result<FormattingConfiguration, ConfigError> {
    let tokens = lexer::lex(source)?;
    let mut parser = DslParser {
        source,
        tokens,
        pos: 0,
        config: FormattingConfiguration::new(),
    };
    parser.statements(None)?;
    if let Some(token) = parser.peek() {
        return Err(parser.unexpected("statement", token));
    }
    tracing::debug!(
        rules = parser.config.rules.len(),
        conflicts = parser.config.conflicts.len(),
        "formatting configuration compiled"
    );
    Ok(parser.config)
}

fn describe(token: Token<'_>) -> String {
    match token.kind {
        TokenKind::Ident | TokenKind::Int | TokenKind::Str => {
            format!("{} `{}`", token.kind.describe(), token.text)
        }
        kind => kind.describe().to_string(),
    }
}

struct DslParser<'s> {
    source: &'s str,
    tokens: Vec<Token<'s>>,
    pos: usize,
    config: FormattingConfiguration,
}

impl<'s> DslParser<'s> {
    // ── Token helpers ───────────────────────────────────────────────────

    fn peek(&self) -> Option<Token<'s>> {
        self.tokens.get(self.pos).copied()
    }

    fn peek_nth(&self, n: usize) -> Option<Token<'s>> {
        self.tokens.get(self.pos + n).copied()
    }

    fn bump(&mut self) -> Option<Token<'s>> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().is_some_and(|t| t.kind == kind)
    }

    fn at_word(&self, word: &str) -> bool {
        self.peek()
            .is_some_and(|t| t.kind == TokenKind::Ident && t.text == word)
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.at_word(word) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn end_span(&self) -> Span {
        Span::empty_at(self.source.len() as u32)
    }

    fn unexpected(&self, expected: &str, found: Token<'s>) -> ConfigError {
        let span = found.span;
        ConfigError::new(
            ConfigErrorKind::Unexpected {
                expected: expected.to_string(),
                found: describe(found),
            },
            span,
        )
    }

    fn unexpected_here(&self, expected: &str) -> ConfigError {
        match self.peek() {
            Some(token) => self.unexpected(expected, token),
            None => ConfigError::new(
                ConfigErrorKind::Unexpected {
                    expected: expected.to_string(),
                    found: "end of input".to_string(),
                },
                self.end_span(),
            ),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token<'s>, ConfigError> {
        match self.peek() {
            Some(token) if token.kind == kind => {
                self.pos += 1;
                Ok(token)
            }
            _ => Err(self.unexpected_here(kind.describe())),
        }
    }

    fn expect_word(&mut self, word: &str) -> Result<(), ConfigError> {
        if self.eat_word(word) {
            Ok(())
        } else {
            Err(self.unexpected_here(&format!("`{word}`")))
        }
    }

    fn number(&mut self) -> Result<u32, ConfigError> {
        let token = self.expect(TokenKind::Int)?;
        token.text.parse().map_err(|_| {
            ConfigError::new(ConfigErrorKind::InvalidNumber(token.text.to_string()), token.span)
        })
    }

    // ── Statements ──────────────────────────────────────────────────────

    /// Statements up to end of input (global scope) or a closing brace
    /// (rule scope), which is left for the caller.
    fn statements(&mut self, rule: Option<&str>) -> Result<(), ConfigError> {
        while let Some(token) = self.peek() {
            if token.kind == TokenKind::RBrace {
                break;
            }
            self.statement(rule)?;
        }
        Ok(())
    }

    fn statement(&mut self, rule: Option<&str>) -> Result<(), ConfigError> {
        let token = self.expect(TokenKind::Ident).map_err(|_| self.unexpected_here("statement"))?;
        match token.text {
            "ws_allowed" | "ws_required" => {
                self.expect(TokenKind::Colon)?;
                let spacing = self.spacing()?;
                self.expect(TokenKind::Semi)?;
                if token.text == "ws_allowed" {
                    self.config.set_ws_allowed(rule, spacing);
                } else {
                    self.config.set_ws_required(rule, spacing);
                }
            }
            "after" | "before" => {
                let position = if token.text == "after" {
                    Position::After
                } else {
                    Position::Before
                };
                let anchor = self.anchor()?;
                self.expect(TokenKind::LBrace)?;
                while !self.eat(TokenKind::RBrace) {
                    let spacing = self.spacing()?;
                    self.expect(TokenKind::Semi)?;
                    self.config
                        .add_operation(rule, anchor.at(position), Operation::Spacing(spacing));
                }
            }
            "omit" => {
                let anchor = self.anchor()?;
                self.expect(TokenKind::Semi)?;
                self.config
                    .set_disposition(rule, anchor.at(Position::Before), Disposition::Omit);
            }
            "render" => {
                let anchor = self.anchor()?;
                self.expect_word("as")?;
                let doc = self.spacing()?;
                self.expect(TokenKind::Semi)?;
                self.config.set_disposition(
                    rule,
                    anchor.at(Position::Before),
                    Disposition::RenderAs(doc),
                );
            }
            "group" => {
                let (from, to) = self.range()?;
                self.expect(TokenKind::Semi)?;
                self.add_range(rule, from, to, Operation::GroupBegin, Operation::GroupEnd);
            }
            "nest" => {
                let amount = if self.at(TokenKind::Int) {
                    Some(self.number()?)
                } else {
                    None
                };
                let (from, to) = self.range()?;
                self.expect(TokenKind::Semi)?;
                self.add_range(rule, from, to, Operation::IndentBegin(amount), Operation::IndentEnd);
            }
            "join" => {
                let (from, to) = self.range()?;
                let separator = self.spacing()?;
                self.expect(TokenKind::Semi)?;
                self.add_range(rule, from, to, Operation::JoinBegin(separator), Operation::JoinEnd);
            }
            "preserve" => {
                if rule.is_some() {
                    return Err(ConfigError::new(ConfigErrorKind::PreserveInRule, token.span));
                }
                let policy = self.preserve_policy()?;
                self.expect(TokenKind::Semi)?;
                self.config.set_trivia_policy(policy);
            }
            "rule" => {
                if rule.is_some() {
                    return Err(ConfigError::new(ConfigErrorKind::NestedRule, token.span));
                }
                let name = self.expect(TokenKind::Ident)?.text;
                self.expect(TokenKind::LBrace)?;
                self.statements(Some(name))?;
                self.expect(TokenKind::RBrace)?;
            }
            other => {
                return Err(ConfigError::new(
                    ConfigErrorKind::UnknownStatement(other.to_string()),
                    token.span,
                ))
            }
        }
        Ok(())
    }

    fn preserve_policy(&mut self) -> Result<TriviaPolicy, ConfigError> {
        if self.eat_word("all") {
            return Ok(TriviaPolicy::All);
        }
        if self.eat_word("none") {
            return Ok(TriviaPolicy::none());
        }
        let mut names = vec![self.expect(TokenKind::Ident)?.text];
        while self.eat(TokenKind::Comma) {
            names.push(self.expect(TokenKind::Ident)?.text);
        }
        Ok(TriviaPolicy::only(names))
    }

    /// A selector, keyed `Before`; callers move it with [`AnchorKey::at`].
    fn anchor(&mut self) -> Result<AnchorKey, ConfigError> {
        let key = match self.peek() {
            Some(token) if token.kind == TokenKind::Str => {
                AnchorKey::literal(Position::Before, lexer::unescape(token.text))
            }
            Some(token) if token.kind == TokenKind::Ident => match token.text {
                "rule_start" => AnchorKey::rule_start(Position::Before),
                "rule_end" => AnchorKey::rule_end(Position::Before),
                label => AnchorKey::label(Position::Before, label),
            },
            _ => return Err(self.unexpected_here("anchor")),
        };
        self.pos += 1;
        Ok(key)
    }

    fn at_anchor_after(&self, n: usize) -> bool {
        self.peek_nth(n)
            .is_some_and(|t| matches!(t.kind, TokenKind::Ident | TokenKind::Str))
    }

    /// `[from [after] A] [to [before] A]`, defaulting to the whole rule.
    fn range(&mut self) -> Result<(AnchorKey, AnchorKey), ConfigError> {
        let from = if self.eat_word("from") {
            let exclusive = self.at_word("after") && self.at_anchor_after(1);
            if exclusive {
                self.pos += 1;
            }
            let anchor = self.anchor()?;
            anchor.at(if exclusive {
                Position::After
            } else {
                Position::Before
            })
        } else {
            AnchorKey::rule_start(Position::Before)
        };
        let to = if self.eat_word("to") {
            let exclusive = self.at_word("before") && self.at_anchor_after(1);
            if exclusive {
                self.pos += 1;
            }
            let anchor = self.anchor()?;
            anchor.at(if exclusive {
                Position::Before
            } else {
                Position::After
            })
        } else {
            AnchorKey::rule_end(Position::After)
        };
        Ok((from, to))
    }

    fn add_range(
        &mut self,
        rule: Option<&str>,
        from: AnchorKey,
        to: AnchorKey,
        begin: Operation,
        end: Operation,
    ) {
        self.config.add_operation(rule, from, begin);
        self.config.add_operation(rule, to, end);
    }

    // ── Spacing expressions ─────────────────────────────────────────────

    fn spacing(&mut self) -> Result<Doc, ConfigError> {
        let token = match self.peek() {
            Some(token) if token.kind == TokenKind::Ident => token,
            _ => return Err(self.unexpected_here("spacing")),
        };
        self.bump();
        let doc = match token.text {
            "nil" => Doc::Empty,
            "nbsp" => Doc::NbSpace,
            "bsp" => Doc::OptSpace,
            "soft" => Doc::SoftBreak,
            "hard" => doc::hardline(),
            "blank" => {
                if self.eat(TokenKind::LParen) {
                    let n = self.number()?;
                    self.expect(TokenKind::RParen)?;
                    doc::blank(n)
                } else {
                    doc::blank(1)
                }
            }
            "text" => {
                self.expect(TokenKind::LParen)?;
                let literal = self.expect(TokenKind::Str)?;
                self.expect(TokenKind::RParen)?;
                doc::text(lexer::unescape(literal.text))
            }
            "concat" => {
                self.expect(TokenKind::LParen)?;
                let items = self.spacing_list()?;
                self.expect(TokenKind::RParen)?;
                doc::seq(items)
            }
            "group" => {
                self.expect(TokenKind::LParen)?;
                let inner = self.spacing()?;
                self.expect(TokenKind::RParen)?;
                doc::group(inner)
            }
            "nest" => {
                self.expect(TokenKind::LParen)?;
                let amount = if self.at(TokenKind::Int) {
                    let n = self.number()?;
                    self.expect(TokenKind::Comma)?;
                    Some(n)
                } else {
                    None
                };
                let inner = self.spacing()?;
                self.expect(TokenKind::RParen)?;
                Doc::Indent(Box::new(inner), amount)
            }
            "join" => {
                self.expect(TokenKind::LParen)?;
                let separator = self.spacing()?;
                self.expect(TokenKind::Comma)?;
                let items = self.spacing_list()?;
                self.expect(TokenKind::RParen)?;
                doc::join(separator, items)
            }
            other => {
                return Err(ConfigError::new(
                    ConfigErrorKind::UnknownSpacing(other.to_string()),
                    token.span,
                ))
            }
        };
        Ok(doc)
    }

    /// `[e, e, ...]`, trailing comma allowed.
    fn spacing_list(&mut self) -> Result<Vec<Doc>, ConfigError> {
        self.expect(TokenKind::LBracket)?;
        let mut items = Vec::new();
        while !self.eat(TokenKind::RBracket) {
            items.push(self.spacing()?);
            if !self.eat(TokenKind::Comma) {
                self.expect(TokenKind::RBracket)?;
                break;
            }
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectorKind;
    use pretty_assertions::assert_eq;

    fn ops(config: &FormattingConfiguration, rule: &str, key: &str) -> Vec<Operation> {
        config
            .anchor_config(rule, &key.parse().unwrap())
            .operations
    }

    #[test]
    fn whitespace_defaults() {
        let config = parse("ws_allowed: bsp; rule call { ws_required: blank(2); }").unwrap();
        assert_eq!(
            config.spacing_for_separator("x", trellis_grammar::Separator::WsAllowed),
            Doc::OptSpace
        );
        assert_eq!(
            config.spacing_for_separator("call", trellis_grammar::Separator::WsRequired),
            Doc::HardBreak(2)
        );
    }

    #[test]
    fn spacing_blocks() {
        let config = parse(
            r#"
            after operator { hard; }
            before "+" { nbsp; soft; }
            "#,
        )
        .unwrap();
        assert_eq!(
            ops(&config, "expr", "after:label:operator"),
            vec![Operation::Spacing(Doc::HardBreak(0))]
        );
        assert_eq!(
            ops(&config, "expr", "before:literal:+"),
            vec![Operation::Spacing(Doc::NbSpace), Operation::Spacing(Doc::SoftBreak)]
        );
    }

    #[test]
    fn dispositions_are_stored_before_the_anchor() {
        let config = parse(r#"omit ";"; render op as text("plus");"#).unwrap();
        assert_eq!(
            config.anchor_config("x", &"before:literal:;".parse().unwrap()).disposition,
            Some(Disposition::Omit)
        );
        assert_eq!(
            config.anchor_config("x", &"before:label:op".parse().unwrap()).disposition,
            Some(Disposition::RenderAs(doc::text("plus")))
        );
    }

    #[test]
    fn ranges_and_boundaries() {
        let config = parse(
            r#"
            group;
            nest 2 from after "{" to before "}";
            join from a to b hard;
            "#,
        )
        .unwrap();
        assert_eq!(ops(&config, "r", "before:rule_start:"), vec![Operation::GroupBegin]);
        assert_eq!(ops(&config, "r", "after:rule_end:"), vec![Operation::GroupEnd]);
        assert_eq!(
            ops(&config, "r", "after:literal:{"),
            vec![Operation::IndentBegin(Some(2))]
        );
        assert_eq!(ops(&config, "r", "before:literal:}"), vec![Operation::IndentEnd]);
        assert_eq!(
            ops(&config, "r", "before:label:a"),
            vec![Operation::JoinBegin(Doc::HardBreak(0))]
        );
        assert_eq!(ops(&config, "r", "after:label:b"), vec![Operation::JoinEnd]);
    }

    #[test]
    fn shared_anchor_unwinds_in_reverse_order() {
        let config = parse("group to x; nest to x;").unwrap();
        assert_eq!(
            ops(&config, "r", "after:label:x"),
            vec![Operation::IndentEnd, Operation::GroupEnd]
        );
    }

    #[test]
    fn after_as_a_label() {
        let config = parse("group from after;").unwrap();
        let key = AnchorKey::label(Position::Before, "after");
        assert_eq!(key.kind, SelectorKind::Label);
        assert_eq!(config.anchor_config("r", &key).operations, vec![Operation::GroupBegin]);
    }

    #[test]
    fn spacing_expressions() {
        let config = parse(
            r#"after x { concat([text(","), group(nest(4, soft)), join(nbsp, [nil, blank])]); }"#,
        )
        .unwrap();
        assert_eq!(
            ops(&config, "r", "after:label:x"),
            vec![Operation::Spacing(Doc::Seq(vec![
                doc::text(","),
                doc::group(doc::indent_by(Doc::SoftBreak, 4)),
                doc::join(Doc::NbSpace, vec![Doc::Empty, Doc::HardBreak(1)]),
            ]))]
        );
    }

    #[test]
    fn preserve_statement() {
        assert_eq!(parse("preserve none;").unwrap().trivia_policy(), &TriviaPolicy::none());
        assert_eq!(
            parse("preserve comment, doc;").unwrap().trivia_policy(),
            &TriviaPolicy::only(["comment", "doc"])
        );
        assert_eq!(parse("").unwrap().trivia_policy(), &TriviaPolicy::All);
    }

    #[test]
    fn rule_scoped_statements() {
        let config = parse("rule expr { after operator { nbsp; } }").unwrap();
        assert_eq!(
            ops(&config, "expr", "after:label:operator"),
            vec![Operation::Spacing(Doc::NbSpace)]
        );
        assert!(ops(&config, "term", "after:label:operator").is_empty());
    }

    #[test]
    fn errors() {
        let err = parse("after x { hard }").unwrap_err();
        assert_eq!(err.to_string(), "expected `;`, found `}`");
        assert_eq!(err.span, Span::new(15, 16));

        let err = parse("indent x;").unwrap_err();
        assert_eq!(err.kind, ConfigErrorKind::UnknownStatement("indent".into()));
        assert_eq!(err.span, Span::new(0, 6));

        let err = parse("ws_allowed: wide;").unwrap_err();
        assert_eq!(err.kind, ConfigErrorKind::UnknownSpacing("wide".into()));

        let err = parse("rule a { rule b { } }").unwrap_err();
        assert_eq!(err.kind, ConfigErrorKind::NestedRule);

        let err = parse("rule a { preserve none; }").unwrap_err();
        assert_eq!(err.kind, ConfigErrorKind::PreserveInRule);

        let err = parse("blank;").unwrap_err();
        assert_eq!(err.kind, ConfigErrorKind::UnknownStatement("blank".into()));

        let err = parse("nest 99999999999;").unwrap_err();
        assert_eq!(err.kind, ConfigErrorKind::InvalidNumber("99999999999".into()));

        let err = parse("omit x").unwrap_err();
        assert_eq!(err.to_string(), "expected `;`, found end of input");
        assert_eq!(err.span, Span::new(6, 6));

        let err = parse("}").unwrap_err();
        assert_eq!(err.to_string(), "expected statement, found `}`");
    }
}
