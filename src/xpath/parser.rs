//! Recursive descent parser for XPath 1.0.
//!
//! Binary operators are parsed by precedence climbing over the table in
//! [`binary_op`]; everything from unary minus downwards follows the grammar
//! productions of <https://www.w3.org/TR/xpath-10/#section-Grammar>.

use super::ast::{Axis, BinaryOp, Expr, NodeTest, Step};
use super::lexer::{tokenize, Spanned, Token};
use super::types::XPathError;
use crate::util::qname::split_qname;

/// Parses an expression into an AST.
///
/// # Errors
///
/// Returns [`XPathError::Syntax`] for empty or malformed expressions,
/// including a location path that ends in `/` after a step.
///
/// # Examples
///
/// ```
/// use xmlpath::xpath::ast::{Expr, NodeTest};
/// use xmlpath::xpath::parser::parse;
///
/// let Expr::RootPath { steps } = parse("/root/h:td").unwrap() else {
///     panic!("expected an absolute path");
/// };
/// assert_eq!(steps.len(), 2);
/// assert_eq!(
///     steps[1].node_test,
///     NodeTest::Name { prefix: Some("h".into()), local: "td".into() }
/// );
/// ```
pub fn parse(input: &str) -> Result<Expr, XPathError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(XPathError::syntax(0, "empty expression"));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: input.len(),
    };
    let expr = parser.expr()?;
    if let Some(extra) = parser.peek() {
        return Err(parser.error(format!("unexpected '{extra}' after expression")));
    }
    Ok(expr)
}

/// Precedence (higher binds tighter) and operator for a binary token.
fn binary_op(token: &Token) -> Option<(u8, BinaryOp)> {
    Some(match token {
        Token::Or => (1, BinaryOp::Or),
        Token::And => (2, BinaryOp::And),
        Token::Equal => (3, BinaryOp::Eq),
        Token::NotEqual => (3, BinaryOp::Neq),
        Token::LessThan => (4, BinaryOp::Lt),
        Token::LessThanEqual => (4, BinaryOp::Lte),
        Token::GreaterThan => (4, BinaryOp::Gt),
        Token::GreaterThanEqual => (4, BinaryOp::Gte),
        Token::Plus => (5, BinaryOp::Add),
        Token::Minus => (5, BinaryOp::Sub),
        Token::Star => (6, BinaryOp::Mul),
        Token::Div => (6, BinaryOp::Div),
        Token::Mod => (6, BinaryOp::Mod),
        _ => return None,
    })
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Input length, reported as the position of errors at the end.
    end: usize,
}

impl Parser {
    // -----------------------------------------------------------------------
    // Token access
    // -----------------------------------------------------------------------

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> Result<(), XPathError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{token}', found {}", self.describe())))
        }
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek().cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn describe(&self) -> String {
        self.peek()
            .map_or_else(|| "end of expression".to_string(), |t| format!("'{t}'"))
    }

    fn error(&self, message: String) -> XPathError {
        let position = self.tokens.get(self.pos).map_or(self.end, |s| s.position);
        XPathError::syntax(position, message)
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn expr(&mut self) -> Result<Expr, XPathError> {
        self.binary(1)
    }

    fn binary(&mut self, min_prec: u8) -> Result<Expr, XPathError> {
        let mut left = self.unary()?;
        while let Some((prec, op)) = self.peek().and_then(binary_op) {
            if prec < min_prec {
                break;
            }
            self.pos += 1;
            let right = self.binary(prec + 1)?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, XPathError> {
        if self.eat(&Token::Minus) {
            Ok(Expr::UnaryNeg(Box::new(self.unary()?)))
        } else {
            self.union()
        }
    }

    fn union(&mut self) -> Result<Expr, XPathError> {
        let mut left = self.path_expr()?;
        while self.eat(&Token::Pipe) {
            let right = self.path_expr()?;
            left = Expr::Union(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn path_expr(&mut self) -> Result<Expr, XPathError> {
        match self.peek() {
            Some(
                Token::VariableReference(_)
                | Token::Literal(_)
                | Token::Number(_)
                | Token::LeftParen
                | Token::FunctionName(_),
            ) => self.filter_expr(),
            Some(Token::Slash) => {
                self.pos += 1;
                let steps = if self.at_step_start() {
                    self.relative_path()?
                } else {
                    Vec::new()
                };
                Ok(Expr::RootPath { steps })
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                let mut steps = vec![Step::descendant_or_self()];
                steps.extend(self.relative_path()?);
                Ok(Expr::RootPath { steps })
            }
            Some(_) if self.at_step_start() => Ok(Expr::Path {
                steps: self.relative_path()?,
            }),
            _ => Err(self.error(format!("expected an expression, found {}", self.describe()))),
        }
    }

    fn filter_expr(&mut self) -> Result<Expr, XPathError> {
        let primary = self.primary()?;
        let predicates = self.predicates()?;
        let steps = match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                self.relative_path()?
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                let mut steps = vec![Step::descendant_or_self()];
                steps.extend(self.relative_path()?);
                steps
            }
            _ => Vec::new(),
        };
        if predicates.is_empty() && steps.is_empty() {
            return Ok(primary);
        }
        Ok(Expr::Filter {
            expr: Box::new(primary),
            predicates,
            steps,
        })
    }

    fn primary(&mut self) -> Result<Expr, XPathError> {
        match self.next() {
            Some(Token::VariableReference(name)) => Ok(Expr::Variable(name)),
            Some(Token::Literal(value)) => Ok(Expr::String(value)),
            Some(Token::Number(value)) => Ok(Expr::Number(value)),
            Some(Token::LeftParen) => {
                let inner = self.expr()?;
                self.expect(&Token::RightParen)?;
                Ok(inner)
            }
            Some(Token::FunctionName(name)) => {
                self.expect(&Token::LeftParen)?;
                let mut args = Vec::new();
                if !self.eat(&Token::RightParen) {
                    loop {
                        args.push(self.expr()?);
                        if !self.eat(&Token::Comma) {
                            break;
                        }
                    }
                    self.expect(&Token::RightParen)?;
                }
                Ok(Expr::FunctionCall { name, args })
            }
            other => {
                if other.is_some() {
                    self.pos -= 1;
                }
                Err(self.error(format!("expected a primary expression, found {}", self.describe())))
            }
        }
    }

    fn predicates(&mut self) -> Result<Vec<Expr>, XPathError> {
        let mut predicates = Vec::new();
        while self.eat(&Token::LeftBracket) {
            predicates.push(self.expr()?);
            self.expect(&Token::RightBracket)?;
        }
        Ok(predicates)
    }

    // -----------------------------------------------------------------------
    // Location paths
    // -----------------------------------------------------------------------

    fn at_step_start(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::Dot
                    | Token::DotDot
                    | Token::At
                    | Token::AxisName(_)
                    | Token::NodeType(_)
                    | Token::Name(_)
                    | Token::PrefixWildcard(_)
            )
        )
    }

    fn relative_path(&mut self) -> Result<Vec<Step>, XPathError> {
        let mut steps = vec![self.step()?];
        loop {
            if self.eat(&Token::Slash) {
                steps.push(self.step()?);
            } else if self.eat(&Token::DoubleSlash) {
                steps.push(Step::descendant_or_self());
                steps.push(self.step()?);
            } else {
                return Ok(steps);
            }
        }
    }

    fn step(&mut self) -> Result<Step, XPathError> {
        let abbreviated = |axis| Step {
            axis,
            node_test: NodeTest::Node,
            predicates: Vec::new(),
        };
        if self.eat(&Token::Dot) {
            return Ok(abbreviated(Axis::Self_));
        }
        if self.eat(&Token::DotDot) {
            return Ok(abbreviated(Axis::Parent));
        }

        let axis = if self.eat(&Token::At) {
            Axis::Attribute
        } else if let Some(Token::AxisName(name)) = self.peek() {
            let axis: Axis = name
                .parse()
                .map_err(|()| self.error(format!("unknown axis '{name}'")))?;
            self.pos += 1;
            self.expect(&Token::ColonColon)?;
            axis
        } else {
            Axis::Child
        };

        let node_test = self.node_test()?;
        let predicates = self.predicates()?;
        Ok(Step {
            axis,
            node_test,
            predicates,
        })
    }

    fn node_test(&mut self) -> Result<NodeTest, XPathError> {
        match self.next() {
            Some(Token::Name(name)) if name == "*" => Ok(NodeTest::Wildcard),
            Some(Token::Name(name)) => {
                let (prefix, local) = split_qname(&name);
                Ok(NodeTest::Name {
                    prefix: prefix.map(str::to_string),
                    local: local.to_string(),
                })
            }
            Some(Token::PrefixWildcard(prefix)) => Ok(NodeTest::PrefixWildcard(prefix)),
            Some(Token::NodeType(kind)) => {
                self.expect(&Token::LeftParen)?;
                let test = match kind.as_str() {
                    "node" => NodeTest::Node,
                    "text" => NodeTest::Text,
                    "comment" => NodeTest::Comment,
                    _ => match self.peek() {
                        Some(Token::Literal(target)) => {
                            let target = target.clone();
                            self.pos += 1;
                            NodeTest::ProcessingInstruction(Some(target))
                        }
                        _ => NodeTest::ProcessingInstruction(None),
                    },
                };
                self.expect(&Token::RightParen)?;
                Ok(test)
            }
            other => {
                if other.is_some() {
                    self.pos -= 1;
                }
                Err(self.error(format!("expected a node test, found {}", self.describe())))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn name(prefix: Option<&str>, local: &str) -> NodeTest {
        NodeTest::Name {
            prefix: prefix.map(str::to_string),
            local: local.to_string(),
        }
    }

    fn root_steps(input: &str) -> Vec<Step> {
        match parse(input).unwrap() {
            Expr::RootPath { steps } => steps,
            other => panic!("expected RootPath, got {other:?}"),
        }
    }

    #[test]
    fn test_absolute_path_with_predicate() {
        let steps = root_steps("/root/h:table/h:tr/h:td[1]");
        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0].node_test, name(None, "root"));
        assert_eq!(steps[3].node_test, name(Some("h"), "td"));
        assert_eq!(steps[3].predicates, vec![Expr::Number(1.0)]);
    }

    #[test]
    fn test_root_only() {
        assert!(root_steps("/").is_empty());
    }

    #[test]
    fn test_double_slash_expands() {
        let steps = root_steps("//a//b");
        let axes: Vec<Axis> = steps.iter().map(|s| s.axis).collect();
        assert_eq!(
            axes,
            [
                Axis::DescendantOrSelf,
                Axis::Child,
                Axis::DescendantOrSelf,
                Axis::Child
            ]
        );
    }

    #[test]
    fn test_abbreviations() {
        let Expr::Path { steps } = parse("../@h:width").unwrap() else {
            panic!("expected relative path");
        };
        assert_eq!(steps[0].axis, Axis::Parent);
        assert_eq!(steps[1].axis, Axis::Attribute);
        assert_eq!(steps[1].node_test, name(Some("h"), "width"));
    }

    #[test]
    fn test_explicit_axes_and_node_types() {
        let steps = root_steps("/descendant::svg:*/following-sibling::processing-instruction('x')");
        assert_eq!(steps[0].axis, Axis::Descendant);
        assert_eq!(steps[0].node_test, NodeTest::PrefixWildcard("svg".into()));
        assert_eq!(steps[1].axis, Axis::FollowingSibling);
        assert_eq!(
            steps[1].node_test,
            NodeTest::ProcessingInstruction(Some("x".into()))
        );
    }

    #[test]
    fn test_precedence() {
        let expr = parse("1 + 2 * 3 = 7 or false()").unwrap();
        let Expr::BinaryOp { op: BinaryOp::Or, left, .. } = expr else {
            panic!("or should bind loosest");
        };
        let Expr::BinaryOp { op: BinaryOp::Eq, left, .. } = *left else {
            panic!("= below or");
        };
        let Expr::BinaryOp { op: BinaryOp::Add, right, .. } = *left else {
            panic!("+ below =");
        };
        assert!(matches!(*right, Expr::BinaryOp { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_left_associative() {
        let Expr::BinaryOp { op, left, right } = parse("8 - 4 - 2").unwrap() else {
            panic!("expected binary op");
        };
        assert_eq!(op, BinaryOp::Sub);
        assert!(matches!(*left, Expr::BinaryOp { op: BinaryOp::Sub, .. }));
        assert_eq!(*right, Expr::Number(2.0));
    }

    #[test]
    fn test_unary_and_union() {
        assert!(matches!(parse("-count(//a)").unwrap(), Expr::UnaryNeg(_)));
        assert!(matches!(parse("//a | //b").unwrap(), Expr::Union(..)));
    }

    #[test]
    fn test_filter_with_path() {
        let Expr::Filter {
            predicates, steps, ..
        } = parse("(//a)[2]/b").unwrap()
        else {
            panic!("expected filter");
        };
        assert_eq!(predicates.len(), 1);
        assert_eq!(steps.len(), 1);
    }

    #[test]
    fn test_function_call_args() {
        let Expr::FunctionCall { name, args } = parse("concat('a', \"b\", 1)").unwrap() else {
            panic!("expected function call");
        };
        assert_eq!(name, "concat");
        assert_eq!(args.len(), 3);
    }

    #[test]
    fn test_syntax_errors() {
        for bad in ["", "/root/", "/root/a[", "a b", "f(", "1 +", "@", "foo::bar"] {
            assert!(
                matches!(parse(bad), Err(XPathError::Syntax { .. })),
                "{bad:?} should fail"
            );
        }
    }

    #[test]
    fn test_error_position_at_end() {
        let Err(XPathError::Syntax { position, .. }) = parse("/root/") else {
            panic!("expected syntax error");
        };
        assert_eq!(position, 6);
    }
}
