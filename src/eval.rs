//! Expression Gateway
//!
//! The engine only talks to expressions through [`ExpressionGateway`]. The
//! bundled [`Evaluator`] parses with Oxc and folds the subset of JavaScript
//! expressions templates use against a [`Data`] context.

use lazy_static::lazy_static;
use oxc_allocator::Allocator;
use oxc_ast::ast::{Expression, TemplateLiteral};
use oxc_parser::Parser;
use oxc_span::SourceType;
use oxc_syntax::operator::{BinaryOperator, LogicalOperator, UnaryOperator};
use regex::Regex;
use serde_json::{Number, Value};

use crate::error::ExprError;
use crate::scope::Data;

lazy_static! {
    /// `{{ expr }}` interpolation span.
    pub static ref STMT_RE: Regex = Regex::new(r"\{\{([\s\S]*?)\}\}").unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// GATEWAY CONTRACT
// ═══════════════════════════════════════════════════════════════════════════════

/// Result of interpolating every `{{ }}` span of a string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Replaced {
    pub text: String,
    pub had_expression: bool,
    /// `(expression, error)` for spans that were left unresolved.
    pub errors: Vec<(String, ExprError)>,
}

pub trait ExpressionGateway {
    fn exec(&self, expr: &str, data: &Data) -> Result<Value, ExprError>;

    /// Interpolate all spans. A failing span stays in the text verbatim.
    fn replace(&self, text: &str, data: &Data) -> Replaced {
        let mut out = Replaced {
            text: String::with_capacity(text.len()),
            ..Replaced::default()
        };
        let mut last_end = 0;

        for caps in STMT_RE.captures_iter(text) {
            let Some(span) = caps.get(0) else { continue };
            let expr = caps.get(1).map_or("", |m| m.as_str()).trim();
            out.had_expression = true;
            out.text.push_str(&text[last_end..span.start()]);

            match self.exec(expr, data) {
                Ok(value) => out.text.push_str(&stringify(&value)),
                Err(error) => {
                    out.text.push_str(span.as_str());
                    out.errors.push((expr.to_string(), error));
                }
            }
            last_end = span.end();
        }

        out.text.push_str(&text[last_end..]);
        out
    }

    fn assign(&self, data: &mut Data, name: &str, value: Value) {
        data.set(name, value);
    }
}

pub fn has_statement(text: &str) -> bool {
    STMT_RE.is_match(text)
}

/// Strip a `{{ }}` wrapper when it spans the whole input.
pub fn unwrap_statement(expr: &str) -> &str {
    let trimmed = expr.trim();
    if let Some(caps) = STMT_RE.captures(trimmed) {
        if let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) {
            if whole.start() == 0 && whole.end() == trimmed.len() {
                return inner.as_str().trim();
            }
        }
    }
    trimmed
}

/// Text form of a value as it lands in markup.
pub fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => format_number(n),
        other => other.to_string(),
    }
}

fn format_number(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        _ => n.to_string(),
    }
}

/// Branch selection is strict: only boolean `true` counts.
pub fn is_true(value: &Value) -> bool {
    matches!(value, Value::Bool(true))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING
// ═══════════════════════════════════════════════════════════════════════════════

/// Bracket nesting and AST depth allowed before an expression is rejected.
const MAX_DEPTH: usize = 64;

/// Longest expression source accepted.
const MAX_SOURCE_LEN: usize = 4096;

fn too_complex(message: &str) -> ExprError {
    ExprError::Syntax {
        message: message.to_string(),
    }
}

/// Deepest `(`/`[`/`{` nesting outside string literals.
fn nesting_depth(src: &str) -> usize {
    let mut depth = 0usize;
    let mut max = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in src.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '(' | '[' | '{' => {
                depth += 1;
                max = max.max(depth);
            }
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    max
}

fn check_source(src: &str) -> Result<(), ExprError> {
    if src.is_empty() {
        return Err(ExprError::UnexpectedEnd);
    }
    if src.len() > MAX_SOURCE_LEN {
        return Err(too_complex("expression too long"));
    }
    if nesting_depth(src) > MAX_DEPTH {
        return Err(too_complex("expression nested too deeply"));
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVALUATION
// ═══════════════════════════════════════════════════════════════════════════════

fn number(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < 9.0e15 {
        Value::from(f as i64)
    } else {
        Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn type_error(message: String) -> ExprError {
    ExprError::Type { message }
}

fn unsupported(what: &str) -> ExprError {
    type_error(format!("unsupported {}", what))
}

fn as_numbers(op: &str, left: &Value, right: &Value) -> Result<(f64, f64), ExprError> {
    match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => Ok((l, r)),
        _ => Err(type_error(format!(
            "invalid operation: {} {} {}",
            type_name(left),
            op,
            type_name(right)
        ))),
    }
}

fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => l == r,
        _ => left == right,
    }
}

fn strict_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(_), Value::Number(_)) => loose_eq(left, right),
        _ => left == right,
    }
}

fn index(target: &Value, key: &Value) -> Value {
    match (target, key) {
        (Value::Object(map), Value::String(k)) => map.get(k).cloned().unwrap_or(Value::Null),
        (Value::Array(items), Value::String(k)) if k == "length" => Value::from(items.len()),
        (Value::String(s), Value::String(k)) if k == "length" => Value::from(s.chars().count()),
        (Value::Array(items), Value::Number(n)) => n
            .as_u64()
            .and_then(|i| items.get(i as usize))
            .cloned()
            .unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn eval(expr: &Expression<'_>, data: &Data, depth: usize) -> Result<Value, ExprError> {
    if depth > MAX_DEPTH {
        return Err(too_complex("expression nested too deeply"));
    }
    let depth = depth + 1;

    match expr {
        Expression::NullLiteral(_) => Ok(Value::Null),
        Expression::BooleanLiteral(lit) => Ok(Value::Bool(lit.value)),
        Expression::NumericLiteral(lit) => Ok(number(lit.value)),
        Expression::StringLiteral(lit) => Ok(Value::String(lit.value.to_string())),
        Expression::TemplateLiteral(tpl) => template(tpl, data, depth),
        Expression::Identifier(ident) => {
            let name = ident.name.to_string();
            if name == "undefined" {
                return Ok(Value::Null);
            }
            Ok(data.get(&name).cloned().unwrap_or(Value::Null))
        }
        Expression::StaticMemberExpression(member) => {
            let target = eval(&member.object, data, depth)?;
            Ok(index(&target, &Value::String(member.property.name.to_string())))
        }
        Expression::ComputedMemberExpression(member) => {
            let target = eval(&member.object, data, depth)?;
            let key = eval(&member.expression, data, depth)?;
            Ok(index(&target, &key))
        }
        Expression::ParenthesizedExpression(paren) => eval(&paren.expression, data, depth),
        Expression::UnaryExpression(unary) => {
            let operand = eval(&unary.argument, data, depth)?;
            unary_op(unary.operator, operand)
        }
        Expression::ConditionalExpression(cond) => {
            if truthy(&eval(&cond.test, data, depth)?) {
                eval(&cond.consequent, data, depth)
            } else {
                eval(&cond.alternate, data, depth)
            }
        }
        Expression::LogicalExpression(logical) => {
            let left = eval(&logical.left, data, depth)?;
            let short_circuit = match logical.operator {
                LogicalOperator::And => !truthy(&left),
                LogicalOperator::Or => truthy(&left),
                LogicalOperator::Coalesce => !left.is_null(),
            };
            if short_circuit {
                Ok(left)
            } else {
                eval(&logical.right, data, depth)
            }
        }
        Expression::BinaryExpression(bin) => {
            let left = eval(&bin.left, data, depth)?;
            let right = eval(&bin.right, data, depth)?;
            binary(bin.operator, &left, &right)
        }
        _ => Err(unsupported("expression")),
    }
}

fn template(tpl: &TemplateLiteral<'_>, data: &Data, depth: usize) -> Result<Value, ExprError> {
    let mut out = String::new();
    for (i, quasi) in tpl.quasis.iter().enumerate() {
        let text = quasi.value.cooked.as_ref().unwrap_or(&quasi.value.raw);
        out.push_str(text.as_str());
        if let Some(expr) = tpl.expressions.get(i) {
            out.push_str(&stringify(&eval(expr, data, depth)?));
        }
    }
    Ok(Value::String(out))
}

fn unary_op(op: UnaryOperator, operand: Value) -> Result<Value, ExprError> {
    match op {
        UnaryOperator::LogicalNot => Ok(Value::Bool(!truthy(&operand))),
        UnaryOperator::UnaryNegation | UnaryOperator::UnaryPlus => {
            let f = operand
                .as_f64()
                .ok_or_else(|| type_error(format!("cannot apply {} to {}", op.as_str(), type_name(&operand))))?;
            Ok(number(if op == UnaryOperator::UnaryNegation { -f } else { f }))
        }
        UnaryOperator::Typeof => Ok(Value::String(
            match operand {
                Value::Null => "undefined",
                Value::Bool(_) => "boolean",
                Value::Number(_) => "number",
                Value::String(_) => "string",
                Value::Array(_) | Value::Object(_) => "object",
            }
            .to_string(),
        )),
        other => Err(unsupported(&format!("operator {}", other.as_str()))),
    }
}

fn binary(op: BinaryOperator, left: &Value, right: &Value) -> Result<Value, ExprError> {
    let symbol = op.as_str();
    match op {
        BinaryOperator::Equality => Ok(Value::Bool(loose_eq(left, right))),
        BinaryOperator::Inequality => Ok(Value::Bool(!loose_eq(left, right))),
        BinaryOperator::StrictEquality => Ok(Value::Bool(strict_eq(left, right))),
        BinaryOperator::StrictInequality => Ok(Value::Bool(!strict_eq(left, right))),
        BinaryOperator::Addition if left.is_string() || right.is_string() => {
            Ok(Value::String(format!("{}{}", stringify(left), stringify(right))))
        }
        BinaryOperator::Addition
        | BinaryOperator::Subtraction
        | BinaryOperator::Multiplication
        | BinaryOperator::Exponential => {
            let (l, r) = as_numbers(symbol, left, right)?;
            Ok(number(match op {
                BinaryOperator::Addition => l + r,
                BinaryOperator::Subtraction => l - r,
                BinaryOperator::Multiplication => l * r,
                _ => l.powf(r),
            }))
        }
        BinaryOperator::Division | BinaryOperator::Remainder => {
            let (l, r) = as_numbers(symbol, left, right)?;
            if r == 0.0 {
                return Err(type_error("division by zero".to_string()));
            }
            Ok(number(if op == BinaryOperator::Division { l / r } else { l % r }))
        }
        BinaryOperator::LessThan
        | BinaryOperator::LessEqualThan
        | BinaryOperator::GreaterThan
        | BinaryOperator::GreaterEqualThan => {
            let ordering = match (left, right) {
                (Value::String(l), Value::String(r)) => l.cmp(r),
                _ => {
                    let (l, r) = as_numbers(symbol, left, right)?;
                    l.partial_cmp(&r)
                        .ok_or_else(|| type_error("cannot compare NaN".to_string()))?
                }
            };
            Ok(Value::Bool(match op {
                BinaryOperator::LessThan => ordering.is_lt(),
                BinaryOperator::LessEqualThan => ordering.is_le(),
                BinaryOperator::GreaterThan => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        _ => Err(unsupported(&format!("operator {}", symbol))),
    }
}

/// Bundled expression gateway.
#[derive(Debug, Clone, Copy, Default)]
pub struct Evaluator;

impl ExpressionGateway for Evaluator {
    fn exec(&self, expr: &str, data: &Data) -> Result<Value, ExprError> {
        let source = unwrap_statement(expr);
        check_source(source)?;

        let allocator = Allocator::default();
        let source_type = SourceType::default().with_module(true);
        let parsed = Parser::new(&allocator, source, source_type)
            .parse_expression()
            .map_err(|errors| ExprError::Syntax {
                message: errors
                    .first()
                    .map_or_else(|| "invalid expression".to_string(), |e| e.to_string()),
            })?;

        eval(&parsed, data, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data() -> Data {
        Data::from_value(json!({
            "score": 80,
            "user": { "name": "Ann", "tags": ["a", "b"] },
            "items": ["x", "y", "z"],
            "flag": true
        }))
        .unwrap()
    }

    #[test]
    fn test_paths_and_literals() {
        let d = data();
        assert_eq!(Evaluator.exec("user.name", &d), Ok(json!("Ann")));
        assert_eq!(Evaluator.exec("user.tags[1]", &d), Ok(json!("b")));
        assert_eq!(Evaluator.exec("user['name']", &d), Ok(json!("Ann")));
        assert_eq!(Evaluator.exec("items.length", &d), Ok(json!(3)));
        assert_eq!(Evaluator.exec("missing.deep", &d), Ok(Value::Null));
        assert_eq!(Evaluator.exec("undefined", &d), Ok(Value::Null));
        assert_eq!(Evaluator.exec("'it\\'s'", &d), Ok(json!("it's")));
        assert_eq!(Evaluator.exec("`Hi ${user.name}!`", &d), Ok(json!("Hi Ann!")));
    }

    #[test]
    fn test_operators() {
        let d = data();
        assert_eq!(Evaluator.exec("score > 50", &d), Ok(json!(true)));
        assert_eq!(Evaluator.exec("score > 50 && !flag", &d), Ok(json!(false)));
        assert_eq!(Evaluator.exec("(score + 20) / 4", &d), Ok(json!(25)));
        assert_eq!(Evaluator.exec("score === 80", &d), Ok(json!(true)));
        assert_eq!(Evaluator.exec("score === '80'", &d), Ok(json!(false)));
        assert_eq!(Evaluator.exec("'Hi ' + user.name", &d), Ok(json!("Hi Ann")));
        assert_eq!(Evaluator.exec("score >= 90 ? 'A' : 'B'", &d), Ok(json!("B")));
        assert_eq!(Evaluator.exec("-score + 1", &d), Ok(json!(-79)));
        assert_eq!(Evaluator.exec("missing ?? 'none'", &d), Ok(json!("none")));
        assert_eq!(Evaluator.exec("typeof user", &d), Ok(json!("object")));
    }

    #[test]
    fn test_wrapped_statement() {
        assert_eq!(Evaluator.exec("{{ score }}", &data()), Ok(json!(80)));
        assert_eq!(unwrap_statement("{{ a }} b"), "{{ a }} b");
    }

    #[test]
    fn test_errors() {
        let d = data();
        assert!(matches!(Evaluator.exec("score >", &d), Err(ExprError::Syntax { .. })));
        assert!(matches!(Evaluator.exec("score 1", &d), Err(ExprError::Syntax { .. })));
        assert!(matches!(Evaluator.exec("user * 2", &d), Err(ExprError::Type { .. })));
        assert!(matches!(Evaluator.exec("1 / 0", &d), Err(ExprError::Type { .. })));
        assert!(matches!(Evaluator.exec("items.map(f)", &d), Err(ExprError::Type { .. })));
        assert!(matches!(Evaluator.exec("", &d), Err(ExprError::UnexpectedEnd)));
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let d = data();
        let parens = format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000));
        assert!(matches!(Evaluator.exec(&parens, &d), Err(ExprError::Syntax { .. })));

        let shallow = format!("{}1{}", "(".repeat(10), ")".repeat(10));
        assert_eq!(Evaluator.exec(&shallow, &d), Ok(json!(1)));

        // brackets inside strings do not count
        let quoted = format!("'{}'", "(".repeat(200));
        assert!(Evaluator.exec(&quoted, &d).is_ok());
    }

    #[test]
    fn test_replace_keeps_failing_span() {
        let replaced = Evaluator.replace("{{ user.name }} scored {{ score >> }}", &data());
        assert!(replaced.had_expression);
        assert_eq!(replaced.text, "Ann scored {{ score >> }}");
        assert_eq!(replaced.errors.len(), 1);
        assert_eq!(replaced.errors[0].0, "score >>");
    }

    #[test]
    fn test_replace_without_statement() {
        let replaced = Evaluator.replace("plain text", &data());
        assert!(!replaced.had_expression);
        assert_eq!(replaced.text, "plain text");
    }

    #[test]
    fn test_stringify() {
        assert_eq!(stringify(&json!(2.0)), "2");
        assert_eq!(stringify(&json!(2.5)), "2.5");
        assert_eq!(stringify(&Value::Null), "");
        assert_eq!(stringify(&json!(["a"])), "[\"a\"]");
    }
}
