//! 计算器工具：四则运算表达式与常用单位换算
//!
//! 输入含 " to " 时按单位换算处理（如 `5 km to miles`），否则作为算术表达式求值。
//! 表达式支持 + - * / % ^、括号、一元正负号与小数；^ 为右结合。

use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::json;

use crate::tools::{Tool, ToolOutcome};

/// 支持的单位换算（源单位, 目标单位）
const CONVERSIONS: &[(&str, &str)] = &[
    ("km", "miles"),
    ("miles", "km"),
    ("celsius", "fahrenheit"),
    ("fahrenheit", "celsius"),
    ("kg", "pounds"),
    ("pounds", "kg"),
];

fn convert_units(from: &str, to: &str, value: f64) -> Option<f64> {
    let result = match (from, to) {
        ("km", "miles") => value * 0.621371,
        ("miles", "km") => value / 0.621371,
        ("celsius", "fahrenheit") => value * 9.0 / 5.0 + 32.0,
        ("fahrenheit", "celsius") => (value - 32.0) * 5.0 / 9.0,
        ("kg", "pounds") => value * 2.20462,
        ("pounds", "kg") => value / 2.20462,
        _ => return None,
    };
    Some(result)
}

fn conversion_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([+-]?(?:\d+(?:\.\d*)?|\.\d+))\s*([^\s]*)\s*$").expect("valid regex")
    })
}

fn expression_charset() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9+\-*/%().\s^to°]+$").expect("valid regex"))
}

fn conversion_input() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^\s*[+-]?(?:\d+(?:\.\d*)?|\.\d+)\s*[a-z]+\s+to\s+[a-z]+\s*$").expect("valid regex")
    })
}

/// 计算器
#[derive(Debug, Default)]
pub struct CalculatorTool;

impl CalculatorTool {
    fn convert(&self, input: &str) -> ToolOutcome {
        let (value_part, target) = match input.split_once(" to ") {
            Some(parts) => parts,
            None => return ToolOutcome::failure("Invalid value for conversion"),
        };
        let Some(caps) = conversion_pattern().captures(value_part) else {
            return ToolOutcome::failure_with_suggestion(
                "Invalid value for conversion",
                "Use the form '<number> <unit> to <unit>'",
            );
        };
        let Ok(value) = caps[1].parse::<f64>() else {
            return ToolOutcome::failure("Invalid value for conversion");
        };
        let from = caps[2].to_lowercase();
        let to = target.trim().to_lowercase();

        let Some(converted) = convert_units(&from, &to, value) else {
            let supported: Vec<String> = CONVERSIONS
                .iter()
                .map(|(f, t)| format!("{} to {}", f, t))
                .collect();
            return ToolOutcome::failure_with_suggestion(
                format!("Unsupported conversion: {} to {}", from, to),
                format!("Supported conversions: {}", supported.join(", ")),
            );
        };

        let result = (converted * 10_000.0).round() / 10_000.0;
        ToolOutcome::Success(json!({
            "input": input,
            "result": result,
            "type": "unit_conversion",
        }))
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Advanced calculator for mathematical operations and unit conversions"
    }

    fn validate_input(&self, input: &str) -> bool {
        expression_charset().is_match(input) || conversion_input().is_match(input)
    }

    async fn execute(&self, input: &str, _session_id: &str) -> Result<ToolOutcome, String> {
        if input.contains(" to ") {
            return Ok(self.convert(input));
        }

        match evaluate(input) {
            Ok(result) => Ok(ToolOutcome::Success(json!({
                "input": input,
                "result": result,
                "type": "calculation",
            }))),
            Err(e) => {
                tracing::debug!("Calculator error: {}", e);
                Ok(ToolOutcome::failure_with_suggestion(
                    "Invalid mathematical expression",
                    "Please check your input format",
                ))
            }
        }
    }
}

/// 对算术表达式求值
pub fn evaluate(expr: &str) -> Result<f64, String> {
    let tokens = tokenize(expr)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expression()?;
    if parser.pos != parser.tokens.len() {
        return Err(format!("Unexpected token at position {}", parser.pos));
    }
    if !value.is_finite() {
        return Err("Result is not a finite number".to_string());
    }
    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Op(char),
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = expr.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n = text
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid number: {}", text))?;
                tokens.push(Token::Num(n));
            }
            '+' | '-' | '*' | '/' | '%' | '^' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            other => return Err(format!("Unexpected character: {}", other)),
        }
    }
    if tokens.is_empty() {
        return Err("Empty expression".to_string());
    }
    Ok(tokens)
}

/// 递归下降：expression := term (('+'|'-') term)*
///            term := unary (('*'|'/'|'%') unary)*
///            unary := ('+'|'-') unary | power
///            power := primary ('^' unary)?
///
/// 括号、一元运算符与 `^` 的嵌套层数不超过 MAX_DEPTH。
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

const MAX_DEPTH: usize = 256;

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.peek();
        self.pos += 1;
        t
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self) -> Result<f64, String>) -> Result<f64, String> {
        if self.depth >= MAX_DEPTH {
            return Err("Expression nested too deeply".to_string());
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn expression(&mut self) -> Result<f64, String> {
        self.nested(Self::sum)
    }

    fn sum(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, String> {
        let mut value = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/' | '%'))) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                '*' => value * rhs,
                '/' => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    fn unary(&mut self) -> Result<f64, String> {
        self.nested(Self::signed)
    }

    fn signed(&mut self) -> Result<f64, String> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<f64, String> {
        let base = self.primary()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64, String> {
        match self.bump() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expression()?;
                match self.bump() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err("Missing closing parenthesis".to_string()),
                }
            }
            Some(other) => Err(format!("Unexpected token: {:?}", other)),
            None => Err("Unexpected end of expression".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn run(input: &str) -> serde_json::Value {
        CalculatorTool.execute(input, "s").await.unwrap().to_value()
    }

    #[test]
    fn test_evaluate_precedence() {
        assert_eq!(evaluate("2 + 3 * 4").unwrap(), 14.0);
        assert_eq!(evaluate("(2 + 3) * 4").unwrap(), 20.0);
        assert_eq!(evaluate("2 ^ 3 ^ 2").unwrap(), 512.0);
        assert_eq!(evaluate("-2 ^ 2").unwrap(), -4.0);
        assert_eq!(evaluate("10 % 4").unwrap(), 2.0);
        assert_eq!(evaluate("1.5 * 2").unwrap(), 3.0);
    }

    #[test]
    fn test_evaluate_errors() {
        assert!(evaluate("2 +").is_err());
        assert!(evaluate("").is_err());
        assert!(evaluate("(1 + 2").is_err());
        assert!(evaluate("1 / 0").is_err());
        assert!(evaluate("abc").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let parens = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        assert_eq!(evaluate(&parens), Err("Expression nested too deeply".to_string()));

        let negations = format!("{}1", "-".repeat(100_000));
        assert_eq!(evaluate(&negations), Err("Expression nested too deeply".to_string()));

        let powers = format!("2{}", "^2".repeat(100_000));
        assert!(evaluate(&powers).is_err());

        let moderate = format!("{}7{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(evaluate(&moderate).unwrap(), 7.0);
    }

    #[tokio::test]
    async fn test_deep_nesting_is_soft_failure() {
        let input = format!("{}1{}", "(".repeat(100_000), ")".repeat(100_000));
        let out = run(&input).await;
        assert_eq!(out["success"], false);
        assert_eq!(out["error"], "Invalid mathematical expression");
    }

    #[tokio::test]
    async fn test_km_to_miles() {
        let out = run("5 km to miles").await;
        assert_eq!(out["success"], true);
        assert_eq!(out["type"], "unit_conversion");
        let result = out["result"].as_f64().unwrap();
        assert!((result - 3.1069).abs() < 0.0001);
    }

    #[tokio::test]
    async fn test_celsius_to_fahrenheit() {
        let out = run("100 celsius to fahrenheit").await;
        assert_eq!(out["result"].as_f64().unwrap(), 212.0);
    }

    #[tokio::test]
    async fn test_invalid_expression_is_soft_failure() {
        let out = run("2 +").await;
        assert_eq!(out["success"], false);
        assert_eq!(out["error"], "Invalid mathematical expression");
        assert_eq!(out["suggestion"], "Please check your input format");
    }

    #[tokio::test]
    async fn test_calculation() {
        let out = run("2 + 2").await;
        assert_eq!(out["success"], true);
        assert_eq!(out["type"], "calculation");
        assert_eq!(out["result"].as_f64().unwrap(), 4.0);
    }

    #[tokio::test]
    async fn test_unsupported_conversion() {
        let out = run("5 km to parsecs").await;
        assert_eq!(out["success"], false);
        assert!(out["error"].as_str().unwrap().contains("Unsupported conversion"));
    }

    #[test]
    fn test_validate_input() {
        let calc = CalculatorTool;
        assert!(calc.validate_input("2 * (3 + 4)"));
        assert!(calc.validate_input("5 km to miles"));
        assert!(!calc.validate_input("rm -rf /"));
    }
}
