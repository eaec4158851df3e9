// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Expression evaluation seam
//!
//! Condition and behaviour expressions (`${...}`) are evaluated through the
//! `ExpressionEvaluator` trait so hosts can plug their own language. The
//! default implementation compiles the inner expression with minijinja
//! against `{variables, content}`.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expression {expression:?}: {message}")]
pub struct ExpressionError {
    pub expression: String,
    pub message: String,
}

/// Evaluates one expression against a JSON scope
pub trait ExpressionEvaluator: Send + Sync {
    fn evaluate(&self, expression: &str, scope: &Value) -> Result<Value, ExpressionError>;
}

/// True if the string is an `${...}` expression rather than a literal
pub fn is_expression(source: &str) -> bool {
    source.starts_with("${") && source.ends_with('}')
}

/// Default evaluator backed by minijinja expressions
#[derive(Clone, Copy, Default)]
pub struct MinijinjaEvaluator;

impl ExpressionEvaluator for MinijinjaEvaluator {
    fn evaluate(&self, expression: &str, scope: &Value) -> Result<Value, ExpressionError> {
        let Some(rest) = expression.strip_prefix("${") else {
            // Not an expression; literals resolve to themselves.
            return Ok(Value::String(expression.to_string()));
        };
        let Some(inner) = rest.strip_suffix('}') else {
            return Err(ExpressionError {
                expression: expression.to_string(),
                message: "unterminated expression".to_string(),
            });
        };

        let mut env = minijinja::Environment::new();
        env.add_function("now", || chrono::Utc::now().to_rfc3339());
        let compiled = env
            .compile_expression(inner)
            .map_err(|e| ExpressionError {
                expression: expression.to_string(),
                message: e.to_string(),
            })?;
        let result = compiled
            .eval(minijinja::Value::from_serialize(scope))
            .map_err(|e| ExpressionError {
                expression: expression.to_string(),
                message: e.to_string(),
            })?;

        serde_json::to_value(SerializeWrap(&result)).map_err(|e| ExpressionError {
            expression: expression.to_string(),
            message: e.to_string(),
        })
    }
}

// minijinja values serialize straight back into JSON
struct SerializeWrap<'a>(&'a minijinja::Value);

impl Serialize for SerializeWrap<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

/// Condition truthiness over JSON values
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty() && s != "false",
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
#[path = "expression_tests.rs"]
mod tests;
