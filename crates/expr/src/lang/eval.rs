//! Evaluation of parsed expressions, plus the two public entry points used
//! by the workflow engine: [`eval_bool`] (routing/rule conditions) and
//! [`eval_script`] (the decision node's `script` facility).
//!
//! Both entry points are total: a parse or runtime error is logged and
//! turned into `false` / a no-op, per spec §4.B. They never return `Err`.

use serde_json::{Map, Value};

use crate::lang::ast::{BinaryOp, Expr, UnaryOp};
use crate::lang::lexer::tokenize;
use crate::lang::parser::{parse_assignment_target_tokens, parse_tokens, split_assignment};
use crate::ExprError;

/// The binding environment every expression sees: `state` (the full
/// execution state) and `input` (shortcut to `state["input"]`, or an
/// empty object if absent).
pub struct Environment<'a> {
    pub state: &'a Value,
    input: Value,
}

impl<'a> Environment<'a> {
    pub fn new(state: &'a Value) -> Self {
        let input = state
            .get("input")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        Self { state, input }
    }

    fn resolve_root(&self, name: &str) -> Option<Value> {
        match name {
            "state" => Some(self.state.clone()),
            "input" => Some(self.input.clone()),
            _ => None,
        }
    }
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn as_f64(v: &Value) -> Result<f64, ExprError> {
    v.as_f64()
        .ok_or_else(|| ExprError::Eval(format!("expected number, got {v}")))
}

fn eval(expr: &Expr, env: &Environment) -> Result<Value, ExprError> {
    match expr {
        Expr::Null => Ok(Value::Null),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Number(n) => Ok(serde_json::Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null)),
        Expr::Str(s) => Ok(Value::String(s.clone())),
        Expr::Ident(name) => env
            .resolve_root(name)
            .ok_or_else(|| ExprError::Eval(format!("unknown name '{name}'"))),
        Expr::Member(base, field) => {
            let base_val = eval(base, env)?;
            Ok(base_val.get(field).cloned().unwrap_or(Value::Null))
        }
        Expr::Index(base, index) => {
            let base_val = eval(base, env)?;
            let idx_val = eval(index, env)?;
            match (&base_val, &idx_val) {
                (Value::Array(arr), Value::Number(n)) => {
                    let i = n.as_f64().unwrap_or(-1.0);
                    if i >= 0.0 {
                        Ok(arr.get(i as usize).cloned().unwrap_or(Value::Null))
                    } else {
                        Ok(Value::Null)
                    }
                }
                (Value::Object(map), Value::String(key)) => Ok(map.get(key).cloned().unwrap_or(Value::Null)),
                _ => Ok(Value::Null),
            }
        }
        Expr::Unary(op, inner) => {
            let v = eval(inner, env)?;
            match op {
                UnaryOp::Not => Ok(Value::Bool(!truthy(&v))),
                UnaryOp::Neg => Ok(Value::from(-as_f64(&v)?)),
            }
        }
        Expr::Binary(op, lhs, rhs) => eval_binary(*op, lhs, rhs, env),
    }
}

fn eval_binary(op: BinaryOp, lhs: &Expr, rhs: &Expr, env: &Environment) -> Result<Value, ExprError> {
    // Short-circuit boolean combinators before evaluating the right side.
    if op == BinaryOp::And {
        let l = eval(lhs, env)?;
        if !truthy(&l) {
            return Ok(Value::Bool(false));
        }
        return Ok(Value::Bool(truthy(&eval(rhs, env)?)));
    }
    if op == BinaryOp::Or {
        let l = eval(lhs, env)?;
        if truthy(&l) {
            return Ok(Value::Bool(true));
        }
        return Ok(Value::Bool(truthy(&eval(rhs, env)?)));
    }

    let l = eval(lhs, env)?;
    let r = eval(rhs, env)?;

    match op {
        BinaryOp::Eq => Ok(Value::Bool(l == r)),
        BinaryOp::Ne => Ok(Value::Bool(l != r)),
        BinaryOp::Add => {
            if let (Value::String(a), Value::String(b)) = (&l, &r) {
                Ok(Value::String(format!("{a}{b}")))
            } else {
                Ok(Value::from(as_f64(&l)? + as_f64(&r)?))
            }
        }
        BinaryOp::Sub => Ok(Value::from(as_f64(&l)? - as_f64(&r)?)),
        BinaryOp::Mul => Ok(Value::from(as_f64(&l)? * as_f64(&r)?)),
        BinaryOp::Div => {
            let divisor = as_f64(&r)?;
            if divisor == 0.0 {
                return Err(ExprError::Eval("division by zero".into()));
            }
            Ok(Value::from(as_f64(&l)? / divisor))
        }
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (&l, &r) {
                (Value::String(a), Value::String(b)) => a.partial_cmp(b),
                _ => as_f64(&l)?.partial_cmp(&as_f64(&r)?),
            };
            let ordering = ordering.ok_or_else(|| ExprError::Eval("incomparable operands".into()))?;
            let result = match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                BinaryOp::Ge => ordering.is_ge(),
                _ => unreachable!(),
            };
            Ok(Value::Bool(result))
        }
        BinaryOp::In => match &r {
            Value::Array(items) => Ok(Value::Bool(items.contains(&l))),
            Value::String(haystack) => match &l {
                Value::String(needle) => Ok(Value::Bool(haystack.contains(needle.as_str()))),
                _ => Ok(Value::Bool(false)),
            },
            Value::Object(map) => match &l {
                Value::String(key) => Ok(Value::Bool(map.contains_key(key))),
                _ => Ok(Value::Bool(false)),
            },
            _ => Ok(Value::Bool(false)),
        },
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    }
}

/// Evaluate a boolean expression (routing conditions, decision rules).
/// Unknown names, unsupported constructs, and runtime errors are logged
/// and treated as `false` — this function never fails.
pub fn eval_bool(source: &str, state: &Value) -> bool {
    let env = Environment::new(state);
    match crate::lang::parser::parse(source).and_then(|expr| eval(&expr, &env)) {
        Ok(v) => truthy(&v),
        Err(e) => {
            tracing::warn!(expression = source, error = %e, "condition evaluation failed, treating as false");
            false
        }
    }
}

/// Run the decision node's `script` facility: a sequence of `;`/newline
/// separated statements of the form `state['key'] = <expr>` or
/// `state.key = <expr>`. Each statement is applied independently against
/// the state as mutated by the statements before it; a statement that
/// fails to parse or evaluate is logged and skipped, leaving the state
/// exactly as it was before that statement. Never fails the workflow.
pub fn eval_script(source: &str, state: &Value) -> Value {
    let mut working = state.clone();

    for raw_stmt in source.split(&['\n', ';'][..]) {
        let stmt = raw_stmt.trim();
        if stmt.is_empty() {
            continue;
        }
        if let Err(e) = apply_statement(stmt, &mut working) {
            tracing::warn!(statement = stmt, error = %e, "script statement failed, state unchanged for this statement");
        }
    }

    working
}

fn apply_statement(stmt: &str, working: &mut Value) -> Result<(), ExprError> {
    let tokens = tokenize(stmt)?;
    let (lhs_tokens, rhs_tokens) = split_assignment(tokens)?;
    let key = parse_assignment_target_tokens(lhs_tokens)?;
    let rhs_expr = parse_tokens(rhs_tokens)?;

    let env = Environment::new(working);
    let value = eval(&rhs_expr, &env)?;

    let obj = working
        .as_object_mut()
        .ok_or_else(|| ExprError::Eval("state is not an object".into()))?;
    obj.insert(key, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn eval_bool_numeric_comparison() {
        let state = json!({"input": {"n": 5}});
        assert!(eval_bool("input.n > 0", &state));
        assert!(!eval_bool("input.n < 0", &state));
    }

    #[test]
    fn eval_bool_string_equality_and_and_or() {
        let state = json!({"sign": "pos"});
        assert!(eval_bool("state.sign == 'pos'", &state));
        assert!(eval_bool("state.sign == 'pos' and 1 < 2", &state));
        assert!(eval_bool("state.sign == 'neg' or state.sign == 'pos'", &state));
    }

    #[test]
    fn eval_bool_membership_on_object_keys() {
        let state = json!({"A": {"response": {"error": "boom"}}});
        assert!(eval_bool("'error' in state.A.response", &state));
    }

    #[test]
    fn eval_bool_unknown_name_is_false() {
        let state = json!({});
        assert!(!eval_bool("nonsense.path == 1", &state));
    }

    #[test]
    fn eval_bool_python_style_booleans() {
        let state = json!({"flag": true});
        assert!(eval_bool("state.flag == True", &state));
    }

    #[test]
    fn eval_script_assigns_top_level_key() {
        let state = json!({"x": 1});
        let result = eval_script("state['y'] = 2", &state);
        assert_eq!(result["y"], json!(2.0));
        assert_eq!(result["x"], json!(1));
    }

    #[test]
    fn eval_script_sequential_statements_see_each_other() {
        let state = json!({});
        let result = eval_script("state.a = 1; state.b = state.a + 1", &state);
        assert_eq!(result["a"], json!(1.0));
        assert_eq!(result["b"], json!(2.0));
    }

    #[test]
    fn eval_script_bad_statement_is_skipped_not_fatal() {
        let state = json!({"x": 1});
        let result = eval_script("state.a = 1; not valid python at all !!", &state);
        assert_eq!(result["a"], json!(1.0));
        assert_eq!(result["x"], json!(1));
    }
}
