// SPDX-License-Identifier: MIT

//! Text condition expression evaluator

use super::ast::{BinaryOp, Expr, UnaryOp};
use super::operand::Operand;
use super::values::Values;
use crate::error::EvalError;
use std::cmp::Ordering;

/// Evaluate an expression against a values record
///
/// `&&` and `||` short-circuit and yield one of their operands, so the result
/// is not necessarily a boolean; callers test it with [`Operand::truthy`].
pub fn evaluate(expr: &Expr, values: &Values) -> Result<Operand, EvalError> {
    match expr {
        Expr::Number(n) => Ok(Operand::Number(*n)),
        Expr::Str(s) => Ok(Operand::Str(s.clone())),
        Expr::Field(name) => values
            .get(name)
            .map(Operand::from)
            .ok_or_else(|| EvalError::UnknownField(name.clone())),
        Expr::List(items) => items
            .iter()
            .map(|item| evaluate(item, values))
            .collect::<Result<Vec<_>, _>>()
            .map(Operand::List),
        Expr::Unary { op, operand } => {
            let value = evaluate(operand, values)?;
            Ok(apply_unary(*op, &value))
        }
        Expr::And(left, right) => {
            let l = evaluate(left, values)?;
            if l.truthy() {
                evaluate(right, values)
            } else {
                Ok(l)
            }
        }
        Expr::Or(left, right) => {
            let l = evaluate(left, values)?;
            if l.truthy() {
                Ok(l)
            } else {
                evaluate(right, values)
            }
        }
        Expr::Binary { op, left, right } => {
            let l = evaluate(left, values)?;
            let r = evaluate(right, values)?;
            apply_binary(*op, &l, &r)
        }
    }
}

fn apply_unary(op: UnaryOp, value: &Operand) -> Operand {
    match op {
        UnaryOp::Not => Operand::Bool(!value.truthy()),
        UnaryOp::Neg => Operand::Number(-value.to_number()),
        UnaryOp::Plus => Operand::Number(value.to_number()),
        UnaryOp::BitNot => Operand::Number(f64::from(!value.to_int32())),
    }
}

fn apply_binary(op: BinaryOp, l: &Operand, r: &Operand) -> Result<Operand, EvalError> {
    let result = match op {
        BinaryOp::Eq => Operand::Bool(l.loose_eq(r)),
        BinaryOp::NotEq => Operand::Bool(!l.loose_eq(r)),
        BinaryOp::StrictEq => Operand::Bool(l.strict_eq(r)),
        BinaryOp::StrictNotEq => Operand::Bool(!l.strict_eq(r)),
        BinaryOp::Lt => Operand::Bool(l.compare(r) == Some(Ordering::Less)),
        BinaryOp::Lte => Operand::Bool(matches!(
            l.compare(r),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Gt => Operand::Bool(l.compare(r) == Some(Ordering::Greater)),
        BinaryOp::Gte => Operand::Bool(matches!(
            l.compare(r),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::In => match r {
            Operand::List(items) => Operand::Bool(items.iter().any(|i| i.same_value_zero(l))),
            other => {
                return Err(EvalError::Type(format!(
                    "right-hand side of 'in' must be a list, got '{}'",
                    other.to_text()
                )))
            }
        },
        BinaryOp::Add => l.add(r),
        BinaryOp::Sub => Operand::Number(l.to_number() - r.to_number()),
        BinaryOp::Mul => Operand::Number(l.to_number() * r.to_number()),
        BinaryOp::Div => Operand::Number(l.to_number() / r.to_number()),
        BinaryOp::Rem => Operand::Number(l.to_number() % r.to_number()),
    };
    Ok(result)
}
