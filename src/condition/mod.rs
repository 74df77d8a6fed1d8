// SPDX-License-Identifier: MIT

//! Conditional gating for checklist content
//!
//! Conditions come in two shapes:
//! - text expressions such as `gameMode >= 1 && region in [2, 3]`, compiled
//!   once per distinct source and cached
//! - structured JSON: an array holds when any element holds, an object holds
//!   when every field entry holds, e.g. `{ "region": [">= 2", "== 0"] }`
//!
//! [`Gate`] is the entry point; the remaining items are exposed for callers
//! that want to inspect or drive individual stages.

mod ast;
mod compiler;
mod evaluator;
mod gate;
mod lexer;
mod literal;
mod operand;
mod parser;
mod structured;
mod types;
mod values;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use compiler::{CompiledPredicate, ExpressionCompiler};
pub use evaluator::evaluate;
pub use gate::Gate;
pub use lexer::{tokenize, SpannedToken, Token};
pub use literal::{scan_literals, LiteralSpan};
pub use operand::Operand;
pub use parser::{parse, MAX_DEPTH, MAX_INPUT_BYTES, MAX_NESTING};
pub use structured::{exec_clause, StructuredEvaluator, ANY_WILDCARD};
pub use types::{Condition, FieldClause, FieldMap, OrTerm};
pub use values::Values;
