//! folio-mip
//!
//! Mixed-integer programming toolkit used by the portfolio optimizer:
//!
//! - Sparse linear expressions with scalar arithmetic and `<=` / `>=` / `==`
//!   constraint builders.
//! - A [`Model`] holding variable and constraint arenas with O(1)
//!   checkpoint/rollback, reified absolute values, and a piecewise-linear
//!   approximation of `x^2` anchored on [`RefPoints`].
//! - A branch-and-bound driver over LP relaxations, kept behind the
//!   [`SolveBackend`] trait so alternative solvers can plug in without
//!   touching callers.
//!
//! Everything is synchronous and single-threaded; a model is meant to live
//! for one optimization run.

mod expr;
mod model;
mod refpoints;
mod solver;

pub use expr::{Constraint, Expr, Relation};
pub use model::{Checkpoint, Model, Solution};
pub use refpoints::RefPoints;
pub use solver::{BranchAndBound, MipProblem, SolveBackend, VarInfo, VarKind};
