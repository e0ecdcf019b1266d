//! Branch-and-bound over LP relaxations.
//!
//! The model talks to its solver through the narrow [`SolveBackend`]
//! capability, so a different engine can be plugged in without touching any
//! caller. The default backend relaxes the integer problem with `minilp`
//! and branches on the most fractional integer variable, exploring nodes in
//! best-local-bound order (FIFO among equal bounds keeps runs reproducible).
//! No cutting planes are generated.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use minilp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem};
use tracing::{debug, trace};

use crate::expr::{Constraint, Expr, Relation};

/// Integer feasibility tolerance; relaxation values closer than this to an
/// integer count as integral and are snapped in the final solution.
const INT_TOL: f64 = 1e-6;

/// Objective comparison tolerance for pruning and incumbent updates.
const OBJ_TOL: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarKind {
    Binary,
    Integer,
    Continuous,
}

/// Kind and bounds of one model variable.
#[derive(Clone, Copy, Debug)]
pub struct VarInfo {
    pub kind: VarKind,
    pub min: f64,
    pub max: f64,
}

impl VarInfo {
    fn is_integral(&self) -> bool {
        matches!(self.kind, VarKind::Binary | VarKind::Integer)
    }
}

/// A minimization problem handed to a backend: variables with bounds and
/// kinds, constraints relative to zero, and objective coefficients.
pub struct MipProblem<'a> {
    vars: &'a [VarInfo],
    conds: &'a [Constraint],
    objective: &'a Expr,
}

impl<'a> MipProblem<'a> {
    pub(crate) fn new(vars: &'a [VarInfo], conds: &'a [Constraint], objective: &'a Expr) -> Self {
        MipProblem {
            vars,
            conds,
            objective,
        }
    }

    pub fn vars(&self) -> &[VarInfo] {
        self.vars
    }

    pub fn conds(&self) -> &[Constraint] {
        self.conds
    }

    pub fn objective(&self) -> &Expr {
        self.objective
    }
}

/// The capability a solver must provide: minimize the problem and return
/// the optimal variable values, or `None` on infeasibility, unboundedness
/// or cancellation. `progress` is called at node-selection events with
/// `(active_nodes, progress in [0, 1])`; a false return aborts the search.
pub trait SolveBackend {
    fn solve(
        &self,
        problem: &MipProblem<'_>,
        progress: &mut dyn FnMut(i64, f64) -> bool,
    ) -> Option<Vec<f64>>;
}

/// Default [`SolveBackend`]: branch-and-bound with `minilp` relaxations.
pub struct BranchAndBound;

struct Node {
    bound: f64,
    seq: u64,
    values: Vec<f64>,
    bounds: Vec<(f64, f64)>,
}

// Max-heap ordering inverted so that `pop` yields the smallest bound;
// among equal bounds the earliest node wins.
impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .bound
            .total_cmp(&self.bound)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.bound == other.bound && self.seq == other.seq
    }
}

impl Eq for Node {}

impl BranchAndBound {
    /// Solve one LP relaxation with per-node variable bounds.
    fn relax(
        problem: &MipProblem<'_>,
        objective: &[f64],
        bounds: &[(f64, f64)],
    ) -> Result<(f64, Vec<f64>), minilp::Error> {
        let mut lp = Problem::new(OptimizationDirection::Minimize);

        let vars: Vec<minilp::Variable> = bounds
            .iter()
            .zip(objective)
            .map(|(&(min, max), &k)| lp.add_var(k, (min, max)))
            .collect();

        for cond in problem.conds() {
            let row: LinearExpr = cond.expr().factors().map(|(i, k)| (vars[i], k)).collect();
            let op = match cond.relation() {
                Relation::Eq => ComparisonOp::Eq,
                Relation::Le => ComparisonOp::Le,
                Relation::Ge => ComparisonOp::Ge,
            };
            lp.add_constraint(row, op, -cond.expr().constant());
        }

        let solution = lp.solve()?;
        let values = vars.iter().map(|&v| solution[v]).collect();
        Ok((solution.objective(), values))
    }

    /// Most fractional integral variable of a relaxation, if any.
    fn branch_var(problem: &MipProblem<'_>, values: &[f64]) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, var) in problem.vars().iter().enumerate() {
            if !var.is_integral() {
                continue;
            }
            let fraction = values[i] - values[i].floor();
            let score = fraction.min(1.0 - fraction);
            if score > INT_TOL && best.map_or(true, |(_, s)| score > s) {
                best = Some((i, score));
            }
        }
        best.map(|(i, _)| i)
    }
}

impl SolveBackend for BranchAndBound {
    fn solve(
        &self,
        problem: &MipProblem<'_>,
        progress: &mut dyn FnMut(i64, f64) -> bool,
    ) -> Option<Vec<f64>> {
        let var_count = problem.vars().len();

        let mut objective = vec![0.0; var_count];
        for (i, k) in problem.objective().factors() {
            objective[i] += k;
        }

        let root_bounds: Vec<(f64, f64)> =
            problem.vars().iter().map(|v| (v.min, v.max)).collect();
        let (root_obj, root_values) =
            Self::relax(problem, &objective, &root_bounds).ok()?;

        let mut queue = BinaryHeap::new();
        let mut seq = 0u64;
        queue.push(Node {
            bound: root_obj,
            seq,
            values: root_values,
            bounds: root_bounds,
        });

        let mut incumbent: Option<(f64, Vec<f64>)> = None;
        let mut explored = 0u64;

        while let Some(node) = queue.pop() {
            if let Some((best, _)) = &incumbent {
                // Best-bound order: once the frontier cannot improve on the
                // incumbent, neither can anything behind it.
                if node.bound >= best - OBJ_TOL {
                    break;
                }
            }

            explored += 1;
            let gap = match &incumbent {
                None => 1.0,
                Some((best, _)) => {
                    ((best - node.bound).abs() / (best.abs() + f64::EPSILON)).clamp(0.0, 1.0)
                }
            };
            if !progress(queue.len() as i64 + 1, 1.0 - gap) {
                debug!(explored, "search cancelled");
                return None;
            }

            match Self::branch_var(problem, &node.values) {
                None => {
                    let improves = incumbent
                        .as_ref()
                        .map_or(true, |(best, _)| node.bound < best - OBJ_TOL);
                    if improves {
                        trace!(objective = node.bound, "new incumbent");
                        incumbent = Some((node.bound, node.values));
                    }
                }
                Some(split) => {
                    let at = node.values[split].floor();
                    let (lo, hi) = node.bounds[split];
                    for child_bounds in [(lo, at), (at + 1.0, hi)] {
                        if child_bounds.0 > child_bounds.1 {
                            continue;
                        }
                        let mut bounds = node.bounds.clone();
                        bounds[split] = child_bounds;
                        if let Ok((bound, values)) = Self::relax(problem, &objective, &bounds) {
                            let dominated = incumbent
                                .as_ref()
                                .map_or(false, |(best, _)| bound >= best - OBJ_TOL);
                            if !dominated {
                                seq += 1;
                                queue.push(Node {
                                    bound,
                                    seq,
                                    values,
                                    bounds,
                                });
                            }
                        }
                    }
                }
            }
        }

        debug!(explored, found = incumbent.is_some(), "search finished");

        incumbent.map(|(_, mut values)| {
            for (i, var) in problem.vars().iter().enumerate() {
                if var.is_integral() {
                    values[i] = values[i].round();
                }
            }
            values
        })
    }
}
