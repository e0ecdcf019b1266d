//! The MIP model: variable and constraint arenas, checkpoint/rollback,
//! absolute-value reification, piecewise-linear square approximation and
//! the min/max entry points.

use tracing::debug;

use crate::expr::{Constraint, Expr};
use crate::refpoints::RefPoints;
use crate::solver::{BranchAndBound, MipProblem, SolveBackend, VarInfo, VarKind};

/// Snapshot of the model's arena sizes, taken with [`Model::checkpoint`].
///
/// Rolling back truncates both arenas to the recorded sizes, which makes
/// "probe a restricted model, then widen again" cheap.
#[derive(Clone, Copy, Debug)]
pub struct Checkpoint {
    vars: usize,
    conds: usize,
}

/// A mixed-integer model scoped to one optimization run.
///
/// The progress hook, when set, is invoked with `(active_nodes, progress)`
/// once before each solve as `(0, 0)`, once after as `(0, 1)`, and at every
/// node-selection event in between; returning false from a node event stops
/// the search and the solve yields `None`.
pub struct Model<'p> {
    vars: Vec<VarInfo>,
    conds: Vec<Constraint>,
    progress: Option<&'p mut dyn FnMut(i64, f64) -> bool>,
    backend: Box<dyn SolveBackend>,
}

impl<'p> Model<'p> {
    /// A fresh model, seeded with one fixed variable and a trivial equality
    /// so that backends which reject empty problems still accept it.
    pub fn new() -> Self {
        let mut model = Model {
            vars: Vec::new(),
            conds: Vec::new(),
            progress: None,
            backend: Box::new(BranchAndBound),
        };
        let zero = model.continuous(0.0, 0.0);
        model.restrict(zero.equals(0.0));
        model
    }

    pub fn on_progress(&mut self, progress: &'p mut dyn FnMut(i64, f64) -> bool) {
        self.progress = Some(progress);
    }

    /// Replace the default branch-and-bound backend.
    pub fn with_backend(&mut self, backend: Box<dyn SolveBackend>) {
        self.backend = backend;
    }

    pub fn var_count(&self) -> usize {
        self.vars.len()
    }

    /// New binary variable as a single-factor expression.
    pub fn binary(&mut self) -> Expr {
        self.create(VarKind::Binary, 0.0, 1.0)
    }

    /// New integer variable in `[0, max]`.
    pub fn integer(&mut self, max: f64) -> Expr {
        self.integer_range(0.0, max)
    }

    /// New integer variable in `[min, max]`; both bounds are truncated
    /// toward zero before use.
    pub fn integer_range(&mut self, min: f64, max: f64) -> Expr {
        assert!(min <= max, "integer bounds out of order: [{min}, {max}]");
        let (min, max) = (min.trunc(), max.trunc());
        assert!(min <= max);
        self.create(VarKind::Integer, min, max)
    }

    fn continuous(&mut self, min: f64, max: f64) -> Expr {
        assert!(min <= max, "continuous bounds out of order: [{min}, {max}]");
        self.create(VarKind::Continuous, min, max)
    }

    fn create(&mut self, kind: VarKind, min: f64, max: f64) -> Expr {
        let index = self.vars.len();
        self.vars.push(VarInfo { kind, min, max });
        Expr::var(index)
    }

    /// Append a constraint.
    pub fn restrict(&mut self, cond: Constraint) {
        self.conds.push(cond);
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            vars: self.vars.len(),
            conds: self.conds.len(),
        }
    }

    /// Truncate the arenas back to `cp`. Panics if the checkpoint records
    /// more entries than the model currently holds (checkpoints are only
    /// valid for the model that produced them).
    pub fn rollback(&mut self, cp: &Checkpoint) {
        assert!(cp.vars <= self.vars.len(), "checkpoint is ahead of the model");
        assert!(cp.conds <= self.conds.len(), "checkpoint is ahead of the model");
        self.vars.truncate(cp.vars);
        self.conds.truncate(cp.conds);
    }

    /// Interval-arithmetic bounds of `expr` under the current variable
    /// bounds.
    pub fn bounds(&self, expr: &Expr) -> (f64, f64) {
        let mut min = expr.constant();
        let mut max = expr.constant();
        for (index, k) in expr.factors() {
            let var = &self.vars[index];
            if k > 0.0 {
                min += var.min * k;
                max += var.max * k;
            } else {
                min += var.max * k;
                max += var.min * k;
            }
        }
        assert!(min <= max);
        (min, max)
    }

    /// An expression equal to `|expr|` under every feasible assignment.
    ///
    /// Sign-definite expressions come back as-is (or negated); the mixed
    /// case splits into `pos + neg = expr` with a selector binary forcing
    /// one side to zero, and returns `pos - neg`.
    pub fn abs(&mut self, expr: &Expr) -> Expr {
        let (min, max) = self.bounds(expr);

        if min >= 0.0 {
            expr.clone()
        } else if max <= 0.0 {
            -expr.clone()
        } else {
            let is_positive = self.binary();
            let pos = self.continuous(0.0, max);
            let neg = self.continuous(min, 0.0);

            self.restrict((pos.clone() + neg.clone()).equals(expr.clone()));
            self.restrict(pos.clone().leq(is_positive.clone() * max));
            self.restrict(neg.clone().geq((1.0 - is_positive) * min));

            pos - neg
        }
    }

    /// A piecewise-linear approximation of `expr²` over the expression's
    /// range, anchored on `points`.
    ///
    /// Each reference point contributes the tangent of `x²` at that point;
    /// tangents meet halfway between neighboring points. One segment is
    /// active at a time (selector binaries summing to 1) and a continuous
    /// offset positions `expr` inside it. The approximation is exact at
    /// every reference point.
    pub fn square_approx(&mut self, expr: &Expr, points: &mut RefPoints) -> Expr {
        let (min, max) = self.bounds(expr);

        if min == max {
            return Expr::from(min * max);
        }

        if points.is_empty() {
            points.insert(0.0_f64.max(min).min(max));
        }

        let anchors: Vec<f64> = points.iter().collect();

        let mut x1 = min;
        let mut y1 = anchors[0] * (2.0 * x1 - anchors[0]);

        let mut parts = Expr::default();
        let mut source = Expr::default();
        let mut result = Expr::default();

        for (i, &p) in anchors.iter().enumerate() {
            let (x2, y2) = match anchors.get(i + 1) {
                Some(&next) => ((p + next) / 2.0, p * next),
                None => (max, p * (2.0 * max - p)),
            };
            assert!(x2 > x1);

            let enable = self.binary();
            parts += enable.clone();

            let x = self.continuous(0.0, x2 - x1);
            self.restrict(x.clone().leq(enable.clone() * (x2 - x1)));

            source += x.clone() + enable.clone() * x1;
            result += x * ((y2 - y1) / (x2 - x1)) + enable * y1;

            x1 = x2;
            y1 = y2;
        }

        self.restrict(parts.equals(1.0));
        self.restrict(expr.clone().equals(source));

        result
    }

    /// Minimize `objective`; `None` on infeasibility, unboundedness or
    /// cancellation.
    pub fn minimize(&mut self, objective: &Expr) -> Option<Solution> {
        self.optimize(objective.clone())
    }

    /// Maximize `objective` by minimizing its negation.
    pub fn maximize(&mut self, objective: &Expr) -> Option<Solution> {
        self.optimize(-objective.clone())
    }

    fn optimize(&mut self, objective: Expr) -> Option<Solution> {
        debug!(
            vars = self.vars.len(),
            conds = self.conds.len(),
            "starting solve"
        );

        let Model {
            vars,
            conds,
            progress,
            backend,
        } = self;

        let mut quiet = |_: i64, _: f64| true;
        let report: &mut dyn FnMut(i64, f64) -> bool = match progress.as_mut() {
            Some(hook) => &mut **hook,
            None => &mut quiet,
        };

        report(0, 0.0);
        let problem = MipProblem::new(vars, conds, &objective);
        let values = backend.solve(&problem, &mut *report);
        report(0, 1.0);

        values.map(Solution::new)
    }
}

impl Default for Model<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Variable values of an optimal solve, indexed by variable id.
#[derive(Clone, Debug)]
pub struct Solution {
    values: Vec<f64>,
}

impl Solution {
    pub fn new(values: Vec<f64>) -> Self {
        Solution { values }
    }

    /// Evaluate an expression against this solution.
    pub fn eval(&self, expr: &Expr) -> f64 {
        let mut result = expr.constant();
        for (index, k) in expr.factors() {
            result += self.values[index] * k;
        }
        result
    }
}
