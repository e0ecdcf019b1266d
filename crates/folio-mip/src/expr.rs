//! Sparse linear expressions and constraints.
//!
//! An expression is `c + Σ kᵢ·xᵢ` with the factor map keyed by variable
//! index. A model variable is an expression with a single factor of 1, so
//! all arithmetic composes uniformly. Copying an expression is a shallow
//! clone of its factor map; expressions never refer back to the model.

use std::collections::BTreeMap;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// Linear expression `constant + Σ factor·var`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Expr {
    constant: f64,
    factors: BTreeMap<usize, f64>,
}

impl Expr {
    /// The single-variable expression `1·x[index]`.
    pub(crate) fn var(index: usize) -> Self {
        let mut factors = BTreeMap::new();
        factors.insert(index, 1.0);
        Expr {
            constant: 0.0,
            factors,
        }
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    /// Iterate `(variable index, coefficient)` pairs in index order.
    pub fn factors(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.factors.iter().map(|(&i, &k)| (i, k))
    }

    /// Constraint `self <= rhs`.
    pub fn leq(self, rhs: impl Into<Expr>) -> Constraint {
        Constraint {
            expr: self - rhs.into(),
            relation: Relation::Le,
        }
    }

    /// Constraint `self >= rhs`.
    pub fn geq(self, rhs: impl Into<Expr>) -> Constraint {
        Constraint {
            expr: self - rhs.into(),
            relation: Relation::Ge,
        }
    }

    /// Constraint `self == rhs`.
    pub fn equals(self, rhs: impl Into<Expr>) -> Constraint {
        Constraint {
            expr: self - rhs.into(),
            relation: Relation::Eq,
        }
    }
}

impl From<f64> for Expr {
    fn from(constant: f64) -> Self {
        Expr {
            constant,
            factors: BTreeMap::new(),
        }
    }
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        self * -1.0
    }
}

impl AddAssign<Expr> for Expr {
    fn add_assign(&mut self, rhs: Expr) {
        self.constant += rhs.constant;
        for (i, k) in rhs.factors {
            *self.factors.entry(i).or_insert(0.0) += k;
        }
    }
}

impl SubAssign<Expr> for Expr {
    fn sub_assign(&mut self, rhs: Expr) {
        *self += -rhs;
    }
}

impl AddAssign<f64> for Expr {
    fn add_assign(&mut self, rhs: f64) {
        self.constant += rhs;
    }
}

impl SubAssign<f64> for Expr {
    fn sub_assign(&mut self, rhs: f64) {
        self.constant -= rhs;
    }
}

impl MulAssign<f64> for Expr {
    fn mul_assign(&mut self, rhs: f64) {
        self.constant *= rhs;
        for k in self.factors.values_mut() {
            *k *= rhs;
        }
    }
}

impl DivAssign<f64> for Expr {
    fn div_assign(&mut self, rhs: f64) {
        self.constant /= rhs;
        for k in self.factors.values_mut() {
            *k /= rhs;
        }
    }
}

impl Add<Expr> for Expr {
    type Output = Expr;

    fn add(mut self, rhs: Expr) -> Expr {
        self += rhs;
        self
    }
}

impl Sub<Expr> for Expr {
    type Output = Expr;

    fn sub(mut self, rhs: Expr) -> Expr {
        self -= rhs;
        self
    }
}

impl Add<f64> for Expr {
    type Output = Expr;

    fn add(mut self, rhs: f64) -> Expr {
        self += rhs;
        self
    }
}

impl Sub<f64> for Expr {
    type Output = Expr;

    fn sub(mut self, rhs: f64) -> Expr {
        self -= rhs;
        self
    }
}

impl Mul<f64> for Expr {
    type Output = Expr;

    fn mul(mut self, rhs: f64) -> Expr {
        self *= rhs;
        self
    }
}

impl Div<f64> for Expr {
    type Output = Expr;

    fn div(mut self, rhs: f64) -> Expr {
        self /= rhs;
        self
    }
}

impl Add<Expr> for f64 {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        rhs + self
    }
}

impl Sub<Expr> for f64 {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        -rhs + self
    }
}

impl Mul<Expr> for f64 {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        rhs * self
    }
}

/// Relation of a constraint's expression to zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    Eq,
    Le,
    Ge,
}

/// A linear constraint `expr relation 0`. The right-hand side of the
/// originating comparison is folded into the expression's constant.
#[derive(Clone, Debug)]
pub struct Constraint {
    expr: Expr,
    relation: Relation,
}

impl Constraint {
    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }
}
