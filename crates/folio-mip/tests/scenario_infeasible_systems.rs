//! Scenario: infeasible systems yield no solution.
//!
//! # Invariants under test
//!
//! 1. Contradictory linear constraints make both `minimize` and `maximize`
//!    return `None`.
//! 2. A system feasible in reals but with no integer point (e.g.
//!    `1.1 <= x <= 1.9` for integer `x`) is reported infeasible, not
//!    rounded.

use folio_mip::Model;

#[test]
fn contradictory_constraints_have_no_solution() {
    let mut model = Model::new();
    let x = model.integer(100.0);
    model.restrict(x.clone().leq(1.0));
    model.restrict(x.clone().geq(2.0));
    assert!(model.maximize(&x).is_none());
}

#[test]
fn bound_below_variable_range_has_no_solution() {
    let mut model = Model::new();
    let x = model.integer(100.0);
    model.restrict(x.clone().leq(-1.0));
    assert!(model.maximize(&x).is_none());
}

#[test]
fn joint_capacity_shortfall_has_no_solution() {
    let mut model = Model::new();
    let x = model.integer(100.0);
    let y = model.integer(100.0);
    model.restrict((x.clone() + y.clone()).geq(10.0));
    model.restrict(x.clone().leq(4.9));
    model.restrict(y.clone().leq(4.9));
    assert!(model.minimize(&(x + y)).is_none());
}

#[test]
fn fractional_window_has_no_integer_solution() {
    let mut model = Model::new();
    let x = model.integer(100.0);
    model.restrict(x.clone().leq(1.9));
    model.restrict(x.clone().geq(1.1));
    assert!(model.maximize(&x).is_none());
    assert!(model.minimize(&x).is_none());
}

#[test]
fn fractional_joint_window_has_no_integer_solution() {
    let mut model = Model::new();
    let x = model.integer(100.0);
    let y = model.integer(100.0);
    model.restrict((x.clone() + y.clone()).geq(10.1));
    model.restrict(x.clone().leq(5.9));
    model.restrict(y.clone().leq(5.9));
    assert!(model.minimize(&(x + y)).is_none());
}
