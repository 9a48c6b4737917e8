//! Residual algebra.
//!
//! Implicit schemes express the equation of one step as an expression over
//! the user's model, e.g. `y_new - y_old - tau * F(y_new)`. The expression is
//! built once, in an append-only [`Graph`] of nodes addressed by [`NodeId`],
//! and re-evaluated at every Newton iteration of every step.
//!
//! Time-step context enters the otherwise pure graph through two kinds of
//! shared cells:
//! - [`Parameter`]: one scalar (the step size, half the step size, ...).
//! - [`Snapshot`]: one vector (the previous state, the previous rhs value, ...).
//!
//! Each cell has a single writer, its stepper, which sets it right before the
//! Newton solve that reads it.

use crate::error::{ensure_dim, OdeError, OdeResult};
use crate::traits::NonlinearFunction;
use nalgebra::DMatrix;
use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Rc;

/// A mutable scalar shared between a stepper and its graph.
#[derive(Clone, Debug, Default)]
pub struct Parameter(Rc<Cell<f64>>);

impl Parameter {
    pub fn new(value: f64) -> Self {
        Self(Rc::new(Cell::new(value)))
    }

    pub fn set(&self, value: f64) {
        self.0.set(value);
    }

    pub fn get(&self) -> f64 {
        self.0.get()
    }
}

/// A mutable fixed-length vector shared between a stepper and its graph.
#[derive(Clone, Debug)]
pub struct Snapshot(Rc<RefCell<Vec<f64>>>);

impl Snapshot {
    pub fn zeros(dim: usize) -> Self {
        Self(Rc::new(RefCell::new(vec![0.0; dim])))
    }

    pub fn from_slice(values: &[f64]) -> Self {
        Self(Rc::new(RefCell::new(values.to_vec())))
    }

    pub fn dim(&self) -> usize {
        self.0.borrow().len()
    }

    /// Overwrites the stored vector. The length is fixed at creation.
    pub fn set(&self, values: &[f64]) -> OdeResult<()> {
        let mut stored = self.0.borrow_mut();
        ensure_dim("snapshot", stored.len(), values.len())?;
        stored.copy_from_slice(values);
        Ok(())
    }

    pub fn get(&self) -> Ref<'_, Vec<f64>> {
        self.0.borrow()
    }
}

/// Scalar factor of a [`Node::Scale`] node.
#[derive(Clone, Debug)]
pub enum Coefficient {
    Fixed(f64),
    Parameter(Parameter),
}

impl Coefficient {
    pub fn value(&self) -> f64 {
        match self {
            Coefficient::Fixed(value) => *value,
            Coefficient::Parameter(param) => param.get(),
        }
    }
}

impl From<f64> for Coefficient {
    fn from(value: f64) -> Self {
        Coefficient::Fixed(value)
    }
}

impl From<&Parameter> for Coefficient {
    fn from(param: &Parameter) -> Self {
        Coefficient::Parameter(param.clone())
    }
}

/// Stable handle of a node inside a [`Graph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// The closed set of node kinds.
enum Node {
    /// `f = x`.
    Identity { dim: usize },
    /// `f = snapshot`, independent of `x`.
    Constant { dim_x: usize, value: Snapshot },
    /// `f = lhs_factor * lhs(x) + rhs_factor * rhs(x)`.
    Sum {
        lhs: NodeId,
        rhs: NodeId,
        lhs_factor: f64,
        rhs_factor: f64,
    },
    /// `f = factor * operand(x)`.
    Scale {
        factor: Coefficient,
        operand: NodeId,
    },
    /// `f = outer(inner(x))`.
    Compose { outer: NodeId, inner: NodeId },
    /// `operand` applied to each of `copies` consecutive input blocks.
    Repeat { operand: NodeId, copies: usize },
    /// `f_i = sum_j matrix[i, j] * x_j` over blocks of length `block`.
    BlockMatVec { matrix: DMatrix<f64>, block: usize },
    /// A shared user model.
    Leaf(Rc<dyn NonlinearFunction>),
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Identity { dim } => write!(f, "Identity({dim})"),
            Node::Constant { dim_x, value } => {
                write!(f, "Constant({dim_x} -> {})", value.dim())
            }
            Node::Sum {
                lhs,
                rhs,
                lhs_factor,
                rhs_factor,
            } => write!(f, "Sum({lhs_factor}*{lhs:?} + {rhs_factor}*{rhs:?})"),
            Node::Scale { factor, operand } => write!(f, "Scale({factor:?}, {operand:?})"),
            Node::Compose { outer, inner } => write!(f, "Compose({outer:?} o {inner:?})"),
            Node::Repeat { operand, copies } => write!(f, "Repeat({operand:?} x {copies})"),
            Node::BlockMatVec { matrix, block } => {
                write!(f, "BlockMatVec({}x{}, block {block})", matrix.nrows(), matrix.ncols())
            }
            Node::Leaf(func) => write!(f, "Leaf({} -> {})", func.dim_x(), func.dim_f()),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Dims {
    x: usize,
    f: usize,
}

/// Append-only arena of residual nodes.
///
/// Nodes may only reference nodes created before them, so the graph is
/// acyclic by construction. Every constructor validates operand dimensions
/// and rejects mismatches immediately.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    dims: Vec<Dims>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn dim_x(&self, id: NodeId) -> usize {
        self.dims[id.0].x
    }

    pub fn dim_f(&self, id: NodeId) -> usize {
        self.dims[id.0].f
    }

    fn push(&mut self, node: Node, x: usize, f: usize) -> NodeId {
        self.nodes.push(node);
        self.dims.push(Dims { x, f });
        NodeId(self.nodes.len() - 1)
    }

    fn check(&self, id: NodeId) -> OdeResult<Dims> {
        self.dims
            .get(id.0)
            .copied()
            .ok_or_else(|| OdeError::invalid(format!("node {} is not part of this graph", id.0)))
    }

    pub fn identity(&mut self, dim: usize) -> NodeId {
        self.push(Node::Identity { dim }, dim, dim)
    }

    /// A constant node reading `value`; `dim_x` is the input size it accepts.
    pub fn constant(&mut self, dim_x: usize, value: &Snapshot) -> NodeId {
        let dim_f = value.dim();
        self.push(
            Node::Constant {
                dim_x,
                value: value.clone(),
            },
            dim_x,
            dim_f,
        )
    }

    pub fn leaf(&mut self, func: Rc<dyn NonlinearFunction>) -> NodeId {
        let (x, f) = (func.dim_x(), func.dim_f());
        self.push(Node::Leaf(func), x, f)
    }

    pub fn scaled_sum(
        &mut self,
        lhs_factor: f64,
        lhs: NodeId,
        rhs_factor: f64,
        rhs: NodeId,
    ) -> OdeResult<NodeId> {
        let a = self.check(lhs)?;
        let b = self.check(rhs)?;
        ensure_dim("sum input", a.x, b.x)?;
        ensure_dim("sum output", a.f, b.f)?;
        Ok(self.push(
            Node::Sum {
                lhs,
                rhs,
                lhs_factor,
                rhs_factor,
            },
            a.x,
            a.f,
        ))
    }

    pub fn sum(&mut self, lhs: NodeId, rhs: NodeId) -> OdeResult<NodeId> {
        self.scaled_sum(1.0, lhs, 1.0, rhs)
    }

    pub fn difference(&mut self, lhs: NodeId, rhs: NodeId) -> OdeResult<NodeId> {
        self.scaled_sum(1.0, lhs, -1.0, rhs)
    }

    /// Folds `sum_i c_i * node_i` into a chain of scaled sums.
    pub fn linear_combination(&mut self, terms: &[(f64, NodeId)]) -> OdeResult<NodeId> {
        let Some((&(first_factor, first), rest)) = terms.split_first() else {
            return Err(OdeError::invalid("linear combination needs at least one term"));
        };
        let mut acc = self.scale(first_factor, first)?;
        for &(factor, node) in rest {
            acc = self.scaled_sum(1.0, acc, factor, node)?;
        }
        Ok(acc)
    }

    pub fn scale(&mut self, factor: impl Into<Coefficient>, operand: NodeId) -> OdeResult<NodeId> {
        let d = self.check(operand)?;
        Ok(self.push(
            Node::Scale {
                factor: factor.into(),
                operand,
            },
            d.x,
            d.f,
        ))
    }

    pub fn compose(&mut self, outer: NodeId, inner: NodeId) -> OdeResult<NodeId> {
        let o = self.check(outer)?;
        let i = self.check(inner)?;
        ensure_dim("composition", o.x, i.f)?;
        Ok(self.push(Node::Compose { outer, inner }, i.x, o.f))
    }

    pub fn repeat(&mut self, operand: NodeId, copies: usize) -> OdeResult<NodeId> {
        let d = self.check(operand)?;
        if copies == 0 {
            return Err(OdeError::invalid("repeat needs at least one copy"));
        }
        Ok(self.push(
            Node::Repeat { operand, copies },
            d.x * copies,
            d.f * copies,
        ))
    }

    pub fn block_mat_vec(&mut self, matrix: DMatrix<f64>, block: usize) -> NodeId {
        let (x, f) = (matrix.ncols() * block, matrix.nrows() * block);
        self.push(Node::BlockMatVec { matrix, block }, x, f)
    }

    /// Writes `node(x)` into `f`.
    pub fn evaluate_node(&self, id: NodeId, x: &[f64], f: &mut [f64]) {
        match &self.nodes[id.0] {
            Node::Identity { .. } => f.copy_from_slice(x),
            Node::Constant { value, .. } => f.copy_from_slice(&value.get()),
            Node::Sum {
                lhs,
                rhs,
                lhs_factor,
                rhs_factor,
            } => {
                self.evaluate_node(*lhs, x, f);
                let mut tmp = vec![0.0; f.len()];
                self.evaluate_node(*rhs, x, &mut tmp);
                for (out, r) in f.iter_mut().zip(&tmp) {
                    *out = lhs_factor * *out + rhs_factor * r;
                }
            }
            Node::Scale { factor, operand } => {
                self.evaluate_node(*operand, x, f);
                let c = factor.value();
                f.iter_mut().for_each(|v| *v *= c);
            }
            Node::Compose { outer, inner } => {
                let mut y = vec![0.0; self.dim_f(*inner)];
                self.evaluate_node(*inner, x, &mut y);
                self.evaluate_node(*outer, &y, f);
            }
            Node::Repeat { operand, .. } => {
                let (nx, nf) = (self.dim_x(*operand), self.dim_f(*operand));
                for (xb, fb) in x.chunks_exact(nx).zip(f.chunks_exact_mut(nf)) {
                    self.evaluate_node(*operand, xb, fb);
                }
            }
            Node::BlockMatVec { matrix, block } => {
                f.fill(0.0);
                for i in 0..matrix.nrows() {
                    for j in 0..matrix.ncols() {
                        let a = matrix[(i, j)];
                        if a == 0.0 {
                            continue;
                        }
                        for l in 0..*block {
                            f[i * block + l] += a * x[j * block + l];
                        }
                    }
                }
            }
            Node::Leaf(func) => func.evaluate(x, f),
        }
    }

    /// Writes the Jacobian of `node` at `x` into `df`, overwriting every entry.
    pub fn evaluate_node_deriv(&self, id: NodeId, x: &[f64], df: &mut DMatrix<f64>) {
        match &self.nodes[id.0] {
            Node::Identity { .. } => df.fill_with_identity(),
            Node::Constant { .. } => df.fill(0.0),
            Node::Sum {
                lhs,
                rhs,
                lhs_factor,
                rhs_factor,
            } => {
                self.evaluate_node_deriv(*lhs, x, df);
                let mut tmp = DMatrix::zeros(df.nrows(), df.ncols());
                self.evaluate_node_deriv(*rhs, x, &mut tmp);
                *df *= *lhs_factor;
                *df += tmp * *rhs_factor;
            }
            Node::Scale { factor, operand } => {
                self.evaluate_node_deriv(*operand, x, df);
                *df *= factor.value();
            }
            Node::Compose { outer, inner } => {
                let mid = self.dim_f(*inner);
                let mut y = vec![0.0; mid];
                self.evaluate_node(*inner, x, &mut y);
                let mut inner_df = DMatrix::zeros(mid, x.len());
                self.evaluate_node_deriv(*inner, x, &mut inner_df);
                let mut outer_df = DMatrix::zeros(df.nrows(), mid);
                self.evaluate_node_deriv(*outer, &y, &mut outer_df);
                outer_df.mul_to(&inner_df, df);
            }
            Node::Repeat { operand, .. } => {
                let (nx, nf) = (self.dim_x(*operand), self.dim_f(*operand));
                df.fill(0.0);
                let mut block_df = DMatrix::zeros(nf, nx);
                for (k, xb) in x.chunks_exact(nx).enumerate() {
                    self.evaluate_node_deriv(*operand, xb, &mut block_df);
                    df.view_mut((k * nf, k * nx), (nf, nx)).copy_from(&block_df);
                }
            }
            Node::BlockMatVec { matrix, block } => {
                df.fill(0.0);
                for i in 0..matrix.nrows() {
                    for j in 0..matrix.ncols() {
                        for l in 0..*block {
                            df[(i * block + l, j * block + l)] = matrix[(i, j)];
                        }
                    }
                }
            }
            Node::Leaf(func) => {
                df.fill(0.0);
                func.evaluate_deriv(x, df);
            }
        }
    }
}

/// A node of a shared graph, usable wherever a [`NonlinearFunction`] is.
#[derive(Clone, Debug)]
pub struct Expr {
    graph: Rc<Graph>,
    root: NodeId,
}

impl Expr {
    pub fn new(graph: Rc<Graph>, root: NodeId) -> OdeResult<Self> {
        graph.check(root)?;
        Ok(Self { graph, root })
    }
}

impl NonlinearFunction for Expr {
    fn dim_x(&self) -> usize {
        self.graph.dim_x(self.root)
    }

    fn dim_f(&self) -> usize {
        self.graph.dim_f(self.root)
    }

    fn evaluate(&self, x: &[f64], f: &mut [f64]) {
        self.graph.evaluate_node(self.root, x, f);
    }

    fn evaluate_deriv(&self, x: &[f64], df: &mut DMatrix<f64>) {
        self.graph.evaluate_node_deriv(self.root, x, df);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// f(x) = (x0 * x1, sin(x0) + x1^2)
    struct Curved;

    impl NonlinearFunction for Curved {
        fn dim_x(&self) -> usize {
            2
        }
        fn dim_f(&self) -> usize {
            2
        }
        fn evaluate(&self, x: &[f64], f: &mut [f64]) {
            f[0] = x[0] * x[1];
            f[1] = x[0].sin() + x[1] * x[1];
        }
        fn evaluate_deriv(&self, x: &[f64], df: &mut DMatrix<f64>) {
            df[(0, 0)] = x[1];
            df[(0, 1)] = x[0];
            df[(1, 0)] = x[0].cos();
            df[(1, 1)] = 2.0 * x[1];
        }
    }

    /// f(x) = (x0 + 2 x1, -x0)
    struct Linear;

    impl NonlinearFunction for Linear {
        fn dim_x(&self) -> usize {
            2
        }
        fn dim_f(&self) -> usize {
            2
        }
        fn evaluate(&self, x: &[f64], f: &mut [f64]) {
            f[0] = x[0] + 2.0 * x[1];
            f[1] = -x[0];
        }
        fn evaluate_deriv(&self, _x: &[f64], df: &mut DMatrix<f64>) {
            df[(0, 0)] = 1.0;
            df[(0, 1)] = 2.0;
            df[(1, 0)] = -1.0;
        }
    }

    struct Scalar1;

    impl NonlinearFunction for Scalar1 {
        fn dim_x(&self) -> usize {
            1
        }
        fn dim_f(&self) -> usize {
            1
        }
        fn evaluate(&self, x: &[f64], f: &mut [f64]) {
            f[0] = x[0] * x[0];
        }
        fn evaluate_deriv(&self, x: &[f64], df: &mut DMatrix<f64>) {
            df[(0, 0)] = 2.0 * x[0];
        }
    }

    fn eval(func: &dyn NonlinearFunction, x: &[f64]) -> Vec<f64> {
        let mut f = vec![0.0; func.dim_f()];
        func.evaluate(x, &mut f);
        f
    }

    fn jac(func: &dyn NonlinearFunction, x: &[f64]) -> DMatrix<f64> {
        let mut df = DMatrix::from_element(func.dim_f(), func.dim_x(), f64::NAN);
        func.evaluate_deriv(x, &mut df);
        df
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-14, "{actual:?} vs {expected:?}");
        }
    }

    fn finite_difference_jacobian(func: &dyn NonlinearFunction, x: &[f64]) -> DMatrix<f64> {
        let h = 1e-6;
        let mut df = DMatrix::zeros(func.dim_f(), func.dim_x());
        for j in 0..func.dim_x() {
            let mut xp = x.to_vec();
            let mut xm = x.to_vec();
            xp[j] += h;
            xm[j] -= h;
            let (fp, fm) = (eval(func, &xp), eval(func, &xm));
            for i in 0..func.dim_f() {
                df[(i, j)] = (fp[i] - fm[i]) / (2.0 * h);
            }
        }
        df
    }

    #[test]
    fn sum_rejects_mismatched_operands_at_construction() {
        let mut graph = Graph::new();
        let a = graph.leaf(Rc::new(Curved));
        let b = graph.leaf(Rc::new(Scalar1));
        let err = graph.sum(a, b).expect_err("dimensions differ");
        assert!(matches!(err, OdeError::DimensionMismatch { .. }));
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn compose_rejects_incompatible_inner_output() {
        let mut graph = Graph::new();
        let outer = graph.leaf(Rc::new(Curved));
        let inner = graph.identity(3);
        assert!(graph.compose(outer, inner).is_err());
    }

    #[test]
    fn foreign_node_ids_are_rejected() {
        let mut other = Graph::new();
        other.identity(1);
        other.identity(1);
        let foreign = other.identity(1);

        let mut graph = Graph::new();
        let id = graph.identity(1);
        assert!(graph.sum(id, foreign).is_err());
    }

    #[test]
    fn snapshot_rejects_wrong_length() {
        let snap = Snapshot::zeros(2);
        assert!(snap.set(&[1.0, 2.0]).is_ok());
        assert!(snap.set(&[1.0]).is_err());
        assert_eq!(*snap.get(), vec![1.0, 2.0]);
    }

    #[test]
    fn linear_combination_requires_terms() {
        let mut graph = Graph::new();
        assert!(graph.linear_combination(&[]).is_err());
    }

    #[test]
    fn parameter_mutation_is_seen_without_rebuilding() {
        let tau = Parameter::new(0.5);
        let mut graph = Graph::new();
        let rhs = graph.leaf(Rc::new(Linear));
        let scaled = graph.scale(&tau, rhs).expect("scale");
        let expr = Expr::new(Rc::new(graph), scaled).expect("root");

        let x = [1.0, 1.0];
        assert_eq!(eval(&expr, &x), vec![1.5, -0.5]);
        tau.set(2.0);
        assert_eq!(eval(&expr, &x), vec![6.0, -2.0]);
        assert_eq!(jac(&expr, &x)[(0, 1)], 4.0);
    }

    #[test]
    fn implicit_euler_equation_has_expected_value_and_jacobian() {
        let tau = Parameter::new(0.1);
        let yold = Snapshot::from_slice(&[1.0, 2.0]);
        let mut graph = Graph::new();
        let ynew = graph.identity(2);
        let old = graph.constant(2, &yold);
        let rhs = graph.leaf(Rc::new(Linear));
        let step = graph.scale(&tau, rhs).expect("scale");
        let diff = graph.difference(ynew, old).expect("difference");
        let equ = graph.difference(diff, step).expect("difference");
        let expr = Expr::new(Rc::new(graph), equ).expect("root");

        let x = [3.0, -1.0];
        // x - yold - 0.1 * (x0 + 2 x1, -x0)
        assert_close(&eval(&expr, &x), &[3.0 - 1.0 - 0.1, -1.0 - 2.0 + 0.3]);

        let df = jac(&expr, &x);
        let expected = DMatrix::from_row_slice(2, 2, &[0.9, -0.2, 0.1, 1.0]);
        assert!((df - expected).norm() < 1e-15);

        yold.set(&[0.0, 0.0]).expect("same length");
        assert_close(&eval(&expr, &x), &[3.0 - 0.1, -1.0 + 0.3]);
    }

    #[test]
    fn compose_applies_chain_rule() {
        let mut graph = Graph::new();
        let outer = graph.leaf(Rc::new(Curved));
        let inner = graph.leaf(Rc::new(Linear));
        let comp = graph.compose(outer, inner).expect("compose");
        let expr = Expr::new(Rc::new(graph), comp).expect("root");

        let x = [0.3, -0.4];
        let df = jac(&expr, &x);
        let fd = finite_difference_jacobian(&expr, &x);
        assert!((df - fd).norm() < 1e-8);
    }

    #[test]
    fn repeat_and_block_mat_vec_build_stacked_stage_system() {
        let a = DMatrix::from_row_slice(2, 2, &[0.25, -0.1, 0.6, 0.25]);
        let mut graph = Graph::new();
        let rhs = graph.leaf(Rc::new(Curved));
        let stacked = graph.repeat(rhs, 2).expect("repeat");
        let mix = graph.block_mat_vec(a, 2);
        let comp = graph.compose(stacked, mix).expect("compose");
        let expr = Expr::new(Rc::new(graph), comp).expect("root");
        assert_eq!((expr.dim_x(), expr.dim_f()), (4, 4));

        let k = [0.5, 1.0, -0.3, 0.2];
        let stage0 = [0.25 * 0.5 - 0.1 * -0.3, 0.25 * 1.0 - 0.1 * 0.2];
        let f = eval(&expr, &k);
        assert!((f[0] - stage0[0] * stage0[1]).abs() < 1e-15);

        let df = jac(&expr, &k);
        let fd = finite_difference_jacobian(&expr, &k);
        assert!((df - fd).norm() < 1e-8);
    }

    #[test]
    fn leaf_jacobian_entries_not_written_by_model_are_zero() {
        let mut graph = Graph::new();
        let leaf = graph.leaf(Rc::new(Linear));
        let expr = Expr::new(Rc::new(graph), leaf).expect("root");
        let df = jac(&expr, &[0.0, 0.0]);
        assert_eq!(df[(1, 1)], 0.0);
    }

    proptest! {
        #[test]
        fn sum_distributes_over_value_and_jacobian(
            x0 in -3.0f64..3.0,
            x1 in -3.0f64..3.0,
            a in -2.0f64..2.0,
            b in -2.0f64..2.0,
        ) {
            let mut graph = Graph::new();
            let lhs = graph.leaf(Rc::new(Curved));
            let rhs = graph.leaf(Rc::new(Linear));
            let plain = graph.sum(lhs, rhs).expect("sum");
            let weighted = graph.scaled_sum(a, lhs, b, rhs).expect("scaled sum");
            let graph = Rc::new(graph);
            let plain = Expr::new(graph.clone(), plain).expect("root");
            let weighted = Expr::new(graph, weighted).expect("root");

            let x = [x0, x1];
            let (fa, fb) = (eval(&Curved, &x), eval(&Linear, &x));
            let mut ja = DMatrix::zeros(2, 2);
            let mut jb = DMatrix::zeros(2, 2);
            Curved.evaluate_deriv(&x, &mut ja);
            Linear.evaluate_deriv(&x, &mut jb);

            let fs = eval(&plain, &x);
            let fw = eval(&weighted, &x);
            for i in 0..2 {
                prop_assert!((fs[i] - (fa[i] + fb[i])).abs() < 1e-12);
                prop_assert!((fw[i] - (a * fa[i] + b * fb[i])).abs() < 1e-12);
            }
            prop_assert!((jac(&plain, &x) - (&ja + &jb)).norm() < 1e-12);
            prop_assert!((jac(&weighted, &x) - (ja * a + jb * b)).norm() < 1e-12);
        }
    }
}
