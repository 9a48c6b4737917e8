use crate::error::{OdeError, OdeResult};
use crate::traits::{GenericFunction, NonlinearFunction};
use nalgebra::DMatrix;
use num_traits::{Float, FromPrimitive, Num, NumCast, One, ToPrimitive, Zero};
use std::ops::{
    Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Rem, RemAssign, Sub, SubAssign,
};

/// Dual number for forward mode AD with `N` tracked partial derivatives.
/// val: real part
/// deriv: partials with respect to the seeded variables
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Dual<const N: usize> {
    pub val: f64,
    pub deriv: [f64; N],
}

impl<const N: usize> Dual<N> {
    pub fn new(val: f64, deriv: [f64; N]) -> Self {
        Self { val, deriv }
    }

    /// A value that does not depend on any tracked variable.
    pub fn constant(val: f64) -> Self {
        Self::new(val, [0.0; N])
    }

    /// Seeds variable `index`: the only nonzero partial is a 1 at `index`.
    pub fn variable(val: f64, index: usize) -> Self {
        let mut deriv = [0.0; N];
        deriv[index] = 1.0;
        Self::new(val, deriv)
    }

    pub fn value(&self) -> f64 {
        self.val
    }

    pub fn deriv(&self) -> &[f64; N] {
        &self.deriv
    }

    pub fn partial(&self, index: usize) -> f64 {
        self.deriv[index]
    }

    /// Unary chain rule: `g(u)' = g'(u) u'`.
    fn chain(self, val: f64, slope: f64) -> Self {
        Self::new(val, self.deriv.map(|d| slope * d))
    }

    /// Binary chain rule: `g(u, v)' = g_u u' + g_v v'`.
    fn combine(self, rhs: Self, val: f64, du: f64, dv: f64) -> Self {
        Self::new(
            val,
            std::array::from_fn(|i| du * self.deriv[i] + dv * rhs.deriv[i]),
        )
    }
}

impl<const N: usize> Default for Dual<N> {
    fn default() -> Self {
        Self::constant(0.0)
    }
}

impl<const N: usize> From<f64> for Dual<N> {
    fn from(val: f64) -> Self {
        Self::constant(val)
    }
}

impl<const N: usize> Zero for Dual<N> {
    fn zero() -> Self {
        Self::constant(0.0)
    }
    fn is_zero(&self) -> bool {
        self.val == 0.0 && self.deriv.iter().all(|d| *d == 0.0)
    }
}

impl<const N: usize> One for Dual<N> {
    fn one() -> Self {
        Self::constant(1.0)
    }
}

impl<const N: usize> Add for Dual<N> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        self.combine(rhs, self.val + rhs.val, 1.0, 1.0)
    }
}

impl<const N: usize> Sub for Dual<N> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self.combine(rhs, self.val - rhs.val, 1.0, -1.0)
    }
}

impl<const N: usize> Mul for Dual<N> {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        self.combine(rhs, self.val * rhs.val, rhs.val, self.val)
    }
}

impl<const N: usize> Div for Dual<N> {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        let inv = 1.0 / rhs.val;
        let val = self.val * inv;
        self.combine(rhs, val, inv, -val * inv)
    }
}

impl<const N: usize> Neg for Dual<N> {
    type Output = Self;
    fn neg(self) -> Self {
        self.chain(-self.val, -1.0)
    }
}

impl<const N: usize> Rem for Dual<N> {
    type Output = Self;
    fn rem(self, rhs: Self) -> Self {
        // a % b = a - trunc(a / b) * b, with trunc locally constant.
        let q = (self.val / rhs.val).trunc();
        self.combine(rhs, self.val % rhs.val, 1.0, -q)
    }
}

// Mixed arithmetic with plain f64 on either side.
macro_rules! impl_scalar_ops {
    ($($trait:ident, $method:ident);*) => {
        $(
            impl<const N: usize> $trait<f64> for Dual<N> {
                type Output = Self;
                fn $method(self, rhs: f64) -> Self {
                    $trait::$method(self, Self::constant(rhs))
                }
            }

            impl<const N: usize> $trait<Dual<N>> for f64 {
                type Output = Dual<N>;
                fn $method(self, rhs: Dual<N>) -> Dual<N> {
                    $trait::$method(Dual::constant(self), rhs)
                }
            }
        )*
    };
}

impl_scalar_ops!(Add, add; Sub, sub; Mul, mul; Div, div; Rem, rem);

macro_rules! impl_assign_ops {
    ($($trait:ident, $method:ident, $op:ident, $op_method:ident);*) => {
        $(
            impl<const N: usize> $trait for Dual<N> {
                fn $method(&mut self, rhs: Self) {
                    *self = $op::$op_method(*self, rhs);
                }
            }

            impl<const N: usize> $trait<f64> for Dual<N> {
                fn $method(&mut self, rhs: f64) {
                    *self = $op::$op_method(*self, Self::constant(rhs));
                }
            }
        )*
    };
}

impl_assign_ops!(
    AddAssign, add_assign, Add, add;
    SubAssign, sub_assign, Sub, sub;
    MulAssign, mul_assign, Mul, mul;
    DivAssign, div_assign, Div, div;
    RemAssign, rem_assign, Rem, rem
);

impl<const N: usize> Num for Dual<N> {
    type FromStrRadixErr = ();
    fn from_str_radix(str: &str, radix: u32) -> Result<Self, Self::FromStrRadixErr> {
        f64::from_str_radix(str, radix)
            .map(Self::constant)
            .map_err(|_| ())
    }
}

impl<const N: usize> ToPrimitive for Dual<N> {
    fn to_i64(&self) -> Option<i64> {
        self.val.to_i64()
    }
    fn to_u64(&self) -> Option<u64> {
        self.val.to_u64()
    }
    fn to_f64(&self) -> Option<f64> {
        Some(self.val)
    }
}

impl<const N: usize> FromPrimitive for Dual<N> {
    fn from_i64(n: i64) -> Option<Self> {
        Some(Self::constant(n as f64))
    }
    fn from_u64(n: u64) -> Option<Self> {
        Some(Self::constant(n as f64))
    }
    fn from_f64(n: f64) -> Option<Self> {
        Some(Self::constant(n))
    }
}

impl<const N: usize> NumCast for Dual<N> {
    fn from<T: ToPrimitive>(n: T) -> Option<Self> {
        n.to_f64().map(Self::constant)
    }
}

impl<const N: usize> Float for Dual<N> {
    fn nan() -> Self {
        Self::constant(f64::NAN)
    }
    fn infinity() -> Self {
        Self::constant(f64::INFINITY)
    }
    fn neg_infinity() -> Self {
        Self::constant(f64::NEG_INFINITY)
    }
    fn neg_zero() -> Self {
        Self::constant(-0.0)
    }
    fn min_value() -> Self {
        Self::constant(f64::MIN)
    }
    fn min_positive_value() -> Self {
        Self::constant(f64::MIN_POSITIVE)
    }
    fn epsilon() -> Self {
        Self::constant(f64::EPSILON)
    }
    fn max_value() -> Self {
        Self::constant(f64::MAX)
    }
    fn is_nan(self) -> bool {
        self.val.is_nan()
    }
    fn is_infinite(self) -> bool {
        self.val.is_infinite()
    }
    fn is_finite(self) -> bool {
        self.val.is_finite()
    }
    fn is_normal(self) -> bool {
        self.val.is_normal()
    }
    fn classify(self) -> std::num::FpCategory {
        self.val.classify()
    }

    // Piecewise constant: zero derivative almost everywhere.
    fn floor(self) -> Self {
        Self::constant(self.val.floor())
    }
    fn ceil(self) -> Self {
        Self::constant(self.val.ceil())
    }
    fn round(self) -> Self {
        Self::constant(self.val.round())
    }
    fn trunc(self) -> Self {
        Self::constant(self.val.trunc())
    }
    fn signum(self) -> Self {
        Self::constant(self.val.signum())
    }

    fn fract(self) -> Self {
        self.chain(self.val.fract(), 1.0)
    }
    fn abs(self) -> Self {
        let slope = if self.val >= 0.0 { 1.0 } else { -1.0 };
        self.chain(self.val.abs(), slope)
    }
    fn is_sign_positive(self) -> bool {
        self.val.is_sign_positive()
    }
    fn is_sign_negative(self) -> bool {
        self.val.is_sign_negative()
    }
    fn mul_add(self, a: Self, b: Self) -> Self {
        self * a + b
    }
    fn recip(self) -> Self {
        let inv = 1.0 / self.val;
        self.chain(inv, -inv * inv)
    }

    fn powi(self, n: i32) -> Self {
        let slope = if n == 0 {
            0.0
        } else {
            (n as f64) * self.val.powi(n - 1)
        };
        self.chain(self.val.powi(n), slope)
    }

    fn powf(self, n: Self) -> Self {
        // d(u^v) = v u^(v-1) du + u^v ln(u) dv
        let val = self.val.powf(n.val);
        let du = if n.val == 0.0 {
            0.0
        } else {
            n.val * self.val.powf(n.val - 1.0)
        };
        let dv = if self.val > 0.0 { val * self.val.ln() } else { 0.0 };
        self.combine(n, val, du, dv)
    }

    fn sqrt(self) -> Self {
        let s = self.val.sqrt();
        self.chain(s, 0.5 / s)
    }

    fn exp(self) -> Self {
        let e = self.val.exp();
        self.chain(e, e)
    }
    fn exp2(self) -> Self {
        let e = self.val.exp2();
        self.chain(e, e * std::f64::consts::LN_2)
    }
    fn ln(self) -> Self {
        self.chain(self.val.ln(), 1.0 / self.val)
    }
    fn log(self, base: Self) -> Self {
        self.ln() / base.ln()
    }
    fn log2(self) -> Self {
        self.chain(self.val.log2(), 1.0 / (self.val * std::f64::consts::LN_2))
    }
    fn log10(self) -> Self {
        self.chain(self.val.log10(), 1.0 / (self.val * std::f64::consts::LN_10))
    }

    fn max(self, other: Self) -> Self {
        if self.val > other.val {
            self
        } else {
            other
        }
    }
    fn min(self, other: Self) -> Self {
        if self.val < other.val {
            self
        } else {
            other
        }
    }

    #[allow(deprecated)]
    fn abs_sub(self, other: Self) -> Self {
        if self.val > other.val {
            self - other
        } else {
            Self::zero()
        }
    }

    fn cbrt(self) -> Self {
        let c = self.val.cbrt();
        self.chain(c, 1.0 / (3.0 * c * c))
    }
    fn hypot(self, other: Self) -> Self {
        let h = self.val.hypot(other.val);
        if h == 0.0 {
            return Self::constant(0.0);
        }
        self.combine(other, h, self.val / h, other.val / h)
    }

    fn sin(self) -> Self {
        self.chain(self.val.sin(), self.val.cos())
    }
    fn cos(self) -> Self {
        self.chain(self.val.cos(), -self.val.sin())
    }
    fn tan(self) -> Self {
        let t = self.val.tan();
        self.chain(t, 1.0 + t * t)
    }
    fn asin(self) -> Self {
        self.chain(self.val.asin(), 1.0 / (1.0 - self.val * self.val).sqrt())
    }
    fn acos(self) -> Self {
        self.chain(self.val.acos(), -1.0 / (1.0 - self.val * self.val).sqrt())
    }
    fn atan(self) -> Self {
        self.chain(self.val.atan(), 1.0 / (1.0 + self.val * self.val))
    }
    fn atan2(self, other: Self) -> Self {
        // self is y, other is x.
        let r2 = self.val * self.val + other.val * other.val;
        self.combine(
            other,
            self.val.atan2(other.val),
            other.val / r2,
            -self.val / r2,
        )
    }
    fn sin_cos(self) -> (Self, Self) {
        (self.sin(), self.cos())
    }

    fn exp_m1(self) -> Self {
        self.chain(self.val.exp_m1(), self.val.exp())
    }
    fn ln_1p(self) -> Self {
        self.chain(self.val.ln_1p(), 1.0 / (1.0 + self.val))
    }
    fn sinh(self) -> Self {
        self.chain(self.val.sinh(), self.val.cosh())
    }
    fn cosh(self) -> Self {
        self.chain(self.val.cosh(), self.val.sinh())
    }
    fn tanh(self) -> Self {
        let t = self.val.tanh();
        self.chain(t, 1.0 - t * t)
    }
    fn asinh(self) -> Self {
        self.chain(self.val.asinh(), 1.0 / (self.val * self.val + 1.0).sqrt())
    }
    fn acosh(self) -> Self {
        self.chain(self.val.acosh(), 1.0 / (self.val * self.val - 1.0).sqrt())
    }
    fn atanh(self) -> Self {
        self.chain(self.val.atanh(), 1.0 / (1.0 - self.val * self.val))
    }

    fn integer_decode(self) -> (u64, i16, i8) {
        self.val.integer_decode()
    }
}

// --- Jacobians from generic model code ---

/// Wraps a [`GenericFunction`] and derives its Jacobian with dual numbers.
///
/// `evaluate_deriv` seeds `N` inputs per pass, so a model with `dim_x <= N`
/// is differentiated in a single evaluation and larger models take
/// `ceil(dim_x / N)` passes.
pub struct AutoDiffFunction<M, const N: usize> {
    model: M,
}

impl<M: GenericFunction, const N: usize> AutoDiffFunction<M, N> {
    pub fn new(model: M) -> OdeResult<Self> {
        if N == 0 {
            return Err(OdeError::invalid(
                "AutoDiffFunction needs at least one tracked partial",
            ));
        }
        Ok(Self { model })
    }
}

impl<M: GenericFunction, const N: usize> NonlinearFunction for AutoDiffFunction<M, N> {
    fn dim_x(&self) -> usize {
        self.model.dim_x()
    }

    fn dim_f(&self) -> usize {
        self.model.dim_f()
    }

    fn evaluate(&self, x: &[f64], f: &mut [f64]) {
        self.model.apply(x, f);
    }

    fn evaluate_deriv(&self, x: &[f64], df: &mut DMatrix<f64>) {
        let n = self.model.dim_x();
        let mut dual_x = vec![Dual::<N>::zero(); n];
        let mut dual_f = vec![Dual::<N>::zero(); self.model.dim_f()];

        for start in (0..n).step_by(N) {
            let width = N.min(n - start);
            for (i, (slot, &value)) in dual_x.iter_mut().zip(x).enumerate() {
                *slot = if (start..start + width).contains(&i) {
                    Dual::variable(value, i - start)
                } else {
                    Dual::constant(value)
                };
            }

            self.model.apply(&dual_x, &mut dual_f);

            for (row, out) in dual_f.iter().enumerate() {
                for k in 0..width {
                    df[(row, start + k)] = out.deriv[k];
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AutoDiffFunction, Dual};
    use crate::traits::{GenericFunction, NonlinearFunction, Scalar};
    use nalgebra::DMatrix;
    use num_traits::Float;
    use proptest::prelude::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn variable_seeds_single_unit_partial() {
        let v = Dual::<3>::variable(2.5, 1);
        assert_eq!(v.value(), 2.5);
        assert_eq!(v.deriv(), &[0.0, 1.0, 0.0]);
        assert!(Dual::<3>::constant(1.0).deriv().iter().all(|d| *d == 0.0));
    }

    #[test]
    fn product_and_quotient_rules_track_each_partial() {
        let x = Dual::<2>::variable(3.0, 0);
        let y = Dual::<2>::variable(2.0, 1);

        let p = x * y;
        assert_eq!(p.value(), 6.0);
        assert_eq!(p.deriv(), &[2.0, 3.0]);

        let q = x / y;
        assert_close(q.value(), 1.5, 1e-15);
        assert_close(q.partial(0), 0.5, 1e-15);
        assert_close(q.partial(1), -0.75, 1e-15);
    }

    #[test]
    fn chain_rule_through_transcendentals() {
        // f(x, y) = x sin(y)
        let x = Dual::<2>::variable(1.5, 0);
        let y = Dual::<2>::variable(0.3, 1);
        let f = x * y.sin();
        assert_close(f.partial(0), 0.3f64.sin(), 1e-15);
        assert_close(f.partial(1), 1.5 * 0.3f64.cos(), 1e-15);

        let g = (x * x + 1.0).sqrt().exp();
        let s = (1.5f64 * 1.5 + 1.0).sqrt();
        assert_close(g.partial(0), s.exp() * 1.5 / s, 1e-12);
        assert_eq!(g.partial(1), 0.0);
    }

    #[test]
    fn mixed_f64_operands_are_constants() {
        let x = Dual::<1>::variable(2.0, 0);
        let f = 3.0 * x - 1.0;
        assert_eq!(f.value(), 5.0);
        assert_eq!(f.partial(0), 3.0);

        let g = 1.0 / x;
        assert_close(g.partial(0), -0.25, 1e-15);

        let mut h = x;
        h *= x;
        h += 2.0;
        assert_eq!(h.value(), 6.0);
        assert_eq!(h.partial(0), 4.0);
    }

    #[test]
    fn piecewise_constant_functions_have_zero_derivative() {
        let x = Dual::<1>::variable(2.7, 0);
        assert_eq!(x.floor().partial(0), 0.0);
        assert_eq!(x.round().partial(0), 0.0);
        assert_eq!((-x).abs().partial(0), 1.0);
        assert_eq!((-x).partial(0), -1.0);
    }

    fn central_difference(f: impl Fn(f64) -> f64, x: f64) -> f64 {
        let h = 1e-6;
        (f(x + h) - f(x - h)) / (2.0 * h)
    }

    fn check_unary<F>(x: f64, dual_fn: F, plain_fn: fn(f64) -> f64)
    where
        F: Fn(Dual<1>) -> Dual<1>,
    {
        let exact = dual_fn(Dual::variable(x, 0)).partial(0);
        let approx = central_difference(plain_fn, x);
        assert!(
            (exact - approx).abs() <= 1e-6 * (1.0 + exact.abs()),
            "x = {x}: dual {exact} vs fd {approx}"
        );
    }

    proptest! {
        #[test]
        fn elementary_functions_match_finite_differences(x in 0.1f64..0.9) {
            check_unary(x, |d| d.sin(), f64::sin);
            check_unary(x, |d| d.cos(), f64::cos);
            check_unary(x, |d| d.tan(), f64::tan);
            check_unary(x, |d| d.asin(), f64::asin);
            check_unary(x, |d| d.acos(), f64::acos);
            check_unary(x, |d| d.atan(), f64::atan);
            check_unary(x, |d| d.sinh(), f64::sinh);
            check_unary(x, |d| d.cosh(), f64::cosh);
            check_unary(x, |d| d.tanh(), f64::tanh);
            check_unary(x, |d| d.asinh(), f64::asinh);
            check_unary(x, |d| d.atanh(), f64::atanh);
            check_unary(x, |d| d.exp(), f64::exp);
            check_unary(x, |d| d.exp2(), f64::exp2);
            check_unary(x, |d| d.exp_m1(), f64::exp_m1);
            check_unary(x, |d| d.ln(), f64::ln);
            check_unary(x, |d| d.ln_1p(), f64::ln_1p);
            check_unary(x, |d| d.log2(), f64::log2);
            check_unary(x, |d| d.log10(), f64::log10);
            check_unary(x, |d| d.sqrt(), f64::sqrt);
            check_unary(x, |d| d.cbrt(), f64::cbrt);
            check_unary(x, |d| d.recip(), f64::recip);
            check_unary(x, |d| d.powi(3), |v| v.powi(3));
            check_unary(x, |d| d.powf(Dual::constant(2.5)), |v| v.powf(2.5));
            check_unary(x, |d| Dual::constant(1.7).powf(d), |v| 1.7f64.powf(v));
            check_unary(x + 1.0, |d| d.acosh(), f64::acosh);
        }

        #[test]
        fn binary_functions_match_finite_differences(x in 0.2f64..2.0, y in 0.2f64..2.0) {
            let xd = Dual::<2>::variable(x, 0);
            let yd = Dual::<2>::variable(y, 1);

            let atan2 = yd.atan2(xd);
            let fd_y = central_difference(|v| v.atan2(x), y);
            let fd_x = central_difference(|v| y.atan2(v), x);
            prop_assert!((atan2.partial(0) - fd_x).abs() < 1e-6);
            prop_assert!((atan2.partial(1) - fd_y).abs() < 1e-6);

            let hyp = xd.hypot(yd);
            let fd_x = central_difference(|v| v.hypot(y), x);
            prop_assert!((hyp.partial(0) - fd_x).abs() < 1e-6);

            let pow = xd.powf(yd);
            let fd_y = central_difference(|v| x.powf(v), y);
            prop_assert!((pow.partial(1) - fd_y).abs() < 1e-5 * (1.0 + fd_y.abs()));
        }
    }

    struct Rotation {
        rate: f64,
    }

    impl GenericFunction for Rotation {
        fn dim_x(&self) -> usize {
            3
        }
        fn dim_f(&self) -> usize {
            2
        }
        fn apply<T: Scalar>(&self, x: &[T], f: &mut [T]) {
            let rate = T::from_f64(self.rate).unwrap();
            f[0] = x[0] * x[2].cos() - rate * x[1];
            f[1] = x[0] * x[1] + x[2].sin();
        }
    }

    fn expected_jacobian(x: &[f64], rate: f64) -> DMatrix<f64> {
        DMatrix::from_row_slice(
            2,
            3,
            &[
                x[2].cos(),
                -rate,
                -x[0] * x[2].sin(),
                x[1],
                x[0],
                x[2].cos(),
            ],
        )
    }

    #[test]
    fn autodiff_function_single_pass_matches_analytic_jacobian() {
        let func = AutoDiffFunction::<_, 3>::new(Rotation { rate: 0.7 }).expect("valid width");
        let x = [0.4, -1.2, 0.9];
        let mut df = DMatrix::zeros(2, 3);
        func.evaluate_deriv(&x, &mut df);
        assert!((df - expected_jacobian(&x, 0.7)).norm() < 1e-14);

        let mut f = [0.0; 2];
        func.evaluate(&x, &mut f);
        assert_close(f[0], 0.4 * 0.9f64.cos() + 0.7 * 1.2, 1e-15);
    }

    #[test]
    fn autodiff_function_column_blocks_cover_every_input() {
        let func = AutoDiffFunction::<_, 2>::new(Rotation { rate: -0.3 }).expect("valid width");
        let x = [1.1, 0.5, -0.2];
        let mut df = DMatrix::zeros(2, 3);
        func.evaluate_deriv(&x, &mut df);
        assert!((df - expected_jacobian(&x, -0.3)).norm() < 1e-14);
    }

    #[test]
    fn autodiff_function_rejects_zero_width() {
        assert!(AutoDiffFunction::<_, 0>::new(Rotation { rate: 1.0 }).is_err());
    }
}
