use light_primer::tensor::*;
use light_primer::TensorError;

fn leaf(values: Vec<f64>, shape: Vec<usize>) -> RcTensor<f64> {
    RcTensor::new(values, shape).requires_grad_(true).unwrap()
}

fn assert_close(a: f64, b: f64, tol: f64) {
    assert!((a - b).abs() < tol, "{a} != {b}");
}

#[test]
fn test_quadratic_gradient() {
    let x = RcTensor::scalar(2.0f64).requires_grad_(true).unwrap();
    let y = &(&x.pow(2.0) + &(&x * 3.0)) + 1.0;
    assert_eq!(y.item().unwrap(), 11.0);
    assert!(y.grad_fn_name().is_some());
    y.backward().unwrap();
    assert_close(x.grad().unwrap().item().unwrap(), 7.0, 1e-12);
}

#[test]
fn test_gradient_accumulates_until_cleared() {
    let x = RcTensor::scalar(3.0f64).requires_grad_(true).unwrap();
    let y = &x * &x;
    y.backward().unwrap();
    y.backward().unwrap();
    assert_close(x.grad().unwrap().item().unwrap(), 12.0, 1e-12);

    x.zero_grad();
    assert!(x.grad().is_none());
    (&x * 2.0).backward().unwrap();
    assert_close(x.grad().unwrap().item().unwrap(), 2.0, 1e-12);
}

#[test]
fn test_shared_subexpression() {
    // z = a * b + a, both paths reach `a`
    let a = RcTensor::scalar(2.0f64).requires_grad_(true).unwrap();
    let b = RcTensor::scalar(5.0f64).requires_grad_(true).unwrap();
    let z = &(&a * &b) + &a;
    z.backward().unwrap();
    assert_close(a.grad().unwrap().item().unwrap(), 6.0, 1e-12);
    assert_close(b.grad().unwrap().item().unwrap(), 2.0, 1e-12);
}

#[test]
fn test_matmul_tanh_matches_finite_differences() {
    let x_values = vec![0.5, -1.0, 0.25, 2.0, 0.1, -0.3];
    let w_values = vec![0.2, -0.4, 0.7, 0.1, -0.5, 0.3];
    let forward = |x: &RcTensor<f64>, w: &RcTensor<f64>| x.matmul(w).unwrap().tanh().sum();

    let x = leaf(x_values.clone(), vec![2, 3]);
    let w = leaf(w_values.clone(), vec![3, 2]);
    forward(&x, &w).backward().unwrap();
    let analytic = w.grad().unwrap().to_vec();

    let eps = 1e-6;
    let x_const = RcTensor::new(x_values, vec![2, 3]);
    for i in 0..w_values.len() {
        let mut plus = w_values.clone();
        plus[i] += eps;
        let mut minus = w_values.clone();
        minus[i] -= eps;
        let f_plus = forward(&x_const, &RcTensor::new(plus, vec![3, 2])).item().unwrap();
        let f_minus = forward(&x_const, &RcTensor::new(minus, vec![3, 2])).item().unwrap();
        assert_close(analytic[i], (f_plus - f_minus) / (2.0 * eps), 1e-6);
    }
}

#[test]
fn test_broadcast_gradient_is_reduced() {
    let x = leaf(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]);
    let b = leaf(vec![0.0, 0.0, 0.0], vec![3]);
    (&x + &b).sum().backward().unwrap();
    assert_eq!(b.grad().unwrap().shape(), &[3]);
    assert_eq!(b.grad().unwrap().to_vec(), vec![2.0, 2.0, 2.0]);
    assert_eq!(x.grad().unwrap().to_vec(), vec![1.0; 6]);
}

#[test]
fn test_no_grad_records_nothing() {
    let x = RcTensor::scalar(1.5f64).requires_grad_(true).unwrap();
    let y = no_grad(|| {
        assert!(!is_grad_enabled());
        &x * 4.0
    });
    assert!(is_grad_enabled());
    assert!(!y.requires_grad());
    assert!(y.is_leaf());
    assert!(y.backward().is_err());

    {
        let _guard = NoGradGuard::new();
        assert!(!(&x + 1.0).requires_grad());
    }
    assert!((&x + 1.0).requires_grad());
}

#[test]
fn test_detach_cuts_history() {
    let x = RcTensor::scalar(2.0f64).requires_grad_(true).unwrap();
    let y = (&x * 3.0).detach();
    assert!(y.is_leaf());
    assert!(!y.requires_grad());
    assert_eq!(y.item().unwrap(), 6.0);
}

#[test]
fn test_backward_errors() {
    let v = leaf(vec![1.0, 2.0], vec![2]);
    let doubled = &v * 2.0;
    assert!(matches!(
        doubled.backward(),
        Err(TensorError::NotScalar { .. })
    ));
    doubled
        .backward_with(RcTensor::from([1.0, 0.5]))
        .unwrap();
    assert_eq!(v.grad().unwrap().to_vec(), vec![2.0, 1.0]);

    assert!(matches!(
        RcTensor::<i32>::from([1, 2]).requires_grad_(true),
        Err(TensorError::IntegerGrad { .. })
    ));
    assert!(matches!(
        doubled.requires_grad_(false),
        Err(TensorError::NonLeaf)
    ));
}
