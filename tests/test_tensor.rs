use light_primer::tensor::*;
use light_primer::TensorError;

#[test]
fn test_from_vec() {
    let tensor1 = RcTensor::<i32>::from(vec![vec![0, 1, 2], vec![3, 4, 5]]);
    let tensor2 = RcTensor::<i32>::new((0..6).collect(), vec![2, 3]);
    assert_eq!(tensor1, tensor2);
}

#[test]
fn test_new_with_filler() {
    let vec = RcTensor::new_with_filler(vec![4], 4i32);
    assert_eq!(vec.shape(), &[4]);
    assert_eq!(vec.get(&[0]).unwrap(), 4);
}

#[test]
fn test_get_3x3() {
    let matrix = RcTensor::<i32>::new(vec![0, 1, 2, 3, 4, 5, 6, 7, 8], vec![3, 3]);
    let mut prev = -1;
    for i in 0..3 {
        for j in 0..3 {
            let curr = matrix.get(&[i, j]).unwrap();
            assert_eq!(prev + 1, curr);
            prev = curr;
        }
    }
    assert!(matches!(
        matrix.get(&[3, 0]),
        Err(TensorError::IndexOutOfBounds { .. })
    ));
}

#[test]
fn test_get_3x3x4() {
    let matrix = RcTensor::<i32>::new((0..(3 * 3 * 4)).collect(), vec![3, 3, 4]);
    assert_eq!(matrix.get(&[0, 0, 0]).unwrap(), 0);
    assert_eq!(matrix.get(&[2, 2, 3]).unwrap(), 3 * 3 * 4 - 1);
}

#[test]
fn test_add_scalar() {
    let tensor1 = RcTensor::<i32>::new((0..32).collect(), vec![2, 4, 4]);
    let tensor2 = RcTensor::<i32>::new((42..(32 + 42)).collect(), vec![2, 4, 4]);
    let scalar = RcTensor::scalar(42i32);
    assert_eq!(&tensor1 + &scalar, tensor2);
    assert_eq!(&scalar + &tensor1, tensor2);
    assert_eq!(&tensor1 + 42, tensor2);
}

#[test]
fn test_add_broadcasts() {
    let tensor1 = RcTensor::new_with_filler(vec![4, 4], 1i32);
    let tensor2 = RcTensor::<i32>::new((0..32).collect(), vec![2, 4, 4]);
    let tensor3 = RcTensor::<i32>::new((1..33).collect(), vec![2, 4, 4]);
    assert_eq!(&tensor2 + &tensor1, tensor3);
    assert_eq!(&tensor1 + &tensor2, tensor3);
}

#[test]
fn test_incompatible_shapes_are_errors() {
    let left = RcTensor::<f64>::zeros(&[2, 3]);
    let right = RcTensor::<f64>::zeros(&[4]);
    assert!(matches!(
        functional::add(&left, &right),
        Err(TensorError::Broadcast { .. })
    ));
    assert!(matches!(
        left.matmul(&right),
        Err(TensorError::MatmulShape { .. })
    ));
}

#[test]
fn test_bmm_2x2() {
    let matrix = RcTensor::<i32>::new(vec![0, 1, 2, 3], vec![2, 2]);
    let shape = vec![2, 1];
    let e1 = RcTensor::new(vec![0, 1], vec![2, 1]);
    let e2 = RcTensor::new(vec![1, 0], vec![2, 1]);
    let diag = RcTensor::new(vec![1, 1], vec![2, 1]);

    let r = matrix.matmul(&diag).unwrap();
    assert_eq!(r.shape(), &shape[..]);
    assert_eq!(r, RcTensor::new(vec![1, 5], shape.clone()));
    assert_eq!(matrix.matmul(&e1).unwrap(), RcTensor::new(vec![1, 3], shape.clone()));
    assert_eq!(matrix.matmul(&e2).unwrap(), RcTensor::new(vec![0, 2], shape));
}

#[test]
fn test_batched_matmul() {
    let batch = RcTensor::<i64>::new((0..12).collect(), vec![2, 2, 3]);
    let right = RcTensor::<i64>::ones(&[3, 1]);
    assert_eq!(
        batch.matmul(&right).unwrap(),
        RcTensor::<i64>::from([[[3i64], [12]], [[21], [30]]])
    );
}

#[test]
fn test_right_scalar_multiplication() {
    let vec = RcTensor::new_with_filler(vec![4], 1i32);
    assert_eq!(&vec * 42, RcTensor::new(vec![42, 42, 42, 42], vec![4]));
}

#[test]
fn test_shape_ops() {
    let x = RcTensor::<i32>::new((0..6).collect(), vec![2, 3]);
    assert_eq!(x.t().unwrap(), RcTensor::<i32>::from([[0, 3], [1, 4], [2, 5]]));
    assert_eq!(x.reshape(&[3, 2]).unwrap().shape(), &[3, 2]);
    assert!(x.reshape(&[4]).is_err());
    assert_eq!(x.flatten(0).unwrap().shape(), &[6]);
    assert_eq!(
        x.slice(&[SliceRange::new(1, 2), SliceRange::new(0, 2)]).unwrap(),
        RcTensor::<i32>::from([[3, 4]])
    );
    assert_eq!(
        x.index_select(&[1, 1, 0]).unwrap(),
        RcTensor::<i32>::from([[3, 4, 5], [3, 4, 5], [0, 1, 2]])
    );
    let joined = functional::cat(&[x.clone(), x.clone()], 1).unwrap();
    assert_eq!(joined.shape(), &[2, 6]);
    let stacked = functional::stack(&[x.clone(), x], 0).unwrap();
    assert_eq!(stacked.shape(), &[2, 2, 3]);
}

#[test]
fn test_inspection() {
    let x = RcTensor::from([[1.0f32, 2.0, 3.0]]);
    assert_eq!(x.dim(), 2);
    assert_eq!(x.numel(), 3);
    assert_eq!(x.dtype(), DType::Float32);
    assert!(!x.is_scalar());
    assert!(x.item().is_err());
    assert_eq!(x.sum().item().unwrap(), 6.0);
    assert_eq!(x.to_vec(), vec![1.0, 2.0, 3.0]);
}
