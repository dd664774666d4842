//! Dynamic shape resolution for variable-length model inputs.
//!
//! A declared shape may contain at most one dynamic dimension (any entry
//! `<= 0`), conventionally the leading batch or sequence dimension. Its size
//! is inferred from the input length; every other entry is fixed.

use crate::error::ShapeError;

/// Resolve `declared` against an input of `input_len` bytes made of
/// `element_size`-byte elements.
///
/// Pure: the same arguments always produce the same result.
pub fn resolve(
    declared: &[i64],
    input_len: usize,
    element_size: usize,
) -> Result<Vec<usize>, ShapeError> {
    let dynamic: Vec<usize> = declared
        .iter()
        .enumerate()
        .filter(|(_, &dim)| dim <= 0)
        .map(|(idx, _)| idx)
        .collect();

    if dynamic.len() > 1 {
        return Err(ShapeError::MultipleDynamic {
            count: dynamic.len(),
        });
    }

    match dynamic.first() {
        Some(&idx) => resolve_dynamic(declared, idx, input_len, element_size),
        None => resolve_fixed(declared, input_len, element_size),
    }
}

/// Number of elements a fully concrete shape holds.
pub fn element_count(shape: &[usize]) -> Result<usize, ShapeError> {
    shape
        .iter()
        .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
        .ok_or(ShapeError::Overflow)
}

fn resolve_dynamic(
    declared: &[i64],
    dynamic_idx: usize,
    input_len: usize,
    element_size: usize,
) -> Result<Vec<usize>, ShapeError> {
    let mut shape = Vec::with_capacity(declared.len());
    let mut fixed_product = 1usize;
    for (idx, &dim) in declared.iter().enumerate() {
        if idx == dynamic_idx {
            shape.push(0);
            continue;
        }
        let dim = positive(dim)?;
        fixed_product = fixed_product
            .checked_mul(dim)
            .ok_or(ShapeError::Overflow)?;
        shape.push(dim);
    }

    if fixed_product == 0 {
        return Err(ShapeError::ZeroFixedProduct);
    }
    if element_size == 0 || input_len % element_size != 0 {
        return Err(ShapeError::UnalignedInput {
            len: input_len,
            element_size,
        });
    }

    let elements = input_len / element_size;
    if elements % fixed_product != 0 {
        return Err(ShapeError::Indivisible {
            elements,
            fixed_product,
        });
    }

    shape[dynamic_idx] = elements / fixed_product;
    Ok(shape)
}

fn resolve_fixed(
    declared: &[i64],
    input_len: usize,
    element_size: usize,
) -> Result<Vec<usize>, ShapeError> {
    let shape = declared
        .iter()
        .map(|&dim| positive(dim))
        .collect::<Result<Vec<_>, _>>()?;

    let expected = element_count(&shape)?
        .checked_mul(element_size)
        .ok_or(ShapeError::Overflow)?;
    if input_len != expected {
        return Err(ShapeError::LengthMismatch {
            expected,
            actual: input_len,
        });
    }
    Ok(shape)
}

fn positive(dim: i64) -> Result<usize, ShapeError> {
    usize::try_from(dim).map_err(|_| ShapeError::Overflow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_dynamic_dimension_is_inferred() {
        // 32 bytes of f32 = 8 elements = 2 rows of 4.
        assert_eq!(resolve(&[-1, 4], 32, 4).unwrap(), vec![2, 4]);
    }

    #[test]
    fn zero_counts_as_dynamic() {
        assert_eq!(resolve(&[0, 3], 48, 8).unwrap(), vec![2, 3]);
    }

    #[test]
    fn inner_dynamic_dimension_is_inferred() {
        assert_eq!(resolve(&[1, -1], 7 * 8, 8).unwrap(), vec![1, 7]);
    }

    #[test]
    fn two_dynamic_dimensions_rejected() {
        assert_eq!(
            resolve(&[-1, -1], 32, 4),
            Err(ShapeError::MultipleDynamic { count: 2 })
        );
    }

    #[test]
    fn fixed_shape_length_mismatch() {
        assert_eq!(
            resolve(&[3, 4], 40, 1),
            Err(ShapeError::LengthMismatch {
                expected: 12,
                actual: 40
            })
        );
        assert_eq!(
            resolve(&[3, 4], 40, 4),
            Err(ShapeError::LengthMismatch {
                expected: 48,
                actual: 40
            })
        );
    }

    #[test]
    fn fixed_shape_exact_match() {
        assert_eq!(resolve(&[3, 4], 48, 4).unwrap(), vec![3, 4]);
    }

    #[test]
    fn indivisible_input_rejected() {
        assert_eq!(
            resolve(&[-1, 3], 4 * 4, 4),
            Err(ShapeError::Indivisible {
                elements: 4,
                fixed_product: 3
            })
        );
    }

    #[test]
    fn partial_element_rejected() {
        assert!(matches!(
            resolve(&[-1, 2], 33, 4),
            Err(ShapeError::UnalignedInput { len: 33, .. })
        ));
    }

    #[test]
    fn overflowing_shape_rejected() {
        assert_eq!(
            resolve(&[i64::MAX, i64::MAX, 2], 8, 4),
            Err(ShapeError::Overflow)
        );
    }

    #[test]
    fn scalar_shape_needs_one_element() {
        assert_eq!(resolve(&[], 4, 4).unwrap(), Vec::<usize>::new());
        assert!(resolve(&[], 8, 4).is_err());
    }
}
