//! Helpers for merging lists of tensors into a single model input.

use crate::error::LayerError;
use crate::tensor::Tensor;

/// Concatenates `inputs` along `axis`; a single input is returned as is.
pub fn concat_fun(inputs: &[Tensor], axis: usize) -> Result<Tensor, LayerError> {
    match inputs {
        [] => Err(LayerError::forward("concat_fun expects at least one tensor")),
        [single] => Ok(single.clone()),
        _ => Tensor::concat(inputs, axis),
    }
}

/// Concatenates `inputs` along their last axis.
pub fn concat_last(inputs: &[Tensor]) -> Result<Tensor, LayerError> {
    let axis = inputs
        .first()
        .map(|t| t.ndim().saturating_sub(1))
        .unwrap_or(0);
    concat_fun(inputs, axis)
}

/// Builds the `[B, D]` input of a feedforward network from sparse embeddings
/// and dense values.
///
/// Every tensor is flattened from axis 1, each group is concatenated on the
/// last axis and the two groups are joined. Either group may be empty, but
/// not both.
///
/// ```
/// use ctr_layers::merge::combined_dnn_input;
/// use ctr_layers::tensor::Tensor;
///
/// let sparse = vec![Tensor::ones(&[2, 1, 4]), Tensor::ones(&[2, 1, 4])];
/// let dense = vec![Tensor::ones(&[2, 3])];
/// let out = combined_dnn_input(&sparse, &dense).unwrap();
/// assert_eq!(out.shape(), &[2, 11]);
/// ```
pub fn combined_dnn_input(
    sparse_embedding_list: &[Tensor],
    dense_value_list: &[Tensor],
) -> Result<Tensor, LayerError> {
    let flatten_group = |group: &[Tensor]| -> Result<Option<Tensor>, LayerError> {
        if group.is_empty() {
            return Ok(None);
        }
        let flat: Vec<Tensor> = group.iter().map(|t| t.flatten_from(1)).collect();
        concat_last(&flat).map(Some)
    };

    match (
        flatten_group(sparse_embedding_list)?,
        flatten_group(dense_value_list)?,
    ) {
        (Some(sparse), Some(dense)) => concat_fun(&[sparse, dense], 1),
        (Some(sparse), None) => Ok(sparse),
        (None, Some(dense)) => Ok(dense),
        (None, None) => Err(LayerError::forward(
            "combined_dnn_input needs at least one sparse or dense input",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_fun_single_passthrough() {
        let t = Tensor::from_data(&[1, 2], vec![1.0, 2.0]);
        assert_eq!(concat_fun(&[t.clone()], 0).unwrap(), t);
        assert!(concat_fun(&[], 0).is_err());
    }

    #[test]
    fn test_concat_last() {
        let a = Tensor::from_data(&[2, 1, 1], vec![1.0, 2.0]);
        let b = Tensor::from_data(&[2, 1, 2], vec![3.0, 4.0, 5.0, 6.0]);
        let out = concat_last(&[a, b]).unwrap();
        assert_eq!(out.shape(), &[2, 1, 3]);
        assert_eq!(out.data(), &[1.0, 3.0, 4.0, 2.0, 5.0, 6.0]);
    }

    #[test]
    fn test_combined_dnn_input_orders_sparse_first() {
        let sparse = vec![Tensor::from_data(&[1, 1, 2], vec![1.0, 2.0])];
        let dense = vec![Tensor::from_data(&[1, 1], vec![9.0])];
        let out = combined_dnn_input(&sparse, &dense).unwrap();
        assert_eq!(out.data(), &[1.0, 2.0, 9.0]);
    }

    #[test]
    fn test_combined_dnn_input_single_groups() {
        let sparse = vec![Tensor::ones(&[3, 1, 2])];
        assert_eq!(combined_dnn_input(&sparse, &[]).unwrap().shape(), &[3, 2]);

        let dense = vec![Tensor::ones(&[3, 2]), Tensor::ones(&[3, 1])];
        assert_eq!(combined_dnn_input(&[], &dense).unwrap().shape(), &[3, 3]);

        assert!(combined_dnn_input(&[], &[]).is_err());
    }
}
