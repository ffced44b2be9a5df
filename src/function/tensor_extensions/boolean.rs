use burn::tensor::{backend, Bool, Int, Tensor, TensorData};
use rayon::prelude::*;

pub trait TensorBoolExtension<B: backend::Backend> {
    /// Indices of the `true` entries, in ascending order.
    fn true_indices(self) -> Tensor<B, 1, Int>;

    /// Count of the `true` entries.
    fn true_count(self) -> usize;
}

impl<B: backend::Backend> TensorBoolExtension<B> for Tensor<B, 1, Bool> {
    fn true_indices(self) -> Tensor<B, 1, Int> {
        let device = self.device();
        let mask = self.into_data().iter::<bool>().collect::<Vec<_>>();
        let indices = mask
            .into_par_iter()
            .enumerate()
            .filter_map(|(index, is_true)| is_true.then_some(index as i64))
            .collect::<Vec<_>>();
        let count = indices.len();

        Tensor::from_data(TensorData::new(indices, [count]), &device)
    }

    fn true_count(self) -> usize {
        self.into_data().iter::<bool>().filter(|is_true| *is_true).count()
    }
}
