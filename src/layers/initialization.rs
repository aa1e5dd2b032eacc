use ndarray::{Array1, Array2};
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::Uniform;
use rand::Rng;

/// Weights of shape `(fan_in, fan_out)`, uniform in `±1/sqrt(fan_in)` like a
/// PyTorch linear layer.
pub fn fan_in_uniform_weights<R: Rng + ?Sized>(shape: (usize, usize), rng: &mut R) -> Array2<f32> {
    let bound = fan_in_bound(shape.0);
    Array2::random_using(shape, Uniform::new_inclusive(-bound, bound), rng)
}

/// Biases drawn from the same range as the weights of their layer.
pub fn fan_in_uniform_biases<R: Rng + ?Sized>(fan_in: usize, size: usize, rng: &mut R) -> Array1<f32> {
    let bound = fan_in_bound(fan_in);
    Array1::random_using(size, Uniform::new_inclusive(-bound, bound), rng)
}

fn fan_in_bound(fan_in: usize) -> f32 {
    1.0 / (fan_in.max(1) as f32).sqrt()
}
