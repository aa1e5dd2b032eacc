pub mod dense;
pub mod initialization;

pub use dense::{DenseCache, DenseGrads, DenseLayer};
