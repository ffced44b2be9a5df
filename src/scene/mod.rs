pub mod gaussian_4d;

pub use gaussian_4d::{Gaussian4dScene, Gaussian4dSceneData};
