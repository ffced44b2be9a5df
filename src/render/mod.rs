pub mod gaussian_4d;
pub mod view;

pub use gaussian_4d::*;
pub use view::*;
