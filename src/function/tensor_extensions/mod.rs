pub mod boolean;

pub use boolean::*;
