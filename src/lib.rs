#![allow(clippy::excessive_precision)]
#![allow(missing_docs)]

pub mod error;
pub mod function;
pub mod render;
pub mod scene;
pub mod spherical_harmonics;
