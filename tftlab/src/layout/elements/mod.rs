//! Primitive layout elements: text, simple shapes and test marks.

pub mod marks;
pub mod shapes;
pub mod text;
