pub mod digest;
pub mod text;

pub use digest::*;
pub use text::*;
