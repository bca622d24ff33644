pub mod tree;

pub use tree::{outline, MapOptions, TreeMap};
