//! Read-side analysis of the survey forest: tree topology walks, vertex
//! navigation and the kind-specific predicates of the vertex model.
pub mod navigation;
pub mod topology;
pub mod vertex;
