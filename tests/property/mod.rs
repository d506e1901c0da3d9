pub mod admission_bounds;
pub mod lifecycle_dag;
pub mod redirect_chain;
