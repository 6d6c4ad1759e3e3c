pub mod jrn;
pub mod rbac;
pub mod tree;
pub mod validate;

pub use jrn::Jrn;
