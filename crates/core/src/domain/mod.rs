pub mod product;
pub mod slot;
