pub mod bom;
pub mod build;
pub mod company;
pub mod part;
pub mod stock;
