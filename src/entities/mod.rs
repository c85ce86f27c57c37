pub mod bom_item;
pub mod build;
pub mod company;
pub mod part;
pub mod part_category;
pub mod stock_item;
pub mod stock_location;
pub mod supplier_part;
pub mod user;

pub mod prelude {
    pub use super::bom_item::Entity as BomItem;
    pub use super::build::Entity as Build;
    pub use super::company::Entity as Company;
    pub use super::part::Entity as Part;
    pub use super::part_category::Entity as PartCategory;
    pub use super::stock_item::Entity as StockItem;
    pub use super::stock_location::Entity as StockLocation;
    pub use super::supplier_part::Entity as SupplierPart;
    pub use super::user::Entity as User;
}
