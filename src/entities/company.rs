use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "companies")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub description: String,
    pub website: Option<String>,
    pub is_customer: bool,
    pub is_supplier: bool,
    pub is_manufacturer: bool,
    pub currency: String,
}

impl Model {
    pub fn get_absolute_url(&self) -> String {
        format!("/company/{}/", self.id)
    }

    /// Comma separated roles, e.g. `supplier, manufacturer`
    pub fn roles(&self) -> String {
        [
            (self.is_supplier, "supplier"),
            (self.is_manufacturer, "manufacturer"),
            (self.is_customer, "customer"),
        ]
        .iter()
        .filter(|(set, _)| *set)
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join(", ")
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::supplier_part::Entity")]
    SupplierParts,
}

impl Related<super::supplier_part::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SupplierParts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_list_flags_in_order() {
        let company = Model {
            id: 3,
            name: "Zerg Corporation".into(),
            description: String::new(),
            website: None,
            is_customer: false,
            is_supplier: true,
            is_manufacturer: true,
            currency: "USD".into(),
        };
        assert_eq!(company.roles(), "supplier, manufacturer");
        assert_eq!(company.get_absolute_url(), "/company/3/");
    }
}
