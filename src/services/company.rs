use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use utoipa::IntoParams;

use crate::{
    entities::{
        company::{self, Entity as CompanyEntity},
        part::{self, Entity as PartEntity},
        supplier_part::{self, Entity as SupplierPartEntity},
    },
    errors::ServiceError,
};

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CompanyFilter {
    pub is_supplier: Option<bool>,
    pub is_manufacturer: Option<bool>,
    pub is_customer: Option<bool>,
    /// Matches name or description
    pub search: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SupplierPartFilter {
    pub part: Option<i32>,
    pub supplier: Option<i32>,
    pub manufacturer: Option<i32>,
}

/// Supplier part together with the part and companies it links
#[derive(Debug, Clone, Serialize)]
pub struct SupplierPartView {
    #[serde(flatten)]
    pub supplier_part: supplier_part::Model,
    pub part: part::Model,
    pub supplier: company::Model,
    pub manufacturer: Option<company::Model>,
    pub url: String,
}

/// Companies and the parts they supply
#[derive(Clone)]
pub struct CompanyService {
    db: Arc<DatabaseConnection>,
}

impl CompanyService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self), err)]
    pub async fn get(&self, pk: i32) -> Result<company::Model, ServiceError> {
        CompanyEntity::find_by_id(pk)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Company", pk))
    }

    #[instrument(skip(self), err)]
    pub async fn list(&self, filter: CompanyFilter) -> Result<Vec<company::Model>, ServiceError> {
        let mut query = CompanyEntity::find();

        if let Some(supplier) = filter.is_supplier {
            query = query.filter(company::Column::IsSupplier.eq(supplier));
        }
        if let Some(manufacturer) = filter.is_manufacturer {
            query = query.filter(company::Column::IsManufacturer.eq(manufacturer));
        }
        if let Some(customer) = filter.is_customer {
            query = query.filter(company::Column::IsCustomer.eq(customer));
        }
        if let Some(search) = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            query = query.filter(
                Condition::any()
                    .add(company::Column::Name.contains(search))
                    .add(company::Column::Description.contains(search)),
            );
        }

        Ok(query
            .order_by_asc(company::Column::Name)
            .all(&*self.db)
            .await?)
    }

    pub async fn count(&self) -> Result<u64, ServiceError> {
        Ok(CompanyEntity::find().count(&*self.db).await?)
    }

    #[instrument(skip(self), err)]
    pub async fn supplier_part(&self, pk: i32) -> Result<SupplierPartView, ServiceError> {
        let row = SupplierPartEntity::find_by_id(pk)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("SupplierPart", pk))?;
        self.attach(vec![row])
            .await?
            .pop()
            .ok_or_else(|| ServiceError::not_found("SupplierPart", pk))
    }

    #[instrument(skip(self), err)]
    pub async fn supplier_parts(
        &self,
        filter: SupplierPartFilter,
    ) -> Result<Vec<SupplierPartView>, ServiceError> {
        let mut query = SupplierPartEntity::find();
        if let Some(part) = filter.part {
            query = query.filter(supplier_part::Column::PartId.eq(part));
        }
        if let Some(supplier) = filter.supplier {
            query = query.filter(supplier_part::Column::SupplierId.eq(supplier));
        }
        if let Some(manufacturer) = filter.manufacturer {
            query = query.filter(supplier_part::Column::ManufacturerId.eq(manufacturer));
        }

        let rows = query
            .order_by_asc(supplier_part::Column::Sku)
            .all(&*self.db)
            .await?;
        self.attach(rows).await
    }

    /// Load the parts and companies referenced by `rows` in two queries
    async fn attach(
        &self,
        rows: Vec<supplier_part::Model>,
    ) -> Result<Vec<SupplierPartView>, ServiceError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let part_ids: Vec<i32> = rows.iter().map(|r| r.part_id).collect();
        let company_ids: Vec<i32> = rows
            .iter()
            .flat_map(|r| std::iter::once(r.supplier_id).chain(r.manufacturer_id))
            .collect();

        let parts: HashMap<i32, part::Model> = PartEntity::find()
            .filter(part::Column::Id.is_in(part_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let companies: HashMap<i32, company::Model> = CompanyEntity::find()
            .filter(company::Column::Id.is_in(company_ids))
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        rows.into_iter()
            .map(|row| {
                let part = parts
                    .get(&row.part_id)
                    .cloned()
                    .ok_or_else(|| ServiceError::not_found("Part", row.part_id))?;
                let supplier = companies
                    .get(&row.supplier_id)
                    .cloned()
                    .ok_or_else(|| ServiceError::not_found("Company", row.supplier_id))?;
                let manufacturer = row
                    .manufacturer_id
                    .and_then(|id| companies.get(&id).cloned());
                Ok(SupplierPartView {
                    url: row.get_absolute_url(),
                    supplier_part: row,
                    part,
                    supplier,
                    manufacturer,
                })
            })
            .collect()
    }
}
