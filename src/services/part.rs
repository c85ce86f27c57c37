use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::IntoParams;

use crate::{
    entities::{
        part::{self, Entity as PartEntity},
        part_category::{self, Entity as PartCategoryEntity},
    },
    errors::ServiceError,
};

/// Outcome of looking a part up by its internal part number
#[derive(Debug, Clone, PartialEq)]
pub enum IpnMatch {
    None,
    Unique(part::Model),
    /// IPNs are not unique; the count of parts sharing it
    Multiple(u64),
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PartFilter {
    pub category: Option<i32>,
    pub active: Option<bool>,
    pub assembly: Option<bool>,
    /// Matches name, IPN, description or keywords
    pub search: Option<String>,
}

/// Part catalog queries
#[derive(Clone)]
pub struct PartService {
    db: Arc<DatabaseConnection>,
}

impl PartService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self), err)]
    pub async fn get(&self, pk: i32) -> Result<part::Model, ServiceError> {
        PartEntity::find_by_id(pk)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Part", pk))
    }

    #[instrument(skip(self), err)]
    pub async fn list(&self, filter: PartFilter) -> Result<Vec<part::Model>, ServiceError> {
        let mut query = PartEntity::find();

        if let Some(category) = filter.category {
            query = query.filter(part::Column::CategoryId.eq(category));
        }
        if let Some(active) = filter.active {
            query = query.filter(part::Column::Active.eq(active));
        }
        if let Some(assembly) = filter.assembly {
            query = query.filter(part::Column::Assembly.eq(assembly));
        }
        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                Condition::any()
                    .add(part::Column::Name.contains(search))
                    .add(part::Column::Ipn.contains(search))
                    .add(part::Column::Description.contains(search))
                    .add(part::Column::Keywords.contains(search)),
            );
        }

        Ok(query
            .order_by_asc(part::Column::Name)
            .order_by_asc(part::Column::Id)
            .all(&*self.db)
            .await?)
    }

    /// All parts whose IPN equals `ipn` exactly
    #[instrument(skip(self), err)]
    pub async fn find_by_ipn(&self, ipn: &str) -> Result<Vec<part::Model>, ServiceError> {
        Ok(PartEntity::find()
            .filter(part::Column::Ipn.eq(ipn))
            .order_by_asc(part::Column::Id)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self), err)]
    pub async fn resolve_ipn(&self, ipn: &str) -> Result<IpnMatch, ServiceError> {
        let mut parts = self.find_by_ipn(ipn).await?;
        Ok(match parts.len() {
            0 => IpnMatch::None,
            1 => IpnMatch::Unique(parts.remove(0)),
            n => IpnMatch::Multiple(n as u64),
        })
    }

    #[instrument(skip(self), err)]
    pub async fn set_ipn(&self, pk: i32, ipn: Option<String>) -> Result<part::Model, ServiceError> {
        let existing = self.get(pk).await?;
        let mut active: part::ActiveModel = existing.into();
        active.ipn = Set(ipn);
        let updated = active.update(&*self.db).await?;
        info!(part_id = pk, ipn = ?updated.ipn, "Part IPN updated");
        Ok(updated)
    }

    pub async fn count(&self) -> Result<u64, ServiceError> {
        Ok(PartEntity::find().count(&*self.db).await?)
    }

    #[instrument(skip(self), err)]
    pub async fn category(&self, pk: i32) -> Result<part_category::Model, ServiceError> {
        PartCategoryEntity::find_by_id(pk)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("PartCategory", pk))
    }

    /// Category of `part`, if it has one
    pub async fn category_of(
        &self,
        part: &part::Model,
    ) -> Result<Option<part_category::Model>, ServiceError> {
        match part.category_id {
            Some(id) => Ok(PartCategoryEntity::find_by_id(id).one(&*self.db).await?),
            None => Ok(None),
        }
    }

    pub async fn categories(&self) -> Result<Vec<part_category::Model>, ServiceError> {
        Ok(PartCategoryEntity::find()
            .order_by_asc(part_category::Column::Name)
            .all(&*self.db)
            .await?)
    }

    pub async fn child_categories(
        &self,
        pk: i32,
    ) -> Result<Vec<part_category::Model>, ServiceError> {
        Ok(PartCategoryEntity::find()
            .filter(part_category::Column::ParentId.eq(pk))
            .order_by_asc(part_category::Column::Name)
            .all(&*self.db)
            .await?)
    }

    /// Ancestors of category `pk` from the root down, ending with the category itself
    #[instrument(skip(self), err)]
    pub async fn category_path(
        &self,
        pk: i32,
    ) -> Result<Vec<part_category::Model>, ServiceError> {
        let mut path = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(pk);

        while let Some(id) = next {
            if !seen.insert(id) {
                return Err(ServiceError::InternalError(format!(
                    "Category tree contains a cycle at {}",
                    id
                )));
            }
            let category = self.category(id).await?;
            next = category.parent_id;
            path.push(category);
        }

        path.reverse();
        Ok(path)
    }
}
