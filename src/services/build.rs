use chrono::{Local, NaiveDate};
use metrics::counter;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, Func, SimpleExpr},
    ActiveModelTrait,
    ActiveValue::Set,
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    entities::{
        build::{self, Entity as BuildEntity},
        part::{self, Entity as PartEntity},
        stock_item::{self, Entity as StockItemEntity},
    },
    errors::ServiceError,
    reference::{self, is_valid_reference},
    status::{BuildStatus, StockStatus},
};

/// Query filters for build listings
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BuildFilter {
    /// Numeric status code
    pub status: Option<i32>,
    pub active: Option<bool>,
    pub overdue: Option<bool>,
    pub part: Option<i32>,
    /// Case-insensitive exact reference match
    pub reference: Option<String>,
    /// Matches reference, title, part name or part IPN
    pub search: Option<String>,
    /// Field to order by, `-` prefix for descending; defaults to `-reference`
    pub ordering: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct CreateBuild {
    /// Generated from the latest reference when omitted
    pub reference: Option<String>,
    #[validate(length(max = 100))]
    #[serde(default)]
    pub title: String,
    pub part_id: i32,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub batch: Option<String>,
    pub target_date: Option<NaiveDate>,
    pub parent_id: Option<i32>,
    pub sales_order: Option<String>,
    #[validate(url)]
    pub link: Option<String>,
    pub notes: Option<String>,
    pub responsible: Option<i32>,
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBuild {
    #[validate(length(max = 100))]
    pub title: Option<String>,
    pub batch: Option<String>,
    /// `null` clears the target date
    #[serde(default, with = "double_option")]
    #[schema(value_type = Option<NaiveDate>)]
    pub target_date: Option<Option<NaiveDate>>,
    pub priority: Option<i32>,
    pub responsible: Option<i32>,
    #[validate(url)]
    pub link: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateOutput {
    pub quantity: Decimal,
    pub batch: Option<String>,
    pub location_id: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CompleteOutput {
    pub output_id: i32,
    pub location_id: Option<i32>,
    pub status: Option<StockStatus>,
}

mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

/// A build with its derived state, as shown to clients
#[derive(Debug, Clone, Serialize)]
pub struct BuildView {
    #[serde(flatten)]
    pub build: build::Model,
    pub status_label: &'static str,
    pub is_active: bool,
    pub is_complete: bool,
    pub is_overdue: bool,
    pub remaining: i32,
    pub url: String,
}

impl From<build::Model> for BuildView {
    fn from(build: build::Model) -> Self {
        Self {
            status_label: build.status.label(),
            is_active: build.is_active(),
            is_complete: build.is_complete(),
            is_overdue: build.is_overdue(today()),
            remaining: build.remaining(),
            url: build.get_absolute_url(),
            build,
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Build order lifecycle
#[derive(Clone)]
pub struct BuildService {
    db: Arc<DatabaseConnection>,
}

impl BuildService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self), err)]
    pub async fn get(&self, pk: i32) -> Result<build::Model, ServiceError> {
        find_build(&*self.db, pk).await
    }

    pub async fn get_by_reference(&self, reference: &str) -> Result<build::Model, ServiceError> {
        BuildEntity::find()
            .filter(reference_iexact(reference))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Build {} not found", reference)))
    }

    pub async fn count(&self) -> Result<u64, ServiceError> {
        Ok(BuildEntity::find().count(&*self.db).await?)
    }

    #[instrument(skip(self), err)]
    pub async fn list(&self, filter: BuildFilter) -> Result<Vec<build::Model>, ServiceError> {
        let mut query = BuildEntity::find();
        let active_codes = BuildStatus::active_codes();

        if let Some(code) = filter.status {
            let status = BuildStatus::from_code(code).ok_or_else(|| {
                ServiceError::ValidationError(format!("Unknown build status code {}", code))
            })?;
            query = query.filter(build::Column::Status.eq(status.code()));
        }

        match filter.active {
            Some(true) => query = query.filter(build::Column::Status.is_in(active_codes.clone())),
            Some(false) => {
                query = query.filter(build::Column::Status.is_not_in(active_codes.clone()))
            }
            None => {}
        }

        let overdue = Condition::all()
            .add(build::Column::Status.is_in(active_codes.clone()))
            .add(build::Column::TargetDate.is_not_null())
            .add(build::Column::TargetDate.lt(today()));
        match filter.overdue {
            Some(true) => query = query.filter(overdue),
            Some(false) => query = query.filter(overdue.not()),
            None => {}
        }

        if let Some(part) = filter.part {
            query = query.filter(build::Column::PartId.eq(part));
        }

        if let Some(reference) = filter
            .reference
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            query = query.filter(reference_iexact(reference));
        }

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.inner_join(PartEntity).filter(
                Condition::any()
                    .add(build::Column::Reference.contains(search))
                    .add(build::Column::Title.contains(search))
                    .add(part::Column::Name.contains(search))
                    .add(part::Column::Ipn.contains(search)),
            );
        }

        let ordering = filter.ordering.as_deref().unwrap_or("-reference");
        let (descending, field) = match ordering.strip_prefix('-') {
            Some(field) => (true, field),
            None => (false, ordering),
        };
        let column = match field {
            "reference" => build::Column::ReferenceInt,
            "title" => build::Column::Title,
            "quantity" => build::Column::Quantity,
            "status" => build::Column::Status,
            "creation_date" => build::Column::CreationDate,
            "target_date" => build::Column::TargetDate,
            "completion_date" => build::Column::CompletionDate,
            "priority" => build::Column::Priority,
            other => {
                return Err(ServiceError::ValidationError(format!(
                    "Cannot order builds by '{}'",
                    other
                )))
            }
        };
        query = if descending {
            query.order_by_desc(column)
        } else {
            query.order_by_asc(column)
        };

        Ok(query
            .order_by_desc(build::Column::Id)
            .all(&*self.db)
            .await?)
    }

    #[instrument(skip(self), err)]
    pub async fn create(
        &self,
        input: CreateBuild,
        issued_by: Option<i32>,
    ) -> Result<build::Model, ServiceError> {
        input.validate()?;
        let db = &*self.db;

        let part = PartEntity::find_by_id(input.part_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Part", input.part_id))?;
        if !part.assembly {
            return Err(ServiceError::ValidationError(format!(
                "Part '{}' is not an assembly",
                part.full_name()
            )));
        }
        if !part.active {
            return Err(ServiceError::ValidationError(format!(
                "Part '{}' is inactive",
                part.full_name()
            )));
        }

        if let Some(parent) = input.parent_id {
            find_build(db, parent).await?;
        }

        let reference = match input.reference.as_deref().map(str::trim) {
            Some(reference) if !reference.is_empty() => reference.to_string(),
            _ => self.next_reference().await?,
        };
        if !is_valid_reference(&reference) {
            return Err(ServiceError::ValidationError(format!(
                "Reference '{}' must match pattern {}####",
                reference,
                reference::BUILD_REFERENCE_PREFIX
            )));
        }
        if reference::reference_number(&reference).is_none() {
            return Err(ServiceError::ValidationError(format!(
                "Reference number of '{}' exceeds {}",
                reference,
                i32::MAX
            )));
        }
        match self.get_by_reference(&reference).await {
            Ok(_) => return Err(duplicate_reference(&reference)),
            Err(ServiceError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        let created = build::ActiveModel {
            reference: Set(reference.clone()),
            title: Set(input.title),
            part_id: Set(part.id),
            quantity: Set(input.quantity),
            batch: Set(input.batch),
            status: Set(BuildStatus::Pending),
            target_date: Set(input.target_date),
            parent_id: Set(input.parent_id),
            sales_order: Set(input.sales_order),
            link: Set(input.link),
            notes: Set(input.notes),
            responsible: Set(input.responsible),
            priority: Set(input.priority),
            issued_by: Set(issued_by),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|e| match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => duplicate_reference(&reference),
            _ => ServiceError::from(e),
        })?;

        counter!("mrp_build.created", 1);
        info!(build_id = created.id, reference = %created, "Build order created");
        Ok(created)
    }

    #[instrument(skip(self), err)]
    pub async fn update(&self, pk: i32, input: UpdateBuild) -> Result<build::Model, ServiceError> {
        input.validate()?;
        let existing = self.get(pk).await?;
        let mut active: build::ActiveModel = existing.into();

        if let Some(title) = input.title {
            active.title = Set(title);
        }
        if let Some(batch) = input.batch {
            active.batch = Set(Some(batch));
        }
        if let Some(target_date) = input.target_date {
            active.target_date = Set(target_date);
        }
        if let Some(priority) = input.priority {
            active.priority = Set(priority);
        }
        if let Some(responsible) = input.responsible {
            active.responsible = Set(Some(responsible));
        }
        if let Some(link) = input.link {
            active.link = Set(Some(link));
        }
        if let Some(notes) = input.notes {
            active.notes = Set(Some(notes));
        }

        Ok(active.update(&*self.db).await?)
    }

    /// Reference after the highest one in use
    pub async fn next_reference(&self) -> Result<String, ServiceError> {
        let latest = BuildEntity::find()
            .order_by_desc(build::Column::ReferenceInt)
            .one(&*self.db)
            .await?;
        Ok(reference::next_reference(
            latest.as_ref().map(|b| b.reference.as_str()),
        )?)
    }

    /// Cancel an active build. Incomplete outputs are deleted when requested.
    #[instrument(skip(self), err)]
    pub async fn cancel_build(
        &self,
        pk: i32,
        user: Option<i32>,
        remove_incomplete_outputs: bool,
    ) -> Result<build::Model, ServiceError> {
        let txn = self.db.begin().await?;

        transition(
            &txn,
            pk,
            &BuildStatus::ACTIVE,
            BuildStatus::Cancelled,
            vec![
                (build::Column::CompletionDate, Expr::value(today())),
                (build::Column::CompletedBy, Expr::value(user)),
            ],
        )
        .await?;

        if remove_incomplete_outputs {
            let removed = StockItemEntity::delete_many()
                .filter(stock_item::Column::BuildId.eq(pk))
                .filter(stock_item::Column::IsBuilding.eq(true))
                .exec(&txn)
                .await?;
            info!(
                build_id = pk,
                removed = removed.rows_affected,
                "Removed incomplete build outputs"
            );
        }

        let cancelled = find_build(&txn, pk).await?;
        txn.commit().await?;

        counter!("mrp_build.cancelled", 1);
        info!(build_id = pk, reference = %cancelled, "Build order cancelled");
        Ok(cancelled)
    }

    #[instrument(skip(self), err)]
    pub async fn hold(&self, pk: i32) -> Result<build::Model, ServiceError> {
        transition(
            &*self.db,
            pk,
            &[BuildStatus::Pending, BuildStatus::Production],
            BuildStatus::OnHold,
            Vec::new(),
        )
        .await?;
        counter!("mrp_build.held", 1);
        info!(build_id = pk, "Build order placed on hold");
        self.get(pk).await
    }

    #[instrument(skip(self), err)]
    pub async fn issue(&self, pk: i32) -> Result<build::Model, ServiceError> {
        transition(
            &*self.db,
            pk,
            &[BuildStatus::Pending, BuildStatus::OnHold],
            BuildStatus::Production,
            Vec::new(),
        )
        .await?;
        counter!("mrp_build.issued", 1);
        info!(build_id = pk, "Build order issued");
        self.get(pk).await
    }

    /// Create a stock item in production against the build
    #[instrument(skip(self), err)]
    pub async fn create_output(
        &self,
        pk: i32,
        input: CreateOutput,
    ) -> Result<stock_item::Model, ServiceError> {
        let db = &*self.db;
        let build = find_build(db, pk).await?;
        if !build.is_active() {
            return Err(ServiceError::InvalidOperation(format!(
                "Build {} is not active",
                build
            )));
        }
        if input.quantity <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "Quantity must be greater than zero".to_string(),
            ));
        }

        let part = PartEntity::find_by_id(build.part_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Part", build.part_id))?;
        if part.trackable && !input.quantity.fract().is_zero() {
            return Err(ServiceError::ValidationError(
                "Quantity must be an integer value for trackable parts".to_string(),
            ));
        }

        let output = stock_item::ActiveModel {
            part_id: Set(part.id),
            location_id: Set(input.location_id.or(part.default_location_id)),
            build_id: Set(Some(build.id)),
            quantity: Set(input.quantity),
            batch: Set(input.batch.or_else(|| build.batch.clone())),
            status: Set(StockStatus::Ok),
            is_building: Set(true),
            ..Default::default()
        }
        .insert(db)
        .await?;

        counter!("mrp_build.outputs_created", 1);
        info!(
            build_id = pk,
            output_id = output.id,
            quantity = %output.quantity,
            "Build output created"
        );
        Ok(output)
    }

    /// Mark an in-production output as finished and count it towards the build
    #[instrument(skip(self), err)]
    pub async fn complete_output(
        &self,
        pk: i32,
        input: CompleteOutput,
    ) -> Result<stock_item::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let build = find_build(&txn, pk).await?;
        if !build.is_active() {
            return Err(ServiceError::InvalidOperation(format!(
                "Build {} is not active",
                build
            )));
        }

        let output = StockItemEntity::find_by_id(input.output_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("StockItem", input.output_id))?;
        if output.build_id != Some(pk) {
            return Err(ServiceError::ValidationError(format!(
                "Stock item {} is not an output of build {}",
                output.id, build
            )));
        }
        if !output.is_building {
            return Err(ServiceError::InvalidOperation(format!(
                "Build output {} is already complete",
                output.id
            )));
        }
        if !output.quantity.fract().is_zero() {
            warn!(
                build_id = pk,
                output_id = output.id,
                quantity = %output.quantity,
                "Fractional output quantity, only whole units count as completed"
            );
        }
        let completed = output.quantity.trunc().to_i32().ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "Output quantity {} out of range",
                output.quantity
            ))
        })?;

        let mut active: stock_item::ActiveModel = output.into();
        active.is_building = Set(false);
        if let Some(location) = input.location_id {
            active.location_id = Set(Some(location));
        }
        if let Some(status) = input.status {
            active.status = Set(status);
        }
        let finished = active.update(&txn).await?;

        BuildEntity::update_many()
            .col_expr(
                build::Column::Completed,
                Expr::col(build::Column::Completed).add(completed),
            )
            .filter(build::Column::Id.eq(pk))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        counter!("mrp_build.outputs_completed", 1);
        info!(build_id = pk, output_id = finished.id, "Build output completed");
        Ok(finished)
    }

    /// Complete an active build.
    ///
    /// Fails while outputs are still in production, and when fewer units than
    /// ordered are finished unless `accept_incomplete` is set.
    #[instrument(skip(self), err)]
    pub async fn complete_build(
        &self,
        pk: i32,
        user: Option<i32>,
        accept_incomplete: bool,
    ) -> Result<build::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let build = find_build(&txn, pk).await?;
        if !build.is_active() {
            return Err(ServiceError::InvalidOperation(format!(
                "Build {} is not active",
                build
            )));
        }

        let incomplete = StockItemEntity::find()
            .filter(stock_item::Column::BuildId.eq(pk))
            .filter(stock_item::Column::IsBuilding.eq(true))
            .count(&txn)
            .await?;
        if incomplete > 0 {
            return Err(ServiceError::InvalidOperation(format!(
                "Build {} has {} incomplete outputs",
                build, incomplete
            )));
        }

        if build.remaining() > 0 {
            if !accept_incomplete {
                return Err(ServiceError::InvalidOperation(format!(
                    "Build {} has {} units remaining",
                    build,
                    build.remaining()
                )));
            }
            warn!(
                build_id = pk,
                remaining = build.remaining(),
                "Completing build with incomplete quantity"
            );
        }

        transition(
            &txn,
            pk,
            &BuildStatus::ACTIVE,
            BuildStatus::Complete,
            vec![
                (build::Column::CompletionDate, Expr::value(today())),
                (build::Column::CompletedBy, Expr::value(user)),
            ],
        )
        .await?;

        let completed = find_build(&txn, pk).await?;
        txn.commit().await?;

        counter!("mrp_build.completed", 1);
        info!(build_id = pk, reference = %completed, "Build order completed");
        Ok(completed)
    }

    /// Stock items produced by the build; `complete` narrows to finished or in-production items
    #[instrument(skip(self), err)]
    pub async fn outputs(
        &self,
        pk: i32,
        complete: Option<bool>,
    ) -> Result<Vec<stock_item::Model>, ServiceError> {
        find_build(&*self.db, pk).await?;

        let mut query = StockItemEntity::find().filter(stock_item::Column::BuildId.eq(pk));
        if let Some(complete) = complete {
            query = query.filter(stock_item::Column::IsBuilding.eq(!complete));
        }
        Ok(query
            .order_by_asc(stock_item::Column::Id)
            .all(&*self.db)
            .await?)
    }
}

fn duplicate_reference(reference: &str) -> ServiceError {
    ServiceError::Conflict(format!("Build reference {} already exists", reference))
}

fn reference_iexact(reference: &str) -> SimpleExpr {
    Expr::expr(Func::upper(Expr::col((BuildEntity, build::Column::Reference))))
        .eq(reference.trim().to_uppercase())
}

async fn find_build<C: ConnectionTrait>(conn: &C, pk: i32) -> Result<build::Model, ServiceError> {
    BuildEntity::find_by_id(pk)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Build", pk))
}

/// Move build `pk` to `to`, but only while its status is one of `from`.
///
/// The status check is part of the UPDATE so two concurrent transitions
/// cannot both succeed.
async fn transition<C: ConnectionTrait>(
    conn: &C,
    pk: i32,
    from: &[BuildStatus],
    to: BuildStatus,
    extra: Vec<(build::Column, SimpleExpr)>,
) -> Result<(), ServiceError> {
    let mut update = BuildEntity::update_many()
        .col_expr(build::Column::Status, Expr::value(to.code()))
        .filter(build::Column::Id.eq(pk))
        .filter(build::Column::Status.is_in(from.iter().map(|s| s.code())));
    for (column, value) in extra {
        update = update.col_expr(column, value);
    }

    let result = update.exec(conn).await?;
    if result.rows_affected == 0 {
        let current = find_build(conn, pk).await?;
        return Err(ServiceError::InvalidOperation(format!(
            "Build {} cannot move from {} to {}",
            current,
            current.status.label(),
            to.label()
        )));
    }
    Ok(())
}
