use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_users_table::Migration),
            Box::new(m20240101_000002_create_catalog_tables::Migration),
            Box::new(m20240101_000003_create_bom_items_table::Migration),
            Box::new(m20240101_000004_create_build_tables::Migration),
        ]
    }
}

mod m20240101_000001_create_users_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Users::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Users::Username)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::Email).string().not_null())
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(
                            ColumnDef::new(Users::IsSuperuser)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Users::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Users::Roles)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Users::DateJoined)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum Users {
        Table,
        Id,
        Username,
        Email,
        PasswordHash,
        IsSuperuser,
        IsActive,
        Roles,
        DateJoined,
    }
}

mod m20240101_000002_create_catalog_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockLocations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockLocations::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(StockLocations::Name).string().not_null())
                        .col(
                            ColumnDef::new(StockLocations::Description)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(ColumnDef::new(StockLocations::ParentId).integer().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_locations_parent")
                                .from(StockLocations::Table, StockLocations::ParentId)
                                .to(StockLocations::Table, StockLocations::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PartCategories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PartCategories::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(PartCategories::Name).string().not_null())
                        .col(
                            ColumnDef::new(PartCategories::Description)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(ColumnDef::new(PartCategories::ParentId).integer().null())
                        .col(
                            ColumnDef::new(PartCategories::DefaultLocationId)
                                .integer()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_part_categories_parent")
                                .from(PartCategories::Table, PartCategories::ParentId)
                                .to(PartCategories::Table, PartCategories::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_part_categories_default_location")
                                .from(PartCategories::Table, PartCategories::DefaultLocationId)
                                .to(StockLocations::Table, StockLocations::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Companies::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Companies::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Companies::Name).string().not_null())
                        .col(
                            ColumnDef::new(Companies::Description)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(ColumnDef::new(Companies::Website).string().null())
                        .col(
                            ColumnDef::new(Companies::IsCustomer)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Companies::IsSupplier)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Companies::IsManufacturer)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Companies::Currency)
                                .string_len(3)
                                .not_null()
                                .default("USD"),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Parts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Parts::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Parts::Name).string().not_null())
                        .col(
                            ColumnDef::new(Parts::Description)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(ColumnDef::new(Parts::Ipn).string().null())
                        .col(ColumnDef::new(Parts::Revision).string().null())
                        .col(ColumnDef::new(Parts::CategoryId).integer().null())
                        .col(ColumnDef::new(Parts::DefaultLocationId).integer().null())
                        .col(ColumnDef::new(Parts::Units).string().not_null().default(""))
                        .col(ColumnDef::new(Parts::Keywords).string().null())
                        .col(ColumnDef::new(Parts::Active).boolean().not_null().default(true))
                        .col(
                            ColumnDef::new(Parts::Assembly)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Parts::Component)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Parts::Purchaseable)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Parts::Salable)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Parts::Trackable)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Parts::IsTemplate)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Parts::VirtualPart)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Parts::MinimumStock)
                                .decimal_len(15, 5)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Parts::CreationDate).date().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_parts_category")
                                .from(Parts::Table, Parts::CategoryId)
                                .to(PartCategories::Table, PartCategories::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_parts_default_location")
                                .from(Parts::Table, Parts::DefaultLocationId)
                                .to(StockLocations::Table, StockLocations::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            // IPN lookups hit this on every barcode scan
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_parts_ipn")
                        .table(Parts::Table)
                        .col(Parts::Ipn)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_parts_category_id")
                        .table(Parts::Table)
                        .col(Parts::CategoryId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SupplierParts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SupplierParts::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(SupplierParts::PartId).integer().not_null())
                        .col(ColumnDef::new(SupplierParts::SupplierId).integer().not_null())
                        .col(ColumnDef::new(SupplierParts::Sku).string().not_null())
                        .col(ColumnDef::new(SupplierParts::ManufacturerId).integer().null())
                        .col(ColumnDef::new(SupplierParts::Mpn).string().null())
                        .col(ColumnDef::new(SupplierParts::Description).string().null())
                        .col(ColumnDef::new(SupplierParts::Link).string().null())
                        .col(
                            ColumnDef::new(SupplierParts::PackQuantity)
                                .decimal_len(15, 5)
                                .not_null()
                                .default(1),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_supplier_parts_part")
                                .from(SupplierParts::Table, SupplierParts::PartId)
                                .to(Parts::Table, Parts::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_supplier_parts_supplier")
                                .from(SupplierParts::Table, SupplierParts::SupplierId)
                                .to(Companies::Table, Companies::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_supplier_parts_manufacturer")
                                .from(SupplierParts::Table, SupplierParts::ManufacturerId)
                                .to(Companies::Table, Companies::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(SupplierParts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Parts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Companies::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PartCategories::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockLocations::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub enum StockLocations {
        Table,
        Id,
        Name,
        Description,
        ParentId,
    }

    #[derive(DeriveIden)]
    pub enum PartCategories {
        Table,
        Id,
        Name,
        Description,
        ParentId,
        DefaultLocationId,
    }

    #[derive(DeriveIden)]
    pub enum Companies {
        Table,
        Id,
        Name,
        Description,
        Website,
        IsCustomer,
        IsSupplier,
        IsManufacturer,
        Currency,
    }

    #[derive(DeriveIden)]
    pub enum Parts {
        Table,
        Id,
        Name,
        Description,
        Ipn,
        Revision,
        CategoryId,
        DefaultLocationId,
        Units,
        Keywords,
        Active,
        Assembly,
        Component,
        Purchaseable,
        Salable,
        Trackable,
        IsTemplate,
        VirtualPart,
        MinimumStock,
        CreationDate,
    }

    #[derive(DeriveIden)]
    pub enum SupplierParts {
        Table,
        Id,
        PartId,
        SupplierId,
        Sku,
        ManufacturerId,
        Mpn,
        Description,
        Link,
        PackQuantity,
    }
}

mod m20240101_000003_create_bom_items_table {
    use super::m20240101_000002_create_catalog_tables::Parts;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_bom_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(BomItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BomItems::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(BomItems::PartId).integer().not_null())
                        .col(ColumnDef::new(BomItems::SubPartId).integer().not_null())
                        .col(
                            ColumnDef::new(BomItems::Quantity)
                                .decimal_len(15, 5)
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(BomItems::Reference)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(BomItems::Overage)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(ColumnDef::new(BomItems::Note).string().not_null().default(""))
                        .col(
                            ColumnDef::new(BomItems::Optional)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(BomItems::Consumable)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(BomItems::AllowVariants)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(BomItems::Inherited)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_bom_items_part")
                                .from(BomItems::Table, BomItems::PartId)
                                .to(Parts::Table, Parts::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_bom_items_sub_part")
                                .from(BomItems::Table, BomItems::SubPartId)
                                .to(Parts::Table, Parts::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_bom_items_part_id")
                        .table(BomItems::Table)
                        .col(BomItems::PartId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BomItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum BomItems {
        Table,
        Id,
        PartId,
        SubPartId,
        Quantity,
        Reference,
        Overage,
        Note,
        Optional,
        Consumable,
        AllowVariants,
        Inherited,
    }
}

mod m20240101_000004_create_build_tables {
    use super::m20240101_000001_create_users_table::Users;
    use super::m20240101_000002_create_catalog_tables::{Parts, StockLocations};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_build_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Builds::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Builds::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Builds::Reference)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Builds::ReferenceInt)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Builds::Title).string().not_null().default(""))
                        .col(ColumnDef::new(Builds::PartId).integer().not_null())
                        .col(ColumnDef::new(Builds::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(Builds::Completed)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Builds::Batch).string().null())
                        .col(ColumnDef::new(Builds::Status).integer().not_null().default(10))
                        .col(ColumnDef::new(Builds::CreationDate).date().not_null())
                        .col(ColumnDef::new(Builds::TargetDate).date().null())
                        .col(ColumnDef::new(Builds::CompletionDate).date().null())
                        .col(ColumnDef::new(Builds::IssuedBy).integer().null())
                        .col(ColumnDef::new(Builds::CompletedBy).integer().null())
                        .col(ColumnDef::new(Builds::Responsible).integer().null())
                        .col(ColumnDef::new(Builds::Priority).integer().not_null().default(0))
                        .col(ColumnDef::new(Builds::ParentId).integer().null())
                        .col(ColumnDef::new(Builds::SalesOrder).string().null())
                        .col(ColumnDef::new(Builds::Link).string().null())
                        .col(ColumnDef::new(Builds::Notes).text().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_builds_part")
                                .from(Builds::Table, Builds::PartId)
                                .to(Parts::Table, Parts::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_builds_parent")
                                .from(Builds::Table, Builds::ParentId)
                                .to(Builds::Table, Builds::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_builds_completed_by")
                                .from(Builds::Table, Builds::CompletedBy)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_builds_status")
                        .table(Builds::Table)
                        .col(Builds::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockItems::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(StockItems::PartId).integer().not_null())
                        .col(ColumnDef::new(StockItems::LocationId).integer().null())
                        .col(ColumnDef::new(StockItems::BuildId).integer().null())
                        .col(
                            ColumnDef::new(StockItems::Quantity)
                                .decimal_len(15, 5)
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(StockItems::Batch).string().null())
                        .col(ColumnDef::new(StockItems::Serial).string().null())
                        .col(
                            ColumnDef::new(StockItems::Status)
                                .integer()
                                .not_null()
                                .default(10),
                        )
                        .col(
                            ColumnDef::new(StockItems::IsBuilding)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(StockItems::CreationDate).date().not_null())
                        .col(ColumnDef::new(StockItems::Notes).text().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_items_part")
                                .from(StockItems::Table, StockItems::PartId)
                                .to(Parts::Table, Parts::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_items_location")
                                .from(StockItems::Table, StockItems::LocationId)
                                .to(StockLocations::Table, StockLocations::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_stock_items_build")
                                .from(StockItems::Table, StockItems::BuildId)
                                .to(Builds::Table, Builds::Id)
                                .on_delete(ForeignKeyAction::SetNull),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_stock_items_build_id")
                        .table(StockItems::Table)
                        .col(StockItems::BuildId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Builds::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Builds {
        Table,
        Id,
        Reference,
        ReferenceInt,
        Title,
        PartId,
        Quantity,
        Completed,
        Batch,
        Status,
        CreationDate,
        TargetDate,
        CompletionDate,
        IssuedBy,
        CompletedBy,
        Responsible,
        Priority,
        ParentId,
        SalesOrder,
        Link,
        Notes,
    }

    #[derive(DeriveIden)]
    enum StockItems {
        Table,
        Id,
        PartId,
        LocationId,
        BuildId,
        Quantity,
        Batch,
        Serial,
        Status,
        IsBuilding,
        CreationDate,
        Notes,
    }
}
