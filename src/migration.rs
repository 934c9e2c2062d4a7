//! Schema migrations. Tables are derived from the entity definitions so the
//! same migration runs on PostgreSQL and on SQLite.

use sea_orm::Schema;
use sea_orm_migration::prelude::*;

use crate::entity::{
    CartItems, Carts, Categories, OrderItems, OrderStatusHistory, Orders, Products, Reviews,
    Users, reviews,
};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateStoreTables)]
    }
}

struct CreateStoreTables;

impl MigrationName for CreateStoreTables {
    fn name(&self) -> &str {
        "m20250101_000001_create_store_tables"
    }
}

const REVIEW_UNIQUE_INDEX: &str = "ux_reviews_product_user";

#[async_trait::async_trait]
impl MigrationTrait for CreateStoreTables {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());

        // Referenced tables first so PostgreSQL can resolve every foreign key.
        manager
            .create_table(schema.create_table_from_entity(Users).if_not_exists().to_owned())
            .await?;
        manager
            .create_table(schema.create_table_from_entity(Categories).if_not_exists().to_owned())
            .await?;
        manager
            .create_table(schema.create_table_from_entity(Products).if_not_exists().to_owned())
            .await?;
        manager
            .create_table(schema.create_table_from_entity(Carts).if_not_exists().to_owned())
            .await?;
        manager
            .create_table(schema.create_table_from_entity(CartItems).if_not_exists().to_owned())
            .await?;
        manager
            .create_table(schema.create_table_from_entity(Orders).if_not_exists().to_owned())
            .await?;
        manager
            .create_table(schema.create_table_from_entity(OrderItems).if_not_exists().to_owned())
            .await?;
        manager
            .create_table(
                schema
                    .create_table_from_entity(OrderStatusHistory)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(schema.create_table_from_entity(Reviews).if_not_exists().to_owned())
            .await?;

        manager
            .create_index(
                Index::create()
                    .name(REVIEW_UNIQUE_INDEX)
                    .table(Reviews)
                    .col(reviews::Column::ProductId)
                    .col(reviews::Column::UserId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name(REVIEW_UNIQUE_INDEX).table(Reviews).to_owned())
            .await?;
        for table in [
            Reviews.into_table_ref(),
            OrderStatusHistory.into_table_ref(),
            OrderItems.into_table_ref(),
            Orders.into_table_ref(),
            CartItems.into_table_ref(),
            Carts.into_table_ref(),
            Products.into_table_ref(),
            Categories.into_table_ref(),
            Users.into_table_ref(),
        ] {
            manager
                .drop_table(Table::drop().table(table).if_exists().to_owned())
                .await?;
        }
        Ok(())
    }
}
