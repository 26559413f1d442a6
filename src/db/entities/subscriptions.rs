use crate::db::types::RoomTypes;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Deserialize, Serialize)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub line_user_id: String,
    pub unit_id: i32,
    #[sea_orm(column_type = "Json")]
    pub room_types: RoomTypes,
    /// Set when the subscription is retired; the row is kept for reactivation
    pub deleted_at: Option<DateTime>,
    pub created_at: DateTime,
}

impl Model {
    #[allow(dead_code)]
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::LineUserId",
        to = "super::users::Column::LineUserId",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::units::Entity",
        from = "Column::UnitId",
        to = "super::units::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Unit,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::units::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Unit.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
