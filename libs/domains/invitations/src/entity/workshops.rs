use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "workshops")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub chapter_id: Uuid,
    /// Hosting sponsor.
    pub host_id: Option<Uuid>,
    pub title: String,
    pub date_and_time: DateTimeWithTimeZone,
    pub invitable: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::Workshop {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            chapter_id: model.chapter_id,
            host_id: model.host_id,
            title: model.title,
            date_and_time: model.date_and_time.into(),
            invitable: model.invitable,
        }
    }
}
