use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "waiting_lists")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub invitation_id: Uuid,
    pub auto_rsvp: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::workshop_invitations::Entity",
        from = "Column::InvitationId",
        to = "super::workshop_invitations::Column::Id"
    )]
    Invitation,
}

impl Related<super::workshop_invitations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Invitation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for crate::models::WaitingListEntry {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            invitation_id: model.invitation_id,
            auto_rsvp: model.auto_rsvp,
            created_at: model.created_at.into(),
        }
    }
}
