use crate::models::{NewWorkshopInvitation, Role, WorkshopInvitation};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "workshop_invitations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub workshop_id: Uuid,
    pub member_id: Uuid,
    pub role: Role,
    pub attending: Option<bool>,
    #[sea_orm(unique)]
    pub token: String,
    pub reminded_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::waiting_lists::Entity")]
    WaitingLists,
}

impl Related<super::waiting_lists::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WaitingLists.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for WorkshopInvitation {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            workshop_id: model.workshop_id,
            member_id: model.member_id,
            role: model.role,
            attending: model.attending,
            token: model.token,
            reminded_at: model.reminded_at.map(Into::into),
            created_at: model.created_at.into(),
        }
    }
}

impl From<NewWorkshopInvitation> for ActiveModel {
    fn from(input: NewWorkshopInvitation) -> Self {
        let invitation = input.into_invitation();

        ActiveModel {
            id: Set(invitation.id),
            workshop_id: Set(invitation.workshop_id),
            member_id: Set(invitation.member_id),
            role: Set(invitation.role),
            attending: Set(None),
            token: Set(invitation.token),
            reminded_at: Set(None),
            created_at: Set(invitation.created_at.into()),
        }
    }
}
