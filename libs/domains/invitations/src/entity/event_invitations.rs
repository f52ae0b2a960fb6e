use crate::models::{EventInvitation, NewEventInvitation, Role};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "event_invitations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub event_id: Uuid,
    pub member_id: Uuid,
    pub role: Role,
    pub attending: Option<bool>,
    #[sea_orm(unique)]
    pub token: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for EventInvitation {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            event_id: model.event_id,
            member_id: model.member_id,
            role: model.role,
            attending: model.attending,
            token: model.token,
            created_at: model.created_at.into(),
        }
    }
}

impl From<NewEventInvitation> for ActiveModel {
    fn from(input: NewEventInvitation) -> Self {
        let invitation = input.into_invitation();

        ActiveModel {
            id: Set(invitation.id),
            event_id: Set(invitation.event_id),
            member_id: Set(invitation.member_id),
            role: Set(invitation.role),
            attending: Set(None),
            token: Set(invitation.token),
            created_at: Set(invitation.created_at.into()),
        }
    }
}
