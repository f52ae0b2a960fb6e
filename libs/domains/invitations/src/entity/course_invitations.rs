use crate::models::{CourseInvitation, NewCourseInvitation};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "course_invitations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub course_id: Uuid,
    pub member_id: Uuid,
    pub attending: Option<bool>,
    #[sea_orm(unique)]
    pub token: String,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for CourseInvitation {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            course_id: model.course_id,
            member_id: model.member_id,
            attending: model.attending,
            token: model.token,
            created_at: model.created_at.into(),
        }
    }
}

impl From<NewCourseInvitation> for ActiveModel {
    fn from(input: NewCourseInvitation) -> Self {
        let invitation = input.into_invitation();

        ActiveModel {
            id: Set(invitation.id),
            course_id: Set(invitation.course_id),
            member_id: Set(invitation.member_id),
            attending: Set(None),
            token: Set(invitation.token),
            created_at: Set(invitation.created_at.into()),
        }
    }
}
