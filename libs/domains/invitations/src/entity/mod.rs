//! Sea-ORM entities for the tables the Postgres repository touches.

pub mod chapters;
pub mod course_invitations;
pub mod event_invitations;
pub mod events;
pub mod group_members;
pub mod groups;
pub mod meeting_attendances;
pub mod members;
pub mod sponsors;
pub mod waiting_lists;
pub mod workshop_invitations;
pub mod workshops;
