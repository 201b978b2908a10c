pub mod changeset;
pub mod item;
pub mod notification;
