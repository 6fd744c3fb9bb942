pub mod activity_log;
pub mod affected_family;
pub mod branding;
pub mod disaster;
pub mod family;
pub mod family_member;
pub mod user;

pub use activity_log::Entity as ActivityLog;
pub use affected_family::Entity as AffectedFamily;
pub use branding::Entity as Branding;
pub use disaster::Entity as Disaster;
pub use family::Entity as Family;
pub use family_member::Entity as FamilyMember;
pub use user::Entity as User;
