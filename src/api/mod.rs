pub mod activity_logs;
pub mod affected_families;
pub mod auth;
pub mod branding;
pub mod disasters;
pub mod error;
pub mod extract;
pub mod families;
pub mod family_members;
pub mod middleware;
pub mod population;
pub mod user;
