pub mod admin;
pub mod assets;
pub mod auth;
pub mod chat;
pub mod docs;
pub mod health;
pub mod integrations;
pub mod roles;
pub mod sites;
pub mod spaces;
pub mod users;
pub mod webhooks;
