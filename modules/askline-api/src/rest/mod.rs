pub mod ai;
pub mod announcements;
pub mod chat;
pub mod classes;
pub mod courses;
pub mod qas;
pub mod questions;
pub mod reports;
