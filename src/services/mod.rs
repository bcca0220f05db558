pub mod broadcast;
pub mod deadline;
pub mod files;
pub mod health;
