pub mod agent;
pub mod conversation;
pub mod errors;
pub mod models;
pub mod pipeline;
pub mod prompt_template;
pub mod providers;
pub mod systems;
