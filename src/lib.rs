pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod state;

pub mod crypto {
    pub mod password;
    pub mod token;
}

pub mod models {
    pub mod session;
    pub mod todo;
    pub mod user;
}

pub mod repositories;

pub mod services {
    pub mod auth;
    pub mod session;
    pub mod todos;
}

pub mod handlers {
    pub mod auth;
    pub mod common;
    pub mod todos;
    pub mod web;
}

pub mod middleware_layer {
    pub mod auth;
    pub mod rate_limit;
}

pub mod validation {
    pub mod auth;
    pub mod todo;
}

pub use config::Config;
pub use routes::build_router;
pub use state::AppState;
