mod admin;
mod middleware;

pub use admin::{
    AdminState, InvalidateRequest, InvalidateResponse, InvalidationScope, build_admin_router,
};
