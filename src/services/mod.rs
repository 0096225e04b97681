// Services - business operations over the relational store

pub mod auth_service;
pub mod group_service;
pub mod post_service;
pub mod profile_service;
pub mod review_service;
pub mod user_service;
pub mod video_service;

pub use auth_service::AuthService;
pub use group_service::GroupService;
pub use post_service::PostService;
pub use profile_service::ProfileService;
pub use review_service::ReviewService;
pub use user_service::UserService;
pub use video_service::VideoService;
