pub mod comment;
pub mod subscription;
pub mod tweet;
pub mod user;
pub mod video;
