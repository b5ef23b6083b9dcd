pub mod api;
pub mod models;
pub mod providers;
pub mod templates;

pub use api::{generate_image, generate_posts, generate_video};
pub use models::{
    GenerateMode, GenerateParams, GenerateRequest, GenerateResponse, Language, Post, Slide,
    VideoParams, VideoRequest, VideoResponse,
};
pub use providers::{GenAiClient, StockMediaClient};
