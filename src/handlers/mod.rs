pub mod animation;
pub mod generate;
pub mod prompt;
pub mod storage;
pub mod video;
pub mod voice;
pub mod youtube;
