pub mod client;
pub mod config;
pub mod deepseek;
pub mod filter;
pub mod parser;
pub mod reference;
pub mod slides;
pub mod summarizer;
pub mod translator;
pub mod utils;
