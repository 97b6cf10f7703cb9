// trendcover: how well does a course catalogue cover a list of trends?
//
// This is the library root. The coverage engine is the chain
// text → encode → coverage, driven by pipeline::coverage; crawl and
// pipeline::summarize build the course table it reads.

pub mod config;
pub mod coverage;
pub mod crawl;
pub mod encode;
pub mod error;
pub mod loader;
pub mod output;
pub mod pipeline;
pub mod records;
pub mod text;
