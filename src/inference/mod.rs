pub mod features;
pub mod linear;
pub mod pipeline;
pub mod task;
pub mod vectorizer;
