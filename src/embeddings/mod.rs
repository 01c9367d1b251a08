pub mod chunking;
pub mod ollama;
