pub mod generator;
pub mod llm;
pub mod replay;
pub mod translate;
