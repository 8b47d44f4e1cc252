// src/extractors/mod.rs
pub mod excel_text;
pub mod grid;
pub mod labels;
pub mod numbers;
pub mod pdf_text;
pub mod table;
pub mod years;
