pub mod cost_breakdown;
pub mod efficiency;
pub mod import_validation;
pub mod models;
pub mod receipt_fields;
pub mod receipt_parser;
