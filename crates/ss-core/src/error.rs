use crate::model::SymbolGroup;
use thiserror::Error;

pub type SsResult<T> = Result<T, SsError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SsError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: String },

    #[error("Unknown {group} symbol '{name}'")]
    UnknownSymbol { group: SymbolGroup, name: String },

    #[error("Model evaluation failed: {what}")]
    Evaluation { what: String },
}
