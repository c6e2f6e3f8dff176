use thiserror::Error;

use crate::data::AttributeId;

/// Errors raised before mining starts or while reading and writing files.
/// Mining itself never fails once its inputs are validated.
#[derive( Debug, Error )]
pub enum MineError {
    #[error( "I/O error: {0}" )]
    Io( #[from] std::io::Error ),

    #[error( "malformed input at line {line}: {message}" )]
    Format { line: usize, message: String },

    #[error( "configuration error: {message}" )]
    Configuration { message: String },

    #[error( "rule refers to unknown attribute {id}" )]
    UnknownAttribute { id: AttributeId },

    #[error( "JSON serialization failed: {0}" )]
    Json( #[from] serde_json::Error ),
}

pub type Result<T> = std::result::Result<T, MineError>;

impl MineError {
    pub fn format<S: Into<String>>( line: usize, message: S ) -> Self {
	Self::Format { line, message: message.into() }
    }

    pub fn configuration<S: Into<String>>( message: S ) -> Self {
	Self::Configuration { message: message.into() }
    }
}
