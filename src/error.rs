//! # Error Types Module
//!
//! Questo modulo definisce i tipi di errore della libreria.
//!
//! ## Categorie di errori:
//! - `Io`: Errori di I/O reali (stat, rename, chmod sul file del thumbnail)
//! - `Json`: File di configurazione non valido
//! - `Config`: Configurazione incoerente o non caricabile
//! - `Validation`: Parametri di input fuori range
//!
//! Nota: un ottimizzatore che fallisce, manca dal sistema o non produce output
//! NON è un errore. Quei casi diventano `Outcome::Skipped` in `image_processor`.

/// Custom error types for thumbnail optimization
#[derive(thiserror::Error, Debug)]
pub enum OptimizeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T, E = OptimizeError> = std::result::Result<T, E>;
