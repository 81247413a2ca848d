//! # Tipos de Erro
//!
//! O pipeline é total para texto válido: ausência de campos e falhas de
//! validação não são erros. Restam apenas três famílias:
//!
//! - [`RegistryError`]: falha de I/O no registro de referência, sempre
//!   recuperável (vira aviso + tier `NotFound` no resolvedor).
//! - [`DocbrError::InvalidText`]: entrada que não é texto UTF-8.
//! - Erros de configuração (leitura de arquivo, JSON malformado).

use thiserror::Error;

/// Erro de alto nível do crate.
#[derive(Debug, Error)]
pub enum DocbrError {
    #[error("texto de entrada inválido: {0}")]
    InvalidText(String),

    #[error("configuração inválida: {0}")]
    Config(String),

    #[error("erro de I/O: {0}")]
    Io(#[from] std::io::Error),

    #[error("erro de serialização: {0}")]
    Json(#[from] serde_json::Error),
}

/// Falha ao consultar o registro de referência de entidades emissoras.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registro indisponível: {0}")]
    Unavailable(String),

    #[error("consulta ao registro falhou: {0}")]
    Query(String),
}

/// Alias usado em todo o crate.
pub type Result<T> = std::result::Result<T, DocbrError>;
