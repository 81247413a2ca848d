//! # Registro de Referência de Entidades Emissoras
//!
//! Interface somente leitura para o cadastro de operadoras e órgãos
//! emissores. O armazenamento real (banco relacional, serviço) fica fora do
//! crate; aqui há o trait e uma implementação em memória, carregável de
//! JSON, usada em testes e em aplicações pequenas.
//!
//! ```rust
//! use docbr_core::registry::{InMemoryRegistry, ReferenceRegistry};
//!
//! let registry = InMemoryRegistry::from_json(
//!     r#"[{ "id": "op-1", "canonical_name": "UNIMED SEGUROS SAÚDE S.A.", "issuer_code": "000701" }]"#,
//! ).unwrap();
//! let entry = registry.lookup_by_code("000701").unwrap().unwrap();
//! assert_eq!(entry.canonical_name, "UNIMED SEGUROS SAÚDE S.A.");
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};

/// Uma entidade emissora cadastrada.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRegistryEntry {
    pub id: String,
    pub canonical_name: String,
    pub issuer_code: String,
}

/// Leitura do registro. As chamadas podem bloquear em I/O; o crate nunca
/// escreve no registro.
pub trait ReferenceRegistry: Send + Sync {
    /// Busca exata pelo código tal como informado.
    fn lookup_by_code(&self, code: &str) -> std::result::Result<Option<ReferenceRegistryEntry>, RegistryError>;

    /// Todas as entidades cadastradas.
    fn list_all(&self) -> std::result::Result<Vec<ReferenceRegistryEntry>, RegistryError>;
}

/// Registro mantido em memória.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRegistry {
    entries: Vec<ReferenceRegistryEntry>,
}

impl InMemoryRegistry {
    pub fn new(entries: Vec<ReferenceRegistryEntry>) -> Self {
        Self { entries }
    }

    /// Lê uma lista JSON de entradas.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<ReferenceRegistryEntry> = serde_json::from_str(json)?;
        Ok(Self::new(entries))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn entries(&self) -> &[ReferenceRegistryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ReferenceRegistry for InMemoryRegistry {
    fn lookup_by_code(&self, code: &str) -> std::result::Result<Option<ReferenceRegistryEntry>, RegistryError> {
        Ok(self.entries.iter().find(|e| e.issuer_code == code).cloned())
    }

    fn list_all(&self) -> std::result::Result<Vec<ReferenceRegistryEntry>, RegistryError> {
        Ok(self.entries.clone())
    }
}

/// Registro que sempre falha, para exercitar o caminho de erro.
#[cfg(test)]
pub(crate) struct UnavailableRegistry;

#[cfg(test)]
impl ReferenceRegistry for UnavailableRegistry {
    fn lookup_by_code(&self, _code: &str) -> std::result::Result<Option<ReferenceRegistryEntry>, RegistryError> {
        Err(RegistryError::Unavailable("conexão recusada".to_string()))
    }

    fn list_all(&self) -> std::result::Result<Vec<ReferenceRegistryEntry>, RegistryError> {
        Err(RegistryError::Query("timeout".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DocbrError;
    use crate::samples::sample_registry;

    #[test]
    fn test_lookup_is_exact() {
        let registry = sample_registry();
        assert!(registry.lookup_by_code("000701").unwrap().is_some());
        assert!(registry.lookup_by_code("701").unwrap().is_none());
        assert!(registry.lookup_by_code("").unwrap().is_none());
    }

    #[test]
    fn test_json_round_trip() {
        let registry = sample_registry();
        let json = serde_json::to_string(registry.entries()).unwrap();
        let back = InMemoryRegistry::from_json(&json).unwrap();
        assert_eq!(back.entries(), registry.entries());
        assert_eq!(back.list_all().unwrap().len(), registry.len());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(InMemoryRegistry::from_json("[{"), Err(DocbrError::Json(_))));
    }

    #[test]
    fn test_unavailable_registry_errors() {
        assert!(UnavailableRegistry.lookup_by_code("000701").is_err());
        assert!(UnavailableRegistry.list_all().is_err());
    }
}
