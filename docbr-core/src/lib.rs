//! # docbr-core: Extração de Campos de Documentos Brasileiros
//!
//! Este crate recebe o texto cru de OCR de um único documento (RG, CNH,
//! Cartão Nacional de Saúde ou carteirinha de convênio) e devolve um
//! registro estruturado e pontuado: identificador validado, número da
//! carteirinha, plano, titular, data de nascimento e a entidade emissora
//! resolvida contra um registro de referência.
//!
//! ## Arquitetura do Sistema
//!
//! O dado flui por um pipeline linear:
//!
//! 1.  **Entrada**: texto de OCR (`&str`).
//! 2.  **Classificação** ([`classifier`]): família do documento por contagem de marcadores.
//! 3.  **Despacho** ([`extractors`]): primeira variante do pool que aceita o texto, ou o extrator genérico.
//! 4.  **Extração**: cascatas ordenadas de padrões; o primeiro candidato válido vence.
//!     *   **Dígitos Verificadores** ([`checksum`]): CNS e CPF são validados antes de serem aceitos.
//! 5.  **Normalização** ([`normalize`]): datas ISO, CPF formatado, nomes capitalizados.
//! 6.  **Resolução** ([`resolver`]): código, código normalizado, similaridade de nome, aliases.
//! 7.  **Saída**: [`ExtractionResult`] com confiança por campo e geral.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use std::sync::Arc;
//! use docbr_core::{ExtractionPipeline, ResolutionMethod};
//! use docbr_core::samples::sample_registry;
//!
//! let pipeline = ExtractionPipeline::with_registry(Arc::new(sample_registry()));
//!
//! let result = pipeline.run("UNIMED CAMPINAS\nRegistro ANS: 33569-0\nCNS: 898 0012 3456 0005\nPlano: UNIFÁCIL");
//!
//! assert_eq!(result.fields.identifier_number.as_deref(), Some("898001234560005"));
//! assert_eq!(result.fields.issuer_code.as_deref(), Some("335690"));
//! assert_eq!(result.resolution.method, ResolutionMethod::CodeLookup);
//! println!("{}", result.to_json_pretty().unwrap());
//! ```
//!
//! ## Módulos Principais
//!
//! - [`pipeline`]: orquestrador que conecta todos os estágios.
//! - [`registry`]: trait do registro de referência e implementação em memória.
//! - [`config`]: limiares e tabelas ajustáveis.
//! - [`samples`]: documentos de exemplo e registro de demonstração.

pub mod checksum;
pub mod classifier;
pub mod config;
pub mod error;
pub mod extractors;
pub mod fields;
pub mod normalize;
pub mod pipeline;
pub mod registry;
pub mod resolver;
pub mod samples;
pub mod telemetry;
pub mod text;

pub use classifier::{DocumentClassification, DocumentFamily};
pub use config::PipelineConfig;
pub use error::{DocbrError, RegistryError, Result};
pub use extractors::ExtractorKind;
pub use fields::{ExtractedFields, FieldConfidence, FieldName};
pub use pipeline::{ExtractionPipeline, ExtractionResult, PipelineEvent};
pub use registry::{InMemoryRegistry, ReferenceRegistry, ReferenceRegistryEntry};
pub use resolver::{EntityResolver, ResolutionMethod, ResolutionOutcome};
