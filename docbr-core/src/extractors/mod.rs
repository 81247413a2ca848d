//! # Extratores por Operadora e Registro de Despacho
//!
//! Cada layout conhecido (carteirinha de uma operadora, RG, CNH) é uma
//! variante fechada de [`ExtractorKind`], com listas de padrões compiladas
//! uma vez e nunca alteradas.
//!
//! ## Despacho
//!
//! A família do documento escolhe um pool ordenado. A primeira variante do
//! pool cujo `can_handle` é verdadeiro é usada com exclusividade; se
//! nenhuma aceita, ou a família é `Unknown`, roda o [`GenericExtractor`].
//! Nunca há mistura de campos de duas variantes.
//!
//! ```rust
//! use docbr_core::classifier::DocumentFamily;
//! use docbr_core::extractors::{ExtractorKind, ExtractorRegistry};
//! use docbr_core::text::DocumentText;
//!
//! let registry = ExtractorRegistry::build();
//! let doc = DocumentText::new("HAPVIDA\nCARTEIRA 0012345678");
//! assert_eq!(registry.dispatch(DocumentFamily::InsuranceCard, &doc).kind(), ExtractorKind::Hapvida);
//! assert_eq!(registry.dispatch(DocumentFamily::Unknown, &doc).kind(), ExtractorKind::Generic);
//! ```

pub mod common;
pub mod generic;
pub mod identity;
pub mod operators;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classifier::DocumentFamily;
use crate::fields::ExtractedFields;
use crate::telemetry::TARGET_EXTRACTORS;
use crate::text::DocumentText;

pub use common::RawFields;
pub use generic::GenericExtractor;
pub use operators::OperatorExtractor;

/// Variantes de extrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorKind {
    SusCard,
    Unimed,
    BradescoSaude,
    SulAmerica,
    Amil,
    NotreDameIntermedica,
    Hapvida,
    PortoSeguro,
    Cassi,
    DriverLicense,
    IdentityCard,
    Generic,
}

impl ExtractorKind {
    pub fn name(&self) -> &'static str {
        match self {
            ExtractorKind::SusCard => "sus_card",
            ExtractorKind::Unimed => "unimed",
            ExtractorKind::BradescoSaude => "bradesco_saude",
            ExtractorKind::SulAmerica => "sulamerica",
            ExtractorKind::Amil => "amil",
            ExtractorKind::NotreDameIntermedica => "notredame_intermedica",
            ExtractorKind::Hapvida => "hapvida",
            ExtractorKind::PortoSeguro => "porto_seguro",
            ExtractorKind::Cassi => "cassi",
            ExtractorKind::DriverLicense => "driver_license",
            ExtractorKind::IdentityCard => "identity_card",
            ExtractorKind::Generic => "generic",
        }
    }
}

impl std::fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// O extrator escolhido para um documento.
#[derive(Clone, Copy)]
pub enum Extractor<'a> {
    Operator(&'a OperatorExtractor),
    Generic(&'a GenericExtractor),
}

impl Extractor<'_> {
    pub fn kind(&self) -> ExtractorKind {
        match self {
            Extractor::Operator(e) => e.kind(),
            Extractor::Generic(_) => ExtractorKind::Generic,
        }
    }

    pub fn can_handle(&self, doc: &DocumentText) -> bool {
        match self {
            Extractor::Operator(e) => e.can_handle(doc),
            Extractor::Generic(_) => true,
        }
    }

    pub fn extract_card_number(&self, doc: &DocumentText) -> Option<String> {
        match self {
            Extractor::Operator(e) => e.extract_card_number(doc),
            Extractor::Generic(e) => e.extract_card_number(doc),
        }
    }

    pub fn extract_plan(&self, doc: &DocumentText) -> Option<String> {
        match self {
            Extractor::Operator(e) => e.extract_plan(doc),
            Extractor::Generic(e) => e.extract_plan(doc),
        }
    }

    pub fn extract_holder_name(&self, doc: &DocumentText) -> Option<String> {
        match self {
            Extractor::Operator(e) => e.extract_holder_name(doc),
            Extractor::Generic(e) => e.extract_holder_name(doc),
        }
    }

    pub fn extract_birth_date(&self, doc: &DocumentText) -> Option<String> {
        match self {
            Extractor::Operator(e) => e.extract_birth_date(doc),
            Extractor::Generic(e) => e.extract_birth_date(doc),
        }
    }

    pub fn extract_identifier(&self, doc: &DocumentText) -> Option<String> {
        match self {
            Extractor::Operator(e) => e.extract_identifier(doc),
            Extractor::Generic(e) => e.extract_identifier(doc),
        }
    }

    /// Todos os campos crus que a variante sabe extrair.
    pub fn extract(&self, doc: &DocumentText) -> RawFields {
        match self {
            Extractor::Operator(e) => e.extract(doc),
            Extractor::Generic(e) => e.extract(doc),
        }
    }

    pub fn get_confidence(&self, fields: &ExtractedFields) -> f64 {
        match self {
            Extractor::Operator(e) => e.get_confidence(fields),
            Extractor::Generic(e) => e.get_confidence(fields),
        }
    }
}

/// Pools ordenados de variantes e o extrator genérico de reserva.
pub struct ExtractorRegistry {
    insurance: Vec<OperatorExtractor>,
    identity: Vec<OperatorExtractor>,
    generic: GenericExtractor,
}

impl ExtractorRegistry {
    /// Constrói todas as variantes, compilando seus padrões.
    pub fn build() -> Self {
        Self {
            insurance: operators::insurance_pool(),
            identity: identity::identity_pool(),
            generic: GenericExtractor::new(),
        }
    }

    /// Variantes elegíveis para a família, em ordem de prioridade.
    pub fn pool(&self, family: DocumentFamily) -> &[OperatorExtractor] {
        match family {
            DocumentFamily::InsuranceCard => &self.insurance,
            DocumentFamily::IdentityDocument => &self.identity,
            DocumentFamily::Unknown => &[],
        }
    }

    /// Primeira variante do pool que aceita o texto, ou o genérico.
    pub fn dispatch(&self, family: DocumentFamily, doc: &DocumentText) -> Extractor<'_> {
        match self.pool(family).iter().find(|e| e.can_handle(doc)) {
            Some(extractor) => Extractor::Operator(extractor),
            None => {
                debug!(target: TARGET_EXTRACTORS, family = ?family, "nenhuma variante aceitou o texto, usando o genérico");
                Extractor::Generic(&self.generic)
            }
        }
    }

    /// Todas as variantes do pool que aceitariam o texto, em ordem.
    /// Só a primeira é usada; as demais servem para diagnóstico.
    pub fn candidates(&self, family: DocumentFamily, doc: &DocumentText) -> Vec<ExtractorKind> {
        self.pool(family)
            .iter()
            .filter(|e| e.can_handle(doc))
            .map(OperatorExtractor::kind)
            .collect()
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::build()
    }
}
