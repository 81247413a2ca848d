//! # Classificador de Tipo de Documento
//!
//! Conta quantos marcadores de cada família aparecem no texto (maiúsculo,
//! sem acentos) e decide entre documento de identidade, carteirinha de
//! convênio ou desconhecido.
//!
//! Os dois conjuntos de marcadores são disjuntos. A família decide qual
//! pool de extratores é elegível: extratores de identidade nunca rodam
//! sobre texto de carteirinha, e vice-versa.
//!
//! ## Regra
//!
//! - Identidade vence com ≥ `identity_min` marcadores; ≥ `strict_identity_min`
//!   dá a subfamília estrita `carteira_identidade`; qualquer marcador de CNH
//!   dá a subfamília `cnh`.
//! - Convênio vence com ≥ `insurance_min` marcadores; a subfamília é a
//!   primeira instituição reconhecida.
//! - Se as duas qualificam, vence a maior contagem; empate dá `Unknown`.
//! - Confiança = min(cap, base + passo × contagem).

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::ClassifierConfig;
use crate::extractors::common::compile;

/// Família de documento.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentFamily {
    IdentityDocument,
    InsuranceCard,
    Unknown,
}

/// Resultado da classificação; produzido uma vez por execução.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentClassification {
    pub document_family: DocumentFamily,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_family: Option<String>,
    pub confidence: f64,
    /// Rótulos dos marcadores da família vencedora.
    #[serde(default)]
    pub matched_markers: Vec<String>,
}

impl DocumentClassification {
    pub fn unknown() -> Self {
        Self {
            document_family: DocumentFamily::Unknown,
            sub_family: None,
            confidence: 0.0,
            matched_markers: vec![],
        }
    }
}

struct Marker {
    label: &'static str,
    pattern: Regex,
    /// Subfamília implicada pelo marcador (instituição ou "cnh").
    sub_family: Option<&'static str>,
}

fn markers(specs: &[(&'static str, &'static str, Option<&'static str>)]) -> Vec<Marker> {
    specs
        .iter()
        .zip(compile(&specs.iter().map(|(_, p, _)| *p).collect::<Vec<_>>()))
        .map(|(&(label, _, sub_family), pattern)| Marker {
            label,
            pattern,
            sub_family,
        })
        .collect()
}

/// Classificador baseado em contagem de marcadores.
pub struct DocumentClassifier {
    config: ClassifierConfig,
    identity: Vec<Marker>,
    insurance: Vec<Marker>,
}

impl DocumentClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        let identity = markers(&[
            ("carteira de identidade", r"CARTEIRA\s+DE\s+IDENTIDADE", None),
            ("registro geral", r"REGISTRO\s+GERAL", None),
            ("secretaria de seguranca", r"SECRETARIA\s+D[AE]\s+SEGURANCA", None),
            ("instituto de identificacao", r"INSTITUTO\s+DE\s+IDENTIFICACAO", None),
            ("filiacao", r"\bFILIACAO\b", None),
            ("naturalidade", r"\bNATURALIDADE\b", None),
            ("doc. origem", r"\bDOC(?:UMENTO)?\.?\s*(?:DE\s+)?ORIGEM\b", None),
            ("data de expedicao", r"DATA\s+DE\s+EXPEDICAO", None),
            ("valida em todo o territorio", r"VALIDA\s+EM\s+TODO\s+O\s+TERRITORIO", None),
            ("carteira de habilitacao", r"HABILITACAO", Some("cnh")),
            ("detran", r"\bDETRAN\b", Some("cnh")),
            ("permissao para dirigir", r"PERMISSAO\s+PARA\s+DIRIGIR", Some("cnh")),
        ]);
        let insurance = markers(&[
            ("sus", r"CARTAO\s+NACIONAL\s+DE\s+SAUDE|\bSUS\b", Some("sus")),
            ("unimed", r"\bUNIMED\b", Some("unimed")),
            ("bradesco", r"\bBRADESCO\b", Some("bradesco_saude")),
            ("sulamerica", r"\bSUL\s?AMERICA\b", Some("sulamerica")),
            ("amil", r"\bAMIL\b", Some("amil")),
            ("notredame", r"NOTRE\s?DAME|INTERMEDICA|\bGNDI\b", Some("notredame_intermedica")),
            ("hapvida", r"\bHAPVIDA\b", Some("hapvida")),
            ("porto seguro", r"PORTO\s+SEGURO", Some("porto_seguro")),
            ("cassi", r"\bCASSI\b", Some("cassi")),
            ("plano", r"\bPLANO\b", None),
            ("beneficiario", r"\bBENEFICIARIO\b", None),
            ("operadora", r"\bOPERADORA\b", None),
            ("ans", r"\bANS\b", None),
            ("carteirinha", r"CARTEIRINHA", None),
            ("acomodacao", r"ACOMODACAO", None),
            ("segmentacao", r"SEGMENTACAO", None),
            ("carencia", r"CARENCIA", None),
            ("convenio", r"\bCONVENIO\b", None),
        ]);
        Self {
            config,
            identity,
            insurance,
        }
    }

    /// Classifica o texto já dobrado (maiúsculo, sem acentos).
    pub fn classify(&self, folded: &str) -> DocumentClassification {
        let identity_hits: Vec<&Marker> = self.identity.iter().filter(|m| m.pattern.is_match(folded)).collect();
        let insurance_hits: Vec<&Marker> = self.insurance.iter().filter(|m| m.pattern.is_match(folded)).collect();

        let identity_ok = identity_hits.len() >= self.config.identity_min;
        let insurance_ok = insurance_hits.len() >= self.config.insurance_min && !insurance_hits.is_empty();

        let family = match (identity_ok, insurance_ok) {
            (true, false) => DocumentFamily::IdentityDocument,
            (false, true) => DocumentFamily::InsuranceCard,
            (true, true) if identity_hits.len() > insurance_hits.len() => DocumentFamily::IdentityDocument,
            (true, true) if insurance_hits.len() > identity_hits.len() => DocumentFamily::InsuranceCard,
            _ => DocumentFamily::Unknown,
        };

        let (hits, sub_family) = match family {
            DocumentFamily::IdentityDocument => {
                let sub = if identity_hits.iter().any(|m| m.sub_family == Some("cnh")) {
                    Some("cnh")
                } else if identity_hits.len() >= self.config.strict_identity_min {
                    Some("carteira_identidade")
                } else {
                    None
                };
                (identity_hits, sub)
            }
            DocumentFamily::InsuranceCard => {
                let sub = insurance_hits.iter().find_map(|m| m.sub_family);
                (insurance_hits, sub)
            }
            DocumentFamily::Unknown => return DocumentClassification::unknown(),
        };

        DocumentClassification {
            document_family: family,
            sub_family: sub_family.map(str::to_string),
            confidence: self.confidence_for(hits.len()),
            matched_markers: hits.iter().map(|m| m.label.to_string()).collect(),
        }
    }

    fn confidence_for(&self, count: usize) -> f64 {
        let c = &self.config;
        (c.confidence_base + c.confidence_step * count as f64).min(c.confidence_cap)
    }
}

impl Default for DocumentClassifier {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::fold;

    fn classify(text: &str) -> DocumentClassification {
        DocumentClassifier::default().classify(&fold(text))
    }

    #[test]
    fn test_strict_identity_document() {
        let c = classify(
            "REPÚBLICA FEDERATIVA DO BRASIL\nSECRETARIA DA SEGURANÇA PÚBLICA\nCARTEIRA DE IDENTIDADE\nREGISTRO GERAL 48.151.623-42\nFILIAÇÃO\nNATURALIDADE",
        );
        assert_eq!(c.document_family, DocumentFamily::IdentityDocument);
        assert_eq!(c.sub_family.as_deref(), Some("carteira_identidade"));
        assert!(c.confidence <= 0.95);
        assert_eq!(c.matched_markers.len(), 5);
    }

    #[test]
    fn test_identity_below_strict_minimum_has_no_sub_family() {
        let c = classify("REGISTRO GERAL 1234567\nFILIAÇÃO JOSE");
        assert_eq!(c.document_family, DocumentFamily::IdentityDocument);
        assert!(c.sub_family.is_none());
        assert!((c.confidence - 0.65).abs() < 1e-9);
    }

    #[test]
    fn test_driver_license_sub_family() {
        let c = classify("CARTEIRA NACIONAL DE HABILITAÇÃO\nDETRAN SP\nNOME JOAO");
        assert_eq!(c.document_family, DocumentFamily::IdentityDocument);
        assert_eq!(c.sub_family.as_deref(), Some("cnh"));
    }

    #[test]
    fn test_insurance_card_sub_family_is_first_institution() {
        let c = classify("Unimed Campinas\nPlano UNIFACIL\nBeneficiário: MARIA SOUZA\nANS 33569-0");
        assert_eq!(c.document_family, DocumentFamily::InsuranceCard);
        assert_eq!(c.sub_family.as_deref(), Some("unimed"));
        assert_eq!(c.matched_markers.len(), 4);
    }

    #[test]
    fn test_confidence_capped() {
        let c = classify(
            "UNIMED PLANO BENEFICIARIO OPERADORA ANS CARTEIRINHA ACOMODAÇÃO SEGMENTAÇÃO CARÊNCIA CONVÊNIO",
        );
        assert_eq!(c.confidence, 0.95);
    }

    #[test]
    fn test_unknown_when_no_markers() {
        let c = classify("lista de compras: arroz, feijão");
        assert_eq!(c, DocumentClassification::unknown());
    }

    #[test]
    fn test_tie_is_unknown() {
        let c = classify("FILIAÇÃO NATURALIDADE PLANO OPERADORA");
        assert_eq!(c.document_family, DocumentFamily::Unknown);
    }

    #[test]
    fn test_marker_sets_are_disjoint() {
        let classifier = DocumentClassifier::default();
        let identity: Vec<&str> = classifier.identity.iter().map(|m| m.label).collect();
        assert!(classifier.insurance.iter().all(|m| !identity.contains(&m.label)));
    }
}
