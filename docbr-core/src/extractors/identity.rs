//! # Variantes de Documento de Identidade
//!
//! RG (carteira de identidade) e CNH. Além dos campos comuns, leem
//! filiação, naturalidade, documento de origem e o órgão emissor.
//!
//! O número do RG não tem dígito verificador padronizado entre estados e
//! vai para `document_number`, nunca para `identifier_number`. O
//! identificador validado de um documento de identidade é o CPF.

use super::common::{FieldRule, Shape, Slot};
use super::operators::{IdentifierSource, OperatorExtractor};
use super::ExtractorKind;

const IDENTITY_SLOTS: &[Slot] = &[
    Slot::Identifier,
    Slot::Institution,
    Slot::Number,
    Slot::Holder,
    Slot::BirthDate,
];

/// Órgão emissor seguido da UF: "SSP/SP", "DETRAN-RJ".
const ISSUER_BODY: &str =
    r"\b((?:SSP|SESP|SDS|SJS|SJTC|IIRGD|IFP|IGP|PC|DIC|DETRAN)\s*[-/]\s*[\p{Lu}]{2})\b";

const FATHER_PATTERNS: &[&str] = &[
    r"FILIA[ÇC][ÃA]O\s*[:.]?\s*([\p{Lu}][\p{Lu}' ]{4,})",
    r"\bPAI\s*[:.]\s*([\p{Lu}][\p{Lu}' ]{4,})",
];

const MOTHER_PATTERNS: &[&str] = &[
    r"FILIA[ÇC][ÃA]O\s*[:.]?\s*[\p{Lu}][\p{Lu}' ]{4,}[ ]*\n\s*([\p{Lu}][\p{Lu}' ]{4,})",
    r"\bM[ÃA]E\s*[:.]\s*([\p{Lu}][\p{Lu}' ]{4,})",
];

const BIRTH_PLACE_PATTERNS: &[&str] =
    &[r"NATURALIDADE\s*[:.]?\s*([\p{Lu}][\p{Lu}' ]{2,}(?:[ ]*[-/][ ]*[\p{Lu}]{2})?)"];

const DOCUMENT_ORIGIN_PATTERNS: &[&str] = &[r"\bDOC(?:UMENTO)?\.?\s*(?:DE\s+)?ORIGEM\s*[:.]?\s*([^\n]{3,80})"];

const HOLDER_PATTERNS: &[&str] = &[r"\bNOME\s*[:.]?\s*([\p{Lu}][\p{Lu}' ]{3,})"];

/// Pool de identidade em ordem de prioridade.
pub fn identity_pool() -> Vec<OperatorExtractor> {
    vec![driver_license(), identity_card()]
}

fn with_identity_fields(extractor: OperatorExtractor) -> OperatorExtractor {
    let mut extractor = extractor
        .identifier(IdentifierSource::Cpf)
        .without_plan()
        .without_issuer_code()
        .holder(HOLDER_PATTERNS);
    extractor.father_name = FieldRule::new(FATHER_PATTERNS, Shape::PersonName);
    extractor.mother_name = FieldRule::new(MOTHER_PATTERNS, Shape::PersonName);
    extractor.birth_place = FieldRule::new(BIRTH_PLACE_PATTERNS, Shape::Text { min: 3, max: 60 });
    extractor.document_origin = FieldRule::new(DOCUMENT_ORIGIN_PATTERNS, Shape::Line { min: 3, max: 80 });
    extractor
}

fn driver_license() -> OperatorExtractor {
    let mut cnh = with_identity_fields(
        OperatorExtractor::new(ExtractorKind::DriverLicense, IDENTITY_SLOTS)
            .handles(&[r"HABILITACAO", r"\bDETRAN\b", r"PERMISSAO\s+PARA\s+DIRIGIR", r"\bCNH\b"])
            .issuer_patterns(&[r"\b(DETRAN\s*[-/]?\s*[\p{Lu}]{2})\b", ISSUER_BODY]),
    );
    cnh.document_number = FieldRule::new(
        &[
            r"N[º°O.]?\s*(?:DE\s+)?REGISTRO\s*[:.]?\s*(\d{9,11})\b",
            r"REGISTRO\s+(?:NACIONAL\s+)?(?:CNH\s*)?[:.]?\s*(\d{9,11})\b",
        ],
        Shape::DocumentDigits { min: 9, max: 11 },
    );
    cnh
}

fn identity_card() -> OperatorExtractor {
    let mut rg = with_identity_fields(
        OperatorExtractor::new(ExtractorKind::IdentityCard, IDENTITY_SLOTS)
            .handles(&[
                r"CARTEIRA\s+DE\s+IDENTIDADE",
                r"REGISTRO\s+GERAL",
                r"INSTITUTO\s+DE\s+IDENTIFICACAO",
                r"SECRETARIA\s+D[AE]\s+SEGURANCA",
                r"\bRG\b",
            ])
            .issuer_patterns(&[ISSUER_BODY, r"(SECRETARIA\s+D[AE]\s+SEGURAN[ÇC]A\s+P[ÚU]BLICA)"]),
    );
    rg.document_number = FieldRule::new(
        &[
            r"REGISTRO\s+GERAL\s*[:.]?\s*(?:N[º°O.]?\s*)?(\d[\d.\-X]{4,14})",
            r"(?m)^\s*(\d{1,2}\.\d{3}\.\d{3}-?[\dX]{1,2})\s*$",
            r"\bRG\s*[:.]?\s*(?:N[º°O.]?\s*)?(\d[\d.\-X]{4,14})",
        ],
        Shape::DocumentDigits { min: 5, max: 10 },
    );
    rg
}
