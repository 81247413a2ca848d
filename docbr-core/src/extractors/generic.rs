//! # Extrator Genérico
//!
//! Reserva para textos que nenhuma variante reconhece. Usa heurísticas que
//! não dependem de família:
//!
//! - número de carteirinha: a mais longa sequência numérica (dígitos
//!   separados por espaço) com pelo menos 8 dígitos e que não seja CNS;
//! - titular: um rótulo de nome, senão a primeira linha com ≥ 2 palavras
//!   alfabéticas e nenhuma palavra-chave de instituição ou documento;
//! - identificador: primeiro CNS válido, senão primeiro CPF válido.

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

use super::common::{
    accept, compile, cpf_candidates, extract_ans_code, weighted_confidence, FieldRule, RawFields, Shape, ALL_SLOTS,
    ANS_CODE_PATTERNS, ANY_DATE_PATTERNS, BIRTH_DATE_PATTERNS, CPF_PATTERNS, HOLDER_LABEL_PATTERNS,
    PLAN_LABEL_PATTERNS,
};
use crate::checksum::is_valid_cpf;
use crate::fields::{ExtractedFields, FieldName};
use crate::text::{digits_only, fold, DocumentText};

const MIN_CARD_DIGITS: usize = 8;
const MAX_CARD_DIGITS: usize = 21;

/// Palavras (sem acento) que desqualificam uma linha como nome do titular.
const KEYWORDS: &[&str] = &[
    "CARTEIRA", "CARTEIRINHA", "CARTAO", "IDENTIDADE", "DOCUMENTO", "REGISTRO", "GERAL", "PLANO", "PRODUTO",
    "BENEFICIARIO", "TITULAR", "OPERADORA", "ANS", "NACIONAL", "SAUDE", "SUS", "VALIDADE", "NOME",
    "NASCIMENTO", "DATA", "CPF", "RG", "CNS", "REPUBLICA", "FEDERATIVA", "BRASIL", "MINISTERIO",
    "SECRETARIA", "SEGURANCA", "PUBLICA", "ESTADO", "ACOMODACAO", "ENFERMARIA", "APARTAMENTO", "EMPRESA",
    "CONTRATO", "VIA", "DEPENDENTE", "COBERTURA", "SEGMENTACAO", "AMBULATORIAL", "HOSPITALAR", "CARENCIA",
    "CONVENIO", "ASSISTENCIA", "MEDICA", "SEGUROS", "SEGURO", "LTDA", "COOPERATIVA", "UNIMED", "BRADESCO",
    "SULAMERICA", "AMIL", "HAPVIDA", "NOTREDAME", "INTERMEDICA", "PORTO", "CASSI", "DETRAN", "HABILITACAO",
];

/// Extrator de reserva, sem padrões de instituição.
pub struct GenericExtractor {
    numeric_run: Regex,
    holder_label: FieldRule,
    birth_date: FieldRule,
    any_date: FieldRule,
    plan: FieldRule,
    issuer_name: FieldRule,
    issuer_code: FieldRule,
    cpf: Vec<Regex>,
}

impl GenericExtractor {
    pub fn new() -> Self {
        let mut numeric_run = compile(&[r"\d+(?:[ ]\d+)*"]);
        Self {
            numeric_run: numeric_run.remove(0),
            holder_label: FieldRule::new(HOLDER_LABEL_PATTERNS, Shape::PersonName),
            birth_date: FieldRule::new(BIRTH_DATE_PATTERNS, Shape::Date),
            any_date: FieldRule::new(ANY_DATE_PATTERNS, Shape::Date),
            plan: FieldRule::new(PLAN_LABEL_PATTERNS, Shape::Text { min: 2, max: 40 }),
            issuer_name: FieldRule::new(
                &[r"\bOPERADORA\s*[:.]?\s*([\p{Lu}][\p{Lu}.& ]{2,50})"],
                Shape::Text { min: 2, max: 60 },
            ),
            issuer_code: FieldRule::new(ANS_CODE_PATTERNS, Shape::Text { min: 6, max: 6 }),
            cpf: compile(CPF_PATTERNS),
        }
    }

    /// A sequência numérica mais longa (em dígitos) fora de qualquer CNS.
    /// Empate fica com a primeira.
    pub fn extract_card_number(&self, doc: &DocumentText) -> Option<String> {
        let shape = Shape::CardDigits {
            min: MIN_CARD_DIGITS,
            max: MAX_CARD_DIGITS,
        };
        let mut best: Option<String> = None;
        for run in self.numeric_run.find_iter(doc.scrubbed()) {
            let Some(digits) = accept(run.as_str(), shape, doc) else {
                continue;
            };
            if best.as_ref().map_or(true, |b| digits.len() > b.len()) {
                best = Some(digits);
            }
        }
        best
    }

    pub fn extract_holder_name(&self, doc: &DocumentText) -> Option<String> {
        self.holder_label
            .first_match(doc.upper(), doc)
            .or_else(|| doc.upper().lines().find(|line| is_name_line(line)).map(|l| l.trim().to_string()))
    }

    pub fn extract_birth_date(&self, doc: &DocumentText) -> Option<String> {
        self.birth_date
            .first_match(doc.upper(), doc)
            .or_else(|| self.any_date.first_match(doc.upper(), doc))
    }

    pub fn extract_plan(&self, doc: &DocumentText) -> Option<String> {
        self.plan.first_match(doc.upper(), doc)
    }

    pub fn extract_identifier(&self, doc: &DocumentText) -> Option<String> {
        doc.cns()
            .first()
            .cloned()
            .or_else(|| cpf_candidates(doc, &self.cpf).into_iter().find(|c| is_valid_cpf(c)))
    }

    pub fn extract(&self, doc: &DocumentText) -> RawFields {
        let mut raw = RawFields::default();
        raw.set(FieldName::IdentifierNumber, self.extract_identifier(doc));
        let cpfs = cpf_candidates(doc, &self.cpf);
        let cpf = cpfs.iter().find(|c| is_valid_cpf(c)).or_else(|| cpfs.first()).cloned();
        raw.set(FieldName::Cpf, cpf);
        raw.set(FieldName::CardNumber, self.extract_card_number(doc));
        raw.set(FieldName::PlanName, self.extract_plan(doc));
        raw.set(FieldName::HolderName, self.extract_holder_name(doc));
        raw.set(FieldName::BirthDate, self.extract_birth_date(doc));
        raw.set(FieldName::IssuerName, self.issuer_name.first_match(doc.upper(), doc));
        raw.set(FieldName::IssuerCode, extract_ans_code(doc, &self.issuer_code));
        raw
    }

    pub fn get_confidence(&self, fields: &ExtractedFields) -> f64 {
        weighted_confidence(ALL_SLOTS, fields)
    }
}

impl Default for GenericExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Linha com pelo menos duas palavras, todas alfabéticas e nenhuma
/// palavra-chave.
fn is_name_line(line: &str) -> bool {
    let words: Vec<&str> = line.unicode_words().collect();
    words.len() >= 2
        && words.iter().all(|w| w.chars().all(char::is_alphabetic))
        && words.iter().all(|w| !KEYWORDS.contains(&fold(w).as_str()))
        && digits_only(line).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_numeric_run_outside_cns() {
        let doc = DocumentText::new("CNS 898 0012 3456 0005\nREF 1234 5678\nNUM 1234 5678 9012\nTEL 99");
        let generic = GenericExtractor::new();
        assert_eq!(generic.extract_card_number(&doc).as_deref(), Some("123456789012"));
        assert_eq!(generic.extract_identifier(&doc).as_deref(), Some("898001234560005"));
    }

    #[test]
    fn test_short_runs_are_not_card_numbers() {
        let doc = DocumentText::new("PEDIDO 1234\nDATA 01/02/2003");
        assert!(GenericExtractor::new().extract_card_number(&doc).is_none());
    }

    #[test]
    fn test_holder_line_skips_keywords() {
        let doc = DocumentText::new("Documento avulso\nCartão Convênio\nFulano de Tal Beltrano\n1234 5678 9012");
        assert_eq!(
            GenericExtractor::new().extract_holder_name(&doc).as_deref(),
            Some("FULANO DE TAL BELTRANO")
        );
    }

    #[test]
    fn test_holder_label_preferred() {
        let doc = DocumentText::new("Outra Linha Qualquer\nNome: Rita de Cássia Prado");
        assert_eq!(
            GenericExtractor::new().extract_holder_name(&doc).as_deref(),
            Some("RITA DE CÁSSIA PRADO")
        );
    }

    #[test]
    fn test_identifier_falls_back_to_valid_cpf() {
        let doc = DocumentText::new("CPF 111.444.777-35\nCPF 342.002.171-42");
        let generic = GenericExtractor::new();
        assert_eq!(generic.extract_identifier(&doc).as_deref(), Some("11144477735"));

        let only_invalid = DocumentText::new("CPF 342.002.171-42");
        assert!(generic.extract_identifier(&only_invalid).is_none());
        assert_eq!(generic.extract(&only_invalid).get(FieldName::Cpf), Some("34200217142"));
    }

    #[test]
    fn test_birth_date_any_date_fallback() {
        let doc = DocumentText::new("xx 05/06/1970 yy");
        assert_eq!(GenericExtractor::new().extract_birth_date(&doc).as_deref(), Some("05/06/1970"));
    }
}
