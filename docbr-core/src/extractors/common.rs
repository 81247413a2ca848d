//! Peças compartilhadas pelos extratores: compilação de padrões, regras de
//! campo com filtro de formato, padrões comuns a todas as operadoras e a
//! tabela de pesos de confiança.

use std::collections::BTreeMap;

use regex::Regex;

use crate::checksum::is_valid_cpf;
use crate::fields::{ExtractedFields, FieldName};
use crate::normalize::normalize_date_with_max_year;
use crate::text::{collapse_whitespace, digits_only, fold, DocumentText};

/// Compila uma lista de padrões literais. Os padrões são constantes do
/// código; um padrão inválido é erro de programação.
pub fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).unwrap_or_else(|e| panic!("padrão inválido {p:?}: {e}")))
        .collect()
}

/// Palavras que encerram um valor capturado na mesma linha (rótulos do
/// campo seguinte). Comparadas sem acento.
pub const LABEL_STOPWORDS: &[&str] = &[
    "DATA", "NASC", "NASCIMENTO", "CPF", "RG", "CNS", "VALIDADE", "VALIDO", "ACOMODACAO",
    "CARTEIRA", "MATRICULA", "CODIGO", "SEXO", "VIA", "EMPRESA", "CONTRATO", "SEGMENTACAO",
    "ABRANGENCIA", "CARENCIA", "DOC", "NATURALIDADE", "FILIACAO", "EXPEDICAO", "ANS", "TITULAR",
    "DEPENDENTE", "REGISTRO", "CATEGORIA", "HAB",
];

/// Valores de plano que são na verdade parte de frases genéricas.
const PLAN_REJECT_PREFIXES: &[&str] = &["DE SAUDE", "DE ASSISTENCIA", "ODONTOLOGICO"];

/// Formato exigido de um candidato antes de ser aceito.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    /// Número de carteirinha: contagem de dígitos em [min, max], sem
    /// coincidir com CNS já extraído nem ser um CPF válido.
    CardDigits { min: usize, max: usize },
    /// Número de documento (RG/CNH): contagem de dígitos em [min, max],
    /// nunca com 11 dígitos formatados como CPF.
    DocumentDigits { min: usize, max: usize },
    /// Nome próprio: pelo menos dois tokens alfabéticos após cortar rótulos.
    PersonName,
    /// Texto livre curto (plano, naturalidade, emissor).
    Text { min: usize, max: usize },
    /// Linha inteira, sem corte em rótulos (documento de origem).
    Line { min: usize, max: usize },
    /// Data que o normalizador consegue ler.
    Date,
}

/// Lista ordenada de padrões para um campo; o grupo 1 é o valor.
pub struct FieldRule {
    patterns: Vec<Regex>,
    shape: Shape,
}

impl FieldRule {
    pub fn new(patterns: &[&str], shape: Shape) -> Self {
        Self {
            patterns: compile(patterns),
            shape,
        }
    }

    /// Padrões específicos seguidos dos padrões compartilhados.
    pub fn layered(specific: &[&str], shared: &[&str], shape: Shape) -> Self {
        let all: Vec<&str> = specific.iter().chain(shared.iter()).copied().collect();
        Self::new(&all, shape)
    }

    pub fn empty(shape: Shape) -> Self {
        Self {
            patterns: vec![],
            shape,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Aplica os padrões em ordem e devolve o primeiro candidato que passa
    /// no filtro de formato. Candidatos rejeitados não interrompem a busca.
    pub fn first_match(&self, haystack: &str, doc: &DocumentText) -> Option<String> {
        self.patterns.iter().find_map(|pattern| {
            overlapping_captures(pattern, haystack)
                .into_iter()
                .find_map(|candidate| accept(&candidate, self.shape, doc))
        })
    }
}

/// Grupo 1 de cada casamento, recomeçando a busca um caractere após o
/// início do anterior. Um rótulo que capturou lixo não esconde o próximo
/// rótulo sobreposto ("BENEFICIÁRIO\nNOME: ...").
pub fn overlapping_captures(pattern: &Regex, haystack: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut start = 0;
    while start <= haystack.len() {
        let Some(caps) = pattern.captures_at(haystack, start) else {
            break;
        };
        let Some(whole) = caps.get(0) else {
            break;
        };
        if let Some(value) = caps.get(1) {
            out.push(value.as_str().to_string());
        }
        let step = haystack[whole.start()..].chars().next().map_or(1, char::len_utf8);
        start = whole.start() + step;
    }
    out
}

/// Aplica o filtro de formato; devolve o valor já limpo quando aceito.
pub fn accept(candidate: &str, shape: Shape, doc: &DocumentText) -> Option<String> {
    match shape {
        Shape::CardDigits { min, max } => {
            let digits = digits_only(candidate);
            let ok = (min..=max).contains(&digits.len())
                && !doc.overlaps_cns(&digits)
                && !(digits.len() == 11 && is_valid_cpf(&digits));
            ok.then_some(digits)
        }
        Shape::DocumentDigits { min, max } => {
            let value = collapse_whitespace(candidate).trim_matches(['.', '-', ' ']).to_string();
            let digits = digits_only(&value);
            let looks_like_cpf = digits.len() == 11 && value.matches('.').count() == 2;
            ((min..=max).contains(&digits.len()) && !looks_like_cpf && !doc.overlaps_cns(&digits)).then_some(value)
        }
        Shape::PersonName => {
            let value = cut_at_labels(candidate);
            let tokens = value.split_whitespace().filter(|t| t.chars().all(char::is_alphabetic)).count();
            (tokens >= 2).then_some(value)
        }
        Shape::Text { min, max } => {
            let value = cut_at_labels(candidate)
                .trim_matches(|c: char| c.is_whitespace() || c == ':' || c == '-' || c == '.')
                .to_string();
            let len = value.chars().count();
            let folded = fold(&value);
            let rejected = PLAN_REJECT_PREFIXES.iter().any(|p| folded.starts_with(&fold(p)))
                || value.chars().all(|c| c.is_ascii_digit() || c.is_whitespace());
            ((min..=max).contains(&len) && !rejected).then_some(value)
        }
        Shape::Line { min, max } => {
            let value = collapse_whitespace(candidate);
            (min..=max).contains(&value.chars().count()).then_some(value)
        }
        Shape::Date => {
            let value = candidate.trim().to_string();
            // qualquer ano de 4 dígitos serve aqui, a faixa é julgada na normalização
            normalize_date_with_max_year(&value, 9999).value.map(|_| value)
        }
    }
}

/// Colapsa espaços e descarta tudo a partir do primeiro rótulo conhecido.
pub fn cut_at_labels(value: &str) -> String {
    let tokens: Vec<&str> = value
        .split_whitespace()
        .take_while(|t| {
            let folded = fold(t.trim_matches(|c: char| !c.is_alphanumeric()));
            !LABEL_STOPWORDS.contains(&folded.as_str())
        })
        .collect();
    tokens.join(" ")
}

// === Padrões compartilhados ===

pub const ANS_CODE_PATTERNS: &[&str] = &[
    r"\bANS\b\s*[-–:]?\s*(?:N[º°O.]?\s*)?[:.]?\s*(\d{2}\.?\d{3}-?\d)\b",
    r"REGISTRO\s+(?:NA\s+)?ANS\s*[:.]?\s*(\d{6})\b",
];

pub const CPF_PATTERNS: &[&str] = &[
    r"\bCPF\s*[:.]?\s*(?:N[º°O.]?\s*)?(\d{3}\.?\d{3}\.?\d{3}[-.]?\d{2})\b",
    r"\b(\d{3}\.\d{3}\.\d{3}-\d{2})\b",
];

pub const BIRTH_DATE_PATTERNS: &[&str] = &[
    r"(?:DATA\s+DE\s+NASC(?:IMENTO)?|DT\.?\s*NASC\.?|NASC(?:IMENTO)?|NASCIDO\s+EM)\s*[:.]?\s*(\d{1,2}[/\-.]\d{1,2}[/\-.]\d{4})",
];

pub const ANY_DATE_PATTERNS: &[&str] = &[r"\b(\d{2}/\d{2}/\d{4})\b"];

pub const HOLDER_LABEL_PATTERNS: &[&str] = &[
    r"(?:NOME\s+DO\s+BENEFICI[ÁA]RIO|NOME\s+DO\s+TITULAR|BENEFICI[ÁA]RIO|TITULAR|USU[ÁA]RIO|NOME)\s*[:.]?\s*([\p{Lu}][\p{Lu}' ]{3,})",
];

pub const PLAN_LABEL_PATTERNS: &[&str] = &[
    r"\bPLANO\s*[:.]?\s*([\p{Lu}\d][\p{Lu}\d /+\-]{1,40})",
    r"\bPRODUTO\s*[:.]?\s*([\p{Lu}\d][\p{Lu}\d /+\-]{1,40})",
];

/// Rótulo + número, comum a várias carteirinhas.
pub const CARD_LABEL_PATTERNS: &[&str] = &[
    r"(?:N[º°O.]?\s*(?:DA\s+)?CARTEIRA|CARTEIRA\s*N[º°O.]?|N[º°O.]?\s*(?:DO\s+)?CART[ÃA]O|CART[ÃA]O\s*N[º°O.]?|CARTEIRINHA|CARTEIRA|MATR[ÍI]CULA|C[ÓO]D(?:IGO)?\.?\s*(?:DO\s+)?BENEFICI[ÁA]RIO)\s*[:.]?\s*(\d[\d .\-]{6,26}\d)",
];

/// Primeiro código ANS de 6 dígitos encontrado.
pub fn extract_ans_code(doc: &DocumentText, rule: &FieldRule) -> Option<String> {
    rule.patterns.iter().find_map(|pattern| {
        pattern.captures_iter(doc.upper()).find_map(|caps| {
            let digits = digits_only(caps.get(1)?.as_str());
            (digits.len() == 6).then_some(digits)
        })
    })
}

/// Candidatos a CPF (só dígitos) na ordem dos padrões, sem repetição.
pub fn cpf_candidates(doc: &DocumentText, patterns: &[Regex]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for pattern in patterns {
        for caps in pattern.captures_iter(doc.upper()) {
            if let Some(m) = caps.get(1) {
                let digits = digits_only(m.as_str());
                if digits.len() == 11 && !out.contains(&digits) {
                    out.push(digits);
                }
            }
        }
    }
    out
}

// === Pesos de confiança ===

/// Grupos de campos usados no cálculo de confiança do extrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Slot {
    Identifier,
    Institution,
    Number,
    Plan,
    Holder,
    BirthDate,
}

impl Slot {
    pub fn weight(&self) -> f64 {
        match self {
            Slot::Identifier => 0.30,
            Slot::Institution => 0.25,
            Slot::Number => 0.20,
            Slot::Plan => 0.10,
            Slot::Holder => 0.075,
            Slot::BirthDate => 0.075,
        }
    }

    fn present(&self, fields: &ExtractedFields) -> bool {
        let any = |names: &[FieldName]| names.iter().any(|n| fields.is_present(*n));
        match self {
            Slot::Identifier => any(&[FieldName::IdentifierNumber]),
            Slot::Institution => any(&[FieldName::IssuerCode, FieldName::IssuerName]),
            Slot::Number => any(&[FieldName::CardNumber, FieldName::DocumentNumber]),
            Slot::Plan => any(&[FieldName::PlanName]),
            Slot::Holder => any(&[FieldName::HolderName]),
            Slot::BirthDate => any(&[FieldName::BirthDate]),
        }
    }
}

pub const ALL_SLOTS: &[Slot] = &[
    Slot::Identifier,
    Slot::Institution,
    Slot::Number,
    Slot::Plan,
    Slot::Holder,
    Slot::BirthDate,
];

/// Soma ponderada dos grupos presentes, normalizada pelo máximo que o
/// extrator consegue preencher.
pub fn weighted_confidence(slots: &[Slot], fields: &ExtractedFields) -> f64 {
    let max: f64 = slots.iter().map(Slot::weight).sum();
    if max <= 0.0 {
        return 0.0;
    }
    let got: f64 = slots.iter().filter(|s| s.present(fields)).map(Slot::weight).sum();
    (got / max).clamp(0.0, 1.0)
}

/// Valores crus devolvidos por um extrator, ainda não normalizados.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFields {
    values: BTreeMap<FieldName, String>,
}

impl RawFields {
    pub fn set(&mut self, name: FieldName, value: Option<String>) {
        if let Some(v) = value.filter(|v| !v.trim().is_empty()) {
            self.values.insert(name, v);
        }
    }

    pub fn get(&self, name: FieldName) -> Option<&str> {
        self.values.get(&name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = FieldName> + '_ {
        self.values.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_skips_rejected_candidates() {
        let doc = DocumentText::new("CNS 898 0012 3456 0005\nCARTEIRA 1898 0012 3456 0005\nCARTEIRA 0064 8000 0123 4567");
        let rule = FieldRule::new(&[r"(\d{4}\s?\d{4}\s?\d{4}\s?\d{4})"], Shape::CardDigits { min: 16, max: 16 });
        assert_eq!(rule.first_match(doc.upper(), &doc).as_deref(), Some("0064800001234567"));
    }

    #[test]
    fn test_card_shape_rejects_cns_overlap_and_cpf() {
        let doc = DocumentText::new("CNS 898001234560005");
        let shape = Shape::CardDigits { min: 11, max: 17 };
        assert!(accept("1898001234560005", shape, &doc).is_none());
        assert!(accept("529.982.247-25", shape, &doc).is_none());
        assert_eq!(accept("0064 8000 0123", shape, &doc).as_deref(), Some("006480000123"));
    }

    #[test]
    fn test_person_name_cut_at_labels() {
        let doc = DocumentText::new("");
        assert_eq!(
            accept("MARIA DA SILVA  DATA NASC", Shape::PersonName, &doc).as_deref(),
            Some("MARIA DA SILVA")
        );
        assert!(accept("MARIA", Shape::PersonName, &doc).is_none());
    }

    #[test]
    fn test_plan_rejects_generic_phrases() {
        let doc = DocumentText::new("");
        let shape = Shape::Text { min: 2, max: 40 };
        assert!(accept("DE SAÚDE", shape, &doc).is_none());
        assert!(accept("12345", shape, &doc).is_none());
        assert_eq!(accept("UNIFACIL  ACOMODAÇÃO ENFERMARIA", shape, &doc).as_deref(), Some("UNIFACIL"));
    }

    #[test]
    fn test_ans_code_variants() {
        let rule = FieldRule::new(ANS_CODE_PATTERNS, Shape::Text { min: 6, max: 6 });
        for (text, code) in [
            ("ANS - n° 00.070-1", "000701"),
            ("Registro ANS: 33569-0", "335690"),
            ("ANS Nº 326305", "326305"),
        ] {
            let doc = DocumentText::new(text);
            assert_eq!(extract_ans_code(&doc, &rule).as_deref(), Some(code), "{text}");
        }
    }

    #[test]
    fn test_weighted_confidence_normalized_by_available_slots() {
        let mut fields = ExtractedFields::default();
        assert_eq!(weighted_confidence(ALL_SLOTS, &fields), 0.0);
        fields.identifier_number = Some("898001234560005".into());
        fields.issuer_name = Some("SUS".into());
        let sus_slots = [Slot::Identifier, Slot::Institution, Slot::Holder, Slot::BirthDate];
        let c = weighted_confidence(&sus_slots, &fields);
        assert!((c - 0.55 / 0.70).abs() < 1e-9);
        fields.holder_name = Some("Ana Lima".into());
        fields.birth_date = Some("1990-01-01".into());
        assert!((weighted_confidence(&sus_slots, &fields) - 1.0).abs() < 1e-9);
    }
}
