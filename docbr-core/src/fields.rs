//! # Campos Extraídos e Confianças
//!
//! [`ExtractedFields`] é um mapa de campos opcionais; ausência é um estado
//! válido. [`FieldConfidence`] é o mapa paralelo campo → confiança.
//!
//! Os dois só são preenchidos juntos via [`FieldSet::record`], que garante:
//!
//! - campo presente ⇒ valor não vazio;
//! - campo presente ⇔ existe entrada de confiança;
//! - confiança sempre em [0,1].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Nome de cada campo que o pipeline pode extrair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    /// CNS ou CPF que passou no dígito verificador.
    IdentifierNumber,
    /// CPF normalizado, mesmo quando o dígito verificador falha.
    Cpf,
    /// Número de registro do RG ou da CNH (sem dígito verificador confiável).
    DocumentNumber,
    CardNumber,
    PlanName,
    HolderName,
    BirthDate,
    IssuerName,
    IssuerCode,
    MotherName,
    FatherName,
    BirthPlace,
    DocumentOrigin,
}

impl FieldName {
    pub fn name(&self) -> &'static str {
        match self {
            FieldName::IdentifierNumber => "identifier_number",
            FieldName::Cpf => "cpf",
            FieldName::DocumentNumber => "document_number",
            FieldName::CardNumber => "card_number",
            FieldName::PlanName => "plan_name",
            FieldName::HolderName => "holder_name",
            FieldName::BirthDate => "birth_date",
            FieldName::IssuerName => "issuer_name",
            FieldName::IssuerCode => "issuer_code",
            FieldName::MotherName => "mother_name",
            FieldName::FatherName => "father_name",
            FieldName::BirthPlace => "birth_place",
            FieldName::DocumentOrigin => "document_origin",
        }
    }

    pub const ALL: [FieldName; 13] = [
        FieldName::IdentifierNumber,
        FieldName::Cpf,
        FieldName::DocumentNumber,
        FieldName::CardNumber,
        FieldName::PlanName,
        FieldName::HolderName,
        FieldName::BirthDate,
        FieldName::IssuerName,
        FieldName::IssuerCode,
        FieldName::MotherName,
        FieldName::FatherName,
        FieldName::BirthPlace,
        FieldName::DocumentOrigin,
    ];
}

impl std::fmt::Display for FieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Campos extraídos de um documento. Todos opcionais.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractedFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpf: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mother_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub father_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_place: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_origin: Option<String>,
}

impl ExtractedFields {
    pub fn get(&self, name: FieldName) -> Option<&str> {
        self.slot(name).as_deref()
    }

    pub fn is_present(&self, name: FieldName) -> bool {
        self.get(name).is_some()
    }

    /// Campos presentes, na ordem de [`FieldName::ALL`].
    pub fn present(&self) -> Vec<FieldName> {
        FieldName::ALL.into_iter().filter(|f| self.is_present(*f)).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.present().is_empty()
    }

    fn slot(&self, name: FieldName) -> &Option<String> {
        match name {
            FieldName::IdentifierNumber => &self.identifier_number,
            FieldName::Cpf => &self.cpf,
            FieldName::DocumentNumber => &self.document_number,
            FieldName::CardNumber => &self.card_number,
            FieldName::PlanName => &self.plan_name,
            FieldName::HolderName => &self.holder_name,
            FieldName::BirthDate => &self.birth_date,
            FieldName::IssuerName => &self.issuer_name,
            FieldName::IssuerCode => &self.issuer_code,
            FieldName::MotherName => &self.mother_name,
            FieldName::FatherName => &self.father_name,
            FieldName::BirthPlace => &self.birth_place,
            FieldName::DocumentOrigin => &self.document_origin,
        }
    }

    fn slot_mut(&mut self, name: FieldName) -> &mut Option<String> {
        match name {
            FieldName::IdentifierNumber => &mut self.identifier_number,
            FieldName::Cpf => &mut self.cpf,
            FieldName::DocumentNumber => &mut self.document_number,
            FieldName::CardNumber => &mut self.card_number,
            FieldName::PlanName => &mut self.plan_name,
            FieldName::HolderName => &mut self.holder_name,
            FieldName::BirthDate => &mut self.birth_date,
            FieldName::IssuerName => &mut self.issuer_name,
            FieldName::IssuerCode => &mut self.issuer_code,
            FieldName::MotherName => &mut self.mother_name,
            FieldName::FatherName => &mut self.father_name,
            FieldName::BirthPlace => &mut self.birth_place,
            FieldName::DocumentOrigin => &mut self.document_origin,
        }
    }
}

/// Confiança por campo presente.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldConfidence(BTreeMap<FieldName, f64>);

impl FieldConfidence {
    pub fn get(&self, name: FieldName) -> Option<f64> {
        self.0.get(&name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldName, f64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.values().copied()
    }
}

/// Construtor conjunto de [`ExtractedFields`] e [`FieldConfidence`].
#[derive(Debug, Clone, Default)]
pub struct FieldSet {
    fields: ExtractedFields,
    confidence: FieldConfidence,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra um campo. Valores vazios ou só com espaços são ignorados e
    /// o campo permanece ausente. Retorna `true` se o campo foi gravado.
    pub fn record(&mut self, name: FieldName, value: Option<String>, confidence: f64) -> bool {
        let Some(value) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) else {
            return false;
        };
        *self.fields.slot_mut(name) = Some(value);
        self.confidence.0.insert(name, confidence.clamp(0.0, 1.0));
        true
    }

    pub fn fields(&self) -> &ExtractedFields {
        &self.fields
    }

    pub fn into_parts(self) -> (ExtractedFields, FieldConfidence) {
        (self.fields, self.confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_keeps_fields_and_confidence_paired() {
        let mut set = FieldSet::new();
        assert!(set.record(FieldName::HolderName, Some("Maria Souza".into()), 0.8));
        assert!(!set.record(FieldName::PlanName, Some("   ".into()), 0.9));
        assert!(!set.record(FieldName::CardNumber, None, 0.9));
        set.record(FieldName::BirthDate, Some("1985-03-07".into()), 1.7);

        let (fields, confidence) = set.into_parts();
        assert_eq!(fields.present(), vec![FieldName::HolderName, FieldName::BirthDate]);
        assert_eq!(confidence.len(), 2);
        assert_eq!(confidence.get(FieldName::BirthDate), Some(1.0));
        assert!(fields.plan_name.is_none());
        for name in fields.present() {
            assert!(!fields.get(name).unwrap().is_empty());
            assert!(confidence.get(name).is_some());
        }
    }

    #[test]
    fn test_field_names_unique() {
        let mut names: Vec<&str> = FieldName::ALL.iter().map(|f| f.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), FieldName::ALL.len());
    }

    #[test]
    fn test_serde_keeps_optional_fields_optional() {
        let mut set = FieldSet::new();
        set.record(FieldName::IssuerCode, Some("000701".into()), 1.0);
        let (fields, confidence) = set.into_parts();

        let json = serde_json::to_string(&fields).unwrap();
        assert_eq!(json, r#"{"issuer_code":"000701"}"#);
        let back: ExtractedFields = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fields);

        let json = serde_json::to_string(&confidence).unwrap();
        assert_eq!(json, r#"{"issuer_code":1.0}"#);
    }
}
