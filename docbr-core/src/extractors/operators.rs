//! # Variantes de Carteirinha de Convênio
//!
//! [`OperatorExtractor`] é uma tabela de regras: padrões de reconhecimento
//! da instituição e, para cada campo, uma lista ordenada de padrões com um
//! filtro de formato. A ordem codifica a prioridade entre layouts reais
//! (rótulo conhecido antes de agrupamento de dígitos, layout específico
//! antes do genérico) e não deve ser reordenada.
//!
//! Tamanhos de carteirinha por operadora (dígitos):
//!
//! | Operadora          | Dígitos |
//! |--------------------|---------|
//! | Unimed             | 16–17   |
//! | Bradesco Saúde     | 13–17   |
//! | SulAmérica         | 17–21   |
//! | Amil               | 8–11    |
//! | NotreDame / Hapvida| 10–16   |
//! | Porto Seguro       | 16–18   |
//! | Cassi              | 9–16    |
//!
//! O Cartão SUS não tem número de carteirinha: o identificador é o CNS.

use regex::Regex;

use super::common::{
    compile, cpf_candidates, extract_ans_code, weighted_confidence, FieldRule, RawFields, Shape, Slot,
    ALL_SLOTS, ANS_CODE_PATTERNS, BIRTH_DATE_PATTERNS, CARD_LABEL_PATTERNS, CPF_PATTERNS, HOLDER_LABEL_PATTERNS,
    PLAN_LABEL_PATTERNS,
};
use super::ExtractorKind;
use crate::checksum::is_valid_cpf;
use crate::fields::{ExtractedFields, FieldName};
use crate::text::DocumentText;

const PLAN_SHAPE: Shape = Shape::Text { min: 2, max: 40 };
const ISSUER_SHAPE: Shape = Shape::Text { min: 2, max: 60 };

/// De onde vem o `identifier_number` da variante.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierSource {
    /// Primeiro CNS válido do texto.
    Cns,
    /// Primeiro CPF válido do texto.
    Cpf,
}

/// Uma variante de extrator dirigida por padrões.
pub struct OperatorExtractor {
    kind: ExtractorKind,
    /// Nome usado quando o texto não traz uma forma mais completa.
    issuer_label: Option<&'static str>,
    handles: Vec<Regex>,
    identifier: IdentifierSource,
    slots: &'static [Slot],
    pub(super) card_number: FieldRule,
    pub(super) document_number: FieldRule,
    pub(super) plan: FieldRule,
    pub(super) holder_name: FieldRule,
    pub(super) birth_date: FieldRule,
    pub(super) issuer_name: FieldRule,
    pub(super) issuer_code: FieldRule,
    pub(super) mother_name: FieldRule,
    pub(super) father_name: FieldRule,
    pub(super) birth_place: FieldRule,
    pub(super) document_origin: FieldRule,
    cpf: Vec<Regex>,
}

impl OperatorExtractor {
    /// Variante com os padrões compartilhados de titular, nascimento,
    /// código ANS e CPF; os demais campos começam vazios.
    pub(super) fn new(kind: ExtractorKind, slots: &'static [Slot]) -> Self {
        Self {
            kind,
            issuer_label: None,
            handles: vec![],
            identifier: IdentifierSource::Cns,
            slots,
            card_number: FieldRule::empty(Shape::CardDigits { min: 8, max: 21 }),
            document_number: FieldRule::empty(Shape::DocumentDigits { min: 5, max: 11 }),
            plan: FieldRule::new(PLAN_LABEL_PATTERNS, PLAN_SHAPE),
            holder_name: FieldRule::new(HOLDER_LABEL_PATTERNS, Shape::PersonName),
            birth_date: FieldRule::new(BIRTH_DATE_PATTERNS, Shape::Date),
            issuer_name: FieldRule::empty(ISSUER_SHAPE),
            issuer_code: FieldRule::new(ANS_CODE_PATTERNS, ISSUER_SHAPE),
            mother_name: FieldRule::empty(Shape::PersonName),
            father_name: FieldRule::empty(Shape::PersonName),
            birth_place: FieldRule::empty(Shape::Text { min: 3, max: 60 }),
            document_origin: FieldRule::empty(Shape::Line { min: 3, max: 80 }),
            cpf: compile(CPF_PATTERNS),
        }
    }

    pub(super) fn handles(mut self, patterns: &[&str]) -> Self {
        self.handles = compile(patterns);
        self
    }

    pub(super) fn issuer(mut self, label: &'static str, patterns: &[&str]) -> Self {
        self.issuer_label = Some(label);
        self.issuer_name = FieldRule::new(patterns, ISSUER_SHAPE);
        self
    }

    pub(super) fn issuer_patterns(mut self, patterns: &[&str]) -> Self {
        self.issuer_name = FieldRule::new(patterns, ISSUER_SHAPE);
        self
    }

    pub(super) fn identifier(mut self, source: IdentifierSource) -> Self {
        self.identifier = source;
        self
    }

    /// Padrões próprios da operadora seguidos dos rótulos comuns.
    pub(super) fn card(mut self, patterns: &[&str], min: usize, max: usize) -> Self {
        self.card_number = FieldRule::layered(patterns, CARD_LABEL_PATTERNS, Shape::CardDigits { min, max });
        self
    }

    pub(super) fn plan(mut self, patterns: &[&str]) -> Self {
        self.plan = FieldRule::layered(patterns, PLAN_LABEL_PATTERNS, PLAN_SHAPE);
        self
    }

    pub(super) fn without_plan(mut self) -> Self {
        self.plan = FieldRule::empty(PLAN_SHAPE);
        self
    }

    pub(super) fn without_issuer_code(mut self) -> Self {
        self.issuer_code = FieldRule::empty(ISSUER_SHAPE);
        self
    }

    pub(super) fn holder(mut self, patterns: &[&str]) -> Self {
        self.holder_name = FieldRule::layered(patterns, HOLDER_LABEL_PATTERNS, Shape::PersonName);
        self
    }

    pub(super) fn birth(mut self, patterns: &[&str]) -> Self {
        self.birth_date = FieldRule::layered(patterns, BIRTH_DATE_PATTERNS, Shape::Date);
        self
    }

    pub fn kind(&self) -> ExtractorKind {
        self.kind
    }

    /// Algum padrão de reconhecimento da instituição casa no texto dobrado.
    pub fn can_handle(&self, doc: &DocumentText) -> bool {
        self.handles.iter().any(|p| p.is_match(doc.folded()))
    }

    /// Número da carteirinha, só dígitos. Procurado no texto sem os CNS.
    pub fn extract_card_number(&self, doc: &DocumentText) -> Option<String> {
        self.card_number.first_match(doc.scrubbed(), doc)
    }

    pub fn extract_plan(&self, doc: &DocumentText) -> Option<String> {
        self.plan.first_match(doc.upper(), doc)
    }

    pub fn extract_holder_name(&self, doc: &DocumentText) -> Option<String> {
        self.holder_name.first_match(doc.upper(), doc)
    }

    pub fn extract_birth_date(&self, doc: &DocumentText) -> Option<String> {
        self.birth_date.first_match(doc.upper(), doc)
    }

    /// CNS ou CPF que passou no dígito verificador. Nunca devolve um
    /// candidato inválido.
    pub fn extract_identifier(&self, doc: &DocumentText) -> Option<String> {
        match self.identifier {
            IdentifierSource::Cns => doc.cns().first().cloned(),
            IdentifierSource::Cpf => cpf_candidates(doc, &self.cpf).into_iter().find(|c| is_valid_cpf(c)),
        }
    }

    /// CPF impresso: o primeiro válido, senão o primeiro com 11 dígitos.
    pub fn extract_cpf(&self, doc: &DocumentText) -> Option<String> {
        let candidates = cpf_candidates(doc, &self.cpf);
        candidates
            .iter()
            .find(|c| is_valid_cpf(c))
            .or_else(|| candidates.first())
            .cloned()
    }

    pub fn extract_document_number(&self, doc: &DocumentText) -> Option<String> {
        self.document_number.first_match(doc.scrubbed(), doc)
    }

    /// Nome da instituição como impresso, ou o rótulo fixo da variante.
    pub fn extract_issuer_name(&self, doc: &DocumentText) -> Option<String> {
        self.issuer_name
            .first_match(doc.upper(), doc)
            .or_else(|| self.issuer_label.map(str::to_string))
    }

    pub fn extract_issuer_code(&self, doc: &DocumentText) -> Option<String> {
        extract_ans_code(doc, &self.issuer_code)
    }

    pub fn issuer_label(&self) -> Option<&'static str> {
        self.issuer_label
    }

    pub fn extract(&self, doc: &DocumentText) -> RawFields {
        let mut raw = RawFields::default();
        raw.set(FieldName::IdentifierNumber, self.extract_identifier(doc));
        raw.set(FieldName::Cpf, self.extract_cpf(doc));
        raw.set(FieldName::CardNumber, self.extract_card_number(doc));
        raw.set(FieldName::DocumentNumber, self.extract_document_number(doc));
        raw.set(FieldName::PlanName, self.extract_plan(doc));
        raw.set(FieldName::HolderName, self.extract_holder_name(doc));
        raw.set(FieldName::BirthDate, self.extract_birth_date(doc));
        raw.set(FieldName::IssuerName, self.extract_issuer_name(doc));
        raw.set(FieldName::IssuerCode, self.extract_issuer_code(doc));
        raw.set(FieldName::MotherName, self.mother_name.first_match(doc.upper(), doc));
        raw.set(FieldName::FatherName, self.father_name.first_match(doc.upper(), doc));
        raw.set(FieldName::BirthPlace, self.birth_place.first_match(doc.upper(), doc));
        raw.set(FieldName::DocumentOrigin, self.document_origin.first_match(doc.upper(), doc));
        raw
    }

    pub fn get_confidence(&self, fields: &ExtractedFields) -> f64 {
        weighted_confidence(self.slots, fields)
    }
}

const SUS_SLOTS: &[Slot] = &[Slot::Identifier, Slot::Institution, Slot::Holder, Slot::BirthDate];

/// Pool de convênios em ordem de prioridade. O Cartão SUS fica por último:
/// carteirinhas de operadora costumam imprimir o CNS sob o rótulo "Cartão
/// Nacional de Saúde" e devem ficar com a variante da marca.
pub fn insurance_pool() -> Vec<OperatorExtractor> {
    vec![
        unimed(),
        bradesco_saude(),
        sulamerica(),
        amil(),
        notredame_intermedica(),
        hapvida(),
        porto_seguro(),
        cassi(),
        sus_card(),
    ]
}

fn sus_card() -> OperatorExtractor {
    OperatorExtractor::new(ExtractorKind::SusCard, SUS_SLOTS)
        .handles(&[r"CARTAO\s+NACIONAL\s+DE\s+SAUDE", r"\bSUS\b", r"MINISTERIO\s+DA\s+SAUDE"])
        .issuer("SUS", &[r"(CART[ÃA]O\s+NACIONAL\s+DE\s+SA[ÚU]DE)", r"(MINIST[ÉE]RIO\s+DA\s+SA[ÚU]DE)"])
        .without_plan()
        .without_issuer_code()
        .holder(&[r"(?m)^\s*NOME\s*[:.]?\s*\n?\s*([\p{Lu}][\p{Lu}' ]{3,})"])
        .birth(&[r"(?:DATA\s+NASC\.?|NASC\.?)\s*[:.]?\s*(\d{2}/\d{2}/\d{4})"])
}

fn unimed() -> OperatorExtractor {
    OperatorExtractor::new(ExtractorKind::Unimed, ALL_SLOTS)
        .handles(&[r"\bUNIMED\b"])
        .issuer("UNIMED", &[r"\b(UNIMED(?:[ ]+[\p{Lu}]{3,}){0,2})\b"])
        .card(
            &[
                r"\b(\d[ ]\d{3}[ ]\d{12}[ ]\d)\b",
                r"\b(\d{4}[ ]\d{4}[ ]\d{4}[ ]\d{4}(?:[ ]?\d)?)\b",
                r"\b(\d{16,17})\b",
            ],
            16,
            17,
        )
        .plan(&[r"\b(UNIF[ÁA]CIL|UNIPART|UNIPLAN|UNIMAX|UNIFLEX|UNIMED\s+(?:ESTILO|ALFA|BETA|DELTA))\b"])
        .holder(&[r"\d{4}[ ]\d{4}[ ]\d{4}[ ]\d{4}(?:[ ]?\d)?[ ]*\n\s*([\p{Lu}][\p{Lu}' ]{4,})"])
}

fn bradesco_saude() -> OperatorExtractor {
    OperatorExtractor::new(ExtractorKind::BradescoSaude, ALL_SLOTS)
        .handles(&[r"BRADESCO\s+SAUDE", r"\bBRADESCO\b"])
        .issuer("BRADESCO SAÚDE", &[r"\b(BRADESCO\s+SA[ÚU]DE(?:[ ]+S\.?A\.?)?)"])
        .card(
            &[
                r"\b(\d{3}[ ]\d{3}[ ]\d{6}[ ]\d{3})\b",
                r"\b(\d{3}\.\d{3}\.\d{6}\.\d{3})\b",
                r"\b(\d{13,17})\b",
            ],
            13,
            17,
        )
        .plan(&[r"\b(TOP\s+NACIONAL(?:\s+FLEX)?|NACIONAL\s+FLEX|EFETIVO(?:\s+I{1,3}|\s+IV)?|SA[ÚU]DE\s+TOP)\b"])
}

fn sulamerica() -> OperatorExtractor {
    OperatorExtractor::new(ExtractorKind::SulAmerica, ALL_SLOTS)
        .handles(&[r"SUL\s?AMERICA"])
        .issuer("SULAMÉRICA", &[r"\b(SUL\s?AM[ÉE]RICA(?:[ ]+SA[ÚU]DE)?)"])
        .card(
            &[r"\b(\d{5}[ ]?\d{4}[ ]?\d{4}[ ]?\d{4}(?:[ ]?\d{4})?)\b", r"\b(\d{3}[ ]\d{5}[ ]\d{4}[ ]\d{4}[ ]\d{4})\b"],
            17,
            21,
        )
        .plan(&[r"\b(ESPECIAL\s+\d{2,3}|EXECUTIVO|PRESTIGE|CL[ÁA]SSICO|EXATO|B[ÁA]SICO\s+\d{0,3})"])
        .holder(&[r"\d{5}[ ]?\d{4}[ ]?\d{4}[ ]?\d{4}(?:[ ]?\d{4})?[ ]*\n\s*([\p{Lu}][\p{Lu}' ]{4,})"])
}

fn amil() -> OperatorExtractor {
    OperatorExtractor::new(ExtractorKind::Amil, ALL_SLOTS)
        .handles(&[r"\bAMIL\b"])
        .issuer("AMIL", &[r"\b(AMIL\s+ASSIST[ÊE]NCIA\s+M[ÉE]DICA(?:\s+INTERNACIONAL)?)"])
        .card(&[r"\b(\d{8,11})\b", r"\b(\d{3}[ ]\d{3}[ ]\d{3})\b"], 8, 11)
        .plan(&[r"\b(AMIL\s+(?:S\d{3,4}|\d{2,3}|ONE(?:\s+S\d{4})?|BLUE(?:\s+[IVX]+)?|F[ÁA]CIL(?:\s+S\d{2,3})?))\b"])
}

fn notredame_intermedica() -> OperatorExtractor {
    OperatorExtractor::new(ExtractorKind::NotreDameIntermedica, ALL_SLOTS)
        .handles(&[r"NOTRE\s?DAME", r"INTERMEDICA", r"\bGNDI\b"])
        .issuer(
            "NOTREDAME INTERMÉDICA",
            &[r"\b(NOTRE\s?DAME(?:[ ]+INTERM[ÉE]DICA)?)", r"\b(INTERM[ÉE]DICA(?:[ ]+SA[ÚU]DE)?)"],
        )
        .card(&[r"\b(\d{3}[ ]\d{3}[ ]\d{3}[ ]\d{3}(?:[ ]\d{1,4})?)\b", r"\b(\d{10,16})\b"], 10, 16)
        .plan(&[r"\b((?:SMART|ADVANCE|PREMIUM)\s*\d{3})\b"])
}

fn hapvida() -> OperatorExtractor {
    OperatorExtractor::new(ExtractorKind::Hapvida, ALL_SLOTS)
        .handles(&[r"\bHAPVIDA\b"])
        .issuer("HAPVIDA", &[r"\b(HAPVIDA(?:[ ]+ASSIST[ÊE]NCIA\s+M[ÉE]DICA)?)"])
        .card(&[r"\b(\d{10,16})\b", r"\b(\d{4}[ ]\d{4}[ ]\d{2,8})\b"], 10, 16)
        .plan(&[r"\b(NOSSO\s+PLANO|HAPVIDA\s+MIX|PLENO|MASTER)\b"])
}

fn porto_seguro() -> OperatorExtractor {
    OperatorExtractor::new(ExtractorKind::PortoSeguro, ALL_SLOTS)
        .handles(&[r"PORTO\s+SEGURO"])
        .issuer("PORTO SEGURO SAÚDE", &[r"\b(PORTO\s+SEGURO(?:[ ]+SA[ÚU]DE)?)"])
        .card(&[r"\b(\d{4}[ ]\d{4}[ ]\d{4}[ ]\d{4}(?:[ ]?\d{1,2})?)\b", r"\b(\d{16,18})\b"], 16, 18)
        .plan(&[r"\b((?:PRATA|OURO|DIAMANTE|BRONZE)(?:\s+(?:MAIS|PRO))?)\b"])
}

fn cassi() -> OperatorExtractor {
    OperatorExtractor::new(ExtractorKind::Cassi, ALL_SLOTS)
        .handles(&[r"\bCASSI\b", r"CAIXA\s+DE\s+ASSISTENCIA\s+DOS\s+FUNCIONARIOS"])
        .issuer(
            "CASSI",
            &[r"\b(CAIXA\s+DE\s+ASSIST[ÊE]NCIA\s+DOS\s+FUNCION[ÁA]RIOS\s+DO\s+BANCO\s+DO\s+BRASIL)"],
        )
        .card(&[r"\b(\d{3}\.\d{3}\.\d{3}\.\d{2,4})\b", r"\b(\d{9,16})\b"], 9, 16)
        .plan(&[r"\b(CASSI\s+FAM[ÍI]LIA(?:\s+I{1,3})?|PLANO\s+DE\s+ASSOCIADOS|CASSI\s+ESSENCIAL)\b"])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::samples;

    fn variant(kind: ExtractorKind) -> OperatorExtractor {
        insurance_pool()
            .into_iter()
            .find(|e| e.kind() == kind)
            .unwrap()
    }

    #[test]
    fn test_unimed_card_with_cns_keeps_numbers_apart() {
        let doc = DocumentText::new(samples::UNIMED_WITH_CNS);
        let unimed = variant(ExtractorKind::Unimed);
        assert!(unimed.can_handle(&doc));
        let card = unimed.extract_card_number(&doc).unwrap();
        let cns = unimed.extract_identifier(&doc).unwrap();
        assert_eq!(card, "0064800001234567");
        assert_eq!(cns, "898001234560005");
        assert!(!card.contains(&cns));
        assert_eq!(unimed.extract_plan(&doc).as_deref(), Some("UNIFÁCIL"));
        assert_eq!(unimed.extract_holder_name(&doc).as_deref(), Some("MARIA DAS GRAÇAS SOUZA"));
        assert_eq!(unimed.extract_birth_date(&doc).as_deref(), Some("07/03/1985"));
        assert_eq!(unimed.extract_issuer_code(&doc).as_deref(), Some("335690"));
        assert_eq!(unimed.extract_issuer_name(&doc).as_deref(), Some("UNIMED CAMPINAS"));
    }

    #[test]
    fn test_unimed_seguros_ans_code() {
        let doc = DocumentText::new(samples::UNIMED_SEGUROS_CARD);
        let unimed = variant(ExtractorKind::Unimed);
        assert_eq!(unimed.extract_issuer_code(&doc).as_deref(), Some("000701"));
        assert_eq!(unimed.extract_card_number(&doc).as_deref(), Some("09940000123456780"));
        assert_eq!(unimed.extract_holder_name(&doc).as_deref(), Some("CARLOS EDUARDO MENDES"));
        assert_eq!(unimed.extract_plan(&doc).as_deref(), Some("UNIMED SEGUROS NACIONAL"));
    }

    #[test]
    fn test_sus_card_identifier_is_cns() {
        let doc = DocumentText::new(samples::SUS_CARD);
        let sus = variant(ExtractorKind::SusCard);
        assert!(sus.can_handle(&doc));
        assert_eq!(sus.extract_identifier(&doc).as_deref(), Some("702500432150001"));
        assert!(sus.extract_card_number(&doc).is_none());
        assert!(sus.extract_plan(&doc).is_none());
        assert!(sus.card_number.is_empty());
        assert!(sus.plan.is_empty());
        assert!(sus.issuer_code.is_empty());
        assert!(!sus.holder_name.is_empty());
        assert_eq!(sus.extract_holder_name(&doc).as_deref(), Some("JOÃO PEDRO ALVES"));
        assert_eq!(sus.extract_birth_date(&doc).as_deref(), Some("02/11/1960"));
    }

    #[test]
    fn test_invalid_cns_never_becomes_identifier() {
        let doc = DocumentText::new("CARTÃO NACIONAL DE SAÚDE\nCNS 898 0012 3456 7890\nNOME ANA LIMA");
        let sus = variant(ExtractorKind::SusCard);
        assert!(sus.extract_identifier(&doc).is_none());
        assert_eq!(doc.rejected_cns(), ["898001234567890".to_string()]);
    }

    #[test]
    fn test_operator_samples_extract_card_and_plan() {
        let cases = [
            (ExtractorKind::BradescoSaude, samples::BRADESCO_CARD, "123456789012345", "TOP NACIONAL FLEX"),
            (ExtractorKind::SulAmerica, samples::SULAMERICA_CARD, "88888012345670018", "ESPECIAL 100"),
            (ExtractorKind::Amil, samples::AMIL_CARD, "087654321", "AMIL 400"),
            (ExtractorKind::NotreDameIntermedica, samples::NOTREDAME_CARD, "123456789012", "SMART 200"),
            (ExtractorKind::Hapvida, samples::HAPVIDA_CARD, "0012345678", "NOSSO PLANO"),
            (ExtractorKind::PortoSeguro, samples::PORTO_SEGURO_CARD, "4321000012345678", "PRATA MAIS"),
            (ExtractorKind::Cassi, samples::CASSI_CARD, "123456789012", "CASSI FAMÍLIA II"),
        ];
        for (kind, text, card, plan) in cases {
            let doc = DocumentText::new(text);
            let extractor = variant(kind);
            assert!(extractor.can_handle(&doc), "{kind}");
            assert_eq!(extractor.extract_card_number(&doc).as_deref(), Some(card), "{kind}");
            assert_eq!(extractor.extract_plan(&doc).as_deref(), Some(plan), "{kind}");
            assert!(extractor.extract_holder_name(&doc).is_some(), "{kind}");
        }
    }

    #[test]
    fn test_card_shape_rejects_wrong_length() {
        let doc = DocumentText::new("AMIL\nCARTEIRA 1234567");
        assert!(variant(ExtractorKind::Amil).extract_card_number(&doc).is_none());
    }

    #[test]
    fn test_issuer_label_used_when_text_has_only_brand() {
        let doc = DocumentText::new("HAPVIDA\nCARTEIRA 0012345678");
        let hapvida = variant(ExtractorKind::Hapvida);
        assert_eq!(hapvida.extract_issuer_name(&doc).as_deref(), Some("HAPVIDA"));
        assert_eq!(hapvida.issuer_label(), Some("HAPVIDA"));
    }

    #[test]
    fn test_confidence_bounds() {
        let unimed = variant(ExtractorKind::Unimed);
        assert_eq!(unimed.get_confidence(&ExtractedFields::default()), 0.0);
        let full = ExtractedFields {
            identifier_number: Some("898001234560005".into()),
            card_number: Some("0064800001234567".into()),
            plan_name: Some("UNIFÁCIL".into()),
            holder_name: Some("Maria Souza".into()),
            birth_date: Some("1985-03-07".into()),
            issuer_code: Some("335690".into()),
            ..Default::default()
        };
        assert!((unimed.get_confidence(&full) - 1.0).abs() < 1e-9);
    }
}
