//! # Pipeline de Extração: Orquestrador com Eventos Observáveis
//!
//! Coordena as etapas para um único texto de OCR:
//!
//! 1. classificação da família do documento;
//! 2. escolha da variante de extrator (primeira do pool que aceita, senão o
//!    genérico);
//! 3. extração dos campos crus;
//! 4. normalização de cada campo, com confiança;
//! 5. resolução da entidade emissora contra o registro;
//! 6. agregação em um [`ExtractionResult`].
//!
//! Cada passo emite um [`PipelineEvent`] por um canal `mpsc`, de modo que a
//! aplicação hospedeira pode acompanhar o raciocínio do pipeline. O modo
//! síncrono ([`ExtractionPipeline::run`]) apenas consome esses eventos até o
//! `Done`.
//!
//! A execução é total para qualquer `&str`: campos ausentes ficam `None` e
//! falhas do registro viram avisos.

use std::sync::mpsc;
use std::sync::{Arc, LazyLock};

use rayon::prelude::*;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classifier::{DocumentClassification, DocumentClassifier, DocumentFamily};
use crate::config::PipelineConfig;
use crate::error::{DocbrError, Result};
use crate::extractors::{Extractor, ExtractorKind, ExtractorRegistry, RawFields};
use crate::fields::{ExtractedFields, FieldConfidence, FieldName, FieldSet};
use crate::normalize::{normalize_cpf, normalize_date, normalize_date_with_max_year, normalize_name, NormalizedField};
use crate::registry::ReferenceRegistry;
use crate::resolver::{EntityResolver, ResolutionMethod, ResolutionOutcome};
use crate::telemetry::TARGET_PIPELINE;
use crate::text::{collapse_whitespace, digits_only, DocumentText};

static ISSUER_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*([/-])\s*").expect("regex de separador de órgão válida"));

/// Eventos emitidos durante o processamento de um documento.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PipelineEvent {
    /// **Passo 1**: família do documento decidida.
    Classified { classification: DocumentClassification },
    /// **Passo 2**: variante escolhida. `candidates` lista todas as variantes
    /// do pool que aceitariam o texto, em ordem; só a primeira é usada.
    ExtractorSelected {
        extractor: ExtractorKind,
        candidates: Vec<ExtractorKind>,
    },
    /// **Passo 3**: campo normalizado e gravado no resultado.
    FieldExtracted {
        field: FieldName,
        value: String,
        confidence: f64,
    },
    /// Candidato descartado (dígito verificador, data ilegível).
    CandidateRejected {
        field: FieldName,
        candidate: String,
        reason: String,
    },
    /// **Passo 4**: uma camada do resolvedor foi tentada.
    ResolutionTier { method: ResolutionMethod, matched: bool },
    /// **Conclusão**: resultado final e tempo de processamento.
    Done {
        result: Box<ExtractionResult>,
        processing_ms: u64,
    },
}

/// Resultado completo de uma execução. Construído uma vez e não alterado
/// depois de devolvido.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub classification: DocumentClassification,
    pub extractor: ExtractorKind,
    pub extractor_confidence: f64,
    pub fields: ExtractedFields,
    pub field_confidence: FieldConfidence,
    pub resolution: ResolutionOutcome,
    pub overall_confidence: f64,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ExtractionResult {
    /// Resultado de um texto sem nada reconhecível.
    pub fn empty() -> Self {
        Self {
            classification: DocumentClassification::unknown(),
            extractor: ExtractorKind::Generic,
            extractor_confidence: 0.0,
            fields: ExtractedFields::default(),
            field_confidence: FieldConfidence::default(),
            resolution: ResolutionOutcome::not_found(),
            overall_confidence: 0.0,
            warnings: vec![],
        }
    }

    /// Média das confianças de campo mais a confiança da resolução.
    /// Sem campos e sem resolução, é 0.
    pub fn compute_overall(field_confidence: &FieldConfidence, resolution: &ResolutionOutcome) -> f64 {
        if field_confidence.is_empty() && resolution.method == ResolutionMethod::NotFound {
            return 0.0;
        }
        let total: f64 = field_confidence.values().sum::<f64>() + resolution.confidence;
        let count = field_confidence.len() + 1;
        (total / count as f64).clamp(0.0, 1.0)
    }

    pub fn recompute_overall(&mut self) {
        self.overall_confidence = Self::compute_overall(&self.field_confidence, &self.resolution);
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// O pipeline de extração.
///
/// Guarda apenas estado imutável (padrões compilados, configuração, um
/// registro somente leitura), então uma instância pode atender várias
/// threads ao mesmo tempo.
///
/// # Modos de Uso
/// - **Sync**: [`run`](Self::run) e [`run_bytes`](Self::run_bytes).
/// - **Streaming**: [`run_streaming`](Self::run_streaming) envia eventos por um canal.
/// - **Lote**: [`run_batch`](Self::run_batch) processa documentos em paralelo.
pub struct ExtractionPipeline {
    config: PipelineConfig,
    classifier: DocumentClassifier,
    extractors: ExtractorRegistry,
    resolver: EntityResolver,
    registry: Arc<dyn ReferenceRegistry>,
}

impl ExtractionPipeline {
    pub fn new(config: PipelineConfig, registry: Arc<dyn ReferenceRegistry>) -> Self {
        Self {
            classifier: DocumentClassifier::new(config.classifier.clone()),
            extractors: ExtractorRegistry::build(),
            resolver: EntityResolver::new(config.resolver.clone()),
            registry,
            config,
        }
    }

    /// Pipeline com a configuração padrão.
    pub fn with_registry(registry: Arc<dyn ReferenceRegistry>) -> Self {
        Self::new(PipelineConfig::default(), registry)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Processa o texto de forma síncrona e devolve o resultado final.
    pub fn run(&self, text: &str) -> ExtractionResult {
        let (tx, rx) = mpsc::channel();
        self.run_streaming(text, tx);
        let mut result = None;

        // consome todos os eventos até o fim
        while let Ok(event) = rx.recv() {
            if let PipelineEvent::Done { result: done, .. } = event {
                result = Some(*done);
            }
        }
        result.unwrap_or_else(ExtractionResult::empty)
    }

    /// Como [`run`](Self::run), para bytes que ainda não foram validados
    /// como UTF-8.
    pub fn run_bytes(&self, bytes: &[u8]) -> Result<ExtractionResult> {
        let text = std::str::from_utf8(bytes).map_err(|e| DocbrError::InvalidText(e.to_string()))?;
        Ok(self.run(text))
    }

    /// Processa documentos independentes em paralelo. A ordem da saída
    /// acompanha a da entrada.
    pub fn run_batch<S: AsRef<str> + Sync>(&self, texts: &[S]) -> Vec<ExtractionResult> {
        texts.par_iter().map(|text| self.run(text.as_ref())).collect()
    }

    /// Executa o pipeline enviando eventos de progresso pelo canal `tx`.
    ///
    /// # Fluxo de Eventos
    /// 1. `Classified`
    /// 2. `ExtractorSelected`
    /// 3. `CandidateRejected` / `FieldExtracted` (loop)
    /// 4. `ResolutionTier` (loop)
    /// 5. `Done`
    ///
    /// Um receptor já descartado não interrompe o processamento.
    pub fn run_streaming(&self, text: &str, tx: mpsc::Sender<PipelineEvent>) {
        let start = std::time::Instant::now();
        let doc = DocumentText::new(text);
        let mut warnings = Vec::new();

        if doc.is_blank() {
            warnings.push("texto vazio".to_string());
        }

        // 1. Classificação
        let classification = self.classifier.classify(doc.folded());
        let family = classification.document_family;
        if family == DocumentFamily::Unknown && !doc.is_blank() {
            warnings.push("classificação desconhecida: nenhuma família de documento reconhecida".to_string());
        }
        let _ = tx.send(PipelineEvent::Classified {
            classification: classification.clone(),
        });

        // 2. Despacho
        let extractor = self.extractors.dispatch(family, &doc);
        let candidates = self.extractors.candidates(family, &doc);
        debug!(
            target: TARGET_PIPELINE,
            family = ?family,
            extractor = %extractor.kind(),
            candidates = candidates.len(),
            "variante escolhida"
        );
        let _ = tx.send(PipelineEvent::ExtractorSelected {
            extractor: extractor.kind(),
            candidates,
        });

        // 3. Extração e normalização
        self.report_rejected_cns(&doc, &tx, &mut warnings);
        let raw = extractor.extract(&doc);
        let set = self.normalize(&extractor, &raw, &tx, &mut warnings);
        let extractor_confidence = extractor.get_confidence(set.fields());
        let (fields, field_confidence) = set.into_parts();

        // 4. Resolução
        let report = self.resolver.resolve(
            self.registry.as_ref(),
            fields.issuer_code.as_deref(),
            fields.issuer_name.as_deref(),
        );
        for attempt in &report.attempts {
            let _ = tx.send(PipelineEvent::ResolutionTier {
                method: attempt.method,
                matched: attempt.matched,
            });
        }
        warnings.extend(report.warnings);

        // 5. Agregação
        let mut result = ExtractionResult {
            classification,
            extractor: extractor.kind(),
            extractor_confidence,
            fields,
            field_confidence,
            resolution: report.outcome,
            overall_confidence: 0.0,
            warnings,
        };
        result.recompute_overall();

        let processing_ms = start.elapsed().as_millis() as u64;
        info!(
            target: TARGET_PIPELINE,
            family = ?family,
            extractor = %result.extractor,
            fields = result.field_confidence.len(),
            method = ?result.resolution.method,
            overall = result.overall_confidence,
            warnings = result.warnings.len(),
            processing_ms,
            "documento processado"
        );
        let _ = tx.send(PipelineEvent::Done {
            result: Box::new(result),
            processing_ms,
        });
    }

    fn report_rejected_cns(&self, doc: &DocumentText, tx: &mpsc::Sender<PipelineEvent>, warnings: &mut Vec<String>) {
        for candidate in doc.rejected_cns() {
            warn!(target: TARGET_PIPELINE, candidate = %candidate, "CNS com dígito verificador inválido");
            warnings.push(format!("CNS {candidate} falhou no dígito verificador"));
            let _ = tx.send(PipelineEvent::CandidateRejected {
                field: FieldName::IdentifierNumber,
                candidate: candidate.clone(),
                reason: "dígito verificador do CNS".to_string(),
            });
        }
        if doc.cns().len() > 1 {
            warnings.push(format!("{} CNS válidos distintos encontrados; usado o primeiro", doc.cns().len()));
        }
    }

    /// Normaliza cada campo cru e grava valor e confiança juntos.
    fn normalize(
        &self,
        extractor: &Extractor<'_>,
        raw: &RawFields,
        tx: &mpsc::Sender<PipelineEvent>,
        warnings: &mut Vec<String>,
    ) -> FieldSet {
        let generic = extractor.kind() == ExtractorKind::Generic;
        let issuer_label = match extractor {
            Extractor::Operator(op) => op.issuer_label(),
            Extractor::Generic(_) => None,
        };
        let mut set = FieldSet::new();

        for name in raw.names() {
            let Some(value) = raw.get(name) else {
                continue;
            };
            let normalized = match name {
                FieldName::IdentifierNumber => normalize_identifier(value),
                FieldName::Cpf => {
                    let cpf = normalize_cpf(value);
                    if !cpf.is_valid {
                        warnings.push(format!("CPF {} falhou no dígito verificador", cpf.value));
                        let _ = tx.send(PipelineEvent::CandidateRejected {
                            field: FieldName::Cpf,
                            candidate: cpf.value.clone(),
                            reason: "dígito verificador do CPF".to_string(),
                        });
                    }
                    NormalizedField {
                        value: Some(cpf.value),
                        confidence: cpf.confidence,
                    }
                }
                FieldName::HolderName | FieldName::MotherName | FieldName::FatherName => normalize_name(value),
                FieldName::BirthDate => {
                    let date = self.normalize_birth_date(value);
                    match &date.value {
                        None => {
                            let _ = tx.send(PipelineEvent::CandidateRejected {
                                field: name,
                                candidate: value.to_string(),
                                reason: "data ilegível".to_string(),
                            });
                        }
                        Some(iso) if date.confidence < 1.0 => {
                            warnings.push(format!("data de nascimento fora de faixa: {iso}"));
                        }
                        Some(_) => {}
                    }
                    date
                }
                FieldName::CardNumber => fixed(digits_only(value), if generic { 0.6 } else { 0.9 }),
                FieldName::IssuerCode => {
                    let code = digits_only(value);
                    let confidence = if code.len() == 6 { 1.0 } else { 0.5 };
                    fixed(code, confidence)
                }
                FieldName::IssuerName => {
                    let confidence = match issuer_label {
                        Some(label) if label == value => 0.7,
                        _ if generic => 0.6,
                        _ => 0.9,
                    };
                    fixed(compact_issuer(value), confidence)
                }
                FieldName::PlanName => fixed(collapse_whitespace(value), if generic { 0.5 } else { 0.8 }),
                FieldName::DocumentNumber => fixed(collapse_whitespace(value), 0.8),
                FieldName::BirthPlace => fixed(collapse_whitespace(value), 0.7),
                FieldName::DocumentOrigin => fixed(collapse_whitespace(value), 0.6),
            };

            let NormalizedField { value: Some(clean), confidence } = normalized else {
                continue;
            };
            if set.record(name, Some(clean.clone()), confidence) {
                debug!(target: TARGET_PIPELINE, field = %name, confidence, "campo extraído");
                let _ = tx.send(PipelineEvent::FieldExtracted {
                    field: name,
                    value: clean,
                    confidence,
                });
            }
        }
        set
    }

    fn normalize_birth_date(&self, raw: &str) -> NormalizedField {
        match self.config.max_birth_year {
            Some(year) => normalize_date_with_max_year(raw, year),
            None => normalize_date(raw),
        }
    }
}

fn fixed(value: String, confidence: f64) -> NormalizedField {
    NormalizedField {
        value: Some(value),
        confidence,
    }
}

/// O identificador já passou no dígito verificador. CPF é formatado, CNS
/// fica só com dígitos.
fn normalize_identifier(raw: &str) -> NormalizedField {
    let digits = digits_only(raw);
    if digits.len() == 11 {
        let cpf = normalize_cpf(&digits);
        return NormalizedField {
            value: Some(cpf.value),
            confidence: cpf.confidence,
        };
    }
    fixed(digits, 1.0)
}

/// "SSP / SP" → "SSP/SP".
fn compact_issuer(raw: &str) -> String {
    ISSUER_SEPARATOR
        .replace_all(&collapse_whitespace(raw), "$1")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::UnavailableRegistry;
    use crate::samples::{self, sample_registry};

    fn pipeline() -> ExtractionPipeline {
        let config = PipelineConfig {
            max_birth_year: Some(2025),
            ..Default::default()
        };
        ExtractionPipeline::new(config, Arc::new(sample_registry()))
    }

    #[test]
    fn test_identity_card_with_invalid_cpf() {
        let result = pipeline().run(samples::IDENTITY_CARD);
        assert_eq!(result.classification.document_family, DocumentFamily::IdentityDocument);
        assert_eq!(result.extractor, ExtractorKind::IdentityCard);
        assert_eq!(result.fields.cpf.as_deref(), Some("342.002.171-42"));
        assert_eq!(result.field_confidence.get(FieldName::Cpf), Some(0.6));
        assert!(result.fields.identifier_number.is_none());
        assert_eq!(result.fields.document_number.as_deref(), Some("48.151.623-42"));
        assert_eq!(result.fields.holder_name.as_deref(), Some("José Carlos de Oliveira"));
        assert_eq!(result.fields.mother_name.as_deref(), Some("Maria Aparecida de Oliveira"));
        assert_eq!(result.fields.birth_date.as_deref(), Some("1978-08-12"));
        assert_eq!(result.fields.issuer_name.as_deref(), Some("SSP/SP"));
        assert!(result.warnings.iter().any(|w| w.contains("CPF 342.002.171-42")));
    }

    #[test]
    fn test_driver_license_identifier_is_formatted_cpf() {
        let result = pipeline().run(samples::DRIVER_LICENSE);
        assert_eq!(result.extractor, ExtractorKind::DriverLicense);
        assert_eq!(result.fields.identifier_number.as_deref(), Some("529.982.247-25"));
        assert_eq!(result.field_confidence.get(FieldName::IdentifierNumber), Some(1.0));
        assert_eq!(result.fields.cpf.as_deref(), Some("529.982.247-25"));
        assert_eq!(result.fields.document_number.as_deref(), Some("01234567890"));
    }

    #[test]
    fn test_ans_code_resolves_by_code_lookup() {
        let result = pipeline().run(samples::UNIMED_SEGUROS_CARD);
        assert_eq!(result.extractor, ExtractorKind::Unimed);
        assert_eq!(result.fields.issuer_code.as_deref(), Some("000701"));
        assert_eq!(result.resolution.method, ResolutionMethod::CodeLookup);
        assert_eq!(result.resolution.confidence, 1.0);
        assert_eq!(result.resolution.matched_reference_code.as_deref(), Some("000701"));
        assert_eq!(result.fields.birth_date.as_deref(), Some("1982-06-15"));
    }

    #[test]
    fn test_cns_and_card_number_stay_distinct() {
        let result = pipeline().run(samples::UNIMED_WITH_CNS);
        let cns = result.fields.identifier_number.clone().unwrap();
        let card = result.fields.card_number.clone().unwrap();
        assert_eq!(cns, "898001234560005");
        assert_eq!(card, "0064800001234567");
        assert!(!card.contains(&cns));
        assert_eq!(result.resolution.method, ResolutionMethod::CodeLookup);
    }

    #[test]
    fn test_operator_card_with_cns_label_keeps_brand_fields() {
        let result = pipeline().run(
            "UNIMED CAMPINAS\nRegistro ANS: 33569-0\n0064 8000 0123 4567\nMARIA DAS GRAÇAS SOUZA\nCartão Nacional de Saúde: 898 0012 3456 0005\nPlano: UNIFÁCIL",
        );
        assert_eq!(result.extractor, ExtractorKind::Unimed);
        assert_eq!(result.fields.card_number.as_deref(), Some("0064800001234567"));
        assert_eq!(result.fields.identifier_number.as_deref(), Some("898001234560005"));
        assert_eq!(result.fields.issuer_code.as_deref(), Some("335690"));
        assert!(result.fields.plan_name.is_some());
        assert_eq!(result.resolution.method, ResolutionMethod::CodeLookup);
        assert_eq!(result.resolution.matched_reference_code.as_deref(), Some("335690"));

        for (name, confidence) in result.field_confidence.iter() {
            assert!(result.fields.is_present(name), "{name:?}");
            assert!((0.0..=1.0).contains(&confidence));
        }
        assert_eq!(result.field_confidence.iter().count(), result.fields.present().len());
    }

    #[test]
    fn test_empty_text_has_zero_confidence() {
        let result = pipeline().run("");
        assert_eq!(result.classification.document_family, DocumentFamily::Unknown);
        assert_eq!(result.extractor, ExtractorKind::Generic);
        assert!(result.fields.is_empty());
        assert_eq!(result.resolution.method, ResolutionMethod::NotFound);
        assert_eq!(result.overall_confidence, 0.0);
    }

    #[test]
    fn test_unknown_document_uses_generic_and_warns() {
        let result = pipeline().run(samples::UNKNOWN_DOCUMENT);
        assert_eq!(result.extractor, ExtractorKind::Generic);
        assert_eq!(result.fields.card_number.as_deref(), Some("123456789012"));
        assert!(result.warnings.iter().any(|w| w.contains("classificação desconhecida")));
    }

    #[test]
    fn test_overall_confidence_bounds() {
        let mut set = FieldSet::new();
        set.record(FieldName::IssuerCode, Some("000701".into()), 1.0);
        set.record(FieldName::HolderName, Some("Carlos Mendes".into()), 1.0);
        let (fields, field_confidence) = set.into_parts();
        let mut result = ExtractionResult {
            fields,
            field_confidence,
            resolution: ResolutionOutcome {
                resolved_name: Some("UNIMED SEGUROS SAÚDE S.A.".into()),
                method: ResolutionMethod::CodeLookup,
                matched_reference_code: Some("000701".into()),
                confidence: 1.0,
            },
            ..ExtractionResult::empty()
        };
        result.recompute_overall();
        assert!((result.overall_confidence - 1.0).abs() < 1e-9);

        for sample in samples::demo_documents() {
            let result = pipeline().run(sample.text);
            assert!((0.0..=1.0).contains(&result.overall_confidence), "{}", sample.name);
        }
    }

    #[test]
    fn test_every_sample_dispatches_to_expected_variant() {
        let pipeline = pipeline();
        for sample in samples::demo_documents() {
            let result = pipeline.run(sample.text);
            assert_eq!(result.classification.document_family, sample.family, "{}", sample.name);
            assert_eq!(result.extractor, sample.extractor, "{}", sample.name);
        }
    }

    #[test]
    fn test_json_round_trip() {
        let result = pipeline().run(samples::UNIMED_WITH_CNS);
        let json = result.to_json().unwrap();
        let back = ExtractionResult::from_json(&json).unwrap();
        assert_eq!(back, result);
        assert!(!json.contains("\"cpf\""));
    }

    #[test]
    fn test_run_bytes_rejects_invalid_utf8() {
        let pipeline = pipeline();
        assert!(matches!(
            pipeline.run_bytes(&[0x48, 0xff, 0xfe]),
            Err(DocbrError::InvalidText(_))
        ));
        let result = pipeline.run_bytes(samples::SUS_CARD.as_bytes()).unwrap();
        assert_eq!(result.fields.identifier_number.as_deref(), Some("702500432150001"));
    }

    #[test]
    fn test_run_batch_keeps_order() {
        let texts = [samples::SUS_CARD, samples::BRADESCO_CARD, samples::IDENTITY_CARD];
        let results = pipeline().run_batch(texts.as_slice());
        let kinds: Vec<ExtractorKind> = results.iter().map(|r| r.extractor).collect();
        assert_eq!(
            kinds,
            vec![ExtractorKind::SusCard, ExtractorKind::BradescoSaude, ExtractorKind::IdentityCard]
        );
    }

    #[test]
    fn test_streaming_events_end_with_done() {
        let (tx, rx) = mpsc::channel();
        pipeline().run_streaming(samples::UNIMED_SEGUROS_CARD, tx);
        let events: Vec<PipelineEvent> = rx.iter().collect();

        assert!(matches!(events.first(), Some(PipelineEvent::Classified { .. })));
        assert!(matches!(events.get(1), Some(PipelineEvent::ExtractorSelected { .. })));
        assert!(events.iter().any(|e| matches!(
            e,
            PipelineEvent::FieldExtracted { field: FieldName::IssuerCode, .. }
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            PipelineEvent::ResolutionTier { method: ResolutionMethod::CodeLookup, matched: true }
        )));
        assert!(matches!(events.last(), Some(PipelineEvent::Done { .. })));

        let json = serde_json::to_string(&events[0]).unwrap();
        assert!(json.starts_with(r#"{"type":"Classified""#));
    }

    #[test]
    fn test_invalid_cpf_rejection_is_reported_on_cpf_field() {
        let (tx, rx) = mpsc::channel();
        pipeline().run_streaming(samples::IDENTITY_CARD, tx);
        let events: Vec<PipelineEvent> = rx.iter().collect();
        assert!(events.iter().any(|e| matches!(
            e,
            PipelineEvent::CandidateRejected { field: FieldName::Cpf, candidate, .. } if candidate == "342.002.171-42"
        )));
        assert!(!events.iter().any(|e| matches!(
            e,
            PipelineEvent::CandidateRejected { field: FieldName::IdentifierNumber, .. }
        )));
    }

    #[test]
    fn test_rejected_and_multiple_cns_warnings() {
        let result = pipeline().run("CARTÃO NACIONAL DE SAÚDE\nCNS 898 0012 3456 7890\nNOME ANA LIMA");
        assert!(result.fields.identifier_number.is_none());
        assert!(result.warnings.iter().any(|w| w.contains("898001234567890")));

        let result = pipeline().run("CARTÃO NACIONAL DE SAÚDE\nCNS 702 5004 3215 0001\nCNS 898 0012 3456 0005");
        assert_eq!(result.fields.identifier_number.as_deref(), Some("702500432150001"));
        assert!(result.warnings.iter().any(|w| w.contains("2 CNS")));
    }

    #[test]
    fn test_registry_failure_becomes_warning() {
        let pipeline = ExtractionPipeline::with_registry(Arc::new(UnavailableRegistry));
        let result = pipeline.run(samples::UNIMED_SEGUROS_CARD);
        assert_eq!(result.fields.issuer_code.as_deref(), Some("000701"));
        assert_eq!(result.resolution.method, ResolutionMethod::AliasFallback);
        assert_eq!(result.resolution.resolved_name.as_deref(), Some("Unimed"));
        assert!(result.warnings.iter().any(|w| w.starts_with("registro:")));
    }

    #[test]
    fn test_out_of_range_birth_date_is_kept_with_low_confidence() {
        let result = pipeline().run("CARTÃO NACIONAL DE SAÚDE\nNOME ANA LIMA\nDATA NASC. 31/02/1980");
        assert_eq!(result.fields.birth_date.as_deref(), Some("1980-02-31"));
        assert_eq!(result.field_confidence.get(FieldName::BirthDate), Some(0.2));
        assert!(result.warnings.iter().any(|w| w.contains("fora de faixa")));
    }

    #[test]
    fn test_compact_issuer() {
        assert_eq!(compact_issuer("SSP / SP"), "SSP/SP");
        assert_eq!(compact_issuer("DETRAN - RJ"), "DETRAN-RJ");
    }
}
