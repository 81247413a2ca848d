//! # Resolvedor de Entidade Emissora
//!
//! Liga o código e/ou nome extraídos a uma entrada do registro de
//! referência. As camadas são tentadas em ordem estrita e a primeira que
//! acerta encerra a busca:
//!
//! 1. **CodeLookup**: código exatamente como extraído (1.0).
//! 2. **NormalizedCodeLookup**: código sem zeros à esquerda, primeiro por
//!    busca direta e depois varrendo o registro (1.0).
//! 3. **NameSimilarity**: nome comparado com todos os nomes canônicos:
//!    igualdade (1.0), substring em qualquer sentido (razão entre
//!    comprimentos, mínimo `min_similarity`) e tabela de variantes (0.95).
//!    A lista de bloqueio vale para as duas últimas regras.
//! 4. **AliasFallback**: tabela estática alias → rótulo, senão o próprio
//!    nome capitalizado (0.5).
//!
//! Sem nome e sem acerto de código o resultado é **NotFound** (0.0).
//!
//! O método que acertou faz parte do resultado: auditoria posterior precisa
//! saber se a entidade veio de consulta autoritativa ou de palpite.
//!
//! Falhas do registro nunca propagam. Viram aviso e a camada conta como
//! não encontrada.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::error::RegistryError;
use crate::normalize::{normalize_institution_code, normalize_name};
use crate::registry::{ReferenceRegistry, ReferenceRegistryEntry};
use crate::telemetry::TARGET_RESOLVER;
use crate::text::{contains_word, fold};

/// Qual camada produziu a resolução.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResolutionMethod {
    CodeLookup,
    NormalizedCodeLookup,
    NameSimilarity,
    AliasFallback,
    NotFound,
}

/// Resultado da resolução da entidade emissora.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionOutcome {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_name: Option<String>,
    pub method: ResolutionMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_reference_code: Option<String>,
    pub confidence: f64,
}

impl ResolutionOutcome {
    pub fn not_found() -> Self {
        Self {
            resolved_name: None,
            method: ResolutionMethod::NotFound,
            matched_reference_code: None,
            confidence: 0.0,
        }
    }

    fn from_entry(entry: ReferenceRegistryEntry, method: ResolutionMethod, confidence: f64) -> Self {
        Self {
            resolved_name: Some(entry.canonical_name),
            method,
            matched_reference_code: Some(entry.issuer_code),
            confidence,
        }
    }
}

/// Uma camada tentada e se ela acertou.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierAttempt {
    pub method: ResolutionMethod,
    pub matched: bool,
}

/// Resultado com o rastro das camadas e os avisos gerados.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionReport {
    pub outcome: ResolutionOutcome,
    pub attempts: Vec<TierAttempt>,
    pub warnings: Vec<String>,
}

/// Regra de variante já dobrada.
struct PreparedAlias {
    variant: String,
    keyword: String,
    exclude: Vec<String>,
}

struct PreparedDeny {
    token: String,
    forbidden: Vec<String>,
}

struct PreparedFallback {
    alias: String,
    label: String,
    confidence: f64,
}

/// Resolvedor hierárquico. Sem estado mutável; pode ser compartilhado.
pub struct EntityResolver {
    min_similarity: f64,
    alias_match_confidence: f64,
    fallback_confidence: f64,
    name_aliases: Vec<PreparedAlias>,
    denylist: Vec<PreparedDeny>,
    fallback_aliases: Vec<PreparedFallback>,
}

impl EntityResolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self {
            min_similarity: config.min_similarity,
            alias_match_confidence: config.alias_match_confidence,
            fallback_confidence: config.fallback_confidence,
            name_aliases: config
                .name_aliases
                .into_iter()
                .map(|a| PreparedAlias {
                    variant: comparable(&a.variant),
                    keyword: comparable(&a.keyword),
                    exclude: a.exclude.iter().map(|e| comparable(e)).collect(),
                })
                .collect(),
            denylist: config
                .denylist
                .into_iter()
                .map(|d| PreparedDeny {
                    token: comparable(&d.token),
                    forbidden: d.forbidden.iter().map(|f| comparable(f)).collect(),
                })
                .collect(),
            fallback_aliases: config
                .fallback_aliases
                .into_iter()
                .map(|f| PreparedFallback {
                    alias: comparable(&f.alias),
                    label: f.label,
                    confidence: f.confidence,
                })
                .collect(),
        }
    }

    /// Resolve a entidade a partir do código e/ou nome extraídos.
    pub fn resolve(
        &self,
        registry: &dyn ReferenceRegistry,
        code: Option<&str>,
        name: Option<&str>,
    ) -> ResolutionReport {
        let mut run = Run {
            registry,
            attempts: vec![],
            warnings: vec![],
            all: None,
        };
        let code = code.map(str::trim).filter(|c| !c.is_empty());
        let name = name.map(str::trim).filter(|n| !n.is_empty());

        let outcome = self.resolve_tiers(&mut run, code, name);
        debug!(
            target: TARGET_RESOLVER,
            method = ?outcome.method,
            confidence = outcome.confidence,
            resolved = ?outcome.resolved_name,
            "entidade resolvida"
        );
        ResolutionReport {
            outcome,
            attempts: run.attempts,
            warnings: run.warnings,
        }
    }

    fn resolve_tiers(&self, run: &mut Run<'_>, code: Option<&str>, name: Option<&str>) -> ResolutionOutcome {
        if let Some(code) = code {
            let hit = run.lookup(code);
            run.record(ResolutionMethod::CodeLookup, hit.is_some());
            if let Some(entry) = hit {
                return ResolutionOutcome::from_entry(entry, ResolutionMethod::CodeLookup, 1.0);
            }

            let normalized = normalize_institution_code(code);
            let hit = self.normalized_code_lookup(run, code, &normalized);
            run.record(ResolutionMethod::NormalizedCodeLookup, hit.is_some());
            if let Some(entry) = hit {
                return ResolutionOutcome::from_entry(entry, ResolutionMethod::NormalizedCodeLookup, 1.0);
            }
        }

        let Some(name) = name else {
            return ResolutionOutcome::not_found();
        };

        let hit = self.name_similarity(run, name);
        run.record(ResolutionMethod::NameSimilarity, hit.is_some());
        if let Some((entry, score)) = hit {
            return ResolutionOutcome::from_entry(entry, ResolutionMethod::NameSimilarity, score);
        }

        let fallback = self.alias_fallback(name);
        run.record(ResolutionMethod::AliasFallback, fallback.is_some());
        fallback.unwrap_or_else(ResolutionOutcome::not_found)
    }

    fn normalized_code_lookup(
        &self,
        run: &mut Run<'_>,
        raw: &str,
        normalized: &str,
    ) -> Option<ReferenceRegistryEntry> {
        if normalized.is_empty() {
            return None;
        }
        if normalized != raw {
            if let Some(entry) = run.lookup(normalized) {
                return Some(entry);
            }
        }
        run.all()
            .iter()
            .find(|e| normalize_institution_code(&e.issuer_code) == normalized)
            .cloned()
    }

    /// Melhor candidato por nome; empate fica com a primeira entrada.
    fn name_similarity(&self, run: &mut Run<'_>, name: &str) -> Option<(ReferenceRegistryEntry, f64)> {
        let query = comparable(name);
        if query.is_empty() {
            return None;
        }
        let mut best: Option<(ReferenceRegistryEntry, f64)> = None;
        for entry in run.all() {
            let Some(score) = self.score(&query, &comparable(&entry.canonical_name)) else {
                continue;
            };
            if best.as_ref().map_or(true, |(_, s)| score > *s) {
                best = Some((entry.clone(), score));
            }
        }
        best
    }

    /// Pontuação de uma entrada, ou `None` se nenhuma regra aceita.
    fn score(&self, query: &str, canonical: &str) -> Option<f64> {
        if canonical.is_empty() {
            return None;
        }
        if query == canonical {
            return Some(1.0);
        }
        if self.denied(query, canonical) {
            return None;
        }

        let mut score: Option<f64> = None;
        // só trechos delimitados por palavra: "AMIL" não casa com "FAMILIA"
        if contains_word(canonical, query) || contains_word(query, canonical) {
            let (a, b) = (query.chars().count() as f64, canonical.chars().count() as f64);
            let ratio = a.min(b) / a.max(b);
            if ratio >= self.min_similarity {
                score = Some(ratio);
            }
        }
        let alias_hit = self.name_aliases.iter().any(|alias| {
            (query == alias.variant || contains_word(query, &alias.variant))
                && contains_word(canonical, &alias.keyword)
                && !alias.exclude.iter().any(|x| canonical.contains(x.as_str()))
        });
        if alias_hit {
            score = Some(score.map_or(self.alias_match_confidence, |s| s.max(self.alias_match_confidence)));
        }
        score
    }

    fn denied(&self, query: &str, canonical: &str) -> bool {
        self.denylist.iter().any(|rule| {
            contains_word(query, &rule.token) && rule.forbidden.iter().any(|f| canonical.contains(f.as_str()))
        })
    }

    /// Alias exato, senão o alias mais longo contido como palavra inteira,
    /// senão o nome capitalizado.
    fn alias_fallback(&self, name: &str) -> Option<ResolutionOutcome> {
        let query = comparable(name);
        let known = self
            .fallback_aliases
            .iter()
            .find(|f| f.alias == query)
            .or_else(|| {
                self.fallback_aliases
                    .iter()
                    .filter(|f| contains_word(&query, &f.alias))
                    .max_by_key(|f| f.alias.len())
            });
        if let Some(alias) = known {
            return Some(ResolutionOutcome {
                resolved_name: Some(alias.label.clone()),
                method: ResolutionMethod::AliasFallback,
                matched_reference_code: None,
                confidence: alias.confidence.clamp(0.0, 1.0),
            });
        }
        normalize_name(name).value.map(|title| ResolutionOutcome {
            resolved_name: Some(title),
            method: ResolutionMethod::AliasFallback,
            matched_reference_code: None,
            confidence: self.fallback_confidence,
        })
    }
}

impl Default for EntityResolver {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}

/// Estado de uma resolução: rastro, avisos e a listagem do registro,
/// buscada no máximo uma vez.
struct Run<'a> {
    registry: &'a dyn ReferenceRegistry,
    attempts: Vec<TierAttempt>,
    warnings: Vec<String>,
    all: Option<Vec<ReferenceRegistryEntry>>,
}

impl Run<'_> {
    fn record(&mut self, method: ResolutionMethod, matched: bool) {
        debug!(target: TARGET_RESOLVER, ?method, matched, "camada tentada");
        self.attempts.push(TierAttempt { method, matched });
    }

    fn lookup(&mut self, code: &str) -> Option<ReferenceRegistryEntry> {
        match self.registry.lookup_by_code(code) {
            Ok(hit) => hit,
            Err(e) => {
                self.registry_failed("lookup_by_code", &e);
                None
            }
        }
    }

    fn all(&mut self) -> &[ReferenceRegistryEntry] {
        if self.all.is_none() {
            let entries = match self.registry.list_all() {
                Ok(entries) => entries,
                Err(e) => {
                    self.registry_failed("list_all", &e);
                    vec![]
                }
            };
            self.all = Some(entries);
        }
        self.all.as_deref().unwrap_or_default()
    }

    fn registry_failed(&mut self, operation: &str, error: &RegistryError) {
        warn!(target: TARGET_RESOLVER, operation, %error, "falha no registro de referência");
        self.warnings.push(format!("registro: {operation} falhou ({error})"));
    }
}

/// Forma de comparação: sem acento, maiúscula, só letras e dígitos
/// separados por um espaço.
fn comparable(text: &str) -> String {
    fold(text)
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
