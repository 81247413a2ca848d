//! # Configuração do Pipeline
//!
//! Todas as constantes ajustadas empiricamente (limiares de classificação,
//! similaridade mínima do resolvedor, tabelas de aliases e a lista de
//! bloqueio) ficam aqui como dados, e não espalhadas pelo código.
//!
//! Os valores padrão reproduzem o comportamento calibrado. Alterá-los muda
//! qual instituição uma carteirinha resolve, então qualquer ajuste deve vir
//! acompanhado de novos casos de regressão.
//!
//! ```rust
//! use docbr_core::config::PipelineConfig;
//!
//! let config = PipelineConfig::from_json_str(r#"{ "resolver": { "min_similarity": 0.2 } }"#).unwrap();
//! assert_eq!(config.resolver.min_similarity, 0.2);
//! assert_eq!(config.classifier.strict_identity_min, 4);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DocbrError, Result};

/// Configuração completa do pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub classifier: ClassifierConfig,
    pub resolver: ResolverConfig,
    /// Ano máximo aceito em datas de nascimento. `None` usa o ano corrente.
    pub max_birth_year: Option<i32>,
}

impl PipelineConfig {
    /// Lê a configuração de uma string JSON. Campos ausentes usam o padrão.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Lê a configuração de um arquivo JSON.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Rejeita valores fora de [0,1] e mínimos inconsistentes.
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, v: f64| -> Result<()> {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(DocbrError::Config(format!("{name} deve estar em [0,1], recebido {v}")))
            }
        };
        unit("resolver.min_similarity", self.resolver.min_similarity)?;
        unit("resolver.alias_match_confidence", self.resolver.alias_match_confidence)?;
        unit("resolver.fallback_confidence", self.resolver.fallback_confidence)?;
        unit("classifier.confidence_cap", self.classifier.confidence_cap)?;
        for alias in &self.resolver.fallback_aliases {
            unit("resolver.fallback_aliases[].confidence", alias.confidence)?;
        }
        if self.classifier.strict_identity_min < self.classifier.identity_min {
            return Err(DocbrError::Config(
                "classifier.strict_identity_min não pode ser menor que identity_min".to_string(),
            ));
        }
        Ok(())
    }
}

/// Limiares do classificador de tipo de documento.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Marcadores mínimos para aceitar um documento de identidade.
    pub identity_min: usize,
    /// Marcadores mínimos para a subfamília estrita `carteira_identidade`.
    pub strict_identity_min: usize,
    /// Marcadores mínimos para aceitar uma carteirinha de convênio.
    pub insurance_min: usize,
    pub confidence_base: f64,
    pub confidence_step: f64,
    pub confidence_cap: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            identity_min: 2,
            strict_identity_min: 4,
            insurance_min: 1,
            confidence_base: 0.35,
            confidence_step: 0.15,
            confidence_cap: 0.95,
        }
    }
}

/// Parâmetros do resolvedor de entidade emissora.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Razão mínima (menor/maior comprimento) para aceitar um match por substring.
    pub min_similarity: f64,
    /// Confiança de um match pela tabela de variantes de nome.
    pub alias_match_confidence: f64,
    /// Confiança quando nenhum alias conhece o nome e ele é devolvido capitalizado.
    pub fallback_confidence: f64,
    pub name_aliases: Vec<NameAlias>,
    pub denylist: Vec<DenyRule>,
    pub fallback_aliases: Vec<FallbackAlias>,
}

/// Variante conhecida de nome que aponta para uma palavra-chave do nome canônico.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameAlias {
    pub variant: String,
    pub keyword: String,
    /// Nomes canônicos contendo algum destes trechos nunca são aceitos.
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Se o nome extraído contém `token`, entidades cujo nome contém algum
/// trecho de `forbidden` são descartadas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenyRule {
    pub token: String,
    pub forbidden: Vec<String>,
}

/// Entrada da tabela estática usada quando o registro não tem a entidade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackAlias {
    pub alias: String,
    pub label: String,
    pub confidence: f64,
}

fn name_alias(variant: &str, keyword: &str, exclude: &[&str]) -> NameAlias {
    NameAlias {
        variant: variant.to_string(),
        keyword: keyword.to_string(),
        exclude: exclude.iter().map(|s| s.to_string()).collect(),
    }
}

fn fallback(alias: &str, label: &str, confidence: f64) -> FallbackAlias {
    FallbackAlias {
        alias: alias.to_string(),
        label: label.to_string(),
        confidence,
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            min_similarity: 0.15,
            alias_match_confidence: 0.95,
            fallback_confidence: 0.5,
            name_aliases: vec![
                name_alias("PORTO SAUDE", "PORTO SEGURO", &["IRMANDADE", "SANTA CASA"]),
                name_alias("PORTO SEGURO SAUDE", "PORTO SEGURO", &["IRMANDADE", "SANTA CASA"]),
                name_alias("SULAMERICA", "SUL AMERICA", &[]),
                name_alias("NOTREDAME", "NOTRE DAME", &[]),
                name_alias("GNDI", "NOTRE DAME", &[]),
                name_alias("INTERMEDICA", "INTERMEDICA", &[]),
                name_alias("BRADESCO", "BRADESCO SAUDE", &["PREVIDENCIA"]),
                name_alias("CASSI", "CAIXA DE ASSISTENCIA DOS FUNCIONARIOS DO BANCO DO BRASIL", &[]),
                name_alias("AMIL", "AMIL ASSISTENCIA", &[]),
                name_alias("HAPVIDA", "HAPVIDA", &[]),
                name_alias("UNIMED SEGUROS", "UNIMED SEGUROS", &[]),
            ],
            denylist: vec![DenyRule {
                token: "PORTO".to_string(),
                forbidden: vec![
                    "IRMANDADE".to_string(),
                    "SANTA CASA".to_string(),
                    "MISERICORDIA".to_string(),
                ],
            }],
            fallback_aliases: vec![
                fallback("SULAMERICA", "SulAmérica Saúde", 0.9),
                fallback("SUL AMERICA", "SulAmérica Saúde", 0.9),
                fallback("BRADESCO", "Bradesco Saúde", 0.9),
                fallback("AMIL", "Amil", 0.9),
                fallback("HAPVIDA", "Hapvida", 0.9),
                fallback("CASSI", "Cassi", 0.9),
                fallback("PORTO SEGURO", "Porto Seguro Saúde", 0.9),
                fallback("PORTO SAUDE", "Porto Seguro Saúde", 0.7),
                fallback("NOTREDAME", "NotreDame Intermédica", 0.8),
                fallback("NOTRE DAME", "NotreDame Intermédica", 0.8),
                fallback("INTERMEDICA", "NotreDame Intermédica", 0.8),
                fallback("GNDI", "NotreDame Intermédica", 0.7),
                fallback("UNIMED", "Unimed", 0.8),
                fallback("CARTAO NACIONAL DE SAUDE", "Sistema Único de Saúde", 0.9),
                fallback("SUS", "Sistema Único de Saúde", 0.9),
                fallback("MINISTERIO DA SAUDE", "Sistema Único de Saúde", 0.8),
                fallback("SSP", "Secretaria de Segurança Pública", 0.7),
                fallback("SECRETARIA DA SEGURANCA PUBLICA", "Secretaria de Segurança Pública", 0.8),
                fallback("DETRAN", "Departamento Estadual de Trânsito", 0.7),
            ],
        }
    }
}
