//! # Normalizadores de Campo
//!
//! Convertem trechos crus de OCR em formas canônicas, cada um com uma
//! confiança em [0,1]. São funções puras; nenhuma falha, no pior caso
//! devolvem `None` com confiança baixa.
//!
//! | Campo        | Forma canônica          | Confiança                              |
//! |--------------|-------------------------|----------------------------------------|
//! | data         | `AAAA-MM-DD`            | 1.0 válida, 0.2 caso contrário         |
//! | CPF          | `xxx.xxx.xxx-xx`        | 1.0 / 0.6 (DV errado) / 0.3 (formato)  |
//! | nome         | "Maria da Silva"        | cresce com tokens e comprimento        |
//! | código ANS   | sem zeros à esquerda    | (chave secundária, sem confiança)      |

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::checksum::{is_repeated_sequence, is_valid_cpf};

static DAY_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})[/\-.](\d{1,2})[/\-.](\d{4})$").expect("regex de data DD/MM/AAAA válida")
});
static YEAR_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})-(\d{1,2})-(\d{1,2})$").expect("regex de data AAAA-MM-DD válida")
});

/// Conectores mantidos em minúsculas na capitalização de nomes.
pub const NAME_CONNECTORS: &[&str] = &["da", "de", "do", "das", "dos", "e", "em", "na", "no", "por"];

pub const MIN_BIRTH_YEAR: i32 = 1900;

/// Um valor normalizado e sua confiança.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedField {
    pub value: Option<String>,
    pub confidence: f64,
}

/// Resultado da normalização de CPF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedCpf {
    /// `xxx.xxx.xxx-xx` quando há 11 dígitos, senão o texto cru aparado.
    pub value: String,
    pub is_valid: bool,
    pub confidence: f64,
}

/// Normaliza uma data usando o ano corrente como limite superior.
pub fn normalize_date(raw: &str) -> NormalizedField {
    normalize_date_with_max_year(raw, chrono::Local::now().year())
}

/// Normaliza `DD/MM/AAAA`, `DD-MM-AAAA`, `DD.MM.AAAA` ou `AAAA-MM-DD` para ISO.
///
/// Datas estruturalmente legíveis mas fora de faixa (dia, mês, ano fora de
/// [1900, `max_year`], ou dia inexistente no calendário) ainda são
/// devolvidas como melhor palpite, com confiança 0.2.
pub fn normalize_date_with_max_year(raw: &str, max_year: i32) -> NormalizedField {
    let trimmed = raw.trim();
    let parsed = if let Some(c) = DAY_FIRST.captures(trimmed) {
        Some((c[3].parse::<i32>(), c[2].parse::<u32>(), c[1].parse::<u32>()))
    } else {
        YEAR_FIRST
            .captures(trimmed)
            .map(|c| (c[1].parse::<i32>(), c[2].parse::<u32>(), c[3].parse::<u32>()))
    };

    let Some((Ok(year), Ok(month), Ok(day))) = parsed else {
        return NormalizedField { value: None, confidence: 0.2 };
    };

    let in_range = (1..=31).contains(&day)
        && (1..=12).contains(&month)
        && (MIN_BIRTH_YEAR..=max_year).contains(&year)
        && NaiveDate::from_ymd_opt(year, month, day).is_some();

    NormalizedField {
        value: Some(format!("{year:04}-{month:02}-{day:02}")),
        confidence: if in_range { 1.0 } else { 0.2 },
    }
}

/// Normaliza um CPF, validando os dígitos verificadores.
pub fn normalize_cpf(raw: &str) -> NormalizedCpf {
    let digits: Vec<u32> = raw.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 11 || is_repeated_sequence(&digits) {
        return NormalizedCpf {
            value: raw.trim().to_string(),
            is_valid: false,
            confidence: 0.3,
        };
    }
    let plain: String = digits.iter().map(|d| char::from(b'0' + *d as u8)).collect();
    let value = format!("{}.{}.{}-{}", &plain[0..3], &plain[3..6], &plain[6..9], &plain[9..11]);
    let is_valid = is_valid_cpf(&plain);
    NormalizedCpf {
        value,
        is_valid,
        confidence: if is_valid { 1.0 } else { 0.6 },
    }
}

/// Normaliza um nome próprio: remove pontuação e dígitos, colapsa espaços e
/// capitaliza cada token, exceto conectores após o primeiro token.
pub fn normalize_name(raw: &str) -> NormalizedField {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_alphabetic() { c } else { ' ' })
        .collect();
    let tokens: Vec<String> = cleaned
        .split_whitespace()
        .enumerate()
        .map(|(i, token)| {
            let lower = token.to_lowercase();
            if i > 0 && NAME_CONNECTORS.contains(&lower.as_str()) {
                lower
            } else {
                capitalize(&lower)
            }
        })
        .collect();

    if tokens.is_empty() {
        return NormalizedField { value: None, confidence: 0.0 };
    }

    // em décimos, para que o teto 1.0 seja exato
    let letters = tokens.iter().flat_map(|t| t.chars()).count();
    let mut tenths: u32 = 4;
    if tokens.len() >= 2 {
        tenths += 3;
    }
    if tokens.len() >= 3 {
        tenths += 2;
    }
    if letters >= 5 {
        tenths += 1;
    }

    NormalizedField {
        value: Some(tokens.join(" ")),
        confidence: f64::from(tenths.min(10)) / 10.0,
    }
}

fn capitalize(lower: &str) -> String {
    let mut graphemes = lower.graphemes(true);
    match graphemes.next() {
        Some(first) => {
            let mut out = first.to_uppercase();
            out.push_str(graphemes.as_str());
            out
        }
        None => String::new(),
    }
}

/// Remove zeros à esquerda de um código de operadora, mantendo pelo menos
/// um dígito. Usado só como chave secundária de busca.
pub fn normalize_institution_code(raw: &str) -> String {
    let trimmed = raw.trim();
    let stripped = trimmed.trim_start_matches('0');
    if stripped.is_empty() && !trimmed.is_empty() {
        "0".to_string()
    } else {
        stripped.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_formats() {
        for raw in ["07/03/1985", "07-03-1985", "1985-03-07", "7.3.1985"] {
            let n = normalize_date_with_max_year(raw, 2026);
            assert_eq!(n.value.as_deref(), Some("1985-03-07"), "{raw}");
            assert_eq!(n.confidence, 1.0);
        }
    }

    #[test]
    fn test_date_out_of_range_is_best_effort() {
        let n = normalize_date_with_max_year("15/13/1990", 2026);
        assert_eq!(n.value.as_deref(), Some("1990-13-15"));
        assert_eq!(n.confidence, 0.2);

        assert_eq!(normalize_date_with_max_year("01/01/1899", 2026).confidence, 0.2);
        assert_eq!(normalize_date_with_max_year("01/01/2030", 2026).confidence, 0.2);
        assert_eq!(normalize_date_with_max_year("31/02/2000", 2026).confidence, 0.2);
    }

    #[test]
    fn test_date_unparseable() {
        let n = normalize_date_with_max_year("março de 1985", 2026);
        assert!(n.value.is_none());
        assert_eq!(n.confidence, 0.2);
    }

    #[test]
    fn test_date_uses_current_year() {
        assert_eq!(normalize_date("01/01/2000").confidence, 1.0);
        assert_eq!(normalize_date("01/01/9999").confidence, 0.2);
    }

    #[test]
    fn test_cpf_normalization() {
        let valid = normalize_cpf("123.456.789-09");
        assert_eq!(valid.value, "123.456.789-09");
        assert!(valid.is_valid);
        assert_eq!(valid.confidence, 1.0);

        let bad_dv = normalize_cpf("34200217142");
        assert_eq!(bad_dv.value, "342.002.171-42");
        assert!(!bad_dv.is_valid);
        assert_eq!(bad_dv.confidence, 0.6);

        let short = normalize_cpf(" 123.456.789 ");
        assert_eq!(short.value, "123.456.789");
        assert_eq!(short.confidence, 0.3);

        let repeated = normalize_cpf("111.111.111-11");
        assert!(!repeated.is_valid);
        assert_eq!(repeated.confidence, 0.3);
    }

    #[test]
    fn test_cpf_idempotent() {
        let once = normalize_cpf("123.456.789-09");
        let twice = normalize_cpf(&once.value);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_name_title_case_with_connectors() {
        let n = normalize_name("MARIA  DAS GRAÇAS DE SOUZA, 1985");
        assert_eq!(n.value.as_deref(), Some("Maria das Graças de Souza"));
        assert_eq!(n.confidence, 1.0);

        let leading = normalize_name("DA SILVA");
        assert_eq!(leading.value.as_deref(), Some("Da Silva"));
    }

    #[test]
    fn test_name_confidence_grows_with_tokens() {
        let one = normalize_name("ANA").confidence;
        let one_long = normalize_name("JOAQUIM").confidence;
        let two = normalize_name("ANA LIMA").confidence;
        let three = normalize_name("ANA LIMA COSTA").confidence;
        assert_eq!(one, 0.4);
        assert_eq!(one_long, 0.5);
        assert_eq!(two, 0.8);
        assert_eq!(three, 1.0);
        assert!(normalize_name("123 ...").value.is_none());
    }

    #[test]
    fn test_institution_code() {
        assert_eq!(normalize_institution_code("000701"), "701");
        assert_eq!(normalize_institution_code("335690"), "335690");
        assert_eq!(normalize_institution_code("0000"), "0");
        assert_eq!(normalize_institution_code(""), "");
    }
}
