//! # Validadores de Dígito Verificador: CNS e CPF
//!
//! Funções puras e determinísticas. Nenhum identificador numérico entra em
//! `identifier_number` sem passar por aqui.
//!
//! ## CNS (Cartão Nacional de Saúde)
//!
//! 15 dígitos, primeiro dígito em {1, 2, 7, 8, 9}. Válido quando
//! Σ dígito[i] × (15 − i) ≡ 0 (mod 11).
//!
//! ## CPF
//!
//! 11 dígitos, os dois últimos são verificadores (mod 11 com pesos 10..2 e
//! depois 11..2). Sequências de um único dígito repetido ("111.111.111-11")
//! passam na conta mas são inválidas por definição.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Cadeia de 15 dígitos com o primeiro dígito válido para CNS, contígua ou
/// agrupada 3-4-4-4 (separadores espaço ou ponto).
static CNS_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([12789]\d{2})[ .]?(\d{4})[ .]?(\d{4})[ .]?(\d{4})\b").expect("regex de CNS válida")
});

const CNS_FIRST_DIGITS: [char; 5] = ['1', '2', '7', '8', '9'];

/// Valida um CNS de 15 dígitos (sem separadores).
pub fn is_valid_cns(candidate: &str) -> bool {
    if candidate.len() != 15 || !candidate.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    if !candidate.starts_with(CNS_FIRST_DIGITS) {
        return false;
    }
    let sum: u32 = candidate
        .bytes()
        .enumerate()
        .map(|(i, b)| u32::from(b - b'0') * (15 - i as u32))
        .sum();
    sum % 11 == 0
}

/// Valida um CPF de 11 dígitos (sem separadores).
pub fn is_valid_cpf(candidate: &str) -> bool {
    if candidate.len() != 11 || !candidate.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let digits: Vec<u32> = candidate.bytes().map(|b| u32::from(b - b'0')).collect();
    if is_repeated_sequence(&digits) {
        return false;
    }
    let first = cpf_check_digit(&digits[..9], 10);
    let second = cpf_check_digit(&digits[..10], 11);
    digits[9] == first && digits[10] == second
}

fn cpf_check_digit(digits: &[u32], first_weight: u32) -> u32 {
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (first_weight - i as u32))
        .sum();
    let rest = sum % 11;
    if rest < 2 {
        0
    } else {
        11 - rest
    }
}

/// `true` quando todos os dígitos são iguais (ex: "00000000000").
pub fn is_repeated_sequence(digits: &[u32]) -> bool {
    digits.windows(2).all(|w| w[0] == w[1])
}

/// Resultado da varredura de candidatos a CNS num texto.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CnsScan {
    /// CNS válidos, distintos, na ordem em que aparecem.
    pub valid: Vec<String>,
    /// Cadeias com formato de CNS que falharam no dígito verificador.
    pub rejected: Vec<String>,
}

/// Varre o texto atrás de cadeias com formato de CNS, separando as válidas
/// das que falham no dígito verificador.
pub fn scan_cns(text: &str) -> CnsScan {
    let mut scan = CnsScan::default();
    let mut seen = HashSet::new();
    for caps in CNS_SHAPE.captures_iter(text) {
        let digits = joined_digits(&caps);
        if !seen.insert(digits.clone()) {
            continue;
        }
        if is_valid_cns(&digits) {
            scan.valid.push(digits);
        } else {
            scan.rejected.push(digits);
        }
    }
    scan
}

/// Conjunto ordenado de CNS distintos e válidos encontrados no texto.
pub fn extract_all_cns_candidates(text: &str) -> Vec<String> {
    scan_cns(text).valid
}

/// Substitui por espaços todo trecho do texto que já foi reconhecido como
/// CNS válido, para que a extração de número de carteirinha não o recapture.
/// Os offsets do texto são preservados.
pub fn scrub_cns_spans(text: &str) -> String {
    CNS_SHAPE
        .replace_all(text, |caps: &Captures| {
            let whole = &caps[0];
            if is_valid_cns(&joined_digits(caps)) {
                " ".repeat(whole.len())
            } else {
                whole.to_string()
            }
        })
        .into_owned()
}

fn joined_digits(caps: &Captures) -> String {
    (1..=4).filter_map(|i| caps.get(i)).map(|m| m.as_str()).collect()
}
