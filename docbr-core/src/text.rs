//! # Texto de Documento
//!
//! O texto de OCR é a fonte da verdade de uma execução e nunca é alterado.
//! [`DocumentText`] guarda o texto cru e visões derivadas, calculadas uma
//! única vez:
//!
//! - **upper**: maiúsculas, acentos preservados. Usado pelos extratores, que
//!   precisam devolver "JOSÉ" e não "JOSE".
//! - **folded**: maiúsculas sem acentos. Usado para casar marcadores e nomes
//!   de instituição, já que o OCR frequentemente perde diacríticos.
//! - **scrubbed**: `upper` com todo CNS válido apagado, para que a extração
//!   de número de carteirinha não reutilize os dígitos do CNS.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::checksum::{scan_cns, scrub_cns_spans, CnsScan};

/// Texto de um documento com suas visões derivadas.
#[derive(Debug, Clone)]
pub struct DocumentText {
    raw: String,
    upper: String,
    folded: String,
    scrubbed: String,
    cns: CnsScan,
}

impl DocumentText {
    pub fn new(raw: &str) -> Self {
        let upper = raw.to_uppercase();
        let folded = fold(raw);
        let cns = scan_cns(&upper);
        let scrubbed = scrub_cns_spans(&upper);
        Self {
            raw: raw.to_string(),
            upper,
            folded,
            scrubbed,
            cns,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn upper(&self) -> &str {
        &self.upper
    }

    pub fn folded(&self) -> &str {
        &self.folded
    }

    pub fn scrubbed(&self) -> &str {
        &self.scrubbed
    }

    /// CNS válidos, na ordem em que aparecem.
    pub fn cns(&self) -> &[String] {
        &self.cns.valid
    }

    /// Cadeias com formato de CNS que falharam no dígito verificador.
    pub fn rejected_cns(&self) -> &[String] {
        &self.cns.rejected
    }

    /// `true` se os dígitos de `candidate` contêm algum CNS já reconhecido.
    pub fn overlaps_cns(&self, candidate: &str) -> bool {
        let digits = digits_only(candidate);
        self.cns.valid.iter().any(|cns| digits.contains(cns.as_str()))
    }

    pub fn is_blank(&self) -> bool {
        self.raw.trim().is_empty()
    }
}

/// Maiúsculas sem diacríticos: "Saúde São João" → "SAUDE SAO JOAO".
pub fn fold(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_uppercase()
}

/// Colapsa espaços e apara as pontas.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn digits_only(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// `true` se `needle` aparece em `haystack` delimitado por não-alfanuméricos.
pub fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let end = start + needle.len();
        let before = haystack[..start].chars().next_back();
        let after = haystack[end..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}
