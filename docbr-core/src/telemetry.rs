//! Inicialização do `tracing` para aplicações hospedeiras e testes.

use tracing_subscriber::EnvFilter;

/// Alvos de log usados pelos módulos do crate.
pub const TARGET_PIPELINE: &str = "docbr::pipeline";
pub const TARGET_EXTRACTORS: &str = "docbr::extractors";
pub const TARGET_RESOLVER: &str = "docbr::resolver";

/// Instala um subscriber `fmt` com filtro vindo de `RUST_LOG` ou, na falta
/// dele, de `default_filter` (ex: `"info"`, `"docbr=debug"`).
///
/// Retorna `false` se já havia um subscriber global instalado.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        let _ = init_tracing("debug");
        // a segunda instalação nunca pode ter sucesso
        assert!(!init_tracing("debug"));
    }
}
