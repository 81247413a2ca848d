//! # Documentos de Exemplo e Registro de Demonstração
//!
//! Textos de OCR sintéticos (números fictícios, dígitos verificadores
//! válidos onde indicado) cobrindo cada variante de extrator, mais um
//! registro de referência com as operadoras correspondentes. Usados nos
//! testes e como demonstração do pipeline.

use crate::classifier::DocumentFamily;
use crate::extractors::ExtractorKind;
use crate::registry::{InMemoryRegistry, ReferenceRegistryEntry};

/// RG paulista. O número do RG aparece numa linha isolada e o CPF impresso
/// tem dígito verificador errado.
pub const IDENTITY_CARD: &str = "REPÚBLICA FEDERATIVA DO BRASIL
ESTADO DE SÃO PAULO
SECRETARIA DA SEGURANÇA PÚBLICA - SSP/SP
INSTITUTO DE IDENTIFICAÇÃO
CARTEIRA DE IDENTIDADE
VÁLIDA EM TODO O TERRITÓRIO NACIONAL
48.151.623-42
NOME
JOSÉ CARLOS DE OLIVEIRA
FILIAÇÃO
ANTÔNIO CARLOS DE OLIVEIRA
MARIA APARECIDA DE OLIVEIRA
NATURALIDADE
SÃO PAULO - SP
DATA DE NASCIMENTO
12/08/1978
DOC. ORIGEM
CERT. NASC. LV A-123 FLS 45
CPF 342.002.171-42
DATA DE EXPEDIÇÃO 03/05/2015";

/// CNH com CPF válido.
pub const DRIVER_LICENSE: &str = "REPÚBLICA FEDERATIVA DO BRASIL
MINISTÉRIO DA INFRAESTRUTURA
DEPARTAMENTO NACIONAL DE TRÂNSITO
CARTEIRA NACIONAL DE HABILITAÇÃO
NOME
ANA PAULA FERREIRA LIMA
DOC. IDENTIDADE / ÓRG. EMISSOR / UF
23.456.789-1 SSP SP
CPF
529.982.247-25
DATA NASCIMENTO
21/04/1990
FILIAÇÃO
PEDRO FERREIRA LIMA
LÚCIA HELENA FERREIRA
Nº REGISTRO
01234567890
DETRAN-SP";

/// Cartão Nacional de Saúde.
pub const SUS_CARD: &str = "MINISTÉRIO DA SAÚDE
CARTÃO NACIONAL DE SAÚDE
NOME
JOÃO PEDRO ALVES
DATA NASC. 02/11/1960
SEXO M
CNS 702 5004 3215 0001";

/// Carteirinha com código ANS no formato "00.070-1".
pub const UNIMED_SEGUROS_CARD: &str = "UNIMED SEGUROS
Seguros Saúde S.A.
ANS - n° 00.070-1
Beneficiário: CARLOS EDUARDO MENDES
Carteira: 0 994 000012345678 0
Plano: UNIMED SEGUROS NACIONAL
Nascimento: 15/06/1982
Acomodação: Apartamento";

/// Carteirinha com CNS válido e número de 16 dígitos em outra linha.
pub const UNIMED_WITH_CNS: &str = "UNIMED CAMPINAS
Cooperativa de Trabalho Médico
Registro ANS: 33569-0
0064 8000 0123 4567
MARIA DAS GRAÇAS SOUZA
Nascimento: 07/03/1985
CNS: 898 0012 3456 0005
Plano: UNIFÁCIL
Acomodação: Enfermaria";

pub const BRADESCO_CARD: &str = "BRADESCO SAÚDE
CARTÃO DO BENEFICIÁRIO
NOME: ROBERTO ALVES PEREIRA
CARTEIRA 123 456 789012 345
PLANO TOP NACIONAL FLEX
VALIDADE 12/2027
ANS Nº 005711";

pub const SULAMERICA_CARD: &str = "SULAMÉRICA SAÚDE
88888 0123 4567 0018
JULIANA COSTA RIBEIRO
PLANO ESPECIAL 100
NASCIMENTO 30/09/1975
ANS 006246";

pub const AMIL_CARD: &str = "AMIL
AMIL ASSISTÊNCIA MÉDICA INTERNACIONAL S.A.
BENEFICIÁRIO: FERNANDA LIMA ROCHA
CÓDIGO DO BENEFICIÁRIO 087654321
PLANO AMIL 400
DATA DE NASCIMENTO 14/02/1988
ANS - Nº 326305";

pub const NOTREDAME_CARD: &str = "NOTREDAME INTERMÉDICA
BENEFICIÁRIO
RICARDO SANTOS MOURA
CARTEIRINHA 123 456 789 012
PLANO SMART 200
NASC 05/05/1995
ANS 359017";

pub const HAPVIDA_CARD: &str = "HAPVIDA
HAPVIDA ASSISTÊNCIA MÉDICA
NOME: PAULO HENRIQUE DIAS
CÓDIGO 0012345678
PLANO NOSSO PLANO
NASCIMENTO 19/07/2001
ANS 368253";

pub const PORTO_SEGURO_CARD: &str = "PORTO SEGURO SAÚDE
4321 0000 1234 5678
BENEFICIÁRIO: LUCAS MARTINS TEIXEIRA
PLANO PRATA MAIS
ANS 000582";

pub const CASSI_CARD: &str = "CASSI
CAIXA DE ASSISTÊNCIA DOS FUNCIONÁRIOS DO BANCO DO BRASIL
MATRÍCULA 123.456.789.012
TITULAR: BEATRIZ GOMES ARAÚJO
PLANO CASSI FAMÍLIA II
ANS 346659";

/// Texto sem marcadores de nenhuma família.
pub const UNKNOWN_DOCUMENT: &str = "Documento avulso
Fulano de Tal Beltrano
1234 5678 9012";

/// Documento de exemplo com a família e a variante esperadas.
pub struct SampleDocument {
    pub name: &'static str,
    pub text: &'static str,
    pub family: DocumentFamily,
    pub extractor: ExtractorKind,
}

/// Todos os documentos de exemplo.
pub fn demo_documents() -> Vec<SampleDocument> {
    use DocumentFamily::*;
    let doc = |name, text, family, extractor| SampleDocument {
        name,
        text,
        family,
        extractor,
    };
    vec![
        doc("rg", IDENTITY_CARD, IdentityDocument, ExtractorKind::IdentityCard),
        doc("cnh", DRIVER_LICENSE, IdentityDocument, ExtractorKind::DriverLicense),
        doc("sus", SUS_CARD, InsuranceCard, ExtractorKind::SusCard),
        doc("unimed_seguros", UNIMED_SEGUROS_CARD, InsuranceCard, ExtractorKind::Unimed),
        doc("unimed_cns", UNIMED_WITH_CNS, InsuranceCard, ExtractorKind::Unimed),
        doc("bradesco", BRADESCO_CARD, InsuranceCard, ExtractorKind::BradescoSaude),
        doc("sulamerica", SULAMERICA_CARD, InsuranceCard, ExtractorKind::SulAmerica),
        doc("amil", AMIL_CARD, InsuranceCard, ExtractorKind::Amil),
        doc("notredame", NOTREDAME_CARD, InsuranceCard, ExtractorKind::NotreDameIntermedica),
        doc("hapvida", HAPVIDA_CARD, InsuranceCard, ExtractorKind::Hapvida),
        doc("porto_seguro", PORTO_SEGURO_CARD, InsuranceCard, ExtractorKind::PortoSeguro),
        doc("cassi", CASSI_CARD, InsuranceCard, ExtractorKind::Cassi),
        doc("desconhecido", UNKNOWN_DOCUMENT, Unknown, ExtractorKind::Generic),
    ]
}

/// Registro de referência com as operadoras dos exemplos, mais uma
/// entidade cujo nome contém "PORTO" sem ser a Porto Seguro.
pub fn sample_registry() -> InMemoryRegistry {
    let entry = |code: &str, name: &str| ReferenceRegistryEntry {
        id: format!("ans-{code}"),
        canonical_name: name.to_string(),
        issuer_code: code.to_string(),
    };
    InMemoryRegistry::new(vec![
        entry("000701", "UNIMED SEGUROS SAÚDE S.A."),
        entry("335690", "UNIMED CAMPINAS COOPERATIVA DE TRABALHO MÉDICO"),
        entry("005711", "BRADESCO SAÚDE S.A."),
        entry("006246", "SUL AMÉRICA COMPANHIA DE SEGURO SAÚDE"),
        entry("326305", "AMIL ASSISTÊNCIA MÉDICA INTERNACIONAL S.A."),
        entry("359017", "NOTRE DAME INTERMÉDICA SAÚDE S.A."),
        entry("368253", "HAPVIDA ASSISTÊNCIA MÉDICA S.A."),
        entry("000582", "PORTO SEGURO - SEGURO SAÚDE S.A."),
        entry("346659", "CAIXA DE ASSISTÊNCIA DOS FUNCIONÁRIOS DO BANCO DO BRASIL"),
        entry("999001", "IRMANDADE DA SANTA CASA DE MISERICÓRDIA DE PORTO ALEGRE"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::{is_valid_cns, is_valid_cpf};

    #[test]
    fn test_sample_identifiers_have_expected_checksums() {
        assert!(is_valid_cns("702500432150001"));
        assert!(is_valid_cns("898001234560005"));
        assert!(is_valid_cpf("52998224725"));
        assert!(!is_valid_cpf("34200217142"));
    }

    #[test]
    fn test_demo_documents_cover_every_variant() {
        let docs = demo_documents();
        for kind in [
            ExtractorKind::SusCard,
            ExtractorKind::Unimed,
            ExtractorKind::BradescoSaude,
            ExtractorKind::SulAmerica,
            ExtractorKind::Amil,
            ExtractorKind::NotreDameIntermedica,
            ExtractorKind::Hapvida,
            ExtractorKind::PortoSeguro,
            ExtractorKind::Cassi,
            ExtractorKind::DriverLicense,
            ExtractorKind::IdentityCard,
            ExtractorKind::Generic,
        ] {
            assert!(docs.iter().any(|d| d.extractor == kind), "{kind}");
        }
    }

    #[test]
    fn test_sample_registry_codes_unique() {
        let registry = sample_registry();
        let mut codes: Vec<&str> = registry.entries().iter().map(|e| e.issuer_code.as_str()).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), registry.len());
    }
}
