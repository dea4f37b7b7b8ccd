// Lookup-key normalization shared by matching, commission rules and grouping
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lowercase, strip accents and collapse whitespace
///
/// `"  DISEÑO   de Sonrisa "` becomes `"diseno de sonrisa"`.
pub fn normalize(input: &str) -> String {
    input
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize an optional field, mapping blank values to `None`
pub fn normalize_opt(input: Option<&str>) -> Option<String> {
    input.map(normalize).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accents_and_case() {
        assert_eq!(normalize("DISEÑO DE SONRISA"), normalize("diseno de sonrisa"));
        assert_eq!(normalize("Extracción"), "extraccion");
        assert_eq!(normalize("Dra. Páez"), "dra. paez");
    }

    #[test]
    fn test_whitespace_collapses() {
        assert_eq!(normalize("  Control \t  Autoligados\n"), "control autoligados");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_normalize_opt_drops_blank() {
        assert_eq!(normalize_opt(Some("  ")), None);
        assert_eq!(normalize_opt(None), None);
        assert_eq!(normalize_opt(Some("Sillón 2")), Some("sillon 2".to_string()));
    }
}
