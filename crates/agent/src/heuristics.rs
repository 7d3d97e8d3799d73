use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use qualcel_core::domain::criterion::{Criterion, PreferenceLevel, PriceRange, PRICE_INTERVAL_TYPE};

/// Window around a lone price when no qualifier says which side is open.
const PRICE_WINDOW: u32 = 500;

fn camera_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:foto|camera|selfie|imagem|imagens|retrato|photo)")
            .expect("camera regex must compile")
    })
}

fn battery_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:bateria|autonomia|dia todo|carregar|durabilidade|battery)")
            .expect("battery regex must compile")
    })
}

fn performance_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\b(?:jogo|jogar|game|gamer|desempenho|rapid|fluid|processador|multitaref|performance)",
        )
        .expect("performance regex must compile")
    })
}

fn level_tiers() -> &'static [(PreferenceLevel, Regex); 4] {
    static TIERS: OnceLock<[(PreferenceLevel, Regex); 4]> = OnceLock::new();
    TIERS.get_or_init(|| {
        let tier = |pattern: &str| Regex::new(pattern).expect("level regex must compile");
        [
            (
                PreferenceLevel::Top,
                tier(r"\b(?:top\b|topo\b|premium|excelent|incrivel|fantastic)"),
            ),
            (PreferenceLevel::Good, tier(r"\b(?:boa|bom\b|otim|melhor|perfeit)")),
            (PreferenceLevel::Ok, tier(r"\b(?:ok\b|intermedi|mediana|regular)")),
            (PreferenceLevel::Basic, tier(r"\b(?:simples|basic|de entrada|barat)")),
        ]
    })
}

fn thousands_separator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d)\.(\d{3})\b").expect("thousands regex must compile"))
}

// The optional unit group lets us skip "5000 mah" or "256 gb" without lookahead.
fn price_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(\d{3,5})\b(?:\s*(mah|gb|tb|mp|hz|mm|w)\b)?")
            .expect("price number regex must compile")
    })
}

fn up_to_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:ate\b|maxim|no maximo|up to\b)").expect("up-to regex must compile")
    })
}

fn above_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:acima|mais de\b|a partir|above\b)").expect("above regex must compile")
    })
}

fn price_bands() -> &'static [(Regex, PriceRange); 3] {
    static BANDS: OnceLock<[(Regex, PriceRange); 3]> = OnceLock::new();
    BANDS.get_or_init(|| {
        let band = |pattern: &str| Regex::new(pattern).expect("price band regex must compile");
        [
            (band(r"\b(?:barat|custo[- ]beneficio|economic)"), PriceRange::new(0, 1500)),
            (band(r"\b(?:intermedi|medio\b|equilibrad)"), PriceRange::new(1500, 2500)),
            (
                band(r"\b(?:caro\b|premium|top\b|topo\b|flagship|alto\b)"),
                PriceRange::new(2500, PriceRange::OPEN_CEILING),
            ),
        ]
    })
}

/// NFD-decomposes, strips combining marks, lowercases and trims.
pub fn normalize_text_chunk(chunk: &str) -> String {
    let stripped: String = chunk.nfd().filter(|c| !is_combining_mark(*c)).collect();
    stripped.to_lowercase().trim().to_owned()
}

/// Infers camera, battery, performance and price criteria from free text.
/// Each domain yields at most one criterion.
pub fn infer_criteria_from_keywords<I>(chunks: I) -> Vec<Criterion>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let text = chunks
        .into_iter()
        .map(|chunk| normalize_text_chunk(chunk.as_ref()))
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        return Vec::new();
    }

    let level = infer_level_from_text(&text);
    let mut criteria = Vec::new();

    if camera_re().is_match(&text) {
        criteria.push(Criterion::new("camera", level.as_str()));
    }
    if battery_re().is_match(&text) {
        criteria.push(Criterion::new("battery", level.as_str()));
    }
    if performance_re().is_match(&text) {
        criteria.push(Criterion::new("benchmark", level.as_str()));
    }
    if let Some(range) = infer_price_range(&text) {
        criteria.push(Criterion::new(PRICE_INTERVAL_TYPE, range.to_string()));
    }

    criteria
}

/// First matching tier from strongest to weakest; `Good` when nothing matches.
pub fn infer_level_from_text(text: &str) -> PreferenceLevel {
    let text = normalize_text_chunk(text);
    level_tiers()
        .iter()
        .find(|(_, pattern)| pattern.is_match(&text))
        .map(|(level, _)| *level)
        .unwrap_or(PreferenceLevel::Good)
}

/// Budget band from explicit numbers, then qualifiers, then keyword bands.
pub fn infer_price_range(text: &str) -> Option<PriceRange> {
    let mut text = normalize_text_chunk(text);
    while thousands_separator_re().is_match(&text) {
        text = thousands_separator_re().replace_all(&text, "$1$2").into_owned();
    }

    let numbers: Vec<u32> = price_number_re()
        .captures_iter(&text)
        .filter(|captures| captures.get(2).is_none())
        .filter_map(|captures| captures.get(1)?.as_str().parse().ok())
        .collect();

    match numbers.as_slice() {
        [] => price_bands()
            .iter()
            .find(|(pattern, _)| pattern.is_match(&text))
            .map(|(_, range)| *range),
        [single] => {
            let n = *single;
            if up_to_re().is_match(&text) {
                Some(PriceRange::new(0, n))
            } else if above_re().is_match(&text) {
                Some(PriceRange::new(n, PriceRange::OPEN_CEILING))
            } else {
                Some(PriceRange::new(n.saturating_sub(PRICE_WINDOW), n + PRICE_WINDOW))
            }
        }
        many => {
            let min = many.iter().copied().min()?;
            let max = many.iter().copied().max()?;
            Some(PriceRange::new(min, max))
        }
    }
}

#[cfg(test)]
mod tests {
    use qualcel_core::domain::criterion::{Criterion, PreferenceLevel, PriceRange};

    use super::{
        infer_criteria_from_keywords, infer_level_from_text, infer_price_range,
        normalize_text_chunk,
    };

    #[test]
    fn normalize_strips_diacritics_and_case() {
        assert_eq!(normalize_text_chunk("  Câmera ÓTIMA "), "camera otima");
        assert_eq!(normalize_text_chunk("até"), "ate");
    }

    #[test]
    fn camera_and_battery_default_to_good() {
        let criteria =
            infer_criteria_from_keywords(["quero uma câmera boa e bateria que dure o dia todo"]);

        assert_eq!(
            criteria,
            vec![Criterion::new("camera", "good"), Criterion::new("battery", "good")]
        );
    }

    #[test]
    fn level_tiers_are_checked_strongest_first() {
        assert_eq!(infer_level_from_text("câmera incrível mas bateria ok"), PreferenceLevel::Top);
        assert_eq!(infer_level_from_text("bateria ok"), PreferenceLevel::Ok);
        assert_eq!(infer_level_from_text("algo simples pra foto"), PreferenceLevel::Basic);
        assert_eq!(infer_level_from_text("pra jogar"), PreferenceLevel::Good);
    }

    #[test]
    fn topo_de_linha_reads_as_top_tier() {
        assert_eq!(infer_level_from_text("câmera topo de linha"), PreferenceLevel::Top);
        assert_eq!(infer_level_from_text("camera topo de linha"), PreferenceLevel::Top);
        assert_eq!(infer_level_from_text("no topo"), PreferenceLevel::Top);
        assert_eq!(infer_level_from_text("topografia"), PreferenceLevel::Good);
        assert_eq!(infer_price_range("um topo de linha"), Some(PriceRange::new(2500, 99_999)));
    }

    #[test]
    fn price_with_up_to_qualifier_opens_floor() {
        assert_eq!(infer_price_range("até 1000 reais"), Some(PriceRange::new(0, 1000)));
    }

    #[test]
    fn price_with_above_qualifier_opens_ceiling() {
        assert_eq!(infer_price_range("acima de 2000"), Some(PriceRange::new(2000, 99_999)));
    }

    #[test]
    fn lone_price_without_qualifier_gets_a_window() {
        assert_eq!(infer_price_range("uns 1800 reais"), Some(PriceRange::new(1300, 2300)));
        assert_eq!(infer_price_range("por 300"), Some(PriceRange::new(0, 800)));
    }

    #[test]
    fn two_prices_span_min_to_max() {
        assert_eq!(infer_price_range("entre 2500 e 1500"), Some(PriceRange::new(1500, 2500)));
        assert_eq!(
            infer_price_range("de R$ 1.200 a R$ 2.000,00"),
            Some(PriceRange::new(1200, 2000))
        );
    }

    #[test]
    fn keyword_bands_apply_without_numbers() {
        assert_eq!(
            infer_price_range("quero algo barato").map(|range| range.to_string()),
            Some("0-1500".to_string())
        );
        assert_eq!(infer_price_range("um intermediário"), Some(PriceRange::new(1500, 2500)));
        assert_eq!(infer_price_range("um flagship"), Some(PriceRange::new(2500, 99_999)));
    }

    #[test]
    fn no_price_signal_yields_none() {
        assert_eq!(infer_price_range("quero tirar fotos"), None);
        assert_eq!(infer_price_range("bateria de 5000mah e 256 GB"), None);
        assert_eq!(infer_price_range("bateria que dure"), None);
    }

    #[test]
    fn price_and_performance_are_inferred_together() {
        let criteria = infer_criteria_from_keywords(vec![
            "celular pra jogar".to_string(),
            "   ".to_string(),
            "até 2.500".to_string(),
        ]);

        assert_eq!(
            criteria,
            vec![Criterion::new("benchmark", "good"), Criterion::new("price_interval", "0-2500")]
        );
    }

    #[test]
    fn empty_input_infers_nothing() {
        assert!(infer_criteria_from_keywords(Vec::<String>::new()).is_empty());
        assert!(infer_criteria_from_keywords(["oi"]).is_empty());
    }
}
