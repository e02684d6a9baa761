//! `VariantDocument -> Record` as a set of independent transformations.
//!
//! Each function reads only the document and the inputs it is given, so
//! every part of a record can be tested on its own.

use crate::access::{ConditionEnricher, ConditionLookup};
use crate::comparators;
use crate::config::{render, XrefTemplates};
use crate::document::{ConditionEntry, ConditionRecord, JsonObject, VariantDocument};
use crate::response::{ConditionName, ExternalLinks, GeneSymbol, Link, Significance, VepSummary};
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeSet;
use togovar_query::components::VARIANT_ID_PREFIX;
use togovar_query::vocabulary::normalize_significance_id;
use togovar_query::{DatasetAliases, Vocabularies, Vocabulary};

/// Name shown for a MedGen concept without a known name.
pub const LABEL_NOT_PROVIDED: &str = "not provided";

const DBSNP_SOURCE: &str = "dbSNP";
/// Transcript annotations whose symbol comes from one of these sources name a gene.
const GENE_SYMBOL_SOURCES: [&str; 2] = ["HGNC", "EntrezGene"];

/// `tgv<id>`.
pub fn accession(doc: &VariantDocument) -> Option<String> {
    match doc.id.as_ref()? {
        JsonValue::Number(n) => Some(format!("{VARIANT_ID_PREFIX}{n}")),
        JsonValue::String(s) if !s.is_empty() => Some(format!("{VARIANT_ID_PREFIX}{s}")),
        _ => None,
    }
}

/// Stable id of the variant class.
pub fn variant_type(doc: &VariantDocument, types: &Vocabulary) -> Option<String> {
    let label = doc.variant_type.as_deref()?;
    types.find_by_label(label).map(|t| t.id.clone())
}

/// dbSNP identifiers, first occurrence kept.
pub fn existing_variations(doc: &VariantDocument) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for xref in &doc.xref {
        if xref.source.as_deref() != Some(DBSNP_SOURCE) {
            continue;
        }
        if let Some(id) = xref.id.as_ref().filter(|id| !id.is_empty()) {
            if !ids.contains(id) {
                ids.push(id.clone());
            }
        }
    }
    ids
}

/// Genes of the transcript annotations, deduplicated, with synonyms, in
/// `order` then by symbol.
pub fn gene_symbols(
    doc: &VariantDocument,
    order: &[u64],
    mut synonyms: impl FnMut(u64) -> Option<Vec<String>>,
) -> Vec<GeneSymbol> {
    let mut seen: Vec<(Option<String>, u64)> = Vec::new();
    for transcript in doc.vep.iter().flatten() {
        let Some(id) = transcript.get("hgnc_id").and_then(JsonValue::as_u64) else {
            continue;
        };
        let symbol = transcript.get("symbol");
        let source = symbol
            .and_then(|s| s.get("source"))
            .and_then(JsonValue::as_str);
        if !source.is_some_and(|s| GENE_SYMBOL_SOURCES.contains(&s)) {
            continue;
        }
        let name = symbol
            .and_then(|s| s.get("label"))
            .and_then(JsonValue::as_str)
            .map(str::to_string);
        if !seen.iter().any(|(n, i)| *i == id && *n == name) {
            seen.push((name, id));
        }
    }

    let mut genes: Vec<GeneSymbol> = seen
        .into_iter()
        .map(|(name, id)| GeneSymbol {
            name,
            id,
            synonyms: synonyms(id),
        })
        .collect();
    genes.sort_by(|a, b| comparators::gene(order, a, b));
    genes
}

/// ClinVar variation accession title, `VCV000012345`.
fn clinvar_title(id: &JsonValue) -> Option<String> {
    let number = match id {
        JsonValue::Number(n) => n.as_u64(),
        JsonValue::String(s) => s.parse().ok(),
        _ => None,
    };
    match (number, id) {
        (Some(n), _) => Some(format!("VCV{n:09}")),
        (None, JsonValue::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn id_text(id: &JsonValue) -> Option<String> {
    match id {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn external_links(
    doc: &VariantDocument,
    dbsnp: &[String],
    templates: &XrefTemplates,
) -> ExternalLinks {
    let mut links = ExternalLinks::default();

    if !dbsnp.is_empty() {
        links.dbsnp = Some(
            dbsnp
                .iter()
                .map(|id| Link {
                    title: id.clone(),
                    xref: render(&templates.dbsnp, id),
                })
                .collect(),
        );
    }

    let accession_of = |source: &str| doc.condition_from(source).and_then(|c| c.id.as_ref());
    if let Some(id) = accession_of("clinvar") {
        if let (Some(title), Some(text)) = (clinvar_title(id), id_text(id)) {
            links.clinvar = Some(vec![Link {
                title,
                xref: render(&templates.clinvar, &text),
            }]);
        }
    }
    if let Some(text) = accession_of("mgend").and_then(id_text) {
        links.mgend = Some(vec![Link {
            xref: render(&templates.mgend, &text),
            title: text,
        }]);
    }

    let chromosome = doc.chromosome_label().unwrap_or_default();
    let position = doc.position().map(|p| p.to_string()).unwrap_or_default();

    if doc.frequency_sources().any(|s| s == "tommo") {
        let query = format!("{chromosome}:{position}");
        links.tommo = Some(vec![Link {
            xref: render(&templates.tommo, &urlencoding::encode(&query)),
            title: query,
        }]);
    }
    if doc.frequency_sources().any(|s| s.starts_with("gnomad")) {
        let id = format!(
            "{chromosome}-{position}-{}-{}",
            doc.reference().unwrap_or_default(),
            doc.alternate().unwrap_or_default()
        );
        links.gnomad = Some(vec![Link {
            xref: render(&templates.gnomad, &id),
            title: id,
        }]);
    }

    links
}

/// Condition entries of `record`, asking the enricher for submissions that
/// arrived without any.
fn condition_entries(record: &ConditionRecord, enricher: &dyn ConditionEnricher) -> Vec<ConditionEntry> {
    if !record.condition.is_empty() {
        return record.condition.clone();
    }
    let accession = match (record.source.as_deref(), record.id.as_ref().and_then(id_text)) {
        (Some("mgend"), Some(accession)) => accession,
        _ => return Vec::new(),
    };
    match enricher.lookup(&accession) {
        ConditionLookup::Found(interpretations) => interpretations
            .into_iter()
            .map(|i| ConditionEntry {
                classification: i.classification,
                ..Default::default()
            })
            .collect(),
        ConditionLookup::NotFound => {
            tracing::debug!(accession = %accession, "no condition interpretation found");
            Vec::new()
        }
    }
}

fn condition_names(
    entry: &ConditionEntry,
    names: &mut impl FnMut(&str) -> Option<String>,
) -> Vec<ConditionName> {
    if !entry.medgen.is_empty() {
        let mut medgen = entry.medgen.clone();
        medgen.sort_by(|a, b| comparators::medgen(a, b));
        return medgen
            .into_iter()
            .map(|id| ConditionName {
                name: names(&id).unwrap_or_else(|| LABEL_NOT_PROVIDED.to_string()),
                medgen: Some(id),
            })
            .collect();
    }
    entry
        .pref_name
        .iter()
        .map(|name| ConditionName {
            name: name.clone(),
            medgen: None,
        })
        .collect()
}

/// One entry per condition of every clinical annotation, most relevant first.
/// A submission without conditions still yields one entry.
pub fn significance(
    conditions: &[ConditionRecord],
    significances: &Vocabulary,
    enricher: &dyn ConditionEnricher,
    mut names: impl FnMut(&str) -> Option<String>,
) -> Vec<Significance> {
    let mut out = Vec::new();
    for record in conditions {
        let mut entries = condition_entries(record, enricher);
        if entries.is_empty() {
            entries.push(ConditionEntry::default());
        }
        for entry in entries {
            out.push(Significance {
                conditions: condition_names(&entry, &mut names),
                interpretations: entry
                    .classification
                    .iter()
                    .filter_map(|c| significances.find_by_id(&normalize_significance_id(c)))
                    .map(|t| t.key.clone())
                    .collect(),
                submission_count: entry.submission_count,
                source: record.source.clone(),
            });
        }
    }
    out.sort_by(|a, b| comparators::significance(significances, a, b));
    out
}

/// Drop `null` members.
fn compact(object: &JsonObject) -> JsonObject {
    object
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn consequence_keys(transcript: &JsonObject) -> Vec<&str> {
    match transcript.get("consequence") {
        Some(JsonValue::Array(keys)) => keys.iter().filter_map(JsonValue::as_str).collect(),
        Some(JsonValue::String(key)) => vec![key.as_str()],
        _ => Vec::new(),
    }
}

pub fn vep_summary(doc: &VariantDocument, vocabularies: &Vocabularies) -> Option<VepSummary> {
    let transcripts = doc.vep.as_ref()?;
    let consequences = &vocabularies.consequences;

    let most_severe = consequences
        .most_severe(transcripts.iter().flat_map(consequence_keys))
        .map(|t| t.id.clone());

    let emitted: Vec<JsonObject> = transcripts
        .iter()
        .map(|transcript| {
            let mut out = compact(transcript);
            if out.contains_key("consequence") {
                let ids: Vec<JsonValue> = consequences
                    .in_canonical_order(consequence_keys(transcript))
                    .into_iter()
                    .map(|t| json!(t.id))
                    .collect();
                out.insert("consequence".to_string(), JsonValue::Array(ids));
            }
            out
        })
        .collect();

    Some(VepSummary {
        most_severe_consequence: most_severe,
        sift: doc.sift,
        polyphen: doc.polyphen.map(|p| {
            if p < 0.0 {
                json!("Unknown")
            } else {
                json!(p)
            }
        }),
        alphamissense: doc.alphamissense,
        transcripts: (!emitted.is_empty()).then_some(emitted),
    })
}

fn is_blank(value: Option<&JsonValue>) -> bool {
    match value {
        None | Some(JsonValue::Null) => true,
        Some(JsonValue::String(s)) => s.is_empty(),
        _ => false,
    }
}

/// Frequency entries of accessible datasets under their public names, with
/// `af` derived from `ac / an` when missing and keys in sorted order.
pub fn frequencies(
    entries: &[JsonObject],
    aliases: &DatasetAliases,
    accessible: &BTreeSet<String>,
) -> Vec<JsonObject> {
    entries
        .iter()
        .filter_map(|entry| {
            let source = aliases.to_public(entry.get("source")?.as_str()?);
            if !accessible.contains(&source) {
                return None;
            }

            let mut sorted: std::collections::BTreeMap<String, JsonValue> = entry
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            sorted.insert("source".to_string(), json!(source));

            if is_blank(entry.get("af")) {
                let count = |key: &str| entry.get(key).and_then(JsonValue::as_f64);
                if let (Some(ac), Some(an)) = (count("ac"), count("an")) {
                    if an > 0.0 {
                        sorted.insert("af".to_string(), json!(ac / an));
                    }
                }
            }

            Some(sorted.into_iter().collect())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{ConditionInterpretation, NoConditionEnricher};

    fn doc(value: JsonValue) -> VariantDocument {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn accession_and_type() {
        let vocab = Vocabularies::bundled().unwrap();
        let d = doc(json!({ "id": 421843, "type": "SNV" }));
        assert_eq!(accession(&d).as_deref(), Some("tgv421843"));
        assert_eq!(variant_type(&d, &vocab.variant_types).as_deref(), Some("SO_0001483"));
        assert_eq!(accession(&doc(json!({}))), None);
    }

    #[test]
    fn existing_variations_only_take_dbsnp() {
        let d = doc(json!({
            "xref": [
                { "source": "dbSNP", "id": "rs1" },
                { "source": "ClinVar", "id": "12345" },
                { "source": "dbSNP", "id": "rs1" },
                { "source": "dbSNP", "id": "rs2" }
            ]
        }));
        assert_eq!(existing_variations(&d), vec!["rs1", "rs2"]);
    }

    #[test]
    fn gene_symbols_are_deduplicated_and_ordered() {
        let d = doc(json!({
            "vep": [
                { "hgnc_id": 2, "symbol": { "source": "HGNC", "label": "BRCA2" } },
                { "hgnc_id": 1, "symbol": { "source": "HGNC", "label": "BRCA1" } },
                { "hgnc_id": 2, "symbol": { "source": "HGNC", "label": "BRCA2" } },
                { "hgnc_id": 3, "symbol": { "source": "RefSeq", "label": "X" } },
                { "symbol": { "source": "HGNC", "label": "NOID" } }
            ]
        }));
        let genes = gene_symbols(&d, &[2], |id| (id == 1).then(|| vec!["RNF53".to_string()]));
        assert_eq!(
            genes,
            vec![
                GeneSymbol { name: Some("BRCA2".into()), id: 2, synonyms: None },
                GeneSymbol {
                    name: Some("BRCA1".into()),
                    id: 1,
                    synonyms: Some(vec!["RNF53".into()])
                },
            ]
        );
    }

    #[test]
    fn external_links_follow_templates() {
        let d = doc(json!({
            "chromosome": { "label": "1" },
            "vcf": { "position": 12345, "reference": "A", "alternate": "G" },
            "conditions": [
                { "source": "clinvar", "id": 402986 },
                { "source": "mgend", "id": "MGS000001" }
            ],
            "frequency": [ { "source": "tommo" }, { "source": "gnomad_genomes" } ]
        }));
        let links = external_links(&d, &["rs1".to_string()], &XrefTemplates::default());

        let clinvar = &links.clinvar.unwrap()[0];
        assert_eq!(clinvar.title, "VCV000402986");
        assert_eq!(clinvar.xref, "https://www.ncbi.nlm.nih.gov/clinvar/variation/402986");
        assert_eq!(links.mgend.unwrap()[0].title, "MGS000001");
        let tommo = &links.tommo.unwrap()[0];
        assert_eq!(tommo.title, "1:12345");
        assert_eq!(tommo.xref, "https://jmorp.megabank.tohoku.ac.jp/search?query=1%3A12345");
        assert_eq!(links.gnomad.unwrap()[0].title, "1-12345-A-G");
        assert_eq!(links.dbsnp.unwrap()[0].xref, "https://identifiers.org/dbsnp/rs1");
    }

    #[test]
    fn no_links_without_sources() {
        assert!(external_links(&doc(json!({})), &[], &XrefTemplates::default()).is_empty());
    }

    #[test]
    fn significance_explodes_conditions_and_names_them() {
        let vocab = Vocabularies::bundled().unwrap();
        let d = doc(json!({
            "conditions": [
                {
                    "source": "clinvar",
                    "condition": [
                        { "medgen": ["C3661900", "C0006142"], "classification": ["likely benign"], "submission_count": 1 },
                        { "pref_name": "Hereditary cancer", "classification": ["Pathogenic"], "submission_count": 2 }
                    ]
                },
                { "source": "mgend", "id": "MGS1" }
            ]
        }));

        let names = |m: &str| (m == "C0006142").then(|| "Breast cancer".to_string());
        let out = significance(
            d.conditions.as_deref().unwrap(),
            &vocab.significances,
            &NoConditionEnricher,
            names,
        );

        assert_eq!(out.len(), 3);
        assert_eq!(out[0].interpretations, vec!["P"]);
        assert_eq!(
            out[0].conditions,
            vec![ConditionName { name: "Hereditary cancer".into(), medgen: None }]
        );
        assert_eq!(out[1].interpretations, vec!["LB"]);
        assert_eq!(
            out[1].conditions,
            vec![
                ConditionName { name: "Breast cancer".into(), medgen: Some("C0006142".into()) },
                ConditionName { name: LABEL_NOT_PROVIDED.into(), medgen: Some("C3661900".into()) },
            ]
        );
        // The mgend submission has no condition and no enrichment.
        assert!(out[2].conditions.is_empty());
        assert!(out[2].interpretations.is_empty());
        assert_eq!(out[2].source.as_deref(), Some("mgend"));
    }

    struct Fixed;

    impl ConditionEnricher for Fixed {
        fn lookup(&self, accession: &str) -> ConditionLookup {
            if accession == "MGS1" {
                ConditionLookup::Found(vec![ConditionInterpretation {
                    classification: vec!["pathogenic".into()],
                }])
            } else {
                ConditionLookup::NotFound
            }
        }
    }

    #[test]
    fn enricher_fills_missing_mgend_conditions() {
        let vocab = Vocabularies::bundled().unwrap();
        let d = doc(json!({ "conditions": [{ "source": "mgend", "id": "MGS1" }] }));
        let out = significance(d.conditions.as_deref().unwrap(), &vocab.significances, &Fixed, |_| None);
        assert_eq!(out[0].interpretations, vec!["P"]);
    }

    #[test]
    fn vep_summary_orders_consequences_and_maps_unknown_polyphen() {
        let vocab = Vocabularies::bundled().unwrap();
        let d = doc(json!({
            "polyphen": -1.0,
            "sift": 0.01,
            "vep": [
                { "consequence": ["intron_variant", "missense_variant"], "transcript_id": "ENST1", "hgvs_p": null },
                { "consequence": ["stop_gained"] }
            ]
        }));
        let summary = vep_summary(&d, &vocab).unwrap();
        assert_eq!(summary.most_severe_consequence.as_deref(), Some("SO_0001587"));
        assert_eq!(summary.polyphen, Some(json!("Unknown")));
        let transcripts = summary.transcripts.unwrap();
        assert_eq!(transcripts[0]["consequence"], json!(["SO_0001583", "SO_0001627"]));
        assert!(!transcripts[0].contains_key("hgvs_p"));

        assert!(vep_summary(&doc(json!({})), &vocab).is_none());
        assert_eq!(vep_summary(&doc(json!({ "vep": [] })), &vocab).unwrap().transcripts, None);
    }

    #[test]
    fn frequencies_are_filtered_aliased_and_derived() {
        let accessible: BTreeSet<String> = ["jga_wes", "tommo"].iter().map(|s| s.to_string()).collect();
        let entries: Vec<JsonObject> = serde_json::from_value(json!([
            { "source": "jga_ngs", "ac": 5, "an": 10, "af": null },
            { "source": "tommo", "af": 0.25, "ac": 1, "an": 10 },
            { "source": "gem_j_wga", "ac": 1, "an": 2 }
        ]))
        .unwrap();

        let out = frequencies(&entries, &DatasetAliases::default(), &accessible);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["source"], json!("jga_wes"));
        assert_eq!(out[0]["af"], json!(0.5));
        assert_eq!(out[1]["af"], json!(0.25));
        let keys: Vec<&String> = out[0].keys().collect();
        assert_eq!(keys, vec!["ac", "af", "an", "source"]);
    }
}
