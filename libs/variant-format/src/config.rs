//! Formatter configuration: external link templates.

use crate::error::{Error, Result};
use serde::Deserialize;

/// Placeholder substituted with the (already encoded) identifier.
pub const ID_PLACEHOLDER: &str = "{id}";

/// URL templates of the external link block, one per source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct XrefTemplates {
    #[serde(default = "default_dbsnp")]
    pub dbsnp: String,
    #[serde(default = "default_clinvar")]
    pub clinvar: String,
    #[serde(default = "default_mgend")]
    pub mgend: String,
    /// Receives the url-encoded `chromosome:position` query.
    #[serde(default = "default_tommo")]
    pub tommo: String,
    /// Receives `chromosome-position-reference-alternate`.
    #[serde(default = "default_gnomad")]
    pub gnomad: String,
}

fn default_dbsnp() -> String {
    "https://identifiers.org/dbsnp/{id}".to_string()
}

fn default_clinvar() -> String {
    "https://www.ncbi.nlm.nih.gov/clinvar/variation/{id}".to_string()
}

fn default_mgend() -> String {
    "https://mgend.ncgm.go.jp/variant/id/{id}".to_string()
}

fn default_tommo() -> String {
    "https://jmorp.megabank.tohoku.ac.jp/search?query={id}".to_string()
}

fn default_gnomad() -> String {
    "https://gnomad.broadinstitute.org/variant/{id}?dataset=gnomad_r4".to_string()
}

impl Default for XrefTemplates {
    fn default() -> Self {
        Self {
            dbsnp: default_dbsnp(),
            clinvar: default_clinvar(),
            mgend: default_mgend(),
            tommo: default_tommo(),
            gnomad: default_gnomad(),
        }
    }
}

impl XrefTemplates {
    fn entries(&self) -> [(&'static str, &str); 5] {
        [
            ("dbsnp", &self.dbsnp),
            ("clinvar", &self.clinvar),
            ("mgend", &self.mgend),
            ("tommo", &self.tommo),
            ("gnomad", &self.gnomad),
        ]
    }

    pub fn validate(&self) -> Result<()> {
        for (source, template) in self.entries() {
            if !template.contains(ID_PLACEHOLDER) {
                return Err(Error::InvalidTemplate {
                    source_name: source.to_string(),
                    message: format!("'{template}' lacks the {ID_PLACEHOLDER} placeholder"),
                });
            }
        }
        Ok(())
    }
}

/// Substitute `id` into `template`.
pub fn render(template: &str, id: &str) -> String {
    template.replace(ID_PLACEHOLDER, id)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FormatterConfig {
    #[serde(default)]
    pub xref: XrefTemplates,
}

impl FormatterConfig {
    pub fn validate(&self) -> Result<()> {
        self.xref.validate()
    }
}
