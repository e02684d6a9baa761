//! Reference data used by every search: vocabularies, dataset policy and
//! aliases, gene synonyms, condition names and the condition enricher.
//!
//! A [`Snapshot`] is immutable. [`RegistryStore`] swaps in a new snapshot on
//! reload; requests hold an `Arc` to the snapshot they started with.

pub mod conditions;
pub mod datasets;
pub mod lookup;

use std::sync::{Arc, PoisonError, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};
use togovar_format::{
    ConditionEnricher, DatasetAccess, FormatterConfig, Identity, NoConditionEnricher,
    ResultFormatter,
};
use togovar_query::{DatasetAliases, ExpressionCompiler, VisibilityFilters, Vocabularies};

use crate::config::RegistryConfig;
use crate::{metrics, Error, Result};

pub use conditions::VcfConditionIndex;
pub use datasets::{DatasetEntry, DatasetKind, DatasetPolicy};
pub use lookup::{DiseaseTable, GeneTable};

pub struct Snapshot {
    pub vocabularies: Vocabularies,
    pub aliases: DatasetAliases,
    pub datasets: DatasetPolicy,
    pub genes: GeneTable,
    pub diseases: DiseaseTable,
    pub enricher: Arc<dyn ConditionEnricher>,
    pub loaded_at: SystemTime,
}

impl Snapshot {
    /// Read every configured file. Only the condition VCF may fail without
    /// failing the load.
    pub fn load(config: &RegistryConfig) -> Result<Self> {
        let vocabularies = match &config.vocabularies {
            Some(path) => Vocabularies::from_json(&lookup::read(path)?)?,
            None => Vocabularies::bundled()?,
        };
        let (datasets, aliases) = match &config.datasets {
            Some(path) => DatasetPolicy::from_json(&lookup::read(path)?)?,
            None => DatasetPolicy::bundled()?,
        };
        let genes = match &config.genes {
            Some(path) => GeneTable::from_path(path)?,
            None => GeneTable::default(),
        };
        let diseases = match &config.diseases {
            Some(path) => DiseaseTable::from_path(path)?,
            None => DiseaseTable::default(),
        };
        let enricher: Arc<dyn ConditionEnricher> = match &config.condition_vcf {
            Some(path) => match VcfConditionIndex::from_path(path) {
                Ok(index) => {
                    tracing::info!(path = %path.display(), accessions = index.len(), "Condition VCF indexed");
                    Arc::new(index)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Condition VCF unavailable, annotation records without conditions stay empty");
                    Arc::new(NoConditionEnricher)
                }
            },
            None => Arc::new(NoConditionEnricher),
        };

        tracing::info!(
            variant_types = vocabularies.variant_types.len(),
            consequences = vocabularies.consequences.len(),
            significances = vocabularies.significances.len(),
            datasets = datasets.datasets().len(),
            genes = genes.len(),
            diseases = diseases.len(),
            "Reference data loaded"
        );

        Ok(Self {
            vocabularies,
            aliases,
            datasets,
            genes,
            diseases,
            enricher,
            loaded_at: SystemTime::now(),
        })
    }

    pub fn compiler(&self) -> ExpressionCompiler<'_> {
        ExpressionCompiler::new(&self.vocabularies, &self.aliases)
    }

    pub fn formatter<'a>(&'a self, config: &'a FormatterConfig) -> ResultFormatter<'a> {
        ResultFormatter {
            config,
            vocabularies: &self.vocabularies,
            aliases: &self.aliases,
            datasets: &self.datasets,
            synonyms: &self.genes,
            names: &self.diseases,
            enricher: self.enricher.as_ref(),
        }
    }

    pub fn visibility(&self, identity: &Identity) -> VisibilityFilters {
        VisibilityFilters {
            frequency_datasets: self.datasets.frequency_datasets(identity),
            condition_datasets: self.datasets.condition_datasets(identity),
            baseline: self.datasets.baseline(),
        }
    }
}

/// Holder of the current [`Snapshot`].
pub struct RegistryStore {
    config: RegistryConfig,
    current: RwLock<Arc<Snapshot>>,
}

impl RegistryStore {
    pub fn load(config: RegistryConfig) -> Result<Self> {
        let snapshot = Snapshot::load(&config)?;
        record_loaded(&snapshot);
        Ok(Self {
            config,
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    /// Store serving a prepared snapshot; reloads re-read `config`.
    pub fn with_snapshot(config: RegistryConfig, snapshot: Snapshot) -> Self {
        Self {
            config,
            current: RwLock::new(Arc::new(snapshot)),
        }
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Load a fresh snapshot off the async runtime and swap it in. The
    /// current snapshot stays in place when loading fails.
    pub async fn reload(&self) -> Result<()> {
        let config = self.config.clone();
        let loaded = tokio::task::spawn_blocking(move || Snapshot::load(&config))
            .await
            .map_err(|e| Error::Internal(format!("Registry reload task failed: {e}")));

        match loaded.and_then(|r| r) {
            Ok(snapshot) => {
                record_loaded(&snapshot);
                *self.current.write().unwrap_or_else(PoisonError::into_inner) =
                    Arc::new(snapshot);
                metrics::REGISTRY_RELOADS_TOTAL
                    .with_label_values(&["ok"])
                    .inc();
                Ok(())
            }
            Err(e) => {
                metrics::REGISTRY_RELOADS_TOTAL
                    .with_label_values(&["error"])
                    .inc();
                Err(e)
            }
        }
    }
}

fn record_loaded(snapshot: &Snapshot) {
    if let Ok(elapsed) = snapshot.loaded_at.duration_since(UNIX_EPOCH) {
        metrics::REGISTRY_LOADED_AT_SECONDS.set(elapsed.as_secs() as i64);
    }
}
