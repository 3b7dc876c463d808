use std::collections::HashMap;

use crate::config::DatasetConfig;
use crate::prelude::{BatchPayload, DataSource, ReviewError, ReviewResult};

#[derive(Debug, Clone, Default)]
struct MemoryDataset {
    config: DatasetConfig,
    batches: Vec<(String, BatchPayload)>,
}

/// In-memory data source, used for synthetic data and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    datasets: HashMap<String, MemoryDataset>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_dataset(&mut self, name: &str, config: DatasetConfig) {
        self.datasets.entry(name.to_string()).or_default().config = config;
    }

    /// Adds or replaces a batch; batches are listed in insertion order.
    pub fn insert_batch(&mut self, dataset: &str, batch: &str, payload: BatchPayload) {
        let entry = self.datasets.entry(dataset.to_string()).or_default();
        match entry.batches.iter_mut().find(|(name, _)| name == batch) {
            Some(slot) => slot.1 = payload,
            None => entry.batches.push((batch.to_string(), payload)),
        }
    }

    pub fn dataset_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.datasets.keys().cloned().collect();
        names.sort();
        names
    }

    fn dataset(&self, name: &str) -> ReviewResult<&MemoryDataset> {
        self.datasets
            .get(name)
            .ok_or_else(|| ReviewError::Source(format!("unknown dataset {}", name)))
    }
}

impl DataSource for MemorySource {
    fn dataset_config(&mut self, dataset: &str) -> ReviewResult<DatasetConfig> {
        Ok(self.dataset(dataset)?.config.clone())
    }

    fn batches(&mut self, dataset: &str) -> ReviewResult<Vec<String>> {
        Ok(self
            .dataset(dataset)?
            .batches
            .iter()
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn batch(
        &mut self,
        dataset: &str,
        batch: &str,
        _config: &DatasetConfig,
    ) -> ReviewResult<BatchPayload> {
        self.dataset(dataset)?
            .batches
            .iter()
            .find(|(name, _)| name == batch)
            .map(|(_, payload)| payload.clone())
            .ok_or_else(|| ReviewError::Source(format!("unknown batch {} in {}", batch, dataset)))
    }
}
