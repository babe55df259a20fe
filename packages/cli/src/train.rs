//! The `train` command: fit a model bundle from the case store and persist
//! it.

use std::path::Path;
use std::time::Instant;

use case_records_analytics::projector;
use case_records_classifier::{ForestConfig, ModelBundle, train};
use case_records_database::{CaseStore, queries};
use case_records_database_models::CaseFilter;

/// Trains on every well-formed case matching `filter` and writes the bundle
/// to `model_path`.
///
/// # Errors
///
/// Returns an error if the store query, training, or saving fails.
pub async fn run(
    store: &dyn CaseStore,
    filter: &CaseFilter,
    config: &ForestConfig,
    model_path: &Path,
) -> Result<ModelBundle, Box<dyn std::error::Error>> {
    let start = Instant::now();

    log::info!("Loading cases...");
    let docs = queries::find_cases(store, filter).await?;
    let table = projector::project(&docs);
    log::info!(
        "{} of {} case(s) usable for training",
        table.len(),
        docs.len()
    );

    let bundle = train(&table, config)?;
    bundle.save(model_path)?;

    log::info!(
        "Training complete in {:.1}s ({} classes: {})",
        start.elapsed().as_secs_f64(),
        bundle.classes().len(),
        bundle.classes().join(", ")
    );

    Ok(bundle)
}

#[cfg(test)]
mod tests {
    use case_records_database::memory::MemoryStore;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn trains_and_saves_from_store() {
        let docs = (0..6_u32)
            .map(|i| {
                json!({
                    "data_do_caso": format!("2024-01-0{}", i + 1),
                    "tipo_do_caso": if i < 3 { "Furto" } else { "Assalto" },
                    "localizacao": if i < 3 { "Centro" } else { "Bairro B" },
                    "vitima": { "etnia": "Parda", "idade": 10 + i * 10, "sexo": "feminino" }
                })
            })
            .collect();
        let store = MemoryStore::with_documents(docs);
        let path = std::env::temp_dir().join(format!(
            "case_records_cli_model_{}.msgpack",
            std::process::id()
        ));
        let config = ForestConfig {
            n_trees: 10,
            ..ForestConfig::default()
        };

        let bundle = run(&store, &CaseFilter::default(), &config, &path)
            .await
            .unwrap();
        let loaded = ModelBundle::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(bundle.classes(), ["Assalto", "Furto"]);
        assert_eq!(loaded.classes(), bundle.classes());
    }

    #[tokio::test]
    async fn refuses_tiny_stores() {
        let store = MemoryStore::new();
        let result = run(
            &store,
            &CaseFilter::default(),
            &ForestConfig::default(),
            Path::new("/nonexistent/never-written.msgpack"),
        )
        .await;
        assert!(result.is_err());
    }
}
