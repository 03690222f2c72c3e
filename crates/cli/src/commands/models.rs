//! `mlstudio models` — List, create, delete and train models.

use clap::Subcommand;
use mlstudio_core::resource::{Model, NewModel, ResourceKey, TrainingRequest};

use super::{CmdResult, fail, open_authenticated, read_interruptible};

#[derive(Subcommand)]
pub enum ModelAction {
    /// List your models
    List,

    /// Create a model definition
    Create {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        description: Option<String>,

        /// classification, regression, clustering, ...
        #[arg(short = 't', long = "type", default_value = "classification")]
        model_type: String,

        /// random_forest, xgboost, neural_network, ...
        #[arg(short, long, default_value = "random_forest")]
        algorithm: String,

        #[arg(short, long)]
        project: Option<i64>,
    },

    /// Delete a model
    Delete { id: i64 },

    /// Queue training on a dataset
    Train {
        id: i64,

        #[arg(short, long)]
        dataset: i64,

        /// Column to predict
        #[arg(short, long)]
        target: String,

        #[arg(long, default_value_t = 0.2)]
        test_size: f64,

        #[arg(long, default_value_t = 42)]
        random_state: u64,
    },
}

pub async fn run(api_url: Option<String>, action: ModelAction) -> CmdResult {
    let workbench = open_authenticated(api_url).await?;

    match action {
        ModelAction::List => {
            let models: Vec<Model> = read_interruptible(&workbench, &ResourceKey::MODELS).await?;
            if models.is_empty() {
                println!("  No models yet — create one with `mlstudio models create`");
                return Ok(());
            }
            println!(
                "  {:<6} {:<24} {:<16} {:<16} {:<10}",
                "ID", "NAME", "TYPE", "ALGORITHM", "STATUS"
            );
            for m in &models {
                println!(
                    "  {:<6} {:<24} {:<16} {:<16} {:<10}",
                    m.id, m.name, m.model_type, m.algorithm, m.status
                );
            }
        }
        ModelAction::Create {
            name,
            description,
            model_type,
            algorithm,
            project,
        } => {
            let model = workbench
                .create_model(&NewModel {
                    name,
                    description,
                    model_type,
                    algorithm,
                    project_id: project,
                })
                .await
                .map_err(fail)?;
            println!("✅ Created model '{}' (id {}, {})", model.name, model.id, model.status);
        }
        ModelAction::Delete { id } => {
            workbench.delete_model(id).await.map_err(fail)?;
            println!("🗑️  Deleted model {id}");
        }
        ModelAction::Train {
            id,
            dataset,
            target,
            test_size,
            random_state,
        } => {
            if !(test_size > 0.0 && test_size < 1.0) {
                return Err("--test-size must be between 0 and 1".into());
            }
            let request = TrainingRequest {
                test_size,
                random_state,
                ..TrainingRequest::new(dataset, target)
            };
            let accepted = workbench.train_model(id, &request).await.map_err(fail)?;
            println!("🚀 {} (model {}, status: {})", accepted.message, accepted.model_id, accepted.status);
        }
    }
    Ok(())
}
