//! `mlstudio projects` — List, create and delete projects.

use clap::Subcommand;
use mlstudio_core::resource::{NewProject, Project, ResourceKey};

use super::{CmdResult, fail, open_authenticated, read_interruptible};

#[derive(Subcommand)]
pub enum ProjectAction {
    /// List your projects
    List,

    /// Create a project
    Create {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        description: Option<String>,

        /// classification, regression, clustering, ...
        #[arg(short = 't', long = "type", default_value = "classification")]
        project_type: String,

        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// Delete a project
    Delete { id: i64 },
}

pub async fn run(api_url: Option<String>, action: ProjectAction) -> CmdResult {
    let workbench = open_authenticated(api_url).await?;

    match action {
        ProjectAction::List => {
            let projects: Vec<Project> = read_interruptible(&workbench, &ResourceKey::PROJECTS).await?;
            if projects.is_empty() {
                println!("  No projects yet — create one with `mlstudio projects create`");
                return Ok(());
            }
            println!("  {:<6} {:<28} {:<16} {:<10}", "ID", "NAME", "TYPE", "STATUS");
            for p in &projects {
                println!("  {:<6} {:<28} {:<16} {:<10}", p.id, p.name, p.project_type, p.status);
            }
        }
        ProjectAction::Create {
            name,
            description,
            project_type,
            tags,
        } => {
            let project = workbench
                .create_project(&NewProject {
                    name,
                    description,
                    project_type,
                    tags,
                })
                .await
                .map_err(fail)?;
            println!("✅ Created project '{}' (id {})", project.name, project.id);
        }
        ProjectAction::Delete { id } => {
            workbench.delete_project(id).await.map_err(fail)?;
            println!("🗑️  Deleted project {id}");
        }
    }
    Ok(())
}
