use easel::error::{default_error_handler, Error, Result};
use easel::params::ParameterSet;
use easel::store::ListOptions;
use easel::template::{Category, CreateTemplate};
use easel::{get_cli, get_log_level_from_verbose, Commands, TemplateStore};

fn main() {
    let cli = get_cli();
    let log_level = get_log_level_from_verbose(cli.verbose);
    env_logger::Builder::new().filter_level(log_level).init();

    let result = open_store(cli.store_dir).and_then(|store| match cli.command {
        Some(Commands::List) => handle_list(&store),
        Some(Commands::Seed) => handle_seed(&store),
        Some(Commands::Serve) | None => handle_serve(store),
    });

    if let Err(err) = result {
        default_error_handler(err);
    }
}

fn open_store(dir: Option<std::path::PathBuf>) -> Result<TemplateStore> {
    match dir {
        Some(dir) => Ok(TemplateStore::with_dir(dir)),
        None => TemplateStore::new(),
    }
}

fn handle_serve(store: TemplateStore) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Internal(anyhow::anyhow!("Failed to create tokio runtime: {e}")))?;

    rt.block_on(async {
        easel::run_mcp_server(store)
            .await
            .map_err(|e| Error::Internal(anyhow::anyhow!("MCP server error: {e}")))
    })
}

fn handle_list(store: &TemplateStore) -> Result<()> {
    let templates = store.list(&ListOptions::default())?;

    if templates.is_empty() {
        println!("No templates stored.");
        println!();
        println!("Install the starter templates with:");
        println!("  easel seed");
        return Ok(());
    }

    println!("Stored templates:");
    println!();
    for t in templates {
        println!("  {} (v{})", t.name, t.version);
        println!("    Id: {}", t.id);
        println!("    Category: {}", t.category);
        if !t.description.is_empty() {
            println!("    Description: {}", t.description);
        }
        println!("    Updated: {}", t.updated_at);
        println!();
    }

    Ok(())
}

fn handle_seed(store: &TemplateStore) -> Result<()> {
    for input in starter_templates() {
        let name = input.name.clone();
        store.create(input)?;
        println!("Created starter template '{name}'.");
    }
    Ok(())
}

/// One starter template per category, for first-run use.
fn starter_templates() -> Vec<CreateTemplate> {
    vec![
        CreateTemplate {
            name: "heroic portrait".into(),
            description: "Dramatic character portraits with cinematic lighting".into(),
            category: Category::Character,
            parameters: ParameterSet {
                subject: Some("a weathered adventurer".into()),
                camera_angle: Some("close-up".into()),
                style: Some("digital painting".into()),
                lighting: Some("dramatic rim light".into()),
                mood: Some("determined".into()),
                quality: Some("highly detailed".into()),
                negative_prompt: Some("blurry, deformed hands".into()),
                ..Default::default()
            },
        },
        CreateTemplate {
            name: "misty valley".into(),
            description: "Atmospheric wide landscapes at dawn".into(),
            category: Category::Landscape,
            parameters: ParameterSet {
                subject: Some("a river valley".into()),
                environment: Some("rolling fog, distant mountains".into()),
                camera_angle: Some("wide shot".into()),
                lighting: Some("soft dawn light".into()),
                mood: Some("serene".into()),
                quality: Some("8k".into()),
                ..Default::default()
            },
        },
        CreateTemplate {
            name: "ink wash".into(),
            description: "Monochrome East Asian ink painting style".into(),
            category: Category::Style,
            parameters: ParameterSet {
                subject: Some("a lone pine tree".into()),
                style: Some("sumi-e ink wash".into()),
                details: Some("visible brush strokes, paper texture".into()),
                negative_prompt: Some("color, photorealism".into()),
                ..Default::default()
            },
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starter_templates_cover_every_category() {
        let templates = starter_templates();
        for category in Category::ALL {
            assert!(
                templates.iter().any(|t| t.category == category),
                "no starter template for {category}"
            );
        }
        for template in &templates {
            assert!(template.parameters.subject.is_some());
        }
    }
}
