//! Generate command - run a full generation turn locally.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use tracing::info;

use forge_core::{ForgeConfig, GenMode, StreamEvent};
use forge_deploy::{DeployPipeline, HttpScreenshotService, NodeProjectBuilder};
use forge_gen::{
    CodeSaver, DispatchRequest, GenerationRouter, ScriptedBackend, SessionCache,
};
use forge_store::{AppService, ChatHistoryService, MemoryStore, MAX_PAGE_SIZE};

#[derive(Args)]
pub struct GenerateArgs {
    /// What to build
    #[arg(short, long)]
    prompt: String,

    /// Generation mode (html, multi_file, vue_project, react_project);
    /// classified from the prompt when omitted
    #[arg(short, long)]
    mode: Option<String>,

    /// Regenerate once after the first turn, replacing the ai reply
    #[arg(long)]
    retry: bool,

    /// Build and publish after generation
    #[arg(long)]
    deploy: bool,
}

pub async fn execute(args: GenerateArgs) -> Result<()> {
    let mode = match args.mode.as_deref() {
        Some(value) => Some(
            GenMode::from_value(value)
                .ok_or_else(|| anyhow::anyhow!("unknown mode argument: {}", value))?,
        ),
        None => None,
    };

    let config = ForgeConfig::load(std::env::current_dir()?);
    let store = Arc::new(MemoryStore::new());
    let history = ChatHistoryService::new(store.clone());
    let cache = Arc::new(SessionCache::from_settings(
        history.clone(),
        config.context_window,
        &config.cache,
    ));
    let saver = Arc::new(CodeSaver::new(&config.output_root));

    // The demo backend replays a canned response shaped like the mode's
    // real output.
    let effective_mode = mode.unwrap_or_else(|| GenerationRouter::classify(&args.prompt));
    let backend = demo_backend(&args.prompt, effective_mode);
    let router = GenerationRouter::new(
        store.clone(),
        history.clone(),
        cache.clone(),
        saver,
        Arc::new(backend),
    );

    let user_id = 1;
    let apps = AppService::new(store.clone(), history.clone());
    let app = apps.create_from_prompt(user_id, args.prompt.clone(), mode).await?;
    info!(app_id = app.id, "created demo application");

    let stream = router
        .dispatch(DispatchRequest {
            app_id: app.id,
            author_id: user_id,
            prompt: args.prompt.clone(),
            mode,
            parent_message_id: None,
        })
        .await?;
    print_stream(stream).await?;

    if args.retry {
        let page = history.page(app.id, MAX_PAGE_SIZE, None).await?;
        let user_message = page
            .iter()
            .find(|m| m.role == forge_core::MessageRole::User)
            .ok_or_else(|| anyhow::anyhow!("no user message recorded"))?;
        println!("🔁 Retrying message {}", user_message.id);
        let stream = router.retry(user_message.id, user_id).await?;
        print_stream(stream).await?;
    }

    if args.deploy {
        let mut pipeline = DeployPipeline::new(config.clone(), store.clone(), store.clone())
            .with_builder(GenMode::VueProject, Arc::new(NodeProjectBuilder::new()))
            .with_builder(GenMode::ReactProject, Arc::new(NodeProjectBuilder::new()));
        if let Some(endpoint) = &config.screenshot_endpoint {
            pipeline = pipeline.with_screenshots(Arc::new(HttpScreenshotService::new(endpoint)));
        }
        let outcome = pipeline.deploy(app.id).await?;
        println!("🚀 Deployed to {}", outcome.url);
    }

    let stats = cache.stats();
    info!(
        size = stats.size,
        hits = stats.hits,
        misses = stats.misses,
        "session cache after run"
    );
    Ok(())
}

async fn print_stream(mut stream: forge_gen::EventStream) -> Result<()> {
    use std::io::Write;

    while let Some(event) = stream.next_event().await {
        match event {
            StreamEvent::ContentChunk { text } => {
                print!("{}", text);
                std::io::stdout().flush()?;
            }
            StreamEvent::ToolInvocationRequested { name, args, .. } => {
                println!("🔧 {} {}", name, args);
            }
            StreamEvent::ToolInvocationCompleted { result } => {
                println!("   {}", result);
            }
            StreamEvent::Completed { dir } => {
                println!("\n✅ Saved to {}", dir.display());
            }
            StreamEvent::Failed { cause } => {
                anyhow::bail!("generation failed: {}", cause);
            }
        }
    }
    Ok(())
}

/// Canned backend responses per mode.
fn demo_backend(prompt: &str, mode: GenMode) -> ScriptedBackend {
    let title: String = prompt.chars().take(40).collect();
    match mode {
        GenMode::Html => ScriptedBackend::new().chunk(format!(
            "```html\n<!DOCTYPE html>\n<html>\n<head><title>{}</title></head>\n<body>\n<h1>{}</h1>\n</body>\n</html>\n```\n",
            title, title
        )),
        GenMode::MultiFile => ScriptedBackend::new()
            .chunk(format!(
                "```html\n<!DOCTYPE html>\n<html>\n<head><title>{}</title><link rel=\"stylesheet\" href=\"style.css\"></head>\n<body>\n<h1>{}</h1>\n<script src=\"script.js\"></script>\n</body>\n</html>\n```\n",
                title, title
            ))
            .chunk("```css\nbody { font-family: sans-serif; margin: 2rem; }\n```\n")
            .chunk("```js\ndocument.addEventListener('DOMContentLoaded', () => {});\n```\n"),
        GenMode::VueProject | GenMode::ReactProject => {
            let (entry, source) = if mode == GenMode::VueProject {
                ("src/App.vue", "<template>\n  <main/>\n</template>\n")
            } else {
                ("src/App.jsx", "export default function App() { return null; }\n")
            };
            ScriptedBackend::new()
                .chunk(format!("Scaffolding a {} app for: {}\n", mode, title))
                .tool_write(
                    "package.json",
                    "{\n  \"name\": \"generated-app\",\n  \"scripts\": { \"build\": \"vite build\" }\n}\n",
                )
                .tool_write("index.html", "<!DOCTYPE html>\n<html><body><div id=\"app\"></div></body></html>\n")
                .tool_write(entry, source)
        }
    }
}
