use console::style;

use crate::Result;
use crate::config::Config;
use crate::web;

/// Start the web server, persisting generated defaults (such as the cookie
/// secret) on first run so sessions survive restarts
#[inline]
pub async fn serve(config: Config) -> Result<()> {
    if !config.config_file_path().exists() {
        config.save()?;
    }

    web::serve(config).await
}

/// Print the active configuration. The cookie secret is deliberately not
/// shown.
#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", style("Data").bold());
    println!("  directory:    {}", config.base_dir.display());
    println!("  sessions:     {}", config.sessions_dir().display());
    println!("  collections:  {}", config.collections_dir().display());

    println!("{}", style("Server").bold());
    println!("  bind address: {}", config.bind_addr());

    println!("{}", style("Ollama").bold());
    let url = config
        .ollama
        .base_url()
        .map_err(|e| crate::PlaygroundError::Config(e.to_string()))?;
    println!("  url:             {}", url);
    println!("  chat model:      {}", config.ollama.chat_model);
    println!("  embedding model: {}", config.ollama.embedding_model);
    println!("  batch size:      {}", config.ollama.batch_size);
    println!("  timeout:         {}s", config.ollama.timeout_seconds);

    println!("{}", style("Chunking").bold());
    println!("  chunk size: {} characters", config.chunking.chunk_size);

    Ok(())
}
