use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;

const CONFIG_TEMPLATE: &str = r#"# WorkMate configuration
#
# Every key can also be set through the environment, e.g.
#   WORKMATE_BACKEND=http WORKMATE_BASE_URL=http://localhost:8000/api workmate

# "simulated" answers offline with canned replies.
# "http" talks to a WorkMate server (POST {base_url}/chat, GET {base_url}/workspaces).
backend = "simulated"
base_url = "http://localhost:8000/api"

# Reply delay of the simulated backend, in milliseconds
latency_ms = 2000

# Give up on the HTTP backend after this many seconds
request_timeout_secs = 60

# ── Interface ────────────────────────────────────────────────────
show_sidebar = true      # Ctrl+B toggles it at runtime
seed_demo = true         # open with the example roadmap exchange
history = true           # remember composer history between sessions
"#;

pub fn run() -> Result<()> {
    let config_dir = Config::config_dir()?;
    let config_path = Config::config_path()?;

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;

    if config_path.exists() {
        println!("Existing config file found:");
        println!("  {}", config_path.display());
        print!("\nOverwrite? (The existing file will be backed up) [y/N] ");

        use std::io::Write;
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Setup cancelled.");
            return Ok(());
        }

        backup_file(&config_path)?;
    }

    write_template(&config_path)?;
    println!("Created {}", config_path.display());

    println!("\nNext steps:");
    println!("  1. Start chatting:          workmate");
    println!("  2. Ask a single question:   workmate ask \"What is on the Q1 roadmap?\"");
    println!("  3. Use a real server:       workmate --backend http --base-url http://host/api");

    Ok(())
}

fn write_template(path: &Path) -> Result<()> {
    std::fs::write(path, CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Back up a file to <name>.bak, appending a timestamp if .bak already exists.
fn backup_file(path: &Path) -> Result<()> {
    let mut backup = path.with_extension("toml.bak");

    if backup.exists() {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        backup = path.with_extension(format!("toml.bak.{}", timestamp));
    }

    std::fs::rename(path, &backup)
        .with_context(|| format!("Failed to back up {} to {}", path.display(), backup.display()))?;
    println!("  Backed up to {}", backup.display());

    Ok(())
}
