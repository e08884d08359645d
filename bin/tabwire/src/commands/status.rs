use tabwire_browser::{BrowserSurface, CdpSurface};
use tabwire_core::{Config, Paths};

pub async fn run() -> anyhow::Result<()> {
    let paths = Paths::new();

    println!("tabwire status");
    println!("==============");
    println!();

    let config_path = paths.config_file();
    let config_exists = config_path.exists();
    println!(
        "Config:  {} {}",
        config_path.display(),
        if config_exists { "✓" } else { "✗ (using defaults)" }
    );

    let config = Config::load_or_default(&paths)?;
    println!("Driver:  {}", config.driver.url);
    println!(
        "Agent:   {}",
        if config.agent.url.is_empty() {
            "(disabled)"
        } else {
            config.agent.url.as_str()
        }
    );
    println!(
        "Browser: {}:{}",
        config.browser.cdp_host, config.browser.cdp_port
    );
    println!();

    let surface = CdpSurface::new(&config.browser.cdp_host, config.browser.cdp_port);
    match surface.list_tabs().await {
        Ok(tabs) => {
            println!("Browser reachable, {} tab(s) open:", tabs.len());
            for tab in tabs {
                let marker = if tab.active { "*" } else { " " };
                println!("  {} [{}] {}", marker, tab.id, tab.url);
            }
        }
        Err(e) => {
            println!("Browser not reachable: {}", e);
            println!("Start it with --remote-debugging-port={}", config.browser.cdp_port);
        }
    }

    Ok(())
}
